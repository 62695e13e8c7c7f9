// Copyright 2020 The Sparv Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Hash Function
//!
//! Primary hash function used in the protocol
//!

use std::fmt;

use sparv_util as util;

use crate::ser::{self, Readable, Reader, Writeable, Writer};

/// A hash to uniquely (or close enough) identify one of the main
/// blockchain constructs. Kept in the little-endian byte order used on
/// the wire; display reverses nothing, so printed ids match the wire
/// order, not block-explorer order.
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd, Eq, Ord, Hash)]
pub struct Hash(pub [u8; 32]);

impl fmt::Display for Hash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for i in self.0.iter() {
			write!(f, "{:02x}", i)?;
		}
		Ok(())
	}
}

impl Hash {
	/// Creates a new hash from a byte slice, zero-padding short input
	pub fn from_vec(v: &[u8]) -> Hash {
		let mut a = [0; 32];
		for i in 0..a.len().min(v.len()) {
			a[i] = v[i];
		}
		Hash(a)
	}

	/// Parse a hash from display-order (big-endian) hex, reversing it
	/// into the internal wire order.
	pub fn from_hex_reversed(hex: &str) -> Result<Hash, ser::Error> {
		let bytes = util::from_hex(hex).map_err(|_| ser::Error::CorruptedData)?;
		if bytes.len() != 32 {
			return Err(ser::Error::CorruptedData);
		}
		Ok(Hash::from_vec(&util::reverse_bytes(&bytes)))
	}

	/// Converts the hash to a byte vector
	pub fn to_vec(&self) -> Vec<u8> {
		self.0.to_vec()
	}

	/// Converts the hash to a byte slice
	pub fn to_slice(&self) -> &[u8] {
		&self.0
	}
}

/// The all-zero hash, used as the hash_stop of an open-ended getblocks
pub const ZERO_HASH: Hash = Hash([0; 32]);

impl Writeable for Hash {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		writer.write_fixed_bytes(&self.0)
	}
}

impl Readable for Hash {
	fn read(reader: &mut dyn Reader) -> Result<Hash, ser::Error> {
		let v = reader.read_32_bytes()?;
		Ok(Hash::from_vec(&v))
	}
}

/// A trait for types that get their id (double SHA256) from their byte
/// serialization.
pub trait Hashed {
	/// The serialization to be hashed
	fn bytes(&self) -> Vec<u8>;

	/// Double SHA256 of the serialization
	fn hash(&self) -> Hash {
		Hash(util::hash256(&self.bytes()))
	}
}

/// All ids in `ids` that do not appear in `minus`, in their original
/// order.
pub fn sub_ids(ids: &[Hash], minus: &[Hash]) -> Vec<Hash> {
	ids.iter()
		.filter(|id| !minus.contains(id))
		.cloned()
		.collect()
}
