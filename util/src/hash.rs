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

//! The two hash constructions used on the Bitcoin wire: double SHA-256
//! for identifiers and checksums, RIPEMD-160 of SHA-256 for key and
//! script hashes.

use ripemd160::Ripemd160;
use sha2::{Digest, Sha256};

/// SHA-256 applied twice. Transaction ids, block hashes and Base58Check
/// checksums are all built from this.
pub fn hash256(data: &[u8]) -> [u8; 32] {
	let mut ret = [0; 32];
	let mut sha2 = Sha256::new();
	sha2.update(data);
	ret.copy_from_slice(sha2.finalize().as_slice());
	let mut sha2 = Sha256::new();
	sha2.update(&ret[..]);
	ret.copy_from_slice(sha2.finalize().as_slice());
	ret
}

/// RIPEMD-160 of SHA-256, the 20-byte hash behind P2PKH and P2SH.
pub fn hash160(data: &[u8]) -> [u8; 20] {
	let mut sha2 = Sha256::new();
	sha2.update(data);
	let mut rip = Ripemd160::new();
	rip.update(sha2.finalize().as_slice());
	let mut ret = [0; 20];
	ret.copy_from_slice(rip.finalize().as_slice());
	ret
}

/// Reverse a byte slice into a new vector. Hashes print big-endian but
/// travel little-endian, so this shows up at every display boundary.
pub fn reverse_bytes(b: &[u8]) -> Vec<u8> {
	b.iter().rev().cloned().collect()
}
