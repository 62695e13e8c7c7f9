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

//! Transactions as they travel on the Bitcoin wire, with their inputs,
//! outputs and the serialization both directions.

use crate::consensus;
use crate::core::hash::{Hash, Hashed};
use crate::core::script;
use crate::ser::{self, Readable, Reader, Writeable, Writer};

/// Sequence value for inputs whose sequence feature is unused.
pub const SEQUENCE_FINAL: u32 = 0xffff_ffff;

/// A transaction output being spent: the id of the transaction that
/// created it and the output index within it. 36 bytes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutPoint {
	/// id of the transaction holding the output
	pub hash: Hash,
	/// index of the output within that transaction
	pub index: u32,
}

impl Writeable for OutPoint {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		self.hash.write(writer)?;
		writer.write_u32(self.index)
	}
}

impl Readable for OutPoint {
	fn read(reader: &mut dyn Reader) -> Result<OutPoint, ser::Error> {
		let hash = Hash::read(reader)?;
		let index = reader.read_u32()?;
		Ok(OutPoint { hash, index })
	}
}

/// A transaction input: the outpoint it spends, the unlocking script
/// and the sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxIn {
	/// the output being spent
	pub previous_output: OutPoint,
	/// unlocking script, varint-length-prefixed on the wire
	pub signature_script: Vec<u8>,
	/// sequence, SEQUENCE_FINAL when unused
	pub sequence: u32,
}

impl Writeable for TxIn {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		self.previous_output.write(writer)?;
		writer.write_varbytes(&self.signature_script)?;
		writer.write_u32(self.sequence)
	}
}

impl Readable for TxIn {
	fn read(reader: &mut dyn Reader) -> Result<TxIn, ser::Error> {
		let previous_output = OutPoint::read(reader)?;
		let signature_script = reader.read_varbytes()?;
		let sequence = reader.read_u32()?;
		Ok(TxIn {
			previous_output,
			signature_script,
			sequence,
		})
	}
}

/// A transaction output: a value in satoshi and the locking script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOut {
	/// amount in satoshi
	pub value: u64,
	/// locking script, varint-length-prefixed on the wire
	pub pk_script: Vec<u8>,
}

impl Writeable for TxOut {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		writer.write_u64(self.value)?;
		writer.write_varbytes(&self.pk_script)
	}
}

impl Readable for TxOut {
	fn read(reader: &mut dyn Reader) -> Result<TxOut, ser::Error> {
		let value = reader.read_u64()?;
		let pk_script = reader.read_varbytes()?;
		Ok(TxOut { value, pk_script })
	}
}

/// A Bitcoin transaction. The id is the double SHA256 of the
/// serialization, kept in internal little-endian byte order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
	/// transaction format version
	pub version: u32,
	/// inputs
	pub inputs: Vec<TxIn>,
	/// outputs
	pub outputs: Vec<TxOut>,
	/// earliest block/time the transaction may enter a block
	pub lock_time: u32,
}

impl Writeable for Transaction {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		writer.write_u32(self.version)?;
		writer.write_varint(self.inputs.len() as u64)?;
		for input in &self.inputs {
			input.write(writer)?;
		}
		writer.write_varint(self.outputs.len() as u64)?;
		for output in &self.outputs {
			output.write(writer)?;
		}
		writer.write_u32(self.lock_time)
	}
}

impl Readable for Transaction {
	fn read(reader: &mut dyn Reader) -> Result<Transaction, ser::Error> {
		let version = reader.read_u32()?;
		let input_len = reader.read_varint()?;
		if input_len > consensus::MAX_IN_OUT_LEN {
			return Err(ser::Error::TooLargeReadErr(input_len));
		}
		let mut inputs = Vec::with_capacity(input_len as usize);
		for _ in 0..input_len {
			inputs.push(TxIn::read(reader)?);
		}
		let output_len = reader.read_varint()?;
		if output_len > consensus::MAX_IN_OUT_LEN {
			return Err(ser::Error::TooLargeReadErr(output_len));
		}
		let mut outputs = Vec::with_capacity(output_len as usize);
		for _ in 0..output_len {
			outputs.push(TxOut::read(reader)?);
		}
		let lock_time = reader.read_u32()?;
		Ok(Transaction {
			version,
			inputs,
			outputs,
			lock_time,
		})
	}
}

impl Hashed for Transaction {
	fn bytes(&self) -> Vec<u8> {
		ser::ser_vec(self).expect("serialization to memory")
	}
}

impl Transaction {
	/// Transaction id: double SHA256 of the serialization.
	pub fn id(&self) -> Hash {
		self.hash()
	}

	/// Whether any input of this transaction spends the given outpoint.
	pub fn has_outpoint(&self, outpoint: &OutPoint) -> bool {
		self.inputs
			.iter()
			.any(|input| input.previous_output == *outpoint)
	}

	/// Index of the first output paying the given key hash through a
	/// standard P2PKH script, if any.
	pub fn find_p2pkh_index(&self, key_hash: &[u8; 20]) -> Option<u32> {
		self.outputs
			.iter()
			.position(|out| script::is_p2pkh_to(&out.pk_script, key_hash))
			.map(|i| i as u32)
	}
}
