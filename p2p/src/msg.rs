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

//! Message types that transit over the network and related
//! serialization code.

use std::fmt;
use std::io::{Cursor, Read, Write};

use chrono::Utc;
use enum_primitive::FromPrimitive;
use log::debug;

use sparv_core::consensus::{MAGIC, MAX_INV_LEN, PROTOCOL_VERSION, SERVICES, USER_AGENT};
use sparv_core::core::hash::{Hash, ZERO_HASH};
use sparv_core::core::merkle;
use sparv_core::core::Transaction;
use sparv_core::ser::{self, BinReader, Readable, Reader, Writeable, Writer};
use sparv_util::hash256;

use crate::types::Error;

/// Byte length of the fixed message header.
pub const HEADER_LEN: usize = 24;

/// Wire width of a serialized network address.
pub const NETADDR_LEN: usize = 26;

/// Wire width of an inventory vector.
pub const INVVECT_LEN: usize = 36;

/// Refuse payloads above this, matching the reference client's cap.
pub const MAX_MSG_LEN: u32 = 32 * 1024 * 1024;

/// Header of any protocol message, used to identify incoming messages
/// and frame outgoing ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
	/// network magic
	pub magic: u32,
	/// command name, ascii, zero padded
	pub command: [u8; 12],
	/// payload length in bytes
	pub length: u32,
	/// first four bytes of the payload's double SHA256
	pub checksum: [u8; 4],
}

impl MessageHeader {
	/// Frame a payload under the given command name.
	pub fn new(command_name: &str, payload: &[u8]) -> MessageHeader {
		let mut command = [0u8; 12];
		command[..command_name.len()].copy_from_slice(command_name.as_bytes());
		let digest = hash256(payload);
		let mut checksum = [0u8; 4];
		checksum.copy_from_slice(&digest[..4]);
		MessageHeader {
			magic: MAGIC,
			command,
			length: payload.len() as u32,
			checksum,
		}
	}

	/// Command name with the zero padding stripped.
	pub fn command_str(&self) -> String {
		let end = self.command.iter().position(|&b| b == 0).unwrap_or(12);
		String::from_utf8_lossy(&self.command[..end]).into_owned()
	}
}

impl Writeable for MessageHeader {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		writer.write_u32(self.magic)?;
		writer.write_fixed_bytes(&self.command)?;
		writer.write_u32(self.length)?;
		writer.write_fixed_bytes(&self.checksum)
	}
}

impl Readable for MessageHeader {
	fn read(reader: &mut dyn Reader) -> Result<MessageHeader, ser::Error> {
		let magic = reader.read_u32()?;
		let mut command = [0u8; 12];
		command.copy_from_slice(&reader.read_fixed_bytes(12)?);
		let length = reader.read_u32()?;
		let mut checksum = [0u8; 4];
		checksum.copy_from_slice(&reader.read_fixed_bytes(4)?);
		Ok(MessageHeader {
			magic,
			command,
			length,
			checksum,
		})
	}
}

/// Network address as embedded in the version message: services, a
/// 16-byte IPv4-mapped IPv6 address and a big-endian port. Fixed 26
/// bytes on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetAddr {
	/// services bitmask of the node at this address
	pub services: u64,
	/// IPv4-mapped IPv6 address bytes
	pub ip: [u8; 16],
	/// port, the one big-endian field on the wire
	pub port: u16,
}

impl NetAddr {
	/// The loopback address with our services bits. Good enough for a
	/// client that never accepts inbound connections; peers don't act
	/// on it.
	pub fn loopback(port: u16) -> NetAddr {
		let mut ip = [0u8; 16];
		ip[10] = 0xff;
		ip[11] = 0xff;
		ip[12] = 127;
		ip[15] = 1;
		NetAddr {
			services: SERVICES,
			ip,
			port,
		}
	}
}

impl Writeable for NetAddr {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		writer.write_u64(self.services)?;
		writer.write_fixed_bytes(&self.ip)?;
		writer.write_u16_be(self.port)
	}
}

impl Readable for NetAddr {
	fn read(reader: &mut dyn Reader) -> Result<NetAddr, ser::Error> {
		let services = reader.read_u64()?;
		let mut ip = [0u8; 16];
		ip.copy_from_slice(&reader.read_fixed_bytes(16)?);
		let port = reader.read_u16_be()?;
		Ok(NetAddr { services, ip, port })
	}
}

/// First message on a fresh connection, sender advertises its version
/// and characteristics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
	/// protocol version of the sender
	pub version: u32,
	/// services bitmask of the sender
	pub services: u64,
	/// unix timestamp at the sender
	pub timestamp: u64,
	/// network address of the receiver
	pub addr_recv: NetAddr,
	/// network address of the sender
	pub addr_from: NetAddr,
	/// randomly generated for each connection, helps detect self
	pub nonce: u64,
	/// software identification, varstr on the wire
	pub user_agent: Vec<u8>,
	/// best block height of the sender
	pub start_height: u32,
	/// whether the receiver may relay transactions before a filter is
	/// loaded
	pub relay: bool,
}

impl Version {
	/// Our version message. Relay stays off until the Bloom filter has
	/// been loaded.
	pub fn ours(nonce: u64) -> Version {
		let addr = NetAddr::loopback(8333);
		Version {
			version: PROTOCOL_VERSION,
			services: SERVICES,
			timestamp: Utc::now().timestamp() as u64,
			addr_recv: addr.clone(),
			addr_from: addr,
			nonce,
			user_agent: USER_AGENT.as_bytes().to_vec(),
			start_height: 0,
			relay: false,
		}
	}
}

impl Writeable for Version {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		writer.write_u32(self.version)?;
		writer.write_u64(self.services)?;
		writer.write_u64(self.timestamp)?;
		self.addr_recv.write(writer)?;
		self.addr_from.write(writer)?;
		writer.write_u64(self.nonce)?;
		writer.write_varbytes(&self.user_agent)?;
		writer.write_u32(self.start_height)?;
		writer.write_u8(if self.relay { 1 } else { 0 })
	}
}

impl Readable for Version {
	fn read(reader: &mut dyn Reader) -> Result<Version, ser::Error> {
		let version = reader.read_u32()?;
		let services = reader.read_u64()?;
		let timestamp = reader.read_u64()?;
		let addr_recv = NetAddr::read(reader)?;
		let addr_from = NetAddr::read(reader)?;
		let nonce = reader.read_u64()?;
		let user_agent = reader.read_varbytes()?;
		let start_height = reader.read_u32()?;
		let relay = reader.read_u8()? > 0;
		Ok(Version {
			version,
			services,
			timestamp,
			addr_recv,
			addr_from,
			nonce,
			user_agent,
			start_height,
			relay,
		})
	}
}

/// Multiplier stirring the per-function Bloom seed, from the reference
/// filter implementation.
const BLOOM_SEED_MULTIPLIER: u32 = 0xfba4_c795;

/// Bloom filter advertised to the peer so it only relays matching
/// transactions and filtered blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filterload {
	/// the filter bits, varstr on the wire
	pub filter: Vec<u8>,
	/// number of hash functions applied per query
	pub n_hash_funcs: u32,
	/// random tweak folded into every seed
	pub n_tweak: u32,
	/// filter update flags, 1 = update on match
	pub n_flags: u8,
}

impl Filterload {
	/// Build a `size`-byte filter over the given queries. For query q
	/// and function i, the bit `murmur3(q, i * 0xFBA4C795 + tweak) mod
	/// (size * 8)` is set, lowest bit of each byte first.
	pub fn new(size: u32, n_hash_funcs: u32, queries: &[&[u8]], n_tweak: u32) -> Filterload {
		let mut filter = vec![0u8; size as usize];
		let nbits = size * 8;
		for query in queries {
			for i in 0..n_hash_funcs {
				let seed = i.wrapping_mul(BLOOM_SEED_MULTIPLIER).wrapping_add(n_tweak);
				let hash = murmur3_32(query, seed) % nbits;
				filter[(hash >> 3) as usize] |= 1u8 << (hash & 7);
			}
		}
		Filterload {
			filter,
			n_hash_funcs,
			n_tweak,
			n_flags: 1,
		}
	}
}

fn murmur3_32(data: &[u8], seed: u32) -> u32 {
	murmur3::murmur3_32(&mut Cursor::new(data), seed).expect("in-memory read")
}

impl Writeable for Filterload {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		writer.write_varbytes(&self.filter)?;
		writer.write_u32(self.n_hash_funcs)?;
		writer.write_u32(self.n_tweak)?;
		writer.write_u8(self.n_flags)
	}
}

/// Asks the peer for inventory of up to 500 blocks following the best
/// locator match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Getblocks {
	/// protocol version
	pub version: u32,
	/// known block hashes, newest first
	pub locator_hashes: Vec<Hash>,
	/// hash to stop at, zero for as-many-as-possible
	pub hash_stop: Hash,
}

impl Getblocks {
	/// An open-ended getblocks anchored at the given locator.
	pub fn new(locator_hashes: Vec<Hash>) -> Getblocks {
		Getblocks {
			version: PROTOCOL_VERSION,
			locator_hashes,
			hash_stop: ZERO_HASH,
		}
	}
}

impl Writeable for Getblocks {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		writer.write_u32(self.version)?;
		writer.write_varint(self.locator_hashes.len() as u64)?;
		for hash in &self.locator_hashes {
			hash.write(writer)?;
		}
		self.hash_stop.write(writer)
	}
}

enum_from_primitive! {
	/// Types of inventory entries.
	#[derive(Debug, Clone, Copy, PartialEq, Eq)]
	pub enum InvType {
		Error = 0,
		Tx = 1,
		Block = 2,
		FilteredBlock = 3,
		CompactBlock = 4,
	}
}

/// A single inventory entry: a type tag and a hash. Fixed 36 bytes on
/// the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvVect {
	/// what the hash refers to
	pub inv_type: InvType,
	/// block or transaction hash
	pub hash: Hash,
}

impl Writeable for InvVect {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		writer.write_u32(self.inv_type as u32)?;
		self.hash.write(writer)
	}
}

impl Readable for InvVect {
	fn read(reader: &mut dyn Reader) -> Result<InvVect, ser::Error> {
		let raw = reader.read_u32()?;
		let inv_type = InvType::from_u32(raw).ok_or(ser::Error::CorruptedData)?;
		let hash = Hash::read(reader)?;
		Ok(InvVect { inv_type, hash })
	}
}

fn read_inventory(reader: &mut dyn Reader) -> Result<Vec<InvVect>, ser::Error> {
	let count = reader.read_varint()?;
	if count > MAX_INV_LEN {
		return Err(ser::Error::TooLargeReadErr(count));
	}
	let mut inventory = Vec::with_capacity(count as usize);
	for _ in 0..count {
		inventory.push(InvVect::read(reader)?);
	}
	Ok(inventory)
}

fn write_inventory<W: Writer>(writer: &mut W, inventory: &[InvVect]) -> Result<(), ser::Error> {
	writer.write_varint(inventory.len() as u64)?;
	for vect in inventory {
		vect.write(writer)?;
	}
	Ok(())
}

/// Inventory announcement, from either side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inv {
	/// announced entries
	pub inventory: Vec<InvVect>,
}

impl Writeable for Inv {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		write_inventory(writer, &self.inventory)
	}
}

impl Readable for Inv {
	fn read(reader: &mut dyn Reader) -> Result<Inv, ser::Error> {
		Ok(Inv {
			inventory: read_inventory(reader)?,
		})
	}
}

/// Request for the full data behind inventory entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Getdata {
	/// requested entries
	pub inventory: Vec<InvVect>,
}

impl Getdata {
	/// Request the given inventory.
	pub fn new(inventory: Vec<InvVect>) -> Getdata {
		Getdata { inventory }
	}

	/// Entries of the given type only.
	pub fn filter_inventory(&self, inv_type: InvType) -> Vec<InvVect> {
		self.inventory
			.iter()
			.filter(|vect| vect.inv_type == inv_type)
			.cloned()
			.collect()
	}
}

impl Writeable for Getdata {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		write_inventory(writer, &self.inventory)
	}
}

impl Readable for Getdata {
	fn read(reader: &mut dyn Reader) -> Result<Getdata, ser::Error> {
		Ok(Getdata {
			inventory: read_inventory(reader)?,
		})
	}
}

/// A filtered block: the 80-byte header fields, the block's total
/// transaction count and the partial Merkle tree connecting the
/// matched transactions to the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Merkleblock {
	/// block format version
	pub version: u32,
	/// hash of the previous block
	pub prev_block: Hash,
	/// root of the block's transaction Merkle tree
	pub merkle_root: Hash,
	/// block timestamp
	pub timestamp: u32,
	/// difficulty target
	pub bits: u32,
	/// proof of work nonce
	pub nonce: u32,
	/// number of transactions in the full block
	pub total_txs: u32,
	/// partial tree hashes, depth first
	pub hashes: Vec<Hash>,
	/// partial tree traversal flags, varstr on the wire
	pub flags: Vec<u8>,
}

impl Merkleblock {
	/// Hash of the 80-byte block header.
	pub fn block_hash(&self) -> Hash {
		let mut header = Vec::with_capacity(80);
		header.extend_from_slice(&self.version.to_le_bytes());
		header.extend_from_slice(&self.prev_block.0);
		header.extend_from_slice(&self.merkle_root.0);
		header.extend_from_slice(&self.timestamp.to_le_bytes());
		header.extend_from_slice(&self.bits.to_le_bytes());
		header.extend_from_slice(&self.nonce.to_le_bytes());
		Hash(hash256(&header))
	}

	/// Validate the partial Merkle tree against the header root and
	/// return the matched transaction ids. A mismatching root or a
	/// malformed tree contributes no matches.
	pub fn validate(&self) -> Vec<Hash> {
		let bits = merkle::flag_bits(&self.flags);
		match merkle::extract_matches(self.total_txs, &self.hashes, &bits) {
			Ok((root, matched)) => {
				if root == self.merkle_root {
					matched
				} else {
					debug!("merkle root mismatch in block {}", self.block_hash());
					vec![]
				}
			}
			Err(e) => {
				debug!(
					"malformed partial merkle tree in block {}: {}",
					self.block_hash(),
					e
				);
				vec![]
			}
		}
	}
}

impl Writeable for Merkleblock {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		writer.write_u32(self.version)?;
		self.prev_block.write(writer)?;
		self.merkle_root.write(writer)?;
		writer.write_u32(self.timestamp)?;
		writer.write_u32(self.bits)?;
		writer.write_u32(self.nonce)?;
		writer.write_u32(self.total_txs)?;
		writer.write_varint(self.hashes.len() as u64)?;
		for hash in &self.hashes {
			hash.write(writer)?;
		}
		writer.write_varbytes(&self.flags)
	}
}

impl Readable for Merkleblock {
	fn read(reader: &mut dyn Reader) -> Result<Merkleblock, ser::Error> {
		let version = reader.read_u32()?;
		let prev_block = Hash::read(reader)?;
		let merkle_root = Hash::read(reader)?;
		let timestamp = reader.read_u32()?;
		let bits = reader.read_u32()?;
		let nonce = reader.read_u32()?;
		let total_txs = reader.read_u32()?;
		let hash_count = reader.read_varint()?;
		if hash_count > MAX_INV_LEN {
			return Err(ser::Error::TooLargeReadErr(hash_count));
		}
		let mut hashes = Vec::with_capacity(hash_count as usize);
		for _ in 0..hash_count {
			hashes.push(Hash::read(reader)?);
		}
		let flags = reader.read_varbytes()?;
		Ok(Merkleblock {
			version,
			prev_block,
			merkle_root,
			timestamp,
			bits,
			nonce,
			total_txs,
			hashes,
			flags,
		})
	}
}

/// A peer's rejection notice for something we sent. Whatever follows
/// the reason on the wire is carried as opaque data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reject {
	/// command the rejection refers to
	pub message: Vec<u8>,
	/// rejection code
	pub code: u8,
	/// human readable reason
	pub reason: Vec<u8>,
	/// trailing data, typically the hash of the offender
	pub data: Vec<u8>,
}

impl Reject {
	/// Decode a reject from a full payload. Trailing bytes past the
	/// reason become the data field.
	pub fn from_payload(payload: &[u8]) -> Result<Reject, ser::Error> {
		let mut source = &payload[..];
		let (message, code, reason) = {
			let mut reader = BinReader::new(&mut source);
			(
				reader.read_varbytes()?,
				reader.read_u8()?,
				reader.read_varbytes()?,
			)
		};
		Ok(Reject {
			message,
			code,
			reason,
			data: source.to_vec(),
		})
	}
}

impl Writeable for Reject {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		writer.write_varbytes(&self.message)?;
		writer.write_u8(self.code)?;
		writer.write_varbytes(&self.reason)?;
		writer.write_fixed_bytes(&self.data)
	}
}

impl fmt::Display for Reject {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"code 0x{:02x}, message: {}, reason: {}, data: {:?}",
			self.code,
			String::from_utf8_lossy(&self.message),
			String::from_utf8_lossy(&self.reason),
			self.data
		)
	}
}

/// The messages the wallet can place on or take off the wire. The
/// framing layer consumes nothing beyond `command_name` and `payload`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
	/// version announcement
	Version(Version),
	/// version acknowledgement, empty payload
	Verack,
	/// Bloom filter load
	Filterload(Filterload),
	/// block inventory request
	Getblocks(Getblocks),
	/// inventory announcement
	Inv(Inv),
	/// inventory data request
	Getdata(Getdata),
	/// filtered block
	Merkleblock(Merkleblock),
	/// full transaction
	Tx(Transaction),
	/// rejection notice
	Reject(Reject),
}

/// Command string for a message, as it appears zero-padded in the
/// header.
pub fn command_name(msg: &Message) -> &'static str {
	match msg {
		Message::Version(_) => "version",
		Message::Verack => "verack",
		Message::Filterload(_) => "filterload",
		Message::Getblocks(_) => "getblocks",
		Message::Inv(_) => "inv",
		Message::Getdata(_) => "getdata",
		Message::Merkleblock(_) => "merkleblock",
		Message::Tx(_) => "tx",
		Message::Reject(_) => "reject",
	}
}

/// Serialized payload for a message, without the header.
pub fn payload(msg: &Message) -> Result<Vec<u8>, ser::Error> {
	match msg {
		Message::Version(m) => ser::ser_vec(m),
		Message::Verack => Ok(vec![]),
		Message::Filterload(m) => ser::ser_vec(m),
		Message::Getblocks(m) => ser::ser_vec(m),
		Message::Inv(m) => ser::ser_vec(m),
		Message::Getdata(m) => ser::ser_vec(m),
		Message::Merkleblock(m) => ser::ser_vec(m),
		Message::Tx(m) => ser::ser_vec(m),
		Message::Reject(m) => ser::ser_vec(m),
	}
}

/// Frame a message: header bytes followed by the payload.
pub fn frame_message(msg: &Message) -> Result<Vec<u8>, ser::Error> {
	let body = payload(msg)?;
	let header = MessageHeader::new(command_name(msg), &body);
	let mut data = ser::ser_vec(&header)?;
	data.extend_from_slice(&body);
	Ok(data)
}

/// Write a full framed message to the stream.
pub fn write_message<W: Write>(stream: &mut W, msg: &Message) -> Result<(), Error> {
	let data = frame_message(msg)?;
	stream.write_all(&data)?;
	debug!("sent {}: {} bytes", command_name(msg), data.len() - HEADER_LEN);
	Ok(())
}

/// Read exactly one message header from the stream.
pub fn read_header<R: Read>(stream: &mut R) -> Result<MessageHeader, Error> {
	let mut buf = [0u8; HEADER_LEN];
	stream.read_exact(&mut buf)?;
	let mut cursor = &buf[..];
	let header: MessageHeader = ser::deserialize(&mut cursor)?;
	if header.length > MAX_MSG_LEN {
		return Err(Error::Serialization(ser::Error::TooLargeReadErr(u64::from(
			header.length,
		))));
	}
	Ok(header)
}

/// Read the message body the header declares. The checksum is not
/// re-verified on receive.
pub fn read_body<R: Read>(header: &MessageHeader, stream: &mut R) -> Result<Vec<u8>, Error> {
	let mut body = vec![0u8; header.length as usize];
	stream.read_exact(&mut body)?;
	debug!("recv {}: {} bytes", header.command_str(), header.length);
	Ok(body)
}
