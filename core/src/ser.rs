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

//! Serialization and deserialization layer specialized for the binary
//! encoding of the Bitcoin wire protocol: little-endian integers (plus
//! the big-endian u16 used for ports), variable-length integers and
//! length-prefixed byte strings.
//!
//! To use it simply implement `Writeable` or `Readable` and then use
//! the `serialize` or `deserialize` functions on them as appropriate.

use std::io::{self, Read, Write};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};

/// Refuse to allocate for a single field read beyond this, the input is
/// corrupt or hostile.
const MAX_FIELD_READ: usize = 100_000;

/// Possible errors deriving from serializing or deserializing.
#[derive(Clone, Debug, Eq, Fail, PartialEq)]
pub enum Error {
	/// Wraps an io error produced when reading or writing
	#[fail(display = "io error {:?}: {}", _1, _0)]
	IOErr(String, io::ErrorKind),
	/// Expected a given value that wasn't found
	#[fail(display = "expected {:?}, received {:?}", expected, received)]
	UnexpectedData {
		/// value expected at this point of the stream
		expected: Vec<u8>,
		/// value actually read
		received: Vec<u8>,
	},
	/// Data wasn't in a consumable format
	#[fail(display = "corrupted data")]
	CorruptedData,
	/// When asked to read too much data
	#[fail(display = "too large read: {} bytes", _0)]
	TooLargeReadErr(u64),
}

impl From<io::Error> for Error {
	fn from(e: io::Error) -> Error {
		Error::IOErr(format!("{}", e), e.kind())
	}
}

/// Useful trait to implement on types that can be translated to byte
/// slices directly. Allows the use of `write_fixed_bytes` on them.
pub trait AsFixedBytes {
	/// The slice representation of self
	fn as_fixed_bytes(&self) -> &[u8];
}

/// Implementations defined how different numbers and binary structures
/// are written to an underlying stream or container.
pub trait Writer {
	/// Writes a u8 as bytes
	fn write_u8(&mut self, n: u8) -> Result<(), Error>;
	/// Writes a u16 as little-endian bytes
	fn write_u16(&mut self, n: u16) -> Result<(), Error>;
	/// Writes a u32 as little-endian bytes
	fn write_u32(&mut self, n: u32) -> Result<(), Error>;
	/// Writes a u64 as little-endian bytes
	fn write_u64(&mut self, n: u64) -> Result<(), Error>;
	/// Writes a u16 as big-endian bytes. The wire is little-endian
	/// throughout except for ports in network addresses.
	fn write_u16_be(&mut self, n: u16) -> Result<(), Error>;
	/// Writes a fixed number of bytes from something that can turn
	/// itself into a `&[u8]`. The reader is expected to know the actual
	/// length on read.
	fn write_fixed_bytes<T: AsFixedBytes>(&mut self, fixed: &T) -> Result<(), Error>;

	/// Writes a variable-length integer: a literal byte below 0xFD,
	/// otherwise a discriminator followed by 2, 4 or 8 little-endian
	/// bytes depending on the value range.
	fn write_varint(&mut self, n: u64) -> Result<(), Error> {
		if n < 0xfd {
			self.write_u8(n as u8)
		} else if n <= 0xffff {
			self.write_u8(0xfd)?;
			self.write_u16(n as u16)
		} else if n <= 0xffff_ffff {
			self.write_u8(0xfe)?;
			self.write_u32(n as u32)
		} else {
			self.write_u8(0xff)?;
			self.write_u64(n)
		}
	}

	/// Writes a variable-length byte string, the length of the slice
	/// encoded as a varint prefix.
	fn write_varbytes(&mut self, bytes: &[u8]) -> Result<(), Error> {
		self.write_varint(bytes.len() as u64)?;
		self.write_fixed_bytes(&bytes)
	}
}

/// Implementations defined how different numbers and binary structures
/// are read from an underlying stream or container.
pub trait Reader {
	/// Read a u8 from the underlying Read
	fn read_u8(&mut self) -> Result<u8, Error>;
	/// Read a little-endian u16
	fn read_u16(&mut self) -> Result<u16, Error>;
	/// Read a little-endian u32
	fn read_u32(&mut self) -> Result<u32, Error>;
	/// Read a little-endian u64
	fn read_u64(&mut self) -> Result<u64, Error>;
	/// Read a big-endian u16 (network address ports)
	fn read_u16_be(&mut self) -> Result<u16, Error>;
	/// Read a fixed number of bytes from the underlying reader.
	fn read_fixed_bytes(&mut self, length: usize) -> Result<Vec<u8>, Error>;
	/// Consumes a byte from the reader, producing an error if it
	/// doesn't have the expected value
	fn expect_u8(&mut self, val: u8) -> Result<u8, Error>;

	/// Read a variable-length integer. A truncated stream produces an
	/// error rather than a partial value.
	fn read_varint(&mut self) -> Result<u64, Error> {
		let disc = self.read_u8()?;
		match disc {
			0xfd => Ok(u64::from(self.read_u16()?)),
			0xfe => Ok(u64::from(self.read_u32()?)),
			0xff => self.read_u64(),
			n => Ok(u64::from(n)),
		}
	}

	/// Read a varint-length-prefixed byte string. Fails if fewer bytes
	/// remain than the prefix declares.
	fn read_varbytes(&mut self) -> Result<Vec<u8>, Error> {
		let len = self.read_varint()?;
		self.read_fixed_bytes(len as usize)
	}

	/// Convenience function to read 32 fixed bytes
	fn read_32_bytes(&mut self) -> Result<Vec<u8>, Error> {
		self.read_fixed_bytes(32)
	}
}

/// Trait that every type that can be serialized as binary must
/// implement. Writes directly to a Writer.
pub trait Writeable {
	/// Write the data held by this Writeable to the provided writer
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), Error>;
}

/// Trait that every type that can be deserialized from binary must
/// implement. Reads directly from a Reader.
pub trait Readable
where
	Self: Sized,
{
	/// Reads the data necessary to this Readable from the provided reader
	fn read(reader: &mut dyn Reader) -> Result<Self, Error>;
}

/// Deserializes a Readable from any std::io::Read implementation.
pub fn deserialize<T: Readable>(source: &mut dyn Read) -> Result<T, Error> {
	let mut reader = BinReader { source };
	T::read(&mut reader)
}

/// Serializes a Writeable into any std::io::Write implementation.
pub fn serialize<W: Writeable>(sink: &mut dyn Write, thing: &W) -> Result<(), Error> {
	let mut writer = BinWriter { sink };
	thing.write(&mut writer)
}

/// Utility function to serialize a writeable directly in memory using
/// a Vec<u8>.
pub fn ser_vec<W: Writeable>(thing: &W) -> Result<Vec<u8>, Error> {
	let mut vec = vec![];
	serialize(&mut vec, thing)?;
	Ok(vec)
}

/// Number of bytes `n` occupies once varint-encoded.
pub fn varint_len(n: u64) -> usize {
	if n < 0xfd {
		1
	} else if n <= 0xffff {
		3
	} else if n <= 0xffff_ffff {
		5
	} else {
		9
	}
}

/// Utility wrapper for an underlying byte Reader. Defines higher level
/// methods to read numbers, byte vectors, hashes, etc.
pub struct BinReader<'a> {
	source: &'a mut dyn Read,
}

impl<'a> BinReader<'a> {
	/// Wrap the provided source for reading
	pub fn new(source: &'a mut dyn Read) -> BinReader<'a> {
		BinReader { source }
	}
}

impl<'a> Reader for BinReader<'a> {
	fn read_u8(&mut self) -> Result<u8, Error> {
		self.source.read_u8().map_err(From::from)
	}
	fn read_u16(&mut self) -> Result<u16, Error> {
		self.source.read_u16::<LittleEndian>().map_err(From::from)
	}
	fn read_u32(&mut self) -> Result<u32, Error> {
		self.source.read_u32::<LittleEndian>().map_err(From::from)
	}
	fn read_u64(&mut self) -> Result<u64, Error> {
		self.source.read_u64::<LittleEndian>().map_err(From::from)
	}
	fn read_u16_be(&mut self) -> Result<u16, Error> {
		self.source.read_u16::<BigEndian>().map_err(From::from)
	}
	fn read_fixed_bytes(&mut self, length: usize) -> Result<Vec<u8>, Error> {
		if length > MAX_FIELD_READ {
			return Err(Error::TooLargeReadErr(length as u64));
		}
		let mut buf = vec![0; length];
		self.source
			.read_exact(&mut buf)
			.map(move |_| buf)
			.map_err(From::from)
	}
	fn expect_u8(&mut self, val: u8) -> Result<u8, Error> {
		let b = self.read_u8()?;
		if b == val {
			Ok(b)
		} else {
			Err(Error::UnexpectedData {
				expected: vec![val],
				received: vec![b],
			})
		}
	}
}

/// Utility wrapper for an underlying byte Writer. Defines higher level
/// methods to write numbers, byte vectors, hashes, etc.
pub struct BinWriter<'a> {
	sink: &'a mut dyn Write,
}

impl<'a> Writer for BinWriter<'a> {
	fn write_u8(&mut self, n: u8) -> Result<(), Error> {
		self.sink.write_u8(n).map_err(From::from)
	}
	fn write_u16(&mut self, n: u16) -> Result<(), Error> {
		self.sink.write_u16::<LittleEndian>(n).map_err(From::from)
	}
	fn write_u32(&mut self, n: u32) -> Result<(), Error> {
		self.sink.write_u32::<LittleEndian>(n).map_err(From::from)
	}
	fn write_u64(&mut self, n: u64) -> Result<(), Error> {
		self.sink.write_u64::<LittleEndian>(n).map_err(From::from)
	}
	fn write_u16_be(&mut self, n: u16) -> Result<(), Error> {
		self.sink.write_u16::<BigEndian>(n).map_err(From::from)
	}
	fn write_fixed_bytes<T: AsFixedBytes>(&mut self, fixed: &T) -> Result<(), Error> {
		self.sink
			.write_all(fixed.as_fixed_bytes())
			.map_err(From::from)
	}
}

impl AsFixedBytes for Vec<u8> {
	fn as_fixed_bytes(&self) -> &[u8] {
		&self[..]
	}
}

impl<'a> AsFixedBytes for &'a [u8] {
	fn as_fixed_bytes(&self) -> &[u8] {
		self
	}
}

impl AsFixedBytes for [u8; 4] {
	fn as_fixed_bytes(&self) -> &[u8] {
		&self[..]
	}
}

impl AsFixedBytes for [u8; 12] {
	fn as_fixed_bytes(&self) -> &[u8] {
		&self[..]
	}
}

impl AsFixedBytes for [u8; 16] {
	fn as_fixed_bytes(&self) -> &[u8] {
		&self[..]
	}
}

impl AsFixedBytes for [u8; 20] {
	fn as_fixed_bytes(&self) -> &[u8] {
		&self[..]
	}
}

impl AsFixedBytes for [u8; 32] {
	fn as_fixed_bytes(&self) -> &[u8] {
		&self[..]
	}
}
