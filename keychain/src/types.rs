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

//! Keychain error definitions

use std::io;

use crate::base58;

/// Errors from key handling, address parsing and signing.
#[derive(Clone, Debug, Eq, Fail, PartialEq)]
pub enum Error {
	/// Base58 or Base58Check decoding failure
	#[fail(display = "base58: {}", _0)]
	Base58(String),
	/// Version byte of an address or WIF key we don't handle
	#[fail(display = "unknown version byte 0x{:02x}", _0)]
	UnknownVersion(u8),
	/// Decoded payload had an unexpected length
	#[fail(display = "unexpected payload length {}", _0)]
	InvalidLength(usize),
	/// The secp256k1 backend rejected a key, digest or signature
	#[fail(display = "secp error: {}", _0)]
	Secp(String),
	/// Random source failure
	#[fail(display = "rng error: {}", _0)]
	Rng(String),
	/// Key file could not be read or written
	#[fail(display = "key file error: {}", _0)]
	KeyFile(String),
}

impl From<base58::Error> for Error {
	fn from(e: base58::Error) -> Error {
		Error::Base58(format!("{}", e))
	}
}

impl From<io::Error> for Error {
	fn from(e: io::Error) -> Error {
		Error::KeyFile(format!("{}", e))
	}
}
