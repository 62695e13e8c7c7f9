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

//! Library module for the key holder functionalities provided by
//! sparv: the persisted private key, WIF and legacy address formats,
//! and ECDSA signing over the static secp256k1 context.

#[macro_use]
extern crate failure_derive;

pub mod base58;
pub mod keychain;
pub mod types;

pub use crate::keychain::{
	decode_address, decode_wif, encode_address, encode_wif, Keychain, KEY_FILE,
};
pub use crate::types::Error;
