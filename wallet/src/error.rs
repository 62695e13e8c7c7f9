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

//! Wallet specific errors

use sparv_core::ser;

/// Wallet error definition
#[derive(Debug, Fail)]
pub enum Error {
	/// Not enough confirmed funds to cover the requested spend
	#[fail(
		display = "balance {} is not enough for amount {} plus fee {}",
		balance, amount, fee
	)]
	NotEnoughFunds {
		/// confirmed balance in satoshi
		balance: u64,
		/// requested amount
		amount: u64,
		/// requested fee
		fee: u64,
	},
	/// Keychain error
	#[fail(display = "keychain error: {}", _0)]
	Keychain(sparv_keychain::Error),
	/// Peer or sync error
	#[fail(display = "peer error: {}", _0)]
	P2P(sparv_p2p::Error),
	/// Serialization error
	#[fail(display = "serialization error: {}", _0)]
	Serialization(ser::Error),
}

impl From<sparv_keychain::Error> for Error {
	fn from(e: sparv_keychain::Error) -> Error {
		Error::Keychain(e)
	}
}

impl From<sparv_p2p::Error> for Error {
	fn from(e: sparv_p2p::Error) -> Error {
		Error::P2P(e)
	}
}

impl From<ser::Error> for Error {
	fn from(e: ser::Error) -> Error {
		Error::Serialization(e)
	}
}
