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

//! Unspent output bookkeeping over the transactions a sync round
//! brought in.

use sparv_core::core::{OutPoint, Transaction};

/// An output paying the wallet key that no other observed transaction
/// spends.
#[derive(Debug, Clone)]
pub struct Unspent {
	/// the transaction holding the output
	pub tx: Transaction,
	/// index of the output within it
	pub index: u32,
}

impl Unspent {
	/// Value of the unspent output in satoshi.
	pub fn value(&self) -> u64 {
		self.tx.outputs[self.index as usize].value
	}

	/// The outpoint a spender references.
	pub fn outpoint(&self) -> OutPoint {
		OutPoint {
			hash: self.tx.id(),
			index: self.index,
		}
	}
}

/// Derive the wallet's unspent outputs: the first P2PKH output paying
/// `key_hash` in each observed transaction is a candidate, and a
/// candidate is dropped when any other observed transaction spends
/// its outpoint.
pub fn collect_unspent(txs: &[Transaction], key_hash: &[u8; 20]) -> Vec<Unspent> {
	let mut unspent = vec![];
	for tx in txs {
		let index = match tx.find_p2pkh_index(key_hash) {
			Some(index) => index,
			None => continue,
		};
		let outpoint = OutPoint {
			hash: tx.id(),
			index,
		};
		let spent = txs.iter().any(|other| other.has_outpoint(&outpoint));
		if !spent {
			unspent.push(Unspent {
				tx: tx.clone(),
				index,
			});
		}
	}
	unspent
}

/// Sum of the unspent values in satoshi.
pub fn total_value(unspent: &[Unspent]) -> u64 {
	unspent.iter().map(|u| u.value()).sum()
}
