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

//! The wallet operations behind the CLI: show the address, compute
//! the balance, send a transaction. Each operation scopes its own
//! peer connection.

use log::info;

use sparv_core::core::hash::Hash;
use sparv_keychain::{decode_address, Keychain, KEY_FILE};
use sparv_p2p::{broadcast, P2PConfig, Peer, Syncer};

use crate::build;
use crate::error::Error;
use crate::types::{collect_unspent, total_value, Unspent};

/// The wallet address, creating the key store on first use.
pub fn show_address() -> Result<String, Error> {
	let keychain = Keychain::from_file(KEY_FILE)?;
	Ok(keychain.address())
}

/// Total confirmed balance in satoshi.
pub fn balance() -> Result<u64, Error> {
	let keychain = Keychain::from_file(KEY_FILE)?;
	let (_peer, unspent) = sync_unspent(&keychain)?;
	Ok(total_value(&unspent))
}

/// Build, sign and broadcast a spend of `amount` satoshi (plus `fee`)
/// to `to_addr`. Returns the id of the broadcast transaction.
pub fn send(to_addr: &str, amount: u64, fee: u64) -> Result<Hash, Error> {
	let to_hash = decode_address(to_addr)?;
	let keychain = Keychain::from_file(KEY_FILE)?;
	let (peer, unspent) = sync_unspent(&keychain)?;

	let tx = build::transaction(&keychain, &unspent, &to_hash, amount, fee)?;
	let txid = tx.id();
	broadcast(&peer, &tx)?;
	Ok(txid)
}

/// Run a full sync against the configured peer and derive the wallet's
/// unspent outputs from it. The connected peer is returned for callers
/// that keep talking to it.
fn sync_unspent(keychain: &Keychain) -> Result<(Peer, Vec<Unspent>), Error> {
	let mut syncer = Syncer::new(P2PConfig::default());
	let (peer, result) = syncer.run(&keychain.identifier())?;
	let unspent = collect_unspent(&result.txs, &keychain.identifier());
	info!(
		"{} transactions in, {} unspent outputs",
		result.txs.len(),
		unspent.len()
	);
	Ok((peer, unspent))
}
