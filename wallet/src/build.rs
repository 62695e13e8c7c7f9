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

//! Builds and signs the spending transaction: coin selection in
//! discovery order, the destination and change outputs, and the
//! per-input SIGHASH_ALL signature construction.

use sparv_core::core::script;
use sparv_core::core::transaction::{Transaction, TxIn, TxOut, SEQUENCE_FINAL};
use sparv_core::ser;
use sparv_keychain::Keychain;
use sparv_util::hash256;

use crate::error::Error;
use crate::types::{total_value, Unspent};

/// SIGHASH_ALL hash type, appended little-endian (4 bytes) to the
/// signature preimage and as a single byte to the DER signature.
const SIGHASH_ALL: u8 = 0x01;

/// Select unspent outputs in discovery order until the running sum
/// covers amount plus fee.
pub fn select_coins(unspent: &[Unspent], amount: u64, fee: u64) -> Result<Vec<Unspent>, Error> {
	let insufficient = Error::NotEnoughFunds {
		balance: total_value(unspent),
		amount,
		fee,
	};
	let target = match amount.checked_add(fee) {
		Some(target) => target,
		None => return Err(insufficient),
	};
	let mut selected = vec![];
	let mut value = 0u64;
	for coin in unspent {
		selected.push(coin.clone());
		value += coin.value();
		if value >= target {
			return Ok(selected);
		}
	}
	Err(insufficient)
}

/// The two outputs of a spend: the destination, wrapped in a P2SH
/// template around the decoded address hash (a long-standing quirk,
/// kept as-is), and P2PKH change back to the wallet key.
pub fn outputs(
	to_hash: &[u8; 20],
	change_hash: &[u8; 20],
	amount: u64,
	total_in: u64,
	fee: u64,
) -> Vec<TxOut> {
	vec![
		TxOut {
			value: amount,
			pk_script: script::p2sh(to_hash),
		},
		TxOut {
			value: total_in - amount - fee,
			pk_script: script::p2pkh(change_hash),
		},
	]
}

/// Build and sign the spending transaction over the wallet's unspent
/// outputs.
pub fn transaction(
	keychain: &Keychain,
	unspent: &[Unspent],
	to_hash: &[u8; 20],
	amount: u64,
	fee: u64,
) -> Result<Transaction, Error> {
	let selected = select_coins(unspent, amount, fee)?;
	let total_in = total_value(&selected);
	let outputs = outputs(to_hash, &keychain.identifier(), amount, total_in, fee);

	let mut inputs = vec![];
	for index in 0..selected.len() {
		let signature_script = sign_input(keychain, &selected, index, &outputs)?;
		inputs.push(TxIn {
			previous_output: selected[index].outpoint(),
			signature_script,
			sequence: SEQUENCE_FINAL,
		});
	}

	Ok(Transaction {
		version: 1,
		inputs,
		outputs,
		lock_time: 0,
	})
}

/// SIGHASH_ALL scriptSig for the input at `index`. The preimage is the
/// transaction copy in which that input carries the previous output's
/// locking script as its subscript and every other input an empty
/// script, serialized with the hash type appended and double hashed.
/// The scriptSig pushes the signature (hash type byte appended) and
/// the public key.
fn sign_input(
	keychain: &Keychain,
	selected: &[Unspent],
	index: usize,
	outputs: &[TxOut],
) -> Result<Vec<u8>, Error> {
	let mut copy_inputs = vec![];
	for (i, coin) in selected.iter().enumerate() {
		let signature_script = if i == index {
			coin.tx.outputs[coin.index as usize].pk_script.clone()
		} else {
			vec![]
		};
		copy_inputs.push(TxIn {
			previous_output: coin.outpoint(),
			signature_script,
			sequence: SEQUENCE_FINAL,
		});
	}
	let tx_copy = Transaction {
		version: 1,
		inputs: copy_inputs,
		outputs: outputs.to_vec(),
		lock_time: 0,
	};

	let mut preimage = ser::ser_vec(&tx_copy)?;
	preimage.extend_from_slice(&[SIGHASH_ALL, 0x00, 0x00, 0x00]);
	let digest = hash256(&preimage);

	let mut sig = keychain.sign(&digest)?;
	sig.push(SIGHASH_ALL);

	let mut script_sig = script::push_data(&sig);
	script_sig.extend_from_slice(&script::push_data(&keychain.public_key_bytes()));
	Ok(script_sig)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::Unspent;
	use sparv_util::secp::{Message, PublicKey, Signature};

	const TO_HASH: [u8; 20] = [0x42; 20];

	fn test_keychain() -> Keychain {
		Keychain::from_secret_slice(&[0x23; 32]).unwrap()
	}

	fn funding(keychain: &Keychain, value: u64, lock_time: u32) -> Unspent {
		let tx = Transaction {
			version: 1,
			inputs: vec![],
			outputs: vec![TxOut {
				value,
				pk_script: script::p2pkh(&keychain.identifier()),
			}],
			lock_time,
		};
		Unspent { tx, index: 0 }
	}

	#[test]
	fn selects_in_order_until_covered() {
		let keychain = test_keychain();
		let coins = vec![
			funding(&keychain, 50_000, 0),
			funding(&keychain, 50_000, 1),
			funding(&keychain, 50_000, 2),
		];
		let selected = select_coins(&coins, 60_000, 10_000).unwrap();
		assert_eq!(selected.len(), 2);
		assert_eq!(selected[0].tx.id(), coins[0].tx.id());
		assert_eq!(selected[1].tx.id(), coins[1].tx.id());
	}

	#[test]
	fn insufficient_balance() {
		let keychain = test_keychain();
		let coins = vec![funding(&keychain, 50_000, 0)];
		match select_coins(&coins, 60_000, 10_000) {
			Err(Error::NotEnoughFunds {
				balance,
				amount,
				fee,
			}) => {
				assert_eq!(balance, 50_000);
				assert_eq!(amount, 60_000);
				assert_eq!(fee, 10_000);
			}
			other => panic!("unexpected result {:?}", other.map(|_| ())),
		}
	}

	#[test]
	fn output_values_balance_out() {
		let keychain = test_keychain();
		let coins = vec![funding(&keychain, 100_000, 0)];
		let tx = transaction(&keychain, &coins, &TO_HASH, 60_000, 10_000).unwrap();

		assert_eq!(tx.version, 1);
		assert_eq!(tx.lock_time, 0);
		assert_eq!(tx.outputs.len(), 2);
		// destination is the P2SH template around the address hash
		assert_eq!(tx.outputs[0].value, 60_000);
		assert_eq!(tx.outputs[0].pk_script, script::p2sh(&TO_HASH));
		// change comes back to the wallet key
		assert_eq!(tx.outputs[1].value, 30_000);
		assert_eq!(
			tx.outputs[1].pk_script,
			script::p2pkh(&keychain.identifier())
		);
		// inputs exactly cover amount + fee + change
		let total_in: u64 = coins.iter().map(|c| c.value()).sum();
		assert_eq!(total_in, 60_000 + 10_000 + tx.outputs[1].value);
	}

	#[test]
	fn inputs_reference_selected_outpoints() {
		let keychain = test_keychain();
		let coins = vec![funding(&keychain, 40_000, 0), funding(&keychain, 40_000, 1)];
		let tx = transaction(&keychain, &coins, &TO_HASH, 60_000, 10_000).unwrap();
		assert_eq!(tx.inputs.len(), 2);
		for (input, coin) in tx.inputs.iter().zip(&coins) {
			assert_eq!(input.previous_output, coin.outpoint());
			assert_eq!(input.sequence, SEQUENCE_FINAL);
		}
	}

	#[test]
	fn script_sig_pushes_signature_then_pubkey() {
		let keychain = test_keychain();
		let coins = vec![funding(&keychain, 100_000, 0)];
		let tx = transaction(&keychain, &coins, &TO_HASH, 60_000, 10_000).unwrap();

		let script_sig = &tx.inputs[0].signature_script;
		let sig_len = script_sig[0] as usize;
		let sig_with_type = &script_sig[1..1 + sig_len];
		assert_eq!(*sig_with_type.last().unwrap(), 0x01);

		let rest = &script_sig[1 + sig_len..];
		let key_len = rest[0] as usize;
		assert_eq!(key_len, 65);
		assert_eq!(&rest[1..], &keychain.public_key_bytes()[..]);

		// the signature must verify over the SIGHASH_ALL preimage
		let subscript = coins[0].tx.outputs[0].pk_script.clone();
		let tx_copy = Transaction {
			version: 1,
			inputs: vec![TxIn {
				previous_output: coins[0].outpoint(),
				signature_script: subscript,
				sequence: SEQUENCE_FINAL,
			}],
			outputs: tx.outputs.clone(),
			lock_time: 0,
		};
		let mut preimage = ser::ser_vec(&tx_copy).unwrap();
		preimage.extend_from_slice(&[0x01, 0x00, 0x00, 0x00]);
		let digest = hash256(&preimage);

		let secp = sparv_util::static_secp_instance();
		let secp = secp.lock();
		let msg = Message::from_slice(&digest).unwrap();
		let der = &sig_with_type[..sig_len - 1];
		let sig = Signature::from_der(der).unwrap();
		let public = PublicKey::from_slice(&keychain.public_key_bytes()).unwrap();
		assert!(secp.verify(&msg, &sig, &public).is_ok());
	}
}
