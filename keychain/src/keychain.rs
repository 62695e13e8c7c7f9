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

//! The wallet's one key pair: creation from the OS random source,
//! persistence as a WIF string, address derivation and ECDSA signing.
//! Signing and key checks go through the shared static secp256k1
//! instance, acquired per call and released with the guard.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use log::debug;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroize;

use sparv_core::consensus;
use sparv_util as util;
use sparv_util::secp::{Message, PublicKey, SecretKey};

use crate::base58;
use crate::types::Error;

/// Name of the key file, looked up in the working directory.
pub const KEY_FILE: &str = "secretkey";

/// The wallet key pair. The secret is created once and read-only
/// afterwards.
#[derive(Clone)]
pub struct Keychain {
	secret: SecretKey,
	public: PublicKey,
}

impl Keychain {
	/// Build a keychain from 32 raw secret bytes.
	pub fn from_secret_slice(data: &[u8]) -> Result<Keychain, Error> {
		let secp = util::static_secp_instance();
		let secp = secp.lock();
		let secret =
			SecretKey::from_slice(data).map_err(|e| Error::Secp(format!("{}", e)))?;
		let public = PublicKey::from_secret_key(&secp, &secret);
		Ok(Keychain { secret, public })
	}

	/// Generate a keychain from the OS secure random source, drawing
	/// until secp256k1 accepts the scalar.
	pub fn from_random() -> Result<Keychain, Error> {
		let mut rng = OsRng::new().map_err(|e| Error::Rng(format!("{}", e)))?;
		loop {
			let mut buf = [0u8; 32];
			rng.fill_bytes(&mut buf);
			let res = Keychain::from_secret_slice(&buf);
			buf.zeroize();
			if let Ok(keychain) = res {
				return Ok(keychain);
			}
		}
	}

	/// Read the WIF key file at `path`, or create it on first run. The
	/// created file carries the WIF string as ASCII, mode 0666.
	pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Keychain, Error> {
		let path = path.as_ref();
		if path.exists() {
			let mut wif = String::new();
			File::open(path)?.read_to_string(&mut wif)?;
			let mut secret = decode_wif(wif.trim())?;
			let res = Keychain::from_secret_slice(&secret);
			secret.zeroize();
			return res;
		}

		debug!("no key file at {:?}, generating a new wallet key", path);
		let keychain = Keychain::from_random()?;
		let mut secret = keychain.secret_bytes();
		let wif = encode_wif(&secret);
		secret.zeroize();

		let mut file = File::create(path)?;
		file.write_all(wif.as_bytes())?;
		let mut perms = file.metadata()?.permissions();
		perms.set_mode(0o666);
		fs::set_permissions(path, perms)?;
		Ok(keychain)
	}

	fn secret_bytes(&self) -> [u8; 32] {
		let mut bytes = [0u8; 32];
		bytes.copy_from_slice(&self.secret[..]);
		bytes
	}

	/// Uncompressed public key, 65 bytes with the 0x04 prefix.
	pub fn public_key_bytes(&self) -> Vec<u8> {
		self.public.serialize_uncompressed().to_vec()
	}

	/// HASH160 of the public key. This is the wallet's identity: the
	/// Bloom filter query, the P2PKH match target and the address
	/// payload are all this value.
	pub fn identifier(&self) -> [u8; 20] {
		util::hash160(&self.public_key_bytes())
	}

	/// Legacy Base58Check testnet address for the wallet key.
	pub fn address(&self) -> String {
		encode_address(&self.identifier())
	}

	/// Sign a 32-byte digest, returning the DER-encoded signature.
	pub fn sign(&self, digest: &[u8]) -> Result<Vec<u8>, Error> {
		let secp = util::static_secp_instance();
		let secp = secp.lock();
		let msg = Message::from_slice(digest).map_err(|e| Error::Secp(format!("{}", e)))?;
		let sig = secp.sign(&msg, &self.secret);
		Ok(sig.serialize_der().to_vec())
	}
}

/// Encode a 32-byte secret as a testnet WIF string.
pub fn encode_wif(secret: &[u8; 32]) -> String {
	let mut data = Vec::with_capacity(33);
	data.push(consensus::WIF_VERSION);
	data.extend_from_slice(secret);
	let wif = base58::check_encode_slice(&data);
	data.zeroize();
	wif
}

/// Decode a WIF string back to the secret bytes, verifying the
/// trailing checksum and the version byte.
pub fn decode_wif(wif: &str) -> Result<[u8; 32], Error> {
	let mut data = base58::from_check(wif)?;
	if data.len() != 33 {
		return Err(Error::InvalidLength(data.len()));
	}
	if data[0] != consensus::WIF_VERSION {
		return Err(Error::UnknownVersion(data[0]));
	}
	let mut secret = [0u8; 32];
	secret.copy_from_slice(&data[1..]);
	data.zeroize();
	Ok(secret)
}

/// Encode a 20-byte key hash as a testnet P2PKH address.
pub fn encode_address(key_hash: &[u8; 20]) -> String {
	let mut data = Vec::with_capacity(21);
	data.push(consensus::P2PKH_VERSION);
	data.extend_from_slice(key_hash);
	base58::check_encode_slice(&data)
}

/// Decode a Base58Check address to its 20-byte hash. The checksum must
/// verify; testnet P2PKH and P2SH version bytes are accepted, anything
/// else is an unknown prefix.
pub fn decode_address(addr: &str) -> Result<[u8; 20], Error> {
	let data = base58::from_check(addr)?;
	if data.len() != 21 {
		return Err(Error::InvalidLength(data.len()));
	}
	match data[0] {
		v if v == consensus::P2PKH_VERSION || v == consensus::P2SH_VERSION => {}
		v => return Err(Error::UnknownVersion(v)),
	}
	let mut hash = [0u8; 20];
	hash.copy_from_slice(&data[1..]);
	Ok(hash)
}

#[cfg(test)]
mod tests {
	use super::*;
	use sparv_util::secp::Signature;

	fn test_secret() -> [u8; 32] {
		let mut s = [0x11u8; 32];
		s[31] = 0x77;
		s
	}

	#[test]
	fn wif_roundtrip() {
		let secret = test_secret();
		let wif = encode_wif(&secret);
		// testnet uncompressed keys encode with a leading '9'
		assert!(wif.starts_with('9'), "unexpected wif {}", wif);
		assert_eq!(decode_wif(&wif).unwrap(), secret);
	}

	#[test]
	fn wif_rejects_corruption() {
		let wif = encode_wif(&test_secret());
		let mut chars: Vec<char> = wif.chars().collect();
		let last = chars.len() - 1;
		chars[last] = if chars[last] == '2' { '3' } else { '2' };
		let corrupted: String = chars.into_iter().collect();
		assert!(decode_wif(&corrupted).is_err());
	}

	#[test]
	fn address_roundtrip() {
		let keychain = Keychain::from_secret_slice(&test_secret()).unwrap();
		let addr = keychain.address();
		assert!(
			addr.starts_with('m') || addr.starts_with('n'),
			"unexpected testnet address {}",
			addr
		);
		assert_eq!(decode_address(&addr).unwrap(), keychain.identifier());
	}

	#[test]
	fn address_rejects_unknown_version() {
		// a mainnet address fails the version check, not the checksum
		match decode_address("1PfJpZsjreyVrqeoAfabrRwwjQyoSQMmHH") {
			Err(Error::UnknownVersion(0x00)) => {}
			other => panic!("unexpected result {:?}", other),
		}
	}

	#[test]
	fn sign_verifies() {
		let keychain = Keychain::from_secret_slice(&test_secret()).unwrap();
		let digest = sparv_util::hash256(b"spend it");
		let der = keychain.sign(&digest).unwrap();

		let secp = sparv_util::static_secp_instance();
		let secp = secp.lock();
		let msg = Message::from_slice(&digest).unwrap();
		let sig = Signature::from_der(&der).unwrap();
		let public = PublicKey::from_slice(&keychain.public_key_bytes()).unwrap();
		assert!(secp.verify(&msg, &sig, &public).is_ok());
	}

	#[test]
	fn key_file_read_or_create() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join(KEY_FILE);

		let created = Keychain::from_file(&path).unwrap();
		assert!(path.exists());

		let reread = Keychain::from_file(&path).unwrap();
		assert_eq!(created.identifier(), reread.identifier());
		assert_eq!(created.address(), reread.address());
	}

	#[test]
	fn random_keys_differ() {
		let a = Keychain::from_random().unwrap();
		let b = Keychain::from_random().unwrap();
		assert_ne!(a.identifier(), b.identifier());
	}
}
