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

//! Script opcodes and the few locking script shapes the wallet emits
//! and recognizes. No interpreter lives here, only byte emission.

/// Duplicates the top stack item.
pub const OP_DUP: u8 = 0x76;

/// Pops the top two stack items and pushes their equality.
pub const OP_EQUAL: u8 = 0x87;

/// OP_EQUAL, then fails the script unless the result was true.
pub const OP_EQUALVERIFY: u8 = 0x88;

/// SHA-256 then RIPEMD-160 of the top stack item.
pub const OP_HASH160: u8 = 0xa9;

/// ECDSA signature check against a public key.
pub const OP_CHECKSIG: u8 = 0xac;

/// Emit the push opcode for `data` followed by the data itself: a bare
/// length byte up to 75 bytes, the PUSHDATA1/2/4 forms above that.
/// PUSHDATA2/PUSHDATA4 lengths go out big-endian, matching the
/// wallet's historical wire output rather than the script standard.
pub fn push_data(data: &[u8]) -> Vec<u8> {
	let len = data.len();
	let mut out = Vec::with_capacity(len + 5);
	if len <= 75 {
		out.push(len as u8);
	} else if len <= 0xff {
		out.push(0x4c);
		out.push(len as u8);
	} else if len <= 0xffff {
		out.push(0x4d);
		out.extend_from_slice(&(len as u16).to_be_bytes());
	} else {
		out.push(0x4e);
		out.extend_from_slice(&(len as u32).to_be_bytes());
	}
	out.extend_from_slice(data);
	out
}

/// P2PKH locking script paying the given public key hash:
/// `OP_DUP OP_HASH160 <push20> OP_EQUALVERIFY OP_CHECKSIG`.
pub fn p2pkh(key_hash: &[u8; 20]) -> Vec<u8> {
	let mut s = vec![OP_DUP, OP_HASH160];
	s.extend_from_slice(&push_data(&key_hash[..]));
	s.push(OP_EQUALVERIFY);
	s.push(OP_CHECKSIG);
	s
}

/// P2SH locking script paying the given script hash:
/// `OP_HASH160 <push20> OP_EQUAL`.
pub fn p2sh(script_hash: &[u8; 20]) -> Vec<u8> {
	let mut s = vec![OP_HASH160];
	s.extend_from_slice(&push_data(&script_hash[..]));
	s.push(OP_EQUAL);
	s
}

/// Whether `script` opens with the P2PKH prefix paying `key_hash`,
/// i.e. `OP_DUP OP_HASH160 <push20 key_hash>`.
pub fn is_p2pkh_to(script: &[u8], key_hash: &[u8; 20]) -> bool {
	let mut prefix = vec![OP_DUP, OP_HASH160];
	prefix.extend_from_slice(&push_data(&key_hash[..]));
	script.starts_with(&prefix)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn push_small() {
		assert_eq!(push_data(&[0xaa, 0xbb]), vec![0x02, 0xaa, 0xbb]);
		let d75 = vec![7u8; 75];
		let enc = push_data(&d75);
		assert_eq!(enc[0], 75);
		assert_eq!(enc.len(), 76);
	}

	#[test]
	fn push_data1() {
		let d = vec![7u8; 76];
		let enc = push_data(&d);
		assert_eq!(&enc[..2], &[0x4c, 76]);
		assert_eq!(enc.len(), 78);
	}

	#[test]
	fn push_data2_is_big_endian() {
		let d = vec![7u8; 300];
		let enc = push_data(&d);
		// 300 = 0x012c, length bytes high-order first
		assert_eq!(&enc[..3], &[0x4d, 0x01, 0x2c]);
		assert_eq!(enc.len(), 303);
	}

	#[test]
	fn push_data4_is_big_endian() {
		let d = vec![7u8; 0x1_0000];
		let enc = push_data(&d);
		assert_eq!(&enc[..5], &[0x4e, 0x00, 0x01, 0x00, 0x00]);
		assert_eq!(enc.len(), 0x1_0000 + 5);
	}

	#[test]
	fn p2pkh_layout() {
		let hash = [0x11u8; 20];
		let s = p2pkh(&hash);
		assert_eq!(s.len(), 25);
		assert_eq!(s[0], OP_DUP);
		assert_eq!(s[1], OP_HASH160);
		assert_eq!(s[2], 20);
		assert_eq!(&s[3..23], &hash[..]);
		assert_eq!(s[23], OP_EQUALVERIFY);
		assert_eq!(s[24], OP_CHECKSIG);
		assert!(is_p2pkh_to(&s, &hash));
		assert!(!is_p2pkh_to(&s, &[0x22u8; 20]));
	}

	#[test]
	fn p2sh_layout() {
		let hash = [0x33u8; 20];
		let s = p2sh(&hash);
		assert_eq!(s.len(), 23);
		assert_eq!(s[0], OP_HASH160);
		assert_eq!(s[1], 20);
		assert_eq!(&s[2..22], &hash[..]);
		assert_eq!(s[22], OP_EQUAL);
		// a p2sh script is not a p2pkh one
		assert!(!is_p2pkh_to(&s, &hash));
	}
}
