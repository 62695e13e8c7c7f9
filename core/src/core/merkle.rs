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

//! Verification of the partial Merkle tree carried by a filtered
//! block. Reconstructs the root from the hash and flag lists and
//! reports which leaves the peer's filter matched. The caller accepts
//! the block only when the reconstructed root equals the one in the
//! block header.

use std::slice;

use sparv_util::hash256;

use crate::core::hash::Hash;
use crate::ser::Error;

/// Expand flag bytes into their bit list, least significant bit of
/// each byte first.
pub fn flag_bits(flags: &[u8]) -> Vec<bool> {
	let mut bits = Vec::with_capacity(flags.len() * 8);
	for byte in flags {
		for i in 0..8 {
			bits.push(byte >> i & 1 == 1);
		}
	}
	bits
}

/// Walk the partial tree depth-first, reconstructing the root and
/// collecting the matched leaf hashes. Fails with CorruptedData when
/// the hash or flag list runs out mid-walk.
pub fn extract_matches(
	total_txs: u32,
	hashes: &[Hash],
	flags: &[bool],
) -> Result<(Hash, Vec<Hash>), Error> {
	if total_txs == 0 {
		return Err(Error::CorruptedData);
	}
	let mut height = 0;
	while tree_width(total_txs, height) > 1 {
		height += 1;
	}
	let mut cursor = Cursor {
		hashes: hashes.iter(),
		flags: flags.iter(),
		matched: vec![],
	};
	let root = traverse(&mut cursor, total_txs, height, 0)?;
	Ok((root, cursor.matched))
}

/// Number of nodes at the given height of a tree over `total_txs`
/// leaves.
fn tree_width(total_txs: u32, height: u32) -> u32 {
	(total_txs + (1 << height) - 1) >> height
}

struct Cursor<'a> {
	hashes: slice::Iter<'a, Hash>,
	flags: slice::Iter<'a, bool>,
	matched: Vec<Hash>,
}

impl<'a> Cursor<'a> {
	fn next_flag(&mut self) -> Result<bool, Error> {
		self.flags.next().cloned().ok_or(Error::CorruptedData)
	}

	fn next_hash(&mut self) -> Result<Hash, Error> {
		self.hashes.next().cloned().ok_or(Error::CorruptedData)
	}
}

fn traverse(cursor: &mut Cursor<'_>, total_txs: u32, height: u32, pos: u32) -> Result<Hash, Error> {
	if !cursor.next_flag()? {
		// opaque subtree, its hash stands in for everything below
		return cursor.next_hash();
	}
	if height == 0 {
		// matched leaf
		let hash = cursor.next_hash()?;
		cursor.matched.push(hash);
		return Ok(hash);
	}
	let left = traverse(cursor, total_txs, height - 1, pos * 2)?;
	let right = if pos * 2 + 1 < tree_width(total_txs, height - 1) {
		traverse(cursor, total_txs, height - 1, pos * 2 + 1)?
	} else {
		// odd width, the last node pairs with itself
		left
	};
	let mut buf = [0u8; 64];
	buf[..32].copy_from_slice(&left.0);
	buf[32..].copy_from_slice(&right.0);
	Ok(Hash(hash256(&buf)))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn leaf(fill: u8) -> Hash {
		Hash([fill; 32])
	}

	fn parent(left: &Hash, right: &Hash) -> Hash {
		let mut buf = [0u8; 64];
		buf[..32].copy_from_slice(&left.0);
		buf[32..].copy_from_slice(&right.0);
		Hash(hash256(&buf))
	}

	#[test]
	fn single_tx_block() {
		// one transaction, matched: the leaf is the root
		let txid = leaf(0x42);
		let (root, matched) = extract_matches(1, &[txid], &[true]).unwrap();
		assert_eq!(root, txid);
		assert_eq!(matched, vec![txid]);
	}

	#[test]
	fn single_tx_block_unmatched() {
		let txid = leaf(0x42);
		let (root, matched) = extract_matches(1, &[txid], &[false]).unwrap();
		assert_eq!(root, txid);
		assert!(matched.is_empty());
	}

	#[test]
	fn two_txs_second_matched() {
		// tree: root = H(l0 || l1); l1 matched, l0 opaque.
		// depth-first flags: root=1, l0=0, l1=1; hashes: l0, l1.
		let l0 = leaf(1);
		let l1 = leaf(2);
		let (root, matched) =
			extract_matches(2, &[l0, l1], &[true, false, true]).unwrap();
		assert_eq!(root, parent(&l0, &l1));
		assert_eq!(matched, vec![l1]);
	}

	#[test]
	fn three_txs_duplicate_last() {
		// leaves l0 l1 l2; width 3 at height 0, so p1 = H(l2 || l2).
		// match l2: flags root=1, p0=0, p1=1, l2=1; hashes: p0, l2.
		let l0 = leaf(1);
		let l1 = leaf(2);
		let l2 = leaf(3);
		let p0 = parent(&l0, &l1);
		let p1 = parent(&l2, &l2);
		let expected_root = parent(&p0, &p1);

		let (root, matched) =
			extract_matches(3, &[p0, l2], &[true, false, true, true]).unwrap();
		assert_eq!(root, expected_root);
		assert_eq!(matched, vec![l2]);
	}

	#[test]
	fn five_txs_two_matched() {
		// 5 leaves -> heights 0..3. Match l1 and l4.
		let leaves: Vec<Hash> = (1..=5).map(leaf).collect();
		let p01 = parent(&leaves[0], &leaves[1]);
		let p23 = parent(&leaves[2], &leaves[3]);
		let p44 = parent(&leaves[4], &leaves[4]);
		let q0 = parent(&p01, &p23);
		let q1 = parent(&p44, &p44);
		let expected_root = parent(&q0, &q1);

		// depth-first: root=1
		//   q0=1: p01=1 (l0=0 opaque, l1=1 matched), p23=0 opaque
		//   q1=1: p44=1: l4=1 matched (no right sibling at width 5)
		let flags = [
			true, // root
			true, // q0
			true, // p01
			false, // l0
			true, // l1
			false, // p23
			true, // q1
			true, // p44
			true, // l4
		];
		let hashes = [leaves[0], leaves[1], p23, leaves[4]];
		let (root, matched) = extract_matches(5, &hashes, &flags).unwrap();
		assert_eq!(root, expected_root);
		assert_eq!(matched, vec![leaves[1], leaves[4]]);
	}

	#[test]
	fn exhausted_cursors_fail() {
		assert!(extract_matches(2, &[leaf(1)], &[true, true]).is_err());
		assert!(extract_matches(2, &[leaf(1), leaf(2)], &[true]).is_err());
		assert!(extract_matches(0, &[], &[]).is_err());
	}

	#[test]
	fn flag_bit_order() {
		assert_eq!(
			flag_bits(&[0b0000_0101]),
			vec![true, false, true, false, false, false, false, false]
		);
		assert!(flag_bits(&[]).is_empty());
	}
}
