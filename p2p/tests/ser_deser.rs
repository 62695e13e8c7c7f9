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

//! Wire message serialization tests

use sparv_core::consensus::MAGIC;
use sparv_core::core::hash::{Hash, ZERO_HASH};
use sparv_core::ser;
use sparv_p2p::msg::{
	command_name, frame_message, payload, Filterload, Getblocks, Getdata, Inv, InvType, InvVect,
	Merkleblock, Message, MessageHeader, NetAddr, Reject, Version, HEADER_LEN, INVVECT_LEN,
	NETADDR_LEN,
};
use sparv_util::hash256;

#[test]
fn netaddr_wire_layout() {
	let mut ip = [0u8; 16];
	ip[10] = 0xff;
	ip[11] = 0xff;
	ip[12] = 0x7f;
	ip[15] = 0x01;
	let addr = NetAddr {
		services: 1,
		ip,
		port: 256,
	};
	let vec = ser::ser_vec(&addr).unwrap();
	assert_eq!(vec.len(), NETADDR_LEN);
	assert_eq!(&vec[..8], &[0x01, 0, 0, 0, 0, 0, 0, 0]);
	assert_eq!(&vec[8..24], &ip[..]);
	// the port is the one big-endian field
	assert_eq!(&vec[24..], &[0x01, 0x00]);

	let decoded: NetAddr = ser::deserialize(&mut &vec[..]).unwrap();
	assert_eq!(decoded, addr);
}

#[test]
fn loopback_netaddr_is_v4_mapped() {
	let addr = NetAddr::loopback(8333);
	assert_eq!(&addr.ip[10..], &[0xff, 0xff, 127, 0, 0, 1]);
}

#[test]
fn header_frames_payload() {
	let body = payload(&Message::Verack).unwrap();
	assert!(body.is_empty());

	let header = MessageHeader::new("verack", &body);
	let vec = ser::ser_vec(&header).unwrap();
	assert_eq!(vec.len(), HEADER_LEN);
	// testnet magic, little-endian
	assert_eq!(&vec[..4], &[0x0b, 0x11, 0x09, 0x07]);
	// command, zero padded to 12
	assert_eq!(&vec[4..16], b"verack\0\0\0\0\0\0");
	assert_eq!(&vec[16..20], &[0, 0, 0, 0]);
	// checksum of the empty payload
	assert_eq!(&vec[20..24], &hash256(&[])[..4]);

	let decoded: MessageHeader = ser::deserialize(&mut &vec[..]).unwrap();
	assert_eq!(decoded.magic, MAGIC);
	assert_eq!(decoded.command_str(), "verack");
	assert_eq!(decoded, header);
}

#[test]
fn header_checksum_matches_payload_hash() {
	let getblocks = Message::Getblocks(Getblocks::new(vec![Hash([0x77; 32])]));
	let body = payload(&getblocks).unwrap();
	let header = MessageHeader::new(command_name(&getblocks), &body);
	assert_eq!(header.length as usize, body.len());
	assert_eq!(&header.checksum[..], &hash256(&body)[..4]);
}

#[test]
fn framed_message_is_header_then_payload() {
	let message = Message::Inv(Inv {
		inventory: vec![InvVect {
			inv_type: InvType::Tx,
			hash: Hash([0x12; 32]),
		}],
	});
	let framed = frame_message(&message).unwrap();
	let body = payload(&message).unwrap();
	assert_eq!(framed.len(), HEADER_LEN + body.len());
	assert_eq!(&framed[HEADER_LEN..], &body[..]);
}

#[test]
fn version_roundtrip() {
	let version = Version::ours(0x0102_0304_0506_0708);
	let vec = ser::ser_vec(&version).unwrap();
	// fixed fields + empty user agent varstr + height + relay
	assert_eq!(vec.len(), 4 + 8 + 8 + 26 + 26 + 8 + 1 + 4 + 1);
	let decoded: Version = ser::deserialize(&mut &vec[..]).unwrap();
	assert_eq!(decoded, version);
	assert!(!decoded.relay);
	assert_eq!(decoded.start_height, 0);
}

#[test]
fn invvect_wire_layout() {
	let vect = InvVect {
		inv_type: InvType::FilteredBlock,
		hash: Hash([0x99; 32]),
	};
	let vec = ser::ser_vec(&vect).unwrap();
	assert_eq!(vec.len(), INVVECT_LEN);
	assert_eq!(&vec[..4], &[0x03, 0, 0, 0]);
	let decoded: InvVect = ser::deserialize(&mut &vec[..]).unwrap();
	assert_eq!(decoded, vect);
}

#[test]
fn invvect_rejects_unknown_type() {
	let mut vec = ser::ser_vec(&InvVect {
		inv_type: InvType::Tx,
		hash: ZERO_HASH,
	})
	.unwrap();
	vec[0] = 0x09;
	let decoded: Result<InvVect, _> = ser::deserialize(&mut &vec[..]);
	assert!(decoded.is_err());
}

#[test]
fn inv_roundtrip_and_getdata_filter() {
	let inv = Inv {
		inventory: vec![
			InvVect {
				inv_type: InvType::Block,
				hash: Hash([1; 32]),
			},
			InvVect {
				inv_type: InvType::Tx,
				hash: Hash([2; 32]),
			},
		],
	};
	let vec = ser::ser_vec(&inv).unwrap();
	assert_eq!(vec.len(), 1 + 2 * INVVECT_LEN);
	let decoded: Inv = ser::deserialize(&mut &vec[..]).unwrap();
	assert_eq!(decoded, inv);

	let getdata = Getdata::new(inv.inventory);
	let txs = getdata.filter_inventory(InvType::Tx);
	assert_eq!(txs.len(), 1);
	assert_eq!(txs[0].hash, Hash([2; 32]));
	assert!(getdata.filter_inventory(InvType::CompactBlock).is_empty());
}

#[test]
fn getblocks_wire_layout() {
	let locator = Hash([0x55; 32]);
	let getblocks = Getblocks::new(vec![locator]);
	let vec = ser::ser_vec(&getblocks).unwrap();
	// version + count varint + locator + hash_stop
	assert_eq!(vec.len(), 4 + 1 + 32 + 32);
	assert_eq!(vec[4], 1);
	assert_eq!(&vec[5..37], &[0x55; 32][..]);
	assert_eq!(&vec[37..], &[0x00; 32][..]);
}

#[test]
fn filterload_sets_expected_bits() {
	let query = [0xaa_u8; 20];
	let filterload = Filterload::new(64, 3, &[&query[..]], 0xdead_beef);
	assert_eq!(filterload.n_flags, 1);
	assert_eq!(filterload.n_tweak, 0xdead_beef);
	assert_eq!(filterload.filter.len(), 64);

	// at least one and at most n_hash_funcs bits are set
	let set_bits: u32 = filterload.filter.iter().map(|b| b.count_ones()).sum();
	assert!(set_bits >= 1 && set_bits <= 3);

	// deterministic for a fixed tweak
	let again = Filterload::new(64, 3, &[&query[..]], 0xdead_beef);
	assert_eq!(again.filter, filterload.filter);

	// a different tweak moves the bits
	let moved = Filterload::new(64, 3, &[&query[..]], 0xdead_bee0);
	assert_ne!(moved.filter, filterload.filter);

	let vec = ser::ser_vec(&filterload).unwrap();
	// varint(64) + filter + n_hash_funcs + n_tweak + n_flags
	assert_eq!(vec.len(), 1 + 64 + 4 + 4 + 1);
	assert_eq!(vec[0], 64);
	assert_eq!(&vec[65..69], &[3, 0, 0, 0]);
	assert_eq!(&vec[69..73], &[0xef, 0xbe, 0xad, 0xde]);
	assert_eq!(vec[73], 1);
}

#[test]
fn merkleblock_roundtrip() {
	let block = Merkleblock {
		version: 0x2000_0000,
		prev_block: Hash([0x01; 32]),
		merkle_root: Hash([0x02; 32]),
		timestamp: 1_555_555_555,
		bits: 0x1d00_ffff,
		nonce: 42,
		total_txs: 7,
		hashes: vec![Hash([0x03; 32]), Hash([0x04; 32])],
		flags: vec![0x1d],
	};
	let vec = ser::ser_vec(&block).unwrap();
	// 80 header bytes + total + varint + hashes + flags varstr
	assert_eq!(vec.len(), 80 + 4 + 1 + 64 + 2);
	let decoded: Merkleblock = ser::deserialize(&mut &vec[..]).unwrap();
	assert_eq!(decoded, block);

	// the block hash covers exactly the 80 header bytes
	assert_eq!(block.block_hash(), Hash(hash256(&vec[..80])));
}

#[test]
fn single_tx_merkleblock_validates() {
	let txid = Hash([0x42; 32]);
	let block = Merkleblock {
		version: 2,
		prev_block: ZERO_HASH,
		merkle_root: txid,
		timestamp: 0,
		bits: 0,
		nonce: 0,
		total_txs: 1,
		hashes: vec![txid],
		flags: vec![0x01],
	};
	assert_eq!(block.validate(), vec![txid]);

	// a mismatching root contributes no matches
	let mut bad = block;
	bad.merkle_root = Hash([0x43; 32]);
	assert!(bad.validate().is_empty());
}

#[test]
fn reject_parses_trailing_data() {
	let mut payload_bytes = vec![];
	payload_bytes.push(2);
	payload_bytes.extend_from_slice(b"tx");
	payload_bytes.push(0x10);
	payload_bytes.push(7);
	payload_bytes.extend_from_slice(b"invalid");
	payload_bytes.extend_from_slice(&[0xab; 32]);

	let reject = Reject::from_payload(&payload_bytes).unwrap();
	assert_eq!(reject.message, b"tx".to_vec());
	assert_eq!(reject.code, 0x10);
	assert_eq!(reject.reason, b"invalid".to_vec());
	assert_eq!(reject.data, vec![0xab; 32]);

	let shown = format!("{}", reject);
	assert!(shown.contains("0x10"));
	assert!(shown.contains("invalid"));
}

#[test]
fn reject_roundtrip() {
	let reject = Reject {
		message: b"tx".to_vec(),
		code: 0x42,
		reason: b"dust".to_vec(),
		data: vec![0x01, 0x02],
	};
	let vec = ser::ser_vec(&reject).unwrap();
	let decoded = Reject::from_payload(&vec).unwrap();
	assert_eq!(decoded, reject);
}
