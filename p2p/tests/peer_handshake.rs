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

//! Handshake and sync engine tests against a mock peer on a real
//! socket.

use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use sparv_core::core::hash::{Hash, ZERO_HASH};
use sparv_core::core::transaction::{Transaction, TxOut};
use sparv_core::ser;
use sparv_p2p::handshake::Handshake;
use sparv_p2p::msg::{self, Getdata, Inv, InvType, InvVect, Merkleblock, Message, Version};
use sparv_p2p::types::P2PConfig;
use sparv_p2p::{Error, Syncer};

fn read_frame(stream: &mut TcpStream) -> (String, Vec<u8>) {
	let header = msg::read_header(stream).unwrap();
	let body = msg::read_body(&header, stream).unwrap();
	(header.command_str(), body)
}

fn mock_version(start_height: u32) -> Version {
	let mut version = Version::ours(7);
	version.start_height = start_height;
	version
}

// The engine must emit version first, answer the peer's version with a
// verack, and settle once both the peer's version and verack are in.
#[test]
fn peer_handshake() {
	let listener = TcpListener::bind("127.0.0.1:0").unwrap();
	let addr = listener.local_addr().unwrap();

	let mock = thread::spawn(move || {
		let (mut stream, _) = listener.accept().unwrap();

		// our version must be the first thing on the wire
		let (command, body) = read_frame(&mut stream);
		assert_eq!(command, "version");
		let version: Version = ser::deserialize(&mut &body[..]).unwrap();
		assert_eq!(version.version, 70015);
		assert_eq!(version.services, 1);
		assert!(version.user_agent.is_empty());
		assert!(!version.relay);

		msg::write_message(&mut stream, &Message::Version(mock_version(1_500_000))).unwrap();
		msg::write_message(&mut stream, &Message::Verack).unwrap();

		// the verack answering our version
		let (command, _) = read_frame(&mut stream);
		assert_eq!(command, "verack");
	});

	let mut stream = TcpStream::connect(addr).unwrap();
	let info = Handshake::new().connect(&mut stream).unwrap();
	assert_eq!(info.version, 70015);
	assert_eq!(info.start_height, 1_500_000);
	mock.join().unwrap();
}

#[test]
fn handshake_times_out_on_silent_peer() {
	let listener = TcpListener::bind("127.0.0.1:0").unwrap();
	let addr = listener.local_addr().unwrap();

	let mock = thread::spawn(move || {
		let (stream, _) = listener.accept().unwrap();
		// say nothing, hold the socket open past the deadline
		thread::sleep(Duration::from_secs(7));
		drop(stream);
	});

	let mut stream = TcpStream::connect(addr).unwrap();
	match Handshake::new().connect(&mut stream) {
		Err(Error::Timeout) => {}
		other => panic!("unexpected result {:?}", other.map(|info| info.start_height)),
	}
	mock.join().unwrap();
}

#[test]
fn handshake_times_out_without_verack() {
	let listener = TcpListener::bind("127.0.0.1:0").unwrap();
	let addr = listener.local_addr().unwrap();

	let mock = thread::spawn(move || {
		let (mut stream, _) = listener.accept().unwrap();
		let (command, _) = read_frame(&mut stream);
		assert_eq!(command, "version");
		// version but never a verack
		msg::write_message(&mut stream, &Message::Version(mock_version(0))).unwrap();
		let (command, _) = read_frame(&mut stream);
		assert_eq!(command, "verack");
		thread::sleep(Duration::from_secs(7));
		drop(stream);
	});

	let mut stream = TcpStream::connect(addr).unwrap();
	match Handshake::new().connect(&mut stream) {
		Err(Error::Timeout) => {}
		other => panic!("unexpected result {:?}", other.map(|info| info.start_height)),
	}
	mock.join().unwrap();
}

// Full happy path: filterload before getblocks, inv answered with a
// filtered-block getdata, one merkleblock, then the matched
// transaction fetched over getdata.
#[test]
fn sync_downloads_block_and_fetches_tx() {
	let listener = TcpListener::bind("127.0.0.1:0").unwrap();
	let addr = listener.local_addr().unwrap();

	let tx = Transaction {
		version: 1,
		inputs: vec![],
		outputs: vec![TxOut {
			value: 1_000,
			pk_script: vec![0x6a],
		}],
		lock_time: 0,
	};
	let txid = tx.id();
	let block = Merkleblock {
		version: 2,
		prev_block: ZERO_HASH,
		merkle_root: txid,
		timestamp: 1_555_000_000,
		bits: 0x1d00_ffff,
		nonce: 9,
		total_txs: 1,
		hashes: vec![txid],
		flags: vec![0x01],
	};

	let mock_tx = tx.clone();
	let mock_block = block.clone();
	let mock = thread::spawn(move || {
		let (mut stream, _) = listener.accept().unwrap();

		// handshake
		let (command, _) = read_frame(&mut stream);
		assert_eq!(command, "version");
		msg::write_message(&mut stream, &Message::Version(mock_version(1_500_000))).unwrap();
		msg::write_message(&mut stream, &Message::Verack).unwrap();
		let (command, _) = read_frame(&mut stream);
		assert_eq!(command, "verack");

		// the filter always lands before the first getblocks
		let (command, _) = read_frame(&mut stream);
		assert_eq!(command, "filterload");
		let (command, _) = read_frame(&mut stream);
		assert_eq!(command, "getblocks");

		// announce one block; it must come back as a filtered request
		let announce = Message::Inv(Inv {
			inventory: vec![InvVect {
				inv_type: InvType::Block,
				hash: mock_block.block_hash(),
			}],
		});
		msg::write_message(&mut stream, &announce).unwrap();

		let (command, body) = read_frame(&mut stream);
		assert_eq!(command, "getdata");
		let getdata: Getdata = ser::deserialize(&mut &body[..]).unwrap();
		assert_eq!(getdata.inventory.len(), 1);
		assert_eq!(getdata.inventory[0].inv_type, InvType::FilteredBlock);
		assert_eq!(getdata.inventory[0].hash, mock_block.block_hash());

		msg::write_message(&mut stream, &Message::Merkleblock(mock_block)).unwrap();

		// the engine validates the block, then asks for the tx
		let (command, body) = read_frame(&mut stream);
		assert_eq!(command, "getdata");
		let getdata: Getdata = ser::deserialize(&mut &body[..]).unwrap();
		assert_eq!(getdata.inventory.len(), 1);
		assert_eq!(getdata.inventory[0].inv_type, InvType::Tx);
		assert_eq!(getdata.inventory[0].hash, txid);

		msg::write_message(&mut stream, &Message::Tx(mock_tx)).unwrap();
	});

	let config = P2PConfig {
		peer_addr: addr.to_string(),
		anchor_hash: Hash([0x10; 32]),
		anchor_height: 1_499_999,
	};
	let mut syncer = Syncer::new(config);
	let (_peer, result) = syncer.run(&[0xaa; 20]).unwrap();

	assert_eq!(result.blocks.len(), 1);
	assert_eq!(result.blocks[0].block_hash(), block.block_hash());
	assert_eq!(result.txs.len(), 1);
	assert_eq!(result.txs[0].id(), txid);
	mock.join().unwrap();
}

// With nothing advertised above the anchor height there is nothing to
// download or fetch.
#[test]
fn sync_with_no_new_blocks() {
	let listener = TcpListener::bind("127.0.0.1:0").unwrap();
	let addr = listener.local_addr().unwrap();

	let mock = thread::spawn(move || {
		let mut stream = read_handshake_then_filter(&listener);
		// nothing more to offer
		let (command, _) = read_frame(&mut stream);
		assert_eq!(command, "getblocks");
	});

	let config = P2PConfig {
		peer_addr: addr.to_string(),
		anchor_hash: Hash([0x10; 32]),
		anchor_height: 1_500_000,
	};
	let mut syncer = Syncer::new(config);
	let (_peer, result) = syncer.run(&[0xaa; 20]).unwrap();
	assert!(result.blocks.is_empty());
	assert!(result.txs.is_empty());
	mock.join().unwrap();
}

fn read_handshake_then_filter(listener: &TcpListener) -> TcpStream {
	let (mut stream, _) = listener.accept().unwrap();
	let (command, _) = read_frame(&mut stream);
	assert_eq!(command, "version");
	msg::write_message(&mut stream, &Message::Version(mock_version(1_500_000))).unwrap();
	msg::write_message(&mut stream, &Message::Verack).unwrap();
	let (command, _) = read_frame(&mut stream);
	assert_eq!(command, "verack");
	let (command, _) = read_frame(&mut stream);
	assert_eq!(command, "filterload");
	stream
}
