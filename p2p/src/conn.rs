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

//! Provides a connection wrapper that handles the lower level tasks of
//! sending and receiving framed messages on the TCP socket. One writer
//! thread owns all sends, one reader thread parses inbound messages
//! and fans them out to a bounded queue per message kind, preserving
//! receive order.

use std::io::Write;
use std::net::TcpStream;
use std::sync::mpsc;
use std::thread;

use log::{debug, trace};

use sparv_core::core::Transaction;
use sparv_core::ser;

use crate::msg::{self, Getdata, InvType, InvVect, Merkleblock, Message, Reject};
use crate::types::Error;

/// Capacity of each per-kind inbound queue.
const RECV_CHANNEL_CAP: usize = 128;

/// Capacity of the outbound write queue.
const SEND_CHANNEL_CAP: usize = 16;

/// A running connection. Sends are queued to the writer thread, so
/// they never interleave; inbound messages arrive on the per-kind
/// receivers in the order the peer sent them.
pub struct Conn {
	send_tx: mpsc::SyncSender<Vec<u8>>,
	/// merkleblocks, in receive order
	pub blocks_rx: mpsc::Receiver<Merkleblock>,
	/// transactions, in receive order
	pub txs_rx: mpsc::Receiver<Transaction>,
	/// getdata requests from the peer (the broadcast flow answers
	/// these)
	pub getdatas_rx: mpsc::Receiver<Getdata>,
	/// reject notices from the peer
	pub rejects_rx: mpsc::Receiver<Reject>,
}

struct Queues {
	reply_tx: mpsc::SyncSender<Vec<u8>>,
	blocks_tx: mpsc::SyncSender<Merkleblock>,
	txs_tx: mpsc::SyncSender<Transaction>,
	getdatas_tx: mpsc::SyncSender<Getdata>,
	rejects_tx: mpsc::SyncSender<Reject>,
}

impl Conn {
	/// Start the reader and writer threads over a connected,
	/// handshaked stream and return the wrapper.
	pub fn listen(stream: TcpStream) -> Result<Conn, Error> {
		let (send_tx, send_rx) = mpsc::sync_channel::<Vec<u8>>(SEND_CHANNEL_CAP);
		let (blocks_tx, blocks_rx) = mpsc::sync_channel(RECV_CHANNEL_CAP);
		let (txs_tx, txs_rx) = mpsc::sync_channel(RECV_CHANNEL_CAP);
		let (getdatas_tx, getdatas_rx) = mpsc::sync_channel(RECV_CHANNEL_CAP);
		let (rejects_tx, rejects_rx) = mpsc::sync_channel(RECV_CHANNEL_CAP);

		let mut write_stream = stream.try_clone()?;
		thread::Builder::new()
			.name("peer-write".to_string())
			.spawn(move || {
				for data in send_rx {
					if let Err(e) = write_stream.write_all(&data) {
						debug!("peer-write: connection lost: {}", e);
						break;
					}
				}
			})?;

		let queues = Queues {
			reply_tx: send_tx.clone(),
			blocks_tx,
			txs_tx,
			getdatas_tx,
			rejects_tx,
		};
		let mut read_stream = stream;
		thread::Builder::new()
			.name("peer-read".to_string())
			.spawn(move || {
				if let Err(e) = read_loop(&mut read_stream, &queues) {
					debug!("peer-read: stopping: {}", e);
				}
			})?;

		Ok(Conn {
			send_tx,
			blocks_rx,
			txs_rx,
			getdatas_rx,
			rejects_rx,
		})
	}

	/// Queue a message for the writer thread.
	pub fn send(&self, message: &Message) -> Result<(), Error> {
		let data = msg::frame_message(message)?;
		self.send_tx
			.send(data)
			.map_err(|_| Error::ConnectionClose)?;
		trace!("queued {}", msg::command_name(message));
		Ok(())
	}
}

/// Read framed messages until the socket or a queue goes away. Codec
/// errors in a recognized message are fatal to the connection.
fn read_loop(stream: &mut TcpStream, queues: &Queues) -> Result<(), Error> {
	loop {
		let header = msg::read_header(stream)?;
		let body = msg::read_body(&header, stream)?;
		if !dispatch(&header.command_str(), &body, queues)? {
			return Ok(());
		}
	}
}

/// Hand one inbound message to its queue. Returns false once the
/// receiving side is gone and the thread should stop.
fn dispatch(command: &str, body: &[u8], queues: &Queues) -> Result<bool, Error> {
	match command {
		"inv" => {
			let inv: msg::Inv = ser::deserialize(&mut &body[..])?;
			// ask for everything announced; blocks must come back as
			// filtered blocks, transactions stay as they are
			let inventory: Vec<InvVect> = inv
				.inventory
				.into_iter()
				.map(|vect| match vect.inv_type {
					InvType::Block => InvVect {
						inv_type: InvType::FilteredBlock,
						hash: vect.hash,
					},
					_ => vect,
				})
				.collect();
			let reply = msg::frame_message(&Message::Getdata(Getdata::new(inventory)))?;
			Ok(queues.reply_tx.send(reply).is_ok())
		}
		"merkleblock" => {
			let block: Merkleblock = ser::deserialize(&mut &body[..])?;
			Ok(queues.blocks_tx.send(block).is_ok())
		}
		"tx" => {
			let tx: Transaction = ser::deserialize(&mut &body[..])?;
			Ok(queues.txs_tx.send(tx).is_ok())
		}
		"getdata" => {
			let getdata: Getdata = ser::deserialize(&mut &body[..])?;
			Ok(queues.getdatas_tx.send(getdata).is_ok())
		}
		"reject" => {
			let reject = Reject::from_payload(body)?;
			debug!("peer sent reject: {}", reject);
			// advisory outside the broadcast flow, never worth
			// blocking the reader over
			let _ = queues.rejects_tx.try_send(reject);
			Ok(true)
		}
		other => {
			trace!("ignoring {}", other);
			Ok(true)
		}
	}
}
