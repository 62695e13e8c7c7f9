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

//! The SPV synchronization engine. Drives the Bloom-filtered block
//! walk against the peer, validates each block's partial Merkle tree,
//! fetches the matched transactions, and handles the inv/getdata
//! broadcast handshake for a freshly built transaction.

use std::sync::mpsc::{RecvTimeoutError, TryRecvError};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use rand::rngs::OsRng;
use rand::RngCore;

use sparv_core::core::hash::{sub_ids, Hash};
use sparv_core::core::Transaction;

use crate::msg::{Filterload, Getblocks, Getdata, Inv, InvType, InvVect, Merkleblock, Message};
use crate::peer::Peer;
use crate::types::{Error, P2PConfig, BLOCK_IDLE_TIMEOUT, TX_IDLE_TIMEOUT};

/// Bloom filter size in bytes.
const FILTER_SIZE: u32 = 1024;

/// Number of Bloom hash functions.
const FILTER_HASH_FUNCS: u32 = 10;

/// A getblocks round yields at most this many inventory entries.
const GETBLOCKS_BATCH: usize = 500;

/// How long the broadcaster waits for the peer to ask for the
/// announced transaction.
const BROADCAST_TIMEOUT: Duration = Duration::from_secs(30);

/// Quiet period after the transaction handover; no reject within it
/// counts as acceptance.
const REJECT_GRACE: Duration = Duration::from_secs(5);

/// Poll tick while watching two inbound queues at once.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Phases of the synchronization, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
	/// nothing has happened yet
	Idle,
	/// dialing and exchanging version/verack
	Handshaking,
	/// Bloom filter loaded, first getblocks sent
	Filtered,
	/// accumulating merkleblocks
	Downloading,
	/// fetching the transactions matched by the validated blocks
	Fetching,
	/// everything collected
	Done,
}

/// Everything a completed sync accumulated.
pub struct SyncResult {
	/// merkleblocks in arrival order
	pub blocks: Vec<Merkleblock>,
	/// transactions matched by the filter, deduplicated by id
	pub txs: Vec<Transaction>,
}

/// Drives a full synchronization round against a single peer.
pub struct Syncer {
	config: P2PConfig,
	status: SyncStatus,
}

impl Syncer {
	/// A new idle syncer for the given connection configuration.
	pub fn new(config: P2PConfig) -> Syncer {
		Syncer {
			config,
			status: SyncStatus::Idle,
		}
	}

	/// Current phase of the synchronization.
	pub fn status(&self) -> SyncStatus {
		self.status
	}

	fn set_status(&mut self, status: SyncStatus) {
		debug!("sync: {:?} -> {:?}", self.status, status);
		self.status = status;
	}

	/// Run the whole synchronization: connect and handshake, load the
	/// Bloom filter for `query` (the wallet's key hash), walk the
	/// filtered blocks and fetch the matched transactions. Returns the
	/// connected peer alongside the results so the caller can keep
	/// talking to it.
	pub fn run(&mut self, query: &[u8]) -> Result<(Peer, SyncResult), Error> {
		self.set_status(SyncStatus::Handshaking);
		let peer = Peer::connect(&self.config)?;

		// the filter must be in place before the first getblocks
		self.set_status(SyncStatus::Filtered);
		let filterload = Filterload::new(FILTER_SIZE, FILTER_HASH_FUNCS, &[query], random_tweak()?);
		peer.send(&Message::Filterload(filterload))?;
		peer.send(&Message::Getblocks(Getblocks::new(vec![
			self.config.anchor_hash,
		])))?;

		self.set_status(SyncStatus::Downloading);
		let (blocks, early_txs) = self.download_blocks(&peer)?;

		self.set_status(SyncStatus::Fetching);
		let txs = self.fetch_transactions(&peer, &blocks, early_txs)?;

		self.set_status(SyncStatus::Done);
		Ok((peer, SyncResult { blocks, txs }))
	}

	/// Accumulate merkleblocks until the target count is reached.
	/// Every 500 blocks the walk is re-anchored at the latest block in
	/// hand; a stall does the same, or ends the download when nothing
	/// has arrived at all. Transactions streaming in alongside the
	/// blocks are collected as they come so their queue never backs
	/// up.
	fn download_blocks(&self, peer: &Peer) -> Result<(Vec<Merkleblock>, Vec<Transaction>), Error> {
		let target = peer
			.info
			.start_height
			.saturating_sub(self.config.anchor_height) as usize;
		info!("expecting about {} filtered blocks", target);

		let mut blocks: Vec<Merkleblock> = vec![];
		let mut txs: Vec<Transaction> = vec![];
		let mut batch_limit = GETBLOCKS_BATCH;
		while blocks.len() < target {
			drain_txs(peer, &mut txs);
			if blocks.len() >= batch_limit {
				batch_limit += GETBLOCKS_BATCH;
				if let Some(latest) = blocks.last() {
					peer.send(&Message::Getblocks(Getblocks::new(vec![
						latest.block_hash()
					])))?;
				}
			}
			match peer.conn().blocks_rx.recv_timeout(BLOCK_IDLE_TIMEOUT) {
				Ok(block) => {
					blocks.push(block);
					if blocks.len() % 500 == 0 {
						debug!("{} / {} blocks", blocks.len(), target);
					}
				}
				Err(RecvTimeoutError::Timeout) => match blocks.last() {
					Some(latest) => {
						// stalled mid-walk, re-anchor at the latest
						// block in hand
						batch_limit = blocks.len() + GETBLOCKS_BATCH;
						let hash = latest.block_hash();
						debug!("block stream stalled, re-requesting from {}", hash);
						peer.send(&Message::Getblocks(Getblocks::new(vec![hash])))?;
					}
					None => {
						debug!("no blocks seen before the idle timeout, download done");
						break;
					}
				},
				Err(RecvTimeoutError::Disconnected) => return Err(Error::ConnectionClose),
			}
		}
		drain_txs(peer, &mut txs);
		info!("download complete, {} blocks in hand", blocks.len());
		Ok((blocks, txs))
	}

	/// Validate every accumulated block, then fetch the matched
	/// transactions that were not already streamed alongside the
	/// blocks.
	fn fetch_transactions(
		&self,
		peer: &Peer,
		blocks: &[Merkleblock],
		mut txs: Vec<Transaction>,
	) -> Result<Vec<Transaction>, Error> {
		let mut wanted: Vec<Hash> = vec![];
		for block in blocks {
			for id in block.validate() {
				if !wanted.contains(&id) {
					wanted.push(id);
				}
			}
		}
		info!("{} transactions matched the filter", wanted.len());

		// anything else the peer streamed in the meantime
		drain_txs(peer, &mut txs);

		let received: Vec<Hash> = txs.iter().map(|tx| tx.id()).collect();
		let missing = sub_ids(&wanted, &received);
		if missing.is_empty() {
			return Ok(txs);
		}
		debug!("requesting {} transactions", missing.len());
		let inventory: Vec<InvVect> = missing
			.iter()
			.map(|&hash| InvVect {
				inv_type: InvType::Tx,
				hash,
			})
			.collect();
		peer.send(&Message::Getdata(Getdata::new(inventory)))?;

		loop {
			// late merkleblocks are of no further use, keep their
			// queue from backing up
			discard_blocks(peer);
			let received: Vec<Hash> = txs.iter().map(|tx| tx.id()).collect();
			if sub_ids(&wanted, &received).is_empty() {
				break;
			}
			match peer.conn().txs_rx.recv_timeout(TX_IDLE_TIMEOUT) {
				Ok(tx) => push_unique(&mut txs, tx),
				Err(RecvTimeoutError::Timeout) => {
					warn!(
						"gave up waiting on {} transactions",
						sub_ids(&wanted, &received).len()
					);
					break;
				}
				Err(RecvTimeoutError::Disconnected) => return Err(Error::ConnectionClose),
			}
		}
		Ok(txs)
	}
}

/// Announce a freshly built transaction and hand it over when the peer
/// asks for it. A reject fails the broadcast; a quiet grace period
/// after the handover counts as acceptance.
pub fn broadcast(peer: &Peer, tx: &Transaction) -> Result<(), Error> {
	let txid = tx.id();
	peer.send(&Message::Inv(Inv {
		inventory: vec![InvVect {
			inv_type: InvType::Tx,
			hash: txid,
		}],
	}))?;
	info!("announced transaction {}", txid);

	let deadline = Instant::now() + BROADCAST_TIMEOUT;
	let mut handover: Option<Instant> = None;
	loop {
		// the block and tx streams are done for, keep their queues
		// from backing up while we watch for getdata and reject
		discard_blocks(peer);
		while peer.conn().txs_rx.try_recv().is_ok() {}

		// std channels have no select, so poll both queues in turns
		if let Ok(reject) = peer.conn().rejects_rx.try_recv() {
			return Err(Error::Rejected {
				message: String::from_utf8_lossy(&reject.message).into_owned(),
				code: reject.code,
				reason: String::from_utf8_lossy(&reject.reason).into_owned(),
			});
		}
		match handover {
			Some(sent_at) => {
				if sent_at.elapsed() >= REJECT_GRACE {
					info!("transaction {} accepted", txid);
					return Ok(());
				}
			}
			None => {
				if Instant::now() >= deadline {
					return Err(Error::Timeout);
				}
			}
		}
		match peer.conn().getdatas_rx.recv_timeout(POLL_INTERVAL) {
			Ok(getdata) => {
				for vect in getdata.filter_inventory(InvType::Tx) {
					if vect.hash == txid {
						peer.send(&Message::Tx(tx.clone()))?;
						info!("transaction {} sent", txid);
						handover = Some(Instant::now());
					}
				}
			}
			Err(RecvTimeoutError::Timeout) => {}
			Err(RecvTimeoutError::Disconnected) => return Err(Error::ConnectionClose),
		}
	}
}

fn push_unique(txs: &mut Vec<Transaction>, tx: Transaction) {
	let id = tx.id();
	if txs.iter().all(|other| other.id() != id) {
		txs.push(tx);
	}
}

/// Discard any merkleblocks currently sitting in their queue.
fn discard_blocks(peer: &Peer) {
	while peer.conn().blocks_rx.try_recv().is_ok() {}
}

/// Pull everything currently sitting in the transaction queue.
fn drain_txs(peer: &Peer, txs: &mut Vec<Transaction>) {
	loop {
		match peer.conn().txs_rx.try_recv() {
			Ok(tx) => push_unique(txs, tx),
			Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
		}
	}
}

fn random_tweak() -> Result<u32, Error> {
	let mut rng = OsRng::new().map_err(|e| Error::Internal(format!("{}", e)))?;
	Ok(rng.next_u32())
}
