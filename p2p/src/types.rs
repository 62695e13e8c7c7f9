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

//! Shared p2p types: errors, peer information and connection
//! configuration.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use sparv_core::consensus;
use sparv_core::core::hash::Hash;
use sparv_core::ser;

/// Maximum time for the complete version/verack exchange.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// How long the download waits for a merkleblock before re-anchoring
/// the block walk.
pub const BLOCK_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

/// How long the fetch waits for a wanted transaction before giving up.
pub const TX_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from the peer connection and the sync engine.
#[derive(Debug, Fail)]
pub enum Error {
	/// A message could not be encoded or decoded
	#[fail(display = "serialization error: {}", _0)]
	Serialization(ser::Error),
	/// The underlying socket failed
	#[fail(display = "connection error: {}", _0)]
	Connection(io::Error),
	/// The peer did not answer within the allotted time
	#[fail(display = "timed out waiting for the peer")]
	Timeout,
	/// The connection was closed underneath us
	#[fail(display = "connection to the peer was closed")]
	ConnectionClose,
	/// The peer rejected something we sent
	#[fail(
		display = "peer rejected {}: code 0x{:02x}, reason: {}",
		message, code, reason
	)]
	Rejected {
		/// command the reject refers to
		message: String,
		/// reject code
		code: u8,
		/// human readable reason
		reason: String,
	},
	/// Something went wrong on our side of the connection
	#[fail(display = "internal error: {}", _0)]
	Internal(String),
}

impl From<ser::Error> for Error {
	fn from(e: ser::Error) -> Error {
		Error::Serialization(e)
	}
}

impl From<io::Error> for Error {
	fn from(e: io::Error) -> Error {
		Error::Connection(e)
	}
}

/// Configuration for the single outbound peer connection.
#[derive(Debug, Clone)]
pub struct P2PConfig {
	/// host:port of the peer to dial
	pub peer_addr: String,
	/// block hash the filtered walk is anchored at, in wire order
	pub anchor_hash: Hash,
	/// height of the anchor block
	pub anchor_height: u32,
}

impl Default for P2PConfig {
	fn default() -> P2PConfig {
		P2PConfig {
			peer_addr: consensus::DNS_SEED.to_string(),
			anchor_hash: Hash::from_hex_reversed(consensus::SYNC_ANCHOR_HASH)
				.expect("anchor hash constant"),
			anchor_height: consensus::SYNC_ANCHOR_HEIGHT,
		}
	}
}

/// Information about the remote peer learned during the handshake.
#[derive(Debug, Clone)]
pub struct PeerInfo {
	/// peer user agent
	pub user_agent: String,
	/// protocol version it advertised
	pub version: u32,
	/// services bitmask it advertised
	pub services: u64,
	/// best block height it advertised
	pub start_height: u32,
	/// network address of the peer
	pub addr: SocketAddr,
}
