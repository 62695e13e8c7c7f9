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

//! A connected peer: dialing, the handshake and the running
//! connection, wrapped together.

use std::net::TcpStream;

use log::info;

use crate::conn::Conn;
use crate::handshake::Handshake;
use crate::msg::Message;
use crate::types::{Error, P2PConfig, PeerInfo};

/// A connected and handshaked peer.
pub struct Peer {
	/// what the peer told us about itself
	pub info: PeerInfo,
	conn: Conn,
}

impl Peer {
	/// Dial the configured peer, run the handshake and start the
	/// connection threads.
	pub fn connect(config: &P2PConfig) -> Result<Peer, Error> {
		let mut stream = TcpStream::connect(&config.peer_addr)?;
		info!("connected to {}", config.peer_addr);
		let info = Handshake::new().connect(&mut stream)?;
		info!(
			"handshake complete, peer {} at height {}",
			info.addr, info.start_height
		);
		let conn = Conn::listen(stream)?;
		Ok(Peer { info, conn })
	}

	/// Queue a message for sending to the peer.
	pub fn send(&self, message: &Message) -> Result<(), Error> {
		self.conn.send(message)
	}

	/// The running connection and its inbound queues.
	pub fn conn(&self) -> &Conn {
		&self.conn
	}
}
