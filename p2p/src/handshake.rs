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

//! Handles the handshake negotiation when connecting to a peer: our
//! version goes out first, the peer's version is answered with a
//! verack, and both its version and its verack must arrive before the
//! deadline. No data message is sent until the exchange is complete.

use std::io;
use std::net::TcpStream;
use std::time::{Duration, Instant};

use log::{debug, trace};
use rand::rngs::OsRng;
use rand::RngCore;

use sparv_core::ser;

use crate::msg::{self, Message, Version};
use crate::types::{Error, PeerInfo, HANDSHAKE_TIMEOUT};

/// Handles the handshake negotiation when connecting to a peer.
pub struct Handshake;

impl Handshake {
	/// Creates a new handshake handler
	pub fn new() -> Handshake {
		Handshake
	}

	/// Runs the outbound handshake on a freshly connected stream and
	/// returns what we learned about the peer.
	pub fn connect(&self, stream: &mut TcpStream) -> Result<PeerInfo, Error> {
		let peer_addr = stream.peer_addr()?;
		let nonce = next_nonce()?;

		msg::write_message(stream, &Message::Version(Version::ours(nonce)))?;

		let deadline = Instant::now() + HANDSHAKE_TIMEOUT;
		let mut peer_version: Option<Version> = None;
		let mut got_verack = false;
		while peer_version.is_none() || !got_verack {
			let remaining = deadline
				.checked_duration_since(Instant::now())
				.filter(|d| *d > Duration::from_millis(0))
				.ok_or(Error::Timeout)?;
			stream.set_read_timeout(Some(remaining))?;

			let header = match msg::read_header(stream) {
				Ok(header) => header,
				Err(e) => return Err(map_timeout(e)),
			};
			let body = match msg::read_body(&header, stream) {
				Ok(body) => body,
				Err(e) => return Err(map_timeout(e)),
			};
			match header.command_str().as_str() {
				"version" => {
					let version: Version = ser::deserialize(&mut &body[..])?;
					debug!(
						"peer agent {:?}, height {}",
						String::from_utf8_lossy(&version.user_agent),
						version.start_height
					);
					msg::write_message(stream, &Message::Verack)?;
					peer_version = Some(version);
				}
				"verack" => got_verack = true,
				other => trace!("ignoring {} during handshake", other),
			}
		}
		stream.set_read_timeout(None)?;

		match peer_version {
			Some(version) => Ok(PeerInfo {
				user_agent: String::from_utf8_lossy(&version.user_agent).into_owned(),
				version: version.version,
				services: version.services,
				start_height: version.start_height,
				addr: peer_addr,
			}),
			None => Err(Error::Timeout),
		}
	}
}

/// Generate a random nonce for our version message.
fn next_nonce() -> Result<u64, Error> {
	let mut rng = OsRng::new().map_err(|e| Error::Internal(format!("{}", e)))?;
	Ok(rng.next_u64())
}

/// A read that hit the socket timeout means the handshake deadline
/// passed.
fn map_timeout(e: Error) -> Error {
	match e {
		Error::Connection(ref io_err)
			if io_err.kind() == io::ErrorKind::WouldBlock
				|| io_err.kind() == io::ErrorKind::TimedOut =>
		{
			Error::Timeout
		}
		Error::Serialization(ser::Error::IOErr(_, kind))
			if kind == io::ErrorKind::WouldBlock || kind == io::ErrorKind::TimedOut =>
		{
			Error::Timeout
		}
		other => other,
	}
}
