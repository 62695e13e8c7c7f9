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

//! Networking code to connect to a single Bitcoin testnet peer: wire
//! message codecs, the framed connection with its reader and writer
//! threads, the version/verack handshake, the SPV synchronization
//! engine and the transaction broadcast handshake.

#![deny(non_upper_case_globals)]
#![deny(non_camel_case_types)]
#![deny(non_snake_case)]
#![deny(unused_mut)]

#[macro_use]
extern crate enum_primitive;
#[macro_use]
extern crate failure_derive;

pub mod conn;
pub mod handshake;
pub mod msg;
pub mod peer;
pub mod sync;
pub mod types;

pub use crate::peer::Peer;
pub use crate::sync::{broadcast, SyncResult, SyncStatus, Syncer};
pub use crate::types::{Error, P2PConfig, PeerInfo};
