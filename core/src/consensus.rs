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

//! Network-level constants for the Bitcoin testnet. Everything that
//! would change when pointing the wallet at a different network or
//! sync starting point is kept here.

/// Magic value prefixing every message on the testnet wire.
pub const MAGIC: u32 = 0x0709_110B;

/// Protocol version advertised in our version message.
pub const PROTOCOL_VERSION: u32 = 70015;

/// Services bitmask advertised to peers (NODE_NETWORK).
pub const SERVICES: u64 = 1;

/// User agent sent to peers. Deliberately empty.
pub const USER_AGENT: &str = "";

/// DNS seed the wallet dials, port included.
pub const DNS_SEED: &str = "testnet-seed.bitcoin.jonasschnelli.ch:18333";

/// Version byte for WIF-encoded testnet private keys.
pub const WIF_VERSION: u8 = 0xEF;

/// Version byte for testnet pay-to-public-key-hash addresses.
pub const P2PKH_VERSION: u8 = 0x6F;

/// Version byte for testnet pay-to-script-hash addresses.
pub const P2SH_VERSION: u8 = 0xC4;

/// Block hash the filtered block walk is anchored at, in the usual
/// display order (reversed relative to the wire).
pub const SYNC_ANCHOR_HASH: &str =
	"0000000000000657bda6681e1a3d1aac92d09d31721e8eedbca98cac73e93226";

/// Height of the anchor block above.
pub const SYNC_ANCHOR_HEIGHT: u32 = 1_261_780;

/// The maximum number of inputs or outputs a transaction may have and
/// still be deserializable. Only for DoS protection.
pub const MAX_IN_OUT_LEN: u64 = 50_000;

/// Maximum number of entries accepted in a single inv or getdata
/// message, per the protocol rules.
pub const MAX_INV_LEN: u64 = 50_000;
