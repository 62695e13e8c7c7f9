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

//! Logging, hashing and various low-level utilities that factor Rust
//! patterns that are frequent within the sparv codebase.

#![deny(non_upper_case_globals)]
#![deny(non_camel_case_types)]
#![deny(non_snake_case)]
#![deny(unused_mut)]
#![warn(missing_docs)]

#[macro_use]
extern crate lazy_static;

// Re-export so the ECDSA backend only has to be included once
pub use secp256k1 as secp;

/// Re-export of the parking_lot mutex used throughout the workspace
pub use parking_lot::Mutex;

// Logging related
pub mod logger;
pub use crate::logger::{init_logger, init_test_logger, LogLevel, LoggingConfig};

// Static secp instance
pub mod secp_static;
pub use crate::secp_static::static_secp_instance;

mod hash;
pub use crate::hash::{hash160, hash256, reverse_bytes};

mod hex;
pub use crate::hex::{from_hex, to_hex};
