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

//! The wallet side of sparv: deriving the unspent output set from the
//! synchronized transactions, selecting coins, building and signing
//! the spending transaction, and the operations behind the CLI.

#[macro_use]
extern crate failure_derive;

pub mod build;
pub mod controller;
pub mod error;
pub mod types;

pub use crate::error::Error;
pub use crate::types::{collect_unspent, total_value, Unspent};
