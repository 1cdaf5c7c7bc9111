// Copyright 2016 Pierre-Étienne Meunier
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! `pssh`: the SSH2 transport, userauth and connection-layer contract
//! (spec.md §4.4/§4.5) underneath the client and key-management tool.
//! Ciphers, MACs and key exchange live behind small trait objects
//! (`cipher::Cipher`, `mac::MacAlgorithm`) selected by name out of the
//! negotiated algorithm lists; the session, userauth and channel state
//! machines are pure step functions over those primitives, each
//! returning the `Action`s its caller must actually perform against a
//! socket.
pub mod channel;
pub(crate) mod cipher;
pub(crate) mod crc_compensation;
pub mod error;
pub mod kex;
pub(crate) mod keys_derivation;
pub(crate) mod mac;
pub mod negotiation;
pub mod session;
pub mod sharing;
pub(crate) mod sshbuffer;
pub mod userauth;

pub use error::{DisconnectReason, Error, Result};
