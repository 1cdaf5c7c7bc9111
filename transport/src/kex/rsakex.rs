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

//! `rsa2048-sha256`: the server transmits a transient RSA public key,
//! the client draws and OAEP-encrypts the shared secret under it
//! (spec.md §4.3), thin session-side binding over `pssh_keys::rsa_kex`.
use pssh_keys::rsa::RsaPublicKey;
use pssh_keys::rsa_kex::client_encrypt_secret;
use pssh_mpint::EntropySource;

use crate::error::Result;

/// Runs the client half: given the server's transient key, returns the
/// shared secret (as its big-endian bytes) and the OAEP ciphertext to
/// send back.
pub fn client_agree(transient_key:&RsaPublicKey, rng:&mut dyn EntropySource) -> Result<(Vec<u8>, Vec<u8>)> {
	let (secret, ciphertext) = client_encrypt_secret(transient_key, rng)?;
	Ok((secret.to_bytes_be(), ciphertext))
}
