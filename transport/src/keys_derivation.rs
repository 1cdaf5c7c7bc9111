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

//! Session key derivation from the shared secret `K`, exchange hash
//! `H` and session id (spec.md §3 "Session keys", RFC 4253 §7.2):
//! iterated hashing with single-byte domain labels `A..F`.
use sha2::{Digest, Sha256};

use crate::kex::encode_mpint;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyLabel {
	ClientToServerIv = b'A' as isize,
	ServerToClientIv = b'B' as isize,
	ClientToServerKey = b'C' as isize,
	ServerToClientKey = b'D' as isize,
	ClientToServerIntegrity = b'E' as isize,
	ServerToClientIntegrity = b'F' as isize,
}

/// Derive `needed` bytes of key material for `label`, extending past
/// one hash block by feeding `K || H || K1 || K2 || ...` back in, the
/// way RFC 4253 §7.2 describes for keys longer than the hash output.
pub fn derive(shared_secret_k_mpint:&[u8], exchange_hash_h:&[u8], session_id:&[u8], label:KeyLabel, needed:usize) -> Vec<u8> {
	let k = encode_mpint(shared_secret_k_mpint);

	let mut block = {
		let mut h = Sha256::new();
		h.update(&k);
		h.update(exchange_hash_h);
		h.update([label as u8]);
		h.update(session_id);
		h.finalize().to_vec()
	};

	let mut out = block.clone();
	while out.len() < needed {
		let mut h = Sha256::new();
		h.update(&k);
		h.update(exchange_hash_h);
		h.update(&out);
		block = h.finalize().to_vec();
		out.extend_from_slice(&block);
	}
	out.truncate(needed);
	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn derive_produces_the_requested_length() {
		let k = [1u8; 32];
		let h = [2u8; 32];
		let session_id = [3u8; 32];
		assert_eq!(derive(&k, &h, &session_id, KeyLabel::ClientToServerKey, 16).len(), 16);
		assert_eq!(derive(&k, &h, &session_id, KeyLabel::ClientToServerKey, 64).len(), 64);
	}

	#[test]
	fn different_labels_produce_different_keys() {
		let k = [1u8; 32];
		let h = [2u8; 32];
		let session_id = [3u8; 32];
		let a = derive(&k, &h, &session_id, KeyLabel::ClientToServerKey, 32);
		let b = derive(&k, &h, &session_id, KeyLabel::ServerToClientKey, 32);
		assert_ne!(a, b);
	}

	#[test]
	fn extended_key_material_is_a_prefix_consistent_extension() {
		let k = [9u8; 32];
		let h = [8u8; 32];
		let session_id = [7u8; 32];
		let short = derive(&k, &h, &session_id, KeyLabel::ClientToServerIntegrity, 32);
		let long = derive(&k, &h, &session_id, KeyLabel::ClientToServerIntegrity, 64);
		assert_eq!(&long[..32], &short[..]);
	}
}
