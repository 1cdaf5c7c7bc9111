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

//! `aes256-gcm@openssh.com`: AEAD, so no separate MAC is used. The
//! 12-byte nonce is the fixed part sent in SSH_MSG_NEWKEYS key
//! material, incremented per packet (RFC 5647); the length field is
//! sent as the GCM associated data, not separately encrypted.
use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};

use super::{Cipher, OpeningKey, SealingKey};
use crate::mac::MacAlgorithm;
use crate::Error;

pub(crate) struct GcmCipher;

impl Cipher for GcmCipher {
	fn key_len(&self) -> usize { 32 }

	fn nonce_len(&self) -> usize { 12 }

	fn make_opening_key(
		&self,
		key:&[u8],
		nonce:&[u8],
		_mac_key:&[u8],
		_mac:&'static (dyn MacAlgorithm + Send + Sync),
	) -> Result<Box<dyn OpeningKey + Send>, Error> {
		let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| Error::IndexOutOfBounds)?;
		let mut fixed = [0u8; 12];
		fixed.copy_from_slice(&nonce[..12]);
		Ok(Box::new(GcmOpening { cipher, fixed }))
	}

	fn make_sealing_key(
		&self,
		key:&[u8],
		nonce:&[u8],
		_mac_key:&[u8],
		_mac:&'static (dyn MacAlgorithm + Send + Sync),
	) -> Result<Box<dyn SealingKey + Send>, Error> {
		let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| Error::IndexOutOfBounds)?;
		let mut fixed = [0u8; 12];
		fixed.copy_from_slice(&nonce[..12]);
		Ok(Box::new(GcmSealing { cipher, fixed }))
	}
}

/// The fixed part of the nonce stays constant; the last 8 bytes count
/// packets sent/received, matching RFC 5647 §7.1's "invocation
/// counter" treatment (independent of the SSH sequence number).
fn nonce_for(fixed:&[u8; 12], seqn:u32) -> Nonce {
	let mut n = *fixed;
	let counter = u64::from_be_bytes(n[4..12].try_into().expect("12 - 4 = 8")).wrapping_add(seqn as u64);
	n[4..12].copy_from_slice(&counter.to_be_bytes());
	Nonce::clone_from_slice(&n)
}

struct GcmOpening {
	cipher:Aes256Gcm,
	fixed:[u8; 12],
}

impl OpeningKey for GcmOpening {
	fn decrypt_packet_length(&mut self, _seqn:u32, encrypted_packet_length:[u8; 4]) -> Result<[u8; 4], Error> {
		// The length field is sent in the clear as GCM associated data.
		Ok(encrypted_packet_length)
	}

	fn tag_len(&self) -> usize { 16 }

	fn open<'a>(&mut self, seqn:u32, ciphertext_in_plaintext_out:&'a mut [u8], tag:&[u8]) -> Result<&'a [u8], Error> {
		let nonce = nonce_for(&self.fixed, seqn);
		let tag = aes_gcm::Tag::clone_from_slice(tag);
		let (length_aad, payload_ciphertext) = ciphertext_in_plaintext_out.split_at_mut(4);
		self
			.cipher
			.decrypt_in_place_detached(&nonce, length_aad, payload_ciphertext, &tag)
			.map_err(|_| Error::MacVerifyFailed)?;
		Ok(payload_ciphertext)
	}
}

struct GcmSealing {
	cipher:Aes256Gcm,
	fixed:[u8; 12],
}

impl SealingKey for GcmSealing {
	fn padding_length(&self, plaintext:&[u8]) -> usize {
		let block_size = 16;
		let len = 5 + plaintext.len();
		let pad = block_size - (len % block_size);
		if pad < 4 {
			pad + block_size
		} else {
			pad
		}
	}

	fn fill_padding(&self, padding_out:&mut [u8]) { padding_out.fill(0) }

	fn tag_len(&self) -> usize { 16 }

	fn seal(&mut self, seqn:u32, plaintext_in_ciphertext_out:&mut [u8], tag_out:&mut [u8]) {
		let nonce = nonce_for(&self.fixed, seqn);
		let (length_aad, payload_plaintext) = plaintext_in_ciphertext_out.split_at_mut(4);
		let tag = self
			.cipher
			.encrypt_in_place_detached(&nonce, length_aad, payload_plaintext)
			.expect("AES-256-GCM encryption cannot fail for in-bounds lengths");
		tag_out.copy_from_slice(&tag);
	}
}
