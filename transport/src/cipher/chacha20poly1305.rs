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

//! `chacha20-poly1305@openssh.com` (spec.md §4.4): two ChaCha20
//! instances keyed from one 512-bit session key — bytes 0..32 for the
//! payload cipher, bytes 32..64 for the length cipher — and a
//! per-packet one-time Poly1305 key derived from the payload cipher's
//! first block.
use chacha20::cipher::{KeyIvInit, StreamCipher, StreamCipherSeek};
use chacha20::ChaCha20Legacy;
use poly1305::universal_hash::KeyInit as Poly1305KeyInit;
use poly1305::Poly1305;
use subtle::ConstantTimeEq;
use universal_hash::UniversalHash;

use super::{Cipher, OpeningKey, SealingKey};
use crate::mac::MacAlgorithm;
use crate::Error;

pub(crate) struct SshChacha20Poly1305Cipher;

impl Cipher for SshChacha20Poly1305Cipher {
	fn key_len(&self) -> usize { 64 }

	fn make_opening_key(
		&self,
		key:&[u8],
		_nonce:&[u8],
		_mac_key:&[u8],
		_mac:&'static (dyn MacAlgorithm + Send + Sync),
	) -> Result<Box<dyn OpeningKey + Send>, Error> {
		Ok(Box::new(Chacha20Poly1305Opening { keys:split_key(key)? }))
	}

	fn make_sealing_key(
		&self,
		key:&[u8],
		_nonce:&[u8],
		_mac_key:&[u8],
		_mac:&'static (dyn MacAlgorithm + Send + Sync),
	) -> Result<Box<dyn SealingKey + Send>, Error> {
		Ok(Box::new(Chacha20Poly1305Sealing { keys:split_key(key)? }))
	}
}

struct SplitKeys {
	payload_key:[u8; 32],
	length_key:[u8; 32],
}

fn split_key(key:&[u8]) -> Result<SplitKeys, Error> {
	if key.len() != 64 {
		return Err(Error::IndexOutOfBounds);
	}
	let mut payload_key = [0u8; 32];
	let mut length_key = [0u8; 32];
	payload_key.copy_from_slice(&key[..32]);
	length_key.copy_from_slice(&key[32..]);
	Ok(SplitKeys { payload_key, length_key })
}

fn nonce_for(seqn:u32) -> [u8; 8] {
	let mut nonce = [0u8; 8];
	nonce[4..].copy_from_slice(&seqn.to_be_bytes());
	nonce
}

fn length_cipher(length_key:&[u8; 32], seqn:u32) -> ChaCha20Legacy {
	ChaCha20Legacy::new(length_key.into(), &nonce_for(seqn).into())
}

fn payload_cipher_and_poly_key(payload_key:&[u8; 32], seqn:u32) -> (ChaCha20Legacy, [u8; 32]) {
	let mut cipher = ChaCha20Legacy::new(payload_key.into(), &nonce_for(seqn).into());
	let mut poly_key = [0u8; 32];
	cipher.apply_keystream(&mut poly_key);
	// The payload cipher's first 64-byte block produced the Poly1305
	// key; skip it by seeking to block 1 before encrypting payload.
	cipher.seek(64u32);
	(cipher, poly_key)
}

fn poly1305_tag(poly_key:&[u8; 32], length_ciphertext:&[u8], payload_ciphertext:&[u8]) -> [u8; 16] {
	let mut mac = Poly1305::new(poly_key.into());
	mac.update_padded(length_ciphertext);
	mac.update_padded(payload_ciphertext);
	mac.finalize().into_bytes().into()
}

struct Chacha20Poly1305Opening {
	keys:SplitKeys,
}

impl OpeningKey for Chacha20Poly1305Opening {
	fn decrypt_packet_length(&mut self, seqn:u32, mut encrypted_packet_length:[u8; 4]) -> Result<[u8; 4], Error> {
		length_cipher(&self.keys.length_key, seqn).apply_keystream(&mut encrypted_packet_length);
		Ok(encrypted_packet_length)
	}

	fn tag_len(&self) -> usize { 16 }

	fn open<'a>(&mut self, seqn:u32, ciphertext_in_plaintext_out:&'a mut [u8], tag:&[u8]) -> Result<&'a [u8], Error> {
		// The caller passes the still-encrypted length field followed
		// by the payload ciphertext; the Poly1305 tag covers both, so
		// we need the raw length bytes here even though their clear
		// value was already produced by `decrypt_packet_length`.
		if ciphertext_in_plaintext_out.len() < 4 {
			return Err(Error::IndexOutOfBounds);
		}
		let (length_ct, payload_ct) = ciphertext_in_plaintext_out.split_at_mut(4);
		let (_, poly_key) = payload_cipher_and_poly_key(&self.keys.payload_key, seqn);
		let expected = poly1305_tag(&poly_key, length_ct, payload_ct);
		if expected.ct_eq(tag).unwrap_u8() != 1 {
			return Err(Error::MacVerifyFailed);
		}
		let (mut cipher, _) = payload_cipher_and_poly_key(&self.keys.payload_key, seqn);
		cipher.apply_keystream(payload_ct);
		Ok(&ciphertext_in_plaintext_out[4..])
	}
}

struct Chacha20Poly1305Sealing {
	keys:SplitKeys,
}

impl SealingKey for Chacha20Poly1305Sealing {
	fn padding_length(&self, plaintext:&[u8]) -> usize {
		let block_size = 8;
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
		if plaintext_in_ciphertext_out.len() < 4 {
			tag_out.fill(0);
			return;
		}
		let (length_pt, payload_pt) = plaintext_in_ciphertext_out.split_at_mut(4);
		length_cipher(&self.keys.length_key, seqn).apply_keystream(length_pt);
		let (mut cipher, poly_key) = payload_cipher_and_poly_key(&self.keys.payload_key, seqn);
		cipher.apply_keystream(payload_pt);
		let tag = poly1305_tag(&poly_key, length_pt, payload_pt);
		tag_out.copy_from_slice(&tag);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn round_trips_a_packet_and_verifies_the_tag() {
		let key = [7u8; 64];
		let cipher = SshChacha20Poly1305Cipher;
		let mac = crate::mac::by_name(crate::mac::HMAC_SHA256).unwrap();
		let mut sealing = cipher.make_sealing_key(&key, &[], &[], mac).unwrap();
		let mut opening = cipher.make_opening_key(&key, &[], &[], mac).unwrap();

		let mut buf = vec![0u8, 0, 0, 32];
		buf.extend_from_slice(&[0xAAu8; 32]);
		let original = buf.clone();
		let mut tag = [0u8; 16];
		sealing.seal(0x11223344, &mut buf, &mut tag);
		assert_ne!(buf[4..], original[4..]);

		let plaintext = opening.open(0x11223344, &mut buf, &tag).unwrap();
		assert_eq!(plaintext, &original[4..]);
	}

	#[test]
	fn tampered_tag_is_rejected() {
		let key = [3u8; 64];
		let cipher = SshChacha20Poly1305Cipher;
		let mac = crate::mac::by_name(crate::mac::HMAC_SHA256).unwrap();
		let mut sealing = cipher.make_sealing_key(&key, &[], &[], mac).unwrap();
		let mut opening = cipher.make_opening_key(&key, &[], &[], mac).unwrap();

		let mut buf = vec![0u8, 0, 0, 4, 1, 2, 3, 4];
		let mut tag = [0u8; 16];
		sealing.seal(5, &mut buf, &mut tag);
		tag[0] ^= 1;
		assert!(opening.open(5, &mut buf, &tag).is_err());
	}
}
