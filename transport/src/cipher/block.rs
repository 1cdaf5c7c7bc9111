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

//! `aes{128,192,256}-ctr`: a stream cipher generic over any RustCrypto
//! `KeyIvInit + StreamCipher`, paired with an independently-computed
//! HMAC (the teacher's `SshBlockCipher<ctr::Ctr128BE<_>>` pattern).
//!
//! The keystream runs continuously across the whole session, so the
//! packet-length field and the payload share one advancing cipher
//! state. `-etm@openssh.com` MACs are the one exception: their packet
//! length stays unencrypted, so the keystream must skip over it.
use std::marker::PhantomData;

use ctr::cipher::{KeyIvInit, KeySizeUser, StreamCipher};
use rand::RngCore;
use typenum::Unsigned;

use super::{Cipher, OpeningKey, SealingKey};
use crate::mac::MacAlgorithm;
use crate::Error;

pub(crate) struct SshBlockCipher<C>(pub(crate) PhantomData<C>);

impl<C:KeyIvInit + StreamCipher + Send + 'static> Cipher for SshBlockCipher<C> {
	fn needs_mac(&self) -> bool { true }

	fn key_len(&self) -> usize { C::KeySize::to_usize() }

	fn nonce_len(&self) -> usize { <C as KeyIvInit>::IvSize::to_usize() }

	fn make_opening_key(
		&self,
		key:&[u8],
		nonce:&[u8],
		mac_key:&[u8],
		mac:&'static (dyn MacAlgorithm + Send + Sync),
	) -> Result<Box<dyn OpeningKey + Send>, Error> {
		let cipher = C::new_from_slices(key, nonce).map_err(|_| Error::IndexOutOfBounds)?;
		let etm = mac.is_etm();
		Ok(Box::new(BlockOpening { cipher, mac_key:mac_key.to_vec(), mac, etm, pending_length:None }))
	}

	fn make_sealing_key(
		&self,
		key:&[u8],
		nonce:&[u8],
		mac_key:&[u8],
		mac:&'static (dyn MacAlgorithm + Send + Sync),
	) -> Result<Box<dyn SealingKey + Send>, Error> {
		let cipher = C::new_from_slices(key, nonce).map_err(|_| Error::IndexOutOfBounds)?;
		let etm = mac.is_etm();
		Ok(Box::new(BlockSealing { cipher, mac_key:mac_key.to_vec(), mac, etm }))
	}
}

struct BlockOpening<C> {
	cipher:C,
	mac_key:Vec<u8>,
	mac:&'static (dyn MacAlgorithm + Send + Sync),
	etm:bool,
	/// The packet-length field decrypted by the last call to
	/// `decrypt_packet_length`, kept around so non-ETM MAC
	/// verification can cover the plaintext length even though the
	/// caller's buffer still holds the wire ciphertext bytes there.
	pending_length:Option<[u8; 4]>,
}

impl<C:StreamCipher + Send> OpeningKey for BlockOpening<C> {
	fn decrypt_packet_length(&mut self, _seqn:u32, encrypted_packet_length:[u8; 4]) -> Result<[u8; 4], Error> {
		if self.etm {
			// `-etm@openssh.com`: the length field is not part of the
			// encrypted stream, so the keystream is left untouched.
			self.pending_length = Some(encrypted_packet_length);
			return Ok(encrypted_packet_length);
		}
		let mut len = encrypted_packet_length;
		self.cipher.apply_keystream(&mut len);
		self.pending_length = Some(len);
		Ok(len)
	}

	fn tag_len(&self) -> usize { self.mac.mac_len() }

	fn open<'a>(&mut self, seqn:u32, ciphertext_in_plaintext_out:&'a mut [u8], tag:&[u8]) -> Result<&'a [u8], Error> {
		if ciphertext_in_plaintext_out.len() < 4 {
			return Err(Error::IndexOutOfBounds);
		}
		if self.etm {
			if !self.mac.verify(&self.mac_key, seqn, ciphertext_in_plaintext_out, tag) {
				return Err(Error::MacVerifyFailed);
			}
			self.cipher.apply_keystream(&mut ciphertext_in_plaintext_out[4..]);
		} else {
			let length = self.pending_length.take().ok_or(Error::IndexOutOfBounds)?;
			self.cipher.apply_keystream(&mut ciphertext_in_plaintext_out[4..]);
			let mut plaintext_packet = Vec::with_capacity(ciphertext_in_plaintext_out.len());
			plaintext_packet.extend_from_slice(&length);
			plaintext_packet.extend_from_slice(&ciphertext_in_plaintext_out[4..]);
			if !self.mac.verify(&self.mac_key, seqn, &plaintext_packet, tag) {
				return Err(Error::MacVerifyFailed);
			}
		}
		Ok(&ciphertext_in_plaintext_out[4..])
	}
}

struct BlockSealing<C> {
	cipher:C,
	mac_key:Vec<u8>,
	mac:&'static (dyn MacAlgorithm + Send + Sync),
	etm:bool,
}

impl<C:StreamCipher + Send> SealingKey for BlockSealing<C> {
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

	fn fill_padding(&self, padding_out:&mut [u8]) { rand::thread_rng().fill_bytes(padding_out) }

	fn tag_len(&self) -> usize { self.mac.mac_len() }

	fn seal(&mut self, seqn:u32, plaintext_in_ciphertext_out:&mut [u8], tag_out:&mut [u8]) {
		if plaintext_in_ciphertext_out.len() < 4 {
			tag_out.fill(0);
			return;
		}
		if self.etm {
			self.cipher.apply_keystream(&mut plaintext_in_ciphertext_out[4..]);
			let tag = self.mac.compute(&self.mac_key, seqn, plaintext_in_ciphertext_out);
			tag_out.copy_from_slice(&tag);
		} else {
			let tag = self.mac.compute(&self.mac_key, seqn, plaintext_in_ciphertext_out);
			self.cipher.apply_keystream(plaintext_in_ciphertext_out);
			tag_out.copy_from_slice(&tag);
		}
	}
}
