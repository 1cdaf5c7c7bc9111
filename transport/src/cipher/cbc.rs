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

//! CBC-mode ciphers kept for interoperability with legacy peers
//! (spec.md §4.4): `aes{128,192,256}-cbc`, `3des-cbc`, `blowfish-cbc`.
//! Chaining state carries over between packets (the last ciphertext
//! block becomes the next packet's IV), same as the `keys` crate's PPK
//! and SSH-1 private-key decryption already does with `cbc::Decryptor`.
use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, BlockSizeUser, KeyIvInit};
use rand::RngCore;
use typenum::Unsigned;

use super::{Cipher, OpeningKey, SealingKey};
use crate::mac::MacAlgorithm;
use crate::Error;

pub(crate) struct SshCbcCipher<C>(pub(crate) std::marker::PhantomData<C>);

impl<C> Cipher for SshCbcCipher<C>
where
	C:BlockEncryptMut + BlockDecryptMut + BlockSizeUser + KeyIvInit + Clone + Send + 'static,
{
	fn needs_mac(&self) -> bool { true }

	fn key_len(&self) -> usize { <C as KeyIvInit>::KeySize::to_usize() }

	fn nonce_len(&self) -> usize { <C as KeyIvInit>::IvSize::to_usize() }

	fn make_opening_key(
		&self,
		key:&[u8],
		nonce:&[u8],
		mac_key:&[u8],
		mac:&'static (dyn MacAlgorithm + Send + Sync),
	) -> Result<Box<dyn OpeningKey + Send>, Error> {
		let cipher = cbc::Decryptor::<C>::new_from_slices(key, nonce).map_err(|_| Error::IndexOutOfBounds)?;
		Ok(Box::new(CbcOpening { cipher, mac_key:mac_key.to_vec(), mac }))
	}

	fn make_sealing_key(
		&self,
		key:&[u8],
		nonce:&[u8],
		mac_key:&[u8],
		mac:&'static (dyn MacAlgorithm + Send + Sync),
	) -> Result<Box<dyn SealingKey + Send>, Error> {
		let cipher = cbc::Encryptor::<C>::new_from_slices(key, nonce).map_err(|_| Error::IndexOutOfBounds)?;
		Ok(Box::new(CbcSealing { cipher, mac_key:mac_key.to_vec(), mac }))
	}
}

struct CbcOpening<C:BlockDecryptMut + BlockSizeUser + Clone> {
	cipher:cbc::Decryptor<C>,
	mac_key:Vec<u8>,
	mac:&'static (dyn MacAlgorithm + Send + Sync),
}

impl<C:BlockDecryptMut + BlockSizeUser + Clone + Send> OpeningKey for CbcOpening<C> {
	fn decrypt_packet_length(&mut self, _seqn:u32, encrypted_packet_length:[u8; 4]) -> Result<[u8; 4], Error> {
		// Decrypting the first block ahead of `open` must not disturb
		// the chaining state that `open` will use for the real
		// decrypt, so preview on a clone of the cipher.
		let block_size = C::block_size();
		let mut preview_block = vec![0u8; block_size];
		preview_block[..4].copy_from_slice(&encrypted_packet_length);
		self
			.cipher
			.clone()
			.decrypt_padded_mut::<NoPadding>(&mut preview_block)
			.map_err(|_| Error::InvalidPacketLength(block_size))?;
		let mut out = [0u8; 4];
		out.copy_from_slice(&preview_block[..4]);
		Ok(out)
	}

	fn tag_len(&self) -> usize { self.mac.mac_len() }

	fn open<'a>(&mut self, seqn:u32, ciphertext_in_plaintext_out:&'a mut [u8], tag:&[u8]) -> Result<&'a [u8], Error> {
		if ciphertext_in_plaintext_out.len() < 4 {
			return Err(Error::IndexOutOfBounds);
		}
		let packet_len = ciphertext_in_plaintext_out.len();
		self
			.cipher
			.decrypt_padded_mut::<NoPadding>(ciphertext_in_plaintext_out)
			.map_err(|_| Error::InvalidPacketLength(packet_len))?;
		if !self.mac.verify(&self.mac_key, seqn, ciphertext_in_plaintext_out, tag) {
			return Err(Error::MacVerifyFailed);
		}
		Ok(&ciphertext_in_plaintext_out[4..])
	}
}

struct CbcSealing<C:BlockEncryptMut + BlockSizeUser> {
	cipher:cbc::Encryptor<C>,
	mac_key:Vec<u8>,
	mac:&'static (dyn MacAlgorithm + Send + Sync),
}

impl<C:BlockEncryptMut + BlockSizeUser + Send> SealingKey for CbcSealing<C> {
	fn padding_length(&self, plaintext:&[u8]) -> usize {
		let block_size = C::block_size();
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
		let tag = self.mac.compute(&self.mac_key, seqn, plaintext_in_ciphertext_out);
		let len = plaintext_in_ciphertext_out.len();
		self
			.cipher
			.encrypt_padded_mut::<NoPadding>(plaintext_in_ciphertext_out, len)
			.expect("packet length is already block-aligned by padding_length");
		tag_out.copy_from_slice(&tag);
	}
}

#[cfg(test)]
mod tests {
	use aes::Aes128;

	use super::*;

	#[test]
	fn round_trips_a_full_packet() {
		let key = [1u8; 16];
		let iv = [2u8; 16];
		let cipher = SshCbcCipher::<Aes128>(std::marker::PhantomData);
		let mac = crate::mac::by_name(crate::mac::HMAC_SHA256).unwrap();
		let mut sealing = cipher.make_sealing_key(&key, &iv, &[], mac).unwrap();
		let mut opening = cipher.make_opening_key(&key, &iv, &[], mac).unwrap();

		let mut buf = vec![0u8, 0, 0, 16];
		buf.extend_from_slice(&[0x42u8; 16]);
		let original = buf.clone();
		let mut tag = vec![0u8; mac.mac_len()];
		sealing.seal(9, &mut buf, &mut tag);
		assert_ne!(buf, original);

		let plaintext = opening.open(9, &mut buf, &tag).unwrap();
		assert_eq!(plaintext, &original[4..]);
	}
}
