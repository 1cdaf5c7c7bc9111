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

//! `arcfour`, `arcfour128`, `arcfour256` (RFC 4345): RC4 kept only for
//! interoperability with legacy peers (spec.md §4.4). `arcfour128` and
//! `arcfour256` discard the first 1536 bytes of keystream to work
//! around RC4's well-known key-schedule bias; plain `arcfour` does not.
use std::marker::PhantomData;

use rc4::{KeyInit, Rc4, StreamCipher};
use typenum::Unsigned;

use super::{Cipher, OpeningKey, SealingKey};
use crate::mac::MacAlgorithm;
use crate::Error;

const DISCARD_BYTES:usize = 1536;

pub(crate) struct ArcfourCipher<C> {
	pub(crate) discard:bool,
	pub(crate) _marker:PhantomData<C>,
}

impl<C:KeyInit + StreamCipher + Send + 'static> Cipher for ArcfourCipher<C> {
	fn needs_mac(&self) -> bool { true }

	fn key_len(&self) -> usize { C::KeySize::to_usize() }

	fn make_opening_key(
		&self,
		key:&[u8],
		_nonce:&[u8],
		mac_key:&[u8],
		mac:&'static (dyn MacAlgorithm + Send + Sync),
	) -> Result<Box<dyn OpeningKey + Send>, Error> {
		let mut cipher = C::new_from_slice(key).map_err(|_| Error::IndexOutOfBounds)?;
		if self.discard {
			let mut sink = vec![0u8; DISCARD_BYTES];
			cipher.apply_keystream(&mut sink);
		}
		Ok(Box::new(ArcfourOpening { cipher, mac_key:mac_key.to_vec(), mac, pending_length:None }))
	}

	fn make_sealing_key(
		&self,
		key:&[u8],
		_nonce:&[u8],
		mac_key:&[u8],
		mac:&'static (dyn MacAlgorithm + Send + Sync),
	) -> Result<Box<dyn SealingKey + Send>, Error> {
		let mut cipher = C::new_from_slice(key).map_err(|_| Error::IndexOutOfBounds)?;
		if self.discard {
			let mut sink = vec![0u8; DISCARD_BYTES];
			cipher.apply_keystream(&mut sink);
		}
		Ok(Box::new(ArcfourSealing { cipher, mac_key:mac_key.to_vec(), mac }))
	}
}

pub(crate) type Arcfour = ArcfourCipher<Rc4<generic_array::typenum::U16>>;
pub(crate) type Arcfour256 = ArcfourCipher<Rc4<generic_array::typenum::U32>>;

struct ArcfourOpening<C> {
	cipher:C,
	mac_key:Vec<u8>,
	mac:&'static (dyn MacAlgorithm + Send + Sync),
	/// Cached plaintext length from the last `decrypt_packet_length`
	/// call, needed to reassemble the true plaintext for MAC
	/// verification (see the identical technique in `block.rs`).
	pending_length:Option<[u8; 4]>,
}

impl<C:StreamCipher + Send> OpeningKey for ArcfourOpening<C> {
	fn decrypt_packet_length(&mut self, _seqn:u32, mut encrypted_packet_length:[u8; 4]) -> Result<[u8; 4], Error> {
		self.cipher.apply_keystream(&mut encrypted_packet_length);
		self.pending_length = Some(encrypted_packet_length);
		Ok(encrypted_packet_length)
	}

	fn tag_len(&self) -> usize { self.mac.mac_len() }

	fn open<'a>(&mut self, seqn:u32, ciphertext_in_plaintext_out:&'a mut [u8], tag:&[u8]) -> Result<&'a [u8], Error> {
		if ciphertext_in_plaintext_out.len() < 4 {
			return Err(Error::IndexOutOfBounds);
		}
		let length = self.pending_length.take().ok_or(Error::IndexOutOfBounds)?;
		self.cipher.apply_keystream(&mut ciphertext_in_plaintext_out[4..]);
		let mut plaintext_packet = Vec::with_capacity(ciphertext_in_plaintext_out.len());
		plaintext_packet.extend_from_slice(&length);
		plaintext_packet.extend_from_slice(&ciphertext_in_plaintext_out[4..]);
		if !self.mac.verify(&self.mac_key, seqn, &plaintext_packet, tag) {
			return Err(Error::MacVerifyFailed);
		}
		Ok(&ciphertext_in_plaintext_out[4..])
	}
}

struct ArcfourSealing<C> {
	cipher:C,
	mac_key:Vec<u8>,
	mac:&'static (dyn MacAlgorithm + Send + Sync),
}

impl<C:StreamCipher + Send> SealingKey for ArcfourSealing<C> {
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

	fn tag_len(&self) -> usize { self.mac.mac_len() }

	fn seal(&mut self, seqn:u32, plaintext_in_ciphertext_out:&mut [u8], tag_out:&mut [u8]) {
		let tag = self.mac.compute(&self.mac_key, seqn, plaintext_in_ciphertext_out);
		self.cipher.apply_keystream(plaintext_in_ciphertext_out);
		tag_out.copy_from_slice(&tag);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn round_trips_a_packet() {
		let key = [5u8; 16];
		let cipher = Arcfour { discard:false, _marker:PhantomData };
		let mac = crate::mac::by_name(crate::mac::HMAC_SHA1).unwrap();
		let mut sealing = cipher.make_sealing_key(&key, &[], &[], mac).unwrap();
		let mut opening = cipher.make_opening_key(&key, &[], &[], mac).unwrap();

		let mut buf = vec![0u8, 0, 0, 8, 1, 2, 3, 4, 5, 6, 7, 8];
		let original = buf.clone();
		let mut tag = vec![0u8; mac.mac_len()];
		sealing.seal(1, &mut buf, &mut tag);
		assert_ne!(buf[4..], original[4..]);

		let plaintext = opening.open(1, &mut buf, &tag).unwrap();
		assert_eq!(plaintext, &original[4..]);
	}
}
