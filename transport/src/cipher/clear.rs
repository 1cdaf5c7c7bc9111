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

//! The `none` cipher: used before the first NEWKEYS, and for interop
//! testing only afterwards.
use super::{Cipher, OpeningKey, SealingKey};
use crate::mac::MacAlgorithm;
use crate::Error;

pub(crate) struct Clear;

impl Cipher for Clear {
	fn key_len(&self) -> usize { 0 }

	fn make_opening_key(
		&self,
		_key:&[u8],
		_nonce:&[u8],
		_mac_key:&[u8],
		mac:&'static (dyn MacAlgorithm + Send + Sync),
	) -> Result<Box<dyn OpeningKey + Send>, Error> {
		Ok(Box::new(OpeningClear { mac_len:mac.mac_len() }))
	}

	fn make_sealing_key(
		&self,
		_key:&[u8],
		_nonce:&[u8],
		_mac_key:&[u8],
		mac:&'static (dyn MacAlgorithm + Send + Sync),
	) -> Result<Box<dyn SealingKey + Send>, Error> {
		Ok(Box::new(SealingClear { mac_len:mac.mac_len() }))
	}
}

struct OpeningClear {
	mac_len:usize,
}

impl OpeningKey for OpeningClear {
	fn decrypt_packet_length(&mut self, _seqn:u32, encrypted_packet_length:[u8; 4]) -> Result<[u8; 4], Error> {
		Ok(encrypted_packet_length)
	}

	fn tag_len(&self) -> usize { self.mac_len }

	fn open<'a>(&mut self, _seqn:u32, ciphertext_in_plaintext_out:&'a mut [u8], _tag:&[u8]) -> Result<&'a [u8], Error> {
		Ok(&ciphertext_in_plaintext_out[4..])
	}
}

struct SealingClear {
	mac_len:usize,
}

impl SealingKey for SealingClear {
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

	fn tag_len(&self) -> usize { self.mac_len }

	fn seal(&mut self, _seqn:u32, _plaintext_in_ciphertext_out:&mut [u8], tag_out:&mut [u8]) { tag_out.fill(0) }
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::mac;

	#[test]
	fn padding_keeps_packet_length_a_multiple_of_block_size() {
		let mac = mac::by_name(mac::HMAC_SHA256).unwrap();
		let key = Clear.make_sealing_key(&[], &[], &[], mac).unwrap();
		for len in 0..20 {
			let pad = key.padding_length(&vec![0u8; len]);
			assert!(pad >= 4);
			assert_eq!((5 + len + pad) % 8, 0);
		}
	}

	#[test]
	fn length_decrypt_is_identity() {
		let mac = mac::by_name(mac::HMAC_SHA256).unwrap();
		let mut key = Clear.make_opening_key(&[], &[], &[], mac).unwrap();
		assert_eq!(key.decrypt_packet_length(0, [1, 2, 3, 4]).unwrap(), [1, 2, 3, 4]);
	}
}
