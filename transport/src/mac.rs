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

//! HMAC-family MACs (spec.md §4.4): `hmac-sha1`, `hmac-sha1-96`,
//! `hmac-sha2-256`, `hmac-md5`, and their `-etm@openssh.com`
//! (encrypt-then-MAC) counterparts. Poly1305 is bound to ChaCha20 and
//! lives in `cipher::chacha20poly1305` instead, since it is never used
//! standalone.
use std::collections::HashMap;

use hmac::{Hmac, Mac as HmacTrait};
use md5::Md5;
use once_cell::sync::Lazy;
use sha1::Sha1;
use sha2::Sha256;
use subtle::ConstantTimeEq;

pub(crate) trait MacAlgorithm {
	fn key_len(&self) -> usize;

	fn mac_len(&self) -> usize;

	/// `-etm@openssh.com` variants MAC the ciphertext (including the
	/// unencrypted length field) rather than the plaintext.
	fn is_etm(&self) -> bool { false }

	fn compute(&self, key:&[u8], seqn:u32, data:&[u8]) -> Vec<u8>;

	fn verify(&self, key:&[u8], seqn:u32, data:&[u8], tag:&[u8]) -> bool {
		let expected = self.compute(key, seqn, data);
		// Constant-time: a length mismatch still walks the shorter
		// buffer rather than returning immediately.
		let len = expected.len().min(tag.len());
		let ok = expected[..len].ct_eq(&tag[..len]).unwrap_u8() == 1;
		ok && expected.len() == tag.len()
	}
}

fn with_seqn(seqn:u32, data:&[u8]) -> Vec<u8> {
	let mut buf = Vec::with_capacity(4 + data.len());
	buf.extend_from_slice(&seqn.to_be_bytes());
	buf.extend_from_slice(data);
	buf
}

macro_rules! hmac_algorithm {
	($name:ident, $digest:ty, $key_len:expr, $mac_len:expr, $etm:expr) => {
		struct $name;
		impl MacAlgorithm for $name {
			fn key_len(&self) -> usize { $key_len }

			fn mac_len(&self) -> usize { $mac_len }

			fn is_etm(&self) -> bool { $etm }

			fn compute(&self, key:&[u8], seqn:u32, data:&[u8]) -> Vec<u8> {
				let mut mac = <Hmac<$digest> as HmacTrait>::new_from_slice(key).expect("HMAC accepts any key length");
				mac.update(&with_seqn(seqn, data));
				mac.finalize().into_bytes()[..$mac_len].to_vec()
			}
		}
	};
}

hmac_algorithm!(HmacSha1, Sha1, 20, 20, false);
hmac_algorithm!(HmacSha196, Sha1, 20, 12, false);
hmac_algorithm!(HmacSha256, Sha256, 32, 32, false);
hmac_algorithm!(HmacMd5, Md5, 16, 16, false);
hmac_algorithm!(HmacSha1Etm, Sha1, 20, 20, true);
hmac_algorithm!(HmacSha196Etm, Sha1, 20, 12, true);
hmac_algorithm!(HmacSha256Etm, Sha256, 32, 32, true);

pub const NONE:&str = "none";
pub const HMAC_SHA1:&str = "hmac-sha1";
pub const HMAC_SHA1_96:&str = "hmac-sha1-96";
pub const HMAC_SHA256:&str = "hmac-sha2-256";
pub const HMAC_MD5:&str = "hmac-md5";
pub const HMAC_SHA1_ETM:&str = "hmac-sha1-etm@openssh.com";
pub const HMAC_SHA1_96_ETM:&str = "hmac-sha1-96-etm@openssh.com";
pub const HMAC_SHA256_ETM:&str = "hmac-sha2-256-etm@openssh.com";

static _SHA1:HmacSha1 = HmacSha1;
static _SHA1_96:HmacSha196 = HmacSha196;
static _SHA256:HmacSha256 = HmacSha256;
static _MD5:HmacMd5 = HmacMd5;
static _SHA1_ETM:HmacSha1Etm = HmacSha1Etm;
static _SHA1_96_ETM:HmacSha196Etm = HmacSha196Etm;
static _SHA256_ETM:HmacSha256Etm = HmacSha256Etm;

pub(crate) static MACS:Lazy<HashMap<&'static str, &'static (dyn MacAlgorithm + Send + Sync)>> = Lazy::new(|| {
	let mut h:HashMap<&'static str, &'static (dyn MacAlgorithm + Send + Sync)> = HashMap::new();
	h.insert(HMAC_SHA1, &_SHA1);
	h.insert(HMAC_SHA1_96, &_SHA1_96);
	h.insert(HMAC_SHA256, &_SHA256);
	h.insert(HMAC_MD5, &_MD5);
	h.insert(HMAC_SHA1_ETM, &_SHA1_ETM);
	h.insert(HMAC_SHA1_96_ETM, &_SHA1_96_ETM);
	h.insert(HMAC_SHA256_ETM, &_SHA256_ETM);
	h
});

pub(crate) fn by_name(name:&str) -> Option<&'static (dyn MacAlgorithm + Send + Sync)> { MACS.get(name).copied() }

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn hmac_sha256_verifies_its_own_tag_and_rejects_tamper() {
		let mac = by_name(HMAC_SHA256).unwrap();
		let key = [7u8; 32];
		let tag = mac.compute(&key, 1, b"payload");
		assert!(mac.verify(&key, 1, b"payload", &tag));
		assert!(!mac.verify(&key, 1, b"payload", &vec![0u8; tag.len()]));
		assert!(!mac.verify(&key, 2, b"payload", &tag));
	}

	#[test]
	fn hmac_sha1_96_truncates_to_twelve_bytes() {
		let mac = by_name(HMAC_SHA1_96).unwrap();
		assert_eq!(mac.compute(&[1u8; 20], 0, b"x").len(), 12);
	}

	#[test]
	fn etm_variants_are_flagged() {
		assert!(by_name(HMAC_SHA1_ETM).unwrap().is_etm());
		assert!(!by_name(HMAC_SHA1).unwrap().is_etm());
	}
}
