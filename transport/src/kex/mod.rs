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

//! Key exchange algorithms (spec.md §4.3/§4.5): DH-group, DH-GEX,
//! ECDH, RSA-kex, each producing a shared secret `K` and contributing
//! to the exchange hash `H`.
pub mod dh;
pub mod ecdh;
pub mod rsakex;

use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};

use crate::error::Result;

pub const DH_GROUP14_SHA256:&str = "diffie-hellman-group14-sha256";
pub const DH_GROUP14_SHA1:&str = "diffie-hellman-group14-sha1";
pub const DH_GEX_SHA256:&str = "diffie-hellman-group-exchange-sha256";
pub const CURVE25519_SHA256:&str = "curve25519-sha256";
pub const CURVE25519_SHA256_LIBSSH:&str = "curve25519-sha256@libssh.org";
pub const CURVE448_SHA512:&str = "curve448-sha512";
pub const ECDH_NISTP256:&str = "ecdh-sha2-nistp256";
pub const ECDH_NISTP384:&str = "ecdh-sha2-nistp384";
pub const ECDH_NISTP521:&str = "ecdh-sha2-nistp521";
pub const RSA_2048_SHA256:&str = "rsa2048-sha256";

/// The hash family an exchange hashes its transcript with, bound 1:1
/// to the kex algorithm name (RFC 4253/8731/8732).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
	Sha1,
	Sha256,
	Sha512,
}

pub fn hash_algorithm_for(kex_name:&str) -> HashAlgorithm {
	match kex_name {
		DH_GROUP14_SHA1 => HashAlgorithm::Sha1,
		CURVE448_SHA512 => HashAlgorithm::Sha512,
		ECDH_NISTP384 => HashAlgorithm::Sha256,
		ECDH_NISTP521 => HashAlgorithm::Sha256,
		_ => HashAlgorithm::Sha256,
	}
}

/// Concatenate the transcript fields in RFC 4253 §8 order and hash
/// them with the algorithm this kex name implies.
pub fn exchange_hash(kex_name:&str, transcript:&[&[u8]]) -> Vec<u8> {
	match hash_algorithm_for(kex_name) {
		HashAlgorithm::Sha1 => {
			let mut h = Sha1::new();
			for field in transcript {
				h.update(field);
			}
			h.finalize().to_vec()
		}
		HashAlgorithm::Sha256 => {
			let mut h = Sha256::new();
			for field in transcript {
				h.update(field);
			}
			h.finalize().to_vec()
		}
		HashAlgorithm::Sha512 => {
			let mut h = Sha512::new();
			for field in transcript {
				h.update(field);
			}
			h.finalize().to_vec()
		}
	}
}

/// Outcome of running a kex algorithm to completion: the shared secret
/// (encoded as an SSH mpint) and the exchange hash.
pub struct KexResult {
	pub shared_secret:Vec<u8>,
	pub exchange_hash:Vec<u8>,
}

pub const ALL_KEX_NAMES:&[&str] = &[
	CURVE25519_SHA256,
	CURVE25519_SHA256_LIBSSH,
	CURVE448_SHA512,
	ECDH_NISTP256,
	ECDH_NISTP384,
	ECDH_NISTP521,
	DH_GROUP14_SHA256,
	DH_GEX_SHA256,
	RSA_2048_SHA256,
	DH_GROUP14_SHA1,
];

/// Encode an unsigned big-endian integer as an SSH `mpint` (RFC 4251
/// §5): a leading `0x00` is prepended if the high bit of the first
/// byte would otherwise be set, so the value reads as non-negative.
pub fn encode_mpint(bytes:&[u8]) -> Vec<u8> {
	let trimmed = {
		let mut i = 0;
		while i < bytes.len() - 1 && bytes[i] == 0 {
			i += 1;
		}
		&bytes[i..]
	};
	let needs_pad = trimmed.first().map(|b| b & 0x80 != 0).unwrap_or(false);
	let len = trimmed.len() + if needs_pad { 1 } else { 0 };
	let mut out = Vec::with_capacity(4 + len);
	out.extend_from_slice(&(len as u32).to_be_bytes());
	if needs_pad {
		out.push(0);
	}
	out.extend_from_slice(trimmed);
	out
}

#[allow(dead_code)]
pub(crate) fn noop_result() -> Result<()> { Ok(()) }

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn hash_algorithm_follows_the_kex_name() {
		assert_eq!(hash_algorithm_for(DH_GROUP14_SHA1), HashAlgorithm::Sha1);
		assert_eq!(hash_algorithm_for(CURVE448_SHA512), HashAlgorithm::Sha512);
		assert_eq!(hash_algorithm_for(CURVE25519_SHA256), HashAlgorithm::Sha256);
	}

	#[test]
	fn encode_mpint_pads_high_bit_values() {
		assert_eq!(encode_mpint(&[0x80]), vec![0, 0, 0, 2, 0, 0x80]);
		assert_eq!(encode_mpint(&[0x7f]), vec![0, 0, 0, 1, 0x7f]);
		assert_eq!(encode_mpint(&[0, 0, 1]), vec![0, 0, 0, 1, 1]);
	}
}
