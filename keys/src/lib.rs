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

//! Public-key algorithms (C3) and key-file codecs (C6): RSA, DSA, ECDSA,
//! EdDSA, Diffie-Hellman and its elliptic-curve variants, RSA key
//! exchange, OpenSSH certificates, and the PPK/SSH-1/OpenSSH file
//! formats that store and exchange them.

pub mod cert;
pub mod dh;
pub mod dsa;
pub mod ecdh;
pub mod ecdsa;
pub mod eddsa;
pub mod encoding;
pub mod error;
pub mod fingerprint;
pub mod key;
pub mod openssh;
pub mod ppk;
pub mod rsa;
pub mod rsa_kex;
pub mod ssh1;

pub use error::{Error, Result};
pub use key::{Curve, KeyPair, PublicKey, Signature, SignFlags};

use encoding::Reader;

/// Parse any supported SSH2 public-key wire blob (RFC 4253 §6.6), or an
/// OpenSSH certificate blob, dispatching on its leading algorithm-name
/// string (spec.md §3's `Key` capability record).
pub fn parse_public_key(data:&[u8]) -> Result<PublicKey> {
	let mut r = Reader::new(data);
	let name = r.utf8_string()?;

	if name.ends_with("-cert-v01@openssh.com") {
		return Ok(PublicKey::Cert(Box::new(cert::parse_certificate(&name, r.remaining())?)));
	}

	match name.as_str() {
		"ssh-rsa" => Ok(PublicKey::Rsa(rsa::RsaPublicKey::from_public_blob(data)?)),
		"ssh-dss" => Ok(PublicKey::Dsa(dsa::DsaPublicKey::from_public_blob(data)?)),
		"ecdsa-sha2-nistp256" | "ecdsa-sha2-nistp384" | "ecdsa-sha2-nistp521" => {
			Ok(PublicKey::Ecdsa(ecdsa::EcdsaPublicKey::from_public_blob(data)?))
		}
		"ssh-ed25519" => Ok(PublicKey::Ed25519(eddsa::Ed25519PublicKey::from_public_blob(data)?)),
		"ssh-ed448" => Ok(PublicKey::Ed448(eddsa::Ed448PublicKey::from_public_blob(data)?)),
		other => Err(Error::UnsupportedKeyType(other.to_string())),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::eddsa::Ed25519KeyPair;

	#[test]
	fn parse_public_key_round_trips_each_algorithm() {
		let kp = KeyPair::Ed25519(Ed25519KeyPair::generate_from_seed(&[3u8; 32]));
		let parsed = parse_public_key(&kp.public_key().public_blob()).unwrap();
		assert_eq!(parsed.algorithm_name(), "ssh-ed25519");
	}

	#[test]
	fn parse_public_key_rejects_unknown_algorithm() {
		let mut blob = Vec::new();
		use crate::encoding::BinarySink;
		blob.put_string(b"ssh-made-up");
		assert!(matches!(parse_public_key(&blob), Err(Error::UnsupportedKeyType(_))));
	}
}
