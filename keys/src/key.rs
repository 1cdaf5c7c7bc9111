//! The `Key` capability layer: a single type each for public keys and
//! key pairs, dispatching to the algorithm-specific modules. Spec.md §3
//! models this as "variant over {RSA, DSA, ECDSA(curve), EdDSA(curve),
//! *-cert}"; we follow the teacher's vtable-as-enum pattern (see
//! `ssh_key`/`Cipher` in `transport::cipher`) rather than `Box<dyn
//! Trait>`, since the algorithm set is closed and known at compile time.
use std::fmt;

use crate::cert::Certificate;
use crate::error::Result;
use crate::{dsa, ecdsa, eddsa, rsa};

/// NIST Weierstrass curves used by ECDSA (spec.md §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Curve {
	NistP256,
	NistP384,
	NistP521,
}

impl Curve {
	pub fn name(self) -> &'static str {
		match self {
			Curve::NistP256 => "nistp256",
			Curve::NistP384 => "nistp384",
			Curve::NistP521 => "nistp521",
		}
	}
}

/// Which digest to use for an RSA signature; negotiated independently of
/// key generation (spec.md §4.3: `ssh-rsa`/`rsa-sha2-256`/`rsa-sha2-512`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignFlags {
	#[default]
	Sha1,
	Sha256,
	Sha512,
}

#[derive(Debug, Clone)]
pub struct Signature {
	pub algorithm_name:String,
	pub blob:Vec<u8>,
}

/// A public key, of any supported algorithm or its certificate variant.
#[derive(Clone)]
pub enum PublicKey {
	Rsa(rsa::RsaPublicKey),
	Dsa(dsa::DsaPublicKey),
	Ecdsa(ecdsa::EcdsaPublicKey),
	Ed25519(eddsa::Ed25519PublicKey),
	Ed448(eddsa::Ed448PublicKey),
	Cert(Box<Certificate>),
}

/// A private/public key pair capable of signing.
pub enum KeyPair {
	Rsa(rsa::RsaKeyPair),
	Dsa(dsa::DsaKeyPair),
	Ecdsa(ecdsa::EcdsaKeyPair),
	Ed25519(eddsa::Ed25519KeyPair),
	Ed448(eddsa::Ed448KeyPair),
}

impl fmt::Debug for KeyPair {
	fn fmt(&self, f:&mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "KeyPair({})", self.public_key().algorithm_name()) }
}

impl PublicKey {
	pub fn algorithm_name(&self) -> &str {
		match self {
			PublicKey::Rsa(_) => "ssh-rsa",
			PublicKey::Dsa(_) => "ssh-dss",
			PublicKey::Ecdsa(k) => k.algorithm_name(),
			PublicKey::Ed25519(_) => "ssh-ed25519",
			PublicKey::Ed448(_) => "ssh-ed448",
			PublicKey::Cert(c) => c.algorithm_name(),
		}
	}

	/// The SSH2 public-key wire blob (RFC 4253 §6.6).
	pub fn public_blob(&self) -> Vec<u8> {
		match self {
			PublicKey::Rsa(k) => k.public_blob(),
			PublicKey::Dsa(k) => k.public_blob(),
			PublicKey::Ecdsa(k) => k.public_blob(),
			PublicKey::Ed25519(k) => k.public_blob(),
			PublicKey::Ed448(k) => k.public_blob(),
			PublicKey::Cert(c) => c.public_blob(),
		}
	}

	/// Same as `public_blob` unless the algorithm has a distinct
	/// OpenSSH-specific encoding (none currently do; kept distinct per
	/// spec.md §3's `Key` capability record).
	pub fn openssh_blob(&self) -> Vec<u8> { self.public_blob() }

	pub fn verify(&self, sig:&Signature, data:&[u8]) -> bool {
		match self {
			PublicKey::Rsa(k) => k.verify(sig, data),
			PublicKey::Dsa(k) => k.verify(sig, data),
			PublicKey::Ecdsa(k) => k.verify(sig, data),
			PublicKey::Ed25519(k) => k.verify(sig, data),
			PublicKey::Ed448(k) => k.verify(sig, data),
			PublicKey::Cert(c) => c.base_key().verify(sig, data),
		}
	}

	/// Human-readable component list for debug UIs (spec.md §3
	/// `components`).
	pub fn components(&self) -> Vec<(String, String)> {
		match self {
			PublicKey::Rsa(k) => k.components(),
			PublicKey::Dsa(k) => k.components(),
			PublicKey::Ecdsa(k) => k.components(),
			PublicKey::Ed25519(k) => k.components(),
			PublicKey::Ed448(k) => k.components(),
			PublicKey::Cert(c) => c.base_key().components(),
		}
	}

	/// A short cache key, e.g. for the host-key cache
	/// (`host:port:keytype -> blob`, spec.md §6).
	pub fn cache_str(&self) -> String {
		format!("{}:{}", self.algorithm_name(), crate::fingerprint::sha256_base64(&self.public_blob()))
	}

	/// Returns `Some(reason)` if this key is unfit for use under the
	/// given sign flags (e.g. an RSA key too short for rsa-sha2-512, or
	/// an expired certificate reached through `Cert`).
	pub fn invalid(&self, flags:SignFlags) -> Option<String> {
		match self {
			PublicKey::Rsa(k) => k.invalid(flags),
			PublicKey::Cert(c) => c.base_key().invalid(flags),
			_ => None,
		}
	}

	pub fn base_key(&self) -> &PublicKey {
		match self {
			PublicKey::Cert(c) => c.base_key(),
			other => other,
		}
	}
}

impl KeyPair {
	pub fn public_key(&self) -> PublicKey {
		match self {
			KeyPair::Rsa(k) => PublicKey::Rsa(k.public_key()),
			KeyPair::Dsa(k) => PublicKey::Dsa(k.public_key()),
			KeyPair::Ecdsa(k) => PublicKey::Ecdsa(k.public_key()),
			KeyPair::Ed25519(k) => PublicKey::Ed25519(k.public_key()),
			KeyPair::Ed448(k) => PublicKey::Ed448(k.public_key()),
		}
	}

	pub fn sign(&self, data:&[u8], flags:SignFlags) -> Result<Signature> {
		match self {
			KeyPair::Rsa(k) => k.sign(data, flags),
			KeyPair::Dsa(k) => k.sign(data),
			KeyPair::Ecdsa(k) => k.sign(data),
			KeyPair::Ed25519(k) => k.sign(data),
			KeyPair::Ed448(k) => k.sign(data),
		}
	}

	/// The algorithm-specific private-key wire blob, as used by PPK and
	/// OpenSSH codecs (spec.md §3 `private_blob`).
	pub fn private_blob(&self) -> Vec<u8> {
		match self {
			KeyPair::Rsa(k) => k.private_blob(),
			KeyPair::Dsa(k) => k.private_blob(),
			KeyPair::Ecdsa(k) => k.private_blob(),
			KeyPair::Ed25519(k) => k.private_blob(),
			KeyPair::Ed448(k) => k.private_blob(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn verify_accepts_own_signature_and_rejects_tamper() {
		let kp = KeyPair::Ed25519(eddsa::Ed25519KeyPair::generate_from_seed(&[7u8; 32]));
		let sig = kp.sign(b"hello", SignFlags::default()).unwrap();
		let pk = kp.public_key();
		assert!(pk.verify(&sig, b"hello"));
		assert!(!pk.verify(&sig, b"hellp"));
	}
}
