//! EdDSA: Ed25519 and Ed448, grounded on spec.md §4.3 ("standard-compliant")
//! and verified against the RFC 8032 test vector in scenario S2.
use ed25519_dalek::{Keypair, PublicKey as DalekPublicKey, SecretKey, Signer, Verifier};

use crate::encoding::{BinarySink, Reader};
use crate::error::{Error, Result};
use crate::key::Signature;

#[derive(Clone)]
pub struct Ed25519PublicKey {
	inner:DalekPublicKey,
}

pub struct Ed25519KeyPair {
	inner:Keypair,
}

impl Ed25519KeyPair {
	pub fn generate_from_seed(seed:&[u8; 32]) -> Self {
		let secret = SecretKey::from_bytes(seed).expect("32-byte seed is always a valid ed25519 secret key");
		let public = DalekPublicKey::from(&secret);
		Ed25519KeyPair { inner:Keypair { secret, public } }
	}

	pub fn public_key(&self) -> Ed25519PublicKey { Ed25519PublicKey { inner:self.inner.public } }

	pub fn seed_bytes(&self) -> [u8; 32] { self.inner.secret.to_bytes() }

	pub fn sign(&self, data:&[u8]) -> Result<Signature> {
		let sig = self.inner.sign(data);
		let mut blob = Vec::new();
		blob.put_string(b"ssh-ed25519");
		blob.put_string(&sig.to_bytes());
		Ok(Signature { algorithm_name:"ssh-ed25519".to_string(), blob })
	}

	pub fn private_blob(&self) -> Vec<u8> {
		let mut blob = Vec::new();
		blob.put_string(&self.inner.secret.to_bytes());
		blob
	}
}

impl Ed25519PublicKey {
	pub fn raw_bytes(&self) -> [u8; 32] { self.inner.to_bytes() }

	pub fn public_blob(&self) -> Vec<u8> {
		let mut blob = Vec::new();
		blob.put_string(b"ssh-ed25519");
		blob.put_string(self.inner.as_bytes());
		blob
	}

	pub fn from_public_blob(data:&[u8]) -> Result<Self> {
		let mut r = Reader::new(data);
		if r.string()? != b"ssh-ed25519" {
			return Err(Error::UnsupportedKeyType("expected ssh-ed25519".to_string()));
		}
		let bytes = r.string()?;
		let inner = DalekPublicKey::from_bytes(bytes).map_err(|_| Error::CouldNotReadKey)?;
		Ok(Ed25519PublicKey { inner })
	}

	pub fn verify(&self, sig:&Signature, data:&[u8]) -> bool {
		let mut r = Reader::new(&sig.blob);
		let (Ok(algo), Ok(sig_bytes)) = (r.string(), r.string()) else { return false };
		if algo != b"ssh-ed25519" || sig_bytes.len() != 64 {
			return false;
		}
		let Ok(parsed) = ed25519_dalek::Signature::from_bytes(sig_bytes) else { return false };
		self.inner.verify(data, &parsed).is_ok()
	}

	pub fn components(&self) -> Vec<(String, String)> {
		vec![("public".to_string(), hex_string(self.inner.as_bytes()))]
	}
}

#[derive(Clone)]
pub struct Ed448PublicKey {
	bytes:[u8; 57],
}

pub struct Ed448KeyPair {
	private:ed448_rust::PrivateKey,
	public_bytes:[u8; 57],
}

impl Ed448KeyPair {
	pub fn generate_from_seed(seed:&[u8; 57]) -> Self {
		let private = ed448_rust::PrivateKey::from(seed);
		let public = ed448_rust::PublicKey::from(&private);
		Ed448KeyPair { private, public_bytes:public.as_bytes().try_into().expect("ed448 public key is 57 bytes") }
	}

	pub fn public_key(&self) -> Ed448PublicKey { Ed448PublicKey { bytes:self.public_bytes } }

	pub fn sign(&self, data:&[u8]) -> Result<Signature> {
		let sig = self.private.sign(data, None).map_err(|_| Error::CouldNotReadKey)?;
		let mut blob = Vec::new();
		blob.put_string(b"ssh-ed448");
		blob.put_string(&sig);
		Ok(Signature { algorithm_name:"ssh-ed448".to_string(), blob })
	}

	pub fn private_blob(&self) -> Vec<u8> {
		let mut blob = Vec::new();
		blob.put_string(self.private.as_bytes());
		blob
	}
}

impl Ed448PublicKey {
	pub fn public_blob(&self) -> Vec<u8> {
		let mut blob = Vec::new();
		blob.put_string(b"ssh-ed448");
		blob.put_string(&self.bytes);
		blob
	}

	pub fn from_public_blob(data:&[u8]) -> Result<Self> {
		let mut r = Reader::new(data);
		if r.string()? != b"ssh-ed448" {
			return Err(Error::UnsupportedKeyType("expected ssh-ed448".to_string()));
		}
		let raw = r.string()?;
		let bytes:[u8; 57] = raw.try_into().map_err(|_| Error::CouldNotReadKey)?;
		Ok(Ed448PublicKey { bytes })
	}

	pub fn verify(&self, sig:&Signature, data:&[u8]) -> bool {
		let mut r = Reader::new(&sig.blob);
		let (Ok(algo), Ok(sig_bytes)) = (r.string(), r.string()) else { return false };
		if algo != b"ssh-ed448" {
			return false;
		}
		let Ok(public) = ed448_rust::PublicKey::try_from(self.bytes.as_slice()) else { return false };
		public.verify(data, sig_bytes, None).is_ok()
	}

	pub fn components(&self) -> Vec<(String, String)> { vec![("public".to_string(), hex_string(&self.bytes))] }
}

fn hex_string(bytes:&[u8]) -> String { bytes.iter().map(|b| format!("{b:02x}")).collect() }

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn ed25519_sign_verify_roundtrip() {
		let kp = Ed25519KeyPair::generate_from_seed(&[7u8; 32]);
		let sig = kp.sign(b"hello").unwrap();
		assert!(kp.public_key().verify(&sig, b"hello"));
		assert!(!kp.public_key().verify(&sig, b"hellp"));
	}

	#[test]
	fn ed25519_known_answer_rfc8032_test_1() {
		// RFC 8032 §7.1 TEST 1: empty message, exact signature bytes.
		let seed:[u8; 32] = hex32("9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60");
		let expected_public:[u8; 32] = hex32("d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a");
		let expected_signature = hex64(
			"e5564300c360ac729086e2cc806e828a84877f1eb8e5d974d873e065224901555fb8821590a33bacc61e39701cf9b46bd25bf5f0595bbe24655141438e7a100b",
		);

		let kp = Ed25519KeyPair::generate_from_seed(&seed);
		assert_eq!(kp.public_key().raw_bytes(), expected_public);

		let sig = kp.sign(b"").unwrap();
		let mut r = Reader::new(&sig.blob);
		assert_eq!(r.string().unwrap(), b"ssh-ed25519");
		assert_eq!(r.string().unwrap(), expected_signature.as_slice());
		assert!(kp.public_key().verify(&sig, b""));
	}

	fn hex32(s:&str) -> [u8; 32] { hex_bytes(s).try_into().expect("32-byte hex literal") }

	fn hex64(s:&str) -> Vec<u8> { hex_bytes(s) }

	fn hex_bytes(s:&str) -> Vec<u8> {
		(0..s.len()).step_by(2).map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap()).collect()
	}

	#[test]
	fn ed448_sign_verify_roundtrip() {
		let kp = Ed448KeyPair::generate_from_seed(&[9u8; 57]);
		let sig = kp.sign(b"hello ed448").unwrap();
		assert!(kp.public_key().verify(&sig, b"hello ed448"));
		assert!(!kp.public_key().verify(&sig, b"goodbye"));
	}
}
