//! ECDSA over the NIST Weierstrass curves P-256/384/521, grounded on
//! spec.md §4.3: signing uses a deterministic per-message nonce (the same
//! defence DSA takes), and `ecdsa_public` is just base-point scalar
//! multiplication by the private scalar — both handled internally by the
//! RustCrypto `p256`/`p384`/`p521` crates' RFC 6979 signers.
use p256::ecdsa::{Signature as P256Signature, SigningKey as P256Signing, VerifyingKey as P256Verifying};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p384::ecdsa::{Signature as P384Signature, SigningKey as P384Signing, VerifyingKey as P384Verifying};
use p521::ecdsa::{Signature as P521Signature, SigningKey as P521Signing, VerifyingKey as P521Verifying};
use pssh_mpint::EntropySource;
use signature::{Signature as SignatureTrait, Signer, Verifier};

use crate::encoding::{BinarySink, Reader};
use crate::error::{Error, Result};
use crate::key::{Curve, Signature};

#[derive(Clone)]
pub enum EcdsaPublicKey {
	P256(P256Verifying),
	P384(P384Verifying),
	P521(P521Verifying),
}

pub enum EcdsaKeyPair {
	P256(P256Signing),
	P384(P384Signing),
	P521(P521Signing),
}

impl EcdsaKeyPair {
	pub fn curve(&self) -> Curve {
		match self {
			EcdsaKeyPair::P256(_) => Curve::NistP256,
			EcdsaKeyPair::P384(_) => Curve::NistP384,
			EcdsaKeyPair::P521(_) => Curve::NistP521,
		}
	}

	/// Draws raw scalar bytes from our own [`EntropySource`] rather than
	/// going through `rand_core`'s `CryptoRng`, so the ecdsa crates' own
	/// (possibly newer) `rand_core` major version never has to line up
	/// with the one `pssh-mpint` exposes. A scalar landing outside
	/// `[1, order)` is vanishingly rare; we just redraw.
	pub fn generate(curve:Curve, rng:&mut dyn EntropySource) -> Self {
		loop {
			let mut bytes = vec![0u8; curve.scalar_len()];
			rng.fill_bytes(&mut bytes);
			let key = match curve {
				Curve::NistP256 => P256Signing::from_slice(&bytes).ok().map(EcdsaKeyPair::P256),
				Curve::NistP384 => P384Signing::from_slice(&bytes).ok().map(EcdsaKeyPair::P384),
				Curve::NistP521 => P521Signing::from_slice(&bytes).ok().map(EcdsaKeyPair::P521),
			};
			if let Some(key) = key {
				return key;
			}
		}
	}

	pub fn public_key(&self) -> EcdsaPublicKey {
		match self {
			EcdsaKeyPair::P256(k) => EcdsaPublicKey::P256(*k.verifying_key()),
			EcdsaKeyPair::P384(k) => EcdsaPublicKey::P384(*k.verifying_key()),
			EcdsaKeyPair::P521(k) => EcdsaPublicKey::P521(*k.verifying_key()),
		}
	}

	/// Reconstruct a key pair from its raw private scalar, as stored by
	/// the OpenSSH new-format container (`openssh.rs`).
	pub fn from_scalar_bytes(curve:Curve, bytes:&[u8]) -> Result<Self> {
		match curve {
			Curve::NistP256 => Ok(EcdsaKeyPair::P256(P256Signing::from_slice(bytes).map_err(|_| Error::CouldNotReadKey)?)),
			Curve::NistP384 => Ok(EcdsaKeyPair::P384(P384Signing::from_slice(bytes).map_err(|_| Error::CouldNotReadKey)?)),
			Curve::NistP521 => Ok(EcdsaKeyPair::P521(P521Signing::from_slice(bytes).map_err(|_| Error::CouldNotReadKey)?)),
		}
	}

	pub fn sign(&self, data:&[u8]) -> Result<Signature> {
		let (algorithm_name, r_s) = match self {
			EcdsaKeyPair::P256(k) => {
				let sig:P256Signature = k.sign(data);
				("ecdsa-sha2-nistp256", sig.as_bytes().to_vec())
			}
			EcdsaKeyPair::P384(k) => {
				let sig:P384Signature = k.sign(data);
				("ecdsa-sha2-nistp384", sig.as_bytes().to_vec())
			}
			EcdsaKeyPair::P521(k) => {
				let sig:P521Signature = k.sign(data);
				("ecdsa-sha2-nistp521", sig.as_bytes().to_vec())
			}
		};

		let mut blob = Vec::new();
		blob.put_string(algorithm_name.as_bytes());
		blob.put_string(&r_s);
		Ok(Signature { algorithm_name:algorithm_name.to_string(), blob })
	}

	/// The raw private scalar, with no further framing.
	pub fn scalar_bytes(&self) -> Vec<u8> {
		match self {
			EcdsaKeyPair::P256(k) => k.to_bytes().to_vec(),
			EcdsaKeyPair::P384(k) => k.to_bytes().to_vec(),
			EcdsaKeyPair::P521(k) => k.to_bytes().to_vec(),
		}
	}

	pub fn private_blob(&self) -> Vec<u8> {
		let bytes = self.scalar_bytes();
		let mut blob = Vec::new();
		blob.put_string(&bytes);
		blob
	}
}

impl EcdsaPublicKey {
	pub fn curve(&self) -> Curve {
		match self {
			EcdsaPublicKey::P256(_) => Curve::NistP256,
			EcdsaPublicKey::P384(_) => Curve::NistP384,
			EcdsaPublicKey::P521(_) => Curve::NistP521,
		}
	}

	pub fn algorithm_name(&self) -> &'static str {
		match self {
			EcdsaPublicKey::P256(_) => "ecdsa-sha2-nistp256",
			EcdsaPublicKey::P384(_) => "ecdsa-sha2-nistp384",
			EcdsaPublicKey::P521(_) => "ecdsa-sha2-nistp521",
		}
	}

	/// The raw SEC1 uncompressed point, with no further framing.
	pub fn point_bytes(&self) -> Vec<u8> {
		match self {
			EcdsaPublicKey::P256(k) => k.to_encoded_point(false).as_bytes().to_vec(),
			EcdsaPublicKey::P384(k) => k.to_encoded_point(false).as_bytes().to_vec(),
			EcdsaPublicKey::P521(k) => k.to_encoded_point(false).as_bytes().to_vec(),
		}
	}

	/// SEC1 uncompressed point encoding, as spec.md §3 requires for
	/// Weierstrass curves.
	pub fn public_blob(&self) -> Vec<u8> {
		let name = self.algorithm_name();
		let point = self.point_bytes();
		let mut blob = Vec::new();
		blob.put_string(name.as_bytes());
		blob.put_string(Curve::from_algorithm_name(name).unwrap().name().as_bytes());
		blob.put_string(&point);
		blob
	}

	pub fn from_public_blob(data:&[u8]) -> Result<Self> {
		let mut r = Reader::new(data);
		let algo = r.utf8_string()?;
		let _curve_name = r.string()?;
		let point = r.string()?;
		match algo.as_str() {
			"ecdsa-sha2-nistp256" => {
				Ok(EcdsaPublicKey::P256(P256Verifying::from_sec1_bytes(point).map_err(|_| Error::CouldNotReadKey)?))
			}
			"ecdsa-sha2-nistp384" => {
				Ok(EcdsaPublicKey::P384(P384Verifying::from_sec1_bytes(point).map_err(|_| Error::CouldNotReadKey)?))
			}
			"ecdsa-sha2-nistp521" => {
				Ok(EcdsaPublicKey::P521(P521Verifying::from_sec1_bytes(point).map_err(|_| Error::CouldNotReadKey)?))
			}
			other => Err(Error::UnsupportedKeyType(other.to_string())),
		}
	}

	pub fn verify(&self, sig:&Signature, data:&[u8]) -> bool {
		let mut r = Reader::new(&sig.blob);
		let (Ok(_algo), Ok(blob)) = (r.string(), r.string()) else { return false };
		match self {
			EcdsaPublicKey::P256(k) => P256Signature::from_bytes(blob).map(|s| k.verify(data, &s).is_ok()).unwrap_or(false),
			EcdsaPublicKey::P384(k) => P384Signature::from_bytes(blob).map(|s| k.verify(data, &s).is_ok()).unwrap_or(false),
			EcdsaPublicKey::P521(k) => P521Signature::from_bytes(blob).map(|s| k.verify(data, &s).is_ok()).unwrap_or(false),
		}
	}

	pub fn components(&self) -> Vec<(String, String)> {
		vec![("curve".to_string(), self.curve().name().to_string())]
	}
}

impl Curve {
	fn from_algorithm_name(name:&str) -> Option<Curve> {
		match name {
			"ecdsa-sha2-nistp256" => Some(Curve::NistP256),
			"ecdsa-sha2-nistp384" => Some(Curve::NistP384),
			"ecdsa-sha2-nistp521" => Some(Curve::NistP521),
			_ => None,
		}
	}

	fn scalar_len(self) -> usize {
		match self {
			Curve::NistP256 => 32,
			Curve::NistP384 => 48,
			Curve::NistP521 => 66,
		}
	}
}

#[cfg(test)]
mod tests {
	use pssh_mpint::TestRng;

	use super::*;

	#[test]
	fn p256_sign_verify_roundtrip() {
		let mut rng = TestRng::new(61);
		let kp = EcdsaKeyPair::generate(Curve::NistP256, &mut rng);
		let sig = kp.sign(b"hello ecdsa").unwrap();
		assert!(kp.public_key().verify(&sig, b"hello ecdsa"));
		assert!(!kp.public_key().verify(&sig, b"hellp ecdsa"));
	}

	#[test]
	fn p384_sign_verify_roundtrip() {
		let mut rng = TestRng::new(62);
		let kp = EcdsaKeyPair::generate(Curve::NistP384, &mut rng);
		let sig = kp.sign(b"hello ecdsa").unwrap();
		assert!(kp.public_key().verify(&sig, b"hello ecdsa"));
	}

	#[test]
	fn public_blob_roundtrip() {
		let mut rng = TestRng::new(63);
		let kp = EcdsaKeyPair::generate(Curve::NistP256, &mut rng);
		let blob = kp.public_key().public_blob();
		let parsed = EcdsaPublicKey::from_public_blob(&blob).unwrap();
		assert_eq!(parsed.public_blob(), blob);
	}
}
