//! Elliptic-curve Diffie-Hellman: Curve25519/Curve448 (x-only ladder) and
//! NIST curves (spec.md §4.3). Montgomery-curve public keys are the
//! fixed-width little-endian x-coordinate; Weierstrass public keys are the
//! SEC1 uncompressed point, matching the encoding `ecdsa.rs` uses.
use p256::ecdh::diffie_hellman as p256_diffie_hellman;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use pssh_mpint::EntropySource;

use crate::error::{Error, Result};
use crate::key::Curve;

pub struct X25519Exchange {
	secret:x25519_dalek::StaticSecret,
	pub public:x25519_dalek::PublicKey,
}

impl X25519Exchange {
	pub fn generate(rng:&mut dyn EntropySource) -> Self {
		let mut bytes = [0u8; 32];
		rng.fill_bytes(&mut bytes);
		let secret = x25519_dalek::StaticSecret::from(bytes);
		let public = x25519_dalek::PublicKey::from(&secret);
		X25519Exchange { secret, public }
	}

	pub fn public_bytes(&self) -> [u8; 32] { self.public.to_bytes() }

	pub fn agree(&self, peer_public:&[u8; 32]) -> [u8; 32] {
		let peer = x25519_dalek::PublicKey::from(*peer_public);
		*self.secret.diffie_hellman(&peer).as_bytes()
	}
}

pub struct X448Exchange {
	secret:x448::Secret,
	pub public:x448::PublicKey,
}

impl X448Exchange {
	pub fn generate(rng:&mut dyn EntropySource) -> Self {
		let mut bytes = [0u8; 56];
		rng.fill_bytes(&mut bytes);
		let secret = x448::Secret::from(bytes);
		let public = x448::PublicKey::from(&secret);
		X448Exchange { secret, public }
	}

	pub fn public_bytes(&self) -> [u8; 56] { self.public.as_bytes().try_into().expect("x448 public key is 56 bytes") }

	pub fn agree(&self, peer_public:&[u8; 56]) -> Result<[u8; 56]> {
		let peer = x448::PublicKey::from(*peer_public);
		let shared = self.secret.as_diffie_hellman(&peer).ok_or(Error::VerificationFailed)?;
		Ok(shared.as_bytes().try_into().expect("x448 shared secret is 56 bytes"))
	}
}

pub enum NistEcdhExchange {
	P256(p256::SecretKey),
	P384(p384::SecretKey),
	P521(p521::SecretKey),
}

impl NistEcdhExchange {
	pub fn generate(curve:Curve, rng:&mut dyn EntropySource) -> Self {
		loop {
			let mut bytes = vec![0u8; curve_scalar_len(curve)];
			rng.fill_bytes(&mut bytes);
			let key = match curve {
				Curve::NistP256 => p256::SecretKey::from_slice(&bytes).ok().map(NistEcdhExchange::P256),
				Curve::NistP384 => p384::SecretKey::from_slice(&bytes).ok().map(NistEcdhExchange::P384),
				Curve::NistP521 => p521::SecretKey::from_slice(&bytes).ok().map(NistEcdhExchange::P521),
			};
			if let Some(key) = key {
				return key;
			}
		}
	}

	pub fn public_blob(&self) -> Vec<u8> {
		match self {
			NistEcdhExchange::P256(k) => k.public_key().to_encoded_point(false).as_bytes().to_vec(),
			NistEcdhExchange::P384(k) => k.public_key().to_encoded_point(false).as_bytes().to_vec(),
			NistEcdhExchange::P521(k) => k.public_key().to_encoded_point(false).as_bytes().to_vec(),
		}
	}

	pub fn agree(&self, peer_point:&[u8]) -> Result<Vec<u8>> {
		match self {
			NistEcdhExchange::P256(k) => {
				let peer = p256::PublicKey::from_sec1_bytes(peer_point).map_err(|_| Error::CouldNotReadKey)?;
				let shared = p256_diffie_hellman(&k.to_nonzero_scalar(), peer.as_affine());
				Ok(shared.raw_secret_bytes().to_vec())
			}
			NistEcdhExchange::P384(k) => {
				let peer = p384::PublicKey::from_sec1_bytes(peer_point).map_err(|_| Error::CouldNotReadKey)?;
				let shared = p384::ecdh::diffie_hellman(&k.to_nonzero_scalar(), peer.as_affine());
				Ok(shared.raw_secret_bytes().to_vec())
			}
			NistEcdhExchange::P521(k) => {
				let peer = p521::PublicKey::from_sec1_bytes(peer_point).map_err(|_| Error::CouldNotReadKey)?;
				let shared = p521::ecdh::diffie_hellman(&k.to_nonzero_scalar(), peer.as_affine());
				Ok(shared.raw_secret_bytes().to_vec())
			}
		}
	}
}

fn curve_scalar_len(curve:Curve) -> usize {
	match curve {
		Curve::NistP256 => 32,
		Curve::NistP384 => 48,
		Curve::NistP521 => 66,
	}
}

#[cfg(test)]
mod tests {
	use pssh_mpint::TestRng;

	use super::*;

	#[test]
	fn x25519_both_sides_agree() {
		let mut rng_a = TestRng::new(1);
		let mut rng_b = TestRng::new(2);
		let a = X25519Exchange::generate(&mut rng_a);
		let b = X25519Exchange::generate(&mut rng_b);
		assert_eq!(a.agree(&b.public_bytes()), b.agree(&a.public_bytes()));
	}

	#[test]
	fn x448_both_sides_agree() {
		let mut rng_a = TestRng::new(3);
		let mut rng_b = TestRng::new(4);
		let a = X448Exchange::generate(&mut rng_a);
		let b = X448Exchange::generate(&mut rng_b);
		assert_eq!(a.agree(&b.public_bytes()).unwrap(), b.agree(&a.public_bytes()).unwrap());
	}

	#[test]
	fn nist_p256_both_sides_agree() {
		let mut rng_a = TestRng::new(5);
		let mut rng_b = TestRng::new(6);
		let a = NistEcdhExchange::generate(Curve::NistP256, &mut rng_a);
		let b = NistEcdhExchange::generate(Curve::NistP256, &mut rng_b);
		assert_eq!(a.agree(&b.public_blob()).unwrap(), b.agree(&a.public_blob()).unwrap());
	}
}
