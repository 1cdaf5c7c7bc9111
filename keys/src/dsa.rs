//! DSA (FIPS 186), grounded on spec.md §4.3's description: p/q generated by
//! the FIPS construction, deterministic per-message `k` derived from the
//! private key and message hash rather than drawn from an RNG, closing the
//! nonce-reuse failure mode that otherwise leaks the private key.
use hmac::{Hmac, Mac};
use pssh_mpint::{EntropySource, MPInt};
use pssh_primegen::{generate_probabilistic_default, MillerRabin, PrimeCandidateSource};
use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::encoding::{BinarySink, Reader};
use crate::error::{Error, Result};
use crate::key::Signature;

const Q_BITS:usize = 160;

#[derive(Clone)]
pub struct DsaPublicKey {
	pub p:MPInt,
	pub q:MPInt,
	pub g:MPInt,
	pub y:MPInt,
}

pub struct DsaKeyPair {
	pub public:DsaPublicKey,
	pub x:MPInt,
}

impl DsaKeyPair {
	/// Generate a `bits`-bit DSA key pair with a 160-bit `q`.
	pub fn generate(bits:usize, rng:&mut dyn EntropySource) -> Result<Self> {
		let q = generate_probabilistic_default(&PrimeCandidateSource::new(Q_BITS, 1 << 12, 13), Q_BITS, rng)?;

		let p = loop {
			// p = k*q + 1 for some k chosen to land p at the right width, then
			// sieved until p itself is prime (FIPS 186 Appendix A.1.1.2).
			let k_bits = bits - Q_BITS;
			let k = MPInt::random_bits(k_bits, rng).reduce_mod_2to(k_bits).or(&MPInt::from_integer(1, k_bits));
			let candidate = k.mul(&q).mul_integer(2).add_integer(1).reduce_mod_2to(bits);
			if candidate.get_nbits() != bits {
				continue;
			}
			if let Ok(mr) = MillerRabin::new(&candidate) {
				let witness = MPInt::from_integer(2, candidate.max_bits());
				if mr.test(&witness).passed {
					break candidate;
				}
			}
		};

		// g = h^((p-1)/q) mod p for the smallest h >= 2 giving g != 1.
		let p_minus_1 = p.sub_integer(1);
		let exponent = p_minus_1.div(&q);
		let mut h = MPInt::from_integer(2, p.max_bits());
		let g = loop {
			let candidate = h.modpow(&exponent, &p);
			if !bool::from(candidate.eq_integer(1)) {
				break candidate;
			}
			h = h.add_integer(1);
		};

		let x = MPInt::random_in_range(&MPInt::from_integer(1, q.max_bits()), &q, rng);
		let y = g.modpow(&x, &p);

		Ok(DsaKeyPair { public:DsaPublicKey { p, q, g, y }, x })
	}

	/// RFC 6979-style deterministic nonce: `k = HMAC-SHA256(x, digest) mod q`,
	/// retried with a rehashed key on the rare out-of-range draw.
	fn deterministic_k(&self, digest:&[u8]) -> MPInt {
		let mut seed = self.x.to_bytes_be();
		loop {
			let mut mac = Hmac::<Sha256>::new_from_slice(&seed).expect("hmac accepts any key length");
			mac.update(digest);
			let out = mac.finalize().into_bytes();
			let candidate = MPInt::from_bytes_be(&out, self.public.q.max_bits() + 64).rem(&self.public.q);
			if !candidate.is_zero() {
				return candidate;
			}
			seed = out.to_vec();
		}
	}

	pub fn sign(&self, data:&[u8]) -> Result<Signature> {
		let digest = Sha1::digest(data);
		let z = MPInt::from_bytes_be(&digest, self.public.q.max_bits());

		let (r, s) = loop {
			let k = self.deterministic_k(&digest);
			let k_inv = match MPInt::invert(&k, &self.public.q) {
				Ok(inv) => inv,
				Err(_) => continue,
			};
			let r = self.public.g.modpow(&k, &self.public.p).rem(&self.public.q);
			if r.is_zero() {
				continue;
			}
			let s = k_inv.modmul(&z.add(&self.x.modmul(&r, &self.public.q)), &self.public.q);
			if s.is_zero() {
				continue;
			}
			break (r, s);
		};

		let mut blob = Vec::new();
		blob.extend(&r.to_bytes_be_fixed(20));
		blob.extend(&s.to_bytes_be_fixed(20));

		let mut out = Vec::new();
		out.put_string(b"ssh-dss");
		out.put_string(&blob);
		Ok(Signature { algorithm_name:"ssh-dss".to_string(), blob:out })
	}

	pub fn public_key(&self) -> DsaPublicKey { self.public.clone() }

	pub fn private_blob(&self) -> Vec<u8> {
		let mut blob = Vec::new();
		blob.put_mpint(&self.x);
		blob
	}
}

impl DsaPublicKey {
	pub fn public_blob(&self) -> Vec<u8> {
		let mut blob = Vec::new();
		blob.put_string(b"ssh-dss");
		blob.put_mpint(&self.p);
		blob.put_mpint(&self.q);
		blob.put_mpint(&self.g);
		blob.put_mpint(&self.y);
		blob
	}

	pub fn from_public_blob(data:&[u8]) -> Result<Self> {
		let mut r = Reader::new(data);
		if r.string()? != b"ssh-dss" {
			return Err(Error::UnsupportedKeyType("expected ssh-dss".to_string()));
		}
		Ok(DsaPublicKey { p:r.mpint()?, q:r.mpint()?, g:r.mpint()?, y:r.mpint()? })
	}

	pub fn verify(&self, sig:&Signature, data:&[u8]) -> bool {
		let mut r = Reader::new(&sig.blob);
		let (Ok(algo), Ok(blob)) = (r.string(), r.string()) else { return false };
		if algo != b"ssh-dss" || blob.len() != 40 {
			return false;
		}
		let r_val = MPInt::from_bytes_be(&blob[..20], self.q.max_bits());
		let s_val = MPInt::from_bytes_be(&blob[20..], self.q.max_bits());
		if r_val.is_zero() || s_val.is_zero() {
			return false;
		}

		let digest = Sha1::digest(data);
		let z = MPInt::from_bytes_be(&digest, self.q.max_bits());

		let w = match MPInt::invert(&s_val, &self.q) {
			Ok(w) => w,
			Err(_) => return false,
		};
		let u1 = z.modmul(&w, &self.q);
		let u2 = r_val.modmul(&w, &self.q);
		let v = self
			.g
			.modpow(&u1, &self.p)
			.modmul(&self.y.modpow(&u2, &self.p), &self.p)
			.rem(&self.p)
			.rem(&self.q);

		v == r_val
	}

	pub fn components(&self) -> Vec<(String, String)> {
		vec![
			("p".to_string(), self.p.get_hex()),
			("q".to_string(), self.q.get_hex()),
			("g".to_string(), self.g.get_hex()),
			("y".to_string(), self.y.get_hex()),
		]
	}
}

trait FixedWidthBytes {
	fn to_bytes_be_fixed(&self, n:usize) -> Vec<u8>;
}

impl FixedWidthBytes for MPInt {
	fn to_bytes_be_fixed(&self, n:usize) -> Vec<u8> {
		let mut bytes = self.to_bytes_be();
		if bytes.len() > n {
			bytes = bytes[bytes.len() - n..].to_vec();
		} else if bytes.len() < n {
			let mut padded = vec![0u8; n - bytes.len()];
			padded.extend(bytes);
			bytes = padded;
		}
		bytes
	}
}

#[cfg(test)]
mod tests {
	use pssh_mpint::TestRng;

	use super::*;

	#[test]
	fn sign_verify_roundtrip() {
		let mut rng = TestRng::new(55);
		let kp = DsaKeyPair::generate(512, &mut rng).unwrap();
		let sig = kp.sign(b"hello dsa").unwrap();
		assert!(kp.public_key().verify(&sig, b"hello dsa"));
	}

	#[test]
	fn tampered_message_rejected() {
		let mut rng = TestRng::new(56);
		let kp = DsaKeyPair::generate(512, &mut rng).unwrap();
		let sig = kp.sign(b"hello dsa").unwrap();
		assert!(!kp.public_key().verify(&sig, b"goodbye dsa"));
	}

	#[test]
	fn signing_is_deterministic() {
		let mut rng = TestRng::new(57);
		let kp = DsaKeyPair::generate(512, &mut rng).unwrap();
		let sig1 = kp.sign(b"repeat").unwrap();
		let sig2 = kp.sign(b"repeat").unwrap();
		assert_eq!(sig1.blob, sig2.blob);
	}
}
