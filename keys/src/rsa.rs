//! RSA key generation, signing and verification, grounded on
//! `examples/original_source/sshrsag.c`.
use log::debug;
use pssh_mpint::{EntropySource, MPInt};
use pssh_primegen::{generate_probabilistic_default, NullProgress, PrimeCandidateSource, ProgressReceiver};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};

use crate::encoding::{BinarySink, Reader};
use crate::error::{Error, Result};
use crate::key::{Signature, SignFlags};

pub const RSA_EXPONENT:u64 = 65537;
const NFIRST_BITS:u32 = 13;
const FIRSTBITS_LO:u32 = 1 << 12;
const FIRSTBITS_HI:u32 = 1 << 13;

#[derive(Clone)]
pub struct RsaPublicKey {
	pub e:MPInt,
	pub n:MPInt,
}

pub struct RsaKeyPair {
	pub public:RsaPublicKey,
	pub d:MPInt,
	pub p:MPInt,
	pub q:MPInt,
	pub iqmp:MPInt,
}

/// Invent a pair of 13-bit values in `[2^12, 2^13)` whose product is at
/// least `2^25` and which differ by at least `min_separation`, so that
/// `p * q` lands on exactly the requested bit count (spec.md §4.3 step
/// 2). We use rejection sampling rather than the original's exact
/// weighted-count selection; both produce a pair satisfying the same
/// constraints, uniformity over the valid pairs isn't security-relevant
/// here.
fn invent_firstbits(min_separation:u32, rng:&mut dyn EntropySource) -> (u32, u32) {
	let minproduct = 2 * FIRSTBITS_LO * FIRSTBITS_LO;
	loop {
		let a = FIRSTBITS_LO + (random_u32(rng) % (FIRSTBITS_HI - FIRSTBITS_LO));
		let b = FIRSTBITS_LO + (random_u32(rng) % (FIRSTBITS_HI - FIRSTBITS_LO));
		let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
		if hi >= lo + min_separation && lo * hi >= minproduct {
			return if random_u32(rng) % 2 == 0 { (lo, hi) } else { (hi, lo) };
		}
	}
}

fn random_u32(rng:&mut dyn EntropySource) -> u32 {
	let mut bytes = [0u8; 4];
	rng.fill_bytes(&mut bytes);
	u32::from_be_bytes(bytes)
}

impl RsaKeyPair {
	/// Generate an RSA key pair of the given total modulus bit length.
	pub fn generate(bits:usize, rng:&mut dyn EntropySource, progress:&mut dyn ProgressReceiver) -> Result<Self> {
		Self::generate_with(bits, rng, progress, NFIRST_BITS)
	}

	fn generate_with(
		bits:usize,
		rng:&mut dyn EntropySource,
		progress:&mut dyn ProgressReceiver,
		nfirst:u32,
	) -> Result<Self> {
		let (pfirst, qfirst) = invent_firstbits(2, rng);
		let qbits = bits / 2;
		let pbits = bits - qbits;
		assert!(pbits >= qbits);

		let mut pcs_p = PrimeCandidateSource::new(pbits, pfirst, nfirst);
		pcs_p.avoid_residue_small(RSA_EXPONENT as u32, 1);
		pcs_p.ready();
		let p = generate_probabilistic_default(&pcs_p, pbits, rng)?;

		let mut pcs_q = PrimeCandidateSource::new(qbits, qfirst, nfirst);
		pcs_q.avoid_residue_small(RSA_EXPONENT as u32, 1);
		pcs_q.ready();
		let q = generate_probabilistic_default(&pcs_q, qbits, rng)?;

		let (p, q) = if pbits == qbits && bool::from(q.cmp_hs(&p)) { (q, p) } else { (p, q) };
		assert!(bool::from(p.cmp_hs(&q)));

		let n = p.mul(&q);
		let one = MPInt::from_integer(1, n.max_bits());
		let phi = p.sub(&one).mul(&q.sub(&one));
		let e = MPInt::from_integer(RSA_EXPONENT, n.max_bits());
		let d = MPInt::invert(&e, &phi)?;
		let iqmp = MPInt::invert(&q, &p)?;

		debug!(
			"rsa: generated {}-bit key (p={} bits, q={} bits)",
			n.get_nbits(),
			p.max_bits(),
			q.max_bits()
		);
		progress.report_phase_complete(pssh_primegen::ProgressPhase(0));

		Ok(RsaKeyPair { public:RsaPublicKey { e, n }, d, p, q, iqmp })
	}

	pub fn public_key(&self) -> RsaPublicKey { self.public.clone() }

	pub fn sign(&self, data:&[u8], flags:SignFlags) -> Result<Signature> {
		let (algorithm_name, digest) = match flags {
			SignFlags::Sha1 => ("ssh-rsa", Sha1::digest(data).to_vec()),
			SignFlags::Sha256 => ("rsa-sha2-256", Sha256::digest(data).to_vec()),
			SignFlags::Sha512 => ("rsa-sha2-512", Sha512::digest(data).to_vec()),
		};

		let em = pkcs1_v15_pad(&digest, flags, (self.public.n.max_bits() + 7) / 8);
		let m = MPInt::from_bytes_be(&em, self.public.n.max_bits());
		let s = m.modpow(&self.d, &self.public.n);

		let mut blob = Vec::new();
		blob.put_string(algorithm_name.as_bytes());
		blob.put_string(&s.to_bytes_be());

		Ok(Signature { algorithm_name:algorithm_name.to_string(), blob })
	}

	pub fn private_blob(&self) -> Vec<u8> {
		let mut blob = Vec::new();
		blob.put_mpint(&self.d);
		blob.put_mpint(&self.p);
		blob.put_mpint(&self.q);
		blob.put_mpint(&self.iqmp);
		blob
	}
}

/// ASN.1 DigestInfo prefix for each hash, PKCS#1 v1.5 (deterministic,
/// per spec.md §4.3 step 6).
fn digest_info_prefix(flags:SignFlags) -> &'static [u8] {
	match flags {
		SignFlags::Sha1 => &[0x30, 0x21, 0x30, 0x09, 0x06, 0x05, 0x2b, 0x0e, 0x03, 0x02, 0x1a, 0x05, 0x00, 0x04, 0x14],
		SignFlags::Sha256 => &[
			0x30, 0x31, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01, 0x05, 0x00, 0x04,
			0x20,
		],
		SignFlags::Sha512 => &[
			0x30, 0x51, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x03, 0x05, 0x00, 0x04,
			0x40,
		],
	}
}

fn pkcs1_v15_pad(digest:&[u8], flags:SignFlags, em_len:usize) -> Vec<u8> {
	let prefix = digest_info_prefix(flags);
	let t_len = prefix.len() + digest.len();
	assert!(em_len >= t_len + 11, "rsa: modulus too short for this digest");

	let mut em = Vec::with_capacity(em_len);
	em.push(0x00);
	em.push(0x01);
	em.extend(std::iter::repeat(0xffu8).take(em_len - t_len - 3));
	em.push(0x00);
	em.extend_from_slice(prefix);
	em.extend_from_slice(digest);
	em
}

impl RsaPublicKey {
	pub fn public_blob(&self) -> Vec<u8> {
		let mut blob = Vec::new();
		blob.put_string(b"ssh-rsa");
		blob.put_mpint(&self.e);
		blob.put_mpint(&self.n);
		blob
	}

	pub fn from_public_blob(data:&[u8]) -> Result<Self> {
		let mut r = Reader::new(data);
		let algo = r.string()?;
		if algo != b"ssh-rsa" {
			return Err(Error::UnsupportedKeyType(String::from_utf8_lossy(algo).into_owned()));
		}
		Ok(RsaPublicKey { e:r.mpint()?, n:r.mpint()? })
	}

	pub fn verify(&self, sig:&Signature, data:&[u8]) -> bool {
		let flags = match sig.algorithm_name.as_str() {
			"ssh-rsa" => SignFlags::Sha1,
			"rsa-sha2-256" => SignFlags::Sha256,
			"rsa-sha2-512" => SignFlags::Sha512,
			_ => return false,
		};

		let mut r = Reader::new(&sig.blob);
		let (Ok(algo), Ok(s_bytes)) = (r.string(), r.string()) else { return false };
		if algo != sig.algorithm_name.as_bytes() {
			return false;
		}

		let digest = match flags {
			SignFlags::Sha1 => Sha1::digest(data).to_vec(),
			SignFlags::Sha256 => Sha256::digest(data).to_vec(),
			SignFlags::Sha512 => Sha512::digest(data).to_vec(),
		};

		let em_len = (self.n.max_bits() + 7) / 8;
		let expected = pkcs1_v15_pad(&digest, flags, em_len);

		let s = MPInt::from_bytes_be(s_bytes, self.n.max_bits());
		let m = s.modpow(&self.e, &self.n);
		m.to_bytes_be() == expected
	}

	pub fn components(&self) -> Vec<(String, String)> {
		vec![
			("e".to_string(), self.e.get_hex()),
			("n".to_string(), self.n.get_hex()),
			("bits".to_string(), self.n.get_nbits().to_string()),
		]
	}

	/// `rsa-sha2-512` needs at least `512 + overhead` bits of modulus to
	/// leave room for the PKCS#1 padding; flag any key too small.
	pub fn invalid(&self, flags:SignFlags) -> Option<String> {
		let min_bits = match flags {
			SignFlags::Sha1 => 8 * (15 + 11 + 20),
			SignFlags::Sha256 => 8 * (19 + 11 + 32),
			SignFlags::Sha512 => 8 * (19 + 11 + 64),
		};
		if self.n.get_nbits() < min_bits {
			Some(format!("RSA modulus too small for {flags:?}"))
		} else {
			None
		}
	}
}

#[cfg(test)]
mod tests {
	use pssh_mpint::TestRng;

	use super::*;

	#[test]
	fn sign_verify_roundtrip_s1() {
		let mut rng = TestRng::new(u64::from_be_bytes(*b"seed-S1\0"));
		let kp = RsaKeyPair::generate(2048, &mut rng, &mut NullProgress).unwrap();
		let sig = kp.sign(b"hello", SignFlags::Sha256).unwrap();
		assert!(kp.public_key().verify(&sig, b"hello"));
		assert_eq!(&sig.blob[4..8], b"rsa-");
	}

	#[test]
	fn tampered_message_fails() {
		let mut rng = TestRng::new(1);
		let kp = RsaKeyPair::generate(1024, &mut rng, &mut NullProgress).unwrap();
		let sig = kp.sign(b"hello", SignFlags::Sha1).unwrap();
		assert!(!kp.public_key().verify(&sig, b"hellp"));
	}
}
