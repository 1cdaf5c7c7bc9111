//! Diffie-Hellman key exchange over fixed MODP groups or group-exchange
//! parameters (spec.md §4.3): `e = g^x mod p` for a random private `x`
//! with `1 < x < p-1`, and `f` from the peer is range-checked the same
//! way before the shared secret is computed.
use pssh_mpint::{EntropySource, MPInt};

use crate::error::{Error, Result};

pub struct DhGroup {
	pub p:MPInt,
	pub g:MPInt,
}

pub struct DhExchange {
	group:DhGroup,
	x:MPInt,
	pub e:MPInt,
}

impl DhGroup {
	/// Fixed MODP groups from RFC 3526 (oakley group 14, 2048-bit, is the
	/// one negotiated by `diffie-hellman-group14-sha256`).
	pub fn oakley_group14() -> Self {
		let p = MPInt::from_hex(
			"FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD129024E088A67CC74020BBEA63B139B22514A08798E3404DDEF9519B3CD3A431B302B0A6DF25F14374FE1356D6D51C245E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7EDEE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3DC2007CB8A163BF0598DA48361C55D39A69163FA8FD24CF5F83655D23DCA3AD961C62F356208552BB9ED529077096966D670C354E4ABC9804F1746C08CA18217C32905E462E36CE3BE39E772C180E86039B2783A2EC07A28FB5C55DF06F4C52C9DE2BCBF6955817183995497CEA956AE515D2261898FA051015728E5A8AACAA68FFFFFFFFFFFFFFFF",
		)
		.expect("oakley group 14 modulus is valid hex");
		DhGroup { p, g:MPInt::from_integer(2, 16) }
	}

	pub fn gex(p:MPInt, g:MPInt) -> Self { DhGroup { p, g } }
}

impl DhExchange {
	pub fn setup(group:DhGroup, rng:&mut dyn EntropySource) -> Self {
		let bits = group.p.max_bits();
		let p_minus_1 = group.p.sub_integer(1);
		let x = MPInt::random_in_range(&MPInt::from_integer(2, bits), &p_minus_1, rng);
		let e = group.g.modpow(&x, &group.p);
		DhExchange { group, x, e }
	}

	/// Validate the peer's public value (`1 < f < p - 1`) and derive the
	/// shared secret `K = f^x mod p`.
	pub fn agree(&self, f:&MPInt) -> Result<MPInt> {
		let one = MPInt::from_integer(1, self.group.p.max_bits());
		let p_minus_1 = self.group.p.sub_integer(1);
		if bool::from(f.cmp_hs(&p_minus_1)) || !bool::from(f.cmp_hs(&one)) || f == &one {
			return Err(Error::CertInvalid("DH public value out of range".to_string()));
		}
		Ok(f.modpow(&self.x, &self.group.p))
	}
}

#[cfg(test)]
mod tests {
	use pssh_mpint::TestRng;

	use super::*;

	#[test]
	fn both_sides_agree_on_same_secret() {
		let mut rng_a = TestRng::new(1);
		let mut rng_b = TestRng::new(2);

		let group_a = DhGroup::oakley_group14();
		let group_b = DhGroup::oakley_group14();

		let a = DhExchange::setup(group_a, &mut rng_a);
		let b = DhExchange::setup(group_b, &mut rng_b);

		let k_a = a.agree(&b.e).unwrap();
		let k_b = b.agree(&a.e).unwrap();
		assert_eq!(k_a, k_b);
	}

	#[test]
	fn out_of_range_public_value_rejected() {
		let mut rng = TestRng::new(3);
		let group = DhGroup::oakley_group14();
		let a = DhExchange::setup(group, &mut rng);
		assert!(a.agree(&MPInt::from_integer(1, a.group.p.max_bits())).is_err());
		assert!(a.agree(&MPInt::from_integer(0, a.group.p.max_bits())).is_err());
	}
}
