//! Pocklington primality certification: build a prime `p` out of
//! smaller already-certified primes so that `p - 1`'s factorisation is
//! known, then prove `p` prime from that factorisation (spec.md §4.2).
use pssh_mpint::MPInt;

/// An accumulator of certified primes. Each successfully certified
/// prime can be fed back in as a factor for certifying a larger one,
/// the way `pockle_add_prime` works in the original.
#[derive(Default)]
pub struct Pockle {
	certified:Vec<MPInt>,
}

#[derive(Debug, thiserror::Error)]
pub enum CertifyError {
	#[error("given factors do not divide p - 1")]
	FactorsDoNotDivide,
	#[error("product of factors is not large enough to prove primality (Pocklington requires it to exceed sqrt(p))")]
	InsufficientFactorCoverage,
	#[error("witness failed the Fermat condition a^(p-1) != 1 (mod p)")]
	FermatConditionFailed,
	#[error("witness failed to be coprime to p for factor {0}")]
	NotCoprimeForFactor(usize),
}

impl Pockle {
	pub fn new() -> Self { Self::default() }

	/// Trust a small prime directly (e.g. one read out of the small-prime
	/// sieve table, or independently Miller-Rabin-tested), so it can be
	/// used as a factor in later certifications.
	pub fn trust_small_prime(&mut self, p:MPInt) { self.certified.push(p); }

	pub fn certified_primes(&self) -> &[MPInt] { &self.certified }

	/// Certify that `p` is prime given a full or partial factorisation of
	/// `p - 1` (`factors`, each already certified prime, repeats allowed)
	/// and a witness `a`. Requires:
	/// - `product(factors)` divides `p - 1`.
	/// - `product(factors)^2 > p` (Pocklington's theorem needs the known
	///   factor to exceed `sqrt(p)`).
	/// - `a^(p-1) == 1 (mod p)`.
	/// - `gcd(a^((p-1)/q) - 1, p) == 1` for every distinct prime factor `q`.
	pub fn add_prime(&mut self, p:&MPInt, factors:&[MPInt], witness:&MPInt) -> Result<(), CertifyError> {
		let one = MPInt::from_integer(1, p.bits);
		let p_minus_1 = p.sub(&one);

		let mut product = MPInt::from_integer(1, p.bits * 2);
		for f in factors {
			product = product.mul(f);
		}
		let product = product.reduce_mod_2to(p.bits * 2);

		if !bool::from(p_minus_1.rem(&product).eq_integer(0)) {
			return Err(CertifyError::FactorsDoNotDivide);
		}

		if !bool::from(product.mul(&product).cmp_hs(p)) {
			return Err(CertifyError::InsufficientFactorCoverage);
		}

		if !bool::from(witness.modpow(&p_minus_1, p).eq_integer(1)) {
			return Err(CertifyError::FermatConditionFailed);
		}

		for (i, q) in factors.iter().enumerate() {
			let exp = p_minus_1.div(q);
			let reduced = witness.modpow(&exp, p).sub(&one);
			let g = MPInt::gcd_into(&reduced.rem(p), p).0;
			if !bool::from(g.eq_integer(1)) {
				return Err(CertifyError::NotCoprimeForFactor(i));
			}
		}

		self.certified.push(p.clone());

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn certifies_a_small_prime_chain() {
		let mut pockle = Pockle::new();
		// 5 is prime: 5 - 1 = 4 = 2^2. Certify 2 directly, use it to build 5.
		pockle.trust_small_prime(MPInt::from_integer(2, 16));
		pockle
			.add_prime(
				&MPInt::from_integer(5, 16),
				&[MPInt::from_integer(2, 16), MPInt::from_integer(2, 16)],
				&MPInt::from_integer(2, 16),
			)
			.unwrap();
		assert_eq!(pockle.certified_primes().len(), 1);

		// Now certify 11: 11 - 1 = 10 = 2 * 5, and 5 was just certified.
		pockle
			.add_prime(
				&MPInt::from_integer(11, 16),
				&[MPInt::from_integer(2, 16), MPInt::from_integer(5, 16)],
				&MPInt::from_integer(2, 16),
			)
			.unwrap();
		assert_eq!(pockle.certified_primes().len(), 2);
	}

	#[test]
	fn rejects_factors_that_do_not_divide() {
		let mut pockle = Pockle::new();
		let err = pockle
			.add_prime(
				&MPInt::from_integer(11, 16),
				&[MPInt::from_integer(3, 16), MPInt::from_integer(3, 16)],
				&MPInt::from_integer(2, 16),
			)
			.unwrap_err();
		assert!(matches!(err, CertifyError::FactorsDoNotDivide));
	}
}
