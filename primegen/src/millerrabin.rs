//! Miller-Rabin witness testing, grounded on
//! `examples/original_source/keygen/millerrabin.c`.
use pssh_mpint::{MPInt, MontgomeryContext};

use crate::error::Result;

/// A context precomputed for one probable prime `p`, so that many
/// witnesses can be tested against it without repeating the `p - 1 =
/// q * 2^k` decomposition each time.
pub struct MillerRabin {
	p:MPInt,
	q:MPInt,
	k:usize,
	mc:MontgomeryContext,
}

/// The result of one Miller-Rabin round.
pub struct MillerRabinResult {
	pub passed:bool,
	/// Set when `w` turned out to be a primitive root of `p` — a
	/// side-effect the Pocklington certifier can reuse instead of
	/// searching for one separately.
	pub potential_primitive_root:bool,
}

impl MillerRabin {
	pub fn new(p:&MPInt) -> Result<Self> {
		let one = MPInt::from_integer(1, p.bits);
		let p_minus_1 = p.sub(&one);

		let mut q = p_minus_1.clone();
		let mut k = 0usize;
		while q.get_bit(0) == 0 && !q.is_zero() {
			q = q.rshift_fixed(1);
			k += 1;
		}

		let mc = MontgomeryContext::new(p)?;

		Ok(MillerRabin { p:p.clone(), q, k, mc })
	}

	/// Run one Miller-Rabin round with witness `w`.
	///
	/// Implemented with a single Montgomery exponentiation that both
	/// computes `w^((p-1)/2)` and observes every `w^(q*2^i)` along the
	/// way, so the number of squarings performed never depends on where
	/// in the sequence a `-1` or `1` happens to show up — avoiding a
	/// timing leak of `k` (spec.md §4.2).
	pub fn test(&self, w:&MPInt) -> MillerRabinResult {
		let one = self.mc.identity();
		let minus_one = self.mc.sub(&MPInt::from_integer(0, self.p.bits), &one);

		let base = self.mc.import(&w.rem(&self.p));
		let mut x = self.mc.pow(&base, &self.q);

		let mut seen_minus_one = bool::from(x.cmp_eq(&minus_one));
		let is_one_initially = bool::from(x.cmp_eq(&one));

		for _ in 0..self.k {
			x = self.mc.mul_into(&x, &x);
			if bool::from(x.cmp_eq(&minus_one)) {
				seen_minus_one = true;
			}
		}

		let final_is_one = bool::from(x.cmp_eq(&one));
		let passed = (is_one_initially) || seen_minus_one;
		let _ = final_is_one;

		MillerRabinResult { passed, potential_primitive_root:passed && !is_one_initially }
	}

	/// HAC table 4.4: number of independent-witness rounds needed so
	/// that a composite number passes by chance with probability at
	/// most `2^-80`, as a function of the candidate's bit length. Ported
	/// verbatim from `miller_rabin_checks_needed` in
	/// `examples/original_source/keygen/millerrabin.c`.
	pub fn checks_needed(bits:usize) -> usize {
		if bits >= 1300 {
			2
		} else if bits >= 850 {
			3
		} else if bits >= 650 {
			4
		} else if bits >= 550 {
			5
		} else if bits >= 450 {
			6
		} else if bits >= 400 {
			7
		} else if bits >= 350 {
			8
		} else if bits >= 300 {
			9
		} else if bits >= 250 {
			12
		} else if bits >= 200 {
			15
		} else if bits >= 150 {
			18
		} else {
			27
		}
	}
}

#[cfg(test)]
mod tests {
	use pssh_mpint::TestRng;

	use super::*;

	#[test]
	fn known_prime_passes_many_witnesses() {
		let p = MPInt::from_integer(7919, 32); // a prime
		let mr = MillerRabin::new(&p).unwrap();
		let mut rng = TestRng::new(11);
		for _ in 0..20 {
			let w = MPInt::random_in_range(&MPInt::from_integer(2, 32), &p, &mut rng);
			assert!(mr.test(&w).passed);
		}
	}

	#[test]
	fn known_composite_fails_at_least_one_witness() {
		// 561 is a Carmichael number but 2 is not a Fermat witness for it;
		// the Miller-Rabin refinement still must catch it for some base.
		let p = MPInt::from_integer(561, 32);
		let mr = MillerRabin::new(&p).unwrap();
		let mut found_failure = false;
		for w in 2u64..20 {
			let witness = MPInt::from_integer(w, 32);
			if !mr.test(&witness).passed {
				found_failure = true;
				break;
			}
		}
		assert!(found_failure);
	}

	#[test]
	fn checks_needed_matches_table_boundaries() {
		// HAC table 4.4 as carried over from the original source; note
		// spec.md's S6 scenario quotes `checks_needed(1024) == 5`, but the
		// table it's itself grounded on (850-bit bucket) gives 3 for a
		// 1024-bit candidate. Per the Open Question in spec.md §9 ("carried
		// over verbatim rather than reinvented"), we follow the source
		// table rather than the scenario's arithmetic.
		assert_eq!(MillerRabin::checks_needed(1024), 3);
		assert_eq!(MillerRabin::checks_needed(2048), 2);
	}
}
