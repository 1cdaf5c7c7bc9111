//! `PrimeCandidateSource`, grounded on `examples/original_source/primecandidate.c`.
use pssh_mpint::{EntropySource, MPInt};

use crate::error::{Error, Result};
use crate::smallprimes::SMALL_PRIMES;

/// How many times [`PrimeCandidateSource::generate`] nudges a drawn
/// candidate by `factor` before giving up and redrawing the random base
/// entirely (spec.md §4.2).
const DELTA_ATTEMPTS:usize = 1024;

/// Accumulates residue constraints, then produces uniformly-distributed
/// candidates of a fixed bit width that satisfy all of them and are
/// coprime to every prime below `2^16`.
///
/// Mirrors the C original: a candidate is `addend + factor * r` for a
/// randomly chosen `r`, so every constraint added folds into `factor`
/// and `addend` via CRT rather than being checked after the fact.
pub struct PrimeCandidateSource {
	bits:usize,
	ready:bool,
	limit:MPInt,
	factor:MPInt,
	addend:MPInt,
	avoid_modulus:u32,
	avoid_residue:u32,
}

impl PrimeCandidateSource {
	/// `bits`-bit candidates whose top `nfirst` bits equal `first` (so
	/// `first`'s MSB, i.e. bit `nfirst - 1`, must be set).
	pub fn new(bits:usize, first:u32, nfirst:u32) -> Self {
		assert_eq!(first >> (nfirst - 1), 1, "pcs: `first`'s top bit must be set");

		let work_bits = bits + 8;
		let base = MPInt::from_integer(first as u64, work_bits).lshift_fixed(bits - nfirst as usize);
		let mut addend = base;
		addend.set_bit(0, 1);

		let factor = MPInt::from_integer(2, work_bits);
		let limit = MPInt::power_2(bits - nfirst as usize - 1, work_bits);

		PrimeCandidateSource { bits, ready:false, limit, factor, addend, avoid_modulus:0, avoid_residue:1 }
	}

	/// Require `x ≡ residue (mod modulus)`, merged via CRT with any
	/// constraints already present. A modulus/residue pair that
	/// contradicts an existing one is a caller error.
	pub fn require_residue(&mut self, modulus:u32, residue:u32) -> Result<()> {
		let work_bits = self.factor.max_bits();
		let m2 = MPInt::from_integer(modulus as u64, work_bits);
		let r2 = MPInt::from_integer(residue as u64, work_bits);

		let (lcm, merged) =
			crt_merge(&self.factor, &self.addend, &m2, &r2).ok_or(Error::ContradictoryConstraint)?;

		self.factor = lcm;
		self.addend = merged;

		Ok(())
	}

	pub fn require_residue_1(&mut self, modulus:u32) -> Result<()> { self.require_residue(modulus, 1) }

	/// Adds a single cheap extra predicate: the candidate must not be
	/// congruent to `residue` mod `modulus` (used by RSA to keep
	/// `p != 1 (mod e)`).
	pub fn avoid_residue_small(&mut self, modulus:u32, residue:u32) {
		self.avoid_modulus = modulus;
		self.avoid_residue = residue;
	}

	pub fn ready(&mut self) { self.ready = true; }

	/// Produce a candidate satisfying every registered constraint and
	/// coprime to all primes below `2^16`.
	pub fn generate(&self, rng:&mut dyn EntropySource) -> Result<MPInt> {
		if !self.ready {
			return Err(Error::NotReady);
		}

		loop {
			let r = MPInt::random_in_range(&MPInt::from_integer(0, self.limit.max_bits()), &self.limit, rng);
			let base = self.addend.add(&self.factor.mul(&r));

			if let Some(candidate) = self.nudge_to_coprime(&base) {
				return Ok(candidate.reduce_mod_2to(self.bits));
			}
		}
	}

	fn nudge_to_coprime(&self, base:&MPInt) -> Option<MPInt> {
		let mut candidate = base.clone();

		for _ in 0..DELTA_ATTEMPTS {
			if self.passes_small_prime_sieve(&candidate) && self.passes_avoid(&candidate) {
				return Some(candidate);
			}
			candidate = candidate.add(&self.factor);
		}

		None
	}

	fn passes_small_prime_sieve(&self, candidate:&MPInt) -> bool {
		for &p in SMALL_PRIMES.iter() {
			let modulus = MPInt::from_integer(p as u64, candidate.max_bits());
			if bool::from(candidate.rem(&modulus).eq_integer(0)) {
				return false;
			}
		}
		true
	}

	fn passes_avoid(&self, candidate:&MPInt) -> bool {
		if self.avoid_modulus == 0 {
			return true;
		}
		let modulus = MPInt::from_integer(self.avoid_modulus as u64, candidate.max_bits());
		!bool::from(candidate.rem(&modulus).eq_integer(self.avoid_residue as u64))
	}
}

/// Combine `x ≡ a1 (mod n1)` and `x ≡ a2 (mod n2)` into a single
/// `x ≡ a (mod lcm(n1, n2))`, or `None` if the two congruences
/// contradict each other (standard CRT-merge via extended GCD).
fn crt_merge(n1:&MPInt, a1:&MPInt, n2:&MPInt, a2:&MPInt) -> Option<(MPInt, MPInt)> {
	let (g, bezout_n1, _) = MPInt::gcd_into(n1, n2);

	if g.is_zero() {
		return None;
	}

	let diff = a2.add(n2).sub(a1).rem(n2);

	if !bool::from(diff.rem(&g).eq_integer(0)) {
		return None;
	}

	let lcm = n1.div(&g).mul(n2);
	let n2_over_g = n2.div(&g);
	let t = bezout_n1.modmul(&diff.div(&g), &n2_over_g);
	let x = a1.add(&n1.mul(&t)).rem(&lcm);

	Some((lcm, x))
}

#[cfg(test)]
mod tests {
	use pssh_mpint::TestRng;

	use super::*;

	#[test]
	fn generates_candidate_of_requested_width() {
		let mut pcs = PrimeCandidateSource::new(64, 0b11, 2);
		pcs.ready();
		let mut rng = TestRng::new(1);
		let candidate = pcs.generate(&mut rng).unwrap();
		assert_eq!(candidate.get_bit(63), 1);
		assert_eq!(candidate.get_bit(0), 1);
	}

	#[test]
	fn avoids_small_prime_factors() {
		let mut pcs = PrimeCandidateSource::new(32, 0b1, 1);
		pcs.ready();
		let mut rng = TestRng::new(2);
		for _ in 0..20 {
			let candidate = pcs.generate(&mut rng).unwrap();
			for &p in [3u32, 5, 7, 11, 13].iter() {
				let m = MPInt::from_integer(p as u64, 32);
				assert!(!bool::from(candidate.rem(&m).eq_integer(0)));
			}
		}
	}

	#[test]
	fn avoid_residue_small_is_respected() {
		let mut pcs = PrimeCandidateSource::new(32, 0b1, 1);
		pcs.avoid_residue_small(65537, 1);
		pcs.ready();
		let mut rng = TestRng::new(3);
		for _ in 0..20 {
			let candidate = pcs.generate(&mut rng).unwrap();
			let m = MPInt::from_integer(65537, 32);
			assert!(!bool::from(candidate.rem(&m).eq_integer(1)));
		}
	}
}
