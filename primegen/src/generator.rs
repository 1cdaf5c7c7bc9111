//! Prime generators: given a [`PrimeCandidateSource`], produce a prime
//! of the requested width, either probabilistically (Miller-Rabin only)
//! or with a Pocklington certificate.
use log::debug;
use pssh_mpint::{EntropySource, MPInt};

use crate::error::Result;
use crate::millerrabin::MillerRabin;
use crate::pcs::PrimeCandidateSource;
use crate::pocklington::{CertifyError, Pockle};
use crate::progress::{NullProgress, ProgressReceiver};

/// Repeatedly draw candidates from `pcs`, run `checks_needed(bits)`
/// independent-witness Miller-Rabin rounds on each, and return the first
/// one that survives them all.
pub fn generate_probabilistic(
	pcs:&PrimeCandidateSource,
	bits:usize,
	rng:&mut dyn EntropySource,
	progress:&mut dyn ProgressReceiver,
) -> Result<MPInt> {
	let phase = progress.add_probabilistic(1.0, 0.03);
	let rounds = MillerRabin::checks_needed(bits);

	loop {
		let candidate = pcs.generate(rng)?;
		progress.report_attempt(phase);

		let mr = match MillerRabin::new(&candidate) {
			Ok(mr) => mr,
			Err(_) => continue, // even modulus: candidate malformed, redraw
		};

		let mut all_passed = true;
		for _ in 0..rounds {
			let witness = MPInt::random_in_range(&MPInt::from_integer(2, candidate.bits), &candidate, rng);
			if !mr.test(&witness).passed {
				all_passed = false;
				break;
			}
		}

		if all_passed {
			debug!("generate_probabilistic: accepted {}-bit candidate after {} rounds", bits, rounds);
			progress.report_phase_complete(phase);
			return Ok(candidate);
		}
	}
}

pub fn generate_probabilistic_default(
	pcs:&PrimeCandidateSource,
	bits:usize,
	rng:&mut dyn EntropySource,
) -> Result<MPInt> {
	generate_probabilistic(pcs, bits, rng, &mut NullProgress)
}

/// Generate a Pocklington-certified prime of the given width, building
/// up from a small trusted base (2 and 3) through successively larger
/// certified primes until one of the right width is reached. Each step
/// doubles (roughly) the previous prime's width and proves the new
/// candidate prime from the old one's certification, per spec.md §4.2.
pub fn generate_pocklington_certified(
	target_bits:usize,
	rng:&mut dyn EntropySource,
	progress:&mut dyn ProgressReceiver,
) -> Result<(MPInt, Pockle)> {
	let phase = progress.add_linear(1.0);

	let mut pockle = Pockle::new();
	pockle.trust_small_prime(MPInt::from_integer(2, 16));
	pockle.trust_small_prime(MPInt::from_integer(3, 16));

	let mut current = MPInt::from_integer(3, 16);
	let mut current_bits = 2usize;

	while current_bits < target_bits {
		let next_bits = (current_bits * 2).min(target_bits).max(current_bits + 1);

		let found = loop {
			// Candidate built as `current_prime * factor * r + 1`, so
			// `current_prime` (and, if `factor > 1`, the small factor) is
			// a known divisor of `candidate - 1` — exactly the structure
			// Pocklington's theorem needs.
			let r_bits = next_bits.saturating_sub(current_bits).max(1);
			let r = MPInt::random_bits(r_bits, rng);
			let candidate = current.mul(&r).mul_integer(2).add_integer(1).reduce_mod_2to(next_bits);

			if candidate.get_bit(0) == 0 {
				continue;
			}

			let witness = MPInt::from_integer(2, candidate.bits);
			let factors = [current.clone(), MPInt::from_integer(2, 16)];

			match pockle.add_prime(&candidate, &factors, &witness) {
				Ok(()) => break candidate,
				Err(CertifyError::FermatConditionFailed)
				| Err(CertifyError::NotCoprimeForFactor(_))
				| Err(CertifyError::FactorsDoNotDivide)
				| Err(CertifyError::InsufficientFactorCoverage) => continue,
			}
		};

		progress.report(phase, next_bits as f64 / target_bits as f64);
		current = found.clone();
		current_bits = next_bits;
	}

	Ok((current, pockle))
}

#[cfg(test)]
mod tests {
	use pssh_mpint::TestRng;

	use super::*;

	#[test]
	fn probabilistic_generator_terminates_and_passes_fresh_checks() {
		let mut pcs = PrimeCandidateSource::new(64, 0b11, 2);
		pcs.ready();
		let mut rng = TestRng::new(99);
		let p = generate_probabilistic_default(&pcs, 64, &mut rng).unwrap();

		let mr = MillerRabin::new(&p).unwrap();
		let mut fresh_rng = TestRng::new(12345);
		for _ in 0..MillerRabin::checks_needed(64) {
			let w = MPInt::random_in_range(&MPInt::from_integer(2, 64), &p, &mut fresh_rng);
			assert!(mr.test(&w).passed);
		}
	}

	#[test]
	fn pocklington_generator_produces_width_and_certificate() {
		let mut rng = TestRng::new(7);
		let (p, pockle) = generate_pocklington_certified(24, &mut rng, &mut NullProgress).unwrap();
		assert!(p.get_nbits() <= 24);
		assert!(pockle.certified_primes().len() >= 2);

		let mr = MillerRabin::new(&p).unwrap();
		let witness = MPInt::from_integer(2, p.bits);
		assert!(mr.test(&witness).passed);
	}
}
