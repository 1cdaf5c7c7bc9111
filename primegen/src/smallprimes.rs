use once_cell::sync::Lazy;

/// All primes below `2^16`, sieved once on first use (there are exactly
/// 6542 of them). Used both to reject composite candidates cheaply
/// before running Miller-Rabin, and by [`crate::pcs::PrimeCandidateSource`]
/// to avoid any candidate divisible by one of them.
pub static SMALL_PRIMES:Lazy<Vec<u32>> = Lazy::new(sieve);

const LIMIT:usize = 1 << 16;

fn sieve() -> Vec<u32> {
	let mut is_composite = vec![false; LIMIT];
	let mut primes = Vec::with_capacity(6542);

	for candidate in 2..LIMIT {
		if is_composite[candidate] {
			continue;
		}

		primes.push(candidate as u32);

		let mut multiple = candidate * candidate;
		while multiple < LIMIT {
			is_composite[multiple] = true;
			multiple += candidate;
		}
	}

	primes
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn known_count_below_2_16() {
		assert_eq!(SMALL_PRIMES.len(), 6542);
	}

	#[test]
	fn starts_and_ends_correctly() {
		assert_eq!(SMALL_PRIMES[0], 2);
		assert_eq!(*SMALL_PRIMES.last().unwrap(), 65521);
	}
}
