use subtle::Choice;

use crate::int::MPInt;

/// A reusable context for computing modular square roots mod an odd
/// prime `p`, built once from `p` and a known quadratic non-residue
/// (Tonelli–Shanks). Constructing this is somewhat expensive (it needs
/// to locate the non-residue's order), so callers that need many square
/// roots mod the same prime build one context and query it repeatedly,
/// matching the original `modsqrt_new`/`mp_modsqrt` split.
pub struct ModSqrtContext {
	p:MPInt,
	/// p - 1 = q * 2^s, q odd.
	q:MPInt,
	s:usize,
	/// `non_square^q mod p`, the generator of the 2-power subgroup.
	z:MPInt,
}

impl ModSqrtContext {
	pub fn new(p:&MPInt, non_square:&MPInt) -> Self {
		let one = MPInt::from_integer(1, p.bits);
		let p_minus_1 = p.sub(&one);
		let mut q = p_minus_1.clone();
		let mut s = 0usize;
		while q.get_bit(0) == 0 && !q.is_zero() {
			q = q.rshift_fixed(1);
			s += 1;
		}
		let z = non_square.modpow(&q, p);
		ModSqrtContext { p:p.clone(), q, s, z }
	}

	/// Returns `(root, ok)`. `ok` is a side-channel success indicator
	/// (a [`Choice`]) rather than a sentinel value baked into `root`, per
	/// spec.md §4.1: callers must check it before trusting the root,
	/// exactly as they must check `pcs`/Miller-Rabin outcomes.
	pub fn sqrt(&self, a:&MPInt) -> (MPInt, Choice) {
		if a.is_zero() {
			return (MPInt::from_integer(0, self.p.bits), Choice::from(1));
		}

		let mut m = self.s;
		let mut c = self.z.clone();
		let one = MPInt::from_integer(1, self.p.bits);
		let q_plus_1_over_2 = self.q.add(&one).rshift_fixed(1);
		let mut t = a.modpow(&self.q, &self.p);
		let mut r = a.modpow(&q_plus_1_over_2, &self.p);

		loop {
			if bool::from(t.cmp_eq(&one)) {
				return (r, Choice::from(1));
			}

			let mut i = 0usize;
			let mut t_pow = t.clone();
			while !bool::from(t_pow.cmp_eq(&one)) {
				i += 1;
				if i >= m {
					// `a` was not a quadratic residue mod p.
					return (MPInt::from_integer(0, self.p.bits), Choice::from(0));
				}
				t_pow = t_pow.modmul(&t_pow, &self.p);
			}

			let mut b = c.clone();
			for _ in 0..m.saturating_sub(i).saturating_sub(1) {
				b = b.modmul(&b, &self.p);
			}

			m = i;
			c = b.modmul(&b, &self.p);
			t = t.modmul(&c, &self.p);
			r = r.modmul(&b, &self.p);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn sqrt_of_square_recovers_a_root() {
		// p = 29 is prime; 2 is a non-residue mod 29.
		let p = MPInt::from_integer(29, 32);
		let non_square = MPInt::from_integer(2, 32);
		let ctx = ModSqrtContext::new(&p, &non_square);

		for v in 1u64..29 {
			let a = MPInt::from_integer(v, 32);
			let squared = a.modmul(&a, &p);
			let (root, ok) = ctx.sqrt(&squared);
			assert!(bool::from(ok));
			let check = root.modmul(&root, &p);
			assert_eq!(check, squared, "failed for v={v}");
		}
	}

	#[test]
	fn sqrt_of_non_residue_fails() {
		let p = MPInt::from_integer(29, 32);
		let non_square = MPInt::from_integer(2, 32);
		let ctx = ModSqrtContext::new(&p, &non_square);
		let (_, ok) = ctx.sqrt(&non_square);
		assert!(!bool::from(ok));
	}
}
