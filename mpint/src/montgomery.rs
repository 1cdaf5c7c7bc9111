use subtle::Choice;

use crate::error::{Error, Result};
use crate::int::MPInt;

/// A Montgomery reduction context for a fixed odd modulus.
///
/// Caches `R = 2^k` (the smallest power of two greater than the
/// modulus), `R^-1 mod m`, and `-m^-1 mod R`, so that repeated modular
/// multiplications avoid full divisions. Its lifetime is independent of
/// any value imported into it; `import`/`export` are total inverses
/// (spec.md §8).
pub struct MontgomeryContext {
	modulus:MPInt,
	r_bits:usize,
	r_inv:MPInt,
	minus_m_inv:MPInt,
}

impl MontgomeryContext {
	pub fn new(m:&MPInt) -> Result<Self> {
		if m.get_bit(0) == 0 {
			return Err(Error::EvenModulus);
		}

		let r_bits = m.get_nbits();
		let r = MPInt::power_2(r_bits, r_bits + 1);
		let r_inv = MPInt::invert(&r.reduce_mod_2to(m.bits.max(r_bits)), m)?;
		let m_inv_mod_r = m.invert_mod_2to(r_bits)?;
		let minus_m_inv = MPInt::power_2(r_bits, r_bits + 1).sub(&m_inv_mod_r).reduce_mod_2to(r_bits);

		Ok(MontgomeryContext { modulus:m.clone(), r_bits, r_inv, minus_m_inv })
	}

	pub fn modulus(&self) -> &MPInt { &self.modulus }

	pub fn identity(&self) -> MPInt {
		let r = MPInt::power_2(self.r_bits, self.modulus.bits + self.r_bits);
		r.rem(&self.modulus)
	}

	/// `x -> x*R mod m`.
	pub fn import(&self, x:&MPInt) -> MPInt {
		let shifted = x.rem(&self.modulus).lshift_fixed(self.r_bits);
		shifted.rem(&self.modulus)
	}

	/// `xr -> xr*R^-1 mod m`.
	pub fn export(&self, xr:&MPInt) -> MPInt { xr.modmul(&self.r_inv, &self.modulus) }

	/// The core Montgomery reduction step: given `t = a*b` (in ordinary
	/// representation, already reduced from two imported operands),
	/// compute `t*R^-1 mod m` without a full division.
	fn reduce(&self, t:&MPInt) -> MPInt {
		let mask = t.reduce_mod_2to(self.r_bits);
		let q = mask.mul(&self.minus_m_inv).reduce_mod_2to(self.r_bits);
		let sum = t.add(&q.mul(&self.modulus));
		let shifted = sum.rshift_fixed(self.r_bits);
		let over = shifted.cmp_hs(&self.modulus);
		MPInt::select_into(&shifted.sub(&self.modulus), &shifted, over)
	}

	/// Multiply two *imported* (Montgomery-domain) values.
	pub fn mul_into(&self, a:&MPInt, b:&MPInt) -> MPInt { self.reduce(&a.mul(b)) }

	pub fn add(&self, a:&MPInt, b:&MPInt) -> MPInt { a.modadd(b, &self.modulus) }

	pub fn sub(&self, a:&MPInt, b:&MPInt) -> MPInt { a.modsub(b, &self.modulus) }

	/// `base^exp mod m`, where `base` is already imported. Walks every
	/// bit of `exp` unconditionally regardless of its value, as required
	/// by the constant-time floor in spec.md §4.1.
	pub fn pow(&self, base:&MPInt, exp:&MPInt) -> MPInt {
		let mut result = self.identity();
		for i in (0..exp.bits).rev() {
			result = self.mul_into(&result, &result);
			let with_mul = self.mul_into(&result, base);
			result = MPInt::select_into(&with_mul, &result, Choice::from(exp.get_bit(i)));
		}
		result
	}

	/// Modular inverse inside the Montgomery domain: `a^-1` such that
	/// `a * a^-1 == R mod m` once both sides are exported.
	pub fn invert(&self, a:&MPInt) -> Result<MPInt> {
		let exported = self.export(a);
		let inv = MPInt::invert(&exported, &self.modulus)?;
		Ok(self.import(&inv))
	}

	/// Modular square root inside the Montgomery domain, delegating to
	/// [`crate::modsqrt::ModSqrtContext`].
	pub fn modsqrt(&self, ctx:&crate::modsqrt::ModSqrtContext, a:&MPInt) -> (MPInt, Choice) {
		let exported = self.export(a);
		let (root, ok) = ctx.sqrt(&exported);
		(self.import(&root), ok)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn import_export_roundtrip() {
		let m = MPInt::from_integer(97, 32);
		let mc = MontgomeryContext::new(&m).unwrap();
		for v in [0u64, 1, 5, 96] {
			let x = MPInt::from_integer(v, 32);
			let imported = mc.import(&x);
			let back = mc.export(&imported);
			assert_eq!(back, x.rem(&m), "roundtrip failed for {v}");
		}
	}

	#[test]
	fn mul_matches_modmul() {
		let m = MPInt::from_integer(97, 32);
		let mc = MontgomeryContext::new(&m).unwrap();
		let a = MPInt::from_integer(12, 32);
		let b = MPInt::from_integer(34, 32);
		let ia = mc.import(&a);
		let ib = mc.import(&b);
		let prod = mc.export(&mc.mul_into(&ia, &ib));
		assert_eq!(prod, a.modmul(&b, &m));
	}

	#[test]
	fn pow_matches_modpow() {
		let m = MPInt::from_integer(101, 32);
		let mc = MontgomeryContext::new(&m).unwrap();
		let base = MPInt::from_integer(5, 32);
		let exp = MPInt::from_integer(17, 32);
		let expected = base.modpow(&exp, &m);
		let got = mc.export(&mc.pow(&mc.import(&base), &exp));
		assert_eq!(got, expected);
	}

	#[test]
	fn even_modulus_rejected() {
		let m = MPInt::from_integer(10, 32);
		assert!(MontgomeryContext::new(&m).is_err());
	}
}
