use std::cmp::Ordering;
use std::fmt;

use subtle::{Choice, ConditionallySelectable, ConstantTimeEq, ConstantTimeGreater};

/// `a < b` in constant time, expressed via the `ConstantTimeGreater`
/// primitive subtle provides for unsigned integers.
#[inline]
fn ct_lt_limb(a:u64, b:u64) -> Choice { b.ct_gt(&a) }
use zeroize::Zeroize;

use crate::error::{Error, Result};
use crate::limbs::{self, Limb, LIMB_BITS};
use crate::rand::EntropySource;

fn limbs_for_bits(bits:usize) -> usize { (bits + LIMB_BITS as usize - 1) / (LIMB_BITS as usize) }

/// A fixed-width, arbitrary-precision integer.
///
/// Every `MPInt` carries a declared maximum bit width fixed at
/// construction time. All arithmetic that returns an `MPInt` of width
/// `w` produces a value that is mathematically correct modulo `2^w`;
/// operations never silently grow past that width. Call sites choose
/// the width, mirroring the C original's `mp_new(bits)` convention.
#[derive(Clone)]
pub struct MPInt {
	pub(crate) bits:usize,
	pub(crate) limbs:Vec<Limb>,
}

impl Zeroize for MPInt {
	fn zeroize(&mut self) { self.limbs.zeroize(); }
}

impl Drop for MPInt {
	fn drop(&mut self) { self.zeroize(); }
}

impl fmt::Debug for MPInt {
	fn fmt(&self, f:&mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "MPInt({} bits, 0x{})", self.bits, self.get_hex())
	}
}

impl MPInt {
	/// Mask off any bits above the declared width. Every constructor and
	/// mutating operation must call this before returning.
	fn mask_top(&mut self) {
		let total_bits = self.limbs.len() * LIMB_BITS as usize;
		let extra = total_bits - self.bits;

		if extra == 0 || self.limbs.is_empty() {
			return;
		}

		let top = self.limbs.len() - 1;
		if extra >= LIMB_BITS as usize {
			self.limbs[top] = 0;
		} else {
			let mask = (1u64 << (LIMB_BITS as usize - extra)) - 1;
			self.limbs[top] &= mask;
		}
	}

	/// A zero value with the given declared maximum width.
	pub fn new(maxbits:usize) -> Self { MPInt { bits:maxbits, limbs:vec![0; limbs_for_bits(maxbits)] } }

	pub fn from_integer(value:u64, maxbits:usize) -> Self {
		let mut v = Self::new(maxbits.max(1));
		if !v.limbs.is_empty() {
			v.limbs[0] = value;
		}
		v.mask_top();
		v
	}

	pub fn from_bytes_be(bytes:&[u8], maxbits:usize) -> Self {
		let mut v = Self::new(maxbits.max(bytes.len() * 8));
		for (i, &byte) in bytes.iter().rev().enumerate() {
			let limb = i / 8;
			let shift = (i % 8) * 8;
			if limb < v.limbs.len() {
				v.limbs[limb] |= (byte as u64) << shift;
			}
		}
		v.mask_top();
		v
	}

	pub fn from_bytes_le(bytes:&[u8], maxbits:usize) -> Self {
		let mut rev:Vec<u8> = bytes.to_vec();
		rev.reverse();
		Self::from_bytes_be(&rev, maxbits)
	}

	pub fn from_hex(hex:&str) -> Result<Self> {
		let hex = hex.trim_start_matches("0x").trim_start_matches("0X");
		if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
			return Err(Error::InvalidHex);
		}
		let bytes_needed = (hex.len() + 1) / 2;
		let padded = if hex.len() % 2 == 1 { format!("0{hex}") } else { hex.to_string() };
		let mut bytes = Vec::with_capacity(bytes_needed);
		for chunk in padded.as_bytes().chunks(2) {
			let s = std::str::from_utf8(chunk).map_err(|_| Error::InvalidHex)?;
			bytes.push(u8::from_str_radix(s, 16).map_err(|_| Error::InvalidHex)?);
		}
		Ok(Self::from_bytes_be(&bytes, bytes_needed * 8))
	}

	pub fn copy(&self) -> Self { self.clone() }

	/// `2^bit`, as a value of declared width `maxbits`.
	pub fn power_2(bit:usize, maxbits:usize) -> Self {
		let mut v = Self::new(maxbits);
		let limb = bit / LIMB_BITS as usize;
		let off = bit % LIMB_BITS as usize;
		if limb < v.limbs.len() {
			v.limbs[limb] = 1u64 << off;
		}
		v.mask_top();
		v
	}

	pub fn max_bits(&self) -> usize { self.bits }

	pub fn get_bit(&self, bit:usize) -> u8 {
		if bit >= self.bits {
			return 0;
		}
		let limb = bit / LIMB_BITS as usize;
		let off = bit % LIMB_BITS as usize;
		((self.limbs[limb] >> off) & 1) as u8
	}

	pub fn set_bit(&mut self, bit:usize, value:u8) {
		if bit >= self.bits {
			return;
		}
		let limb = bit / LIMB_BITS as usize;
		let off = bit % LIMB_BITS as usize;
		if value != 0 {
			self.limbs[limb] |= 1u64 << off;
		} else {
			self.limbs[limb] &= !(1u64 << off);
		}
	}

	pub fn get_byte(&self, i:usize) -> u8 {
		let base = i * 8;
		let mut byte = 0u8;
		for b in 0..8 {
			byte |= self.get_bit(base + b) << b;
		}
		byte
	}

	/// Number of significant bits. **Leaks the magnitude** — do not call
	/// on secret values outside of display/debug code, matching the
	/// original `mp_get_nbits` contract.
	pub fn get_nbits(&self) -> usize {
		for i in (0..self.limbs.len()).rev() {
			if self.limbs[i] != 0 {
				return i * LIMB_BITS as usize + (LIMB_BITS as usize - self.limbs[i].leading_zeros() as usize);
			}
		}
		0
	}

	pub fn is_zero(&self) -> bool { self.limbs.iter().all(|&l| l == 0) }

	/// Leaks the value; formatting only.
	pub fn get_hex(&self) -> String {
		let nbytes = (self.bits + 7) / 8;
		let mut s = String::with_capacity(nbytes * 2);
		for i in (0..nbytes).rev() {
			s.push_str(&format!("{:02x}", self.get_byte(i)));
		}
		let trimmed = s.trim_start_matches('0');
		if trimmed.is_empty() { "0".to_string() } else { trimmed.to_string() }
	}

	/// Leaks the value; formatting only. Implemented by repeated
	/// divide-by-10, same as the original's decimal-printing helper.
	pub fn get_decimal(&self) -> String {
		if self.is_zero() {
			return "0".to_string();
		}
		let mut digits = Vec::new();
		let mut work = self.clone();
		let ten = MPInt::from_integer(10, self.bits.max(8));
		while !work.is_zero() {
			let (q, r) = work.divmod(&ten);
			digits.push(b'0' + r.limbs.get(0).copied().unwrap_or(0) as u8);
			work = q;
		}
		digits.reverse();
		String::from_utf8(digits).unwrap_or_default()
	}

	pub fn to_bytes_be(&self) -> Vec<u8> {
		let nbytes = (self.bits + 7) / 8;
		(0..nbytes).rev().map(|i| self.get_byte(i)).collect()
	}

	fn same_width(&self, other:&Self) -> usize { self.limbs.len().max(other.limbs.len()) }

	fn binop(&self, other:&Self, out_bits:usize, f:impl Fn(u64, u64) -> u64) -> Self {
		let mut out = Self::new(out_bits);
		let n = self.same_width(other).min(out.limbs.len());
		for i in 0..n {
			let a = self.limbs.get(i).copied().unwrap_or(0);
			let b = other.limbs.get(i).copied().unwrap_or(0);
			out.limbs[i] = f(a, b);
		}
		out.mask_top();
		out
	}

	pub fn and(&self, other:&Self) -> Self { self.binop(other, self.bits, |a, b| a & b) }

	pub fn or(&self, other:&Self) -> Self { self.binop(other, self.bits.max(other.bits), |a, b| a | b) }

	pub fn xor(&self, other:&Self) -> Self { self.binop(other, self.bits.max(other.bits), |a, b| a ^ b) }

	/// Bit-clear: `self & !other`.
	pub fn bic(&self, other:&Self) -> Self { self.binop(other, self.bits, |a, b| a & !b) }

	pub fn add(&self, other:&Self) -> Self {
		let out_bits = self.bits.max(other.bits);
		let mut out = Self::new(out_bits);
		let n = out.limbs.len().min(self.limbs.len());
		out.limbs[..n].copy_from_slice(&self.limbs[..n]);
		limbs::add_into(&mut out.limbs, &other.limbs);
		out.mask_top();
		out
	}

	pub fn add_integer(&self, value:u64) -> Self { self.add(&Self::from_integer(value, self.bits)) }

	/// Subtraction modulo `2^bits`; wraps rather than going negative,
	/// matching the declared-width contract in §3.
	pub fn sub(&self, other:&Self) -> Self {
		let out_bits = self.bits.max(other.bits);
		let mut out = Self::new(out_bits);
		let n = out.limbs.len().min(self.limbs.len());
		out.limbs[..n].copy_from_slice(&self.limbs[..n]);
		limbs::sub_into(&mut out.limbs, &other.limbs);
		out.mask_top();
		out
	}

	pub fn sub_integer(&self, value:u64) -> Self { self.sub(&Self::from_integer(value, self.bits)) }

	pub fn mul(&self, other:&Self) -> Self {
		let out_bits = self.bits + other.bits;
		let mut wide = vec![0u64; self.limbs.len() + other.limbs.len()];
		limbs::mul_into(&mut wide, &self.limbs, &other.limbs);
		let mut out = Self::new(out_bits);
		let n = out.limbs.len().min(wide.len());
		out.limbs[..n].copy_from_slice(&wide[..n]);
		out.mask_top();
		out
	}

	pub fn mul_integer(&self, value:u64) -> Self { self.mul(&Self::from_integer(value, 64)) }

	/// Shift left by a count that may be attacker-controlled: must not
	/// branch on `n`'s value beyond what's inherent in a fixed loop over
	/// the declared width.
	pub fn lshift_safe(&self, n:usize) -> Self {
		let mut out = self.clone();
		for i in 0..out.bits {
			let from = i.checked_sub(n);
			let bit = from.map(|f| self.get_bit(f)).unwrap_or(0);
			out.set_bit(i, bit);
		}
		out
	}

	pub fn rshift_safe(&self, n:usize) -> Self {
		let mut out = self.clone();
		for i in 0..out.bits {
			out.set_bit(i, self.get_bit(i + n));
		}
		out
	}

	/// Fast path for a shift count known to the attacker anyway.
	pub fn lshift_fixed(&self, n:usize) -> Self {
		let limb_shift = n / LIMB_BITS as usize;
		let bit_shift = (n % LIMB_BITS as usize) as u32;
		let mut out = self.clone();
		limbs::shl_limbs(&mut out.limbs, limb_shift);
		limbs::shl_small(&mut out.limbs, bit_shift);
		out.mask_top();
		out
	}

	pub fn rshift_fixed(&self, n:usize) -> Self {
		let limb_shift = n / LIMB_BITS as usize;
		let bit_shift = (n % LIMB_BITS as usize) as u32;
		let mut out = self.clone();
		limbs::shr_limbs(&mut out.limbs, limb_shift);
		limbs::shr_small(&mut out.limbs, bit_shift);
		out
	}

	/// Constant-time "higher or same": `self >= other`.
	pub fn cmp_hs(&self, other:&Self) -> Choice {
		!self.ct_lt(other)
	}

	fn ct_lt(&self, other:&Self) -> Choice {
		let n = self.same_width(other);
		let mut lt = Choice::from(0u8);
		let mut eq_so_far = Choice::from(1u8);
		for i in (0..n).rev() {
			let a = self.limbs.get(i).copied().unwrap_or(0);
			let b = other.limbs.get(i).copied().unwrap_or(0);
			let this_lt = ct_lt_limb(a, b);
			let this_eq = a.ct_eq(&b);
			lt |= eq_so_far & this_lt;
			eq_so_far &= this_eq;
		}
		lt
	}

	pub fn cmp_eq(&self, other:&Self) -> Choice {
		let n = self.same_width(other);
		let mut eq = Choice::from(1u8);
		for i in 0..n {
			let a = self.limbs.get(i).copied().unwrap_or(0);
			let b = other.limbs.get(i).copied().unwrap_or(0);
			eq &= a.ct_eq(&b);
		}
		eq
	}

	pub fn eq_integer(&self, value:u64) -> Choice { self.cmp_eq(&Self::from_integer(value, self.bits)) }

	pub fn hs_integer(&self, value:u64) -> Choice { self.cmp_hs(&Self::from_integer(value, self.bits)) }

	/// `dst = if bit { a } else { b }`, in constant time.
	pub fn select_into(a:&Self, b:&Self, bit:Choice) -> Self {
		let n = a.limbs.len().max(b.limbs.len());
		let mut out = Self::new(a.bits.max(b.bits));
		for i in 0..n.min(out.limbs.len()) {
			let av = a.limbs.get(i).copied().unwrap_or(0);
			let bv = b.limbs.get(i).copied().unwrap_or(0);
			out.limbs[i] = u64::conditional_select(&bv, &av, bit);
		}
		out.mask_top();
		out
	}

	pub fn cond_add_into(&mut self, other:&Self, bit:Choice) {
		let added = self.add(other);
		*self = Self::select_into(&added, self, bit);
	}

	pub fn cond_sub_into(&mut self, other:&Self, bit:Choice) {
		let subbed = self.sub(other);
		*self = Self::select_into(&subbed, self, bit);
	}

	pub fn cond_swap(a:&mut Self, b:&mut Self, bit:Choice) {
		let new_a = Self::select_into(b, a, bit);
		let new_b = Self::select_into(a, b, bit);
		*a = new_a;
		*b = new_b;
	}

	pub fn cond_clear(&mut self, bit:Choice) {
		let zero = Self::new(self.bits);
		*self = Self::select_into(&zero, self, bit);
	}

	/// `(quotient, remainder)`, schoolbook long division. `d` must be
	/// non-zero. This is the one operation callers must not use on a
	/// secret divisor (per §4.1's constant-time floor).
	pub fn divmod(&self, d:&Self) -> (Self, Self) {
		assert!(!d.is_zero(), "mpint: division by zero");
		let mut rem = Self::new(self.bits.max(d.bits) + 1);
		let mut quot = Self::new(self.bits);
		for i in (0..self.bits).rev() {
			rem = rem.lshift_fixed(1);
			rem.set_bit(0, self.get_bit(i));
			if rem.cmp_hs(d).into() {
				rem = rem.sub(d);
				quot.set_bit(i, 1);
			}
		}
		(quot, rem)
	}

	pub fn div(&self, d:&Self) -> Self { self.divmod(d).0 }

	pub fn rem(&self, m:&Self) -> Self { self.divmod(m).1 }

	/// Keep only the bottom `n` bits.
	pub fn reduce_mod_2to(&self, n:usize) -> Self {
		let mut out = self.clone();
		out.bits = n.min(out.bits);
		out.limbs.truncate(limbs_for_bits(out.bits).max(1));
		out.mask_top();
		out
	}

	/// Modular inverse mod `2^n`, via Hensel lifting (Newton's method for
	/// `1/x`), valid because `self` must be odd.
	pub fn invert_mod_2to(&self, n:usize) -> Result<Self> {
		if self.get_bit(0) == 0 {
			return Err(Error::NotInvertible);
		}
		let mut x = Self::from_integer(1, n.max(64));
		let modulus = Self::power_2(n, n + 1);
		let two = Self::from_integer(2, n + 1);
		let mut iters = 0;
		while (1usize << iters) < n + 64 {
			let xs = self.reduce_mod_2to(n + 1).mul(&x).reduce_mod_2to(n + 1);
			let t = two.sub(&xs).reduce_mod_2to(n + 1);
			x = x.mul(&t).reduce_mod_2to(n + 1);
			iters += 1;
		}
		let _ = modulus;
		Ok(x.reduce_mod_2to(n))
	}

	pub fn modadd(&self, other:&Self, m:&Self) -> Self { self.add(other).rem(m) }

	pub fn modsub(&self, other:&Self, m:&Self) -> Self {
		let sum = self.add(m).sub(other);
		sum.rem(m)
	}

	pub fn modmul(&self, other:&Self, m:&Self) -> Self { self.mul(other).rem(m) }

	/// `self^exp mod m` by square-and-multiply, visiting every exponent
	/// bit unconditionally (so timing depends only on `exp`'s declared
	/// width, not its value) — the same contract as Montgomery::pow,
	/// which callers should prefer for secret exponents.
	pub fn modpow(&self, exp:&Self, m:&Self) -> Self {
		let mut result = Self::from_integer(1, m.bits);
		let base = self.rem(m);
		for i in (0..exp.bits).rev() {
			result = result.modmul(&result, m);
			let with_mul = result.modmul(&base, m);
			result = Self::select_into(&with_mul, &result, Choice::from(exp.get_bit(i)));
		}
		result
	}

	/// Extended binary GCD, returning `(gcd, bezout_a, bezout_b)` such
	/// that `a*bezout_a + b*bezout_b == gcd`.
	pub fn gcd_into(a:&Self, b:&Self) -> (Self, Self, Self) {
		if a.is_zero() {
			return (b.clone(), Self::from_integer(0, a.bits), Self::from_integer(1, b.bits));
		}
		let (g, x1, y1) = Self::gcd_into(&b.rem(a), a);
		let q = b.div(a);
		// x*a + x1*(b - q*a) == g  =>  x == y1 - q*x1. Subtraction wraps
		// modulo 2^bits rather than going negative; `invert` below adds the
		// modulus back in before reducing, which recovers the right residue.
		let x = y1.sub(&q.mul(&x1));
		(g, x, x1)
	}

	pub fn coprime(a:&Self, b:&Self) -> bool { Self::gcd_into(a, b).0.eq_integer(1).into() }

	/// Modular inverse of `x` modulo `m`; fails iff `gcd(x, m) != 1`.
	pub fn invert(x:&Self, m:&Self) -> Result<Self> {
		let (g, bezout_a, _) = Self::gcd_into(&x.rem(m), m);
		if !bool::from(g.eq_integer(1)) {
			return Err(Error::NotInvertible);
		}
		Ok(bezout_a.add(m).rem(m))
	}

	pub fn random_bits(n:usize, rng:&mut dyn EntropySource) -> Self {
		let mut v = Self::new(n);
		let nbytes = (n + 7) / 8;
		let mut bytes = vec![0u8; nbytes];
		rng.fill_bytes(&mut bytes);
		v = Self::from_bytes_be(&bytes, n);
		if n > 0 {
			v.set_bit(n - 1, 1);
		}
		v
	}

	/// Uniform in `[lo, hi)` by rejection sampling over the bit width of
	/// `hi`.
	pub fn random_in_range(lo:&Self, hi:&Self, rng:&mut dyn EntropySource) -> Self {
		let width = hi.get_nbits().max(1);
		loop {
			let mut bytes = vec![0u8; (width + 7) / 8];
			rng.fill_bytes(&mut bytes);
			let candidate = Self::from_bytes_be(&bytes, hi.bits.max(lo.bits));
			let in_range = bool::from(candidate.cmp_hs(lo)) && bool::from(candidate.ct_lt(hi));
			if in_range {
				return candidate;
			}
		}
	}
}

impl PartialEq for MPInt {
	fn eq(&self, other:&Self) -> bool { self.cmp_eq(other).into() }
}

impl Eq for MPInt {}

impl PartialOrd for MPInt {
	fn partial_cmp(&self, other:&Self) -> Option<Ordering> {
		if bool::from(self.cmp_eq(other)) {
			Some(Ordering::Equal)
		} else if bool::from(self.ct_lt(other)) {
			Some(Ordering::Less)
		} else {
			Some(Ordering::Greater)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::rand::TestRng;

	#[test]
	fn add_sub_are_inverse() {
		let a = MPInt::from_integer(123456, 64);
		let b = MPInt::from_integer(7890, 64);
		assert_eq!(a.add(&b).sub(&b), a);
	}

	#[test]
	fn mul_and_div() {
		let a = MPInt::from_integer(97, 32);
		let b = MPInt::from_integer(31, 32);
		let p = a.mul(&b);
		assert_eq!(p.div(&b), a);
		assert_eq!(p.rem(&b), MPInt::from_integer(0, 64));
	}

	#[test]
	fn modpow_matches_small_case() {
		// 3^5 mod 13 == 9
		let base = MPInt::from_integer(3, 32);
		let exp = MPInt::from_integer(5, 32);
		let m = MPInt::from_integer(13, 32);
		assert_eq!(base.modpow(&exp, &m), MPInt::from_integer(9, 32));
	}

	#[test]
	fn invert_matches_known_case() {
		// 3^-1 mod 11 == 4
		let x = MPInt::from_integer(3, 32);
		let m = MPInt::from_integer(11, 32);
		let inv = MPInt::invert(&x, &m).unwrap();
		assert_eq!(inv, MPInt::from_integer(4, 32));
	}

	#[test]
	fn hex_roundtrip() {
		let v = MPInt::from_hex("1a2b3c").unwrap();
		assert_eq!(v.get_hex(), "1a2b3c");
	}

	#[test]
	fn random_bits_sets_msb() {
		let mut rng = TestRng::new(42);
		let v = MPInt::random_bits(128, &mut rng);
		assert_eq!(v.get_bit(127), 1);
	}

	#[test]
	fn lshift_safe_matches_fixed() {
		let v = MPInt::from_integer(0xABCD, 64);
		assert_eq!(v.lshift_safe(8), v.lshift_fixed(8));
		assert_eq!(v.rshift_safe(4), v.rshift_fixed(4));
	}
}
