//! SSH wire encoding helpers (RFC 4251 §5): `byte`, `uint32`, `string`,
//! `mpint`, `boolean`, `name-list`.
//!
//! The C original ties `BinarySink`/`BinarySource` capability objects
//! into every struct that can be serialized via an "upcast" trick
//! (a struct embeds the sink plus a pointer back to itself). Per
//! spec.md §9 we avoid that construction entirely: a sink or source
//! here is just a borrowed capability handle (`&mut dyn BinarySink`,
//! `&mut Reader<'_>`), never an embedded field.
use byteorder::{BigEndian, ByteOrder};
use pssh_mpint::MPInt;

use crate::error::{Error, Result};

pub trait BinarySink {
	fn extend(&mut self, bytes:&[u8]);

	fn put_u8(&mut self, byte:u8) { self.extend(&[byte]) }

	fn put_u32(&mut self, value:u32) {
		let mut buf = [0u8; 4];
		BigEndian::write_u32(&mut buf, value);
		self.extend(&buf);
	}

	fn put_bool(&mut self, value:bool) { self.put_u8(value as u8) }

	fn put_string(&mut self, bytes:&[u8]) {
		self.put_u32(bytes.len() as u32);
		self.extend(bytes);
	}

	fn put_mpint(&mut self, value:&MPInt) {
		let mut bytes = value.to_bytes_be();
		// strip leading zero bytes, but keep one if the top bit is set
		// (mpints are encoded as signed two's complement on the wire).
		while bytes.len() > 1 && bytes[0] == 0 && bytes[1] & 0x80 == 0 {
			bytes.remove(0);
		}
		if !bytes.is_empty() && bytes[0] & 0x80 != 0 {
			let mut padded = Vec::with_capacity(bytes.len() + 1);
			padded.push(0);
			padded.extend_from_slice(&bytes);
			bytes = padded;
		}
		self.put_string(&bytes);
	}

	fn put_name_list(&mut self, names:&[&str]) { self.put_string(names.join(",").as_bytes()) }
}

impl BinarySink for Vec<u8> {
	fn extend(&mut self, bytes:&[u8]) { Extend::extend(self, bytes.iter().copied()) }
}

impl BinarySink for pssh_cryptovec::CryptoVec {
	fn extend(&mut self, bytes:&[u8]) { pssh_cryptovec::CryptoVec::extend(self, bytes) }
}

/// A cursor over a borrowed byte slice.
pub struct Reader<'a> {
	data:&'a [u8],
	pos:usize,
}

impl<'a> Reader<'a> {
	pub fn new(data:&'a [u8]) -> Self { Reader { data, pos:0 } }

	pub fn remaining(&self) -> &'a [u8] { &self.data[self.pos..] }

	pub fn take(&mut self, n:usize) -> Result<&'a [u8]> {
		if self.pos + n > self.data.len() {
			return Err(Error::IndexOutOfBounds);
		}
		let slice = &self.data[self.pos..self.pos + n];
		self.pos += n;
		Ok(slice)
	}

	pub fn byte(&mut self) -> Result<u8> { Ok(self.take(1)?[0]) }

	pub fn u32(&mut self) -> Result<u32> { Ok(BigEndian::read_u32(self.take(4)?)) }

	pub fn bool(&mut self) -> Result<bool> { Ok(self.byte()? != 0) }

	pub fn string(&mut self) -> Result<&'a [u8]> {
		let len = self.u32()? as usize;
		self.take(len)
	}

	pub fn utf8_string(&mut self) -> Result<String> {
		Ok(String::from_utf8_lossy(self.string()?).into_owned())
	}

	pub fn mpint(&mut self) -> Result<MPInt> {
		let bytes = self.string()?;
		Ok(MPInt::from_bytes_be(bytes, bytes.len() * 8 + 8))
	}

	pub fn name_list(&mut self) -> Result<Vec<String>> {
		let s = self.utf8_string()?;
		if s.is_empty() {
			return Ok(Vec::new());
		}
		Ok(s.split(',').map(|s| s.to_string()).collect())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn string_roundtrip() {
		let mut buf = Vec::new();
		buf.put_string(b"hello");
		let mut r = Reader::new(&buf);
		assert_eq!(r.string().unwrap(), b"hello");
	}

	#[test]
	fn mpint_roundtrip_preserves_value() {
		let mut buf = Vec::new();
		let v = MPInt::from_integer(0x8000_0001, 64);
		buf.put_mpint(&v);
		let mut r = Reader::new(&buf);
		let back = r.mpint().unwrap();
		assert_eq!(back.rem(&MPInt::from_integer(u32::MAX as u64 + 1, 64)).get_hex(), v.get_hex());
	}

	#[test]
	fn name_list_roundtrip() {
		let mut buf = Vec::new();
		buf.put_name_list(&["a", "b", "c"]);
		let mut r = Reader::new(&buf);
		assert_eq!(r.name_list().unwrap(), vec!["a", "b", "c"]);
	}
}
