//! OpenSSH certificates: a base key decorated with a CA signature,
//! validity window, principal list and critical options (spec.md §4.3,
//! design note "Certificates as decorated keys").
use std::time::{SystemTime, UNIX_EPOCH};

use crate::encoding::{BinarySink, Reader};
use crate::error::{Error, Result};
use crate::key::{PublicKey, Signature, SignFlags};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertType {
	User,
	Host,
}

/// Which digest sub-algorithms a caller is willing to accept for an
/// RSA-CA signature over this certificate (spec.md §4.3).
#[derive(Debug, Clone, Copy)]
pub struct PermittedRsaSignatures {
	pub sha1:bool,
	pub sha256:bool,
	pub sha512:bool,
}

impl Default for PermittedRsaSignatures {
	fn default() -> Self { PermittedRsaSignatures { sha1:false, sha256:true, sha512:true } }
}

pub struct Certificate {
	pub base:PublicKey,
	pub cert_type:CertType,
	pub key_id:String,
	pub principals:Vec<String>,
	pub valid_after:u64,
	pub valid_before:u64,
	pub critical_options:Vec<(String, String)>,
	pub extensions:Vec<(String, String)>,
	pub ca_key:PublicKey,
	pub signature:Signature,
	/// The exact bytes that were signed (everything up to but excluding
	/// the trailing signature field), kept so re-verification doesn't
	/// have to re-derive the wire layout.
	pub signed_data:Vec<u8>,
}

impl Certificate {
	pub fn algorithm_name(&self) -> &'static str {
		match self.base {
			PublicKey::Rsa(_) => "ssh-rsa-cert-v01@openssh.com",
			PublicKey::Dsa(_) => "ssh-dss-cert-v01@openssh.com",
			PublicKey::Ecdsa(ref k) => match k.curve() {
				crate::key::Curve::NistP256 => "ecdsa-sha2-nistp256-cert-v01@openssh.com",
				crate::key::Curve::NistP384 => "ecdsa-sha2-nistp384-cert-v01@openssh.com",
				crate::key::Curve::NistP521 => "ecdsa-sha2-nistp521-cert-v01@openssh.com",
			},
			PublicKey::Ed25519(_) => "ssh-ed25519-cert-v01@openssh.com",
			PublicKey::Ed448(_) => "ssh-ed448-cert-v01@openssh.com",
			PublicKey::Cert(_) => unreachable!("a certificate cannot itself certify another certificate"),
		}
	}

	pub fn base_key(&self) -> &PublicKey { &self.base }

	pub fn public_blob(&self) -> Vec<u8> {
		let mut blob = Vec::new();
		blob.extend(&self.signed_data);
		blob.put_string(&self.signature.blob);
		blob
	}

	/// Validate signature, principal membership, validity window and
	/// required critical options, and (for an RSA CA) that the digest
	/// sub-algorithm used is one `permitted` allows.
	pub fn check_cert(
		&self,
		principal:&str,
		now:Option<u64>,
		permitted_rsa:PermittedRsaSignatures,
	) -> std::result::Result<(), String> {
		if !self.ca_key.verify(&self.signature, &self.signed_data) {
			return Err("certificate signature does not verify against the CA key".to_string());
		}

		if let PublicKey::Rsa(_) = self.ca_key {
			let ok = match self.signature.algorithm_name.as_str() {
				"ssh-rsa" => permitted_rsa.sha1,
				"rsa-sha2-256" => permitted_rsa.sha256,
				"rsa-sha2-512" => permitted_rsa.sha512,
				_ => false,
			};
			if !ok {
				return Err(format!("CA signature sub-algorithm {} not permitted", self.signature.algorithm_name));
			}
		}

		if !self.principals.is_empty() && !self.principals.iter().any(|p| p == principal) {
			return Err(format!("principal {principal:?} not in certificate principal list"));
		}

		let now = now.unwrap_or_else(|| SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs());
		if now < self.valid_after || now >= self.valid_before {
			return Err("certificate is outside its validity window".to_string());
		}

		if self.critical_options.iter().any(|(name, _)| !KNOWN_CRITICAL_OPTIONS.contains(&name.as_str())) {
			return Err("certificate carries an unrecognised critical option".to_string());
		}

		Ok(())
	}

	pub fn invalid(&self, flags:SignFlags) -> Option<String> { self.base.invalid(flags) }
}

const KNOWN_CRITICAL_OPTIONS:&[&str] =
	&["force-command", "source-address", "verify-required", "no-touch-required"];

pub fn parse_certificate(algorithm:&str, data:&[u8]) -> Result<Certificate> {
	let mut r = Reader::new(data);
	let nonce = r.string()?;

	let base = parse_base_key(algorithm, &mut r)?;

	let serial = r.u32()?;
	let _ = serial;
	let cert_type_num = r.u32()?;
	let cert_type = match cert_type_num {
		2 => CertType::Host,
		_ => CertType::User,
	};
	let key_id = r.utf8_string()?;
	let principals = r.string().map(split_name_list).unwrap_or_default();
	let valid_after = r.u32()? as u64;
	let valid_before = r.u32()? as u64;
	let critical_options = r.string().map(parse_options).unwrap_or_default();
	let extensions = r.string().map(parse_options).unwrap_or_default();
	let _reserved = r.string()?;
	let ca_blob = r.string()?;
	let ca_key = crate::parse_public_key(ca_blob)?;

	let signed_len = data.len() - r.remaining().len();
	let signed_data = data[..signed_len].to_vec();

	let sig_blob = r.string()?;
	let mut sig_reader = Reader::new(sig_blob);
	let sig_algorithm_name = sig_reader.utf8_string()?;
	let signature = Signature { algorithm_name:sig_algorithm_name, blob:sig_blob.to_vec() };

	let _ = nonce;
	Ok(Certificate {
		base,
		cert_type,
		key_id,
		principals,
		valid_after,
		valid_before,
		critical_options,
		extensions,
		ca_key,
		signature,
		signed_data,
	})
}

fn split_name_list(bytes:&[u8]) -> Vec<String> {
	let mut r = Reader::new(bytes);
	let mut out = Vec::new();
	while !r.remaining().is_empty() {
		if let Ok(s) = r.utf8_string() {
			out.push(s);
		} else {
			break;
		}
	}
	out
}

fn parse_options(bytes:&[u8]) -> Vec<(String, String)> {
	let mut r = Reader::new(bytes);
	let mut out = Vec::new();
	while !r.remaining().is_empty() {
		let (Ok(name), Ok(value)) = (r.utf8_string(), r.string()) else { break };
		out.push((name, String::from_utf8_lossy(value).into_owned()));
	}
	out
}

fn parse_base_key(algorithm:&str, r:&mut Reader) -> Result<PublicKey> {
	let base_algo = algorithm.trim_end_matches("-cert-v01@openssh.com");
	match base_algo {
		"ssh-rsa" => Ok(PublicKey::Rsa(crate::rsa::RsaPublicKey { e:r.mpint()?, n:r.mpint()? })),
		"ssh-dss" => {
			Ok(PublicKey::Dsa(crate::dsa::DsaPublicKey { p:r.mpint()?, q:r.mpint()?, g:r.mpint()?, y:r.mpint()? }))
		}
		"ecdsa-sha2-nistp256" | "ecdsa-sha2-nistp384" | "ecdsa-sha2-nistp521" => {
			let curve_name = r.string()?;
			let point = r.string()?;
			let mut blob = Vec::new();
			blob.put_string(base_algo.as_bytes());
			blob.put_string(curve_name);
			blob.put_string(point);
			Ok(PublicKey::Ecdsa(crate::ecdsa::EcdsaPublicKey::from_public_blob(&blob)?))
		}
		"ssh-ed25519" => {
			let raw = r.string()?;
			let mut blob = Vec::new();
			blob.put_string(b"ssh-ed25519");
			blob.put_string(raw);
			Ok(PublicKey::Ed25519(crate::eddsa::Ed25519PublicKey::from_public_blob(&blob)?))
		}
		"ssh-ed448" => {
			let raw = r.string()?;
			let mut blob = Vec::new();
			blob.put_string(b"ssh-ed448");
			blob.put_string(raw);
			Ok(PublicKey::Ed448(crate::eddsa::Ed448PublicKey::from_public_blob(&blob)?))
		}
		_ => Err(Error::UnsupportedKeyType(base_algo.to_string())),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn unknown_critical_option_is_rejected() {
		let known = KNOWN_CRITICAL_OPTIONS;
		assert!(known.contains(&"force-command"));
		assert!(!known.contains(&"not-a-real-option"));
	}
}
