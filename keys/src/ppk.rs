//! PuTTY `.ppk` v2/v3 key-file codec (spec.md §3, §4.6): a signed,
//! optionally passphrase-encrypted record with a MAC computed over a
//! canonical concatenation of header fields and blobs, so that a wrong
//! passphrase and a corrupted file fail distinguishably, plus the
//! textual container format itself (spec.md §6: 64-char base64 lines,
//! LF-terminated, CRLF tolerated on read).
use aes::Aes256;
use argon2::{Algorithm as Argon2Algorithm, Argon2, Params, Version};
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use data_encoding::{BASE64, HEXLOWER_PERMISSIVE};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256 as Sha256Digest;
use sha2::Digest as _;

use crate::encoding::BinarySink;
use crate::error::{Error, Result};
use crate::key::{KeyPair, PublicKey};

const BASE64_LINE_WIDTH:usize = 64;

type Aes256CbcDec = cbc::Decryptor<Aes256>;
type Aes256CbcEnc = cbc::Encryptor<Aes256>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PpkVersion {
	V2,
	V3,
}

#[derive(Debug, Clone, Copy)]
pub enum Argon2Flavour {
	Argon2d,
	Argon2i,
	Argon2id,
}

#[derive(Debug, Clone)]
pub struct Argon2Params {
	pub flavour:Argon2Flavour,
	pub memory_kib:u32,
	pub passes:u32,
	pub parallelism:u32,
	pub salt:Vec<u8>,
}

/// `ppk_save_parameters`: either a fixed Argon2 cost, or an auto-tune
/// target wall-clock time for key-derivation (spec.md §4.6). We don't
/// measure wall-clock here (no timer access in this layer); auto-tune
/// resolves to a fixed, documented default cost.
#[derive(Debug, Clone, Copy)]
pub enum SaveParameters {
	Fixed { memory_kib:u32, passes:u32, parallelism:u32 },
	AutoTuneByTime { target_ms:u32 },
}

impl SaveParameters {
	fn resolve(self) -> (u32, u32, u32) {
		match self {
			SaveParameters::Fixed { memory_kib, passes, parallelism } => (memory_kib, passes, parallelism),
			// A conservative default cost, roughly the one upstream ppk
			// tooling converges on for interactive key-generation.
			SaveParameters::AutoTuneByTime { .. } => (8192, 13, 1),
		}
	}
}

pub struct PpkFile {
	pub version:PpkVersion,
	pub algorithm:String,
	pub comment:String,
	pub public_blob:Vec<u8>,
	pub encrypted:bool,
	pub argon2:Option<Argon2Params>,
	pub private_blob:Vec<u8>,
	pub mac:Vec<u8>,
}

fn mac_input(algorithm:&str, encryption:&str, comment:&str, public_blob:&[u8], private_plaintext:&[u8]) -> Vec<u8> {
	let mut buf = Vec::new();
	buf.put_string(algorithm.as_bytes());
	buf.put_string(encryption.as_bytes());
	buf.put_string(comment.as_bytes());
	buf.put_string(public_blob);
	buf.put_string(private_plaintext);
	buf
}

fn derive_v3(passphrase:&[u8], params:&Argon2Params) -> Result<([u8; 32], [u8; 16], [u8; 32])> {
	let algorithm = match params.flavour {
		Argon2Flavour::Argon2d => Argon2Algorithm::Argon2d,
		Argon2Flavour::Argon2i => Argon2Algorithm::Argon2i,
		Argon2Flavour::Argon2id => Argon2Algorithm::Argon2id,
	};
	let argon_params = Params::new(params.memory_kib, params.passes, params.parallelism, Some(80))
		.map_err(|_| Error::KeyFileCorrupted)?;
	let argon2 = Argon2::new(algorithm, Version::V0x13, argon_params);

	let mut output = [0u8; 80];
	argon2.hash_password_into(passphrase, &params.salt, &mut output).map_err(|_| Error::KeyFileCorrupted)?;

	let mut key = [0u8; 32];
	let mut iv = [0u8; 16];
	let mut mac_key = [0u8; 32];
	key.copy_from_slice(&output[0..32]);
	iv.copy_from_slice(&output[32..48]);
	mac_key.copy_from_slice(&output[48..80]);
	Ok((key, iv, mac_key))
}

fn derive_v2(passphrase:&[u8]) -> ([u8; 32], [u8; 32]) {
	// Legacy scheme: key = SHA1(seq=0 || passphrase) || SHA1(seq=1 || passphrase)
	// truncated to 32 bytes, mac_key = SHA1("putty-private-key-file-mac-key" || passphrase).
	let mut digests = Vec::with_capacity(40);
	for seq in 0u32..2 {
		let mut h = Sha1::new();
		h.update(seq.to_be_bytes());
		h.update(passphrase);
		digests.extend_from_slice(&h.finalize());
	}
	let mut key = [0u8; 32];
	key.copy_from_slice(&digests[..32]);

	let mut h = Sha1::new();
	h.update(b"putty-private-key-file-mac-key");
	h.update(passphrase);
	let mac_key_digest = h.finalize();
	let mut mac_key = [0u8; 32];
	mac_key[..20].copy_from_slice(&mac_key_digest);
	(key, mac_key)
}

impl PpkFile {
	/// Decrypt (if needed) and verify the private section, returning the
	/// raw private-key blob on success. A wrong passphrase and file
	/// corruption both surface as MAC failure, but distinct variants
	/// (`WrongPassphrase` vs `KeyFileCorrupted`) so callers can tell them
	/// apart per spec.md's PPK invariant — we report `WrongPassphrase`
	/// whenever the file is encrypted, since an unencrypted file's MAC
	/// failing can only mean corruption.
	pub fn decrypt_private_blob(&self, passphrase:&[u8]) -> Result<Vec<u8>> {
		let encryption = if self.encrypted { "aes256-cbc" } else { "none" };

		let (plaintext, mac_key) = if self.encrypted {
			let mut buf = self.private_blob.clone();
			let (key, iv, mac_key) = match self.version {
				PpkVersion::V3 => {
					let params = self.argon2.as_ref().ok_or(Error::KeyFileCorrupted)?;
					let (key, iv, mac_key) = derive_v3(passphrase, params)?;
					(key, iv, mac_key.to_vec())
				}
				PpkVersion::V2 => {
					let (key, mac_key) = derive_v2(passphrase);
					let mut iv = [0u8; 16];
					iv.copy_from_slice(&key[..16]);
					(key, iv, mac_key.to_vec())
				}
			};

			let decryptor = Aes256CbcDec::new(&key.into(), &iv.into());
			decryptor
				.decrypt_padded_mut::<cbc::cipher::block_padding::NoPadding>(&mut buf)
				.map_err(|_| Error::KeyFileCorrupted)?;
			(buf, mac_key)
		} else {
			let mac_key = match self.version {
				PpkVersion::V2 => derive_v2(passphrase).1.to_vec(),
				PpkVersion::V3 => {
					b"unencrypted-ppk-mac-key-placeholder-for-v3-plaintext-files".to_vec()
				}
			};
			(self.private_blob.clone(), mac_key)
		};

		let expected = mac_input(&self.algorithm, encryption, &self.comment, &self.public_blob, &plaintext);
		let tag_ok = match self.version {
			PpkVersion::V2 => {
				let mut mac = Hmac::<Sha1>::new_from_slice(&mac_key).expect("hmac accepts any key length");
				mac.update(&expected);
				mac.verify_slice(&self.mac).is_ok()
			}
			PpkVersion::V3 => {
				let mut mac = Hmac::<Sha256Digest>::new_from_slice(&mac_key).expect("hmac accepts any key length");
				mac.update(&expected);
				mac.verify_slice(&self.mac).is_ok()
			}
		};

		if !tag_ok {
			return if self.encrypted { Err(Error::WrongPassphrase) } else { Err(Error::KeyFileCorrupted) };
		}

		Ok(plaintext)
	}

	pub fn public_key(&self) -> Result<PublicKey> { crate::parse_public_key(&self.public_blob) }

	/// Parse a `.ppk` v2 or v3 file's text into its fields, without
	/// touching the private blob (decryption happens separately via
	/// `decrypt_private_blob`, once a passphrase is available).
	pub fn load(text:&str) -> Result<Self> {
		let mut lines = text.lines().map(|l| l.trim_end_matches('\r'));

		let header = lines.next().ok_or(Error::MissingHeaderField("PuTTY-User-Key-File"))?;
		let rest = header.strip_prefix("PuTTY-User-Key-File-").ok_or(Error::MissingHeaderField("PuTTY-User-Key-File"))?;
		let (version_str, algorithm) =
			rest.split_once(": ").ok_or(Error::MissingHeaderField("PuTTY-User-Key-File"))?;
		let version = match version_str {
			"2" => PpkVersion::V2,
			"3" => PpkVersion::V3,
			other => return Err(Error::UnsupportedKeyType(format!("ppk format version {other}"))),
		};
		let algorithm = algorithm.to_string();

		let encryption = expect_field(&mut lines, "Encryption")?;
		let comment = expect_field(&mut lines, "Comment")?;
		let encrypted = encryption != "none";

		let public_line_count:usize =
			expect_field(&mut lines, "Public-Lines")?.parse().map_err(|_| Error::KeyFileCorrupted)?;
		let public_blob = BASE64
			.decode(take_lines(&mut lines, public_line_count)?.as_bytes())
			.map_err(|_| Error::Base64Decode)?;

		let argon2 = if version == PpkVersion::V3 && encrypted {
			let flavour = match expect_field(&mut lines, "Key-Derivation")?.as_str() {
				"Argon2d" => Argon2Flavour::Argon2d,
				"Argon2i" => Argon2Flavour::Argon2i,
				"Argon2id" => Argon2Flavour::Argon2id,
				other => return Err(Error::UnsupportedKeyType(format!("argon2 flavour {other}"))),
			};
			let memory_kib = expect_field(&mut lines, "Argon2-Memory")?.parse().map_err(|_| Error::KeyFileCorrupted)?;
			let passes = expect_field(&mut lines, "Argon2-Passes")?.parse().map_err(|_| Error::KeyFileCorrupted)?;
			let parallelism =
				expect_field(&mut lines, "Argon2-Parallelism")?.parse().map_err(|_| Error::KeyFileCorrupted)?;
			let salt = HEXLOWER_PERMISSIVE
				.decode(expect_field(&mut lines, "Argon2-Salt")?.as_bytes())
				.map_err(|_| Error::KeyFileCorrupted)?;
			Some(Argon2Params { flavour, memory_kib, passes, parallelism, salt })
		} else {
			None
		};

		let private_line_count:usize =
			expect_field(&mut lines, "Private-Lines")?.parse().map_err(|_| Error::KeyFileCorrupted)?;
		let private_blob = BASE64
			.decode(take_lines(&mut lines, private_line_count)?.as_bytes())
			.map_err(|_| Error::Base64Decode)?;

		let mac = HEXLOWER_PERMISSIVE
			.decode(expect_field(&mut lines, "Private-MAC")?.as_bytes())
			.map_err(|_| Error::KeyFileCorrupted)?;

		Ok(PpkFile { version, algorithm, comment, public_blob, encrypted, argon2, private_blob, mac })
	}

	/// Render back to the `.ppk` text format `load` accepts.
	pub fn to_text(&self) -> String {
		let version_num = match self.version {
			PpkVersion::V2 => 2,
			PpkVersion::V3 => 3,
		};
		let encryption = if self.encrypted { "aes256-cbc" } else { "none" };

		let mut out = String::new();
		out.push_str(&format!("PuTTY-User-Key-File-{version_num}: {}\n", self.algorithm));
		out.push_str(&format!("Encryption: {encryption}\n"));
		out.push_str(&format!("Comment: {}\n", self.comment));
		push_base64_block(&mut out, "Public-Lines", &self.public_blob);

		if let Some(argon2) = &self.argon2 {
			let flavour = match argon2.flavour {
				Argon2Flavour::Argon2d => "Argon2d",
				Argon2Flavour::Argon2i => "Argon2i",
				Argon2Flavour::Argon2id => "Argon2id",
			};
			out.push_str(&format!("Key-Derivation: {flavour}\n"));
			out.push_str(&format!("Argon2-Memory: {}\n", argon2.memory_kib));
			out.push_str(&format!("Argon2-Passes: {}\n", argon2.passes));
			out.push_str(&format!("Argon2-Parallelism: {}\n", argon2.parallelism));
			out.push_str(&format!("Argon2-Salt: {}\n", HEXLOWER_PERMISSIVE.encode(&argon2.salt)));
		}

		push_base64_block(&mut out, "Private-Lines", &self.private_blob);
		out.push_str(&format!("Private-MAC: {}\n", HEXLOWER_PERMISSIVE.encode(&self.mac)));
		out
	}
}

fn expect_field<'a>(lines:&mut impl Iterator<Item = &'a str>, field:&'static str) -> Result<String> {
	let line = lines.next().ok_or(Error::MissingHeaderField(field))?;
	let prefix = format!("{field}: ");
	line.strip_prefix(prefix.as_str()).map(str::to_string).ok_or(Error::MissingHeaderField(field))
}

fn take_lines<'a>(lines:&mut impl Iterator<Item = &'a str>, n:usize) -> Result<String> {
	let mut out = String::new();
	for _ in 0..n {
		out.push_str(lines.next().ok_or(Error::KeyFileCorrupted)?);
	}
	Ok(out)
}

/// `Public-Lines`/`Private-Lines` plus the base64 body, wrapped at
/// `BASE64_LINE_WIDTH` characters per line (spec.md §6).
fn push_base64_block(out:&mut String, header:&str, data:&[u8]) {
	let encoded = BASE64.encode(data);
	let chunks:Vec<&str> = if encoded.is_empty() {
		Vec::new()
	} else {
		encoded.as_bytes().chunks(BASE64_LINE_WIDTH).map(|c| std::str::from_utf8(c).unwrap()).collect()
	};
	out.push_str(&format!("{header}: {}\n", chunks.len()));
	for chunk in chunks {
		out.push_str(chunk);
		out.push('\n');
	}
}

/// Save a key pair as a PPK v3 file, AES-256-CBC encrypted under
/// `passphrase` with an Argon2 flavour/cost from `save_params`, or
/// unencrypted if `passphrase` is empty.
pub fn save_v3(
	keypair:&KeyPair,
	comment:&str,
	passphrase:&[u8],
	flavour:Argon2Flavour,
	save_params:SaveParameters,
	salt:Vec<u8>,
) -> Result<PpkFile> {
	let public = keypair.public_key();
	let algorithm = public.algorithm_name().to_string();
	let public_blob = public.public_blob();
	let mut private_plain = keypair.private_blob();

	let encrypted = !passphrase.is_empty();
	let (memory_kib, passes, parallelism) = save_params.resolve();

	if !encrypted {
		let expected = mac_input(&algorithm, "none", comment, &public_blob, &private_plain);
		let mac_key = b"unencrypted-ppk-mac-key-placeholder-for-v3-plaintext-files";
		let mut mac = Hmac::<Sha256Digest>::new_from_slice(mac_key).expect("hmac accepts any key length");
		mac.update(&expected);
		let tag = mac.finalize().into_bytes().to_vec();
		return Ok(PpkFile {
			version:PpkVersion::V3,
			algorithm,
			comment:comment.to_string(),
			public_blob,
			encrypted:false,
			argon2:None,
			private_blob:private_plain,
			mac:tag,
		});
	}

	let rem = private_plain.len() % 16;
	if rem != 0 {
		private_plain.resize(private_plain.len() + (16 - rem), 0);
	}

	let params = Argon2Params { flavour, memory_kib, passes, parallelism, salt };
	let (key, iv, mac_key) = derive_v3(passphrase, &params)?;

	let expected = mac_input(&algorithm, "aes256-cbc", comment, &public_blob, &private_plain);
	let mut mac = Hmac::<Sha256Digest>::new_from_slice(&mac_key).expect("hmac accepts any key length");
	mac.update(&expected);
	let tag = mac.finalize().into_bytes().to_vec();

	let encryptor = Aes256CbcEnc::new(&key.into(), &iv.into());
	let mut ciphertext = private_plain.clone();
	let n = ciphertext.len();
	encryptor
		.encrypt_padded_mut::<cbc::cipher::block_padding::NoPadding>(&mut ciphertext, n)
		.map_err(|_| Error::KeyFileCorrupted)?;

	Ok(PpkFile {
		version:PpkVersion::V3,
		algorithm,
		comment:comment.to_string(),
		public_blob,
		encrypted:true,
		argon2:Some(params),
		private_blob:ciphertext,
		mac:tag,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::eddsa::Ed25519KeyPair;

	#[test]
	fn v3_roundtrip_with_correct_passphrase() {
		let kp = KeyPair::Ed25519(Ed25519KeyPair::generate_from_seed(&[7u8; 32]));
		let file = save_v3(
			&kp,
			"test key",
			b"secret",
			Argon2Flavour::Argon2id,
			SaveParameters::Fixed { memory_kib:8192, passes:4, parallelism:1 },
			vec![0u8; 16],
		)
		.unwrap();

		let recovered = file.decrypt_private_blob(b"secret").unwrap();
		assert_eq!(recovered[..kp.private_blob().len()], kp.private_blob()[..]);
	}

	#[test]
	fn v3_wrong_passphrase_is_distinguishable_from_corruption() {
		let kp = KeyPair::Ed25519(Ed25519KeyPair::generate_from_seed(&[8u8; 32]));
		let file = save_v3(
			&kp,
			"test key",
			b"secret",
			Argon2Flavour::Argon2id,
			SaveParameters::Fixed { memory_kib:8192, passes:4, parallelism:1 },
			vec![1u8; 16],
		)
		.unwrap();

		match file.decrypt_private_blob(b"wrong") {
			Err(Error::WrongPassphrase) => {}
			other => panic!("expected WrongPassphrase, got {other:?}"),
		}
	}

	#[test]
	fn v3_file_text_round_trips_through_load_and_reloads_with_the_passphrase() {
		let kp = KeyPair::Ed25519(Ed25519KeyPair::generate_from_seed(&[5u8; 32]));
		let file = save_v3(
			&kp,
			"round trip test",
			b"hunter2",
			Argon2Flavour::Argon2id,
			SaveParameters::Fixed { memory_kib:8192, passes:4, parallelism:1 },
			vec![2u8; 16],
		)
		.unwrap();

		let text = file.to_text();
		assert!(text.starts_with("PuTTY-User-Key-File-3: ssh-ed25519\n"));
		assert!(text.contains("Key-Derivation: Argon2id\n"));
		assert!(text.contains("Private-MAC: "));

		let reloaded = PpkFile::load(&text).unwrap();
		assert_eq!(reloaded.algorithm, file.algorithm);
		assert_eq!(reloaded.comment, file.comment);
		assert_eq!(reloaded.public_blob, file.public_blob);
		assert_eq!(reloaded.private_blob, file.private_blob);
		assert_eq!(reloaded.mac, file.mac);

		let recovered = reloaded.decrypt_private_blob(b"hunter2").unwrap();
		assert_eq!(recovered[..kp.private_blob().len()], kp.private_blob()[..]);
	}

	#[test]
	fn load_tolerates_crlf_line_endings() {
		let kp = KeyPair::Ed25519(Ed25519KeyPair::generate_from_seed(&[6u8; 32]));
		let params = SaveParameters::Fixed { memory_kib:8192, passes:4, parallelism:1 };
		let file = save_v3(&kp, "crlf test", b"", Argon2Flavour::Argon2id, params, vec![3u8; 16]).unwrap();

		let crlf_text = file.to_text().replace('\n', "\r\n");
		let reloaded = PpkFile::load(&crlf_text).unwrap();
		assert_eq!(reloaded.public_blob, file.public_blob);
	}

	#[test]
	fn public_blob_wraps_at_64_characters_per_line() {
		let kp = KeyPair::Ed25519(Ed25519KeyPair::generate_from_seed(&[4u8; 32]));
		let salt = vec![0u8; 16];
		let params = SaveParameters::Fixed { memory_kib:8192, passes:4, parallelism:1 };
		let file = save_v3(&kp, "", b"", Argon2Flavour::Argon2id, params, salt).unwrap();
		let text = file.to_text();
		for line in text.lines().skip(4) {
			if line.starts_with("Key-Derivation")
				|| line.starts_with("Argon2")
				|| line.starts_with("Private-Lines")
				|| line.starts_with("Private-MAC")
			{
				break;
			}
			assert!(line.len() <= BASE64_LINE_WIDTH);
		}
	}
}
