//! Key fingerprints in both historical formats PuTTY-family clients show:
//! the legacy MD5 colon-hex form and the modern base64-SHA256 form used by
//! OpenSSH since 6.8 (spec.md's supplemented "dual format" fingerprint
//! feature, §9).
use data_encoding::BASE64_NOPAD;
use md5::{Digest as Md5Digest, Md5};
use sha2::{Digest, Sha256};

pub fn md5_colon_hex(blob:&[u8]) -> String {
	let digest = Md5::digest(blob);
	digest.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(":")
}

pub fn sha256_base64(blob:&[u8]) -> String {
	let digest = Sha256::digest(blob);
	BASE64_NOPAD.encode(&digest)
}

/// `algorithm-name SHA256:base64digest`, the line OpenSSH and PuTTY print
/// for `ssh-keygen -l`/`Pageant`'s key list.
pub fn fingerprint_line(algorithm_name:&str, blob:&[u8]) -> String {
	format!("{} SHA256:{}", algorithm_name, sha256_base64(blob))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn md5_and_sha256_differ_but_are_stable() {
		let blob = b"some key blob bytes";
		let md5_1 = md5_colon_hex(blob);
		let md5_2 = md5_colon_hex(blob);
		assert_eq!(md5_1, md5_2);
		assert_ne!(md5_1, sha256_base64(blob));
	}

	#[test]
	fn fingerprint_line_has_expected_shape() {
		let line = fingerprint_line("ssh-ed25519", b"abc");
		assert!(line.starts_with("ssh-ed25519 SHA256:"));
	}
}
