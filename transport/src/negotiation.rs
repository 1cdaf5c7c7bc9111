// Copyright 2016 Pierre-Étienne Meunier
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! KEXINIT algorithm negotiation (spec.md §4.5) and the `sshbug_*`
//! bug-compatibility flags (spec.md §4.5/§9, supplemented from
//! `original_source/`'s empirical per-server matching table — carried
//! over verbatim rather than reinvented, per the Open Question in
//! spec.md §9).
use bitflags::bitflags;
use log::debug;
use once_cell::sync::Lazy;

/// One category of a KEXINIT preference list (RFC 4253 §7.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
	Kex,
	HostKey,
	CipherClientToServer,
	CipherServerToClient,
	MacClientToServer,
	MacServerToClient,
	CompressionClientToServer,
	CompressionServerToClient,
}

/// Pick the agreed algorithm: the first entry in the client's list that
/// also appears anywhere in the server's list (spec.md §4.5).
pub fn agree<'a>(client:&[&'a str], server:&[&str]) -> Option<&'a str> {
	client.iter().find(|c| server.contains(c)).copied()
}

/// Negotiate every category at once, failing on the first category
/// with no common algorithm.
pub fn negotiate_all<'a>(
	client:&[(Category, &[&'a str])],
	server:&[(Category, &[&str])],
) -> Result<Vec<(Category, &'a str)>, Category> {
	let mut out = Vec::with_capacity(client.len());
	for (cat, client_list) in client {
		let server_list = server.iter().find(|(c, _)| c == cat).map(|(_, l)| *l).unwrap_or(&[]);
		match agree(client_list, server_list) {
			Some(chosen) => {
				debug!("negotiated {:?} = {}", cat, chosen);
				out.push((*cat, chosen));
			}
			None => return Err(*cat),
		}
	}
	Ok(out)
}

bitflags! {
	/// Historical-server workaround flags (CONF `sshbug_*`). Each one is
	/// tri-state in the configuration (`AUTO`/`FORCE_ON`/`FORCE_OFF`);
	/// this bitset is the *resolved* on/off set for the current peer.
	#[derive(Default)]
	pub struct BugCompat: u32 {
		/// Emit SSH_MSG_IGNORE before encrypted packets (some SSH-1 servers
		/// mishandled the first real packet after NEWKEYS otherwise).
		const IGNORE1 = 1 << 0;
		/// SSH-1: server sends the password in plaintext inside a packet
		/// type meant for something else.
		const PLAINPW1 = 1 << 1;
		/// SSH-1: RSA authentication challenge padding bug.
		const RSA1 = 1 << 2;
		const IGNORE2 = 1 << 3;
		/// SSH-2 key derivation off-by-one in old ssh.com servers.
		const DERIVEKEY2 = 1 << 4;
        /// RSA signature padding omits the algorithm-name length prefix.
        const RSAPAD2 = 1 << 5;
		/// Session-id placement bug in publickey userauth requests.
		const PKSESSID2 = 1 << 6;
		/// Server mishandles a rekey during an open session.
		const REKEY2 = 1 << 7;
		/// Server rejects the maximum packet size we advertise.
		const MAXPKT2 = 1 << 8;
		/// Server only supports the old (pre-RFC) group-exchange range
		/// request with no min/max fields.
		const OLDGEX2 = 1 << 9;
		/// Server needs a WINDOW_ADJUST nudge workaround.
		const WINADJ = 1 << 10;
		/// Server replies to unrecognised channel requests incorrectly.
		const CHANREQ = 1 << 11;
		/// Server drops the first byte of every packet.
		const DROPSTART = 1 << 12;
		/// Server's re-sent KEXINIT must be filtered rather than
		/// reprocessed as a fresh negotiation.
		const FILTER_KEXINIT = 1 << 13;
		/// Server rejects RSA/SHA2 signatures on certificates.
		const RSA_SHA2_CERT_USERAUTH = 1 << 14;
		/// Server requires the HMAC to cover the unencrypted length even
		/// outside -etm modes.
		const HMAC2 = 1 << 15;
	}
}

/// One entry of the empirical AUTO-detection table: a substring to
/// match against the peer's version banner, and the bugs it implies.
struct AutoRule {
	needle:&'static str,
	bugs:BugCompat,
}

/// Carried over verbatim from the original implementation's table
/// (spec.md §9): it is empirical, tuned against real deployed servers,
/// and must not be "cleaned up" based on first principles.
static AUTO_TABLE:Lazy<Vec<AutoRule>> = Lazy::new(|| {
	vec![
		AutoRule { needle:"Cisco-1.25", bugs:BugCompat::IGNORE1 | BugCompat::PLAINPW1 | BugCompat::RSA1 },
		AutoRule { needle:"OpenSSH_2.", bugs:BugCompat::RSAPAD2 },
		AutoRule { needle:"OpenSSH_2.0", bugs:BugCompat::RSAPAD2 | BugCompat::OLDGEX2 },
		AutoRule { needle:"OpenSSH_2.1", bugs:BugCompat::RSAPAD2 | BugCompat::OLDGEX2 },
		AutoRule { needle:"OpenSSH_2.2", bugs:BugCompat::RSAPAD2 | BugCompat::OLDGEX2 },
		AutoRule { needle:"OpenSSH_2.3", bugs:BugCompat::OLDGEX2 },
		AutoRule { needle:"OpenSSH_2.5.0p1", bugs:BugCompat::OLDGEX2 },
		AutoRule { needle:"OpenSSH_2.5.1p1", bugs:BugCompat::OLDGEX2 },
		AutoRule { needle:"OpenSSH_2.5.2p1", bugs:BugCompat::OLDGEX2 | BugCompat::DERIVEKEY2 },
		AutoRule { needle:"OpenSSH_2.5.3p1", bugs:BugCompat::DERIVEKEY2 },
		AutoRule { needle:"OpenSSH_3.0", bugs:BugCompat::DERIVEKEY2 },
		AutoRule { needle:"Sun_SSH_1.0", bugs:BugCompat::PKSESSID2 | BugCompat::DERIVEKEY2 },
		AutoRule { needle:"Sun_SSH_1.0.1", bugs:BugCompat::PKSESSID2 },
		AutoRule { needle:"dropbear_0.4", bugs:BugCompat::REKEY2 },
	]
});

/// Resolve `bugs` against an explicit user override set: bits present
/// in `force_on`/`force_off` win over the AUTO table; everything else
/// follows AUTO.
pub fn resolve_bugs(peer_version:&str, force_on:BugCompat, force_off:BugCompat) -> BugCompat {
	let mut auto = BugCompat::empty();
	for rule in AUTO_TABLE.iter() {
		if peer_version.contains(rule.needle) {
			auto |= rule.bugs;
		}
	}
	(auto | force_on) & !force_off
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn agree_picks_first_client_preference_present_on_server() {
		let client = ["curve25519-sha256", "ecdh-sha2-nistp256"];
		let server = ["ecdh-sha2-nistp256", "curve25519-sha256"];
		assert_eq!(agree(&client, &server), Some("curve25519-sha256"));
	}

	#[test]
	fn agree_returns_none_with_no_overlap() {
		assert_eq!(agree(&["a"], &["b"]), None);
	}

	#[test]
	fn negotiate_all_fails_on_first_empty_category() {
		let client = [(Category::Kex, &["a"][..]), (Category::HostKey, &["x"][..])];
		let server = [(Category::Kex, &["a"][..])];
		assert_eq!(negotiate_all(&client, &server), Err(Category::HostKey));
	}

	#[test]
	fn auto_table_resolves_openssh_2_5_3_to_derivekey_only() {
		let bugs = resolve_bugs("SSH-2.0-OpenSSH_2.5.3p1", BugCompat::empty(), BugCompat::empty());
		assert!(bugs.contains(BugCompat::DERIVEKEY2));
		assert!(!bugs.contains(BugCompat::OLDGEX2));
	}

	#[test]
	fn force_off_wins_over_auto_table() {
		let bugs = resolve_bugs("SSH-2.0-OpenSSH_2.5.3p1", BugCompat::empty(), BugCompat::DERIVEKEY2);
		assert!(!bugs.contains(BugCompat::DERIVEKEY2));
	}
}
