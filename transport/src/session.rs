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

//! The key-exchange/session state machine (spec.md §4.5). Re-expressed,
//! per spec.md §9's design note on the source's coroutine-style
//! `crState` macros, as an explicit enum-valued state plus a
//! `Session::step` function: each step is pure except for the `Action`
//! values it returns, which the caller (owning the actual socket) is
//! responsible for executing.
use std::time::Instant;

use log::info;

use crate::negotiation::{self, BugCompat, Category};
use crate::{Error, Result};

const MAX_VERSION_BANNER_LINES:usize = 1024;
const MAX_PACKET_LENGTH:usize = 256 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
	Preamble,
	VersionExchanged,
	KexInit,
	KexAlgorithm,
	NewKeys,
	Authenticating,
	Connected,
	Rekeying,
	Terminated,
}

/// What the caller must do in response to a `Session::step` call. The
/// state machine itself never touches a socket.
#[derive(Debug)]
pub enum Action {
	Send(Vec<u8>),
	InstallOutgoingKeys,
	InstallIncomingKeys,
	BeginKex { our_proposal:Vec<String> },
	Disconnect { reason:crate::error::DisconnectReason, description:String },
	HandOffToUserauth,
	HandOffToConnection,
}

pub struct NegotiatedAlgorithms {
	pub chosen:Vec<(Category, String)>,
	pub bugs:BugCompat,
}

/// Tracks why a rekey should start: byte count past `rekey_data_limit`,
/// wall time past `rekey_time_limit`, or an explicit/peer-initiated
/// request (spec.md §4.5 "Rekey triggers").
pub struct RekeyTracker {
	bytes_since_kex:u64,
	last_kex_at:Instant,
	pub rekey_data_limit:u64,
	pub rekey_time_limit:std::time::Duration,
}

impl RekeyTracker {
	pub fn new(rekey_data_limit:u64, rekey_time_limit:std::time::Duration) -> Self {
		RekeyTracker { bytes_since_kex:0, last_kex_at:Instant::now(), rekey_data_limit, rekey_time_limit }
	}

	pub fn note_bytes(&mut self, n:u64) { self.bytes_since_kex += n; }

	pub fn reset(&mut self) {
		self.bytes_since_kex = 0;
		self.last_kex_at = Instant::now();
	}

	pub fn due(&self) -> bool {
		self.bytes_since_kex >= self.rekey_data_limit || self.last_kex_at.elapsed() >= self.rekey_time_limit
	}
}

pub struct Session {
	pub state:SessionState,
	pub our_version:String,
	pub peer_version:Option<String>,
	banner_lines_seen:usize,
	pub negotiated:Option<NegotiatedAlgorithms>,
	pub rekey:RekeyTracker,
	/// Set while processing our own KEXINIT, cleared once the peer's
	/// has also been seen; used to decide whether an optimistic
	/// first-kex-packet guess should be honoured or discarded.
	guessed_kex_follows:bool,
}

impl Session {
	pub fn new(our_version:String, rekey_data_limit:u64, rekey_time_limit:std::time::Duration) -> Self {
		Session {
			state:SessionState::Preamble,
			our_version,
			peer_version:None,
			banner_lines_seen:0,
			negotiated:None,
			rekey:RekeyTracker::new(rekey_data_limit, rekey_time_limit),
			guessed_kex_follows:false,
		}
	}

	/// Feeds one line read during the version-exchange preamble.
	/// Non-`SSH-` banner lines are discarded, bounded so a malicious
	/// peer cannot hold the handshake open with unbounded banner text.
	pub fn feed_preamble_line(&mut self, line:&str) -> Result<Option<Action>> {
		if self.state != SessionState::Preamble {
			return Err(Error::UnexpectedMessage(0, "Preamble"));
		}
		if line.starts_with("SSH-") {
			self.peer_version = Some(line.trim_end().to_string());
			self.state = SessionState::VersionExchanged;
			return Ok(Some(Action::Send(format!("{}\r\n", self.our_version).into_bytes())));
		}
		self.banner_lines_seen += 1;
		if self.banner_lines_seen > MAX_VERSION_BANNER_LINES {
			return Err(Error::VersionExchangeFailed);
		}
		Ok(None)
	}

	pub fn peer_version(&self) -> Option<&str> { self.peer_version.as_deref() }

	/// Negotiates one KEXINIT exchange against the peer's algorithm
	/// lists, honouring or discarding the optimistic guess packet per
	/// spec.md §4.5.
	pub fn negotiate_kex(
		&mut self,
		our_lists:&[(Category, Vec<&str>)],
		peer_lists:&[(Category, Vec<&str>)],
		peer_guessed_follows:bool,
		force_on:BugCompat,
		force_off:BugCompat,
	) -> Result<()> {
		if !matches!(self.state, SessionState::VersionExchanged | SessionState::Connected | SessionState::Rekeying) {
			return Err(Error::UnexpectedMessage(20, "KexInit"));
		}
		self.state = SessionState::KexInit;

		let mut chosen = Vec::with_capacity(our_lists.len());
		for (ours, theirs) in our_lists.iter().zip(peer_lists.iter()) {
			debug_assert_eq!(ours.0, theirs.0);
			match negotiation::agree(&ours.1, &theirs.1) {
				Some(name) => chosen.push((ours.0, name.to_string())),
				None => return Err(Error::KexNegotiationFailed(category_name(ours.0))),
			}
		}

		let our_guess_matches = chosen.first().map(|(_, name)| {
			our_lists.first().and_then(|(_, l)| l.first()).map(|g| g == name).unwrap_or(false)
		}).unwrap_or(false);

		self.guessed_kex_follows = peer_guessed_follows && our_guess_matches;

		let peer_version = self.peer_version.clone().unwrap_or_default();
		let bugs = negotiation::resolve_bugs(&peer_version, force_on, force_off);

		self.negotiated = Some(NegotiatedAlgorithms { chosen, bugs });
		self.state = SessionState::KexAlgorithm;
		info!("negotiated kex: {:?}", self.negotiated.as_ref().map(|n| &n.chosen));
		Ok(())
	}

	/// Whether the first post-KEXINIT packet should be consumed as a
	/// real KEX message (the guess matched) or silently discarded.
	pub fn should_consume_guessed_packet(&self) -> bool { self.guessed_kex_follows }

	pub fn complete_kex_algorithm(&mut self) -> Result<()> {
		if self.state != SessionState::KexAlgorithm {
			return Err(Error::UnexpectedMessage(30, "KexAlgorithm"));
		}
		self.state = SessionState::NewKeys;
		Ok(())
	}

	/// NEWKEYS is sent, then outgoing keys are installed; on receipt,
	/// incoming keys are installed. Until both directions have done
	/// so, the old keys remain (spec.md §4.5).
	pub fn send_newkeys(&mut self) -> Result<Action> {
		if self.state != SessionState::NewKeys {
			return Err(Error::UnexpectedMessage(21, "NewKeys"));
		}
		Ok(Action::InstallOutgoingKeys)
	}

	pub fn receive_newkeys(&mut self, was_rekey:bool) -> Result<Action> {
		self.rekey.reset();
		self.state = if was_rekey { SessionState::Connected } else { SessionState::Authenticating };
		Ok(Action::InstallIncomingKeys)
	}

	pub fn begin_rekey(&mut self) -> Result<()> {
		if self.state != SessionState::Connected {
			return Err(Error::UnexpectedMessage(20, "Connected"));
		}
		self.state = SessionState::Rekeying;
		Ok(())
	}

	pub fn enter_connected(&mut self) -> Result<()> {
		if self.state != SessionState::Authenticating {
			return Err(Error::UnexpectedMessage(0, "Authenticating"));
		}
		self.state = SessionState::Connected;
		Ok(())
	}

	pub fn terminate(&mut self) { self.state = SessionState::Terminated; }

	pub fn note_traffic(&mut self, bytes:u64) { self.rekey.note_bytes(bytes); }

	pub fn rekey_due(&self) -> bool { self.state == SessionState::Connected && self.rekey.due() }

	pub fn check_packet_length(&self, packet_length:usize, padding_length:u8) -> Result<()> {
		if packet_length > MAX_PACKET_LENGTH {
			return Err(Error::InvalidPacketLength(packet_length));
		}
		if (padding_length as usize) < 4 || padding_length as usize >= packet_length {
			return Err(Error::InvalidPaddingLength(padding_length));
		}
		Ok(())
	}
}

fn category_name(c:Category) -> &'static str {
	match c {
		Category::Kex => "key exchange algorithm",
		Category::HostKey => "host key algorithm",
		Category::CipherClientToServer => "client-to-server cipher",
		Category::CipherServerToClient => "server-to-client cipher",
		Category::MacClientToServer => "client-to-server MAC",
		Category::MacServerToClient => "server-to-client MAC",
		Category::CompressionClientToServer => "client-to-server compression",
		Category::CompressionServerToClient => "server-to-client compression",
	}
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use super::*;

	fn lists() -> (Vec<(Category, Vec<&'static str>)>, Vec<(Category, Vec<&'static str>)>) {
		let categories = [
			Category::Kex,
			Category::HostKey,
			Category::CipherClientToServer,
			Category::CipherServerToClient,
			Category::MacClientToServer,
			Category::MacServerToClient,
			Category::CompressionClientToServer,
			Category::CompressionServerToClient,
		];
		let ours = categories.iter().map(|c| (*c, vec!["curve25519-sha256"])).collect();
		let theirs = categories.iter().map(|c| (*c, vec!["curve25519-sha256"])).collect();
		(ours, theirs)
	}

	#[test]
	fn version_exchange_then_kexinit_then_newkeys_reaches_authenticating() {
		let mut s = Session::new("SSH-2.0-pssh_0.1".into(), 1 << 30, Duration::from_secs(3600));
		let action = s.feed_preamble_line("SSH-2.0-OpenSSH_9.0\r\n").unwrap();
		assert!(matches!(action, Some(Action::Send(_))));
		assert_eq!(s.state, SessionState::VersionExchanged);

		let (ours, theirs) = lists();
		s.negotiate_kex(&ours, &theirs, false, BugCompat::empty(), BugCompat::empty()).unwrap();
		assert_eq!(s.state, SessionState::KexAlgorithm);

		s.complete_kex_algorithm().unwrap();
		assert_eq!(s.state, SessionState::NewKeys);

		s.send_newkeys().unwrap();
		s.receive_newkeys(false).unwrap();
		assert_eq!(s.state, SessionState::Authenticating);

		s.enter_connected().unwrap();
		assert_eq!(s.state, SessionState::Connected);
	}

	#[test]
	fn rekey_is_due_past_the_byte_limit() {
		let mut s = Session::new("SSH-2.0-pssh_0.1".into(), 100, Duration::from_secs(3600));
		s.state = SessionState::Connected;
		assert!(!s.rekey_due());
		s.note_traffic(101);
		assert!(s.rekey_due());
	}

	#[test]
	fn oversized_packet_length_is_rejected() {
		let s = Session::new("SSH-2.0-pssh_0.1".into(), 1 << 30, Duration::from_secs(3600));
		assert!(s.check_packet_length(MAX_PACKET_LENGTH + 1, 8).is_err());
		assert!(s.check_packet_length(64, 2).is_err());
		assert!(s.check_packet_length(64, 8).is_ok());
	}
}
