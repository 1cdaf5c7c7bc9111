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

//! `ssh-userauth` (spec.md §4.5): method ordering `none` → `publickey`
//! → `keyboard-interactive` → `password`, filtered by what the server
//! actually offers and by local configuration, with publickey probing
//! the public half before ever producing a signature.
use pssh_keys::key::{KeyPair, SignFlags};

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Method {
	None,
	PublicKey,
	KeyboardInteractive,
	Password,
}

impl Method {
	pub fn wire_name(self) -> &'static str {
		match self {
			Method::None => "none",
			Method::PublicKey => "publickey",
			Method::KeyboardInteractive => "keyboard-interactive",
			Method::Password => "password",
		}
	}
}

const ORDER:[Method; 4] = [Method::None, Method::PublicKey, Method::KeyboardInteractive, Method::Password];

/// Local identities available to try for publickey auth, in the order
/// configured (spec.md §4.2 "identity files" / agent identities).
pub struct PublicKeyCandidate {
	pub key:KeyPair,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
	ProbingPublicKey(usize),
	SigningPublicKey(usize),
	KeyboardInteractive,
	Password,
	Exhausted,
}

pub enum Action {
	/// `SSH_MSG_USERAUTH_REQUEST` with method `none`, to discover which
	/// methods the server actually supports before trying anything.
	SendNone,
	/// Probe: publickey request with no signature, just the public
	/// blob, to avoid signing until the server confirms it's useful.
	SendPublicKeyProbe { key_index:usize },
	SendPublicKeySignature { key_index:usize, signed:Vec<u8>, algorithm:String },
	/// Caller must prompt for a password and call `submit_password`.
	RequestPassword,
	SendPassword { password:String },
	/// Caller must run one keyboard-interactive prompt round and call
	/// `submit_keyboard_interactive`.
	RequestKeyboardInteractive,
	SendKeyboardInteractiveResponse { responses:Vec<String> },
	Disconnect,
}

/// Drives one userauth attempt against a server's advertised method
/// list (spec.md §4.5 "method order", §7 "Auth errors recycle into the
/// next method until none remain, then surface as a final failure").
pub struct UserAuth {
	session_id:Vec<u8>,
	username:String,
	enabled:Vec<Method>,
	server_supports:Option<Vec<Method>>,
	candidates:Vec<PublicKeyCandidate>,
	phase:Phase,
}

impl UserAuth {
	pub fn new(session_id:Vec<u8>, username:String, enabled:Vec<Method>, candidates:Vec<PublicKeyCandidate>) -> Self {
		UserAuth { session_id, username, enabled, server_supports:None, candidates, phase:Phase::ProbingPublicKey(0) }
	}

	/// Server's `SSH_MSG_USERAUTH_FAILURE` partial-success method list,
	/// received after `none` or any rejected attempt.
	pub fn note_server_methods(&mut self, methods:&[&str]) {
		let supported:Vec<Method> = ORDER.iter().copied().filter(|m| methods.contains(&m.wire_name())).collect();
		self.server_supports = Some(supported);
		self.phase = Phase::ProbingPublicKey(0);
	}

	fn allowed(&self, m:Method) -> bool {
		self.enabled.contains(&m) && self.server_supports.as_ref().map(|s| s.contains(&m)).unwrap_or(m == Method::None)
	}

	/// Advance to the next thing worth trying; an `AuthExhausted` error
	/// once every method and every candidate has been tried.
	pub fn next_action(&mut self) -> Result<Action, Error> {
		loop {
			match self.phase {
				Phase::ProbingPublicKey(i) => {
					if !self.allowed(Method::PublicKey) || i >= self.candidates.len() {
						self.phase = Phase::KeyboardInteractive;
						continue;
					}
					self.phase = Phase::ProbingPublicKey(i);
					return Ok(Action::SendPublicKeyProbe { key_index:i });
				}
				Phase::SigningPublicKey(i) => {
					let candidate = self.candidates.get(i).ok_or(Error::AuthExhausted)?;
					let algorithm = candidate.key.public_key().algorithm_name().to_string();
					let mut message = Vec::new();
					message.extend_from_slice(&self.session_id);
					message.extend_from_slice(self.username.as_bytes());
					let signature = candidate.key.sign(&message, SignFlags::default()).map_err(Error::Keys)?;
					self.phase = Phase::ProbingPublicKey(i + 1);
					return Ok(Action::SendPublicKeySignature { key_index:i, signed:signature.blob, algorithm });
				}
				Phase::KeyboardInteractive => {
					if !self.allowed(Method::KeyboardInteractive) {
						self.phase = Phase::Password;
						continue;
					}
					return Ok(Action::RequestKeyboardInteractive);
				}
				Phase::Password => {
					if !self.allowed(Method::Password) {
						self.phase = Phase::Exhausted;
						continue;
					}
					return Ok(Action::RequestPassword);
				}
				Phase::Exhausted => return Err(Error::AuthExhausted),
			}
		}
	}

	/// Server accepted the public-key probe for `key_index`; move on to
	/// actually signing with it.
	pub fn probe_accepted(&mut self, key_index:usize) { self.phase = Phase::SigningPublicKey(key_index); }

	/// Caller answered a `RequestKeyboardInteractive`; hands back the
	/// framed action and moves on to `password` for the next attempt.
	pub fn submit_keyboard_interactive(&mut self, responses:Vec<String>) -> Action {
		self.phase = Phase::Password;
		Action::SendKeyboardInteractiveResponse { responses }
	}

	/// Caller answered a `RequestPassword`.
	pub fn submit_password(&mut self, password:String) -> Action {
		self.phase = Phase::Exhausted;
		Action::SendPassword { password }
	}

	/// `SSH_MSG_USERAUTH_SUCCESS`.
	pub fn succeeded(&mut self) { self.phase = Phase::Exhausted; }
}

#[cfg(test)]
mod tests {
	use super::*;

	fn auth_with(enabled:Vec<Method>) -> UserAuth {
		let mut auth = UserAuth::new(vec![1, 2, 3], "alice".into(), enabled, Vec::new());
		auth.note_server_methods(&["publickey", "password"]);
		auth
	}

	#[test]
	fn skips_straight_to_password_when_only_it_is_enabled() {
		// publickey is disabled locally and keyboard-interactive is not
		// offered by the server, so password is the only live method.
		let mut auth = auth_with(vec![Method::Password]);
		let action = auth.next_action().unwrap();
		assert!(matches!(action, Action::RequestPassword));
	}

	#[test]
	fn exhausted_after_every_method_is_unavailable() {
		let mut auth = auth_with(vec![]);
		let err = auth.next_action();
		assert!(err.is_err());
	}

	#[test]
	fn accepted_probe_is_followed_by_a_real_signature() {
		let key = pssh_keys::key::KeyPair::Ed25519(pssh_keys::eddsa::Ed25519KeyPair::generate_from_seed(&[9u8; 32]));
		let mut auth = UserAuth::new(vec![9], "bob".into(), vec![Method::PublicKey], vec![PublicKeyCandidate { key }]);
		auth.note_server_methods(&["publickey"]);
		let probe = auth.next_action().unwrap();
		assert!(matches!(probe, Action::SendPublicKeyProbe { key_index:0 }));
		auth.probe_accepted(0);
		let signed = auth.next_action().unwrap();
		assert!(matches!(signed, Action::SendPublicKeySignature { key_index:0, .. }));
	}
}
