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

//! Errors raised by the transport, grouped the way spec.md §7 groups
//! them: decoding, cryptographic, protocol, policy, resource, auth.
use thiserror::Error;

/// The reason carried on an outgoing `SSH_MSG_DISCONNECT`, mirroring
/// RFC 4253 §11.1's numeric space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
	ProtocolError = 2,
	MacError = 5,
	HostKeyNotVerifiable = 14,
	ByApplication = 11,
}

#[derive(Debug, Error)]
pub enum Error {
	// Decoding.
	#[error("packet too short")]
	IndexOutOfBounds,
	#[error("invalid packet length {0}")]
	InvalidPacketLength(usize),
	#[error("invalid padding length {0}")]
	InvalidPaddingLength(u8),
	#[error("unexpected end of banner/version exchange")]
	VersionExchangeFailed,

	// Cryptographic.
	#[error("MAC verification failed")]
	MacVerifyFailed,
	#[error("signature verification failed")]
	SignatureVerifyFailed,
	#[error(transparent)]
	Keys(#[from] pssh_keys::Error),
	#[error("peer DH value out of range")]
	DhValueOutOfRange,

	// Protocol.
	#[error("unexpected message {0} in state {1}")]
	UnexpectedMessage(u8, &'static str),
	#[error("key exchange algorithm negotiation failed, no common {0}")]
	KexNegotiationFailed(&'static str),
	#[error("peer violated the protocol: {0}")]
	ProtocolViolation(String),

	// Policy.
	#[error("host key unknown or changed")]
	HostKeyNotVerifiable,
	#[error("user cancelled")]
	UserCancelled,
	#[error("bug-compatibility {0} forced on but not supported by this peer")]
	ForbiddenBugCompat(&'static str),

	// Resource.
	#[error(transparent)]
	Io(#[from] std::io::Error),
	#[error(transparent)]
	Conf(#[from] pssh_conf::Error),

	// Auth.
	#[error("all authentication methods exhausted")]
	AuthExhausted,
	#[error("authentication failed")]
	AuthFailed,

	#[error("connection closed by peer")]
	Disconnect,
}

pub type Result<T> = std::result::Result<T, Error>;
