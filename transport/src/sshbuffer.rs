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

//! The per-direction packet buffer: a `CryptoVec` plus the monotonic
//! sequence number and in-progress-read bookkeeping `cipher::read`
//! drives directly.
use std::num::Wrapping;

use pssh_cryptovec::CryptoVec;

/// State for one direction (incoming or outgoing) of the binary packet
/// protocol (spec.md §3 "SSH packet").
#[derive(Debug)]
pub struct SSHBuffer {
	pub buffer:CryptoVec,
	/// Sequence number, wraps at 2^32 per RFC 4253 §6.4.
	pub seqn:Wrapping<u32>,
	/// Declared cleartext length of the packet currently being read, or
	/// 0 if no partial read is in progress.
	pub len:usize,
	/// Total payload bytes processed this direction since the last
	/// rekey, used against `ssh_rekey_data`.
	pub bytes:usize,
}

impl Default for SSHBuffer {
	fn default() -> Self { Self::new() }
}

impl SSHBuffer {
	pub fn new() -> Self { SSHBuffer { buffer:CryptoVec::new(), seqn:Wrapping(0), len:0, bytes:0 } }

	/// Reset the byte counter, as done immediately after NEWKEYS.
	pub fn reset_rekey_counter(&mut self) { self.bytes = 0; }
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn seqn_wraps_at_u32_max() {
		let mut b = SSHBuffer::new();
		b.seqn = Wrapping(u32::MAX);
		b.seqn += Wrapping(1);
		assert_eq!(b.seqn.0, 0);
	}
}
