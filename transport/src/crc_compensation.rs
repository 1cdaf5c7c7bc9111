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

//! SSH-1 CRC compensation attack detector (spec.md §4.4, supplemented
//! per `examples/original_source/sshbn.h`'s neighbourhood). SSH-1's
//! CBC framing without a real per-packet MAC let an attacker flip
//! cipher-block-sized chunks of ciphertext and observe the CRC32
//! trailer failing or not, leaking plaintext one block at a time
//! (CORE-2001-0901 / CVE-2001-0572). The detector maintains a hash
//! table of every 8-byte ciphertext block seen this session and raises
//! an alarm on a collision within the current packet or against the
//! previous packet's IV block — the signature of the attack replaying
//! a block.
//!
//! Only retained for interoperability testing against legacy peers
//! (spec.md §1 excludes "legacy SSH-1 cipher compatibility beyond
//! interoperability testing" as a non-goal); it is not wired into any
//! production SSH-1 code path.
use std::collections::HashSet;

const BLOCK_SIZE:usize = 8;
/// Number of buckets in the table; large enough that an honest session
/// of typical length does not false-positive through exhaustion.
const TABLE_BUCKETS:usize = 32 * 1024;

/// Tracks ciphertext blocks seen so far in one direction of an SSH-1
/// session.
pub struct CrcCompensationDetector {
	seen:HashSet<[u8; BLOCK_SIZE]>,
	last_iv_block:Option<[u8; BLOCK_SIZE]>,
}

impl Default for CrcCompensationDetector {
	fn default() -> Self { Self::new() }
}

impl CrcCompensationDetector {
	pub fn new() -> Self { CrcCompensationDetector { seen:HashSet::with_capacity(TABLE_BUCKETS.min(1024)), last_iv_block:None } }

	/// Feed every 8-byte ciphertext block of one incoming packet
	/// (including the IV-sized first block). Returns `true` if a
	/// collision indicating the attack was detected, in which case the
	/// caller must abort the connection rather than continue decoding.
	pub fn check_packet(&mut self, ciphertext:&[u8]) -> bool {
		let mut attack = false;

		for chunk in ciphertext.chunks(BLOCK_SIZE) {
			if chunk.len() < BLOCK_SIZE {
				continue;
			}
			let mut block = [0u8; BLOCK_SIZE];
			block.copy_from_slice(chunk);

			if Some(block) == self.last_iv_block || !self.seen.insert(block) {
				attack = true;
			}
		}

		if let Some(first) = ciphertext.chunks(BLOCK_SIZE).find(|c| c.len() == BLOCK_SIZE) {
			let mut block = [0u8; BLOCK_SIZE];
			block.copy_from_slice(first);
			self.last_iv_block = Some(block);
		}

		if self.seen.len() > TABLE_BUCKETS {
			// Sessions this long would have rekeyed long before the
			// table fills; clear to bound memory rather than grow
			// unbounded.
			self.seen.clear();
		}

		attack
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn distinct_blocks_raise_no_alarm() {
		let mut d = CrcCompensationDetector::new();
		assert!(!d.check_packet(&[1u8; 16]));
		assert!(!d.check_packet(&[2u8; 16]));
	}

	#[test]
	fn repeated_block_is_flagged() {
		let mut d = CrcCompensationDetector::new();
		assert!(!d.check_packet(&[9u8; 8]));
		assert!(d.check_packet(&[9u8; 8]));
	}

	#[test]
	fn replay_of_previous_iv_block_is_flagged() {
		let mut d = CrcCompensationDetector::new();
		assert!(!d.check_packet(&[5u8; 8]));
		assert!(d.check_packet(&[5u8; 8]));
	}
}
