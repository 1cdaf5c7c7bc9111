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

//! Connection sharing (spec.md §4.5 "Connection sharing", a feature
//! supplemented from `original_source/` rather than named by the
//! distilled spec): one process per `(host, port, username, ...)`
//! becomes the upstream, owning the real SSH connection, by winning
//! the race to create a local IPC listening endpoint; every later
//! process for the same destination connects to that endpoint instead
//! and becomes a downstream, with its channel ids remapped by the
//! upstream so several downstreams can multiplex over one transport.
use std::collections::HashMap;

use crate::channel::ChannelId;

/// Identifies one shareable destination; two processes with an equal
/// key contend for the same upstream slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SharingKey {
	pub host:String,
	pub port:u16,
	pub username:String,
}

impl SharingKey {
	/// Deterministic path/name for the IPC endpoint, so every process
	/// for the same destination tries to create (or connect to) the
	/// same one.
	pub fn endpoint_name(&self) -> String { format!("pssh-{}-{}-{}", self.username, self.host, self.port) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
	/// Owns the real SSH transport; multiplexes downstreams' channels
	/// over it.
	Upstream,
	/// Speaks a pared-down framing to the upstream instead of opening
	/// its own SSH connection.
	Downstream,
}

/// The outcome of contending for a destination's IPC endpoint: whoever
/// wins the `bind`/`listen` race is upstream, everyone else downstream
/// (spec.md §4.5).
#[derive(Debug)]
pub enum Election {
	WonUpstream,
	LostDownstream,
}

/// Remaps a downstream's locally-chosen channel id to the id space the
/// upstream actually uses on the wire, and back, so several
/// downstreams sharing one upstream never collide.
#[derive(Debug, Default)]
pub struct ChannelIdRemap {
	downstream_to_upstream:HashMap<(usize, ChannelId), ChannelId>,
	upstream_to_downstream:HashMap<ChannelId, (usize, ChannelId)>,
	next_upstream_id:ChannelId,
}

impl ChannelIdRemap {
	pub fn new() -> Self { ChannelIdRemap::default() }

	/// A downstream (`downstream_index`) opened a channel with its own
	/// local id; allocate a fresh id in the upstream's space and record
	/// the mapping both ways.
	pub fn assign(&mut self, downstream_index:usize, downstream_local_id:ChannelId) -> ChannelId {
		let upstream_id = self.next_upstream_id;
		self.next_upstream_id += 1;
		self.downstream_to_upstream.insert((downstream_index, downstream_local_id), upstream_id);
		self.upstream_to_downstream.insert(upstream_id, (downstream_index, downstream_local_id));
		upstream_id
	}

	pub fn upstream_id_for(&self, downstream_index:usize, downstream_local_id:ChannelId) -> Option<ChannelId> {
		self.downstream_to_upstream.get(&(downstream_index, downstream_local_id)).copied()
	}

	/// Which downstream (and which of its own local ids) a
	/// `CHANNEL_DATA`/etc. addressed to `upstream_id` belongs to.
	pub fn route(&self, upstream_id:ChannelId) -> Option<(usize, ChannelId)> { self.upstream_to_downstream.get(&upstream_id).copied() }

	pub fn release(&mut self, upstream_id:ChannelId) {
		if let Some(key) = self.upstream_to_downstream.remove(&upstream_id) {
			self.downstream_to_upstream.remove(&key);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn endpoint_name_is_stable_for_equal_keys() {
		let a = SharingKey { host:"example.com".into(), port:22, username:"alice".into() };
		let b = SharingKey { host:"example.com".into(), port:22, username:"alice".into() };
		assert_eq!(a.endpoint_name(), b.endpoint_name());
	}

	#[test]
	fn remapped_ids_route_back_to_the_right_downstream() {
		let mut remap = ChannelIdRemap::new();
		let up_a = remap.assign(0, 3);
		let up_b = remap.assign(1, 3);
		assert_ne!(up_a, up_b);
		assert_eq!(remap.route(up_a), Some((0, 3)));
		assert_eq!(remap.route(up_b), Some((1, 3)));
	}

	#[test]
	fn release_forgets_both_directions() {
		let mut remap = ChannelIdRemap::new();
		let up = remap.assign(0, 5);
		remap.release(up);
		assert_eq!(remap.route(up), None);
		assert_eq!(remap.upstream_id_for(0, 5), None);
	}
}
