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

//! The connection-layer contract (spec.md §4.5 "Connection layer",
//! RFC 4254): channel types, per-channel flow control windows, and the
//! EOF/CLOSE half-close ordering.
use std::collections::HashMap;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelType {
	Session,
	DirectTcpip,
	ForwardedTcpip,
	X11,
	AuthAgent,
}

impl ChannelType {
	pub fn wire_name(self) -> &'static str {
		match self {
			ChannelType::Session => "session",
			ChannelType::DirectTcpip => "direct-tcpip",
			ChannelType::ForwardedTcpip => "forwarded-tcpip",
			ChannelType::X11 => "x11",
			ChannelType::AuthAgent => "auth-agent@openssh.com",
		}
	}
}

pub type ChannelId = u32;

/// One end of a channel's half-close state (spec.md §4.5: "EOF(side A)
/// then CLOSE(side A); destroyed once CLOSE has been both sent and
/// received").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct HalfClose {
	eof_sent:bool,
	eof_received:bool,
	close_sent:bool,
	close_received:bool,
}

impl HalfClose {
	fn destroyed(&self) -> bool { self.close_sent && self.close_received }
}

#[derive(Debug)]
pub struct Channel {
	pub kind:ChannelType,
	pub local_id:ChannelId,
	pub remote_id:ChannelId,
	pub max_packet:u32,
	/// Bytes we're willing to receive before the peer must wait for a
	/// `CHANNEL_WINDOW_ADJUST`.
	recv_window:u32,
	recv_window_initial:u32,
	/// Bytes we're allowed to send before a `CHANNEL_WINDOW_ADJUST` from
	/// the peer grows it again.
	send_window:u32,
	half_close:HalfClose,
}

/// Side effects the connection layer asks its caller to perform; the
/// channel table itself never touches a socket.
#[derive(Debug)]
pub enum Action {
	SendWindowAdjust { channel_id:ChannelId, increment:u32 },
	SendEof { channel_id:ChannelId },
	SendClose { channel_id:ChannelId },
	DeliverData { channel_id:ChannelId, data:Vec<u8> },
}

pub struct Connection {
	channels:HashMap<ChannelId, Channel>,
	next_local_id:ChannelId,
}

impl Default for Connection {
	fn default() -> Self { Self::new() }
}

impl Connection {
	pub fn new() -> Self { Connection { channels:HashMap::new(), next_local_id:0 } }

	/// Allocates a local id for a channel we're opening (a
	/// `CHANNEL_OPEN` we send); the entry is only inserted once the
	/// peer's `CHANNEL_OPEN_CONFIRMATION` supplies `remote_id`.
	pub fn reserve_local_id(&mut self) -> ChannelId {
		let id = self.next_local_id;
		self.next_local_id += 1;
		id
	}

	pub fn confirm_open(&mut self, kind:ChannelType, local_id:ChannelId, remote_id:ChannelId, window:u32, max_packet:u32) {
		self.channels.insert(local_id, Channel {
			kind,
			local_id,
			remote_id,
			max_packet,
			recv_window:window,
			recv_window_initial:window,
			send_window:window,
			half_close:HalfClose::default(),
		});
	}

	pub fn get(&self, id:ChannelId) -> Option<&Channel> { self.channels.get(&id) }

	/// `CHANNEL_DATA` arrived: debit our receive window and, per
	/// spec.md §4.5, ask for a `CHANNEL_WINDOW_ADJUST` once it has
	/// dropped below half its initial size.
	pub fn receive_data(&mut self, id:ChannelId, data:Vec<u8>) -> Result<Vec<Action>, Error> {
		let channel = self.channels.get_mut(&id).ok_or(Error::ProtocolViolation(format!("unknown channel {id}")))?;
		if data.len() as u32 > channel.recv_window {
			return Err(Error::ProtocolViolation(format!("channel {id} exceeded its advertised window")));
		}
		channel.recv_window -= data.len() as u32;
		let mut actions = vec![Action::DeliverData { channel_id:id, data }];
		if channel.recv_window < channel.recv_window_initial / 2 {
			let increment = channel.recv_window_initial - channel.recv_window;
			channel.recv_window += increment;
			actions.push(Action::SendWindowAdjust { channel_id:channel.remote_id, increment });
		}
		Ok(actions)
	}

	/// Splits outgoing data into `max_packet`-sized chunks, debiting the
	/// send window one chunk at a time; stops (returning what's left)
	/// if the window runs out before the data does.
	pub fn split_for_send<'a>(&mut self, id:ChannelId, mut data:&'a [u8]) -> Result<(Vec<&'a [u8]>, &'a [u8]), Error> {
		let channel = self.channels.get_mut(&id).ok_or(Error::ProtocolViolation(format!("unknown channel {id}")))?;
		let mut chunks = Vec::new();
		while !data.is_empty() && channel.send_window > 0 {
			let take = (channel.max_packet as usize).min(data.len()).min(channel.send_window as usize);
			let (chunk, rest) = data.split_at(take);
			chunks.push(chunk);
			channel.send_window -= take as u32;
			data = rest;
		}
		Ok((chunks, data))
	}

	pub fn grow_send_window(&mut self, id:ChannelId, increment:u32) -> Result<(), Error> {
		let channel = self.channels.get_mut(&id).ok_or(Error::ProtocolViolation(format!("unknown channel {id}")))?;
		channel.send_window = channel.send_window.saturating_add(increment);
		Ok(())
	}

	pub fn send_eof(&mut self, id:ChannelId) -> Result<(), Error> {
		let channel = self.channels.get_mut(&id).ok_or(Error::ProtocolViolation(format!("unknown channel {id}")))?;
		channel.half_close.eof_sent = true;
		Ok(())
	}

	pub fn receive_eof(&mut self, id:ChannelId) -> Result<(), Error> {
		let channel = self.channels.get_mut(&id).ok_or(Error::ProtocolViolation(format!("unknown channel {id}")))?;
		channel.half_close.eof_received = true;
		Ok(())
	}

	/// Marks our `CHANNEL_CLOSE` as sent and destroys the channel if the
	/// peer's close had already arrived.
	pub fn send_close(&mut self, id:ChannelId) -> Result<bool, Error> {
		let channel = self.channels.get_mut(&id).ok_or(Error::ProtocolViolation(format!("unknown channel {id}")))?;
		channel.half_close.close_sent = true;
		let destroyed = channel.half_close.destroyed();
		if destroyed {
			self.channels.remove(&id);
		}
		Ok(destroyed)
	}

	/// `CHANNEL_CLOSE` arrived from the peer. Never delivered after a
	/// `CHANNEL_DATA` on the same channel, by construction: the caller
	/// drives both through this same sequential API.
	pub fn receive_close(&mut self, id:ChannelId) -> Result<bool, Error> {
		let channel = self.channels.get_mut(&id).ok_or(Error::ProtocolViolation(format!("unknown channel {id}")))?;
		channel.half_close.close_received = true;
		let destroyed = channel.half_close.destroyed();
		if destroyed {
			self.channels.remove(&id);
		}
		Ok(destroyed)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn connected() -> (Connection, ChannelId) {
		let mut conn = Connection::new();
		let local = conn.reserve_local_id();
		conn.confirm_open(ChannelType::Session, local, 7, 100, 64);
		(conn, local)
	}

	#[test]
	fn window_adjust_is_requested_once_past_half() {
		let (mut conn, id) = connected();
		let actions = conn.receive_data(id, vec![0u8; 60]).unwrap();
		assert!(actions.iter().any(|a| matches!(a, Action::SendWindowAdjust { .. })));
	}

	#[test]
	fn no_window_adjust_before_half_consumed() {
		let (mut conn, id) = connected();
		let actions = conn.receive_data(id, vec![0u8; 10]).unwrap();
		assert!(!actions.iter().any(|a| matches!(a, Action::SendWindowAdjust { .. })));
	}

	#[test]
	fn oversized_data_is_a_protocol_violation() {
		let (mut conn, id) = connected();
		assert!(conn.receive_data(id, vec![0u8; 101]).is_err());
	}

	#[test]
	fn send_splits_into_max_packet_chunks_and_stops_at_the_window() {
		let (mut conn, id) = connected();
		let data = vec![1u8; 150];
		let (chunks, remaining) = conn.split_for_send(id, &data).unwrap();
		assert_eq!(chunks.len(), 2); // 64 + 36 = 100, the whole window
		assert_eq!(chunks.iter().map(|c| c.len()).sum::<usize>(), 100);
		assert_eq!(remaining.len(), 50);
	}

	#[test]
	fn close_destroys_only_once_both_sides_have_sent_it() {
		let (mut conn, id) = connected();
		assert!(!conn.send_close(id).unwrap());
		assert!(conn.get(id).is_some());
		assert!(conn.receive_close(id).unwrap());
		assert!(conn.get(id).is_none());
	}
}
