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

//! `diffie-hellman-group14-*` and `diffie-hellman-group-exchange-*`,
//! thin session-side bindings over `pssh_keys::dh`.
use pssh_keys::dh::{DhExchange, DhGroup};
use pssh_mpint::{EntropySource, MPInt};

use crate::error::{Error, Result};

pub struct DhKex {
	exchange:DhExchange,
}

impl DhKex {
	pub fn group14(rng:&mut dyn EntropySource) -> Self { DhKex { exchange:DhExchange::setup(DhGroup::oakley_group14(), rng) } }

	pub fn group_exchange(p:MPInt, g:MPInt, rng:&mut dyn EntropySource) -> Self { DhKex { exchange:DhExchange::setup(DhGroup::gex(p, g), rng) } }

	pub fn our_public_value(&self) -> Vec<u8> { self.exchange.e.to_bytes_be() }

	pub fn agree(&self, peer_f:&[u8]) -> Result<Vec<u8>> {
		let f = MPInt::from_bytes_be(peer_f, peer_f.len() * 8 + 8);
		self.exchange.agree(&f).map(|k| k.to_bytes_be()).map_err(|_| Error::DhValueOutOfRange)
	}
}
