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

//! `curve25519-sha256`/`curve448-sha512`/`ecdh-sha2-nistp*`, thin
//! session-side bindings over `pssh_keys::ecdh`.
use pssh_keys::ecdh::{NistEcdhExchange, X25519Exchange, X448Exchange};
use pssh_keys::key::Curve;
use pssh_mpint::EntropySource;

use crate::error::{Error, Result};
use crate::kex::{ECDH_NISTP256, ECDH_NISTP384, ECDH_NISTP521};

pub enum EcdhKex {
	Curve25519(X25519Exchange),
	Curve448(X448Exchange),
	Nist(NistEcdhExchange),
}

impl EcdhKex {
	pub fn generate(kex_name:&str, rng:&mut dyn EntropySource) -> Self {
		match kex_name {
			ECDH_NISTP256 => EcdhKex::Nist(NistEcdhExchange::generate(Curve::NistP256, rng)),
			ECDH_NISTP384 => EcdhKex::Nist(NistEcdhExchange::generate(Curve::NistP384, rng)),
			ECDH_NISTP521 => EcdhKex::Nist(NistEcdhExchange::generate(Curve::NistP521, rng)),
			"curve448-sha512" => EcdhKex::Curve448(X448Exchange::generate(rng)),
			_ => EcdhKex::Curve25519(X25519Exchange::generate(rng)),
		}
	}

	pub fn our_public_value(&self) -> Vec<u8> {
		match self {
			EcdhKex::Curve25519(x) => x.public_bytes().to_vec(),
			EcdhKex::Curve448(x) => x.public_bytes().to_vec(),
			EcdhKex::Nist(x) => x.public_blob(),
		}
	}

	pub fn agree(&self, peer_public:&[u8]) -> Result<Vec<u8>> {
		match self {
			EcdhKex::Curve25519(x) => {
				let peer:[u8; 32] = peer_public.try_into().map_err(|_| Error::DhValueOutOfRange)?;
				Ok(x.agree(&peer).to_vec())
			}
			EcdhKex::Curve448(x) => {
				let peer:[u8; 56] = peer_public.try_into().map_err(|_| Error::DhValueOutOfRange)?;
				Ok(x.agree(&peer)?.to_vec())
			}
			EcdhKex::Nist(x) => Ok(x.agree(peer_public)?),
		}
	}
}
