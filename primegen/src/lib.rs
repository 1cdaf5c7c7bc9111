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

//! Candidate construction, small-factor sieving, and probabilistic /
//! provable primality testing, feeding the public-key algorithms in
//! `pssh-keys`.
pub mod error;
pub mod generator;
pub mod millerrabin;
pub mod pcs;
pub mod pocklington;
pub mod progress;
pub mod smallprimes;

pub use error::Error;
pub use generator::{generate_pocklington_certified, generate_probabilistic, generate_probabilistic_default};
pub use millerrabin::{MillerRabin, MillerRabinResult};
pub use pcs::PrimeCandidateSource;
pub use pocklington::{CertifyError, Pockle};
pub use progress::{NullProgress, ProgressPhase, ProgressReceiver};
