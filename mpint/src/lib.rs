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

//! Fixed-width arbitrary-precision integer arithmetic with
//! constant-time primitives, underlying the public-key algorithms and
//! prime generation in the rest of this workspace.
pub mod error;
mod int;
mod limbs;
pub mod montgomery;
pub mod modsqrt;
pub mod rand;

pub use error::Error;
pub use int::MPInt;
pub use montgomery::MontgomeryContext;
pub use modsqrt::ModSqrtContext;
pub use rand::{EntropySource, TestRng};
