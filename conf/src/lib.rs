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

//! Typed session configuration (C7): the `CONF_OPTION` schema, the
//! `Conf` store and its saved-session serialization, the host-key
//! cache, and `ProxyCommand`-style helpers.

pub mod conf;
pub mod error;
pub mod hostkeys;
pub mod proxy;
pub mod schema;
pub mod value;

pub use conf::Conf;
pub use error::{Error, Result};
pub use hostkeys::HostKeyCache;
pub use proxy::{ProxySettings, ProxyType};
pub use schema::{lookup, OptionSpec, SCHEMA};
pub use value::{Value, ValueKind};
