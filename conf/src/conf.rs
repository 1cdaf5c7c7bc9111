//! The `Conf` typed configuration store (spec.md §4.7): a map keyed by
//! the `CONF_OPTION` schema, holding either a single value or (for
//! subkeyed options like `portfwd`/`environmt`) a map of subkey to value.
use std::collections::BTreeMap;

use log::debug;

use crate::error::{Error, Result};
use crate::schema::{lookup, SCHEMA};
use crate::value::Value;

#[derive(Debug, Clone)]
enum Entry {
	Single(Value),
	Keyed(BTreeMap<String, Value>),
}

/// A session's full typed configuration. Unset keys simply aren't
/// present in the map; callers ask for a default via `get_or`.
#[derive(Debug, Clone, Default)]
pub struct Conf {
	entries:BTreeMap<&'static str, Entry>,
}

impl Conf {
	pub fn new() -> Self { Conf { entries:BTreeMap::new() } }

	fn spec_for(key:&str) -> Result<&'static crate::schema::OptionSpec> {
		lookup(key).ok_or_else(|| Error::UnknownKey(key.to_string()))
	}

	/// Set a non-subkeyed option, type-checked against the schema.
	pub fn set(&mut self, key:&str, value:Value) -> Result<()> {
		let spec = Self::spec_for(key)?;
		if spec.subkey.is_some() {
			return Err(Error::MissingSubkey(key.to_string()));
		}
		if spec.value != value.kind() {
			return Err(Error::WrongType(key.to_string(), value.kind().name(), spec.value.name()));
		}
		debug!("conf: set {key} = {value:?}");
		self.entries.insert(spec.key, Entry::Single(value));
		Ok(())
	}

	pub fn get(&self, key:&str) -> Result<Option<&Value>> {
		Self::spec_for(key)?;
		Ok(match self.entries.get(key) {
			Some(Entry::Single(v)) => Some(v),
			Some(Entry::Keyed(_)) => return Err(Error::MissingSubkey(key.to_string())),
			None => None,
		})
	}

	pub fn get_or<'a>(&'a self, key:&str, default:&'a Value) -> Result<&'a Value> { Ok(self.get(key)?.unwrap_or(default)) }

	/// Set a single subkey within a subkeyed option (e.g.
	/// `set_subkey("portfwd", "L8080", "localhost:80")`).
	pub fn set_subkey(&mut self, key:&str, subkey:&str, value:Value) -> Result<()> {
		let spec = Self::spec_for(key)?;
		if spec.subkey.is_none() {
			return Err(Error::WrongType(key.to_string(), value.kind().name(), spec.value.name()));
		}
		if spec.value != value.kind() {
			return Err(Error::WrongType(key.to_string(), value.kind().name(), spec.value.name()));
		}
		match self.entries.entry(spec.key).or_insert_with(|| Entry::Keyed(BTreeMap::new())) {
			Entry::Keyed(map) => {
				map.insert(subkey.to_string(), value);
			}
			Entry::Single(_) => return Err(Error::MissingSubkey(key.to_string())),
		}
		Ok(())
	}

	pub fn subkeys(&self, key:&str) -> Result<BTreeMap<&str, &Value>> {
		Self::spec_for(key)?;
		Ok(match self.entries.get(key) {
			Some(Entry::Keyed(map)) => map.iter().map(|(k, v)| (k.as_str(), v)).collect(),
			Some(Entry::Single(_)) => return Err(Error::WrongType(key.to_string(), "single", "subkeyed")),
			None => BTreeMap::new(),
		})
	}

	/// Serialize in schema order: one `key=value` line per single
	/// option, one `key.subkey=value` line per subkeyed entry. Stable
	/// across runs given the same `Conf` contents (spec.md's "rigid
	/// serialization contract").
	pub fn save(&self) -> String {
		let mut out = String::new();
		for spec in SCHEMA {
			match self.entries.get(spec.key) {
				Some(Entry::Single(v)) => {
					out.push_str(spec.key);
					out.push('=');
					out.push_str(&escape(&v.to_save_string()));
					out.push('\n');
				}
				Some(Entry::Keyed(map)) => {
					for (subkey, v) in map {
						out.push_str(spec.key);
						out.push('.');
						out.push_str(&escape(subkey));
						out.push('=');
						out.push_str(&escape(&v.to_save_string()));
						out.push('\n');
					}
				}
				None => {}
			}
		}
		out
	}

	pub fn load(text:&str) -> Result<Self> {
		let mut conf = Conf::new();
		for line in text.lines() {
			let line = line.trim();
			if line.is_empty() || line.starts_with('#') {
				continue;
			}
			let (lhs, rhs) = split_unescaped_eq(line).ok_or_else(|| Error::MalformedLine(line.to_string()))?;
			let rhs = unescape(rhs);
			if let Some((key, subkey)) = lhs.split_once('.') {
				let spec = Self::spec_for(key)?;
				let kind = spec.subkey.map(|_| spec.value).ok_or_else(|| Error::MissingSubkey(key.to_string()))?;
				conf.set_subkey(key, &unescape(subkey), Value::parse_as(kind, &rhs)?)?;
			} else {
				let spec = Self::spec_for(lhs)?;
				conf.set(lhs, Value::parse_as(spec.value, &rhs)?)?;
			}
		}
		Ok(conf)
	}
}

/// Finds the first `=` not preceded by an odd run of backslashes (i.e.
/// not itself escaped as `\=`), matching `escape`'s output so a key or
/// subkey containing `=` round-trips instead of being cut short.
fn split_unescaped_eq(line:&str) -> Option<(&str, &str)> {
	let bytes = line.as_bytes();
	let mut i = 0;
	while i < bytes.len() {
		if bytes[i] == b'=' {
			let mut backslashes = 0;
			let mut j = i;
			while j > 0 && bytes[j - 1] == b'\\' {
				backslashes += 1;
				j -= 1;
			}
			if backslashes % 2 == 0 {
				return Some((&line[..i], &line[i + 1..]));
			}
		}
		i += 1;
	}
	None
}

fn escape(s:&str) -> String { s.replace('\\', "\\\\").replace('\n', "\\n").replace('=', "\\=") }

fn unescape(s:&str) -> String {
	let mut out = String::with_capacity(s.len());
	let mut chars = s.chars();
	while let Some(c) = chars.next() {
		if c == '\\' {
			match chars.next() {
				Some('n') => out.push('\n'),
				Some('=') => out.push('='),
				Some(other) => out.push(other),
				None => out.push('\\'),
			}
		} else {
			out.push(c);
		}
	}
	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn set_get_round_trips() {
		let mut conf = Conf::new();
		conf.set("host", Value::Str("example.com".to_string())).unwrap();
		conf.set("port", Value::Int(22)).unwrap();
		assert_eq!(conf.get("host").unwrap().unwrap().as_str().unwrap(), "example.com");
		assert_eq!(conf.get("port").unwrap().unwrap().as_int().unwrap(), 22);
	}

	#[test]
	fn wrong_type_is_rejected() {
		let mut conf = Conf::new();
		assert!(conf.set("port", Value::Str("22".to_string())).is_err());
	}

	#[test]
	fn unknown_key_is_rejected() {
		let mut conf = Conf::new();
		assert!(conf.set("not-a-real-option", Value::Bool(true)).is_err());
	}

	#[test]
	fn save_load_round_trip_with_subkeys() {
		let mut conf = Conf::new();
		conf.set("host", Value::Str("example.com".to_string())).unwrap();
		conf.set_subkey("portfwd", "L8080", Value::Str("localhost:80".to_string())).unwrap();
		conf.set_subkey("portfwd", "L9090", Value::Str("localhost:90".to_string())).unwrap();

		let saved = conf.save();
		let reloaded = Conf::load(&saved).unwrap();
		assert_eq!(reloaded.get("host").unwrap().unwrap().as_str().unwrap(), "example.com");
		assert_eq!(reloaded.subkeys("portfwd").unwrap().len(), 2);
	}

	#[test]
	fn save_load_round_trip_with_equals_in_a_subkey() {
		let mut conf = Conf::new();
		conf.set_subkey("portfwd", "a=b", Value::Str("localhost:80".to_string())).unwrap();

		let saved = conf.save();
		let reloaded = Conf::load(&saved).unwrap();
		let subkeys = reloaded.subkeys("portfwd").unwrap();
		assert_eq!(subkeys.get("a=b").and_then(|v| v.as_str()), Some("localhost:80"));
	}

	#[test]
	fn save_is_stable_across_runs() {
		let mut conf = Conf::new();
		conf.set("host", Value::Str("a".to_string())).unwrap();
		conf.set("port", Value::Int(1)).unwrap();
		assert_eq!(conf.save(), conf.clone().save());
	}
}
