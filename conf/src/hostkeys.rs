//! Process-wide host-key cache: a simple last-writer-wins key-value
//! store, writes gated by caller confirmation (spec.md §6 and the
//! `ssh_manual_hostkeys`/`ssh_prefer_known_hostkeys` options).
use std::collections::HashMap;
use std::sync::RwLock;

/// `host:port:keytype -> fingerprint`, matching `Key::cache_str` in the
/// `keys` crate.
#[derive(Default)]
pub struct HostKeyCache {
	entries:RwLock<HashMap<String, String>>,
}

impl HostKeyCache {
	pub fn new() -> Self { HostKeyCache { entries:RwLock::new(HashMap::new()) } }

	pub fn lookup(&self, cache_key:&str) -> Option<String> {
		self.entries.read().expect("host-key cache lock poisoned").get(cache_key).cloned()
	}

	/// Whether `cache_key` is known, and if so, whether `fingerprint`
	/// matches the cached value. `None` means "not in the cache" so the
	/// caller can decide whether an unseen host needs confirmation.
	pub fn check(&self, cache_key:&str, fingerprint:&str) -> Option<bool> { self.lookup(cache_key).map(|known| known == fingerprint) }

	/// Record `fingerprint` for `cache_key`, overwriting any previous
	/// entry. Callers are expected to have already gated this on user
	/// confirmation per spec.md §6.
	pub fn confirm(&self, cache_key:&str, fingerprint:&str) {
		self.entries.write().expect("host-key cache lock poisoned").insert(cache_key.to_string(), fingerprint.to_string());
	}

	pub fn forget(&self, cache_key:&str) { self.entries.write().expect("host-key cache lock poisoned").remove(cache_key); }
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn unseen_host_reports_none() {
		let cache = HostKeyCache::new();
		assert_eq!(cache.check("example.com:22:ssh-ed25519", "abc"), None);
	}

	#[test]
	fn confirmed_host_matches_and_mismatches_correctly() {
		let cache = HostKeyCache::new();
		cache.confirm("example.com:22:ssh-ed25519", "abc");
		assert_eq!(cache.check("example.com:22:ssh-ed25519", "abc"), Some(true));
		assert_eq!(cache.check("example.com:22:ssh-ed25519", "xyz"), Some(false));
	}

	#[test]
	fn later_confirm_overwrites_earlier_one() {
		let cache = HostKeyCache::new();
		cache.confirm("h", "old");
		cache.confirm("h", "new");
		assert_eq!(cache.lookup("h"), Some("new".to_string()));
	}
}
