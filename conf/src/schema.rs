//! The `CONF_OPTION` table (spec.md §4.7), restricted to the options
//! that feed the transport/session/key-management core this workspace
//! implements. `examples/original_source/conf.h` declares ~200 keys;
//! the rest (terminal emulation, serial ports, GUI fonts and colours,
//! SUPDUP) belong to components spec.md §1 marks out of scope, so they
//! have no counterpart here.
use crate::value::ValueKind;

#[derive(Debug, Clone, Copy)]
pub struct OptionSpec {
	pub key:&'static str,
	pub value:ValueKind,
	/// `Some(kind)` if this key maps *subkeys* of that kind to values
	/// (e.g. `portfwd`, `environmt`), rather than holding a single value.
	pub subkey:Option<ValueKind>,
}

macro_rules! conf_option {
	($key:literal, $value:expr) => {
		OptionSpec { key:$key, value:$value, subkey:None }
	};
	($key:literal, $value:expr, sub:$sub:expr) => {
		OptionSpec { key:$key, value:$value, subkey:Some($sub) }
	};
}

pub static SCHEMA:&[OptionSpec] = &[
	conf_option!("host", ValueKind::Str),
	conf_option!("port", ValueKind::Int),
	conf_option!("protocol", ValueKind::Int),
	conf_option!("addressfamily", ValueKind::Int),
	conf_option!("close_on_exit", ValueKind::Int),
	conf_option!("warn_on_close", ValueKind::Bool),
	conf_option!("ping_interval", ValueKind::Int),
	conf_option!("tcp_nodelay", ValueKind::Bool),
	conf_option!("tcp_keepalives", ValueKind::Bool),
	conf_option!("loghost", ValueKind::Str),
	// Proxy.
	conf_option!("proxy_exclude_list", ValueKind::Str),
	conf_option!("proxy_dns", ValueKind::Int),
	conf_option!("even_proxy_localhost", ValueKind::Bool),
	conf_option!("proxy_type", ValueKind::Int),
	conf_option!("proxy_host", ValueKind::Str),
	conf_option!("proxy_port", ValueKind::Int),
	conf_option!("proxy_username", ValueKind::Str),
	conf_option!("proxy_password", ValueKind::Str),
	conf_option!("proxy_telnet_command", ValueKind::Str),
	conf_option!("proxy_log_to_term", ValueKind::Int),
	// SSH core.
	conf_option!("remote_cmd", ValueKind::Str),
	conf_option!("nopty", ValueKind::Bool),
	conf_option!("compression", ValueKind::Bool),
	conf_option!("ssh_kexlist", ValueKind::Int, sub:ValueKind::Int),
	conf_option!("ssh_hklist", ValueKind::Int, sub:ValueKind::Int),
	conf_option!("ssh_prefer_known_hostkeys", ValueKind::Bool),
	conf_option!("ssh_rekey_time", ValueKind::Int),
	conf_option!("ssh_rekey_data", ValueKind::Str),
	conf_option!("ssh_no_shell", ValueKind::Bool),
	conf_option!("ssh2_des_cbc", ValueKind::Bool),
	conf_option!("ssh_cipherlist", ValueKind::Int, sub:ValueKind::Int),
	conf_option!("change_username", ValueKind::Bool),
	conf_option!("ssh_simple", ValueKind::Bool),
	conf_option!("ssh_connection_sharing", ValueKind::Bool),
	conf_option!("ssh_connection_sharing_upstream", ValueKind::Bool),
	conf_option!("ssh_connection_sharing_downstream", ValueKind::Bool),
	conf_option!("ssh_manual_hostkeys", ValueKind::Str, sub:ValueKind::Str),
	conf_option!("ssh_no_userauth", ValueKind::Bool),
	conf_option!("ssh_no_trivial_userauth", ValueKind::Bool),
	conf_option!("ssh_show_banner", ValueKind::Bool),
	conf_option!("try_tis_auth", ValueKind::Bool),
	conf_option!("try_ki_auth", ValueKind::Bool),
	conf_option!("try_gssapi_auth", ValueKind::Bool),
	conf_option!("try_gssapi_kex", ValueKind::Bool),
	conf_option!("gssapifwd", ValueKind::Bool),
	conf_option!("gssapirekey", ValueKind::Int),
	conf_option!("ssh_subsys", ValueKind::Bool),
	conf_option!("ssh_no_shell2", ValueKind::Bool),
	conf_option!("username", ValueKind::Str),
	conf_option!("username_from_env", ValueKind::Bool),
	conf_option!("publickeyfile", ValueKind::FileName),
	conf_option!("detached_cert", ValueKind::FileName),
	conf_option!("agentfwd", ValueKind::Bool),
	conf_option!("portfwd", ValueKind::Str, sub:ValueKind::Str),
	// Bug-compatibility flags (spec.md §4.5, §9).
	conf_option!("sshbug_ignore1", ValueKind::Int),
	conf_option!("sshbug_plainpw1", ValueKind::Int),
	conf_option!("sshbug_rsa1", ValueKind::Int),
	conf_option!("sshbug_ignore2", ValueKind::Int),
	conf_option!("sshbug_derivekey2", ValueKind::Int),
	conf_option!("sshbug_rsapad2", ValueKind::Int),
	conf_option!("sshbug_pksessid2", ValueKind::Int),
	conf_option!("sshbug_rekey2", ValueKind::Int),
	conf_option!("sshbug_maxpkt2", ValueKind::Int),
	conf_option!("sshbug_oldgex2", ValueKind::Int),
	conf_option!("sshbug_winadj", ValueKind::Int),
	conf_option!("sshbug_chanreq", ValueKind::Int),
	conf_option!("sshbug_dropstart", ValueKind::Int),
	conf_option!("sshbug_filter_kexinit", ValueKind::Int),
	conf_option!("sshbug_rsa_sha2_cert_userauth", ValueKind::Int),
	conf_option!("sshbug_hmac2", ValueKind::Int),
];

pub fn lookup(key:&str) -> Option<&'static OptionSpec> { SCHEMA.iter().find(|s| s.key == key) }

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn schema_has_no_duplicate_keys() {
		let mut seen = std::collections::HashSet::new();
		for spec in SCHEMA {
			assert!(seen.insert(spec.key), "duplicate key {}", spec.key);
		}
	}

	#[test]
	fn lookup_finds_a_known_key_and_rejects_unknown() {
		assert!(lookup("host").is_some());
		assert!(lookup("not-a-real-option").is_none());
	}
}
