//! `ProxyCommand`-style helpers: resolving the `proxy_*` options into a
//! spawned child process or bypass decision, for callers that want to
//! tunnel the SSH connection through an external command the way
//! OpenSSH's `ProxyCommand` does.
use std::process::Stdio;

use log::debug;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::{Child, Command};

use crate::conf::Conf;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyType {
	None,
	Socks4,
	Socks5,
	Http,
	Telnet,
	Command,
}

impl ProxyType {
	fn from_code(code:i64) -> ProxyType {
		match code {
			1 => ProxyType::Socks4,
			2 => ProxyType::Socks5,
			3 => ProxyType::Http,
			4 => ProxyType::Telnet,
			5 => ProxyType::Command,
			_ => ProxyType::None,
		}
	}
}

#[derive(Debug, Clone)]
pub struct ProxySettings {
	pub kind:ProxyType,
	pub host:String,
	pub port:i64,
	pub username:String,
	pub password:String,
	pub telnet_command:String,
	pub exclude_list:Vec<String>,
	pub even_localhost:bool,
}

impl ProxySettings {
	pub fn from_conf(conf:&Conf) -> Result<Self> {
		let get_int = |key:&str| -> Result<i64> { Ok(conf.get(key)?.map(|v| v.as_int()).transpose()?.unwrap_or(0)) };
		let get_str = |key:&str| -> Result<String> { Ok(conf.get(key)?.map(|v| v.as_str().map(str::to_string)).transpose()?.unwrap_or_default()) };
		let get_bool = |key:&str| -> Result<bool> { Ok(conf.get(key)?.map(|v| v.as_bool()).transpose()?.unwrap_or(false)) };

		Ok(ProxySettings {
			kind:ProxyType::from_code(get_int("proxy_type")?),
			host:get_str("proxy_host")?,
			port:get_int("proxy_port")?,
			username:get_str("proxy_username")?,
			password:get_str("proxy_password")?,
			telnet_command:get_str("proxy_telnet_command")?,
			exclude_list:get_str("proxy_exclude_list")?.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect(),
			even_localhost:get_bool("even_proxy_localhost")?,
		})
	}

	/// Whether `target_host` should bypass the proxy per
	/// `proxy_exclude_list` (comma-separated host/wildcard patterns, as
	/// PuTTY's own proxy exclusion list works) and `even_localhost`.
	pub fn should_bypass(&self, target_host:&str) -> bool {
		if self.kind == ProxyType::None {
			return true;
		}
		if !self.even_localhost && (target_host == "localhost" || target_host == "127.0.0.1" || target_host == "::1") {
			return true;
		}
		self.exclude_list.iter().any(|pattern| host_matches(pattern, target_host))
	}
}

fn host_matches(pattern:&str, host:&str) -> bool {
	if let Some(suffix) = pattern.strip_prefix('*') {
		host.ends_with(suffix)
	} else {
		pattern == host
	}
}

/// Expand `%host`/`%port`/`%user` placeholders in a `proxy_telnet_command`
/// template the way PuTTY's own proxy command substitution does.
pub fn expand_command_template(template:&str, host:&str, port:u16, user:&str) -> String {
	template.replace("%host", host).replace("%port", &port.to_string()).replace("%user", user)
}

/// Spawn `command` (already expanded via [`expand_command_template`])
/// as a child process whose stdin/stdout become the proxy's byte
/// stream, the way `ProxyCommand`-based tunnelling works.
pub async fn spawn_command_proxy(command:&str) -> Result<Child> {
	debug!("spawning proxy command: {command}");
	let mut parts = command.split_whitespace();
	let program = parts.next().ok_or_else(|| Error::MalformedLine(command.to_string()))?;
	let child = Command::new(program)
		.args(parts)
		.stdin(Stdio::piped())
		.stdout(Stdio::piped())
		.stderr(Stdio::inherit())
		.spawn()?;
	Ok(child)
}

/// A child process's stdin/stdout pair, adapted to a single duplex
/// stream for the transport layer to drive as its underlying socket.
pub fn proxy_stream(child:&mut Child) -> (impl AsyncRead + '_, impl AsyncWrite + '_) {
	(child.stdout.as_mut().expect("proxy child spawned with piped stdout"), child.stdin.as_mut().expect("proxy child spawned with piped stdin"))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::value::Value;

	#[test]
	fn exclude_list_wildcard_matches() {
		assert!(host_matches("*.internal.example.com", "db.internal.example.com"));
		assert!(!host_matches("*.internal.example.com", "example.com"));
	}

	#[test]
	fn bypass_decision_respects_exclude_list_and_localhost() {
		let mut conf = Conf::new();
		conf.set("proxy_type", Value::Int(2)).unwrap();
		conf.set("proxy_exclude_list", Value::Str("*.trusted.example.com".to_string())).unwrap();
		let settings = ProxySettings::from_conf(&conf).unwrap();
		assert!(settings.should_bypass("db.trusted.example.com"));
		assert!(settings.should_bypass("localhost"));
		assert!(!settings.should_bypass("outside.example.com"));
	}

	#[test]
	fn template_expansion_substitutes_all_placeholders() {
		let expanded = expand_command_template("connect -h %host -p %port -u %user", "bastion.example.com", 2222, "alice");
		assert_eq!(expanded, "connect -h bastion.example.com -p 2222 -u alice");
	}
}
