use std::io;

use thiserror::Error;

/// Failure to get a definitive answer for a domain.
///
/// NXDOMAIN is not represented here: a name that does not exist resolves
/// to an empty address list.
#[derive(Debug, Error)]
pub enum LookupError {
	#[error("invalid domain name '{domain}': {reason}")]
	InvalidName { domain: String, reason: String },

	#[error("query for '{domain}' failed on every nameserver: {reason}")]
	QueryFailed { domain: String, reason: String },
}

/// Failure to bring up the SOCKS5 transport, or to tunnel through it.
#[derive(Debug, Error)]
pub enum ProxyError {
	#[error("invalid proxy endpoint '{0}'")]
	InvalidEndpoint(String),

	#[error("proxy {endpoint} unreachable: {source}")]
	Unreachable {
		endpoint: String,
		#[source]
		source: io::Error,
	},

	#[error("socks5 handshake with {endpoint} failed: {reason}")]
	Handshake { endpoint: String, reason: String },

	#[error("socks5 CONNECT via {endpoint} failed: {reason}")]
	Connect { endpoint: String, reason: String },
}

/// Problems with the settings file.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("settings file '{path}': {source}")]
	Io {
		path: String,
		#[source]
		source: io::Error,
	},

	#[error("invalid proxy port '{0}' in settings file")]
	InvalidPort(String),
}
