use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use hickory_proto::op::ResponseCode;
use tracing::{debug, warn};

use crate::dns::{build_query, parse_response};
use crate::error::LookupError;
use crate::transport::Transport;

/// A-record lookups for single domains over a fixed transport.
///
/// Cheap to clone; clones share the transport.
#[derive(Clone)]
pub struct Resolver {
	nameservers: Arc<Vec<SocketAddr>>,
	transport: Arc<dyn Transport>,
	timeout: Duration,
}

impl Resolver {
	pub fn new(
		nameservers: Vec<SocketAddr>,
		transport: Arc<dyn Transport>,
		timeout: Duration,
	) -> Self {
		Self {
			nameservers: Arc::new(nameservers),
			transport,
			timeout,
		}
	}

	pub fn nameservers(&self) -> &[SocketAddr] {
		&self.nameservers
	}

	pub fn transport(&self) -> &dyn Transport {
		self.transport.as_ref()
	}

	/// Look up the A records of `domain`.
	///
	/// NXDOMAIN is a definitive answer and yields an empty list. Any other
	/// failure moves on to the next nameserver; `QueryFailed` is returned
	/// only when none of them answered.
	pub async fn resolve(&self, domain: &str) -> Result<Vec<Ipv4Addr>, LookupError> {
		let txid: u16 = rand::random();
		let query = build_query(domain, txid).map_err(|e| LookupError::InvalidName {
			domain: domain.to_string(),
			reason: e.to_string(),
		})?;

		let mut last_error = String::from("no nameservers configured");
		for &nameserver in self.nameservers.iter() {
			let bytes = match self.transport.exchange(nameserver, &query, self.timeout).await {
				Ok(bytes) => bytes,
				Err(e) => {
					debug!(domain, %nameserver, error = %e, "exchange failed");
					last_error = format!("{}: {}", nameserver, e);
					continue;
				}
			};
			let response = match parse_response(&bytes, txid) {
				Ok(response) => response,
				Err(e) => {
					debug!(domain, %nameserver, error = %e, "bad response");
					last_error = format!("{}: {}", nameserver, e);
					continue;
				}
			};
			match response.rcode {
				ResponseCode::NoError => {
					debug!(domain, %nameserver, count = response.addresses.len(), "answer");
					return Ok(response.addresses);
				}
				ResponseCode::NXDomain => {
					debug!(domain, %nameserver, "NXDOMAIN");
					return Ok(Vec::new());
				}
				rcode => {
					debug!(domain, %nameserver, %rcode, "non-definitive rcode");
					last_error = format!("{}: {}", nameserver, rcode);
				}
			}
		}

		Err(LookupError::QueryFailed {
			domain: domain.to_string(),
			reason: last_error,
		})
	}
}

/// Parse a nameserver address string.
///
/// Supports formats:
///   "1.1.1.1"              -- IPv4, default port 53
///   "1.1.1.1:53"           -- IPv4 with explicit port
///   "2606:4700::1111"      -- bare IPv6, default port 53
///   "[2606:4700::1111]:53" -- bracketed IPv6 with port
pub fn parse_nameserver(input: &str) -> Result<SocketAddr> {
	let trimmed = input.trim();
	if trimmed.is_empty() {
		return Err(anyhow!("empty nameserver address"));
	}

	let addr: SocketAddr = if trimmed.starts_with('[') {
		trimmed.parse()
			.map_err(|e| anyhow!("invalid bracketed IPv6 address '{}': {}", trimmed, e))?
	} else if trimmed.contains("::") || trimmed.matches(':').count() > 1 {
		let ip = trimmed.parse()
			.map_err(|e| anyhow!("invalid IPv6 address '{}': {}", trimmed, e))?;
		SocketAddr::new(ip, 53)
	} else if let Ok(addr) = trimmed.parse::<SocketAddr>() {
		addr
	} else {
		let ip = trimmed.parse()
			.map_err(|e| anyhow!("invalid IP address '{}': {}", trimmed, e))?;
		SocketAddr::new(ip, 53)
	};
	Ok(addr)
}

/// Read nameserver addresses from a file, one per line.
///
/// Blank lines and lines starting with '#' are skipped.
pub fn read_nameserver_file(path: &str) -> Result<Vec<SocketAddr>> {
	let content = std::fs::read_to_string(path)
		.map_err(|e| anyhow!("failed to read nameserver file '{}': {}", path, e))?;
	let mut nameservers = Vec::new();
	for line in content.lines() {
		let trimmed = line.trim();
		if trimmed.is_empty() || trimmed.starts_with('#') {
			continue;
		}
		nameservers.push(parse_nameserver(trimmed)?);
	}
	Ok(nameservers)
}

/// Nameservers from the operating system's resolver configuration.
///
/// The system config lists each server once per protocol, so addresses are
/// deduplicated. Returns an empty vec if the configuration cannot be read.
pub fn system_nameservers() -> Vec<SocketAddr> {
	let (config, _opts) = match hickory_resolver::system_conf::read_system_conf() {
		Ok(conf) => conf,
		Err(e) => {
			warn!(error = %e, "could not read system resolver configuration");
			return Vec::new();
		}
	};
	let mut nameservers: Vec<SocketAddr> = Vec::new();
	for ns in config.name_servers() {
		if !nameservers.contains(&ns.socket_addr) {
			nameservers.push(ns.socket_addr);
		}
	}
	nameservers
}

/// Well-known public resolvers, used when nothing else is configured.
pub fn default_nameservers() -> Vec<SocketAddr> {
	vec![
		SocketAddr::from(([1, 1, 1, 1], 53)),
		SocketAddr::from(([8, 8, 8, 8], 53)),
		SocketAddr::from(([9, 9, 9, 9], 53)),
	]
}
