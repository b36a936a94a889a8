use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::error::ProxyError;
use crate::transport::{tcp_exchange, Transport};

/// How long `configure` waits for the startup probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// SOCKS5 proxy location, fixed for the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyEndpoint {
	pub host: String,
	pub port: u16,
}

impl ProxyEndpoint {
	/// Parse "host:port" (IPv6 hosts in brackets).
	pub fn parse(input: &str) -> Result<Self, ProxyError> {
		let trimmed = input.trim();
		let (host, port) = trimmed.rsplit_once(':')
			.ok_or_else(|| ProxyError::InvalidEndpoint(trimmed.to_string()))?;
		let host = host.trim_start_matches('[').trim_end_matches(']');
		let port: u16 = port.parse()
			.map_err(|_| ProxyError::InvalidEndpoint(trimmed.to_string()))?;
		Ok(Self { host: host.to_string(), port })
	}
}

impl fmt::Display for ProxyEndpoint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.host.contains(':') {
			write!(f, "[{}]:{}", self.host, self.port)
		} else {
			write!(f, "{}:{}", self.host, self.port)
		}
	}
}

/// Install the SOCKS5 transport for this run.
///
/// Validates the endpoint and probes it with a method negotiation, so an
/// unreachable or non-SOCKS5 proxy fails before any domain is resolved.
/// Call once; hand the result to `Resolver::new`.
pub async fn configure(endpoint: ProxyEndpoint) -> Result<Socks5Transport, ProxyError> {
	if endpoint.host.is_empty() || endpoint.port == 0 {
		return Err(ProxyError::InvalidEndpoint(endpoint.to_string()));
	}

	let transport = Socks5Transport { endpoint };
	let probe = async {
		let mut stream = transport.dial().await?;
		transport.negotiate(&mut stream).await
	};
	match tokio::time::timeout(PROBE_TIMEOUT, probe).await {
		Ok(result) => result?,
		Err(_) => {
			return Err(ProxyError::Handshake {
				endpoint: transport.endpoint.to_string(),
				reason: "timed out".to_string(),
			});
		}
	}

	info!(proxy = %transport.endpoint, "socks5 proxy reachable");
	Ok(transport)
}

/// DNS-over-TCP tunnelled through a SOCKS5 CONNECT (RFC 1928, no authentication).
#[derive(Debug, Clone)]
pub struct Socks5Transport {
	endpoint: ProxyEndpoint,
}

impl Socks5Transport {
	pub fn endpoint(&self) -> &ProxyEndpoint {
		&self.endpoint
	}

	async fn dial(&self) -> Result<TcpStream, ProxyError> {
		TcpStream::connect((self.endpoint.host.as_str(), self.endpoint.port))
			.await
			.map_err(|source| ProxyError::Unreachable {
				endpoint: self.endpoint.to_string(),
				source,
			})
	}

	fn handshake_error(&self, reason: impl Into<String>) -> ProxyError {
		ProxyError::Handshake {
			endpoint: self.endpoint.to_string(),
			reason: reason.into(),
		}
	}

	fn connect_error(&self, reason: impl Into<String>) -> ProxyError {
		ProxyError::Connect {
			endpoint: self.endpoint.to_string(),
			reason: reason.into(),
		}
	}

	/// Method negotiation offering only NO_AUTH.
	async fn negotiate<S>(&self, stream: &mut S) -> Result<(), ProxyError>
	where
		S: AsyncRead + AsyncWrite + Unpin,
	{
		stream.write_all(&[0x05, 0x01, 0x00]).await
			.map_err(|e| self.handshake_error(e.to_string()))?;

		let mut resp = [0u8; 2];
		stream.read_exact(&mut resp).await
			.map_err(|e| self.handshake_error(e.to_string()))?;

		if resp[0] != 0x05 {
			return Err(self.handshake_error(format!("unsupported version 0x{:02x}", resp[0])));
		}
		match resp[1] {
			0x00 => Ok(()),
			0xFF => Err(self.handshake_error("no acceptable authentication method")),
			method => Err(self.handshake_error(format!("unsupported auth method 0x{:02x}", method))),
		}
	}

	/// Issue CONNECT to the nameserver and consume the reply.
	async fn connect_to<S>(&self, stream: &mut S, target: SocketAddr) -> Result<(), ProxyError>
	where
		S: AsyncRead + AsyncWrite + Unpin,
	{
		let mut req = vec![0x05, 0x01, 0x00];
		match target {
			SocketAddr::V4(v4) => {
				req.push(0x01);
				req.extend_from_slice(&v4.ip().octets());
			}
			SocketAddr::V6(v6) => {
				req.push(0x04);
				req.extend_from_slice(&v6.ip().octets());
			}
		}
		req.extend_from_slice(&target.port().to_be_bytes());
		stream.write_all(&req).await
			.map_err(|e| self.connect_error(e.to_string()))?;

		let mut head = [0u8; 4];
		stream.read_exact(&mut head).await
			.map_err(|e| self.connect_error(e.to_string()))?;
		if head[0] != 0x05 {
			return Err(self.connect_error(format!("invalid reply version 0x{:02x}", head[0])));
		}
		if head[1] != 0x00 {
			let reason = match head[1] {
				0x01 => "general failure",
				0x02 => "connection not allowed",
				0x03 => "network unreachable",
				0x04 => "host unreachable",
				0x05 => "connection refused",
				0x06 => "TTL expired",
				0x07 => "command not supported",
				0x08 => "address type not supported",
				_ => "unknown error",
			};
			return Err(self.connect_error(format!("{} (0x{:02x})", reason, head[1])));
		}

		// BND.ADDR + BND.PORT, unused
		let addr_len = match head[3] {
			0x01 => 4,
			0x04 => 16,
			0x03 => {
				let mut len = [0u8; 1];
				stream.read_exact(&mut len).await
					.map_err(|e| self.connect_error(e.to_string()))?;
				len[0] as usize
			}
			atyp => {
				return Err(self.connect_error(format!("unsupported bind address type 0x{:02x}", atyp)));
			}
		};
		let mut bound = vec![0u8; addr_len + 2];
		stream.read_exact(&mut bound).await
			.map_err(|e| self.connect_error(e.to_string()))?;
		Ok(())
	}
}

#[async_trait]
impl Transport for Socks5Transport {
	async fn exchange(
		&self,
		nameserver: SocketAddr,
		query: &[u8],
		timeout: Duration,
	) -> Result<Vec<u8>> {
		let fut = async {
			let mut stream = self.dial().await?;
			self.negotiate(&mut stream).await?;
			self.connect_to(&mut stream, nameserver).await?;
			debug!(proxy = %self.endpoint, %nameserver, "socks5 tunnel established");
			tcp_exchange(&mut stream, query).await
		};
		tokio::time::timeout(timeout, fut).await
			.map_err(|_| anyhow::anyhow!("query to {} via {} timed out", nameserver, self.endpoint))?
	}

	fn describe(&self) -> String {
		format!("socks5 proxy {}", self.endpoint)
	}
}
