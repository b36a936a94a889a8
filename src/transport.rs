use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tracing::debug;

use crate::dns::{is_truncated, txid_of};

/// Carries one DNS exchange (query bytes out, response bytes back) to a nameserver.
///
/// The resolver owns query construction and response interpretation; a
/// transport only decides how the bytes travel.
#[async_trait]
pub trait Transport: Send + Sync {
	async fn exchange(
		&self,
		nameserver: SocketAddr,
		query: &[u8],
		timeout: Duration,
	) -> Result<Vec<u8>>;

	/// Short label for the configuration summary
	fn describe(&self) -> String;
}

/// Plain network transport: UDP, retried over TCP when the answer is truncated.
#[derive(Debug, Clone, Default)]
pub struct DirectTransport;

#[async_trait]
impl Transport for DirectTransport {
	async fn exchange(
		&self,
		nameserver: SocketAddr,
		query: &[u8],
		timeout: Duration,
	) -> Result<Vec<u8>> {
		let response = udp_exchange(nameserver, query, timeout).await?;
		if !is_truncated(&response) {
			return Ok(response);
		}

		debug!(%nameserver, "truncated UDP response, retrying over TCP");
		let fut = async {
			let mut stream = TcpStream::connect(nameserver).await?;
			tcp_exchange(&mut stream, query).await
		};
		tokio::time::timeout(timeout, fut).await
			.map_err(|_| anyhow!("TCP query to {} timed out", nameserver))?
	}

	fn describe(&self) -> String {
		"direct (UDP, TCP on truncation)".to_string()
	}
}

/// Send a query over UDP and wait for the matching response.
///
/// Uses a dedicated socket per query. Datagrams from other sources or with
/// a foreign transaction ID are skipped until the deadline.
async fn udp_exchange(
	nameserver: SocketAddr,
	query: &[u8],
	timeout: Duration,
) -> Result<Vec<u8>> {
	let bind_addr = if nameserver.is_ipv4() {
		"0.0.0.0:0"
	} else {
		"[::]:0"
	};
	let socket = UdpSocket::bind(bind_addr).await?;
	socket.send_to(query, nameserver).await?;

	let expected_txid = txid_of(query);
	// 4096 bytes covers EDNS-sized answers
	let mut buf = vec![0u8; 4096];
	let deadline = tokio::time::Instant::now() + timeout;
	loop {
		let (len, src) = tokio::time::timeout_at(deadline, socket.recv_from(&mut buf))
			.await
			.map_err(|_| anyhow!("UDP query to {} timed out", nameserver))??;
		if src != nameserver || txid_of(&buf[..len]) != expected_txid {
			debug!(%src, "ignoring unexpected datagram");
			continue;
		}
		return Ok(buf[..len].to_vec());
	}
}

/// DNS-over-TCP exchange on an established stream (RFC 1035 4.2.2 framing).
pub async fn tcp_exchange<S>(stream: &mut S, query: &[u8]) -> Result<Vec<u8>>
where
	S: AsyncRead + AsyncWrite + Unpin,
{
	let len = u16::try_from(query.len())
		.map_err(|_| anyhow!("query of {} bytes too large for TCP framing", query.len()))?;
	let mut framed = Vec::with_capacity(query.len() + 2);
	framed.extend_from_slice(&len.to_be_bytes());
	framed.extend_from_slice(query);
	stream.write_all(&framed).await?;
	stream.flush().await?;

	let mut len_buf = [0u8; 2];
	stream.read_exact(&mut len_buf).await?;
	let mut response = vec![0u8; u16::from_be_bytes(len_buf) as usize];
	stream.read_exact(&mut response).await?;
	Ok(response)
}
