use std::net::Ipv4Addr;

use anyhow::{anyhow, Result};
use hickory_proto::op::{Message, MessageType, Query, ResponseCode};
use hickory_proto::rr::{Name, RData, RecordType};

/// DNS response information extracted from a parsed message
#[derive(Debug)]
pub struct DnsResponse {
	pub rcode: ResponseCode,
	/// IPv4 addresses from A records in the answer section
	pub addresses: Vec<Ipv4Addr>,
}

/// Build an A query for the given domain.
///
/// Non-ASCII labels are IDNA-encoded to their `xn--` form.
/// Returns the serialized query bytes, ready for UDP or length-prefixed TCP.
pub fn build_query(domain: &str, txid: u16) -> Result<Vec<u8>> {
	let name = Name::from_utf8(domain)
		.map_err(|e| anyhow!("invalid domain name '{}': {}", domain, e))?;

	let mut message = Message::new();
	message.set_id(txid);
	message.set_recursion_desired(true);
	message.add_query(Query::query(name, RecordType::A));

	let bytes = message.to_vec()
		.map_err(|e| anyhow!("failed to serialize DNS query: {}", e))?;
	Ok(bytes)
}

/// Parse a DNS response, validating the transaction ID and collecting A records.
///
/// CNAME and other records in the answer section are skipped.
pub fn parse_response(bytes: &[u8], expected_txid: u16) -> Result<DnsResponse> {
	let message = Message::from_vec(bytes)
		.map_err(|e| anyhow!("failed to parse DNS response: {}", e))?;

	if message.id() != expected_txid {
		return Err(anyhow!(
			"txid mismatch: expected {}, got {}",
			expected_txid, message.id()
		));
	}

	if message.message_type() != MessageType::Response {
		return Err(anyhow!("received a query instead of a response"));
	}

	let addresses = message.answers().iter()
		.filter_map(|record| match record.data() {
			RData::A(a) => Some(a.0),
			_ => None,
		})
		.collect();

	Ok(DnsResponse {
		rcode: message.response_code(),
		addresses,
	})
}

/// Check the TC (truncated) header bit without a full parse.
pub fn is_truncated(bytes: &[u8]) -> bool {
	bytes.len() > 2 && bytes[2] & 0x02 != 0
}

/// Read the transaction ID from a raw message.
pub fn txid_of(bytes: &[u8]) -> Option<u16> {
	if bytes.len() < 2 {
		return None;
	}
	Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}
