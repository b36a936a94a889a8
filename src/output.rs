use std::io::Write;
use std::net::SocketAddr;

use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};

use crate::batch::{BatchOptions, ResultMap};

/// Print a summary of the run configuration before starting.
pub fn print_config_summary(
	domain_count: usize,
	nameservers: &[SocketAddr],
	transport: &str,
	options: &BatchOptions,
	timeout_ms: u64,
) {
	println!("Domain Lookup Configuration");
	println!("===========================");
	println!("Domains:        {}", domain_count);
	println!("Nameservers:    {}", nameservers.len());
	for ns in nameservers {
		println!("  - {}", ns);
	}
	println!("Transport:      {}", transport);
	println!("Rounds:         {}", options.rounds);
	println!("Concurrency:    {}", options.concurrency);
	println!("Timeout:        {} ms", timeout_ms);
	println!();
}

/// Print the lookup results as a formatted table.
pub fn print_results_table(results: &ResultMap) {
	if results.is_empty() {
		println!("\nNo domains to look up.");
		return;
	}

	let mut table = Table::new();
	table.load_preset(UTF8_FULL);
	table.set_content_arrangement(ContentArrangement::Dynamic);
	table.set_header(vec!["Domain", "IP address(es)"]);

	for (domain, set) in results.iter() {
		table.add_row(vec![domain.to_string(), set.to_strings().join("\n")]);
	}

	println!("\nLookup Results");
	println!("==============\n");
	println!("{table}");
}

/// Write the report rows: header, then one row per domain in order.
pub fn write_report<W: Write>(writer: W, results: &ResultMap) -> Result<()> {
	let mut writer = csv::Writer::from_writer(writer);
	writer.write_record(["domain name", "IP address(es)"])?;
	for (domain, set) in results.iter() {
		writer.write_record([domain, set.joined().as_str()])?;
	}
	writer.flush()?;
	Ok(())
}

/// Write the report to a CSV file.
pub fn write_csv(path: &str, results: &ResultMap) -> Result<()> {
	let file = std::fs::File::create(path)?;
	write_report(file, results)?;
	println!("\nResults written to: {}", path);
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Arc;
	use std::time::Duration;

	use crate::batch;
	use crate::resolver::testing::{ns, Script, ScriptedTransport};
	use crate::resolver::Resolver;

	async fn sample_results() -> ResultMap {
		let transport = Arc::new(ScriptedTransport::new()
			.with("example.com", Script::Rotate(vec![
				vec!["93.184.216.34".parse().unwrap()],
				vec!["93.184.216.35".parse().unwrap()],
			])));
		let resolver = Resolver::new(vec![ns(1)], transport, Duration::from_millis(100));
		let domains = vec!["example.com".to_string(), "nonexistent-xyz123.invalid".to_string()];
		batch::run(&resolver, &domains, &BatchOptions::default()).await
	}

	#[tokio::test]
	async fn test_report_rows() {
		let results = sample_results().await;
		let mut buf = Vec::new();
		write_report(&mut buf, &results).unwrap();

		let text = String::from_utf8(buf).unwrap();
		let lines: Vec<&str> = text.lines().collect();
		assert_eq!(lines, vec![
			"domain name,IP address(es)",
			"example.com,\"93.184.216.34, 93.184.216.35\"",
			"nonexistent-xyz123.invalid,No records found",
		]);
	}

	#[tokio::test]
	async fn test_write_csv_file() {
		let results = sample_results().await;
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("results.csv");
		write_csv(path.to_str().unwrap(), &results).unwrap();

		let mut reader = csv::Reader::from_path(&path).unwrap();
		let headers = reader.headers().unwrap().clone();
		assert_eq!(&headers[1], "IP address(es)");
		let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
		assert_eq!(rows.len(), 2);
		assert_eq!(&rows[0][0], "example.com");
		assert_eq!(&rows[1][1], "No records found");
	}
}
