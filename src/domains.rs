use std::io::{BufRead, Write};

use anyhow::{anyhow, Result};

/// Parse domain file contents, one domain per line.
///
/// Surrounding whitespace is stripped and blank lines are skipped. Every
/// other line is a domain, as written.
pub fn parse_domains(content: &str) -> Vec<String> {
	content.lines()
		.map(|line| line.trim().to_string())
		.filter(|line| !line.is_empty())
		.collect()
}

/// Read domains from a file, one per line.
pub fn read_domain_file(path: &str) -> Result<Vec<String>> {
	let content = std::fs::read_to_string(path)
		.map_err(|e| anyhow!("failed to read domain file '{}': {}", path, e))?;
	Ok(parse_domains(&content))
}

/// Ask for the domain file path on the given terminal streams.
pub fn prompt_domain_file<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<String> {
	write!(output, "Path of the domain list file (e.g. domains.txt): ")?;
	output.flush()?;

	let mut line = String::new();
	input.read_line(&mut line)?;
	let path = line.trim();
	if path.is_empty() {
		return Err(anyhow!("no domain file given"));
	}
	Ok(path.to_string())
}
