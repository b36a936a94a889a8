use clap::Parser;

/// Batch domain to IP lookup
#[derive(Parser, Debug)]
#[command(name = "domain-reverse")]
#[command(about = "Resolve a list of domains to IPv4 addresses, optionally through a SOCKS5 proxy")]
pub struct Cli {
	/// File with the domains to resolve (one per line); prompted for when omitted
	#[arg(short = 'i', long = "input")]
	pub input: Option<String>,

	/// Output CSV file path
	#[arg(short = 'o', long = "output", default_value = "results.csv")]
	pub output: String,

	/// Settings file with a [proxy] section (created if missing)
	#[arg(short = 'c', long = "config", default_value = "config.ini")]
	pub config: String,

	/// SOCKS5 proxy as host:port, overriding the settings file
	#[arg(short = 'p', long = "proxy", conflicts_with = "no_proxy")]
	pub proxy: Option<String>,

	/// Ignore any proxy in the settings file
	#[arg(long = "no-proxy")]
	pub no_proxy: bool,

	/// Queries per domain; answers from all rounds are merged
	#[arg(short = 'n', long = "rounds", default_value = "3")]
	pub rounds: u32,

	/// Domains resolved at the same time (1 = sequential)
	#[arg(short = 'j', long = "concurrency", default_value = "1")]
	pub concurrency: usize,

	/// Query timeout in milliseconds
	#[arg(short = 't', long = "timeout", default_value = "2000")]
	pub timeout: u64,

	/// Nameserver address (repeatable, e.g. 1.1.1.1 or 1.1.1.1:53); defaults to the system resolvers
	#[arg(short = 'r', long = "resolver")]
	pub resolvers: Vec<String>,

	/// File containing nameserver addresses (one per line)
	#[arg(short = 'f', long = "resolver-file")]
	pub resolver_file: Option<String>,

	/// Debug logging (RUST_LOG takes precedence)
	#[arg(short = 'v', long = "verbose")]
	pub verbose: bool,
}
