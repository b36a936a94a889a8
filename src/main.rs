mod batch;
mod cli;
mod config;
mod dns;
mod domains;
mod error;
mod output;
mod proxy;
mod resolver;
mod transport;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::batch::BatchOptions;
use crate::cli::Cli;
use crate::proxy::ProxyEndpoint;
use crate::resolver::Resolver;
use crate::transport::{DirectTransport, Transport};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();

	let default_level = if cli.verbose { "debug" } else { "info" };
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| EnvFilter::new(default_level)),
		)
		.init();

	// Proxy: CLI flag wins over the settings file, which is created if missing
	let settings = config::load_or_create(&cli.config)?;
	let endpoint = if cli.no_proxy {
		None
	} else if let Some(p) = &cli.proxy {
		Some(ProxyEndpoint::parse(p)?)
	} else {
		settings.endpoint()?
	};

	// Transport is fixed before any lookup runs
	let transport: Arc<dyn Transport> = match endpoint {
		Some(endpoint) => {
			let socks = proxy::configure(endpoint).await?;
			info!(proxy = %socks.endpoint(), "using socks5 proxy");
			Arc::new(socks)
		}
		None => {
			info!("no proxy configured");
			Arc::new(DirectTransport)
		}
	};

	// Nameservers from flags, then file, then the system, then defaults
	let mut nameservers = Vec::new();
	for r in &cli.resolvers {
		nameservers.push(resolver::parse_nameserver(r)?);
	}
	if let Some(path) = &cli.resolver_file {
		nameservers.extend(resolver::read_nameserver_file(path)?);
	}
	if nameservers.is_empty() {
		nameservers = resolver::system_nameservers();
	}
	if nameservers.is_empty() {
		nameservers = resolver::default_nameservers();
	}

	let input = match &cli.input {
		Some(path) => path.clone(),
		None => {
			let stdin = std::io::stdin();
			domains::prompt_domain_file(&mut stdin.lock(), &mut std::io::stdout())?
		}
	};
	let domain_list = domains::read_domain_file(&input)?;

	let options = BatchOptions {
		rounds: cli.rounds,
		concurrency: cli.concurrency,
	};
	let resolver = Resolver::new(nameservers, transport, Duration::from_millis(cli.timeout));

	output::print_config_summary(
		domain_list.len(),
		resolver.nameservers(),
		&resolver.transport().describe(),
		&options,
		cli.timeout,
	);

	let results = batch::run(&resolver, &domain_list, &options).await;

	output::print_results_table(&results);
	output::write_csv(&cli.output, &results)?;

	Ok(())
}
