use std::collections::{BTreeSet, HashMap};
use std::net::Ipv4Addr;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::resolver::Resolver;

/// Rendering of a domain that produced no addresses in any round.
pub const NO_RECORDS: &str = "No records found";

/// Deduplicated addresses for one domain, or the "no records" sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressSet {
	Found(BTreeSet<Ipv4Addr>),
	NoRecords,
}

impl AddressSet {
	fn from_harvest(addrs: BTreeSet<Ipv4Addr>) -> Self {
		if addrs.is_empty() {
			AddressSet::NoRecords
		} else {
			AddressSet::Found(addrs)
		}
	}

	pub fn is_sentinel(&self) -> bool {
		matches!(self, AddressSet::NoRecords)
	}

	/// String form: the addresses in ascending order, or the sentinel alone.
	pub fn to_strings(&self) -> Vec<String> {
		match self {
			AddressSet::Found(addrs) => addrs.iter().map(|a| a.to_string()).collect(),
			AddressSet::NoRecords => vec![NO_RECORDS.to_string()],
		}
	}

	/// Addresses joined with ", " as they appear in the report.
	pub fn joined(&self) -> String {
		self.to_strings().join(", ")
	}
}

/// Domain to address set, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultMap {
	entries: Vec<(String, AddressSet)>,
	index: HashMap<String, usize>,
}

impl ResultMap {
	/// Record a domain's result. A repeated domain keeps its first position
	/// and takes the newer value.
	fn insert(&mut self, domain: String, set: AddressSet) {
		match self.index.get(&domain) {
			Some(&i) => self.entries[i].1 = set,
			None => {
				self.index.insert(domain.clone(), self.entries.len());
				self.entries.push((domain, set));
			}
		}
	}

	#[cfg(test)]
	pub fn get(&self, domain: &str) -> Option<&AddressSet> {
		self.index.get(domain).map(|&i| &self.entries[i].1)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &AddressSet)> {
		self.entries.iter().map(|(d, s)| (d.as_str(), s))
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn sentinel_count(&self) -> usize {
		self.entries.iter().filter(|(_, s)| s.is_sentinel()).count()
	}
}

/// Batch settings
#[derive(Debug, Clone)]
pub struct BatchOptions {
	/// Queries per domain. Every round runs, even after a successful one:
	/// the union across rounds picks up round-robin records a single answer
	/// would miss. This is not a retry count.
	pub rounds: u32,
	/// Domains resolved at once; 1 is strictly sequential
	pub concurrency: usize,
}

impl Default for BatchOptions {
	fn default() -> Self {
		Self { rounds: 3, concurrency: 1 }
	}
}

/// Query `domain` for `rounds` rounds and union the answers.
///
/// A failed round is logged and contributes nothing.
pub async fn harvest_domain(resolver: &Resolver, domain: &str, rounds: u32) -> AddressSet {
	let mut addrs = BTreeSet::new();
	for round in 1..=rounds.max(1) {
		match resolver.resolve(domain).await {
			Ok(found) => addrs.extend(found),
			Err(e) => warn!(domain, round, error = %e, "lookup failed, treating round as empty"),
		}
	}
	AddressSet::from_harvest(addrs)
}

/// Resolve every domain and collect the results in input order.
///
/// Never fails: a domain without addresses degrades to the sentinel.
pub async fn run(resolver: &Resolver, domains: &[String], options: &BatchOptions) -> ResultMap {
	info!(
		domains = domains.len(),
		rounds = options.rounds,
		concurrency = options.concurrency,
		"starting batch lookup"
	);

	let mut results = ResultMap::default();
	if options.concurrency <= 1 {
		for domain in domains {
			let set = harvest_domain(resolver, domain, options.rounds).await;
			results.insert(domain.clone(), set);
		}
	} else {
		// Spawn per domain, bounded by the semaphore; joining the handles in
		// spawn order rebuilds input order.
		let semaphore = Arc::new(Semaphore::new(options.concurrency));
		let mut handles = Vec::with_capacity(domains.len());
		for domain in domains {
			let sem = semaphore.clone();
			let resolver = resolver.clone();
			let domain = domain.clone();
			let rounds = options.rounds;
			handles.push(tokio::spawn(async move {
				let _permit = sem.acquire_owned().await.ok();
				harvest_domain(&resolver, &domain, rounds).await
			}));
		}

		for (domain, handle) in domains.iter().zip(handles) {
			let set = match handle.await {
				Ok(set) => set,
				Err(e) => {
					warn!(domain = domain.as_str(), error = %e, "lookup task failed");
					AddressSet::NoRecords
				}
			};
			results.insert(domain.clone(), set);
		}
	}

	info!(
		domains = results.len(),
		unresolved = results.sentinel_count(),
		"batch lookup finished"
	);
	results
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;

	use crate::resolver::testing::{ns, Script, ScriptedTransport};

	fn ip(s: &str) -> Ipv4Addr {
		s.parse().unwrap()
	}

	fn domains(list: &[&str]) -> Vec<String> {
		list.iter().map(|d| d.to_string()).collect()
	}

	fn setup(transport: ScriptedTransport) -> (Arc<ScriptedTransport>, Resolver) {
		let transport = Arc::new(transport);
		let resolver = Resolver::new(vec![ns(1)], transport.clone(), Duration::from_millis(200));
		(transport, resolver)
	}

	#[tokio::test]
	async fn test_union_across_rounds() {
		// Round-robin DNS exposing a different pair each time
		let (_, resolver) = setup(ScriptedTransport::new().with("rr.example", Script::Rotate(vec![
			vec![ip("10.0.0.1"), ip("10.0.0.2")],
			vec![ip("10.0.0.2"), ip("10.0.0.3")],
			vec![ip("10.0.0.1")],
		])));

		let results = run(&resolver, &domains(&["rr.example"]), &BatchOptions::default()).await;
		let expected: BTreeSet<Ipv4Addr> =
			[ip("10.0.0.1"), ip("10.0.0.2"), ip("10.0.0.3")].into_iter().collect();
		assert_eq!(results.get("rr.example"), Some(&AddressSet::Found(expected)));
	}

	#[tokio::test]
	async fn test_rounds_run_even_after_success() {
		let (transport, resolver) = setup(ScriptedTransport::new()
			.with("example.com", Script::Rotate(vec![vec![ip("93.184.216.34")]])));

		let options = BatchOptions { rounds: 3, concurrency: 1 };
		run(&resolver, &domains(&["example.com"]), &options).await;
		assert_eq!(transport.calls_for("example.com"), 3);
	}

	#[tokio::test]
	async fn test_zero_rounds_queries_once() {
		let (transport, resolver) = setup(ScriptedTransport::new()
			.with("example.com", Script::Rotate(vec![vec![ip("93.184.216.34")]])));

		let options = BatchOptions { rounds: 0, concurrency: 1 };
		let results = run(&resolver, &domains(&["example.com"]), &options).await;
		assert_eq!(transport.calls_for("example.com"), 1);
		assert!(!results.get("example.com").unwrap().is_sentinel());
	}

	#[tokio::test]
	async fn test_nonexistent_domain_gets_sentinel() {
		let (_, resolver) = setup(ScriptedTransport::new()
			.with("example.com", Script::Rotate(vec![vec![ip("93.184.216.34")]]))
			.with("nonexistent-xyz123.invalid", Script::NxDomain));

		let input = domains(&["example.com", "nonexistent-xyz123.invalid"]);
		let results = run(&resolver, &input, &BatchOptions::default()).await;

		assert_eq!(results.get("example.com").unwrap().to_strings(), vec!["93.184.216.34"]);
		let missing = results.get("nonexistent-xyz123.invalid").unwrap();
		assert!(missing.is_sentinel());
		assert_eq!(missing.to_strings(), vec![NO_RECORDS]);
		assert_eq!(results.sentinel_count(), 1);
	}

	#[tokio::test]
	async fn test_failures_degrade_to_sentinel() {
		let (transport, resolver) = setup(ScriptedTransport::new()
			.with("down.example", Script::Fail)
			.with("broken.example", Script::ServFail)
			.with("ok.example", Script::Rotate(vec![vec![ip("192.0.2.10")]])));

		let input = domains(&["down.example", "broken.example", "ok.example"]);
		let results = run(&resolver, &input, &BatchOptions::default()).await;

		assert_eq!(results.len(), 3);
		assert!(results.get("down.example").unwrap().is_sentinel());
		assert!(results.get("broken.example").unwrap().is_sentinel());
		assert!(!results.get("ok.example").unwrap().is_sentinel());
		// Failed rounds still all run
		assert_eq!(transport.calls_for("down.example"), 3);
	}

	#[tokio::test]
	async fn test_partial_round_failure_keeps_addresses() {
		// Empty answer in some rounds, addresses in another
		let (_, resolver) = setup(ScriptedTransport::new().with("flaky.example", Script::Rotate(vec![
			vec![],
			vec![ip("198.51.100.1")],
			vec![],
		])));

		let results = run(&resolver, &domains(&["flaky.example"]), &BatchOptions::default()).await;
		assert_eq!(results.get("flaky.example").unwrap().joined(), "198.51.100.1");
	}

	#[tokio::test]
	async fn test_order_preserved() {
		let (_, resolver) = setup(ScriptedTransport::new()
			.with("d1.example", Script::Rotate(vec![vec![ip("10.1.0.1")]]))
			.with("d2.example", Script::Fail)
			.with("d3.example", Script::Rotate(vec![vec![ip("10.3.0.1")]])));

		let input = domains(&["d3.example", "d1.example", "d2.example"]);
		for concurrency in [1, 2, 8] {
			let options = BatchOptions { rounds: 3, concurrency };
			let results = run(&resolver, &input, &options).await;
			let order: Vec<&str> = results.iter().map(|(d, _)| d).collect();
			assert_eq!(order, vec!["d3.example", "d1.example", "d2.example"]);
		}
	}

	#[tokio::test]
	async fn test_concurrent_matches_sequential() {
		let script = || ScriptedTransport::new()
			.with("a.example", Script::Rotate(vec![vec![ip("10.0.0.1")], vec![ip("10.0.0.2")]]))
			.with("b.example", Script::NxDomain)
			.with("c.example", Script::Rotate(vec![vec![ip("10.0.0.3")]]));
		let input = domains(&["a.example", "b.example", "c.example"]);

		let (_, sequential) = setup(script());
		let (_, concurrent) = setup(script());
		let seq = run(&sequential, &input, &BatchOptions { rounds: 2, concurrency: 1 }).await;
		let con = run(&concurrent, &input, &BatchOptions { rounds: 2, concurrency: 3 }).await;
		assert_eq!(seq, con);
	}

	#[tokio::test]
	async fn test_idempotent_on_static_records() {
		let (_, resolver) = setup(ScriptedTransport::new()
			.with("static.example", Script::Rotate(vec![vec![ip("10.0.0.9"), ip("10.0.0.8")]])));

		let input = domains(&["static.example", "gone.example"]);
		let first = run(&resolver, &input, &BatchOptions::default()).await;
		let second = run(&resolver, &input, &BatchOptions::default()).await;
		assert_eq!(first, second);
	}

	#[tokio::test]
	async fn test_duplicate_domain_keeps_first_position() {
		let (transport, resolver) = setup(ScriptedTransport::new()
			.with("dup.example", Script::Rotate(vec![vec![ip("10.0.0.1")]])));

		let input = domains(&["dup.example", "other.example", "dup.example"]);
		let results = run(&resolver, &input, &BatchOptions::default()).await;
		let order: Vec<&str> = results.iter().map(|(d, _)| d).collect();
		assert_eq!(order, vec!["dup.example", "other.example"]);
		assert_eq!(transport.calls_for("dup.example"), 6);
	}

	#[tokio::test]
	async fn test_empty_input() {
		let (_, resolver) = setup(ScriptedTransport::new());
		let results = run(&resolver, &[], &BatchOptions::default()).await;
		assert!(results.is_empty());
	}

	#[test]
	fn test_joined_rendering() {
		let set = AddressSet::Found([ip("10.0.0.2"), ip("10.0.0.1")].into_iter().collect());
		assert_eq!(set.joined(), "10.0.0.1, 10.0.0.2");
		assert_eq!(AddressSet::NoRecords.joined(), NO_RECORDS);
	}
}
