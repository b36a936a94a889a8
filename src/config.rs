use std::path::Path;

use tracing::info;

use crate::error::ConfigError;
use crate::proxy::ProxyEndpoint;

/// Contents written when the settings file does not exist yet.
const DEFAULT_SETTINGS: &str = "[proxy]\nhost = \nport = \n";

/// Proxy settings from the `[proxy]` section of the settings file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxySettings {
	pub host: String,
	pub port: String,
}

impl ProxySettings {
	/// The configured endpoint, or None when host or port is left empty.
	pub fn endpoint(&self) -> Result<Option<ProxyEndpoint>, ConfigError> {
		if self.host.is_empty() || self.port.is_empty() {
			return Ok(None);
		}
		let port: u16 = self.port.parse()
			.map_err(|_| ConfigError::InvalidPort(self.port.clone()))?;
		Ok(Some(ProxyEndpoint { host: self.host.clone(), port }))
	}
}

/// Extract `host` and `port` from the `[proxy]` section of INI text.
///
/// Other sections, comment lines (`;` or `#`) and unknown keys are ignored.
/// Both `=` and `:` separate keys from values.
pub fn parse_settings(content: &str) -> ProxySettings {
	let mut settings = ProxySettings::default();
	let mut in_proxy = false;
	for line in content.lines() {
		let trimmed = line.trim();
		if trimmed.is_empty() || trimmed.starts_with(';') || trimmed.starts_with('#') {
			continue;
		}
		if let Some(section) = trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
			in_proxy = section.trim().eq_ignore_ascii_case("proxy");
			continue;
		}
		if !in_proxy {
			continue;
		}
		let Some((key, value)) = trimmed.split_once(|c: char| c == '=' || c == ':') else {
			continue;
		};
		match key.trim().to_ascii_lowercase().as_str() {
			"host" => settings.host = value.trim().to_string(),
			"port" => settings.port = value.trim().to_string(),
			_ => {}
		}
	}
	settings
}

/// Load proxy settings, creating the file with empty values if it is missing.
pub fn load_or_create(path: &str) -> Result<ProxySettings, ConfigError> {
	let io_err = |source| ConfigError::Io { path: path.to_string(), source };

	if !Path::new(path).exists() {
		std::fs::write(path, DEFAULT_SETTINGS).map_err(io_err)?;
		info!(path, "settings file created");
		return Ok(ProxySettings::default());
	}

	let content = std::fs::read_to_string(path).map_err(io_err)?;
	info!(path, "settings file loaded");
	Ok(parse_settings(&content))
}
