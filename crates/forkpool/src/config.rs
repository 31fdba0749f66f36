use serde::Deserialize;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use forkpool_worker::WorkerConfig;

// ── Global config (~/.config/forkpool/config.toml) ──────────────────────────

#[derive(Debug, Clone, Deserialize, Default)]
pub struct GlobalConfig {
	#[serde(default)]
	pub server: ServerConfig,
	#[serde(default)]
	pub worker: WorkerSection,
	#[serde(default)]
	pub primary: PrimaryConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
	#[serde(default = "default_host")]
	pub host: IpAddr,
	#[serde(default = "default_port")]
	pub port: u16,
}

impl Default for ServerConfig {
	fn default() -> Self {
		Self { host: default_host(), port: default_port() }
	}
}

fn default_host() -> IpAddr { IpAddr::from([0, 0, 0, 0]) }
fn default_port() -> u16 { forkpool_worker::DEFAULT_PORT }

#[derive(Debug, Clone, Deserialize)]
pub struct WorkerSection {
	#[serde(default = "default_shutdown_timeout_ms")]
	pub shutdown_timeout_ms: u64,
	#[serde(default = "default_sample_interval_ms")]
	pub sample_interval_ms: u64,
}

impl Default for WorkerSection {
	fn default() -> Self {
		Self {
			shutdown_timeout_ms: default_shutdown_timeout_ms(),
			sample_interval_ms: default_sample_interval_ms(),
		}
	}
}

fn default_shutdown_timeout_ms() -> u64 { forkpool_worker::DEFAULT_SHUTDOWN_TIMEOUT.as_millis() as u64 }
fn default_sample_interval_ms() -> u64 { 1000 }

#[derive(Debug, Clone, Deserialize, Default)]
pub struct PrimaryConfig {
	/// Worker count; the logical CPU count when unset.
	pub workers: Option<usize>,
}

impl GlobalConfig {
	pub fn worker_config(&self) -> WorkerConfig {
		WorkerConfig {
			host: self.server.host,
			port: self.server.port,
			shutdown_timeout: Duration::from_millis(self.worker.shutdown_timeout_ms),
			..WorkerConfig::default()
		}
	}

	pub fn sample_interval(&self) -> Duration {
		Duration::from_millis(self.worker.sample_interval_ms.max(1))
	}

	pub fn workers(&self) -> usize {
		match self.primary.workers {
			Some(n) if n > 0 => n,
			_ => forkpool_primary::cpu_count(),
		}
	}
}

pub fn config_dir() -> PathBuf {
	if let Ok(dir) = std::env::var("XDG_CONFIG_HOME") {
		PathBuf::from(dir).join("forkpool")
	} else if let Ok(home) = std::env::var("HOME") {
		PathBuf::from(home).join(".config").join("forkpool")
	} else {
		PathBuf::from("/tmp").join("forkpool").join("config")
	}
}

pub fn load_global_config() -> GlobalConfig {
	let path = config_dir().join("config.toml");
	if path.exists() {
		match std::fs::read_to_string(&path) {
			Ok(content) => match toml::from_str(&content) {
				Ok(config) => return config,
				Err(e) => tracing::warn!("failed to parse {}: {}", path.display(), e),
			},
			Err(e) => tracing::warn!("failed to read {}: {}", path.display(), e),
		}
	}
	GlobalConfig::default()
}
