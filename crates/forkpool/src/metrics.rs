//! Process and host figures for `GET /status`.
//!
//! Memory is read by a background sampler so the handler never touches `/proc`.

use serde::Serialize;
use std::time::{Duration, Instant};
use sysinfo::System;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryUsage {
	/// Resident set size, bytes.
	pub rss: u64,
	/// Virtual memory size, bytes.
	pub virtual_memory: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
	pub pid: u32,
	pub memory_usage: MemoryUsage,
	/// Seconds since this worker started.
	pub uptime: f64,
	/// 1, 5 and 15 minute host load averages.
	pub load_average: [f64; 3],
	pub cpu_count: usize,
}

pub struct Metrics {
	cpu_count: usize,
	started_at: Instant,
	memory: RwLock<MemoryUsage>,
}

impl Metrics {
	pub fn new(cpu_count: usize) -> Self {
		Self {
			cpu_count,
			started_at: Instant::now(),
			memory: RwLock::new(MemoryUsage::default()),
		}
	}

	pub async fn status(&self) -> Status {
		let load = System::load_average();
		Status {
			pid: std::process::id(),
			memory_usage: *self.memory.read().await,
			uptime: self.started_at.elapsed().as_secs_f64(),
			load_average: [load.one, load.five, load.fifteen],
			cpu_count: self.cpu_count,
		}
	}

	/// Refresh memory figures every `interval` until the process can no longer
	/// be inspected.
	pub async fn sample(&self, interval: Duration) -> Result<(), String> {
		let pid = sysinfo::get_current_pid().map_err(|e| format!("cannot resolve own pid: {}", e))?;
		let mut sys = System::new();

		loop {
			if !sys.refresh_process(pid) {
				return Err(format!("process {} disappeared from the process table", pid));
			}
			let usage = sys
				.process(pid)
				.map(|p| MemoryUsage {
					rss: p.memory(),
					virtual_memory: p.virtual_memory(),
				})
				.ok_or_else(|| format!("process {} has no memory info", pid))?;

			*self.memory.write().await = usage;
			tokio::time::sleep(interval).await;
		}
	}
}
