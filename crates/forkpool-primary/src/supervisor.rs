use std::collections::HashMap;
use std::os::unix::process::ExitStatusExt;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::{Child, Command};
use tokio::sync::RwLock;

use crate::types::*;

/// Pause after the OS refuses to spawn a worker at all. Worker exits never wait.
const SPAWN_RETRY_DELAY: Duration = Duration::from_secs(1);

pub struct SupervisorConfig {
	pub workers: usize,
	pub command: WorkerCommand,
}

impl SupervisorConfig {
	/// One worker per logical CPU, each re-running the current binary.
	pub fn from_current_exe() -> std::io::Result<Self> {
		Ok(Self {
			workers: cpu_count(),
			command: WorkerCommand::current_exe()?,
		})
	}
}

pub struct Supervisor {
	pub config: SupervisorConfig,
	slots: RwLock<HashMap<usize, LiveWorker>>,
	next_id: AtomicU64,
	spawned: AtomicU64,
}

struct LiveWorker {
	id: u64,
	pid: u32,
	started_at: Instant,
}

impl Supervisor {
	pub fn new(config: SupervisorConfig) -> Arc<Self> {
		Arc::new(Self {
			config,
			slots: RwLock::new(HashMap::new()),
			next_id: AtomicU64::new(1),
			spawned: AtomicU64::new(0),
		})
	}

	/// Fill every slot. Each slot runs its own respawn loop for as long as the
	/// runtime lives; there is no stop.
	pub fn start(self: &Arc<Self>) {
		tracing::info!(
			"primary {} is running, starting {} workers",
			std::process::id(),
			self.config.workers
		);

		for slot in 0..self.config.workers {
			let sup = Arc::clone(self);
			tokio::spawn(async move {
				run_slot_loop(sup, slot).await;
			});
		}
	}

	pub async fn status(&self) -> Vec<WorkerStatus> {
		let slots = self.slots.read().await;
		let mut result: Vec<WorkerStatus> = slots
			.iter()
			.map(|(slot, w)| WorkerStatus {
				slot: *slot,
				id: w.id,
				pid: w.pid,
				uptime_secs: w.started_at.elapsed().as_secs(),
			})
			.collect();
		result.sort_by_key(|w| w.slot);
		result
	}

	pub async fn live_workers(&self) -> usize {
		self.slots.read().await.len()
	}

	/// Workers spawned since start, replacements included.
	pub fn spawned(&self) -> u64 {
		self.spawned.load(Ordering::SeqCst)
	}
}

async fn run_slot_loop(supervisor: Arc<Supervisor>, slot: usize) {
	loop {
		let id = supervisor.next_id.fetch_add(1, Ordering::SeqCst);
		let mut child = match spawn_worker(&supervisor.config.command, id) {
			Ok(c) => c,
			Err(e) => {
				tracing::error!("failed to fork worker {} for slot {}: {}", id, slot, e);
				tokio::time::sleep(SPAWN_RETRY_DELAY).await;
				continue;
			}
		};

		let pid = child.id().unwrap_or(0);
		supervisor.spawned.fetch_add(1, Ordering::SeqCst);
		{
			let mut slots = supervisor.slots.write().await;
			slots.insert(
				slot,
				LiveWorker {
					id,
					pid,
					started_at: Instant::now(),
				},
			);
		}
		tracing::debug!("forked worker {} (pid {}) into slot {}", id, pid, slot);

		let exit = child.wait().await;

		supervisor.slots.write().await.remove(&slot);

		match exit {
			Ok(status) => tracing::warn!(
				"worker {} died (code {:?}, signal {:?}). forking a new worker...",
				pid,
				status.code(),
				status.signal()
			),
			Err(e) => tracing::warn!(
				"worker {} died ({}). forking a new worker...",
				pid,
				e
			),
		}
	}
}

fn spawn_worker(command: &WorkerCommand, id: u64) -> Result<Child, String> {
	let mut cmd = Command::new(&command.program);
	cmd.args(&command.args)
		.env(WORKER_ID_ENV, id.to_string())
		.stdin(Stdio::null())
		.stdout(Stdio::inherit())
		.stderr(Stdio::inherit())
		.kill_on_drop(true);

	exit_with_parent(&mut cmd);

	cmd.spawn()
		.map_err(|e| format!("spawn {} failed: {}", command.program.display(), e))
}

/// Workers get SIGTERM when the primary dies, so they drain instead of lingering.
#[cfg(target_os = "linux")]
fn exit_with_parent(cmd: &mut Command) {
	// SAFETY: the closure only issues prctl(2), which is async-signal-safe.
	unsafe {
		cmd.pre_exec(|| {
			use nix::sys::signal::Signal;
			nix::sys::prctl::set_pdeathsig(Signal::SIGTERM).map_err(std::io::Error::from)
		});
	}
}

#[cfg(not(target_os = "linux"))]
fn exit_with_parent(_cmd: &mut Command) {}
