use std::path::PathBuf;

/// Set on every spawned worker. Holds the worker id, starting at 1.
pub const WORKER_ID_ENV: &str = "FORKPOOL_WORKER_ID";

/// The worker id this process was spawned with, if it is a worker.
pub fn worker_id() -> Option<u64> {
	std::env::var(WORKER_ID_ENV).ok().and_then(|v| v.trim().parse().ok())
}

pub fn is_worker() -> bool {
	worker_id().is_some()
}

/// Logical CPUs on this host; the default worker count.
pub fn cpu_count() -> usize {
	num_cpus::get()
}

/// What the supervisor runs for each worker.
#[derive(Debug, Clone)]
pub struct WorkerCommand {
	pub program: PathBuf,
	pub args: Vec<String>,
}

impl WorkerCommand {
	pub fn new(program: impl Into<PathBuf>) -> Self {
		Self {
			program: program.into(),
			args: Vec::new(),
		}
	}

	pub fn arg(mut self, arg: impl Into<String>) -> Self {
		self.args.push(arg.into());
		self
	}

	/// Re-run the current binary; it tells itself apart via [`WORKER_ID_ENV`].
	pub fn current_exe() -> std::io::Result<Self> {
		std::env::current_exe().map(Self::new)
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerStatus {
	pub slot: usize,
	pub id: u64,
	pub pid: u32,
	pub uptime_secs: u64,
}
