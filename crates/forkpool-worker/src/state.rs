use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

/// What moved the worker out of `Running`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
	Signal(&'static str),
	Panic(String),
	Rejection(String),
	Requested,
}

impl fmt::Display for Trigger {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Trigger::Signal(name) => write!(f, "received {}", name),
			Trigger::Panic(msg) => write!(f, "panic: {}", msg),
			Trigger::Rejection(msg) => write!(f, "unhandled rejection: {}", msg),
			Trigger::Requested => write!(f, "shutdown requested"),
		}
	}
}

/// How draining ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
	/// Every in-flight request finished before the deadline.
	Graceful,
	/// The deadline fired first; remaining requests were abandoned.
	Forced,
}

impl Outcome {
	pub fn exit_code(self) -> i32 {
		match self {
			Outcome::Graceful => 0,
			Outcome::Forced => 1,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerState {
	Running,
	Draining(Trigger),
	Terminated(Outcome),
}

impl WorkerState {
	pub fn is_running(&self) -> bool {
		matches!(self, WorkerState::Running)
	}
}

/// Shared view of one worker's lifecycle.
///
/// Clones observe and drive the same state. Only the first [`trigger`](Self::trigger)
/// leaves `Running`; every later one is ignored.
#[derive(Clone)]
pub struct ShutdownHandle {
	state: Arc<watch::Sender<WorkerState>>,
}

impl Default for ShutdownHandle {
	fn default() -> Self {
		Self::new()
	}
}

impl ShutdownHandle {
	pub fn new() -> Self {
		let (sender, _) = watch::channel(WorkerState::Running);
		Self {
			state: Arc::new(sender),
		}
	}

	pub fn state(&self) -> WorkerState {
		self.state.borrow().clone()
	}

	pub fn is_running(&self) -> bool {
		self.state.borrow().is_running()
	}

	/// Enter `Draining`. Returns `false` if the worker had already left `Running`.
	pub fn trigger(&self, trigger: Trigger) -> bool {
		let reason = trigger.to_string();
		let entered = self.state.send_if_modified(move |state| {
			if state.is_running() {
				*state = WorkerState::Draining(trigger);
				true
			} else {
				false
			}
		});

		let pid = std::process::id();
		if entered {
			tracing::info!("worker {} shutting down ({})", pid, reason);
		} else {
			tracing::debug!("worker {} already shutting down, ignoring: {}", pid, reason);
		}
		entered
	}

	pub fn shutdown(&self) -> bool {
		self.trigger(Trigger::Requested)
	}

	/// Resolves once the worker has left `Running`.
	pub async fn draining(&self) {
		let mut receiver = self.state.subscribe();
		while receiver.borrow().is_running() {
			if receiver.changed().await.is_err() {
				break;
			}
		}
	}

	/// Spawn a background task whose failure drains the worker.
	pub fn spawn<F, E>(&self, task: F) -> JoinHandle<()>
	where
		F: Future<Output = Result<(), E>> + Send + 'static,
		E: fmt::Display + Send + 'static,
	{
		let handle = self.clone();
		tokio::spawn(async move {
			if let Err(e) = task.await {
				tracing::error!("unhandled rejection: {}", e);
				handle.trigger(Trigger::Rejection(e.to_string()));
			}
		})
	}

	pub(crate) fn finish(&self, outcome: Outcome) {
		self.state.send_modify(|state| *state = WorkerState::Terminated(outcome));
	}
}
