use std::io;
use std::net::SocketAddr;

/// Errors that keep a worker from reaching `Running`.
#[derive(Debug)]
pub enum WorkerError {
	/// The listener could not be created or bound.
	Bind { addr: SocketAddr, source: io::Error },
	/// Signal handlers could not be registered.
	Signals(io::Error),
}

impl std::fmt::Display for WorkerError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			WorkerError::Bind { addr, source } => write!(f, "failed to bind {}: {}", addr, source),
			WorkerError::Signals(e) => write!(f, "failed to register signal handlers: {}", e),
		}
	}
}

impl std::error::Error for WorkerError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			WorkerError::Bind { source, .. } => Some(source),
			WorkerError::Signals(e) => Some(e),
		}
	}
}
