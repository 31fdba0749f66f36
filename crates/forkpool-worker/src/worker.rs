use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use axum::Router;
use tokio::net::{TcpListener, TcpSocket};
use tokio::task::JoinHandle;

use crate::error::WorkerError;
use crate::signals;
use crate::state::{Outcome, ShutdownHandle};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone)]
pub struct WorkerConfig {
	pub host: IpAddr,
	pub port: u16,
	/// How long in-flight requests get once draining starts.
	pub shutdown_timeout: Duration,
	pub backlog: u32,
}

impl Default for WorkerConfig {
	fn default() -> Self {
		Self {
			host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
			port: DEFAULT_PORT,
			shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
			backlog: 1024,
		}
	}
}

pub struct Worker {
	config: WorkerConfig,
	handle: ShutdownHandle,
}

impl Worker {
	pub fn new(config: WorkerConfig) -> Self {
		Self {
			config,
			handle: ShutdownHandle::new(),
		}
	}

	pub fn handle(&self) -> ShutdownHandle {
		self.handle.clone()
	}

	pub fn install_panic_hook(&self) {
		signals::install_panic_hook(self.handle());
	}

	pub fn listen_for_signals(&self) -> Result<(), WorkerError> {
		signals::listen_for_signals(self.handle()).map_err(WorkerError::Signals)
	}

	/// Bind the configured address with `SO_REUSEPORT`, so sibling workers
	/// can hold the same port and the kernel spreads connections across them.
	pub fn bind(&self) -> Result<TcpListener, WorkerError> {
		let addr = SocketAddr::new(self.config.host, self.config.port);
		bind_shared(addr, self.config.backlog).map_err(|source| WorkerError::Bind { addr, source })
	}

	pub async fn run(&self, router: Router) -> Result<Outcome, WorkerError> {
		let listener = self.bind()?;
		Ok(self.serve(listener, router).await)
	}

	/// Serve until a trigger arrives, then drain against the deadline.
	pub async fn serve(&self, listener: TcpListener, router: Router) -> Outcome {
		let pid = std::process::id();
		let port = listener
			.local_addr()
			.map(|a| a.port())
			.unwrap_or(self.config.port);

		tracing::info!("server started at port: {}, pid: {}", port, pid);

		let stop = self.handle();
		let server = tokio::spawn(async move {
			axum::serve(listener, router)
				.with_graceful_shutdown(async move { stop.draining().await })
				.await
		});

		// the server only returns once draining began, or if its task panicked,
		// in which case the panic hook has already triggered draining
		self.handle.draining().await;
		let outcome = self.drain(server, port).await;

		self.handle.finish(outcome);
		outcome
	}

	async fn drain(&self, mut server: JoinHandle<io::Result<()>>, port: u16) -> Outcome {
		let pid = std::process::id();
		match tokio::time::timeout(self.config.shutdown_timeout, &mut server).await {
			Ok(result) => {
				match result {
					Ok(Err(e)) => tracing::warn!("server on port {} stopped with error: {}", port, e),
					Err(e) => tracing::warn!("server task on port {} failed: {}", port, e),
					Ok(Ok(())) => {}
				}
				tracing::info!("server on port {} (pid: {}) closed", port, pid);
				Outcome::Graceful
			}
			Err(_) => {
				server.abort();
				tracing::error!(
					"forcing server on port {} (pid: {}) to shut down after {}ms",
					port,
					pid,
					self.config.shutdown_timeout.as_millis()
				);
				Outcome::Forced
			}
		}
	}
}

fn bind_shared(addr: SocketAddr, backlog: u32) -> io::Result<TcpListener> {
	let socket = match addr {
		SocketAddr::V4(_) => TcpSocket::new_v4()?,
		SocketAddr::V6(_) => TcpSocket::new_v6()?,
	};
	socket.set_reuseaddr(true)?;
	socket.set_reuseport(true)?;
	socket.bind(addr)?;
	socket.listen(backlog)
}
