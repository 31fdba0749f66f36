//! # forkpool-worker
//!
//! Lifecycle manager for one HTTP worker process.
//!
//! A [`Worker`] binds a shared-port listener, serves an axum [`Router`](axum::Router),
//! and moves through `Running → Draining → Terminated` exactly once. Draining is
//! entered on `SIGTERM`/`SIGINT`, on any panic, or when a task spawned through
//! the [`ShutdownHandle`] fails. In-flight requests get a bounded window to
//! finish before the worker gives up on them.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use forkpool_worker::{Worker, WorkerConfig};
//! use axum::{routing::get, Router};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let worker = Worker::new(WorkerConfig::default());
//! worker.install_panic_hook();
//! worker.listen_for_signals().unwrap();
//!
//! let app = Router::new().route("/", get(|| async { "hello" }));
//! let outcome = worker.run(app).await.unwrap();
//! std::process::exit(outcome.exit_code());
//! # }
//! ```

pub mod error;
pub mod signals;
pub mod state;
pub mod worker;

pub use error::WorkerError;
pub use state::{Outcome, ShutdownHandle, Trigger, WorkerState};
pub use worker::{Worker, WorkerConfig, DEFAULT_PORT, DEFAULT_SHUTDOWN_TIMEOUT};
