//! # forkpool-primary
//!
//! Prefork supervisor. Spawns a fixed number of worker processes and replaces
//! each one the moment it exits, whatever the reason. There is no backoff and no
//! retry limit: a crash-looping worker is respawned as fast as it dies.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use forkpool_primary::{Supervisor, SupervisorConfig};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let sup = Supervisor::new(SupervisorConfig::from_current_exe().unwrap());
//! sup.start();
//! std::future::pending::<()>().await;
//! # }
//! ```

pub mod supervisor;
pub mod types;

pub use supervisor::{Supervisor, SupervisorConfig};
pub use types::*;
