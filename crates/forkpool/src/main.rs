mod api;
mod config;
mod metrics;

use std::sync::Arc;

use forkpool_primary::{Supervisor, SupervisorConfig};
use forkpool_worker::Worker;

use crate::config::GlobalConfig;
use crate::metrics::Metrics;

#[tokio::main]
async fn main() {
	tracing_subscriber::fmt().init();

	let global_config = config::load_global_config();

	let code = if forkpool_primary::is_worker() {
		run_worker(&global_config).await
	} else {
		run_primary(&global_config).await
	};
	std::process::exit(code);
}

/// Never returns unless the workers cannot be launched at all.
async fn run_primary(config: &GlobalConfig) -> i32 {
	let mut supervisor_config = match SupervisorConfig::from_current_exe() {
		Ok(c) => c,
		Err(e) => {
			tracing::error!("cannot locate own executable: {}", e);
			return 1;
		}
	};
	supervisor_config.workers = config.workers();

	let supervisor = Supervisor::new(supervisor_config);
	supervisor.start();

	std::future::pending::<i32>().await
}

async fn run_worker(config: &GlobalConfig) -> i32 {
	let worker = Worker::new(config.worker_config());
	worker.install_panic_hook();
	if let Err(e) = worker.listen_for_signals() {
		tracing::error!("worker {} failed to start: {}", std::process::id(), e);
		return 1;
	}

	let metrics = Arc::new(Metrics::new(forkpool_primary::cpu_count()));
	{
		let metrics = Arc::clone(&metrics);
		let interval = config.sample_interval();
		worker.handle().spawn(async move { metrics.sample(interval).await });
	}

	match worker.run(api::router(metrics)).await {
		Ok(outcome) => outcome.exit_code(),
		Err(e) => {
			tracing::error!("worker {} failed to start: {}", std::process::id(), e);
			1
		}
	}
}
