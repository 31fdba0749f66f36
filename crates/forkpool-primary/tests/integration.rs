use std::collections::HashSet;
use std::os::unix::fs::PermissionsExt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

use forkpool_primary::types::*;
use forkpool_primary::supervisor::{Supervisor, SupervisorConfig};

fn sleeper_supervisor(workers: usize) -> Arc<Supervisor> {
	Supervisor::new(SupervisorConfig {
		workers,
		command: WorkerCommand::new("sleep").arg("30"),
	})
}

async fn wait_for<F>(sup: &Supervisor, what: &str, check: F)
where
	F: Fn(&[WorkerStatus], u64) -> bool,
{
	for _ in 0..100 {
		let status = sup.status().await;
		if check(&status, sup.spawned()) {
			return;
		}
		tokio::time::sleep(Duration::from_millis(50)).await;
	}
	panic!("timed out waiting for {}", what);
}

async fn wait_for_live(sup: &Supervisor, n: usize) {
	wait_for(sup, &format!("{} live workers", n), |status, _| status.len() == n).await;
}

fn pids(status: &[WorkerStatus]) -> HashSet<u32> {
	status.iter().map(|w| w.pid).collect()
}

async fn live_pids(sup: &Supervisor) -> HashSet<u32> {
	pids(&sup.status().await)
}

// --- Start ---

#[tokio::test]
async fn start_fills_every_slot() {
	let sup = sleeper_supervisor(3);
	sup.start();

	wait_for_live(&sup, 3).await;

	let status = sup.status().await;
	assert_eq!(status.iter().map(|w| w.slot).collect::<Vec<_>>(), vec![0, 1, 2]);
	assert_eq!(live_pids(&sup).await.len(), 3);
	assert!(status.iter().all(|w| w.pid > 0));
	assert_eq!(sup.spawned(), 3);
}

#[tokio::test]
async fn worker_ids_are_unique() {
	let sup = sleeper_supervisor(4);
	sup.start();
	wait_for_live(&sup, 4).await;

	let ids: HashSet<u64> = sup.status().await.into_iter().map(|w| w.id).collect();
	assert_eq!(ids.len(), 4);
	assert!(ids.iter().all(|id| *id >= 1));
}

#[tokio::test]
async fn default_config_targets_cpu_count() {
	let config = SupervisorConfig::from_current_exe().unwrap();
	assert_eq!(config.workers, cpu_count());
	assert!(config.command.args.is_empty());
}

// --- OnWorkerExit ---

#[tokio::test]
async fn killed_worker_is_replaced_exactly_once() {
	let sup = sleeper_supervisor(2);
	sup.start();
	wait_for_live(&sup, 2).await;

	let before = live_pids(&sup).await;
	let victim = *before.iter().next().unwrap();
	kill(Pid::from_raw(victim as i32), Signal::SIGKILL).unwrap();

	wait_for(&sup, "replacement worker", |status, _| {
		status.len() == 2 && !pids(status).contains(&victim)
	})
	.await;

	assert_eq!(sup.spawned(), 3);
	let after = live_pids(&sup).await;
	assert_eq!(after.intersection(&before).count(), 1);
}

#[tokio::test]
async fn every_exit_kind_is_replaced() {
	let sup = sleeper_supervisor(3);
	sup.start();
	wait_for_live(&sup, 3).await;

	let original = live_pids(&sup).await;
	let signals = [Signal::SIGTERM, Signal::SIGINT, Signal::SIGKILL];
	for (pid, sig) in original.iter().zip(signals) {
		kill(Pid::from_raw(*pid as i32), sig).unwrap();
	}

	wait_for(&sup, "3 replacements", |status, _| {
		status.len() == 3 && pids(status).is_disjoint(&original)
	})
	.await;
	assert_eq!(sup.spawned(), 6);
}

#[tokio::test]
async fn clean_exits_are_respawned_without_backoff() {
	let sup = Supervisor::new(SupervisorConfig {
		workers: 1,
		command: WorkerCommand::new("true"),
	});
	sup.start();

	wait_for(&sup, "several respawns", |_, spawned| spawned >= 5).await;
}

#[tokio::test]
async fn worker_id_is_exported_to_the_child() {
	let sup = Supervisor::new(SupervisorConfig {
		workers: 1,
		command: WorkerCommand::new("sh")
			.arg("-c")
			.arg(format!("test -n \"${}\" && exec sleep 30", WORKER_ID_ENV)),
	});
	sup.start();

	// with the variable missing, `sh` would exit at once and be replaced repeatedly
	wait_for_live(&sup, 1).await;
	tokio::time::sleep(Duration::from_millis(300)).await;
	assert_eq!(sup.spawned(), 1);
}

// --- Spawn failure ---

#[tokio::test]
async fn spawn_failure_waits_then_retries() {
	let dir = std::env::temp_dir().join(format!("forkpool-primary-test-{}-retry", std::process::id()));
	let _ = std::fs::remove_dir_all(&dir);
	std::fs::create_dir_all(&dir).unwrap();
	let script = dir.join("worker.sh");

	let sup = Supervisor::new(SupervisorConfig {
		workers: 1,
		command: WorkerCommand::new(&script),
	});
	let started = Instant::now();
	sup.start();

	tokio::time::sleep(Duration::from_millis(300)).await;
	assert_eq!(sup.spawned(), 0);
	assert_eq!(sup.live_workers().await, 0);

	// the program appears after the first attempt failed
	let staged = dir.join("worker.sh.tmp");
	std::fs::write(&staged, "#!/bin/sh\nexec sleep 30\n").unwrap();
	std::fs::set_permissions(&staged, std::fs::Permissions::from_mode(0o755)).unwrap();
	std::fs::rename(&staged, &script).unwrap();

	// the slot is still paused, not spinning on the failure
	tokio::time::sleep(Duration::from_millis(400)).await;
	assert_eq!(sup.spawned(), 0);

	wait_for_live(&sup, 1).await;
	assert_eq!(sup.spawned(), 1);
	assert!(started.elapsed() >= Duration::from_millis(900), "retried after {:?}", started.elapsed());

	let _ = std::fs::remove_dir_all(&dir);
}
