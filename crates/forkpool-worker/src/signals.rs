//! Process-level hooks that feed a [`ShutdownHandle`].
//!
//! Both hooks are process-global. Register them from a single worker per process.

use std::io;

use tokio::signal::unix::{signal, SignalKind};

use crate::state::{ShutdownHandle, Trigger};

/// Route `SIGTERM` and `SIGINT` into `handle`. Must be called inside a tokio runtime.
///
/// Once registered, the default terminate action is gone: repeated signals are
/// logged and ignored while the worker drains.
pub fn listen_for_signals(handle: ShutdownHandle) -> io::Result<()> {
	let mut sigterm = signal(SignalKind::terminate())?;
	let mut sigint = signal(SignalKind::interrupt())?;

	tokio::spawn(async move {
		loop {
			let name = tokio::select! {
				received = sigterm.recv() => match received {
					Some(()) => "SIGTERM",
					None => break,
				},
				received = sigint.recv() => match received {
					Some(()) => "SIGINT",
					None => break,
				},
			};
			handle.trigger(Trigger::Signal(name));
		}
	});

	Ok(())
}

/// Replace the panic hook so any panic, on any thread, starts draining.
///
/// Panics inside request handlers only tear down their own connection task,
/// so without this hook the worker would keep serving after a fault.
pub fn install_panic_hook(handle: ShutdownHandle) {
	std::panic::set_hook(Box::new(move |info| {
		let payload = info.payload();
		let message = if let Some(s) = payload.downcast_ref::<&str>() {
			s.to_string()
		} else if let Some(s) = payload.downcast_ref::<String>() {
			s.clone()
		} else {
			"unknown panic payload".to_string()
		};

		let thread = std::thread::current();
		let thread = thread.name().unwrap_or("<unnamed>");
		match info.location() {
			Some(loc) => tracing::error!(
				"uncaught panic in thread '{}' at {}:{}: {}",
				thread,
				loc.file(),
				loc.line(),
				message
			),
			None => tracing::error!("uncaught panic in thread '{}': {}", thread, message),
		}

		handle.trigger(Trigger::Panic(message));
	}));
}
