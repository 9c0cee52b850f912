//! Priority-ordered exit hooks.
//!
//! Hooks run once, lowest priority first; hooks with equal priority run in
//! registration order. The process-wide registry from [`hooks`] runs when the
//! [`ExitGuard`] returned by [`exit_guard`] drops, which `main` holds for the
//! life of the program.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::{debug, warn};

/// Handle returned by [`ShutdownHooks::add_hook`], used to remove the hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

struct Hook {
	id: HookId,
	priority: i32,
	action: Box<dyn FnOnce() + Send>,
}

#[derive(Default)]
struct HookState {
	hooks: Vec<Hook>,
	next_id: u64,
}

/// Registry of actions to run at shutdown.
#[derive(Default)]
pub struct ShutdownHooks {
	state: Mutex<HookState>,
	shut_down: AtomicBool,
}

impl ShutdownHooks {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `action` to run at shutdown. Lower priorities run first.
	pub fn add_hook(&self, priority: i32, action: impl FnOnce() + Send + 'static) -> HookId {
		let mut state = self.state.lock();
		let id = HookId(state.next_id);
		state.next_id += 1;
		state.hooks.push(Hook {
			id,
			priority,
			action: Box::new(action),
		});
		id
	}

	/// Removes a hook that has not run yet. Returns whether it was registered.
	pub fn remove_hook(&self, id: HookId) -> bool {
		let mut state = self.state.lock();
		let before = state.hooks.len();
		state.hooks.retain(|hook| hook.id != id);
		state.hooks.len() != before
	}

	pub fn len(&self) -> usize {
		self.state.lock().hooks.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// True once [`ShutdownHooks::run`] has started.
	pub fn is_shutdown(&self) -> bool {
		self.shut_down.load(Ordering::Acquire)
	}

	/// Runs every registered hook once and returns how many ran.
	///
	/// Later calls run nothing. A panicking hook is logged and does not stop
	/// the remaining hooks.
	pub fn run(&self) -> usize {
		if self.shut_down.swap(true, Ordering::AcqRel) {
			return 0;
		}
		let mut hooks = std::mem::take(&mut self.state.lock().hooks);
		// Stable: equal priorities keep registration order.
		hooks.sort_by_key(|hook| hook.priority);

		let count = hooks.len();
		for hook in hooks {
			debug!(priority = hook.priority, id = hook.id.0, "shutdown.hook");
			if catch_unwind(AssertUnwindSafe(hook.action)).is_err() {
				warn!(priority = hook.priority, id = hook.id.0, "shutdown hook panicked");
			}
		}
		count
	}
}

impl std::fmt::Debug for ShutdownHooks {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ShutdownHooks")
			.field("pending", &self.len())
			.field("shut_down", &self.is_shutdown())
			.finish()
	}
}

/// The process-wide hook registry.
pub fn hooks() -> &'static ShutdownHooks {
	static HOOKS: OnceLock<ShutdownHooks> = OnceLock::new();
	HOOKS.get_or_init(ShutdownHooks::new)
}

/// Runs the process-wide hooks when dropped.
#[must_use = "hooks run when the guard drops"]
#[derive(Debug)]
pub struct ExitGuard(());

/// Returns a guard that runs [`hooks`] on drop. Hold it in `main`.
pub fn exit_guard() -> ExitGuard {
	ExitGuard(())
}

impl Drop for ExitGuard {
	fn drop(&mut self) {
		hooks().run();
	}
}
