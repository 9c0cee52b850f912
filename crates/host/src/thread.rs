use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{JoinHandle, ThreadId};

use parking_lot::Mutex;
use rustc_hash::FxHashSet;

/// Spawns OS threads named `<prefix>-<n>`.
///
/// `n` starts at 1 and increases for every thread the factory names, even
/// when spawning fails, so a name is never handed out twice.
#[derive(Debug)]
pub struct ThreadFactory {
	prefix: String,
	counter: AtomicU64,
	threads: Arc<Mutex<FxHashSet<ThreadId>>>,
}

/// Removes the current thread from its factory's live set on exit, panics included.
struct Untrack(Arc<Mutex<FxHashSet<ThreadId>>>);

impl Drop for Untrack {
	fn drop(&mut self) {
		self.0.lock().remove(&std::thread::current().id());
	}
}

impl ThreadFactory {
	pub fn new(prefix: impl Into<String>) -> Self {
		Self {
			prefix: prefix.into(),
			counter: AtomicU64::new(0),
			threads: Arc::new(Mutex::new(FxHashSet::default())),
		}
	}

	pub fn prefix(&self) -> &str {
		&self.prefix
	}

	fn next_name(&self) -> String {
		let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
		format!("{}-{n}", self.prefix)
	}

	/// Spawns `f` on a new named thread.
	pub fn new_thread<F, R>(&self, f: F) -> std::io::Result<JoinHandle<R>>
	where
		F: FnOnce() -> R + Send + 'static,
		R: Send + 'static,
	{
		let name = self.next_name();
		tracing::trace!(thread = %name, "thread_factory.spawn");
		let live = self.threads.clone();
		// Held across the spawn so the thread cannot untrack before it is tracked.
		let mut threads = self.threads.lock();
		let handle = std::thread::Builder::new().name(name).spawn(move || {
			let _untrack = Untrack(live);
			f()
		})?;
		threads.insert(handle.thread().id());
		Ok(handle)
	}

	/// Whether the thread with `id` was spawned by this factory and is still
	/// running. Closing the factory forgets every thread.
	pub fn created(&self, id: ThreadId) -> bool {
		self.threads.lock().contains(&id)
	}

	/// Forgets every tracked thread. Naming continues from the current counter.
	pub fn close(&self) {
		self.threads.lock().clear();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn names_are_prefixed_and_strictly_increasing() {
		let factory = ThreadFactory::new("lineage-worker");
		let names: Vec<String> = (0..3)
			.map(|_| {
				factory
					.new_thread(|| std::thread::current().name().map(str::to_string))
					.unwrap()
					.join()
					.unwrap()
					.unwrap()
			})
			.collect();
		assert_eq!(names, ["lineage-worker-1", "lineage-worker-2", "lineage-worker-3"]);
	}

	#[test]
	fn counters_are_per_factory() {
		let a = ThreadFactory::new("a");
		let b = ThreadFactory::new("b");
		a.new_thread(|| ()).unwrap().join().unwrap();
		let name = b
			.new_thread(|| std::thread::current().name().map(str::to_string))
			.unwrap()
			.join()
			.unwrap();
		assert_eq!(name.as_deref(), Some("b-1"));
	}

	#[test]
	fn tracks_running_threads_until_closed() {
		let factory = ThreadFactory::new("tracked");
		let (release, wait) = std::sync::mpsc::channel::<()>();
		let handle = factory
			.new_thread(move || {
				let _ = wait.recv();
			})
			.unwrap();
		let id = handle.thread().id();

		assert!(factory.created(id));
		assert!(!factory.created(std::thread::current().id()));
		factory.close();
		assert!(!factory.created(id));

		release.send(()).unwrap();
		handle.join().unwrap();
	}

	#[test]
	fn finished_threads_are_forgotten() {
		let factory = ThreadFactory::new("short");
		let ids: Vec<ThreadId> = (0..50)
			.map(|_| {
				let handle = factory.new_thread(|| ()).unwrap();
				let id = handle.thread().id();
				handle.join().unwrap();
				id
			})
			.collect();

		assert!(ids.iter().all(|id| !factory.created(*id)));
		assert!(factory.threads.lock().is_empty());

		let handle = factory.new_thread(|| panic!("boom")).unwrap();
		let id = handle.thread().id();
		assert!(handle.join().is_err());
		assert!(!factory.created(id));
	}
}
