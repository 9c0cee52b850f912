//! Per-node symbol cache with per-name exclusion.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::symbol::SymbolRef;

/// Mapping from name to resolved symbol.
///
/// Entries are write-once: the first insertion for a name wins and later
/// insertions return the stored instance. Resolution through
/// [`SymbolCache::get_or_resolve`] is serialized per name, so concurrent
/// requests for one name run the resolver once while unrelated names proceed
/// in parallel.
///
/// # Concurrency
///
/// - `entries`: `RwLock` for read-heavy lookups; never held while resolving
/// - `inflight`: one gate per name currently being resolved, removed by the
///   last caller to leave it
#[derive(Debug, Default)]
pub struct SymbolCache {
	entries: RwLock<FxHashMap<String, SymbolRef>>,
	inflight: Mutex<FxHashMap<String, Arc<Mutex<()>>>>,
}

impl SymbolCache {
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a cache pre-populated with `entries`.
	pub fn from_entries<I>(entries: I) -> Self
	where
		I: IntoIterator<Item = (String, SymbolRef)>,
	{
		let cache = Self::new();
		{
			let mut map = cache.entries.write();
			for (name, symbol) in entries {
				map.entry(name).or_insert(symbol);
			}
		}
		cache
	}

	pub fn get(&self, name: &str) -> Option<SymbolRef> {
		self.entries.read().get(name).cloned()
	}

	pub fn contains(&self, name: &str) -> bool {
		self.entries.read().contains_key(name)
	}

	/// Inserts `symbol` unless `name` is already cached, returning the stored instance.
	pub fn insert(&self, name: &str, symbol: SymbolRef) -> SymbolRef {
		let mut map = self.entries.write();
		if let Some(existing) = map.get(name) {
			return existing.clone();
		}
		map.insert(name.to_string(), symbol.clone());
		symbol
	}

	/// Like [`SymbolCache::insert`], but reports whether `name` was new.
	pub fn try_insert(&self, name: &str, symbol: SymbolRef) -> bool {
		let mut map = self.entries.write();
		if map.contains_key(name) {
			return false;
		}
		map.insert(name.to_string(), symbol);
		true
	}

	pub fn len(&self) -> usize {
		self.entries.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.read().is_empty()
	}

	/// Sorted point-in-time copy of the entries.
	pub fn snapshot(&self) -> BTreeMap<String, SymbolRef> {
		self.entries.read().iter().map(|(k, v)| (k.clone(), v.clone())).collect()
	}

	/// Structural copy: same symbol instances in a new map, no shared state.
	pub fn fork(&self) -> Self {
		Self {
			entries: RwLock::new(self.entries.read().clone()),
			inflight: Mutex::new(FxHashMap::default()),
		}
	}

	/// Returns the cached symbol for `name`, running `resolve` on a miss.
	///
	/// Callers for the same name queue behind the first; each re-checks the
	/// cache once it holds the gate. A successful result is cached, a failure
	/// is returned as-is and the next caller tries again.
	pub fn get_or_resolve<F>(&self, name: &str, resolve: F) -> Result<SymbolRef>
	where
		F: FnOnce() -> Result<SymbolRef>,
	{
		if let Some(symbol) = self.get(name) {
			return Ok(symbol);
		}

		let gate = self.inflight.lock().entry(name.to_string()).or_default().clone();

		let result = {
			let _held = gate.lock();
			match self.get(name) {
				Some(symbol) => Ok(symbol),
				None => resolve().map(|symbol| self.insert(name, symbol)),
			}
		};

		// Gate handles are only cloned and dropped under the inflight lock, so
		// a count of two (map plus ours) means nobody else is queued.
		let mut inflight = self.inflight.lock();
		if Arc::strong_count(&gate) <= 2 && inflight.get(name).is_some_and(|g| Arc::ptr_eq(g, &gate)) {
			inflight.remove(name);
		}
		drop(gate);
		drop(inflight);

		result
	}
}
