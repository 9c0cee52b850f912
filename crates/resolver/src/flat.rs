use std::fmt;

use tracing::trace;

use crate::cache::SymbolCache;
use crate::error::Result;
use crate::instrument::Instrumentation;
use crate::resolve::{ParentRef, Resolve, resolve_via_parent};
use crate::seed::seed_from_ancestors;
use crate::symbol::{NodeId, SymbolRef};

/// Flat caching resolver: remembers whatever its parent resolves.
///
/// No roots, no policy and no reserved namespace. Use it where tree-search
/// policy is unnecessary and the parent is trusted for every name.
pub struct CachingResolver {
	id: NodeId,
	parent: Option<ParentRef>,
	cache: SymbolCache,
}

impl CachingResolver {
	pub fn new(parent: ParentRef) -> Self {
		Self {
			id: NodeId::next(),
			parent: Some(parent),
			cache: SymbolCache::new(),
		}
	}

	/// Like [`CachingResolver::new`], with the cache seeded from the ancestors
	/// of `parent` through `instrumentation`.
	pub fn seeded(parent: ParentRef, instrumentation: &dyn Instrumentation) -> Self {
		let resolver = Self::new(parent);
		resolver.fill_cache(instrumentation);
		resolver
	}

	/// Imports the symbols `instrumentation` recorded along the parent chain.
	/// Returns how many names were added.
	pub fn fill_cache(&self, instrumentation: &dyn Instrumentation) -> usize {
		seed_from_ancestors(self.parent.as_ref(), instrumentation, |name, symbol| {
			self.cache.try_insert(name, symbol)
		})
	}

	pub fn cache(&self) -> &SymbolCache {
		&self.cache
	}
}

impl Resolve for CachingResolver {
	fn id(&self) -> NodeId {
		self.id
	}

	fn parent(&self) -> Option<&ParentRef> {
		self.parent.as_ref()
	}

	fn resolve(&self, name: &str) -> Result<SymbolRef> {
		self.cache.get_or_resolve(name, || {
			trace!(node = %self.id, symbol = name, "caching.resolve.parent");
			resolve_via_parent(self.parent.as_ref(), name)
		})
	}
}

impl fmt::Display for CachingResolver {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.parent {
			Some(parent) => write!(f, "CachingResolver({}, parent: {})", self.id, parent.id()),
			None => write!(f, "CachingResolver({}, parent: none)", self.id),
		}
	}
}
