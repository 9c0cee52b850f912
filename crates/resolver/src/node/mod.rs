//! Hierarchical resolution node.
//!
//! A [`ResolutionNode`] resolves names against its own roots and its parent,
//! in an order controlled by the reserved namespace and its [`Policy`]:
//!
//! 1. cached symbol, if any
//! 2. reserved names go to the parent unconditionally
//! 3. names the policy forces to the parent go there
//! 4. otherwise the node's own roots, then the parent
//!
//! Every success is cached at the node that was asked, including results
//! that came from the parent. Descendants seeded later rely on that.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use crate::cache::SymbolCache;
use crate::error::Result;
use crate::instrument::{Instrumentation, NoInstrumentation};
use crate::locator::Root;
use crate::policy::{Policy, ReservedNamespace};
use crate::resolve::{ParentRef, Resolve, resolve_via_parent};
use crate::seed::seed_from_ancestors;
use crate::symbol::{NodeId, SymbolRef};


/// Builder for [`ResolutionNode`].
///
/// The parent chain reachable from [`NodeBuilder::parent`] must be acyclic.
pub struct NodeBuilder {
	roots: Vec<Root>,
	policy: Arc<Policy>,
	reserved: ReservedNamespace,
	parent: Option<ParentRef>,
	instrumentation: Arc<dyn Instrumentation>,
	cache: SymbolCache,
}

impl Default for NodeBuilder {
	fn default() -> Self {
		Self {
			roots: Vec::new(),
			policy: Arc::new(Policy::default()),
			reserved: ReservedNamespace::default(),
			parent: None,
			instrumentation: Arc::new(NoInstrumentation),
			cache: SymbolCache::new(),
		}
	}
}

impl NodeBuilder {
	pub fn root(mut self, root: Root) -> Self {
		self.roots.push(root);
		self
	}

	pub fn roots(mut self, roots: impl IntoIterator<Item = Root>) -> Self {
		self.roots.extend(roots);
		self
	}

	pub fn policy(mut self, policy: Policy) -> Self {
		self.policy = Arc::new(policy);
		self
	}

	pub fn reserved(mut self, reserved: ReservedNamespace) -> Self {
		self.reserved = reserved;
		self
	}

	pub fn parent(mut self, parent: ParentRef) -> Self {
		self.parent = Some(parent);
		self
	}

	pub fn instrumentation(mut self, instrumentation: Arc<dyn Instrumentation>) -> Self {
		self.instrumentation = instrumentation;
		self
	}

	/// Starts the node with a pre-populated cache. A non-empty cache skips
	/// seeding from ancestors.
	pub fn cache(mut self, cache: SymbolCache) -> Self {
		self.cache = cache;
		self
	}

	/// Validates every root and builds the node.
	///
	/// # Errors
	///
	/// Returns [`crate::ResolveError::MalformedRoot`] for the first root that
	/// fails validation.
	pub fn build(self) -> Result<ResolutionNode> {
		for root in &self.roots {
			root.validate()?;
		}
		Ok(ResolutionNode::assemble(
			self.roots,
			self.policy,
			self.reserved,
			self.parent,
			self.instrumentation,
			self.cache,
		))
	}
}

/// Tree node resolving names to symbols with its own roots, policy and cache.
pub struct ResolutionNode {
	id: NodeId,
	roots: RwLock<Vec<Root>>,
	policy: Arc<Policy>,
	reserved: ReservedNamespace,
	parent: Option<ParentRef>,
	instrumentation: Arc<dyn Instrumentation>,
	cache: SymbolCache,
}

impl ResolutionNode {
	pub fn builder() -> NodeBuilder {
		NodeBuilder::default()
	}

	fn assemble(
		roots: Vec<Root>,
		policy: Arc<Policy>,
		reserved: ReservedNamespace,
		parent: Option<ParentRef>,
		instrumentation: Arc<dyn Instrumentation>,
		cache: SymbolCache,
	) -> Self {
		let seed = cache.is_empty();
		let node = Self {
			id: NodeId::next(),
			roots: RwLock::new(roots),
			policy,
			reserved,
			parent,
			instrumentation,
			cache,
		};
		if seed {
			node.fill_cache();
		}
		node
	}

	/// Imports every symbol the instrumentation recorded along the parent
	/// chain. Names already cached keep their instance. Returns how many
	/// names were added.
	pub fn fill_cache(&self) -> usize {
		seed_from_ancestors(self.parent.as_ref(), self.instrumentation.as_ref(), |name, symbol| {
			self.cache.try_insert(name, symbol)
		})
	}

	fn fork_with(&self, roots: Vec<Root>, policy: Arc<Policy>) -> Self {
		Self::assemble(
			roots,
			policy,
			self.reserved.clone(),
			self.parent.clone(),
			self.instrumentation.clone(),
			self.cache.fork(),
		)
	}

	/// New node with `roots` in place of this node's roots.
	pub fn fork_roots(&self, roots: Vec<Root>) -> Result<Self> {
		for root in &roots {
			root.validate()?;
		}
		Ok(self.fork_with(roots, self.policy.clone()))
	}

	/// New node whose policy is `transform` applied to this node's policy.
	pub fn fork_policy(&self, transform: impl FnOnce(&Policy) -> Policy) -> Self {
		let policy = Arc::new(transform(&self.policy));
		self.fork_with(self.roots(), policy)
	}

	/// New node identical to this one except for owning a separate cache copy.
	pub fn fork_cache(&self) -> Self {
		self.fork_with(self.roots(), self.policy.clone())
	}

	/// Appends a root. A malformed root is rejected and leaves the node unchanged.
	pub fn add_root(&self, root: Root) -> Result<()> {
		root.validate()?;
		trace!(node = %self.id, root = %root, "node.add_root");
		self.roots.write().push(root);
		Ok(())
	}

	/// Caches `symbol` under `name` unless the name is already cached.
	/// Returns the instance the cache holds afterwards.
	pub fn insert_cached(&self, name: &str, symbol: SymbolRef) -> SymbolRef {
		self.cache.insert(name, symbol)
	}

	/// Snapshot of the cache, sorted by name.
	pub fn cached_symbols(&self) -> std::collections::BTreeMap<String, SymbolRef> {
		self.cache.snapshot()
	}

	pub fn cache_len(&self) -> usize {
		self.cache.len()
	}

	pub fn roots(&self) -> Vec<Root> {
		self.roots.read().clone()
	}

	pub fn policy(&self) -> &Policy {
		&self.policy
	}

	pub fn reserved(&self) -> &ReservedNamespace {
		&self.reserved
	}

	fn resolve_uncached(&self, name: &str) -> Result<SymbolRef> {
		if self.reserved.contains(name) {
			trace!(node = %self.id, symbol = name, "node.resolve.reserved");
			return resolve_via_parent(self.parent.as_ref(), name);
		}
		if self.policy.delegates_to_parent(name) {
			trace!(node = %self.id, symbol = name, "node.resolve.force_parent");
			return resolve_via_parent(self.parent.as_ref(), name);
		}
		match self.find_in_roots(name)? {
			Some(symbol) => Ok(symbol),
			None => {
				trace!(node = %self.id, symbol = name, "node.resolve.fallback_parent");
				resolve_via_parent(self.parent.as_ref(), name)
			}
		}
	}

	fn find_in_roots(&self, name: &str) -> Result<Option<SymbolRef>> {
		for root in self.roots() {
			if let Some(symbol) = root.locate(name)? {
				trace!(node = %self.id, symbol = name, root = %root, "node.resolve.self");
				return Ok(Some(symbol));
			}
		}
		Ok(None)
	}
}

impl Resolve for ResolutionNode {
	fn id(&self) -> NodeId {
		self.id
	}

	fn parent(&self) -> Option<&ParentRef> {
		self.parent.as_ref()
	}

	fn resolve(&self, name: &str) -> Result<SymbolRef> {
		let mut fresh = false;
		let symbol = self.cache.get_or_resolve(name, || {
			fresh = true;
			self.resolve_uncached(name)
		})?;
		// Record what the cache kept, which may predate this lookup.
		if fresh {
			self.instrumentation.record_resolved(self, &symbol);
		}
		Ok(symbol)
	}
}

impl Drop for ResolutionNode {
	fn drop(&mut self) {
		self.instrumentation.node_dropped(self.id);
	}
}

impl fmt::Display for ResolutionNode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "ResolutionNode({}, [", self.id)?;
		for (i, root) in self.roots.read().iter().enumerate() {
			if i > 0 {
				f.write_str(", ")?;
			}
			write!(f, "{root}")?;
		}
		f.write_str("], parent: ")?;
		match &self.parent {
			Some(parent) => write!(f, "{})", parent.id()),
			None => f.write_str("none)"),
		}
	}
}

impl fmt::Debug for ResolutionNode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ResolutionNode")
			.field("id", &self.id)
			.field("roots", &*self.roots.read())
			.field("reserved", &self.reserved)
			.field("parent", &self.parent.as_ref().map(|p| p.id()))
			.field("cached", &self.cache.len())
			.finish_non_exhaustive()
	}
}
