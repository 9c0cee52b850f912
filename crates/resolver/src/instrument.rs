//! The host's introspection facility, as seen by resolver nodes.

use indexmap::IndexMap;
use parking_lot::RwLock;
use rustc_hash::{FxBuildHasher, FxHashMap};

use crate::resolve::Resolve;
use crate::symbol::{NodeId, SymbolRef};

/// Enumerates symbols the host has already materialized for a node.
///
/// The answer is independent of the node's own cache: it reflects what the
/// host recorded while the node was resolving names.
pub trait Instrumentation: Send + Sync {
	/// Symbols already resolved at `node`, in recording order.
	fn enumerate_resolved(&self, node: &dyn Resolve) -> Vec<SymbolRef>;

	/// Called after `node` freshly resolved `symbol`.
	fn record_resolved(&self, _node: &dyn Resolve, _symbol: &SymbolRef) {}

	/// Called once when the node with `node` id is dropped.
	fn node_dropped(&self, _node: NodeId) {}
}

/// Collaborator for hosts without introspection: nothing is ever enumerated.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoInstrumentation;

impl Instrumentation for NoInstrumentation {
	fn enumerate_resolved(&self, _node: &dyn Resolve) -> Vec<SymbolRef> {
		Vec::new()
	}
}

type Recorded = IndexMap<String, SymbolRef, FxBuildHasher>;

/// In-memory collaborator that records every resolution per node.
///
/// A node's record lives until the node is dropped.
#[derive(Debug, Default)]
pub struct ResolutionTracker {
	initiated: RwLock<FxHashMap<NodeId, Recorded>>,
}

impl ResolutionTracker {
	pub fn new() -> Self {
		Self::default()
	}

	/// Drops everything recorded for `node`.
	pub fn forget(&self, node: NodeId) {
		self.initiated.write().remove(&node);
	}

	/// Number of symbols recorded for `node`.
	pub fn recorded(&self, node: NodeId) -> usize {
		self.initiated.read().get(&node).map_or(0, IndexMap::len)
	}

	/// Number of nodes with at least one recorded symbol.
	pub fn tracked_nodes(&self) -> usize {
		self.initiated.read().len()
	}
}

impl Instrumentation for ResolutionTracker {
	fn enumerate_resolved(&self, node: &dyn Resolve) -> Vec<SymbolRef> {
		self.initiated
			.read()
			.get(&node.id())
			.map(|recorded| recorded.values().cloned().collect())
			.unwrap_or_default()
	}

	fn record_resolved(&self, node: &dyn Resolve, symbol: &SymbolRef) {
		self.initiated
			.write()
			.entry(node.id())
			.or_default()
			.entry(symbol.name().to_string())
			.or_insert_with(|| symbol.clone());
	}

	fn node_dropped(&self, node: NodeId) {
		self.forget(node);
	}
}
