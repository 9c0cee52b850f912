use std::fmt;
use std::sync::Arc;

use crate::error::{ResolveError, Result};
use crate::symbol::{NodeId, SymbolRef};

/// Shared upward handle to a parent resolver.
pub type ParentRef = Arc<dyn Resolve>;

/// A node in a resolver tree.
///
/// Nodes only know their parent; the chain formed by [`Resolve::parent`]
/// must be acyclic. A cycle makes resolution recurse without bound or
/// deadlock on a per-name gate.
pub trait Resolve: Send + Sync + fmt::Display {
	fn id(&self) -> NodeId;

	fn parent(&self) -> Option<&ParentRef>;

	/// Resolves `name` to a symbol, caching the result at this node.
	fn resolve(&self, name: &str) -> Result<SymbolRef>;
}

/// Delegates to `parent`, treating a missing parent as an empty one.
pub(crate) fn resolve_via_parent(parent: Option<&ParentRef>, name: &str) -> Result<SymbolRef> {
	match parent {
		Some(parent) => parent.resolve(name),
		None => Err(ResolveError::not_found(name)),
	}
}
