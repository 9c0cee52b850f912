//! Delegation policy and the reserved namespace.
//!
//! A [`Policy`] biases where a node looks first for a name. The
//! [`ReservedNamespace`] sits above the policy: reserved names always go to
//! the parent, whatever the policy says.

use std::fmt;
use std::sync::Arc;

type Predicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Prefixes reserved by default: the host runtime's own internals and this
/// crate's namespace.
pub const DEFAULT_RESERVED_PREFIXES: &[&str] = &["std.", "core.", "alloc.", "lineage."];

/// Predicate pair controlling parent/child override precedence.
///
/// `force_child` only matters for names that `force_parent` matches; when
/// both match, the child wins and the node resolves from its own roots first.
#[derive(Clone)]
pub struct Policy {
	force_parent: Predicate,
	force_child: Predicate,
}

impl Policy {
	pub fn new<P, C>(force_parent: P, force_child: C) -> Self
	where
		P: Fn(&str) -> bool + Send + Sync + 'static,
		C: Fn(&str) -> bool + Send + Sync + 'static,
	{
		Self {
			force_parent: Arc::new(force_parent),
			force_child: Arc::new(force_child),
		}
	}

	/// Builds a policy matching names by prefix.
	pub fn from_prefixes<I, J, S, T>(parent_prefixes: I, child_prefixes: J) -> Self
	where
		I: IntoIterator<Item = S>,
		J: IntoIterator<Item = T>,
		S: Into<String>,
		T: Into<String>,
	{
		let parent: Vec<String> = parent_prefixes.into_iter().map(Into::into).collect();
		let child: Vec<String> = child_prefixes.into_iter().map(Into::into).collect();
		Self::new(
			move |name| parent.iter().any(|p| name.starts_with(p.as_str())),
			move |name| child.iter().any(|p| name.starts_with(p.as_str())),
		)
	}

	/// Returns a copy with `force_parent` replaced.
	pub fn with_force_parent(mut self, pred: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
		self.force_parent = Arc::new(pred);
		self
	}

	/// Returns a copy with `force_child` replaced.
	pub fn with_force_child(mut self, pred: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
		self.force_child = Arc::new(pred);
		self
	}

	pub fn force_parent(&self, name: &str) -> bool {
		(self.force_parent)(name)
	}

	pub fn force_child(&self, name: &str) -> bool {
		(self.force_child)(name)
	}

	/// Whether `name` must skip the node's own roots.
	pub fn delegates_to_parent(&self, name: &str) -> bool {
		self.force_parent(name) && !self.force_child(name)
	}
}

impl Default for Policy {
	/// A policy that never forces either side.
	fn default() -> Self {
		Self::new(|_| false, |_| false)
	}
}

impl fmt::Debug for Policy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Policy").finish_non_exhaustive()
	}
}

/// Name prefixes that always resolve through the parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservedNamespace {
	prefixes: Arc<[String]>,
}

impl ReservedNamespace {
	pub fn new<I, S>(prefixes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			prefixes: prefixes.into_iter().map(Into::into).collect(),
		}
	}

	/// A namespace that reserves nothing.
	pub fn none() -> Self {
		Self::new(std::iter::empty::<String>())
	}

	pub fn contains(&self, name: &str) -> bool {
		self.prefixes.iter().any(|p| name.starts_with(p.as_str()))
	}

	pub fn prefixes(&self) -> &[String] {
		&self.prefixes
	}
}

impl Default for ReservedNamespace {
	fn default() -> Self {
		Self::new(DEFAULT_RESERVED_PREFIXES.iter().copied())
	}
}
