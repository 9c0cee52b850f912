use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared handle to a resolved symbol.
///
/// Identity is pointer identity: two handles denote the same symbol only when
/// [`Arc::ptr_eq`] holds, regardless of name or contents.
pub type SymbolRef = Arc<Symbol>;

/// Where a symbol's unit was located.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolOrigin {
	/// Read from a file under a directory root.
	File(PathBuf),
	/// Provided by an in-memory locator with the given label.
	Memory(String),
}

impl fmt::Display for SymbolOrigin {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::File(path) => write!(f, "file:{}", path.display()),
			Self::Memory(label) => write!(f, "mem:{label}"),
		}
	}
}

/// An opaque loadable unit materialized under a fully-qualified name.
///
/// The bytes are never interpreted by this crate.
#[derive(Debug)]
pub struct Symbol {
	name: String,
	origin: SymbolOrigin,
	bytes: Box<[u8]>,
}

impl Symbol {
	/// Materializes a new symbol instance.
	pub fn new(name: impl Into<String>, origin: SymbolOrigin, bytes: impl Into<Box<[u8]>>) -> SymbolRef {
		Arc::new(Self {
			name: name.into(),
			origin,
			bytes: bytes.into(),
		})
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn origin(&self) -> &SymbolOrigin {
		&self.origin
	}

	pub fn bytes(&self) -> &[u8] {
		&self.bytes
	}
}

/// Process-unique identity of a resolution node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
	pub(crate) fn next() -> Self {
		static NEXT: AtomicU64 = AtomicU64::new(1);
		Self(NEXT.fetch_add(1, Ordering::Relaxed))
	}

	pub fn get(self) -> u64 {
		self.0
	}
}

impl fmt::Display for NodeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}
