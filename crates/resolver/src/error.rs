//! Error types for symbol resolution and resolver configuration.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while resolving a symbol.
#[derive(Debug, Error)]
pub enum ResolveError {
	/// Neither the node's own roots nor any ancestor produced the symbol.
	#[error("symbol not found: {name}")]
	NotFound {
		/// Fully-qualified name that was requested.
		name: String,
	},

	/// A root locator is unusable.
	#[error("malformed root {root}: {reason}")]
	MalformedRoot {
		/// Display form of the rejected root.
		root: String,
		/// Why the root was rejected.
		reason: String,
	},

	/// A locator found the unit but failed to read it.
	#[error("failed to read {name} from {}: {source}", path.display())]
	Locator {
		/// Name being located.
		name: String,
		/// File the locator tried to read.
		path: PathBuf,
		/// The underlying I/O error.
		#[source]
		source: std::io::Error,
	},
}

impl ResolveError {
	pub(crate) fn not_found(name: &str) -> Self {
		Self::NotFound { name: name.to_string() }
	}

	/// Returns true for [`ResolveError::NotFound`].
	pub fn is_not_found(&self) -> bool {
		matches!(self, Self::NotFound { .. })
	}
}

/// Result type for resolution operations.
pub type Result<T> = std::result::Result<T, ResolveError>;

/// Errors that can occur when loading resolver configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error reading a configuration file.
	#[error("I/O error reading {}: {error}", path.display())]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// Error parsing TOML syntax or shape.
	#[error("failed to parse resolver config: {0}")]
	Parse(#[from] toml::de::Error),

	/// A configured root could not be turned into a locator.
	#[error(transparent)]
	Root(#[from] ResolveError),
}
