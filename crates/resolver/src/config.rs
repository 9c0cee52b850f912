//! TOML configuration for resolver nodes.
//!
//! ```toml
//! reserved_prefixes = ["std.", "core.", "lineage."]
//! force_parent = ["vendor."]
//! force_child = ["vendor.patched."]
//!
//! [[root]]
//! path = "units"
//! extension = "unit"
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use crate::error::{ConfigError, ResolveError};
use crate::locator::{DEFAULT_UNIT_EXTENSION, DirLocator, Root};
use crate::node::NodeBuilder;
use crate::policy::{DEFAULT_RESERVED_PREFIXES, Policy, ReservedNamespace};

/// Resolver configuration file structure.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolverConfig {
	/// Prefixes always resolved through the parent.
	#[serde(default = "default_reserved_prefixes")]
	pub reserved_prefixes: Vec<String>,
	/// Prefixes the node leaves to its parent.
	#[serde(default)]
	pub force_parent: Vec<String>,
	/// Prefixes the node resolves itself even when `force_parent` matches.
	#[serde(default)]
	pub force_child: Vec<String>,
	/// Directory roots, searched in order.
	#[serde(default, rename = "root")]
	pub roots: Vec<RootConfig>,
}

/// One `[[root]]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RootConfig {
	/// Directory holding units. Relative paths resolve against the config file's directory.
	pub path: PathBuf,
	#[serde(default = "default_extension")]
	pub extension: String,
}

fn default_reserved_prefixes() -> Vec<String> {
	DEFAULT_RESERVED_PREFIXES.iter().map(|p| p.to_string()).collect()
}

fn default_extension() -> String {
	DEFAULT_UNIT_EXTENSION.to_string()
}

impl Default for ResolverConfig {
	fn default() -> Self {
		Self {
			reserved_prefixes: default_reserved_prefixes(),
			force_parent: Vec::new(),
			force_child: Vec::new(),
			roots: Vec::new(),
		}
	}
}

impl ResolverConfig {
	pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
		Ok(toml::from_str(source)?)
	}

	/// Reads and parses a configuration file.
	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		let source = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::from_toml(&source)
	}

	pub fn policy(&self) -> Policy {
		Policy::from_prefixes(self.force_parent.clone(), self.force_child.clone())
	}

	pub fn reserved(&self) -> ReservedNamespace {
		ReservedNamespace::new(self.reserved_prefixes.iter().cloned())
	}

	/// Builds directory locators, resolving relative paths against `base`.
	pub fn locators(&self, base: &Path) -> Result<Vec<Root>, ResolveError> {
		self.roots
			.iter()
			.map(|root| {
				let dir = if root.path.is_absolute() {
					root.path.clone()
				} else {
					base.join(&root.path)
				};
				let locator = DirLocator::new(dir)?.with_extension(root.extension.clone());
				Ok(Arc::new(locator) as Root)
			})
			.collect()
	}

	/// A [`NodeBuilder`] carrying this configuration's roots, policy and reserved namespace.
	pub fn node_builder(&self, base: &Path) -> Result<NodeBuilder, ConfigError> {
		Ok(NodeBuilder::default()
			.roots(self.locators(base)?)
			.policy(self.policy())
			.reserved(self.reserved()))
	}
}
