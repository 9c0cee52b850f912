//! Loadable-unit locators used as node roots.
//!
//! A locator answers "is `name` here?" and materializes a fresh [`Symbol`]
//! each time it is asked. Keeping one instance per name is the node cache's
//! job, not the locator's.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::error::{ResolveError, Result};
use crate::symbol::{Symbol, SymbolOrigin, SymbolRef};

/// Shared handle to a root locator.
pub type Root = Arc<dyn Locator>;

/// Extension used by [`DirLocator`] when none is configured.
pub const DEFAULT_UNIT_EXTENSION: &str = "unit";

/// Source of loadable units.
pub trait Locator: Send + Sync + fmt::Debug + fmt::Display {
	/// Looks up `name`. `Ok(None)` means the unit is not under this root.
	fn locate(&self, name: &str) -> Result<Option<SymbolRef>>;

	/// Checks that the root is usable. Called when a root is attached to a node.
	fn validate(&self) -> Result<()> {
		Ok(())
	}
}

/// Splits a dotted name into path segments, rejecting anything that could
/// escape the root.
fn name_segments(name: &str) -> Option<Vec<&str>> {
	let segments: Vec<&str> = name.split('.').collect();
	let valid = segments
		.iter()
		.all(|s| !s.is_empty() && !s.contains(['/', '\\']) && *s != "..");
	valid.then_some(segments)
}

/// Maps `a.b.C` to `<dir>/a/b/C.<ext>`.
#[derive(Debug, Clone)]
pub struct DirLocator {
	dir: PathBuf,
	extension: String,
}

impl DirLocator {
	/// Creates a locator over `dir`, which must be an existing directory.
	pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
		let locator = Self {
			dir: dir.into(),
			extension: DEFAULT_UNIT_EXTENSION.to_string(),
		};
		locator.validate()?;
		Ok(locator)
	}

	pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
		self.extension = extension.into();
		self
	}

	pub fn dir(&self) -> &Path {
		&self.dir
	}

	fn unit_path(&self, name: &str) -> Option<PathBuf> {
		let segments = name_segments(name)?;
		let (last, packages) = segments.split_last()?;
		let mut path = self.dir.clone();
		path.extend(packages);
		path.push(format!("{last}.{}", self.extension));
		Some(path)
	}
}

impl Locator for DirLocator {
	fn locate(&self, name: &str) -> Result<Option<SymbolRef>> {
		let Some(path) = self.unit_path(name) else {
			return Ok(None);
		};
		match std::fs::read(&path) {
			Ok(bytes) => {
				trace!(symbol = name, path = %path.display(), "locator.dir.hit");
				Ok(Some(Symbol::new(name, SymbolOrigin::File(path), bytes)))
			}
			Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => Ok(None),
			Err(source) => Err(ResolveError::Locator {
				name: name.to_string(),
				path,
				source,
			}),
		}
	}

	fn validate(&self) -> Result<()> {
		let malformed = |reason: String| ResolveError::MalformedRoot {
			root: self.to_string(),
			reason,
		};
		let meta = std::fs::metadata(&self.dir).map_err(|e| malformed(e.to_string()))?;
		if !meta.is_dir() {
			return Err(malformed("not a directory".to_string()));
		}
		if self.extension.is_empty() || self.extension.contains(['/', '\\', '.']) {
			return Err(malformed(format!("invalid unit extension {:?}", self.extension)));
		}
		Ok(())
	}
}

impl fmt::Display for DirLocator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "dir:{}", self.dir.display())
	}
}

/// In-memory locator over a fixed set of units.
///
/// Counts lookups per name, which makes it handy for asserting how often a
/// node actually reached its roots.
#[derive(Debug, Default)]
pub struct MapLocator {
	label: String,
	units: FxHashMap<String, Arc<[u8]>>,
	lookups: Mutex<FxHashMap<String, usize>>,
}

impl MapLocator {
	pub fn new(label: impl Into<String>) -> Self {
		Self {
			label: label.into(),
			..Self::default()
		}
	}

	/// Adds a unit under `name`.
	pub fn with_unit(mut self, name: impl Into<String>, bytes: impl AsRef<[u8]>) -> Self {
		self.units.insert(name.into(), Arc::from(bytes.as_ref()));
		self
	}

	/// Number of times `name` was looked up.
	pub fn lookups(&self, name: &str) -> usize {
		self.lookups.lock().get(name).copied().unwrap_or(0)
	}

	/// Number of lookups across all names.
	pub fn total_lookups(&self) -> usize {
		self.lookups.lock().values().sum()
	}
}

impl Locator for MapLocator {
	fn locate(&self, name: &str) -> Result<Option<SymbolRef>> {
		*self.lookups.lock().entry(name.to_string()).or_default() += 1;
		Ok(self
			.units
			.get(name)
			.map(|bytes| Symbol::new(name, SymbolOrigin::Memory(self.label.clone()), &bytes[..])))
	}

	fn validate(&self) -> Result<()> {
		if self.label.is_empty() {
			return Err(ResolveError::MalformedRoot {
				root: self.to_string(),
				reason: "empty label".to_string(),
			});
		}
		Ok(())
	}
}

impl fmt::Display for MapLocator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "mem:{}", self.label)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn dir_locator_maps_dotted_names_to_files() {
		let temp = tempfile::tempdir().expect("create tempdir");
		std::fs::create_dir_all(temp.path().join("pkg/sub")).unwrap();
		std::fs::write(temp.path().join("pkg/sub/X.unit"), b"payload").unwrap();

		let locator = DirLocator::new(temp.path()).unwrap();
		let symbol = locator.locate("pkg.sub.X").unwrap().expect("unit present");
		assert_eq!(symbol.name(), "pkg.sub.X");
		assert_eq!(symbol.bytes(), b"payload");
		assert_eq!(symbol.origin(), &SymbolOrigin::File(temp.path().join("pkg/sub/X.unit")));

		assert!(locator.locate("pkg.sub.Y").unwrap().is_none());
		assert!(locator.locate("pkg.sub.X.Inner").unwrap().is_none());
	}

	#[test]
	fn dir_locator_refuses_escaping_names() {
		let temp = tempfile::tempdir().expect("create tempdir");
		std::fs::write(temp.path().join("secret.unit"), b"x").unwrap();
		let inner = temp.path().join("inner");
		std::fs::create_dir(&inner).unwrap();

		let locator = DirLocator::new(&inner).unwrap();
		assert!(locator.locate("...secret").unwrap().is_none());
		assert!(locator.locate("a/../secret").unwrap().is_none());
		assert!(locator.locate("").unwrap().is_none());
	}

	#[test]
	fn dir_locator_rejects_missing_or_file_roots() {
		let temp = tempfile::tempdir().expect("create tempdir");
		let file = temp.path().join("plain");
		std::fs::write(&file, b"").unwrap();

		let err = DirLocator::new(temp.path().join("absent")).unwrap_err();
		assert!(matches!(err, ResolveError::MalformedRoot { .. }));
		let err = DirLocator::new(&file).unwrap_err();
		assert!(matches!(err, ResolveError::MalformedRoot { ref reason, .. } if reason == "not a directory"));
	}

	#[test]
	fn map_locator_materializes_fresh_instances() {
		let locator = MapLocator::new("r1").with_unit("pkg.X", b"x");
		let a = locator.locate("pkg.X").unwrap().unwrap();
		let b = locator.locate("pkg.X").unwrap().unwrap();
		assert!(!Arc::ptr_eq(&a, &b));
		assert_eq!(locator.lookups("pkg.X"), 2);
		assert!(locator.locate("pkg.Z").unwrap().is_none());
		assert_eq!(locator.total_lookups(), 3);
	}
}
