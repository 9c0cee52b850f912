//! Native library staging and loading.
//!
//! [`NativeLoader`] first asks the dynamic linker for the library by its
//! platform file name. If that fails it copies a packaged artifact for each
//! candidate architecture into a staging directory under the system temp dir
//! and loads the copy. Staged copies are never deleted by the process that
//! loaded them while it runs: a `<file>.pid` sentinel names the owner, and a
//! later [`sweep`] removes copies whose owner is gone.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use libloading::Library;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::platform::Platform;
use crate::shutdown::{self, ShutdownHooks};
use crate::thread::ThreadFactory;

mod sweep;

pub use sweep::{SweepReport, process_alive, sentinel_path, sweep};


/// Name of the staging directory under the system temp dir.
pub const STAGING_DIR_NAME: &str = "lineage-native";

/// Priority of the exit hook that sweeps this process's staged copies.
pub const CLEANUP_HOOK_PRIORITY: i32 = 1;

/// Errors that can occur while staging or loading a native library.
#[derive(Debug, Error)]
pub enum StageError {
	/// No artifact is packaged for the requested architecture.
	#[error("native library {library} has no packaged artifact at {resource}")]
	MissingResource {
		/// Platform file name of the library.
		library: String,
		/// Where the artifact was expected.
		resource: String,
	},

	/// The dynamic linker rejected the staged copy.
	#[error("failed to link {}: {source}", path.display())]
	Link {
		/// Staged copy that failed to load.
		path: PathBuf,
		/// The linker error.
		#[source]
		source: libloading::Error,
	},

	/// Filesystem I/O error while staging.
	#[error("failed to stage native library: {0}")]
	Io(#[from] std::io::Error),
}

/// Result type for staging operations.
pub type Result<T> = std::result::Result<T, StageError>;

/// Where packaged native artifacts come from.
pub trait ArtifactSource: Send + Sync {
	/// Bytes of `file_name` packaged for `arch`, or `None` if not packaged.
	fn open(&self, arch: &str, file_name: &str) -> std::io::Result<Option<Vec<u8>>>;

	/// Human-readable location of the artifact, for errors.
	fn describe(&self, arch: &str, file_name: &str) -> String;
}

/// Artifacts laid out as `<root>/native/<arch>/<file_name>`.
#[derive(Debug, Clone)]
pub struct DirArtifacts {
	root: PathBuf,
}

impl DirArtifacts {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	fn path(&self, arch: &str, file_name: &str) -> PathBuf {
		self.root.join("native").join(arch).join(file_name)
	}
}

impl ArtifactSource for DirArtifacts {
	fn open(&self, arch: &str, file_name: &str) -> std::io::Result<Option<Vec<u8>>> {
		match fs::read(self.path(arch, file_name)) {
			Ok(bytes) => Ok(Some(bytes)),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
			Err(e) => Err(e),
		}
	}

	fn describe(&self, arch: &str, file_name: &str) -> String {
		self.path(arch, file_name).display().to_string()
	}
}

/// Artifacts compiled into the binary, e.g. with `include_bytes!`.
#[derive(Debug, Default, Clone)]
pub struct EmbeddedArtifacts {
	entries: FxHashMap<(String, String), &'static [u8]>,
}

impl EmbeddedArtifacts {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with(mut self, arch: impl Into<String>, file_name: impl Into<String>, bytes: &'static [u8]) -> Self {
		self.entries.insert((arch.into(), file_name.into()), bytes);
		self
	}
}

impl ArtifactSource for EmbeddedArtifacts {
	fn open(&self, arch: &str, file_name: &str) -> std::io::Result<Option<Vec<u8>>> {
		Ok(self
			.entries
			.get(&(arch.to_string(), file_name.to_string()))
			.map(|bytes| bytes.to_vec()))
	}

	fn describe(&self, arch: &str, file_name: &str) -> String {
		format!("embedded:/native/{arch}/{file_name}")
	}
}

/// A loaded native library.
#[derive(Debug)]
pub struct NativeLibrary {
	library: Library,
	staged: Option<PathBuf>,
}

impl NativeLibrary {
	pub fn library(&self) -> &Library {
		&self.library
	}

	/// Path of the staged copy, or `None` when the system linker found the library.
	pub fn staged_path(&self) -> Option<&Path> {
		self.staged.as_deref()
	}
}

/// Loads a native library from the system path or from packaged artifacts.
pub struct NativeLoader {
	file_name: String,
	arches: Vec<String>,
	staging_dir: PathBuf,
	source: Box<dyn ArtifactSource>,
	platform: Platform,
	hooks: &'static ShutdownHooks,
	cleanup_threads: ThreadFactory,
}

impl NativeLoader {
	/// Loader for `library` (a base name such as `lineage-native0`).
	///
	/// Architectures are tried in order; the default list is `x86_64` then `i686`.
	pub fn new(library: &str, source: impl ArtifactSource + 'static) -> Self {
		let platform = Platform::current().clone();
		Self {
			file_name: libloading::library_filename(library).to_string_lossy().into_owned(),
			arches: vec!["x86_64".to_string(), "i686".to_string()],
			staging_dir: platform.tmp_dir().join(STAGING_DIR_NAME),
			source: Box::new(source),
			platform,
			hooks: shutdown::hooks(),
			cleanup_threads: ThreadFactory::new("lineage-native-cleanup"),
		}
	}

	pub fn arches<I, S>(mut self, arches: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.arches = arches.into_iter().map(Into::into).collect();
		self
	}

	pub fn staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
		self.staging_dir = dir.into();
		self
	}

	pub fn platform(mut self, platform: Platform) -> Self {
		self.platform = platform;
		self
	}

	/// Registry that receives the exit-time cleanup hook.
	pub fn hooks(mut self, hooks: &'static ShutdownHooks) -> Self {
		self.hooks = hooks;
		self
	}

	/// Platform file name of the library, e.g. `liblineage-native0.so`.
	pub fn file_name(&self) -> &str {
		&self.file_name
	}

	pub fn staging_path(&self) -> &Path {
		&self.staging_dir
	}

	/// Loads the library, falling back across packaged architectures.
	///
	/// # Errors
	///
	/// Returns the error of the last architecture tried when none loads.
	pub fn load(&self) -> Result<NativeLibrary> {
		// SAFETY: loading runs the library's initializers; the library is ours.
		match unsafe { Library::new(&self.file_name) } {
			Ok(library) => {
				info!(library = %self.file_name, "native.load.system");
				return Ok(NativeLibrary { library, staged: None });
			}
			Err(e) => debug!(library = %self.file_name, error = %e, "native.load.system_miss"),
		}

		let mut last = None;
		for arch in &self.arches {
			match self.load_packaged(arch) {
				Ok(library) => return Ok(library),
				Err(e) => {
					warn!(library = %self.file_name, arch = %arch, error = %e, "Failed to load packaged native library");
					last = Some(e);
				}
			}
		}
		Err(last.unwrap_or_else(|| StageError::MissingResource {
			library: self.file_name.clone(),
			resource: "no architectures configured".to_string(),
		}))
	}

	/// Stages and loads the artifact packaged for `arch`.
	pub fn load_packaged(&self, arch: &str) -> Result<NativeLibrary> {
		let bytes = self
			.source
			.open(arch, &self.file_name)?
			.ok_or_else(|| StageError::MissingResource {
				library: self.file_name.clone(),
				resource: self.source.describe(arch, &self.file_name),
			})?;

		let path = self.stage(&bytes)?;

		// SAFETY: as in `load`; the staged bytes are the packaged library.
		let library = match unsafe { Library::new(&path) } {
			Ok(library) => library,
			Err(source) => {
				let _ = fs::remove_file(&path);
				return Err(StageError::Link { path, source });
			}
		};
		info!(library = %self.file_name, arch, path = %path.display(), "native.load.staged");

		if !self.platform.is_win() {
			fs::write(sentinel_path(&path), self.platform.pid().to_string())?;
			let dir = self.staging_dir.clone();
			let own_pid = self.platform.pid();
			// At exit this process is the only one known to be gone.
			self.hooks.add_hook(CLEANUP_HOOK_PRIORITY, move || {
				sweep(&dir, &|pid| pid != own_pid);
			});
		}
		self.spawn_cleanup();

		Ok(NativeLibrary {
			library,
			staged: Some(path),
		})
	}

	fn stage(&self, bytes: &[u8]) -> Result<PathBuf> {
		fs::create_dir_all(&self.staging_dir)?;
		let mut staged = tempfile::Builder::new()
			.prefix("lineage-")
			.suffix(&format!("-{}", self.file_name))
			.tempfile_in(&self.staging_dir)?;
		staged.write_all(bytes)?;
		let path = staged.into_temp_path().keep().map_err(std::io::Error::from)?;
		Ok(path)
	}

	/// Sweeps copies left behind by earlier processes on a background thread.
	fn spawn_cleanup(&self) {
		let dir = self.staging_dir.clone();
		let windows = self.platform.is_win();
		let spawned = self.cleanup_threads.new_thread(move || {
			let report = if windows {
				sweep::sweep_unlocked(&dir)
			} else {
				sweep(&dir, &process_alive)
			};
			debug!(removed = report.removed.len(), dirs = report.dirs_removed, "native.cleanup");
		});
		if let Err(e) = spawned {
			warn!(error = %e, "Failed to spawn native cleanup thread");
		}
	}
}
