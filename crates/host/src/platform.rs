use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
	Linux,
	Mac,
	Windows,
	FreeBsd,
	Other,
}

impl OsFamily {
	/// Maps a `std::env::consts::OS` value to its family.
	pub fn from_os_name(os: &str) -> Self {
		match os {
			"linux" | "android" => Self::Linux,
			"macos" | "ios" => Self::Mac,
			"windows" => Self::Windows,
			"freebsd" => Self::FreeBsd,
			_ => Self::Other,
		}
	}
}

/// Platform properties, probed once per process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
	os: OsFamily,
	tmp_dir: PathBuf,
	pid: u32,
}

impl Platform {
	/// The probed platform of the running process.
	pub fn current() -> &'static Platform {
		static CURRENT: OnceLock<Platform> = OnceLock::new();
		CURRENT.get_or_init(|| {
			Platform::new(
				OsFamily::from_os_name(std::env::consts::OS),
				std::env::temp_dir(),
				std::process::id(),
			)
		})
	}

	pub fn new(os: OsFamily, tmp_dir: PathBuf, pid: u32) -> Self {
		Self { os, tmp_dir, pid }
	}

	pub fn os(&self) -> OsFamily {
		self.os
	}

	pub fn is_linux(&self) -> bool {
		self.os == OsFamily::Linux
	}

	pub fn is_mac(&self) -> bool {
		self.os == OsFamily::Mac
	}

	pub fn is_win(&self) -> bool {
		self.os == OsFamily::Windows
	}

	pub fn is_freebsd(&self) -> bool {
		self.os == OsFamily::FreeBsd
	}

	/// System temporary directory.
	pub fn tmp_dir(&self) -> &Path {
		&self.tmp_dir
	}

	pub fn pid(&self) -> u32 {
		self.pid
	}
}
