use std::fs;
use std::path::{Path, PathBuf};

use tracing::trace;

/// What a sweep deleted.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
	/// Staged copies removed, sentinels not included.
	pub removed: Vec<PathBuf>,
	/// Directories removed because they ended up empty.
	pub dirs_removed: usize,
}

/// Sentinel file marking `staged` for deferred deletion.
pub fn sentinel_path(staged: &Path) -> PathBuf {
	let mut name = staged.as_os_str().to_os_string();
	name.push(".pid");
	PathBuf::from(name)
}

/// Removes staged copies whose sentinel names a process `is_alive` rejects.
///
/// For each `<file>.pid` under `dir`: the staged file goes first, then the
/// sentinel. Afterwards every directory left empty is removed, `dir`
/// included. Sentinels whose contents are not a pid count as dead. Errors
/// are skipped; a sweep is best-effort and another one will follow.
pub fn sweep(dir: &Path, is_alive: &dyn Fn(u32) -> bool) -> SweepReport {
	let mut report = SweepReport::default();
	walk(dir, &mut report, &mut |path: &Path, report: &mut SweepReport| {
		if path.extension().is_none_or(|ext| ext != "pid") {
			return;
		}
		let owner = fs::read_to_string(path).ok().and_then(|s| s.trim().parse::<u32>().ok());
		if owner.is_some_and(is_alive) {
			return;
		}
		let staged = path.with_extension("");
		if fs::remove_file(&staged).is_ok() {
			report.removed.push(staged);
		}
		let _ = fs::remove_file(path);
	});
	if fs::remove_dir(dir).is_ok() {
		report.dirs_removed += 1;
	}
	trace!(dir = %dir.display(), removed = report.removed.len(), "native.sweep");
	report
}

/// Deletes every file under `dir`, leaving whatever the OS refuses to remove.
///
/// On Windows a loaded library cannot be deleted, so files still in use
/// survive and everything else is stale.
pub(crate) fn sweep_unlocked(dir: &Path) -> SweepReport {
	let mut report = SweepReport::default();
	walk(dir, &mut report, &mut |path: &Path, report: &mut SweepReport| {
		if fs::remove_file(path).is_ok() {
			report.removed.push(path.to_path_buf());
		}
	});
	if fs::remove_dir(dir).is_ok() {
		report.dirs_removed += 1;
	}
	report
}

fn walk(dir: &Path, report: &mut SweepReport, visit: &mut dyn FnMut(&Path, &mut SweepReport)) {
	let Ok(entries) = fs::read_dir(dir) else {
		return;
	};
	for entry in entries.flatten() {
		let path = entry.path();
		let Ok(file_type) = entry.file_type() else {
			continue;
		};
		if file_type.is_dir() {
			walk(&path, report, visit);
			if fs::remove_dir(&path).is_ok() {
				report.dirs_removed += 1;
			}
		} else {
			visit(&path, report);
		}
	}
}

/// Whether a process with `pid` exists.
#[cfg(unix)]
pub fn process_alive(pid: u32) -> bool {
	let Some(pid) = i32::try_from(pid).ok().and_then(rustix::process::Pid::from_raw) else {
		return false;
	};
	match rustix::process::test_kill_process(pid) {
		Ok(()) => true,
		// Exists, but belongs to someone else.
		Err(err) => err == rustix::io::Errno::PERM,
	}
}

/// Whether a process with `pid` exists. Without a probe every owner is assumed alive.
#[cfg(not(unix))]
pub fn process_alive(_pid: u32) -> bool {
	true
}
