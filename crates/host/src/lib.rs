//! Host runtime utilities shared by lineage front ends.
//!
//! - [`ThreadFactory`]: threads named `<prefix>-<n>`
//! - [`shutdown`]: priority-ordered exit hooks
//! - [`Platform`]: OS family, temp dir and pid, probed once
//! - [`native`]: staging packaged native libraries with deferred cleanup

pub mod native;
pub mod platform;
pub mod shutdown;
pub mod thread;

pub use platform::{OsFamily, Platform};
pub use shutdown::{ExitGuard, HookId, ShutdownHooks};
pub use thread::ThreadFactory;
