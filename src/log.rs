//! Minimal leveled-logging facade.
//!
//! The rest of the crate calls `log::info`/`log::warn`/`log::error` uniformly;
//! swapping the backend for a real subscriber is a one-module change.

pub(crate) fn info(msg: &str) {
    eprintln!("[INFO] {msg}");
}

pub(crate) fn warn(msg: &str) {
    eprintln!("[WARN] {msg}");
}

pub(crate) fn error(msg: &str) {
    eprintln!("[ERROR] {msg}");
}
