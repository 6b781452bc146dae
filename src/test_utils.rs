use std::sync::{Mutex, OnceLock};

/// Global lock for environment variable modifications in tests.
/// Tests that modify `PINF_RUNTIME`, `COUCHDB_BIN`, or `HOME` should hold this lock
/// so parallel test threads never observe each other's values.
pub static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

pub fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
