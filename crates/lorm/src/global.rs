//! The process-wide database handle.
//!
//! Opened on first use from [`Config::load`](crate::config::Config::load) and kept
//! for the life of the process. A rusqlite connection is not `Sync`, so access
//! goes through a mutex; hold the guard for one logical unit of work.
//!
//! ```ignore
//! let db = lorm::global::connection()?;
//! let people = Person::query().all(&*db)?;
//! ```

use crate::database::Database;
use crate::error::{OrmError, OrmResult};
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

static DATABASE: OnceLock<Mutex<Database>> = OnceLock::new();

/// Lock the shared database, opening it first if needed.
pub fn connection() -> OrmResult<MutexGuard<'static, Database>> {
    let cell = match DATABASE.get() {
        Some(cell) => cell,
        None => {
            let db = Database::connect()?;
            tracing::info!(target: "lorm", "shared database opened");
            // A concurrent first use may have won; its handle is kept.
            let _ = DATABASE.set(Mutex::new(db));
            DATABASE
                .get()
                .ok_or_else(|| OrmError::Connection("shared database unavailable".to_string()))?
        }
    };
    Ok(cell.lock().unwrap_or_else(PoisonError::into_inner))
}

/// Install `db` as the shared database.
///
/// Fails when one is already installed or was opened by [`connection`].
pub fn install(db: Database) -> OrmResult<()> {
    DATABASE
        .set(Mutex::new(db))
        .map_err(|_| OrmError::Connection("shared database already initialized".to_string()))
}

/// Whether the shared database has been opened or installed.
pub fn is_initialized() -> bool {
    DATABASE.get().is_some()
}
