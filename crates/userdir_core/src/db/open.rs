//! Ways to get a SQLite connection to the user store.
//!
//! `open_db` and `open_db_in_memory` are the setup path: they may create the
//! file and always leave the schema current. `connect` is the per-call path
//! used by the repository; it never creates a file or touches the schema.

use super::migrations::ensure_schema;
use super::{DbError, DbResult};
use log::{error, info};
use rusqlite::{Connection, ErrorCode, OpenFlags};
use std::path::Path;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens (creating if needed) a database file with the `users` schema ensured.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    prepare_store("file", || Connection::open(path))
}

/// In-memory variant of [`open_db`], used by tests.
pub fn open_db_in_memory() -> DbResult<Connection> {
    prepare_store("memory", Connection::open_in_memory)
}

/// Opens an existing database file read-write.
///
/// A missing file is reported as `DbError::MissingStore` and is left missing.
pub fn connect(path: impl AsRef<Path>) -> DbResult<Connection> {
    let path = path.as_ref();
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;

    let conn = Connection::open_with_flags(path, flags).map_err(|err| match &err {
        rusqlite::Error::SqliteFailure(failure, _) if failure.code == ErrorCode::CannotOpen => {
            DbError::MissingStore(path.to_path_buf())
        }
        _ => DbError::Storage(err),
    })?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(conn)
}

fn prepare_store<F>(mode: &str, open: F) -> DbResult<Connection>
where
    F: FnOnce() -> rusqlite::Result<Connection>,
{
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode={mode}");

    let result = open().map_err(DbError::from).and_then(|mut conn| {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        ensure_schema(&mut conn)?;
        Ok(conn)
    });

    let duration_ms = started_at.elapsed().as_millis();
    match &result {
        Ok(_) => info!("event=db_open module=db status=ok mode={mode} duration_ms={duration_ms}"),
        Err(err) => error!(
            "event=db_open module=db status=error mode={mode} duration_ms={duration_ms} error={err}"
        ),
    }
    result
}
