mod posts;
mod users;

use super::Context;
use chrono::{DateTime, SubsecRound, Utc};
use log::{debug, info, trace};
use rusqlite::{ffi, Connection, ErrorCode};
use std::{
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::sync::Mutex;

pub type Result<T> = std::result::Result<T, Error>;

/// How many SQLite VM instructions run between cancellation checks.
const PROGRESS_OPS: i32 = 1000;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0} not found")]
    NotFound(String),
    /// A uniqueness constraint was violated.
    #[error("{0}")]
    Conflict(String),
    /// A foreign key would dangle, or a row is still referenced.
    #[error("{0}")]
    Reference(String),
    #[error("{0}")]
    Storage(String),
    #[error("operation cancelled")]
    Cancelled,
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(failure, _) = &err {
            match (failure.code, failure.extended_code) {
                (ErrorCode::OperationInterrupted, _) => return Error::Cancelled,
                (
                    ErrorCode::ConstraintViolation,
                    ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY,
                ) => return Error::Conflict(err.to_string()),
                (ErrorCode::ConstraintViolation, ffi::SQLITE_CONSTRAINT_FOREIGNKEY) => {
                    return Error::Reference(err.to_string())
                }
                _ => {}
            }
        }

        Error::Storage(err.to_string())
    }
}

/// Shared handle to the store.
///
/// Cloning is cheap. Every operation holds the connection only for its own
/// duration, so handles can be used from any number of requests at once.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

/// Build the database.
impl Database {
    pub fn open(path: impl AsRef<Path>, schema: &str) -> Result<Database> {
        let conn = Connection::open(path)?;
        Database::init(conn, schema)
    }

    #[cfg(test)]
    pub fn open_in_memory(schema: &str) -> Result<Database> {
        let conn = Connection::open_in_memory()?;
        Database::init(conn, schema)
    }

    fn init(conn: Connection, schema: &str) -> Result<Database> {
        trace!("Opened database connection.");
        trace!("Initializing database...");

        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(schema)?;

        info!("Finished initializing database");

        Ok(Database {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

/// Helper methods
impl Database {
    /// Run `op` against the connection on the blocking pool.
    ///
    /// The operation is aborted with [`Error::Cancelled`] when `ctx` is
    /// cancelled, when its deadline passes, or when the returned future is
    /// dropped before completion.
    pub async fn run<T, F>(&self, ctx: &Context, op: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        if ctx.is_done() {
            debug!("Context already done, skipping store operation");
            return Err(Error::Cancelled);
        }

        let lock = self.conn.clone().lock_owned();
        let conn = match ctx.deadline() {
            Some(deadline) => tokio::time::timeout_at(deadline.into(), lock)
                .await
                .map_err(|_| Error::Cancelled)?,
            None => lock.await,
        };

        if ctx.is_done() {
            return Err(Error::Cancelled);
        }

        let abort = AbortOnDrop::new();
        let should_stop = {
            let ctx = ctx.clone();
            let flag = abort.flag.clone();
            move || flag.load(Ordering::Acquire) || ctx.is_done()
        };

        let result = tokio::task::spawn_blocking(move || {
            conn.progress_handler(PROGRESS_OPS, Some(should_stop));
            let result = op(&*conn);
            conn.progress_handler(0, None::<fn() -> bool>);
            result
        })
        .await;
        abort.disarm();

        match result {
            Ok(result) => result.map_err(Error::from),
            Err(err) => Err(Error::Storage(format!("store task failed: {err}"))),
        }
    }
}

/// Sets its flag when dropped while armed, interrupting the running query.
struct AbortOnDrop {
    flag: Arc<AtomicBool>,
    armed: bool,
}

impl AbortOnDrop {
    fn new() -> AbortOnDrop {
        AbortOnDrop {
            flag: Arc::default(),
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        if self.armed {
            debug!("Store operation dropped, interrupting query");
            self.flag.store(true, Ordering::Release);
        }
    }
}

/// The stored form of `id`. Ids past `i64::MAX` cannot be stored, so no row
/// has them.
fn row_id(id: u64, what: &str) -> Result<i64> {
    i64::try_from(id).map_err(|_| Error::NotFound(format!("{what} {id}")))
}

/// Timestamps are stored with whole-second precision.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}
