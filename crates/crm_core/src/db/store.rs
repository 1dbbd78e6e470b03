//! Process-wide SQLite connection pool.
//!
//! # Responsibility
//! - Own the bounded `r2d2` pool shared by every repository.
//! - Lend one connection per repository call and take it back on drop.
//! - Wire the caller's cancellation signal into in-flight statements.
//!
//! # Invariants
//! - In-memory stores hold exactly one connection that is never reaped;
//!   the database lives as long as that connection does.
//! - A lent connection always has a progress handler bound to the
//!   borrowing call's `Cancellation`, and none once it is back in the pool.

use super::migrations::apply_migrations;
use super::open::configure_connection;
use super::{DbError, DbResult};
use crate::model::context::Cancellation;
use log::{debug, error, info};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::fmt::{Debug, Formatter};
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::time::{Duration, Instant};

const DEFAULT_FILE_CONNECTIONS: usize = 4;
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);
/// How often a blocked checkout re-checks the caller's cancellation.
const POOL_WAIT_SLICE: Duration = Duration::from_millis(25);
/// SQLite VM instructions between cancellation checks.
const PROGRESS_OPS: i32 = 1_000;

/// Where the store keeps its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreSource {
    File(PathBuf),
    Memory,
}

impl StoreSource {
    pub(super) fn mode(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::Memory => "memory",
        }
    }

    fn manager(&self) -> SqliteConnectionManager {
        match self {
            Self::File(path) => SqliteConnectionManager::file(path),
            Self::Memory => SqliteConnectionManager::memory(),
        }
    }
}

/// Store construction options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub source: StoreSource,
    /// Upper bound on open connections. Forced to 1 for in-memory stores.
    pub max_connections: usize,
    /// How long a statement waits on a locked database before failing.
    pub busy_timeout: Duration,
}

impl StoreConfig {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            source: StoreSource::File(path.into()),
            max_connections: DEFAULT_FILE_CONNECTIONS,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    pub fn memory() -> Self {
        Self {
            source: StoreSource::Memory,
            max_connections: 1,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    fn effective_max_connections(&self) -> u32 {
        match self.source {
            StoreSource::Memory => 1,
            StoreSource::File(_) => {
                u32::try_from(self.max_connections.max(1)).unwrap_or(u32::MAX)
            }
        }
    }
}

/// Cloneable handle to the shared connection pool.
///
/// Construct once at startup and hand clones to repositories.
#[derive(Clone)]
pub struct Store {
    pool: Pool<SqliteConnectionManager>,
    config: StoreConfig,
}

impl Debug for Store {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("config", &self.config)
            .field("max_connections", &self.pool.max_size())
            .finish()
    }
}

impl Store {
    /// Builds the pool and applies migrations on its first connection.
    pub fn open(config: StoreConfig) -> DbResult<Self> {
        let started_at = Instant::now();
        let mode = config.source.mode();
        let source = config.source.clone();
        let busy_timeout = config.busy_timeout;
        let manager = config
            .source
            .manager()
            .with_init(move |conn| configure_connection(conn, &source, busy_timeout));

        let pool = Pool::builder()
            .max_size(config.effective_max_connections())
            .min_idle(Some(1))
            .idle_timeout(None)
            .max_lifetime(None)
            .connection_timeout(config.busy_timeout)
            .build(manager)
            .map_err(|err| {
                error!(
                    "event=store_open module=db status=error mode={} duration_ms={} error_code=pool_build_failed error={}",
                    mode,
                    started_at.elapsed().as_millis(),
                    err
                );
                DbError::Pool(err)
            })?;

        let mut first = pool.get()?;
        apply_migrations(&mut first)?;
        drop(first);

        info!(
            "event=store_open module=db status=ok mode={} max_connections={} duration_ms={}",
            mode,
            pool.max_size(),
            started_at.elapsed().as_millis()
        );
        Ok(Self { pool, config })
    }

    /// Opens a private in-memory store, mainly for tests and tooling.
    pub fn open_in_memory() -> DbResult<Self> {
        Self::open(StoreConfig::memory())
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn max_connections(&self) -> usize {
        self.pool.max_size() as usize
    }

    /// Borrows a connection for one repository call.
    ///
    /// Blocks while the pool is exhausted. Fails with `DbError::Canceled`
    /// if `cancel` fires before a connection is available.
    pub fn checkout(&self, cancel: &Cancellation) -> DbResult<PooledConnection> {
        let started_at = Instant::now();
        let conn = loop {
            if cancel.is_cancelled() {
                return Err(DbError::Canceled);
            }

            match self.pool.get_timeout(wait_slice(cancel)) {
                Ok(conn) => break conn,
                Err(_) if cancel.is_cancelled() => return Err(DbError::Canceled),
                // Every connection is lent out, or a new one is still opening.
                Err(_)
                    if self.pool_exhausted() || started_at.elapsed() < self.config.busy_timeout =>
                {
                    continue
                }
                Err(err) => {
                    debug!("event=store_checkout module=db status=error error={err}");
                    return Err(DbError::Pool(err));
                }
            }
        };

        let token = cancel.clone();
        conn.progress_handler(PROGRESS_OPS, Some(move || token.is_cancelled()));
        Ok(PooledConnection { conn })
    }

    fn pool_exhausted(&self) -> bool {
        let state = self.pool.state();
        state.idle_connections == 0 && state.connections >= self.pool.max_size()
    }
}

/// Next wait, shortened so an approaching deadline is noticed on time.
fn wait_slice(cancel: &Cancellation) -> Duration {
    match cancel.deadline() {
        Some(deadline) => deadline
            .saturating_duration_since(Instant::now())
            .min(POOL_WAIT_SLICE),
        None => POOL_WAIT_SLICE,
    }
}

/// Connection lent out by [`Store::checkout`]; returned to the pool on drop.
pub struct PooledConnection {
    conn: r2d2::PooledConnection<SqliteConnectionManager>,
}

impl Debug for PooledConnection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection").finish_non_exhaustive()
    }
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.conn
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        self.conn.progress_handler(0, None::<fn() -> bool>);
    }
}

#[cfg(test)]
mod tests {
    use super::{wait_slice, Store, StoreConfig, POOL_WAIT_SLICE};
    use crate::db::DbError;
    use crate::model::context::Cancellation;
    use std::time::Duration;

    #[test]
    fn memory_store_is_capped_at_one_connection() {
        let mut config = StoreConfig::memory();
        config.max_connections = 8;
        let store = Store::open(config).unwrap();
        assert_eq!(store.max_connections(), 1);
    }

    #[test]
    fn checkout_fails_fast_when_already_canceled() {
        let store = Store::open_in_memory().unwrap();
        let cancel = Cancellation::new();
        cancel.cancel();
        let err = store.checkout(&cancel).unwrap_err();
        assert!(matches!(err, DbError::Canceled));
    }

    #[test]
    fn blocked_checkout_honours_cancellation() {
        let store = Store::open_in_memory().unwrap();
        let live = Cancellation::new();
        let _held = store.checkout(&live).unwrap();

        let timed = Cancellation::with_timeout(Duration::from_millis(50));
        let err = store.checkout(&timed).unwrap_err();
        assert!(err.is_canceled());
    }

    #[test]
    fn memory_data_survives_between_checkouts() {
        let store = Store::open_in_memory().unwrap();
        let cancel = Cancellation::new();
        {
            let conn = store.checkout(&cancel).unwrap();
            conn.execute_batch("CREATE TABLE scratch (v INTEGER); INSERT INTO scratch VALUES (7);")
                .unwrap();
        }
        let conn = store.checkout(&cancel).unwrap();
        let value: i64 = conn
            .query_row("SELECT v FROM scratch;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn wait_slice_never_outlasts_deadline() {
        assert_eq!(wait_slice(&Cancellation::new()), POOL_WAIT_SLICE);
        let nearly_due = Cancellation::with_timeout(Duration::from_millis(5));
        assert!(wait_slice(&nearly_due) <= Duration::from_millis(5));
        let overdue = Cancellation::with_timeout(Duration::ZERO);
        assert_eq!(wait_slice(&overdue), Duration::ZERO);
    }
}
