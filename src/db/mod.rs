//! Database connection and operations

pub mod json_column;
pub mod pagination;
pub mod users;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

use crate::config::DatabaseConfig;
use crate::error::AppError;

pub use json_column::JsonColumn;
pub use pagination::{
    translate_order_by, FilteredQuery, OrderClause, OrderDirection, OrderMap, PaginationFilter,
    PaginationResult,
};
pub use users::{CreateUser, UserFilter, UserMetadata, UserRecord, UserRepository, UserStatus, UserStore, UserUpdate};

/// Connection key used when no logical connection name or search path is
/// configured. Mirrors the `<name>-<search-path>` key scheme.
pub const DEFAULT_CONN_NAME: &str = "default";
pub const DEFAULT_SEARCH_PATH: &str = "public";

/// Database wrapper providing connection pool access
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database wrapper from an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pooled connection with the configured pool limits
    pub async fn connect(cfg: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .min_connections(cfg.max_idle_conns)
            .max_connections(cfg.max_open_conns)
            .max_lifetime(cfg.conn_max_lifetime)
            .connect(&cfg.url())
            .await?;

        Ok(Self { pool })
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Liveness probe, raced against the caller's cancellation token
    pub async fn ping(&self, cancel: &CancellationToken) -> Result<(), AppError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(AppError::Cancelled),
            result = sqlx::query("SELECT 1").execute(&self.pool) => {
                result?;
                Ok(())
            }
        }
    }

    /// Run database migrations
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Capability to open and probe a connection handle. Injected into
/// [ConnectionCache] so the open/ping sequence can be replaced in tests.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Handle: Clone + Send + Sync + 'static;

    async fn open(&self) -> Result<Self::Handle, AppError>;

    async fn ping(&self, handle: &Self::Handle, cancel: &CancellationToken) -> Result<(), AppError>;
}

/// Production connector: opens a pooled PostgreSQL connection from config.
pub struct PgConnector {
    cfg: DatabaseConfig,
}

impl PgConnector {
    pub fn new(cfg: DatabaseConfig) -> Self {
        Self { cfg }
    }
}

#[async_trait]
impl Connector for PgConnector {
    type Handle = Database;

    async fn open(&self) -> Result<Database, AppError> {
        Ok(Database::connect(&self.cfg).await?)
    }

    async fn ping(&self, handle: &Database, cancel: &CancellationToken) -> Result<(), AppError> {
        handle.ping(cancel).await
    }
}

/// Keyed, lazily initialized cache of pooled connection handles.
///
/// Per key the lifecycle is: uninitialized → initializing (exactly one
/// caller opens and validates, concurrent callers await the same attempt)
/// → ready → on a failed probe the entry is evicted and the next fetch
/// re-initializes. Failed attempts leave the slot empty, so errors are
/// never cached.
pub struct ConnectionCache<C: Connector> {
    connector: C,
    handles: Mutex<HashMap<String, Arc<OnceCell<C::Handle>>>>,
}

impl<C: Connector> ConnectionCache<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Compose the cache key for a logical connection name and schema
    /// search path.
    pub fn key(conn_name: &str, search_path: &str) -> String {
        format!("{conn_name}-{search_path}")
    }

    /// Fetch the handle for `key`, opening it on first use.
    ///
    /// An already-cancelled token short-circuits before any I/O. A cached
    /// handle is revalidated with a probe on every fetch; a failed probe
    /// evicts the entry and falls through to reinitialization.
    pub async fn get(&self, key: &str, cancel: &CancellationToken) -> Result<C::Handle, AppError> {
        if cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }

        let cell = self.cell_for(key);
        if let Some(handle) = cell.get() {
            if self.connector.ping(handle, cancel).await.is_ok() {
                return Ok(handle.clone());
            }
            self.evict(key, &cell);
        }

        let cell = self.cell_for(key);
        let handle = cell
            .get_or_try_init(|| async {
                let handle = self.connector.open().await?;
                self.connector.ping(&handle, cancel).await?;
                Ok::<_, AppError>(handle)
            })
            .await?;

        Ok(handle.clone())
    }

    fn cell_for(&self, key: &str) -> Arc<OnceCell<C::Handle>> {
        let mut handles = self.handles.lock();
        handles
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    /// Drop the entry for `key`, but only if it still holds `stale` —
    /// a concurrent caller may already have replaced it.
    fn evict(&self, key: &str, stale: &Arc<OnceCell<C::Handle>>) {
        let mut handles = self.handles.lock();
        if let Some(current) = handles.get(key) {
            if Arc::ptr_eq(current, stale) {
                handles.remove(key);
            }
        }
    }
}

/// The production cache type wired through the application.
pub type DbPools = ConnectionCache<PgConnector>;
