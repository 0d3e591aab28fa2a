//! Read-only access to the student exercise database.
//!
//! [`PgStore`] runs one caller-supplied read statement per call inside a
//! READ ONLY transaction and returns the rows as JSON objects keyed by
//! column name. The pooled connection goes back to the pool on every exit
//! path, errors included.

pub mod errors;
pub mod schema;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::{
    Config, ManagerConfig, PoolConfig, RecyclingMethod, Runtime, Timeouts,
};
use serde_json::Value;
use tokio_postgres::NoTls;
use tracing::{debug, info, instrument, warn};

pub use errors::{Result, StoreError};

/// Something that can run a read query and hand back JSON rows.
#[async_trait]
pub trait RowSource: Send + Sync {
    /// Executes `sql` and returns one JSON object per result row.
    async fn fetch_rows(&self, sql: &str) -> Result<Vec<Value>>;

    /// Cheap connectivity probe; returns the server clock.
    async fn ping(&self) -> Result<DateTime<Utc>>;
}

/// Connection settings, read once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: Option<String>,
    pub pool_size: usize,
    /// Upper bound for opening a connection and for waiting on the pool.
    pub connect_timeout: Duration,
}

/// Default for `DB_CONNECT_TIMEOUT_SECS`.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

impl StoreConfig {
    /// Reads `DB_HOST`, `DB_PORT`, `DB_NAME`, `DB_USER`, `DB_PASSWORD`
    /// `DB_POOL_SIZE` and `DB_CONNECT_TIMEOUT_SECS` from an environment
    /// snapshot.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        let get = |k: &str| {
            vars.get(k)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required =
            |k: &'static str| get(k).ok_or_else(|| StoreError::Config(format!("{k} is required")));
        let number = |k: &'static str, dflt: usize| match get(k) {
            Some(v) => v
                .parse::<usize>()
                .map_err(|_| StoreError::Config(format!("{k} must be a positive integer"))),
            None => Ok(dflt),
        };

        let port = number("DB_PORT", 5432)?;
        let port = u16::try_from(port)
            .map_err(|_| StoreError::Config("DB_PORT must fit in u16".into()))?;
        let pool_size = number("DB_POOL_SIZE", 16)?.max(1);
        let connect_timeout = match number("DB_CONNECT_TIMEOUT_SECS", 0)? {
            0 => DEFAULT_CONNECT_TIMEOUT,
            secs => Duration::from_secs(secs as u64),
        };

        Ok(Self {
            host: get("DB_HOST").unwrap_or_else(|| "localhost".into()),
            port,
            dbname: required("DB_NAME")?,
            user: required("DB_USER")?,
            password: get("DB_PASSWORD"),
            pool_size,
            connect_timeout,
        })
    }
}

/// Postgres-backed [`RowSource`].
pub struct PgStore {
    pool: deadpool_postgres::Pool,
}

impl PgStore {
    /// Builds the pool and tries one connection. A failed or stalled first
    /// connection is only logged: the server stays up and `/test-db`
    /// reports it.
    ///
    /// Every checkout is bounded by `connect_timeout`, so a server that
    /// accepts TCP but never completes the handshake surfaces as
    /// [`StoreError::Connection`] rather than hanging the caller.
    pub async fn connect(cfg: &StoreConfig) -> Result<Self> {
        let mut pg = Config::new();
        pg.host = Some(cfg.host.clone());
        pg.port = Some(cfg.port);
        pg.dbname = Some(cfg.dbname.clone());
        pg.user = Some(cfg.user.clone());
        pg.password = cfg.password.clone();
        pg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        pg.connect_timeout = Some(cfg.connect_timeout);
        let mut timeouts = Timeouts::default();
        timeouts.wait = Some(cfg.connect_timeout);
        timeouts.create = Some(cfg.connect_timeout);
        timeouts.recycle = Some(cfg.connect_timeout);
        let mut pool_cfg = PoolConfig::new(cfg.pool_size);
        pool_cfg.timeouts = timeouts;
        pg.pool = Some(pool_cfg);

        let pool = pg.create_pool(Some(Runtime::Tokio1), NoTls)?;

        info!(
            host = %cfg.host,
            port = cfg.port,
            db = %cfg.dbname,
            user = %cfg.user,
            pool_size = cfg.pool_size,
            connect_timeout_ms = cfg.connect_timeout.as_millis() as u64,
            "database pool created"
        );

        match pool.get().await {
            Ok(_) => info!("database connection established"),
            Err(e) => warn!(error = %e, "database not reachable at startup"),
        }

        Ok(Self { pool })
    }
}

/// Strips trailing semicolons and wraps the statement so Postgres returns
/// the whole result set as one JSON array.
pub fn wrap_as_json_array(sql: &str) -> String {
    let body = sql.trim().trim_end_matches([';', ' ', '\n', '\r', '\t']);
    format!("SELECT COALESCE(json_agg(q), '[]'::json) FROM (\n{body}\n) AS q")
}

#[async_trait]
impl RowSource for PgStore {
    #[instrument(skip_all, fields(sql_len = sql.len()))]
    async fn fetch_rows(&self, sql: &str) -> Result<Vec<Value>> {
        let wrapped = wrap_as_json_array(sql);

        let mut client = self.pool.get().await?;
        let tx = client.build_transaction().read_only(true).start().await?;
        let row = tx.query_one(wrapped.as_str(), &[]).await?;
        let value: Value = row.try_get(0)?;
        tx.commit().await?;

        match value {
            Value::Array(rows) => {
                debug!(rows = rows.len(), "query returned");
                Ok(rows)
            }
            other => Err(StoreError::Decode(format!(
                "expected a JSON array, got {}",
                json_kind(&other)
            ))),
        }
    }

    async fn ping(&self) -> Result<DateTime<Utc>> {
        let client = self.pool.get().await?;
        let row = client.query_one("SELECT NOW()", &[]).await?;
        Ok(row.try_get(0)?)
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
