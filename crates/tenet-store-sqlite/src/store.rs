//! [`SqliteStore`]: the SQLite implementation of the policy repositories.
//!
//! The repository traits are implemented in the sibling modules
//! (`namespaces`, `attributes`, ...); this module owns the connection, the
//! migration gate and the two closure runners every repository goes
//! through.

use std::path::Path;

use tenet_core::store::StoreBackend;
use tracing::{debug, info};

use crate::{
  Error, Result,
  config::DatabaseConfig,
  schema::{self, PRAGMAS},
};

/// A policy store backed by a single SQLite database.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and apply pending migrations.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::connect(conn, true).await
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::connect(conn, true).await
  }

  /// Open the store described by `config`, honouring `run_migrations`.
  pub async fn open_with_config(config: &DatabaseConfig) -> Result<Self> {
    info!(
      database = %config.database,
      schema = %config.schema,
      run_migrations = config.run_migrations,
      "opening policy store"
    );
    let conn = if config.is_in_memory() {
      tokio_rusqlite::Connection::open_in_memory().await?
    } else {
      tokio_rusqlite::Connection::open(&config.database).await?
    };
    Self::connect(conn, config.run_migrations).await
  }

  async fn connect(
    conn: tokio_rusqlite::Connection,
    run_migrations: bool,
  ) -> Result<Self> {
    let store = Self { conn };
    store
      .conn
      .call(|conn| {
        conn.execute_batch(PRAGMAS)?;
        Ok(())
      })
      .await?;
    if run_migrations {
      store.migrate().await?;
    } else {
      store.verify_schema().await?;
    }
    Ok(store)
  }

  /// Apply every pending migration, returning how many ran.
  pub async fn migrate(&self) -> Result<usize> {
    let applied = self
      .conn
      .call(|conn| Ok(schema::migrate(conn)?))
      .await?;
    if applied > 0 {
      info!(applied, version = schema::latest_version(), "applied migrations");
    }
    Ok(applied)
  }

  /// Fail with [`Error::PendingMigrations`] when the schema is behind.
  pub async fn verify_schema(&self) -> Result<()> {
    let found = self
      .conn
      .call(|conn| Ok(schema::current_version(conn)?))
      .await?;
    let expected = schema::latest_version();
    if found < expected {
      return Err(Error::PendingMigrations { found, expected });
    }
    debug!(version = found, "schema is current");
    Ok(())
  }

  /// Run `f` against the connection outside any explicit transaction.
  pub(crate) async fn read<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&rusqlite::Connection) -> tokio_rusqlite::Result<T>
      + Send
      + 'static,
  {
    Ok(self.conn.call(move |conn| f(&*conn)).await?)
  }

  /// Run `f` inside a transaction that commits only if `f` succeeds.
  pub(crate) async fn write<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&rusqlite::Transaction<'_>) -> tokio_rusqlite::Result<T>
      + Send
      + 'static,
  {
    Ok(
      self
        .conn
        .call(move |conn| {
          let tx = conn.transaction()?;
          let out = f(&tx)?;
          tx.commit()?;
          Ok(out)
        })
        .await?,
    )
  }
}

impl StoreBackend for SqliteStore {
  type Error = Error;
}
