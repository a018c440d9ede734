use std::fmt;

use serde::Deserialize;

/// Database connection settings.
///
/// The SQLite backend opens `database` as a file path (`":memory:"` for an
/// ephemeral store) and treats `schema` as a label for logs. `host`, `port`,
/// `user`, `password` and `ssl_mode` describe a networked store and are
/// carried so one configuration file serves every backend.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
  pub host:           String,
  pub port:           u16,
  pub user:           String,
  pub password:       String,
  pub database:       String,
  pub schema:         String,
  pub ssl_mode:       String,
  /// Apply pending migrations on open; otherwise refuse to start behind.
  pub run_migrations: bool,
}

impl Default for DatabaseConfig {
  fn default() -> Self {
    Self {
      host:           "localhost".into(),
      port:           5432,
      user:           "postgres".into(),
      password:       String::new(),
      database:       "tenet.db".into(),
      schema:         "tenet".into(),
      ssl_mode:       "prefer".into(),
      run_migrations: true,
    }
  }
}

impl DatabaseConfig {
  pub fn in_memory() -> Self {
    Self { database: ":memory:".into(), ..Self::default() }
  }

  pub fn is_in_memory(&self) -> bool { self.database == ":memory:" }
}

impl fmt::Debug for DatabaseConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("DatabaseConfig")
      .field("host", &self.host)
      .field("port", &self.port)
      .field("user", &self.user)
      .field("password", &"[REDACTED]")
      .field("database", &self.database)
      .field("schema", &self.schema)
      .field("ssl_mode", &self.ssl_mode)
      .field("run_migrations", &self.run_migrations)
      .finish()
  }
}
