//! DuckDB connection and schema bootstrap
//!
//! A native DuckDB file (or `:memory:`) is used directly. PostgreSQL and
//! MySQL targets are attached through DuckDB's extensions as `warehouse`,
//! and their tables are created with native DDL on the remote side.

use crate::config::{DatabaseConfig, DbEngine};
use crate::error::{Error, Result};
use duckdb::{Connection, Transaction};
use tracing::{debug, info};

/// Truncate-and-reload staging table
pub const STAGING_TABLE: &str = "stg_category_apis";

/// Warehouse categories table
pub const CATEGORIES_TABLE: &str = "categories";

/// Warehouse APIs table
pub const APIS_TABLE: &str = "apis";

/// Longest category or API value the tables accept
pub const MAX_VALUE_LEN: usize = 128;

/// Catalog name used for attached engines
const ATTACHED_AS: &str = "warehouse";

/// An open store plus the schema its tables live in
pub struct Store {
    conn: Connection,
    engine: DbEngine,
    schema: String,
    connection_info: String,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("engine", &self.engine)
            .field("schema", &self.schema)
            .field("connection", &self.connection_info)
            .finish_non_exhaustive()
    }
}

impl Store {
    /// Open the store described by `config`
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        let (conn, connection_info) = match config.engine {
            DbEngine::Duckdb => {
                let conn = if config.path == ":memory:" {
                    Connection::open_in_memory()
                } else {
                    Connection::open(&config.path)
                }
                .map_err(|e| {
                    Error::config(format!("Failed to open DuckDB at {}: {e}", config.path))
                })?;
                (conn, config.path.clone())
            }
            DbEngine::Postgres | DbEngine::Mysql => {
                let conn = Connection::open_in_memory().map_err(|e| {
                    Error::config(format!("Failed to create DuckDB connection: {e}"))
                })?;
                attach(&conn, config)?;
                (conn, connection_string(config, true))
            }
        };

        info!("Opened {:?} store at {}", config.engine, connection_info);

        Ok(Self {
            conn,
            engine: config.engine,
            schema: config.schema.clone(),
            connection_info,
        })
    }

    /// Fresh in-memory DuckDB store using `schema`
    pub fn open_in_memory(schema: impl Into<String>) -> Result<Self> {
        let config = DatabaseConfig {
            schema: schema.into(),
            ..DatabaseConfig::in_memory()
        };
        Self::open(&config)
    }

    /// Where the store points, with any password masked
    pub fn connection_info(&self) -> &str {
        &self.connection_info
    }

    /// Schema holding the tables
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Schema-qualified table name
    pub fn table(&self, name: &str) -> String {
        format!("{}.{}", self.schema, name)
    }

    /// Underlying connection
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Begin a transaction; dropping it without `commit` rolls back
    pub fn transaction(&mut self) -> Result<Transaction<'_>> {
        Ok(self.conn.transaction()?)
    }

    /// Create the staging table if it does not exist
    pub fn ensure_staging(&self) -> Result<()> {
        self.create_schema()?;
        let table = self.table(STAGING_TABLE);
        let ddl = match self.engine {
            // DuckDB accepts VARCHAR(n) but does not enforce the length
            DbEngine::Duckdb => format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    category VARCHAR({MAX_VALUE_LEN}) NOT NULL CHECK (length(category) <= {MAX_VALUE_LEN}),
                    api VARCHAR({MAX_VALUE_LEN}) NOT NULL CHECK (length(api) <= {MAX_VALUE_LEN})
                )"
            ),
            DbEngine::Postgres | DbEngine::Mysql => format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    category VARCHAR({MAX_VALUE_LEN}) NOT NULL,
                    api VARCHAR({MAX_VALUE_LEN}) NOT NULL
                )"
            ),
        };
        self.run_ddl(&[ddl])
    }

    /// Create the schema, staging table and warehouse tables if absent
    pub fn ensure_schema(&self) -> Result<()> {
        self.ensure_staging()?;

        let categories = self.table(CATEGORIES_TABLE);
        let apis = self.table(APIS_TABLE);
        let statements = match self.engine {
            DbEngine::Duckdb => {
                let categories_seq = self.table("categories_id_seq");
                let apis_seq = self.table("apis_id_seq");
                vec![
                    format!("CREATE SEQUENCE IF NOT EXISTS {categories_seq} START 1"),
                    format!(
                        "CREATE TABLE IF NOT EXISTS {categories} (
                            id INTEGER PRIMARY KEY DEFAULT nextval('{categories_seq}'),
                            category VARCHAR({MAX_VALUE_LEN}) NOT NULL UNIQUE,
                            created_at TIMESTAMPTZ NOT NULL DEFAULT current_timestamp
                        )"
                    ),
                    format!("CREATE SEQUENCE IF NOT EXISTS {apis_seq} START 1"),
                    format!(
                        "CREATE TABLE IF NOT EXISTS {apis} (
                            id INTEGER PRIMARY KEY DEFAULT nextval('{apis_seq}'),
                            category_id INTEGER NOT NULL REFERENCES {categories} (id),
                            api VARCHAR({MAX_VALUE_LEN}) NOT NULL,
                            created_at TIMESTAMPTZ NOT NULL DEFAULT current_timestamp,
                            UNIQUE (category_id, api)
                        )"
                    ),
                ]
            }
            DbEngine::Postgres => vec![
                format!(
                    "CREATE TABLE IF NOT EXISTS {categories} (
                        id SERIAL PRIMARY KEY,
                        category VARCHAR({MAX_VALUE_LEN}) NOT NULL UNIQUE,
                        created_at TIMESTAMP NOT NULL DEFAULT now()
                    )"
                ),
                format!(
                    "CREATE TABLE IF NOT EXISTS {apis} (
                        id SERIAL PRIMARY KEY,
                        category_id INTEGER NOT NULL REFERENCES {categories} (id),
                        api VARCHAR({MAX_VALUE_LEN}) NOT NULL,
                        created_at TIMESTAMP NOT NULL DEFAULT now(),
                        UNIQUE (category_id, api)
                    )"
                ),
            ],
            DbEngine::Mysql => vec![
                format!(
                    "CREATE TABLE IF NOT EXISTS {categories} (
                        id INT AUTO_INCREMENT PRIMARY KEY,
                        category VARCHAR({MAX_VALUE_LEN}) NOT NULL UNIQUE,
                        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
                    )"
                ),
                format!(
                    "CREATE TABLE IF NOT EXISTS {apis} (
                        id INT AUTO_INCREMENT PRIMARY KEY,
                        category_id INT NOT NULL,
                        api VARCHAR({MAX_VALUE_LEN}) NOT NULL,
                        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                        UNIQUE (category_id, api),
                        FOREIGN KEY (category_id) REFERENCES {categories} (id)
                    )"
                ),
            ],
        };

        self.run_ddl(&statements)?;
        debug!("Schema {} is ready", self.schema);
        Ok(())
    }

    /// Number of rows currently in the staging table
    pub fn staging_count(&self) -> Result<usize> {
        self.count(STAGING_TABLE)
    }

    /// Row count of a table in this store's schema
    pub(crate) fn count(&self, name: &str) -> Result<usize> {
        let sql = format!("SELECT count(*) FROM {}", self.table(name));
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    fn create_schema(&self) -> Result<()> {
        self.run_ddl(&[format!("CREATE SCHEMA IF NOT EXISTS {}", self.schema)])
    }

    /// Native DuckDB runs DDL directly; attached engines get it verbatim on
    /// the remote side, then DuckDB's catalog cache is cleared.
    fn run_ddl(&self, statements: &[String]) -> Result<()> {
        let (execute, clear_cache) = match self.engine {
            DbEngine::Duckdb => {
                for statement in statements {
                    self.conn.execute_batch(statement)?;
                }
                return Ok(());
            }
            DbEngine::Postgres => ("postgres_execute", "pg_clear_cache"),
            DbEngine::Mysql => ("mysql_execute", "mysql_clear_cache"),
        };

        for statement in statements {
            self.conn.execute_batch(&format!(
                "CALL {execute}('{ATTACHED_AS}', '{}')",
                escape_literal(statement)
            ))?;
        }
        self.conn.execute_batch(&format!("CALL {clear_cache}()"))?;
        Ok(())
    }
}

/// Load the engine's extension and attach the target as `warehouse`
fn attach(conn: &Connection, config: &DatabaseConfig) -> Result<()> {
    let (extension, kind) = match config.engine {
        DbEngine::Postgres => ("postgres", "POSTGRES"),
        DbEngine::Mysql => ("mysql", "MYSQL"),
        DbEngine::Duckdb => return Ok(()),
    };

    conn.execute_batch(&format!("INSTALL {extension}; LOAD {extension};"))
        .map_err(|e| Error::config(format!("Failed to load {extension} extension: {e}")))?;

    let attach_sql = format!(
        "ATTACH '{}' AS {ATTACHED_AS} (TYPE {kind}); USE {ATTACHED_AS};",
        escape_literal(&connection_string(config, false))
    );
    conn.execute_batch(&attach_sql).map_err(|e| {
        Error::config(format!(
            "Failed to attach {kind} at {}: {e}",
            connection_string(config, true)
        ))
    })?;
    Ok(())
}

/// URI for an attached engine; `mask` hides the password
pub(crate) fn connection_string(config: &DatabaseConfig, mask: bool) -> String {
    let scheme = match config.engine {
        DbEngine::Postgres => "postgresql",
        DbEngine::Mysql => "mysql",
        DbEngine::Duckdb => return config.path.clone(),
    };

    let user = config.username.as_deref().unwrap_or("postgres");
    let password = match (&config.password, mask) {
        (Some(_), true) => "***",
        (Some(password), false) => password.as_str(),
        (None, _) => "",
    };
    let port = config
        .port
        .or_else(|| config.engine.default_port())
        .unwrap_or_default();
    let database = config.database.as_deref().unwrap_or("postgres");

    format!(
        "{scheme}://{user}:{password}@{}:{port}/{database}",
        config.host
    )
}

fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}
