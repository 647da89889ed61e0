//! PostgreSQL implementation of the storage ports.
//!
//! Every call opens its own connection and closes it before returning.
//! Transactions are committed explicitly; any early return drops the
//! transaction, which rolls it back.

use super::{DatabaseCreation, RecordSource, Warehouse};
use crate::config::{validate_identifier, DatabaseConfig};
use crate::errors::{ConfigError, StoreError};
use crate::query::{AggregationQuery, BucketRow};
use crate::records::{COLUMNS, TABLE_NAME};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::PgConnection;
use sqlx::{Connection, Executor, Row};
use std::path::Path;
use tokio::io::{AsyncReadExt, BufReader};
use tracing::{debug, info, warn};

/// SQLSTATE for `duplicate_database`.
const DUPLICATE_DATABASE: &str = "42P04";

const COPY_CHUNK: usize = 64 * 1024;

const CREATE_TABLE: &str = "CREATE TABLE influd_data (
    id BIGSERIAL,
    origin_id BIGINT NOT NULL,
    data_preenchimento DATE,
    vacina_covid INTEGER,
    vacina_gripe INTEGER,
    internado_hospital INTEGER,
    data_internacao_hospital DATE,
    internado_uti INTEGER,
    data_entrada_uti DATE,
    data_saida_uti DATE,
    diagnostico_final INTEGER,
    evolucao INTEGER,
    data_evolucao DATE,
    data_primeiro_sintoma DATE,
    PRIMARY KEY (id, origin_id)
)";

/// Store backed by a PostgreSQL server.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    server_url: String,
    database: String,
    admin_database: String,
}

impl PostgresStore {
    /// Creates a store from validated settings.
    ///
    /// # Errors
    ///
    /// Returns an error if a database name is not a plain identifier.
    pub fn new(
        server_url: impl Into<String>,
        database: impl Into<String>,
        admin_database: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let database = database.into();
        let admin_database = admin_database.into();
        validate_identifier(&database)?;
        validate_identifier(&admin_database)?;
        Ok(Self {
            server_url: server_url.into(),
            database,
            admin_database,
        })
    }

    /// Creates a store from the configuration section.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotConfigured` without a server URL.
    pub fn from_config(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let url = config
            .server_url
            .clone()
            .ok_or_else(|| StoreError::NotConfigured("POSTGRES_SERVER_URL is not set".into()))?;
        Self::new(url, &config.name, &config.admin_name)
            .map_err(|err| StoreError::NotConfigured(err.to_string()))
    }

    fn url_for(&self, database: &str) -> String {
        format!("{}{}", self.server_url, database)
    }

    async fn connect(&self, database: &str) -> Result<PgConnection, StoreError> {
        debug!(database, "Connecting");
        Ok(PgConnection::connect(&self.url_for(database)).await?)
    }
}

#[async_trait]
impl RecordSource for PostgresStore {
    async fn aggregate(&self, query: &AggregationQuery) -> Result<Vec<BucketRow>, StoreError> {
        let sql = query.sql();
        let mut conn = self.connect(&self.database).await?;

        let mut statement = sqlx::query(&sql).bind(query.group_by.unit());
        if let Some(range) = query.range {
            statement = statement.bind(range.start).bind(range.end);
        }
        let rows = statement.fetch_all(&mut conn).await?;
        conn.close().await?;

        let columns = query.metric.value_columns();
        let mut buckets = Vec::with_capacity(rows.len());
        for row in rows {
            // Records without the metric's date fall into a NULL bucket.
            let Some(bucket) = row.try_get::<Option<NaiveDate>, _>("bucket")? else {
                continue;
            };
            let counts = columns
                .iter()
                .map(|(_, alias)| row.try_get::<i64, _>(*alias))
                .collect::<Result<Vec<_>, _>>()?;
            buckets.push(BucketRow {
                bucket,
                label: query.group_by.format(bucket),
                counts,
            });
        }
        Ok(buckets)
    }

    async fn has_records_on(&self, date: NaiveDate) -> Result<bool, StoreError> {
        let mut conn = self.connect(&self.database).await?;
        let found: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM influd_data WHERE data_preenchimento = $1)",
        )
        .bind(date)
        .fetch_one(&mut conn)
        .await?;
        conn.close().await?;
        Ok(found)
    }

    async fn latest_record_date(&self) -> Result<Option<NaiveDate>, StoreError> {
        let mut conn = self.connect(&self.database).await?;
        let latest: Option<NaiveDate> =
            sqlx::query_scalar("SELECT MAX(data_preenchimento) FROM influd_data")
                .fetch_one(&mut conn)
                .await?;
        conn.close().await?;
        Ok(latest)
    }
}

#[async_trait]
impl Warehouse for PostgresStore {
    async fn create_database(&self) -> Result<DatabaseCreation, StoreError> {
        let mut conn = self.connect(&self.admin_database).await?;
        // CREATE DATABASE cannot run inside a transaction block, so it goes
        // through the simple query protocol.
        let statement = format!("CREATE DATABASE {}", self.database);
        let outcome = match (&mut conn).execute(statement.as_str()).await {
            Ok(_) => {
                info!(database = %self.database, "Database created");
                Ok(DatabaseCreation::Created)
            }
            Err(sqlx::Error::Database(db))
                if db.code().as_deref() == Some(DUPLICATE_DATABASE) =>
            {
                info!(database = %self.database, "Database already exists");
                Ok(DatabaseCreation::AlreadyExists)
            }
            Err(err) => Err(StoreError::from(err)),
        };
        conn.close().await?;
        outcome
    }

    async fn recreate_table(&self) -> Result<(), StoreError> {
        let mut conn = self.connect(&self.database).await?;
        let mut tx = conn.begin().await?;
        sqlx::query("DROP TABLE IF EXISTS influd_data")
            .execute(&mut *tx)
            .await?;
        sqlx::query(CREATE_TABLE).execute(&mut *tx).await?;
        tx.commit().await?;
        conn.close().await?;
        info!(table = TABLE_NAME, "Table recreated");
        Ok(())
    }

    async fn bulk_load(&self, path: &Path) -> Result<u64, StoreError> {
        let file = tokio::fs::File::open(path).await?;
        let mut conn = self.connect(&self.database).await?;
        let mut tx = conn.begin().await?;

        let statement = format!(
            "COPY {TABLE_NAME} ({}) FROM STDIN WITH (FORMAT csv, DELIMITER ';', NULL '', HEADER true)",
            COLUMNS.join(", ")
        );
        let mut copy = tx.copy_in_raw(&statement).await?;
        let mut reader = BufReader::with_capacity(COPY_CHUNK, file);
        let mut chunk = vec![0u8; COPY_CHUNK];
        loop {
            let read = match reader.read(&mut chunk).await {
                Ok(0) => break,
                Ok(read) => read,
                Err(err) => {
                    copy.abort(err.to_string()).await?;
                    return Err(err.into());
                }
            };
            if let Err(err) = copy.send(&chunk[..read]).await {
                warn!(path = %path.display(), error = %err, "Bulk load aborted");
                return Err(err.into());
            }
        }
        let rows = copy.finish().await?;

        tx.commit().await?;
        conn.close().await?;
        info!(rows, path = %path.display(), "Bulk load committed");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_unsafe_database_names() {
        assert!(PostgresStore::new("postgresql://localhost/", "srag; DROP", "postgres").is_err());
        assert!(PostgresStore::new("postgresql://localhost/", "srag_brasil", "postgres").is_ok());
    }

    #[test]
    fn test_from_config_requires_url() {
        let err = PostgresStore::from_config(&DatabaseConfig::default()).unwrap_err();
        assert!(matches!(err, StoreError::NotConfigured(_)));
    }

    #[test]
    fn test_url_appends_database() {
        let store = PostgresStore::new("postgresql://u:p@db:5432/", "srag_brasil", "postgres").unwrap();
        assert_eq!(store.url_for("postgres"), "postgresql://u:p@db:5432/postgres");
    }

    #[test]
    fn test_ddl_lists_every_loadable_column() {
        for column in COLUMNS {
            assert!(CREATE_TABLE.contains(column), "missing {column}");
        }
    }
}
