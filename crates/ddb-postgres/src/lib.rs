//! A Postgres-backed [`ddb_engine::Engine`]: every operation goes over a real
//! `tokio-postgres` connection (held directly or checked out of a
//! `deadpool-postgres` pool), with the same `tracing::debug_span!`-per-query
//! style the rest of this workspace's ancestry uses.

mod conn;
mod error;

use ddb_engine::{Engine, Row, SqlValue};
use ddb_proto::Value;
use ddb_sql::render_template_numbered;

pub use error::{PgEngineError, SqlErrorContext};

use conn::{Bind, Conn, row_from_pg};

/// Name of the sequence backing [`Engine::get_new_id`]. One sequence is
/// shared by every table: ids only need to be unique, not contiguous per
/// table, and a single sequence avoids a `CREATE SEQUENCE` per field table.
const ID_SEQUENCE: &str = "ddb_id_seq";

pub struct PgEngine {
    conn: Conn,
    in_transaction: bool,
}

impl PgEngine {
    /// Open a bare connection, spawning its driving future the way
    /// `tokio-postgres` requires (and the way the rest of this codebase's
    /// lineage always has: log and drop, nothing calls back on it).
    pub async fn connect(database_url: &str) -> Result<Self, PgEngineError> {
        let (client, connection) = tokio_postgres::connect(database_url, tokio_postgres::NoTls).await?;
        tokio::spawn(async move {
            if let Err(err) = connection.await {
                tracing::error!(error = %err, "postgres connection task failed");
            }
        });
        let mut engine = PgEngine {
            conn: Conn::Direct(client),
            in_transaction: false,
        };
        engine.ensure_id_sequence().await?;
        Ok(engine)
    }

    /// Check a connection out of a pool instead of dialing one directly.
    pub async fn from_pool(pool: &deadpool_postgres::Pool) -> Result<Self, PgEngineError> {
        let object = pool.get().await.map_err(|err| PgEngineError::Pool(err.to_string()))?;
        let mut engine = PgEngine {
            conn: Conn::Pooled(object),
            in_transaction: false,
        };
        engine.ensure_id_sequence().await?;
        Ok(engine)
    }

    async fn ensure_id_sequence(&mut self) -> Result<(), PgEngineError> {
        self.conn.execute(&format!("CREATE SEQUENCE IF NOT EXISTS {ID_SEQUENCE}"), &[]).await?;
        Ok(())
    }
}

impl Engine for PgEngine {
    type Error = PgEngineError;

    async fn begin(&mut self) -> Result<(), Self::Error> {
        if self.in_transaction {
            return Err(PgEngineError::TransactionAlreadyActive);
        }
        self.conn.execute("BEGIN", &[]).await?;
        self.in_transaction = true;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), Self::Error> {
        if !self.in_transaction {
            return Err(PgEngineError::NoActiveTransaction);
        }
        self.conn.execute("COMMIT", &[]).await?;
        self.in_transaction = false;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), Self::Error> {
        if !self.in_transaction {
            return Err(PgEngineError::NoActiveTransaction);
        }
        self.conn.execute("ROLLBACK", &[]).await?;
        self.in_transaction = false;
        Ok(())
    }

    async fn close(self) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn execute(&mut self, template: &str, tables: &[&str], binds: &[SqlValue]) -> Result<Vec<Row>, Self::Error> {
        let rendered = render_template_numbered(template, tables);
        let bound: Vec<Bind> = binds.iter().map(Bind).collect();
        let params: Vec<&(dyn tokio_postgres::types::ToSql + Sync)> = bound.iter().map(|b| b as _).collect();
        let pg_rows = self.conn.query(&rendered.sql, &params).await?;
        pg_rows.iter().map(row_from_pg).collect()
    }

    async fn table_exists(&mut self, name: &str) -> Result<bool, Self::Error> {
        let row = self
            .conn
            .query_one(
                "SELECT EXISTS (SELECT 1 FROM information_schema.tables WHERE table_schema = current_schema() AND table_name = $1)",
                &[&name],
            )
            .await?;
        Ok(row.get(0))
    }

    async fn table_is_empty(&mut self, name: &str) -> Result<bool, Self::Error> {
        let sql = format!("SELECT NOT EXISTS (SELECT 1 FROM {})", ddb_sql::quote_ident(name));
        let row = self.conn.query_one(&sql, &[]).await?;
        Ok(row.get(0))
    }

    async fn delete_table(&mut self, name: &str) -> Result<(), Self::Error> {
        let sql = format!("DROP TABLE IF EXISTS {}", ddb_sql::quote_ident(name));
        self.conn.execute(&sql, &[]).await?;
        Ok(())
    }

    async fn get_tables_list(&mut self) -> Result<Vec<String>, Self::Error> {
        let rows = self
            .conn
            .query("SELECT table_name FROM information_schema.tables WHERE table_schema = current_schema()", &[])
            .await?;
        Ok(rows.iter().map(|r| r.get::<_, String>(0)).collect())
    }

    async fn select_existing_tables(&mut self, names: &[String]) -> Result<Vec<String>, Self::Error> {
        let rows = self
            .conn
            .query(
                "SELECT table_name FROM information_schema.tables WHERE table_schema = current_schema() AND table_name = ANY($1)",
                &[&names],
            )
            .await?;
        let existing: std::collections::HashSet<String> = rows.iter().map(|r| r.get::<_, String>(0)).collect();
        Ok(names.iter().filter(|n| existing.contains(n.as_str())).cloned().collect())
    }

    fn get_column_type(&self, value: &Value) -> &'static str {
        match value {
            Value::Str(_) => "TEXT",
            Value::Int(_) | Value::Null | Value::EmptyMap | Value::EmptyList => "BIGINT",
            Value::Float(_) => "DOUBLE PRECISION",
            Value::Bytes(_) => "BYTEA",
        }
    }

    fn get_id_type(&self) -> &'static str {
        "BIGINT"
    }

    fn get_regexp_op(&self) -> &'static str {
        "~"
    }

    async fn get_new_id(&mut self) -> Result<i64, Self::Error> {
        let row = self.conn.query_one(&format!("SELECT nextval('{ID_SEQUENCE}')"), &[]).await?;
        Ok(row.get::<_, i64>(0))
    }
}
