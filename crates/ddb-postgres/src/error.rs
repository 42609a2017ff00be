use thiserror::Error;

/// Extra context attached to a query that failed against the server: the SQL
/// text that was sent plus whatever Postgres was willing to say about it.
#[derive(Debug, Clone)]
pub struct SqlErrorContext {
    pub message: String,
    pub sql: String,
    pub hint: Option<String>,
    pub detail: Option<String>,
}

impl std::fmt::Display for SqlErrorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (sql: {})", self.message, self.sql)?;
        if let Some(detail) = &self.detail {
            write!(f, "\n  detail: {detail}")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "\n  hint: {hint}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum PgEngineError {
    #[error("{}", format_postgres_error(.0))]
    Postgres(#[from] tokio_postgres::Error),

    #[error("{0}")]
    SqlWithContext(SqlErrorContext),

    #[error("connection pool error: {0}")]
    Pool(String),

    #[error("not currently inside a transaction")]
    NoActiveTransaction,

    #[error("already inside a transaction")]
    TransactionAlreadyActive,

    #[error("column {column} of row had an unexpected type: {pg_type}")]
    UnsupportedColumnType { column: String, pg_type: String },
}

impl PgEngineError {
    /// Attach the SQL text that produced `err`, pulling out whatever
    /// position/hint/detail the server sent along with the failure.
    pub fn with_sql(err: tokio_postgres::Error, sql: &str) -> Self {
        match err.as_db_error() {
            Some(db_err) => PgEngineError::SqlWithContext(SqlErrorContext {
                message: format!("{}: {}", db_err.severity(), db_err.message()),
                sql: sql.to_string(),
                hint: db_err.hint().map(str::to_string),
                detail: db_err.detail().map(str::to_string),
            }),
            None => PgEngineError::Postgres(err),
        }
    }
}

fn format_postgres_error(err: &tokio_postgres::Error) -> String {
    match err.as_db_error() {
        Some(db_err) => {
            let mut msg = format!("{}: {}", db_err.severity(), db_err.message());
            if let Some(detail) = db_err.detail() {
                msg.push_str(&format!("\n  detail: {detail}"));
            }
            if let Some(hint) = db_err.hint() {
                msg.push_str(&format!("\n  hint: {hint}"));
            }
            msg
        }
        None => err.to_string(),
    }
}
