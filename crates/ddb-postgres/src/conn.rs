//! The traced, pool-or-direct connection handle `PgEngine` drives queries
//! through, and the value <-> wire conversions either side of it.

use bytes::BytesMut;
use ddb_engine::{Row, SqlValue};
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};
use tracing::Instrument;

use crate::error::PgEngineError;

/// Either a bare connection (`PgEngine::connect`) or a pool checkout
/// (`PgEngine::from_pool`). Callers never need to know which one they hold.
pub(crate) enum Conn {
    Direct(tokio_postgres::Client),
    Pooled(deadpool_postgres::Object),
}

impl Conn {
    fn client(&self) -> &tokio_postgres::Client {
        use std::ops::Deref;
        match self {
            Conn::Direct(client) => client,
            Conn::Pooled(object) => object.deref(),
        }
    }

    pub(crate) async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Vec<tokio_postgres::Row>, PgEngineError> {
        let span = tracing::debug_span!("pg.query", sql = %sql, params = params.len());
        self.client()
            .query(sql, params)
            .instrument(span)
            .await
            .map_err(|e| PgEngineError::with_sql(e, sql))
    }

    pub(crate) async fn query_one(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<tokio_postgres::Row, PgEngineError> {
        let span = tracing::debug_span!("pg.query_one", sql = %sql, params = params.len());
        self.client()
            .query_one(sql, params)
            .instrument(span)
            .await
            .map_err(|e| PgEngineError::with_sql(e, sql))
    }

    pub(crate) async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64, PgEngineError> {
        let span = tracing::debug_span!("pg.execute", sql = %sql, params = params.len());
        self.client()
            .execute(sql, params)
            .instrument(span)
            .await
            .map_err(|e| PgEngineError::with_sql(e, sql))
    }
}

/// Wraps a `&SqlValue` so it can be handed to `tokio-postgres` as a bind
/// parameter without implementing a foreign trait on a foreign type.
pub(crate) struct Bind<'a>(pub &'a SqlValue);

impl ToSql for Bind<'_> {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self.0 {
            SqlValue::Id(v) | SqlValue::Int(v) => v.to_sql(ty, out),
            SqlValue::Float(v) => v.to_sql(ty, out),
            SqlValue::Str(v) => v.to_sql(ty, out),
            SqlValue::Bytes(v) => v.to_sql(ty, out),
            SqlValue::Null => Ok(IsNull::Yes),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

/// Read a `tokio-postgres` row back into our own value domain by inspecting
/// each column's declared wire type. We only ever create columns with the
/// four physical types `PgEngine::get_column_type`/`get_id_type` hand out, so
/// this match is exhaustive in practice, not just in principle.
pub(crate) fn row_from_pg(row: &tokio_postgres::Row) -> Result<Row, PgEngineError> {
    let mut values = Vec::with_capacity(row.len());
    for idx in 0..row.len() {
        let column = &row.columns()[idx];
        let value = match *column.type_() {
            Type::INT8 => row.get::<_, Option<i64>>(idx).map(SqlValue::Int).unwrap_or(SqlValue::Null),
            Type::FLOAT8 => row.get::<_, Option<f64>>(idx).map(SqlValue::Float).unwrap_or(SqlValue::Null),
            Type::TEXT | Type::VARCHAR => row.get::<_, Option<String>>(idx).map(SqlValue::Str).unwrap_or(SqlValue::Null),
            Type::BYTEA => row.get::<_, Option<Vec<u8>>>(idx).map(SqlValue::Bytes).unwrap_or(SqlValue::Null),
            ref other => {
                return Err(PgEngineError::UnsupportedColumnType {
                    column: column.name().to_string(),
                    pg_type: other.to_string(),
                });
            }
        };
        values.push(value);
    }
    Ok(Row::new(values))
}
