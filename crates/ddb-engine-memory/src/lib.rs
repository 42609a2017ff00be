//! A `BTreeMap`-backed reference [`ddb_engine::Engine`] implementation: no
//! real SQL, just a small interpreter for the closed template vocabulary the
//! Structure Layer emits. Meant for tests and local experimentation, not
//! production storage — see `ddb-postgres` for that.

mod error;
mod sql;

use ddb_engine::{Engine, Row, SqlValue};
use ddb_proto::Value;
use ddb_sql::render_template_question_marks;

pub use error::MemoryEngineError;
use sql::Tables;

/// An in-process document store with no persistence and no real SQL: every
/// `execute` call renders its template through `ddb-sql` (to get quoted
/// table identifiers in the text) and hands the result to [`sql::eval`].
#[derive(Debug, Default)]
pub struct MemoryEngine {
    tables: Tables,
    next_id: i64,
    snapshot: Option<Tables>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        MemoryEngine::default()
    }
}

impl Engine for MemoryEngine {
    type Error = MemoryEngineError;

    async fn begin(&mut self) -> Result<(), Self::Error> {
        if self.snapshot.is_some() {
            return Err(MemoryEngineError::TransactionAlreadyActive);
        }
        self.snapshot = Some(self.tables.clone());
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), Self::Error> {
        self.snapshot.take().ok_or(MemoryEngineError::NoActiveTransaction)?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), Self::Error> {
        self.tables = self.snapshot.take().ok_or(MemoryEngineError::NoActiveTransaction)?;
        Ok(())
    }

    async fn close(self) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn execute(&mut self, template: &str, tables: &[&str], binds: &[SqlValue]) -> Result<Vec<Row>, Self::Error> {
        let rendered = render_template_question_marks(template, tables);
        sql::eval(&rendered.sql, binds, &mut self.tables)
    }

    async fn table_exists(&mut self, name: &str) -> Result<bool, Self::Error> {
        Ok(self.tables.contains_key(name))
    }

    async fn table_is_empty(&mut self, name: &str) -> Result<bool, Self::Error> {
        Ok(self.tables.get(name).map(|t| t.rows.is_empty()).unwrap_or(true))
    }

    async fn delete_table(&mut self, name: &str) -> Result<(), Self::Error> {
        self.tables.remove(name);
        Ok(())
    }

    async fn get_tables_list(&mut self) -> Result<Vec<String>, Self::Error> {
        Ok(self.tables.keys().cloned().collect())
    }

    async fn select_existing_tables(&mut self, names: &[String]) -> Result<Vec<String>, Self::Error> {
        Ok(names.iter().filter(|n| self.tables.contains_key(n.as_str())).cloned().collect())
    }

    fn get_column_type(&self, value: &Value) -> &'static str {
        match value {
            Value::Str(_) => "TEXT",
            Value::Int(_) | Value::Null | Value::EmptyMap | Value::EmptyList => "INTEGER",
            Value::Float(_) => "REAL",
            Value::Bytes(_) => "BLOB",
        }
    }

    fn get_id_type(&self) -> &'static str {
        "INTEGER"
    }

    fn get_regexp_op(&self) -> &'static str {
        "REGEXP"
    }

    async fn get_new_id(&mut self) -> Result<i64, Self::Error> {
        self.next_id += 1;
        Ok(self.next_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allocates_increasing_ids() {
        let mut engine = MemoryEngine::new();
        let a = engine.get_new_id().await.unwrap();
        let b = engine.get_new_id().await.unwrap();
        assert!(b > a);
    }

    #[tokio::test]
    async fn create_table_then_query_through_execute() {
        let mut engine = MemoryEngine::new();
        engine
            .execute("CREATE TABLE {} (id INTEGER, field TEXT, type TEXT, refcount INTEGER)", &["id_table"], &[])
            .await
            .unwrap();
        assert!(engine.table_exists("id_table").await.unwrap());
        assert!(engine.table_is_empty("id_table").await.unwrap());

        engine
            .execute(
                "INSERT INTO {} VALUES (?, ?, ?, ?)",
                &["id_table"],
                &[SqlValue::Id(1), SqlValue::Str("name".into()), SqlValue::Str("str".into()), SqlValue::Int(1)],
            )
            .await
            .unwrap();
        assert!(!engine.table_is_empty("id_table").await.unwrap());

        let rows = engine
            .execute("SELECT COUNT(*) FROM {} WHERE id=?", &["id_table"], &[SqlValue::Id(1)])
            .await
            .unwrap();
        assert_eq!(rows[0].get_i64(0), Some(1));
    }

    #[tokio::test]
    async fn rollback_restores_pre_transaction_state() {
        let mut engine = MemoryEngine::new();
        engine
            .execute("CREATE TABLE {} (id INTEGER)", &["t"], &[])
            .await
            .unwrap();
        engine.begin().await.unwrap();
        engine.execute("INSERT INTO {} VALUES (?)", &["t"], &[SqlValue::Id(1)]).await.unwrap();
        engine.rollback().await.unwrap();
        assert!(engine.table_is_empty("t").await.unwrap());
    }
}
