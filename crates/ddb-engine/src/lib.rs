mod row;

pub use row::{Row, SqlValue};

use ddb_proto::{Path, Value};

/// The narrow interface the Structure Layer requires from any relational
/// backend. A type implementing this trait knows how to quote identifiers,
/// bind parameters, and allocate ids; it knows nothing about documents,
/// fields, or conditions — that vocabulary lives entirely in `ddb-core`.
///
/// Methods are plain `async fn`s (no `async-trait` box): `ddb-core` is
/// generic over `E: Engine`, never boxes or dynamic-dispatches an engine, so
/// there is nothing for a vtable to buy here.
pub trait Engine: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Start a transaction. Calling `begin` while already inside one is an
    /// engine-level error (surfaced by the caller as `FacadeError`).
    async fn begin(&mut self) -> Result<(), Self::Error>;

    /// Commit the current transaction.
    async fn commit(&mut self) -> Result<(), Self::Error>;

    /// Roll back the current transaction.
    async fn rollback(&mut self) -> Result<(), Self::Error>;

    /// Release any held resources (connection, pool checkout, ...).
    async fn close(self) -> Result<(), Self::Error>;

    /// Execute a templated statement and return the rows it produced.
    ///
    /// `template` uses `{}` positional slots, filled in order by `tables`
    /// (already-quoted table identifiers), and `?` for bound parameters,
    /// filled in order by `binds`. Concrete adapters rewrite both before
    /// handing the statement to their driver (see `ddb-sql::render_template`).
    async fn execute(
        &mut self,
        template: &str,
        tables: &[&str],
        binds: &[SqlValue],
    ) -> Result<Vec<Row>, Self::Error>;

    /// Whether a table with this exact name currently exists.
    async fn table_exists(&mut self, name: &str) -> Result<bool, Self::Error>;

    /// Whether a table exists and has zero rows. Implementations may assume
    /// the table exists; callers check `table_exists` first when it matters.
    async fn table_is_empty(&mut self, name: &str) -> Result<bool, Self::Error>;

    /// Drop a table. No-op (not an error) if it does not exist.
    async fn delete_table(&mut self, name: &str) -> Result<(), Self::Error>;

    /// List every table this engine currently manages (used by `repair`).
    async fn get_tables_list(&mut self) -> Result<Vec<String>, Self::Error>;

    /// Filter `names` down to the subset that currently exist, preserving
    /// input order. Lets the Structure Layer avoid a round trip per name.
    async fn select_existing_tables(&mut self, names: &[String]) -> Result<Vec<String>, Self::Error>;

    /// The physical column type name to use for a per-field table's `value`
    /// column, given a sample value of the type that column will hold.
    fn get_column_type(&self, value: &Value) -> &'static str;

    /// The physical column type name used for `id` and index columns.
    fn get_id_type(&self) -> &'static str;

    /// The infix operator this backend uses for regex matching.
    fn get_regexp_op(&self) -> &'static str;

    /// Allocate a fresh, previously-unused object id.
    async fn get_new_id(&mut self) -> Result<i64, Self::Error>;

    /// The table/identifier name an adapter would give a path's `name_str`
    /// (or, as here, a bare support-table name). Provided because every
    /// adapter we ship quotes identifiers the same way (`Path::encode*`
    /// already produced a valid bare name); override only if a backend needs
    /// different quoting.
    fn get_name_string(&self, path: &Path) -> String {
        path.encode_no_type()
    }
}
