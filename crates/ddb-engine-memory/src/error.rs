use thiserror::Error;

/// Failure modes of the in-memory reference engine's own little statement
/// interpreter. Every one of these indicates the Structure Layer emitted a
/// template outside the closed vocabulary this engine understands — never
/// something a caller can react to at the document level.
#[derive(Debug, Error)]
pub enum MemoryEngineError {
    #[error("unsupported statement: {0}")]
    Unsupported(String),

    #[error("no such table: {0}")]
    MissingTable(String),

    #[error("no such column: {0}")]
    MissingColumn(String),

    #[error("bound parameter count did not match `?` placeholders")]
    BindCountMismatch,

    #[error("not currently inside a transaction")]
    NoActiveTransaction,

    #[error("already inside a transaction")]
    TransactionAlreadyActive,
}
