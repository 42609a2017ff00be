use thiserror::Error;

/// Unified error type for the Structure and Logic layers and the `Session`
/// facade. `Engine` carries the underlying adapter's own error, boxed so
/// this type need not be generic over every engine's associated error.
#[derive(Debug, Error)]
pub enum Error {
    #[error("format error: {0}")]
    Format(#[from] ddb_proto::FormatError),

    #[error("structure error: {0}")]
    Structure(String),

    #[error("logic error: {0}")]
    Logic(String),

    #[error("facade error: {0}")]
    Facade(String),

    #[error("engine error: {0}")]
    Engine(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    pub fn engine<E>(e: E) -> Error
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Engine(Box::new(e))
    }

    pub fn structure(msg: impl Into<String>) -> Error {
        Error::Structure(msg.into())
    }

    pub fn logic(msg: impl Into<String>) -> Error {
        Error::Logic(msg.into())
    }

    pub fn facade(msg: impl Into<String>) -> Error {
        Error::Facade(msg.into())
    }
}
