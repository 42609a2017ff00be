//! Document shredding, refcounted field storage, condition compilation, and
//! transaction-scoped request processing, generic over any [`ddb_engine::Engine`].

mod codec;
mod columns;
mod condition;
mod error;
mod logic;
mod session;
mod structure;

pub use codec::{build, flatten};
pub use error::Error;
pub use logic::{Logic, Response};
pub use session::Session;
pub use structure::{CompiledQuery, Structure};
