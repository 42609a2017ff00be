//! Document/path/field/value/request types for the ddb document database.
//!
//! Pure data plus the construction-time validation that produces
//! `FormatError` — no engine dependency and no I/O.

mod condition;
mod document;
mod error;
mod path;
mod request;
mod value;

pub use condition::{Comparator, Condition, LogicalOp};
pub use document::Document;
pub use error::FormatError;
pub use path::{Path, PathSegment};
pub use request::{FieldWrite, ObjectId, Request};
pub use value::{TypeTag, Value};
