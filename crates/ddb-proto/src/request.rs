use crate::error::FormatError;
use crate::{Condition, Path, PathSegment, Value};

/// Opaque object identifier, as allocated by `Engine::get_new_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(pub i64);

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single `(path, value)` leaf, relative to whatever root it is about to
/// be written under. This is what `Field Codec::flatten` produces.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldWrite {
    pub path: Path,
    pub value: Value,
}

impl FieldWrite {
    pub fn new(path: Path, value: impl Into<Value>) -> Self {
        FieldWrite {
            path,
            value: value.into(),
        }
    }
}

/// The tagged request variant consumed by the Logic Layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Create {
        path: Option<Path>,
        fields: Vec<FieldWrite>,
    },
    Modify {
        id: ObjectId,
        path: Path,
        fields: Vec<FieldWrite>,
        remove_conflicts: bool,
    },
    Insert {
        id: ObjectId,
        path: Path,
        field_groups: Vec<Vec<FieldWrite>>,
        remove_conflicts: bool,
    },
    Read {
        id: ObjectId,
        path: Option<Path>,
        masks: Option<Vec<Path>>,
    },
    Delete {
        id: ObjectId,
        fields: Option<Vec<Path>>,
    },
    Search {
        condition: Option<Condition>,
    },
    ObjectExists {
        id: ObjectId,
    },
    Dump,
    Repair,
}

impl Request {
    /// Build an `Insert` request, validating the target path's shape: every
    /// segment but the last must be a concrete key or index, and the last
    /// must be a concrete index (insert before it) or a wildcard (append).
    pub fn insert(
        id: ObjectId,
        path: Path,
        field_groups: Vec<Vec<FieldWrite>>,
        remove_conflicts: bool,
    ) -> Result<Request, FormatError> {
        let segments = path.segments();
        if let Some((last, rest)) = segments.split_last() {
            if rest.iter().any(|s| matches!(s, PathSegment::Wildcard)) {
                return Err(FormatError::WildcardBeforeLastSegment);
            }
            if !matches!(last, PathSegment::Index(_) | PathSegment::Wildcard) {
                return Err(FormatError::BadInsertTarget);
            }
        } else {
            return Err(FormatError::BadInsertTarget);
        }

        Ok(Request::Insert {
            id,
            path,
            field_groups,
            remove_conflicts,
        })
    }
}
