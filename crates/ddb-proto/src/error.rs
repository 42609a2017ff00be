use thiserror::Error;

/// Malformed request at construction time.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("map key {0:?} must not contain '.' or '#' (reserved for field-name encoding)")]
    ReservedCharacterInKey(String),

    #[error("insert target field's last segment must be an integer index or a wildcard")]
    BadInsertTarget,

    #[error("insert target field must not contain wildcards except as its last segment")]
    WildcardBeforeLastSegment,
}
