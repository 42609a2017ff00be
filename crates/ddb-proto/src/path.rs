use crate::error::FormatError;

/// One element of a path: a map key, a list index, or a wildcard that
/// matches any list index at that position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
    Wildcard,
}

impl PathSegment {
    pub fn is_integer_slot(&self) -> bool {
        matches!(self, PathSegment::Index(_) | PathSegment::Wildcard)
    }

    fn validate_key(key: &str) -> Result<(), FormatError> {
        if key.contains('.') || key.contains('#') {
            return Err(FormatError::ReservedCharacterInKey(key.to_string()));
        }
        Ok(())
    }
}

impl From<&str> for PathSegment {
    fn from(s: &str) -> Self {
        PathSegment::Key(s.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(s: String) -> Self {
        PathSegment::Key(s)
    }
}

impl From<usize> for PathSegment {
    fn from(i: usize) -> Self {
        PathSegment::Index(i)
    }
}

/// An ordered sequence of name elements. The empty path denotes the document
/// root.
///
/// `Path` doubles as a mask: a path possibly containing [`PathSegment::Wildcard`],
/// matched against concrete paths field-by-field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Path(Vec<PathSegment>);

/// Placeholder used in place of any integer segment (index or wildcard) when
/// encoding to `name_str_no_type`. Safe because map keys may not contain `#`.
const WILDCARD_PLACEHOLDER: &str = "#";
/// Separator joining encoded segments. Safe because map keys may not contain
/// `.`, so `..` can never appear as part of a key.
const SEGMENT_SEPARATOR: &str = "..";

impl Path {
    pub fn root() -> Self {
        Path(Vec::new())
    }

    pub fn new(segments: Vec<PathSegment>) -> Result<Self, FormatError> {
        for seg in &segments {
            if let PathSegment::Key(k) = seg {
                PathSegment::validate_key(k)?;
            }
        }
        Ok(Path(segments))
    }

    pub fn single(segment: impl Into<PathSegment>) -> Result<Self, FormatError> {
        Self::new(vec![segment.into()])
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&PathSegment> {
        self.0.last()
    }

    /// All segments except the last.
    pub fn parent(&self) -> Path {
        if self.0.is_empty() {
            Path(Vec::new())
        } else {
            Path(self.0[..self.0.len() - 1].to_vec())
        }
    }

    pub fn push(&mut self, segment: PathSegment) {
        self.0.push(segment);
    }

    pub fn pop(&mut self) -> Option<PathSegment> {
        self.0.pop()
    }

    pub fn with_pushed(&self, segment: PathSegment) -> Path {
        let mut p = self.clone();
        p.push(segment);
        p
    }

    /// Push a map-key segment after validating it (see [`Path::new`]).
    pub fn try_with_pushed_key(&self, key: impl Into<String>) -> Result<Path, FormatError> {
        let key = key.into();
        PathSegment::validate_key(&key)?;
        Ok(self.with_pushed(PathSegment::Key(key)))
    }

    /// Concatenate `self` (the prefix) with `suffix`'s segments.
    pub fn joined(&self, suffix: &Path) -> Path {
        let mut out = self.0.clone();
        out.extend(suffix.0.iter().cloned());
        Path(out)
    }

    /// Number of segments that occupy an integer-index column in the
    /// corresponding per-field table (both concrete indices and wildcards).
    pub fn index_column_count(&self) -> usize {
        self.0.iter().filter(|s| s.is_integer_slot()).count()
    }

    /// True iff this path contains no wildcards.
    pub fn is_determined(&self) -> bool {
        !self.0.iter().any(|s| matches!(s, PathSegment::Wildcard))
    }

    /// True iff `self` matches `mask`: same length, and each segment is
    /// either equal or the mask segment is a wildcard matched against an
    /// integer index.
    pub fn matches(&self, mask: &Path) -> bool {
        if self.0.len() != mask.0.len() {
            return false;
        }
        self.0.iter().zip(mask.0.iter()).all(|(name_seg, mask_seg)| {
            if name_seg == mask_seg {
                return true;
            }
            matches!(mask_seg, PathSegment::Wildcard) && matches!(name_seg, PathSegment::Index(_))
        })
    }

    /// Symmetric match between two masks derived from `name_str_no_type`
    /// (where concrete indices have already been erased into [`PathSegment::Wildcard`]
    /// on both sides): same length, and each segment pair is equal or at
    /// least one side is a wildcard.
    pub fn matches_symmetric(&self, other: &Path) -> bool {
        if self.0.len() != other.0.len() {
            return false;
        }
        self.0.iter().zip(other.0.iter()).all(|(a, b)| {
            if a == b {
                return true;
            }
            matches!(a, PathSegment::Wildcard) || matches!(b, PathSegment::Wildcard)
        })
    }

    /// True iff `self` is `prefix` followed by at least one more segment.
    pub fn starts_with_strictly(&self, prefix: &Path) -> bool {
        self.0.len() > prefix.0.len() && self.0[..prefix.0.len()] == prefix.0[..]
    }

    /// `name_str_no_type`: string keys in place, integer/wildcard segments
    /// replaced by a wildcard placeholder, joined by `..`.
    pub fn encode_no_type(&self) -> String {
        self.0
            .iter()
            .map(|seg| match seg {
                PathSegment::Key(k) => k.as_str(),
                PathSegment::Index(_) | PathSegment::Wildcard => WILDCARD_PLACEHOLDER,
            })
            .collect::<Vec<_>>()
            .join(SEGMENT_SEPARATOR)
    }

    /// `name_str`: `name_str_no_type` plus the type tag suffix.
    pub fn encode(&self, type_tag: crate::TypeTag) -> String {
        format!("{}.{}", self.encode_no_type(), type_tag.as_str())
    }

    /// Parse a `name_str_no_type` back into a path whose integer positions
    /// are all [`PathSegment::Wildcard`] — the encoding does not preserve
    /// concrete index values, since those live in the per-field table's
    /// index columns instead. Use [`Path::with_indices_filled`] to
    /// substitute concrete values read from those columns.
    pub fn from_name_str_no_type(encoded: &str) -> Path {
        if encoded.is_empty() {
            return Path::root();
        }
        let segments = encoded
            .split(SEGMENT_SEPARATOR)
            .map(|part| {
                if part == WILDCARD_PLACEHOLDER {
                    PathSegment::Wildcard
                } else {
                    PathSegment::Key(part.to_string())
                }
            })
            .collect();
        Path(segments)
    }

    /// Split a `name_str` into its `name_str_no_type` path and type tag.
    pub fn decode_name_str(name_str: &str) -> Option<(Path, crate::TypeTag)> {
        let (no_type, type_str) = name_str.rsplit_once('.')?;
        let tag = crate::TypeTag::parse(type_str)?;
        Some((Path::from_name_str_no_type(no_type), tag))
    }

    /// Replace, in order, every [`PathSegment::Wildcard`] (or existing
    /// [`PathSegment::Index`]) with the corresponding value from `indices`.
    pub fn with_indices_filled(&self, indices: &[i64]) -> Path {
        let mut it = indices.iter();
        let segments = self
            .0
            .iter()
            .map(|seg| match seg {
                PathSegment::Key(k) => PathSegment::Key(k.clone()),
                PathSegment::Index(_) | PathSegment::Wildcard => {
                    let v = it.next().copied().unwrap_or(0);
                    PathSegment::Index(v as usize)
                }
            })
            .collect();
        Path(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TypeTag;

    fn p(segments: Vec<PathSegment>) -> Path {
        Path::new(segments).unwrap()
    }

    #[test]
    fn encodes_keys_and_wildcards() {
        let path = p(vec![
            PathSegment::Key("tracks".into()),
            PathSegment::Index(2),
            PathSegment::Key("Lyrics".into()),
            PathSegment::Wildcard,
        ]);
        assert_eq!(path.encode_no_type(), "tracks..#..Lyrics..#");
        assert_eq!(path.encode(TypeTag::Str), "tracks..#..Lyrics..#.str");
    }

    #[test]
    fn decode_roundtrips_structure() {
        let path = p(vec![PathSegment::Key("tracks".into()), PathSegment::Index(3)]);
        let encoded = path.encode_no_type();
        let decoded = Path::from_name_str_no_type(&encoded);
        assert_eq!(
            decoded,
            p(vec![PathSegment::Key("tracks".into()), PathSegment::Wildcard])
        );
        let filled = decoded.with_indices_filled(&[3]);
        assert_eq!(filled, path);
    }

    #[test]
    fn decode_name_str_splits_type_suffix() {
        let path = p(vec![PathSegment::Key("tracks".into()), PathSegment::Wildcard]);
        let name_str = path.encode(TypeTag::Int);
        let (decoded_path, tag) = Path::decode_name_str(&name_str).unwrap();
        assert_eq!(decoded_path, path);
        assert_eq!(tag, TypeTag::Int);
    }

    #[test]
    fn rejects_reserved_characters_in_keys() {
        assert!(matches!(
            Path::single("a.b"),
            Err(FormatError::ReservedCharacterInKey(_))
        ));
        assert!(matches!(
            Path::single("a#b"),
            Err(FormatError::ReservedCharacterInKey(_))
        ));
    }

    #[test]
    fn matches_wildcards_against_integers_only() {
        let mask = p(vec![PathSegment::Key("tracks".into()), PathSegment::Wildcard]);
        let name = p(vec![PathSegment::Key("tracks".into()), PathSegment::Index(4)]);
        assert!(name.matches(&mask));

        let other = p(vec![PathSegment::Key("tracks".into()), PathSegment::Key("x".into())]);
        assert!(!other.matches(&mask));
    }

    #[test]
    fn symmetric_match_allows_wildcards_on_either_side() {
        let a = p(vec![PathSegment::Key("tracks".into()), PathSegment::Wildcard]);
        let b = p(vec![PathSegment::Key("tracks".into()), PathSegment::Index(2)]);
        assert!(a.matches_symmetric(&b));
        assert!(b.matches_symmetric(&a));

        let c = p(vec![PathSegment::Key("other".into()), PathSegment::Wildcard]);
        assert!(!a.matches_symmetric(&c));
    }

    #[test]
    fn determined_is_false_with_any_wildcard() {
        let determined = p(vec![PathSegment::Key("a".into()), PathSegment::Index(0)]);
        let not_determined = p(vec![PathSegment::Key("a".into()), PathSegment::Wildcard]);
        assert!(determined.is_determined());
        assert!(!not_determined.is_determined());
    }
}
