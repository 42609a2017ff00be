use indexmap::IndexMap;

/// The client's view of stored data: nested maps, lists, and scalars.
///
/// Map key order is preserved (via `IndexMap`) purely so that round-trip
/// tests and snapshots are deterministic; map iteration order is never
/// load-bearing for correctness.
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    Null,
    Str(String),
    Int(i64),
    Float(f64),
    Bytes(Vec<u8>),
    Map(IndexMap<String, Document>),
    List(Vec<Document>),
}

impl Document {
    pub fn map(entries: impl IntoIterator<Item = (String, Document)>) -> Document {
        Document::Map(entries.into_iter().collect())
    }

    pub fn list(items: impl IntoIterator<Item = Document>) -> Document {
        Document::List(items.into_iter().collect())
    }

    pub fn is_empty_map(&self) -> bool {
        matches!(self, Document::Map(m) if m.is_empty())
    }

    pub fn is_empty_list(&self) -> bool {
        matches!(self, Document::List(l) if l.is_empty())
    }
}

impl From<&str> for Document {
    fn from(s: &str) -> Self {
        Document::Str(s.to_string())
    }
}

impl From<String> for Document {
    fn from(s: String) -> Self {
        Document::Str(s)
    }
}

impl From<i64> for Document {
    fn from(i: i64) -> Self {
        Document::Int(i)
    }
}

impl From<f64> for Document {
    fn from(f: f64) -> Self {
        Document::Float(f)
    }
}
