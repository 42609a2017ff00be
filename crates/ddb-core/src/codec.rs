//! Flatten a [`Document`] into the [`FieldWrite`] leaves the Structure Layer
//! stores, and build a [`Document`] back out of fields read from storage.

use ddb_proto::{Document, FieldWrite, FormatError, Path, PathSegment, Value};

/// Depth-first shredding. Maps recurse on keys, lists on 0-based indices.
/// Every interior node (map or list, empty or not) emits a sentinel field
/// *before* recursing into its children, so empty containers survive a
/// round-trip and, on overwrite, the last scalar written at a given
/// non-list path wins (callers apply fields in the order returned here).
pub fn flatten(document: &Document) -> Result<Vec<FieldWrite>, FormatError> {
    let mut out = Vec::new();
    flatten_into(&Path::root(), document, &mut out)?;
    Ok(out)
}

fn flatten_into(prefix: &Path, document: &Document, out: &mut Vec<FieldWrite>) -> Result<(), FormatError> {
    match document {
        Document::Map(map) => {
            out.push(FieldWrite::new(prefix.clone(), Value::EmptyMap));
            for (key, child) in map {
                let child_path = prefix.try_with_pushed_key(key.clone())?;
                flatten_into(&child_path, child, out)?;
            }
        }
        Document::List(items) => {
            out.push(FieldWrite::new(prefix.clone(), Value::EmptyList));
            for (index, item) in items.iter().enumerate() {
                let child_path = prefix.with_pushed(PathSegment::Index(index));
                flatten_into(&child_path, item, out)?;
            }
        }
        Document::Null => out.push(FieldWrite::new(prefix.clone(), Value::Null)),
        Document::Str(s) => out.push(FieldWrite::new(prefix.clone(), Value::Str(s.clone()))),
        Document::Int(i) => out.push(FieldWrite::new(prefix.clone(), Value::Int(*i))),
        Document::Float(f) => out.push(FieldWrite::new(prefix.clone(), Value::Float(*f))),
        Document::Bytes(b) => out.push(FieldWrite::new(prefix.clone(), Value::Bytes(b.clone()))),
    }
    Ok(())
}

/// Inverse of [`flatten`]. `fields` need not be sorted; each is applied to
/// the tree at its path, creating intermediate maps/lists (from sentinels)
/// or overwriting a prior sentinel at the same path with a concrete scalar.
/// List fields are expected to carry dense, already-renumbered indices (as
/// guaranteed by the Logic Layer) — a sparse index is padded with `Null`.
pub fn build(fields: &[(Path, Value)]) -> Document {
    let mut root: Option<Document> = None;
    for (path, value) in fields {
        set_at(&mut root, path.segments(), value);
    }
    root.unwrap_or(Document::Null)
}

fn set_at(slot: &mut Option<Document>, segments: &[PathSegment], value: &Value) {
    let Some((head, rest)) = segments.split_first() else {
        *slot = Some(value_to_leaf(value, slot.take()));
        return;
    };

    match head {
        PathSegment::Key(key) => {
            let map = ensure_map(slot);
            let child = map.entry(key.clone()).or_insert(Document::Null);
            let mut child_slot = Some(std::mem::replace(child, Document::Null));
            set_at(&mut child_slot, rest, value);
            *child = child_slot.unwrap_or(Document::Null);
        }
        PathSegment::Index(index) => {
            let list = ensure_list(slot);
            if list.len() <= *index {
                list.resize(*index + 1, Document::Null);
            }
            let mut child_slot = Some(std::mem::replace(&mut list[*index], Document::Null));
            set_at(&mut child_slot, rest, value);
            list[*index] = child_slot.unwrap_or(Document::Null);
        }
        PathSegment::Wildcard => {
            unreachable!("build() is only ever called with determined (concrete) paths")
        }
    }
}

fn value_to_leaf(value: &Value, previous: Option<Document>) -> Document {
    match value {
        // A sentinel never overwrites a concrete child already materialized
        // at this path; it only seeds the container if nothing is there yet.
        Value::EmptyMap => previous.unwrap_or_else(|| Document::Map(Default::default())),
        Value::EmptyList => previous.unwrap_or_else(|| Document::List(Vec::new())),
        Value::Null => Document::Null,
        Value::Str(s) => Document::Str(s.clone()),
        Value::Int(i) => Document::Int(*i),
        Value::Float(f) => Document::Float(*f),
        Value::Bytes(b) => Document::Bytes(b.clone()),
    }
}

fn ensure_map(slot: &mut Option<Document>) -> &mut indexmap::IndexMap<String, Document> {
    if !matches!(slot, Some(Document::Map(_))) {
        *slot = Some(Document::Map(Default::default()));
    }
    match slot.as_mut().unwrap() {
        Document::Map(m) => m,
        _ => unreachable!(),
    }
}

fn ensure_list(slot: &mut Option<Document>) -> &mut Vec<Document> {
    if !matches!(slot, Some(Document::List(_))) {
        *slot = Some(Document::List(Vec::new()));
    }
    match slot.as_mut().unwrap() {
        Document::List(l) => l,
        _ => unreachable!(),
    }
}

/// Same-length, mask-aware comparison — re-exported for callers that think
/// in Field-Codec terms rather than reaching into `ddb_proto::Path` directly.
pub fn matches(name: &Path, mask: &Path) -> bool {
    name.matches(mask)
}

/// True iff `path` contains no wildcards.
pub fn determined(path: &Path) -> bool {
    path.is_determined()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddb_proto::Document;

    #[test]
    fn flatten_emits_sentinels_before_children() {
        let doc = Document::map([("tracks".to_string(), Document::list([Document::from("Track 1")]))]);
        let fields = flatten(&doc).unwrap();
        assert_eq!(fields[0].path, Path::root());
        assert_eq!(fields[0].value, Value::EmptyMap);
        assert_eq!(fields[1].path, Path::single("tracks").unwrap());
        assert_eq!(fields[1].value, Value::EmptyList);
        assert_eq!(
            fields[2].path,
            Path::single("tracks").unwrap().with_pushed(PathSegment::Index(0))
        );
        assert_eq!(fields[2].value, Value::Str("Track 1".to_string()));
    }

    #[test]
    fn round_trips_nested_document() {
        let doc = Document::map([(
            "tracks".to_string(),
            Document::list([Document::from("Track 1"), Document::from("Track 2")]),
        )]);
        let fields = flatten(&doc).unwrap();
        let rebuilt = build(
            &fields
                .into_iter()
                .map(|f| (f.path, f.value))
                .collect::<Vec<_>>(),
        );
        assert_eq!(rebuilt, doc);
    }

    #[test]
    fn rejects_reserved_characters_in_map_keys() {
        let doc = Document::map([("a.b".to_string(), Document::from("x"))]);
        assert!(matches!(flatten(&doc), Err(FormatError::ReservedCharacterInKey(_))));
    }

    #[test]
    fn last_scalar_at_same_path_wins() {
        let fields = vec![
            (Path::single("tracks").unwrap(), Value::Str("Track 1".into())),
            (Path::single("tracks").unwrap(), Value::Str("Track 2".into())),
            (Path::single("tracks").unwrap(), Value::Str("Track 3".into())),
        ];
        let doc = build(&fields);
        assert_eq!(doc, Document::map([("tracks".to_string(), Document::from("Track 3"))]));
    }

    fn arb_document() -> impl proptest::strategy::Strategy<Value = Document> {
        use proptest::prelude::*;

        let leaf = prop_oneof![
            Just(Document::Null),
            "[a-zA-Z0-9 ]{0,12}".prop_map(Document::Str),
            any::<i64>().prop_map(Document::Int),
            (-1000.0..1000.0f64).prop_map(Document::Float),
        ];
        leaf.prop_recursive(4, 32, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Document::list),
                prop::collection::vec(("[a-z]{1,8}", inner), 0..4)
                    .prop_map(|entries| Document::map(entries.into_iter().map(|(k, v)| (k, v)))),
            ]
        })
    }

    proptest::proptest! {
        /// (Round-trip) For every document `d`, `build(flatten(d)) == d`.
        #[test]
        fn round_trips_arbitrary_documents(doc in arb_document()) {
            let fields = flatten(&doc).expect("generated keys never contain reserved characters");
            let rebuilt = build(&fields.into_iter().map(|f| (f.path, f.value)).collect::<Vec<_>>());
            proptest::prop_assert_eq!(rebuilt, doc);
        }
    }
}
