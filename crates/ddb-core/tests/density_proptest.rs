//! (Density) For every list at path `p` in object `id`, the used integer
//! indices form a contiguous range starting at 0 — checked here across
//! randomized initial lengths, insertion points, and group sizes rather
//! than the single fixed case `tests/scenarios.rs` pins down.

use ddb_core::Session;
use ddb_engine_memory::MemoryEngine;
use ddb_proto::{Document, FieldWrite, Path, PathSegment, Value};
use proptest::prelude::*;

fn path(segments: Vec<PathSegment>) -> Path {
    Path::new(segments).unwrap()
}

fn list_path() -> Path {
    path(vec![PathSegment::Key("list".to_string())])
}

async fn insert_and_read_indices(initial_len: usize, insert_at: usize, group_count: usize) -> Vec<usize> {
    let mut engine = MemoryEngine::new();
    let mut session = Session::begin(&mut engine).await.unwrap();

    let initial: Vec<Document> = (0..initial_len).map(|i| Document::from(format!("item-{i}"))).collect();
    let id = session.create(&Document::map([("list".to_string(), Document::list(initial))])).await.unwrap();

    let insert_at = insert_at.min(initial_len);
    let groups: Vec<Vec<FieldWrite>> = (0..group_count)
        .map(|i| vec![FieldWrite::new(Path::root(), Value::Str(format!("new-{i}")))])
        .collect();
    session
        .insert(id, list_path().with_pushed(PathSegment::Index(insert_at)), groups, true)
        .await
        .unwrap();

    let mask = list_path().with_pushed(PathSegment::Wildcard);
    let mut read = session.read(id, None, Some(vec![mask])).await.unwrap();
    read.sort_by_key(|(p, _)| match p.segments() {
        [PathSegment::Key(_), PathSegment::Index(i)] => *i,
        other => panic!("expected list[i], got {other:?}"),
    });
    session.commit().await.unwrap();

    read.into_iter()
        .map(|(p, _)| match p.segments() {
            [PathSegment::Key(_), PathSegment::Index(i)] => *i,
            other => panic!("expected list[i], got {other:?}"),
        })
        .collect()
}

proptest! {
    #[test]
    fn list_indices_stay_dense_after_random_inserts(
        initial_len in 0usize..6,
        insert_at in 0usize..8,
        group_count in 1usize..4,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let indices = rt.block_on(insert_and_read_indices(initial_len, insert_at, group_count));
        let expected: Vec<usize> = (0..indices.len()).collect();
        prop_assert_eq!(indices, expected);
    }
}
