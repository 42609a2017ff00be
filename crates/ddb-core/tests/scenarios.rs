//! End-to-end scenarios against the in-memory reference engine. Each test
//! name describes the behavior it pins down; see `DESIGN.md` for how these
//! map onto the component design this crate implements.

use ddb_core::{Error, Logic, Response, Session};
use ddb_engine::Engine;
use ddb_engine_memory::MemoryEngine;
use ddb_proto::{Comparator, Condition, Document, FieldWrite, Path, PathSegment, Request, Value};

fn path(segments: Vec<PathSegment>) -> Path {
    Path::new(segments).expect("test paths use only valid keys")
}

fn key(s: &str) -> PathSegment {
    PathSegment::Key(s.to_string())
}

fn idx(i: usize) -> PathSegment {
    PathSegment::Index(i)
}

#[tokio::test]
async fn create_keeps_last_write_at_a_shared_path() {
    let mut engine = MemoryEngine::new();
    let mut logic = Logic::new(&mut engine).await.unwrap();
    logic.begin_transaction().await.unwrap();

    let tracks = path(vec![key("tracks")]);
    let fields = vec![
        FieldWrite::new(tracks.clone(), "Track 1"),
        FieldWrite::new(tracks.clone(), "Track 2"),
        FieldWrite::new(tracks.clone(), "Track 3"),
    ];
    let id = match logic.process(Request::Create { path: None, fields }).await.unwrap() {
        Response::Created(id) => id,
        other => panic!("unexpected response: {other:?}"),
    };

    let read = match logic
        .process(Request::Read {
            id,
            path: Some(tracks),
            masks: None,
        })
        .await
        .unwrap()
    {
        Response::Read(fields) => fields,
        other => panic!("unexpected response: {other:?}"),
    };
    assert_eq!(read, vec![(Path::root(), Value::Str("Track 3".to_string()))]);

    logic.commit_transaction().await.unwrap();
}

#[tokio::test]
async fn list_insertion_renumbers_densely() {
    let mut engine = MemoryEngine::new();
    let mut session = Session::begin(&mut engine).await.unwrap();

    let doc = Document::map([(
        "tracks".to_string(),
        Document::list([Document::from("Track 1"), Document::from("Track 2"), Document::from("Track 3")]),
    )]);
    let id = session.create(&doc).await.unwrap();

    let tracks_3 = path(vec![key("tracks"), idx(3)]);
    let tracks_4 = path(vec![key("tracks"), idx(4)]);
    session
        .modify(
            id,
            Path::root(),
            vec![FieldWrite::new(tracks_3, "Track 4"), FieldWrite::new(tracks_4, "Track 5")],
            true,
        )
        .await
        .unwrap();

    let mask = path(vec![key("tracks"), PathSegment::Wildcard]);
    let mut read = session.read(id, None, Some(vec![mask])).await.unwrap();
    read.sort_by_key(|(p, _)| match p.segments() {
        [PathSegment::Key(_), PathSegment::Index(i)] => *i,
        _ => panic!("expected tracks[i], got {p:?}"),
    });
    let expected: Vec<(Path, Value)> = (0..5)
        .map(|i| (path(vec![key("tracks"), idx(i)]), Value::Str(format!("Track {}", i + 1))))
        .collect();
    assert_eq!(read, expected);

    session.commit().await.unwrap();
}

#[tokio::test]
async fn list_on_top_of_map_and_map_on_top_of_list_are_rejected() {
    let mut engine = MemoryEngine::new();
    let mut session = Session::begin(&mut engine).await.unwrap();

    let doc = Document::map([(
        "tracks".to_string(),
        Document::list([
            Document::from("Track 1"),
            Document::from("Track 2"),
            Document::map([("Lyrics".to_string(), Document::list([Document::from("la la la")]))]),
        ]),
    )]);
    let id = session.create(&doc).await.unwrap();

    // tracks[2] is a map; writing tracks[2][0] tries to treat it as a list.
    let err = session
        .modify(
            id,
            path(vec![key("tracks"), idx(2), idx(0)]),
            vec![FieldWrite::new(Path::root(), "Blablabla")],
            false,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Structure(_)), "expected a structure conflict, got {err:?}");

    // tracks is a list; writing tracks["some_name"] tries to treat it as a map.
    let err = session
        .modify(
            id,
            path(vec![key("tracks"), key("some_name")]),
            vec![FieldWrite::new(Path::root(), "Blablabla")],
            false,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Structure(_)), "expected a structure conflict, got {err:?}");

    session.commit().await.unwrap();
}

#[tokio::test]
async fn overwriting_a_list_element_changes_its_type() {
    let mut engine = MemoryEngine::new();
    let mut session = Session::begin(&mut engine).await.unwrap();

    let doc = Document::map([("fld".to_string(), Document::list([Document::Int(1), Document::from("a")]))]);
    let id = session.create(&doc).await.unwrap();

    session
        .modify(id, path(vec![key("fld"), idx(1)]), vec![FieldWrite::new(Path::root(), 2i64)], false)
        .await
        .unwrap();

    let mask = path(vec![key("fld"), PathSegment::Wildcard]);
    let read = session.read(id, None, Some(vec![mask])).await.unwrap();
    assert_eq!(read.len(), 2);
    assert!(read.contains(&(path(vec![key("fld"), idx(0)]), Value::Int(1))));
    assert!(read.contains(&(path(vec![key("fld"), idx(1)]), Value::Int(2))));

    session.commit().await.unwrap();
}

#[tokio::test]
async fn search_with_inversion_finds_mismatches_and_absences() {
    let mut engine = MemoryEngine::new();
    let mut session = Session::begin(&mut engine).await.unwrap();

    let a = session.create(&Document::map([("phone".to_string(), Document::from("1111"))])).await.unwrap();
    let b = session.create(&Document::map([("phone".to_string(), Document::from("2222"))])).await.unwrap();
    let c = session.create(&Document::map([("name".to_string(), Document::from("x"))])).await.unwrap();

    let condition = Condition::leaf(path(vec![key("phone")]), Comparator::Eq, Value::from("1111")).negated();
    let mut found = session.search(Some(condition)).await.unwrap();
    found.sort_by_key(|id| id.0);

    let mut expected = vec![b, c];
    expected.sort_by_key(|id| id.0);
    assert_eq!(found, expected);
    assert!(!found.contains(&a));

    session.commit().await.unwrap();
}

#[tokio::test]
async fn repair_recovers_from_a_dropped_specification_table() {
    let mut engine = MemoryEngine::new();
    let mut session = Session::begin(&mut engine).await.unwrap();
    let id = session
        .create(&Document::map([("phone".to_string(), Document::from("1111"))]))
        .await
        .unwrap();
    session.commit().await.unwrap();

    // The specification table's physical name is whatever `get_name_string`
    // gives the single-segment path ["id"] — "id" itself for every adapter
    // that doesn't override the default quoting.
    engine.delete_table("id").await.unwrap();

    let mut session = Session::begin(&mut engine).await.unwrap();
    session.repair().await.unwrap();

    assert!(session.object_exists(id).await.unwrap());
    let read = session.read(id, Some(path(vec![key("phone")])), None).await.unwrap();
    assert_eq!(read, vec![(Path::root(), Value::Str("1111".to_string()))]);

    let condition = Condition::leaf(path(vec![key("phone")]), Comparator::Eq, Value::from("1111"));
    assert_eq!(session.search(Some(condition)).await.unwrap(), vec![id]);

    session.commit().await.unwrap();
}
