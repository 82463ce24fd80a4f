//! End-to-end tests of the spatial engine: build, persist, reload, query.

use std::sync::Arc;

use gmlindex::{
    Envelope, Geometry, IndexConfig, PredicateKind, SpatialEngine, SpatialError,
};
use gmlindex_int_test::{inner_only_polygon_element, point_element, MemoryStore, RecordingStore};

const DB: &str = "city";

/// The three-item layout used throughout: A and B close together, C far
/// away.
fn seeded_engine() -> (SpatialEngine, MemoryStore) {
    let store = MemoryStore::new();
    let entries = vec![
        store.add_document(
            DB,
            1,
            point_element(0.5, 0.5),
            Envelope::new(0.0, 0.0, 1.0, 1.0),
        ),
        store.add_document(
            DB,
            2,
            point_element(2.5, 2.5),
            Envelope::new(2.0, 2.0, 3.0, 3.0),
        ),
        store.add_document(
            DB,
            3,
            point_element(10.5, 10.5),
            Envelope::new(10.0, 10.0, 11.0, 11.0),
        ),
    ];
    let kernel = store.kernel();
    let engine = SpatialEngine::new(Arc::new(store.clone()), kernel);
    engine.build_index(DB, entries).unwrap();
    (engine, store)
}

fn sorted(mut items: Vec<u64>) -> Vec<u64> {
    items.sort_unstable();
    items
}

#[test]
fn test_range_query_scenario() {
    let (engine, _store) = seeded_engine();
    let found = engine
        .range_query_envelope(DB, &Envelope::new(0.0, 0.0, 3.0, 3.0))
        .unwrap();
    assert_eq!(sorted(found), vec![1, 2]);
}

#[test]
fn test_range_query_with_geometry() {
    let (engine, _store) = seeded_engine();
    let query = gmlindex::gml::decode(&point_element(0.5, 0.5)).unwrap();
    assert_eq!(engine.range_query(DB, &query).unwrap(), vec![1]);
}

#[test]
fn test_range_query_empty_geometry_matches_nothing() {
    let (engine, _store) = seeded_engine();
    let empty = Geometry::MultiPoint(Vec::new());
    assert!(engine.range_query(DB, &empty).unwrap().is_empty());
}

#[test]
fn test_nearest_neighbour_excludes_self() {
    let (engine, _store) = seeded_engine();
    assert_eq!(engine.nearest_neighbour(DB, 1).unwrap(), 2);
    assert_eq!(engine.nearest_neighbour(DB, 2).unwrap(), 1);
    assert_eq!(engine.nearest_neighbour(DB, 3).unwrap(), 2);
}

#[test]
fn test_nearest_pair_scenario() {
    let (engine, _store) = seeded_engine();
    let (a, b) = engine.nearest_pair(DB).unwrap();
    assert_eq!(sorted(vec![a, b]), vec![1, 2]);
}

#[test]
fn test_query_reflects_persisted_index_after_eviction() {
    let (engine, _store) = seeded_engine();

    assert!(engine.evict_index(DB));
    // The next query reloads the tree from its index file.
    let found = engine
        .range_query_envelope(DB, &Envelope::new(0.0, 0.0, 3.0, 3.0))
        .unwrap();
    assert_eq!(sorted(found), vec![1, 2]);

    let (a, b) = engine.nearest_pair(DB).unwrap();
    assert_eq!(sorted(vec![a, b]), vec![1, 2]);
}

#[test]
fn test_load_without_build_is_not_found() {
    let store = MemoryStore::new();
    let kernel = store.kernel();
    let engine = SpatialEngine::new(Arc::new(store), kernel);

    match engine.range_query_envelope("nowhere", &Envelope::new(0.0, 0.0, 1.0, 1.0)) {
        Err(SpatialError::IndexNotFound(db)) => assert_eq!(db, "nowhere"),
        other => panic!("expected IndexNotFound, got {:?}", other),
    }
}

#[test]
fn test_corrupt_index_file_is_reported_as_corrupt() {
    let (engine, store) = seeded_engine();
    assert!(engine.evict_index(DB));

    let path = store.database_dir(DB).unwrap().join("strtree.idx");
    std::fs::write(&path, b"scrambled").unwrap();

    match engine.range_query_envelope(DB, &Envelope::new(0.0, 0.0, 3.0, 3.0)) {
        Err(SpatialError::IndexCorrupt(_)) => {}
        other => panic!("expected IndexCorrupt, got {:?}", other),
    }
}

#[test]
fn test_rebuild_replaces_cached_tree() {
    let (engine, store) = seeded_engine();

    // The cache does not notice new documents by itself...
    let new_entry = store.add_document(
        DB,
        4,
        point_element(5.5, 5.5),
        Envelope::new(5.0, 5.0, 6.0, 6.0),
    );
    let found = engine
        .range_query_envelope(DB, &Envelope::new(5.0, 5.0, 6.0, 6.0))
        .unwrap();
    assert!(found.is_empty());

    // ...until an explicit rebuild with a fresh enumeration.
    let mut entries = vec![
        store.add_point(DB, 1, 0.5, 0.5),
        store.add_point(DB, 2, 2.5, 2.5),
        store.add_point(DB, 3, 10.5, 10.5),
    ];
    entries.push(new_entry);
    engine.build_index(DB, entries).unwrap();

    let found = engine
        .range_query_envelope(DB, &Envelope::new(5.0, 5.0, 6.0, 6.0))
        .unwrap();
    assert_eq!(found, vec![4]);
}

#[test]
fn test_build_with_no_entries_fails() {
    let store = MemoryStore::new();
    let kernel = store.kernel();
    let engine = SpatialEngine::new(Arc::new(store), kernel);
    assert!(matches!(
        engine.build_index(DB, Vec::new()),
        Err(SpatialError::EmptyIndex)
    ));
}

#[test]
fn test_evaluate_contains() {
    let (engine, _store) = seeded_engine();
    // A polygon covering the lower-left corner contains items 1 and 2.
    let query = gmlindex::gml::decode(
        &gmlindex::GmlElement::new("gml:Polygon").with_child(
            gmlindex::GmlElement::new("gml:outerBoundaryIs").with_child(
                gmlindex::GmlElement::new("gml:LinearRing").with_child(
                    gmlindex::GmlElement::new("gml:coordinates")
                        .with_text("-1,-1 4,-1 4,4 -1,4 -1,-1"),
                ),
            ),
        ),
    )
    .unwrap();

    let found = engine.contains(DB, &query).unwrap();
    assert_eq!(sorted(found), vec![1, 2]);
}

#[test]
fn test_evaluate_intersects_matches_range_for_points() {
    let (engine, _store) = seeded_engine();
    let query = gmlindex::gml::decode(&point_element(0.5, 0.5)).unwrap();
    assert_eq!(engine.intersects(DB, &query).unwrap(), vec![1]);
}

#[test]
fn test_filter_refine_never_materializes_pruned_candidates() {
    let store = MemoryStore::new();
    let entries = vec![
        store.add_point(DB, 1, 0.5, 0.5),
        store.add_point(DB, 2, 2.5, 2.5),
        store.add_point(DB, 3, 10.5, 10.5),
    ];
    let kernel = store.kernel();
    let recording = Arc::new(RecordingStore::new(store));
    let engine = SpatialEngine::new(recording.clone(), kernel);
    engine.build_index(DB, entries).unwrap();

    let query = gmlindex::gml::decode(
        &gmlindex::GmlElement::new("gml:LineString").with_child(
            gmlindex::GmlElement::new("gml:coordinates").with_text("0,0 3,3"),
        ),
    )
    .unwrap();
    let query_envelope = query.envelope().unwrap();

    engine
        .evaluate(DB, &query, PredicateKind::Intersects)
        .unwrap();

    // Item 3's envelope misses the query envelope, so it must never have
    // been resolved, let alone decoded.
    let resolved = recording.resolved_items();
    assert!(!resolved.contains(&3), "pruned candidate was materialized");
    for item in resolved {
        let envelope = match item {
            1 => Envelope::point(0.5, 0.5),
            2 => Envelope::point(2.5, 2.5),
            other => panic!("unexpected resolution of item {}", other),
        };
        assert!(envelope.intersects(&query_envelope));
    }
    assert_eq!(recording.resolution_count(), 2);
}

#[test]
fn test_decode_errors_surface_through_evaluate() {
    let store = MemoryStore::new();
    let entries = vec![
        store.add_point(DB, 1, 0.5, 0.5),
        store.add_document(
            DB,
            2,
            inner_only_polygon_element(),
            Envelope::new(0.0, 0.0, 1.0, 1.0),
        ),
    ];
    let kernel = store.kernel();
    let engine = SpatialEngine::new(Arc::new(store), kernel);
    engine.build_index(DB, entries).unwrap();

    let query = gmlindex::gml::decode(&point_element(0.5, 0.5)).unwrap();
    match engine.evaluate(DB, &query, PredicateKind::Intersects) {
        Err(SpatialError::MissingBoundary(_)) => {}
        other => panic!("expected MissingBoundary, got {:?}", other),
    }
}

#[test]
fn test_custom_branching_factor_round_trips() {
    let store = MemoryStore::new();
    let mut entries = Vec::new();
    for i in 0..100u64 {
        let x = (i % 10) as f64;
        let y = (i / 10) as f64;
        entries.push(store.add_point(DB, i + 1, x, y));
    }
    let kernel = store.kernel();
    let engine = SpatialEngine::with_config(
        Arc::new(store),
        kernel,
        IndexConfig::new().with_branching_factor(4),
    );

    let built = engine.build_index(DB, entries).unwrap();
    assert_eq!(built.branching_factor(), 4);
    assert!(engine.evict_index(DB));

    let reloaded = engine.load_index(DB).unwrap();
    assert_eq!(reloaded.branching_factor(), 4);
    assert_eq!(reloaded.item_count(), 100);

    let found = engine
        .range_query_envelope(DB, &Envelope::new(0.0, 0.0, 2.0, 2.0))
        .unwrap();
    // Points on the 3x3 corner grid.
    assert_eq!(found.len(), 9);
}

#[test]
fn test_nearest_neighbour_on_missing_document_fails() {
    let (engine, _store) = seeded_engine();
    let result = engine.nearest_neighbour(DB, 99);
    assert!(matches!(result, Err(SpatialError::Io(_))));
}
