//! Performance benchmarks for content import
//!
//! Measures:
//! - Event stream import of wide and deep trees
//! - Forward reference resolution through the ledger
//! - JSON provider decoding
//!
//! Run with: cargo bench

use content_loader::{
    config::ImportOptions,
    event::ContentEvent,
    loader::ImportSession,
    properties::{PropertyType, REFERENCEABLE_TAG},
    store::MemoryStore,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// A flat tree of `width` children where every child references the next one, so every
/// reference but the last is a forward reference.
fn linked_children(width: usize) -> Vec<ContentEvent> {
    let mut events = vec![ContentEvent::start_typed(
        None::<String>,
        "nt:unstructured",
        &[],
    )];
    for i in 0..width {
        events.push(ContentEvent::start_typed(
            Some(format!("node{i}")),
            "nt:unstructured",
            &[REFERENCEABLE_TAG],
        ));
        events.push(ContentEvent::property("title", PropertyType::String, format!("Node {i}")));
        events.push(ContentEvent::property(
            "next",
            PropertyType::Reference,
            format!("../node{}", (i + 1) % width),
        ));
        events.push(ContentEvent::EndNode);
    }
    events.push(ContentEvent::EndNode);
    events
}

fn nested(depth: usize) -> Vec<ContentEvent> {
    let mut events = vec![ContentEvent::start_typed(
        None::<String>,
        "nt:unstructured",
        &[],
    )];
    for i in 0..depth {
        events.push(ContentEvent::start(format!("level{i}")));
        events.push(ContentEvent::property("depth", PropertyType::Long, i.to_string()));
    }
    events.extend((0..=depth).map(|_| ContentEvent::EndNode));
    events
}

fn json_document(width: usize) -> String {
    let children = (0..width)
        .map(|i| {
            format!(
                r#""item{i}": {{ "jcr:mixinTypes": ["{REFERENCEABLE_TAG}"], "rank": {i}, "tags": ["a", "b"] }}"#
            )
        })
        .collect::<Vec<_>>()
        .join(",\n");
    format!("{{ \"jcr:reference:first\": \"item0\",\n{children} }}")
}

fn bench_event_import(c: &mut Criterion) {
    let mut group = c.benchmark_group("event_import");
    for width in [10, 100, 1000] {
        let events = linked_children(width);
        group.bench_with_input(BenchmarkId::new("linked", width), &events, |b, events| {
            b.iter(|| {
                let mut store = MemoryStore::new();
                let mut session = ImportSession::with_defaults(&mut store, ImportOptions::default());
                session.begin("/", Some("content")).unwrap();
                session.apply_all(events.iter().cloned()).unwrap();
                black_box(session.finish().unwrap())
            })
        });
    }
    let events = nested(200);
    group.bench_function("nested_200", |b| {
        b.iter(|| {
            let mut store = MemoryStore::new();
            let mut session = ImportSession::with_defaults(&mut store, ImportOptions::default());
            session.begin("/", Some("content")).unwrap();
            session.apply_all(events.iter().cloned()).unwrap();
            black_box(session.finish().unwrap())
        })
    });
    group.finish();
}

fn bench_json_import(c: &mut Criterion) {
    let document = json_document(500);
    c.bench_function("json_import_500", |b| {
        b.iter(|| {
            let mut store = MemoryStore::new();
            let mut session = ImportSession::with_defaults(&mut store, ImportOptions::default());
            session
                .import_source("/", "bench.json", document.as_bytes())
                .unwrap();
            black_box(session.finish().unwrap())
        })
    });
}

criterion_group!(benches, bench_event_import, bench_json_import);
criterion_main!(benches);
