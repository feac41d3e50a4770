#![allow(clippy::all)]

use std::collections::HashMap;
use std::sync::Arc;

use quadscroll::{
    backend::BackendOp,
    graph::IteratorKind,
    Direction, GraphIterator, GraphValue, IterationRequest, IteratorOptions, MemoryBackend,
    NodeHash, QuadHash, Result, ResultKind, SearchStore,
};
use serde_json::Map;

fn store_with(backend: Arc<MemoryBackend>, opts: IteratorOptions) -> SearchStore {
    SearchStore::new(backend, opts)
}

fn triangle() -> Result<(Arc<MemoryBackend>, Vec<QuadHash>)> {
    let backend = Arc::new(MemoryBackend::new());
    let quads = vec![
        backend.index_quad("cayley", "alice", "knows", "bob", None, Map::new())?,
        backend.index_quad("cayley", "bob", "knows", "carol", Some("social"), Map::new())?,
        backend.index_quad("cayley", "carol", "knows", "alice", None, Map::new())?,
    ];
    Ok((backend, quads))
}

#[test]
fn all_iterator_contains_everything() -> Result<()> {
    let (backend, _) = triangle()?;
    let store = store_with(backend, IteratorOptions::default());
    let mut it = store.quads_all_iterator();
    let stranger = GraphValue::Quad(QuadHash("not-even-a-quad".into()));
    assert!(it.contains(&stranger));
    assert_eq!(it.result(), Some(&stranger));
    let node = GraphValue::Node(NodeHash::of("zed"));
    assert!(it.contains(&node));
    assert_eq!(it.result(), Some(&node));
    assert_eq!(it.kind(), IteratorKind::All);
    Ok(())
}

#[test]
fn exact_iterator_contains_iff_direction_matches() -> Result<()> {
    let (backend, quads) = triangle()?;
    let store = store_with(backend.clone(), IteratorOptions::default());
    let mut it = store.quad_iterator(Direction::Object, NodeHash::of("alice"))?;

    assert!(!it.contains(&GraphValue::Quad(quads[0].clone())));
    assert!(it.result().is_none());
    assert!(!it.contains(&GraphValue::Quad(quads[1].clone())));
    assert!(it.contains(&GraphValue::Quad(quads[2].clone())));
    assert_eq!(it.result(), Some(&GraphValue::Quad(quads[2].clone())));
    assert!(!it.contains(&GraphValue::Node(NodeHash::of("alice"))));

    // Membership is decided locally for exact matches.
    assert_eq!(backend.calls(BackendOp::Count), 0);
    Ok(())
}

#[test]
fn label_iterator_ignores_unlabelled_quads() -> Result<()> {
    let (backend, quads) = triangle()?;
    let store = store_with(backend, IteratorOptions::default());
    let mut it = store.quad_iterator(Direction::Label, NodeHash::of("social"))?;
    assert!(it.contains(&GraphValue::Quad(quads[1].clone())));
    assert!(!it.contains(&GraphValue::Quad(quads[0].clone())));
    assert!(it.next());
    assert_eq!(it.result(), Some(&GraphValue::Quad(quads[1].clone())));
    assert!(!it.next());
    Ok(())
}

#[test]
fn tag_results_binds_current_and_fixed_tags() -> Result<()> {
    let (backend, quads) = triangle()?;
    let store = store_with(backend, IteratorOptions::default());
    let mut it = store.quad_iterator(Direction::Subject, NodeHash::of("alice"))?;
    it.tagger().add("edge");
    it.tagger().add_fixed("who", GraphValue::Node(NodeHash::of("alice")));

    let mut before = HashMap::new();
    it.tag_results(&mut before);
    assert_eq!(before.len(), 1, "only fixed tags before a result exists");

    assert!(it.next());
    let mut dst = HashMap::new();
    it.tag_results(&mut dst);
    assert_eq!(dst.get("edge"), Some(&GraphValue::Quad(quads[0].clone())));
    assert_eq!(dst.get("who"), Some(&GraphValue::Node(NodeHash::of("alice"))));
    Ok(())
}

#[test]
fn clone_copies_tags_and_request() -> Result<()> {
    let (backend, _) = triangle()?;
    let store = store_with(backend, IteratorOptions::default());
    let mut it = store.quad_iterator(Direction::Predicate, NodeHash::of("knows"))?;
    it.tagger().add("rel");
    let mut clone = it.clone_box();
    assert_eq!(clone.tagger().tags(), ["rel".to_owned()]);
    assert_eq!(clone.describe().name, it.describe().name);
    assert_eq!(clone.size(), (3, true));
    Ok(())
}

#[test]
fn size_is_cached_until_reset_policy_allows() -> Result<()> {
    let (backend, quads) = triangle()?;

    let keep = store_with(backend.clone(), IteratorOptions::default());
    let mut it = keep.quads_all_iterator();
    assert_eq!(it.size(), (3, true));
    backend.delete_document("cayley", ResultKind::Quads, quads[0].as_str());
    assert_eq!(it.size(), (3, true));
    it.reset();
    assert_eq!(it.size(), (3, true), "default reset keeps the cached size");
    assert_eq!(backend.calls(BackendOp::Count), 1);

    let clear = store_with(backend.clone(), IteratorOptions::default().reset_clears_size(true));
    let mut it = clear.quads_all_iterator();
    assert_eq!(it.size(), (2, true));
    backend.delete_document("cayley", ResultKind::Quads, quads[1].as_str());
    assert_eq!(it.size(), (2, true));
    it.reset();
    assert_eq!(it.size(), (1, true));
    Ok(())
}

#[test]
fn describe_and_stats_report_size() -> Result<()> {
    let (backend, _) = triangle()?;
    let store = store_with(backend, IteratorOptions::default());
    let mut it = store.iterator(IterationRequest::exact(
        ResultKind::Quads,
        Direction::Subject,
        NodeHash::of("bob"),
    )?);
    let desc = it.describe();
    assert_eq!(desc.name, NodeHash::of("bob").to_string());
    assert_eq!(desc.size, 1);
    assert_eq!(desc.kind, IteratorKind::Search);
    let stats = it.stats();
    assert_eq!(stats.size, 1);
    assert!(stats.exact_size);
    assert!(it.close().is_ok());
    Ok(())
}

#[test]
fn unsorted_when_sort_key_disabled() {
    let backend = Arc::new(MemoryBackend::new());
    let store = store_with(backend, IteratorOptions::default().sort_field(None));
    assert!(!store.nodes_all_iterator().sorted());
    let sorted = store_with(Arc::new(MemoryBackend::new()), IteratorOptions::default());
    assert!(sorted.nodes_all_iterator().sorted());
}
