#![allow(clippy::all)]

use std::sync::Arc;

use quadscroll::{
    backend::BackendOp,
    query::{FieldMapping, FieldType, Predicate},
    GraphIterator, GraphValue, IteratorOptions, MemoryBackend, MetadataContains, MetadataFilter,
    QuadHash, Result, ResultKind, SearchStore,
};
use serde_json::{Map, Value};

fn meta(pairs: &[(&str, &str)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), Value::String((*v).to_owned())))
        .collect()
}

struct Fixture {
    backend: Arc<MemoryBackend>,
    early_crawl: QuadHash,
    late_crawl: QuadHash,
    manual: QuadHash,
}

fn fixture() -> Result<Fixture> {
    let backend = Arc::new(MemoryBackend::new());
    backend.put_mapping(
        "cayley",
        ResultKind::Quads,
        FieldMapping::new()
            .with_field("metadata.created", FieldType::Date)
            .with_field("metadata.source", FieldType::Keyword),
    );
    let early_crawl = backend.index_quad(
        "cayley",
        "a",
        "p",
        "b",
        None,
        meta(&[("created", "2019-05-01T12:00:00Z"), ("source", "crawl-eu")]),
    )?;
    let late_crawl = backend.index_quad(
        "cayley",
        "a",
        "p",
        "c",
        None,
        meta(&[("created", "2021-02-10T08:30:00Z"), ("source", "crawl-us")]),
    )?;
    let manual = backend.index_quad(
        "cayley",
        "a",
        "p",
        "d",
        None,
        meta(&[("created", "2021-03-01T00:00:00Z"), ("source", "manual")]),
    )?;
    Ok(Fixture {
        backend,
        early_crawl,
        late_crawl,
        manual,
    })
}

fn drain(it: &mut dyn GraphIterator) -> Vec<GraphValue> {
    let mut out = Vec::new();
    while it.next() {
        out.extend(it.result().cloned());
    }
    out
}

fn quad(q: &QuadHash) -> GraphValue {
    GraphValue::Quad(q.clone())
}

#[test]
fn range_and_pattern_filters_combine_with_and() -> Result<()> {
    let fx = fixture()?;
    let store = SearchStore::new(fx.backend.clone(), IteratorOptions::default());
    let filter = MetadataFilter::new()
        .with("created", "2020-01-01T00:00:00Z=>2021-12-31T00:00:00Z")
        .with("source", "crawl-.*");
    let mut it = store.metadata_iterator(filter);
    assert_eq!(drain(&mut it), vec![quad(&fx.late_crawl)]);
    assert_eq!(it.size(), (1, true));
    assert!(it.err().is_none());
    Ok(())
}

#[test]
fn pattern_only_filter() -> Result<()> {
    let fx = fixture()?;
    let store = SearchStore::new(fx.backend.clone(), IteratorOptions::default().page_size(1));
    let mut it = store.metadata_iterator(MetadataFilter::new().with("source", "crawl-.*"));
    let mut got = drain(&mut it);
    got.sort_by(|a, b| a.id().cmp(b.id()));
    let mut want = vec![quad(&fx.early_crawl), quad(&fx.late_crawl)];
    want.sort_by(|a, b| a.id().cmp(b.id()));
    assert_eq!(got, want);
    Ok(())
}

#[test]
fn malformed_range_yields_nothing_without_error() -> Result<()> {
    let fx = fixture()?;
    let store = SearchStore::new(fx.backend.clone(), IteratorOptions::default());
    let filter = MetadataFilter::new()
        .with("created", "only-one-part")
        .with("source", ".*");
    let mut it = store.metadata_iterator(filter);
    assert_eq!(it.predicate(), &Predicate::MatchNone);
    assert!(drain(&mut it).is_empty());
    assert_eq!(it.size(), (0, true));
    assert!(it.err().is_none());
    Ok(())
}

#[test]
fn empty_schema_matches_nothing() -> Result<()> {
    let backend = Arc::new(MemoryBackend::new());
    backend.index_quad("cayley", "a", "p", "b", None, meta(&[("source", "crawl")]))?;
    let store = SearchStore::new(backend, IteratorOptions::default());
    let mut it = store.metadata_iterator(MetadataFilter::new().with("source", ".*"));
    assert!(it.predicate().is_match_none());
    assert!(drain(&mut it).is_empty());
    Ok(())
}

#[test]
fn schema_failure_matches_nothing() -> Result<()> {
    let fx = fixture()?;
    fx.backend.fail_next(BackendOp::FieldMapping, 1);
    let store = SearchStore::new(fx.backend.clone(), IteratorOptions::default());
    let mut it = store.metadata_iterator(MetadataFilter::new().with("source", ".*"));
    assert!(drain(&mut it).is_empty());
    assert!(it.err().is_none(), "schema fallback is not an iterator error");
    Ok(())
}

#[test]
fn custom_range_delimiter() -> Result<()> {
    let fx = fixture()?;
    let store = SearchStore::new(
        fx.backend.clone(),
        IteratorOptions::default().range_delimiter(".."),
    );
    let mut it = store.metadata_iterator(
        MetadataFilter::new().with("created", "2021-01-01..2021-02-28"),
    );
    assert_eq!(drain(&mut it), vec![quad(&fx.late_crawl)]);
    Ok(())
}

#[test]
fn verify_policy_rechecks_candidates() -> Result<()> {
    let fx = fixture()?;
    let store = SearchStore::new(fx.backend.clone(), IteratorOptions::default());
    let mut it = store.metadata_iterator(MetadataFilter::new().with("source", "manual"));
    assert!(it.contains(&quad(&fx.manual)));
    assert_eq!(it.result(), Some(&quad(&fx.manual)));
    assert!(!it.contains(&quad(&fx.early_crawl)));
    assert_eq!(fx.backend.calls(BackendOp::Count), 2);
    Ok(())
}

#[test]
fn verify_failure_is_sticky_and_rejects() -> Result<()> {
    let fx = fixture()?;
    let store = SearchStore::new(fx.backend.clone(), IteratorOptions::default());
    let mut it = store.metadata_iterator(MetadataFilter::new().with("source", "manual"));
    fx.backend.fail_next(BackendOp::Count, 1);
    assert!(!it.contains(&quad(&fx.manual)));
    assert!(it.err().is_some());
    assert!(it.contains(&quad(&fx.manual)));
    Ok(())
}

#[test]
fn trust_policy_accepts_any_candidate() -> Result<()> {
    let fx = fixture()?;
    let store = SearchStore::new(
        fx.backend.clone(),
        IteratorOptions::default().metadata_contains(MetadataContains::Trust),
    );
    let mut it = store.metadata_iterator(MetadataFilter::new().with("source", "manual"));
    assert!(it.contains(&quad(&fx.early_crawl)));
    assert!(it.contains(&GraphValue::Quad(QuadHash("anything".into()))));
    assert_eq!(fx.backend.calls(BackendOp::Count), 0);
    Ok(())
}

#[test]
fn invalid_pattern_surfaces_as_sticky_error() -> Result<()> {
    let fx = fixture()?;
    let store = SearchStore::new(fx.backend.clone(), IteratorOptions::default());
    let mut it = store.metadata_iterator(MetadataFilter::new().with("source", "(unclosed"));
    assert!(!it.next());
    assert!(it.err().is_some());
    Ok(())
}
