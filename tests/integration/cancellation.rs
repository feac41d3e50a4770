#![allow(clippy::all)]

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use quadscroll::{
    backend::BackendOp, Direction, GraphIterator, IteratorOptions, MemoryBackend, NodeHash,
    QueryContext, Result, SearchError, SearchStore,
};
use serde_json::Map;

fn backend_with(n: usize) -> Result<Arc<MemoryBackend>> {
    let backend = Arc::new(MemoryBackend::new());
    for i in 0..n {
        backend.index_quad("cayley", "s", "p", &format!("o{i}"), None, Map::new())?;
    }
    Ok(backend)
}

#[test]
fn cancelling_mid_scroll_stops_at_the_page_boundary() -> Result<()> {
    let backend = backend_with(5)?;
    let ctx = QueryContext::background();
    let token = ctx.cancel_token();
    let store = SearchStore::new(backend.clone(), IteratorOptions::default().page_size(2))
        .with_context(ctx);
    let mut it = store.quad_iterator(Direction::Subject, NodeHash::of("s"))?;
    assert!(it.next());
    token.store(true, Ordering::SeqCst);
    // The buffered page is still served; the next fetch is refused.
    assert!(it.next());
    assert!(!it.next());
    assert_eq!(it.err(), Some(&SearchError::Cancelled));
    assert_eq!(backend.calls(BackendOp::ScrollNext), 0);
    Ok(())
}

#[test]
fn cancelled_context_blocks_the_first_page() -> Result<()> {
    let backend = backend_with(2)?;
    let ctx = QueryContext::background();
    ctx.cancel();
    let store = SearchStore::new(backend.clone(), IteratorOptions::default()).with_context(ctx);
    let mut it = store.quad_iterator(Direction::Subject, NodeHash::of("s"))?;
    assert!(!it.next());
    assert_eq!(it.err(), Some(&SearchError::Cancelled));
    assert_eq!(it.size(), (0, false));
    assert_eq!(backend.calls(BackendOp::ScrollStart), 0);
    assert_eq!(backend.calls(BackendOp::Count), 0);
    Ok(())
}

#[test]
fn expired_deadline_is_reported() -> Result<()> {
    let backend = backend_with(2)?;
    let ctx = QueryContext::background().with_deadline(Instant::now());
    let store = SearchStore::new(backend, IteratorOptions::default()).with_context(ctx);
    let mut it = store.quads_all_iterator();
    assert!(!it.next());
    assert_eq!(it.err(), Some(&SearchError::DeadlineExceeded));
    Ok(())
}

#[test]
fn store_context_reaches_iterators_built_before_cancel() -> Result<()> {
    let backend = backend_with(3)?;
    let ctx = QueryContext::background();
    let store = SearchStore::new(backend.clone(), IteratorOptions::default())
        .with_context(ctx.clone());
    let mut it = store.quads_all_iterator();
    ctx.cancel();
    assert!(!it.next());
    assert_eq!(it.err(), Some(&SearchError::Cancelled));
    assert_eq!(backend.calls(BackendOp::ScrollStart), 0);
    Ok(())
}

#[test]
fn clones_share_the_context() -> Result<()> {
    let backend = backend_with(3)?;
    let ctx = QueryContext::background();
    let token = ctx.cancel_token();
    let store = SearchStore::new(backend, IteratorOptions::default()).with_context(ctx);
    let it = store.quad_iterator(Direction::Subject, NodeHash::of("s"))?;
    let mut clone = it.clone_box();
    token.store(true, Ordering::SeqCst);
    assert!(!clone.next());
    assert_eq!(clone.err(), Some(&SearchError::Cancelled));
    Ok(())
}
