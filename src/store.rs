//! Entry point that hands out iterators bound to one backend.

use std::sync::Arc;

use crate::backend::{instrumented, BackendOp, SearchBackend};
use crate::config::IteratorOptions;
use crate::context::QueryContext;
use crate::iterator::SearchIterator;
use crate::query::{IterationRequest, Predicate};
use crate::types::{Direction, MetadataFilter, NodeHash, Result, ResultKind};

/// Backend handle plus the options and context shared by its iterators.
#[derive(Clone, Debug)]
pub struct SearchStore {
    backend: Arc<dyn SearchBackend>,
    options: Arc<IteratorOptions>,
    ctx: QueryContext,
}

impl SearchStore {
    /// Wraps a backend with a background context.
    pub fn new(backend: Arc<dyn SearchBackend>, options: IteratorOptions) -> Self {
        Self {
            backend,
            options: Arc::new(options),
            ctx: QueryContext::background(),
        }
    }

    /// Replaces the context threaded into iterators built afterwards.
    pub fn with_context(mut self, ctx: QueryContext) -> Self {
        self.ctx = ctx;
        self
    }

    /// Shared options.
    pub fn options(&self) -> &IteratorOptions {
        &self.options
    }

    /// Context handed to new iterators.
    pub fn context(&self) -> &QueryContext {
        &self.ctx
    }

    /// Builds an iterator for an arbitrary request.
    pub fn iterator(&self, request: IterationRequest) -> SearchIterator {
        SearchIterator::new(
            Arc::clone(&self.backend),
            Arc::clone(&self.options),
            self.ctx.clone(),
            request,
        )
    }

    /// Quads whose `dir` component is `value`.
    pub fn quad_iterator(&self, dir: Direction, value: NodeHash) -> Result<SearchIterator> {
        Ok(self.iterator(IterationRequest::exact(ResultKind::Quads, dir, value)?))
    }

    /// Quads whose metadata satisfies `filter`.
    pub fn metadata_iterator(&self, filter: MetadataFilter) -> SearchIterator {
        self.iterator(IterationRequest::metadata(ResultKind::Quads, filter))
    }

    /// Every node.
    pub fn nodes_all_iterator(&self) -> SearchIterator {
        self.iterator(IterationRequest::all(ResultKind::Nodes))
    }

    /// Every quad.
    pub fn quads_all_iterator(&self) -> SearchIterator {
        self.iterator(IterationRequest::all(ResultKind::Quads))
    }

    /// Uncached count of `kind` documents matching `predicate`.
    pub fn count(&self, kind: ResultKind, predicate: &Predicate) -> Result<i64> {
        instrumented(BackendOp::Count, &self.ctx, || {
            self.backend
                .count(&self.ctx, &self.options.index, kind, predicate)
        })
    }
}
