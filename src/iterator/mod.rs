//! Host-facing iterator over the hits of one translated request.

mod cursor;
mod size;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::backend::{instrumented, BackendOp, SearchBackend};
use crate::config::{IteratorOptions, MetadataContains};
use crate::context::QueryContext;
use crate::graph::{
    contains_log_in, contains_log_out, next_uid, Description, GraphIterator, IteratorKind,
    IteratorStats, Tagger,
};
use crate::query::{IterationRequest, Predicate, Translator};
use crate::types::{GraphValue, Result, SearchError};

use cursor::{ScrollCursor, ScrollSource};
use size::SizeOracle;

/// Iterator over backend hits for a single [`IterationRequest`].
///
/// Not meant for concurrent use; clones own independent pagination state.
#[derive(Debug)]
pub struct SearchIterator {
    uid: u64,
    tags: Tagger,
    backend: Arc<dyn SearchBackend>,
    options: Arc<IteratorOptions>,
    ctx: QueryContext,
    request: IterationRequest,
    predicate: Predicate,
    cursor: ScrollCursor,
    size: SizeOracle,
    result: Option<GraphValue>,
    err: Option<SearchError>,
}

impl SearchIterator {
    /// Translates `request` and returns an unstarted iterator.
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        options: Arc<IteratorOptions>,
        ctx: QueryContext,
        request: IterationRequest,
    ) -> Self {
        let predicate = Translator::new(backend.as_ref(), &ctx, &options).translate(&request);
        Self {
            uid: next_uid(),
            tags: Tagger::default(),
            backend,
            options,
            ctx,
            request,
            predicate,
            cursor: ScrollCursor::new(),
            size: SizeOracle::default(),
            result: None,
            err: None,
        }
    }

    /// Request the iterator was built from.
    pub fn request(&self) -> &IterationRequest {
        &self.request
    }

    /// Predicate sent to the backend.
    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    /// Rebuilds an iterator from the same request, carrying over tags but not progress.
    pub fn fresh_clone(&self) -> SearchIterator {
        let mut clone = SearchIterator::new(
            Arc::clone(&self.backend),
            Arc::clone(&self.options),
            self.ctx.clone(),
            self.request.clone(),
        );
        clone.tags.copy_from(&self.tags);
        clone
    }

    fn record(&mut self, err: SearchError) {
        warn!(uid = self.uid, error = %err, "search iterator error");
        self.err = Some(err);
    }

    fn compute_size(&mut self) -> Result<i64> {
        self.size.get_or_compute(
            self.backend.as_ref(),
            &self.ctx,
            &self.options.index,
            self.request.kind(),
            &self.predicate,
        )
    }

    /// Re-runs the metadata predicate restricted to the candidate's identifier.
    fn verify_candidate(&mut self, value: &GraphValue) -> bool {
        let restricted = self
            .predicate
            .clone()
            .and(Predicate::Ids(vec![value.id().to_owned()]));
        if restricted.is_match_none() {
            return false;
        }
        let kind = self.request.kind();
        let outcome = instrumented(BackendOp::Count, &self.ctx, || {
            self.backend
                .count(&self.ctx, &self.options.index, kind, &restricted)
        });
        match outcome {
            Ok(hits) => hits > 0,
            Err(err) => {
                self.record(err);
                false
            }
        }
    }

    fn matches_candidate(&mut self, value: &GraphValue) -> bool {
        if let IterationRequest::MetadataFilter { .. } = self.request {
            return match self.options.metadata_contains {
                MetadataContains::Trust => true,
                MetadataContains::Verify => self.verify_candidate(value),
            };
        }
        match (&self.request, value) {
            (IterationRequest::All { .. }, _) => true,
            (
                IterationRequest::ExactMatch {
                    direction,
                    value: target,
                    ..
                },
                GraphValue::Quad(quad),
            ) => quad.get(*direction).as_ref() == Some(target),
            _ => false,
        }
    }
}

impl GraphIterator for SearchIterator {
    fn uid(&self) -> u64 {
        self.uid
    }

    fn tagger(&mut self) -> &mut Tagger {
        &mut self.tags
    }

    fn tag_results(&self, dst: &mut HashMap<String, GraphValue>) {
        if let Some(result) = &self.result {
            for tag in self.tags.tags() {
                dst.insert(tag.clone(), result.clone());
            }
        }
        for (tag, value) in self.tags.fixed() {
            dst.insert(tag.clone(), value.clone());
        }
    }

    fn result(&self) -> Option<&GraphValue> {
        self.result.as_ref()
    }

    fn next(&mut self) -> bool {
        let source = ScrollSource {
            backend: self.backend.as_ref(),
            ctx: &self.ctx,
            options: &self.options,
            kind: self.request.kind(),
            predicate: (!self.request.is_all()).then_some(&self.predicate),
        };
        match self.cursor.advance(&source) {
            Ok(Some(id)) => {
                self.result = Some(self.request.kind().wrap(id));
                true
            }
            Ok(None) => {
                self.result = None;
                false
            }
            Err(err) => {
                self.result = None;
                self.record(err);
                false
            }
        }
    }

    fn next_path(&mut self) -> bool {
        false
    }

    fn contains(&mut self, value: &GraphValue) -> bool {
        contains_log_in(self.uid, value);
        let found = self.matches_candidate(value);
        if found {
            self.result = Some(value.clone());
        }
        contains_log_out(self.uid, value, found)
    }

    fn err(&self) -> Option<&SearchError> {
        self.err.as_ref()
    }

    fn reset(&mut self) {
        self.cursor.reset();
        self.result = None;
        if self.options.reset_clears_size {
            self.size.invalidate();
        }
    }

    fn clone_box(&self) -> Box<dyn GraphIterator> {
        Box::new(self.fresh_clone())
    }

    fn stats(&mut self) -> IteratorStats {
        let (size, exact_size) = self.size();
        IteratorStats {
            contains_cost: 1,
            next_cost: 5,
            size,
            exact_size,
        }
    }

    fn size(&mut self) -> (i64, bool) {
        if let Some(size) = self.size.cached() {
            return (size, true);
        }
        match self.compute_size() {
            Ok(size) => (size, true),
            Err(err) => {
                self.record(err);
                (0, false)
            }
        }
    }

    fn kind(&self) -> IteratorKind {
        if self.request.is_all() {
            IteratorKind::All
        } else {
            IteratorKind::Search
        }
    }

    fn optimize(self: Box<Self>) -> (Box<dyn GraphIterator>, bool) {
        (self, false)
    }

    fn sub_iterators(&self) -> &[Box<dyn GraphIterator>] {
        &[]
    }

    fn describe(&mut self) -> Description {
        let (size, _) = self.size();
        Description {
            uid: self.uid,
            name: self.request.label(),
            kind: self.kind(),
            size,
        }
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn sorted(&self) -> bool {
        self.options.sort_field.is_some()
    }
}
