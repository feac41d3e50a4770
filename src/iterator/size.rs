//! Lazily computed, cached result counts.

use crate::backend::{instrumented, BackendOp, SearchBackend};
use crate::context::QueryContext;
use crate::query::Predicate;
use crate::types::{Result, ResultKind};

/// Lazily computed match count, cached after the first successful query.
#[derive(Debug, Default)]
pub(crate) struct SizeOracle {
    cached: Option<i64>,
}

impl SizeOracle {
    pub(crate) fn cached(&self) -> Option<i64> {
        self.cached
    }

    /// Returns the cached count, querying the backend only when none is cached.
    pub(crate) fn get_or_compute(
        &mut self,
        backend: &dyn SearchBackend,
        ctx: &QueryContext,
        index: &str,
        kind: ResultKind,
        predicate: &Predicate,
    ) -> Result<i64> {
        if let Some(size) = self.cached {
            return Ok(size);
        }
        let size = if predicate.is_match_none() {
            0
        } else {
            instrumented(BackendOp::Count, ctx, || {
                backend.count(ctx, index, kind, predicate)
            })?
        };
        self.cached = Some(size);
        Ok(size)
    }

    pub(crate) fn invalidate(&mut self) {
        self.cached = None;
    }
}
