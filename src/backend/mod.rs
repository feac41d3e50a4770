//! Search backend interface.
//!
//! The iterator layer only needs four calls from an inverted-index backend:
//! field-mapping introspection, counting, and the two halves of a scroll.
//! [`memory::MemoryBackend`] implements them in-process.

pub mod memory;

use std::fmt;
use std::time::Duration;

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::context::QueryContext;
use crate::profile::{profile_timer, record_profile_timer};
use crate::query::mapping::FieldMapping;
use crate::query::predicate::Predicate;
use crate::types::{Result, ResultKind};

/// One matching document.
#[derive(Clone, Debug, PartialEq)]
pub struct Hit {
    /// Document identifier.
    pub id: String,
    /// Stored document body, when the backend returns it.
    pub source: Option<Value>,
}

impl Hit {
    /// Hit without a document body.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: None,
        }
    }
}

/// Opaque continuation handle for a scroll.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ScrollToken(pub String);

impl fmt::Display for ScrollToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One page of a scroll.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Page {
    /// Hits in backend order.
    pub hits: Vec<Hit>,
    /// Token for the following page; `None` when the backend closed the scroll.
    pub scroll_id: Option<ScrollToken>,
    /// Total hits for the whole query, not just this page.
    pub total_hits: i64,
}

impl Page {
    /// Number of hits on this page.
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// True when the page carries no hits.
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// Parameters for opening a scroll.
#[derive(Clone, Debug)]
pub struct ScrollRequest<'a> {
    /// Index to search.
    pub index: &'a str,
    /// Document type to walk.
    pub doc_type: ResultKind,
    /// Filter; `None` walks every document of `doc_type`.
    pub predicate: Option<&'a Predicate>,
    /// Ascending sort key.
    pub sort_field: Option<&'a str>,
    /// Hits per page.
    pub size: usize,
    /// Scroll context lifetime between pages.
    pub keep_alive: Duration,
}

impl ScrollRequest<'_> {
    /// Search body in Elasticsearch form.
    pub fn body(&self) -> Value {
        let mut body = json!({ "size": self.size });
        if let Some(predicate) = self.predicate {
            body["query"] = predicate.to_dsl();
        }
        if let Some(field) = self.sort_field {
            body["sort"] = json!([{ field: "asc" }]);
        }
        body
    }
}

/// Backend call kinds, used for profiling and fault injection.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum BackendOp {
    /// Field-mapping introspection.
    FieldMapping,
    /// Count query.
    Count,
    /// Scroll open.
    ScrollStart,
    /// Scroll continuation.
    ScrollNext,
}

impl BackendOp {
    /// Short name used in logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            BackendOp::FieldMapping => "field_mapping",
            BackendOp::Count => "count",
            BackendOp::ScrollStart => "scroll_start",
            BackendOp::ScrollNext => "scroll_next",
        }
    }
}

impl fmt::Display for BackendOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only access to an inverted-index search backend.
///
/// Calls block until the backend answers. Implementations should honour the
/// context's deadline where their transport allows it.
pub trait SearchBackend: fmt::Debug + Send + Sync {
    /// Field types for `doc_type` in `index`.
    fn field_mapping(
        &self,
        ctx: &QueryContext,
        index: &str,
        doc_type: ResultKind,
    ) -> Result<FieldMapping>;

    /// Number of `doc_type` documents matching `predicate`.
    fn count(
        &self,
        ctx: &QueryContext,
        index: &str,
        doc_type: ResultKind,
        predicate: &Predicate,
    ) -> Result<i64>;

    /// Opens a scroll and returns its first page.
    fn scroll_start(&self, ctx: &QueryContext, request: &ScrollRequest<'_>) -> Result<Page>;

    /// Fetches the page following `token`.
    fn scroll_next(
        &self,
        ctx: &QueryContext,
        index: &str,
        token: &ScrollToken,
        keep_alive: Duration,
    ) -> Result<Page>;
}

/// Runs one backend call: checks the context, times the call, and logs failures.
pub(crate) fn instrumented<T>(
    op: BackendOp,
    ctx: &QueryContext,
    call: impl FnOnce() -> Result<T>,
) -> Result<T> {
    ctx.check()?;
    let start = profile_timer();
    let result = call();
    record_profile_timer(op, start, result.is_ok());
    match &result {
        Ok(_) => debug!(op = op.as_str(), "backend call ok"),
        Err(err) => warn!(op = op.as_str(), error = %err, "backend call failed"),
    }
    result
}
