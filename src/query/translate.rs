//! Translation of iteration requests into backend predicates.

use tracing::{debug, warn};

use crate::backend::{instrumented, BackendOp, SearchBackend};
use crate::config::IteratorOptions;
use crate::context::QueryContext;
use crate::query::mapping::FieldMapping;
use crate::query::predicate::Predicate;
use crate::types::{Direction, MetadataFilter, NodeHash, Result, ResultKind, SearchError};

/// What an iterator walks. Fixed for the iterator's lifetime and reused on clone.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum IterationRequest {
    /// Documents whose `direction` field equals `value`.
    ExactMatch {
        /// Document kind.
        kind: ResultKind,
        /// Positional quad direction.
        direction: Direction,
        /// Required node.
        value: NodeHash,
    },
    /// Documents whose metadata fields satisfy every filter entry.
    MetadataFilter {
        /// Document kind.
        kind: ResultKind,
        /// Field constraints.
        filter: MetadataFilter,
    },
    /// Every document of a kind.
    All {
        /// Document kind.
        kind: ResultKind,
    },
}

impl IterationRequest {
    /// Exact-match request; only positional quad directions are accepted.
    pub fn exact(kind: ResultKind, direction: Direction, value: NodeHash) -> Result<Self> {
        if !direction.is_quad_component() {
            return Err(SearchError::InvalidRequest(
                "exact match requires subject, predicate, object, or label",
            ));
        }
        Ok(IterationRequest::ExactMatch {
            kind,
            direction,
            value,
        })
    }

    /// Metadata filter request.
    pub fn metadata(kind: ResultKind, filter: MetadataFilter) -> Self {
        IterationRequest::MetadataFilter { kind, filter }
    }

    /// Request for every document of `kind`.
    pub fn all(kind: ResultKind) -> Self {
        IterationRequest::All { kind }
    }

    /// Document kind walked by the request.
    pub fn kind(&self) -> ResultKind {
        match self {
            IterationRequest::ExactMatch { kind, .. }
            | IterationRequest::MetadataFilter { kind, .. }
            | IterationRequest::All { kind } => *kind,
        }
    }

    /// Direction constrained by the request.
    pub fn direction(&self) -> Direction {
        match self {
            IterationRequest::ExactMatch { direction, .. } => *direction,
            IterationRequest::MetadataFilter { .. } => Direction::Metadata,
            IterationRequest::All { .. } => Direction::Any,
        }
    }

    /// True for requests that walk every document.
    pub fn is_all(&self) -> bool {
        matches!(self, IterationRequest::All { .. })
    }

    /// Label used in iterator descriptions.
    pub fn label(&self) -> String {
        match self {
            IterationRequest::ExactMatch { value, .. } => value.to_string(),
            IterationRequest::MetadataFilter { filter, .. } => filter.to_string(),
            IterationRequest::All { .. } => String::new(),
        }
    }
}

/// Builds predicates, consulting the backend's field mapping for metadata requests.
pub struct Translator<'a> {
    backend: &'a dyn SearchBackend,
    ctx: &'a QueryContext,
    options: &'a IteratorOptions,
}

impl<'a> Translator<'a> {
    /// Creates a translator bound to one backend and context.
    pub fn new(
        backend: &'a dyn SearchBackend,
        ctx: &'a QueryContext,
        options: &'a IteratorOptions,
    ) -> Self {
        Self {
            backend,
            ctx,
            options,
        }
    }

    /// Translates `request`. Never fails: an unreadable schema yields `MatchNone`.
    pub fn translate(&self, request: &IterationRequest) -> Predicate {
        match request {
            IterationRequest::ExactMatch {
                direction, value, ..
            } => Predicate::Term {
                field: direction.as_str().to_owned(),
                value: value.as_str().to_owned(),
            },
            IterationRequest::MetadataFilter { kind, filter } => {
                let mapping = self.field_mapping(*kind);
                metadata_predicate(&mapping, filter, &self.options.range_delimiter)
            }
            IterationRequest::All { kind } => Predicate::Type(kind.as_str().to_owned()),
        }
    }

    fn field_mapping(&self, kind: ResultKind) -> FieldMapping {
        let index = self.options.index.as_str();
        match instrumented(BackendOp::FieldMapping, self.ctx, || {
            self.backend.field_mapping(self.ctx, index, kind)
        }) {
            Ok(mapping) => mapping,
            Err(err) => {
                warn!(
                    index,
                    kind = kind.as_str(),
                    error = %err,
                    "field mapping unavailable; treating schema as empty"
                );
                FieldMapping::new()
            }
        }
    }
}

/// Builds the conjunction for a metadata filter against a known mapping.
///
/// Date-typed fields take `from<delimiter>to` ranges and everything else is a
/// pattern. An empty mapping, or any range value without the delimiter, turns
/// the whole request into `MatchNone`.
pub fn metadata_predicate(
    mapping: &FieldMapping,
    filter: &MetadataFilter,
    delimiter: &str,
) -> Predicate {
    if mapping.is_empty() {
        debug!("empty field mapping; metadata request matches nothing");
        return Predicate::MatchNone;
    }
    let dir = Direction::Metadata;
    let mut clauses = Vec::with_capacity(filter.len());
    for (key, value) in filter.iter() {
        let field = format!("{}.{key}", dir.as_str());
        if mapping.is_time(dir, key) {
            let mut bounds = value.split(delimiter);
            let (Some(from), Some(to)) = (bounds.next(), bounds.next()) else {
                debug!(field = %field, value, "range filter missing delimiter; matching nothing");
                return Predicate::MatchNone;
            };
            clauses.push(Predicate::Range {
                field,
                from: from.to_owned(),
                to: to.to_owned(),
            });
        } else {
            clauses.push(Predicate::Regexp {
                field,
                pattern: value.to_owned(),
            });
        }
    }
    Predicate::Filter(clauses)
}
