//! Graph iterators backed by a scroll-paginated search index.
//!
//! A host query engine asks for "every quad whose direction D equals V" or
//! "every quad whose metadata matches this filter"; this crate translates the
//! request into a backend predicate, pages through the hits with a scroll
//! cursor, and exposes them through the host's [`graph::GraphIterator`] contract.

#![warn(missing_docs)]

pub mod backend;
pub mod config;
pub mod context;
pub mod graph;
pub mod iterator;
pub mod profile;
pub mod query;
pub mod store;
pub mod types;

pub use backend::{memory::MemoryBackend, SearchBackend};
pub use config::{IteratorOptions, MetadataContains};
pub use context::QueryContext;
pub use graph::GraphIterator;
pub use iterator::SearchIterator;
pub use query::IterationRequest;
pub use store::SearchStore;
pub use types::{
    Direction, GraphValue, MetadataFilter, NodeHash, QuadHash, Result, ResultKind, SearchError,
};
