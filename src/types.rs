//! Identifier and value types shared by the translator, cursor, and facade.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use xxhash_rust::xxh64::xxh64;

/// Width in hex digits of a single node hash.
pub const HASH_HEX_LEN: usize = 16;
/// Width in hex digits of a quad hash (four node hashes).
pub const QUAD_HEX_LEN: usize = HASH_HEX_LEN * 4;

const ABSENT_COMPONENT: &str = "0000000000000000";

/// Errors surfaced by backend calls, request construction, and configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// The search backend rejected or failed a call.
    #[error("backend error: {0}")]
    Backend(String),
    /// The backend does not know the supplied scroll token (expired or never issued).
    #[error("unknown scroll id '{0}'")]
    UnknownScroll(String),
    /// A pattern predicate could not be compiled by the backend.
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// Pattern text supplied in the filter.
        pattern: String,
        /// Compiler diagnostic.
        reason: String,
    },
    /// An iteration request was built with an unsupported shape.
    #[error("invalid request: {0}")]
    InvalidRequest(&'static str),
    /// Configuration could not be read or parsed.
    #[error("config error: {0}")]
    Config(String),
    /// The caller cancelled the query context.
    #[error("query cancelled")]
    Cancelled,
    /// The query context deadline elapsed before the call was issued.
    #[error("query deadline exceeded")]
    DeadlineExceeded,
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SearchError>;

/// Role a value plays within a quad, or the metadata marker.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Unconstrained; used by all-iterators.
    Any,
    /// Quad subject.
    Subject,
    /// Quad predicate.
    Predicate,
    /// Quad object.
    Object,
    /// Quad label (graph name).
    Label,
    /// Quad metadata fields.
    Metadata,
}

impl Direction {
    /// Backend field name the direction is indexed under.
    pub const fn as_str(self) -> &'static str {
        match self {
            Direction::Any => "any",
            Direction::Subject => "subject",
            Direction::Predicate => "predicate",
            Direction::Object => "object",
            Direction::Label => "label",
            Direction::Metadata => "metadata",
        }
    }

    /// Position of the direction's component inside a [`QuadHash`].
    const fn component(self) -> Option<usize> {
        match self {
            Direction::Subject => Some(0),
            Direction::Predicate => Some(1),
            Direction::Object => Some(2),
            Direction::Label => Some(3),
            Direction::Any | Direction::Metadata => None,
        }
    }

    /// True for the four positional quad directions.
    pub const fn is_quad_component(self) -> bool {
        self.component().is_some()
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Document kind a scroll walks over.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    /// Quad documents; hits map to [`QuadHash`].
    Quads,
    /// Node documents; hits map to [`NodeHash`].
    Nodes,
}

impl ResultKind {
    /// Backend document type name.
    pub const fn as_str(self) -> &'static str {
        match self {
            ResultKind::Quads => "quads",
            ResultKind::Nodes => "nodes",
        }
    }

    /// Wraps a backend hit identifier in the matching host value.
    pub fn wrap(self, id: String) -> GraphValue {
        match self {
            ResultKind::Quads => GraphValue::Quad(QuadHash(id)),
            ResultKind::Nodes => GraphValue::Node(NodeHash(id)),
        }
    }
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque node identifier as stored in the index.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct NodeHash(pub String);

impl NodeHash {
    /// Wraps an identifier returned by the backend.
    pub fn new(id: impl Into<String>) -> Self {
        NodeHash(id.into())
    }

    /// Derives the identifier for a node name.
    pub fn of(name: &str) -> Self {
        NodeHash(hex::encode(xxh64(name.as_bytes(), 0).to_be_bytes()))
    }

    /// Identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Quad identifier: subject, predicate, object, and label hashes concatenated.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct QuadHash(pub String);

impl QuadHash {
    /// Builds a quad identifier from its components; `label` may be absent.
    pub fn from_nodes(
        subject: &NodeHash,
        predicate: &NodeHash,
        object: &NodeHash,
        label: Option<&NodeHash>,
    ) -> Result<Self> {
        let label = label.map(NodeHash::as_str).unwrap_or(ABSENT_COMPONENT);
        let parts = [subject.as_str(), predicate.as_str(), object.as_str(), label];
        if parts.iter().any(|part| part.len() != HASH_HEX_LEN) {
            return Err(SearchError::InvalidRequest(
                "quad components must be fixed-width node hashes",
            ));
        }
        Ok(QuadHash(parts.concat()))
    }

    /// Returns the component stored for `dir`, if the direction is positional and present.
    pub fn get(&self, dir: Direction) -> Option<NodeHash> {
        let idx = dir.component()?;
        if self.0.len() != QUAD_HEX_LEN {
            return None;
        }
        let part = self.0.get(idx * HASH_HEX_LEN..(idx + 1) * HASH_HEX_LEN)?;
        if part == ABSENT_COMPONENT {
            return None;
        }
        Some(NodeHash(part.to_owned()))
    }

    /// Identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuadHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Host-visible result value.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum GraphValue {
    /// A node identifier.
    Node(NodeHash),
    /// A quad identifier.
    Quad(QuadHash),
}

impl GraphValue {
    /// Backend identifier underlying the value.
    pub fn id(&self) -> &str {
        match self {
            GraphValue::Node(node) => node.as_str(),
            GraphValue::Quad(quad) => quad.as_str(),
        }
    }
}

impl fmt::Display for GraphValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphValue::Node(node) => write!(f, "node:{node}"),
            GraphValue::Quad(quad) => write!(f, "quad:{quad}"),
        }
    }
}

impl From<NodeHash> for GraphValue {
    fn from(value: NodeHash) -> Self {
        GraphValue::Node(value)
    }
}

impl From<QuadHash> for GraphValue {
    fn from(value: QuadHash) -> Self {
        GraphValue::Quad(value)
    }
}

/// Metadata constraints keyed by field name; values are patterns, or
/// `from=>to` ranges for date-typed fields.
#[derive(Clone, Default, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub struct MetadataFilter(BTreeMap<String, String>);

impl MetadataFilter {
    /// Creates an empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a constraint, replacing any previous value for `key`.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Iterates constraints in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of constraints.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no constraints are present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MetadataFilter {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        MetadataFilter(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl fmt::Display for MetadataFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, (key, value)) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(",")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}
