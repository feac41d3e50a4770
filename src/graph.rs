//! Iterator contract expected by the host query engine.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::trace;

use crate::types::{GraphValue, Result, SearchError};

static NEXT_UID: AtomicU64 = AtomicU64::new(1);

/// Allocates a process-unique iterator identifier.
pub fn next_uid() -> u64 {
    NEXT_UID.fetch_add(1, Ordering::Relaxed)
}

/// Kind tag reported by an iterator for plan descriptions.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum IteratorKind {
    /// Walks every document of a kind.
    All,
    /// Walks the hits of a backend predicate.
    Search,
}

impl fmt::Display for IteratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IteratorKind::All => f.write_str("all"),
            IteratorKind::Search => f.write_str("search"),
        }
    }
}

/// Cost figures the host planner uses to order iterators.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct IteratorStats {
    /// Relative cost of one membership check.
    pub contains_cost: i64,
    /// Relative cost of one advance.
    pub next_cost: i64,
    /// Estimated number of results.
    pub size: i64,
    /// Whether `size` is exact.
    pub exact_size: bool,
}

/// Diagnostic summary of an iterator.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Description {
    /// Iterator identity.
    pub uid: u64,
    /// Human-readable label derived from the request target.
    pub name: String,
    /// Kind tag.
    pub kind: IteratorKind,
    /// Size as reported by the iterator.
    pub size: i64,
}

/// Tag bindings attached to an iterator.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Tagger {
    tags: Vec<String>,
    fixed: BTreeMap<String, GraphValue>,
}

impl Tagger {
    /// Binds `tag` to the iterator's current result.
    pub fn add(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
    }

    /// Binds `tag` to a constant value.
    pub fn add_fixed(&mut self, tag: impl Into<String>, value: GraphValue) {
        self.fixed.insert(tag.into(), value);
    }

    /// Static tags, in insertion order.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Fixed tags.
    pub fn fixed(&self) -> &BTreeMap<String, GraphValue> {
        &self.fixed
    }

    /// Merges another tagger's bindings into this one.
    pub fn copy_from(&mut self, other: &Tagger) {
        for tag in &other.tags {
            self.add(tag.clone());
        }
        for (tag, value) in &other.fixed {
            self.fixed.insert(tag.clone(), value.clone());
        }
    }
}

/// Capability set every iterator handed to the host must provide.
///
/// Implementations are driven by a single caller at a time; independent
/// clones may run on different threads.
pub trait GraphIterator: Send {
    /// Process-unique identity.
    fn uid(&self) -> u64;

    /// Mutable access to tag bindings.
    fn tagger(&mut self) -> &mut Tagger;

    /// Writes the current result under every static tag, then every fixed tag.
    fn tag_results(&self, dst: &mut HashMap<String, GraphValue>);

    /// Current result; `None` until an advance or membership check succeeds.
    fn result(&self) -> Option<&GraphValue>;

    /// Advances to the next result, returning `false` when none remains.
    fn next(&mut self) -> bool;

    /// Advances to an alternate path producing the same result.
    fn next_path(&mut self) -> bool;

    /// Tests whether `value` belongs to the result set, making it current on success.
    fn contains(&mut self, value: &GraphValue) -> bool;

    /// Sticky error recorded by a failed backend call.
    fn err(&self) -> Option<&SearchError>;

    /// Restarts iteration from the beginning.
    fn reset(&mut self);

    /// Builds an independent iterator over the same request.
    fn clone_box(&self) -> Box<dyn GraphIterator>;

    /// Planner cost figures.
    fn stats(&mut self) -> IteratorStats;

    /// Result count and whether it is exact.
    fn size(&mut self) -> (i64, bool);

    /// Kind tag.
    fn kind(&self) -> IteratorKind;

    /// Returns a cheaper equivalent iterator and whether anything changed.
    fn optimize(self: Box<Self>) -> (Box<dyn GraphIterator>, bool);

    /// Child iterators.
    fn sub_iterators(&self) -> &[Box<dyn GraphIterator>];

    /// Diagnostic summary.
    fn describe(&mut self) -> Description;

    /// Releases resources held by the iterator.
    fn close(&mut self) -> Result<()>;

    /// Whether results are emitted in a stable total order.
    fn sorted(&self) -> bool;
}

/// Records the start of a membership check.
pub fn contains_log_in(uid: u64, value: &GraphValue) {
    trace!(uid, value = %value, "contains check");
}

/// Records the outcome of a membership check and passes it through.
pub fn contains_log_out(uid: u64, value: &GraphValue, found: bool) -> bool {
    trace!(uid, value = %value, found, "contains result");
    found
}
