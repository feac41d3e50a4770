//! In-process search backend.
//!
//! Documents live in per-index, per-kind maps ordered by identifier. Scrolls
//! snapshot their matching identifiers when opened, the way a real scroll
//! context pins a point-in-time view, so writes made afterwards are not seen.

use std::cmp::Ordering as CmpOrdering;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use regex::Regex;
use serde_json::{json, Map, Value};
use time::format_description::well_known::Rfc3339;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime};
use tracing::trace;

use super::{BackendOp, Hit, Page, ScrollRequest, ScrollToken, SearchBackend};
use crate::context::QueryContext;
use crate::query::mapping::FieldMapping;
use crate::query::predicate::Predicate;
use crate::types::{Direction, NodeHash, QuadHash, Result, ResultKind, SearchError};

#[derive(Debug, Default)]
struct MemoryIndex {
    mappings: HashMap<ResultKind, FieldMapping>,
    docs: HashMap<ResultKind, BTreeMap<String, Value>>,
}

#[derive(Debug)]
struct ScrollState {
    index: String,
    doc_type: ResultKind,
    remaining: VecDeque<String>,
    total: i64,
    page_size: usize,
    expires_at: Instant,
}

impl ScrollState {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

/// Search backend holding every document in memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    indices: RwLock<HashMap<String, MemoryIndex>>,
    scrolls: Mutex<HashMap<String, ScrollState>>,
    next_scroll: AtomicU64,
    faults: Mutex<HashMap<BackendOp, usize>>,
    calls: Mutex<HashMap<BackendOp, u64>>,
}

impl MemoryBackend {
    /// Empty backend with no indices.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates `index` if it does not exist.
    pub fn create_index(&self, index: &str) {
        self.indices.write().entry(index.to_owned()).or_default();
    }

    /// Installs the field mapping for `doc_type`, creating the index if needed.
    pub fn put_mapping(&self, index: &str, doc_type: ResultKind, mapping: FieldMapping) {
        self.indices
            .write()
            .entry(index.to_owned())
            .or_default()
            .mappings
            .insert(doc_type, mapping);
    }

    /// Stores `source` under `id`, replacing any previous document.
    pub fn index_document(&self, index: &str, doc_type: ResultKind, id: &str, source: Value) {
        self.indices
            .write()
            .entry(index.to_owned())
            .or_default()
            .docs
            .entry(doc_type)
            .or_default()
            .insert(id.to_owned(), source);
    }

    /// Removes a document, returning whether it existed.
    pub fn delete_document(&self, index: &str, doc_type: ResultKind, id: &str) -> bool {
        self.indices
            .write()
            .get_mut(index)
            .and_then(|idx| idx.docs.get_mut(&doc_type))
            .is_some_and(|docs| docs.remove(id).is_some())
    }

    /// Stores a node document for `name` and returns its identifier.
    pub fn index_node(&self, index: &str, name: &str) -> NodeHash {
        let hash = NodeHash::of(name);
        self.index_document(index, ResultKind::Nodes, hash.as_str(), json!({ "name": name }));
        hash
    }

    /// Stores a quad document (and its node documents) and returns the quad identifier.
    pub fn index_quad(
        &self,
        index: &str,
        subject: &str,
        predicate: &str,
        object: &str,
        label: Option<&str>,
        metadata: Map<String, Value>,
    ) -> Result<QuadHash> {
        let s = self.index_node(index, subject);
        let p = self.index_node(index, predicate);
        let o = self.index_node(index, object);
        let l = label.map(|label| self.index_node(index, label));
        let quad = QuadHash::from_nodes(&s, &p, &o, l.as_ref())?;
        let mut doc = Map::new();
        doc.insert(Direction::Subject.as_str().into(), Value::String(s.0));
        doc.insert(Direction::Predicate.as_str().into(), Value::String(p.0));
        doc.insert(Direction::Object.as_str().into(), Value::String(o.0));
        if let Some(l) = l {
            doc.insert(Direction::Label.as_str().into(), Value::String(l.0));
        }
        doc.insert(Direction::Metadata.as_str().into(), Value::Object(metadata));
        self.index_document(index, ResultKind::Quads, quad.as_str(), Value::Object(doc));
        Ok(quad)
    }

    /// Makes the next `times` calls of kind `op` fail.
    pub fn fail_next(&self, op: BackendOp, times: usize) {
        *self.faults.lock().entry(op).or_default() += times;
    }

    /// Number of calls of kind `op` received so far, failed ones included.
    pub fn calls(&self, op: BackendOp) -> u64 {
        self.calls.lock().get(&op).copied().unwrap_or(0)
    }

    /// Number of scroll contexts still held open. Expired contexts are dropped first.
    pub fn open_scrolls(&self) -> usize {
        let mut scrolls = self.scrolls.lock();
        prune_expired(&mut scrolls, Instant::now());
        scrolls.len()
    }

    fn trip(&self, ctx: &QueryContext, op: BackendOp) -> Result<()> {
        *self.calls.lock().entry(op).or_default() += 1;
        ctx.check()?;
        let mut faults = self.faults.lock();
        if let Some(remaining) = faults.get_mut(&op) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(SearchError::Backend(format!("injected {op} failure")));
            }
        }
        Ok(())
    }

    fn matching_ids(
        &self,
        index: &str,
        doc_type: ResultKind,
        predicate: Option<&Predicate>,
        sort_field: Option<&str>,
    ) -> Result<Vec<String>> {
        let matcher = predicate.map(Matcher::compile).transpose()?;
        let indices = self.indices.read();
        let idx = indices
            .get(index)
            .ok_or_else(|| SearchError::Backend(format!("no such index: {index}")))?;
        let Some(docs) = idx.docs.get(&doc_type) else {
            return Ok(Vec::new());
        };
        let mut hits: Vec<(&String, &Value)> = docs
            .iter()
            .filter(|(id, doc)| {
                matcher
                    .as_ref()
                    .map_or(true, |m| m.matches(doc_type, id, doc))
            })
            .collect();
        if let Some(field) = sort_field.filter(|field| *field != "_id") {
            hits.sort_by(|(a_id, a), (b_id, b)| {
                let a_key = lookup(a, field);
                let b_key = lookup(b, field);
                match (a_key, b_key) {
                    (Some(a_key), Some(b_key)) => compare_scalars(&a_key, &b_key),
                    (Some(_), None) => CmpOrdering::Less,
                    (None, Some(_)) => CmpOrdering::Greater,
                    (None, None) => CmpOrdering::Equal,
                }
                .then_with(|| a_id.cmp(b_id))
            });
        }
        Ok(hits.into_iter().map(|(id, _)| id.clone()).collect())
    }

    fn take_page(&self, state: &mut ScrollState) -> Vec<Hit> {
        let take = state.page_size.min(state.remaining.len());
        let indices = self.indices.read();
        let docs = indices
            .get(&state.index)
            .and_then(|idx| idx.docs.get(&state.doc_type));
        state
            .remaining
            .drain(..take)
            .map(|id| {
                let source = docs.and_then(|docs| docs.get(&id)).cloned();
                Hit { id, source }
            })
            .collect()
    }
}

impl SearchBackend for MemoryBackend {
    fn field_mapping(
        &self,
        ctx: &QueryContext,
        index: &str,
        doc_type: ResultKind,
    ) -> Result<FieldMapping> {
        self.trip(ctx, BackendOp::FieldMapping)?;
        let indices = self.indices.read();
        let idx = indices
            .get(index)
            .ok_or_else(|| SearchError::Backend(format!("no such index: {index}")))?;
        Ok(idx.mappings.get(&doc_type).cloned().unwrap_or_default())
    }

    fn count(
        &self,
        ctx: &QueryContext,
        index: &str,
        doc_type: ResultKind,
        predicate: &Predicate,
    ) -> Result<i64> {
        self.trip(ctx, BackendOp::Count)?;
        let ids = self.matching_ids(index, doc_type, Some(predicate), None)?;
        Ok(ids.len() as i64)
    }

    fn scroll_start(&self, ctx: &QueryContext, request: &ScrollRequest<'_>) -> Result<Page> {
        self.trip(ctx, BackendOp::ScrollStart)?;
        let ids = self.matching_ids(
            request.index,
            request.doc_type,
            request.predicate,
            request.sort_field,
        )?;
        let token = format!("scroll-{}", self.next_scroll.fetch_add(1, Ordering::Relaxed));
        let mut state = ScrollState {
            index: request.index.to_owned(),
            doc_type: request.doc_type,
            total: ids.len() as i64,
            remaining: ids.into(),
            page_size: request.size.max(1),
            expires_at: Instant::now() + request.keep_alive,
        };
        let hits = self.take_page(&mut state);
        let total_hits = state.total;
        trace!(token = %token, hits = hits.len(), total_hits, "scroll opened");
        let mut scrolls = self.scrolls.lock();
        prune_expired(&mut scrolls, Instant::now());
        scrolls.insert(token.clone(), state);
        Ok(Page {
            hits,
            scroll_id: Some(ScrollToken(token)),
            total_hits,
        })
    }

    fn scroll_next(
        &self,
        ctx: &QueryContext,
        index: &str,
        token: &ScrollToken,
        keep_alive: Duration,
    ) -> Result<Page> {
        self.trip(ctx, BackendOp::ScrollNext)?;
        let now = Instant::now();
        let mut scrolls = self.scrolls.lock();
        prune_expired(&mut scrolls, now);
        let state = scrolls
            .get_mut(&token.0)
            .filter(|state| state.index == index)
            .ok_or_else(|| SearchError::UnknownScroll(token.0.clone()))?;
        state.expires_at = now + keep_alive;
        let hits = self.take_page(state);
        let total_hits = state.total;
        if hits.is_empty() {
            scrolls.remove(&token.0);
        }
        Ok(Page {
            hits,
            scroll_id: Some(token.clone()),
            total_hits,
        })
    }
}

/// Drops scroll contexts whose keep-alive has lapsed.
fn prune_expired(scrolls: &mut HashMap<String, ScrollState>, now: Instant) {
    scrolls.retain(|token, state| {
        let live = !state.is_expired(now);
        if !live {
            trace!(token = %token, "scroll expired");
        }
        live
    });
}

enum Matcher {
    Term { field: String, value: String },
    Range { field: String, from: String, to: String },
    Regexp { field: String, regex: Regex },
    Type(String),
    Ids(HashSet<String>),
    All(Vec<Matcher>),
    Nothing,
}

impl Matcher {
    fn compile(predicate: &Predicate) -> Result<Self> {
        Ok(match predicate {
            Predicate::Term { field, value } => Matcher::Term {
                field: field.clone(),
                value: value.clone(),
            },
            Predicate::Range { field, from, to } => Matcher::Range {
                field: field.clone(),
                from: from.clone(),
                to: to.clone(),
            },
            Predicate::Regexp { field, pattern } => {
                let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|err| {
                    SearchError::InvalidPattern {
                        pattern: pattern.clone(),
                        reason: err.to_string(),
                    }
                })?;
                Matcher::Regexp {
                    field: field.clone(),
                    regex,
                }
            }
            Predicate::Type(name) => Matcher::Type(name.clone()),
            Predicate::Ids(ids) => Matcher::Ids(ids.iter().cloned().collect()),
            Predicate::Filter(clauses) => Matcher::All(
                clauses
                    .iter()
                    .map(Matcher::compile)
                    .collect::<Result<Vec<_>>>()?,
            ),
            Predicate::MatchNone => Matcher::Nothing,
        })
    }

    fn matches(&self, doc_type: ResultKind, id: &str, doc: &Value) -> bool {
        match self {
            Matcher::Term { field, value } => lookup(doc, field).is_some_and(|v| v == *value),
            Matcher::Range { field, from, to } => lookup(doc, field).is_some_and(|v| {
                (from.is_empty() || compare_scalars(&v, from) != CmpOrdering::Less)
                    && (to.is_empty() || compare_scalars(&v, to) != CmpOrdering::Greater)
            }),
            Matcher::Regexp { field, regex } => {
                lookup(doc, field).is_some_and(|v| regex.is_match(&v))
            }
            Matcher::Type(name) => doc_type.as_str() == name,
            Matcher::Ids(ids) => ids.contains(id),
            Matcher::All(inner) => inner.iter().all(|m| m.matches(doc_type, id, doc)),
            Matcher::Nothing => false,
        }
    }
}

/// Resolves a dotted path to a scalar rendered as text.
fn lookup(doc: &Value, path: &str) -> Option<String> {
    let mut cur = doc;
    for part in path.split('.') {
        cur = cur.get(part)?;
    }
    match cur {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

fn parse_time(text: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(text, &Rfc3339).ok().or_else(|| {
        Date::parse(text, DATE_FORMAT)
            .ok()
            .map(|date| date.midnight().assume_utc())
    })
}

/// Orders two scalars as timestamps, then numbers, then text.
fn compare_scalars(a: &str, b: &str) -> CmpOrdering {
    if let (Some(a), Some(b)) = (parse_time(a), parse_time(b)) {
        return a.cmp(&b);
    }
    if let (Ok(a), Ok(b)) = (a.parse::<f64>(), b.parse::<f64>()) {
        if let Some(ord) = a.partial_cmp(&b) {
            return ord;
        }
    }
    a.cmp(b)
}
