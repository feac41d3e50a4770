//! Backend predicates and their query-DSL rendering.

use serde_json::{json, Map, Value};

/// Closed set of predicates the translator emits.
///
/// A predicate is built once per iterator and only re-evaluated afterwards.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Predicate {
    /// Exact match of `field` against `value`.
    Term {
        /// Dotted field path.
        field: String,
        /// Required value.
        value: String,
    },
    /// Inclusive range on `field`; an empty bound is open.
    Range {
        /// Dotted field path.
        field: String,
        /// Lower bound.
        from: String,
        /// Upper bound.
        to: String,
    },
    /// Anchored regular-expression match on `field`.
    Regexp {
        /// Dotted field path.
        field: String,
        /// Pattern matched against the whole field value.
        pattern: String,
    },
    /// Every document of a type.
    Type(String),
    /// Documents whose identifier is listed.
    Ids(Vec<String>),
    /// Conjunction of the inner predicates; empty matches everything.
    Filter(Vec<Predicate>),
    /// Matches no document.
    MatchNone,
}

impl Predicate {
    /// Conjunction helper that flattens nested filters and short-circuits `MatchNone`.
    pub fn and(self, other: Predicate) -> Predicate {
        let mut clauses = Vec::new();
        for part in [self, other] {
            match part {
                Predicate::MatchNone => return Predicate::MatchNone,
                Predicate::Filter(inner) => clauses.extend(inner),
                other => clauses.push(other),
            }
        }
        Predicate::Filter(clauses)
    }

    /// True when the predicate can never match.
    pub fn is_match_none(&self) -> bool {
        matches!(self, Predicate::MatchNone)
    }

    /// Renders the predicate as an Elasticsearch query object.
    pub fn to_dsl(&self) -> Value {
        match self {
            Predicate::Term { field, value } => json!({ "term": { field: value } }),
            Predicate::Range { field, from, to } => {
                let mut bounds = Map::new();
                if !from.is_empty() {
                    bounds.insert("gte".into(), Value::String(from.clone()));
                }
                if !to.is_empty() {
                    bounds.insert("lte".into(), Value::String(to.clone()));
                }
                json!({ "range": { field: bounds } })
            }
            Predicate::Regexp { field, pattern } => json!({ "regexp": { field: pattern } }),
            Predicate::Type(name) => json!({ "type": { "value": name } }),
            Predicate::Ids(ids) => json!({ "ids": { "values": ids } }),
            Predicate::Filter(clauses) => {
                let clauses: Vec<Value> = clauses.iter().map(Predicate::to_dsl).collect();
                json!({ "bool": { "filter": clauses } })
            }
            Predicate::MatchNone => json!({ "match_none": {} }),
        }
    }
}
