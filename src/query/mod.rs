#![forbid(unsafe_code)]

//! Request translation: from host requests to backend predicates.

/// Field-mapping inspection.
///
/// Reports whether a metadata field is date-typed so its filter value is read as a range.
pub mod mapping;

/// Backend predicate representation and query-DSL rendering.
pub mod predicate;

/// Iteration requests and the translator that turns them into predicates.
pub mod translate;

pub use mapping::{FieldMapping, FieldType};
pub use predicate::Predicate;
pub use translate::{metadata_predicate, IterationRequest, Translator};
