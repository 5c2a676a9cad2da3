//! Decoding records into typed entities and matching them against a predicate.

mod mapping;
mod pool;
mod predicate;
mod rules;

pub use mapping::{Decoder, FieldMapping, FieldMappingBuilder, FieldSetter};
pub use pool::{EntityPool, PooledEntity};
pub use predicate::Predicate;
pub use rules::FieldRule;
