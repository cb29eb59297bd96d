//! Taxonomy domain model.
//!
//! # Responsibility
//! - Define canonical kind and tree structures used by core business logic.
//!
//! # Invariants
//! - Every kind is identified by its normalized `KindName`.
//! - Structural mutations go through `OntologyTree` so tree shape stays valid.

pub mod kind;
