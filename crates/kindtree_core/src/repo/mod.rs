//! Store layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the full-snapshot persistence contract for the ontology tree.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Stores never apply business rules; they persist exactly what they get.
//! - Stores report corrupt persisted data as `InvalidData`, never as absence.

pub mod ontology_repo;
