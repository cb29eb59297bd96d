//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store calls into taxonomy-level operations.
//! - Keep CLI and embedding layers decoupled from storage details.

pub mod ontology_service;
