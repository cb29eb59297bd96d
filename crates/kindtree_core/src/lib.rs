//! Core taxonomy logic for kindtree.
//! This crate is the single source of truth for kind hierarchy invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::CoreConfig;
pub use logging::{default_log_level, init_logging, logging_status, LogTarget, LoggingError};
pub use model::kind::{
    KindName, KindNameError, KindNode, OntologyTree, PropertySet, TreeError, ROOT_KIND,
};
pub use repo::ontology_repo::{
    MemoryOntologyStore, OntologyStore, SqliteOntologyStore, StoreError, StoreResult,
};
pub use service::ontology_service::{OntologyError, OntologyResult, OntologyService};
