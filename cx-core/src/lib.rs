//! # cx-core
//!
//! Foundation crate for the cx code graph.
//! Defines the data model, error taxonomy, configuration, identity/hash
//! derivation, and workspace paths. Every other crate depends on this.

pub mod config;
pub mod errors;
pub mod ident;
pub mod model;
pub mod paths;

pub use config::CxConfig;
pub use errors::{CxError, CxResult};
pub use model::entity::{Entity, EntityFilter, EntityPatch, EntityStatus, EntityType, Visibility};
pub use model::dependency::{DepType, Dependency};
pub use model::coverage::{CoverageBlock, EntityCoverage, TestEntityLink};
pub use model::metrics::EntityMetrics;
