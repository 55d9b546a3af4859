//! Asset Inventory Mapper
//!
//! Validates a hand-maintained inventory of infrastructure assets and
//! renders it as an annotated dependency graph plus per-asset report data.
//! Assets live in YAML files, one record per asset, with typed dependency
//! links:
//!
//! ```text
//! general:
//!   title: Office infrastructure
//! assets:
//!   - id: con_webapp
//!     type: container/docker
//!     name: Web app
//!     depends_on:
//!       - srv_rack01
//!       - dply_webapp
//!       - sto_nas INSUF moving to new volume
//!       - ^storage/.*
//!     tags: [needs_work]
//! ```
//!
//! ## Pipeline
//!
//! ```text
//! loader -> Inventory (id index, archived split, duplicate check)
//!        -> Resolver x RuleTable -> ValidationReport
//!        -> AssetGraph (DOT for the map renderer)
//!        -> AssetReport documents (JSON for the page renderer)
//! ```
//!
//! Each run is an independent, stateless batch over the full snapshot;
//! per-asset problems never abort a run, they surface through graph
//! styling and report content. Only a duplicate id aborts loading.

pub mod asset;
pub mod config;
pub mod error;
pub mod graph;
pub mod inventory;
pub mod loader;
pub mod report;
pub mod resolver;
pub mod rules;

pub use asset::{Asset, AssetId, Dependency, DependencyTarget, SourceLocation};
pub use config::MapperConfig;
pub use error::{InventoryError, Result};
pub use graph::{AssetGraph, DependencyEdge, GraphNode, StyleClass, Theme};
pub use inventory::{Inventory, SearchResult};
pub use loader::load_inventory;
pub use report::{build_reports, AssetReport, DependencyRow, ReportField, ReportValue};
pub use resolver::{
    RequirementOutcome, RequirementStatus, Resolver, ValidationError,
    ValidationReport, ValidationResult, ValidationWarning,
};
pub use rules::{Requirement, RuleTable, TypeRule};
