//! Roadmap engine (task generation and adaptive completion)
//!
//! Catalog lookup, the pure adaptation algorithm and the storage-backed
//! service that serializes completions per learner.

#![warn(missing_docs)]

pub mod catalog;
pub mod engine;
pub mod service;

pub use catalog::{category_for, Catalog, CatalogItem, CatalogKey};
pub use engine::{complete_task, generate_initial_roadmap, Completion};
pub use service::RoadmapService;
