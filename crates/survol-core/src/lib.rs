//! # Survol Core
//!
//! Data model shared by every survol crate: entity classes and their schemas,
//! live entity instances, monikers (the identifier scheme behind every subject
//! URI) and the per-request triple graph.

pub mod classes;
pub mod error;
pub mod graph;
pub mod model;
pub mod moniker;
pub mod namespace;

pub use classes::*;
pub use error::*;
pub use graph::*;
pub use model::*;
pub use moniker::*;
