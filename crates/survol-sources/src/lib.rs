//! # Survol Sources
//!
//! One enumerator per entity class, each querying live operating-system
//! state through `sysinfo` (or the configured Python interpreter), plus the
//! registry that maps class names to enumerators.

pub mod computer;
pub mod context;
pub mod disk;
pub mod enumerator;
pub mod network;
pub mod process;
pub mod python;
pub mod registry;
pub mod users;

pub use context::{EnumerationContext, ParamValue, SourceSettings};
pub use enumerator::{collect_instances, enumerate_all, Enumerator, InstanceIter};
pub use registry::Registry;
