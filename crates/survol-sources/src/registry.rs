//! Class name to enumerator table

use crate::enumerator::Enumerator;
use crate::{computer, disk, network, process, python, users};
use std::collections::HashMap;
use std::sync::Arc;
use survol_core::{EntityClass, Result, SurvolError};
use tracing::debug;

/// Immutable after startup; shared by every request.
#[derive(Clone, Default)]
pub struct Registry {
    enumerators: HashMap<&'static str, Arc<dyn Enumerator>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in enumerator.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(process::ProcessEnumerator));
        registry.register(Arc::new(disk::DiskEnumerator));
        registry.register(Arc::new(users::UserEnumerator));
        registry.register(Arc::new(users::GroupEnumerator));
        registry.register(Arc::new(python::PythonPackageEnumerator));
        registry.register(Arc::new(network::NetworkAdapterEnumerator));
        registry.register(Arc::new(computer::ComputerSystemEnumerator));
        registry
    }

    /// Add or replace the enumerator for its class.
    pub fn register(&mut self, enumerator: Arc<dyn Enumerator>) {
        let name = enumerator.class().name;
        debug!("Registering enumerator for {}", name);
        self.enumerators.insert(name, enumerator);
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<dyn Enumerator>> {
        self.enumerators
            .get(name)
            .cloned()
            .ok_or_else(|| SurvolError::UnknownEntityClass(name.to_string()))
    }

    pub fn class(&self, name: &str) -> Result<&'static EntityClass> {
        self.lookup(name).map(|e| e.class())
    }

    /// Ordered property names of a class, keys first.
    pub fn schema(&self, name: &str) -> Result<Vec<&'static str>> {
        self.class(name).map(EntityClass::schema)
    }

    /// Registered classes sorted by name.
    pub fn classes(&self) -> Vec<&'static EntityClass> {
        let mut classes: Vec<_> = self.enumerators.values().map(|e| e.class()).collect();
        classes.sort_by_key(|c| c.name);
        classes
    }

    pub fn len(&self) -> usize {
        self.enumerators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enumerators.is_empty()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.classes().iter().map(|c| c.name)).finish()
    }
}
