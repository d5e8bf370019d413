//! Enumerator trait and the consumer that drains it

use crate::context::EnumerationContext;
use survol_core::{EntityClass, EntityInstance, Moniker, Result, SurvolError};
use tracing::{debug, warn};

/// Lazy stream of instances. An `Err(ResourceVanished)` item means one
/// instance disappeared between discovery and attribute read.
pub type InstanceIter<'a> = Box<dyn Iterator<Item = Result<EntityInstance>> + Send + 'a>;

/// Source of live instances for one entity class.
///
/// Every call re-queries the operating system; implementations keep no
/// state between calls.
pub trait Enumerator: Send + Sync {
    fn class(&self) -> &'static EntityClass;

    fn enumerate(&self, ctx: &EnumerationContext) -> Result<InstanceIter<'_>>;

    /// Find the single instance named by `moniker`.
    fn lookup(&self, ctx: &EnumerationContext, moniker: &Moniker) -> Result<Option<EntityInstance>> {
        for item in self.enumerate(ctx)? {
            match item {
                Ok(instance) if instance.moniker() == moniker => return Ok(Some(instance)),
                Ok(_) => {}
                Err(e) if e.is_recoverable() => debug!("{}", e),
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }
}

/// Drain an enumeration, skipping vanished instances.
///
/// Duplicate identifiers keep the first instance seen.
pub fn collect_instances(iter: InstanceIter<'_>) -> Result<Vec<EntityInstance>> {
    let mut instances: Vec<EntityInstance> = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for item in iter {
        match item {
            Ok(instance) => {
                if seen.insert(instance.moniker().clone()) {
                    instances.push(instance);
                } else {
                    debug!("Dropping duplicate instance {}", instance.moniker());
                }
            }
            Err(e @ SurvolError::ResourceVanished { .. }) => warn!("Skipping instance: {}", e),
            Err(e) => return Err(e),
        }
    }

    Ok(instances)
}

/// Run `enumerate` and collect in one step.
pub fn enumerate_all(enumerator: &dyn Enumerator, ctx: &EnumerationContext) -> Result<Vec<EntityInstance>> {
    let instances = collect_instances(enumerator.enumerate(ctx)?)?;
    debug!("Enumerated {} {} instances", instances.len(), enumerator.class().name);
    Ok(instances)
}
