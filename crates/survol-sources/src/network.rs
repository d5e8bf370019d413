//! `CIM_NetworkAdapter`: network interfaces

use crate::context::EnumerationContext;
use crate::enumerator::{Enumerator, InstanceIter};
use survol_core::{EntityClass, EntityInstance, PropertyValue, Result, CIM_NETWORK_ADAPTER};
use sysinfo::Networks;

pub struct NetworkAdapterEnumerator;

impl Enumerator for NetworkAdapterEnumerator {
    fn class(&self) -> &'static EntityClass {
        &CIM_NETWORK_ADAPTER
    }

    fn enumerate(&self, _ctx: &EnumerationContext) -> Result<InstanceIter<'_>> {
        let networks = Networks::new_with_refreshed_list();
        let mut adapters: Vec<EntityInstance> = Vec::new();

        for (name, data) in &networks {
            let mut instance = EntityInstance::new(&CIM_NETWORK_ADAPTER, vec![PropertyValue::from(name.as_str())])?;
            let mac = data.mac_address();
            // Loopback and tunnel devices have no hardware address.
            instance.set_opt("MACAddress", (!mac.is_unspecified()).then(|| mac.to_string()));
            instance.set("BytesReceived", data.total_received());
            instance.set("BytesSent", data.total_transmitted());
            instance.set("PacketsReceived", data.total_packets_received());
            instance.set("PacketsSent", data.total_packets_transmitted());
            adapters.push(instance);
        }

        adapters.sort_by(|a, b| a.moniker().cmp(b.moniker()));
        Ok(Box::new(adapters.into_iter().map(Ok)))
    }
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;
    use crate::enumerator::enumerate_all;

    #[test]
    fn test_adapters_are_sorted_and_counted() {
        let adapters = enumerate_all(&NetworkAdapterEnumerator, &EnumerationContext::default()).unwrap();
        let monikers: Vec<_> = adapters.iter().map(|a| a.moniker().clone()).collect();
        let mut sorted = monikers.clone();
        sorted.sort();
        assert_eq!(monikers, sorted);
        for adapter in &adapters {
            assert!(matches!(adapter.get("BytesReceived"), Some(PropertyValue::Unsigned(_))));
        }
    }
}
