//! `CIM_ComputerSystem`: the local host

use crate::context::EnumerationContext;
use crate::enumerator::{Enumerator, InstanceIter};
use chrono::DateTime;
use survol_core::{EntityClass, EntityInstance, PropertyValue, Result, CIM_COMPUTER_SYSTEM};
use sysinfo::System;

pub struct ComputerSystemEnumerator;

/// Host name the agent reports for itself.
pub fn local_host_name() -> String {
    System::host_name().unwrap_or_else(|| "localhost".to_string())
}

impl Enumerator for ComputerSystemEnumerator {
    fn class(&self) -> &'static EntityClass {
        &CIM_COMPUTER_SYSTEM
    }

    fn enumerate(&self, _ctx: &EnumerationContext) -> Result<InstanceIter<'_>> {
        Ok(Box::new(std::iter::once_with(|| {
            let mut system = System::new();
            system.refresh_memory();
            system.refresh_cpu();

            let mut instance = EntityInstance::new(&CIM_COMPUTER_SYSTEM, vec![PropertyValue::from(local_host_name())])?;
            instance.set_opt("OSName", System::name());
            instance.set_opt("OSVersion", System::os_version());
            instance.set_opt("KernelVersion", System::kernel_version());
            instance.set_opt("Architecture", System::cpu_arch());
            instance.set("TotalPhysicalMemory", system.total_memory());
            instance.set("NumberOfLogicalProcessors", system.cpus().len() as u64);
            instance.set_opt("BootTime", DateTime::from_timestamp(System::boot_time() as i64, 0));
            Ok(instance)
        })))
    }
}
