//! `CIM_LogicalDisk`: mounted volumes

use crate::context::EnumerationContext;
use crate::enumerator::{Enumerator, InstanceIter};
use std::collections::BTreeMap;
use survol_core::{EntityClass, EntityInstance, PropertyValue, Result, CIM_LOGICAL_DISK};
use sysinfo::Disks;

pub struct DiskEnumerator;

/// Plain copy of what sysinfo reports for one mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskRecord {
    pub device: String,
    pub mount_point: String,
    pub file_system: String,
    pub kind: String,
    pub total_space: u64,
    pub available_space: u64,
    pub removable: bool,
}

impl DiskRecord {
    fn from_disk(disk: &sysinfo::Disk) -> Self {
        Self {
            device: disk.name().to_string_lossy().into_owned(),
            mount_point: disk.mount_point().display().to_string(),
            file_system: disk.file_system().to_string_lossy().into_owned(),
            kind: disk.kind().to_string(),
            total_space: disk.total_space(),
            available_space: disk.available_space(),
            removable: disk.is_removable(),
        }
    }
}

/// One record per device. A device mounted several times keeps the
/// mount point that sorts first.
pub fn dedupe_by_device(records: Vec<DiskRecord>) -> Vec<DiskRecord> {
    let mut by_device: BTreeMap<String, DiskRecord> = BTreeMap::new();
    for record in records {
        match by_device.get(&record.device) {
            Some(existing) if existing.mount_point <= record.mount_point => {}
            _ => {
                by_device.insert(record.device.clone(), record);
            }
        }
    }
    by_device.into_values().collect()
}

pub fn disk_instance(record: &DiskRecord) -> Result<EntityInstance> {
    let mut instance = EntityInstance::new(&CIM_LOGICAL_DISK, vec![PropertyValue::from(record.device.as_str())])?;
    instance.set("Name", record.mount_point.as_str());
    // Pseudo file systems often report no type at all.
    instance.set_opt(
        "file_system",
        (!record.file_system.is_empty()).then(|| record.file_system.clone()),
    );
    instance.set("DriveType", record.kind.as_str());
    instance.set("Size", record.total_space);
    instance.set("FreeSpace", record.available_space);
    instance.set("Removable", record.removable);
    Ok(instance)
}

impl Enumerator for DiskEnumerator {
    fn class(&self) -> &'static EntityClass {
        &CIM_LOGICAL_DISK
    }

    fn enumerate(&self, _ctx: &EnumerationContext) -> Result<InstanceIter<'_>> {
        let disks = Disks::new_with_refreshed_list();
        let records = dedupe_by_device(disks.list().iter().map(DiskRecord::from_disk).collect());
        Ok(Box::new(records.into_iter().map(|record| disk_instance(&record))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(device: &str, mount: &str, fs: &str) -> DiskRecord {
        DiskRecord {
            device: device.to_string(),
            mount_point: mount.to_string(),
            file_system: fs.to_string(),
            kind: "SSD".to_string(),
            total_space: 1 << 30,
            available_space: 1 << 20,
            removable: false,
        }
    }

    #[test]
    fn test_missing_file_system_is_omitted() {
        let instance = disk_instance(&record("overlay", "/", "")).unwrap();
        assert!(instance.get("file_system").is_none());
        assert_eq!(instance.get("Name"), Some(&PropertyValue::from("/")));

        let instance = disk_instance(&record("/dev/sda1", "/", "ext4")).unwrap();
        assert_eq!(instance.get("file_system"), Some(&PropertyValue::from("ext4")));
    }

    #[test]
    fn test_device_mounted_twice_is_listed_once() {
        let records = dedupe_by_device(vec![
            record("/dev/sda1", "/var/lib/docker", "ext4"),
            record("/dev/sdb1", "/data", "xfs"),
            record("/dev/sda1", "/", "ext4"),
        ]);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].mount_point, "/");
    }

    #[test]
    fn test_live_disks_have_unique_ids() {
        let found = crate::enumerator::enumerate_all(&DiskEnumerator, &EnumerationContext::default()).unwrap();
        let mut ids: Vec<_> = found.iter().map(|i| i.moniker().clone()).collect();
        ids.dedup();
        assert_eq!(ids.len(), found.len());
    }
}
