//! Built-in entity classes

use crate::model::{EntityClass, ParamKind, ParameterDef, PropertyDef, ValueKind};
use crate::moniker::Moniker;

const fn prop(name: &'static str, kind: ValueKind, description: &'static str) -> PropertyDef {
    PropertyDef { name, kind, description }
}

pub static CIM_PROCESS: EntityClass = EntityClass {
    name: "CIM_Process",
    description: "Running process",
    keys: &["Handle"],
    properties: &[
        prop("Handle", ValueKind::Integer, "Process id"),
        prop("Name", ValueKind::String, "Executable name"),
        prop("ParentProcessId", ValueKind::Integer, "Process id of the parent"),
        prop("parent", ValueKind::Reference("CIM_Process"), "Parent process"),
        prop("ExecutablePath", ValueKind::String, "Path of the executable image"),
        prop("CommandLine", ValueKind::String, "Command line, arguments joined by spaces"),
        prop("Status", ValueKind::String, "Scheduler state"),
        prop("CreationDate", ValueKind::Timestamp, "Start time"),
        prop("WorkingSetSize", ValueKind::Unsigned, "Resident memory in bytes"),
        prop("VirtualSize", ValueKind::Unsigned, "Virtual memory in bytes"),
        prop("user", ValueKind::Reference("user"), "Owning user"),
    ],
    parameters: &[
        ParameterDef {
            name: "parent",
            kind: ParamKind::Integer,
            description: "Only list children of this process id",
        },
        ParameterDef {
            name: "user",
            kind: ParamKind::String,
            description: "Only list processes owned by this user name",
        },
    ],
};

pub static CIM_LOGICAL_DISK: EntityClass = EntityClass {
    name: "CIM_LogicalDisk",
    description: "Mounted storage volume",
    keys: &["DeviceID"],
    properties: &[
        prop("DeviceID", ValueKind::String, "Device name"),
        prop("Name", ValueKind::String, "Mount point"),
        prop("file_system", ValueKind::String, "File system type"),
        prop("DriveType", ValueKind::String, "Storage kind"),
        prop("Size", ValueKind::Unsigned, "Capacity in bytes"),
        prop("FreeSpace", ValueKind::Unsigned, "Available bytes"),
        prop("Removable", ValueKind::Boolean, "Removable media"),
    ],
    parameters: &[],
};

pub static USER: EntityClass = EntityClass {
    name: "user",
    description: "Operating-system user account",
    keys: &["Name"],
    properties: &[
        prop("Name", ValueKind::String, "Login name"),
        prop("UserId", ValueKind::Unsigned, "Numeric user id"),
        prop("GroupId", ValueKind::Unsigned, "Primary group id"),
        prop("group", ValueKind::Reference("group"), "Primary group"),
    ],
    parameters: &[],
};

pub static GROUP: EntityClass = EntityClass {
    name: "group",
    description: "Operating-system user group",
    keys: &["Name"],
    properties: &[
        prop("Name", ValueKind::String, "Group name"),
        prop("GroupId", ValueKind::Unsigned, "Numeric group id"),
    ],
    parameters: &[],
};

pub static PYTHON_PACKAGE: EntityClass = EntityClass {
    name: "python_package",
    description: "Package installed for the configured Python interpreter",
    keys: &["Id"],
    properties: &[
        prop("Id", ValueKind::String, "Lower-case distribution name"),
        prop("Name", ValueKind::String, "Distribution name as published"),
        prop("Version", ValueKind::String, "Installed version"),
        prop("Summary", ValueKind::String, "One-line description"),
        prop("Location", ValueKind::String, "Directory holding the metadata"),
    ],
    parameters: &[],
};

pub static CIM_NETWORK_ADAPTER: EntityClass = EntityClass {
    name: "CIM_NetworkAdapter",
    description: "Network interface",
    keys: &["DeviceID"],
    properties: &[
        prop("DeviceID", ValueKind::String, "Interface name"),
        prop("MACAddress", ValueKind::String, "Hardware address"),
        prop("BytesReceived", ValueKind::Unsigned, "Bytes received since boot"),
        prop("BytesSent", ValueKind::Unsigned, "Bytes sent since boot"),
        prop("PacketsReceived", ValueKind::Unsigned, "Packets received since boot"),
        prop("PacketsSent", ValueKind::Unsigned, "Packets sent since boot"),
    ],
    parameters: &[],
};

pub static CIM_COMPUTER_SYSTEM: EntityClass = EntityClass {
    name: "CIM_ComputerSystem",
    description: "The machine the agent runs on",
    keys: &["Name"],
    properties: &[
        prop("Name", ValueKind::String, "Host name"),
        prop("OSName", ValueKind::String, "Operating system name"),
        prop("OSVersion", ValueKind::String, "Operating system version"),
        prop("KernelVersion", ValueKind::String, "Kernel version"),
        prop("Architecture", ValueKind::String, "CPU architecture"),
        prop("TotalPhysicalMemory", ValueKind::Unsigned, "Installed memory in bytes"),
        prop("NumberOfLogicalProcessors", ValueKind::Unsigned, "Logical CPU count"),
        prop("BootTime", ValueKind::Timestamp, "Last boot"),
    ],
    parameters: &[],
};

/// Every built-in class, in landing-page order.
pub static BUILTIN_CLASSES: &[&EntityClass] = &[
    &CIM_COMPUTER_SYSTEM,
    &CIM_LOGICAL_DISK,
    &CIM_NETWORK_ADAPTER,
    &CIM_PROCESS,
    &GROUP,
    &PYTHON_PACKAGE,
    &USER,
];

/// Moniker of the process `pid`. Shared with tools that report on processes
/// so their triples land on the same subjects as the agent's.
pub fn process_moniker(pid: u32) -> Moniker {
    Moniker::new(CIM_PROCESS.name, [("Handle".to_string(), pid.to_string())])
}

pub fn user_moniker(name: &str) -> Moniker {
    Moniker::new(USER.name, [("Name".to_string(), name.to_string())])
}

pub fn group_moniker(name: &str) -> Moniker {
    Moniker::new(GROUP.name, [("Name".to_string(), name.to_string())])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntityInstance, PropertyValue};

    #[test]
    fn test_schemas_list_keys_first() {
        for class in BUILTIN_CLASSES {
            let schema = class.schema();
            assert_eq!(&schema[..class.keys.len()], class.keys, "{}", class.name);
        }
    }

    #[test]
    fn test_reference_targets_exist() {
        for class in BUILTIN_CLASSES {
            for def in class.properties {
                if let ValueKind::Reference(target) = def.kind {
                    assert!(BUILTIN_CLASSES.iter().any(|c| c.name == target));
                }
            }
        }
    }

    #[test]
    fn test_process_moniker_matches_instance() {
        let instance = EntityInstance::new(&CIM_PROCESS, vec![PropertyValue::Integer(1234)]).unwrap();
        assert_eq!(instance.moniker(), &process_moniker(1234));
    }
}
