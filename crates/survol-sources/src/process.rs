//! `CIM_Process`: running processes

use crate::context::EnumerationContext;
use crate::enumerator::{Enumerator, InstanceIter};
use chrono::DateTime;
use survol_core::{
    process_moniker, user_moniker, EntityClass, EntityInstance, Moniker, PropertyValue, Result, SurvolError,
    CIM_PROCESS,
};
use sysinfo::{Pid, Process, ProcessRefreshKind, System, ThreadKind, UpdateKind, Users};
use tracing::debug;

pub struct ProcessEnumerator;

fn refresh_kind() -> ProcessRefreshKind {
    ProcessRefreshKind::new()
        .with_memory()
        .with_exe(UpdateKind::OnlyIfNotSet)
        .with_cmd(UpdateKind::OnlyIfNotSet)
        .with_user(UpdateKind::OnlyIfNotSet)
}

fn vanished(pid: Pid) -> SurvolError {
    SurvolError::ResourceVanished {
        class: CIM_PROCESS.name.to_string(),
        identifier: format!("Handle={}", pid),
    }
}

/// Owner name of a process, resolved against a users snapshot.
fn owner_name<'u>(process: &Process, users: &'u Users) -> Option<&'u str> {
    process
        .user_id()
        .and_then(|uid| users.get_user_by_id(uid))
        .map(|user| user.name())
}

fn process_instance(pid: Pid, process: &Process, users: &Users) -> Result<EntityInstance> {
    let mut instance = EntityInstance::new(&CIM_PROCESS, vec![PropertyValue::Integer(pid.as_u32() as i64)])?;

    instance.set("Name", process.name());

    match process.parent() {
        Some(ppid) => {
            instance.set("ParentProcessId", PropertyValue::Integer(ppid.as_u32() as i64));
            instance.set("parent", process_moniker(ppid.as_u32()));
        }
        None => {
            instance.omit("ParentProcessId");
        }
    }

    instance.set_opt("ExecutablePath", process.exe().map(|p| p.display().to_string()));

    // Kernel threads have no command line.
    let cmd = process.cmd();
    instance.set_opt("CommandLine", (!cmd.is_empty()).then(|| cmd.join(" ")));

    instance.set("Status", process.status().to_string());
    instance.set_opt(
        "CreationDate",
        DateTime::from_timestamp(process.start_time() as i64, 0),
    );
    instance.set("WorkingSetSize", process.memory());
    instance.set("VirtualSize", process.virtual_memory());
    instance.set_opt("user", owner_name(process, users).map(user_moniker));

    Ok(instance)
}

/// Whether `pid` is a thread id rather than a process id. Linux resolves
/// `/proc/<tid>` for every thread, so a direct read does not tell them apart.
#[cfg(target_os = "linux")]
fn is_thread_id(pid: Pid) -> bool {
    std::fs::read_to_string(format!("/proc/{}/status", pid))
        .ok()
        .and_then(|status| {
            status
                .lines()
                .find_map(|line| line.strip_prefix("Tgid:").and_then(|v| v.trim().parse::<u32>().ok()))
        })
        .is_some_and(|tgid| tgid != pid.as_u32())
}

#[cfg(not(target_os = "linux"))]
fn is_thread_id(_pid: Pid) -> bool {
    false
}

fn is_userland_thread(process: &Process) -> bool {
    matches!(process.thread_kind(), Some(ThreadKind::Userland))
}

fn wanted(process: &Process, ctx: &EnumerationContext, users: &Users) -> bool {
    if let Some(parent) = ctx.param("parent").and_then(|p| p.as_integer()) {
        if process.parent().map(|p| p.as_u32() as i64) != Some(parent) {
            return false;
        }
    }
    if let Some(user) = ctx.param("user").and_then(|p| p.as_str()) {
        if owner_name(process, users) != Some(user) {
            return false;
        }
    }
    // Userland threads show up as tasks on Linux; they are not processes.
    !is_userland_thread(process)
}

impl Enumerator for ProcessEnumerator {
    fn class(&self) -> &'static EntityClass {
        &CIM_PROCESS
    }

    /// Discovers pids from one snapshot, then re-reads each process as the
    /// iterator advances; a process that exited in between is reported as vanished.
    fn enumerate(&self, ctx: &EnumerationContext) -> Result<InstanceIter<'_>> {
        let mut system = System::new();
        system.refresh_processes_specifics(refresh_kind());
        let users = Users::new_with_refreshed_list();

        let mut pids: Vec<Pid> = system
            .processes()
            .iter()
            .filter(|(_, process)| wanted(process, ctx, &users))
            .map(|(pid, _)| *pid)
            .collect();
        pids.sort();
        debug!("Discovered {} processes", pids.len());

        Ok(Box::new(pids.into_iter().map(move |pid| {
            if !system.refresh_process_specifics(pid, refresh_kind()) {
                return Err(vanished(pid));
            }
            let process = system.process(pid).ok_or_else(|| vanished(pid))?;
            process_instance(pid, process, &users)
        })))
    }

    fn lookup(&self, _ctx: &EnumerationContext, moniker: &Moniker) -> Result<Option<EntityInstance>> {
        let pid = match moniker.get("Handle").and_then(|h| h.parse::<u32>().ok()) {
            Some(pid) => Pid::from_u32(pid),
            None => return Ok(None),
        };
        if is_thread_id(pid) {
            debug!("{} is a thread, not a process", pid);
            return Ok(None);
        }

        let mut system = System::new();
        if !system.refresh_process_specifics(pid, refresh_kind()) {
            return Ok(None);
        }
        let users = Users::new_with_refreshed_list();
        match system.process(pid) {
            Some(process) if !is_userland_thread(process) => process_instance(pid, process, &users).map(Some),
            _ => Ok(None),
        }
    }
}
