//! `user` and `group`: local accounts

use crate::context::EnumerationContext;
use crate::enumerator::{Enumerator, InstanceIter};
use std::collections::BTreeMap;
use survol_core::{group_moniker, EntityClass, EntityInstance, PropertyValue, Result, GROUP, USER};
use sysinfo::{Groups, Users};

pub struct UserEnumerator;
pub struct GroupEnumerator;

#[cfg(unix)]
fn numeric_uid(user: &sysinfo::User) -> Option<u32> {
    Some(**user.id())
}

// Windows identifies accounts by SID, which has no numeric form.
#[cfg(not(unix))]
fn numeric_uid(_user: &sysinfo::User) -> Option<u32> {
    None
}

#[cfg(unix)]
fn numeric_gid(gid: sysinfo::Gid) -> Option<u32> {
    Some(*gid)
}

#[cfg(not(unix))]
fn numeric_gid(_gid: sysinfo::Gid) -> Option<u32> {
    None
}

impl Enumerator for UserEnumerator {
    fn class(&self) -> &'static EntityClass {
        &USER
    }

    fn enumerate(&self, _ctx: &EnumerationContext) -> Result<InstanceIter<'_>> {
        let users = Users::new_with_refreshed_list();
        let groups = Groups::new_with_refreshed_list();
        let group_names: BTreeMap<sysinfo::Gid, String> = groups
            .list()
            .iter()
            .map(|g| (*g.id(), g.name().to_string()))
            .collect();

        let mut records: Vec<(String, Option<u32>, Option<u32>, Option<String>)> = users
            .list()
            .iter()
            .map(|user| {
                let gid = user.group_id();
                (
                    user.name().to_string(),
                    numeric_uid(user),
                    numeric_gid(gid),
                    group_names.get(&gid).cloned(),
                )
            })
            .collect();
        records.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(Box::new(records.into_iter().map(|(name, uid, gid, group)| {
            let mut instance = EntityInstance::new(&USER, vec![PropertyValue::from(name)])?;
            instance.set_opt("UserId", uid);
            instance.set_opt("GroupId", gid);
            instance.set_opt("group", group.as_deref().map(group_moniker));
            Ok(instance)
        })))
    }
}

impl Enumerator for GroupEnumerator {
    fn class(&self) -> &'static EntityClass {
        &GROUP
    }

    fn enumerate(&self, _ctx: &EnumerationContext) -> Result<InstanceIter<'_>> {
        let groups = Groups::new_with_refreshed_list();
        let mut records: Vec<(String, Option<u32>)> = groups
            .list()
            .iter()
            .map(|g| (g.name().to_string(), numeric_gid(*g.id())))
            .collect();
        records.sort();

        Ok(Box::new(records.into_iter().map(|(name, gid)| {
            let mut instance = EntityInstance::new(&GROUP, vec![PropertyValue::from(name)])?;
            instance.set_opt("GroupId", gid);
            Ok(instance)
        })))
    }
}
