use std::collections::HashMap;

use serde::Serialize;
use tracing::info;

use super::tree::GroupId;
use super::tree::ResolvedMember;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExpansionRecord {
    pub expanded: bool,

    /// Set on the first expansion, never cleared until the tree is rebuilt.
    pub loaded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expansion {
    /// Members were resolved and materialised just now.
    Loaded,
    /// Rows from an earlier expansion were reused.
    Reused,
}

/// Lazily materialised member rows per expandable group.
#[derive(Debug, Clone, Default)]
pub struct ExpansionCache {
    records: HashMap<GroupId, ExpansionRecord>,
    members: HashMap<GroupId, Vec<ResolvedMember>>,

    /// Number of member resolutions performed by first-time loads.
    resolutions: usize,
}

impl ExpansionCache {
    pub fn record(&self, group: GroupId) -> ExpansionRecord {
        self.records.get(&group).copied().unwrap_or_default()
    }

    pub fn is_expanded(&self, group: GroupId) -> bool {
        self.record(group).expanded
    }

    /// Open a group. `resolve` runs only on the group's first expansion.
    pub fn expand<F>(&mut self, group: GroupId, resolve: F) -> Expansion
    where
        F: FnOnce() -> Vec<ResolvedMember>,
    {
        let record = self.records.entry(group).or_default();
        record.expanded = true;

        if record.loaded {
            return Expansion::Reused;
        }

        record.loaded = true;
        let members = resolve();
        self.resolutions += 1;
        info!(group = group.0, members = members.len(), "loaded group members");
        self.members.insert(group, members);
        Expansion::Loaded
    }

    /// Returns whether the group was expanded.
    pub fn collapse(&mut self, group: GroupId) -> bool {
        match self.records.get_mut(&group) {
            Some(record) if record.expanded => {
                record.expanded = false;
                true
            }
            _ => false,
        }
    }

    /// Flip the expanded flag. Returns the new state.
    pub fn toggle<F>(&mut self, group: GroupId, resolve: F) -> bool
    where
        F: FnOnce() -> Vec<ResolvedMember>,
    {
        if self.collapse(group) {
            false
        } else {
            self.expand(group, resolve);
            true
        }
    }

    /// Materialised rows, empty for groups never expanded.
    pub fn members(&self, group: GroupId) -> &[ResolvedMember] {
        self.members.get(&group).map(Vec::as_slice).unwrap_or_default()
    }

    /// Swap in a new member list when the resolved entity set changed.
    /// Returns false, and keeps the existing rows, when the ids are the same.
    pub fn replace_members(&mut self, group: GroupId, members: Vec<ResolvedMember>) -> bool {
        let current = self.members(group);
        let same = current.len() == members.len()
            && current
                .iter()
                .zip(&members)
                .all(|(a, b)| a.entity_id == b.entity_id);
        if same {
            return false;
        }
        self.members.insert(group, members);
        true
    }

    pub fn resolutions(&self) -> usize {
        self.resolutions
    }
}
