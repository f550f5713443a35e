use std::collections::HashSet;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use super::state::StateSnapshot;
use crate::config::CardConfig;
use crate::config::GroupSpec;

pub const DEFAULT_LIGHT_ICON: &str = "mdi:lightbulb";

/// Position of a group in the configuration, stable for the tree's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub usize);

/// Identity of one interactive control.
///
/// Controls bound to an entity are keyed by entity id, so the same light
/// shown under two groups shares one visual and one drag session. A group
/// header without its own entity is keyed by its position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ControlKey {
    Entity(String),
    Group(GroupId),
}

/// A member light of a group after merging auto-discovered and manual ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedMember {
    pub entity_id: String,

    /// Explicit link back to the owning group.
    pub parent: GroupId,

    /// Manual overrides, only set when the manual entry won deduplication.
    pub name: Option<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GroupKind {
    /// Zero or one resolvable member: no chevron.
    Singleton,
    Expandable,
}

#[derive(Debug, Clone)]
pub struct GroupNode {
    pub id: GroupId,
    pub spec: GroupSpec,
}

/// Static shape of the card, built once per configuration.
#[derive(Debug, Clone, Default)]
pub struct EntityTree {
    groups: Vec<GroupNode>,
}

impl ControlKey {
    pub fn entity_id(&self) -> Option<&str> {
        match self {
            ControlKey::Entity(id) => Some(id),
            ControlKey::Group(_) => None,
        }
    }
}

impl fmt::Display for ControlKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlKey::Entity(id) => f.write_str(id),
            ControlKey::Group(GroupId(n)) => write!(f, "group#{}", n),
        }
    }
}

impl ResolvedMember {
    pub fn key(&self) -> ControlKey {
        ControlKey::Entity(self.entity_id.clone())
    }

    /// Override, then `friendly_name`, then the object id after the domain.
    pub fn display_name(&self, snapshot: &StateSnapshot) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        snapshot
            .get(&self.entity_id)
            .and_then(|s| s.attributes.friendly_name.clone())
            .unwrap_or_else(|| object_id(&self.entity_id).to_string())
    }

    pub fn display_icon(&self, snapshot: &StateSnapshot) -> String {
        if let Some(icon) = &self.icon {
            return icon.clone();
        }
        snapshot
            .get(&self.entity_id)
            .and_then(|s| s.attributes.icon.clone())
            .unwrap_or_else(|| DEFAULT_LIGHT_ICON.to_string())
    }
}

/// `light.kitchen_pendant` -> `kitchen_pendant`
fn object_id(entity_id: &str) -> &str {
    entity_id
        .rsplit_once('.')
        .map(|(_, object)| object)
        .unwrap_or(entity_id)
}

impl GroupKind {
    pub fn classify(member_count: usize) -> Self {
        if member_count >= 2 {
            GroupKind::Expandable
        } else {
            GroupKind::Singleton
        }
    }

    pub fn shows_chevron(self) -> bool {
        self == GroupKind::Expandable
    }
}

impl GroupNode {
    pub fn entity_id(&self) -> Option<&str> {
        self.spec.entity.as_deref()
    }

    /// Key of the group's header control.
    pub fn key(&self) -> ControlKey {
        match &self.spec.entity {
            Some(id) => ControlKey::Entity(id.clone()),
            None => ControlKey::Group(self.id),
        }
    }

    /// Merge the group entity's reported members with the manual lights.
    ///
    /// Auto-discovered ids come first, manual lights are appended. Only ids
    /// present in `snapshot` survive, the group's own id is never its own
    /// member, and the first occurrence of a duplicate id wins.
    pub fn resolve_members(&self, snapshot: &StateSnapshot) -> Vec<ResolvedMember> {
        let auto = self
            .entity_id()
            .and_then(|id| snapshot.get(id))
            .map(|state| state.members())
            .unwrap_or_default()
            .iter()
            .map(|id| ResolvedMember {
                entity_id: id.clone(),
                parent: self.id,
                name: None,
                icon: None,
            });

        let manual = self.spec.lights.iter().map(|light| ResolvedMember {
            entity_id: light.entity.clone(),
            parent: self.id,
            name: light.name.clone(),
            icon: light.icon.clone(),
        });

        let mut seen = HashSet::new();
        auto.chain(manual)
            .filter(|m| snapshot.contains(&m.entity_id))
            .filter(|m| Some(m.entity_id.as_str()) != self.entity_id())
            .filter(|m| seen.insert(m.entity_id.clone()))
            .collect()
    }
}

impl EntityTree {
    pub fn build(config: &CardConfig) -> Self {
        let groups = config
            .groups
            .iter()
            .enumerate()
            .map(|(i, spec)| GroupNode {
                id: GroupId(i),
                spec: spec.clone(),
            })
            .collect();
        Self { groups }
    }

    pub fn groups(&self) -> &[GroupNode] {
        &self.groups
    }

    pub fn group(&self, id: GroupId) -> Option<&GroupNode> {
        self.groups.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ManualLight;
    use crate::engine::state::EntityState;

    fn node(spec: GroupSpec) -> GroupNode {
        GroupNode { id: GroupId(0), spec }
    }

    fn ids(members: &[ResolvedMember]) -> Vec<&str> {
        members.iter().map(|m| m.entity_id.as_str()).collect()
    }

    #[test]
    fn test_auto_members_then_manual() {
        let snapshot = StateSnapshot::new()
            .with(
                "light.kitchen",
                EntityState::new("on").with_members(["light.a", "light.b"]),
            )
            .with("light.a", EntityState::new("on"))
            .with("light.b", EntityState::new("off"))
            .with("light.c", EntityState::new("off"));

        let group = node(
            GroupSpec::new("Kitchen")
                .entity("light.kitchen")
                .light(ManualLight::new("light.c")),
        );
        assert_eq!(ids(&group.resolve_members(&snapshot)), ["light.a", "light.b", "light.c"]);
    }

    #[test]
    fn test_duplicates_keep_first_occurrence() {
        let snapshot = StateSnapshot::new()
            .with("light.g", EntityState::new("on").with_members(["light.a"]))
            .with("light.a", EntityState::new("on"));

        let group = node(
            GroupSpec::new("G")
                .entity("light.g")
                .light(ManualLight::new("light.a").named("Override")),
        );
        let members = group.resolve_members(&snapshot);
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].name, None);
    }

    #[test]
    fn test_manual_only_duplicates() {
        let snapshot = StateSnapshot::new().with("light.a", EntityState::new("on"));
        let group = node(
            GroupSpec::new("G")
                .light(ManualLight::new("light.a").named("First"))
                .light(ManualLight::new("light.a").named("Second")),
        );
        let members = group.resolve_members(&snapshot);
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].name.as_deref(), Some("First"));
    }

    #[test]
    fn test_unknown_ids_and_self_are_dropped() {
        let snapshot = StateSnapshot::new()
            .with(
                "light.g",
                EntityState::new("on").with_members(["light.g", "light.ghost", "light.a"]),
            )
            .with("light.a", EntityState::new("on"));

        let group = node(
            GroupSpec::new("G")
                .entity("light.g")
                .light(ManualLight::new("light.missing")),
        );
        assert_eq!(ids(&group.resolve_members(&snapshot)), ["light.a"]);
    }

    #[test]
    fn test_absent_group_entity_has_only_manual_members() {
        let snapshot = StateSnapshot::new().with("light.a", EntityState::new("off"));
        let group = node(
            GroupSpec::new("G")
                .entity("light.not_yet_known")
                .light(ManualLight::new("light.a")),
        );
        let members = group.resolve_members(&snapshot);
        assert_eq!(ids(&members), ["light.a"]);
        assert_eq!(GroupKind::classify(members.len()), GroupKind::Singleton);
    }

    #[test]
    fn test_classify() {
        assert_eq!(GroupKind::classify(0), GroupKind::Singleton);
        assert_eq!(GroupKind::classify(1), GroupKind::Singleton);
        assert_eq!(GroupKind::classify(2), GroupKind::Expandable);
        assert!(GroupKind::Expandable.shows_chevron());
        assert!(!GroupKind::Singleton.shows_chevron());
    }

    #[test]
    fn test_display_fallbacks() {
        let snapshot = StateSnapshot::new()
            .with(
                "light.desk",
                EntityState::new("on").with_friendly_name("Desk Lamp"),
            )
            .with("light.shelf_strip", EntityState::new("on"));

        let member = |id: &str| ResolvedMember {
            entity_id: id.to_string(),
            parent: GroupId(0),
            name: None,
            icon: None,
        };

        assert_eq!(member("light.desk").display_name(&snapshot), "Desk Lamp");
        assert_eq!(member("light.shelf_strip").display_name(&snapshot), "shelf_strip");
        assert_eq!(member("light.desk").display_icon(&snapshot), DEFAULT_LIGHT_ICON);

        let overridden = ResolvedMember {
            name: Some("Reading".to_string()),
            icon: Some("mdi:lamp".to_string()),
            ..member("light.desk")
        };
        assert_eq!(overridden.display_name(&snapshot), "Reading");
        assert_eq!(overridden.display_icon(&snapshot), "mdi:lamp");
    }

    #[test]
    fn test_group_keys() {
        let tree = EntityTree::build(&CardConfig::with_groups(vec![
            GroupSpec::new("A").entity("light.a"),
            GroupSpec::new("B").light(ManualLight::new("light.b")),
        ]));
        assert_eq!(tree.len(), 2);
        assert_eq!(
            tree.group(GroupId(0)).unwrap().key(),
            ControlKey::Entity("light.a".to_string())
        );
        assert_eq!(tree.group(GroupId(1)).unwrap().key(), ControlKey::Group(GroupId(1)));
        assert_eq!(ControlKey::Group(GroupId(1)).to_string(), "group#1");
        assert!(tree.group(GroupId(2)).is_none());
    }
}
