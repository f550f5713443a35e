use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::context::CardContext;
use super::gesture::Commit;
use super::gesture::GestureEffect;
use super::gesture::TrackBounds;
use super::message::Notification;
use super::message::ServiceCall;
use super::message::Target;
use super::reconcile::aggregate;
use super::reconcile::format_lux;
use super::reconcile::reconcile;
use super::reconcile::ControlVisual;
use super::reconcile::Palette;
use super::reconcile::Reconciled;
use super::reconcile::LUX_PLACEHOLDER;
use super::service::ControlService;
use super::state::LightEntity;
use super::state::StateSnapshot;
use super::tree::ControlKey;
use super::tree::EntityTree;
use super::tree::GroupId;
use super::tree::GroupKind;
use super::tree::GroupNode;
use super::tree::ResolvedMember;
use crate::config::CardConfig;

/// One visual write for the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "paint", rename_all = "snake_case")]
pub enum Paint {
    Repaint { key: ControlKey, visual: ControlVisual },
    Preview { key: ControlKey, percent: u8 },
    Lux { group: GroupId, text: String },
    Chevron { group: GroupId, visible: bool },
    Expansion { group: GroupId, expanded: bool },
    /// The member rows of an expanded group were (re)materialised.
    Members { group: GroupId, members: Vec<String> },
}

/// Visual writes produced by a single event, in order.
pub type Frame = Vec<Paint>;

/// Address of a rendered row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "row", rename_all = "snake_case")]
pub enum RowRef {
    Group { group: GroupId },
    Member { group: GroupId, entity_id: String },
}

/// Hot-zone of a row hit by a discrete click.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Zone {
    /// Anywhere on the row outside the other zones.
    Track,
    Icon,
    Chevron,
    Lux,
}

/// A row as the declarative render pass sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowView {
    pub row: RowRef,
    pub key: ControlKey,
    pub name: String,
    pub icon: String,

    /// Drag preview while dragging, otherwise the painted percent.
    pub percent: u8,
    pub dragging: bool,
    pub visual: ControlVisual,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub lux: Option<String>,
    pub chevron: bool,
    pub expanded: bool,
}

/// The light group card.
///
/// Owns the static tree, all per-control state and the outbound service.
/// Every event is processed to completion and answers with a [`Frame`].
pub struct Card<S> {
    config: CardConfig,
    tree: EntityTree,
    palette: Palette,
    ctx: CardContext,

    /// Last pushed snapshot, replaced wholesale on every push.
    snapshot: Arc<StateSnapshot>,

    service: S,
}

impl RowRef {
    pub fn group(group: GroupId) -> Self {
        RowRef::Group { group }
    }

    pub fn member(group: GroupId, entity_id: impl Into<String>) -> Self {
        RowRef::Member {
            group,
            entity_id: entity_id.into(),
        }
    }

    pub fn group_id(&self) -> GroupId {
        match self {
            RowRef::Group { group } | RowRef::Member { group, .. } => *group,
        }
    }
}

impl<S: ControlService> Card<S> {
    pub fn new(config: CardConfig, service: S) -> Self {
        info!(groups = config.groups.len(), "card configured");
        Self {
            tree: EntityTree::build(&config),
            palette: Palette::from_theme(&config.theme),
            ctx: CardContext::default(),
            snapshot: Arc::default(),
            config,
            service,
        }
    }

    /// Replace the configuration. The tree and all cached state are rebuilt.
    pub fn set_config(&mut self, config: CardConfig) {
        info!(groups = config.groups.len(), "card reconfigured");
        self.tree = EntityTree::build(&config);
        self.palette = Palette::from_theme(&config.theme);
        self.ctx = CardContext::default();
        self.config = config;
    }

    /// Apply an external state push to every visible control.
    pub fn push_state(&mut self, snapshot: StateSnapshot) -> Frame {
        self.snapshot = Arc::new(snapshot);

        let Self {
            tree,
            palette,
            ctx,
            snapshot,
            ..
        } = self;
        let mut frame = Frame::new();
        let mut released = Vec::new();

        for node in tree.groups() {
            reconcile_group(node, snapshot, palette, ctx, &mut frame, &mut released);
        }

        debug!(
            entities = snapshot.len(),
            paints = frame.len(),
            "state push reconciled"
        );

        self.commit_released(released);
        frame
    }

    /// Pointer pressed on a row's track.
    pub fn pointer_down(&mut self, row: &RowRef, x: f64, bounds: TrackBounds) -> Frame {
        let Some(key) = self.key_for(row) else {
            return Frame::new();
        };
        let light = self.light_for(row);
        let effect = self.ctx.drags.begin(
            key.clone(),
            bounds,
            x,
            light.is_some_and(|l| l.on),
            light.and_then(|l| l.color),
        );
        self.apply(row, key, effect)
    }

    pub fn pointer_move(&mut self, row: &RowRef, x: f64) -> Frame {
        let Some(key) = self.key_for(row) else {
            return Frame::new();
        };
        let effect = self.ctx.drags.move_to(&key, x);
        self.apply(row, key, effect)
    }

    pub fn pointer_up(&mut self, row: &RowRef, x: f64) -> Frame {
        let Some(key) = self.key_for(row) else {
            return Frame::new();
        };
        let effect = self.ctx.drags.end(&key, x);
        self.apply(row, key, effect)
    }

    /// Pointer capture lost mid-gesture.
    pub fn pointer_cancel(&mut self, row: &RowRef) -> Frame {
        let Some(key) = self.key_for(row) else {
            return Frame::new();
        };
        let effect = self.ctx.drags.cancel(&key);
        self.apply(row, key, effect)
    }

    /// A discrete click on one of a row's hot-zones.
    pub fn tap(&mut self, row: &RowRef, zone: Zone) -> Frame {
        if self.key_for(row).is_none() {
            return Frame::new();
        }

        match zone {
            Zone::Track => {
                self.toggle(row);
                Frame::new()
            }
            Zone::Icon => {
                match self.details_target(row) {
                    Some(entity_id) => self.notify(Notification::ShowDetails { entity_id }),
                    None => debug!(?row, "row has no entity to show details for"),
                }
                Frame::new()
            }
            Zone::Lux => {
                let sensor = match row {
                    RowRef::Group { group } => self
                        .tree
                        .group(*group)
                        .and_then(|node| node.spec.lux_sensor.clone()),
                    RowRef::Member { .. } => None,
                };
                if let Some(entity_id) = sensor {
                    self.notify(Notification::ShowDetails { entity_id });
                }
                Frame::new()
            }
            Zone::Chevron => self.toggle_expansion(row),
        }
    }

    /// Declarative render pass: every group header, followed by its member
    /// rows when expanded.
    pub fn rows(&self) -> Vec<RowView> {
        let mut rows = Vec::new();

        for node in self.tree.groups() {
            let id = node.id;
            let key = node.key();
            let expanded = self.ctx.expansion.is_expanded(id);
            let lux = node.spec.lux_sensor.as_ref().map(|_| {
                self.ctx
                    .lux
                    .get(&id)
                    .cloned()
                    .unwrap_or_else(|| LUX_PLACEHOLDER.to_string())
            });

            rows.push(RowView {
                row: RowRef::group(id),
                name: node.spec.name.clone(),
                icon: node.spec.icon.clone(),
                percent: self.ctx.displayed_percent(&key).unwrap_or(0),
                dragging: self.ctx.drags.is_active(&key),
                visual: self.current_visual(&key),
                lux,
                chevron: self.ctx.kind(id).shows_chevron(),
                expanded,
                key,
            });

            if !expanded {
                continue;
            }

            for member in self.ctx.expansion.members(id) {
                let key = member.key();
                rows.push(RowView {
                    row: RowRef::member(id, member.entity_id.clone()),
                    name: member.display_name(&self.snapshot),
                    icon: member.display_icon(&self.snapshot),
                    percent: self.ctx.displayed_percent(&key).unwrap_or(0),
                    dragging: self.ctx.drags.is_active(&key),
                    visual: self.current_visual(&key),
                    lux: None,
                    chevron: false,
                    expanded: false,
                    key,
                });
            }
        }

        rows
    }

    /// Height hint for the host layout.
    pub fn card_size(&self) -> usize {
        self.config.card_size()
    }

    pub fn config(&self) -> &CardConfig {
        &self.config
    }

    pub fn tree(&self) -> &EntityTree {
        &self.tree
    }

    pub fn context(&self) -> &CardContext {
        &self.ctx
    }

    pub fn snapshot(&self) -> &StateSnapshot {
        &self.snapshot
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    fn apply(&mut self, row: &RowRef, key: ControlKey, effect: GestureEffect) -> Frame {
        match effect {
            GestureEffect::Preview { percent } => {
                self.ctx.invalidate(&key);
                vec![Paint::Preview { key, percent }]
            }
            GestureEffect::Commit(commit) => {
                let target = self.command_target(row);
                self.commit(&key, target, commit);
                vec![Paint::Preview {
                    key,
                    percent: commit.percent,
                }]
            }
            GestureEffect::Tap => {
                self.toggle(row);
                self.ctx.invalidate(&key);
                self.restore(row, key)
            }
            GestureEffect::Ignored => {
                debug!(control = %key, "gesture event ignored");
                Frame::new()
            }
        }
    }

    /// Send a finished drag and keep its percent on screen until the next
    /// repaint.
    fn commit(&mut self, key: &ControlKey, target: Option<Target>, commit: Commit) {
        self.ctx.invalidate(key);
        self.ctx.pending.insert(key.clone(), commit.percent);
        match target.and_then(|t| commit.to_call(t)) {
            Some(call) => self.send(call),
            None => debug!(control = %key, "nothing to commit"),
        }
    }

    /// Member rows are keyed by their entity, which is also the addressee.
    fn commit_released(&mut self, released: Vec<(ControlKey, Commit)>) {
        for (key, commit) in released {
            let target = key.entity_id().map(|id| Target::Entity(id.to_string()));
            self.commit(&key, target, commit);
        }
    }

    /// Drop any preview left by a tap and show the held state again.
    fn restore(&mut self, row: &RowRef, key: ControlKey) -> Frame {
        let light = self.light_for(row);
        let visual = match reconcile(&mut self.ctx, &key, light, &self.palette) {
            Reconciled::Repainted(visual) => visual,
            _ => self.current_visual(&key),
        };
        vec![Paint::Repaint { key, visual }]
    }

    fn toggle_expansion(&mut self, row: &RowRef) -> Frame {
        let RowRef::Group { group } = row else {
            return Frame::new();
        };
        let group = *group;
        if !self.ctx.kind(group).shows_chevron() {
            debug!(group = group.0, "chevron hidden, ignoring");
            return Frame::new();
        }
        let Some(node) = self.tree.group(group) else {
            return Frame::new();
        };

        let snapshot = Arc::clone(&self.snapshot);
        let hidden = member_keys(&self.ctx, group);
        let expanded = self
            .ctx
            .expansion
            .toggle(group, || node.resolve_members(&snapshot));

        let mut frame = vec![Paint::Expansion { group, expanded }];
        if !expanded {
            let mut released = Vec::new();
            release_drags(&mut self.ctx, hidden, &mut released);
            self.commit_released(released);
            return frame;
        }

        let members: Vec<ResolvedMember> = self.ctx.expansion.members(group).to_vec();
        frame.push(Paint::Members {
            group,
            members: members.iter().map(|m| m.entity_id.clone()).collect(),
        });
        for member in members {
            let key = member.key();
            let light = snapshot.light(&member.entity_id);
            let visual = match reconcile(&mut self.ctx, &key, light, &self.palette) {
                Reconciled::Repainted(visual) => visual,
                _ => self.current_visual(&key),
            };
            frame.push(Paint::Repaint { key, visual });
        }
        frame
    }

    /// Tap-to-toggle. Expandable groups act on all members at once: off when
    /// every member is on, otherwise on.
    fn toggle(&mut self, row: &RowRef) {
        match self.toggle_target(row) {
            Some((target, on)) => self.send(ServiceCall::toggle(target, on)),
            None => debug!(?row, "nothing to toggle"),
        }
    }

    fn toggle_target(&self, row: &RowRef) -> Option<(Target, bool)> {
        match row {
            RowRef::Member { entity_id, .. } => {
                Some((Target::Entity(entity_id.clone()), self.is_on(entity_id)))
            }
            RowRef::Group { group } => {
                let node = self.tree.group(*group)?;
                let members = node.resolve_members(&self.snapshot);

                match GroupKind::classify(members.len()) {
                    GroupKind::Expandable => {
                        let all_on = members.iter().all(|m| self.is_on(&m.entity_id));
                        let ids = members.into_iter().map(|m| m.entity_id).collect();
                        Some((Target::Entities(ids), all_on))
                    }
                    GroupKind::Singleton => {
                        let id = node
                            .entity_id()
                            .map(str::to_string)
                            .or_else(|| members.into_iter().next().map(|m| m.entity_id))?;
                        let on = self.is_on(&id);
                        Some((Target::Entity(id), on))
                    }
                }
            }
        }
    }

    /// Addressee of a drag commit.
    fn command_target(&self, row: &RowRef) -> Option<Target> {
        match row {
            RowRef::Member { entity_id, .. } => Some(Target::Entity(entity_id.clone())),
            RowRef::Group { group } => {
                let node = self.tree.group(*group)?;
                match node.entity_id() {
                    Some(id) => Some(Target::Entity(id.to_string())),
                    None => Some(Target::Entities(
                        node.resolve_members(&self.snapshot)
                            .into_iter()
                            .map(|m| m.entity_id)
                            .collect(),
                    )),
                }
            }
        }
    }

    fn details_target(&self, row: &RowRef) -> Option<String> {
        match row {
            RowRef::Member { entity_id, .. } => Some(entity_id.clone()),
            RowRef::Group { group } => self
                .tree
                .group(*group)?
                .entity_id()
                .map(str::to_string),
        }
    }

    /// Control key of a rendered row. Member rows exist only while their
    /// group is expanded and has materialised them.
    fn key_for(&self, row: &RowRef) -> Option<ControlKey> {
        let key = match row {
            RowRef::Group { group } => self.tree.group(*group).map(GroupNode::key),
            RowRef::Member { group, entity_id } if self.ctx.expansion.is_expanded(*group) => self
                .ctx
                .expansion
                .members(*group)
                .iter()
                .find(|m| &m.entity_id == entity_id)
                .map(ResolvedMember::key),
            RowRef::Member { .. } => None,
        };
        if key.is_none() {
            debug!(?row, "event for a row that is not rendered");
        }
        key
    }

    fn light_for(&self, row: &RowRef) -> Option<LightEntity> {
        match row {
            RowRef::Member { entity_id, .. } => self.snapshot.light(entity_id),
            RowRef::Group { group } => {
                let node = self.tree.group(*group)?;
                header_light(node, &node.resolve_members(&self.snapshot), &self.snapshot)
            }
        }
    }

    fn is_on(&self, entity_id: &str) -> bool {
        self.snapshot.light(entity_id).is_some_and(|l| l.on)
    }

    fn current_visual(&self, key: &ControlKey) -> ControlVisual {
        self.ctx
            .visuals
            .get(key)
            .cloned()
            .unwrap_or_else(|| ControlVisual::neutral(&self.palette))
    }

    fn send(&mut self, call: ServiceCall) {
        info!(
            service = %call.action(),
            target = ?call.target().ids(),
            "calling {}.{}",
            call.domain(),
            call.action()
        );
        if let Err(e) = self.service.call(call) {
            warn!("Dropping service call: {}", e);
        }
    }

    fn notify(&mut self, notification: Notification) {
        info!(?notification, "notifying host");
        if let Err(e) = self.service.notify(notification) {
            warn!("Dropping notification: {}", e);
        }
    }
}

/// The light behind a group header: its own entity, or the aggregate of its
/// members when it has none.
fn header_light(
    node: &GroupNode,
    members: &[ResolvedMember],
    snapshot: &StateSnapshot,
) -> Option<LightEntity> {
    match node.entity_id() {
        Some(id) => snapshot.light(id),
        None => aggregate(members.iter().filter_map(|m| snapshot.light(&m.entity_id))),
    }
}

/// Keys of the member rows currently materialised for `group`.
fn member_keys(ctx: &CardContext, group: GroupId) -> Vec<ControlKey> {
    ctx.expansion
        .members(group)
        .iter()
        .map(ResolvedMember::key)
        .collect()
}

/// Finish the drags of rows that are no longer rendered, as if the pointer
/// had been released where it last was. Commits are collected for sending.
fn release_drags(
    ctx: &mut CardContext,
    keys: Vec<ControlKey>,
    released: &mut Vec<(ControlKey, Commit)>,
) {
    for key in keys {
        match ctx.drags.cancel(&key) {
            GestureEffect::Commit(commit) => {
                debug!(control = %key, "row removed mid-drag, committing");
                released.push((key, commit));
            }
            // A press that never moved: nothing to send, but the preview
            // must not outlive the row
            GestureEffect::Tap => ctx.invalidate(&key),
            GestureEffect::Preview { .. } | GestureEffect::Ignored => {}
        }
    }
}

fn reconcile_group(
    node: &GroupNode,
    snapshot: &StateSnapshot,
    palette: &Palette,
    ctx: &mut CardContext,
    frame: &mut Frame,
    released: &mut Vec<(ControlKey, Commit)>,
) {
    let id = node.id;
    let members = node.resolve_members(snapshot);

    // Membership can change at runtime
    let kind = GroupKind::classify(members.len());
    if ctx.kinds.insert(id, kind) != Some(kind) {
        frame.push(Paint::Chevron {
            group: id,
            visible: kind.shows_chevron(),
        });
    }
    if kind == GroupKind::Singleton && ctx.expansion.is_expanded(id) {
        debug!(group = id.0, "group became a singleton, collapsing");
        let hidden = member_keys(ctx, id);
        ctx.expansion.collapse(id);
        release_drags(ctx, hidden, released);
        frame.push(Paint::Expansion {
            group: id,
            expanded: false,
        });
    }

    let key = node.key();
    let light = header_light(node, &members, snapshot);
    if let Reconciled::Repainted(visual) = reconcile(ctx, &key, light, palette) {
        frame.push(Paint::Repaint { key, visual });
    }

    if let Some(sensor) = node.spec.lux_sensor.as_deref() {
        let text = format_lux(snapshot, sensor);
        if ctx.lux.get(&id) != Some(&text) {
            ctx.lux.insert(id, text.clone());
            frame.push(Paint::Lux { group: id, text });
        }
    }

    if !ctx.expansion.is_expanded(id) {
        return;
    }

    let ids: Vec<String> = members.iter().map(|m| m.entity_id.clone()).collect();
    let dropped: Vec<ControlKey> = member_keys(ctx, id)
        .into_iter()
        .filter(|key| key.entity_id().is_some_and(|e| !ids.iter().any(|i| i == e)))
        .collect();
    if ctx.expansion.replace_members(id, members) {
        debug!(group = id.0, members = ids.len(), "group membership changed");
        release_drags(ctx, dropped, released);
        frame.push(Paint::Members {
            group: id,
            members: ids,
        });
    }

    for key in member_keys(ctx, id) {
        let light = key.entity_id().and_then(|e| snapshot.light(e));
        if let Reconciled::Repainted(visual) = reconcile(ctx, &key, light, palette) {
            frame.push(Paint::Repaint { key, visual });
        }
    }
}
