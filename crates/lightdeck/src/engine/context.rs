use std::collections::HashMap;

use super::expansion::ExpansionCache;
use super::gesture::DragSessions;
use super::reconcile::ControlVisual;
use super::reconcile::RenderSignature;
use super::tree::ControlKey;
use super::tree::GroupId;
use super::tree::GroupKind;

/// All mutable state of one card, owned in one place and handed to
/// reconciliation and gesture handling explicitly.
#[derive(Debug, Clone, Default)]
pub struct CardContext {
    pub drags: DragSessions,
    pub expansion: ExpansionCache,

    /// Signature of the last repaint per control.
    pub signatures: HashMap<ControlKey, RenderSignature>,

    /// Last painted visual per control.
    pub visuals: HashMap<ControlKey, ControlVisual>,

    /// Percent committed by a drag, shown until the next repaint.
    pub pending: HashMap<ControlKey, u8>,

    pub lux: HashMap<GroupId, String>,
    pub kinds: HashMap<GroupId, GroupKind>,
}

impl CardContext {
    /// Percent currently shown on a control: the live drag preview, then a
    /// just-committed value, then the last painted one.
    pub fn displayed_percent(&self, key: &ControlKey) -> Option<u8> {
        self.drags
            .get(key)
            .map(|s| s.preview_pct)
            .or_else(|| self.pending.get(key).copied())
            .or_else(|| self.visuals.get(key).map(|v| v.percent))
    }

    pub fn kind(&self, group: GroupId) -> GroupKind {
        self.kinds.get(&group).copied().unwrap_or(GroupKind::Singleton)
    }

    /// Drop the cached signature so the next reconcile repaints.
    pub fn invalidate(&mut self, key: &ControlKey) {
        self.signatures.remove(key);
    }
}
