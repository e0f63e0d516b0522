//! Tracks which presentation surfaces are live and addresses messages to them.

use crate::common::{SurfaceId, SurfaceRole};
use crate::events::{HubMessage, WindowSummary};
use slotmap::SlotMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// The outbox a surface reads hub messages from.
pub type SurfaceOutbox = mpsc::UnboundedSender<HubMessage>;

/// Per-surface liveness. `Unregistered` is any id the registry never issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Unregistered,
    Live,
    Closed,
}

pub(crate) struct SurfaceEntry {
    pub role: SurfaceRole,
    pub liveness: Liveness,
    outbox: SurfaceOutbox,
}

/// Entries are never resurrected: a closed surface stays closed, and opening
/// the role again creates a new entry.
#[derive(Default)]
pub struct WindowRegistry {
    surfaces: SlotMap<SurfaceId, SurfaceEntry>,
}

impl WindowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, role: SurfaceRole, outbox: SurfaceOutbox) -> SurfaceId {
        let id = self.surfaces.insert(SurfaceEntry {
            role,
            liveness: Liveness::Live,
            outbox,
        });
        debug!("Registered {} surface {:?}", role, id);
        id
    }

    /// Marks a live surface closed. Returns its role if it was live.
    pub fn close(&mut self, id: SurfaceId) -> Option<SurfaceRole> {
        let entry = self.surfaces.get_mut(id)?;
        if entry.liveness != Liveness::Live {
            return None;
        }
        entry.liveness = Liveness::Closed;
        Some(entry.role)
    }

    pub fn liveness(&self, id: SurfaceId) -> Liveness {
        self.surfaces
            .get(id)
            .map_or(Liveness::Unregistered, |entry| entry.liveness)
    }

    pub fn role(&self, id: SurfaceId) -> Option<SurfaceRole> {
        self.surfaces.get(id).map(|entry| entry.role)
    }

    /// The live surface playing `role`, if any.
    pub fn live_of(&self, role: SurfaceRole) -> Option<SurfaceId> {
        self.live()
            .find(|(_, entry)| entry.role == role)
            .map(|(id, _)| id)
    }

    pub fn is_live(&self, role: SurfaceRole) -> bool {
        self.live_of(role).is_some()
    }

    pub fn live_ids(&self) -> Vec<SurfaceId> {
        self.live().map(|(id, _)| id).collect()
    }

    pub fn summary(&self) -> WindowSummary {
        WindowSummary {
            wheel_display_open: self.is_live(SurfaceRole::WheelDisplay),
            timer_display_open: self.is_live(SurfaceRole::TimerDisplay),
        }
    }

    /// Sends to one surface if it is live. Returns whether it was delivered.
    pub fn send(&self, id: SurfaceId, message: HubMessage) -> bool {
        match self.surfaces.get(id) {
            Some(entry) if entry.liveness == Liveness::Live => deliver(id, entry, message),
            _ => false,
        }
    }

    /// Sends to every live surface.
    pub fn broadcast(&self, message: &HubMessage) {
        for (id, entry) in self.live() {
            deliver(id, entry, message.clone());
        }
    }

    fn live(&self) -> impl Iterator<Item = (SurfaceId, &SurfaceEntry)> {
        self.surfaces
            .iter()
            .filter(|(_, entry)| entry.liveness == Liveness::Live)
    }
}

fn deliver(id: SurfaceId, entry: &SurfaceEntry, message: HubMessage) -> bool {
    if entry.outbox.send(message).is_err() {
        warn!("{} surface {:?} dropped its outbox", entry.role, id);
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface(
        registry: &mut WindowRegistry,
        role: SurfaceRole,
    ) -> (SurfaceId, mpsc::UnboundedReceiver<HubMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (registry.register(role, tx), rx)
    }

    #[test]
    fn unknown_ids_are_unregistered() {
        let registry = WindowRegistry::new();
        assert_eq!(registry.liveness(SurfaceId::default()), Liveness::Unregistered);
    }

    #[test]
    fn closed_entries_are_not_resurrected() {
        let mut registry = WindowRegistry::new();
        let (first, _rx1) = surface(&mut registry, SurfaceRole::WheelDisplay);
        assert_eq!(registry.close(first), Some(SurfaceRole::WheelDisplay));
        assert_eq!(registry.close(first), None);
        assert_eq!(registry.liveness(first), Liveness::Closed);

        let (second, _rx2) = surface(&mut registry, SurfaceRole::WheelDisplay);
        assert_ne!(first, second);
        assert_eq!(registry.live_of(SurfaceRole::WheelDisplay), Some(second));
        assert_eq!(registry.liveness(first), Liveness::Closed);
    }

    #[test]
    fn broadcast_reaches_only_live_surfaces() {
        let mut registry = WindowRegistry::new();
        let (_, mut live_rx) = surface(&mut registry, SurfaceRole::Controller);
        let (closed, mut closed_rx) = surface(&mut registry, SurfaceRole::TimerDisplay);
        registry.close(closed);

        registry.broadcast(&HubMessage::Focus);
        assert_eq!(live_rx.try_recv().ok(), Some(HubMessage::Focus));
        assert!(closed_rx.try_recv().is_err());
        assert!(!registry.send(closed, HubMessage::Focus));
    }

    #[test]
    fn summary_tracks_display_liveness() {
        let mut registry = WindowRegistry::new();
        surface(&mut registry, SurfaceRole::Controller);
        assert_eq!(registry.summary(), WindowSummary::default());

        let (timer, _rx) = surface(&mut registry, SurfaceRole::TimerDisplay);
        assert!(registry.summary().timer_display_open);
        assert!(!registry.summary().wheel_display_open);

        registry.close(timer);
        assert!(!registry.summary().timer_display_open);
    }
}
