use std::collections::HashMap;

use crossbeam::channel::Receiver;
use log::debug;

use crate::{
    action::{Action, ActionEnvelope},
    components::{EntityUuid, Handedness},
    identity::PeerId,
    reactive::{KeyChange, ReactiveMap},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrabbableStateEntry {
    pub attachment_point: Handedness,
    pub grabber_entity_uuid: EntityUuid,
}

/// Where an action sits in the total order of actions: `(time, from, seq)`.
type Stamp = (u64, PeerId, u64);

/// The last release of an entity, kept so that a grab which was overtaken by it can't resurrect the
/// grab.
#[derive(Debug, Clone, Copy)]
struct Release {
    at: Stamp,
    grabbed_at: Stamp,
    grabber_entity_uuid: EntityUuid,
}

/// Who is grabbing what, keyed by the grabbed entity's UUID.
///
/// This is the source of truth for grabbing; `Grabber` and `Grabbed` are derived from it by
/// [`crate::systems::grabbable_reactor_system`]. An entry exists if and only if the entity is
/// grabbed, and there is at most one grabber per entity: if two grabs race, the later one (in
/// action order) wins on every peer, whichever order they arrive in. Who ends up *in control* of
/// the entity is decided separately, by authority.
#[derive(Debug, Default)]
pub struct GrabbableState {
    entries: ReactiveMap<EntityUuid, GrabbableStateEntry>,
    grabbed_at: HashMap<EntityUuid, Stamp>,
    released: HashMap<EntityUuid, Release>,
}

impl GrabbableState {
    pub fn get(&self, entity_uuid: EntityUuid) -> Option<&GrabbableStateEntry> {
        self.entries.get(&entity_uuid)
    }

    pub fn is_grabbed(&self, entity_uuid: EntityUuid) -> bool {
        self.entries.contains_key(&entity_uuid)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EntityUuid, &GrabbableStateEntry)> {
        self.entries.iter()
    }

    pub fn subscribe(&mut self) -> Receiver<KeyChange<EntityUuid>> {
        self.entries.subscribe()
    }

    /// Forget every grab involving `entity_uuid`, as the grabbed entity or as the grabber.
    pub fn forget(&mut self, entity_uuid: EntityUuid) {
        self.entries.retain(|grabbed, entry| {
            *grabbed != entity_uuid && entry.grabber_entity_uuid != entity_uuid
        });
        let entries = &self.entries;
        self.grabbed_at.retain(|grabbed, _| entries.contains_key(grabbed));
        self.released.retain(|grabbed, release| {
            *grabbed != entity_uuid && release.grabber_entity_uuid != entity_uuid
        });
    }

    /// The grabbable receptor. Returns `true` if the action changed who is grabbing what.
    pub fn receive(&mut self, envelope: &ActionEnvelope) -> bool {
        let stamp = envelope.sort_key();
        match &envelope.action {
            Action::SetGrabbedObject {
                entity_uuid,
                grabbed: true,
                attachment_point,
                grabber_entity_uuid,
            } => {
                let entry = GrabbableStateEntry {
                    attachment_point: *attachment_point,
                    grabber_entity_uuid: *grabber_entity_uuid,
                };
                self.grab(*entity_uuid, entry, stamp)
            }
            Action::SetGrabbedObject {
                entity_uuid,
                grabbed: false,
                grabber_entity_uuid,
                ..
            } => self.release(*entity_uuid, *grabber_entity_uuid, stamp),
            Action::DestroyObject { entity_uuid } => {
                self.forget(*entity_uuid);
                true
            }
            Action::SpawnObject { .. }
            | Action::RequestAuthorityOverObject { .. }
            | Action::TransferAuthorityOfObject { .. } => false,
        }
    }

    fn grab(&mut self, entity_uuid: EntityUuid, entry: GrabbableStateEntry, stamp: Stamp) -> bool {
        if let Some(current) = self.grabbed_at.get(&entity_uuid) {
            if stamp < *current {
                debug!(
                    "[HOTHAM_GRAB] Ignoring grab of {entity_uuid}, it has since been grabbed again"
                );
                return false;
            }
        }
        if let Some(release) = self.released.get(&entity_uuid) {
            // Only a grab that would have taken over from the released grabber survives the
            // release.
            let overtaken = stamp < release.grabbed_at
                || entry.grabber_entity_uuid == release.grabber_entity_uuid;
            if stamp < release.at && overtaken {
                debug!("[HOTHAM_GRAB] Ignoring grab of {entity_uuid}, it has since been released");
                return false;
            }
        }

        self.released.remove(&entity_uuid);
        self.grabbed_at.insert(entity_uuid, stamp);
        if let Some(previous) = self.entries.insert(entity_uuid, entry) {
            if previous.grabber_entity_uuid != entry.grabber_entity_uuid {
                debug!(
                    "[HOTHAM_GRAB] {} took {entity_uuid} from {}",
                    entry.grabber_entity_uuid, previous.grabber_entity_uuid
                );
            }
        }
        true
    }

    fn release(
        &mut self,
        entity_uuid: EntityUuid,
        grabber_entity_uuid: EntityUuid,
        stamp: Stamp,
    ) -> bool {
        let current = self.entries.get(&entity_uuid).map(|e| e.grabber_entity_uuid);
        let grabbed_at = self.grabbed_at.get(&entity_uuid).copied();
        match (current, grabbed_at) {
            (Some(current), Some(grabbed_at))
                if current == grabber_entity_uuid && grabbed_at < stamp =>
            {
                self.entries.remove(&entity_uuid);
                self.grabbed_at.remove(&entity_uuid);
                self.released.insert(
                    entity_uuid,
                    Release {
                        at: stamp,
                        grabbed_at,
                        grabber_entity_uuid,
                    },
                );
                true
            }
            // A late release from a previous grabber mustn't drop the current grab.
            (Some(_), _) => {
                debug!(
                    "[HOTHAM_GRAB] Ignoring stale release of {entity_uuid} by {grabber_entity_uuid}"
                );
                false
            }
            (None, _) => false,
        }
    }
}
