use std::{collections::HashMap, hash::Hash};

use crossbeam::channel::Receiver;

use super::KeyChange;

/// Holds the dependencies an effect last ran with, and the cleanup it left behind.
///
/// `update` only re-runs the effect when the dependencies differ from the last run, and always runs
/// the previous cleanup first. The effect and its cleanup are given the same context `X` (usually a
/// bundle of `&mut` borrows) rather than capturing it, so both can mutate the world.
#[derive(Debug)]
pub struct EffectSlot<D, C> {
    deps: Option<D>,
    cleanup: Option<C>,
}

impl<D, C> Default for EffectSlot<D, C> {
    fn default() -> Self {
        Self {
            deps: None,
            cleanup: None,
        }
    }
}

impl<D: PartialEq, C> EffectSlot<D, C> {
    /// Returns `true` if the effect ran.
    pub fn update<X>(
        &mut self,
        cx: &mut X,
        deps: D,
        effect: impl FnOnce(&mut X, &D) -> Option<C>,
        teardown: impl FnOnce(&mut X, C),
    ) -> bool {
        if self.deps.as_ref() == Some(&deps) {
            return false;
        }
        if let Some(cleanup) = self.cleanup.take() {
            teardown(cx, cleanup);
        }
        self.cleanup = effect(cx, &deps);
        self.deps = Some(deps);
        true
    }

    /// Run the outstanding cleanup, if any, and forget the dependencies.
    pub fn teardown<X>(&mut self, cx: &mut X, teardown: impl FnOnce(&mut X, C)) {
        self.deps = None;
        if let Some(cleanup) = self.cleanup.take() {
            teardown(cx, cleanup);
        }
    }

    pub fn deps(&self) -> Option<&D> {
        self.deps.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.cleanup.is_some()
    }
}

/// One [`EffectSlot`] per live key of a [`super::ReactiveMap`].
#[derive(Debug)]
pub struct Reactor<K, D, C> {
    changes: Receiver<KeyChange<K>>,
    slots: HashMap<K, EffectSlot<D, C>>,
}

impl<K, D, C> Reactor<K, D, C>
where
    K: Eq + Hash + Clone,
    D: PartialEq,
{
    pub fn new(changes: Receiver<KeyChange<K>>) -> Self {
        Self {
            changes,
            slots: HashMap::new(),
        }
    }

    /// Catch up with the map: create slots for new keys and tear down slots whose key was removed.
    pub fn sync<X>(&mut self, cx: &mut X, mut teardown: impl FnMut(&mut X, C)) {
        for change in self.changes.try_iter() {
            match change {
                KeyChange::Added(key) | KeyChange::Changed(key) => {
                    self.slots.entry(key).or_default();
                }
                KeyChange::Removed(key) => {
                    if let Some(mut slot) = self.slots.remove(&key) {
                        slot.teardown(cx, &mut teardown);
                    }
                }
            }
        }
    }

    pub fn keys(&self) -> Vec<K> {
        self.slots.keys().cloned().collect()
    }

    pub fn slot_mut(&mut self, key: &K) -> Option<&mut EffectSlot<D, C>> {
        self.slots.get_mut(key)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Tear every slot down, eg. when the session ends.
    pub fn teardown_all<X>(&mut self, cx: &mut X, mut teardown: impl FnMut(&mut X, C)) {
        for (_, mut slot) in self.slots.drain() {
            slot.teardown(cx, &mut teardown);
        }
    }
}
