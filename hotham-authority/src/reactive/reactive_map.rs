use std::{collections::HashMap, hash::Hash};

use crossbeam::channel::{unbounded, Receiver, Sender};

/// A change to the set of keys (or their values) in a [`ReactiveMap`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyChange<K> {
    Added(K),
    Changed(K),
    Removed(K),
}

impl<K> KeyChange<K> {
    pub fn key(&self) -> &K {
        match self {
            KeyChange::Added(k) | KeyChange::Changed(k) | KeyChange::Removed(k) => k,
        }
    }
}

/// A `HashMap` that tells its subscribers about every key that is added, changed or removed.
///
/// Writes that don't change anything (inserting an equal value, removing a missing key) are not
/// published, which is what makes replaying the same write harmless.
#[derive(Debug)]
pub struct ReactiveMap<K, V> {
    entries: HashMap<K, V>,
    subscribers: Vec<Sender<KeyChange<K>>>,
}

impl<K, V> Default for ReactiveMap<K, V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            subscribers: Vec::new(),
        }
    }
}

impl<K, V> ReactiveMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone + PartialEq,
{
    /// Subscribe to changes. The receiver is primed with an `Added` for every key already present.
    /// Dropping the receiver unsubscribes.
    pub fn subscribe(&mut self) -> Receiver<KeyChange<K>> {
        let (sender, receiver) = unbounded();
        for key in self.entries.keys() {
            // Can't fail, we hold the receiver.
            let _ = sender.send(KeyChange::Added(key.clone()));
        }
        self.subscribers.push(sender);
        receiver
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }

    /// Insert or overwrite `key`, returning the previous value.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let change = match self.entries.get(&key) {
            None => Some(KeyChange::Added(key.clone())),
            Some(existing) if *existing != value => Some(KeyChange::Changed(key.clone())),
            Some(_) => None,
        };
        let previous = self.entries.insert(key, value);
        if let Some(change) = change {
            self.publish(change);
        }
        previous
    }

    /// Modify the value at `key` in place. Subscribers are only told if the value actually changed.
    pub fn update(&mut self, key: &K, f: impl FnOnce(&mut V)) -> bool {
        let Some(value) = self.entries.get_mut(key) else {
            return false;
        };
        let before = value.clone();
        f(value);
        if *value == before {
            return false;
        }
        self.publish(KeyChange::Changed(key.clone()));
        true
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        let removed = self.entries.remove(key)?;
        self.publish(KeyChange::Removed(key.clone()));
        Some(removed)
    }

    /// Remove every entry for which `f` returns `false`.
    pub fn retain(&mut self, mut f: impl FnMut(&K, &V) -> bool) {
        let doomed = self
            .entries
            .iter()
            .filter(|(k, v)| !f(k, v))
            .map(|(k, _)| k.clone())
            .collect::<Vec<_>>();
        for key in doomed {
            self.remove(&key);
        }
    }

    fn publish(&mut self, change: KeyChange<K>) {
        self.subscribers
            .retain(|subscriber| subscriber.send(change.clone()).is_ok());
    }
}
