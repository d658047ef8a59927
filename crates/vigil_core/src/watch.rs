//! Bidirectional watch relations.
//!
//! `watching[a]` holds everything `a` observes and `watchers[b]` holds
//! everything observing `b`. The two maps are kept as mutual inverses:
//! `b in watching[a]` exactly when `a in watchers[b]`. Both maps carry an
//! entry (possibly empty) for every tracked entity.

use crate::EntityId;
use dashmap::DashMap;
use std::collections::HashSet;
use tracing::trace;

/// Relations severed when an entity is cleared.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeveredRelations {
    /// Entities that were observing the cleared entity.
    pub watchers: HashSet<EntityId>,
    /// Entities the cleared entity was observing.
    pub watching: HashSet<EntityId>,
}

#[derive(Default)]
pub struct WatchTable {
    watching: DashMap<EntityId, HashSet<EntityId>>,
    watchers: DashMap<EntityId, HashSet<EntityId>>,
}

impl WatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed empty relation sets for `id`. Returns `false` if already tracked.
    pub fn track(&self, id: EntityId) -> bool {
        if self.watching.contains_key(&id) {
            return false;
        }
        self.watching.insert(id, HashSet::new());
        self.watchers.insert(id, HashSet::new());
        true
    }

    pub fn is_tracked(&self, id: EntityId) -> bool {
        self.watching.contains_key(&id)
    }

    /// Number of tracked entities.
    pub fn len(&self) -> usize {
        self.watching.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watching.is_empty()
    }

    /// Record that `watcher` observes `watched`.
    ///
    /// Returns `true` if the relation is new. Re-adding is a no-op, as is
    /// relating an entity to itself or to an untracked entity.
    pub fn add_relation(&self, watcher: EntityId, watched: EntityId) -> bool {
        debug_assert_ne!(watcher, watched, "an entity cannot watch itself");
        if watcher == watched {
            return false;
        }
        if !self.is_tracked(watcher) || !self.is_tracked(watched) {
            return false;
        }

        let added = match self.watching.get_mut(&watcher) {
            Some(mut set) => set.insert(watched),
            None => return false,
        };
        if let Some(mut set) = self.watchers.get_mut(&watched) {
            set.insert(watcher);
        }
        if added {
            trace!(%watcher, %watched, "watch relation added");
        }
        added
    }

    /// Drop the relation `watcher -> watched`. Returns `true` if it existed.
    pub fn remove_relation(&self, watcher: EntityId, watched: EntityId) -> bool {
        let removed = self
            .watching
            .get_mut(&watcher)
            .map(|mut set| set.remove(&watched))
            .unwrap_or(false);
        if let Some(mut set) = self.watchers.get_mut(&watched) {
            set.remove(&watcher);
        }
        if removed {
            trace!(%watcher, %watched, "watch relation removed");
        }
        removed
    }

    /// Sever every relation involving `id` and stop tracking it.
    pub fn clear_entity(&self, id: EntityId) -> SeveredRelations {
        let watching = self.watching.remove(&id).map(|(_, set)| set).unwrap_or_default();
        let watchers = self.watchers.remove(&id).map(|(_, set)| set).unwrap_or_default();

        for watched in &watching {
            if let Some(mut set) = self.watchers.get_mut(watched) {
                set.remove(&id);
            }
        }
        for watcher in &watchers {
            if let Some(mut set) = self.watching.get_mut(watcher) {
                set.remove(&id);
            }
        }

        SeveredRelations { watchers, watching }
    }

    /// Snapshot of what `id` observes.
    pub fn watching_of(&self, id: EntityId) -> HashSet<EntityId> {
        self.watching.get(&id).map(|set| set.clone()).unwrap_or_default()
    }

    /// Snapshot of who observes `id`.
    pub fn watchers_of(&self, id: EntityId) -> HashSet<EntityId> {
        self.watchers.get(&id).map(|set| set.clone()).unwrap_or_default()
    }

    pub fn is_watching(&self, watcher: EntityId, watched: EntityId) -> bool {
        self.watching
            .get(&watcher)
            .map(|set| set.contains(&watched))
            .unwrap_or(false)
    }

    /// Total number of watch edges.
    pub fn relation_count(&self) -> usize {
        self.watching.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn clear(&self) {
        self.watching.clear();
        self.watchers.clear();
    }

    /// Check the mutual-inverse and no-self-watch invariants.
    pub fn is_consistent(&self) -> bool {
        if self.watching.len() != self.watchers.len() {
            return false;
        }
        let forward_ok = self.watching.iter().all(|entry| {
            let a = *entry.key();
            entry.value().iter().all(|b| {
                *b != a && self.watchers.get(b).map(|set| set.contains(&a)).unwrap_or(false)
            })
        });
        let backward_ok = self.watchers.iter().all(|entry| {
            let b = *entry.key();
            entry.value().iter().all(|a| {
                *a != b && self.watching.get(a).map(|set| set.contains(&b)).unwrap_or(false)
            })
        });
        forward_ok && backward_ok
    }
}

impl std::fmt::Debug for WatchTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchTable")
            .field("entities", &self.watching.len())
            .field("relations", &self.relation_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u64) -> EntityId {
        EntityId::new(raw)
    }

    fn table(ids: &[u64]) -> WatchTable {
        let table = WatchTable::new();
        for &raw in ids {
            assert!(table.track(id(raw)));
        }
        table
    }

    #[test]
    fn relations_are_mutual_inverses() {
        let t = table(&[1, 2, 3]);
        assert!(t.add_relation(id(1), id(2)));
        assert!(t.add_relation(id(3), id(2)));
        assert_eq!(t.watching_of(id(1)), HashSet::from([id(2)]));
        assert_eq!(t.watchers_of(id(2)), HashSet::from([id(1), id(3)]));
        assert!(t.watchers_of(id(1)).is_empty());
        assert!(t.is_watching(id(1), id(2)));
        assert!(!t.is_watching(id(2), id(1)));
        assert!(t.is_consistent());
    }

    #[test]
    fn add_and_remove_are_idempotent() {
        let t = table(&[1, 2]);
        assert!(t.add_relation(id(1), id(2)));
        assert!(!t.add_relation(id(1), id(2)));
        assert_eq!(t.relation_count(), 1);

        assert!(t.remove_relation(id(1), id(2)));
        assert!(!t.remove_relation(id(1), id(2)));
        assert_eq!(t.relation_count(), 0);
        assert!(t.is_consistent());
    }

    #[test]
    fn untracked_entities_are_ignored() {
        let t = table(&[1]);
        assert!(!t.add_relation(id(1), id(9)));
        assert!(t.watching_of(id(1)).is_empty());
        assert!(!t.track(id(1)));
    }

    #[test]
    fn clear_entity_severs_both_directions() {
        let t = table(&[1, 2, 3]);
        t.add_relation(id(1), id(2));
        t.add_relation(id(2), id(3));
        t.add_relation(id(3), id(2));

        let severed = t.clear_entity(id(2));
        assert_eq!(severed.watchers, HashSet::from([id(1), id(3)]));
        assert_eq!(severed.watching, HashSet::from([id(3)]));
        assert!(!t.is_tracked(id(2)));
        assert!(t.watching_of(id(1)).is_empty());
        assert!(t.watchers_of(id(3)).is_empty());
        assert!(t.watching_of(id(3)).is_empty());
        assert!(t.is_consistent());
    }
}
