//! Persisted ids waiting to be deleted on the next save.

use std::collections::BTreeMap;

use crate::store::CellKey;

/// Set of persisted ids to delete, each remembering the cell it backs.
///
/// Kept beside the store rather than inside it: a queued id survives even if
/// the cell is edited again, until the grid cancels it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeletionQueue {
    pending: BTreeMap<String, CellKey>,
}

impl DeletionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `persisted_id`. Returns false if it was already queued.
    pub fn enqueue(&mut self, persisted_id: impl Into<String>, key: CellKey) -> bool {
        let persisted_id = persisted_id.into();
        if self.pending.contains_key(&persisted_id) {
            return false;
        }
        self.pending.insert(persisted_id, key);
        true
    }

    /// Drop a queued deletion. Returns false if it wasn't queued.
    pub fn cancel(&mut self, persisted_id: &str) -> bool {
        self.pending.remove(persisted_id).is_some()
    }

    pub fn contains(&self, persisted_id: &str) -> bool {
        self.pending.contains_key(persisted_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellKey)> {
        self.pending.iter().map(|(id, key)| (id.as_str(), key))
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&str, &CellKey) -> bool) {
        self.pending.retain(|id, key| keep(id, key));
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
