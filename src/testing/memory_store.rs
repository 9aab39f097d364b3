//! In-memory [`EntityStore`] that records every batch it receives.

use crate::error::BoxError;
use crate::model::{Entity, Key};
use crate::store::EntityStore;
use indexmap::IndexMap;

/// Entities keyed by [`Key`], in first-write order.
///
/// Each `put_multi`/`delete_multi` call is logged by batch size. With
/// [`MemoryStore::failing_after`] the store accepts that many calls and fails
/// every later one.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entities: IndexMap<Key, Entity>,
    put_batches: Vec<usize>,
    delete_batches: Vec<usize>,
    fail_after: Option<usize>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that fails once `batches` calls have succeeded.
    #[must_use]
    pub fn failing_after(batches: usize) -> Self {
        Self {
            fail_after: Some(batches),
            ..Self::default()
        }
    }

    /// A store pre-loaded with `entities`.
    #[must_use]
    pub fn with_entities(entities: impl IntoIterator<Item = Entity>) -> Self {
        let mut store = Self::new();
        for e in entities {
            store.entities.insert(e.key.clone(), e);
        }
        store
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get(&self, key: &Key) -> Option<&Entity> {
        self.entities.get(key)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Sizes of the `put_multi` batches received, in order.
    pub fn put_batches(&self) -> &[usize] {
        &self.put_batches
    }

    /// Sizes of the `delete_multi` batches received, in order.
    pub fn delete_batches(&self) -> &[usize] {
        &self.delete_batches
    }

    fn check_failure(&self) -> Result<(), BoxError> {
        let calls = self.put_batches.len() + self.delete_batches.len();
        match self.fail_after {
            Some(limit) if calls >= limit => {
                Err(format!("memory store: injected failure after {limit} batches").into())
            }
            _ => Ok(()),
        }
    }
}

impl EntityStore for MemoryStore {
    fn put_multi(&mut self, entities: &[Entity]) -> Result<(), BoxError> {
        self.check_failure()?;
        self.put_batches.push(entities.len());
        for e in entities {
            self.entities.insert(e.key.clone(), e.clone());
        }
        Ok(())
    }

    fn delete_multi(&mut self, keys: &[Key]) -> Result<(), BoxError> {
        self.check_failure()?;
        self.delete_batches.push(keys.len());
        for k in keys {
            self.entities.shift_remove(k);
        }
        Ok(())
    }
}
