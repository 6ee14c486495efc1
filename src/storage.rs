//! Pluggable entity storage.
//!
//! A [`Storage`] is one immutable snapshot of the full entity set visible at a
//! layer. "Mutation" is value replacement: `put` and `remove` return a new
//! storage value and leave the receiver untouched, so a layer's storage can be
//! shared freely until superseded. The in-memory backend below is the only one
//! in scope; anything satisfying the trait can be substituted without changing
//! caller behavior.

use std::collections::HashMap;
use std::sync::Arc;

use crate::construct::{Entity, EntityId, IdHasher};
use crate::error::{FactumError, Result};

pub trait Storage: Clone + Default + Send + Sync {
    /// Point lookup. Fails with `NotFound` if no entity with that id is
    /// visible in this snapshot.
    fn get(&self, id: EntityId) -> Result<Arc<Entity>>;
    /// Returns a new storage value with `entity` inserted, replacing any
    /// prior entity of the same id. An entity that has not been assigned an
    /// id cannot be stored and fails with `Invariant`.
    fn put(&self, entity: Entity) -> Result<Self>;
    /// Returns a new storage value without the given id. Absent ids are a
    /// no-op.
    fn remove(&self, id: EntityId) -> Self;
    /// All entity ids visible in this snapshot, in no particular order.
    fn ids(&self) -> Vec<EntityId>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Entities are kept behind `Arc` so that cloning a snapshot is shallow and
/// successive layers share every entity that a write did not touch.
#[derive(Clone, Debug, Default)]
pub struct InMemoryStorage {
    kept: HashMap<EntityId, Arc<Entity>, IdHasher>,
}

impl Storage for InMemoryStorage {
    fn get(&self, id: EntityId) -> Result<Arc<Entity>> {
        self.kept
            .get(&id)
            .cloned()
            .ok_or_else(|| FactumError::NotFound(format!("entity {}", id)))
    }
    fn put(&self, entity: Entity) -> Result<Self> {
        let id = entity.id().ok_or_else(|| {
            FactumError::Invariant("an entity without an assigned id cannot be stored".into())
        })?;
        let mut kept = self.kept.clone();
        kept.insert(id, Arc::new(entity));
        Ok(Self { kept })
    }
    fn remove(&self, id: EntityId) -> Self {
        let mut kept = self.kept.clone();
        kept.remove(&id);
        Self { kept }
    }
    fn ids(&self) -> Vec<EntityId> {
        self.kept.keys().copied().collect()
    }
    fn len(&self) -> usize {
        self.kept.len()
    }
}
