//! Process-wide cache of loaded trees.
//!
//! One tree per database, loaded lazily on first query and shared behind an
//! `Arc` for the life of the process. The cache is the only shared mutable
//! state in the engine, and its check-then-insert is atomic per database:
//! each database id owns a slot with its own mutex, so two threads racing
//! on the same database's first query decode the file once, while queries
//! on unrelated databases never wait on each other. The outer map lock is
//! only ever held to look up or create a slot, never across file I/O.
//!
//! Nothing here invalidates an entry when the underlying documents change;
//! replacing a stale tree takes an explicit rebuild (or [`IndexCache::evict`]).

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::SpatialResult;

use super::types::StrTree;

type Slot = Arc<Mutex<Option<Arc<StrTree>>>>;

/// Maps database ids to their loaded spatial index.
#[derive(Default)]
pub struct IndexCache {
    slots: Mutex<HashMap<String, Slot>>,
}

impl IndexCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, database: &str) -> Slot {
        let mut slots = self.slots.lock();
        slots
            .entry(database.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone()
    }

    /// Returns the cached tree for a database, if one is loaded.
    pub fn get(&self, database: &str) -> Option<Arc<StrTree>> {
        let slot = self.slots.lock().get(database).cloned()?;
        let guard = slot.lock();
        guard.clone()
    }

    /// Returns the cached tree for a database, loading it on first access.
    ///
    /// The loader runs inside the database's slot lock, so a cache miss hit
    /// by several threads at once runs the loader exactly once and hands
    /// everyone the same tree. A failed load leaves the slot empty and
    /// surfaces the error; the next call tries again.
    pub fn get_or_load<F>(&self, database: &str, load: F) -> SpatialResult<Arc<StrTree>>
    where
        F: FnOnce() -> SpatialResult<StrTree>,
    {
        let slot = self.slot(database);
        let mut guard = slot.lock();
        if let Some(tree) = guard.as_ref() {
            return Ok(tree.clone());
        }
        let tree = Arc::new(load()?);
        *guard = Some(tree.clone());
        log::debug!(
            "cached spatial index for '{}' ({} items)",
            database,
            tree.item_count()
        );
        Ok(tree)
    }

    /// Replaces the cached tree for a database.
    pub fn insert(&self, database: &str, tree: Arc<StrTree>) {
        let slot = self.slot(database);
        *slot.lock() = Some(tree);
    }

    /// Drops the cached tree for a database. Returns whether one was loaded.
    pub fn evict(&self, database: &str) -> bool {
        let slot = self.slots.lock().get(database).cloned();
        match slot {
            Some(slot) => slot.lock().take().is_some(),
            None => false,
        }
    }

    /// Number of databases with a loaded tree.
    pub fn len(&self) -> usize {
        let slots: Vec<Slot> = self.slots.lock().values().cloned().collect();
        slots.into_iter().filter(|s| s.lock().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
