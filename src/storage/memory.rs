//! In-memory frontier
//!
//! A non-durable reference implementation of [`FrontierStore`]. Contents are
//! lost when the process exits.

use crate::identifier::VideoId;
use crate::storage::traits::{FrontierStore, StoreError, StoreResult};
use async_trait::async_trait;
use rand::seq::{IteratorRandom, SliceRandom};
use std::collections::HashSet;
use std::sync::Mutex;

/// Frontier kept in a process-local set
#[derive(Debug, Default)]
pub struct MemoryFrontier {
    ids: Mutex<HashSet<VideoId>>,
}

impl MemoryFrontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a frontier already holding `ids`
    pub fn with_ids<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = VideoId>,
    {
        Self {
            ids: Mutex::new(ids.into_iter().collect()),
        }
    }

    /// Copy of the current contents
    pub fn snapshot(&self) -> HashSet<VideoId> {
        self.ids.lock().map(|ids| ids.clone()).unwrap_or_default()
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, HashSet<VideoId>>> {
        self.ids
            .lock()
            .map_err(|_| StoreError::Database("frontier mutex poisoned".to_string()))
    }
}

#[async_trait]
impl FrontierStore for MemoryFrontier {
    async fn ensure_ready(&self) -> StoreResult<()> {
        self.lock().map(|_| ())
    }

    async fn sample(&self, n: usize) -> StoreResult<Vec<VideoId>> {
        let ids = self.lock()?;
        let mut rng = rand::thread_rng();
        let mut picked: Vec<VideoId> = ids.iter().cloned().choose_multiple(&mut rng, n);
        // choose_multiple does not randomize order
        picked.shuffle(&mut rng);
        Ok(picked)
    }

    async fn merge(&self, new_ids: &HashSet<VideoId>) -> StoreResult<usize> {
        let mut ids = self.lock()?;
        Ok(new_ids
            .iter()
            .filter(|id| ids.insert((*id).clone()))
            .count())
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(self.lock()?.len() as u64)
    }
}
