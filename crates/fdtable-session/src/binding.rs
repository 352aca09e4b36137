//! Player → node affinity.
//!
//! When a player takes a seat the table server records "this uid is served
//! by this match on this node"; the transport layer reads that record to
//! route the player's later messages. The record is removed when the
//! player leaves or the table ends. This crate only defines the seam; the
//! production store lives in the cluster runtime.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use fdtable_protocol::{MatchId, Uid};

use crate::BindingError;

/// Durable uid → match binding.
#[async_trait]
pub trait BindingStore: Send + Sync + 'static {
    /// Records that `uid` is now served by `match_id` on this node.
    async fn put(&self, uid: &Uid, match_id: MatchId)
    -> Result<(), BindingError>;

    /// Forgets the binding for `uid`. Removing a missing binding is not
    /// an error.
    async fn remove(&self, uid: &Uid) -> Result<(), BindingError>;
}

/// In-memory [`BindingStore`] for single-node runs and tests.
#[derive(Debug, Default)]
pub struct MemoryBindingStore {
    bindings: Mutex<HashMap<Uid, MatchId>>,
}

impl MemoryBindingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uid, MatchId>> {
        self.bindings.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the match `uid` is bound to, if any.
    pub fn get(&self, uid: &Uid) -> Option<MatchId> {
        self.lock().get(uid).copied()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[async_trait]
impl BindingStore for MemoryBindingStore {
    async fn put(
        &self,
        uid: &Uid,
        match_id: MatchId,
    ) -> Result<(), BindingError> {
        self.lock().insert(uid.clone(), match_id);
        tracing::debug!(%uid, %match_id, "binding stored");
        Ok(())
    }

    async fn remove(&self, uid: &Uid) -> Result<(), BindingError> {
        if self.lock().remove(uid).is_some() {
            tracing::debug!(%uid, "binding removed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_then_get_returns_match() {
        let store = MemoryBindingStore::new();
        store.put(&Uid::from("a"), MatchId(3)).await.unwrap();

        assert_eq!(store.get(&Uid::from("a")), Some(MatchId(3)));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_missing_binding_is_ok() {
        let store = MemoryBindingStore::new();
        store.remove(&Uid::from("nobody")).await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_remove_clears_binding() {
        let store = MemoryBindingStore::new();
        store.put(&Uid::from("a"), MatchId(3)).await.unwrap();
        store.remove(&Uid::from("a")).await.unwrap();

        assert!(store.get(&Uid::from("a")).is_none());
    }
}
