use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::DuelError;
use crate::model::Duel;

/// Persistence seam for duel records.
///
/// `update` is an atomic conditional write: the store accepts it only when
/// the stored `version` matches the incoming record's, bumps the version,
/// and returns the stored copy. A mismatch is [`DuelError::Conflict`] and
/// the caller retries from a fresh read. This keeps a delayed reconciliation
/// tick from clobbering a newer scoreboard.
#[async_trait]
pub trait DuelStore: Send + Sync {
    async fn insert(&self, duel: Duel) -> Result<(), DuelError>;

    async fn find(&self, id: Uuid) -> Result<Duel, DuelError>;

    async fn update(&self, duel: Duel) -> Result<Duel, DuelError>;
}

/// In-memory store backed by a concurrent map. Reference implementation for
/// tests and for embedders that bring no database.
#[derive(Default)]
pub struct MemoryStore {
    duels: DashMap<Uuid, Duel>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DuelStore for MemoryStore {
    async fn insert(&self, duel: Duel) -> Result<(), DuelError> {
        self.duels.insert(duel.id, duel);
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Duel, DuelError> {
        self.duels
            .get(&id)
            .map(|entry| entry.clone())
            .ok_or(DuelError::NotFound(id))
    }

    async fn update(&self, mut duel: Duel) -> Result<Duel, DuelError> {
        let mut entry = self
            .duels
            .get_mut(&duel.id)
            .ok_or(DuelError::NotFound(duel.id))?;
        if entry.version != duel.version {
            return Err(DuelError::Conflict);
        }
        duel.version += 1;
        *entry = duel.clone();
        Ok(duel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DuelRequest, DuelStatus, Platform};

    fn duel() -> Duel {
        Duel::new(&DuelRequest {
            platform: Platform::Cf,
            owner_handle: "alice".into(),
            owner_uid: "uid-1".into(),
            problem_count: 3,
            rating_min: 1000,
            rating_max: 1400,
            time_limit_minutes: 30,
        })
    }

    #[tokio::test]
    async fn find_returns_inserted_duel() {
        let store = MemoryStore::new();
        let duel = duel();
        let id = duel.id;
        store.insert(duel).await.unwrap();
        let found = store.find(id).await.unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.version, 0);
    }

    #[tokio::test]
    async fn find_unknown_id_is_not_found() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();
        assert!(matches!(
            store.find(id).await,
            Err(DuelError::NotFound(missing)) if missing == id
        ));
    }

    #[tokio::test]
    async fn update_bumps_version() {
        let store = MemoryStore::new();
        let duel = duel();
        let id = duel.id;
        store.insert(duel).await.unwrap();

        let mut fresh = store.find(id).await.unwrap();
        fresh.status = DuelStatus::Ready;
        let updated = store.update(fresh).await.unwrap();
        assert_eq!(updated.version, 1);
        assert_eq!(store.find(id).await.unwrap().status, DuelStatus::Ready);
    }

    #[tokio::test]
    async fn stale_update_conflicts() {
        let store = MemoryStore::new();
        let duel = duel();
        let id = duel.id;
        store.insert(duel).await.unwrap();

        let stale = store.find(id).await.unwrap();
        let mut winner = store.find(id).await.unwrap();
        winner.status = DuelStatus::Ready;
        store.update(winner).await.unwrap();

        // The read from before the winning write must not clobber it.
        assert!(matches!(store.update(stale).await, Err(DuelError::Conflict)));
        assert_eq!(store.find(id).await.unwrap().status, DuelStatus::Ready);
    }
}
