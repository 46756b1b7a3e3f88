use crate::ids::UserLoginId;
use crate::store::error::Result;
use crate::store::traits::{LoginStore, PersistedLogin};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryLoginStore {
    logins: RwLock<BTreeMap<UserLoginId, PersistedLogin>>,
    saves: AtomicUsize,
}

impl MemoryLoginStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `save` calls so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LoginStore for MemoryLoginStore {
    async fn save(&self, login: &PersistedLogin) -> Result<()> {
        self.logins
            .write()
            .await
            .insert(login.id.clone(), login.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn load(&self, id: &UserLoginId) -> Result<Option<PersistedLogin>> {
        Ok(self.logins.read().await.get(id).cloned())
    }

    async fn delete(&self, id: &UserLoginId) -> Result<()> {
        self.logins.write().await.remove(id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<PersistedLogin>> {
        Ok(self.logins.read().await.values().cloned().collect())
    }
}
