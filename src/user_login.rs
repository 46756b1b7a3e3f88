use bskycore::ids::UserLoginId;
use bskycore::store::error::Result;
use bskycore::store::{LoginStore, PersistedLogin, UserLoginMetadata};
use bskycore::types::events::{EventSink, RemoteEvent};
use bskycore::types::state::{BridgeState, BridgeStateSink};
use std::sync::Arc;
use tokio::sync::Mutex;

/// One logged-in account: its persisted record plus the sinks the rest of
/// the bridge listens on. All mutations go through [`UserLogin::update`]
/// and are written back with [`UserLogin::save`].
pub struct UserLogin {
    pub id: UserLoginId,
    record: Mutex<PersistedLogin>,
    store: Arc<dyn LoginStore>,
    events: Arc<dyn EventSink>,
    bridge_state: Arc<dyn BridgeStateSink>,
}

impl UserLogin {
    pub fn new(
        record: PersistedLogin,
        store: Arc<dyn LoginStore>,
        events: Arc<dyn EventSink>,
        bridge_state: Arc<dyn BridgeStateSink>,
    ) -> Self {
        Self {
            id: record.id.clone(),
            record: Mutex::new(record),
            store,
            events,
            bridge_state,
        }
    }

    pub async fn snapshot(&self) -> PersistedLogin {
        self.record.lock().await.clone()
    }

    pub async fn metadata(&self) -> UserLoginMetadata {
        self.record.lock().await.metadata.clone()
    }

    pub async fn update<R>(&self, f: impl FnOnce(&mut PersistedLogin) -> R) -> R {
        f(&mut *self.record.lock().await)
    }

    pub async fn save(&self) -> Result<()> {
        let snapshot = self.snapshot().await;
        self.store.save(&snapshot).await
    }

    pub fn queue_remote_event(&self, event: RemoteEvent) {
        self.events.queue_remote_event(event);
    }

    pub fn send_state(&self, state: BridgeState) {
        self.bridge_state.send_state(state);
    }
}

impl std::fmt::Debug for UserLogin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserLogin").field("id", &self.id).finish()
    }
}
