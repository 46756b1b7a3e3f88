use crate::ids::UserLoginId;
use crate::store::error::Result;
use crate::xrpc::AuthInfo;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Credentials and sync position of one login.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLoginMetadata {
    /// Base URL of the account's personal data server.
    pub host: String,
    pub auth: AuthInfo,
    /// Opaque getLog position; empty until the first batch with a cursor.
    #[serde(default)]
    pub cursor: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteProfile {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedLogin {
    pub id: UserLoginId,
    pub remote_name: String,
    #[serde(default)]
    pub remote_profile: RemoteProfile,
    pub metadata: UserLoginMetadata,
}

#[async_trait]
pub trait LoginStore: Send + Sync {
    async fn save(&self, login: &PersistedLogin) -> Result<()>;
    async fn load(&self, id: &UserLoginId) -> Result<Option<PersistedLogin>>;
    async fn delete(&self, id: &UserLoginId) -> Result<()>;
    async fn list(&self) -> Result<Vec<PersistedLogin>>;
}
