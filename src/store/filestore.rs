use bskycore::ids::UserLoginId;
use bskycore::store::error::{Result, StoreError};
use bskycore::store::{LoginStore, PersistedLogin};
use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Stores each login as `logins/<sanitized id>.json` under a base directory.
pub struct FileStore {
    base_path: PathBuf,
}

impl FileStore {
    pub async fn new(path: impl Into<PathBuf>) -> io::Result<Self> {
        let base_path = path.into();
        let store = Self { base_path };

        fs::create_dir_all(store.logins_dir()).await?;

        Ok(store)
    }

    fn logins_dir(&self) -> PathBuf {
        self.base_path.join("logins")
    }

    fn sanitize_filename(key: &str) -> String {
        key.replace(|c: char| !c.is_alphanumeric() && c != '.' && c != '-', "_")
    }

    fn login_path(&self, id: &UserLoginId) -> PathBuf {
        self.logins_dir()
            .join(format!("{}.json", Self::sanitize_filename(id.as_str())))
    }

    async fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>> {
        match fs::read(path).await {
            Ok(data) => serde_json::from_slice(&data)
                .map(Some)
                .map_err(|e| StoreError::Serialization(e.to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let data = serde_json::to_vec_pretty(value)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, data).await?;
        fs::rename(&tmp, path).await.map_err(StoreError::Io)
    }
}

#[async_trait]
impl LoginStore for FileStore {
    async fn save(&self, login: &PersistedLogin) -> Result<()> {
        self.write_json(&self.login_path(&login.id), login).await
    }

    async fn load(&self, id: &UserLoginId) -> Result<Option<PersistedLogin>> {
        self.read_json(&self.login_path(id)).await
    }

    async fn delete(&self, id: &UserLoginId) -> Result<()> {
        fs::remove_file(self.login_path(id))
            .await
            .or_else(|e| {
                if e.kind() == io::ErrorKind::NotFound {
                    Ok(())
                } else {
                    Err(e)
                }
            })
            .map_err(StoreError::Io)
    }

    async fn list(&self) -> Result<Vec<PersistedLogin>> {
        let mut logins = Vec::new();
        let mut entries = fs::read_dir(self.logins_dir()).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json")
                && let Some(login) = self.read_json::<PersistedLogin>(&path).await?
            {
                logins.push(login);
            }
        }
        logins.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(logins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bskycore::store::{RemoteProfile, UserLoginMetadata};
    use bskycore::xrpc::AuthInfo;
    use tempfile::TempDir;

    fn login(did: &str, cursor: &str) -> PersistedLogin {
        PersistedLogin {
            id: UserLoginId::new(did),
            remote_name: "alice.test".into(),
            remote_profile: RemoteProfile {
                email: "alice@example.com".into(),
                username: "alice.test".into(),
            },
            metadata: UserLoginMetadata {
                host: "https://pds.example".into(),
                auth: AuthInfo {
                    access_jwt: "a".into(),
                    refresh_jwt: "r".into(),
                    handle: "alice.test".into(),
                    did: did.into(),
                },
                cursor: cursor.into(),
            },
        }
    }

    #[tokio::test]
    async fn persists_across_instances() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path()).await.unwrap();
        store.save(&login("did:plc:alice", "c1")).await.unwrap();
        store.save(&login("did:plc:alice", "c2")).await.unwrap();

        let reopened = FileStore::new(dir.path()).await.unwrap();
        let loaded = reopened
            .load(&UserLoginId::new("did:plc:alice"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded, login("did:plc:alice", "c2"));
        assert!(dir.path().join("logins/did_plc_alice.json").exists());
    }

    #[tokio::test]
    async fn list_and_delete() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path()).await.unwrap();
        store.save(&login("did:plc:b", "")).await.unwrap();
        store.save(&login("did:plc:a", "")).await.unwrap();

        let ids: Vec<_> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.id.0)
            .collect();
        assert_eq!(ids, vec!["did:plc:a", "did:plc:b"]);

        store.delete(&UserLoginId::new("did:plc:a")).await.unwrap();
        store.delete(&UserLoginId::new("did:plc:a")).await.unwrap();
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_login_is_none() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path()).await.unwrap();
        assert!(
            store
                .load(&UserLoginId::new("did:plc:nobody"))
                .await
                .unwrap()
                .is_none()
        );
    }
}
