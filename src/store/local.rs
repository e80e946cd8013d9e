//! Single-file JSON ACME store.
//!
//! File layout, one entry per resolver:
//! ```text
//! {
//!   "<resolver>": {
//!     "Account": { ... },
//!     "Certificates": [ ... ]
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::{Mutex, MutexGuard};

use crate::models::bytes::nullable_vec;
use crate::models::{Account, CertificateBundle};

use super::{Store, StoreError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ResolverEntry {
    #[serde(rename = "Account", default)]
    account: Option<Account>,
    #[serde(rename = "Certificates", default, deserialize_with = "nullable_vec")]
    certificates: Vec<CertificateBundle>,
}

type Entries = BTreeMap<String, ResolverEntry>;

/// ACME store keeping every resolver in one local JSON file.
///
/// The file is read on first access and rewritten on every save.
pub struct LocalStore {
    path: PathBuf,
    entries: Mutex<Option<Entries>>,
}

impl LocalStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            entries: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    async fn load(&self) -> Result<Entries, StoreError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Entries::new()),
            Err(e) => return Err(self.io_error(e)),
        };
        if content.trim().is_empty() {
            return Ok(Entries::new());
        }
        serde_json::from_str(&content).map_err(|source| StoreError::LocalFormat {
            path: self.path.clone(),
            source,
        })
    }

    async fn persist(&self, entries: &Entries) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| self.io_error(e))?;
            }
        }

        let content =
            serde_json::to_vec_pretty(entries).map_err(|source| StoreError::LocalFormat {
                path: self.path.clone(),
                source,
            })?;
        fs::write(&self.path, content)
            .await
            .map_err(|e| self.io_error(e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(|e| self.io_error(e))?;
        }

        tracing::debug!(path = %self.path.display(), "Wrote local ACME store");
        Ok(())
    }

    /// Lock the entries, reading the file on first access.
    async fn lock_loaded(&self) -> Result<MutexGuard<'_, Option<Entries>>, StoreError> {
        let mut guard = self.entries.lock().await;
        if guard.is_none() {
            *guard = Some(self.load().await?);
        }
        Ok(guard)
    }
}

#[async_trait]
impl Store for LocalStore {
    async fn get_account(&self, resolver: &str) -> Result<Option<Account>, StoreError> {
        let mut guard = self.lock_loaded().await?;
        let entries = guard.get_or_insert_with(Entries::new);
        Ok(entries.get(resolver).and_then(|e| e.account.clone()))
    }

    async fn save_account(&self, resolver: &str, account: &Account) -> Result<(), StoreError> {
        let mut guard = self.lock_loaded().await?;
        let entries = guard.get_or_insert_with(Entries::new);
        entries.entry(resolver.to_string()).or_default().account = Some(account.clone());
        self.persist(entries).await
    }

    async fn get_certificates(
        &self,
        resolver: &str,
    ) -> Result<Vec<CertificateBundle>, StoreError> {
        let mut guard = self.lock_loaded().await?;
        let entries = guard.get_or_insert_with(Entries::new);

        // Bundles without certificate or key material are skipped.
        Ok(entries
            .get(resolver)
            .map(|e| {
                e.certificates
                    .iter()
                    .filter(|c| !c.is_empty())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn save_certificates(
        &self,
        resolver: &str,
        certificates: &[CertificateBundle],
    ) -> Result<(), StoreError> {
        let mut guard = self.lock_loaded().await?;
        let entries = guard.get_or_insert_with(Entries::new);
        entries.entry(resolver.to_string()).or_default().certificates = certificates.to_vec();
        self.persist(entries).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Domain, KeyType};
    use tempfile::TempDir;

    fn cert(main: &str, certificate: &[u8], key: &[u8]) -> CertificateBundle {
        CertificateBundle::new(Domain::new(main), certificate.to_vec(), key.to_vec(), "default")
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let store = LocalStore::new(dir.path().join("acme.json"));

        assert!(store.get_account("le").await?.is_none());
        assert!(store.get_certificates("le").await?.is_empty());
        assert!(!store.path().exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_saves_persist_across_instances() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("nested").join("acme.json");
        let account = Account::new("test@example.com", vec![1, 2, 3], KeyType::new("EC256"));

        let store = LocalStore::new(&path);
        store.save_account("le", &account).await?;
        store
            .save_certificates("le", &[cert("example.com", b"cert", b"key")])
            .await?;

        let reopened = LocalStore::new(&path);
        assert_eq!(reopened.get_account("le").await?, Some(account));
        assert_eq!(reopened.get_certificates("le").await?.len(), 1);
        assert!(reopened.get_account("other").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_bundles_are_dropped_on_read() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let store = LocalStore::new(dir.path().join("acme.json"));
        store
            .save_certificates(
                "le",
                &[
                    cert("a.example", b"cert", b"key"),
                    cert("b.example", b"", b"key"),
                    cert("c.example", b"cert", b""),
                ],
            )
            .await?;

        let certs = store.get_certificates("le").await?;
        assert_eq!(certs.len(), 1);
        assert_eq!(certs[0].domain.main, "a.example");
        Ok(())
    }

    #[tokio::test]
    async fn test_reads_traditional_layout() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("acme.json");
        std::fs::write(
            &path,
            r#"{
  "le": {
    "Account": {"Email": "a@b.c", "Registration": null, "PrivateKey": "AQI=", "KeyType": "4096"},
    "Certificates": [
      {"domain": {"main": "x.example", "sans": null}, "certificate": "Yw==", "key": "aw==", "Store": "default"}
    ]
  },
  "empty": {"Account": null, "Certificates": null}
}"#,
        )?;

        let store = LocalStore::new(&path);
        let account = store.get_account("le").await?.expect("account");
        assert_eq!(account.email, "a@b.c");
        assert_eq!(account.private_key, vec![1, 2]);

        let certs = store.get_certificates("le").await?;
        assert_eq!(certs[0].domain.main, "x.example");
        assert_eq!(certs[0].certificate, b"c".to_vec());
        assert!(store.get_certificates("empty").await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_file_is_an_error() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("acme.json");
        std::fs::write(&path, "{not json")?;

        let err = LocalStore::new(&path).get_account("le").await.unwrap_err();
        assert!(matches!(err, StoreError::LocalFormat { .. }));
        Ok(())
    }
}
