//! Nomad Variables backed ACME store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::models::{Account, CertificateBundle};
use crate::placement::PlacementContext;
use crate::variables::{HttpVariablesClient, NomadClientConfig, Variable, VariablesApi};

use super::path::{item_path, resolve_variables_path};
use super::{ItemKind, Store, StoreError};

/// Store persisting ACME state as Nomad Variables.
///
/// Every resolver must be bound to a Variables path with
/// [`bind_resolver`](Self::bind_resolver) before use. Reads are served from
/// an in-memory cache once a value has been fetched or saved; saves update
/// the cache first and then overwrite the variable.
///
/// One lock guards the caches and bindings and is held across the Nomad
/// call, so all operations on a store are serialized.
pub struct NomadStore {
    client: Arc<dyn VariablesApi>,
    state: Mutex<NomadState>,
}

#[derive(Default)]
struct NomadState {
    accounts: HashMap<String, Account>,
    certificates: HashMap<String, Vec<CertificateBundle>>,
    /// Resolver name to Variables path.
    paths: HashMap<String, String>,
}

impl NomadState {
    fn item_path(&self, resolver: &str, kind: ItemKind) -> Result<String, StoreError> {
        match self.paths.get(resolver) {
            Some(base) if !base.is_empty() => Ok(item_path(base, kind)),
            _ => Err(StoreError::NoVariableForResolver {
                resolver: resolver.to_string(),
            }),
        }
    }
}

impl NomadStore {
    /// Create a store using `client` for all Nomad calls.
    pub fn new(client: Arc<dyn VariablesApi>) -> Self {
        Self {
            client,
            state: Mutex::new(NomadState::default()),
        }
    }

    /// Create a store if this process runs as a Nomad task.
    ///
    /// Returns `None` unless the placement carries both a token and a
    /// secrets directory; callers should fall back to another backend then.
    pub fn maybe_new(placement: &PlacementContext, client: NomadClientConfig) -> Option<Self> {
        if !placement.is_nomad_task() {
            return None;
        }
        let client = client.with_token(placement.token.clone());
        Some(Self::new(Arc::new(HttpVariablesClient::new(client))))
    }

    /// [`maybe_new`](Self::maybe_new) with placement and client settings
    /// read from the environment.
    pub fn maybe_from_env() -> Option<Self> {
        Self::maybe_new(&PlacementContext::from_env(), NomadClientConfig::from_env())
    }

    /// Replace the Nomad client. Only meaningful before the store is shared.
    pub fn with_client(mut self, client: Arc<dyn VariablesApi>) -> Self {
        self.client = client;
        self
    }

    /// Associate a resolver with the Variables path its state is kept under.
    ///
    /// `variables_path` is either `nomad://<path>` or `nomad://` to derive a
    /// path from the task placement. Each resolver should get its own path.
    pub async fn bind_resolver(
        &self,
        resolver: &str,
        variables_path: &str,
        placement: &PlacementContext,
    ) {
        let path = resolve_variables_path(resolver, variables_path, placement);
        tracing::debug!(resolver, path = %path, "Binding resolver to nomad variables path");

        let mut state = self.state.lock().await;
        state.paths.insert(resolver.to_string(), path);
    }

    /// [`bind_resolver`](Self::bind_resolver) using the placement of the
    /// current environment.
    pub async fn set_resolver(&self, resolver: &str, variables_path: &str) {
        self.bind_resolver(resolver, variables_path, &PlacementContext::from_env())
            .await;
    }

    /// The Variables path a resolver is bound to, if any.
    pub async fn bound_path(&self, resolver: &str) -> Option<String> {
        self.state.lock().await.paths.get(resolver).cloned()
    }

    async fn put<T>(&self, path: &str, kind: ItemKind, item: &T) -> Result<(), StoreError>
    where
        T: Serialize + Sync + ?Sized,
    {
        tracing::trace!(path, kind = %kind, "Writing nomad variable");

        let payload =
            serde_json::to_string(item).map_err(|source| StoreError::Encode { kind, source })?;
        let variable = Variable::single(path, kind.as_str(), payload);
        self.client.create(&variable).await?;
        Ok(())
    }

    /// Fetch and decode a variable item. `Ok(None)` if the path holds nothing.
    async fn get<T>(&self, path: &str, kind: ItemKind) -> Result<Option<T>, StoreError>
    where
        T: DeserializeOwned,
    {
        tracing::trace!(path, kind = %kind, "Reading nomad variable");

        let items = match self.client.get_variable_items(path).await {
            Ok(items) => items,
            Err(err) if err.is_not_found() => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let payload = items.get(kind.as_str()).map(String::as_str).unwrap_or("");
        serde_json::from_str(payload)
            .map(Some)
            .map_err(|source| StoreError::Decode { kind, source })
    }
}

#[async_trait]
impl Store for NomadStore {
    async fn get_account(&self, resolver: &str) -> Result<Option<Account>, StoreError> {
        let mut state = self.state.lock().await;

        if let Some(account) = state.accounts.get(resolver) {
            return Ok(Some(account.clone()));
        }

        let path = state.item_path(resolver, ItemKind::Account)?;
        tracing::debug!(resolver, path = %path, "Fetching ACME account from nomad");

        let Some(account) = self.get::<Account>(&path, ItemKind::Account).await? else {
            return Ok(None);
        };

        state
            .accounts
            .insert(resolver.to_string(), account.clone());
        Ok(Some(account))
    }

    async fn save_account(&self, resolver: &str, account: &Account) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;

        state
            .accounts
            .insert(resolver.to_string(), account.clone());

        let path = state.item_path(resolver, ItemKind::Account)?;
        tracing::debug!(
            resolver,
            path = %path,
            email = %account.email,
            "Saving ACME account to nomad"
        );

        self.put(&path, ItemKind::Account, account).await
    }

    async fn get_certificates(
        &self,
        resolver: &str,
    ) -> Result<Vec<CertificateBundle>, StoreError> {
        let mut state = self.state.lock().await;

        if let Some(certificates) = state.certificates.get(resolver) {
            return Ok(certificates.clone());
        }

        let path = state.item_path(resolver, ItemKind::Certificates)?;
        tracing::debug!(resolver, path = %path, "Fetching ACME certificates from nomad");

        let Some(certificates) = self
            .get::<Vec<CertificateBundle>>(&path, ItemKind::Certificates)
            .await?
        else {
            return Ok(Vec::new());
        };

        // An empty list is cached too, so it is not fetched again.
        state
            .certificates
            .insert(resolver.to_string(), certificates.clone());
        Ok(certificates)
    }

    async fn save_certificates(
        &self,
        resolver: &str,
        certificates: &[CertificateBundle],
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;

        state
            .certificates
            .insert(resolver.to_string(), certificates.to_vec());

        let path = state.item_path(resolver, ItemKind::Certificates)?;
        tracing::debug!(
            resolver,
            path = %path,
            count = certificates.len(),
            "Saving ACME certificates to nomad"
        );

        self.put(&path, ItemKind::Certificates, certificates).await
    }
}
