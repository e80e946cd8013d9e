//! Per-resolver dispatch between the Nomad and local backends.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::models::{Account, CertificateBundle};

use super::{LocalStore, NomadStore, Store, StoreError};

/// Store sending each resolver to Nomad Variables unless it was routed to
/// the local file with [`route_local`](Self::route_local).
pub struct RoutedStore {
    nomad: NomadStore,
    local: LocalStore,
    local_resolvers: HashSet<String>,
}

impl RoutedStore {
    pub fn new(nomad: NomadStore, local: LocalStore) -> Self {
        Self {
            nomad,
            local,
            local_resolvers: HashSet::new(),
        }
    }

    /// Keep `resolver` in the local file instead of Nomad.
    pub fn route_local(mut self, resolver: impl Into<String>) -> Self {
        self.local_resolvers.insert(resolver.into());
        self
    }

    fn backend(&self, resolver: &str) -> &dyn Store {
        if self.local_resolvers.contains(resolver) {
            &self.local
        } else {
            &self.nomad
        }
    }
}

#[async_trait]
impl Store for RoutedStore {
    async fn get_account(&self, resolver: &str) -> Result<Option<Account>, StoreError> {
        self.backend(resolver).get_account(resolver).await
    }

    async fn save_account(&self, resolver: &str, account: &Account) -> Result<(), StoreError> {
        self.backend(resolver).save_account(resolver, account).await
    }

    async fn get_certificates(
        &self,
        resolver: &str,
    ) -> Result<Vec<CertificateBundle>, StoreError> {
        self.backend(resolver).get_certificates(resolver).await
    }

    async fn save_certificates(
        &self,
        resolver: &str,
        certificates: &[CertificateBundle],
    ) -> Result<(), StoreError> {
        self.backend(resolver)
            .save_certificates(resolver, certificates)
            .await
    }
}
