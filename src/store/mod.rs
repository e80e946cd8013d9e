//! ACME account and certificate persistence.
//!
//! [`NomadStore`] keeps each resolver's state in Nomad Variables behind a
//! write-through cache. [`LocalStore`] is the single-file fallback used when
//! the process is not a Nomad task.

mod local;
mod nomad;
pub mod path;
mod routed;

pub use local::LocalStore;
pub use nomad::NomadStore;
pub use path::{item_path, resolve_variables_path, NOMAD_SCHEME};
pub use routed::RoutedStore;

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::config::ResolvedConfig;
use crate::models::{Account, CertificateBundle};
use crate::placement::PlacementContext;
use crate::variables::VariablesError;

/// The kind of artifact stored for a resolver.
///
/// Doubles as the last path segment and the item key of the variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Account,
    Certificates,
}

impl ItemKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::Account => "account",
            ItemKind::Certificates => "certificates",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The resolver was never bound to a Variables path.
    #[error("no nomad variable set for resolver {resolver:?}")]
    NoVariableForResolver { resolver: String },

    #[error(transparent)]
    Variables(#[from] VariablesError),

    #[error("failed to decode stored {kind}: {source}")]
    Decode {
        kind: ItemKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode {kind}: {source}")]
    Encode {
        kind: ItemKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("local store {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid local store {}: {source}", .path.display())]
    LocalFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Persistence for ACME accounts and certificates, keyed by resolver name.
#[async_trait]
pub trait Store: Send + Sync {
    /// Returns `Ok(None)` if no account was stored for the resolver.
    async fn get_account(&self, resolver: &str) -> Result<Option<Account>, StoreError>;

    async fn save_account(&self, resolver: &str, account: &Account) -> Result<(), StoreError>;

    /// Returns an empty list if no certificates were stored for the resolver.
    async fn get_certificates(
        &self,
        resolver: &str,
    ) -> Result<Vec<CertificateBundle>, StoreError>;

    async fn save_certificates(
        &self,
        resolver: &str,
        certificates: &[CertificateBundle],
    ) -> Result<(), StoreError>;
}

/// Pick the persistence backend for this process.
///
/// Inside a Nomad task every resolver configured with `nomad://` storage is
/// bound and kept in Nomad Variables; resolvers with any other storage are
/// routed to the [`LocalStore`] file. Anywhere else all resolvers share the
/// [`LocalStore`] file.
pub async fn select_store(
    config: &ResolvedConfig,
    placement: &PlacementContext,
) -> Box<dyn Store> {
    let client_config = config.nomad.client_config(placement.token.clone());
    if let Some(store) = NomadStore::maybe_new(placement, client_config) {
        let mut local_resolvers = Vec::new();
        for (resolver, settings) in &config.resolvers {
            if settings.storage.starts_with(NOMAD_SCHEME) {
                store
                    .bind_resolver(resolver, &settings.storage, placement)
                    .await;
            } else {
                tracing::warn!(
                    resolver = %resolver,
                    storage = %settings.storage,
                    path = %config.local_store_path.display(),
                    "Resolver storage is not a nomad:// path; keeping it in the local store"
                );
                local_resolvers.push(resolver.clone());
            }
        }
        tracing::info!(
            resolvers = config.resolvers.len(),
            local = local_resolvers.len(),
            "Using Nomad Variables for ACME storage"
        );
        if local_resolvers.is_empty() {
            return Box::new(store);
        }
        let routed = local_resolvers.into_iter().fold(
            RoutedStore::new(store, LocalStore::new(&config.local_store_path)),
            RoutedStore::route_local,
        );
        return Box::new(routed);
    }

    tracing::info!(
        path = %config.local_store_path.display(),
        "Not running as a Nomad task; using local ACME storage"
    );
    Box::new(LocalStore::new(&config.local_store_path))
}
