//! Nomad Variables client boundary.
//!
//! The store only needs two calls from Nomad: overwrite a variable and read a
//! variable's items. [`VariablesApi`] is that subset, so the HTTP client can
//! be swapped for [`MemoryVariables`] in tests.

mod http;
mod memory;

pub use http::{HttpVariablesClient, NomadClientConfig, DEFAULT_NOMAD_ADDR};
pub use memory::MemoryVariables;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Items stored in one Nomad Variable, keyed by item name.
pub type VariableItems = HashMap<String, String>;

/// A Nomad Variable: a path and the complete set of items stored there.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    #[serde(rename = "Path")]
    pub path: String,
    #[serde(rename = "Items", default)]
    pub items: VariableItems,
}

impl Variable {
    /// A variable holding exactly one item.
    pub fn single(
        path: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        let mut items = VariableItems::new();
        items.insert(key.into(), value.into());
        Self {
            path: path.into(),
            items,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum VariablesError {
    #[error("variable not found")]
    PathNotFound,

    #[error("nomad request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("nomad returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid nomad response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl VariablesError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::PathNotFound)
    }
}

/// The subset of the Nomad Variables API used to persist ACME state.
#[async_trait]
pub trait VariablesApi: Send + Sync {
    /// Create or overwrite the variable at `variable.path`.
    ///
    /// The stored item set is replaced entirely; items are never merged.
    async fn create(&self, variable: &Variable) -> Result<(), VariablesError>;

    /// Read the items of the variable at `path`.
    ///
    /// Returns [`VariablesError::PathNotFound`] if nothing is stored there.
    async fn get_variable_items(&self, path: &str) -> Result<VariableItems, VariablesError>;
}
