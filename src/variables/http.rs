//! Nomad HTTP API client for Variables.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::{Variable, VariableItems, VariablesApi, VariablesError};

pub const DEFAULT_NOMAD_ADDR: &str = "http://127.0.0.1:4646";

const ENV_NOMAD_ADDR: &str = "NOMAD_ADDR";
const ENV_NOMAD_NAMESPACE: &str = "NOMAD_NAMESPACE";
const ENV_NOMAD_REGION: &str = "NOMAD_REGION";

/// Connection settings for the Nomad agent.
#[derive(Debug, Clone)]
pub struct NomadClientConfig {
    pub address: String,
    pub token: Option<SecretString>,
    pub namespace: Option<String>,
    pub region: Option<String>,
}

impl Default for NomadClientConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_NOMAD_ADDR.to_string(),
            token: None,
            namespace: None,
            region: None,
        }
    }
}

impl NomadClientConfig {
    /// Read `NOMAD_ADDR`, `NOMAD_NAMESPACE` and `NOMAD_REGION`.
    ///
    /// The token is not read here; it comes from the task placement.
    pub fn from_env() -> Self {
        let var = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());
        Self {
            address: var(ENV_NOMAD_ADDR).unwrap_or_else(|| DEFAULT_NOMAD_ADDR.to_string()),
            token: None,
            namespace: var(ENV_NOMAD_NAMESPACE),
            region: var(ENV_NOMAD_REGION),
        }
    }

    pub fn with_token(mut self, token: Option<SecretString>) -> Self {
        self.token = token;
        self
    }
}

#[derive(Debug, Deserialize)]
struct VariableResponse {
    #[serde(rename = "Items", default)]
    items: VariableItems,
}

/// [`VariablesApi`] over the Nomad HTTP API (`/v1/var/<path>`).
#[derive(Debug, Clone)]
pub struct HttpVariablesClient {
    client: Client,
    config: NomadClientConfig,
}

impl HttpVariablesClient {
    pub fn new(config: NomadClientConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Creates a client with a custom HTTP client.
    pub fn with_client(config: NomadClientConfig, client: Client) -> Self {
        Self { client, config }
    }

    /// Each path segment is percent-encoded, so `?` or `#` in a path stay
    /// part of it.
    fn url(&self, path: &str) -> String {
        let path = path
            .trim_start_matches('/')
            .split('/')
            .map(urlencoding::encode)
            .collect::<Vec<_>>()
            .join("/");
        format!(
            "{}/v1/var/{}",
            self.config.address.trim_end_matches('/'),
            path
        )
    }

    fn authorize(&self, mut request: RequestBuilder) -> RequestBuilder {
        if let Some(token) = &self.config.token {
            request = request.header("X-Nomad-Token", token.expose_secret());
        }
        if let Some(namespace) = &self.config.namespace {
            request = request.query(&[("namespace", namespace)]);
        }
        if let Some(region) = &self.config.region {
            request = request.query(&[("region", region)]);
        }
        request
    }

    async fn check_status(response: Response) -> Result<Response, VariablesError> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(VariablesError::PathNotFound);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(VariablesError::Status {
                status: status.as_u16(),
                message: message.trim().to_string(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl VariablesApi for HttpVariablesClient {
    async fn create(&self, variable: &Variable) -> Result<(), VariablesError> {
        let request = self.client.put(self.url(&variable.path)).json(variable);
        let response = self.authorize(request).send().await?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn get_variable_items(&self, path: &str) -> Result<VariableItems, VariablesError> {
        let request = self.client.get(self.url(path));
        let response = self.authorize(request).send().await?;
        let body = Self::check_status(response).await?.bytes().await?;
        let variable: VariableResponse =
            serde_json::from_slice(&body).map_err(VariablesError::Decode)?;
        Ok(variable.items)
    }
}
