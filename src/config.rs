use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::store::NOMAD_SCHEME;
use crate::variables::NomadClientConfig;

const CONFIG_FILE_NAME: &str = "nomad-acme-store.toml";
const DEFAULT_LOCAL_STORE: &str = "acme.json";

/// Default storage for a resolver: a path derived from the task placement.
fn default_storage() -> String {
    NOMAD_SCHEME.to_string()
}

/// Nomad agent connection settings.
///
/// Unset fields fall back to `NOMAD_ADDR`, `NOMAD_NAMESPACE` and
/// `NOMAD_REGION`. The token is never configured here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NomadConfig {
    /// Agent address, e.g. `http://127.0.0.1:4646`.
    pub address: Option<String>,

    pub namespace: Option<String>,

    pub region: Option<String>,
}

impl NomadConfig {
    /// Build client settings, layering this config over the environment.
    pub fn client_config(&self, token: Option<SecretString>) -> NomadClientConfig {
        let mut client = NomadClientConfig::from_env().with_token(token);
        if let Some(address) = &self.address {
            client.address = address.clone();
        }
        if self.namespace.is_some() {
            client.namespace = self.namespace.clone();
        }
        if self.region.is_some() {
            client.region = self.region.clone();
        }
        client
    }
}

/// Local fallback store settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    /// Path of the JSON store file. If relative, resolved from the config
    /// file location. Defaults to `acme.json` next to the config file.
    pub path: Option<PathBuf>,
}

/// Per-resolver settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// `nomad://<path>` for an explicit Variables path, `nomad://` to derive
    /// one from the task placement.
    #[serde(default = "default_storage")]
    pub storage: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            storage: default_storage(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub nomad: NomadConfig,

    pub local: LocalConfig,

    /// Resolver name to its storage settings.
    pub resolvers: BTreeMap<String, ResolverConfig>,
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load config from a file, or return default config if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Resolve the local store file path relative to `config_dir`.
    pub fn resolve_local_store(&self, config_dir: &Path) -> PathBuf {
        match &self.local.path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => config_dir.join(path),
            None => config_dir.join(DEFAULT_LOCAL_STORE),
        }
    }
}

/// Loaded configuration with resolved paths.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The resolved local store file.
    pub local_store_path: PathBuf,

    pub nomad: NomadConfig,

    pub resolvers: BTreeMap<String, ResolverConfig>,
}

/// Returns the default config file path.
///
/// Resolution order:
/// 1. `./nomad-acme-store.toml` if it exists in current directory
/// 2. `~/.local/share/nomad-acme-store/nomad-acme-store.toml` (XDG data directory)
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from(CONFIG_FILE_NAME);
    if local_config.exists() {
        return local_config;
    }

    if let Some(data_dir) = dirs::data_dir() {
        return data_dir.join("nomad-acme-store").join(CONFIG_FILE_NAME);
    }

    local_config
}

impl ResolvedConfig {
    /// Load and resolve config from a file path.
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_path = config_path
            .canonicalize()
            .with_context(|| format!("Config file not found: {}", config_path.display()))?;

        let config_dir = config_path
            .parent()
            .context("Config file has no parent directory")?;

        let config = Config::load(&config_path)?;
        Ok(Self::resolve(config, config_dir))
    }

    /// Load config, falling back to defaults if the file doesn't exist.
    ///
    /// Without a file, the local store lives in the config file's intended
    /// parent directory.
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            return Self::load(config_path);
        }

        let config_path = if config_path.is_relative() {
            std::env::current_dir()
                .context("Failed to get current directory")?
                .join(config_path)
        } else {
            config_path.to_path_buf()
        };
        let config_dir = config_path
            .parent()
            .context("Config path has no parent directory")?;

        Ok(Self::resolve(Config::default(), config_dir))
    }

    fn resolve(config: Config, config_dir: &Path) -> Self {
        Self {
            local_store_path: config.resolve_local_store(config_dir),
            nomad: config.nomad,
            resolvers: config.resolvers,
        }
    }
}
