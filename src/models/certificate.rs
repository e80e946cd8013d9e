use serde::{Deserialize, Serialize};

use super::bytes::{base64_bytes, nullable_vec};

/// Domains a certificate was issued for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    #[serde(rename = "Main", alias = "main", default)]
    pub main: String,

    /// Subject alternative names.
    #[serde(
        rename = "SANs",
        alias = "sans",
        default,
        deserialize_with = "nullable_vec"
    )]
    pub sans: Vec<String>,
}

impl Domain {
    pub fn new(main: impl Into<String>) -> Self {
        Self {
            main: main.into(),
            sans: Vec::new(),
        }
    }

    pub fn with_sans<I, S>(mut self, sans: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sans = sans.into_iter().map(Into::into).collect();
        self
    }
}

/// An issued certificate with its private key and target certificate store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateBundle {
    #[serde(rename = "Domain", alias = "domain", default)]
    pub domain: Domain,

    /// PEM certificate chain.
    #[serde(
        rename = "Certificate",
        alias = "certificate",
        with = "base64_bytes",
        default
    )]
    pub certificate: Vec<u8>,

    /// PEM private key.
    #[serde(rename = "Key", alias = "key", with = "base64_bytes", default)]
    pub key: Vec<u8>,

    /// Label of the certificate store this bundle belongs to.
    #[serde(rename = "Store", alias = "store", default)]
    pub store: String,
}

impl CertificateBundle {
    pub fn new(
        domain: Domain,
        certificate: Vec<u8>,
        key: Vec<u8>,
        store: impl Into<String>,
    ) -> Self {
        Self {
            domain,
            certificate,
            key,
            store: store.into(),
        }
    }

    /// A bundle without certificate or key material cannot be served.
    pub fn is_empty(&self) -> bool {
        self.certificate.is_empty() || self.key.is_empty()
    }
}
