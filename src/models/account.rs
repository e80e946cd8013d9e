use serde::{Deserialize, Serialize};

use super::bytes::{base64_bytes, nullable_vec};

/// An ACME account registered for one resolver.
///
/// The registration is opaque to the store and passed through as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    #[serde(rename = "Email", alias = "email", default)]
    pub email: String,

    #[serde(rename = "Registration", alias = "registration", default)]
    pub registration: Option<Registration>,

    /// Raw private key bytes.
    #[serde(
        rename = "PrivateKey",
        alias = "privateKey",
        with = "base64_bytes",
        default
    )]
    pub private_key: Vec<u8>,

    #[serde(rename = "KeyType", alias = "keyType", default)]
    pub key_type: KeyType,
}

impl Account {
    pub fn new(email: impl Into<String>, private_key: Vec<u8>, key_type: KeyType) -> Self {
        Self {
            email: email.into(),
            registration: None,
            private_key,
            key_type,
        }
    }

    pub fn with_registration(mut self, registration: Registration) -> Self {
        self.registration = Some(registration);
        self
    }
}

/// Registration resource returned by the ACME directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    #[serde(rename = "Body", alias = "body", default)]
    pub body: RegistrationBody,

    #[serde(rename = "URI", alias = "uri", default)]
    pub uri: String,
}

/// The account object as the ACME server describes it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationBody {
    #[serde(default)]
    pub status: String,

    #[serde(default, deserialize_with = "nullable_vec")]
    pub contact: Vec<String>,

    #[serde(default)]
    pub terms_of_service_agreed: bool,

    /// Any other fields the server returned (`orders`,
    /// `externalAccountBinding`, ...), kept so they survive a save.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Key algorithm tag (e.g. `EC256`, `RSA4096`). Opaque to the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyType(pub String);

impl KeyType {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for KeyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
