#![forbid(unsafe_code)]

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::require_non_empty;
use crate::{ContractViolation, Validate};

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

const PEM_BEGIN_MARKER: &str = "-----BEGIN";
const PEM_PRIVATE_KEY_MARKER: &str = "PRIVATE KEY-----";

/// Cloud-messaging service credential. Field names follow a downloaded
/// service-account key file so the file can be stored as-is.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceCredential {
    pub project_id: String,
    #[serde(rename = "private_key")]
    pub private_key_pem: String,
    pub client_email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_uri: Option<String>,
}

impl ServiceCredential {
    pub fn from_json(raw: &str) -> Result<Self, ContractViolation> {
        let credential: Self =
            serde_json::from_str(raw).map_err(|err| ContractViolation::Malformed {
                field: "service_credential",
                detail: err.to_string(),
            })?;
        credential.validate()?;
        Ok(credential)
    }

    /// The credential's own `token_uri`, unless it is missing or blank.
    pub fn token_uri_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.token_uri
            .as_deref()
            .map(str::trim)
            .filter(|uri| !uri.is_empty())
            .unwrap_or(default)
    }
}

impl Validate for ServiceCredential {
    fn validate(&self) -> Result<(), ContractViolation> {
        require_non_empty(&self.project_id, "service_credential.project_id")?;
        require_non_empty(&self.private_key_pem, "service_credential.private_key")?;
        require_non_empty(&self.client_email, "service_credential.client_email")?;
        if !self.private_key_pem.contains(PEM_BEGIN_MARKER)
            || !self.private_key_pem.contains(PEM_PRIVATE_KEY_MARKER)
        {
            return Err(ContractViolation::InvalidValue {
                field: "service_credential.private_key",
                reason: "must be a PEM encoded private key",
            });
        }
        Ok(())
    }
}

impl fmt::Debug for ServiceCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceCredential")
            .field("project_id", &self.project_id)
            .field("private_key_pem", &"<redacted>")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("client_id", &self.client_id)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

/// Everything needed to wake the remote device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushConfig {
    pub service_credential: ServiceCredential,
    pub device_token: String,
}

impl PushConfig {
    pub fn v1(
        service_credential: ServiceCredential,
        device_token: impl Into<String>,
    ) -> Result<Self, ContractViolation> {
        let config = Self {
            service_credential,
            device_token: device_token.into().trim().to_string(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(raw: &str) -> Result<Self, ContractViolation> {
        let config: Self = serde_json::from_str(raw).map_err(|err| ContractViolation::Malformed {
            field: "push_config",
            detail: err.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ContractViolation> {
        serde_json::to_string(self).map_err(|err| ContractViolation::Malformed {
            field: "push_config",
            detail: err.to_string(),
        })
    }
}

impl Validate for PushConfig {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.service_credential.validate()?;
        require_non_empty(&self.device_token, "push_config.device_token")
    }
}

/// Process-lifetime bearer token cache entry. Never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct CachedAccessToken {
    pub subject_email: String,
    pub token: String,
    pub expires_at_unix_ms: u64,
}

impl CachedAccessToken {
    pub fn is_live_for(&self, subject_email: &str, now_unix_ms: u64) -> bool {
        self.subject_email == subject_email && now_unix_ms < self.expires_at_unix_ms
    }
}

impl fmt::Debug for CachedAccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedAccessToken")
            .field("subject_email", &self.subject_email)
            .field("token", &"<redacted>")
            .field("expires_at_unix_ms", &self.expires_at_unix_ms)
            .finish()
    }
}
