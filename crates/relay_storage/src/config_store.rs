#![forbid(unsafe_code)]

use relay_engines::credential_vault;
use relay_kernel_contracts::envelope::EncryptedEnvelope;
use relay_kernel_contracts::push::PushConfig;
use relay_kernel_contracts::{ContractViolation, Validate};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::kv::{KeyValueStore, KvError};

pub const PUSH_CONFIG_KEY: &str = "ussd_relay.push_config";
pub const PUSH_CONFIG_SESSION_KEY: &str = "ussd_relay.push_config.session";

#[derive(Debug, Error)]
pub enum ConfigStoreError {
    #[error("invalid push config: {0}")]
    Invalid(#[from] ContractViolation),
    #[error("push config could not be encrypted")]
    Encryption,
    #[error("push config storage failed: {0}")]
    Storage(#[from] KvError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigStatus {
    NotConfigured,
    Plaintext,
    EncryptedLocked,
    EncryptedUnlocked,
}

impl ConfigStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotConfigured => "not configured",
            Self::Plaintext => "plaintext",
            Self::EncryptedLocked => "encrypted (locked)",
            Self::EncryptedUnlocked => "encrypted (unlocked)",
        }
    }
}

/// Push configuration persisted in `durable` as plaintext JSON or as a vault
/// envelope, with decrypted plaintext mirrored into `session` so an unlocked
/// session never re-prompts.
///
/// Read paths return `None`/`false` instead of errors; a wrong passphrase,
/// a corrupt envelope and a missing envelope look the same from outside.
#[derive(Debug)]
pub struct ConfigStore<D, S> {
    durable: D,
    session: S,
}

impl<D, S> ConfigStore<D, S>
where
    D: KeyValueStore,
    S: KeyValueStore,
{
    pub fn new(durable: D, session: S) -> Self {
        Self { durable, session }
    }

    pub fn save(
        &self,
        config: &PushConfig,
        passphrase: Option<&str>,
    ) -> Result<(), ConfigStoreError> {
        config.validate()?;
        let plaintext = config.to_json()?;
        // A session copy must never outlive a durable write it doesn't match.
        self.session.remove(PUSH_CONFIG_SESSION_KEY)?;

        match passphrase.filter(|p| !p.is_empty()) {
            Some(passphrase) => {
                let envelope = credential_vault::encrypt(&plaintext, passphrase)
                    .map_err(|_| ConfigStoreError::Encryption)?;
                self.durable.set(PUSH_CONFIG_KEY, &envelope.to_json())?;
                info!("push config saved encrypted");
            }
            None => {
                self.durable.set(PUSH_CONFIG_KEY, &plaintext)?;
                info!("push config saved as plaintext");
            }
        }
        self.session.set(PUSH_CONFIG_SESSION_KEY, &plaintext)?;
        Ok(())
    }

    /// Never decrypts: an envelope without an unlocked session reads as `None`.
    pub fn load(&self) -> Option<PushConfig> {
        if let Some(raw) = read_or_warn(&self.session, PUSH_CONFIG_SESSION_KEY) {
            match PushConfig::from_json(&raw) {
                Ok(config) => return Some(config),
                Err(err) => warn!(error = %err, "ignoring unreadable session push config"),
            }
        }
        let raw = read_or_warn(&self.durable, PUSH_CONFIG_KEY)?;
        if credential_vault::is_envelope(&raw) {
            debug!("push config is encrypted and locked");
            return None;
        }
        match PushConfig::from_json(&raw) {
            Ok(config) => Some(config),
            Err(err) => {
                warn!(error = %err, "stored push config is invalid");
                None
            }
        }
    }

    pub fn is_encrypted(&self) -> bool {
        read_or_warn(&self.durable, PUSH_CONFIG_KEY)
            .map(|raw| credential_vault::is_envelope(&raw))
            .unwrap_or(false)
    }

    pub fn unlock(&self, passphrase: &str) -> bool {
        let Some(raw) = read_or_warn(&self.durable, PUSH_CONFIG_KEY) else {
            return false;
        };
        let Some(envelope) = EncryptedEnvelope::parse(&raw) else {
            return false;
        };
        let Ok(plaintext) = credential_vault::decrypt(&envelope, passphrase) else {
            debug!("push config unlock rejected");
            return false;
        };
        if PushConfig::from_json(&plaintext).is_err() {
            return false;
        }
        if let Err(err) = self.session.set(PUSH_CONFIG_SESSION_KEY, &plaintext) {
            warn!(error = %err, "unlocked push config could not be cached");
            return false;
        }
        info!("push config unlocked");
        true
    }

    pub fn clear(&self) {
        if let Err(err) = self.durable.remove(PUSH_CONFIG_KEY) {
            warn!(error = %err, "durable push config could not be removed");
        }
        if let Err(err) = self.session.remove(PUSH_CONFIG_SESSION_KEY) {
            warn!(error = %err, "session push config could not be removed");
        }
        info!("push config cleared");
    }

    pub fn status(&self) -> ConfigStatus {
        match read_or_warn(&self.durable, PUSH_CONFIG_KEY) {
            None => ConfigStatus::NotConfigured,
            Some(raw) if credential_vault::is_envelope(&raw) => {
                if self.load().is_some() {
                    ConfigStatus::EncryptedUnlocked
                } else {
                    ConfigStatus::EncryptedLocked
                }
            }
            Some(_) => ConfigStatus::Plaintext,
        }
    }
}

fn read_or_warn<K: KeyValueStore>(store: &K, key: &str) -> Option<String> {
    match store.get(key) {
        Ok(value) => value.filter(|raw| !raw.trim().is_empty()),
        Err(err) => {
            warn!(key, error = %err, "storage read failed");
            None
        }
    }
}
