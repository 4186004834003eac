#![forbid(unsafe_code)]

use relay_kernel_contracts::push::{PushConfig, ServiceCredential};
use relay_storage::config_store::{ConfigStatus, ConfigStore};
use relay_storage::kv::KeyValueStore;

#[derive(Debug, Clone, Copy)]
pub enum ConfigCommand<'a> {
    Save {
        credential_json: &'a str,
        device_token: &'a str,
        passphrase: Option<&'a str>,
    },
    Status,
    Unlock {
        passphrase: &'a str,
    },
    Clear,
}

pub fn execute_config_command<D, S>(
    store: &ConfigStore<D, S>,
    command: ConfigCommand<'_>,
) -> Result<String, String>
where
    D: KeyValueStore,
    S: KeyValueStore,
{
    match command {
        ConfigCommand::Save {
            credential_json,
            device_token,
            passphrase,
        } => {
            let credential = ServiceCredential::from_json(credential_json)
                .map_err(|e| format!("invalid service credential: {e}"))?;
            let config = PushConfig::v1(credential, device_token)
                .map_err(|e| format!("invalid push config: {e}"))?;
            let encrypt = passphrase.is_some_and(|p| !p.is_empty());
            store
                .save(&config, passphrase)
                .map_err(|e| format!("failed to save push config: {e}"))?;
            Ok(if encrypt { "OK (encrypted)" } else { "OK" }.to_string())
        }
        ConfigCommand::Status => {
            let status = store.status();
            let detail = match status {
                ConfigStatus::Plaintext | ConfigStatus::EncryptedUnlocked => store
                    .load()
                    .map(|c| format!(" project={}", c.service_credential.project_id))
                    .unwrap_or_default(),
                ConfigStatus::NotConfigured | ConfigStatus::EncryptedLocked => String::new(),
            };
            Ok(format!("{}{detail}", status.as_str()))
        }
        ConfigCommand::Unlock { passphrase } => {
            if !store.is_encrypted() {
                return Err("push config is not encrypted".to_string());
            }
            if store.unlock(passphrase) {
                Ok("OK".to_string())
            } else {
                Err("unlock failed: wrong passphrase or unreadable config".to_string())
            }
        }
        ConfigCommand::Clear => {
            store.clear();
            Ok("OK".to_string())
        }
    }
}
