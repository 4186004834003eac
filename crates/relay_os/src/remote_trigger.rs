#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use relay_engines::clock::Clock;
use relay_engines::http_transport::PushHttpTransport;
use relay_engines::push_dispatch::PushDispatcher;
use relay_kernel_contracts::intent::TransactionIntent;
use relay_storage::config_store::ConfigStore;
use relay_storage::kv::KeyValueStore;
use tracing::info;

use crate::capabilities::{IntentSubmitter, SubmitError};

/// Data key the phone-side service reads the intent JSON from.
pub const TRIGGER_BODY_KEY: &str = "body";

/// Delivers intents to the paired phone through the stored push config.
pub struct PushIntentSubmitter<D, S, T, C> {
    store: ConfigStore<D, S>,
    dispatcher: PushDispatcher<T, C>,
}

impl<D, S, T, C> PushIntentSubmitter<D, S, T, C>
where
    D: KeyValueStore,
    S: KeyValueStore,
    T: PushHttpTransport,
    C: Clock,
{
    pub fn new(store: ConfigStore<D, S>, dispatcher: PushDispatcher<T, C>) -> Self {
        Self { store, dispatcher }
    }

    pub fn store(&self) -> &ConfigStore<D, S> {
        &self.store
    }
}

impl<D, S, T, C> IntentSubmitter for PushIntentSubmitter<D, S, T, C>
where
    D: KeyValueStore,
    S: KeyValueStore,
    T: PushHttpTransport,
    C: Clock,
{
    fn submit(&self, intent: &TransactionIntent) -> Result<(), SubmitError> {
        let Some(config) = self.store.load() else {
            return Err(if self.store.is_encrypted() {
                SubmitError::Locked
            } else {
                SubmitError::NotConfigured
            });
        };
        let mut data = BTreeMap::new();
        data.insert(TRIGGER_BODY_KEY.to_string(), intent.to_trigger_body()?);
        self.dispatcher.send(&config, &data)?;
        info!(mode = intent.mode_name(), "intent delivered to phone");
        Ok(())
    }
}
