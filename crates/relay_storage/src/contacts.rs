#![forbid(unsafe_code)]

use relay_kernel_contracts::intent::{normalize_phone, Contact};
use relay_kernel_contracts::{ContractViolation, Validate};
use thiserror::Error;
use tracing::{debug, warn};

use crate::kv::{KeyValueStore, KvError};

pub const CONTACTS_KEY: &str = "ussd_relay.contacts";

#[derive(Debug, Error)]
pub enum ContactDirectoryError {
    #[error("invalid contact: {0}")]
    Invalid(#[from] ContractViolation),
    #[error("contact storage failed: {0}")]
    Storage(#[from] KvError),
    #[error("contact list is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

pub trait ContactDirectory: Send + Sync {
    /// A literal phone number (normalised) wins over a name match.
    fn resolve_by_phone_or_name(&self, text: &str) -> Option<String>;
    fn resolve_contact_by_name(&self, name: &str) -> Option<Contact>;
    fn save_contact(&self, contact: Contact) -> Result<(), ContactDirectoryError>;
    fn list_contacts(&self) -> Vec<Contact>;
}

impl<T: ContactDirectory + ?Sized> ContactDirectory for std::sync::Arc<T> {
    fn resolve_by_phone_or_name(&self, text: &str) -> Option<String> {
        (**self).resolve_by_phone_or_name(text)
    }

    fn resolve_contact_by_name(&self, name: &str) -> Option<Contact> {
        (**self).resolve_contact_by_name(name)
    }

    fn save_contact(&self, contact: Contact) -> Result<(), ContactDirectoryError> {
        (**self).save_contact(contact)
    }

    fn list_contacts(&self) -> Vec<Contact> {
        (**self).list_contacts()
    }
}

/// Contacts kept as one JSON list under a single key.
#[derive(Debug)]
pub struct ContactBook<K> {
    store: K,
}

impl<K: KeyValueStore> ContactBook<K> {
    pub fn new(store: K) -> Self {
        Self { store }
    }

    fn read(&self) -> Result<Vec<Contact>, ContactDirectoryError> {
        match self.store.get(CONTACTS_KEY)? {
            Some(raw) if !raw.trim().is_empty() => Ok(serde_json::from_str(&raw)?),
            _ => Ok(Vec::new()),
        }
    }

    fn read_or_empty(&self) -> Vec<Contact> {
        self.read().unwrap_or_else(|err| {
            warn!(error = %err, "contact list unreadable");
            Vec::new()
        })
    }
}

impl<K: KeyValueStore> ContactDirectory for ContactBook<K> {
    fn resolve_by_phone_or_name(&self, text: &str) -> Option<String> {
        if let Some(phone) = normalize_phone(text) {
            return Some(phone);
        }
        self.resolve_contact_by_name(text)
            .and_then(|contact| contact.phone_number().and_then(normalize_phone))
    }

    fn resolve_contact_by_name(&self, name: &str) -> Option<Contact> {
        if name.trim().is_empty() {
            return None;
        }
        self.read_or_empty()
            .into_iter()
            .find(|contact| contact.matches_name(name))
    }

    fn save_contact(&self, mut contact: Contact) -> Result<(), ContactDirectoryError> {
        contact.name = contact.name.trim().to_string();
        contact.validate()?;
        let mut contacts = self.read()?;
        contacts.retain(|existing| !existing.matches_name(&contact.name));
        debug!(name = %contact.name, "contact saved");
        contacts.push(contact);
        contacts.sort_by_key(|c| c.name.to_ascii_lowercase());
        self.store
            .set(CONTACTS_KEY, &serde_json::to_string(&contacts)?)?;
        Ok(())
    }

    fn list_contacts(&self) -> Vec<Contact> {
        self.read_or_empty()
    }
}
