#![forbid(unsafe_code)]

use clap::ValueEnum;
use relay_kernel_contracts::intent::{Contact, ContactTarget};
use relay_storage::contacts::ContactDirectory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ContactKind {
    Phone,
    Pochi,
    Till,
    Paybill,
    Agent,
}

#[derive(Debug, Clone)]
pub enum ContactsCommand {
    Add {
        name: String,
        kind: ContactKind,
        number: String,
        /// Paybill account or agent store number.
        extra: Option<String>,
    },
    Ls,
    Find {
        text: String,
    },
}

pub fn execute_contacts_command(
    contacts: &dyn ContactDirectory,
    command: ContactsCommand,
) -> Result<String, String> {
    match command {
        ContactsCommand::Add {
            name,
            kind,
            number,
            extra,
        } => {
            let contact = Contact {
                name,
                target: target_for(kind, number, extra),
            };
            contacts
                .save_contact(contact)
                .map_err(|e| format!("failed to save contact: {e}"))?;
            Ok("OK".to_string())
        }
        ContactsCommand::Ls => Ok(contacts
            .list_contacts()
            .iter()
            .map(format_contact)
            .collect::<Vec<_>>()
            .join("\n")),
        ContactsCommand::Find { text } => contacts
            .resolve_by_phone_or_name(&text)
            .ok_or_else(|| format!("no phone number found for '{}'", text.trim())),
    }
}

fn target_for(kind: ContactKind, number: String, extra: Option<String>) -> ContactTarget {
    match kind {
        ContactKind::Phone => ContactTarget::Phone { phone: number },
        ContactKind::Pochi => ContactTarget::Pochi { phone: number },
        ContactKind::Till => ContactTarget::Till {
            till_number: number,
        },
        ContactKind::Paybill => ContactTarget::Paybill {
            business_number: number,
            account_number: extra,
        },
        ContactKind::Agent => ContactTarget::Agent {
            agent_number: number,
            store_number: extra,
        },
    }
}

fn format_contact(contact: &Contact) -> String {
    let target = match &contact.target {
        ContactTarget::Phone { phone } => format!("phone\t{phone}"),
        ContactTarget::Pochi { phone } => format!("pochi\t{phone}"),
        ContactTarget::Till { till_number } => format!("till\t{till_number}"),
        ContactTarget::Paybill {
            business_number,
            account_number,
        } => match account_number {
            Some(account) => format!("paybill\t{business_number} account {account}"),
            None => format!("paybill\t{business_number}"),
        },
        ContactTarget::Agent {
            agent_number,
            store_number,
        } => match store_number {
            Some(store) => format!("agent\t{agent_number} store {store}"),
            None => format!("agent\t{agent_number}"),
        },
    };
    format!("{}\t{target}", contact.name)
}
