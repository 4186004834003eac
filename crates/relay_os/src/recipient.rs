#![forbid(unsafe_code)]

use relay_kernel_contracts::intent::{
    looks_numeric, normalize_phone, Contact, ContactTarget, TransactionIntent,
};
use relay_kernel_contracts::{ContractViolation, Validate};
use relay_storage::contacts::ContactDirectory;
use thiserror::Error;

/// Display text of each variant is what gets spoken back to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("I couldn't find {0} in your Voice Contacts. Add them there first, then try again.")]
    UnknownContact(String),
    #[error("{0} doesn't look like a phone number. Say all ten digits, like 0712345678.")]
    InvalidPhone(String),
    #[error("{0} needs an account number. Add it in Voice Contacts, then try again.")]
    MissingAccount(String),
    #[error("{0} needs a store number. Add it in Voice Contacts, then try again.")]
    MissingStore(String),
    #[error("Something in that request doesn't look right. Please try again.")]
    Invalid(ContractViolation),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIntent {
    pub intent: TransactionIntent,
    /// Saved contact the recipient came from.
    pub contact_name: Option<String>,
    /// The utterance carried the phone number itself.
    pub literal_phone: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Direct,
    Pochi,
    Named,
}

/// Turns a parsed intent into one the phone can execute: names become
/// numbers, and a contact's kind decides the transaction mode.
pub fn resolve_intent(
    intent: TransactionIntent,
    contacts: &dyn ContactDirectory,
) -> Result<ResolvedIntent, ResolveError> {
    let resolved = match intent {
        TransactionIntent::SendMoney { amount, phone } => {
            resolve_person(amount, &phone, Route::Direct, contacts)?
        }
        TransactionIntent::Pochi { amount, phone } => {
            resolve_person(amount, &phone, Route::Pochi, contacts)?
        }
        TransactionIntent::NamedPayment { amount, name } => {
            resolve_person(amount, &name, Route::Named, contacts)?
        }
        other => ResolvedIntent {
            intent: other,
            contact_name: None,
            literal_phone: false,
        },
    };
    resolved.intent.validate().map_err(ResolveError::Invalid)?;
    Ok(resolved)
}

fn resolve_person(
    amount: String,
    who: &str,
    route: Route,
    contacts: &dyn ContactDirectory,
) -> Result<ResolvedIntent, ResolveError> {
    let who = who.trim();
    if let Some(phone) = contacts.resolve_by_phone_or_name(who) {
        let literal_phone = normalize_phone(who).is_some();
        // A saved contact still decides the mode (pochi, till, ...).
        if !literal_phone {
            if let Some(contact) = contacts.resolve_contact_by_name(who) {
                return from_contact(contact, amount, route);
            }
        }
        let phone = normalize_phone(&phone).unwrap_or(phone);
        return Ok(ResolvedIntent {
            intent: phone_intent(amount, phone, route == Route::Pochi),
            contact_name: None,
            literal_phone,
        });
    }
    if looks_numeric(who) {
        return Err(ResolveError::InvalidPhone(who.to_string()));
    }
    let contact = contacts
        .resolve_contact_by_name(who)
        .ok_or_else(|| ResolveError::UnknownContact(who.to_string()))?;
    from_contact(contact, amount, route)
}

fn from_contact(
    contact: Contact,
    amount: String,
    route: Route,
) -> Result<ResolvedIntent, ResolveError> {
    let intent = intent_for_contact(&contact, amount, route)?;
    Ok(ResolvedIntent {
        intent,
        contact_name: Some(contact.name),
        literal_phone: false,
    })
}

fn phone_intent(amount: String, phone: String, pochi: bool) -> TransactionIntent {
    if pochi {
        TransactionIntent::Pochi { amount, phone }
    } else {
        TransactionIntent::SendMoney { amount, phone }
    }
}

fn intent_for_contact(
    contact: &Contact,
    amount: String,
    route: Route,
) -> Result<TransactionIntent, ResolveError> {
    let local = |phone: &str| normalize_phone(phone).unwrap_or_else(|| phone.to_string());
    let intent = match &contact.target {
        ContactTarget::Phone { phone } => phone_intent(amount, local(phone), route == Route::Pochi),
        ContactTarget::Pochi { phone } => phone_intent(amount, local(phone), true),
        ContactTarget::Till { till_number } => TransactionIntent::Till {
            amount,
            till_number: till_number.clone(),
        },
        ContactTarget::Paybill {
            business_number,
            account_number,
        } => TransactionIntent::Paybill {
            amount,
            business_number: business_number.clone(),
            account_number: account_number
                .clone()
                .ok_or_else(|| ResolveError::MissingAccount(contact.name.clone()))?,
        },
        ContactTarget::Agent {
            agent_number,
            store_number,
        } => TransactionIntent::Withdraw {
            amount,
            agent_number: agent_number.clone(),
            store_number: store_number
                .clone()
                .ok_or_else(|| ResolveError::MissingStore(contact.name.clone()))?,
        },
    };
    Ok(intent)
}

/// Read-back sentence spoken before asking for confirmation.
pub fn describe_intent(resolved: &ResolvedIntent) -> String {
    let named = |rest: String| match &resolved.contact_name {
        Some(name) => format!("{name}, {rest}"),
        None => rest,
    };
    match &resolved.intent {
        TransactionIntent::SendMoney { amount, phone } => {
            format!("Send KES {amount} to {}.", named(phone.clone()))
        }
        TransactionIntent::Pochi { amount, phone } => {
            format!(
                "Send KES {amount} to Pochi la Biashara {}.",
                named(phone.clone())
            )
        }
        TransactionIntent::Till {
            amount,
            till_number,
        } => format!(
            "Pay KES {amount} to {}.",
            named(format!("till number {till_number}"))
        ),
        TransactionIntent::Paybill {
            amount,
            business_number,
            account_number,
        } => format!(
            "Pay KES {amount} to {}.",
            named(format!(
                "paybill {business_number}, account {account_number}"
            ))
        ),
        TransactionIntent::Withdraw {
            amount,
            agent_number,
            store_number,
        } => format!(
            "Withdraw KES {amount} from {}.",
            named(format!("agent {agent_number}, store {store_number}"))
        ),
        TransactionIntent::NamedPayment { amount, name } => format!("Pay KES {amount} to {name}."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_storage::contacts::{ContactBook, ContactDirectoryError};
    use relay_storage::kv::MemoryKeyValueStore;

    fn book(contacts: Vec<Contact>) -> ContactBook<MemoryKeyValueStore> {
        let book = ContactBook::new(MemoryKeyValueStore::new());
        for contact in contacts {
            book.save_contact(contact).unwrap();
        }
        book
    }

    fn send(amount: &str, phone: &str) -> TransactionIntent {
        TransactionIntent::SendMoney {
            amount: amount.into(),
            phone: phone.into(),
        }
    }

    #[test]
    fn at_resolve_01_literal_phone_is_normalised_and_flagged() {
        let resolved = resolve_intent(send("500", "+254 712 345 678"), &book(vec![])).unwrap();
        assert_eq!(resolved.intent, send("500", "0712345678"));
        assert!(resolved.literal_phone);
        assert_eq!(resolved.contact_name, None);
        assert_eq!(describe_intent(&resolved), "Send KES 500 to 0712345678.");
    }

    #[test]
    fn at_resolve_02_named_contact_supplies_number_and_mode() {
        let contacts = book(vec![
            Contact::phone("Mama", "0722000111"),
            Contact {
                name: "KFC".into(),
                target: ContactTarget::Till {
                    till_number: "522533".into(),
                },
            },
        ]);
        let resolved = resolve_intent(send("200", "mama"), &contacts).unwrap();
        assert_eq!(resolved.intent, send("200", "0722000111"));
        assert_eq!(resolved.contact_name.as_deref(), Some("Mama"));
        assert!(!resolved.literal_phone);

        let named = TransactionIntent::NamedPayment {
            amount: "300".into(),
            name: "KFC".into(),
        };
        let resolved = resolve_intent(named, &contacts).unwrap();
        assert_eq!(
            resolved.intent,
            TransactionIntent::Till {
                amount: "300".into(),
                till_number: "522533".into(),
            }
        );
        assert_eq!(
            describe_intent(&resolved),
            "Pay KES 300 to KFC, till number 522533."
        );
    }

    #[test]
    fn at_resolve_03_unknown_name_points_at_voice_contacts() {
        let named = TransactionIntent::NamedPayment {
            amount: "300".into(),
            name: "KFC".into(),
        };
        let err = resolve_intent(named, &book(vec![])).unwrap_err();
        assert_eq!(err, ResolveError::UnknownContact("KFC".into()));
        let spoken = err.to_string();
        assert!(spoken.contains("KFC"));
        assert!(spoken.contains("Voice Contacts"));
    }

    #[test]
    fn at_resolve_04_numeric_but_invalid_recipient_is_rejected() {
        let err = resolve_intent(send("500", "07123"), &book(vec![])).unwrap_err();
        assert_eq!(err, ResolveError::InvalidPhone("07123".into()));
    }

    #[test]
    fn at_resolve_05_incomplete_paybill_and_agent_contacts_fail() {
        let contacts = book(vec![
            Contact {
                name: "KPLC".into(),
                target: ContactTarget::Paybill {
                    business_number: "888880".into(),
                    account_number: None,
                },
            },
            Contact {
                name: "Corner Agent".into(),
                target: ContactTarget::Agent {
                    agent_number: "123456".into(),
                    store_number: None,
                },
            },
        ]);
        let err = resolve_intent(send("1000", "KPLC"), &contacts).unwrap_err();
        assert!(err.to_string().contains("needs an account number"));
        let err = resolve_intent(send("1000", "corner agent"), &contacts).unwrap_err();
        assert!(err.to_string().contains("needs a store number"));
    }

    #[test]
    fn at_resolve_06_pochi_contact_always_routes_to_pochi() {
        let contacts = book(vec![Contact {
            name: "Shop".into(),
            target: ContactTarget::Pochi {
                phone: "0733111222".into(),
            },
        }]);
        let resolved = resolve_intent(send("50", "shop"), &contacts).unwrap();
        assert_eq!(
            resolved.intent,
            TransactionIntent::Pochi {
                amount: "50".into(),
                phone: "0733111222".into(),
            }
        );
        assert_eq!(
            describe_intent(&resolved),
            "Send KES 50 to Pochi la Biashara Shop, 0733111222."
        );
    }

    #[test]
    fn at_resolve_07_invalid_amount_is_refused() {
        let err = resolve_intent(send("0", "0712345678"), &book(vec![])).unwrap_err();
        assert!(matches!(err, ResolveError::Invalid(_)));
    }

    /// Resolves names to numbers without exposing any saved contacts.
    struct NumbersOnly;

    impl ContactDirectory for NumbersOnly {
        fn resolve_by_phone_or_name(&self, text: &str) -> Option<String> {
            match text {
                "Mama" => Some("+254 722 000 111".into()),
                other => normalize_phone(other),
            }
        }

        fn resolve_contact_by_name(&self, _name: &str) -> Option<Contact> {
            None
        }

        fn save_contact(&self, _contact: Contact) -> Result<(), ContactDirectoryError> {
            Ok(())
        }

        fn list_contacts(&self) -> Vec<Contact> {
            Vec::new()
        }
    }

    #[test]
    fn at_resolve_08_directory_phone_lookup_is_consulted_first() {
        let resolved = resolve_intent(send("500", "Mama"), &NumbersOnly).unwrap();
        assert_eq!(resolved.intent, send("500", "0722000111"));
        assert!(!resolved.literal_phone);
        assert_eq!(resolved.contact_name, None);

        let pochi = TransactionIntent::Pochi {
            amount: "50".into(),
            phone: "Mama".into(),
        };
        let resolved = resolve_intent(pochi, &NumbersOnly).unwrap();
        assert_eq!(
            resolved.intent,
            TransactionIntent::Pochi {
                amount: "50".into(),
                phone: "0722000111".into(),
            }
        );

        let err = resolve_intent(send("500", "Baba"), &NumbersOnly).unwrap_err();
        assert_eq!(err, ResolveError::UnknownContact("Baba".into()));
    }
}
