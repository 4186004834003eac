#![forbid(unsafe_code)]

use relay_kernel_contracts::intent::{Contact, ContactTarget};
use relay_storage::contacts::{ContactBook, ContactDirectory};
use relay_storage::kv::FileKeyValueStore;

#[test]
fn at_contacts_db_01_contacts_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let book = ContactBook::new(FileKeyValueStore::new(dir.path()));
    book.save_contact(Contact::phone("Mama", "+254712345678"))
        .unwrap();
    book.save_contact(Contact {
        name: "KPLC".into(),
        target: ContactTarget::Paybill {
            business_number: "888880".into(),
            account_number: Some("12345678".into()),
        },
    })
    .unwrap();

    let reopened = ContactBook::new(FileKeyValueStore::new(dir.path()));
    assert_eq!(reopened.list_contacts().len(), 2);
    assert_eq!(
        reopened.resolve_by_phone_or_name("mama").as_deref(),
        Some("0712345678")
    );
    match reopened.resolve_contact_by_name("kplc").map(|c| c.target) {
        Some(ContactTarget::Paybill { account_number, .. }) => {
            assert_eq!(account_number.as_deref(), Some("12345678"))
        }
        other => panic!("unexpected contact {other:?}"),
    }
}

#[test]
fn at_contacts_db_02_corrupt_file_reads_as_empty_but_refuses_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("ussd_relay.contacts.json"), "not json").unwrap();
    let book = ContactBook::new(FileKeyValueStore::new(dir.path()));
    assert!(book.list_contacts().is_empty());
    assert!(book.resolve_contact_by_name("anyone").is_none());
    assert!(book
        .save_contact(Contact::phone("Mama", "0712345678"))
        .is_err());
}
