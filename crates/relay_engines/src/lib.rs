#![forbid(unsafe_code)]

pub mod assertion;
pub mod clock;
pub mod credential_vault;
pub mod encoding;
pub mod http_transport;
pub mod intent_parser;
pub mod push_dispatch;
