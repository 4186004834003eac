#![forbid(unsafe_code)]

pub mod config_cli;
pub mod console;
pub mod contacts_cli;
pub mod trigger_cli;
