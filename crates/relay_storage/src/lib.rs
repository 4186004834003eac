#![forbid(unsafe_code)]

pub mod config_store;
pub mod contacts;
pub mod kv;
pub mod paths;
