#![forbid(unsafe_code)]

pub mod common;
pub mod envelope;
pub mod intent;
pub mod push;
pub mod voice;

pub use common::{ContractViolation, Validate};
