#![forbid(unsafe_code)]

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractViolation {
    InvalidValue {
        field: &'static str,
        reason: &'static str,
    },
    Malformed {
        field: &'static str,
        detail: String,
    },
}

impl ContractViolation {
    pub fn field(&self) -> &'static str {
        match self {
            Self::InvalidValue { field, .. } | Self::Malformed { field, .. } => field,
        }
    }
}

impl fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidValue { field, reason } => write!(f, "{field} {reason}"),
            Self::Malformed { field, detail } => write!(f, "{field} is malformed: {detail}"),
        }
    }
}

impl std::error::Error for ContractViolation {}

pub trait Validate {
    fn validate(&self) -> Result<(), ContractViolation>;
}

pub(crate) fn require_non_empty(
    value: &str,
    field: &'static str,
) -> Result<(), ContractViolation> {
    if value.trim().is_empty() {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "must not be empty",
        });
    }
    Ok(())
}
