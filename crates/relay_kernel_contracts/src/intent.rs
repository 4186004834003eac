#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::common::require_non_empty;
use crate::{ContractViolation, Validate};

/// A mobile-money transaction the remote device should dial.
///
/// `SendMoney`/`Pochi` carry whatever the parser heard in `phone`; it only
/// holds a normalised number once the orchestrator has resolved it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionIntent {
    SendMoney {
        amount: String,
        phone: String,
    },
    Pochi {
        amount: String,
        phone: String,
    },
    Till {
        amount: String,
        till_number: String,
    },
    Paybill {
        amount: String,
        business_number: String,
        account_number: String,
    },
    Withdraw {
        amount: String,
        agent_number: String,
        store_number: String,
    },
    NamedPayment {
        amount: String,
        name: String,
    },
}

impl TransactionIntent {
    pub fn amount(&self) -> &str {
        match self {
            Self::SendMoney { amount, .. }
            | Self::Pochi { amount, .. }
            | Self::Till { amount, .. }
            | Self::Paybill { amount, .. }
            | Self::Withdraw { amount, .. }
            | Self::NamedPayment { amount, .. } => amount,
        }
    }

    pub const fn mode_name(&self) -> &'static str {
        match self {
            Self::SendMoney { .. } => "SEND_MONEY",
            Self::Pochi { .. } => "POCHI",
            Self::Till { .. } => "TILL",
            Self::Paybill { .. } => "PAYBILL",
            Self::Withdraw { .. } => "WITHDRAW",
            Self::NamedPayment { .. } => "NAMED_PAYMENT",
        }
    }

    /// Compact JSON body carried by a push or SMS trigger.
    pub fn to_trigger_body(&self) -> Result<String, ContractViolation> {
        serde_json::to_string(self).map_err(|err| ContractViolation::Malformed {
            field: "transaction_intent",
            detail: err.to_string(),
        })
    }
}

impl Validate for TransactionIntent {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_amount(self.amount())?;
        match self {
            Self::SendMoney { phone, .. } | Self::Pochi { phone, .. } => {
                require_non_empty(phone, "transaction_intent.phone")
            }
            Self::Till { till_number, .. } => {
                require_digits(till_number, "transaction_intent.till_number")
            }
            Self::Paybill {
                business_number,
                account_number,
                ..
            } => {
                require_digits(business_number, "transaction_intent.business_number")?;
                require_non_empty(account_number, "transaction_intent.account_number")
            }
            Self::Withdraw {
                agent_number,
                store_number,
                ..
            } => {
                require_digits(agent_number, "transaction_intent.agent_number")?;
                require_digits(store_number, "transaction_intent.store_number")
            }
            Self::NamedPayment { name, .. } => require_non_empty(name, "transaction_intent.name"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub target: ContactTarget,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContactTarget {
    Phone {
        phone: String,
    },
    Pochi {
        phone: String,
    },
    Till {
        till_number: String,
    },
    Paybill {
        business_number: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        account_number: Option<String>,
    },
    Agent {
        agent_number: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        store_number: Option<String>,
    },
}

impl Contact {
    pub fn phone(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: ContactTarget::Phone {
                phone: phone.into(),
            },
        }
    }

    pub fn phone_number(&self) -> Option<&str> {
        match &self.target {
            ContactTarget::Phone { phone } | ContactTarget::Pochi { phone } => Some(phone),
            _ => None,
        }
    }

    pub fn matches_name(&self, name: &str) -> bool {
        self.name.trim().eq_ignore_ascii_case(name.trim())
    }
}

impl Validate for Contact {
    fn validate(&self) -> Result<(), ContractViolation> {
        require_non_empty(&self.name, "contact.name")?;
        match &self.target {
            ContactTarget::Phone { phone } | ContactTarget::Pochi { phone } => {
                if normalize_phone(phone).is_none() {
                    return Err(ContractViolation::InvalidValue {
                        field: "contact.target.phone",
                        reason: "must be a 10 digit number starting 07 or 01",
                    });
                }
                Ok(())
            }
            ContactTarget::Till { till_number } => {
                require_digits(till_number, "contact.target.till_number")
            }
            ContactTarget::Paybill {
                business_number, ..
            } => require_digits(business_number, "contact.target.business_number"),
            ContactTarget::Agent { agent_number, .. } => {
                require_digits(agent_number, "contact.target.agent_number")
            }
        }
    }
}

/// Normalises `+2547..`, `2547..`, `07.. ..` forms to `07XXXXXXXX`.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();
    let digits = compact.strip_prefix('+').unwrap_or(&compact);
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let local = match digits.strip_prefix("254") {
        Some(rest) if rest.len() == 9 => format!("0{rest}"),
        _ => digits.to_string(),
    };
    if local.len() == 10 && (local.starts_with("07") || local.starts_with("01")) {
        Some(local)
    } else {
        None
    }
}

/// True when the text is a number as spoken, e.g. "0712 345 678" or "+254...".
pub fn looks_numeric(raw: &str) -> bool {
    let mut saw_digit = false;
    for c in raw.trim().chars() {
        if c.is_ascii_digit() {
            saw_digit = true;
        } else if !(c.is_whitespace() || c == '-' || c == '+') {
            return false;
        }
    }
    saw_digit
}

fn validate_amount(amount: &str) -> Result<(), ContractViolation> {
    let trimmed = amount.trim();
    let mut parts = trimmed.splitn(2, '.');
    let whole = parts.next().unwrap_or_default();
    let fraction = parts.next();
    let digits_ok = !whole.is_empty()
        && whole.chars().all(|c| c.is_ascii_digit())
        && fraction.map_or(true, |f| {
            !f.is_empty() && f.len() <= 2 && f.chars().all(|c| c.is_ascii_digit())
        });
    if !digits_ok {
        return Err(ContractViolation::InvalidValue {
            field: "transaction_intent.amount",
            reason: "must be a plain decimal amount",
        });
    }
    if trimmed.chars().all(|c| c == '0' || c == '.') {
        return Err(ContractViolation::InvalidValue {
            field: "transaction_intent.amount",
            reason: "must be greater than zero",
        });
    }
    Ok(())
}

fn require_digits(value: &str, field: &'static str) -> Result<(), ContractViolation> {
    require_non_empty(value, field)?;
    if !value.trim().chars().all(|c| c.is_ascii_digit()) {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "must contain digits only",
        });
    }
    Ok(())
}
