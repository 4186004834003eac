#![forbid(unsafe_code)]

use crate::{ContractViolation, Validate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoiceSessionState {
    Idle,
    Listening,
    Processing,
    Confirming,
    AwaitingConfirmation,
    Error,
}

impl VoiceSessionState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Listening => "listening",
            Self::Processing => "processing",
            Self::Confirming => "confirming",
            Self::AwaitingConfirmation => "awaiting_confirmation",
            Self::Error => "error",
        }
    }

    pub const fn is_idle(self) -> bool {
        matches!(self, Self::Idle)
    }
}

pub const DEFAULT_VOICE_LOCALE: &str = "en-KE";

/// BCP-47 style tag handed to speech capture, e.g. `en-KE`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VoiceLocale(String);

impl VoiceLocale {
    pub fn new(tag: impl Into<String>) -> Result<Self, ContractViolation> {
        let locale = Self(tag.into().trim().to_string());
        locale.validate()?;
        Ok(locale)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for VoiceLocale {
    fn default() -> Self {
        Self(DEFAULT_VOICE_LOCALE.to_string())
    }
}

impl Validate for VoiceLocale {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.0.is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "voice_locale",
                reason: "must not be empty",
            });
        }
        if self.0.len() > 32 {
            return Err(ContractViolation::InvalidValue {
                field: "voice_locale",
                reason: "must be <= 32 chars",
            });
        }
        if !self.0.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(ContractViolation::InvalidValue {
                field: "voice_locale",
                reason: "must contain only ascii letters, digits and '-'",
            });
        }
        Ok(())
    }
}
