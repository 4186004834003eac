#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::common::require_non_empty;
use crate::{ContractViolation, Validate};

pub const ENVELOPE_VERSION: u8 = 1;

/// Versioned ciphertext record produced by the credential vault.
///
/// Serialized as `{"v":1,"enc":..,"iv":..,"salt":..}`; the three binary
/// fields are base64url text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedEnvelope {
    #[serde(rename = "v")]
    pub version: u8,
    #[serde(rename = "enc")]
    pub ciphertext: String,
    pub iv: String,
    pub salt: String,
}

impl EncryptedEnvelope {
    pub fn v1(ciphertext: String, iv: String, salt: String) -> Self {
        Self {
            version: ENVELOPE_VERSION,
            ciphertext,
            iv,
            salt,
        }
    }

    /// Structural parse only: a JSON object with `v == 1` and string
    /// `enc`, `iv`, `salt`. Anything else is "not an envelope".
    pub fn parse(raw: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(raw).ok()?;
        let obj = value.as_object()?;
        if obj.get("v")?.as_u64()? != u64::from(ENVELOPE_VERSION) {
            return None;
        }
        let field = |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_string);
        Some(Self::v1(field("enc")?, field("iv")?, field("salt")?))
    }

    pub fn to_json(&self) -> String {
        serde_json::json!({
            "v": self.version,
            "enc": self.ciphertext,
            "iv": self.iv,
            "salt": self.salt,
        })
        .to_string()
    }
}

impl Validate for EncryptedEnvelope {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.version != ENVELOPE_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "encrypted_envelope.v",
                reason: "must be 1",
            });
        }
        require_non_empty(&self.ciphertext, "encrypted_envelope.enc")?;
        require_non_empty(&self.iv, "encrypted_envelope.iv")?;
        require_non_empty(&self.salt, "encrypted_envelope.salt")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_envelope_01_json_shape_roundtrips_through_parse() {
        let env = EncryptedEnvelope::v1("Y2lwaGVy".into(), "aXY".into(), "c2FsdA".into());
        let raw = env.to_json();
        assert!(raw.contains("\"v\":1"));
        assert!(raw.contains("\"enc\":\"Y2lwaGVy\""));
        assert_eq!(EncryptedEnvelope::parse(&raw), Some(env));
    }

    #[test]
    fn at_envelope_02_other_shapes_are_not_envelopes() {
        assert!(EncryptedEnvelope::parse(r#"{"v":2,"enc":"a","iv":"b","salt":"c"}"#).is_none());
        assert!(EncryptedEnvelope::parse(r#"{"v":"1","enc":"a","iv":"b","salt":"c"}"#).is_none());
        assert!(EncryptedEnvelope::parse(r#"{"v":1,"enc":"a","iv":"b"}"#).is_none());
        assert!(EncryptedEnvelope::parse(r#"{"v":1,"enc":7,"iv":"b","salt":"c"}"#).is_none());
        assert!(EncryptedEnvelope::parse(r#"{"device_token":"abc"}"#).is_none());
        assert!(EncryptedEnvelope::parse("not json at all").is_none());
        assert!(EncryptedEnvelope::parse("[1,2,3]").is_none());
    }
}
