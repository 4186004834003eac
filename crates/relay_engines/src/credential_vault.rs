#![forbid(unsafe_code)]

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use relay_kernel_contracts::envelope::EncryptedEnvelope;
use relay_kernel_contracts::Validate;
use sha2::Sha256;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::encoding::{decode_b64url, encode_b64url};

/// PBKDF2-HMAC-SHA256 rounds. Envelopes do not record the count, so this
/// value is part of the stored format.
pub const PBKDF2_ITERATIONS: u32 = 260_000;
const SALT_LEN: usize = 16;
const IV_LEN: usize = 12;
const KEY_LEN: usize = 32;

/// Wrong passphrase and corrupted envelope are deliberately the same error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VaultError {
    #[error("vault encryption failed")]
    EncryptionFailed,
    #[error("vault decryption failed")]
    DecryptionFailed,
}

pub fn encrypt(plaintext: &str, passphrase: &str) -> Result<EncryptedEnvelope, VaultError> {
    let mut salt = [0u8; SALT_LEN];
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut salt);
    OsRng.fill_bytes(&mut iv);

    let key = derive_key(passphrase, &salt);
    let cipher =
        Aes256Gcm::new_from_slice(key.as_slice()).map_err(|_| VaultError::EncryptionFailed)?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext.as_bytes())
        .map_err(|_| VaultError::EncryptionFailed)?;

    Ok(EncryptedEnvelope::v1(
        encode_b64url(ciphertext),
        encode_b64url(iv),
        encode_b64url(salt),
    ))
}

pub fn decrypt(envelope: &EncryptedEnvelope, passphrase: &str) -> Result<String, VaultError> {
    envelope
        .validate()
        .map_err(|_| VaultError::DecryptionFailed)?;
    let salt = decode_b64url(&envelope.salt).map_err(|_| VaultError::DecryptionFailed)?;
    let iv = decode_b64url(&envelope.iv).map_err(|_| VaultError::DecryptionFailed)?;
    let ciphertext =
        decode_b64url(&envelope.ciphertext).map_err(|_| VaultError::DecryptionFailed)?;
    if salt.len() != SALT_LEN || iv.len() != IV_LEN {
        return Err(VaultError::DecryptionFailed);
    }

    let key = derive_key(passphrase, &salt);
    let cipher =
        Aes256Gcm::new_from_slice(key.as_slice()).map_err(|_| VaultError::DecryptionFailed)?;
    let plaintext = cipher
        .decrypt(Nonce::from_slice(&iv), ciphertext.as_ref())
        .map_err(|_| VaultError::DecryptionFailed)?;
    String::from_utf8(plaintext).map_err(|_| VaultError::DecryptionFailed)
}

/// Structural check only; never derives a key.
pub fn is_envelope(raw: &str) -> bool {
    EncryptedEnvelope::parse(raw).is_some()
}

fn derive_key(passphrase: &str, salt: &[u8]) -> Zeroizing<[u8; KEY_LEN]> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2::pbkdf2_hmac::<Sha256>(
        passphrase.as_bytes(),
        salt,
        PBKDF2_ITERATIONS,
        key.as_mut_slice(),
    );
    key
}
