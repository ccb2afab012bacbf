//! At-rest protection for provider keys.
//!
//! Strong mode encrypts with AES-256-CBC (PKCS#7) under a key derived once
//! from the operator secret. Each call draws a fresh 16-byte IV, and the stored
//! form is `base64(IV ‖ ciphertext)`.
//!
//! The degraded `obfuscate` mode stores `b64:<base64(plaintext)>`. It is only
//! used when explicitly configured, and every write logs a warning. The marker
//! lets [`KeyCipher::decrypt`] pick the right path regardless of the active
//! mode, so switching modes never strands existing values.

use aes::Aes256;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use novax_config::{CipherMode, SiteConfig, VaultConfig};
use novax_types::{NovaError, traits::Result};
use rand::RngCore;
use sha2::{Digest, Sha256};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

const IV_LEN: usize = 16;
const OBFUSCATED_PREFIX: &str = "b64:";
const FALLBACK_KEY_LABEL: &[u8] = b"novax-vault-site-key-v1";

/// Encrypts and decrypts stored key blobs.
#[derive(Clone)]
pub struct KeyCipher {
    mode: CipherMode,
    key: [u8; 32],
}

impl std::fmt::Debug for KeyCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyCipher")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl KeyCipher {
    /// Builds a cipher from configuration.
    ///
    /// Without `vault.encryption_key` the key is derived from the site
    /// constants instead, which is stable but only as secret as those values.
    #[must_use]
    pub fn from_config(vault: &VaultConfig, site: &SiteConfig) -> Self {
        let key = match vault.encryption_key.as_deref().filter(|s| !s.is_empty()) {
            Some(secret) => derive_key(secret),
            None => {
                tracing::warn!(
                    "no vault encryption key configured; deriving one from site constants"
                );
                derive_site_key(&site.url, &site.salt)
            }
        };
        if vault.cipher == CipherMode::Obfuscate {
            tracing::warn!("vault cipher set to obfuscate: stored keys are NOT encrypted");
        }
        Self {
            mode: vault.cipher,
            key,
        }
    }

    /// AES-256-CBC cipher keyed by `SHA-256(secret)`.
    #[must_use]
    pub fn aes(secret: &str) -> Self {
        Self {
            mode: CipherMode::Aes256Cbc,
            key: derive_key(secret),
        }
    }

    /// Degraded base64-only cipher.
    #[must_use]
    pub fn obfuscate() -> Self {
        Self {
            mode: CipherMode::Obfuscate,
            key: [0u8; 32],
        }
    }

    #[must_use]
    pub fn mode(&self) -> CipherMode {
        self.mode
    }

    /// Protects `plaintext` for storage.
    ///
    /// # Errors
    ///
    /// Returns [`NovaError::Crypto`] if the cipher cannot be initialised.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        match self.mode {
            CipherMode::Aes256Cbc => {
                let mut iv = [0u8; IV_LEN];
                rand::thread_rng().fill_bytes(&mut iv);
                let ciphertext = Aes256CbcEnc::new_from_slices(&self.key, &iv)
                    .map_err(|e| NovaError::Crypto(format!("cipher init: {e}")))?
                    .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

                let mut combined = Vec::with_capacity(IV_LEN + ciphertext.len());
                combined.extend_from_slice(&iv);
                combined.extend_from_slice(&ciphertext);
                Ok(STANDARD.encode(combined))
            }
            CipherMode::Obfuscate => {
                tracing::warn!("storing API key with base64 obfuscation only");
                Ok(format!(
                    "{OBFUSCATED_PREFIX}{}",
                    STANDARD.encode(plaintext.as_bytes())
                ))
            }
        }
    }

    /// Reverses [`encrypt`](Self::encrypt).
    ///
    /// # Errors
    ///
    /// Returns [`NovaError::Crypto`] on bad base64, a truncated payload, a
    /// wrong key, bad padding or non-UTF-8 plaintext.
    pub fn decrypt(&self, stored: &str) -> Result<String> {
        if let Some(encoded) = stored.strip_prefix(OBFUSCATED_PREFIX) {
            let bytes = STANDARD
                .decode(encoded)
                .map_err(|e| NovaError::Crypto(format!("bad base64: {e}")))?;
            return String::from_utf8(bytes)
                .map_err(|e| NovaError::Crypto(format!("invalid UTF-8: {e}")));
        }

        let combined = STANDARD
            .decode(stored)
            .map_err(|e| NovaError::Crypto(format!("bad base64: {e}")))?;
        if combined.len() <= IV_LEN {
            return Err(NovaError::Crypto("ciphertext too short".into()));
        }
        let (iv, ciphertext) = combined.split_at(IV_LEN);

        let plaintext = Aes256CbcDec::new_from_slices(&self.key, iv)
            .map_err(|e| NovaError::Crypto(format!("cipher init: {e}")))?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| NovaError::Crypto("bad padding (wrong key or corrupted data)".into()))?;

        String::from_utf8(plaintext).map_err(|e| NovaError::Crypto(format!("invalid UTF-8: {e}")))
    }
}

fn derive_key(secret: &str) -> [u8; 32] {
    Sha256::digest(secret.as_bytes()).into()
}

fn derive_site_key(url: &str, salt: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(FALLBACK_KEY_LABEL);
    hasher.update([0]);
    hasher.update(url.as_bytes());
    hasher.update([0]);
    hasher.update(salt.as_bytes());
    hasher.finalize().into()
}
