// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! In-memory credential storage
//!
//! The password is only ever held encrypted. The key is derived with Argon2
//! from the username and a random per-instance salt; the ciphertext is
//! AES-256-GCM with a fresh 96-bit nonce prepended, base64 encoded.

use std::fmt;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::password_hash::SaltString;
use argon2::Argon2;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{Error, Result};

const NONCE_LEN: usize = 12;

/// Encrypted password holder
pub struct PasswordManager {
    cipher: Aes256Gcm,
    encrypted: Option<String>,
}

impl fmt::Debug for PasswordManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordManager")
            .field("password", &"[REDACTED]")
            .field("has_password", &self.has_password())
            .finish()
    }
}

impl PasswordManager {
    /// Encrypt `password` under a key derived from `username`
    pub fn new(username: &str, password: &str) -> Result<Self> {
        let salt = SaltString::generate(OsRng);
        let mut key = [0u8; 32];
        Argon2::default()
            .hash_password_into(username.as_bytes(), salt.as_str().as_bytes(), &mut key)
            .map_err(|e| Error::Crypto(format!("Key derivation failed: {e}")))?;

        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| Error::Crypto(format!("Failed to create cipher: {e}")))?;

        let mut manager = Self {
            cipher,
            encrypted: None,
        };
        manager.encrypted = Some(manager.encrypt(password)?);
        Ok(manager)
    }

    fn encrypt(&self, password: &str) -> Result<String> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(&Nonce::from(nonce_bytes), password.as_bytes())
            .map_err(|e| Error::Crypto(format!("Encryption failed: {e}")))?;

        let mut payload = nonce_bytes.to_vec();
        payload.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(payload))
    }

    /// Plaintext password, or `None` once cleared or if decryption fails
    pub fn decrypt(&self) -> Option<String> {
        let payload = BASE64.decode(self.encrypted.as_ref()?).ok()?;
        if payload.len() < NONCE_LEN {
            return None;
        }
        let (nonce, ciphertext) = payload.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .ok()?;
        String::from_utf8(plaintext).ok()
    }

    /// Drop the stored password for good
    pub fn clear(&mut self) {
        self.encrypted = None;
    }

    pub fn has_password(&self) -> bool {
        self.encrypted.is_some()
    }
}
