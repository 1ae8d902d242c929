//! Seed vault — encrypted seed-at-rest for the device
//!
//! The wallet seed survives reboots in a small vault file on internal
//! flash, encrypted under the operator PIN with Argon2id + AES-256-GCM.
//! The PIN is never stored; each encryption uses a fresh salt and nonce.

use std::fs;
use std::path::Path;

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::seed::WalletSeed;

/// Argon2id parameters sized for handheld-class hardware:
/// 19 MiB memory, 2 iterations, single lane.
const ARGON2_M_COST: u32 = 19456;
const ARGON2_T_COST: u32 = 2;
const ARGON2_P_COST: u32 = 1;
const ARGON2_OUTPUT_LEN: usize = 32;

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;

/// AES-GCM authentication tag length
const TAG_LEN: usize = 16;

#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),
    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),
    #[error("Invalid vault format")]
    InvalidFormat,
    #[error("Vault IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// On-disk vault layout: `salt (16) || nonce (12) || ciphertext (64 + 16)`.
pub struct EncryptedSeed {
    salt: [u8; SALT_LEN],
    nonce: [u8; NONCE_LEN],
    ciphertext: Vec<u8>,
}

impl EncryptedSeed {
    /// Serialize to bytes: salt || nonce || ciphertext
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(SALT_LEN + NONCE_LEN + self.ciphertext.len());
        bytes.extend_from_slice(&self.salt);
        bytes.extend_from_slice(&self.nonce);
        bytes.extend_from_slice(&self.ciphertext);
        bytes
    }

    /// Deserialize from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, VaultError> {
        // The ciphertext of a 64-byte seed is seed + tag; anything shorter
        // cannot be a valid vault
        if bytes.len() < SALT_LEN + NONCE_LEN + TAG_LEN + 1 {
            return Err(VaultError::InvalidFormat);
        }

        let mut salt = [0u8; SALT_LEN];
        let mut nonce = [0u8; NONCE_LEN];
        salt.copy_from_slice(&bytes[..SALT_LEN]);
        nonce.copy_from_slice(&bytes[SALT_LEN..SALT_LEN + NONCE_LEN]);

        Ok(Self {
            salt,
            nonce,
            ciphertext: bytes[SALT_LEN + NONCE_LEN..].to_vec(),
        })
    }

    /// Read a vault file.
    pub fn load(path: &Path) -> Result<Self, VaultError> {
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Write the vault file, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), VaultError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_bytes())?;
        Ok(())
    }
}

/// Derive the vault key from the operator PIN.
fn derive_key(pin: &str, salt: &[u8; SALT_LEN]) -> Result<Zeroizing<[u8; ARGON2_OUTPUT_LEN]>, VaultError> {
    let params = Params::new(
        ARGON2_M_COST,
        ARGON2_T_COST,
        ARGON2_P_COST,
        Some(ARGON2_OUTPUT_LEN),
    )
    .map_err(|e| VaultError::KeyDerivationFailed(e.to_string()))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = Zeroizing::new([0u8; ARGON2_OUTPUT_LEN]);
    argon2
        .hash_password_into(pin.as_bytes(), salt, &mut key[..])
        .map_err(|e| VaultError::KeyDerivationFailed(e.to_string()))?;

    Ok(key)
}

/// Encrypt the wallet seed under the operator PIN.
///
/// Fresh salt and nonce on every call, so re-provisioning the same seed
/// produces a different vault.
pub fn encrypt_seed(seed: &WalletSeed, pin: &str) -> Result<EncryptedSeed, VaultError> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let nonce_arr = Aes256Gcm::generate_nonce(&mut OsRng);
    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&nonce_arr);

    let key = derive_key(pin, &salt)?;

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key[..]));
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), seed.as_bytes().as_slice())
        .map_err(|e| VaultError::EncryptionFailed(e.to_string()))?;

    Ok(EncryptedSeed {
        salt,
        nonce,
        ciphertext,
    })
}

/// Decrypt a vault back into the wallet seed.
///
/// Fails on a wrong PIN or a tampered vault (GCM authentication).
pub fn decrypt_seed(encrypted: &EncryptedSeed, pin: &str) -> Result<WalletSeed, VaultError> {
    let key = derive_key(pin, &encrypted.salt)?;

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key[..]));
    let plaintext = Zeroizing::new(
        cipher
            .decrypt(
                Nonce::from_slice(&encrypted.nonce),
                encrypted.ciphertext.as_slice(),
            )
            .map_err(|_| {
                VaultError::DecryptionFailed("wrong PIN or corrupted vault".to_string())
            })?,
    );

    WalletSeed::from_slice(&plaintext)
        .map_err(|_| VaultError::DecryptionFailed("vault holds an invalid seed".to_string()))
}
