//! BIP-39 seed management
//!
//! Handles mnemonic generation, import, and conversion to the wallet seed
//! the address deriver owns.

use bip39::{Language, Mnemonic};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

#[derive(Error, Debug)]
pub enum SeedError {
    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(String),
    #[error("Invalid seed length: expected 64 bytes, got {0}")]
    InvalidLength(usize),
}

/// The wallet seed — the 64 bytes of BIP-39 PBKDF2 output.
///
/// Held in volatile memory only, zeroized on drop. Never serialized,
/// logged, or transmitted; the only consumers are key derivation and the
/// seed vault.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct WalletSeed([u8; 64]);

impl WalletSeed {
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, SeedError> {
        let arr: [u8; 64] = bytes
            .try_into()
            .map_err(|_| SeedError::InvalidLength(bytes.len()))?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl std::fmt::Debug for WalletSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Seed material must never reach logs, even via {:?}
        f.write_str("WalletSeed(<redacted>)")
    }
}

/// Generate a new BIP-39 mnemonic (12 words — the provisioning default)
pub fn generate_mnemonic() -> Result<Mnemonic, SeedError> {
    Mnemonic::generate_in(Language::English, 12)
        .map_err(|e| SeedError::InvalidMnemonic(e.to_string()))
}

/// Parse a mnemonic from words
pub fn parse_mnemonic(words: &str) -> Result<Mnemonic, SeedError> {
    Mnemonic::parse_in(Language::English, words)
        .map_err(|e| SeedError::InvalidMnemonic(e.to_string()))
}

/// Derive the wallet seed from a mnemonic (with optional passphrase)
pub fn derive_seed(mnemonic: &Mnemonic, passphrase: &str) -> WalletSeed {
    WalletSeed(mnemonic.to_seed(passphrase))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_and_reparse() {
        let mnemonic = generate_mnemonic().unwrap();
        assert_eq!(mnemonic.word_count(), 12);

        let reparsed = parse_mnemonic(&mnemonic.to_string()).unwrap();
        assert_eq!(
            derive_seed(&mnemonic, "").as_bytes(),
            derive_seed(&reparsed, "").as_bytes()
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_mnemonic("not a valid mnemonic at all").is_err());
        assert!(parse_mnemonic("").is_err());
    }

    #[test]
    fn test_passphrase_changes_seed() {
        let mnemonic = parse_mnemonic(
            "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about",
        )
        .unwrap();

        let plain = derive_seed(&mnemonic, "");
        let protected = derive_seed(&mnemonic, "till passphrase");
        assert_ne!(plain.as_bytes(), protected.as_bytes());
    }

    #[test]
    fn test_from_slice_length_check() {
        assert!(WalletSeed::from_slice(&[0u8; 64]).is_ok());
        assert!(matches!(
            WalletSeed::from_slice(&[0u8; 32]),
            Err(SeedError::InvalidLength(32))
        ));
    }

    /// BIP-39 test vector (Trezor): "abandon ... about" with passphrase
    /// "TREZOR" produces a fixed 64-byte seed.
    #[test]
    fn test_bip39_reference_vector() {
        let mnemonic = parse_mnemonic(
            "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about",
        )
        .unwrap();
        let seed = derive_seed(&mnemonic, "TREZOR");
        assert_eq!(
            hex::encode(seed.as_bytes()),
            "c55257c360c07c72029aebc1b53c05ed0362ada38ead3e3e9efa3708e53495531f09a6987599d18264c1e1c92f2cf141630c7a3c4ab7c81b2f001698e7463b04"
        );
    }
}
