//! Key derivation from the wallet seed
//!
//! Receiving keys follow a BIP-44 layout pinned to the Nexa coin type:
//! `m/44'/29223'/{account}'/0/{index}`. Pinning the coin type keeps every
//! derivation inside one chain namespace.

use bitcoin::bip32::{DerivationPath, Xpriv};
use bitcoin::Network;
use thiserror::Error;

use crate::seed::WalletSeed;

/// SLIP-0044 coin type for Nexa
pub const NEXA_COIN_TYPE: u32 = 29223;

/// BIP-44 purpose level
const PURPOSE: u32 = 44;

#[derive(Error, Debug)]
pub enum DerivationError {
    #[error("Derivation failed: {0}")]
    DerivationFailed(String),
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    #[error("Index {0} out of range (must be below 2^31)")]
    IndexOutOfRange(u32),
    #[error("Address encoding failed: {0}")]
    EncodingFailed(String),
}

/// The fixed portion of a receive path: purpose and coin type pinned,
/// account chosen at construction, address index left variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceivePath {
    coin_type: u32,
    account: u32,
}

impl ReceivePath {
    pub fn new(coin_type: u32) -> Self {
        Self {
            coin_type,
            account: 0,
        }
    }

    pub fn with_account(coin_type: u32, account: u32) -> Self {
        Self { coin_type, account }
    }

    pub fn coin_type(&self) -> u32 {
        self.coin_type
    }

    /// Build the full derivation path for one address index.
    ///
    /// Index 2^31 and above would collide with the hardened range, so it is
    /// rejected rather than silently wrapped.
    pub fn address_path(&self, index: u32) -> Result<DerivationPath, DerivationError> {
        if index >= (1 << 31) {
            return Err(DerivationError::IndexOutOfRange(index));
        }
        if self.coin_type >= (1 << 31) || self.account >= (1 << 31) {
            return Err(DerivationError::InvalidPath(format!(
                "coin type {} / account {} not hardenable",
                self.coin_type, self.account
            )));
        }

        let path = format!(
            "m/{}'/{}'/{}'/0/{}",
            PURPOSE, self.coin_type, self.account, index
        );
        path.parse()
            .map_err(|e: bitcoin::bip32::Error| DerivationError::InvalidPath(e.to_string()))
    }
}

impl Default for ReceivePath {
    fn default() -> Self {
        Self::new(NEXA_COIN_TYPE)
    }
}

/// Derive the extended private key for one receiving index.
pub fn derive_receive_key(
    seed: &WalletSeed,
    path: &ReceivePath,
    index: u32,
) -> Result<Xpriv, DerivationError> {
    // The network only selects xpriv serialization version bytes; it does
    // not influence the derived key material.
    let master = Xpriv::new_master(Network::Bitcoin, seed.as_bytes())
        .map_err(|e| DerivationError::DerivationFailed(e.to_string()))?;

    let full_path = path.address_path(index)?;

    master
        .derive_priv(&bitcoin::secp256k1::Secp256k1::new(), &full_path)
        .map_err(|e| DerivationError::DerivationFailed(e.to_string()))
}
