//! Receiving-address encoding
//!
//! An address is the bech32m encoding of a version byte plus the hash160
//! of the derived compressed public key, carrying the `nexa`
//! human-readable prefix.

use bech32::{Bech32m, Hrp};
use bitcoin::bip32::{Xpriv, Xpub};
use bitcoin::hashes::{hash160, Hash};
use thiserror::Error;

/// Human-readable prefix for Nexa addresses
pub const ADDRESS_HRP: &str = "nexa";

/// Version byte for pay-to-pubkey-hash payloads
const VERSION_PUBKEY_HASH: u8 = 0x00;

/// Payload length: version byte + 20-byte key hash
const PAYLOAD_LEN: usize = 21;

#[derive(Error, Debug)]
pub enum AddressError {
    #[error("Encoding failed: {0}")]
    EncodingFailed(String),
    #[error("Not a valid address: {0}")]
    InvalidAddress(String),
    #[error("Wrong prefix: expected nexa, got {0}")]
    WrongPrefix(String),
}

/// An encoded receiving address (`nexa1…`).
///
/// Immutable once created; equality is plain string equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReceivingAddress(String);

impl ReceivingAddress {
    /// Wrap an externally supplied address string without validation.
    /// Used for the configured fallback address; callers that need the
    /// checksum verified go through [`ReceivingAddress::parse`].
    pub fn from_string(address: String) -> Self {
        Self(address)
    }

    /// Parse and validate an address: bech32 checksum, `nexa` prefix,
    /// payload layout.
    pub fn parse(s: &str) -> Result<Self, AddressError> {
        let (hrp, payload) =
            bech32::decode(s).map_err(|e| AddressError::InvalidAddress(e.to_string()))?;

        if hrp.as_str() != ADDRESS_HRP {
            return Err(AddressError::WrongPrefix(hrp.as_str().to_string()));
        }
        if payload.len() != PAYLOAD_LEN || payload[0] != VERSION_PUBKEY_HASH {
            return Err(AddressError::InvalidAddress(format!(
                "unexpected payload ({} bytes)",
                payload.len()
            )));
        }

        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for ReceivingAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encode the receiving address for a derived key.
pub fn encode_address(key: &Xpriv) -> Result<ReceivingAddress, AddressError> {
    let secp = bitcoin::secp256k1::Secp256k1::new();
    let pubkey = Xpub::from_priv(&secp, key).public_key;

    let key_hash = hash160::Hash::hash(&pubkey.serialize());

    let mut payload = Vec::with_capacity(PAYLOAD_LEN);
    payload.push(VERSION_PUBKEY_HASH);
    payload.extend_from_slice(key_hash.as_byte_array());

    let hrp = Hrp::parse(ADDRESS_HRP).map_err(|e| AddressError::EncodingFailed(e.to_string()))?;
    let encoded = bech32::encode::<Bech32m>(hrp, &payload)
        .map_err(|e| AddressError::EncodingFailed(e.to_string()))?;

    Ok(ReceivingAddress(encoded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{derive_receive_key, ReceivePath};
    use crate::seed::{derive_seed, parse_mnemonic};

    fn test_key(index: u32) -> Xpriv {
        let mnemonic = parse_mnemonic(
            "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about",
        )
        .unwrap();
        let seed = derive_seed(&mnemonic, "");
        derive_receive_key(&seed, &ReceivePath::default(), index).unwrap()
    }

    #[test]
    fn test_encode_has_prefix() {
        let address = encode_address(&test_key(0)).unwrap();
        assert!(address.as_str().starts_with("nexa1"));
    }

    #[test]
    fn test_encode_parse_round_trip() {
        let address = encode_address(&test_key(0)).unwrap();
        let parsed = ReceivingAddress::parse(address.as_str()).unwrap();
        assert_eq!(address, parsed);
    }

    #[test]
    fn test_parse_rejects_foreign_prefix() {
        // A valid bech32 string on the wrong chain namespace
        let err = ReceivingAddress::parse("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4");
        assert!(matches!(err, Err(AddressError::WrongPrefix(_))));
    }

    #[test]
    fn test_parse_rejects_corrupted_checksum() {
        let address = encode_address(&test_key(0)).unwrap();
        let mut chars: Vec<char> = address.as_str().chars().collect();
        let last = chars.len() - 1;
        chars[last] = if chars[last] == 'q' { 'p' } else { 'q' };
        let corrupted: String = chars.into_iter().collect();

        assert!(ReceivingAddress::parse(&corrupted).is_err());
    }

    #[test]
    fn test_distinct_keys_distinct_addresses() {
        let a0 = encode_address(&test_key(0)).unwrap();
        let a1 = encode_address(&test_key(1)).unwrap();
        assert_ne!(a0, a1);
    }
}
