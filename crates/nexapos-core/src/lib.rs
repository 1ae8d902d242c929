//! NexaPOS Core
//!
//! Seed handling and receiving-address derivation for NexaPOS.
//!
//! # Address Derivation
//!
//! From a single BIP-39 seed, receiving addresses are derived on the Nexa
//! coin type (SLIP-0044 index 29223):
//! `m/44'/29223'/{account}'/0/{index}`
//!
//! # Encrypted Storage
//!
//! Seeds are encrypted at rest under the operator PIN using
//! Argon2id + AES-256-GCM.

pub mod address;
pub mod deriver;
pub mod keys;
pub mod memory;
pub mod seed;
pub mod vault;

pub use address::{encode_address, AddressError, ReceivingAddress, ADDRESS_HRP};
pub use deriver::{AddressDeriver, AddressSource};
pub use keys::{derive_receive_key, DerivationError, ReceivePath, NEXA_COIN_TYPE};
pub use seed::{derive_seed, generate_mnemonic, parse_mnemonic, SeedError, WalletSeed};
pub use vault::{decrypt_seed, encrypt_seed, EncryptedSeed, VaultError};
