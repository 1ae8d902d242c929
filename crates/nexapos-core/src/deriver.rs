//! The address deriver — owns the wallet seed and hands out receiving
//! addresses.
//!
//! Derivation itself is pure; the deriver adds a session-scoped index
//! counter so no two sales within a session reuse an address. Devices
//! running without a seed fall back to a single static address via
//! [`AddressSource::Static`].

use crate::address::{encode_address, ReceivingAddress};
use crate::keys::{derive_receive_key, DerivationError, ReceivePath};
use crate::seed::WalletSeed;

pub struct AddressDeriver {
    seed: WalletSeed,
    path: ReceivePath,
    next_index: u32,
}

impl AddressDeriver {
    pub fn new(seed: WalletSeed, path: ReceivePath) -> Self {
        Self {
            seed,
            path,
            next_index: 0,
        }
    }

    /// Derive the address at a specific index.
    ///
    /// Pure computation: the session counter does not move, and the same
    /// (seed, index) pair always yields the same address.
    pub fn derive_address(&self, index: u32) -> Result<ReceivingAddress, DerivationError> {
        let key = derive_receive_key(&self.seed, &self.path, index)?;
        encode_address(&key).map_err(|e| DerivationError::EncodingFailed(e.to_string()))
    }

    /// Allocate the next session index and derive its address.
    ///
    /// The counter only advances on success, so a failed derivation does
    /// not burn an index.
    pub fn next_address(&mut self) -> Result<(u32, ReceivingAddress), DerivationError> {
        let index = self.next_index;
        let address = self.derive_address(index)?;
        self.next_index = index
            .checked_add(1)
            .ok_or(DerivationError::IndexOutOfRange(index))?;
        Ok((index, address))
    }

    /// The index the next sale will use.
    pub fn peek_index(&self) -> u32 {
        self.next_index
    }

    pub fn path(&self) -> &ReceivePath {
        &self.path
    }
}

impl std::fmt::Debug for AddressDeriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddressDeriver")
            .field("path", &self.path)
            .field("next_index", &self.next_index)
            .finish_non_exhaustive()
    }
}

/// Where the device gets receiving addresses — fixed once at startup.
#[derive(Debug)]
pub enum AddressSource {
    /// HD derivation: a fresh address per sale.
    Derived(AddressDeriver),
    /// HD disabled or unavailable: one static address reused for every
    /// sale.
    Static(ReceivingAddress),
}

impl AddressSource {
    /// The address for the next sale, with its derivation index when HD
    /// derivation is active.
    pub fn next(&mut self) -> Result<(Option<u32>, ReceivingAddress), DerivationError> {
        match self {
            AddressSource::Derived(deriver) => deriver
                .next_address()
                .map(|(index, address)| (Some(index), address)),
            AddressSource::Static(address) => Ok((None, address.clone())),
        }
    }

    pub fn is_derived(&self) -> bool {
        matches!(self, AddressSource::Derived(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::{derive_seed, parse_mnemonic};

    fn test_deriver() -> AddressDeriver {
        let mnemonic = parse_mnemonic(
            "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about",
        )
        .unwrap();
        AddressDeriver::new(derive_seed(&mnemonic, ""), ReceivePath::default())
    }

    #[test]
    fn test_derive_deterministic() {
        let deriver = test_deriver();
        assert_eq!(
            deriver.derive_address(3).unwrap(),
            deriver.derive_address(3).unwrap()
        );
    }

    #[test]
    fn test_derive_distinct_per_index() {
        let deriver = test_deriver();
        let a0 = deriver.derive_address(0).unwrap();
        let a1 = deriver.derive_address(1).unwrap();
        assert_ne!(a0, a1);
    }

    #[test]
    fn test_next_address_never_repeats() {
        let mut deriver = test_deriver();

        let (i0, a0) = deriver.next_address().unwrap();
        let (i1, a1) = deriver.next_address().unwrap();
        let (i2, a2) = deriver.next_address().unwrap();

        assert_eq!((i0, i1, i2), (0, 1, 2));
        assert_ne!(a0, a1);
        assert_ne!(a1, a2);
        assert_ne!(a0, a2);
    }

    #[test]
    fn test_next_matches_pure_derivation() {
        let mut deriver = test_deriver();
        let pure = deriver.derive_address(0).unwrap();
        let (_, allocated) = deriver.next_address().unwrap();
        assert_eq!(pure, allocated);
    }

    #[test]
    fn test_static_source_reuses_address() {
        let mut source =
            AddressSource::Static(ReceivingAddress::from_string("nexa1static".into()));

        let (i0, a0) = source.next().unwrap();
        let (i1, a1) = source.next().unwrap();

        assert_eq!(i0, None);
        assert_eq!(i1, None);
        assert_eq!(a0, a1);
    }

    #[test]
    fn test_derived_source_advances() {
        let mut source = AddressSource::Derived(test_deriver());
        assert!(source.is_derived());

        let (i0, a0) = source.next().unwrap();
        let (i1, a1) = source.next().unwrap();

        assert_eq!(i0, Some(0));
        assert_eq!(i1, Some(1));
        assert_ne!(a0, a1);
    }

    #[test]
    fn test_debug_redacts_seed() {
        let deriver = test_deriver();
        let debug = format!("{:?}", deriver);
        assert!(!debug.contains("seed"));
    }
}
