#![no_main]

use libfuzzer_sys::fuzz_target;
use nexapos_core::EncryptedSeed;

fuzz_target!(|data: &[u8]| {
    // Try deserializing arbitrary bytes as a seed vault.
    // EncryptedSeed::from_bytes must never panic — it should always return Ok or Err.
    if let Ok(vault) = EncryptedSeed::from_bytes(data) {
        // If deserialization succeeds, round-trip serialization must not panic either
        let bytes = vault.to_bytes();
        let _ = EncryptedSeed::from_bytes(&bytes);
    }
});
