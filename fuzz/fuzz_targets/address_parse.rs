#![no_main]

use libfuzzer_sys::fuzz_target;
use nexapos_core::ReceivingAddress;

fuzz_target!(|data: &[u8]| {
    // Addresses can arrive from config files and QR scans.
    // ReceivingAddress::parse must never panic — it should always return Ok or Err.
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = ReceivingAddress::parse(s);
    }
});
