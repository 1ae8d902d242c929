#![no_main]

use libfuzzer_sys::fuzz_target;
use nexapos_ledger::SaleRecord;

fuzz_target!(|data: &[u8]| {
    // Ledger lines come back off flash after arbitrary torn writes.
    // from_csv_line must never panic — it should always return Ok or Err.
    if let Ok(line) = std::str::from_utf8(data) {
        if let Ok(record) = SaleRecord::from_csv_line(line) {
            // A line that parses must re-encode and re-parse identically
            let reencoded = record.to_csv_line();
            let reparsed = SaleRecord::from_csv_line(reencoded.trim_end_matches('\n'))
                .expect("re-encoded record must parse");
            assert_eq!(record, reparsed);
        }
    }
});
