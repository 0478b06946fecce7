//! Fuzz target: `TransactionRecord::parse`
//!
//! Drives arbitrary broker payloads through the wire parser and asserts
//! that it never panics, that accepted records have an in-range tap, and
//! that every accepted record re-encodes to a string that parses back to
//! the same record.
//!
//! cargo fuzz run fuzz_wire_parse

#![no_main]

use libfuzzer_sys::fuzz_target;
use waterkiosk::config::NUM_OF_TAPS;
use waterkiosk::transaction::TransactionRecord;

fuzz_target!(|data: &[u8]| {
    let Ok(wire) = core::str::from_utf8(data) else {
        return;
    };
    let Ok(record) = TransactionRecord::parse(wire) else {
        return;
    };

    if let Some(tap) = record.tap {
        assert!(tap < NUM_OF_TAPS, "tap index out of range");
    }

    let encoded = record.encode().expect("accepted record must encode");
    let again = TransactionRecord::parse(&encoded).expect("encoded record must parse");
    assert_eq!(again, record);
});
