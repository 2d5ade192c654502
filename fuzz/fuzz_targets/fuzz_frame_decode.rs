#![no_main]

use libfuzzer_sys::fuzz_target;
use rcp1_protocol::Frame;

fuzz_target!(|data: &[u8]| {
    // Fuzz frame decoding - test for panics, crashes, unbounded allocations
    if let Ok(frame) = Frame::from_bytes(data) {
        // If decoding succeeds, test the encode roundtrip
        let encoded = frame.to_bytes().unwrap();
        let decoded = Frame::from_bytes(&encoded).unwrap();
        assert_eq!(decoded.payload, frame.payload);
    }
});
