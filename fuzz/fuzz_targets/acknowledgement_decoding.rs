#![no_main]

//! Fuzz target for acknowledgement decoding.
//!
//! Response bodies come from the network and may be anything. Decoding must
//! classify every input as an id, no content, or a protocol fault without
//! panicking.

use flare_transport::{response::decode_event_id, FaultKind};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(body) = std::str::from_utf8(data) else {
        return;
    };

    match decode_event_id(body) {
        Ok(Some(id)) => {
            assert!(!id.is_empty());
            assert!(body.trim_start().starts_with('{'), "only objects carry an id");
        },
        Ok(None) => assert!(body.trim().is_empty()),
        Err(fault) => assert_eq!(fault.kind(), FaultKind::Protocol),
    }
});
