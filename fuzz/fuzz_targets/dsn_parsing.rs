#![no_main]

//! Fuzz target for DSN parsing.
//!
//! Accepted DSNs must expose a public key and project id, and their display
//! form must never contain the secret key.

use flare_core::Dsn;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(dsn) = raw.parse::<Dsn>() else {
        return;
    };

    assert!(!dsn.public_key().is_empty());
    assert!(!dsn.project_id().is_empty());
    assert!(dsn.store_url().path().ends_with("/store/"));

    if let Some(secret) = dsn.secret_key() {
        let shown = dsn.to_string();
        assert!(!shown.contains(&format!(":{secret}@")));
    }
});
