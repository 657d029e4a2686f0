//! Fuzz target for LLM response parsing.
//!
//! Run with: cargo +nightly fuzz run fuzz_parse_response
//!
//! Any text the model sends back must parse or fail with `ParseError`.

#![no_main]

use chrono::Utc;
use libfuzzer_sys::fuzz_target;
use promptstack_core::suggestion::parse_suggestions_response;

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    if let Ok(response) = parse_suggestions_response(&raw, Utc::now()) {
        for suggestion in &response.suggestions {
            assert!(!suggestion.title.trim().is_empty());
            assert!(suggestion.edits.iter().all(|e| e.line >= 1 && e.column >= 1));
        }
    }
});
