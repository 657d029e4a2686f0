//! Fuzz target for the edit applier and diff generator.
//!
//! Run with: cargo +nightly fuzz run fuzz_apply_edits
//!
//! Input layout: a document, a NUL byte, then edits separated by NUL bytes as
//! `line:column:old|new`. Checks that a successful apply agrees with the
//! diff's patch and never panics otherwise.

#![no_main]

use libfuzzer_sys::fuzz_target;
use promptstack_core::suggestion::{Edit, apply_edits, generate_unified_diff};

fn parse_edit(chunk: &str) -> Option<Edit> {
    let mut parts = chunk.splitn(3, ':');
    let line = parts.next()?.parse().ok()?;
    let column = parts.next()?.parse().ok()?;
    let (old, new) = parts.next()?.split_once('|')?;
    Some(Edit::new(line, column, old, new))
}

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let mut chunks = input.split('\0');
    let document = chunks.next().unwrap_or_default();
    let edits: Vec<Edit> = chunks.filter_map(parse_edit).collect();

    match apply_edits(document, &edits) {
        Ok(applied) => {
            let diff = generate_unified_diff(document, &edits, 3).expect("diff of valid edits");
            assert_eq!(diff.patch(document).as_deref(), Some(applied.as_str()));
        }
        Err(_) => assert!(generate_unified_diff(document, &edits, 3).is_err()),
    }
});
