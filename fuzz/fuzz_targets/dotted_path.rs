//! Fuzz target for dotted-path edits on arbitrary JSON.
//!
//! The first line of the input is the path, the rest the document.
//!
//! Run with: cargo +nightly fuzz run dotted_path

#![no_main]

use libfuzzer_sys::fuzz_target;
use tarpatch::patch::{delete_path, get_path, set_path};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let (path, body) = text.split_once('\n').unwrap_or((text, "{}"));
    let Ok(mut doc) = serde_json::from_str::<serde_json::Value>(body) else {
        return;
    };

    set_path(&mut doc, path, serde_json::Value::Bool(true));
    let _ = get_path(&doc, path);
    delete_path(&mut doc, path);
});
