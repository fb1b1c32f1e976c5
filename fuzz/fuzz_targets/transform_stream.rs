//! Fuzz target for transform_stream with arbitrary byte input.
//!
//! Feeds the bytes as an archive through a rule set that exercises every
//! built-in action. Errors are expected; panics and hangs are not.
//!
//! Run with: cargo +nightly fuzz run transform_stream

#![no_main]

use libfuzzer_sys::fuzz_target;
use std::sync::OnceLock;
use tarpatch::{OutputCompression, PipelineConfig, Rule, TransformOptions, transform_stream};

fn rules() -> &'static [Rule] {
    static RULES: OnceLock<Vec<Rule>> = OnceLock::new();
    RULES.get_or_init(|| {
        vec![
            Rule::suppress(["**/*.log"]).expect("valid pattern"),
            Rule::json_patch(["**/*.json"], ["scripts", "a.0.b"]).expect("valid pattern"),
        ]
    })
}

fuzz_target!(|data: &[u8]| {
    // Inline stages keep the run single-threaded and deterministic
    let options = TransformOptions::new()
        .compression(OutputCompression::None)
        .pipeline(PipelineConfig::inline());

    let mut output = Vec::new();
    if transform_stream(data, &mut output, rules(), &options).is_ok() {
        // A successful run must itself be a readable archive
        let mut archive = tar::Archive::new(output.as_slice());
        if let Ok(entries) = archive.entries() {
            for entry in entries {
                let _ = entry.map(|e| e.size());
            }
        }
    }
});
