//! Failure handling: aborted runs must leave the output path untouched.

use std::fs;
use tempfile::TempDir;
use tarpatch::{Error, PipelineConfig, Rule, TransformConfig, TransformOptions, transform};

mod common;
use common::files;

#[test]
fn test_malformed_json_leaves_output_untouched() {
    let dir = TempDir::new().unwrap();
    let input = common::write_tgz(
        dir.path(),
        "in.tgz",
        &files(&[
            ("package/index.js", b"ok"),
            ("package/package.json", b"{\"name\": \"x\", "),
            ("package/after.js", b"never reached"),
        ]),
    );
    let output = common::write_tgz(dir.path(), "out.tgz", &files(&[("previous", b"run")]));
    let before = fs::read(&output).unwrap();

    let config = TransformConfig::new(&input, &output)
        .rule(Rule::json_patch(["package/package.json"], ["scripts"]).unwrap());
    let err = transform(&config).unwrap_err();

    assert!(matches!(err, Error::MalformedJson { .. }), "{:?}", err);
    assert_eq!(err.entry_name(), Some("package/package.json"));
    assert_eq!(fs::read(&output).unwrap(), before);
    assert!(!config.temp_path().exists());
    assert!(input.exists());
}

#[test]
fn test_non_utf8_json_is_malformed() {
    let dir = TempDir::new().unwrap();
    let input = common::write_tgz(dir.path(), "in.tgz", &files(&[("m.json", b"{\"a\":\"\xff\"}")]));
    let output = dir.path().join("out.tgz");

    let config = TransformConfig::new(&input, &output).rule(Rule::json_patch(["m.json"], ["a"]).unwrap());
    let err = transform(&config).unwrap_err();

    assert!(matches!(err, Error::MalformedJson { .. }));
    assert!(!output.exists());
}

#[test]
fn test_missing_input_is_source_error() {
    let dir = TempDir::new().unwrap();
    let config = TransformConfig::new(dir.path().join("absent.tgz"), dir.path().join("out.tgz"));

    let err = transform(&config).unwrap_err();

    assert!(err.is_source_error());
    assert!(err.to_string().contains("absent.tgz"), "{}", err);
    assert!(common::dir_listing(dir.path()).is_empty());
}

#[test]
fn test_truncated_gzip_is_source_error() {
    let dir = TempDir::new().unwrap();
    let big: Vec<u8> = (0..100_000u32).map(|i| (i * 7 % 256) as u8).collect();
    let mut bytes = common::tgz_bytes(&files(&[("a.bin", &big), ("b.bin", &big)]));
    bytes.truncate(bytes.len() / 2);
    let input = dir.path().join("cut.tgz");
    fs::write(&input, bytes).unwrap();
    let output = dir.path().join("out.tgz");

    let err = transform(&TransformConfig::new(&input, &output)).unwrap_err();

    assert!(err.is_source_error(), "{:?}", err);
    assert!(!output.exists());
    assert!(!TransformConfig::new(&input, &output).temp_path().exists());
}

#[test]
fn test_corrupt_tar_header_is_source_error() {
    let dir = TempDir::new().unwrap();
    let mut tar = common::tar_bytes(&files(&[("a.txt", b"hello")]));
    // Break the header checksum
    tar[148] ^= 0x55;
    let input = dir.path().join("bad.tar");
    fs::write(&input, tar).unwrap();

    let err = transform(&TransformConfig::new(&input, dir.path().join("out.tgz"))).unwrap_err();

    assert!(matches!(err, Error::SourceRead { path: Some(_), .. }), "{:?}", err);
}

#[test]
fn test_missing_output_directory_is_output_error() {
    let dir = TempDir::new().unwrap();
    let input = common::write_tgz(dir.path(), "in.tgz", &files(&[("a", b"1")]));
    let output = dir.path().join("no-such-dir").join("out.tgz");

    let err = transform(&TransformConfig::new(&input, &output)).unwrap_err();

    assert!(matches!(err, Error::OutputWrite { .. }), "{:?}", err);
    assert!(input.exists());
}

#[test]
fn test_remove_input_on_abort() {
    let dir = TempDir::new().unwrap();
    let input = common::write_tgz(dir.path(), "in.tgz", &files(&[("m.json", b"not json")]));
    let output = dir.path().join("out.tgz");

    let config = TransformConfig::new(&input, &output)
        .rule(Rule::json_patch(["m.json"], ["x"]).unwrap())
        .remove_input_on_abort(true);
    transform(&config).unwrap_err();

    assert!(common::dir_listing(dir.path()).is_empty());
}

#[test]
fn test_invalid_pipeline_never_touches_files() {
    let dir = TempDir::new().unwrap();
    let input = common::write_tgz(dir.path(), "in.tgz", &files(&[("a", b"1")]));

    let config = TransformConfig::new(&input, dir.path().join("out.tgz"))
        .remove_input_on_abort(true)
        .options(TransformOptions::new().pipeline(PipelineConfig::default().chunk_size(0)));
    let err = transform(&config).unwrap_err();

    assert!(err.is_config_error());
    assert_eq!(common::dir_listing(dir.path()), ["in.tgz"]);
}

#[test]
fn test_invalid_pattern_rejected_up_front() {
    let err = Rule::suppress(["**/[.log"]).unwrap_err();
    assert!(matches!(err, Error::InvalidPattern { ref pattern, .. } if pattern == "**/[.log"));
}
