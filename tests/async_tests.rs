//! Integration tests for the async API.
//!
//! These tests verify that runs moved onto Tokio's blocking pool behave like
//! their synchronous counterparts.

#![cfg(feature = "async")]

use serde_json::Value;
use tempfile::TempDir;
use tarpatch::{ActionKind, Indent, Rule, TransformConfig, TransformOptions, plan_async, transform_async};

mod common;
use common::files;

#[tokio::test]
async fn test_async_transform_rewrites_manifest() {
    let dir = TempDir::new().unwrap();
    let input = common::write_tgz(
        dir.path(),
        "pkg.tgz",
        &files(&[
            ("package/package.json", br#"{"name":"x","devDependencies":{"a":"1"}}"#),
            ("package/index.js", b"js"),
        ]),
    );
    let output = dir.path().join("out.tgz");

    let config = TransformConfig::new(&input, &output)
        .rule(Rule::json_patch(["package/package.json"], ["devDependencies"]).unwrap())
        .options(TransformOptions::new().indent(Indent::Text("\t".into())));
    let report = transform_async(config).await.unwrap();

    assert_eq!(report.entries_rewritten, 1);
    let manifest = common::entry_data(&output, "package/package.json");
    assert_eq!(manifest, b"{\n\t\"name\": \"x\"\n}");
    let value: Value = serde_json::from_slice(&manifest).unwrap();
    assert!(value.get("devDependencies").is_none());
}

#[tokio::test]
async fn test_async_plan_matches_sync_plan() {
    let dir = TempDir::new().unwrap();
    let input = common::write_tgz(
        dir.path(),
        "pkg.tgz",
        &files(&[("a.log", b"1"), ("b.txt", b"2")]),
    );
    let config = TransformConfig::new(&input, &input).rule(Rule::suppress(["*.log"]).unwrap());

    let sync_plan = tarpatch::plan(&config).unwrap();
    let async_plan = plan_async(config).await.unwrap();

    assert_eq!(async_plan, sync_plan);
    assert_eq!(async_plan[0].action, ActionKind::Suppress);
}

#[tokio::test]
async fn test_concurrent_async_transforms() {
    let dir = TempDir::new().unwrap();
    let mut handles = Vec::new();
    for i in 0..4 {
        let name = format!("file{}.txt", i);
        let input = common::write_tgz(
            dir.path(),
            &format!("in{}.tgz", i),
            &files(&[(name.as_str(), name.as_bytes())]),
        );
        let output = dir.path().join(format!("out{}.tgz", i));
        let config = TransformConfig::new(input, output);
        handles.push(tokio::spawn(transform_async(config)));
    }

    for handle in handles {
        let report = handle.await.unwrap().unwrap();
        assert_eq!(report.entries_copied, 1);
    }
}
