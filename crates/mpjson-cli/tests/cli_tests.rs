//! Integration tests for the `mpjson` CLI binary.
//!
//! These tests use `assert_cmd` and `predicates` to exercise the encode, decode,
//! and stats subcommands through the actual binary, including stdin/stdout piping,
//! file I/O, base64 arguments, error handling, and roundtrip correctness.

// `Command::cargo_bin` was deprecated in assert_cmd 2.1.2 in favor of
// `cargo::cargo_bin_cmd!`. Allow it until we migrate.
#![allow(deprecated)]

use assert_cmd::Command;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use predicates::prelude::*;
use std::path::PathBuf;

/// Helper: path to the sample.json fixture.
fn sample_json_path() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/sample.json")
}

/// Helper: read the sample.json fixture as a string.
fn sample_json() -> String {
    std::fs::read_to_string(sample_json_path()).expect("sample.json fixture must exist")
}

/// Helper: a per-test scratch path, removed first if a prior run left it behind.
fn scratch(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("mpjson-test-{}-{name}", std::process::id()));
    let _ = std::fs::remove_file(&path);
    path
}

fn mpjson() -> Command {
    Command::cargo_bin("mpjson").unwrap()
}

// ─────────────────────────────────────────────────────────────────────────────
// Encode subcommand
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn encode_stdin_to_stdout() {
    mpjson()
        .arg("encode")
        .write_stdin(r#"{"b": 1, "a": 2}"#)
        .assert()
        .success()
        .stdout(predicate::eq(&b"\x82\xa1b\x01\xa1a\x02"[..]));
}

#[test]
fn encode_reference_vector() {
    mpjson()
        .arg("encode")
        .write_stdin(r#"{"a": 1, "b": 2, "c": 3}"#)
        .assert()
        .success()
        .stdout(predicate::eq(&b"\x83\xa1a\x01\xa1b\x02\xa1c\x03"[..]));
}

#[test]
fn encode_file_to_file() {
    let output_path = scratch("encode.msgpack");

    mpjson()
        .args(["encode", "-i", sample_json_path(), "-o"])
        .arg(&output_path)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let content = std::fs::read(&output_path).expect("output file must exist");
    assert_eq!(content, mpjson_core::encode(&sample_json(), false).unwrap());

    let _ = std::fs::remove_file(&output_path);
}

#[test]
fn encode_base64_argument_and_output() {
    mpjson()
        .args(["encode", "--base64-output", "eyJiIjogMSwgImEiOiAyfQ=="])
        .assert()
        .success()
        .stdout("gqFiAaFhAg==\n");
}

#[test]
fn encode_single_float() {
    mpjson()
        .args(["encode", "--single-float"])
        .write_stdin("1.5")
        .assert()
        .success()
        .stdout(predicate::eq(&[0xca, 0x3f, 0xc0, 0x00, 0x00][..]));

    mpjson()
        .arg("encode")
        .write_stdin("1.5")
        .assert()
        .success()
        .stdout(predicate::eq(
            &[0xcb, 0x3f, 0xf8, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00][..],
        ));
}

#[test]
fn encode_binary_sentinel() {
    mpjson()
        .args(["encode", "--base64-output"])
        .write_stdin(r#"{"$binary": "cafe"}"#)
        .assert()
        .success()
        .stdout(format!("{}\n", STANDARD.encode([0xc4, 0x02, 0xca, 0xfe])));
}

#[test]
fn encode_invalid_json_fails() {
    mpjson()
        .arg("encode")
        .write_stdin("this is not valid json {{{")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to encode JSON to MessagePack"))
        .stderr(predicate::str::contains("line 1, column 1"));
}

#[test]
fn encode_duplicate_key_fails() {
    mpjson()
        .arg("encode")
        .write_stdin(r#"{"a": 1, "a": 2}"#)
        .assert()
        .failure()
        .stderr(predicate::str::contains("duplicate key"));
}

#[test]
fn encode_non_utf8_input_fails() {
    mpjson()
        .arg("encode")
        .write_stdin(vec![b'"', 0xff, b'"'])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not valid UTF-8"));
}

#[test]
fn encode_invalid_base64_fails() {
    mpjson()
        .args(["encode", "not*base64"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("base64"));
}

#[test]
fn encode_missing_file_fails() {
    mpjson()
        .args(["encode", "-i", "/nonexistent/mpjson/input.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read file"));
}

#[test]
fn encode_input_and_base64_conflict() {
    mpjson()
        .args(["encode", "-i", sample_json_path(), "e30="])
        .assert()
        .failure();
}

// ─────────────────────────────────────────────────────────────────────────────
// Decode subcommand
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn decode_stdin_to_stdout() {
    mpjson()
        .arg("decode")
        .write_stdin(&b"\x82\xa1b\x01\xa1a\x02"[..])
        .assert()
        .success()
        .stdout("{\"b\": 1, \"a\": 2}\n");
}

#[test]
fn decode_base64_argument() {
    mpjson()
        .args(["decode", "g6FhAaFiAqFjAw=="])
        .assert()
        .success()
        .stdout("{\"a\": 1, \"b\": 2, \"c\": 3}\n");
}

#[test]
fn decode_styles() {
    mpjson()
        .args(["decode", "--style", "compact", "gqFiAaFhAg=="])
        .assert()
        .success()
        .stdout("{\"b\":1,\"a\":2}\n");

    mpjson()
        .args(["decode", "--style", "pretty", "gqFiAaFhAg=="])
        .assert()
        .success()
        .stdout("{\n  \"b\": 1,\n  \"a\": 2\n}\n");
}

#[test]
fn decode_binary_payload() {
    mpjson()
        .arg("decode")
        .write_stdin(&[0xc4, 0x02, 0xca, 0xfe][..])
        .assert()
        .success()
        .stdout("{\"$binary\": \"cafe\"}\n");
}

#[test]
fn decode_file_to_file() {
    let msgpack_path = scratch("decode-input.msgpack");
    let json_path = scratch("decode-output.json");

    mpjson()
        .args(["encode", "-i", sample_json_path(), "-o"])
        .arg(&msgpack_path)
        .assert()
        .success();

    mpjson()
        .arg("decode")
        .arg("-i")
        .arg(&msgpack_path)
        .arg("-o")
        .arg(&json_path)
        .assert()
        .success();

    let content = std::fs::read_to_string(&json_path).expect("output JSON file must exist");
    assert_eq!(content, sample_json(), "Decoded JSON should match the fixture exactly");

    let _ = std::fs::remove_file(&msgpack_path);
    let _ = std::fs::remove_file(&json_path);
}

#[test]
fn decode_truncated_input_fails() {
    mpjson()
        .arg("decode")
        .write_stdin(&[0x92, 0x01][..])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to decode MessagePack to JSON"))
        .stderr(predicate::str::contains("offset 2"));
}

#[test]
fn decode_extension_type_fails() {
    mpjson()
        .arg("decode")
        .write_stdin(&[0xd4, 0x01, 0x00][..])
        .assert()
        .failure()
        .stderr(predicate::str::contains("extension"));
}

#[test]
fn decode_max_depth() {
    // [[[1]]]
    let nested = [0x91, 0x91, 0x91, 0x01];

    mpjson()
        .args(["decode", "--max-depth", "3"])
        .write_stdin(&nested[..])
        .assert()
        .success()
        .stdout("[[[1]]]\n");

    mpjson()
        .args(["decode", "--max-depth", "2"])
        .write_stdin(&nested[..])
        .assert()
        .failure()
        .stderr(predicate::str::contains("depth"));

    mpjson()
        .args(["decode", "--max-depth", "0"])
        .write_stdin(&nested[..])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--max-depth must be at least 1"));
}

#[test]
fn decode_unknown_style_fails() {
    mpjson()
        .args(["decode", "--style", "yaml", "wA=="])
        .assert()
        .failure();
}

// ─────────────────────────────────────────────────────────────────────────────
// Stats subcommand
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn stats_output_format() {
    mpjson()
        .args(["stats", "-i", sample_json_path()])
        .assert()
        .success()
        .stdout(predicate::str::contains("JSON size:"))
        .stdout(predicate::str::contains("MessagePack size:"))
        .stdout(predicate::str::contains("Reduction:"))
        .stdout(predicate::str::contains("%"));
}

#[test]
fn stats_reports_exact_sizes() {
    let json = r#"{"a": 1, "b": 2, "c": 3}"#;
    mpjson()
        .arg("stats")
        .write_stdin(json)
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("JSON size:        {} bytes", json.len())))
        .stdout(predicate::str::contains("MessagePack size: 10 bytes"));
}

#[test]
fn stats_single_float_is_smaller() {
    mpjson()
        .args(["stats", "--single-float"])
        .write_stdin("[0.1, 0.2]")
        .assert()
        .success()
        .stdout(predicate::str::contains("MessagePack size: 11 bytes"));

    mpjson()
        .arg("stats")
        .write_stdin("[0.1, 0.2]")
        .assert()
        .success()
        .stdout(predicate::str::contains("MessagePack size: 19 bytes"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Roundtrip
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn roundtrip_encode_decode_pipeline() {
    let input_json = sample_json();

    let encode_output = mpjson()
        .arg("encode")
        .write_stdin(input_json.clone())
        .output()
        .expect("encode should run");
    assert!(encode_output.status.success(), "encode must succeed");

    let decode_output = mpjson()
        .arg("decode")
        .write_stdin(encode_output.stdout)
        .output()
        .expect("decode should run");
    assert!(decode_output.status.success(), "decode must succeed");
    let result_json = String::from_utf8(decode_output.stdout).expect("JSON should be valid UTF-8");

    assert_eq!(
        result_json.trim_end(),
        input_json,
        "Roundtrip should preserve key order, numbers and binary payloads"
    );
}

#[test]
fn roundtrip_all_key_orders() {
    for json in [
        r#"{"a": 1, "b": 2, "c": 3}"#,
        r#"{"a": 1, "c": 2, "b": 3}"#,
        r#"{"b": 1, "a": 2, "c": 3}"#,
        r#"{"b": 1, "c": 2, "a": 3}"#,
        r#"{"c": 1, "a": 2, "b": 3}"#,
        r#"{"c": 1, "b": 2, "a": 3}"#,
    ] {
        let encoded = mpjson()
            .args(["encode", "--base64-output"])
            .write_stdin(json)
            .output()
            .expect("encode should run");
        assert!(encoded.status.success());
        let b64 = String::from_utf8(encoded.stdout).unwrap();

        mpjson()
            .args(["decode", b64.trim()])
            .assert()
            .success()
            .stdout(format!("{json}\n"));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Edge cases
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn encode_empty_object() {
    mpjson()
        .arg("encode")
        .write_stdin("{}")
        .assert()
        .success()
        .stdout(predicate::eq(&[0x80][..]));
}

#[test]
fn encode_empty_input_fails() {
    mpjson()
        .arg("encode")
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to encode"));
}

#[test]
fn no_subcommand_shows_usage() {
    mpjson()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn help_lists_subcommands() {
    mpjson()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("encode"))
        .stdout(predicate::str::contains("decode"))
        .stdout(predicate::str::contains("stats"));
}
