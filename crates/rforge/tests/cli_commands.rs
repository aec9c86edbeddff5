#![cfg(feature = "cli")]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use bytes::BytesMut;
use rforge_frame::{encode_frame, Command as LinkCommand, DEFAULT_MAX_PAYLOAD};
use rforge_record::MAGIC;
use rforge_stream::{encode_binary, DataFrame};

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "rforge-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn rforge(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rforge"))
        .args(["--log-level", "error"])
        .args(args)
        .output()
        .expect("rforge should run")
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("temp path should be UTF-8")
}

/// A record of a 2 Hz sine on channel 0, 100 samples/s for 5 s.
fn write_sine_record(path: &Path) {
    let mut bytes = MAGIC.to_vec();
    for i in 0..500u64 {
        let t = i as f64 / 100.0;
        let ts = i * 10_000;
        let frame = DataFrame::from_values(ts, [(2.0 * std::f64::consts::PI * 2.0 * t).sin(), 1.0]);
        let payload = encode_binary(&frame);
        bytes.extend(ts.to_le_bytes());
        bytes.extend(ts.to_le_bytes());
        bytes.extend((payload.len() as u32).to_le_bytes());
        bytes.extend(payload.as_ref());
    }
    std::fs::write(path, bytes).expect("record should be writable");
}

#[test]
fn encode_raw_matches_wire_reference() {
    let out = rforge(&[
        "--format", "raw", "encode", "--command", "ping", "--data", "ABC",
    ]);
    assert!(out.status.success());
    assert_eq!(
        out.stdout,
        vec![0xAA, 0x55, 0x01, 0x01, 0x00, 0x00, 0x03, 0x00, 0x41, 0x42, 0x43, 0xC4, 0x63]
    );
}

#[test]
fn encode_unknown_command_is_usage_error() {
    let out = rforge(&["encode", "--command", "launch"]);
    assert_eq!(out.status.code(), Some(64));
}

#[test]
fn decode_capture_skips_noise() {
    let dir = unique_temp_dir("decode");
    let capture = dir.join("link.bin");

    let mut bytes = BytesMut::from(&[0x00, 0x13, 0xAA][..]);
    encode_frame(LinkCommand::Ping, 1, b"hi", DEFAULT_MAX_PAYLOAD, &mut bytes).unwrap();
    bytes.extend_from_slice(&[0x55, 0xFF]);
    encode_frame(LinkCommand::Ack, 2, b"", DEFAULT_MAX_PAYLOAD, &mut bytes).unwrap();
    std::fs::write(&capture, &bytes).unwrap();

    let out = rforge(&["--format", "json", "decode", path_str(&capture)]);
    assert!(out.status.success());
    let lines: Vec<serde_json::Value> = String::from_utf8_lossy(&out.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line should be JSON"))
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["command"], "PING");
    assert_eq!(lines[0]["sequence"], 1);
    assert_eq!(lines[0]["payload"], "hi");
    assert_eq!(lines[1]["command"], "ACK");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn replay_export_and_stats_on_record() {
    let dir = unique_temp_dir("record");
    let record = dir.join("sine.rfr");
    let csv = dir.join("sine.csv");
    write_sine_record(&record);

    let out = rforge(&["--format", "json", "replay", path_str(&record)]);
    assert!(out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout).lines().count(), 500);

    let out = rforge(&["--format", "json", "export", path_str(&record), path_str(&csv)]);
    assert!(out.status.success());
    let summary: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(summary["rows"], 1000);
    let text = std::fs::read_to_string(&csv).unwrap();
    assert!(text.starts_with("timestamp_us,channel_id,value\n0,0,"));
    assert_eq!(text.lines().count(), 1001);

    let out = rforge(&["--format", "json", "stats", path_str(&record), "--channel", "0"]);
    assert!(out.status.success());
    let stats: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(stats["sample_count"], 500);
    let freq = stats["frequency_hz"].as_f64().unwrap();
    assert!((freq - 2.0).abs() < 0.2, "estimated {freq} Hz");

    let out = rforge(&["stats", path_str(&record), "--channel", "9"]);
    assert_eq!(out.status.code(), Some(60));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn play_at_high_speed_emits_every_frame() {
    let dir = unique_temp_dir("play");
    let record = dir.join("sine.rfr");
    write_sine_record(&record);

    let out = rforge(&[
        "--format",
        "pretty",
        "play",
        path_str(&record),
        "--speed",
        "1000",
        "--tick-ms",
        "1",
    ]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert_eq!(stdout.lines().count(), 500);
    assert!(stdout.lines().next().unwrap().starts_with("t=0us ch0=0"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn missing_record_and_bad_magic_exit_codes() {
    let dir = unique_temp_dir("errors");
    let out = rforge(&["replay", path_str(&dir.join("absent.rfr"))]);
    assert_eq!(out.status.code(), Some(2));

    let bogus = dir.join("bogus.rfr");
    std::fs::write(&bogus, b"not a record").unwrap();
    let out = rforge(&["replay", path_str(&bogus)]);
    assert_eq!(out.status.code(), Some(60));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn version_prints_package_version() {
    let out = rforge(&["version"]);
    assert!(out.status.success());
    assert_eq!(
        String::from_utf8_lossy(&out.stdout).trim(),
        format!("rforge {}", env!("CARGO_PKG_VERSION"))
    );
}
