use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::tempdir;

// Minimal valid config with no pacing delays so sim runs finish quickly.
fn write_config(dir: &Path, extra: &str) -> PathBuf {
    let toml = format!(
        r#"
[pins]
# pins are unused by the sim backend but must be present
spu_cs = 8
hold = 23
test = 24
status_led = 17
limit_led = 27

[timing]
window_us = 500
heartbeat_ms = 0
cycle_delay_ms = 0
{extra}
"#
    );
    let path = dir.join("knock.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn knock(cfg: &Path) -> Command {
    let mut cmd = Command::cargo_bin("knock_cli").unwrap();
    cmd.arg("--config").arg(cfg);
    cmd
}

#[rstest]
#[case("1023,1023", "Channel 1: 100% - Channel 2: 100%")]
#[case("0,0", "Channel 1: 0% - Channel 2: 0%")]
#[case("100,900", "Channel 1: 9% - Channel 2: 87%")]
fn run_prints_one_line_per_cycle(#[case] levels: &str, #[case] line: &str) {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), "");
    let out = knock(&cfg)
        .env("KNOCK_TEST_SIM_RAW", levels)
        .args(["run", "--cycles", "2"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(out).unwrap();
    assert_eq!(text.lines().filter(|l| *l == line).count(), 2);
    // register writes are echoed before the first reading
    assert!(text.starts_with("SPU prescaler <- 0b01000100"));
}

#[rstest]
fn single_channel_mode_uses_the_level_line() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), "[spu]\nchannels = 1\n");
    knock(&cfg)
        .env("KNOCK_TEST_SIM_RAW", "818,0")
        .args(["run", "--cycles", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("SPU KNOCK LEVEL: 79%"))
        .stdout(predicate::str::contains("Channel 2").not());
}

#[rstest]
fn run_appends_to_the_knock_log() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("knock.txt");
    let cfg = write_config(
        dir.path(),
        &format!("[storage]\nlog_path = '{}'\n", log.display()),
    );
    knock(&cfg)
        .env("KNOCK_TEST_SIM_RAW", "1023,0")
        .args(["run", "--cycles", "3"])
        .assert()
        .success();
    let text = fs::read_to_string(&log).unwrap();
    assert_eq!(text.lines().count(), 3);
    assert!(text.lines().all(|l| l == "Channel 1: 100% - Channel 2: 0%"));
}

#[rstest]
fn unavailable_storage_is_reported_once_and_the_run_continues() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("missing").join("knock.txt");
    let cfg = write_config(
        dir.path(),
        &format!("[storage]\nlog_path = '{}'\n", log.display()),
    );
    let out = knock(&cfg)
        .env("KNOCK_TEST_SIM_RAW", "10,20")
        .args(["run", "--cycles", "2"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(out).unwrap();
    assert_eq!(text.matches("logging disabled").count(), 1);
    assert_eq!(text.lines().filter(|l| l.starts_with("Channel 1:")).count(), 2);
    assert!(!log.exists());
}

#[rstest]
#[case("[spu]\nchannels = 3\n", "spu.channels")]
#[case("[timing]\nwindow_us = 0\n", "timing.window_us")]
fn invalid_config_exits_with_code_2(#[case] extra: &str, #[case] needle: &str) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(
        &path,
        format!("[pins]\nspu_cs = 8\nhold = 23\nstatus_led = 17\nlimit_led = 27\n{extra}"),
    )
    .unwrap();
    knock(&path)
        .args(["run", "--cycles", "1"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains(needle));
}

#[rstest]
fn missing_config_file_exits_with_code_2() {
    let dir = tempdir().unwrap();
    knock(&dir.path().join("nope.toml"))
        .arg("self-check")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("read config"));
}

#[rstest]
fn json_errors_are_structured() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[spu]\nchannels = 1\n").unwrap();
    let out = knock(&path)
        .args(["--json", "self-check"])
        .assert()
        .code(2)
        .get_output()
        .stderr
        .clone();
    let text = String::from_utf8(out).unwrap();
    let last = text.lines().last().unwrap();
    let v: serde_json::Value = serde_json::from_str(last).unwrap();
    assert_eq!(v["exit_code"], 2);
    assert_eq!(v["reason"], "Config");
}

#[rstest]
fn self_check_reports_ok() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), "");
    knock(&cfg)
        .env("KNOCK_TEST_SIM_RAW", "512")
        .arg("self-check")
        .assert()
        .success()
        .stdout(predicate::str::contains("self-check ok: 4 registers written"));
}

#[rstest]
fn stats_summarise_the_windows() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), "");
    knock(&cfg)
        .env("KNOCK_TEST_SIM_RAW", "300,400")
        .args(["run", "--cycles", "2", "--stats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("stats: cycles=2 failed=0 windows=4"));
}

#[rstest]
#[case(&["--help"], "Usage:")]
#[case(&["run", "--help"], "--cycles")]
fn help_is_available(#[case] args: &[&str], #[case] needle: &str) {
    Command::cargo_bin("knock_cli")
        .unwrap()
        .args(args)
        .assert()
        .success()
        .stdout(predicate::str::contains(needle));
}
