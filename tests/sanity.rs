//! End-to-end CLI tests for the `dispatch-demo` binary: JSON specifier map
//! in, replayed script in, action/event lines out.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn write_tmp(name: &str, contents: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("input-dispatch-sanity-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    path
}

#[test]
fn replays_simple_literal_from_flat_map() {
    let map = write_tmp(
        "flat_map.json",
        r#"{ "pop": { "label": "Pop" } }"#,
    );
    let script = write_tmp("flat_script.txt", "0 pop\n");

    let mut cmd = Command::cargo_bin("dispatch-demo").unwrap();
    cmd.arg("--map").arg(&map).arg("--script").arg(&script);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Pop"))
        .stdout(predicate::str::contains("replay complete"));
}

#[test]
fn replays_combo_prefix_delay_from_mode_map() {
    let map = write_tmp(
        "mode_map.json",
        r#"{
            "default": {
                "pop": { "label": "Pop" },
                "pop cluck": { "label": "PopCluck" }
            }
        }"#,
    );
    let script = write_tmp("combo_script.txt", "0 pop\n50 cluck\n");

    let mut cmd = Command::cargo_bin("dispatch-demo").unwrap();
    cmd.arg("--map")
        .arg(&map)
        .arg("--script")
        .arg(&script)
        .arg("--combo-window")
        .arg("200");
    cmd.assert().success().stdout(predicate::str::contains("PopCluck"));
}

#[test]
fn replays_conditional_region_with_xy_fields() {
    let map = write_tmp(
        "region_map.json",
        r#"{
            "gaze:x<500": { "label": "Left" },
            "gaze:x>=500": { "label": "Right" }
        }"#,
    );
    let script = write_tmp("region_script.txt", "0 gaze,x=100\n10 gaze,x=600\n");

    let mut cmd = Command::cargo_bin("dispatch-demo").unwrap();
    cmd.arg("--map").arg(&map).arg("--script").arg(&script);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Left"))
        .stdout(predicate::str::contains("Right"));
}

#[test]
fn missing_map_file_is_a_clean_error() {
    let mut cmd = Command::cargo_bin("dispatch-demo").unwrap();
    cmd.arg("--map").arg("/nonexistent/path/to/map.json");
    cmd.assert().failure();
}

#[test]
fn malformed_script_line_is_a_clean_error() {
    let map = write_tmp("bad_script_map.json", r#"{ "pop": { "label": "Pop" } }"#);
    let script = write_tmp("bad_script.txt", "not-a-delay pop\n");

    let mut cmd = Command::cargo_bin("dispatch-demo").unwrap();
    cmd.arg("--map").arg(&map).arg("--script").arg(&script);
    cmd.assert().failure();
}
