// End-to-end tests driving the tcr binary with shell-script predicates.
//
// These lock the engine-level contract: single-pass reductions produce the
// documented outputs, sanity failures abort without touching the input,
// and the conservative strategy is deterministic across worker counts.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn tcr_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_tcr"))
}

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn write_group(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("group.json");
    std::fs::write(&path, body).unwrap();
    path
}

fn run_tcr(dir: &Path, args: &[&str]) -> Output {
    Command::new(tcr_binary())
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to run tcr")
}

const ACCEPT_ALL: &str = "#!/bin/sh\nexit 0\n";

#[test]
fn ternary_b_branch() {
    let dir = tempfile::tempdir().unwrap();
    let case = dir.path().join("case.c");
    std::fs::write(&case, "int res = a ? b : c;\n").unwrap();
    let script = write_script(dir.path(), "test.sh", ACCEPT_ALL);
    let group = write_group(
        dir.path(),
        r#"{"first": [], "main": [{"pass": "ternary", "arg": "b"}], "last": []}"#,
    );

    let output = run_tcr(
        dir.path(),
        &[
            "--tidy",
            "--pass-group-file",
            group.to_str().unwrap(),
            script.to_str().unwrap(),
            case.to_str().unwrap(),
        ],
    );
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(std::fs::read_to_string(&case).unwrap(), "int res = b;\n");
}

#[test]
fn ternary_c_branch() {
    let dir = tempfile::tempdir().unwrap();
    let case = dir.path().join("case.c");
    std::fs::write(&case, "int res = a ? b : c;\n").unwrap();
    let script = write_script(dir.path(), "test.sh", ACCEPT_ALL);
    let group = write_group(
        dir.path(),
        r#"{"first": [], "main": [{"pass": "ternary", "arg": "c"}], "last": []}"#,
    );

    let output = run_tcr(
        dir.path(),
        &[
            "--tidy",
            "--pass-group-file",
            group.to_str().unwrap(),
            script.to_str().unwrap(),
            case.to_str().unwrap(),
        ],
    );
    assert!(output.status.success());
    assert_eq!(std::fs::read_to_string(&case).unwrap(), "int res = c;\n");
}

#[test]
fn includes_lines_are_removed() {
    let dir = tempfile::tempdir().unwrap();
    let case = dir.path().join("case.c");
    std::fs::write(
        &case,
        "#include \"missing1.h\"\n#include \"missing2.h\"\nint main(){return 0;}\n",
    )
    .unwrap();
    // Interesting as long as the program body survives.
    let script = write_script(
        dir.path(),
        "test.sh",
        "#!/bin/sh\ngrep -qF 'int main(){return 0;}' case.c\n",
    );
    let group = write_group(
        dir.path(),
        r#"{"first": [], "main": [{"pass": "includes", "arg": "0"}], "last": []}"#,
    );

    let output = run_tcr(
        dir.path(),
        &[
            "--tidy",
            "--pass-group-file",
            group.to_str().unwrap(),
            script.to_str().unwrap(),
            case.to_str().unwrap(),
        ],
    );
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(
        std::fs::read_to_string(&case).unwrap(),
        "int main(){return 0;}\n"
    );
}

#[test]
fn sanity_failure_exits_nonzero_and_preserves_the_input() {
    let dir = tempfile::tempdir().unwrap();
    let case = dir.path().join("case.c");
    std::fs::write(&case, "int main(){return 0;}\n").unwrap();
    let script = write_script(dir.path(), "test.sh", "#!/bin/sh\nexit 1\n");

    let output = run_tcr(
        dir.path(),
        &[
            "--pass-group",
            "delta",
            script.to_str().unwrap(),
            case.to_str().unwrap(),
        ],
    );
    assert_eq!(output.status.code(), Some(1));
    assert!(
        String::from_utf8_lossy(&output.stderr).contains("sanity check failed"),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(
        std::fs::read_to_string(&case).unwrap(),
        "int main(){return 0;}\n"
    );
    assert!(!dir.path().join("case.c.orig").exists());
}

#[test]
fn conservative_strategy_is_deterministic_across_worker_counts() {
    let mut outputs = Vec::new();
    for workers in ["1", "4"] {
        let dir = tempfile::tempdir().unwrap();
        let case = dir.path().join("case.c");
        let body: String = (0..24)
            .map(|i| {
                if i % 7 == 0 {
                    format!("int keep{} = KEEP;\n", i)
                } else {
                    format!("int filler{};\n", i)
                }
            })
            .collect();
        std::fs::write(&case, &body).unwrap();
        let script = write_script(
            dir.path(),
            "test.sh",
            "#!/bin/sh\ngrep -qF KEEP case.c\n",
        );

        let output = run_tcr(
            dir.path(),
            &[
                "--tidy",
                "-n",
                workers,
                "--pass-group",
                "delta",
                script.to_str().unwrap(),
                case.to_str().unwrap(),
            ],
        );
        assert!(
            output.status.success(),
            "stderr: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        outputs.push(std::fs::read_to_string(&case).unwrap());
    }
    assert_eq!(outputs[0], outputs[1]);
    assert!(outputs[0].contains("KEEP"));
}

#[test]
fn second_run_reaches_a_fixed_point() {
    let dir = tempfile::tempdir().unwrap();
    let case = dir.path().join("case.c");
    std::fs::write(&case, "int a;\nint keep = KEEP;\nint b;\n\n").unwrap();
    let script = write_script(
        dir.path(),
        "test.sh",
        "#!/bin/sh\ngrep -qF KEEP case.c\n",
    );

    let first = run_tcr(
        dir.path(),
        &[
            "--tidy",
            "--pass-group",
            "delta",
            script.to_str().unwrap(),
            case.to_str().unwrap(),
        ],
    );
    assert!(first.status.success());
    let reduced = std::fs::read_to_string(&case).unwrap();

    let second = run_tcr(
        dir.path(),
        &[
            "--tidy",
            "--pass-group",
            "delta",
            script.to_str().unwrap(),
            case.to_str().unwrap(),
        ],
    );
    assert!(second.status.success());
    assert_eq!(std::fs::read_to_string(&case).unwrap(), reduced);
}

#[test]
fn backups_are_written_unless_tidy() {
    let dir = tempfile::tempdir().unwrap();
    let case = dir.path().join("case.c");
    std::fs::write(&case, "int keep = KEEP;\nint b;\n").unwrap();
    let script = write_script(
        dir.path(),
        "test.sh",
        "#!/bin/sh\ngrep -qF KEEP case.c\n",
    );

    let output = run_tcr(
        dir.path(),
        &[
            "--pass-group",
            "delta",
            script.to_str().unwrap(),
            case.to_str().unwrap(),
        ],
    );
    assert!(output.status.success());
    assert_eq!(
        std::fs::read_to_string(dir.path().join("case.c.orig")).unwrap(),
        "int keep = KEEP;\nint b;\n"
    );
}

#[test]
fn statistics_and_reduced_contents_go_to_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let case = dir.path().join("case.c");
    std::fs::write(&case, "int a;\nint keep = KEEP;\n").unwrap();
    let script = write_script(
        dir.path(),
        "test.sh",
        "#!/bin/sh\ngrep -qF KEEP case.c\n",
    );

    let output = run_tcr(
        dir.path(),
        &[
            "--tidy",
            "--pass-group",
            "delta",
            script.to_str().unwrap(),
            case.to_str().unwrap(),
        ],
    );
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("pass statistics:"));
    assert!(stdout.contains("method lines :: 0 worked"));
    assert!(stdout.contains("KEEP"));
}

#[test]
fn unknown_pass_group_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let case = dir.path().join("case.c");
    std::fs::write(&case, "int x;\n").unwrap();
    let script = write_script(dir.path(), "test.sh", ACCEPT_ALL);

    let output = run_tcr(
        dir.path(),
        &[
            "--pass-group",
            "nonesuch",
            script.to_str().unwrap(),
            case.to_str().unwrap(),
        ],
    );
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn bad_group_file_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let case = dir.path().join("case.c");
    std::fs::write(&case, "int x;\n").unwrap();
    let script = write_script(dir.path(), "test.sh", ACCEPT_ALL);
    let group = write_group(
        dir.path(),
        r#"{"first": [], "main": [{"pass": "nonesuch", "arg": "0"}], "last": []}"#,
    );

    let output = run_tcr(
        dir.path(),
        &[
            "--pass-group-file",
            group.to_str().unwrap(),
            script.to_str().unwrap(),
            case.to_str().unwrap(),
        ],
    );
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown pass"));
}
