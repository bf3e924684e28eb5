//! End-to-end runs of the `assembler` and `imp` binaries.

use std::path::PathBuf;
use std::process::{Command, Stdio};

fn demo(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos").join(name)
}

/// Assembles `demo` into a fresh object file under the temp dir.
fn assemble(demo_name: &str) -> PathBuf {
    let out = std::env::temp_dir().join(format!(
        "imp-cli-{}-{}.obj",
        std::process::id(),
        demo_name.trim_end_matches(".imp")
    ));
    let status = Command::new(env!("CARGO_BIN_EXE_assembler"))
        .arg(demo(demo_name))
        .arg("-o")
        .arg(&out)
        .env("IMP_LOG", "off")
        .status()
        .unwrap();
    assert!(status.success());
    out
}

#[test]
fn runner_usage_ignores_log_level() {
    for level in ["off", "error", "info"] {
        let output = Command::new(env!("CARGO_BIN_EXE_imp"))
            .env("IMP_LOG", level)
            .stdin(Stdio::null())
            .output()
            .unwrap();
        assert_eq!(output.status.code(), Some(1));
        assert!(String::from_utf8_lossy(&output.stderr).contains("USAGE:"), "{level}");
        assert!(output.stdout.is_empty());
    }
}

#[test]
fn runner_help_exits_zero() {
    let output = Command::new(env!("CARGO_BIN_EXE_imp"))
        .arg("--help")
        .env("IMP_LOG", "off")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stderr).contains("<program.obj>"));
}

#[test]
fn runs_assembled_is_prime() {
    let obj = assemble("is_prime.imp");
    let output = Command::new(env!("CARGO_BIN_EXE_imp"))
        .arg(&obj)
        .env("IMP_LOG", "off")
        .stdin(Stdio::null())
        .output()
        .unwrap();
    let _ = std::fs::remove_file(&obj);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "< 41\n");
}

#[test]
fn runs_assembled_add_with_input() {
    use std::io::Write;

    let obj = assemble("add.imp");
    let mut child = Command::new(env!("CARGO_BIN_EXE_imp"))
        .arg(&obj)
        .env("IMP_LOG", "off")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    child.stdin.take().unwrap().write_all(b"3\n4\n").unwrap();
    let output = child.wait_with_output().unwrap();
    let _ = std::fs::remove_file(&obj);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "> > < 7\n");
}

#[test]
fn load_error_exits_one() {
    let output = Command::new(env!("CARGO_BIN_EXE_imp"))
        .arg(demo("missing.obj"))
        .env("IMP_LOG", "off")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
}
