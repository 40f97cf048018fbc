use std::io::Write;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../kmod-io/tests/data")
        .join(name)
}

fn kmod_app() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_kmod-app"));
    cmd.env_remove("KMOD_CONFIG");
    cmd
}

#[test]
fn prints_summary_for_fixture() {
    kmod_app()
        .arg(fixture("crystal_hc49.kicad_mod"))
        .assert()
        .success()
        .stdout(predicate::str::contains("封装：Crystal_SMD_HC49-US"))
        .stdout(predicate::str::contains("tags = [\"SMD Crystal\"]"))
        .stdout(predicate::str::contains("  - pad: at=[4.5, 0], size=[5.6, 2.1]"));
}

#[test]
fn config_controls_arc_resolution() {
    let mut config = tempfile::NamedTempFile::new().expect("create temp file");
    writeln!(
        config,
        "[logging]\nlevel = \"warn\"\n\n[tessellation]\nmin_segments = 8\nmax_segments = 8"
    )
    .unwrap();

    kmod_app()
        .arg("--config")
        .arg(config.path())
        .arg(fixture("poly_with_arc.kicad_mod"))
        .assert()
        .success()
        .stdout(predicate::str::contains("pts=11 点"));

    kmod_app()
        .arg(fixture("poly_with_arc.kicad_mod"))
        .assert()
        .success()
        .stdout(predicate::str::contains("pts=67 点"));
}

#[test]
fn missing_arguments_exit_with_usage_error() {
    kmod_app()
        .assert()
        .code(1)
        .stderr(predicate::str::contains("FILE"));
}

#[test]
fn unreadable_file_sets_failure_code() {
    let dir = tempfile::tempdir().expect("create temp dir");
    kmod_app()
        .arg(fixture("poly.kicad_mod"))
        .arg(dir.path().join("absent.kicad_mod"))
        .assert()
        .code(1)
        .stdout(predicate::str::contains("封装：poly"))
        .stderr(predicate::str::contains("加载封装失败"));
}

#[test]
fn broken_config_falls_back_to_defaults() {
    let dir = tempfile::tempdir().expect("create temp dir");
    kmod_app()
        .arg("--config")
        .arg(dir.path().join("absent.toml"))
        .arg(fixture("poly_with_arc.kicad_mod"))
        .assert()
        .success()
        .stdout(predicate::str::contains("pts=67 点"))
        .stderr(predicate::str::contains("加载配置失败"));
}
