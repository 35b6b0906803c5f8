//! Tests for the `ova-import` binary

#![cfg(feature = "cli")]

mod common;

use assert_cmd::Command;
use common::{build_package, write_sample_package};
use predicates::prelude::*;
use tempfile::tempdir;

fn ova_import() -> Command {
    Command::new(assert_cmd::cargo_bin!("ova-import"))
}

#[test]
fn test_missing_package_is_a_usage_error() {
    let d = tempdir().unwrap();

    ova_import()
        .current_dir(d.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("[E5001]"))
        .stderr(predicate::str::contains("Specify the OVA file"));

    assert!(!d.path().join("template.yaml").exists());
}

#[test]
fn test_package_without_disk_fails_without_side_effects() {
    let d = tempdir().unwrap();
    let package = d.path().join("broken.ova");
    std::fs::write(&package, build_package(&[("vm.ovf", b"<Envelope/>")])).unwrap();

    ova_import()
        .current_dir(d.path())
        .arg(&package)
        .args(["--glance", "ovaimport-test-no-such-program"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("[E1004]"));

    assert!(!d.path().join("template.yaml").exists());
    assert!(!d.path().join("vm.ovf").exists());
}

#[test]
fn test_unstartable_registration_program() {
    let d = tempdir().unwrap();
    let package = write_sample_package(d.path());

    ova_import()
        .current_dir(d.path())
        .arg(&package)
        .args(["--glance", "ovaimport-test-no-such-program"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("[E4001]"));
}

#[cfg(unix)]
#[test]
fn test_import_writes_template() {
    let d = tempdir().unwrap();
    let package = write_sample_package(d.path());

    ova_import()
        .current_dir(d.path())
        .arg(&package)
        .arg("appliance")
        .args(["--glance", "true"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Writing Heat Template for 2 CPU and 1024 MB memory...",
        ))
        .stdout(predicate::str::contains("flavor: m1.medium"))
        .stdout(predicate::str::contains("image: appliance"));

    let template = std::fs::read_to_string(d.path().join("template.yaml")).unwrap();
    assert!(template.contains("OS::Nova::Server"));
    assert!(!d.path().join("appliance-disk1.vmdk").exists());
}

#[cfg(unix)]
#[test]
fn test_custom_template_and_work_dir() {
    let d = tempdir().unwrap();
    let package = write_sample_package(d.path());
    let work = d.path().join("work");
    std::fs::create_dir(&work).unwrap();
    let template = d.path().join("out.yaml");

    ova_import()
        .current_dir(d.path())
        .arg(&package)
        .args(["--glance", "true", "--keep-extracted", "-vv"])
        .arg("--work-dir")
        .arg(&work)
        .arg("--template")
        .arg(&template)
        .assert()
        .success();

    assert!(template.exists());
    assert!(!d.path().join("template.yaml").exists());
    assert!(work.join("appliance-disk1.vmdk").exists());
}

#[cfg(unix)]
#[test]
fn test_failed_registration_is_reported() {
    let d = tempdir().unwrap();
    let package = write_sample_package(d.path());

    ova_import()
        .current_dir(d.path())
        .arg(&package)
        .args(["--glance", "false"])
        .assert()
        .success()
        .stderr(predicate::str::contains("exit code 1"));
}
