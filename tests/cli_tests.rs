mod common;

use assert_cmd::Command;
use predicates::prelude::*;

const ENV_INPUTS: &[&str] = &[
    "GITHUB_TOKEN",
    "GITHUB_REF",
    "GITHUB_REPOSITORY",
    "GITHUB_SHA",
    "INPUT_VERSION",
    "INPUT_EXCLUDES",
    "INPUT_HOST",
    "INPUT_KEY",
    "INPUT_PORT",
    "HTTP_PROXY",
    "HTTPS_PROXY",
    "ALL_PROXY",
    "http_proxy",
    "https_proxy",
    "all_proxy",
];

// Nothing listens here, so the release lookup fails fast.
const DEAD_API: &str = "http://127.0.0.1:1";

fn deploy() -> Command {
    let mut cmd = Command::cargo_bin("qtifw_deploy").unwrap();
    for name in ENV_INPUTS {
        cmd.env_remove(name);
    }
    cmd
}

#[test]
fn test_branch_push_is_a_noop() {
    deploy()
        .args(["--ref", "refs/heads/main"])
        .assert()
        .success()
        .stdout(predicate::str::contains("only run for tags"));
}

#[test]
fn test_ref_is_read_from_environment() {
    deploy()
        .env("GITHUB_REF", "refs/heads/develop")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not doing anything"));
}

#[test]
fn test_malformed_ref_fails() {
    deploy()
        .args(["--ref", "main"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unexpected GitHub ref format"));
}

#[test]
fn test_tag_without_qt_version_fails() {
    deploy()
        .args(["--ref", "refs/tags/1.2.3", "--repository", "Owner/QtFoo", "--no-mount"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--version"));
}

#[test]
fn test_mount_requires_host_and_key() {
    deploy()
        .args([
            "--ref",
            "refs/tags/1.2.3",
            "--repository",
            "Owner/QtFoo",
            "--version",
            "5.13.0",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--host"));
}

#[test]
fn test_missing_ref_is_a_usage_error() {
    deploy()
        .assert()
        .failure()
        .stderr(predicate::str::contains("--ref"));
}

#[test]
fn test_verbose_prints_run_details() {
    let tmp = tempfile::tempdir().unwrap();
    deploy()
        .args(["--ref", "refs/tags/1.2.3", "--repository", "Owner/QtFoo"])
        .args(["--version", "5.13", "--no-mount", "--verbose", "--excludes", "winrt"])
        .arg("--deploy-dir")
        .arg(tmp.path().join("deploy"))
        .arg("--work-dir")
        .arg(tmp.path().join("work"))
        .args(["--repogen", "/nonexistent/repogen", "--api-url", DEAD_API])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Work directory"))
        .stdout(predicate::str::contains("Excluding platforms matching 'winrt'"));
}

#[cfg(unix)]
#[test]
fn test_failed_deployment_unmounts_remote() {
    let tmp = tempfile::tempdir().unwrap();
    let bin = tmp.path().join("bin");
    let log = tmp.path().join("fusermount.log");
    common::fake_tool(&bin, "sshfs", "exit 0");
    common::fake_tool(
        &bin,
        "fusermount",
        &format!("echo \"$@\" >> '{}'", log.display()),
    );
    let path = format!(
        "{}:{}",
        bin.display(),
        std::env::var("PATH").unwrap_or_default()
    );
    let mount = tmp.path().join("mnt");
    let work = tmp.path().join("work");

    deploy()
        .env("PATH", path)
        .args(["--ref", "refs/tags/1.2.3", "--repository", "Owner/QtFoo"])
        .args(["--version", "5.13.0", "--host", "deploy@example.com:/srv/qt"])
        .args(["--key", "b3BlbnNzaC1rZXktdjEAAAAA"])
        .arg("--deploy-dir")
        .arg(&mount)
        .arg("--work-dir")
        .arg(&work)
        .args(["--repogen", "/nonexistent/repogen", "--api-url", DEAD_API])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Unmounting remote"));

    let calls = std::fs::read_to_string(&log).unwrap();
    assert_eq!(calls.trim(), format!("-u {}", mount.display()));
    assert!(!work.join("ssh-key").exists());
}

#[cfg(unix)]
#[test]
fn test_unmount_failure_after_failed_deployment_is_reported() {
    let tmp = tempfile::tempdir().unwrap();
    let bin = tmp.path().join("bin");
    common::fake_tool(&bin, "sshfs", "exit 0");
    common::fake_tool(&bin, "fusermount", "echo 'device busy' >&2; exit 1");
    let path = format!(
        "{}:{}",
        bin.display(),
        std::env::var("PATH").unwrap_or_default()
    );

    deploy()
        .env("PATH", path)
        .args(["--ref", "refs/tags/1.2.3", "--repository", "Owner/QtFoo"])
        .args(["--version", "5.13.0", "--host", "deploy@example.com:/srv/qt"])
        .args(["--key", "b3BlbnNzaC1rZXktdjEAAAAA"])
        .arg("--deploy-dir")
        .arg(tmp.path().join("mnt"))
        .arg("--work-dir")
        .arg(tmp.path().join("work"))
        .args(["--repogen", "/nonexistent/repogen", "--api-url", DEAD_API])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Unmount failed"))
        .stderr(predicate::str::contains("HTTP error"));
}
