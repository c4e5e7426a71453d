// ABOUTME: Integration tests for the converge CLI commands.
// ABOUTME: Validates --help output, deployment listing, diffing and publishing.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use wiremock::matchers::{header, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn converge_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("converge"))
}

fn write_state(dir: &Path, manifests: &[(&str, &str, u32)]) {
    fs::write(
        dir.join("clusters.yml"),
        "test:\n  base_url: http://scheduler.test:7099\n",
    )
    .unwrap();
    fs::create_dir_all(dir.join("manifests")).unwrap();
    for (repo, version, instances) in manifests {
        fs::write(
            dir.join("manifests").join(format!("{}.yml", repo)),
            format!(
                "source:\n  repo: {repo}\nowners: [judson]\ndeployments:\n  test:\n    version: {version}\n    num_instances: {instances}\n"
            ),
        )
        .unwrap();
    }
}

#[test]
fn help_shows_commands() {
    converge_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("deployments"))
        .stdout(predicate::str::contains("diff"))
        .stdout(predicate::str::contains("publish"));
}

#[test]
fn publish_help_explains_deletion() {
    converge_cmd()
        .args(["publish", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--prior"))
        .stdout(predicate::str::contains("nothing is deleted"));
}

#[test]
fn deployments_lists_tabbed_rows() {
    let dir = tempfile::tempdir().unwrap();
    write_state(dir.path(), &[("api", "1.2.3", 2), ("web", "2.0.0", 1)]);

    converge_cmd()
        .arg("deployments")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Cluster\tRepo\tVersion"))
        .stdout(predicate::str::contains("test\tapi\t1.2.3\t\t2\tjudson"))
        .stdout(predicate::str::contains("test\tweb\t2.0.0\t\t1\tjudson"));
}

#[test]
fn deployments_fails_without_clusters() {
    let dir = tempfile::tempdir().unwrap();

    converge_cmd()
        .arg("deployments")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("has no clusters.yml"));
}

#[test]
fn diff_marks_each_change() {
    let from = tempfile::tempdir().unwrap();
    let to = tempfile::tempdir().unwrap();
    write_state(from.path(), &[("api", "1.0.0", 1), ("old", "1.0.0", 1), ("web", "1.0.0", 1)]);
    write_state(to.path(), &[("api", "1.1.0", 1), ("new", "1.0.0", 1), ("web", "1.0.0", 1)]);

    converge_cmd()
        .arg("diff")
        .arg(from.path())
        .arg(to.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("+ new@1.0.0 @ test"))
        .stdout(predicate::str::contains("- old@1.0.0 @ test"))
        .stdout(predicate::str::contains("~ api@1.0.0 @ test"))
        .stdout(predicate::str::contains("1 new, 1 gone, 1 changed, 1 unchanged"));
}

#[test]
fn publish_requires_a_server() {
    let dir = tempfile::tempdir().unwrap();
    write_state(dir.path(), &[("api", "1.0.0", 1)]);

    converge_cmd()
        .current_dir(dir.path())
        .arg("publish")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("no state server configured"));
}

#[tokio::test(flavor = "multi_thread")]
async fn publish_creates_unknown_manifests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(header("If-None-Match", "*"))
        .respond_with(ResponseTemplate::new(201))
        .expect(2)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    write_state(dir.path(), &[("api", "1.0.0", 1), ("web", "1.0.0", 1)]);
    let path = dir.path().to_path_buf();
    let uri = server.uri();

    let assert = tokio::task::spawn_blocking(move || {
        converge_cmd()
            .current_dir(&path)
            .arg("publish")
            .arg(&path)
            .arg("--server")
            .arg(uri)
            .assert()
    })
    .await
    .unwrap();

    assert
        .success()
        .stdout(predicate::str::contains("2 created, 0 modified, 0 deleted"));
}

#[tokio::test(flavor = "multi_thread")]
async fn publish_reports_conflicts() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(412))
        .mount(&server)
        .await;

    let prior = tempfile::tempdir().unwrap();
    let dir = tempfile::tempdir().unwrap();
    write_state(prior.path(), &[]);
    write_state(dir.path(), &[("api", "1.0.0", 1)]);
    let prior_path = prior.path().to_path_buf();
    let path = dir.path().to_path_buf();
    let uri = server.uri();

    let assert = tokio::task::spawn_blocking(move || {
        converge_cmd()
            .current_dir(&path)
            .arg("publish")
            .arg(&path)
            .arg("--prior")
            .arg(&prior_path)
            .arg("--server")
            .arg(uri)
            .assert()
    })
    .await
    .unwrap();

    assert
        .failure()
        .stderr(predicate::str::contains("conflicting write"))
        .stderr(predicate::str::contains("1 manifest(s) failed to publish"));
}
