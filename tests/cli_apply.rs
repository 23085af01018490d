//! End-to-end `stevedore apply` and `stevedore show` against a mock control
//! plane.

use assert_cmd::cargo::cargo_bin_cmd;
use camino::Utf8PathBuf;
use cap_std::{ambient_authority, fs_utf8::Dir};
use predicates::str::contains;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MANIFEST: &str = r#"
name = "builder"
size_class = "DEV1-S"
image = "ubuntu-24-04"
tags = ["ci"]
"#;

struct Workspace {
    _tmp: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf())
            .unwrap_or_else(|path| panic!("temp dir should be utf8: {}", path.display()));
        Self { _tmp: tmp, root }
    }

    fn dir(&self) -> Dir {
        Dir::open_ambient_dir(&self.root, ambient_authority())
            .unwrap_or_else(|err| panic!("open workspace: {err}"))
    }
}

async fn mount_control_plane(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/regions/fr-par/machines"))
        .respond_with(
            ResponseTemplate::new(202).set_body_json(json!({ "operation": { "id": "op-1" } })),
        )
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/regions/fr-par/operations/op-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "operation": { "id": "op-1", "status": "finished", "resources": ["m-1"] }
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/regions/fr-par/machines/m-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "machine": {
                "id": "m-1",
                "name": "builder",
                "size_class": "DEV1-S",
                "image": "ubuntu-24-04",
                "status": "running",
                "tags": ["ci"],
            }
        })))
        .mount(server)
        .await;
}

fn stevedore(workspace: &Workspace, api_url: &str, args: &[&str]) -> assert_cmd::assert::Assert {
    let mut cmd = cargo_bin_cmd!("stevedore");
    cmd.current_dir(workspace.root.as_std_path())
        .env("HOME", workspace.root.as_std_path())
        .env("XDG_CONFIG_HOME", workspace.root.join("xdg").as_std_path())
        .env("STEVEDORE_API_URL", api_url)
        .env("STEVEDORE_SECRET_KEY", "SECRETKEYEXAMPLE")
        .env("STEVEDORE_DEFAULT_PROJECT_ID", "proj")
        .env("STEVEDORE_POLL_DELAY_SECS", "0")
        .args(args);
    cmd.assert()
}

#[tokio::test(flavor = "multi_thread")]
async fn apply_creates_machine_and_records_state() {
    let server = MockServer::start().await;
    mount_control_plane(&server).await;
    let workspace = Workspace::new();
    workspace
        .dir()
        .write("builder.toml", MANIFEST)
        .unwrap_or_else(|err| panic!("write manifest: {err}"));

    let api_url = server.uri();
    let workspace = tokio::task::spawn_blocking(move || {
        stevedore(&workspace, &api_url, &["apply", "builder.toml"])
            .success()
            .stdout(contains("created machine m-1"))
            .stdout(contains("volumes:    none"));
        stevedore(&workspace, &api_url, &["show", "builder.toml"])
            .success()
            .stdout(contains("status:     running"));
        workspace
    })
    .await
    .unwrap_or_else(|err| panic!("cli task: {err}"));

    let state = workspace
        .dir()
        .read_to_string("builder.state.toml")
        .unwrap_or_else(|err| panic!("state file should exist: {err}"));
    assert!(state.contains("m-1"), "state: {state}");
}

#[tokio::test(flavor = "multi_thread")]
async fn rejected_create_exits_with_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/regions/fr-par/machines"))
        .respond_with(ResponseTemplate::new(403).set_body_string("quota exceeded"))
        .mount(&server)
        .await;
    let workspace = Workspace::new();
    workspace
        .dir()
        .write("builder.toml", MANIFEST)
        .unwrap_or_else(|err| panic!("write manifest: {err}"));

    let api_url = server.uri();
    let workspace = tokio::task::spawn_blocking(move || {
        stevedore(&workspace, &api_url, &["apply", "builder.toml"])
            .code(1)
            .stderr(contains("quota exceeded"));
        workspace
    })
    .await
    .unwrap_or_else(|err| panic!("cli task: {err}"));

    let recorded = workspace
        .dir()
        .try_exists("builder.state.toml")
        .unwrap_or_else(|err| panic!("stat state file: {err}"));
    assert!(!recorded, "failed create must not record state");
}
