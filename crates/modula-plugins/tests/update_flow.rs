mod common;

use common::{closed_port_url, lib, tree, zip_bytes, TestServer};
use modula_plugins::{
    Applier, CheckStatus, Job, ManifestKind, PendingManifest, PluginMetadata, StageProgress, Stager,
    StoreError, UpdateChecker, UpdateWorker, WorkerEvent,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::fs;
use std::time::Duration;
use tempfile::tempdir;

const TIMEOUT: Duration = Duration::from_secs(5);

fn local(name: &str, version: &str, update_url: &str) -> PluginMetadata {
    let mut m = PluginMetadata::new(name);
    m.plugin_name = name.into();
    m.version = version.into();
    m.update_url = update_url.into();
    m
}

fn info_body(base: &str, plugin: &str, version: &str, extra: serde_json::Value) -> Vec<u8> {
    let mut v = json!({
        "name": plugin,
        "version": version,
        "description": "test plugin",
        "release_notes": "fixes",
        "download_url": format!("{base}/{plugin}_{version}.zip"),
        "plugin_name": plugin,
    });
    if let (Some(obj), Some(more)) = (v.as_object_mut(), extra.as_object()) {
        obj.extend(more.clone());
    }
    serde_json::to_vec(&v).unwrap()
}

/// Serves `/<plugin>/info.json` and the archive it points at.
fn serve_plugin(plugin: &'static str, version: &'static str, archive: Vec<u8>) -> TestServer {
    TestServer::start_with(move |base| {
        vec![
            (format!("/{plugin}/info.json"), 200, info_body(base, plugin, version, json!({}))),
            (format!("/{plugin}_{version}.zip"), 200, archive),
        ]
    })
}

fn remote_of(server: &TestServer, plugin: &str) -> PluginMetadata {
    let checker = UpdateChecker::new(TIMEOUT, "1.0.0").unwrap();
    checker
        .fetch_remote(&server.url(&format!("/{plugin}/info.json")))
        .unwrap()
}

#[test]
fn check_classifies_each_plugin_independently() {
    let server = TestServer::start_with(|base| {
        vec![
            ("/new/info.json".into(), 200, info_body(base, "new", "1.10.0", json!({}))),
            ("/same/info.json".into(), 200, info_body(base, "same", "2.0", json!({}))),
            ("/bad/info.json".into(), 200, br#"{"version":"9.0.0"}"#.to_vec()),
            ("/gated/info.json".into(), 200, info_body(base, "gated", "3.0.0", json!({ "min_app_version": "2.0.0" }))),
            ("/down/info.json".into(), 500, b"oops".to_vec()),
        ]
    });

    let plugins = vec![
        local("new", "1.9.0", &server.url("/new/info.json")),
        local("same", "2.0.0", &server.url("/same/info.json")),
        local("bad", "1.0.0", &server.url("/bad/info.json")),
        local("gated", "1.0.0", &server.url("/gated/info.json")),
        local("down", "1.0.0", &server.url("/down/info.json")),
        local("offline", "1.0.0", &closed_port_url()),
        local("unset", "1.0.0", ""),
    ];

    let checker = UpdateChecker::new(TIMEOUT, "1.0.0").unwrap();
    let statuses: Vec<CheckStatus> = checker
        .check_all(&plugins)
        .into_iter()
        .map(|r| r.status)
        .collect();

    assert_eq!(
        statuses,
        vec![
            CheckStatus::NewVersionAvailable,
            CheckStatus::AlreadyLatest,
            CheckStatus::InvalidUpdateInfo,
            CheckStatus::RequiresNewerApp("2.0.0".into()),
            CheckStatus::CheckFailed,
            CheckStatus::CheckFailed,
            CheckStatus::NotConfigured,
        ]
    );
}

#[test]
fn staged_update_is_applied_on_next_start() {
    let library = lib("clock");
    let archive = zip_bytes(&[(library.as_str(), b"new build")]);
    let server = serve_plugin("clock", "1.0.1", archive);

    let dir = tempdir().unwrap();
    let cache = dir.path().join("cache");
    let plugins = dir.path().join("plugins");
    fs::create_dir_all(&plugins).unwrap();
    fs::write(plugins.join(&library), b"old build").unwrap();

    let stager = Stager::new(&cache, TIMEOUT).unwrap();
    let mut ticks = Vec::new();
    let staged = stager
        .stage(&[remote_of(&server, "clock")], |p| ticks.push(p))
        .unwrap();

    assert!(staged);
    assert_eq!(ticks, [StageProgress { done: 1, total: 1 }]);
    assert!(cache.join("clock_1.0.1.zip").exists());

    let manifest = PendingManifest::read(&stager.manifest_path()).unwrap().unwrap();
    assert_eq!(manifest.kind, ManifestKind::Update);
    assert_eq!(manifest.entries[0].0, "clock");

    let report = Applier::new(&plugins, stager.manifest_path())
        .apply_pending()
        .unwrap();
    assert_eq!(report.failures().count(), 0);
    assert_eq!(fs::read(plugins.join(&library)).unwrap(), b"new build");
    assert_eq!(fs::read_to_string(stager.manifest_path()).unwrap(), "{}");
}

#[test]
fn failed_download_is_skipped_and_others_still_staged() {
    let library = lib("good");
    let server = serve_plugin("good", "2.0.0", zip_bytes(&[(library.as_str(), b"bin")]));

    let mut missing = remote_of(&server, "good");
    missing.plugin_name = "gone".into();
    missing.download_url = server.url("/gone_1.0.0.zip");

    let dir = tempdir().unwrap();
    let stager = Stager::new(dir.path(), TIMEOUT).unwrap();
    let mut ticks = 0;
    let staged = stager
        .stage(&[missing, remote_of(&server, "good")], |_| ticks += 1)
        .unwrap();

    assert!(staged);
    assert_eq!(ticks, 2);
    let manifest = PendingManifest::read(&stager.manifest_path()).unwrap().unwrap();
    let names: Vec<&str> = manifest.entries.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, ["good"]);
}

#[test]
fn remote_name_cannot_escape_the_cache_dir() {
    let library = lib("escaped");
    let server = serve_plugin("escaped", "1.0.0", zip_bytes(&[(library.as_str(), b"bin")]));
    let mut remote = remote_of(&server, "escaped");
    remote.plugin_name = "../../escaped".into();

    let dir = tempdir().unwrap();
    let cache = dir.path().join("a").join("cache");
    let stager = Stager::new(&cache, TIMEOUT).unwrap();

    assert!(!stager.stage(&[remote], |_| {}).unwrap());
    assert!(!dir.path().join("escaped_1.0.0.zip").exists());
    assert!(tree(dir.path()).iter().all(|p| !p.ends_with(".zip")));
    assert!(PendingManifest::read(&stager.manifest_path()).unwrap().unwrap().is_empty());
}

#[test]
fn fetch_remote_reports_incomplete_records_as_invalid_info() {
    let server = TestServer::start(vec![
        ("/bad/info.json".into(), 200, br#"{"version":"9.0.0"}"#.to_vec()),
        ("/latest/info.json".into(), 200, br#"{"name":"x","version":"latest","description":"","download_url":"u","plugin_name":"x"}"#.to_vec()),
    ]);
    let checker = UpdateChecker::new(TIMEOUT, "1.0.0").unwrap();

    for path in ["/bad/info.json", "/latest/info.json"] {
        let err = checker.fetch_remote(&server.url(path)).unwrap_err();
        assert!(matches!(err, StoreError::InvalidUpdateInfo(_)), "{path}: {err}");
    }
    assert!(matches!(
        checker.fetch_remote(&closed_port_url()),
        Err(StoreError::Network(_))
    ));
}

#[test]
fn checksum_mismatch_discards_the_download() {
    let library = lib("sum");
    let server = serve_plugin("sum", "1.0.1", zip_bytes(&[(library.as_str(), b"bin")]));
    let mut remote = remote_of(&server, "sum");
    remote.sha256 = Some("00".repeat(32));

    let dir = tempdir().unwrap();
    let stager = Stager::new(dir.path(), TIMEOUT).unwrap();
    assert!(!stager.stage(&[remote], |_| {}).unwrap());
    assert!(!dir.path().join("sum_1.0.1.zip").exists());
    assert!(PendingManifest::read(&stager.manifest_path()).unwrap().unwrap().is_empty());
}

#[test]
fn online_install_respects_dependencies() {
    let server = TestServer::start_with(|base| {
        vec![
            ("/ui/info.json".into(), 200, info_body(base, "ui", "1.0.0", json!({ "dependencies": { "core": ">=1.2" } }))),
            ("/ui_1.0.0.zip".into(), 200, zip_bytes(&[("plugin.json", b"{}")])),
            ("/extra/info.json".into(), 200, info_body(base, "extra", "0.1.0", json!({ "dependencies": { "net": "*" } }))),
            ("/extra_0.1.0.zip".into(), 200, zip_bytes(&[("plugin.json", b"{}")])),
        ]
    });

    let dir = tempdir().unwrap();
    let stager = Stager::new(dir.path().join("cache"), TIMEOUT).unwrap();
    let installed = BTreeMap::from([("core".to_string(), "1.3.0".to_string())]);
    let selected = [remote_of(&server, "ui"), remote_of(&server, "extra")];

    assert!(stager.stage_install(&selected, &installed, |_| {}).unwrap());

    let manifest = PendingManifest::read(&stager.manifest_path()).unwrap().unwrap();
    assert_eq!(manifest.kind, ManifestKind::Install);
    let names: Vec<&str> = manifest.entries.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, ["ui"]);

    let plugins = dir.path().join("plugins");
    Applier::new(&plugins, stager.manifest_path()).apply_pending().unwrap();
    assert_eq!(tree(&plugins), ["ui/plugin.json"]);
}

#[test]
fn worker_streams_check_results_and_progress() {
    let library = lib("clock");
    let server = serve_plugin("clock", "1.0.1", zip_bytes(&[(library.as_str(), b"bin")]));
    let dir = tempdir().unwrap();

    let worker = UpdateWorker::spawn(
        UpdateChecker::new(TIMEOUT, "1.0.0").unwrap(),
        Stager::new(dir.path(), TIMEOUT).unwrap(),
    )
    .unwrap();

    worker
        .submit(Job::Check(vec![local("clock", "1.0.0", &server.url("/clock/info.json"))]))
        .unwrap();

    let mut rows = None;
    while rows.is_none() {
        match worker.next_event(Duration::from_secs(10)).unwrap() {
            Some(WorkerEvent::Checked(row)) => assert_eq!(row.name, "clock"),
            Some(WorkerEvent::CheckFinished(all)) => rows = Some(all),
            Some(other) => panic!("unexpected event {other:?}"),
            None => panic!("worker timed out"),
        }
    }
    let rows = rows.unwrap();
    assert!(rows[0].has_update());

    worker
        .submit(Job::Stage(rows.into_iter().filter_map(|r| r.remote).collect()))
        .unwrap();
    let mut progress = Vec::new();
    loop {
        match worker.next_event(Duration::from_secs(10)).unwrap() {
            Some(WorkerEvent::Progress(p)) => progress.push(p),
            Some(WorkerEvent::Staged { restart_required }) => {
                assert!(restart_required);
                break;
            }
            Some(other) => panic!("unexpected event {other:?}"),
            None => panic!("worker timed out"),
        }
    }
    assert_eq!(progress, [StageProgress { done: 1, total: 1 }]);

    worker
        .submit(Job::Install {
            urls: vec![closed_port_url()],
            installed: BTreeMap::new(),
        })
        .unwrap();
    let mut saw_failure = false;
    loop {
        match worker.next_event(Duration::from_secs(10)).unwrap() {
            Some(WorkerEvent::Failed(_)) => saw_failure = true,
            Some(WorkerEvent::Staged { restart_required }) => {
                assert!(!restart_required);
                break;
            }
            Some(other) => panic!("unexpected event {other:?}"),
            None => panic!("worker timed out"),
        }
    }
    assert!(saw_failure);
    worker.shutdown();
}

#[test]
fn worker_ends_a_stage_job_that_cannot_write_its_manifest() {
    let dir = tempdir().unwrap();
    let not_a_dir = dir.path().join("cache");
    fs::write(&not_a_dir, b"file").unwrap();

    let worker = UpdateWorker::spawn(
        UpdateChecker::new(TIMEOUT, "1.0.0").unwrap(),
        Stager::new(&not_a_dir, TIMEOUT).unwrap(),
    )
    .unwrap();
    worker.submit(Job::Stage(Vec::new())).unwrap();

    match worker.next_event(Duration::from_secs(10)).unwrap() {
        Some(WorkerEvent::StageFailed(reason)) => assert!(!reason.is_empty()),
        other => panic!("expected StageFailed, got {other:?}"),
    }
    worker.shutdown();
}
