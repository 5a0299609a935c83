mod common;

use common::lib;
use modula_plugins::loader::WidgetInstance;
use modula_plugins::{PluginLoader, StoreError};
use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;
use tempfile::tempdir;

/// Build the demo widget plugin once per test binary and return its library path.
fn demo_widgets() -> &'static Path {
    static BUILT: OnceLock<PathBuf> = OnceLock::new();
    BUILT.get_or_init(|| {
        let manifest = Path::new(env!("CARGO_MANIFEST_DIR")).join("../plugins/demo-widgets/Cargo.toml");
        let target = Path::new(env!("CARGO_TARGET_TMPDIR")).join("demo-widgets");
        let cargo = std::env::var("CARGO").unwrap_or_else(|_| "cargo".into());
        let out = Command::new(cargo)
            .args(["build", "--quiet", "--manifest-path"])
            .arg(&manifest)
            .arg("--target-dir")
            .arg(&target)
            .output()
            .unwrap();
        assert!(
            out.status.success(),
            "building demo-widgets failed:\n{}",
            String::from_utf8_lossy(&out.stderr)
        );
        target
            .join("debug")
            .join(format!("{DLL_PREFIX}demo_widgets{DLL_SUFFIX}"))
    })
}

fn live_widgets(library: &Path) -> usize {
    unsafe {
        let lib = libloading::Library::new(library).unwrap();
        let live: libloading::Symbol<extern "C" fn() -> usize> = lib.get(b"demo_widgets_live").unwrap();
        live()
    }
}

#[test]
fn garbage_libraries_are_skipped_not_fatal() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join(lib("corrupt")), b"not a shared object").unwrap();
    let pkg = dir.path().join("pkg");
    fs::create_dir_all(&pkg).unwrap();
    fs::write(pkg.join("plugin.json"), r#"{ "library": "missing.bin" }"#).unwrap();
    let broken_entry = dir.path().join("broken");
    fs::create_dir_all(&broken_entry).unwrap();
    fs::write(broken_entry.join("plugin.json"), "[1, 2").unwrap();

    let registry = PluginLoader::new().load_all(dir.path());

    assert!(registry.is_empty());
    assert_eq!(registry.failures().len(), 3);
    assert!(registry
        .failures()
        .iter()
        .all(|e| matches!(e, StoreError::Load { .. })));
    assert!(registry.get_plugin_info_list().is_empty());
}

#[test]
fn native_plugin_registers_next_to_a_broken_module() {
    let dir = tempdir().unwrap();
    let installed = dir.path().join(lib("demo_widgets"));
    fs::copy(demo_widgets(), &installed).unwrap();
    fs::write(dir.path().join(lib("broken")), b"\x7fELF but not really").unwrap();

    let registry = PluginLoader::new().load_all(dir.path());

    assert_eq!(registry.get_plugin_names(), ["DemoClock", "DemoCounter"]);
    assert_eq!(registry.failures().len(), 1);
    assert!(matches!(registry.failures()[0], StoreError::Load { .. }));

    let clock = registry.get_plugin("DemoClock").unwrap();
    assert_eq!(clock.plugin_name, "demo_widgets");
    assert_eq!(clock.alias, "Demo widgets");
    assert_eq!(clock.info.version, "0.1.0");
    assert_eq!(clock.info.description, "A clock and a counter");
    assert_eq!(registry.get_plugin_name_by_alias("Demo widgets"), Some("DemoClock"));
    assert_eq!(registry.get_plugin_info_list().len(), 1);

    let before = live_widgets(&installed);
    let widget = clock.instantiate().unwrap();
    assert_eq!(widget.class_name(), "DemoClock");
    assert_eq!(live_widgets(&installed), before + 1);
    drop(widget);
    assert_eq!(live_widgets(&installed), before);
}

#[test]
fn package_copy_of_a_loaded_plugin_conflicts() {
    let dir = tempdir().unwrap();
    fs::copy(demo_widgets(), dir.path().join(lib("demo_widgets"))).unwrap();

    let pkg = dir.path().join("widgets_pkg").join("lib");
    fs::create_dir_all(&pkg).unwrap();
    fs::copy(demo_widgets(), pkg.join(format!("{}.1", lib("demo_widgets")))).unwrap();
    fs::write(
        dir.path().join("widgets_pkg").join("plugin.json"),
        format!(r#"{{ "library": "lib/{}.1" }}"#, lib("demo_widgets")),
    )
    .unwrap();

    let registry = PluginLoader::new().load_all(dir.path());

    assert_eq!(registry.len(), 2);
    assert_eq!(registry.get_plugin("DemoCounter").unwrap().plugin_name, "demo_widgets");
    assert_eq!(registry.failures().len(), 1);
    assert!(matches!(registry.failures()[0], StoreError::Conflict { .. }));
}
