use crate::config::HostConfig;
use modula_plugins::loader::WidgetInstance;
use modula_plugins::{manifest_path, Applier, ApplyReport, PluginLoader, PluginRegistry, PluginsState};
use std::path::PathBuf;
use tracing::{error, info, warn};

/// The running host: loaded plugins plus the widgets placed in the plugin area.
pub struct Shell {
    pub config: HostConfig,
    pub registry: PluginRegistry,
    pub state: PluginsState,
    /// Applied at startup, shown once to the user.
    pub report: ApplyReport,
    plugin_area: Vec<(String, Box<dyn WidgetInstance>)>,
}

impl Shell {
    pub fn plugins_dir(&self) -> PathBuf {
        self.config.plugins_dir()
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.config.cache_dir()
    }

    /// Startup sequence: apply staged updates, then load what is installed.
    ///
    /// Nothing here fails the host; broken plugins and failed updates are logged.
    pub fn start(config: HostConfig) -> Self {
        let plugins_dir = config.plugins_dir();
        let cache_dir = config.cache_dir();
        if let Err(e) = std::fs::create_dir_all(&plugins_dir) {
            warn!(dir = %plugins_dir.display(), "cannot create plugins directory: {e}");
        }

        let report = match Applier::new(&plugins_dir, manifest_path(&cache_dir)).apply_pending() {
            Ok(report) => report,
            Err(e) => {
                error!("applying staged updates failed: {e}");
                ApplyReport::default()
            }
        };
        for line in report.to_string().lines() {
            info!("{line}");
        }

        let registry = PluginLoader::new().load_all(&plugins_dir);
        info!(
            classes = registry.len(),
            dir = %plugins_dir.display(),
            "plugins loaded"
        );

        Self {
            config,
            registry,
            state: PluginsState::new(),
            report,
            plugin_area: Vec::new(),
        }
    }

    /// Instantiate every enabled widget class into the plugin area.
    pub fn populate_plugin_area(&mut self) -> usize {
        let mut placed = Vec::new();
        for class in self.registry.get_plugin_names() {
            if !self.config.is_enabled(class) {
                info!(class, "widget disabled in config");
                continue;
            }
            let Some(plugin) = self.registry.get_plugin(class) else {
                continue;
            };
            match plugin.instantiate() {
                Ok(widget) => placed.push((self.registry.get_plugin_alias(class), widget)),
                Err(e) => error!(class, "failed to create widget: {e}"),
            }
        }
        self.plugin_area = placed;
        self.plugin_area.len()
    }

    /// Alias and class of each placed widget, in placement order.
    pub fn plugin_area(&self) -> impl Iterator<Item = (&str, &str)> {
        self.plugin_area
            .iter()
            .map(|(alias, w)| (alias.as_str(), w.class_name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modula_plugins::{ManifestKind, PendingManifest};
    use std::fs;
    use tempfile::tempdir;

    fn config_in(root: &std::path::Path) -> HostConfig {
        let mut cfg = HostConfig::default();
        cfg.paths.plugins_dir = Some(root.join("plugins"));
        cfg.paths.cache_dir = Some(root.join("cache"));
        cfg
    }

    #[test]
    fn start_with_empty_dirs_is_quiet() {
        let dir = tempdir().unwrap();
        let mut shell = Shell::start(config_in(dir.path()));
        assert!(shell.report.is_empty());
        assert!(shell.registry.is_empty());
        assert_eq!(shell.populate_plugin_area(), 0);
        assert!(shell.plugins_dir().is_dir());
    }

    #[test]
    fn start_consumes_the_manifest_even_when_entries_fail() {
        let dir = tempdir().unwrap();
        let cfg = config_in(dir.path());
        let mut m = PendingManifest::new(ManifestKind::Update);
        m.push("ghost", dir.path().join("cache").join("ghost_1.0.0.zip"));
        m.write(&manifest_path(&cfg.cache_dir())).unwrap();

        let shell = Shell::start(cfg);
        assert_eq!(shell.report.failures().count(), 1);
        assert_eq!(
            fs::read_to_string(manifest_path(&shell.cache_dir())).unwrap(),
            "{}"
        );
    }
}
