mod config;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use config::PackagerConfig;
use indicatif::{ProgressBar, ProgressStyle};
use modula_plugins::net::{self, DEFAULT_DOWNLOAD_TIMEOUT};
use modula_plugins::package::{ArtifactBuilder, HttpObjectStore, Publisher};
use modula_plugins::version::increment_patch;
use modula_plugins::VersionStore;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "modula-packager", version, about = "Build and publish Modula plugins")]
struct Cli {
    /// Packager config
    #[arg(long, default_value = "packager.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Bump the patch version, build, upload and record a release
    Publish { plugin: String, notes: String },
    /// Print the version that follows `version`
    Bump { version: String },
    /// Build and zip a plugin at its current version without publishing
    Build { plugin: String },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = PackagerConfig::load(&cli.config)?;

    match cli.command {
        Command::Bump { version } => println!("{}", increment_patch(&version)?),
        Command::Build { plugin } => build(&config, &plugin)?,
        Command::Publish { plugin, notes } => publish(&config, &plugin, &notes)?,
    }
    Ok(())
}

fn spinner(msg: String) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("{spinner} {msg} ({elapsed})")?);
    pb.set_message(msg);
    pb.enable_steady_tick(Duration::from_millis(120));
    Ok(pb)
}

fn build(config: &PackagerConfig, plugin: &str) -> Result<()> {
    let versions = VersionStore::new(&config.build.info_root);
    let version = versions.load_or_create(plugin)?.version;
    let builder = ArtifactBuilder::new(config.build.target(), &config.build.out_dir);

    let pb = spinner(format!("building {plugin} {version}"))?;
    let archive = builder.build(plugin, &config.build.source_dir(plugin), &version);
    pb.finish_and_clear();

    let archive = archive.with_context(|| format!("building {plugin}"))?;
    println!("{}", archive.display());
    Ok(())
}

fn publish(config: &PackagerConfig, plugin: &str, notes: &str) -> Result<()> {
    let storage = &config.storage;
    if storage.endpoint.is_empty() || storage.bucket.is_empty() || storage.base_url.is_empty() {
        bail!("[storage] endpoint, bucket and base_url must be set to publish");
    }

    let store = HttpObjectStore::new(
        net::client(DEFAULT_DOWNLOAD_TIMEOUT)?,
        &storage.endpoint,
        &storage.bucket,
        &storage.base_url,
        storage.token(),
    );
    let publisher = Publisher::new(
        VersionStore::new(&config.build.info_root),
        ArtifactBuilder::new(config.build.target(), &config.build.out_dir),
        store,
    )
    .with_marker(config.build.marker())
    .with_dir(storage.dir.clone());

    let pb = spinner(format!("publishing {plugin}"))?;
    let result = publisher.publish(plugin, &config.build.source_dir(plugin), notes);
    pb.finish_and_clear();

    let meta = result.with_context(|| format!("publishing {plugin}"))?;
    println!("published {} {}", plugin, meta.version);
    println!("download: {}", meta.download_url);
    Ok(())
}
