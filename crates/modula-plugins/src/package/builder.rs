use crate::errors::{Result, StoreError};
use crate::paths::{archive_file_name, canonical_file_name};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// How to compile a plugin and where the toolchain leaves the library.
///
/// `args` and `artifact` are templates; `{source}`, `{out_dir}`, `{name}`,
/// `{prefix}` and `{suffix}` are substituted per build. `{name}` is the plugin
/// name with `-` mapped to `_`, matching the library name cargo emits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTarget {
    pub program: String,
    pub args: Vec<String>,
    /// Artifact path relative to the output dir.
    pub artifact: String,
}

impl Default for BuildTarget {
    fn default() -> Self {
        Self {
            program: "cargo".into(),
            args: [
                "build",
                "--release",
                "--manifest-path",
                "{source}/Cargo.toml",
                "--target-dir",
                "{out_dir}",
            ]
            .map(String::from)
            .to_vec(),
            artifact: "release/{prefix}{name}{suffix}".into(),
        }
    }
}

impl BuildTarget {
    fn render(&self, template: &str, plugin_name: &str, source: &Path, out_dir: &Path) -> String {
        template
            .replace("{source}", &source.to_string_lossy())
            .replace("{out_dir}", &out_dir.to_string_lossy())
            .replace("{prefix}", std::env::consts::DLL_PREFIX)
            .replace("{suffix}", std::env::consts::DLL_SUFFIX)
            .replace("{name}", &plugin_name.replace('-', "_"))
    }

    /// Where the toolchain is expected to leave the library for `plugin_name`.
    pub fn artifact_path(&self, plugin_name: &str, source: &Path, out_dir: &Path) -> PathBuf {
        out_dir.join(self.render(&self.artifact, plugin_name, source, out_dir))
    }
}

/// Compiles one plugin into `<plugin>.<ext>` and zips it for upload.
#[derive(Debug, Clone)]
pub struct ArtifactBuilder {
    target: BuildTarget,
    out_dir: PathBuf,
}

impl ArtifactBuilder {
    pub fn new(target: BuildTarget, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            target,
            out_dir: out_dir.into(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Build, rename to the canonical file name, and zip. Returns the archive path.
    pub fn build(&self, plugin_name: &str, source_dir: &Path, version: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.out_dir)?;
        self.compile(plugin_name, source_dir)?;

        let artifact = self
            .target
            .artifact_path(plugin_name, source_dir, &self.out_dir);
        if !artifact.is_file() {
            return Err(StoreError::Build(format!(
                "expected artifact {} was not produced",
                artifact.display()
            )));
        }

        let library = self.out_dir.join(canonical_file_name(plugin_name));
        if library.exists() {
            fs::remove_file(&library)?;
        }
        fs::rename(&artifact, &library)?;
        debug!(from = %artifact.display(), to = %library.display(), "renamed build artifact");

        let archive = self.out_dir.join(archive_file_name(plugin_name, version));
        zip_single_file(&library, &archive)?;
        info!(plugin = plugin_name, version, archive = %archive.display(), "packaged plugin");
        Ok(archive)
    }

    fn compile(&self, plugin_name: &str, source_dir: &Path) -> Result<()> {
        let args: Vec<String> = self
            .target
            .args
            .iter()
            .map(|a| self.target.render(a, plugin_name, source_dir, &self.out_dir))
            .collect();

        info!(plugin = plugin_name, program = %self.target.program, ?args, "building plugin");
        let output = Command::new(&self.target.program)
            .args(&args)
            .output()
            .map_err(|e| StoreError::Build(format!("failed to spawn `{}`: {e}", self.target.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: Vec<&str> = stderr.lines().rev().take(20).collect();
            return Err(StoreError::Build(format!(
                "`{}` exited with code {:?}\n{}",
                self.target.program,
                output.status.code().unwrap_or(-1),
                tail.into_iter().rev().collect::<Vec<_>>().join("\n")
            )));
        }
        Ok(())
    }
}

/// Zip `file` as a single entry named by its bare file name.
pub fn zip_single_file(file: &Path, archive: &Path) -> Result<()> {
    let entry = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| StoreError::Build(format!("{} has no file name", file.display())))?;

    let mut zip = ZipWriter::new(fs::File::create(archive)?);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    zip.start_file(entry, options)?;
    std::io::copy(&mut fs::File::open(file)?, &mut zip)?;
    zip.finish()?;
    Ok(())
}
