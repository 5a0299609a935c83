//! Update dialog flows driven through the background worker.

use crate::shell::Shell;
use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use modula_plugins::{Job, Stager, UpdateCheck, UpdateChecker, UpdateWorker, WorkerEvent};
use std::time::Duration;
use tracing::{info, warn};

const POLL: Duration = Duration::from_millis(100);

fn spawn_worker(shell: &Shell) -> Result<UpdateWorker> {
    let update = &shell.config.update;
    let checker = UpdateChecker::new(update.check_timeout(), env!("CARGO_PKG_VERSION"))
        .context("creating update checker")?;
    let stager = Stager::new(shell.cache_dir(), update.download_timeout())
        .context("creating update stager")?;
    Ok(UpdateWorker::spawn(checker, stager)?)
}

/// Check every loaded plugin. Rows are printed as they arrive.
pub fn check(shell: &Shell) -> Result<Vec<UpdateCheck>> {
    let plugins = shell.registry.get_plugin_info_list();
    if plugins.is_empty() {
        println!("no plugins installed");
        return Ok(Vec::new());
    }

    let worker = spawn_worker(shell)?;
    worker.submit(Job::Check(plugins))?;

    println!("{:<24} {:<10} {:<10} status", "plugin", "current", "latest");
    let rows = loop {
        match worker.next_event(POLL)? {
            Some(WorkerEvent::Checked(row)) => print_row(&row),
            Some(WorkerEvent::CheckFinished(rows)) => break rows,
            Some(other) => warn!(?other, "unexpected worker event during check"),
            None => {}
        }
    };
    worker.shutdown();

    shell.state.set_checks(rows.clone());
    Ok(rows)
}

fn print_row(row: &UpdateCheck) {
    println!(
        "{:<24} {:<10} {:<10} {}",
        row.name,
        row.current_version,
        row.latest_version.as_deref().unwrap_or("-"),
        row.status
    );
}

/// Check, then stage the selected plugins (all with updates when `all`).
pub fn update(shell: &Shell, names: &[String], all: bool) -> Result<()> {
    if names.is_empty() && !all {
        bail!("name at least one plugin or pass --all");
    }
    check(shell)?;

    let selected = shell.state.updatable(if all { &[] } else { names });
    if selected.is_empty() {
        println!("nothing to update");
        return Ok(());
    }

    let worker = spawn_worker(shell)?;
    worker.submit(Job::Stage(selected))?;
    drive_staging(shell, &worker)?;
    worker.shutdown();
    Ok(())
}

/// Fetch each info URL and stage the plugins for install on next start.
pub fn install(shell: &Shell, urls: Vec<String>) -> Result<()> {
    if urls.is_empty() {
        bail!("give at least one plugin info URL");
    }
    let worker = spawn_worker(shell)?;
    worker.submit(Job::Install {
        urls,
        installed: shell.registry.installed_versions(),
    })?;
    drive_staging(shell, &worker)?;
    worker.shutdown();
    Ok(())
}

fn drive_staging(shell: &Shell, worker: &UpdateWorker) -> Result<()> {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("[{bar:40}] {pos}/{len} plugins ({elapsed})")?
            .progress_chars("=>-"),
    );

    loop {
        match worker.next_event(POLL)? {
            Some(WorkerEvent::Progress(p)) => {
                bar.set_length(p.total as u64);
                bar.set_position(p.done as u64);
            }
            Some(WorkerEvent::Failed(reason)) => bar.println(format!("failed: {reason}")),
            Some(WorkerEvent::StageFailed(reason)) => {
                bar.finish_and_clear();
                bail!("staging failed: {reason}");
            }
            Some(WorkerEvent::Staged { restart_required }) => {
                bar.finish_and_clear();
                if restart_required {
                    shell.state.mark_restart_required();
                    info!("updates staged; restart to apply");
                    println!("updates downloaded; restart Modula to apply them");
                } else {
                    println!("nothing was downloaded");
                }
                return Ok(());
            }
            Some(other) => warn!(?other, "unexpected worker event during staging"),
            None => bar.tick(),
        }
    }
}
