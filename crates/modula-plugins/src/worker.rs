//! Background thread for update checks, staging and online installs.
//!
//! The host loop submits [`Job`]s and drains [`WorkerEvent`]s; no network call
//! ever runs on the host thread.

use crate::check::UpdateChecker;
use crate::errors::{Result, StoreError};
use crate::stage::Stager;
use crate::types::{StageProgress, UpdateCheck};
use modula_abi::PluginMetadata;
use std::collections::BTreeMap;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info};

#[derive(Debug)]
pub enum Job {
    /// Check every plugin; one `Checked` per plugin, then `CheckFinished`.
    Check(Vec<PluginMetadata>),
    /// Download the given remote records into the update manifest.
    Stage(Vec<PluginMetadata>),
    /// Fetch each info URL and stage the plugins as new installs.
    Install {
        urls: Vec<String>,
        /// Installed plugin name -> version, for dependency resolution.
        installed: BTreeMap<String, String>,
    },
    Shutdown,
}

#[derive(Debug, Clone)]
pub enum WorkerEvent {
    Checked(UpdateCheck),
    CheckFinished(Vec<UpdateCheck>),
    Progress(StageProgress),
    /// Staging finished; `restart_required` is true if anything was staged.
    Staged { restart_required: bool },
    /// One item of a job failed; the job keeps going.
    Failed(String),
    /// Staging as a whole failed. Ends the job like `Staged` does.
    StageFailed(String),
}

pub struct UpdateWorker {
    jobs: Sender<Job>,
    events: Receiver<WorkerEvent>,
    handle: Option<JoinHandle<()>>,
}

impl UpdateWorker {
    pub fn spawn(checker: UpdateChecker, stager: Stager) -> Result<Self> {
        let (jobs, job_rx) = mpsc::channel::<Job>();
        let (event_tx, events) = mpsc::channel::<WorkerEvent>();

        let handle = thread::Builder::new()
            .name("modula-updates".into())
            .spawn(move || run(&checker, &stager, job_rx, event_tx))?;

        Ok(Self {
            jobs,
            events,
            handle: Some(handle),
        })
    }

    pub fn submit(&self, job: Job) -> Result<()> {
        self.jobs
            .send(job)
            .map_err(|_| StoreError::Msg("update worker has stopped".into()))
    }

    /// Next event, if one is ready.
    pub fn try_event(&self) -> Option<WorkerEvent> {
        match self.events.try_recv() {
            Ok(ev) => Some(ev),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Wait up to `timeout` for the next event. `Err` once the worker is gone.
    pub fn next_event(&self, timeout: Duration) -> Result<Option<WorkerEvent>> {
        match self.events.recv_timeout(timeout) {
            Ok(ev) => Ok(Some(ev)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                Err(StoreError::Msg("update worker has stopped".into()))
            }
        }
    }

    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let _ = self.jobs.send(Job::Shutdown);
        if let Some(h) = self.handle.take() {
            if h.join().is_err() {
                error!("update worker panicked");
            }
        }
    }
}

impl Drop for UpdateWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(checker: &UpdateChecker, stager: &Stager, jobs: Receiver<Job>, events: Sender<WorkerEvent>) {
    debug!("update worker started");
    let emit = |ev: WorkerEvent| {
        let _ = events.send(ev);
    };

    while let Ok(job) = jobs.recv() {
        match job {
            Job::Check(plugins) => {
                let mut rows = Vec::with_capacity(plugins.len());
                for p in &plugins {
                    let row = checker.check(p);
                    emit(WorkerEvent::Checked(row.clone()));
                    rows.push(row);
                }
                emit(WorkerEvent::CheckFinished(rows));
            }
            Job::Stage(selected) => {
                let staged = stager.stage(&selected, |p| emit(WorkerEvent::Progress(p)));
                emit(finished(staged));
            }
            Job::Install { urls, installed } => {
                let mut selected = Vec::with_capacity(urls.len());
                for url in &urls {
                    match checker.fetch_remote(url) {
                        Ok(meta) => selected.push(meta),
                        Err(e) => {
                            error!(url = %url, "cannot fetch plugin info: {e}");
                            emit(WorkerEvent::Failed(format!("{url}: {e}")));
                        }
                    }
                }
                if selected.is_empty() {
                    emit(WorkerEvent::Staged {
                        restart_required: false,
                    });
                    continue;
                }
                let staged =
                    stager.stage_install(&selected, &installed, |p| emit(WorkerEvent::Progress(p)));
                emit(finished(staged));
            }
            Job::Shutdown => break,
        }
    }
    info!("update worker stopped");
}

fn finished(staged: Result<bool>) -> WorkerEvent {
    match staged {
        Ok(restart_required) => WorkerEvent::Staged { restart_required },
        Err(e) => {
            error!("staging failed: {e}");
            WorkerEvent::StageFailed(e.to_string())
        }
    }
}
