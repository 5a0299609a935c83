//! Three-channel log service: rolling file, in-app panel, console.
//!
//! Each channel has its own threshold that can be changed at runtime.

use crate::config::LogConfig;
use anyhow::{anyhow, bail, Context, Result};
use std::io;
use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use tracing::{Level, Metadata};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    File,
    Ui,
    Console,
}

impl FromStr for Channel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "file" => Ok(Channel::File),
            "ui" => Ok(Channel::Ui),
            "console" => Ok(Channel::Console),
            other => bail!("unknown log channel `{other}` (expected file, ui or console)"),
        }
    }
}

/// 0 = off, 1 = error .. 5 = trace.
fn parse_level(level: &str) -> Result<u8> {
    if level.eq_ignore_ascii_case("off") {
        return Ok(0);
    }
    let level = Level::from_str(level).map_err(|_| anyhow!("unknown log level `{level}`"))?;
    Ok(rank(&level))
}

fn rank(level: &Level) -> u8 {
    match *level {
        Level::ERROR => 1,
        Level::WARN => 2,
        Level::INFO => 3,
        Level::DEBUG => 4,
        Level::TRACE => 5,
    }
}

#[derive(Debug, Clone)]
struct Threshold(Arc<AtomicU8>);

impl Threshold {
    fn new(level: &str) -> Result<Self> {
        Ok(Self(Arc::new(AtomicU8::new(parse_level(level)?))))
    }

    fn set(&self, rank: u8) {
        self.0.store(rank, Ordering::Relaxed);
    }

    fn allows(&self, meta: &Metadata<'_>) -> bool {
        rank(meta.level()) <= self.0.load(Ordering::Relaxed)
    }
}

/// Keeps the file writer alive and owns the per-channel thresholds.
pub struct LogService {
    file: Threshold,
    ui: Threshold,
    console: Threshold,
    _guard: WorkerGuard,
}

impl LogService {
    /// Install the global subscriber. Returns the service and the receiving end
    /// of the ui channel (one formatted line per event).
    pub fn init(config: &LogConfig, logs_dir: &Path) -> Result<(Self, Receiver<String>)> {
        std::fs::create_dir_all(logs_dir)
            .with_context(|| format!("creating {}", logs_dir.display()))?;

        let file = Threshold::new(&config.file_level)?;
        let ui = Threshold::new(&config.ui_level)?;
        let console = Threshold::new(&config.console_level)?;

        let appender = tracing_appender::rolling::daily(logs_dir, "modula.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        let (tx, rx) = mpsc::channel();

        let f = file.clone();
        let u = ui.clone();
        let c = console.clone();
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(non_blocking)
                    .with_ansi(false)
                    .with_filter(filter_fn(move |m| f.allows(m))),
            )
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(UiSink { tx })
                    .with_ansi(false)
                    .with_target(false)
                    .without_time()
                    .with_filter(filter_fn(move |m| u.allows(m))),
            )
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(io::stderr)
                    .with_filter(filter_fn(move |m| c.allows(m))),
            )
            .try_init()
            .map_err(|e| anyhow!("logging already initialized: {e}"))?;

        Ok((
            Self {
                file,
                ui,
                console,
                _guard: guard,
            },
            rx,
        ))
    }

    /// Change one channel's threshold (`off`, `error` .. `trace`).
    pub fn configure(&self, channel: Channel, level: &str) -> Result<()> {
        let rank = parse_level(level)?;
        match channel {
            Channel::File => self.file.set(rank),
            Channel::Ui => self.ui.set(rank),
            Channel::Console => self.console.set(rank),
        }
        Ok(())
    }
}

/// Validate a level string without touching any service.
pub fn validate_level(level: &str) -> Result<()> {
    parse_level(level).map(|_| ())
}

#[derive(Clone)]
struct UiSink {
    tx: Sender<String>,
}

/// Buffers one formatted event and sends it when dropped.
struct UiLine {
    tx: Sender<String>,
    buf: Vec<u8>,
}

impl io::Write for UiLine {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for UiLine {
    fn drop(&mut self) {
        let line = String::from_utf8_lossy(&self.buf);
        let line = line.trim_end();
        if !line.is_empty() {
            let _ = self.tx.send(line.to_string());
        }
    }
}

impl<'a> MakeWriter<'a> for UiSink {
    type Writer = UiLine;

    fn make_writer(&'a self) -> Self::Writer {
        UiLine {
            tx: self.tx.clone(),
            buf: Vec::new(),
        }
    }
}
