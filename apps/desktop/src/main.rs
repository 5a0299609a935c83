mod config;
mod logging;
mod shell;
mod updates;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::HostConfig;
use logging::{Channel, LogService};
use shell::Shell;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "modula", version, about = "Modula plugin host")]
struct Cli {
    /// Config file (default: <data dir>/Modula/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply staged updates, load plugins and keep running until `quit`
    Run,
    /// List installed widget classes
    List,
    /// Check every plugin for updates
    Check,
    /// Download updates; they are applied on the next start
    Update {
        names: Vec<String>,
        #[arg(long)]
        all: bool,
    },
    /// Install plugins from their published info.json URLs
    Install { urls: Vec<String> },
    /// Set a log channel threshold (file, ui, console) and save it
    LogLevel { channel: String, level: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(modula_plugins::config_path);

    if let Some(Command::LogLevel { channel, level }) = &cli.command {
        let mut config = HostConfig::read(&config_path)?;
        let channel: Channel = channel.parse()?;
        logging::validate_level(level)?;
        match channel {
            Channel::File => config.log.file_level = level.clone(),
            Channel::Ui => config.log.ui_level = level.clone(),
            Channel::Console => config.log.console_level = level.clone(),
        }
        config.save(&config_path)?;
        println!("{channel:?} log level set to {level}");
        return Ok(());
    }

    let config = HostConfig::load(&config_path)?;
    let (logs, ui_lines) = LogService::init(&config.log, &modula_plugins::logs_dir())?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "modula starting");

    let mut shell = Shell::start(config);
    if !shell.report.is_empty() {
        print!("{}", shell.report);
    }

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(&mut shell, &logs, ui_lines)?,
        Command::List => list(&shell),
        Command::Check => {
            updates::check(&shell)?;
        }
        Command::Update { names, all } => updates::update(&shell, &names, all)?,
        Command::Install { urls } => updates::install(&shell, urls)?,
        // Saved above, before logging starts.
        Command::LogLevel { .. } => {}
    }
    Ok(())
}

fn list(shell: &Shell) {
    if shell.registry.is_empty() {
        println!("no plugins installed in {}", shell.plugins_dir().display());
        return;
    }
    for class in shell.registry.get_plugin_names() {
        if let Some(p) = shell.registry.get_plugin(class) {
            let enabled = if shell.config.is_enabled(class) { "" } else { " (disabled)" };
            println!(
                "{class:<24} {:<20} {:<10} {}{enabled}",
                p.alias,
                p.info.version,
                p.source.display()
            );
        }
    }
    for e in shell.registry.failures() {
        println!("failed: {e}");
    }
}

/// Host loop: print ui log lines and react to commands typed on stdin.
fn run(shell: &mut Shell, logs: &LogService, ui_lines: Receiver<String>) -> Result<()> {
    let placed = shell.populate_plugin_area();
    println!("plugin area: {placed} widget(s)");
    for (alias, class) in shell.plugin_area() {
        println!("  [{alias}] {class}");
    }
    println!("commands: list, check, update [--all | names..], log <channel> <level>, quit");

    let (tx, commands) = mpsc::channel::<String>();
    thread::Builder::new()
        .name("stdin".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines().map_while(|l| l.ok()) {
                if tx.send(line).is_err() {
                    break;
                }
            }
        })
        .context("spawning stdin reader")?;

    loop {
        while let Ok(line) = ui_lines.try_recv() {
            println!("| {line}");
        }

        let line = match commands.recv_timeout(Duration::from_millis(100)) {
            Ok(line) => line,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };
        let words: Vec<&str> = line.split_whitespace().collect();
        let result = match words.as_slice() {
            [] => Ok(()),
            ["quit" | "q" | "exit"] => break,
            ["list"] => {
                list(shell);
                Ok(())
            }
            ["check"] => updates::check(shell).map(|_| ()),
            ["update", "--all"] => updates::update(shell, &[], true),
            ["update", names @ ..] => {
                let names: Vec<String> = names.iter().map(|s| s.to_string()).collect();
                updates::update(shell, &names, false)
            }
            ["log", channel, level] => channel
                .parse::<Channel>()
                .and_then(|c| logs.configure(c, level)),
            _ => {
                println!("unknown command: {line}");
                Ok(())
            }
        };
        if let Err(e) = result {
            println!("error: {e:#}");
        }
    }

    if shell.state.restart_required() {
        println!("staged updates will be applied on the next start");
    }
    tracing::info!("modula shutting down");
    Ok(())
}
