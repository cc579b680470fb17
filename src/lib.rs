// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod host;
pub mod logging;
pub mod project;
pub mod sanitize;
pub mod watch;

use anyhow::{bail, Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cli::{CliArgs, Command};
use crate::exec::SessionOutcome;
use crate::host::{HostEvent, HostSettings, SessionHost};

/// High-level entry point used by `main.rs`.
///
/// Loads the config, opens the project in a [`SessionHost`], runs the
/// requested command and prints host events until it is done. Ctrl-C stops
/// a running command; with nothing running it ends the watch.
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = config::resolve(args.config.as_deref(), &args.project)?;

    let watch_files = matches!(
        args.command,
        Command::Watch | Command::Run { watch: true, .. }
    );
    let settings = HostSettings::from_config(&cfg, watch_files);
    let (mut host, mut events) = SessionHost::new(settings);

    host.load_project(&args.project)
        .with_context(|| format!("opening project {}", args.project.display()))?;

    let keep_watching = match &args.command {
        Command::Scripts => {
            print_scripts(&host);
            return Ok(());
        }
        Command::Install => {
            host.install()?;
            false
        }
        Command::Reinstall { yes } => {
            if !*yes && !confirm_reinstall(&host.settings().dependency_dir).await? {
                println!("Cancelled.");
                return Ok(());
            }
            host.reinstall()?;
            false
        }
        Command::Run { script, watch } => {
            host.run_script(script)?;
            *watch
        }
        Command::Watch => true,
    };

    let outcome = pump_events(&host, &mut events, keep_watching).await;
    host.close().await;
    drain_pending(&mut events);

    match outcome {
        Some(outcome) if !outcome.stopped && !outcome.success() => match outcome.exit_code {
            Some(code) => bail!("command exited with code {code}"),
            None => bail!("command was terminated by a signal"),
        },
        _ => Ok(()),
    }
}

/// Print events until the command finishes (or, when `keep_watching`, until
/// Ctrl-C). Returns the outcome of the last finished command.
async fn pump_events(
    host: &SessionHost,
    events: &mut mpsc::UnboundedReceiver<HostEvent>,
    keep_watching: bool,
) -> Option<SessionOutcome> {
    let mut last_outcome = None;

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    eprintln!("failed to listen for Ctrl+C: {e}");
                    break;
                }
                if host.stop() {
                    debug!("Ctrl-C: stopping running command");
                } else {
                    info!("Ctrl-C: exiting");
                    break;
                }
            }

            event = events.recv() => {
                let Some(event) = event else { break };
                if let HostEvent::Finished { outcome, .. } = &event {
                    last_outcome = Some(*outcome);
                }
                let finished = matches!(event, HostEvent::Finished { .. });
                print_event(event);
                if finished && !keep_watching {
                    break;
                }
            }
        }
    }

    last_outcome
}

fn drain_pending(events: &mut mpsc::UnboundedReceiver<HostEvent>) {
    while let Ok(event) = events.try_recv() {
        print_event(event);
    }
}

/// Child output goes to stdout; everything the runner says goes to stderr.
fn print_event(event: HostEvent) {
    match event {
        HostEvent::Output(line) => println!("{line}"),
        HostEvent::Finished { command, outcome } => {
            if outcome.stopped {
                eprintln!("[autorunner] `{command}` stopped");
            } else {
                match outcome.exit_code {
                    Some(code) => eprintln!("[autorunner] `{command}` exited with code {code}"),
                    None => eprintln!("[autorunner] `{command}` terminated"),
                }
            }
        }
        HostEvent::FileChanged(change) => eprintln!("[autorunner] File changed: {}", change.file_name),
        HostEvent::Notice(message) => eprintln!("[autorunner] {message}"),
    }
}

fn print_scripts(host: &SessionHost) {
    let Some(project) = host.project() else {
        return;
    };
    println!("{} ({})", project.display_name(), project.package_manager);
    if project.scripts.is_empty() {
        println!("  no scripts");
        return;
    }
    for (name, cmd) in &project.scripts {
        println!("  {name}: {cmd}");
    }
}

async fn confirm_reinstall(dependency_dir: &str) -> Result<bool> {
    let prompt = format!("Delete {dependency_dir} and reinstall? [y/N] ");
    tokio::task::spawn_blocking(move || {
        use std::io::Write;

        eprint!("{prompt}");
        std::io::stderr().flush()?;
        let mut answer = String::new();
        std::io::stdin().read_line(&mut answer)?;
        Ok::<_, anyhow::Error>(matches!(answer.trim(), "y" | "Y" | "yes"))
    })
    .await?
}
