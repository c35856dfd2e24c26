use anyhow::{Context, Result};
use clap::Parser;
use kinema_core::KinemaConfig;
use kinema_motor::{ControllerTransport, HttpTransport, LoggingTransport};
use kinema_reasoning::{AgentSnapshot, CognitiveLoop, LoopHandle};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

mod input;
mod logging;
mod persistence;

use input::Input;

#[derive(Parser, Debug)]
#[command(name = "kinema", author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "KINEMA_CONFIG", default_value = "kinema.toml")]
    config: PathBuf,

    /// Name the agent uses for whoever is typing
    #[arg(short, long, default_value = "friend")]
    actor: String,

    /// Log commands instead of sending them to the controller
    #[arg(long)]
    dry_run: bool,

    /// Controller base URL (overrides the config file)
    #[arg(long)]
    controller_url: Option<String>,

    /// Session snapshot path (overrides the config file)
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Also write logs to a daily rolling file in this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    let _log_guard = logging::init(args.log_json, args.log_dir.as_deref())?;

    let mut config = KinemaConfig::load_or_default(&args.config);
    if args.dry_run {
        config.controller.dry_run = true;
    }
    if let Some(url) = &args.controller_url {
        config.controller.base_url = url.clone();
    }
    if let Some(path) = &args.snapshot {
        config.persistence.snapshot_path = path.clone();
    }

    let transport: Arc<dyn ControllerTransport> = if config.controller.dry_run {
        Arc::new(LoggingTransport::new())
    } else {
        Arc::new(
            HttpTransport::new(&config.controller.base_url)
                .context("Invalid controller URL")?,
        )
    };

    let (mut agent, handle) = CognitiveLoop::from_config(&config, transport)?;
    let snapshot_path = config.persistence.snapshot_path.clone();
    if let Some(saved) = persistence::load(&snapshot_path) {
        agent.restore(&saved).await;
    }

    let task = agent.spawn();
    handle.start().await?;

    let autosave = tokio::spawn(persistence::autosave(
        handle.subscribe(),
        snapshot_path.clone(),
        config.persistence.save_every_ticks,
    ));
    let presenter = tokio::spawn(present(handle.subscribe()));

    println!("Kinema is awake. Type to talk, /help for commands.");
    let result = repl(&handle, &args.actor, &config).await;

    if let Err(e) = handle.shutdown().await {
        tracing::warn!("Shutdown request not delivered: {}", e);
    }
    let last = task.await.context("Cognitive loop task panicked")?;
    autosave.abort();
    presenter.abort();

    persistence::save(&snapshot_path, &last.to_session())?;
    tracing::info!("Session saved to {}", snapshot_path.display());
    println!("{}", last.status_line());
    result
}

async fn repl(handle: &LoopHandle, actor: &str, config: &KinemaConfig) -> Result<()> {
    let skills = config.skill_registry();
    let mut lines = spawn_stdin_reader();

    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, shutting down");
                return Ok(());
            }
            line = lines.recv() => line,
        };
        let Some(line) = line else {
            return Ok(());
        };

        match input::parse_line(&line, actor, &skills) {
            Input::Empty => {}
            Input::Help => println!("{}", input::HELP),
            Input::Status => print_status(&handle.snapshot()),
            Input::Quit => return Ok(()),
            Input::Admin(command) => {
                handle
                    .send_admin(command)
                    .await
                    .context("Cognitive loop is gone")?;
            }
            Input::Perceive(event) => handle.deliver_new(event),
            Input::Invalid(message) => println!("? {}", message),
        }
    }
}

/// Blocking stdin reads on a plain thread, so a pending read never holds up
/// runtime shutdown.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to read stdin: {}", e);
                    break;
                }
            }
        }
    });
    rx
}

fn print_status(snapshot: &AgentSnapshot) {
    println!("{}", snapshot.status_line());
    for (function, value) in &snapshot.effectiveness {
        println!("  {:<3} {:.2}", function, value);
    }
    if let Some(decision) = &snapshot.last_decision {
        println!("  last: {}", decision.event);
    }
    for pending in &snapshot.outbox {
        println!("  pending: {} (re-proposed {}x)", pending.command, pending.reproposals);
    }
}

/// Print each new decision as it is published.
async fn present(mut rx: watch::Receiver<AgentSnapshot>) {
    let mut last_seen = 0;
    while rx.changed().await.is_ok() {
        let decision = match rx.borrow_and_update().last_decision.clone() {
            Some(d) if d.tick != last_seen => d,
            _ => continue,
        };
        last_seen = decision.tick;

        if let Some(reason) = &decision.substitution {
            println!("  ({})", reason);
        }
        for dispatch in &decision.dispatches {
            let mark = if dispatch.ok { "->" } else { "x " };
            println!("  {} {} [{}]", mark, dispatch.command, dispatch.outcome);
        }
        if decision.dispatches.is_empty() {
            println!("  (no response)");
        }
    }
}
