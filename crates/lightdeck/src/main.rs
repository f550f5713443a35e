use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use clap::Subcommand;
use lightdeck::config::CardConfig;
use lightdeck::config::LoggingConfig;
use lightdeck::engine::Card;
use lightdeck::engine::ChannelService;
use lightdeck::engine::OutboundQueue;
use lightdeck::script::load_snapshot;
use lightdeck::script::Session;
use lightdeck_config::format_diagnostics;
use serde_json::json;
use tracing::info;
use tracing::warn;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "lightdeck", version, about = "Light group card engine")]
struct Cli {
    /// Card configuration, TOML or JSON
    #[arg(short, long, default_value = "lightdeck.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate the configuration and print any diagnostics
    Check,

    /// Push one state snapshot and print the rendered rows as JSON
    Render { states: PathBuf },

    /// Replay a scripted session, printing outbound messages as JSON lines
    Replay {
        session: PathBuf,

        /// Also print the paint frame produced by every step
        #[arg(long)]
        frames: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (config, warnings) = match CardConfig::from_file(&cli.config) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprint!("{}", format_diagnostics(&e.diagnostics()));
            anyhow::bail!("{} is not a usable card configuration", cli.config.display());
        }
    };
    if !warnings.is_empty() {
        eprint!("{}", format_diagnostics(&warnings));
    }

    init_logging(&config.logging);
    info!(
        config = %cli.config.display(),
        groups = config.groups.len(),
        "loaded card configuration"
    );

    match cli.command {
        Command::Check => {
            println!(
                "{}: ok ({} groups, {} warnings, card size {})",
                cli.config.display(),
                config.groups.len(),
                warnings.len(),
                config.card_size()
            );
        }
        Command::Render { states } => {
            let snapshot = load_snapshot(&states)?;
            let mut card = Card::new(config, OutboundQueue::new());
            card.push_state(snapshot);
            println!("{}", serde_json::to_string_pretty(&card.rows())?);
        }
        Command::Replay { session, frames } => {
            let session = Session::from_file(&session)?;
            let (service, mut rx) = ChannelService::new();

            let printer = tokio::spawn(async move {
                while let Some(message) = rx.recv().await {
                    println!("{}", json!({ "outbound": message }));
                }
            });

            let mut card = Card::new(config, service);
            for (i, step) in session.steps.iter().enumerate() {
                let frame = step.apply(&mut card);
                if frames {
                    println!("{}", json!({ "step": i, "frame": frame }));
                }
                // Single-threaded runtime: yielding lets the printer drain
                // this step's messages before the next step runs
                tokio::task::yield_now().await;
            }

            // Dropping the card closes the channel and ends the printer
            drop(card);
            printer.await.context("outbound printer task failed")?;
        }
    }

    Ok(())
}

fn init_logging(logging: &LoggingConfig) {
    let filter = Targets::new()
        .with_default(LevelFilter::from(logging.level))
        .with_targets(
            logging
                .overrides
                .iter()
                .map(|(target, level)| (target.clone(), LevelFilter::from(*level))),
        );

    if tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .is_err()
    {
        warn!("tracing subscriber already installed");
    }
}
