mod api;
mod cli;
mod client;
mod config;
mod device;
mod error;
mod profile;
mod runner;
mod server;
mod session;
mod signal;
mod ui;

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use api::{LayerSpec, PenSettings, PlotRequest};
use cli::{Cli, Command};
use client::PlotctlClient;
use config::PlotctlConfig;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            ui::print_error(&format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = PlotctlConfig::load(cli.config.as_deref())?;
    if let Some(server) = cli.server {
        config.server_url = server;
    }

    let client = PlotctlClient::new(&config.server_url)?;
    match cli.command {
        Command::Serve { listen } => {
            if let Some(listen) = listen {
                config.listen_addr = listen;
            }
            server::serve(&config).await?;
        }
        Command::Status => ui::print_state(&client.state().await?),
        Command::Connect => ui::print_ack(&client.connect().await?),
        Command::Disconnect => ui::print_ack(&client.disconnect().await?),
        Command::Profile { kind: Some(kind) } => ui::print_ack(&client.set_profile(&kind).await?),
        Command::Profile { kind: None } => ui::print_profile(&client.profile().await?),
        Command::Plot {
            file,
            layers,
            pen_up,
            pen_down,
            speed_up,
            speed_down,
            wait,
        } => {
            let svg = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let layer = match layers.len() {
                0 => None,
                1 => Some(LayerSpec::One(layers[0])),
                _ => Some(LayerSpec::Many(layers)),
            };
            let request = PlotRequest {
                svg,
                layer,
                settings: PenSettings {
                    pen_up,
                    pen_down,
                    speed_up,
                    speed_down,
                },
            };
            let ack = client.plot(&request).await?;
            ui::print_ack(&ack);
            if wait {
                wait_for_job(&client, ack.job_id, &format!("Plotting {}", file.display())).await?;
            }
        }
        Command::Resume { wait } => {
            let ack = client.resume().await?;
            ui::print_ack(&ack);
            if wait {
                wait_for_job(&client, ack.job_id, "Resuming plot").await?;
            }
        }
        Command::Home { from_pause } => ui::print_ack(&client.home(from_pause).await?),
        Command::Jog { words } => ui::print_ack(&client.command(&words.join(" ")).await?),
    }
    Ok(())
}

/// Polls the server until no job is running, then prints the job's outcome.
async fn wait_for_job(
    client: &PlotctlClient,
    job_id: Option<Uuid>,
    description: &str,
) -> Result<()> {
    let progress = ui::JobProgress::start(description);
    loop {
        tokio::time::sleep(POLL_INTERVAL).await;
        let state = client
            .state()
            .await
            .with_context(|| format!("polling {}", client.base_url()))?;
        progress.update(&state);
        if !state.job_running {
            let report = state
                .last_job
                .as_ref()
                .filter(|report| Some(report.job_id) == job_id);
            progress.complete(report);
            return Ok(());
        }
    }
}
