// Player Core - Video download and playback core
// Copyright (C) 2025 Henning Berge
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


use anyhow::Context;
use clap::{Parser, Subcommand};
use player_core::download::{DownloadRequest, Submission, Supervisor, TracingNotifier, TransferPhase};
use player_core::logging::{init_logging, level_from_verbosity};
use player_core::playback::PlaybackResolver;
use player_core::CoreConfig;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "player-core-cli")]
#[command(about = "Player Core CLI - Desktop testing tool", long_about = None)]
struct Cli {
    /// Storage root downloads and the ledger live in
    #[arg(short, long, default_value = "./player-data")]
    root: PathBuf,

    /// JSON config file (overrides --root)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download a video into the storage root
    Download {
        /// Source URL
        url: String,
    },
    /// Show what the player would open for a URL
    Resolve {
        /// Source URL
        url: String,
    },
    /// Inspect or reset the download ledger
    Ledger {
        #[command(subcommand)]
        action: LedgerAction,
    },
}

#[derive(Subcommand)]
enum LedgerAction {
    /// List recorded downloads
    List,
    /// Forget every recorded download (files are kept)
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(level_from_verbosity(cli.verbose));

    let config = match &cli.config {
        Some(path) => CoreConfig::from_json_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => CoreConfig::new(&cli.root),
    };
    let supervisor = Supervisor::open(config, Arc::new(TracingNotifier))
        .await
        .context("opening download ledger")?;

    match cli.command {
        Commands::Download { url } => {
            let request = DownloadRequest::new(url)?;
            let title = request.target_name().to_string();

            let mut handle = match supervisor.submit(request).await? {
                Submission::AlreadyDownloaded { target_name } => {
                    println!("File already downloaded: {}", target_name);
                    return Ok(());
                }
                Submission::Started(handle) => handle,
            };

            loop {
                let status = tokio::select! {
                    status = handle.next() => status,
                    _ = tokio::signal::ctrl_c() => {
                        println!("Cancelling...");
                        supervisor.cancel_all().await;
                        continue;
                    }
                };
                let Some(status) = status else { break };

                println!("{}", status.display_string(&title));
                if status.phase == TransferPhase::Failed {
                    anyhow::bail!(
                        "download failed: {}",
                        status.error_detail.unwrap_or_default()
                    );
                }
            }
        }
        Commands::Resolve { url } => {
            let resolver = PlaybackResolver::new(
                supervisor.ledger().clone(),
                &supervisor.config().storage_root,
            );
            let source = resolver.resolve(&url).await?;
            println!("{}", serde_json::to_string_pretty(&source)?);
        }
        Commands::Ledger { action } => match action {
            LedgerAction::List => {
                for entry in supervisor.ledger().entries().await? {
                    println!("{}  {}  {}", entry.recorded_at, entry.target_name, entry.source_url);
                }
            }
            LedgerAction::Clear => {
                let removed = supervisor.ledger().clear().await?;
                println!("Removed {} ledger entries", removed);
            }
        },
    }

    Ok(())
}
