// Hallucination Detector entry point
// Wires the background coordinator, one content script and the popup
// together in-process and drives them from the command line.

mod actors;
mod cli;
mod config;
mod error;
mod fs_manager;
mod logging;
mod models;
mod state;
mod ui;

#[cfg(test)]
mod tests;

use actors::background::{reply_timeout_for, BackgroundHandle, CONTEXT_MENU_ID};
use actors::detector::HttpDetectionClient;
use actors::messages::{BackgroundAction, ContentAction};
use actors::popup::{HealthStatus, PopupPanel};
use actors::runtime::HostRuntime;
use anyhow::{bail, Context};
use clap::Parser;
use cli::{Cli, Commands};
use config::Config;
use state::{ExtensionState, JsonFileStore};
use std::sync::Arc;
use tracing::info;

/// URL of the tab the CLI analyses selections in.
const CLI_TAB_URL: &str = "https://localhost/selection";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load().context("invalid configuration")?;
    logging::init(config.log_format)?;

    let store = JsonFileStore::in_data_dir(&config.data_dir).context("cannot open extension storage")?;
    let storage_path = store.path().to_path_buf();
    let state = ExtensionState::new(Arc::new(store));
    let runtime = HostRuntime::new(state.clone());
    let background = BackgroundHandle::new(&config, runtime.clone());

    if state.stored().is_none() {
        background.installed().await?;
    }

    match cli.command {
        Commands::Check { text, json: true, .. } => {
            let reply = background
                .dispatch(BackgroundAction::CheckHallucination { text })
                .await?;
            println!("{}", serde_json::to_string_pretty(&reply)?);
        }
        Commands::Check { text, json: false, menu } => {
            if text.trim().is_empty() {
                bail!("nothing to analyze: the text is empty");
            }
            if !state.is_enabled() {
                println!("The extension is disabled. Run `hallucination-detector enable` first.");
                return Ok(());
            }

            let tab = runtime.open_tab(Some(CLI_TAB_URL)).await;
            let script = if menu {
                background.context_menu_clicked(tab, CONTEXT_MENU_ID, Some(text)).await?;
                runtime
                    .content_script(tab)
                    .await
                    .context("content script was not injected")?
            } else {
                let script = runtime.inject(tab, background.clone()).await?;
                script.send(ContentAction::AnalyzeText { text }).await?;
                script
            };

            let kind = script
                .wait_for_outcome(reply_timeout_for(&config))
                .await
                .context("no analysis outcome")?;
            info!("Analysis finished with {:?}", kind);

            let snapshot = script.snapshot().await?;
            println!("{}", snapshot.html.unwrap_or_default());
            runtime.close_tab(tab).await;
        }
        Commands::Status => {
            let reply = background.dispatch(BackgroundAction::CheckBackendStatus).await?;
            let online = reply["online"].as_bool().unwrap_or(false);
            let status = if online {
                HealthStatus::Connected
            } else {
                HealthStatus::Disconnected
            };
            println!("{} ({})", status.label(), config.detect_url());
        }
        Commands::Enable => toggle(&config, runtime, true).await?,
        Commands::Disable => toggle(&config, runtime, false).await?,
        Commands::State => {
            let enabled = state.is_enabled();
            let origin = if state.stored().is_some() { "saved" } else { "default" };
            println!(
                "{} ({}, {})",
                if enabled { "enabled" } else { "disabled" },
                origin,
                storage_path.display()
            );
        }
    }

    Ok(())
}

/// Flips the extension through the popup, like the operator would.
async fn toggle(config: &Config, runtime: HostRuntime, enabled: bool) -> anyhow::Result<()> {
    let client = Arc::new(HttpDetectionClient::new(config));
    let mut popup = PopupPanel::open(runtime, client, config.health_interval);

    let report = popup.set_enabled(enabled).await?;
    println!(
        "Extension {} ({} of {} tabs notified)",
        if popup.is_enabled() { "enabled" } else { "disabled" },
        report.delivered,
        report.attempted
    );

    let mut health = popup.subscribe_health();
    let _ = tokio::time::timeout(
        config.request_timeout,
        health.wait_for(|s| *s != HealthStatus::Unknown),
    )
    .await;
    println!("{}", popup.health().label());
    popup.close();
    Ok(())
}
