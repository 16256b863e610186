use crate::actors::messages::{AppError, ContentAction};
use crate::actors::runtime::{is_restricted_url, HostRuntime};
use crate::actors::traits::DetectionClient;
use crate::state::DEFAULT_ENABLED;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, instrument};

/// Liveness of the detection backend as shown by the popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// No probe has completed yet.
    Unknown,
    Connected,
    Disconnected,
}

impl HealthStatus {
    pub fn label(&self) -> &'static str {
        match self {
            HealthStatus::Unknown => "Checking backend...",
            HealthStatus::Connected => "Backend connected",
            HealthStatus::Disconnected => "Backend disconnected",
        }
    }
}

/// Outcome of a toggle broadcast.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Tabs a delivery was attempted to.
    pub attempted: usize,
    pub delivered: usize,
    /// Tabs skipped because of a restricted or missing URL.
    pub skipped: usize,
}

/// The popup control panel. Lives as long as the popup is open.
pub struct PopupPanel {
    runtime: HostRuntime,
    enabled: bool,
    health: watch::Receiver<HealthStatus>,
    health_task: JoinHandle<()>,
}

impl PopupPanel {
    /// Opens the popup: loads the persisted flag and starts the health-check loop.
    ///
    /// The first probe runs immediately, the next ones every `health_interval`.
    pub fn open<D: DetectionClient>(runtime: HostRuntime, client: Arc<D>, health_interval: Duration) -> Self {
        let enabled = runtime.state().stored().unwrap_or(DEFAULT_ENABLED);

        let (health_tx, health_rx) = watch::channel(HealthStatus::Unknown);
        let health_task = tokio::spawn(async move {
            let mut ticker = interval(health_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let status = match client.probe().await {
                    Ok(()) => HealthStatus::Connected,
                    Err(e) => {
                        debug!("Health check failed: {}", e);
                        HealthStatus::Disconnected
                    }
                };
                if health_tx.send(status).is_err() {
                    break;
                }
            }
        });

        info!("Popup opened (enabled={})", enabled);
        Self {
            runtime,
            enabled,
            health: health_rx,
            health_task,
        }
    }

    /// Current position of the on/off toggle.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn health(&self) -> HealthStatus {
        *self.health.borrow()
    }

    pub fn subscribe_health(&self) -> watch::Receiver<HealthStatus> {
        self.health.clone()
    }

    /// Flips the toggle: tells every eligible tab, then persists the value.
    ///
    /// Tabs that cannot receive the message are ignored.
    #[instrument(skip(self))]
    pub async fn set_enabled(&mut self, enabled: bool) -> Result<BroadcastReport, AppError> {
        let mut report = BroadcastReport::default();
        let mut targets = Vec::new();
        for tab in self.runtime.query().await {
            match tab.url.as_deref() {
                Some(url) if !is_restricted_url(url) => targets.push(tab.id),
                _ => report.skipped += 1,
            }
        }
        report.attempted = targets.len();

        let deliveries = targets.iter().map(|id| {
            let runtime = self.runtime.clone();
            let id = *id;
            async move {
                match runtime
                    .send_message(id, ContentAction::ToggleExtension { enabled })
                    .await
                {
                    Ok(_) => true,
                    Err(e) => {
                        debug!("Tab {} did not take the toggle: {}", id, e);
                        false
                    }
                }
            }
        });
        report.delivered = join_all(deliveries).await.into_iter().filter(|ok| *ok).count();

        self.runtime.state().set_enabled(enabled)?;
        self.enabled = enabled;
        info!(
            "Extension {}: {}/{} tabs notified, {} skipped",
            if enabled { "enabled" } else { "disabled" },
            report.delivered,
            report.attempted,
            report.skipped
        );
        Ok(report)
    }

    /// Closes the popup, stopping the health-check loop.
    pub fn close(self) {}
}

impl Drop for PopupPanel {
    fn drop(&mut self) {
        self.health_task.abort();
    }
}
