use crate::actors::detector::HttpDetectionClient;
use crate::actors::messages::{ActorError, AppError, BackgroundAction, BackgroundMessage, ContentAction, Reply, TabId};
use crate::actors::runtime::HostRuntime;
use crate::actors::traits::DetectionClient;
use crate::config::Config;
use crate::models::AnalysisRequest;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info, instrument, warn};

/// Identifier of the "check the facts" context-menu entry.
pub const CONTEXT_MENU_ID: &str = "check-hallucination";

/// Reply deadline when no request timeout is configured.
const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(60);
/// Room left on top of the request timeout for tab pushes and injection.
const REPLY_MARGIN: Duration = Duration::from_secs(5);

/// How long a caller waits for the coordinator when requests may take `config.request_timeout`.
pub fn reply_timeout_for(config: &Config) -> Duration {
    config.request_timeout + REPLY_MARGIN
}

/// A handle to the `Background` coordinator.
///
/// This is the single point of contact with the detection service. Content
/// scripts send it `checkHallucination` requests; it also drives the
/// context-menu flow by pushing messages to tabs through the host runtime.
#[derive(Clone)]
pub struct BackgroundHandle {
    sender: mpsc::Sender<BackgroundMessage>,
    reply_timeout: Duration,
}

impl BackgroundHandle {
    /// Creates a coordinator talking to the configured HTTP service.
    pub fn new(config: &Config, runtime: HostRuntime) -> Self {
        Self::spawn(Arc::new(HttpDetectionClient::new(config)), runtime, reply_timeout_for(config))
    }

    /// Creates a coordinator with a specific detection client.
    pub fn new_with_client<D: DetectionClient>(client: Arc<D>, runtime: HostRuntime) -> Self {
        Self::spawn(client, runtime, DEFAULT_REPLY_TIMEOUT)
    }

    fn spawn<D: DetectionClient>(client: Arc<D>, runtime: HostRuntime, reply_timeout: Duration) -> Self {
        let (sender, receiver) = mpsc::channel(32);
        let runner = BackgroundRunner {
            receiver,
            self_sender: sender.downgrade(),
            client,
            runtime,
            reply_timeout,
        };
        tokio::spawn(async move { runner.run().await });
        Self { sender, reply_timeout }
    }

    /// Dispatches a wire-level request.
    pub async fn dispatch(&self, action: BackgroundAction) -> Result<serde_json::Value, AppError> {
        match action {
            BackgroundAction::CheckHallucination { text } => {
                let reply = self.check_hallucination(text).await?;
                Ok(serde_json::to_value(reply)?)
            }
            BackgroundAction::CheckBackendStatus => {
                let online = self.check_backend_status().await?;
                Ok(serde_json::json!({ "online": online }))
            }
        }
    }

    /// Analyzes `text` and returns `{success: true, data}` or `{success: false, error}`.
    #[instrument(skip(self, text))]
    pub async fn check_hallucination(&self, text: String) -> Result<Reply, AppError> {
        let (send, recv) = oneshot::channel();
        let msg = BackgroundMessage::CheckHallucination { text, responder: send };
        self.sender
            .send(msg)
            .await
            .map_err(|_| ActorError::MailboxClosed("background".to_string()))?;
        timeout(self.reply_timeout, recv)
            .await?
            .map_err(|_| AppError::Actor(ActorError::ReplyDropped("background".to_string())))
    }

    /// Runs the context-menu flow for `tab_id`; resolves once every push has been attempted.
    #[instrument(skip(self, selection))]
    pub async fn context_menu_clicked(
        &self,
        tab_id: TabId,
        menu_item_id: &str,
        selection: Option<String>,
    ) -> Result<(), AppError> {
        let (send, recv) = oneshot::channel();
        let msg = BackgroundMessage::ContextMenuClicked {
            tab_id,
            menu_item_id: menu_item_id.to_string(),
            selection,
            responder: send,
        };
        self.sender
            .send(msg)
            .await
            .map_err(|_| ActorError::MailboxClosed("background".to_string()))?;
        timeout(self.reply_timeout, recv)
            .await?
            .map_err(|_| AppError::Actor(ActorError::ReplyDropped("background".to_string())))
    }

    pub async fn check_backend_status(&self) -> Result<bool, AppError> {
        let (send, recv) = oneshot::channel();
        self.sender
            .send(BackgroundMessage::CheckBackendStatus { responder: send })
            .await
            .map_err(|_| ActorError::MailboxClosed("background".to_string()))?;
        timeout(self.reply_timeout, recv)
            .await?
            .map_err(|_| AppError::Actor(ActorError::ReplyDropped("background".to_string())))
    }

    /// Installation hook: stores the default on/off state.
    pub async fn installed(&self) -> Result<(), AppError> {
        let (send, recv) = oneshot::channel();
        self.sender
            .send(BackgroundMessage::Installed { responder: send })
            .await
            .map_err(|_| ActorError::MailboxClosed("background".to_string()))?;
        timeout(self.reply_timeout, recv)
            .await?
            .map_err(|_| AppError::Actor(ActorError::ReplyDropped("background".to_string())))?
    }
}

// --- Actor Runner ---
struct BackgroundRunner<D: DetectionClient> {
    receiver: mpsc::Receiver<BackgroundMessage>,
    self_sender: mpsc::WeakSender<BackgroundMessage>,
    client: Arc<D>,
    runtime: HostRuntime,
    reply_timeout: Duration,
}

impl<D: DetectionClient> BackgroundRunner<D> {
    async fn run(mut self) {
        info!("Background coordinator started");
        while let Some(msg) = self.receiver.recv().await {
            if !self.handle_message(msg) {
                break;
            }
        }
        info!("Background coordinator stopped");
    }

    /// Requests are handed to their own task so a slow analysis never blocks the mailbox.
    fn handle_message(&mut self, msg: BackgroundMessage) -> bool {
        match msg {
            BackgroundMessage::CheckHallucination { text, responder } => {
                let request = match AnalysisRequest::new(&text) {
                    Ok(request) => request,
                    Err(e) => {
                        debug!("Rejecting analysis request: {}", e);
                        let _ = responder.send(Reply::failure(e.to_string()));
                        return true;
                    }
                };
                let client = self.client.clone();
                tokio::spawn(async move {
                    let reply = match client.detect(request.text).await {
                        Ok(result) => Reply::with_data(result),
                        Err(e) => {
                            error!("Analysis failed: {}", e);
                            Reply::failure(e.to_string())
                        }
                    };
                    let _ = responder.send(reply);
                });
            }
            BackgroundMessage::ContextMenuClicked {
                tab_id,
                menu_item_id,
                selection,
                responder,
            } => {
                let flow = AnalysisFlow {
                    client: self.client.clone(),
                    runtime: self.runtime.clone(),
                    self_sender: self.self_sender.clone(),
                    reply_timeout: self.reply_timeout,
                };
                tokio::spawn(async move {
                    flow.on_context_menu(tab_id, &menu_item_id, selection).await;
                    let _ = responder.send(());
                });
            }
            BackgroundMessage::CheckBackendStatus { responder } => {
                let client = self.client.clone();
                tokio::spawn(async move {
                    let online = client.probe().await.is_ok();
                    let _ = responder.send(online);
                });
            }
            BackgroundMessage::Installed { responder } => {
                info!("Hallucination Detector ready");
                let result = self.runtime.state().set_enabled(true);
                let _ = responder.send(result);
            }
            BackgroundMessage::Shutdown => {
                info!("Background coordinator shutting down...");
                return false;
            }
        }
        true
    }
}

/// The context-menu analysis, run outside the coordinator's mailbox loop.
struct AnalysisFlow<D: DetectionClient> {
    client: Arc<D>,
    runtime: HostRuntime,
    self_sender: mpsc::WeakSender<BackgroundMessage>,
    reply_timeout: Duration,
}

impl<D: DetectionClient> AnalysisFlow<D> {
    async fn on_context_menu(&self, tab_id: TabId, menu_item_id: &str, selection: Option<String>) {
        if menu_item_id != CONTEXT_MENU_ID {
            return;
        }
        if !self.runtime.state().is_enabled() {
            debug!("Extension disabled, ignoring context menu");
            return;
        }
        let text = match selection.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => text.to_string(),
            _ => {
                debug!("Empty selection, ignoring context menu");
                return;
            }
        };

        self.ensure_content_script(tab_id).await;
        self.push(tab_id, ContentAction::ShowLoader).await;

        match self.client.detect(text.clone()).await {
            Ok(result) => match serde_json::to_value(&result) {
                Ok(data) => {
                    self.push(
                        tab_id,
                        ContentAction::ShowResult {
                            data,
                            original_text: text,
                        },
                    )
                    .await
                }
                Err(e) => {
                    self.push(
                        tab_id,
                        ContentAction::ShowError {
                            error: AppError::from(e).user_message(),
                        },
                    )
                    .await
                }
            },
            Err(e) => {
                error!("Analysis flow failed: {}", e);
                self.push(
                    tab_id,
                    ContentAction::ShowError {
                        error: e.user_message(),
                    },
                )
                .await;
            }
        }
    }

    /// Pings the tab and injects the content script when nobody answers.
    async fn ensure_content_script(&self, tab_id: TabId) {
        if self.runtime.send_message(tab_id, ContentAction::Ping).await.is_ok() {
            return;
        }
        let Some(sender) = self.self_sender.upgrade() else {
            return;
        };
        let handle = BackgroundHandle {
            sender,
            reply_timeout: self.reply_timeout,
        };
        if let Err(e) = self.runtime.inject(tab_id, handle).await {
            debug!("Content script injection skipped for tab {}: {}", tab_id, e);
        }
    }

    async fn push(&self, tab_id: TabId, action: ContentAction) {
        let name = action.name();
        if let Err(e) = self.runtime.send_message(tab_id, action).await {
            warn!("Could not deliver {} to tab {} (closed?): {}", name, tab_id, e);
        }
    }
}
