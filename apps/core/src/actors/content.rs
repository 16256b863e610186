use crate::actors::background::BackgroundHandle;
use crate::actors::messages::{ActorError, AppError, ContentAction, ContentMessage, PageSnapshot, Reply};
use crate::models::{AnalysisRequest, AnalysisResult};
use crate::ui::modal::{ModalKind, ModalSlot, ModalView, ResultTab, ResultView, MODAL_ROOT_ID};
use crate::ui::page::{Clipboard, Page};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Length of the exit animation before a closed modal leaves the page.
pub const EXIT_ANIMATION: Duration = Duration::from_millis(200);
/// How long the copy control shows "Copied!".
pub const COPY_FEEDBACK: Duration = Duration::from_secs(2);

const REPLY_TIMEOUT: Duration = Duration::from_secs(10);

/// A handle to a tab's `ContentScript` actor.
///
/// Cloneable; the actor stops when the last handle is dropped.
#[derive(Clone)]
pub struct ContentScriptHandle {
    sender: mpsc::Sender<ContentMessage>,
    modal: watch::Receiver<ModalKind>,
}

impl std::fmt::Debug for ContentScriptHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentScriptHandle")
            .field("modal", &*self.modal.borrow())
            .finish()
    }
}

impl ContentScriptHandle {
    /// Spawns a content script for one page.
    ///
    /// # Arguments
    ///
    /// * `background` - Coordinator that performs analyses for this script.
    /// * `enabled` - Initial value of the on/off flag, as read from storage.
    /// * `page` - The document the modals are rendered into.
    /// * `clipboard` - Target of the copy control.
    pub fn new(background: BackgroundHandle, enabled: bool, page: Page, clipboard: Arc<dyn Clipboard>) -> Self {
        let (sender, receiver) = mpsc::channel(32);
        let (modal_tx, modal_rx) = watch::channel(ModalKind::None);
        let runner = ContentScriptRunner {
            receiver,
            self_sender: sender.downgrade(),
            background,
            enabled,
            page,
            clipboard,
            slot: ModalSlot::default(),
            in_flight: None,
            #[cfg(test)]
            history: Vec::new(),
            modal_tx,
        };
        tokio::spawn(async move { runner.run().await });
        Self {
            sender,
            modal: modal_rx,
        }
    }

    /// Delivers a runtime message and waits for the script's reply.
    #[instrument(skip(self, action), fields(action = action.name()))]
    pub async fn send(&self, action: ContentAction) -> Result<Reply, AppError> {
        let (send, recv) = oneshot::channel();
        self.sender
            .send(ContentMessage::Action {
                action,
                responder: send,
            })
            .await
            .map_err(|_| ActorError::MailboxClosed("content script".to_string()))?;
        timeout(REPLY_TIMEOUT, recv)
            .await?
            .map_err(|_| AppError::Actor(ActorError::ReplyDropped("content script".to_string())))
    }

    pub async fn snapshot(&self) -> Result<PageSnapshot, AppError> {
        let (send, recv) = oneshot::channel();
        self.sender
            .send(ContentMessage::Snapshot { responder: send })
            .await
            .map_err(|_| ActorError::MailboxClosed("content script".to_string()))?;
        timeout(REPLY_TIMEOUT, recv)
            .await?
            .map_err(|_| AppError::Actor(ActorError::ReplyDropped("content script".to_string())))
    }

    #[cfg(test)]
    pub async fn set_document_ready(&self, ready: bool) -> Result<(), AppError> {
        self.sender
            .send(ContentMessage::SetDocumentReady { ready })
            .await
            .map_err(|_| AppError::Actor(ActorError::MailboxClosed("content script".to_string())))
    }

    /// Follows the kind of modal currently shown.
    pub fn subscribe(&self) -> watch::Receiver<ModalKind> {
        self.modal.clone()
    }

    /// Waits until the page shows a result or an error.
    pub async fn wait_for_outcome(&self, limit: Duration) -> Result<ModalKind, AppError> {
        let mut rx = self.subscribe();
        let kind = timeout(
            limit,
            rx.wait_for(|k| matches!(k, ModalKind::Result(_) | ModalKind::Error)),
        )
        .await?
        .map_err(|_| AppError::Actor(ActorError::MailboxClosed("content script".to_string())))?;
        Ok(*kind)
    }
}

// --- Actor Runner ---
struct ContentScriptRunner {
    receiver: mpsc::Receiver<ContentMessage>,
    /// Weak so the mailbox closes once every external handle is gone.
    self_sender: mpsc::WeakSender<ContentMessage>,
    background: BackgroundHandle,
    enabled: bool,
    page: Page,
    clipboard: Arc<dyn Clipboard>,
    slot: ModalSlot,
    /// Correlation id of the analysis whose reply may still change the modal.
    in_flight: Option<Uuid>,
    #[cfg(test)]
    history: Vec<ModalKind>,
    modal_tx: watch::Sender<ModalKind>,
}

impl ContentScriptRunner {
    async fn run(mut self) {
        info!("Content script loaded");
        while let Some(msg) = self.receiver.recv().await {
            self.handle_message(msg);
        }
        debug!("Content script unloaded");
    }

    fn handle_message(&mut self, msg: ContentMessage) {
        match msg {
            ContentMessage::Action { action, responder } => {
                let reply = self.handle_action(action);
                let _ = responder.send(reply);
            }
            ContentMessage::AnalysisFinished {
                request_id,
                original_text,
                outcome,
            } => self.finish_analysis(request_id, original_text, outcome),
            ContentMessage::ExitElapsed { generation } => {
                if self.slot.generation == generation && self.slot.closing {
                    self.page.remove(MODAL_ROOT_ID);
                    self.slot.clear();
                    self.publish();
                    debug!("Modal removed after exit animation");
                }
            }
            ContentMessage::CopyFeedbackElapsed { generation } => {
                if self.slot.generation == generation {
                    if let ModalView::Result(view) = &mut self.slot.view {
                        view.copied = false;
                        self.rerender();
                    }
                }
            }
            #[cfg(test)]
            ContentMessage::SetDocumentReady { ready } => self.page.set_ready(ready),
            ContentMessage::Snapshot { responder } => {
                let _ = responder.send(self.snapshot());
            }
        }
    }

    fn handle_action(&mut self, action: ContentAction) -> Reply {
        match action {
            ContentAction::Ping => Reply::ready(),
            ContentAction::ShowLoader => {
                self.show_loader();
                Reply::ok()
            }
            ContentAction::AnalyzeText { text } => {
                self.analyze(text);
                Reply::ok()
            }
            ContentAction::ToggleExtension { enabled } => {
                info!("Extension {}", if enabled { "enabled" } else { "disabled" });
                self.enabled = enabled;
                Reply::ok()
            }
            ContentAction::ShowResult { data, original_text } => {
                match serde_json::from_value::<AnalysisResult>(data) {
                    Ok(result) => {
                        self.hide_loader();
                        self.show_result(result, original_text);
                        Reply::ok()
                    }
                    Err(e) => {
                        let message = format!("Incomplete analysis data received: {}", e);
                        error!("{}", message);
                        self.hide_loader();
                        self.show_error(message.clone());
                        Reply::failure(message)
                    }
                }
            }
            ContentAction::ShowError { error } => {
                self.hide_loader();
                self.show_error(error);
                Reply::ok()
            }
            ContentAction::CloseModal => {
                self.begin_close();
                Reply::ok()
            }
            ContentAction::CopyCorrection => match self.copy_correction() {
                Ok(()) => Reply::ok(),
                Err(e) => Reply::failure(e.to_string()),
            },
            ContentAction::SelectTab { target } => {
                self.select_tab(target);
                Reply::ok()
            }
        }
    }

    fn analyze(&mut self, text: String) {
        let request = match AnalysisRequest::new(&text) {
            Ok(request) => request,
            Err(_) => {
                debug!("Ignoring empty selection");
                return;
            }
        };
        if !self.enabled {
            debug!("Extension disabled, ignoring selection");
            return;
        }

        self.show_loader();

        let request_id = Uuid::new_v4();
        if let Some(previous) = self.in_flight.replace(request_id) {
            debug!("Analysis {} superseded by {}", previous, request_id);
        }
        info!("Sending analysis {} to background", request_id);

        let background = self.background.clone();
        let me = self.self_sender.clone();
        tokio::spawn(async move {
            let outcome = match background.check_hallucination(request.text.clone()).await {
                Ok(reply) => reply.into_outcome(),
                Err(e) => Err(e.to_string()),
            };
            if let Some(sender) = me.upgrade() {
                let _ = sender
                    .send(ContentMessage::AnalysisFinished {
                        request_id,
                        original_text: request.text,
                        outcome,
                    })
                    .await;
            }
        });
    }

    fn finish_analysis(&mut self, request_id: Uuid, original_text: String, outcome: Result<AnalysisResult, String>) {
        if self.in_flight != Some(request_id) {
            debug!("Dropping stale reply for analysis {}", request_id);
            return;
        }
        self.in_flight = None;
        self.hide_loader();
        match outcome {
            Ok(result) => self.show_result(result, original_text),
            Err(message) => {
                warn!("Analysis {} failed: {}", request_id, message);
                self.show_error(message);
            }
        }
    }

    fn show_loader(&mut self) {
        self.hide_loader();
        self.install(ModalView::Loader);
    }

    fn hide_loader(&mut self) {
        if matches!(self.slot.view, ModalView::Loader) {
            self.page.remove(MODAL_ROOT_ID);
            self.slot.clear();
            self.publish();
        }
    }

    fn show_result(&mut self, result: AnalysisResult, original_text: String) {
        info!(
            "Showing result: {} ({}%)",
            result.verdict().label(),
            result.confidence_percent()
        );
        self.install(ModalView::Result(ResultView::new(result, original_text)));
    }

    fn show_error(&mut self, message: String) {
        self.install(ModalView::Error { message });
    }

    /// Replaces whatever modal is present with `view`.
    fn install(&mut self, view: ModalView) {
        self.page.remove(MODAL_ROOT_ID);
        if !self.page.is_ready() {
            error!("Document not ready, abandoning {:?} modal", view.kind());
            self.slot.clear();
            self.publish();
            return;
        }
        self.slot.install(view);
        if let Some(html) = self.slot.render() {
            self.page.append(MODAL_ROOT_ID, html);
        }
        #[cfg(test)]
        self.history.push(self.slot.view.kind());
        self.publish();
    }

    fn rerender(&mut self) {
        if let Some(html) = self.slot.render() {
            self.page.replace_html(MODAL_ROOT_ID, html);
        }
    }

    fn begin_close(&mut self) {
        if matches!(self.slot.view, ModalView::None) || self.slot.closing {
            return;
        }
        self.slot.closing = true;
        self.rerender();

        let generation = self.slot.generation;
        let me = self.self_sender.clone();
        tokio::spawn(async move {
            sleep(EXIT_ANIMATION).await;
            if let Some(sender) = me.upgrade() {
                let _ = sender.send(ContentMessage::ExitElapsed { generation }).await;
            }
        });
    }

    fn copy_correction(&mut self) -> Result<(), AppError> {
        let text = match &self.slot.view {
            ModalView::Result(view) => view.result.corrected_version.clone(),
            _ => return Err(AppError::Validation("No result to copy".to_string())),
        };
        self.clipboard.write_text(&text).map_err(|e| {
            warn!("Clipboard write failed: {}", e);
            e
        })?;

        if let ModalView::Result(view) = &mut self.slot.view {
            view.copied = true;
        }
        self.rerender();

        let generation = self.slot.generation;
        let me = self.self_sender.clone();
        tokio::spawn(async move {
            sleep(COPY_FEEDBACK).await;
            if let Some(sender) = me.upgrade() {
                let _ = sender.send(ContentMessage::CopyFeedbackElapsed { generation }).await;
            }
        });
        Ok(())
    }

    fn select_tab(&mut self, target: ResultTab) {
        if let ModalView::Result(view) = &mut self.slot.view {
            view.tab = target;
            self.rerender();
        }
    }

    fn publish(&self) {
        let _ = self.modal_tx.send(self.slot.view.kind());
    }

    fn snapshot(&self) -> PageSnapshot {
        PageSnapshot {
            enabled: self.enabled,
            view: self.slot.view.kind(),
            modal_nodes: self.page.count(MODAL_ROOT_ID),
            html: self.page.modal_html().map(str::to_string),
            clipboard: self.clipboard.read_text(),
            analysis_in_flight: self.in_flight.is_some(),
            #[cfg(test)]
            history: self.history.clone(),
        }
    }
}
