use crate::models::AnalysisResult;
use crate::ui::modal::{ModalKind, ResultTab};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use uuid::Uuid;

/// Defines errors that can occur within the actor system.
#[derive(Debug, thiserror::Error, Serialize, Clone)]
pub enum ActorError {
    /// The actor's mailbox is closed (the actor stopped).
    #[error("{0} is not running")]
    MailboxClosed(String),
    /// The actor dropped the reply channel without answering.
    #[error("{0} dropped the reply")]
    ReplyDropped(String),
}

// Re-export AppError for convenience
pub use crate::error::AppError;

/// Identifier of a browser tab in the host runtime.
pub type TabId = u32;

/// Actions a content script understands, in their JSON wire shape
/// (`{"action": "showLoader"}`, `{"action": "analyzeText", "text": "..."}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ContentAction {
    /// Liveness probe.
    Ping,
    ShowLoader,
    AnalyzeText {
        text: String,
    },
    ToggleExtension {
        enabled: bool,
    },
    /// Proactive push of an outcome. `data` is decoded by the content script.
    ShowResult {
        data: serde_json::Value,
        #[serde(rename = "originalText", default)]
        original_text: String,
    },
    ShowError {
        error: String,
    },
    /// Close control or backdrop click.
    CloseModal,
    CopyCorrection,
    SelectTab {
        target: ResultTab,
    },
}

impl ContentAction {
    pub fn name(&self) -> &'static str {
        match self {
            ContentAction::Ping => "ping",
            ContentAction::ShowLoader => "showLoader",
            ContentAction::AnalyzeText { .. } => "analyzeText",
            ContentAction::ToggleExtension { .. } => "toggleExtension",
            ContentAction::ShowResult { .. } => "showResult",
            ContentAction::ShowError { .. } => "showError",
            ContentAction::CloseModal => "closeModal",
            ContentAction::CopyCorrection => "copyCorrection",
            ContentAction::SelectTab { .. } => "selectTab",
        }
    }
}

/// Actions the background coordinator understands, in their JSON wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum BackgroundAction {
    CheckHallucination { text: String },
    CheckBackendStatus,
}

/// Uniform reply envelope: `{success, ready?, data?, error?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<AnalysisResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Reply {
    pub fn ok() -> Self {
        Self {
            success: true,
            ready: None,
            data: None,
            error: None,
        }
    }

    pub fn ready() -> Self {
        Self {
            ready: Some(true),
            ..Self::ok()
        }
    }

    pub fn with_data(data: AnalysisResult) -> Self {
        Self {
            data: Some(data),
            ..Self::ok()
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            ready: None,
            data: None,
            error: Some(error.into()),
        }
    }

    /// Interprets a `checkHallucination` reply.
    pub fn into_outcome(self) -> Result<AnalysisResult, String> {
        match (self.success, self.data, self.error) {
            (true, Some(data), _) => Ok(data),
            (true, None, _) => Err("The analysis reply carried no data.".to_string()),
            (false, _, Some(error)) => Err(error),
            (false, _, None) => Err("Unknown error during analysis.".to_string()),
        }
    }
}

/// Observable state of a content script's page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageSnapshot {
    pub enabled: bool,
    pub view: ModalKind,
    /// Number of modal roots present in the page.
    pub modal_nodes: usize,
    pub html: Option<String>,
    pub clipboard: Option<String>,
    pub analysis_in_flight: bool,
    /// Modal kinds installed since injection, oldest first.
    #[cfg(test)]
    pub history: Vec<ModalKind>,
}

/// Messages that can be sent to a `ContentScript` actor.
#[derive(Debug)]
pub enum ContentMessage {
    /// A runtime message from another context.
    Action {
        action: ContentAction,
        responder: oneshot::Sender<Reply>,
    },
    /// The background answered a `checkHallucination` issued by this script.
    AnalysisFinished {
        request_id: Uuid,
        original_text: String,
        outcome: Result<AnalysisResult, String>,
    },
    /// The exit animation of modal `generation` is over.
    ExitElapsed { generation: u64 },
    /// The "Copied!" feedback of modal `generation` is over.
    CopyFeedbackElapsed { generation: u64 },
    /// Marks the page document as (not) available for rendering.
    #[cfg(test)]
    SetDocumentReady { ready: bool },
    Snapshot {
        responder: oneshot::Sender<PageSnapshot>,
    },
}

/// Messages that can be sent to the `Background` coordinator.
#[derive(Debug)]
pub enum BackgroundMessage {
    /// Analyze `text` and reply `{success, data | error}`.
    CheckHallucination {
        text: String,
        responder: oneshot::Sender<Reply>,
    },
    /// A context-menu entry was clicked in `tab_id`.
    ContextMenuClicked {
        tab_id: TabId,
        menu_item_id: String,
        selection: Option<String>,
        responder: oneshot::Sender<()>,
    },
    CheckBackendStatus {
        responder: oneshot::Sender<bool>,
    },
    /// First start after installation.
    Installed {
        responder: oneshot::Sender<Result<(), AppError>>,
    },
    /// A command to stop the coordinator.
    #[allow(dead_code)]
    Shutdown,
}
