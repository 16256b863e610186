//! In-process host runtime: open tabs, their content scripts, and local storage.

use crate::actors::background::BackgroundHandle;
use crate::actors::content::ContentScriptHandle;
use crate::actors::messages::{AppError, ContentAction, Reply, TabId};
use crate::state::ExtensionState;
use crate::ui::page::{MemoryClipboard, Page};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use url::Url;

/// URL schemes that can never host a content script.
const RESTRICTED_SCHEMES: [&str; 5] = ["chrome", "edge", "chrome-extension", "moz-extension", "about"];

/// Returns true for the runtime's internal pages and the extension's own pages.
pub fn is_restricted_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => RESTRICTED_SCHEMES.contains(&parsed.scheme()),
        Err(_) => RESTRICTED_SCHEMES
            .iter()
            .any(|scheme| url.starts_with(&format!("{}:", scheme))),
    }
}

/// What a tab query returns.
#[derive(Debug, Clone, PartialEq)]
pub struct TabInfo {
    pub id: TabId,
    pub url: Option<String>,
    pub has_content_script: bool,
}

struct Tab {
    url: Option<String>,
    script: Option<ContentScriptHandle>,
}

/// Shared handle to the runtime; cheap to clone.
#[derive(Clone)]
pub struct HostRuntime {
    tabs: Arc<RwLock<HashMap<TabId, Tab>>>,
    next_id: Arc<AtomicU32>,
    state: ExtensionState,
}

impl HostRuntime {
    pub fn new(state: ExtensionState) -> Self {
        Self {
            tabs: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicU32::new(1)),
            state,
        }
    }

    /// The runtime's local storage.
    pub fn state(&self) -> &ExtensionState {
        &self.state
    }

    pub async fn open_tab(&self, url: Option<&str>) -> TabId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.tabs.write().await.insert(
            id,
            Tab {
                url: url.map(str::to_string),
                script: None,
            },
        );
        debug!("Opened tab {} ({:?})", id, url);
        id
    }

    /// Closes a tab; its content script stops once the last handle is gone.
    pub async fn close_tab(&self, id: TabId) -> bool {
        self.tabs.write().await.remove(&id).is_some()
    }

    pub async fn query(&self) -> Vec<TabInfo> {
        let tabs = self.tabs.read().await;
        let mut infos: Vec<TabInfo> = tabs
            .iter()
            .map(|(id, tab)| TabInfo {
                id: *id,
                url: tab.url.clone(),
                has_content_script: tab.script.is_some(),
            })
            .collect();
        infos.sort_by_key(|t| t.id);
        infos
    }

    pub async fn content_script(&self, id: TabId) -> Option<ContentScriptHandle> {
        self.tabs.read().await.get(&id).and_then(|t| t.script.clone())
    }

    /// Injects the content script into a tab. Injecting twice returns the existing script.
    pub async fn inject(&self, id: TabId, background: BackgroundHandle) -> Result<ContentScriptHandle, AppError> {
        let mut tabs = self.tabs.write().await;
        let tab = tabs
            .get_mut(&id)
            .ok_or_else(|| AppError::Transport(format!("No tab with id {}", id)))?;

        if let Some(script) = &tab.script {
            debug!("Content script already loaded in tab {}", id);
            return Ok(script.clone());
        }

        match tab.url.as_deref() {
            Some(url) if !is_restricted_url(url) => {}
            other => {
                return Err(AppError::Transport(format!(
                    "Cannot access contents of {:?}",
                    other.unwrap_or("<no url>")
                )))
            }
        }

        let script = ContentScriptHandle::new(
            background,
            self.state.is_enabled(),
            Page::new(),
            Arc::new(MemoryClipboard::new()),
        );
        tab.script = Some(script.clone());
        info!("Content script injected into tab {}", id);
        Ok(script)
    }

    /// Delivers `action` to the tab's content script.
    pub async fn send_message(&self, id: TabId, action: ContentAction) -> Result<Reply, AppError> {
        let script = {
            let tabs = self.tabs.read().await;
            let tab = tabs
                .get(&id)
                .ok_or_else(|| AppError::Transport(format!("No tab with id {}", id)))?;
            tab.script.clone().ok_or_else(|| {
                AppError::Transport("Could not establish connection. Receiving end does not exist.".to_string())
            })?
        };
        script.send(action).await
    }
}
