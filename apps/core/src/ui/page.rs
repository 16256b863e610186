use crate::error::AppError;
use crate::ui::modal::MODAL_ROOT_ID;
use std::sync::{Arc, Mutex};

/// A node appended to the page body by the content script.
#[derive(Debug, Clone, PartialEq)]
pub struct PageNode {
    pub id: String,
    pub html: String,
}

/// The part of the host page the content script touches: the body's
/// extension-owned children.
#[derive(Debug, Default)]
pub struct Page {
    ready: bool,
    nodes: Vec<PageNode>,
}

impl Page {
    pub fn new() -> Self {
        Self {
            ready: true,
            nodes: Vec::new(),
        }
    }

    /// A page whose document is not available yet.
    #[cfg(test)]
    pub fn detached() -> Self {
        Self::default()
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    #[cfg(test)]
    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    pub fn append(&mut self, id: &str, html: String) {
        self.nodes.push(PageNode {
            id: id.to_string(),
            html,
        });
    }

    /// Removes every node with `id`; returns how many were removed.
    pub fn remove(&mut self, id: &str) -> usize {
        let before = self.nodes.len();
        self.nodes.retain(|n| n.id != id);
        before - self.nodes.len()
    }

    /// Rewrites the content of the first node with `id`.
    pub fn replace_html(&mut self, id: &str, html: String) -> bool {
        match self.nodes.iter_mut().find(|n| n.id == id) {
            Some(node) => {
                node.html = html;
                true
            }
            None => false,
        }
    }

    pub fn count(&self, id: &str) -> usize {
        self.nodes.iter().filter(|n| n.id == id).count()
    }

    pub fn modal_html(&self) -> Option<&str> {
        self.nodes
            .iter()
            .find(|n| n.id == MODAL_ROOT_ID)
            .map(|n| n.html.as_str())
    }
}

/// System clipboard as seen from a page.
pub trait Clipboard: Send + Sync + 'static {
    fn write_text(&self, text: &str) -> Result<(), AppError>;

    fn read_text(&self) -> Option<String>;
}

#[derive(Default, Clone)]
pub struct MemoryClipboard {
    content: Arc<Mutex<Option<String>>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clipboard for MemoryClipboard {
    fn write_text(&self, text: &str) -> Result<(), AppError> {
        let mut guard = self
            .content
            .lock()
            .map_err(|e| AppError::Internal(format!("Clipboard poisoned: {}", e)))?;
        *guard = Some(text.to_string());
        Ok(())
    }

    fn read_text(&self) -> Option<String> {
        self.content.lock().ok().and_then(|g| g.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_then_append_keeps_single_node() {
        let mut page = Page::new();
        page.append(MODAL_ROOT_ID, "a".to_string());
        assert_eq!(page.remove(MODAL_ROOT_ID), 1);
        page.append(MODAL_ROOT_ID, "b".to_string());
        assert_eq!(page.count(MODAL_ROOT_ID), 1);
        assert_eq!(page.modal_html(), Some("b"));
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut page = Page::new();
        assert_eq!(page.remove(MODAL_ROOT_ID), 0);
        assert!(!page.replace_html(MODAL_ROOT_ID, "x".to_string()));
    }

    #[test]
    fn test_detached_page_is_not_ready() {
        let mut page = Page::detached();
        assert!(!page.is_ready());
        page.set_ready(true);
        assert!(page.is_ready());
    }

    #[test]
    fn test_clipboard_shares_content_between_clones() {
        let clipboard = MemoryClipboard::new();
        let other = clipboard.clone();
        clipboard.write_text("copied").unwrap();
        assert_eq!(other.read_text().as_deref(), Some("copied"));
    }
}
