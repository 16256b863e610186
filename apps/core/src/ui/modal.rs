//! Single-slot modal state machine and its HTML rendering.
//!
//! `None -> Loader -> {Result | Error} -> None`. Rendering is a pure function
//! of the slot; the page only ever holds the output of the latest render.

use crate::models::{AnalysisResult, ResultTheme};
use serde::{Deserialize, Serialize};

/// DOM id of the modal root.
pub const MODAL_ROOT_ID: &str = "hd-modern-container";

/// Shown under every error message.
pub const ERROR_GUIDANCE: &str = "Make sure the detection backend is running on http://localhost:8000 and try again.";

/// Which text the result body shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultTab {
    #[default]
    Corrected,
    Original,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultView {
    pub result: AnalysisResult,
    pub original_text: String,
    pub tab: ResultTab,
    /// "Copied!" feedback is showing on the copy control.
    pub copied: bool,
}

impl ResultView {
    pub fn new(result: AnalysisResult, original_text: impl Into<String>) -> Self {
        Self {
            result,
            original_text: original_text.into(),
            tab: ResultTab::Corrected,
            copied: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ModalView {
    #[default]
    None,
    Loader,
    Result(ResultView),
    Error { message: String },
}

/// Coarse view of a `ModalView`, convenient for observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalKind {
    None,
    Loader,
    Result(ResultTheme),
    Error,
}

impl ModalView {
    pub fn kind(&self) -> ModalKind {
        match self {
            ModalView::None => ModalKind::None,
            ModalView::Loader => ModalKind::Loader,
            ModalView::Result(view) => ModalKind::Result(view.result.theme()),
            ModalView::Error { .. } => ModalKind::Error,
        }
    }
}

/// The page's one modal slot.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModalSlot {
    pub view: ModalView,
    /// Exit animation running; removal follows.
    pub closing: bool,
    /// Bumped every time a new modal replaces the slot content.
    pub generation: u64,
}

impl ModalSlot {
    /// Replaces the slot content with `view`.
    pub fn install(&mut self, view: ModalView) {
        self.view = view;
        self.closing = false;
        self.generation += 1;
    }

    pub fn clear(&mut self) {
        self.view = ModalView::None;
        self.closing = false;
    }

    pub fn render(&self) -> Option<String> {
        render(&self.view, self.closing)
    }
}

/// Renders `view` into the modal root's HTML, or `None` when nothing is shown.
pub fn render(view: &ModalView, closing: bool) -> Option<String> {
    let body = match view {
        ModalView::None => return None,
        ModalView::Loader => render_loader(),
        ModalView::Result(result) => render_result(result),
        ModalView::Error { message } => render_error(message),
    };
    let state = if closing { " hd-closing" } else { "" };
    Some(format!(
        r#"<div id="{id}" class="hd-fullscreen hd-wrapper{state}"><div class="hd-backdrop-blur" data-action="close"></div>{body}</div>"#,
        id = MODAL_ROOT_ID,
        state = state,
        body = body
    ))
}

fn render_loader() -> String {
    concat!(
        r#"<div class="hd-card hd-loader">"#,
        r#"<div class="hd-card-header"><div class="hd-loader-spinner"></div></div>"#,
        r#"<div class="hd-card-body"><h2 class="hd-title">Analysis in progress</h2>"#,
        r#"<p class="hd-description">Checking the facts...</p></div></div>"#
    )
    .to_string()
}

fn render_result(view: &ResultView) -> String {
    let result = &view.result;
    let theme = result.theme();
    let verdict = result.verdict();

    let content = match view.tab {
        ResultTab::Corrected => format!(
            r#"<del class="hd-original">{original}</del><p class="hd-corrected">{corrected}</p>"#,
            original = escape_html(&view.original_text),
            corrected = escape_html(&result.corrected_version)
        ),
        ResultTab::Original => {
            let original = if view.original_text.is_empty() {
                "Original text not available"
            } else {
                view.original_text.as_str()
            };
            format!(r#"<p class="hd-original-full">{}</p>"#, escape_html(original))
        }
    };

    let explanation = if result.explanation.is_empty() {
        String::new()
    } else {
        format!(r#"<p class="hd-explanation">{}</p>"#, escape_html(&result.explanation))
    };

    let (corrected_active, original_active) = match view.tab {
        ResultTab::Corrected => (" active", ""),
        ResultTab::Original => ("", " active"),
    };
    let copy_label = if view.copied { "Copied!" } else { "Copy" };

    format!(
        concat!(
            r#"<div class="hd-card {theme}">"#,
            r#"<div class="hd-card-header"></div>"#,
            r#"<div class="hd-card-body"><h2 class="hd-title">Analysis report</h2>"#,
            r#"<p class="hd-description">Result of the fact check.</p>"#,
            r#"<div class="hd-status-box"><span>AI confidence</span>"#,
            r#"<span class="hd-status">{percent}% • {label}</span></div>"#,
            r#"<div class="hd-tabs"><button class="hd-tab-btn{corrected_active}" data-target="corrected">Correction</button>"#,
            r#"<button class="hd-tab-btn{original_active}" data-target="original">Original</button></div>"#,
            r#"<div class="hd-scroll-content" id="hd-content-text">{content}</div>{explanation}"#,
            r#"<div class="hd-actions"><button class="hd-btn hd-btn-secondary" id="hd-close-btn" data-action="close">Close</button>"#,
            r#"<button class="hd-btn hd-btn-primary" id="hd-copy-btn" data-action="copy">{copy_label}</button></div>"#,
            r#"</div></div>"#
        ),
        theme = theme.css_class(),
        percent = result.confidence_percent(),
        label = verdict.label(),
        corrected_active = corrected_active,
        original_active = original_active,
        content = content,
        explanation = explanation,
        copy_label = copy_label
    )
}

fn render_error(message: &str) -> String {
    format!(
        concat!(
            r#"<div class="hd-card hd-theme-error">"#,
            r#"<div class="hd-card-header"></div>"#,
            r#"<div class="hd-card-body"><h2 class="hd-title">Error</h2>"#,
            r#"<p class="hd-description">Something went wrong during the analysis.</p>"#,
            r#"<div class="hd-scroll-content hd-error-message">{message}</div>"#,
            r#"<div class="hd-guidance">{guidance}</div>"#,
            r#"<div class="hd-actions"><button class="hd-btn hd-btn-primary" id="hd-close-btn" data-action="close">Close</button></div>"#,
            r#"</div></div>"#
        ),
        message = escape_html(message),
        guidance = escape_html(ERROR_GUIDANCE)
    )
}

/// Escapes text for insertion into HTML content or attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
