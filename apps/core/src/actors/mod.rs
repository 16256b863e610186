//! # Actors Module
//!
//! Every extension context runs as its own tokio task and is reached through a
//! cloneable handle; replies travel back on `oneshot` channels.
//!
//! ## Components
//! - `detector`: HTTP client for the remote detection service
//! - `background`: long-lived coordinator, single point of contact with the service
//! - `content`: per-tab content script owning the modal UI
//! - `popup`: on/off toggle and backend health display
//! - `runtime`: tabs, message delivery and storage of the host runtime

pub mod background;
pub mod content;
pub mod detector;
pub mod messages;
pub mod popup;
pub mod runtime;
pub mod traits;
