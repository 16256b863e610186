//! Content-script UI: the modal state machine and the page it renders into.

pub mod modal;
pub mod page;
