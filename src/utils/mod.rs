//! Utility modules for codewind-remote

pub mod errors;
pub mod logger;
pub mod progress;
pub mod prompt;

// Re-export commonly used items
pub use errors::{CodewindError, Stage};
pub use logger::{log_info, log_warn};
pub use prompt::confirm;
