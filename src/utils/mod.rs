//! Utility functions shared across the application
//!
//! Formatting, cache path helpers and progress tracking.

mod format;
mod path;
mod progress;

pub use format::*;
pub use path::*;
pub use progress::*;
