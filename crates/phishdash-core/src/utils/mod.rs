//! Utility functions for string formatting and manipulation.

pub mod format;

// Re-export commonly used functions at module level
pub use format::{format_optional, format_timestamp, mask_token, truncate_string};
