//! Error types for the capture pipeline

use thiserror::Error;

/// Result type alias for capture operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while capturing example screenshots
#[derive(Error, Debug)]
pub enum Error {
    /// Unknown flag, missing flag value, or other command-line misuse
    #[error("{0}")]
    Usage(String),

    /// A numeric option that is not a finite, non-negative number
    #[error("Invalid value for {option}: {value}")]
    InvalidOption { option: String, value: String },

    /// The example catalog could not be read or has the wrong shape
    #[error("Could not load example catalog: {0}")]
    Catalog(String),

    /// No catalog item resolved to a URL
    #[error("No targets found. Add item url values or omit --skip-default.")]
    NoTargets,

    /// No usable browser executable for the requested channel
    #[error("Browser unavailable: {0}")]
    BrowserUnavailable(String),

    /// Failed to launch the browser or open a tab
    #[error("Browser initialization failed: {0}")]
    Initialization(String),

    /// Failed to navigate to a target URL
    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// Operation timed out
    #[error("Navigation timed out after {0}ms")]
    Timeout(u64),

    /// Canvas capture was requested but the page has no visible canvas
    #[error("capture-canvas is enabled, but no visible canvas element was found")]
    NoVisibleCanvas,

    /// Failed to produce screenshot bytes
    #[error("Screenshot failed: {0}")]
    Screenshot(String),

    /// Failed to evaluate a page script
    #[error("Script execution failed: {0}")]
    Script(String),

    /// Filesystem error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Manifest (de)serialization error
    #[error("Manifest error: {0}")]
    Manifest(#[from] serde_json::Error),

    /// CDP-specific error
    #[error("CDP error: {0}")]
    Cdp(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canvas_error_mentions_visible_canvas() {
        let msg = Error::NoVisibleCanvas.to_string();
        assert!(msg.contains("no visible canvas"));
    }

    #[test]
    fn invalid_option_names_the_option() {
        let err = Error::InvalidOption { option: "width".into(), value: "abc".into() };
        assert_eq!(err.to_string(), "Invalid value for width: abc");
    }
}
