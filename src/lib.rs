//! Example gallery screenshot capture
//!
//! Loads the examples catalog, drives a headless Chrome/Chromium to every
//! example page and writes one PNG per page plus a `manifest.json` describing
//! the outcome of each capture.
//!
//! # Pipeline
//!
//! 1. [`cli::parse_args`] builds a [`CaptureConfig`]
//! 2. [`catalog::load_catalog`] and [`catalog::collect_targets`] produce the targets
//! 3. [`cdp::CdpBackend`] launches the browser
//! 4. [`capture::capture_all`] visits each target, one page per target
//! 5. [`manifest::write_manifest`] records the results
//!
//! # Example
//!
//! ```no_run
//! use exshot::CaptureConfig;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CaptureConfig {
//!     examples_path: "examples.json".into(),
//!     out_dir: "screenshots".into(),
//!     ..Default::default()
//! };
//!
//! let report = exshot::run(config).await?;
//! println!("{}/{} captured", report.succeeded(), report.results.len());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use log::info;

pub mod error;
pub use error::{Error, Result};

pub mod canvas;
pub mod capture;
pub mod catalog;
pub mod cdp;
pub mod cli;
pub mod manifest;
pub mod slug;

pub use canvas::CanvasProbe;
pub use catalog::{Catalog, CaptureTarget};
pub use cdp::{BrowserChannel, CdpBackend};
pub use manifest::CaptureResult;

/// Default catalog location
pub const DEFAULT_EXAMPLES_PATH: &str = "examples.json";
/// Default screenshot directory (where the gallery looks for images)
pub const DEFAULT_OUTPUT_DIR: &str = "examples/screenshots";
/// Default URL for items without their own
pub const DEFAULT_EXPLORER_URL: &str = "https://www.flecs.dev/explorer/";
/// Default browser channel
pub const DEFAULT_BROWSER_CHANNEL: &str = "chromium";

/// Configuration for a capture run
///
/// Built once from the command line and never modified afterwards.
///
/// # Examples
///
/// ```
/// let cfg = exshot::CaptureConfig::default();
/// assert_eq!(cfg.viewport.width, 1440);
/// assert!(!cfg.skip_default);
/// ```
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Catalog file to read
    pub examples_path: PathBuf,
    /// Directory receiving screenshots and the manifest
    pub out_dir: PathBuf,
    /// URL used for items that do not define one
    pub default_url: String,
    /// Drop items without their own URL instead of using `default_url`
    pub skip_default: bool,
    /// Browser viewport
    pub viewport: Viewport,
    /// Navigation timeout in milliseconds (0 => no limit)
    pub timeout_ms: u64,
    /// Settle delay after navigation in milliseconds (0 => skipped)
    pub delay_ms: u64,
    /// Which browser to launch
    pub channel: BrowserChannel,
    /// Maximum number of pages captured at once
    pub jobs: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            examples_path: PathBuf::from(DEFAULT_EXAMPLES_PATH),
            out_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            default_url: DEFAULT_EXPLORER_URL.to_string(),
            skip_default: false,
            viewport: Viewport::default(),
            timeout_ms: 30000,
            delay_ms: 1000,
            channel: BrowserChannel::Chromium,
            jobs: 1,
        }
    }
}

/// Viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1440,
            height: 900,
        }
    }
}

/// A browser able to open fresh pages.
///
/// Shared by every target of a run; implementations must tolerate several
/// pages being open at once when `jobs > 1`.
pub trait Backend: Send + Sync + 'static {
    type Page: PageSession;

    /// Open a new page in the shared browsing context
    fn open_page(&self) -> Result<Self::Page>;
}

/// A single open page
pub trait PageSession: Send {
    /// Navigate and wait for the network to go idle, bounded by `timeout_ms`
    /// (0 => no bound).
    fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<()>;

    /// Describe every canvas element on the page in document order
    fn probe_canvases(&mut self) -> Result<Vec<CanvasProbe>>;

    /// Scroll the canvas at `index` into view, wait `settle`, and capture it as PNG
    fn capture_canvas(&mut self, index: usize, settle: Duration) -> Result<Vec<u8>>;

    /// Capture the whole scrollable page as PNG
    fn capture_full_page(&mut self) -> Result<Vec<u8>>;

    /// Release the page
    fn close(self) -> Result<()>;
}

/// Summary of a finished run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// One result per target, in catalog order
    pub results: Vec<CaptureResult>,
    pub manifest_path: PathBuf,
    pub out_dir: PathBuf,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.ok).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    /// True when every target was captured
    pub fn all_ok(&self) -> bool {
        self.failed() == 0
    }
}

/// Run the full pipeline with a headless Chrome backend.
///
/// Fails without touching the output directory when the catalog cannot be
/// loaded, yields no targets, or no browser is available.
pub async fn run(config: CaptureConfig) -> Result<RunReport> {
    let catalog = catalog::load_catalog(&config.examples_path)?;
    let targets = catalog::collect_targets(&catalog, &config);
    drop(catalog);

    if targets.is_empty() {
        return Err(Error::NoTargets);
    }
    info!(
        "Resolved {} targets from {}",
        targets.len(),
        config.examples_path.display()
    );

    let executable = cdp::resolve_executable(&config.channel)?;

    let launch_config = config.clone();
    let backend = tokio::task::spawn_blocking(move || CdpBackend::launch(&launch_config, executable))
        .await
        .map_err(|e| Error::Initialization(format!("launch task failed: {}", e)))??;

    run_with_backend(backend, targets, config).await
}

/// Capture `targets` with an already running backend and write the manifest.
///
/// Creates the output directory if needed and makes it absolute, so the
/// screenshot paths in the manifest do not depend on the working directory.
pub async fn run_with_backend<B: Backend>(
    backend: B,
    targets: Vec<CaptureTarget>,
    mut config: CaptureConfig,
) -> Result<RunReport> {
    std::fs::create_dir_all(&config.out_dir)?;
    config.out_dir = std::path::absolute(&config.out_dir)?;

    let config = Arc::new(config);
    let results = capture::capture_all(Arc::new(backend), targets, Arc::clone(&config)).await;

    let manifest_path = manifest::write_manifest(&config.out_dir, &results)?;
    info!("Manifest: {}", manifest_path.display());

    Ok(RunReport {
        results,
        manifest_path,
        out_dir: config.out_dir.clone(),
    })
}
