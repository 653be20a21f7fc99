//! Chrome DevTools Protocol backend (uses the `headless_chrome` crate)

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::Engine as Base64Engine;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::types::Bounds;
use headless_chrome::{Browser, LaunchOptions, Tab};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::canvas::{self, CanvasProbe, CANVAS_MARK_SELECTOR};
use crate::{Backend, CaptureConfig, Error, PageSession, Result, Viewport};

/// Quiet period after which the network counts as idle
const NETWORK_IDLE: Duration = Duration::from_millis(500);
const POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Stand-in for "no timeout"
const UNBOUNDED: Duration = Duration::from_secs(24 * 60 * 60);
/// Slack added to the browser idle timeout on top of one target's worst case
const IDLE_MARGIN: Duration = Duration::from_secs(60);

const CHROMIUM_NAMES: &[&str] = &["chromium", "chromium-browser"];
const CHROME_NAMES: &[&str] = &["google-chrome", "google-chrome-stable", "chrome"];
const MSEDGE_NAMES: &[&str] = &["microsoft-edge", "microsoft-edge-stable", "msedge"];

const LOAD_STATE_SCRIPT: &str = r#"JSON.stringify({
    readyState: document.readyState,
    resources: performance.getEntriesByType('resource').length
})"#;

const PAGE_SIZE_SCRIPT: &str = r#"JSON.stringify({
    width: Math.max(document.documentElement.scrollWidth, document.body ? document.body.scrollWidth : 0),
    height: Math.max(document.documentElement.scrollHeight, document.body ? document.body.scrollHeight : 0)
})"#;

/// Which browser build to launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserChannel {
    /// Let `headless_chrome` find a browser (honors `CHROME`)
    None,
    /// Chromium from `PATH`, else automatic detection
    Chromium,
    /// Google Chrome from `PATH`
    Chrome,
    /// Microsoft Edge from `PATH`
    Msedge,
    /// An executable name looked up on `PATH`, or a path to one
    Executable(String),
}

impl BrowserChannel {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "none" => BrowserChannel::None,
            "chromium" => BrowserChannel::Chromium,
            "chrome" => BrowserChannel::Chrome,
            "msedge" => BrowserChannel::Msedge,
            other => BrowserChannel::Executable(other.to_string()),
        }
    }
}

impl fmt::Display for BrowserChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrowserChannel::None => f.write_str("none"),
            BrowserChannel::Chromium => f.write_str("chromium"),
            BrowserChannel::Chrome => f.write_str("chrome"),
            BrowserChannel::Msedge => f.write_str("msedge"),
            BrowserChannel::Executable(name) => f.write_str(name),
        }
    }
}

fn unavailable(channel: &BrowserChannel, detail: &str) -> Error {
    Error::BrowserUnavailable(format!(
        "no browser executable for channel '{}' ({}). Install Chrome or Chromium, \
         set CHROME to its path, or pass --channel <executable>",
        channel, detail
    ))
}

fn find_on_path(name: &str) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .flat_map(|dir| {
            let plain = dir.join(name);
            let with_ext = plain.with_extension(std::env::consts::EXE_EXTENSION);
            [plain, with_ext]
        })
        .find(|candidate| candidate.is_file())
}

fn find_first(names: &[&str]) -> Option<PathBuf> {
    names.iter().find_map(|name| find_on_path(name))
}

fn detect_default(channel: &BrowserChannel) -> Result<PathBuf> {
    headless_chrome::browser::default_executable().map_err(|e| unavailable(channel, &e))
}

/// Locate the browser executable for `channel` without launching it.
pub fn resolve_executable(channel: &BrowserChannel) -> Result<PathBuf> {
    let path = match channel {
        BrowserChannel::None => detect_default(channel)?,
        BrowserChannel::Chromium => match find_first(CHROMIUM_NAMES) {
            Some(path) => path,
            None => detect_default(channel)?,
        },
        BrowserChannel::Chrome => {
            find_first(CHROME_NAMES).ok_or_else(|| unavailable(channel, "not found on PATH"))?
        }
        BrowserChannel::Msedge => {
            find_first(MSEDGE_NAMES).ok_or_else(|| unavailable(channel, "not found on PATH"))?
        }
        BrowserChannel::Executable(name) => {
            let direct = Path::new(name);
            if direct.components().count() > 1 {
                if !direct.is_file() {
                    return Err(unavailable(channel, "no such file"));
                }
                direct.to_path_buf()
            } else {
                find_on_path(name).ok_or_else(|| unavailable(channel, "not found on PATH"))?
            }
        }
    };

    debug!("Using browser {} for channel '{}'", path.display(), channel);
    Ok(path)
}

fn navigation_budget(timeout_ms: u64) -> Duration {
    if timeout_ms == 0 {
        UNBOUNDED
    } else {
        Duration::from_millis(timeout_ms)
    }
}

/// One headless browser shared by all targets of a run
pub struct CdpBackend {
    browser: Browser,
    viewport: Viewport,
}

impl CdpBackend {
    /// Launch a headless browser sized to the configured viewport.
    pub fn launch(config: &CaptureConfig, executable: PathBuf) -> Result<Self> {
        let worst_case = navigation_budget(config.timeout_ms)
            .saturating_add(Duration::from_millis(config.delay_ms))
            .saturating_add(IDLE_MARGIN);

        let launch_options = LaunchOptions::default_builder()
            .headless(true)
            .path(Some(executable))
            .window_size(Some((config.viewport.width, config.viewport.height)))
            .idle_browser_timeout(worst_case)
            .build()
            .map_err(|e| Error::Initialization(format!("Failed to build launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| Error::Initialization(format!("Failed to launch browser: {}", e)))?;

        Ok(Self {
            browser,
            viewport: config.viewport,
        })
    }
}

impl Backend for CdpBackend {
    type Page = CdpPage;

    fn open_page(&self) -> Result<CdpPage> {
        let tab = self
            .browser
            .new_tab()
            .map_err(|e| Error::Initialization(format!("Failed to create tab: {}", e)))?;

        tab.set_bounds(Bounds::Normal {
            left: Some(0),
            top: Some(0),
            width: Some(self.viewport.width as f64),
            height: Some(self.viewport.height as f64),
        })
        .map_err(|e| Error::Initialization(format!("Failed to size tab: {}", e)))?;

        Ok(CdpPage { tab })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoadState {
    ready_state: String,
    resources: u64,
}

#[derive(Deserialize)]
struct PageSize {
    width: f64,
    height: f64,
}

fn full_page_clip(size: &PageSize) -> Page::Viewport {
    Page::Viewport {
        x: 0.0,
        y: 0.0,
        width: size.width.max(1.0),
        height: size.height.max(1.0),
        scale: 1.0,
    }
}

/// A browser tab opened for one target
pub struct CdpPage {
    tab: Arc<Tab>,
}

impl CdpPage {
    /// Evaluate a script that returns `JSON.stringify(...)` and decode it.
    pub fn eval_json<T: DeserializeOwned>(&self, script: &str) -> Result<T> {
        let remote = self
            .tab
            .evaluate(script, false)
            .map_err(|e| Error::Script(format!("Evaluation failed: {}", e)))?;

        let raw = remote
            .value
            .as_ref()
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::Script("script did not return a JSON string".into()))?;

        serde_json::from_str(raw).map_err(|e| Error::Script(format!("unexpected script result: {}", e)))
    }

    /// Poll until the document is complete and no resource has finished
    /// loading for [`NETWORK_IDLE`].
    fn wait_for_network_idle(&self, deadline: Instant, timeout_ms: u64) -> Result<()> {
        let mut last_count = None;
        let mut quiet_since = Instant::now();

        loop {
            let state: LoadState = self.eval_json(LOAD_STATE_SCRIPT)?;
            let now = Instant::now();

            if state.ready_state != "complete" || last_count != Some(state.resources) {
                last_count = Some(state.resources);
                quiet_since = now;
            } else if now.duration_since(quiet_since) >= NETWORK_IDLE {
                return Ok(());
            }

            if now >= deadline {
                return Err(Error::Timeout(timeout_ms));
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    fn screenshot_marked_canvas(&self, settle: Duration) -> Result<Vec<u8>> {
        let element = self
            .tab
            .find_element(CANVAS_MARK_SELECTOR)
            .map_err(|e| Error::Screenshot(format!("Canvas element lost: {}", e)))?;

        element
            .scroll_into_view()
            .map_err(|e| Error::Screenshot(format!("Failed to scroll canvas into view: {}", e)))?;

        std::thread::sleep(settle);

        element
            .capture_screenshot(Page::CaptureScreenshotFormatOption::Png)
            .map_err(|e| Error::Screenshot(format!("Canvas screenshot failed: {}", e)))
    }
}

impl PageSession for CdpPage {
    fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<()> {
        let budget = navigation_budget(timeout_ms);
        let started = Instant::now();
        self.tab.set_default_timeout(budget);

        self.tab
            .navigate_to(url)
            .map_err(|e| Error::Navigation(format!("{}: {}", url, e)))?;

        self.tab.wait_until_navigated().map_err(|e| {
            if started.elapsed() >= budget {
                Error::Timeout(timeout_ms)
            } else {
                Error::Navigation(format!("{}: {}", url, e))
            }
        })?;

        self.wait_for_network_idle(started + budget, timeout_ms)
    }

    fn probe_canvases(&mut self) -> Result<Vec<CanvasProbe>> {
        self.eval_json(canvas::PROBE_SCRIPT)
    }

    fn capture_canvas(&mut self, index: usize, settle: Duration) -> Result<Vec<u8>> {
        let marked = self
            .tab
            .evaluate(&canvas::mark_script(index), false)
            .map_err(|e| Error::Script(format!("Failed to mark canvas: {}", e)))?;
        if marked.value != Some(serde_json::Value::Bool(true)) {
            return Err(Error::NoVisibleCanvas);
        }

        let shot = self.screenshot_marked_canvas(settle);

        if let Err(e) = self.tab.evaluate(&canvas::unmark_script(), false) {
            warn!("Failed to clear canvas mark: {}", e);
        }
        shot
    }

    fn capture_full_page(&mut self) -> Result<Vec<u8>> {
        let size: PageSize = self.eval_json(PAGE_SIZE_SCRIPT)?;
        let clip = full_page_clip(&size);

        // `Tab::capture_screenshot` leaves `capture_beyond_viewport` unset,
        // which blanks everything below the fold.
        let shot = self
            .tab
            .call_method(Page::CaptureScreenshot {
                format: Some(Page::CaptureScreenshotFormatOption::Png),
                quality: None,
                clip: Some(clip),
                from_surface: Some(true),
                capture_beyond_viewport: Some(true),
                optimize_for_speed: None,
            })
            .map_err(|e| Error::Screenshot(format!("Full-page screenshot failed: {}", e)))?;

        base64::engine::general_purpose::STANDARD
            .decode(shot.data)
            .map_err(|e| Error::Screenshot(format!("Invalid screenshot data: {}", e)))
    }

    fn close(self) -> Result<()> {
        self.tab
            .close(true)
            .map_err(|e| Error::Cdp(format!("Failed to close tab: {}", e)))?;
        Ok(())
    }
}
