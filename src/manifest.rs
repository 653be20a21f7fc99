//! Capture results and the `manifest.json` written at the end of a run

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::catalog::CaptureTarget;
use crate::Result;

/// File name of the manifest inside the output directory
pub const MANIFEST_FILE: &str = "manifest.json";

/// Outcome of capturing one target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureResult {
    #[serde(flatten)]
    pub target: CaptureTarget,
    /// Where the screenshot was (or would have been) written
    pub screenshot: PathBuf,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CaptureResult {
    pub fn success(target: CaptureTarget, screenshot: PathBuf) -> Self {
        Self { target, screenshot, ok: true, error: None }
    }

    pub fn failure(target: CaptureTarget, screenshot: PathBuf, error: impl Into<String>) -> Self {
        Self { target, screenshot, ok: false, error: Some(error.into()) }
    }
}

/// Write `results` as pretty-printed JSON to `<out_dir>/manifest.json`,
/// replacing any previous manifest. Returns the manifest path.
pub fn write_manifest(out_dir: &Path, results: &[CaptureResult]) -> Result<PathBuf> {
    let path = out_dir.join(MANIFEST_FILE);
    let json = serde_json::to_string_pretty(results)?;
    std::fs::write(&path, json)?;
    Ok(path)
}

/// Load a manifest previously written by [`write_manifest`].
pub fn read_manifest(path: &Path) -> Result<Vec<CaptureResult>> {
    let source = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&source)?)
}
