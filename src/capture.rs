//! The capture loop: one page per target, failures recorded and skipped.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use log::{info, warn};
use tokio::sync::Semaphore;

use crate::catalog::CaptureTarget;
use crate::manifest::CaptureResult;
use crate::{canvas, slug, Backend, CaptureConfig, Error, PageSession, Result};

/// Extra wait after scrolling a canvas into view
pub const CANVAS_SETTLE: Duration = Duration::from_millis(100);

/// Screenshot path for a target inside `out_dir`
pub fn screenshot_path(out_dir: &Path, target: &CaptureTarget) -> PathBuf {
    out_dir.join(format!("{}.png", slug::screenshot_name(&target.id)))
}

/// Log targets whose screenshots land on the same file.
///
/// Colliding targets are still captured; the later one overwrites the file.
pub fn warn_on_collisions(targets: &[CaptureTarget]) -> usize {
    let mut seen: HashMap<String, &str> = HashMap::new();
    let mut collisions = 0;

    for target in targets {
        let name = slug::screenshot_name(&target.id);
        if let Some(first) = seen.get(&name) {
            warn!(
                "Targets '{}' and '{}' both write {}.png; the later capture overwrites the earlier one",
                first, target.id, name
            );
            collisions += 1;
        } else {
            seen.insert(name, &target.id);
        }
    }

    collisions
}

/// Navigate, settle and screenshot one target into `path`.
pub fn capture_into<P: PageSession>(
    page: &mut P,
    target: &CaptureTarget,
    config: &CaptureConfig,
    path: &Path,
) -> Result<()> {
    url::Url::parse(&target.url)
        .map_err(|e| Error::Navigation(format!("invalid URL '{}': {}", target.url, e)))?;

    page.navigate(&target.url, config.timeout_ms)?;

    if config.delay_ms > 0 {
        std::thread::sleep(Duration::from_millis(config.delay_ms));
    }

    let png = if target.capture_canvas {
        let probes = page.probe_canvases()?;
        let index = canvas::select_canvas(&probes).ok_or(Error::NoVisibleCanvas)?;
        page.capture_canvas(index, CANVAS_SETTLE)?
    } else {
        page.capture_full_page()?
    };

    std::fs::write(path, png)?;
    Ok(())
}

/// Capture a single target on a fresh page, closing the page on every path.
pub fn capture_one<B: Backend>(backend: &B, target: &CaptureTarget, config: &CaptureConfig) -> CaptureResult {
    let path = screenshot_path(&config.out_dir, target);
    info!("Capturing {}: {}", target.title, target.url);

    let outcome = backend.open_page().and_then(|mut page| {
        let res = capture_into(&mut page, target, config, &path);
        if let Err(e) = page.close() {
            warn!("Failed to close page for {}: {}", target.id, e);
        }
        res
    });

    match outcome {
        Ok(()) => CaptureResult::success(target.clone(), path),
        Err(e) => {
            warn!("Failed {}: {}", target.title, e);
            CaptureResult::failure(target.clone(), path, e.to_string())
        }
    }
}

/// Capture every target and return one result per target, in target order.
///
/// With `config.jobs <= 1` targets are handled strictly one after another.
/// Otherwise up to `jobs` pages are open at once.
pub async fn capture_all<B: Backend>(
    backend: Arc<B>,
    targets: Vec<CaptureTarget>,
    config: Arc<CaptureConfig>,
) -> Vec<CaptureResult> {
    warn_on_collisions(&targets);

    if config.jobs <= 1 {
        let mut results = Vec::with_capacity(targets.len());
        for target in targets {
            results.push(spawn_capture(Arc::clone(&backend), target, Arc::clone(&config)).await);
        }
        return results;
    }

    let permits = Arc::new(Semaphore::new(config.jobs));
    let tasks = targets.into_iter().map(|target| {
        let backend = Arc::clone(&backend);
        let config = Arc::clone(&config);
        let permits = Arc::clone(&permits);
        async move {
            // The semaphore is never closed.
            let _permit = permits.acquire_owned().await.ok();
            spawn_capture(backend, target, config).await
        }
    });

    join_all(tasks).await
}

async fn spawn_capture<B: Backend>(
    backend: Arc<B>,
    target: CaptureTarget,
    config: Arc<CaptureConfig>,
) -> CaptureResult {
    let fallback = target.clone();
    let path = screenshot_path(&config.out_dir, &target);

    match tokio::task::spawn_blocking(move || capture_one(backend.as_ref(), &target, &config)).await {
        Ok(result) => result,
        Err(e) => {
            warn!("Capture task for {} did not finish: {}", fallback.id, e);
            CaptureResult::failure(fallback, path, format!("capture task failed: {}", e))
        }
    }
}
