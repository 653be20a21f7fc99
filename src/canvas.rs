//! Main-canvas detection for canvas-scoped captures.
//!
//! Interactive demos often carry several canvases (UI overlays, minimaps).
//! The render surface is taken to be the first visible canvas that can hand
//! out a WebGL context, falling back to the first visible canvas.

use serde::Deserialize;

/// Attribute set on the chosen canvas so it can be addressed by selector
pub const CANVAS_MARK_ATTR: &str = "data-exshot-capture";

/// Selector matching the marked canvas
pub const CANVAS_MARK_SELECTOR: &str = "canvas[data-exshot-capture]";

/// Page script describing every canvas in document order, as a JSON string.
///
/// Acquiring a context pins a canvas to that context type, so WebGL is only
/// attempted on visible canvases, in order, until one succeeds. Every other
/// canvas reports `webgl: false`.
pub const PROBE_SCRIPT: &str = r#"(function() {
    function hasWebgl(canvas) {
        try {
            return !!(canvas.getContext('webgl2') ||
                canvas.getContext('webgl') ||
                canvas.getContext('experimental-webgl'));
        } catch (e) {
            return false;
        }
    }
    var canvases = Array.prototype.slice.call(document.querySelectorAll('canvas'));
    var probes = canvases.map(function(canvas, index) {
        var rect = canvas.getBoundingClientRect();
        var style = window.getComputedStyle(canvas);
        return {
            index: index,
            width: rect.width,
            height: rect.height,
            display: style.display,
            visibility: style.visibility,
            opacity: style.opacity,
            webgl: false
        };
    });
    for (var i = 0; i < probes.length; i++) {
        var p = probes[i];
        var visible = p.width > 0 && p.height > 0 && p.display !== 'none' &&
            p.visibility !== 'hidden' && p.opacity !== '0';
        if (visible && hasWebgl(canvases[i])) {
            p.webgl = true;
            break;
        }
    }
    return JSON.stringify(probes);
})()"#;

/// Script marking the canvas at `index`; evaluates to whether it existed.
pub fn mark_script(index: usize) -> String {
    format!(
        "(function() {{ var c = document.querySelectorAll('canvas')[{index}]; \
         if (!c) return false; c.setAttribute('{CANVAS_MARK_ATTR}', ''); return true; }})()"
    )
}

/// Script removing the capture mark from every canvas.
pub fn unmark_script() -> String {
    format!(
        "(function() {{ document.querySelectorAll('{CANVAS_MARK_SELECTOR}')\
         .forEach(function(c) {{ c.removeAttribute('{CANVAS_MARK_ATTR}'); }}); return true; }})()"
    )
}

/// What the page reported about one canvas element
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CanvasProbe {
    /// Position among `document.querySelectorAll('canvas')`
    pub index: usize,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub display: String,
    #[serde(default)]
    pub visibility: String,
    #[serde(default)]
    pub opacity: String,
    /// A WebGL/WebGL2 context was obtained (set on at most one visible canvas)
    #[serde(default)]
    pub webgl: bool,
}

impl CanvasProbe {
    /// Laid out with a non-zero box and not hidden by styling
    pub fn is_visible(&self) -> bool {
        self.width > 0.0
            && self.height > 0.0
            && self.display != "none"
            && self.visibility != "hidden"
            && self.opacity != "0"
    }
}

/// Pick the canvas to capture, returning its document index.
pub fn select_canvas(probes: &[CanvasProbe]) -> Option<usize> {
    let visible: Vec<&CanvasProbe> = probes.iter().filter(|p| p.is_visible()).collect();

    visible
        .iter()
        .find(|p| p.webgl)
        .or_else(|| visible.first())
        .map(|p| p.index)
}
