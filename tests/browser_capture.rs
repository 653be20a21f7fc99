//! Capture tests against a real headless Chrome

use std::sync::Once;

use exshot::catalog::CaptureTarget;
use exshot::cdp::resolve_executable;
use exshot::{Backend, BrowserChannel, CaptureConfig, CdpBackend, PageSession, Viewport};
use tiny_http::{Response, Server};

static INIT: Once = Once::new();

/// Start a simple test HTTP server
fn start_test_server() -> String {
    INIT.call_once(|| {
        std::thread::spawn(|| {
            let server = Server::http("127.0.0.1:18090").unwrap();
            for request in server.incoming_requests() {
                let path = request.url().to_string();
                let response = match path.as_str() {
                    "/plain" => Response::from_string(
                        r#"<!DOCTYPE html>
<html>
<head><title>Plain Page</title></head>
<body><h1>No canvas here</h1></body>
</html>"#,
                    ),
                    "/canvas" => Response::from_string(
                        r#"<!DOCTYPE html>
<html>
<head><title>Canvas Page</title></head>
<body>
<canvas id="hidden" width="50" height="50" style="display:none"></canvas>
<canvas id="ui" width="100" height="40"></canvas>
<canvas id="main" width="320" height="200"></canvas>
</body>
</html>"#,
                    ),
                    "/tall" => Response::from_string(
                        r#"<!DOCTYPE html>
<html>
<head><title>Tall Page</title></head>
<body style="margin:0">
<div style="height:3000px;background:#336699">Top</div>
<p id="bottom">Bottom</p>
</body>
</html>"#,
                    ),
                    "/overlay" => Response::from_string(
                        r#"<!DOCTYPE html>
<html>
<head><title>Overlay Page</title></head>
<body>
<canvas id="hidden" width="50" height="50" style="display:none"></canvas>
<canvas id="first" width="320" height="200"></canvas>
<canvas id="second" width="320" height="200"></canvas>
</body>
</html>"#,
                    ),
                    _ => Response::from_string("Not Found").with_status_code(404),
                };
                let response = response.with_header(
                    "Content-Type: text/html; charset=utf-8"
                        .parse::<tiny_http::Header>()
                        .unwrap(),
                );
                let _ = request.respond(response);
            }
        });
        // Give the server time to start
        std::thread::sleep(std::time::Duration::from_millis(100));
    });

    "http://127.0.0.1:18090".to_string()
}

fn target(id: &str, url: String, capture_canvas: bool) -> CaptureTarget {
    CaptureTarget {
        section_id: "test".into(),
        section_title: "Test".into(),
        id: id.into(),
        title: id.into(),
        url,
        capture_canvas,
    }
}

#[tokio::test(flavor = "multi_thread")]
#[ignore] // Requires Chrome to be installed
async fn captures_full_page_and_canvas() {
    let base_url = start_test_server();
    let dir = tempfile::tempdir().unwrap();
    let config = CaptureConfig {
        out_dir: dir.path().to_path_buf(),
        viewport: Viewport { width: 640, height: 480 },
        delay_ms: 100,
        timeout_ms: 15000,
        channel: BrowserChannel::None,
        ..Default::default()
    };

    let executable = resolve_executable(&config.channel).expect("no Chrome available");
    let backend = CdpBackend::launch(&config, executable).expect("Failed to launch browser");

    let targets = vec![
        target("plain", format!("{}/plain", base_url), false),
        target("plain canvas", format!("{}/plain", base_url), true),
        target("canvas", format!("{}/canvas", base_url), true),
    ];

    let report = exshot::run_with_backend(backend, targets, config).await.expect("run failed");

    let plain = &report.results[0];
    assert!(plain.ok, "{:?}", plain.error);
    let png = std::fs::read(&plain.screenshot).unwrap();
    // PNG files start with these magic bytes
    assert_eq!(&png[0..8], b"\x89PNG\r\n\x1a\n");

    let missing = &report.results[1];
    assert!(!missing.ok);
    assert!(missing.error.as_deref().unwrap().contains("no visible canvas"));

    let canvas = &report.results[2];
    assert!(canvas.ok, "{:?}", canvas.error);
    assert!(std::fs::read(&canvas.screenshot).unwrap().len() > 100);
}

#[tokio::test(flavor = "multi_thread")]
#[ignore] // Requires Chrome to be installed
async fn unreachable_page_fails_without_stopping_the_run() {
    let base_url = start_test_server();
    let dir = tempfile::tempdir().unwrap();
    let config = CaptureConfig {
        out_dir: dir.path().to_path_buf(),
        delay_ms: 0,
        timeout_ms: 5000,
        channel: BrowserChannel::None,
        ..Default::default()
    };

    let executable = resolve_executable(&config.channel).expect("no Chrome available");
    let backend = CdpBackend::launch(&config, executable).expect("Failed to launch browser");

    let targets = vec![
        target("dead", "http://127.0.0.1:1/".into(), false),
        target("alive", format!("{}/plain", base_url), false),
    ];

    let report = exshot::run_with_backend(backend, targets, config).await.expect("run failed");
    assert!(!report.results[0].ok);
    assert!(report.results[1].ok, "{:?}", report.results[1].error);
    assert!(report.manifest_path.is_file());
}

/// Width and height from a PNG's IHDR chunk
fn png_size(png: &[u8]) -> (u32, u32) {
    let width = u32::from_be_bytes([png[16], png[17], png[18], png[19]]);
    let height = u32::from_be_bytes([png[20], png[21], png[22], png[23]]);
    (width, height)
}

#[tokio::test(flavor = "multi_thread")]
#[ignore] // Requires Chrome to be installed
async fn full_page_capture_extends_below_the_viewport() {
    let base_url = start_test_server();
    let dir = tempfile::tempdir().unwrap();
    let config = CaptureConfig {
        out_dir: dir.path().to_path_buf(),
        viewport: Viewport { width: 640, height: 480 },
        delay_ms: 0,
        timeout_ms: 15000,
        channel: BrowserChannel::None,
        ..Default::default()
    };

    let executable = resolve_executable(&config.channel).expect("no Chrome available");
    let backend = CdpBackend::launch(&config, executable).expect("Failed to launch browser");

    let targets = vec![target("tall", format!("{}/tall", base_url), false)];
    let report = exshot::run_with_backend(backend, targets, config).await.expect("run failed");

    let tall = &report.results[0];
    assert!(tall.ok, "{:?}", tall.error);
    let (_, height) = png_size(&std::fs::read(&tall.screenshot).unwrap());
    assert!(height > 3000, "screenshot is only {}px tall", height);
}

#[test]
#[ignore] // Requires Chrome to be installed
fn canvas_detection_leaves_other_canvases_free_for_2d() {
    let base_url = start_test_server();
    let config = CaptureConfig {
        timeout_ms: 15000,
        channel: BrowserChannel::None,
        ..Default::default()
    };

    let executable = resolve_executable(&config.channel).expect("no Chrome available");
    let backend = CdpBackend::launch(&config, executable).expect("Failed to launch browser");
    let mut page = backend.open_page().expect("Failed to open page");

    page.navigate(&format!("{}/overlay", base_url), config.timeout_ms).unwrap();
    let probes = page.probe_canvases().unwrap();
    assert_eq!(probes.len(), 3);
    assert!(!probes[0].webgl);
    assert!(probes.iter().filter(|p| p.webgl).count() <= 1);
    assert!(!probes[2].webgl);

    // Neither the hidden canvas nor the one after the chosen canvas was
    // pinned to WebGL by the probe.
    let free: bool = page
        .eval_json(
            "JSON.stringify(document.getElementById('hidden').getContext('2d') !== null && \
             document.getElementById('second').getContext('2d') !== null)",
        )
        .unwrap();
    assert!(free);

    page.close().unwrap();
}
