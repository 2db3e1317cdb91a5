// Logging tests
//
// The global subscriber can only be installed once per process, so these
// tests use scoped subscribers to check what the engine emits.

use image::{DynamicImage, RgbImage};
use photomark::config::{LogConfig, LogFormat};
use photomark::watermark::{ImageWatermarkStyle, PositionSpec, WatermarkEngine, WatermarkSpec};
use std::io::Write;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

/// Collects formatted log output in memory.
#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for Capture {
    type Writer = Capture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[test]
fn test_log_config_defaults_to_json_info() {
    let config = LogConfig::default();
    assert_eq!(config.level, "info");
    assert_eq!(config.format, LogFormat::Json);
}

#[test]
fn test_missing_asset_is_logged_as_warning() {
    let capture = Capture::default();
    let subscriber = tracing_subscriber::fmt()
        .json()
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(capture.clone())
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        let engine = WatermarkEngine::default();
        let base = DynamicImage::ImageRgb8(RgbImage::new(32, 32));
        let spec = WatermarkSpec::Image(ImageWatermarkStyle::new("/missing/logo.png"));
        engine.render(&base, &spec, &PositionSpec::default());
    });

    let output = capture.contents();
    let warning = output
        .lines()
        .filter_map(|line| serde_json::from_str::<serde_json::Value>(line).ok())
        .find(|event| event["level"] == "WARN")
        .expect("a warning event");
    assert_eq!(warning["fields"]["path"], "/missing/logo.png");
    assert!(warning["fields"]["error"]
        .as_str()
        .unwrap()
        .contains("not found"));
}
