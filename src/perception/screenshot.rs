use std::io::Cursor;
use std::path::Path;

use async_trait::async_trait;
use base64::Engine as _;
use xcap::image::ImageFormat;
use xcap::Monitor;

use crate::errors::{ScreenPilotError, ScreenPilotResult};
use crate::types::{ImageInput, ScreenshotMeta};

/// Capture seam the agent grounds through, so the core can run against a
/// canned image with no display attached.
#[async_trait]
pub trait ScreenshotSource: Send + Sync {
    async fn capture(&self) -> ScreenPilotResult<ImageInput>;
}

/// Captures the live primary monitor.
pub struct XcapSource;

#[async_trait]
impl ScreenshotSource for XcapSource {
    async fn capture(&self) -> ScreenPilotResult<ImageInput> {
        capture_primary().await.map(|r| r.image)
    }
}

pub struct ScreenshotResult {
    pub image_bytes: Vec<u8>,
    pub image: ImageInput,
}

/// Captures the primary monitor as PNG. The xcap call is blocking, so it
/// runs on the blocking pool.
pub async fn capture_primary() -> ScreenPilotResult<ScreenshotResult> {
    tokio::task::spawn_blocking(capture_primary_blocking)
        .await
        .map_err(|e| ScreenPilotError::Perception(format!("capture task failed: {e}")))?
}

fn capture_primary_blocking() -> ScreenPilotResult<ScreenshotResult> {
    let monitors =
        Monitor::all().map_err(|e| ScreenPilotError::Perception(format!("monitor list: {e}")))?;
    let monitor = monitors
        .iter()
        .find(|m| m.is_primary())
        .or_else(|| monitors.first())
        .ok_or_else(|| ScreenPilotError::Perception("no monitor available".into()))?;

    let rgba = monitor
        .capture_image()
        .map_err(|e| ScreenPilotError::Perception(format!("capture: {e}")))?;
    let meta = ScreenshotMeta {
        width: rgba.width(),
        height: rgba.height(),
    };

    let mut png_bytes = Vec::new();
    rgba.write_to(&mut Cursor::new(&mut png_bytes), ImageFormat::Png)
        .map_err(|e| ScreenPilotError::Perception(format!("png encode: {e}")))?;

    let image_base64 = base64::engine::general_purpose::STANDARD.encode(&png_bytes);
    tracing::debug!(width = meta.width, height = meta.height, "screenshot captured");

    Ok(ScreenshotResult {
        image_bytes: png_bytes,
        image: ImageInput {
            base64: image_base64,
            media_type: "image/png".into(),
            meta,
        },
    })
}

/// Timestamped default file name for saved screenshots.
pub fn default_screenshot_path() -> std::path::PathBuf {
    std::path::PathBuf::from(format!("screenshot_{}.png", chrono::Utc::now().timestamp()))
}

/// Queries the primary display's dimensions, if one is reachable.
pub fn primary_screen_size() -> Option<ScreenshotMeta> {
    let monitors = Monitor::all().ok()?;
    let monitor = monitors.iter().find(|m| m.is_primary()).or_else(|| monitors.first())?;
    Some(ScreenshotMeta {
        width: monitor.width(),
        height: monitor.height(),
    })
}

/// Loads a screenshot from disk for offline analysis.
pub fn load_image_file(path: &Path) -> ScreenPilotResult<ImageInput> {
    let bytes = std::fs::read(path)?;
    let decoded = image::load_from_memory(&bytes)
        .map_err(|e| ScreenPilotError::Perception(format!("decode {}: {e}", path.display())))?;
    let meta = ScreenshotMeta {
        width: decoded.width(),
        height: decoded.height(),
    };
    Ok(ImageInput {
        base64: base64::engine::general_purpose::STANDARD.encode(&bytes),
        media_type: media_type_for(path),
        meta,
    })
}

fn media_type_for(path: &Path) -> String {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/png",
    }
    .to_string()
}
