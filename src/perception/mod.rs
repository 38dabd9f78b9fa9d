pub mod screenshot;

pub use screenshot::{
    capture_primary, default_screenshot_path, load_image_file, primary_screen_size,
    ScreenshotResult, ScreenshotSource, XcapSource,
};
