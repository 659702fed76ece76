//! RFox Screenshot
//!
//! Takes screenshots of web pages by driving an external headless browser
//! engine (PhantomJS-compatible) as a subprocess, then optionally crops and
//! re-encodes the produced image.
//!
//! # Pipeline
//!
//! - **Configure**: a [`ScreenshotRequest`] validates every value as it is set
//! - **Script**: a small automation script is generated for the engine
//! - **Run**: the engine is invoked synchronously with the script
//! - **Post-process**: for a fixed height the output is cropped to exactly
//!   `width x height` and re-encoded at the configured quality
//!
//! # Example
//!
//! ```no_run
//! use rfshot::ScreenshotRequest;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut request = ScreenshotRequest::new();
//! request
//!     .set_url("https://example.com")?
//!     .set_width(1280)?
//!     .set_height(720)?
//!     .set_quality(80)?;
//!
//! request.save("example.jpg")?;
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod engine;
pub mod error;
pub mod postprocess;
pub mod request;
pub mod script;

pub use error::{Error, Result};
pub use postprocess::{CropRegion, ImagePostProcessor, PostProcessor};
pub use request::{NumericArg, ScreenshotRequest};

/// Default viewport width in pixels
pub const DEFAULT_WIDTH: u32 = 640;
/// Default viewport height in pixels
pub const DEFAULT_HEIGHT: u32 = 480;
/// Default re-encode quality
pub const DEFAULT_QUALITY: u8 = 60;
/// Default resource timeout and render delay in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Configuration snapshot for a single capture
///
/// This is the immutable view a [`ScreenshotRequest`] hands to the pipeline
/// when `save` is called. Building one by hand skips validation, so
/// [`ScreenshotRequest::from_config`] re-checks every field.
///
/// # Examples
///
/// ```
/// let cfg = rfshot::CaptureConfig::default();
/// assert_eq!(cfg.viewport.width, 640);
/// assert_eq!(cfg.quality, 60);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Path to the engine executable
    pub engine_path: PathBuf,
    /// Page to capture
    pub url: Option<String>,
    /// Viewport dimensions; a height of 0 renders the whole page
    pub viewport: Viewport,
    /// Re-encode quality, 1 to 100
    pub quality: u8,
    /// CSS background for the page body, if any
    pub background_color: Option<String>,
    /// Resource timeout handed to the engine, also the delay before rendering
    pub timeout_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            engine_path: engine::default_engine_path(),
            url: None,
            viewport: Viewport::default(),
            quality: DEFAULT_QUALITY,
            background_color: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// Viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Whether the whole page is rendered (no height constraint, no crop)
    pub fn is_full_page(&self) -> bool {
        self.height == 0
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }
}
