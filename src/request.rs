//! Screenshot request: validated configuration and the capture pipeline
//!
//! A [`ScreenshotRequest`] starts from defaults and is adjusted through
//! fluent setters. Each setter validates its input and leaves the request
//! untouched when it fails. [`ScreenshotRequest::save`] takes a snapshot of
//! the configuration and runs the whole pipeline synchronously:
//!
//! 1. check the target path, URL and engine binary
//! 2. generate the engine script and run the engine on it
//! 3. require an output file of at least [`MIN_OUTPUT_BYTES`]
//! 4. crop to `width x height` and re-encode, unless rendering the whole page

use crate::engine;
use crate::postprocess::{CropRegion, ImagePostProcessor, PostProcessor};
use crate::script;
use crate::{CaptureConfig, Error, Result};
use log::{debug, info};
use std::path::{Path, PathBuf};
use url::Url;

/// Smallest output file accepted as a real capture
pub const MIN_OUTPUT_BYTES: u64 = 1024;

/// Target extensions the engine can render to (compared case-insensitively)
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// A value that numeric setters accept
///
/// Integers pass through; strings are parsed after trimming, so
/// `set_width("800")` works and `set_width("abc")` is rejected.
pub trait NumericArg {
    /// The value as an integer, or `None` if it is not numeric
    fn to_number(&self) -> Option<i64>;
}

macro_rules! numeric_arg_for_ints {
    ($($t:ty),*) => {
        $(
            impl NumericArg for $t {
                fn to_number(&self) -> Option<i64> {
                    i64::try_from(*self).ok()
                }
            }
        )*
    };
}

numeric_arg_for_ints!(i8, i16, i32, i64, u8, u16, u32, u64, isize, usize);

impl NumericArg for &str {
    fn to_number(&self) -> Option<i64> {
        self.trim().parse().ok()
    }
}

impl NumericArg for String {
    fn to_number(&self) -> Option<i64> {
        self.as_str().to_number()
    }
}

/// A configurable, reusable web page screenshot
///
/// Setters return `Result<&mut Self>` so calls chain with `?`:
///
/// ```
/// use rfshot::ScreenshotRequest;
///
/// # fn main() -> rfshot::Result<()> {
/// let mut request = ScreenshotRequest::new();
/// request.set_url("https://example.com")?.set_width(800)?.set_quality(90)?;
/// assert_eq!(request.config().viewport.width, 800);
///
/// assert!(request.set_quality(101).is_err());
/// assert_eq!(request.config().quality, 90);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScreenshotRequest {
    config: CaptureConfig,
}

impl ScreenshotRequest {
    /// A request with default settings and no URL
    pub fn new() -> Self {
        Self::default()
    }

    /// A request with every setting given up front.
    ///
    /// An empty `engine_path` keeps the discovered default.
    pub fn with_options(
        engine_path: impl Into<PathBuf>,
        width: u32,
        height: u32,
        quality: u8,
        timeout_ms: u64,
        background_color: Option<&str>,
    ) -> Result<Self> {
        let mut request = Self::new();
        let engine_path = engine_path.into();
        if !engine_path.as_os_str().is_empty() {
            request.set_engine_path(engine_path);
        }
        request
            .set_width(width)?
            .set_height(height)?
            .set_quality(quality)?
            .set_timeout(timeout_ms)?;
        if let Some(color) = background_color {
            request.set_background_color(color)?;
        }
        Ok(request)
    }

    /// Build a request from a config that was not produced by the setters
    /// (for example one read from a file). Every field is validated.
    pub fn from_config(config: CaptureConfig) -> Result<Self> {
        let mut request = Self::new();
        request
            .set_engine_path(config.engine_path)
            .set_width(config.viewport.width)?
            .set_height(config.viewport.height)?
            .set_quality(config.quality)?
            .set_timeout(config.timeout_ms)?;
        if let Some(url) = config.url {
            request.set_url(url)?;
        }
        if let Some(color) = config.background_color {
            request.set_background_color(color)?;
        }
        Ok(request)
    }

    /// Current configuration snapshot
    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn set_engine_path(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.config.engine_path = path.into();
        self
    }

    /// Set the page to capture. The URL must be absolute and carry a host
    /// (`file:` URLs excepted).
    pub fn set_url(&mut self, url: impl Into<String>) -> Result<&mut Self> {
        let url = url.into();
        if url.is_empty() {
            return Err(Error::InvalidArgument("No url specified".into()));
        }
        parse_url(&url)?;
        self.config.url = Some(url);
        Ok(self)
    }

    pub fn set_width<N: NumericArg>(&mut self, width: N) -> Result<&mut Self> {
        let width = positive("Width", &width, u32::MAX as i64)?;
        self.config.viewport.width = width as u32;
        Ok(self)
    }

    /// Set the viewport height; 0 renders the whole page and skips the crop.
    pub fn set_height<N: NumericArg>(&mut self, height: N) -> Result<&mut Self> {
        let height = non_negative("Height", &height, u32::MAX as i64)?;
        self.config.viewport.height = height as u32;
        Ok(self)
    }

    /// Same as `set_height(0)`.
    pub fn set_height_to_render_whole_page(&mut self) -> &mut Self {
        self.config.viewport.height = 0;
        self
    }

    pub fn set_quality<N: NumericArg>(&mut self, quality: N) -> Result<&mut Self> {
        match quality.to_number() {
            Some(q) if (1..=100).contains(&q) => {
                self.config.quality = q as u8;
                Ok(self)
            }
            _ => Err(Error::InvalidArgument(
                "Quality must be a numeric value between 1 - 100".into(),
            )),
        }
    }

    pub fn set_background_color(&mut self, color: impl Into<String>) -> Result<&mut Self> {
        let color = color.into();
        if color.is_empty() {
            return Err(Error::InvalidArgument("No background color specified".into()));
        }
        self.config.background_color = Some(color);
        Ok(self)
    }

    /// Set the resource timeout, which is also the delay before rendering.
    pub fn set_timeout<N: NumericArg>(&mut self, timeout_ms: N) -> Result<&mut Self> {
        let timeout = positive("Timeout", &timeout_ms, i64::MAX)?;
        self.config.timeout_ms = timeout as u64;
        Ok(self)
    }

    /// The script the engine would run to capture into `target`.
    pub fn render_script(&self, target: impl AsRef<Path>) -> Result<String> {
        let url = self.checked_url()?;
        Ok(script::render_script(&self.config, &url, target.as_ref()))
    }

    /// Capture the page into `target`, cropping with the `image` crate.
    pub fn save(&self, target: impl AsRef<Path>) -> Result<()> {
        self.save_with(target, &ImagePostProcessor)
    }

    /// Capture the page into `target` using `processor` for the crop step.
    pub fn save_with(&self, target: impl AsRef<Path>, processor: &dyn PostProcessor) -> Result<()> {
        let target = target.as_ref();
        check_target(target)?;
        let url = self.checked_url()?;

        let config = self.config.clone();
        if !config.engine_path.is_file() {
            return Err(Error::PreconditionFailed(format!(
                "Engine binary does not exist: {}",
                config.engine_path.display()
            )));
        }

        debug!("Capturing {} into {}", url, target.display());
        let script = script::render_script(&config, &url, target);
        remove_stale_output(target)?;
        engine::run(&config.engine_path, &script)?;

        let size = std::fs::metadata(target).map(|m| m.len()).unwrap_or(0);
        if size < MIN_OUTPUT_BYTES {
            return Err(Error::CaptureFailed(format!(
                "Could not create screenshot: {} is {} bytes",
                target.display(),
                size
            )));
        }

        let viewport = config.viewport;
        if !viewport.is_full_page() {
            processor.crop_and_save(
                target,
                CropRegion::top_left(viewport.width, viewport.height),
                config.quality,
            )?;
        }

        info!("Saved screenshot of {} to {}", url, target.display());
        Ok(())
    }

    fn checked_url(&self) -> Result<Url> {
        match self.config.url.as_deref() {
            None | Some("") => Err(Error::InvalidArgument("Url not set".into())),
            Some(url) => parse_url(url),
        }
    }
}

// A file left by an earlier run must not pass for this run's output.
fn remove_stale_output(target: &Path) -> Result<()> {
    match std::fs::remove_file(target) {
        Ok(()) => {
            debug!("Removed previous output {}", target.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::PreconditionFailed(format!(
            "Cannot replace existing output {}: {}",
            target.display(),
            e
        ))),
    }
}

fn check_target(target: &Path) -> Result<()> {
    if target.as_os_str().is_empty() {
        return Err(Error::InvalidArgument("Target file not set".into()));
    }
    let supported = target
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false);
    if !supported {
        return Err(Error::InvalidArgument(format!(
            "Target file extension not valid: {} (expected one of {:?})",
            target.display(),
            SUPPORTED_EXTENSIONS
        )));
    }
    Ok(())
}

fn parse_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url)
        .map_err(|e| Error::PreconditionFailed(format!("Url is invalid: {}: {}", url, e)))?;
    if !parsed.has_host() && parsed.scheme() != "file" {
        return Err(Error::PreconditionFailed(format!(
            "Url is invalid: {}: no host",
            url
        )));
    }
    Ok(parsed)
}

fn non_negative<N: NumericArg>(name: &str, value: &N, max: i64) -> Result<i64> {
    match value.to_number() {
        Some(n) if (0..=max).contains(&n) => Ok(n),
        Some(_) => Err(Error::InvalidArgument(format!("{} is out of range", name))),
        None => Err(Error::InvalidArgument(format!("{} must be numeric", name))),
    }
}

fn positive<N: NumericArg>(name: &str, value: &N, max: i64) -> Result<i64> {
    match non_negative(name, value, max)? {
        0 => Err(Error::InvalidArgument(format!("{} must be greater than zero", name))),
        n => Ok(n),
    }
}
