//! End-to-end tests of `save` against stub engines.
//!
//! Each stub is a shell script standing in for PhantomJS: it receives the
//! same argv, reads the render target out of the generated script and
//! writes whatever file the test wants there.
//!
//! Writing a stub and spawning an engine share one lock: a child forked
//! while another stub is still open for writing would keep that file busy
//! and its exec would fail with ETXTBSY.
#![cfg(unix)]

use image::{DynamicImage, GenericImageView, ImageFormat, Rgb, RgbImage};
use rfshot::{CropRegion, Error, PostProcessor, ScreenshotRequest};
use std::cell::RefCell;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tempfile::TempDir;

static SPAWN_LOCK: Mutex<()> = Mutex::new(());

fn spawn_lock() -> MutexGuard<'static, ()> {
    SPAWN_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn save(request: &ScreenshotRequest, target: impl AsRef<Path>) -> rfshot::Result<()> {
    let _guard = spawn_lock();
    request.save(target)
}

fn save_with(
    request: &ScreenshotRequest,
    target: impl AsRef<Path>,
    processor: &dyn PostProcessor,
) -> rfshot::Result<()> {
    let _guard = spawn_lock();
    request.save_with(target, processor)
}

// Prints the path inside `page.render("...")` of the script in $3.
const FIND_TARGET: &str = r#"target=$(sed -n 's/.*page\.render("\(.*\)");.*/\1/p' "$3")"#;

struct Stub {
    dir: TempDir,
    engine: PathBuf,
}

impl Stub {
    /// A stub engine whose body runs after `$target` is resolved.
    fn new(body: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let engine = dir.path().join("phantomjs");
        let script = format!(
            "#!/bin/sh\necho \"$@\" > \"{args}\"\n{find}\n{body}\n",
            args = dir.path().join("args.log").display(),
            find = FIND_TARGET,
            body = body
        );
        let _guard = spawn_lock();
        fs::write(&engine, script).unwrap();
        fs::set_permissions(&engine, fs::Permissions::from_mode(0o755)).unwrap();
        Stub { dir, engine }
    }

    /// A stub that copies `fixture` to the render target.
    fn copying(fixture: &Path) -> Self {
        Self::new(&format!("cp \"{}\" \"$target\"", fixture.display()))
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn was_spawned(&self) -> bool {
        self.path("args.log").exists()
    }

    fn args(&self) -> String {
        fs::read_to_string(self.path("args.log")).unwrap()
    }

    fn request(&self, width: u32, height: u32) -> ScreenshotRequest {
        let mut request = ScreenshotRequest::new();
        request
            .set_engine_path(&self.engine)
            .set_url("https://example.com/")
            .unwrap()
            .set_width(width)
            .unwrap()
            .set_height(height)
            .unwrap()
            .set_timeout(100)
            .unwrap();
        request
    }
}

// Noise defeats compression so the fixture is comfortably above 1024 bytes.
fn noisy_image(width: u32, height: u32) -> DynamicImage {
    let mut seed: u32 = 0x2545_f491;
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |_, _| {
        seed ^= seed << 13;
        seed ^= seed >> 17;
        seed ^= seed << 5;
        let [r, g, b, _] = seed.to_le_bytes();
        Rgb([r, g, b])
    }))
}

fn write_fixture(dir: &Path, name: &str, format: ImageFormat) -> PathBuf {
    let path = dir.join(name);
    noisy_image(400, 300).save_with_format(&path, format).unwrap();
    assert!(fs::metadata(&path).unwrap().len() >= 2000);
    path
}

#[derive(Default)]
struct RecordingProcessor {
    calls: RefCell<Vec<(PathBuf, CropRegion, u8)>>,
}

impl PostProcessor for RecordingProcessor {
    fn crop_and_save(&self, path: &Path, region: CropRegion, quality: u8) -> rfshot::Result<()> {
        self.calls.borrow_mut().push((path.to_path_buf(), region, quality));
        Ok(())
    }
}

#[test]
fn fixed_height_capture_is_cropped_to_viewport() {
    let fixtures = tempfile::tempdir().unwrap();
    let fixture = write_fixture(fixtures.path(), "page.png", ImageFormat::Png);
    let stub = Stub::copying(&fixture);
    let target = stub.path("shot.png");

    save(&stub.request(320, 240), &target).unwrap();

    let out = image::open(&target).unwrap();
    assert_eq!(out.dimensions(), (320, 240));
    let original = image::open(&fixture).unwrap();
    assert_eq!(out.get_pixel(0, 0), original.get_pixel(0, 0));
    assert_eq!(out.get_pixel(319, 239), original.get_pixel(319, 239));
}

#[test]
fn jpeg_capture_is_reencoded_at_quality() {
    let fixtures = tempfile::tempdir().unwrap();
    let fixture = write_fixture(fixtures.path(), "page.jpg", ImageFormat::Jpeg);
    let stub = Stub::copying(&fixture);
    let target = stub.path("shot.JPG");

    let mut request = stub.request(320, 240);
    request.set_quality(30).unwrap();
    let recorder = RecordingProcessor::default();
    save_with(&request, &target, &recorder).unwrap();
    assert_eq!(
        recorder.calls.borrow().as_slice(),
        &[(target.clone(), CropRegion::top_left(320, 240), 30)]
    );

    save(&request, &target).unwrap();
    let out = image::open(&target).unwrap();
    assert_eq!(out.dimensions(), (320, 240));
}

#[test]
fn engine_receives_ssl_flags_and_script() {
    let fixtures = tempfile::tempdir().unwrap();
    let fixture = write_fixture(fixtures.path(), "page.png", ImageFormat::Png);
    let stub = Stub::copying(&fixture);

    save(&stub.request(320, 240), stub.path("shot.png")).unwrap();

    let args = stub.args();
    let parts: Vec<&str> = args.split_whitespace().collect();
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[0], "--ssl-protocol=any");
    assert_eq!(parts[1], "--ignore-ssl-errors=true");
    assert!(parts[2].ends_with(".js"));
    // the temp script is gone once save returns
    assert!(!Path::new(parts[2]).exists());
}

#[test]
fn missing_output_is_capture_failure() {
    let stub = Stub::new(":");
    let err = save(&stub.request(320, 240), stub.path("shot.png")).unwrap_err();
    assert!(matches!(err, Error::CaptureFailed(_)), "{:?}", err);
    assert!(stub.was_spawned());
}

#[test]
fn stale_output_from_an_earlier_run_is_not_accepted() {
    let stub = Stub::new(":");
    let target = stub.path("shot.png");
    write_fixture(stub.dir.path(), "shot.png", ImageFormat::Png);

    let err = save(&stub.request(320, 240), &target).unwrap_err();
    assert!(matches!(err, Error::CaptureFailed(_)), "{:?}", err);
    assert!(stub.was_spawned());
    assert!(!target.exists());
}

#[test]
fn tiny_output_is_capture_failure() {
    let stub = Stub::new("head -c 500 /dev/zero > \"$target\"");
    let target = stub.path("shot.png");
    let err = save(&stub.request(320, 240), &target).unwrap_err();
    assert!(matches!(err, Error::CaptureFailed(_)), "{:?}", err);
    assert_eq!(fs::metadata(&target).unwrap().len(), 500);
}

#[test]
fn full_page_never_post_processes() {
    let stub = Stub::new("head -c 4096 /dev/zero > \"$target\"");
    let target = stub.path("shot.png");

    let mut request = stub.request(320, 240);
    request.set_height_to_render_whole_page();
    let recorder = RecordingProcessor::default();
    save_with(&request, &target, &recorder).unwrap();

    assert!(recorder.calls.borrow().is_empty());
    // untouched engine output, not an image at all
    assert_eq!(fs::read(&target).unwrap(), vec![0u8; 4096]);
}

#[test]
fn unsupported_extension_fails_before_spawning() {
    let stub = Stub::new("touch \"$target\"");
    let err = save(&stub.request(320, 240), stub.path("shot.gif")).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    assert!(!stub.was_spawned());
}

#[test]
fn post_process_failure_is_reported() {
    let stub = Stub::new("head -c 4096 /dev/zero > \"$target\"");
    let err = save(&stub.request(320, 240), stub.path("shot.png")).unwrap_err();
    assert!(matches!(err, Error::PostProcessFailed(_)), "{:?}", err);
}

#[test]
fn background_color_reaches_the_engine_script() {
    let stub = Stub::new("cp \"$3\" \"$(dirname \"$target\")/script.js\"");
    let mut request = stub.request(320, 240);
    request.set_background_color("#123456").unwrap();

    let err = save(&request, stub.path("shot.png")).unwrap_err();
    assert!(matches!(err, Error::CaptureFailed(_)));

    let script = fs::read_to_string(stub.path("script.js")).unwrap();
    assert!(script.contains("body { background: #123456 }"));
    assert!(script.contains("page.viewportSize = { width: 320, height: 240 };"));
}
