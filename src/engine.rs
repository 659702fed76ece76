//! Engine discovery and invocation
//!
//! The engine is an opaque PhantomJS-compatible executable. It is started
//! with two SSL flags and the path of a generated script, and the call blocks
//! until it exits. Its exit status and output are logged but never decide
//! success; the caller inspects the produced file instead.

use crate::Result;
use log::{debug, warn};
use std::ffi::{OsStr, OsString};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Environment variable consulted before searching `PATH`
pub const ENGINE_ENV: &str = "RFSHOT_ENGINE";

/// Executable name searched for on `PATH`
pub const ENGINE_NAME: &str = "phantomjs";

/// Location used when nothing else is configured
pub const BUNDLED_ENGINE: &str = "bin/phantomjs";

/// Flags passed ahead of the script path
pub const ENGINE_FLAGS: [&str; 2] = ["--ssl-protocol=any", "--ignore-ssl-errors=true"];

/// Resolve the engine executable when none was set explicitly.
///
/// Order: `RFSHOT_ENGINE`, then `phantomjs` on `PATH`, then the bundled
/// `bin/phantomjs`. The result is not required to exist; `save` checks that.
pub fn default_engine_path() -> PathBuf {
    if let Some(path) = std::env::var_os(ENGINE_ENV).filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    std::env::var_os("PATH")
        .and_then(|paths| find_in_path(ENGINE_NAME, &paths))
        .unwrap_or_else(|| PathBuf::from(BUNDLED_ENGINE))
}

/// Search a `PATH`-style list for an executable file called `name`.
pub fn find_in_path(name: &str, paths: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(paths)
        .flat_map(|dir| candidates(&dir, name))
        .find(|candidate| candidate.is_file())
}

#[cfg(windows)]
fn candidates(dir: &Path, name: &str) -> Vec<PathBuf> {
    vec![dir.join(format!("{}.exe", name)), dir.join(name)]
}

#[cfg(not(windows))]
fn candidates(dir: &Path, name: &str) -> Vec<PathBuf> {
    vec![dir.join(name)]
}

/// Argument vector for a run of `script`, flags first.
pub fn engine_args(script: &Path) -> Vec<OsString> {
    ENGINE_FLAGS
        .into_iter()
        .map(OsString::from)
        .chain(std::iter::once(script.as_os_str().to_os_string()))
        .collect()
}

/// Write `script` to a uniquely named temp file and run the engine on it.
///
/// The temp file is removed when this returns, on every path.
pub fn run(engine: &Path, script: &str) -> Result<()> {
    let mut file = tempfile::Builder::new()
        .prefix("rfshot-")
        .suffix(".js")
        .tempfile()?;
    file.write_all(script.as_bytes())?;
    file.flush()?;

    let args = engine_args(file.path());
    debug!("Running {} {:?}", engine.display(), args);

    let output = Command::new(engine)
        .args(&args)
        .stdin(Stdio::null())
        .output()?;

    if !output.status.success() {
        warn!("Engine {} exited with {}", engine.display(), output.status);
    }
    if !output.stdout.is_empty() {
        debug!("Engine stdout: {}", String::from_utf8_lossy(&output.stdout).trim_end());
    }
    if !output.stderr.is_empty() {
        debug!("Engine stderr: {}", String::from_utf8_lossy(&output.stderr).trim_end());
    }

    // `file` drops here and removes the script
    Ok(())
}
