//! Chrome binary discovery.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Install locations probed after the overrides, Linux first.
const KNOWN_PATHS: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
];

/// Locate an executable Chrome or Chromium: `explicit` first, then
/// `CHROME_PATH`, then [`search_paths`].
pub fn find_chrome(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        if is_executable(path) {
            return Some(path.to_path_buf());
        }
        tracing::warn!(path = %path.display(), "configured Chrome path is not executable, searching");
    }

    if let Ok(env_path) = std::env::var("CHROME_PATH") {
        let path = PathBuf::from(&env_path);
        if is_executable(&path) {
            return Some(path);
        }
        tracing::debug!(path = %env_path, "CHROME_PATH set but not executable, falling through");
    }

    let found = search_paths().into_iter().find(|p| is_executable(p));
    if let Some(path) = &found {
        tracing::debug!(path = %path.display(), "chrome located");
    }
    found
}

/// Install locations in probe order.
pub fn search_paths() -> Vec<PathBuf> {
    KNOWN_PATHS.iter().map(PathBuf::from).collect()
}

fn is_executable(path: &Path) -> bool {
    path.is_file()
        && path
            .metadata()
            .map(|m| m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
}
