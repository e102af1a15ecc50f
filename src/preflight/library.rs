//! Library path preflight check.

use super::CheckResult;
use crate::models::config::MediaLibraryConfig;

/// Check that the configured library roots are reachable.
///
/// Individual missing roots are skipped during scans, so this only fails
/// when none of the configured roots exist.
pub fn check(config: &MediaLibraryConfig) -> CheckResult {
    let total = config.library_paths.len();
    if total == 0 {
        return CheckResult::ok("Library paths", "none configured");
    }

    let available = config.library_paths.iter().filter(|p| p.is_dir()).count();
    if available == 0 {
        CheckResult::fail(
            "Library paths",
            "no configured path exists",
            "Add a path with `media-library config add-path <PATH>`",
        )
    } else {
        CheckResult::ok(
            "Library paths",
            &format!("{} of {} available", available, total),
        )
    }
}
