/// Default base URL of a locally running fragments server.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Route that provisions a sandbox for a finished fragment.
pub const SANDBOX_PATH: &str = "/api/sandbox";

/// Join a base URL and an absolute route path.
///
/// A blank base falls back to [`DEFAULT_BASE_URL`]. Trailing slashes on the
/// base and a missing leading slash on the path are both tolerated.
pub fn endpoint_url(base_url: &str, path: &str) -> String {
    let base = if base_url.trim().is_empty() {
        DEFAULT_BASE_URL
    } else {
        base_url.trim()
    };

    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}
