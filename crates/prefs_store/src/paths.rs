use std::path::{Path, PathBuf};

pub const PREFS_DIR: &str = ".fragments";
pub const PREFS_FILE: &str = "prefs.json";

#[must_use]
pub fn prefs_path(cwd: &Path) -> PathBuf {
    cwd.join(PREFS_DIR).join(PREFS_FILE)
}

pub(crate) fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
