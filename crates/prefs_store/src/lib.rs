mod error;
mod paths;
mod store;

pub use error::PrefsStoreError;
pub use paths::{prefs_path, PREFS_DIR, PREFS_FILE};
pub use store::PrefsStore;
