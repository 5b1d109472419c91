//! Configuration utilities

/// Load `.env` into the process environment, if present
///
/// A missing file is not an error; returns the path that was loaded.
pub fn load_env() -> Option<std::path::PathBuf> {
    dotenvy::dotenv().ok()
}
