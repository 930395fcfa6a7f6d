mod artifacts;
mod config;

pub use artifacts::{ArtifactStore, Stamp};
pub use config::{BuildConfig, CatalogConfig, Config, EmitConfig, TransportKind};

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Returns the transitnow data directory.
///
/// `TRANSITNOW_HOME` overrides the location outright. Otherwise this is
/// `~/.config/transitnow[-dev]/`, with TRANSITNOW_ENV=dev selecting the
/// development directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("TRANSITNOW_HOME") {
        Some(home) => PathBuf::from(home),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env =
                std::env::var("TRANSITNOW_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("transitnow-dev")
            } else {
                base_dir.join("transitnow")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}

/// Replace `path` with `contents` so readers see either the old or the new
/// file, never a partial one. The temp file lives in the same directory so
/// the final rename stays on one filesystem.
pub fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_path = path.with_file_name(format!(
        ".{file_name}.{}.tmp",
        uuid::Uuid::new_v4().as_simple()
    ));

    let result = (|| {
        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(contents)?;
        file.sync_data()?;
        std::fs::rename(&tmp_path, path)
    })();

    if result.is_err() {
        let _ = std::fs::remove_file(&tmp_path);
    }
    result
}
