//! Default file locations.
//!
//! ## Resolution
//!
//! - **Working directory**: if `settings.json` exists in the current working
//!   directory (typical during development), it is used as-is.
//! - **Installed** (default): settings live in the platform config directory,
//!   e.g. `~/.config/padctl/settings.json` on Linux.

use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Application name used for the config directory
const APP_NAME: &str = "padctl";

const SETTINGS_FILE: &str = "settings.json";

/// Resolved application paths
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Settings document
    pub settings: PathBuf,
    /// Whether the settings file was found in the working directory
    pub is_local: bool,
}

impl AppPaths {
    /// Detect the settings location.
    ///
    /// Called before logging is initialized, so diagnostics go to stderr in
    /// debug builds.
    pub fn detect() -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::resolve(&cwd, dirs::config_dir())
    }

    fn resolve(cwd: &Path, config_dir: Option<PathBuf>) -> Self {
        let local = cwd.join(SETTINGS_FILE);
        if local.exists() {
            #[cfg(debug_assertions)]
            eprintln!("[paths] Using local settings: {}", local.display());
            return Self {
                settings: local,
                is_local: true,
            };
        }

        let base = config_dir
            .unwrap_or_else(|| {
                eprintln!("[paths] WARNING: no config directory, falling back to cwd");
                cwd.to_path_buf()
            })
            .join(APP_NAME);

        #[cfg(debug_assertions)]
        eprintln!("[paths] Using config directory: {}", base.display());

        Self {
            settings: base.join(SETTINGS_FILE),
            is_local: false,
        }
    }

    /// Use an explicit settings path instead of the detected one
    pub fn with_settings(path: impl Into<PathBuf>) -> Self {
        Self {
            settings: path.into(),
            is_local: true,
        }
    }

    /// Directory holding the settings file
    pub fn base_dir(&self) -> PathBuf {
        self.settings
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Create the settings directory if needed
    pub fn ensure_directories(&self) -> anyhow::Result<()> {
        let dir = self.base_dir();
        if !dir.exists() {
            debug!("Creating settings directory: {}", dir.display());
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        Ok(())
    }
}
