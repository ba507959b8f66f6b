//! OS-specific application directories.

use std::path::PathBuf;
use crate::constants::APP_NAME;
use crate::error::{HlError, HlResult};

/// Where the application keeps its files on this OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform;

impl Platform {
    /// Get the platform-specific application data directory.
    ///
    /// - Windows: `%APPDATA%/HealthLog`
    /// - macOS: `~/Library/Application Support/HealthLog`
    /// - Linux: `~/.local/share/HealthLog`
    pub fn data_dir() -> HlResult<PathBuf> {
        let base = dirs::data_dir()
            .ok_or_else(|| HlError::Config("could not determine data directory".into()))?;
        Ok(base.join(APP_NAME))
    }

    /// Get the platform-specific configuration directory.
    pub fn config_dir() -> HlResult<PathBuf> {
        let base = dirs::config_dir()
            .ok_or_else(|| HlError::Config("could not determine config directory".into()))?;
        Ok(base.join(APP_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirs_are_app_scoped() {
        // Both lookups fail together on hosts without a home directory.
        if let (Ok(data), Ok(config)) = (Platform::data_dir(), Platform::config_dir()) {
            assert!(data.ends_with(APP_NAME));
            assert!(config.ends_with(APP_NAME));
        }
    }
}
