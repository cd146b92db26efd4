//! Driver configuration.

use std::path::{Path, PathBuf};

use fusion_driver_shared::errors::{FusionError, FusionResult};
use serde::{Deserialize, Serialize};

use crate::constants::{bundle, env};

/// Available driver backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    /// VMware Fusion, driven through `vmrun` and `vmware-vdiskmanager`.
    #[default]
    Fusion,
}

/// Options used to construct a driver.
///
/// Loaded from JSON, e.g. `{"kind": "fusion", "app_path": "/Applications/VMware Fusion.app"}`.
/// Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverOptions {
    pub kind: DriverKind,
    /// Root of the application bundle, e.g. `/Applications/VMware Fusion.app`.
    pub app_path: PathBuf,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            kind: DriverKind::default(),
            app_path: PathBuf::from(bundle::DEFAULT_APP_PATH),
        }
    }
}

impl DriverOptions {
    pub fn new(app_path: impl Into<PathBuf>) -> Self {
        Self {
            app_path: app_path.into(),
            ..Self::default()
        }
    }

    /// Read options from a JSON file.
    pub fn from_file(path: &Path) -> FusionResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| {
            FusionError::Config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Apply `FUSION_APP_PATH` if it is set and non-empty.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(app_path) = std::env::var_os(env::APP_PATH)
            && !app_path.is_empty()
        {
            tracing::debug!(app_path = ?app_path, "Using app path from environment");
            self.app_path = PathBuf::from(app_path);
        }
        self
    }

    pub fn validate(&self) -> FusionResult<()> {
        if self.app_path.as_os_str().is_empty() {
            return Err(FusionError::Config("app_path must not be empty".into()));
        }
        Ok(())
    }
}
