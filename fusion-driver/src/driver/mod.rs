//! Virtualization backends.
//!
//! ## Architecture
//!
//! - **Driver**: the five operations an orchestrator needs (create disk,
//!   running check, start, stop, installation check)
//! - **FusionDriver**: VMware Fusion backend, shells out to the vendor tools
//!
//! A new hypervisor is a new `Driver` implementation plus a `DriverKind`
//! variant; nothing else changes for callers.

mod fusion;

use std::path::Path;

use fusion_driver_shared::errors::FusionResult;

use crate::options::{DriverKind, DriverOptions};

pub use fusion::FusionDriver;

/// Controls virtual machines through a vendor toolchain.
///
/// Every call is synchronous and independent: the driver keeps no handle to
/// any VM between calls, and does not serialize concurrent callers.
pub trait Driver: Send + Sync {
    /// Create a virtual disk at `output` with vendor size syntax (e.g. `40000MB`).
    fn create_disk(&self, output: &Path, size: &str) -> FusionResult<()>;

    /// Check whether the VM described by the VMX file at `vmx_path` is running.
    fn is_running(&self, vmx_path: &Path) -> FusionResult<bool>;

    /// Start the VM with a console window.
    fn start(&self, vmx_path: &Path) -> FusionResult<()>;

    /// Force the VM off.
    fn stop(&self, vmx_path: &Path) -> FusionResult<()>;

    /// Check that everything the driver invokes is installed.
    ///
    /// Returns the first missing prerequisite as an error.
    fn verify(&self) -> FusionResult<()>;
}

/// Build the driver selected by `options.kind`.
pub fn new_driver(options: &DriverOptions) -> FusionResult<Box<dyn Driver>> {
    options.validate()?;

    match options.kind {
        DriverKind::Fusion => {
            tracing::debug!(app_path = %options.app_path.display(), "Creating Fusion driver");
            Ok(Box::new(FusionDriver::new(&options.app_path)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fusion_driver_shared::errors::FusionError;

    #[test]
    fn test_new_driver_fusion() {
        let dir = tempfile::TempDir::new().unwrap();
        let driver = new_driver(&DriverOptions::new(dir.path().join("Missing.app"))).unwrap();

        assert!(matches!(
            driver.verify(),
            Err(FusionError::ApplicationNotFound(_))
        ));
    }

    #[test]
    fn test_new_driver_rejects_invalid_options() {
        assert!(matches!(
            new_driver(&DriverOptions::new("")),
            Err(FusionError::Config(_))
        ));
    }
}
