//! Vendor layout and command-line constants.
//!
//! Centralized location for everything that must match the VMware Fusion
//! installation byte-for-byte.

/// Application bundle layout.
pub mod bundle {
    /// Default install location of VMware Fusion on macOS.
    pub const DEFAULT_APP_PATH: &str = "/Applications/VMware Fusion.app";

    /// Directory (relative to the bundle root) holding the command-line tools.
    pub const LIBRARY_DIR: [&str; 2] = ["Contents", "Library"];

    /// VM runner binary name.
    pub const VMRUN: &str = "vmrun";

    /// Virtual disk manager binary name.
    pub const VDISK_MANAGER: &str = "vmware-vdiskmanager";
}

/// `vmrun` arguments.
pub mod vmrun {
    /// Host type selector, always passed first.
    pub const HOST_TYPE: [&str; 2] = ["-T", "fusion"];

    pub const LIST: &str = "list";
    pub const START: &str = "start";
    pub const STOP: &str = "stop";

    /// Start mode. A console window is always opened.
    pub const START_MODE: &str = "gui";

    /// Stop mode. Always a forced power-off.
    pub const STOP_MODE: &str = "hard";
}

/// `vmware-vdiskmanager` arguments.
pub mod vdisk {
    /// Adapter type for created disks.
    pub const ADAPTER: &str = "lsilogic";

    /// Vendor disk type 1 (single pre-allocated growable file).
    pub const DISK_TYPE: &str = "1";
}

/// Environment variables read by the driver.
pub mod env {
    /// Overrides the configured application bundle path.
    pub const APP_PATH: &str = "FUSION_APP_PATH";
}
