//! Control VMware Fusion virtual machines through the vendor's bundled
//! command-line tools.
//!
//! ```no_run
//! use std::path::Path;
//! use fusion_driver::{Driver, FusionDriver};
//!
//! let driver = FusionDriver::new("/Applications/VMware Fusion.app");
//! driver.verify()?;
//! if !driver.is_running(Path::new("/vms/build.vmx"))? {
//!     driver.start(Path::new("/vms/build.vmx"))?;
//! }
//! # Ok::<(), fusion_driver::FusionError>(())
//! ```

pub mod constants;
pub mod driver;
pub mod logging;
pub mod options;
pub mod util;

pub use driver::{Driver, FusionDriver, new_driver};
pub use fusion_driver_shared::errors::{FusionError, FusionResult};
pub use logging::{BufferedExecLog, ExecLog, TracingExecLog, init_logging};
pub use options::{DriverKind, DriverOptions};
