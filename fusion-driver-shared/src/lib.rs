//! Types shared between the fusion-driver library and its CLI.

pub mod errors;

pub use errors::{FusionError, FusionResult};
