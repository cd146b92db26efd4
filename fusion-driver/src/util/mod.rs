mod path;
mod process;

pub use path::absolute_path;
pub use process::{CommandRunner, Invocation, ProcessOutput, SystemRunner};
