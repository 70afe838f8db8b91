//! OS process spawning and tracking

pub mod command;
pub mod handle;
pub mod monitor;

pub use command::{Cmd, ExitCodeCheck, ProcessResult, Redirect};
pub use handle::ProcessHandle;
pub use monitor::{MonitorError, MonitorSnapshot, ProcessMonitor};

use std::io;

/// A process the monitor can observe and terminate
pub trait TrackedProcess: Send + Sync + 'static {
    /// OS process id
    fn id(&self) -> u32;

    /// Whether the process has already exited
    fn has_exited(&self) -> bool;

    /// Request termination of the process
    fn kill(&self) -> io::Result<()>;
}
