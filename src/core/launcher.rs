//! Seam for starting the owning process from a registering process.
//!
//! Dispatch messages only reach a running owner, so `initialize` asks the
//! launcher to start it when it is down. A failed launch is not an error for
//! the caller.

use super::error::LaunchError;

/// Checks for and starts the process that owns the scheduler.
pub trait OwnerLauncher: Send + Sync {
    /// Whether the owning process is up (foreground, background or service).
    fn is_running(&self) -> bool;

    /// Ask the platform to start the owning process.
    ///
    /// # Errors
    /// The process could not be started.
    fn launch(&self) -> Result<(), LaunchError>;
}

impl<T: OwnerLauncher + ?Sized> OwnerLauncher for std::sync::Arc<T> {
    fn is_running(&self) -> bool {
        (**self).is_running()
    }

    fn launch(&self) -> Result<(), LaunchError> {
        (**self).launch()
    }
}
