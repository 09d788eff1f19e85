//! Owner launcher that spawns a command.

use std::process::{Child, Command};

use parking_lot::Mutex;

use crate::core::{LaunchError, OwnerLauncher};

/// Starts the owning process by running `program` with `args`.
///
/// Only a child spawned by this launcher counts as running.
#[derive(Debug)]
pub struct CommandLauncher {
    program: String,
    args: Vec<String>,
    child: Mutex<Option<Child>>,
}

impl CommandLauncher {
    /// Launcher for `program` with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            child: Mutex::new(None),
        }
    }

    /// Launcher for a command line given as program followed by arguments.
    ///
    /// # Errors
    /// `argv` is empty.
    pub fn from_argv(argv: &[String]) -> Result<Self, LaunchError> {
        let (program, args) = argv.split_first().ok_or(LaunchError::NotConfigured)?;
        Ok(Self::new(program.as_str()).args(args.iter().cloned()))
    }

    /// Append arguments.
    #[must_use]
    pub fn args(mut self, args: impl IntoIterator<Item = String>) -> Self {
        self.args.extend(args);
        self
    }
}

impl OwnerLauncher for CommandLauncher {
    fn is_running(&self) -> bool {
        let mut child = self.child.lock();
        let running = child
            .as_mut()
            .is_some_and(|c| matches!(c.try_wait(), Ok(None)));
        if !running {
            *child = None;
        }
        running
    }

    fn launch(&self) -> Result<(), LaunchError> {
        let spawned = Command::new(&self.program)
            .args(&self.args)
            .spawn()
            .map_err(|e| LaunchError::Spawn(format!("{}: {e}", self.program)))?;
        tracing::info!(program = %self.program, pid = spawned.id(), "spawned owner process");
        *self.child.lock() = Some(spawned);
        Ok(())
    }
}
