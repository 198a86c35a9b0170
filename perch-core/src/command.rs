//! Single-slot command mailbox
//!
//! The control side writes the latest desired action; the motion side
//! takes it when it is ready for the next operation. Writing again before
//! the motion side polls replaces the pending command. This models
//! "latest desired state", not a work queue.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::signal::Signal;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Commands accepted by the motion loop
///
/// An empty slot stands for "no command".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MotorCommand {
    /// Move to the safe deployed position
    Deploy,
    /// Move to the retracted end
    Retract,
    /// Rediscover the travel range between both switches
    Calibrate,
}

impl MotorCommand {
    /// Canonical lower-case name
    pub fn name(&self) -> &'static str {
        match self {
            MotorCommand::Deploy => "deploy",
            MotorCommand::Retract => "retract",
            MotorCommand::Calibrate => "calibrate",
        }
    }
}

/// Overwrite-latest mailbox between the control and motion loops
pub struct CommandChannel<M: RawMutex> {
    slot: Signal<M, MotorCommand>,
}

impl<M: RawMutex> CommandChannel<M> {
    /// Create an empty channel
    pub const fn new() -> Self {
        Self {
            slot: Signal::new(),
        }
    }

    /// Replace the pending command
    pub fn queue(&self, command: MotorCommand) {
        self.slot.signal(command);
    }

    /// Take the pending command, leaving the slot empty
    pub fn take(&self) -> Option<MotorCommand> {
        self.slot.try_take()
    }

    /// Wait until a command is pending and take it
    pub async fn wait(&self) -> MotorCommand {
        self.slot.wait().await
    }

    /// Discard any pending command
    pub fn clear(&self) {
        self.slot.reset();
    }

    /// Check whether a command is waiting
    pub fn is_pending(&self) -> bool {
        self.slot.signaled()
    }
}

impl<M: RawMutex> Default for CommandChannel<M> {
    fn default() -> Self {
        Self::new()
    }
}
