//! Discrete inputs to the controller.
//!
//! Every state change is triggered by exactly one of these: a notification
//! from the media source, or a command from whoever hosts the player.

use serde::{Deserialize, Serialize};

/// Notifications coming from the media source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MediaEvent {
    /// Periodic position report, in seconds.
    TimeUpdate {
        current: f64,
        duration: Option<f64>,
    },
    /// The loaded track played to its end.
    Ended,
}

/// User-initiated transport commands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PlayerCommand {
    Select(usize),
    Remove(usize),
    TogglePlay,
    Next,
    Previous,
    ToggleShuffle,
    ToggleRepeat,
    Seek(f64),
    SeekFraction(f64),
}
