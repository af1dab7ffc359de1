use thiserror::Error;

use crate::channel::error::ChannelError;
use crate::drawing::error::DrawingError;

///
/// All errors emitted from the driver module.
/// Any of these aborts the run; partial plots are never resumed.
///
/// - `DeviceFault`: When the device reported an error or alarm mid-drawing
///     Parameters:
///     - `command`: The G-code line that provoked the fault
///     - `message`: The fault line as reported by the device
/// - `AckTimeout`: When a command was never acknowledged within the window
///     Parameters:
///     - `command`: The G-code line left unacknowledged
/// - `Channel`: When the transport itself failed.
/// - `Source`: When the drawing stream broke (bad records are skipped, not raised).
/// - `Cancelled`: When the cancel flag was raised between commands.
///
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("The device faulted on \"{}\": {}", .command, .message)]
    DeviceFault { command: String, message: String },

    #[error("No acknowledgment for \"{}\" within the configured window.", .command)]
    AckTimeout { command: String },

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Source(#[from] DrawingError),

    #[error("The plot was cancelled.")]
    Cancelled,
}
