use thiserror::Error;

///
/// All errors emitted from the channel module.
/// These are transport-level failures only; a device-reported fault is a
/// normal `ChannelResult`, not an error.
///
/// - `PortUnavailable`: When the serial port cannot be opened
///     Parameters:
///     - `port`: The port identifier that was attempted
///     - `reason`: What the serial layer reported
/// - `Io`: When a read or write on an open transport fails.
///
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("Could not open serial port {}. {}", .port, .reason)]
    PortUnavailable { port: String, reason: String },

    #[error("The transport failed mid-command. {}", .0)]
    Io(#[from] std::io::Error),
}
