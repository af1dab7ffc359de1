//!
//! Drawing-by-drawing plot orchestration
//!

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

use crate::channel::{ChannelResult, CommandChannel};
use crate::drawing::{Drawing, DrawingSource};
use crate::hardware::PlotterGeometry;
use crate::motion::synthesize;
use crate::scaler::UniformSource;
use error::DriverError;

pub mod error;

///
/// Pulls drawings from a source and replays them on the plotter, one
/// acknowledged command at a time.
///
/// The driver is strictly sequential: a drawing's commands go out in emission
/// order, and the first device fault or acknowledgment timeout aborts the
/// whole run. A shared cancel flag is checked between commands, so a plot can
/// be stopped cooperatively between, but never mid-, acknowledgment wait.
///
/// # Fields:
/// - `channel`: The exclusively-owned command channel to the device
/// - `geometry`: The plotter configuration
/// - `cancel`: The flag another thread may raise to stop the run
///
pub struct PlotDriver {
    channel: CommandChannel,
    geometry: PlotterGeometry,
    cancel: Arc<AtomicBool>,
}

impl PlotDriver {
    ///
    /// Creates a new `PlotDriver` taking ownership of the channel.
    ///
    /// # Parameters:
    /// - `channel`: The command channel to drive
    /// - `geometry`: The plotter configuration
    ///
    /// # Returns:
    /// - A new `PlotDriver` instance
    ///
    pub fn new(channel: CommandChannel, geometry: PlotterGeometry) -> PlotDriver {
        PlotDriver { channel, geometry, cancel: Arc::new(AtomicBool::new(false)) }
    }

    ///
    /// # Returns:
    /// - A handle to the cancel flag; raise it to stop the run between commands
    ///
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    ///
    /// # Returns:
    /// - The driver's channel, handed back for teardown once plotting is done
    ///
    pub fn into_channel(self) -> CommandChannel {
        self.channel
    }

    ///
    /// Replays drawings from the source, in arrival order, until `limit`
    /// drawings have been plotted or the source runs dry.
    ///
    /// Records that violate the data contract are logged and skipped without
    /// counting toward the limit; a broken stream, a device fault, a timeout
    /// or a raised cancel flag aborts the run.
    ///
    /// # Parameters:
    /// - `source`: The drawing source to pull from
    /// - `limit`: The maximum number of drawings to plot
    /// - `rng`: The random source for per-drawing placement draws
    ///
    /// # Returns:
    /// - The number of drawings plotted
    /// - A `DriverError` explaining why the run was aborted
    ///
    pub fn run(&mut self, source: &mut dyn DrawingSource, limit: usize, rng: &mut dyn UniformSource) -> Result<usize, DriverError> {
        let mut plotted = 0;

        while plotted < limit {
            let drawing = match source.next_drawing() {
                None => break,
                Some(Err(err)) if err.is_record_level() => {
                    warn!("Skipping a malformed record: {}", err);
                    continue;
                }
                Some(Err(err)) => return Err(DriverError::Source(err)),
                Some(Ok(drawing)) => drawing,
            };

            info!("--- Starting drawing {}: {} ---", plotted + 1, drawing.label);
            self.plot(&drawing, rng)?;
            plotted += 1;
        }

        Ok(plotted)
    }

    ///
    /// Replays one drawing, feeding each synthesized command to the channel in
    /// emission order and failing fast on anything but an acknowledgment.
    ///
    fn plot(&mut self, drawing: &Drawing, rng: &mut dyn UniformSource) -> Result<(), DriverError> {
        for command in synthesize(drawing, &self.geometry, rng) {
            if self.cancel.load(Ordering::SeqCst) {
                return Err(DriverError::Cancelled);
            }

            match self.channel.send(&command)? {
                ChannelResult::Acknowledged => {}
                ChannelResult::DeviceFault { message } => {
                    return Err(DriverError::DeviceFault { command: self.channel.gcode(&command), message });
                }
                ChannelResult::Timeout => {
                    return Err(DriverError::AckTimeout { command: self.channel.gcode(&command) });
                }
            }
        }

        Ok(())
    }
}
