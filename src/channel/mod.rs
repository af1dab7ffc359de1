//!
//! Serial command channel, G-code serialization and flow control
//!

use std::io::{Read, Write};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::hardware::PlotterGeometry;
use crate::motion::MotionCommand;
use error::ChannelError;

pub mod error;

/// How long the device needs after a soft reset before it accepts commands.
const RESET_SETTLE: Duration = Duration::from_secs(2);
/// How long the device needs after the unlock command.
const UNLOCK_SETTLE: Duration = Duration::from_secs(1);
/// Pause standing in for device processing latency when nothing acknowledges.
const SIMULATED_LATENCY: Duration = Duration::from_millis(50);
/// Backoff between acknowledgment polls when the transport had no line ready.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

///
/// The trait for the byte stream carrying commands to the plotter.
/// Both the physical serial port and the diagnostic mock implement it, so the
/// channel never needs to know which one it is driving.
///
/// # Functions:
/// - `write`: Should write all bytes to the device
/// - `read_line`: Should return the next available line, or an empty string if
/// none arrived within the transport's own read timeout
/// - `bytes_available`: Should return how many bytes can be read without blocking
/// - `close`: Should release the underlying connection
///
pub trait Transport {
    fn write(&mut self, bytes: &[u8]) -> Result<(), ChannelError>;
    fn read_line(&mut self) -> Result<String, ChannelError>;
    fn bytes_available(&mut self) -> usize;
    fn close(&mut self);
}

///
/// A transport backed by a physical serial port.
///
/// # Fields:
/// - `port`: The open serial port handle
///
pub struct SerialTransport {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialTransport {
    ///
    /// Opens the serial port at the given baud rate. The read timeout bounds
    /// each individual `read_line` call, not the acknowledgment wait as a
    /// whole; the channel layers its own deadline on top.
    ///
    /// # Parameters:
    /// - `path`: The serial port identifier, e.g. /dev/ttyUSB0
    /// - `baud`: The baud rate the device is configured for
    /// - `read_timeout`: The per-read timeout of the port
    ///
    /// # Returns:
    /// - An open `SerialTransport`
    /// - A `ChannelError` explaining why the port could not be opened
    ///
    pub fn open(path: &str, baud: u32, read_timeout: Duration) -> Result<SerialTransport, ChannelError> {
        let port = serialport::new(path, baud)
            .timeout(read_timeout)
            .open()
            .map_err(|err| ChannelError::PortUnavailable { port: path.to_owned(), reason: err.to_string() })?;

        Ok(SerialTransport { port })
    }
}

impl Transport for SerialTransport {
    fn write(&mut self, bytes: &[u8]) -> Result<(), ChannelError> {
        self.port.write_all(bytes)?;
        self.port.flush()?;
        Ok(())
    }

    ///
    /// Reads bytes one at a time until a newline or the port's read timeout.
    /// A timeout returns whatever arrived so far, possibly an empty string, so
    /// the caller can keep polling under its own deadline.
    ///
    fn read_line(&mut self) -> Result<String, ChannelError> {
        let mut collected: Vec<u8> = vec![];
        let mut byte = [0_u8; 1];

        loop {
            match self.port.read(&mut byte) {
                Ok(0) => break,
                Ok(_) => {
                    if byte[0] == b'\n' {
                        break;
                    }
                    collected.push(byte[0]);
                }
                Err(err) if err.kind() == std::io::ErrorKind::TimedOut => break,
                Err(err) => return Err(ChannelError::Io(err)),
            }
        }

        Ok(String::from_utf8_lossy(&collected).into_owned())
    }

    fn bytes_available(&mut self) -> usize {
        self.port.bytes_to_read().map(|count| count as usize).unwrap_or(0)
    }

    fn close(&mut self) {
        let _ = self.port.flush();
        info!("Serial connection closed.");
    }
}

///
/// A substitute transport for when the plotter is unavailable.
/// Writes are echoed to the log and reads never block, so a full pipeline run
/// can be exercised with no hardware attached.
///
pub struct MockTransport;

impl Transport for MockTransport {
    fn write(&mut self, bytes: &[u8]) -> Result<(), ChannelError> {
        info!("[SERIAL SEND] {}", String::from_utf8_lossy(bytes).trim());
        Ok(())
    }

    fn read_line(&mut self) -> Result<String, ChannelError> {
        Ok(String::new())
    }

    fn bytes_available(&mut self) -> usize {
        0
    }

    fn close(&mut self) {
        info!("Mock connection closed.");
    }
}

///
/// The outcome of sending one command over the channel.
///
/// - `Acknowledged`: The device confirmed the command; the next one may be sent.
/// - `DeviceFault`: The device reported an error or alarm
///     Parameters:
///     - `message`: The fault line as reported by the device
/// - `Timeout`: No acknowledgment arrived within the configured window.
///
#[derive(Clone, Debug, PartialEq)]
pub enum ChannelResult {
    Acknowledged,
    DeviceFault { message: String },
    Timeout,
}

///
/// Serializes motion commands to the device's line-oriented G-code dialect and
/// enforces its one-command/one-acknowledgment flow control.
///
/// The channel exclusively owns its transport; nothing else reads or writes
/// it. Whether acknowledgments are expected is an explicit capability set at
/// construction, never inferred from the transport's concrete type.
///
/// # Fields:
/// - `transport`: The exclusively-owned byte stream to the device
/// - `acknowledges`: Whether the device on the other end confirms commands
/// - `ack_timeout`: The deadline for an acknowledgment before giving up
/// - `geometry`: The plotter configuration, for pen heights and feed caps
///
pub struct CommandChannel {
    transport: Box<dyn Transport>,
    acknowledges: bool,
    ack_timeout: Duration,
    geometry: PlotterGeometry,
}

impl CommandChannel {
    ///
    /// Creates a new `CommandChannel` taking ownership of the transport.
    ///
    /// # Parameters:
    /// - `transport`: The byte stream to the device
    /// - `acknowledges`: Whether to wait for confirmations; false for mock runs
    /// - `ack_timeout`: How long to wait for an acknowledgment before reporting `Timeout`
    /// - `geometry`: The plotter configuration
    ///
    /// # Returns:
    /// - A new `CommandChannel` instance
    ///
    pub fn new(transport: Box<dyn Transport>, acknowledges: bool, ack_timeout: Duration, geometry: PlotterGeometry) -> CommandChannel {
        CommandChannel { transport, acknowledges, ack_timeout, geometry }
    }

    ///
    /// Serializes one motion command to its G-code line, without a terminator.
    /// Coordinates are always formatted to exactly 3 decimal places.
    ///
    /// # Parameters:
    /// - `command`: The motion command to serialize
    ///
    /// # Returns:
    /// - The G-code line for the command
    ///
    pub fn gcode(&self, command: &MotionCommand) -> String {
        match command {
            MotionCommand::PenUp => format!("G1 Z{} F{}", self.geometry.pen_up_height(), self.geometry.travel_feed()),
            MotionCommand::PenDown => format!("G1 Z{} F{}", self.geometry.pen_down_height(), self.geometry.travel_feed()),
            MotionCommand::RapidMove { x, y } => format!("G0 X{:.3} Y{:.3} F{}", x, y, self.geometry.rapid_feed()),
            MotionCommand::FeedMove { x, y, feed_rate } => format!("G1 X{:.3} Y{:.3} F{}", x, y, feed_rate),
        }
    }

    ///
    /// Sends one motion command and waits for the device's verdict.
    ///
    /// # Parameters:
    /// - `command`: The motion command to send
    ///
    /// # Returns:
    /// - The channel result for the command
    /// - A `ChannelError` if the transport itself failed
    ///
    pub fn send(&mut self, command: &MotionCommand) -> Result<ChannelResult, ChannelError> {
        let line = self.gcode(command);
        self.send_line(&line)
    }

    ///
    /// Writes one raw protocol line, terminator appended, and waits for the
    /// device's verdict. Used directly for the fixed setup strings.
    ///
    /// # Parameters:
    /// - `line`: The protocol line, without a terminator
    ///
    /// # Returns:
    /// - The channel result for the line
    /// - A `ChannelError` if the transport itself failed
    ///
    pub fn send_line(&mut self, line: &str) -> Result<ChannelResult, ChannelError> {
        debug!(">> {}", line);
        self.transport.write(format!("{}\n", line).as_bytes())?;

        if self.acknowledges {
            self.await_acknowledgment()
        } else {
            self.drain_after_pause()
        }
    }

    ///
    /// Sends the one-shot device setup sequence: millimetre mode, absolute
    /// positioning, laser mode and soft limits off, axis maxima, and the
    /// origin set at the pen's current position.
    ///
    /// # Returns:
    /// - `Acknowledged` if the whole sequence was confirmed, otherwise the
    /// first non-acknowledging result
    ///
    pub fn configure(&mut self) -> Result<ChannelResult, ChannelError> {
        let lines = [
            "G21".to_owned(),
            "G90".to_owned(),
            "$32=0".to_owned(),
            "$20=0".to_owned(),
            format!("$130={}", self.geometry.x_max()),
            format!("$131={}", self.geometry.y_max()),
            "G10 L20 P1 X0 Y0 Z0".to_owned(),
        ];

        for line in lines {
            let result = self.send_line(&line)?;
            if result != ChannelResult::Acknowledged {
                return Ok(result);
            }
        }

        Ok(ChannelResult::Acknowledged)
    }

    ///
    /// Soft-resets and unlocks the device: the 0x18 control byte, a settle
    /// pause, the `$X` unlock, another pause, then a drain of the startup
    /// banner so it is never mistaken for an acknowledgment.
    ///
    /// # Returns:
    /// - Void once the device is unlocked
    /// - A `ChannelError` if the transport failed mid-sequence
    ///
    pub fn reset(&mut self) -> Result<(), ChannelError> {
        info!("Sending reset and unlock...");
        self.transport.write(&[0x18])?;
        thread::sleep(RESET_SETTLE);

        self.transport.write(b"$X\n")?;
        thread::sleep(UNLOCK_SETTLE);

        while self.transport.bytes_available() > 0 {
            let _ = self.transport.read_line()?;
        }
        info!("Plotter unlocked.");

        Ok(())
    }

    ///
    /// Raises the pen and returns it to the device origin.
    ///
    /// # Returns:
    /// - `Acknowledged` if both moves were confirmed, otherwise the first
    /// non-acknowledging result
    ///
    pub fn park(&mut self) -> Result<ChannelResult, ChannelError> {
        let result = self.send(&MotionCommand::PenUp)?;
        if result != ChannelResult::Acknowledged {
            return Ok(result);
        }

        self.send_line("G0 X0 Y0")
    }

    ///
    /// Closes the underlying transport.
    ///
    pub fn close(&mut self) {
        self.transport.close();
    }

    ///
    /// Blocks until the device answers the last command. A line containing
    /// "ok" (any case) acknowledges it; one containing "error" or "alarm"
    /// reports a fault, surfaced to the caller rather than retried. If the
    /// deadline passes with no verdict the result is `Timeout` so an
    /// unresponsive device cannot hang the pipeline forever.
    ///
    fn await_acknowledgment(&mut self) -> Result<ChannelResult, ChannelError> {
        let deadline = Instant::now() + self.ack_timeout;

        loop {
            let line = self.transport.read_line()?;
            let trimmed = line.trim();

            if !trimmed.is_empty() {
                debug!("[{}]", trimmed);
                let lowered = trimmed.to_lowercase();

                if lowered.contains("ok") {
                    return Ok(ChannelResult::Acknowledged);
                }
                if lowered.contains("error") || lowered.contains("alarm") {
                    warn!("Device reported a fault: {}", trimmed);
                    return Ok(ChannelResult::DeviceFault { message: trimmed.to_owned() });
                }
            }

            if Instant::now() >= deadline {
                return Ok(ChannelResult::Timeout);
            }

            if trimmed.is_empty() {
                thread::sleep(POLL_INTERVAL);
            }
        }
    }

    ///
    /// The no-acknowledgment path: pause briefly to model device processing
    /// latency, log anything the transport has to say, and report success.
    ///
    fn drain_after_pause(&mut self) -> Result<ChannelResult, ChannelError> {
        thread::sleep(SIMULATED_LATENCY);

        while self.transport.bytes_available() > 0 {
            let line = self.transport.read_line()?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                break;
            }
            debug!("[{}]", trimmed);
        }

        Ok(ChannelResult::Acknowledged)
    }
}


///
/// Tests relating to G-code serialization and the acknowledgment protocol.
///
#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// An in-memory transport replaying a fixed script of device responses.
    struct ScriptedTransport {
        sent: Arc<Mutex<Vec<String>>>,
        replies: VecDeque<String>,
    }

    impl ScriptedTransport {
        fn new(replies: &[&str]) -> (ScriptedTransport, Arc<Mutex<Vec<String>>>) {
            let sent = Arc::new(Mutex::new(vec![]));
            let transport = ScriptedTransport {
                sent: sent.clone(),
                replies: replies.iter().map(|r| r.to_string()).collect(),
            };
            (transport, sent)
        }
    }

    impl Transport for ScriptedTransport {
        fn write(&mut self, bytes: &[u8]) -> Result<(), ChannelError> {
            self.sent.lock().unwrap().push(String::from_utf8_lossy(bytes).into_owned());
            Ok(())
        }

        fn read_line(&mut self) -> Result<String, ChannelError> {
            Ok(self.replies.pop_front().unwrap_or_default())
        }

        fn bytes_available(&mut self) -> usize {
            self.replies.len()
        }

        fn close(&mut self) {}
    }

    fn channel(replies: &[&str], acknowledges: bool, timeout_ms: u64) -> (CommandChannel, Arc<Mutex<Vec<String>>>) {
        let (transport, sent) = ScriptedTransport::new(replies);
        let channel = CommandChannel::new(
            Box::new(transport),
            acknowledges,
            Duration::from_millis(timeout_ms),
            PlotterGeometry::default(),
        );
        (channel, sent)
    }

    #[test]
    fn serializes_the_full_command_vocabulary() {
        let (channel, _) = channel(&[], false, 0);

        assert_eq!(channel.gcode(&MotionCommand::PenUp), "G1 Z0 F7000");
        assert_eq!(channel.gcode(&MotionCommand::PenDown), "G1 Z-8 F7000");
        assert_eq!(channel.gcode(&MotionCommand::RapidMove { x: 5., y: -5. }), "G0 X5.000 Y-5.000 F11500");
        assert_eq!(channel.gcode(&MotionCommand::FeedMove { x: 67.5, y: -5., feed_rate: 6250. }), "G1 X67.500 Y-5.000 F6250");
    }

    #[test]
    fn plain_ok_acknowledges() {
        let (mut channel, sent) = channel(&["ok"], true, 1000);

        let result = channel.send(&MotionCommand::PenUp).unwrap();
        assert_eq!(result, ChannelResult::Acknowledged);
        assert_eq!(sent.lock().unwrap().as_slice(), ["G1 Z0 F7000\n"]);
    }

    #[test]
    fn banner_chatter_before_the_ok_is_skipped() {
        let (mut channel, _) = channel(&["Grbl 1.1h ['$' for help]", "", "OK"], true, 1000);

        let result = channel.send_line("G21").unwrap();
        assert_eq!(result, ChannelResult::Acknowledged);
    }

    #[test]
    fn error_lines_report_a_fault_whatever_the_case() {
        let (mut channel, _) = channel(&["  ERROR: soft limit  "], true, 1000);

        let result = channel.send(&MotionCommand::PenDown).unwrap();
        assert_eq!(result, ChannelResult::DeviceFault { message: "ERROR: soft limit".to_owned() });
    }

    #[test]
    fn alarm_lines_report_a_fault() {
        let (mut channel, _) = channel(&["ALARM:1"], true, 1000);

        let result = channel.send_line("G90").unwrap();
        assert_eq!(result, ChannelResult::DeviceFault { message: "ALARM:1".to_owned() });
    }

    #[test]
    fn a_silent_device_times_out() {
        let (mut channel, _) = channel(&[], true, 30);

        let result = channel.send(&MotionCommand::PenUp).unwrap();
        assert_eq!(result, ChannelResult::Timeout);
    }

    #[test]
    fn a_non_acknowledging_channel_never_blocks() {
        let (mut channel, sent) = channel(&[], false, 0);

        let result = channel.send(&MotionCommand::RapidMove { x: 1., y: 2. }).unwrap();
        assert_eq!(result, ChannelResult::Acknowledged);
        assert_eq!(sent.lock().unwrap().len(), 1);
    }

    #[test]
    fn configure_sends_the_setup_sequence_in_order() {
        let replies = ["ok"; 7];
        let (mut channel, sent) = channel(&replies, true, 1000);

        let result = channel.configure().unwrap();
        assert_eq!(result, ChannelResult::Acknowledged);
        assert_eq!(
            sent.lock().unwrap().as_slice(),
            [
                "G21\n",
                "G90\n",
                "$32=0\n",
                "$20=0\n",
                "$130=600\n",
                "$131=600\n",
                "G10 L20 P1 X0 Y0 Z0\n",
            ]
        );
    }

    #[test]
    fn configure_stops_at_the_first_fault() {
        let (mut channel, sent) = channel(&["ok", "error:9"], true, 1000);

        let result = channel.configure().unwrap();
        assert_eq!(result, ChannelResult::DeviceFault { message: "error:9".to_owned() });
        assert_eq!(sent.lock().unwrap().len(), 2);
    }
}
