//!
//! CLI entry point: streams Quick, Draw! records and replays them on the plotter
//!

use std::thread;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use qdplot::channel::{ChannelResult, CommandChannel, MockTransport, SerialTransport, Transport};
use qdplot::drawing::NdjsonStream;
use qdplot::driver::PlotDriver;
use qdplot::hardware::PlotterGeometry;

const DATASET_URL: &str = "https://storage.googleapis.com/quickdraw_dataset/full/raw/";

/// Grace period after opening the port, while the controller boots.
const POST_OPEN_SETTLE: Duration = Duration::from_secs(2);
/// Per-read timeout of the serial port; the channel's own deadline sits on top.
const SERIAL_READ_TIMEOUT: Duration = Duration::from_secs(1);
/// How long to wait for the dataset connection to establish.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

///
/// Replays recorded freehand sketches from the raw Quick, Draw! dataset on a
/// serial-attached pen plotter.
///
#[derive(Parser)]
#[command(name = "qdplot")]
struct Args {
    /// Dataset category to stream, e.g. "dragon" or "The Eiffel Tower"
    #[arg(default_value = "dragon")]
    word: String,

    /// Number of drawings to plot before stopping
    #[arg(short, long, default_value_t = 1)]
    limit: usize,

    /// Serial port the plotter is attached to
    #[arg(short, long, default_value = "/dev/cu.usbmodem201912341")]
    port: String,

    /// Baud rate of the serial link
    #[arg(short, long, default_value_t = 115_200)]
    baud: u32,

    /// Seconds to wait for each command acknowledgment
    #[arg(long, default_value_t = 5)]
    ack_timeout: u64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let geometry = PlotterGeometry::default();

    // fall back to the mock transport when no plotter is attached; the whole
    // pipeline still runs, with commands echoed to the log
    let (transport, acknowledges): (Box<dyn Transport>, bool) =
        match SerialTransport::open(&args.port, args.baud, SERIAL_READ_TIMEOUT) {
            Ok(transport) => {
                thread::sleep(POST_OPEN_SETTLE);
                (Box::new(transport), true)
            }
            Err(err) => {
                warn!("{} Falling back to the mock transport.", err);
                (Box::new(MockTransport), false)
            }
        };

    let mut channel = CommandChannel::new(
        transport,
        acknowledges,
        Duration::from_secs(args.ack_timeout),
        geometry.clone(),
    );

    if acknowledges {
        channel.reset()?;
    }
    expect_ack("setup", channel.configure()?)?;

    let url = format!("{}{}.ndjson", DATASET_URL, args.word);
    let mut source = NdjsonStream::open(&url, CONNECT_TIMEOUT)?;

    let mut driver = PlotDriver::new(channel, geometry);
    let plotted = driver.run(&mut source, args.limit, &mut rand::rng())?;
    info!("Plotted {} drawing(s).", plotted);

    let mut channel = driver.into_channel();
    expect_ack("park", channel.park()?)?;
    channel.close();

    Ok(())
}

///
/// Promotes a non-acknowledging result outside a drawing run to a hard error.
///
fn expect_ack(stage: &str, result: ChannelResult) -> anyhow::Result<()> {
    match result {
        ChannelResult::Acknowledged => Ok(()),
        ChannelResult::DeviceFault { message } => anyhow::bail!("Device fault during {}: {}", stage, message),
        ChannelResult::Timeout => anyhow::bail!("No acknowledgment during {}.", stage),
    }
}
