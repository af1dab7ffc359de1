//!
//! Motion command representation and synthesis from recorded strokes
//!

use crate::drawing::Drawing;
use crate::hardware::PlotterGeometry;
use crate::scaler::{Scaler, UniformSource};

///
/// One abstract plotter motion, produced in strict order by the synthesizer
/// and consumed exactly once by the command channel.
///
/// - `PenUp`: Raise the pen clear of the page.
/// - `PenDown`: Lower the pen onto the page.
/// - `RapidMove`: Reposition at the rapid feed, pen expected up
///     Parameters:
///     - `x`, `y`: The target device-space coordinates, in millimetres
/// - `FeedMove`: Draw a segment at a commanded feed rate
///     Parameters:
///     - `x`, `y`: The target device-space coordinates, in millimetres
///     - `feed_rate`: The commanded speed, in millimetres per minute
///
#[derive(Clone, Debug, PartialEq)]
pub enum MotionCommand {
    PenUp,
    PenDown,
    RapidMove { x: f64, y: f64 },
    FeedMove { x: f64, y: f64, feed_rate: f64 },
}

///
/// Converts one drawing into the ordered motion commands that replay it.
///
/// Each stroke becomes a pen-up, a rapid move to its scaled first sample, a
/// pen-down, and one feed move per recorded segment. The segment's feed rate
/// comes from the recorded timing: device-space distance over the timestamp
/// delta, scaled by the configured speed multiplier and clamped at the
/// device's maximum. Segments with a non-positive timestamp delta or zero
/// length are skipped outright rather than producing infinite or negative
/// velocities. A trailing pen-up closes the drawing.
///
/// # Parameters:
/// - `drawing`: The drawing to replay
/// - `geometry`: The plotter configuration
/// - `rng`: The random source for the scaler's placement draws
///
/// # Returns:
/// - The ordered motion commands; a stroke-less drawing yields only the trailing pen-up
///
pub fn synthesize(drawing: &Drawing, geometry: &PlotterGeometry, rng: &mut dyn UniformSource) -> Vec<MotionCommand> {
    let mut commands: Vec<MotionCommand> = vec![];

    if let Some(bbox) = drawing.bounding_box() {
        let scaler = Scaler::new(&bbox, geometry, rng);

        for stroke in &drawing.strokes {
            commands.push(MotionCommand::PenUp);

            let (start_x, start_y) = scaler.scale(stroke.xs()[0], stroke.ys()[0]);
            commands.push(MotionCommand::RapidMove { x: start_x, y: start_y });
            commands.push(MotionCommand::PenDown);

            for i in 1..stroke.len() {
                let delta_ms = stroke.timestamps_ms()[i] - stroke.timestamps_ms()[i - 1];
                if delta_ms <= 0. {
                    continue;
                }

                let (x, y) = scaler.scale(stroke.xs()[i], stroke.ys()[i]);
                let (x_prior, y_prior) = scaler.scale(stroke.xs()[i - 1], stroke.ys()[i - 1]);

                let distance = ((x - x_prior).powi(2) + (y - y_prior).powi(2)).sqrt();
                let velocity = distance / (delta_ms / 1000.);
                if velocity <= 0. {
                    continue;
                }

                let feed_rate = (velocity * geometry.speed_multiplier()).min(*geometry.max_feed());
                commands.push(MotionCommand::FeedMove { x, y, feed_rate });
            }
        }
    }

    commands.push(MotionCommand::PenUp);
    commands
}
