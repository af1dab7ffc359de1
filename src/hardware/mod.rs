//!
//! Physical plotter parameters and configuration
//!

///
/// A simple container for the plotter's physical and protocol parameters.
/// Distances are measured in millimetres, feed rates in millimetres per minute.
/// All fields have an associated getter function.
///
/// # Fields:
/// - `x_max`: The travel limit of the x axis
/// - `y_max`: The travel limit of the y axis
/// - `bounds`: The side length of the square a drawing is placed and sized into
/// - `margin`: A small inset keeping strokes off the device's zero edge
/// - `pen_up_height`: The z height at which the pen clears the page
/// - `pen_down_height`: The z height at which the pen touches the page
/// - `travel_feed`: The feed rate used for raising and lowering the pen
/// - `rapid_feed`: The feed rate used for pen-up repositioning moves
/// - `max_feed`: The device's rated maximum feed rate, caps every drawn segment
/// - `speed_multiplier`: Scale applied to recorded velocities; 1.0 replays in
/// real time, larger values inflate the requested feed (clamped at `max_feed`)
/// - `inner_scale_min`: Lower bound of the randomized per-drawing shrink factor
/// - `inner_scale_max`: Upper bound of the randomized per-drawing shrink factor
///
#[derive(Clone, getset::Getters)]
#[get = "pub"]
pub struct PlotterGeometry {
    x_max: f64,
    y_max: f64,
    bounds: f64,
    margin: f64,
    pen_up_height: f64,
    pen_down_height: f64,
    travel_feed: f64,
    rapid_feed: f64,
    max_feed: f64,
    speed_multiplier: f64,
    inner_scale_min: f64,
    inner_scale_max: f64,
}

impl PlotterGeometry {
    ///
    /// A function to create a new PlotterGeometry object.
    /// Ideally this is constructed once at startup and shared by reference; no
    /// part of the pipeline mutates it afterwards.
    ///
    /// # Returns:
    /// - A new `PlotterGeometry` instance
    ///
    #[allow(clippy::too_many_arguments)]
    pub fn new(x_max: f64, y_max: f64, bounds: f64, margin: f64, pen_up_height: f64, pen_down_height: f64, travel_feed: f64, rapid_feed: f64, max_feed: f64, speed_multiplier: f64, inner_scale_min: f64, inner_scale_max: f64) -> PlotterGeometry {
        PlotterGeometry { x_max, y_max, bounds, margin, pen_up_height, pen_down_height, travel_feed, rapid_feed, max_feed, speed_multiplier, inner_scale_min, inner_scale_max }
    }
}

impl Default for PlotterGeometry {
    ///
    /// # Returns:
    /// - A `PlotterGeometry` matching the reference iDraw deployment
    ///
    fn default() -> PlotterGeometry {
        PlotterGeometry::new(600., 600., 250., 5., 0., -8., 7000., 11500., 11500., 20., 0.25, 0.75)
    }
}
