//!
//! Randomized aspect-preserving mapping from drawing space to device space
//!

use rand::Rng;

use crate::drawing::BoundingBox;
use crate::hardware::PlotterGeometry;

///
/// The trait for sources of uniform random draws.
/// The scaler takes one of these instead of reaching for an ambient generator,
/// so tests can supply a deterministic stub. Any `rand::Rng` works out of the
/// box via the blanket implementation.
///
/// # Functions:
/// - `uniform`: Should return a value drawn uniformly from [lo, hi]
///
pub trait UniformSource {
    fn uniform(&mut self, lo: f64, hi: f64) -> f64;
}

impl<R: Rng> UniformSource for R {
    fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        self.random_range(lo..=hi)
    }
}

///
/// A pre-computed mapping from one drawing's coordinate space into a randomized
/// sub-region of the plotter's bounded square.
///
/// The drawing's longer axis is first scaled to exactly fit the bounds, then
/// shrunk by a random inner factor and placed at a random offset, so repeated
/// plots of the same figure land at different sizes and positions. One instance
/// serves exactly one drawing; nothing mutates after construction, so two calls
/// with the same input always return the same output.
///
/// # Fields:
/// - `min_x`: The drawing-space x minimum, subtracted before scaling
/// - `min_y`: The drawing-space y minimum, subtracted before scaling
/// - `multiplier`: The combined master and inner scale factor
/// - `offset_x`: The randomized x placement within the bounds
/// - `offset_y`: The randomized y placement within the bounds
/// - `margin`: The fixed inset keeping strokes off the device's zero edge
///
pub struct Scaler {
    min_x: f64,
    min_y: f64,
    multiplier: f64,
    offset_x: f64,
    offset_y: f64,
    margin: f64,
}

impl Scaler {
    ///
    /// Creates a new `Scaler` for one drawing, drawing the inner scale and the
    /// placement offsets from the given random source.
    ///
    /// A single-point drawing has zero range on both axes; the scale
    /// denominator is then treated as 1 so the mapping stays finite and the
    /// point simply lands at a random offset.
    ///
    /// # Parameters:
    /// - `bbox`: The drawing's bounding box
    /// - `geometry`: The plotter configuration, for bounds, margin and the inner scale range
    /// - `rng`: The random source for the inner scale and placement draws
    ///
    /// # Returns:
    /// - A `Scaler` whose output is guaranteed to stay within the bounded square
    ///
    pub fn new(bbox: &BoundingBox, geometry: &PlotterGeometry, rng: &mut dyn UniformSource) -> Scaler {
        let x_range = bbox.max_x - bbox.min_x;
        let y_range = bbox.max_y - bbox.min_y;

        // scale by the larger dimension so the drawing fits the bounds
        let longest = x_range.max(y_range);
        let longest = if longest > 0. { longest } else { 1. };
        let master_scale = geometry.bounds() / longest;

        let inner_scale = rng.uniform(*geometry.inner_scale_min(), *geometry.inner_scale_max());
        let multiplier = master_scale * inner_scale;

        // the leftover space in the bounded square becomes the placement range
        let final_w = x_range * multiplier;
        let final_h = y_range * multiplier;
        let offset_x = rng.uniform(0., geometry.bounds() - final_w);
        let offset_y = rng.uniform(0., geometry.bounds() - final_h);

        Scaler { min_x: bbox.min_x, min_y: bbox.min_y, multiplier, offset_x, offset_y, margin: *geometry.margin() }
    }

    ///
    /// Applies the pre-computed mapping to one drawing-space point.
    /// The y axis is negated: drawing-space y grows downward, device-space y
    /// grows upward from the origin.
    ///
    /// # Parameters:
    /// - `x`: The drawing-space x coordinate
    /// - `y`: The drawing-space y coordinate
    ///
    /// # Returns:
    /// - The (x, y) device-space coordinates, in millimetres
    ///
    pub fn scale(&self, x: f64, y: f64) -> (f64, f64) {
        let device_x = (x - self.min_x) * self.multiplier + self.offset_x + self.margin;
        let device_y = -((y - self.min_y) * self.multiplier + self.offset_y + self.margin);
        (device_x, device_y)
    }
}


///
/// Tests relating to the Scaler struct and the uniform source contract.
///
#[cfg(test)]
mod tests {
    use super::*;

    /// A stub source that always returns the lower bound of the range.
    struct LowStub;

    impl UniformSource for LowStub {
        fn uniform(&mut self, lo: f64, _hi: f64) -> f64 {
            lo
        }
    }

    fn bbox(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> BoundingBox {
        BoundingBox { min_x, max_x, min_y, max_y }
    }

    #[test]
    fn minimum_corner_maps_to_offset_plus_margin() {
        let geometry = PlotterGeometry::default();
        let scaler = Scaler::new(&bbox(3., 40., 7., 90.), &geometry, &mut rand::rng());

        let (x, y) = scaler.scale(3., 7.);
        assert_eq!(x, scaler.offset_x + geometry.margin());
        assert_eq!(y, -(scaler.offset_y + geometry.margin()));
    }

    #[test]
    fn every_sample_stays_within_the_bounded_square() {
        let geometry = PlotterGeometry::default();
        let b = bbox(-20., 310., 0., 255.);
        let scaler = Scaler::new(&b, &geometry, &mut rand::rng());

        for (x, y) in [(-20., 0.), (310., 255.), (145., 128.), (-20., 255.)] {
            let (dx, dy) = scaler.scale(x, y);
            let limit = geometry.bounds() + geometry.margin();
            assert!(dx >= *geometry.margin() && dx <= limit, "x out of bounds: {}", dx);
            assert!(-dy >= *geometry.margin() && -dy <= limit, "y out of bounds: {}", dy);
        }
    }

    #[test]
    fn repeated_calls_on_one_instance_are_identical() {
        let scaler = Scaler::new(&bbox(0., 100., 0., 50.), &PlotterGeometry::default(), &mut rand::rng());
        assert_eq!(scaler.scale(42., 17.), scaler.scale(42., 17.));
    }

    #[test]
    fn two_instances_differ_in_placement() {
        let geometry = PlotterGeometry::default();
        let b = bbox(0., 100., 0., 100.);
        let mut rng = rand::rng();

        // 8 independent draws of a continuous offset all colliding is as good
        // as impossible; any pair differing proves the randomization runs
        let placements: Vec<(f64, f64)> = (0..8)
            .map(|_| {
                let s = Scaler::new(&b, &geometry, &mut rng);
                (s.offset_x, s.offset_y)
            })
            .collect();

        assert!(placements.windows(2).any(|w| w[0] != w[1]));
    }

    #[test]
    fn single_point_drawing_stays_finite() {
        let geometry = PlotterGeometry::default();
        let scaler = Scaler::new(&bbox(12., 12., 30., 30.), &geometry, &mut rand::rng());

        let (x, y) = scaler.scale(12., 30.);
        assert!(x.is_finite() && y.is_finite());
        assert!(x >= *geometry.margin());
        assert!(-y >= *geometry.margin());
    }

    #[test]
    fn low_stub_pins_the_mapping() {
        let geometry = PlotterGeometry::default();
        let scaler = Scaler::new(&bbox(0., 10., 0., 10.), &geometry, &mut LowStub);

        // inner scale 0.25 on a 10-unit range inside 250 bounds: multiplier 6.25
        assert_eq!(scaler.multiplier, 6.25);
        assert_eq!(scaler.offset_x, 0.);
        assert_eq!(scaler.scale(10., 0.), (67.5, -5.));
    }
}
