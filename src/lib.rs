//!
//! Core library for replaying recorded freehand sketches on a two-axis pen plotter.
//!
//! A drawing arrives as a set of time-stamped strokes, gets normalized into a
//! randomized sub-region of the plotter's work area, and is transmitted as
//! G-code over a serial link, one acknowledged command at a time.
//!

pub mod channel;
pub mod drawing;
pub mod driver;
pub mod hardware;
pub mod motion;
pub mod scaler;
