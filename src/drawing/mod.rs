//!
//! Drawing data model and record stream handling
//!

use std::io::BufRead;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use error::DrawingError;

pub mod error;

///
/// One continuous pen-down path, recorded as parallel x, y and timestamp
/// sequences. Timestamps are in milliseconds, cumulative across the whole
/// drawing rather than per stroke.
/// Construction validates the shape invariants, so an instance always holds
/// three equal-length, non-empty sequences.
///
/// # Fields:
/// - `xs`: The x samples, in drawing-space units (pixels)
/// - `ys`: The y samples, in drawing-space units (pixels)
/// - `timestamps_ms`: The cumulative capture timestamps, in milliseconds
///
#[derive(Clone, Debug, getset::Getters)]
#[get = "pub"]
pub struct Stroke {
    xs: Vec<f64>,
    ys: Vec<f64>,
    timestamps_ms: Vec<f64>,
}

impl Stroke {
    ///
    /// Creates a new `Stroke` if the three sequences agree in length and hold
    /// at least one sample.
    ///
    /// # Parameters:
    /// - `xs`: The x samples
    /// - `ys`: The y samples
    /// - `timestamps_ms`: The cumulative capture timestamps, in milliseconds
    ///
    /// # Returns:
    /// - A validated `Stroke`
    /// - An error explaining which shape invariant the sequences violated
    ///
    pub fn new(xs: Vec<f64>, ys: Vec<f64>, timestamps_ms: Vec<f64>) -> Result<Stroke, DrawingError> {
        if xs.len() != ys.len() || xs.len() != timestamps_ms.len() {
            return Err(DrawingError::MismatchedLengths { xs: xs.len(), ys: ys.len(), ts: timestamps_ms.len() });
        }

        if xs.is_empty() {
            return Err(DrawingError::EmptyStroke);
        }

        Ok(Stroke { xs, ys, timestamps_ms })
    }

    ///
    /// # Returns:
    /// - The number of samples in the stroke
    ///
    pub fn len(&self) -> usize {
        self.xs.len()
    }

    ///
    /// # Returns:
    /// - true if the stroke holds no samples (unreachable for validated strokes)
    ///
    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }
}

///
/// One complete figure: an ordered set of strokes plus a label.
/// The label is carried for logging only and plays no part in plotting.
///
/// # Fields:
/// - `label`: The word the drawing depicts, as recorded in the dataset
/// - `strokes`: The ordered strokes making up the figure
///
#[derive(Clone, Debug)]
pub struct Drawing {
    pub label: String,
    pub strokes: Vec<Stroke>,
}

impl Drawing {
    ///
    /// Computes the axis-aligned bounding box over every sample of every
    /// stroke in the drawing.
    ///
    /// # Returns:
    /// - The bounding box, or `None` for a drawing with no strokes
    ///
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let mut bbox: Option<BoundingBox> = None;

        for stroke in &self.strokes {
            for (x, y) in stroke.xs().iter().zip(stroke.ys().iter()) {
                match bbox.as_mut() {
                    None => {
                        bbox = Some(BoundingBox { min_x: *x, max_x: *x, min_y: *y, max_y: *y });
                    }
                    Some(b) => {
                        b.min_x = b.min_x.min(*x);
                        b.max_x = b.max_x.max(*x);
                        b.min_y = b.min_y.min(*y);
                        b.max_y = b.max_y.max(*y);
                    }
                }
            }
        }

        bbox
    }
}

///
/// The axis-aligned extent of a drawing. Derived on demand, never stored.
///
/// # Fields:
/// - `min_x`, `max_x`: The x extent, max >= min
/// - `min_y`, `max_y`: The y extent, max >= min
///
#[derive(Clone, Copy, Debug)]
pub struct BoundingBox {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

///
/// The trait for anything that yields drawings to plot.
/// Pull-based so the core never needs to know whether records come from a
/// network stream, a file, or a test fixture.
///
/// # Functions:
/// - `next_drawing`: Should return the next drawing, an error for a bad record
/// or broken stream, or `None` once the source is exhausted
///
pub trait DrawingSource {
    fn next_drawing(&mut self) -> Option<Result<Drawing, DrawingError>>;
}

///
/// The on-the-wire shape of one dataset record: a `drawing` field holding a
/// list of strokes, each stroke a 3-element list of equal-length sequences.
///
#[derive(Deserialize)]
struct RawRecord {
    #[serde(default)]
    word: String,
    drawing: Vec<Vec<Vec<f64>>>,
}

impl RawRecord {
    ///
    /// Validates the record's shape invariants and converts it into a
    /// `Drawing`. Wrong stroke arity or mismatched sequence lengths are
    /// data-contract violations and are rejected, never truncated.
    ///
    /// # Returns:
    /// - A validated `Drawing`
    /// - An error naming the violated invariant
    ///
    fn into_drawing(self) -> Result<Drawing, DrawingError> {
        let mut strokes = Vec::with_capacity(self.drawing.len());

        for mut raw_stroke in self.drawing {
            if raw_stroke.len() != 3 {
                return Err(DrawingError::WrongArity { count: raw_stroke.len() });
            }

            let timestamps_ms = raw_stroke.pop().unwrap();
            let ys = raw_stroke.pop().unwrap();
            let xs = raw_stroke.pop().unwrap();
            strokes.push(Stroke::new(xs, ys, timestamps_ms)?);
        }

        Ok(Drawing { label: self.word, strokes })
    }
}

///
/// A drawing source backed by a newline-delimited JSON record stream.
/// Generic over any buffered reader, so tests can feed it in-memory fixtures
/// and the binary can feed it a streaming HTTP response body.
///
/// # Fields:
/// - `reader`: The underlying line-oriented reader
///
pub struct NdjsonStream<R: BufRead> {
    reader: R,
}

impl NdjsonStream<std::io::BufReader<reqwest::blocking::Response>> {
    ///
    /// Opens a streaming HTTP connection to an ndjson dataset. The connection
    /// stays open and records are pulled line by line; the whole file is never
    /// downloaded up front. Only connecting is bounded by the timeout, as a
    /// slow stream is expected to idle between records.
    ///
    /// # Parameters:
    /// - `url`: The URL of the ndjson dataset
    /// - `connect_timeout`: How long to wait for the connection to establish
    ///
    /// # Returns:
    /// - An open `NdjsonStream`
    /// - An error if the connection failed or the server answered with an error status
    ///
    pub fn open(url: &str, connect_timeout: Duration) -> Result<Self, DrawingError> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(None)
            .build()?;

        let response = client.get(url).send()?.error_for_status()?;
        debug!("Connected to drawing stream at {}", url);

        Ok(NdjsonStream { reader: std::io::BufReader::new(response) })
    }
}

impl<R: BufRead> NdjsonStream<R> {
    ///
    /// Wraps an already-open buffered reader of ndjson records.
    ///
    /// # Parameters:
    /// - `reader`: The line-oriented reader to pull records from
    ///
    /// # Returns:
    /// - An `NdjsonStream` over the reader
    ///
    pub fn from_reader(reader: R) -> Self {
        NdjsonStream { reader }
    }
}

impl<R: BufRead> DrawingSource for NdjsonStream<R> {
    ///
    /// Reads lines until a non-blank one arrives, then parses and validates it.
    ///
    /// # Returns:
    /// - The next drawing, a `DrawingError` for a bad record or read failure,
    /// or `None` at end of stream
    ///
    fn next_drawing(&mut self) -> Option<Result<Drawing, DrawingError>> {
        loop {
            let mut line = String::new();
            match self.reader.read_line(&mut line) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(err) => return Some(Err(DrawingError::Io(err))),
            }

            if line.trim().is_empty() {
                continue;
            }

            let parsed = serde_json::from_str::<RawRecord>(&line)
                .map_err(DrawingError::Json)
                .and_then(RawRecord::into_drawing);

            return Some(parsed);
        }
    }
}


///
/// Tests relating to drawing validation and the ndjson record stream.
///
#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ONE_STROKE: &str = r#"{"word":"dragon","drawing":[[[0,10,10],[0,0,10],[0,100,300]]]}"#;

    #[test]
    fn parses_a_valid_record() {
        let mut source = NdjsonStream::from_reader(ONE_STROKE.as_bytes());
        let drawing = source.next_drawing().unwrap().unwrap();

        assert_eq!(drawing.label, "dragon");
        assert_eq!(drawing.strokes.len(), 1);
        assert_eq!(drawing.strokes[0].xs(), &vec![0., 10., 10.]);
        assert_eq!(drawing.strokes[0].timestamps_ms(), &vec![0., 100., 300.]);
        assert!(source.next_drawing().is_none());
    }

    #[test]
    fn skips_blank_lines_between_records() {
        let body = format!("\n{}\n\n{}\n", ONE_STROKE, ONE_STROKE);
        let mut source = NdjsonStream::from_reader(body.as_bytes());

        assert!(source.next_drawing().unwrap().is_ok());
        assert!(source.next_drawing().unwrap().is_ok());
        assert!(source.next_drawing().is_none());
    }

    #[test]
    fn rejects_wrong_stroke_arity() {
        let body = r#"{"word":"x","drawing":[[[0,1],[0,1]]]}"#;
        let mut source = NdjsonStream::from_reader(body.as_bytes());

        let err = source.next_drawing().unwrap().unwrap_err();
        assert!(matches!(err, DrawingError::WrongArity { count: 2 }));
        assert!(err.is_record_level());
    }

    #[test]
    fn rejects_mismatched_sequence_lengths() {
        let err = Stroke::new(vec![0., 1.], vec![0.], vec![0., 1.]).unwrap_err();
        assert!(matches!(err, DrawingError::MismatchedLengths { xs: 2, ys: 1, ts: 2 }));
    }

    #[test]
    fn rejects_an_empty_stroke() {
        assert!(matches!(Stroke::new(vec![], vec![], vec![]), Err(DrawingError::EmptyStroke)));
    }

    #[test]
    fn rejects_invalid_json_as_a_record_level_error() {
        let mut source = NdjsonStream::from_reader("not json\n".as_bytes());
        let err = source.next_drawing().unwrap().unwrap_err();
        assert!(err.is_record_level());
    }

    #[test]
    fn bounding_box_spans_all_strokes() {
        let drawing = Drawing {
            label: String::new(),
            strokes: vec![
                Stroke::new(vec![5., 20.], vec![3., 8.], vec![0., 1.]).unwrap(),
                Stroke::new(vec![-2.], vec![40.], vec![2.]).unwrap(),
            ],
        };

        let bbox = drawing.bounding_box().unwrap();
        assert_eq!(bbox.min_x, -2.);
        assert_eq!(bbox.max_x, 20.);
        assert_eq!(bbox.min_y, 3.);
        assert_eq!(bbox.max_y, 40.);
    }

    #[test]
    fn bounding_box_of_an_empty_drawing_is_none() {
        let drawing = Drawing { label: String::new(), strokes: vec![] };
        assert!(drawing.bounding_box().is_none());
    }
}
