use thiserror::Error;

///
/// All errors emitted from the drawing module.
///
/// - `Stream`: When the HTTP record stream cannot be reached or returns a bad status.
/// - `Io`: When reading a line from the underlying reader fails.
/// - `Json`: When a record line is not valid JSON.
/// - `WrongArity`: When a stroke record does not hold exactly the x, y and timestamp sequences
///     Parameters:
///     - `count`: The number of sequences the record actually held
/// - `MismatchedLengths`: When a stroke's parallel sequences disagree in length
///     Parameters:
///     - `xs`, `ys`, `ts`: The lengths of the three sequences
/// - `EmptyStroke`: When a stroke record contains no samples at all.
///
#[derive(Error, Debug)]
pub enum DrawingError {
    #[error("Could not reach the drawing stream. {}", .0)]
    Stream(#[from] reqwest::Error),

    #[error("Could not read from the drawing stream. {}", .0)]
    Io(#[from] std::io::Error),

    #[error("A record line could not be parsed as JSON. {}", .0)]
    Json(#[from] serde_json::Error),

    #[error("A stroke record held {} sequences, expected exactly 3 (x, y, timestamps).", .count)]
    WrongArity { count: usize },

    #[error("A stroke's sequences disagreed in length: {} xs, {} ys, {} timestamps.", .xs, .ys, .ts)]
    MismatchedLengths { xs: usize, ys: usize, ts: usize },

    #[error("A stroke record contained no samples.")]
    EmptyStroke,
}

impl DrawingError {
    ///
    /// Distinguishes a bad record from a broken source. A shape violation only
    /// invalidates the one record that carried it; anything else means the
    /// stream itself can no longer be trusted.
    ///
    /// # Returns:
    /// - true if the error invalidates a single record rather than the stream
    ///
    pub fn is_record_level(&self) -> bool {
        matches!(
            self,
            DrawingError::Json(_)
                | DrawingError::WrongArity { .. }
                | DrawingError::MismatchedLengths { .. }
                | DrawingError::EmptyStroke
        )
    }
}
