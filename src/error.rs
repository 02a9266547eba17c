//! The error type returned at each component boundary.

use thiserror::Error;

/// Errors raised when the input to a quantization step violates its preconditions.
///
/// None of these are retried internally. Failing to converge within the
/// iteration budget is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QuantizeError {
    /// The pixel buffer dimensions are malformed: zero channels, zero pixels,
    /// or a pixel/byte count that does not match `rows * cols`.
    #[error("invalid buffer shape: {rows}x{cols} with {channels} channels and {len} values")]
    InvalidShape {
        /// Number of rows in the buffer.
        rows: usize,
        /// Number of columns in the buffer.
        cols: usize,
        /// Number of channels per pixel.
        channels: usize,
        /// Number of values actually supplied.
        len: usize,
    },

    /// There are no color vectors to cluster.
    #[error("cannot cluster an empty set of colors")]
    EmptyInput,

    /// The number of assignments does not match the target image shape.
    #[error("expected {expected} assignments for the image shape, got {actual}")]
    ShapeMismatch {
        /// `rows * cols` of the target shape.
        expected: usize,
        /// Number of assignments supplied.
        actual: usize,
    },

    /// An assignment points past the end of the palette.
    #[error("palette index {index} is out of range for a palette of {len} colors")]
    IndexOutOfRange {
        /// The offending assignment.
        index: u8,
        /// Length of the palette.
        len: usize,
    },

    /// There are more colors than the supported maximum of `MAX_PIXELS`.
    #[error("{0} colors is above the maximum of {max} pixels", max = crate::MAX_PIXELS)]
    TooManyPixels(usize),

    /// The requested palette size is outside `1..=MAX_COLORS`.
    #[error("palette size {0} is outside the supported range 1..=256")]
    InvalidPaletteSize(u16),
}
