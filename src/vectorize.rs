//! Flattening a [`PixelBuffer`] into a list of color vectors for clustering.

use crate::{PixelBuffer, QuantizeError, Shape};
use std::ops::Deref;

/// A borrowed, row-major list of color vectors together with the [`Shape`]
/// of the image they came from.
///
/// The invariant is that the list is non-empty, each vector has at least one channel,
/// and its length equals `shape.rows * shape.cols`.
///
/// # Examples
/// ```
/// # use kpress::{vectorize, PixelBuffer, QuantizeError, Shape};
/// # fn main() -> Result<(), QuantizeError> {
/// let buffer = PixelBuffer::<3>::from_raw(1, 2, &[1, 2, 3, 4, 5, 6])?;
/// let vectors = vectorize(&buffer)?;
/// assert_eq!(vectors.shape(), Shape::new(1, 2));
/// assert_eq!(vectors[1], [4, 5, 6]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, PartialEq, Eq)]
pub struct ColorVectors<'a, const N: usize> {
    /// The color vectors in row-major order.
    vectors: &'a [[u8; N]],
    /// The dimensions of the source image.
    shape: Shape,
}

impl<'a, const N: usize> Clone for ColorVectors<'a, N> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, const N: usize> Copy for ColorVectors<'a, N> {}

impl<'a, const N: usize> ColorVectors<'a, N> {
    /// Creates a new [`ColorVectors`] from a row-major slice and the shape it came from.
    ///
    /// # Errors
    /// Returns [`QuantizeError::InvalidShape`] if `N` is zero, if `vectors` is empty,
    /// or if `vectors.len() != shape.rows * shape.cols`.
    pub fn new(vectors: &'a [[u8; N]], shape: Shape) -> Result<Self, QuantizeError> {
        if N == 0 || vectors.is_empty() || shape.checked_len() != Some(vectors.len()) {
            Err(QuantizeError::InvalidShape {
                rows: shape.rows,
                cols: shape.cols,
                channels: N,
                len: vectors.len(),
            })
        } else {
            Ok(Self { vectors, shape })
        }
    }

    /// Returns the dimensions of the source image.
    #[must_use]
    pub const fn shape(&self) -> Shape {
        self.shape
    }

    /// Returns the number of channels in each vector.
    #[must_use]
    pub const fn channels(&self) -> usize {
        N
    }
}

impl<'a, const N: usize> AsRef<[[u8; N]]> for ColorVectors<'a, N> {
    fn as_ref(&self) -> &[[u8; N]] {
        self
    }
}

impl<'a, const N: usize> Deref for ColorVectors<'a, N> {
    type Target = [[u8; N]];

    fn deref(&self) -> &Self::Target {
        self.vectors
    }
}

impl<'a, const N: usize> From<ColorVectors<'a, N>> for &'a [[u8; N]] {
    fn from(val: ColorVectors<'a, N>) -> Self {
        val.vectors
    }
}

/// Flattens `buffer` into its row-major list of color vectors, retaining its shape.
///
/// # Errors
/// Returns [`QuantizeError::InvalidShape`] if the buffer has zero channels or zero pixels.
pub fn vectorize<const N: usize>(
    buffer: &PixelBuffer<N>,
) -> Result<ColorVectors<'_, N>, QuantizeError> {
    ColorVectors::new(buffer.pixels(), buffer.shape())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_row_major_order_and_shape() {
        let pixels = (0..6u8).map(|i| [i, i, i]).collect::<Vec<_>>();
        let buffer = PixelBuffer::new(2, 3, pixels.clone()).unwrap();
        let vectors = vectorize(&buffer).unwrap();

        assert_eq!(vectors.shape(), Shape::new(2, 3));
        assert_eq!(vectors.as_ref(), pixels.as_slice());
        assert_eq!(vectors.channels(), 3);
    }

    #[test]
    fn empty_buffer() {
        let buffer = PixelBuffer::<3>::new(0, 5, Vec::new()).unwrap();
        assert_eq!(
            vectorize(&buffer),
            Err(QuantizeError::InvalidShape { rows: 0, cols: 5, channels: 3, len: 0 })
        );
    }

    #[test]
    fn new_checks_shape() {
        let pixels = [[0u8; 3]; 6];
        assert!(ColorVectors::new(&pixels, Shape::new(2, 3)).is_ok());
        assert!(matches!(
            ColorVectors::new(&pixels, Shape::new(2, 2)),
            Err(QuantizeError::InvalidShape { rows: 2, cols: 2, len: 6, .. })
        ));
    }

    #[test]
    fn zero_channels() {
        let buffer = PixelBuffer::<0>::new(1, 2, vec![[], []]).unwrap();
        assert!(matches!(
            vectorize(&buffer),
            Err(QuantizeError::InvalidShape { channels: 0, len: 2, .. })
        ));
    }
}
