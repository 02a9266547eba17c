//! Rebuilding an image from a palette and per-pixel palette indices.

use crate::{PixelBuffer, QuantizeError, Shape};

#[cfg(feature = "threads")]
use rayon::prelude::*;

fn check_indices<const N: usize>(
    assignments: &[u8],
    palette: &[[u8; N]],
    shape: Shape,
) -> Result<(), QuantizeError> {
    let expected = shape.len();
    if shape.checked_len() != Some(assignments.len()) {
        return Err(QuantizeError::ShapeMismatch { expected, actual: assignments.len() });
    }

    match assignments.iter().find(|&&i| usize::from(i) >= palette.len()) {
        Some(&index) => Err(QuantizeError::IndexOutOfRange { index, len: palette.len() }),
        None => Ok(()),
    }
}

/// Builds an image of the given `shape` where the pixel at row-major index `i`
/// is `palette[assignments[i]]`.
///
/// # Errors
/// Returns [`QuantizeError::ShapeMismatch`] if `assignments.len() != shape.rows * shape.cols`,
/// or [`QuantizeError::IndexOutOfRange`] if any assignment is not a valid index into `palette`.
///
/// # Examples
/// ```
/// # use kpress::{reconstruct, QuantizeError, Shape};
/// # fn main() -> Result<(), QuantizeError> {
/// let palette = [[0, 0, 0], [255, 255, 255]];
/// let image = reconstruct(&[0, 1, 1, 0], &palette, Shape::new(2, 2))?;
/// assert_eq!(image.get(0, 1), Some([255, 255, 255]));
/// # Ok(())
/// # }
/// ```
pub fn reconstruct<const N: usize>(
    assignments: &[u8],
    palette: &[[u8; N]],
    shape: Shape,
) -> Result<PixelBuffer<N>, QuantizeError> {
    check_indices(assignments, palette, shape)?;

    let pixels = assignments
        .iter()
        .map(|&i| palette[usize::from(i)])
        .collect();

    PixelBuffer::new(shape.rows, shape.cols, pixels)
}

/// Builds an image from a palette and indices in parallel.
///
/// See [`reconstruct`] for more details.
///
/// # Errors
/// Returns [`QuantizeError::ShapeMismatch`] if `assignments.len() != shape.rows * shape.cols`,
/// or [`QuantizeError::IndexOutOfRange`] if any assignment is not a valid index into `palette`.
#[cfg(feature = "threads")]
pub fn reconstruct_par<const N: usize>(
    assignments: &[u8],
    palette: &[[u8; N]],
    shape: Shape,
) -> Result<PixelBuffer<N>, QuantizeError> {
    check_indices(assignments, palette, shape)?;

    let pixels = assignments
        .par_iter()
        .map(|&i| palette[usize::from(i)])
        .collect();

    PixelBuffer::new(shape.rows, shape.cols, pixels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::*;

    #[test]
    fn maps_indices_to_palette() {
        let palette = [[1, 2, 3], [4, 5, 6], [7, 8, 9]];
        let assignments = [2, 0, 1, 1, 0, 2];
        let image = reconstruct(&assignments, &palette, Shape::new(3, 2)).unwrap();

        assert_eq!(image.shape(), Shape::new(3, 2));
        assert_eq!(
            image.pixels(),
            &[[7, 8, 9], [1, 2, 3], [4, 5, 6], [4, 5, 6], [1, 2, 3], [7, 8, 9]]
        );
    }

    #[test]
    fn is_deterministic() {
        let palette = test_data_256();
        #[allow(clippy::cast_possible_truncation)]
        let assignments = (0..1024).map(|i| (i * 7 % 256) as u8).collect::<Vec<_>>();
        let shape = Shape::new(32, 32);

        let a = reconstruct(&assignments, palette.as_slice(), shape).unwrap();
        let b = reconstruct(&assignments, palette.as_slice(), shape).unwrap();
        assert_eq!(a, b);

        #[cfg(feature = "threads")]
        assert_eq!(a, reconstruct_par(&assignments, palette.as_slice(), shape).unwrap());
    }

    #[test]
    fn shape_mismatch() {
        let palette = [[0, 0, 0]];
        assert_eq!(
            reconstruct(&[0, 0, 0], &palette, Shape::new(2, 2)),
            Err(QuantizeError::ShapeMismatch { expected: 4, actual: 3 })
        );
        #[cfg(feature = "threads")]
        assert_eq!(
            reconstruct_par(&[0; 5], &palette, Shape::new(2, 2)),
            Err(QuantizeError::ShapeMismatch { expected: 4, actual: 5 })
        );
    }

    #[test]
    fn index_out_of_range() {
        let palette = [[0, 0, 0], [1, 1, 1]];
        assert_eq!(
            reconstruct(&[0, 1, 2, 1], &palette, Shape::new(2, 2)),
            Err(QuantizeError::IndexOutOfRange { index: 2, len: 2 })
        );
    }

    #[test]
    fn empty_shape() {
        let palette: [[u8; 3]; 0] = [];
        let image = reconstruct(&[], &palette, Shape::new(0, 0)).unwrap();
        assert!(image.is_empty());
    }
}
