//! Contains various types needed across the crate.

use crate::{ColorComponents, QuantizeError, MAX_COLORS};
use palette::cast::AsArrays;
use std::{array, fmt::Display};
#[cfg(feature = "image")]
use {
    image::RgbImage,
    palette::{cast::ComponentsAs, Srgb},
};

/// The dimensions of an image in rows and columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape {
    /// The number of rows (the image height).
    pub rows: usize,
    /// The number of columns (the image width).
    pub cols: usize,
}

impl Shape {
    /// Creates a new [`Shape`].
    #[must_use]
    pub const fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    /// Returns the number of pixels, or `None` if `rows * cols` overflows.
    #[must_use]
    pub const fn checked_len(&self) -> Option<usize> {
        self.rows.checked_mul(self.cols)
    }

    /// Returns the number of pixels, saturating at `usize::MAX`.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.rows.saturating_mul(self.cols)
    }

    /// Returns whether the shape contains no pixels.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }
}

impl Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

/// A 2D grid of pixels with `N` channels each, stored in row-major order.
///
/// Every pixel is an `[u8; N]`, so all pixels are guaranteed to have the same
/// number of channels. The number of pixels always equals `rows * cols`.
///
/// # Examples
/// From interleaved channel bytes:
/// ```
/// # use kpress::{PixelBuffer, QuantizeError};
/// # fn main() -> Result<(), QuantizeError> {
/// let bytes = vec![0, 0, 0, 255, 255, 255];
/// let buffer = PixelBuffer::<3>::from_raw(1, 2, &bytes)?;
/// assert_eq!(buffer.pixels(), &[[0, 0, 0], [255, 255, 255]]);
/// # Ok(())
/// # }
/// ```
///
/// From `palette` colors:
/// ```
/// # use kpress::{PixelBuffer, QuantizeError};
/// # use palette::Srgb;
/// # fn main() -> Result<(), QuantizeError> {
/// let colors = vec![Srgb::new(1u8, 2, 3); 4];
/// let buffer = PixelBuffer::from_colors(2, 2, &colors)?;
/// assert_eq!(buffer.len(), 4);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PixelBuffer<const N: usize> {
    /// The dimensions of the buffer.
    shape: Shape,
    /// The pixels in row-major order.
    pixels: Vec<[u8; N]>,
}

impl<const N: usize> PixelBuffer<N> {
    /// Returns the [`QuantizeError::InvalidShape`] error for the given dimensions.
    const fn invalid_shape(shape: Shape, len: usize) -> QuantizeError {
        QuantizeError::InvalidShape {
            rows: shape.rows,
            cols: shape.cols,
            channels: N,
            len,
        }
    }

    /// Creates a new [`PixelBuffer`] from a row-major list of pixels.
    ///
    /// # Errors
    /// Returns [`QuantizeError::InvalidShape`] if `pixels.len() != rows * cols`.
    pub fn new(rows: usize, cols: usize, pixels: Vec<[u8; N]>) -> Result<Self, QuantizeError> {
        let shape = Shape::new(rows, cols);
        if shape.checked_len() == Some(pixels.len()) {
            Ok(Self { shape, pixels })
        } else {
            Err(Self::invalid_shape(shape, pixels.len()))
        }
    }

    /// Creates a new [`PixelBuffer`] from interleaved channel values in row-major order.
    ///
    /// # Errors
    /// Returns [`QuantizeError::InvalidShape`] if `N` is zero
    /// or if `bytes.len() != rows * cols * N`.
    pub fn from_raw(rows: usize, cols: usize, bytes: &[u8]) -> Result<Self, QuantizeError> {
        let shape = Shape::new(rows, cols);
        let expected = shape.checked_len().and_then(|len| len.checked_mul(N));
        if N == 0 || expected != Some(bytes.len()) {
            return Err(Self::invalid_shape(shape, bytes.len()));
        }

        let pixels = bytes
            .chunks_exact(N)
            .map(|chunk| array::from_fn(|i| chunk[i]))
            .collect();

        Ok(Self { shape, pixels })
    }

    /// Creates a new [`PixelBuffer`] from a row-major slice of `palette` colors.
    ///
    /// # Errors
    /// Returns [`QuantizeError::InvalidShape`] if `colors.len() != rows * cols`.
    pub fn from_colors<Color>(
        rows: usize,
        cols: usize,
        colors: &[Color],
    ) -> Result<Self, QuantizeError>
    where
        Color: ColorComponents<u8, N>,
    {
        let arrays: &[[u8; N]] = colors.as_arrays();
        Self::new(rows, cols, arrays.to_vec())
    }

    /// Returns the dimensions of the buffer.
    #[must_use]
    pub const fn shape(&self) -> Shape {
        self.shape
    }

    /// Returns the number of rows.
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.shape.rows
    }

    /// Returns the number of columns.
    #[must_use]
    pub const fn cols(&self) -> usize {
        self.shape.cols
    }

    /// Returns the number of channels per pixel.
    #[must_use]
    pub const fn channels(&self) -> usize {
        N
    }

    /// Returns the number of pixels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    /// Returns whether the buffer has no pixels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Returns the pixels in row-major order.
    #[must_use]
    pub fn pixels(&self) -> &[[u8; N]] {
        &self.pixels
    }

    /// Returns the pixel at the given row and column, if it is in bounds.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<[u8; N]> {
        if row < self.rows() && col < self.cols() {
            self.pixels.get(row * self.cols() + col).copied()
        } else {
            None
        }
    }

    /// Consumes the buffer and returns its pixels in row-major order.
    #[must_use]
    pub fn into_pixels(self) -> Vec<[u8; N]> {
        self.pixels
    }

    /// Consumes the buffer and returns its interleaved channel values in row-major order.
    #[must_use]
    pub fn into_raw(self) -> Vec<u8> {
        self.pixels.into_iter().flatten().collect()
    }
}

#[cfg(feature = "image")]
impl TryFrom<&RgbImage> for PixelBuffer<3> {
    type Error = QuantizeError;

    fn try_from(image: &RgbImage) -> Result<Self, Self::Error> {
        let (width, height) = image.dimensions();
        let pixels = image.pixels().len();
        let buf = &image.as_raw()[..(pixels * 3)];
        let colors: &[Srgb<u8>] = buf.components_as();
        Self::from_colors(height as usize, width as usize, colors)
    }
}

#[cfg(feature = "image")]
impl TryFrom<PixelBuffer<3>> for RgbImage {
    type Error = QuantizeError;

    fn try_from(buffer: PixelBuffer<3>) -> Result<Self, Self::Error> {
        let shape = buffer.shape();
        let len = buffer.len();
        let invalid = || PixelBuffer::<3>::invalid_shape(shape, len);

        let width = u32::try_from(shape.cols).map_err(|_| invalid())?;
        let height = u32::try_from(shape.rows).map_err(|_| invalid())?;
        RgbImage::from_vec(width, height, buffer.into_raw()).ok_or_else(invalid)
    }
}

/// This type is used to specify the (maximum) number of colors to include in a palette.
///
/// This is a simple new type wrapper around `u16` with the invariant that it must be
/// in the range `1..=MAX_COLORS`.
///
/// # Examples
/// Use `try_into` or [`PaletteSize::from_clamped`] to create [`PaletteSize`]s.
/// ```
/// # use kpress::{PaletteSize, QuantizeError};
/// # fn main() -> Result<(), QuantizeError> {
/// let size = PaletteSize::try_from(16u8)?;
/// let size: PaletteSize = 128u16.try_into()?;
/// let size = PaletteSize::from_clamped(1024);
/// assert_eq!(size, PaletteSize::MAX);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct PaletteSize(u16);

impl PaletteSize {
    /// The maximum supported palette size (given by [`MAX_COLORS`]).
    pub const MAX: Self = Self(MAX_COLORS);

    /// The smallest palette size, a single color.
    pub const MIN: Self = Self(1);

    /// The default palette size of `16` colors.
    pub const DEFAULT: Self = Self(16);

    /// Gets the inner `u16` value.
    #[must_use]
    pub const fn into_inner(self) -> u16 {
        self.0
    }

    /// Creates a [`PaletteSize`] by clamping the given `u16` to the range `1..=MAX_COLORS`.
    #[must_use]
    pub const fn from_clamped(value: u16) -> Self {
        if value == 0 {
            Self::MIN
        } else if value <= MAX_COLORS {
            Self(value)
        } else {
            Self::MAX
        }
    }

    /// Returns the palette size as a `usize` for lengths and indexing.
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl Default for PaletteSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<PaletteSize> for u16 {
    fn from(val: PaletteSize) -> Self {
        val.into_inner()
    }
}

impl TryFrom<u16> for PaletteSize {
    type Error = QuantizeError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        if (1..=MAX_COLORS).contains(&value) {
            Ok(PaletteSize(value))
        } else {
            Err(QuantizeError::InvalidPaletteSize(value))
        }
    }
}

impl TryFrom<u8> for PaletteSize {
    type Error = QuantizeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        u16::from(value).try_into()
    }
}

impl Display for PaletteSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.into_inner())
    }
}

/// The indexed result of quantizing an image.
///
/// It contains the color `palette` for the image, alongside `counts` which has
/// the number of pixels assigned to each palette color.
/// `indices` contains an index into `palette` for each pixel in row-major order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantizeOutput<Color> {
    /// The computed color palette that is representative of the colors in the image.
    ///
    /// Its length is the effective number of clusters, which may be
    /// less than the requested [`PaletteSize`] for images with few distinct colors.
    pub palette: Vec<Color>,
    /// The number of pixels that were assigned to each color in `palette`.
    ///
    /// Each count is not guaranteed to be non-zero.
    pub counts: Vec<u32>,
    /// The remapped image, where each pixel is replaced with an index into `palette`.
    pub indices: Vec<u8>,
}

impl<Color> Default for QuantizeOutput<Color> {
    fn default() -> Self {
        Self {
            palette: Vec::new(),
            counts: Vec::new(),
            indices: Vec::new(),
        }
    }
}
