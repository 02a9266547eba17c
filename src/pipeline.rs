//! Contains the [`ImagePipeline`] builder struct for the high level API.

use crate::{
    kmeans::{self, Init, KmeansOptions, KmeansOutput},
    reconstruct, vectorize, ColorVectors, PaletteSize, PixelBuffer, QuantizeError,
    QuantizeOutput,
};
#[cfg(feature = "threads")]
use crate::reconstruct_par;
#[cfg(feature = "image")]
use {
    crate::Shape,
    image::RgbImage,
    palette::{
        cast::{AsArrays, ComponentsAs},
        Srgb,
    },
};

/// A builder struct to specify options to compress an image to a smaller palette.
///
/// # Examples
/// To start, create an [`ImagePipeline`] from a [`PixelBuffer`]:
/// ```
/// # use kpress::{ImagePipeline, PixelBuffer, QuantizeError};
/// # fn main() -> Result<(), QuantizeError> {
/// let buffer = PixelBuffer::<3>::from_raw(1, 2, &[0, 0, 0, 255, 255, 255])?;
/// let pipeline = ImagePipeline::new(&buffer)?;
/// # Ok(())
/// # }
/// ```
///
/// Or from an [`RgbImage`] (note that the `image` feature is needed):
/// ```no_run
/// # use kpress::ImagePipeline;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let img = image::open("some image")?.into_rgb8();
/// let pipeline = ImagePipeline::try_from(&img)?;
/// # Ok(())
/// # }
/// ```
///
/// Then, you can change different options like the number of colors in the palette:
/// ```
/// # use kpress::{kmeans::Init, ImagePipeline, PaletteSize, PixelBuffer, QuantizeError};
/// # fn main() -> Result<(), QuantizeError> {
/// # let buffer = PixelBuffer::<3>::from_raw(1, 2, &[0, 0, 0, 255, 255, 255])?;
/// let pipeline = ImagePipeline::new(&buffer)?
///     .palette_size(PaletteSize::try_from(8u8)?)
///     .batch_size(4096)
///     .init(Init::PlusPlus)
///     .seed(42);
/// # Ok(())
/// # }
/// ```
///
/// Finally, run the pipeline:
/// ```
/// # use kpress::{ImagePipeline, PixelBuffer, QuantizeError};
/// # fn main() -> Result<(), QuantizeError> {
/// # let buffer = PixelBuffer::<3>::from_raw(1, 2, &[0, 0, 0, 255, 255, 255])?;
/// # let pipeline = ImagePipeline::new(&buffer)?;
/// let compressed = pipeline.compress()?;
/// assert_eq!(compressed.image, buffer);
/// # Ok(())
/// # }
/// ```
///
/// Or, in parallel across multiple threads (needs the `threads` feature):
/// ```
/// # use kpress::{ImagePipeline, PixelBuffer, QuantizeError};
/// # fn main() -> Result<(), QuantizeError> {
/// # let buffer = PixelBuffer::<3>::from_raw(1, 2, &[0, 0, 0, 255, 255, 255])?;
/// # let pipeline = ImagePipeline::new(&buffer)?;
/// let compressed = pipeline.compress_par()?;
/// # Ok(())
/// # }
/// ```
#[must_use]
#[derive(Debug, Clone, Copy)]
pub struct ImagePipeline<'a, const N: usize> {
    /// The input image as a flat list of color vectors.
    pub(crate) colors: ColorVectors<'a, N>,
    /// The k-means parameters.
    pub(crate) options: KmeansOptions,
}

/// The result of running an [`ImagePipeline`].
#[derive(Debug, Clone, PartialEq)]
pub struct Compressed<const N: usize> {
    /// The reconstructed image, with the same shape as the input.
    pub image: PixelBuffer<N>,
    /// The palette, per-color pixel counts, and per-pixel palette indices.
    pub output: QuantizeOutput<[u8; N]>,
    /// The number of mini-batch iterations that were run.
    pub iterations: u32,
    /// Whether k-means stopped early because the centroids stopped moving.
    pub converged: bool,
}

impl<'a, const N: usize> ImagePipeline<'a, N> {
    /// Creates a new [`ImagePipeline`] with default options.
    ///
    /// # Errors
    /// Returns [`QuantizeError::InvalidShape`] if the buffer has zero channels or zero pixels.
    pub fn new(buffer: &'a PixelBuffer<N>) -> Result<Self, QuantizeError> {
        Ok(Self::from_vectors(vectorize(buffer)?))
    }

    /// Creates a new [`ImagePipeline`] with default options from already flattened colors.
    pub fn from_vectors(colors: ColorVectors<'a, N>) -> Self {
        Self { colors, options: KmeansOptions::new() }
    }

    /// Sets the maximum number of colors in the palette.
    ///
    /// The default is `16`.
    pub fn palette_size(mut self, size: PaletteSize) -> Self {
        self.options = self.options.n_clusters(size);
        self
    }

    /// Sets the number of colors sampled per k-means iteration.
    ///
    /// The default is `1000`.
    pub fn batch_size(mut self, batch_size: u32) -> Self {
        self.options = self.options.batch_size(batch_size);
        self
    }

    /// Sets the maximum number of k-means iterations.
    ///
    /// The default is `100`.
    pub fn max_iterations(mut self, max_iterations: u32) -> Self {
        self.options = self.options.max_iterations(max_iterations);
        self
    }

    /// Sets the seed value for the random number generator.
    ///
    /// The default seed is `0`.
    pub fn seed(mut self, seed: u64) -> Self {
        self.options = self.options.seed(seed);
        self
    }

    /// Sets the k-means convergence threshold.
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.options = self.options.tolerance(tolerance);
        self
    }

    /// Sets the centroid initialization method.
    pub fn init(mut self, init: Init) -> Self {
        self.options = self.options.init(init);
        self
    }

    /// Replaces all k-means options at once.
    pub fn kmeans_options(mut self, options: KmeansOptions) -> Self {
        self.options = options;
        self
    }

    fn finish(
        &self,
        output: KmeansOutput<N>,
        image: impl FnOnce(&[u8], &[[u8; N]]) -> Result<PixelBuffer<N>, QuantizeError>,
    ) -> Result<Compressed<N>, QuantizeError> {
        let KmeansOutput { centroids, assignments, counts, iterations, converged } = output;
        let palette = centroids.rounded();
        let image = image(&assignments, &palette)?;

        tracing::debug!(
            shape = %self.colors.shape(),
            palette = palette.len(),
            iterations,
            converged,
            "compressed image"
        );

        Ok(Compressed {
            image,
            output: QuantizeOutput { palette, counts, indices: assignments },
            iterations,
            converged,
        })
    }

    /// Runs k-means and returns the palette and per-pixel indices without reconstructing the image.
    ///
    /// # Errors
    /// Returns [`QuantizeError::TooManyPixels`] if the image is above [`MAX_PIXELS`](crate::MAX_PIXELS).
    pub fn indexed_palette(&self) -> Result<QuantizeOutput<[u8; N]>, QuantizeError> {
        let output = kmeans::fit(&self.colors, &self.options)?;
        Ok(QuantizeOutput {
            palette: output.palette(),
            counts: output.counts,
            indices: output.assignments,
        })
    }

    /// Runs the pipeline and returns the reconstructed image alongside the palette.
    ///
    /// # Errors
    /// Returns [`QuantizeError::TooManyPixels`] if the image is above [`MAX_PIXELS`](crate::MAX_PIXELS).
    pub fn compress(&self) -> Result<Compressed<N>, QuantizeError> {
        let shape = self.colors.shape();
        let output = kmeans::fit(&self.colors, &self.options)?;
        self.finish(output, |indices, palette| reconstruct(indices, palette, shape))
    }
}

#[cfg(feature = "threads")]
impl<'a, const N: usize> ImagePipeline<'a, N> {
    /// Runs k-means in parallel and returns the palette and per-pixel indices.
    ///
    /// # Errors
    /// Returns [`QuantizeError::TooManyPixels`] if the image is above [`MAX_PIXELS`](crate::MAX_PIXELS).
    pub fn indexed_palette_par(&self) -> Result<QuantizeOutput<[u8; N]>, QuantizeError> {
        let output = kmeans::fit_par(&self.colors, &self.options)?;
        Ok(QuantizeOutput {
            palette: output.palette(),
            counts: output.counts,
            indices: output.assignments,
        })
    }

    /// Runs the pipeline in parallel and returns the reconstructed image alongside the palette.
    ///
    /// The result is identical to [`ImagePipeline::compress`].
    ///
    /// # Errors
    /// Returns [`QuantizeError::TooManyPixels`] if the image is above [`MAX_PIXELS`](crate::MAX_PIXELS).
    pub fn compress_par(&self) -> Result<Compressed<N>, QuantizeError> {
        let shape = self.colors.shape();
        let output = kmeans::fit_par(&self.colors, &self.options)?;
        self.finish(output, |indices, palette| reconstruct_par(indices, palette, shape))
    }
}

#[cfg(feature = "image")]
impl<'a> TryFrom<&'a RgbImage> for ImagePipeline<'a, 3> {
    type Error = QuantizeError;

    fn try_from(image: &'a RgbImage) -> Result<Self, Self::Error> {
        let (width, height) = image.dimensions();
        let pixels = image.pixels().len();
        let buf = &image.as_raw()[..(pixels * 3)];
        let colors: &[Srgb<u8>] = buf.components_as();
        let colors: &[[u8; 3]] = colors.as_arrays();
        let colors = ColorVectors::new(colors, Shape::new(height as usize, width as usize))?;
        Ok(Self::from_vectors(colors))
    }
}

#[cfg(feature = "image")]
impl<'a> ImagePipeline<'a, 3> {
    /// Runs the pipeline and returns the quantized image.
    ///
    /// # Errors
    /// Returns [`QuantizeError::TooManyPixels`] if the image is above [`MAX_PIXELS`](crate::MAX_PIXELS).
    pub fn quantized_rgbimage(&self) -> Result<RgbImage, QuantizeError> {
        self.compress()?.image.try_into()
    }

    /// Runs the pipeline in parallel and returns the quantized image.
    ///
    /// # Errors
    /// Returns [`QuantizeError::TooManyPixels`] if the image is above [`MAX_PIXELS`](crate::MAX_PIXELS).
    #[cfg(feature = "threads")]
    pub fn quantized_rgbimage_par(&self) -> Result<RgbImage, QuantizeError> {
        self.compress_par()?.image.try_into()
    }
}
