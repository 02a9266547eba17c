//! A library for compressing images to a small palette of representative colors
//! using mini-batch k-means clustering.
//!
//! Compression happens in three steps:
//! 1. [`vectorize`] flattens a [`PixelBuffer`] into a row-major list of color vectors.
//! 2. [`kmeans::fit`] clusters those vectors into at most `n_clusters` centroids,
//!    updating the centroids from small random batches of pixels each iteration.
//! 3. [`reconstruct`] rebuilds an image of the original shape where every pixel
//!    is replaced with the (rounded) centroid of its cluster.
//!
//! # Features
//! `kpress` has several `cargo` features that can be turned off or on:
//! - `threads`: exposes parallel versions of most functions via [`rayon`].
//! - `image`: enables integration with the [`image`] crate.
//! - `cli`: builds the `kpress` command line tool.
//!
//! # High-Level API
//! To get started with the high-level API, see [`ImagePipeline`].
//! Here is an additional example:
//! ```no_run
//! # use kpress::{ImagePipeline, PaletteSize};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let img = image::open("some image")?.into_rgb8();
//!
//! let pipeline = ImagePipeline::try_from(&img)?
//!     .palette_size(PaletteSize::try_from(32u8)?) // set the max number of colors in the palette
//!     .batch_size(4096) // sample more pixels per iteration
//!     .seed(7);
//!
//! // Run the pipeline in parallel to get an RgbImage
//! let quantized = pipeline.quantized_rgbimage_par()?;
//! # Ok(())
//! # }
//! ```
//!
//! Note that some of the options and functions above require certain features to be enabled.
//!
//! # Logging
//! `kpress` emits [`tracing`] events at the `debug` and `trace` levels.
//! Nothing is printed unless the application installs a subscriber.

#![deny(unsafe_code, unsafe_op_in_unsafe_fn)]
#![warn(
    clippy::pedantic,
    clippy::cargo,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::todo,
    clippy::unimplemented,
    clippy::unwrap_used,
    clippy::unwrap_in_result,
    clippy::expect_used,
    clippy::unneeded_field_pattern,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::unnecessary_self_imports,
    clippy::str_to_string,
    clippy::string_to_string,
    clippy::string_slice,
    missing_docs,
    clippy::missing_docs_in_private_items,
    rustdoc::all,
    clippy::float_cmp_const,
    clippy::lossy_float_literal
)]
#![allow(
    clippy::doc_markdown,
    clippy::module_name_repetitions,
    clippy::many_single_char_names,
    clippy::missing_panics_doc,
    clippy::unreadable_literal,
    clippy::wildcard_imports
)]

mod error;
mod pipeline;
mod reconstruct;
mod traits;
mod types;
mod vectorize;

pub mod kmeans;

pub use error::QuantizeError;
pub use pipeline::{Compressed, ImagePipeline};
pub use reconstruct::reconstruct;
#[cfg(feature = "threads")]
pub use reconstruct::reconstruct_par;
pub use traits::*;
pub use types::*;
pub use vectorize::{vectorize, ColorVectors};

/// The maximum supported image size in number of pixels is `u32::MAX`.
pub const MAX_PIXELS: u32 = u32::MAX;

/// The maximum supported number of palette colors is `256`,
/// since palette indices are stored as `u8`.
pub const MAX_COLORS: u16 = u8::MAX as u16 + 1;
