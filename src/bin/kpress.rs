#![deny(unsafe_code, unsafe_op_in_unsafe_fn)]
#![warn(
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::todo,
    clippy::unimplemented,
    clippy::unneeded_field_pattern,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::unnecessary_self_imports,
    clippy::str_to_string,
    clippy::string_to_string,
    clippy::string_slice
)]

use std::{fmt::Display, path::PathBuf, time::Instant};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use kpress::{
    kmeans::{Init, DEFAULT_BATCH_SIZE, DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE},
    ImagePipeline, PaletteSize,
};
use tracing_subscriber::EnvFilter;

#[derive(Copy, Clone, ValueEnum)]
enum CliInit {
    Sample,
    PlusPlus,
}

impl From<CliInit> for Init {
    fn from(value: CliInit) -> Self {
        match value {
            CliInit::Sample => Init::Sample,
            CliInit::PlusPlus => Init::PlusPlus,
        }
    }
}

impl Display for CliInit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                CliInit::Sample => "sample",
                CliInit::PlusPlus => "plus-plus",
            }
        )
    }
}

/// Compress an image to a small palette of colors using mini-batch k-means.
#[derive(Parser)]
#[command(author, version, about)]
struct Options {
    /// The image to compress
    input: PathBuf,

    /// Where to write the compressed image; the format is picked from the extension
    output: PathBuf,

    /// The maximum number of colors in the palette (1 to 256)
    #[arg(short, long, default_value_t = PaletteSize::default(), value_parser = parse_palette_size)]
    k: PaletteSize,

    /// The number of pixels sampled per iteration
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: u32,

    /// The maximum number of k-means iterations
    #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
    max_iterations: u32,

    /// The seed for the random number generator
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Stop once no centroid moves more than this squared distance in an iteration
    #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
    tolerance: f64,

    /// How to pick the initial centroids
    #[arg(long, default_value_t = CliInit::Sample)]
    init: CliInit,

    /// The number of threads to use; 0 uses every core and 1 runs single-threaded
    #[arg(short, long, default_value_t = 0)]
    threads: u8,

    /// Log stage timings and k-means progress, in addition to any `RUST_LOG` directives
    #[arg(long)]
    verbose: bool,
}

fn parse_palette_size(s: &str) -> Result<PaletteSize, String> {
    let value: u16 = s.parse().map_err(|e| format!("{e}"))?;
    value.try_into().map_err(|e| format!("{e}"))
}

/// Builds the log filter from `RUST_LOG` (if set), with `--verbose` always enabling `kpress=debug`.
fn log_filter(verbose: bool, env: Option<&str>) -> Result<EnvFilter> {
    let mut filter = match env {
        Some(directives) => EnvFilter::try_new(directives)
            .with_context(|| format!("invalid log filter {directives:?}"))?,
        None => EnvFilter::new("kpress=warn"),
    };

    if verbose {
        filter = filter.add_directive("kpress=debug".parse()?);
    }

    Ok(filter)
}

fn init_logging(verbose: bool) -> Result<()> {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(verbose, env.as_deref())?)
        .with_target(false)
        .init();

    Ok(())
}

fn main() -> Result<()> {
    let Options {
        input,
        output,
        k,
        batch_size,
        max_iterations,
        seed,
        tolerance,
        init,
        threads,
        verbose,
    } = Options::parse();

    init_logging(verbose)?;

    macro_rules! timed {
        ($name: literal, $val: expr) => {{
            let time = Instant::now();
            let value = $val;
            tracing::info!(elapsed_ms = time.elapsed().as_millis(), "{} finished", $name);
            value
        }};
    }

    let image = timed!(
        "read image",
        image::open(&input).with_context(|| format!("failed to read {}", input.display()))?
    )
    .into_rgb8();

    let pipeline = ImagePipeline::try_from(&image)
        .with_context(|| format!("{} has no pixels", input.display()))?
        .palette_size(k)
        .batch_size(batch_size)
        .max_iterations(max_iterations)
        .seed(seed)
        .tolerance(tolerance)
        .init(init.into());

    let quantized = timed!(
        "compression",
        match threads {
            0 => pipeline.quantized_rgbimage_par(),
            1 => pipeline.quantized_rgbimage(),
            t => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(t.into())
                    .build()
                    .context("failed to build the thread pool")?;

                pool.install(|| pipeline.quantized_rgbimage_par())
            }
        }
    )
    .context("compression failed")?;

    timed!(
        "write image",
        quantized
            .save(&output)
            .with_context(|| format!("failed to write {}", output.display()))?
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_adds_debug_on_top_of_env() {
        let filter = log_filter(true, Some("warn")).unwrap().to_string();
        assert!(filter.contains("kpress=debug"));
        assert!(filter.contains("warn"));
    }

    #[test]
    fn quiet_defaults() {
        assert!(log_filter(false, None).unwrap().to_string().contains("kpress=warn"));
        assert!(!log_filter(false, Some("info")).unwrap().to_string().contains("kpress"));
    }

    #[test]
    fn invalid_env_filter_is_an_error() {
        assert!(log_filter(false, Some("kpress=loud")).is_err());
    }
}
