// The mini-batch k-means implementation here is based upon the following paper:
//
// Sculley, D. Web-scale k-means clustering.
// Proceedings of the 19th International Conference on World Wide Web, 1177–1178, 2010.
// https://doi.org/10.1145/1772690.1772862
//
// Each centroid keeps a lifetime count of the samples assigned to it, and every batch moves the
// centroid toward the batch mean with a rate of (batch count / lifetime count). This keeps each
// centroid equal to the running mean of every sample it has ever been assigned.

//! Color clustering using mini-batch k-means.
//!
//! The main entry point is [`fit`] (or [`fit_par`] with the `threads` feature),
//! which clusters a list of color vectors and returns a [`KmeansOutput`].
//!
//! All centroid arithmetic is done in `f64`.
//! Centroids are only rounded and clamped to integer channel values when exporting a palette
//! (see [`Centroids::palette`]).
//!
//! # Examples
//! ```
//! # use kpress::{kmeans::{self, KmeansOptions}, QuantizeError};
//! # fn main() -> Result<(), QuantizeError> {
//! let colors = [[0, 0, 0], [0, 0, 0], [255, 255, 255], [255, 255, 255]];
//! let options = KmeansOptions::new().n_clusters(2u8.try_into()?).seed(7);
//! let output = kmeans::fit(&colors, &options)?;
//!
//! assert_eq!(output.num_clusters(), 2);
//! assert_eq!(output.assignments[0], output.assignments[1]);
//! assert_ne!(output.assignments[0], output.assignments[2]);
//! # Ok(())
//! # }
//! ```

use crate::{ColorComponents, PaletteSize, QuantizeError, QuantizeOutput, MAX_PIXELS};

use std::collections::{HashMap, HashSet};

use num_traits::AsPrimitive;
use palette::cast;
use rand::{prelude::Distribution, Rng, SeedableRng};
use rand_distr::{weighted_alias::WeightedAliasIndex, Uniform};
use rand_xoshiro::Xoroshiro128PlusPlus;

#[cfg(feature = "threads")]
use rayon::prelude::*;

/// The default number of colors sampled per iteration.
pub const DEFAULT_BATCH_SIZE: u32 = 1000;

/// The default maximum number of mini-batch iterations.
pub const DEFAULT_MAX_ITERATIONS: u32 = 100;

/// The default convergence threshold on the largest squared centroid shift in one iteration.
pub const DEFAULT_TOLERANCE: f64 = 1e-4;

/// The number of consecutive sampled batches that must stay within the tolerance
/// before iteration stops early.
const CALM_BATCHES: u32 = 10;

/// The method used to pick the initial centroids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Init {
    /// Sample pixels without replacement using the seeded generator,
    /// skipping any pixel whose color was already picked.
    ///
    /// Colors are picked with probability proportional to how often they occur in the image.
    #[default]
    Sample,
    /// k-means++ seeding: after a uniformly sampled first pixel, each subsequent centroid is
    /// picked with probability proportional to its squared distance to the nearest chosen centroid.
    ///
    /// This spreads the initial centroids out, at the cost of one pass over the pixels per centroid.
    PlusPlus,
}

/// A builder struct to specify the parameters for k-means.
///
/// # Examples
/// ```
/// # use kpress::{kmeans::{Init, KmeansOptions}, PaletteSize};
/// let options = KmeansOptions::new()
///     .n_clusters(PaletteSize::from_clamped(32))
///     .batch_size(2048)
///     .max_iterations(50)
///     .init(Init::PlusPlus)
///     .seed(42);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KmeansOptions {
    /// The requested number of clusters.
    n_clusters: PaletteSize,
    /// The number of colors sampled per iteration.
    batch_size: u32,
    /// The maximum number of mini-batch iterations.
    max_iterations: u32,
    /// The seed value for the random number generator.
    seed: u64,
    /// The convergence threshold on the largest squared centroid shift.
    tolerance: f64,
    /// The centroid initialization method.
    init: Init,
}

impl Default for KmeansOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl KmeansOptions {
    /// Creates a new [`KmeansOptions`] with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            n_clusters: PaletteSize::DEFAULT,
            batch_size: DEFAULT_BATCH_SIZE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            seed: 0,
            tolerance: DEFAULT_TOLERANCE,
            init: Init::Sample,
        }
    }

    /// Sets the requested number of clusters, i.e., the maximum palette size.
    ///
    /// If the input has fewer distinct colors, the number of clusters is reduced
    /// to the number of distinct colors.
    ///
    /// The default is `16`.
    #[must_use]
    pub const fn n_clusters(mut self, n_clusters: PaletteSize) -> Self {
        self.n_clusters = n_clusters;
        self
    }

    /// Sets the number of colors sampled per iteration.
    ///
    /// If the batch size is at least the number of input colors,
    /// each iteration uses every color instead of sampling.
    /// A batch size of `0` is treated as `1`.
    ///
    /// The default batch size is `1000`.
    #[must_use]
    pub const fn batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the maximum number of mini-batch iterations.
    ///
    /// With `0` iterations, the initial centroids are used as-is.
    ///
    /// The default is `100`.
    #[must_use]
    pub const fn max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets the seed value for the random number generator.
    ///
    /// The default seed is `0`.
    #[must_use]
    pub const fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the convergence threshold. Iteration stops early once no centroid moved
    /// more than this squared distance (in channel units) during an iteration.
    ///
    /// When batches are sampled, a single batch can leave every centroid in place by chance,
    /// so the shift has to stay within the threshold for 10 consecutive iterations instead.
    /// With full batches one iteration is enough.
    ///
    /// Negative or `NAN` tolerances disable early stopping.
    ///
    /// The default is `1e-4`.
    #[must_use]
    pub const fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the centroid initialization method.
    ///
    /// The default is [`Init::Sample`].
    #[must_use]
    pub const fn init(mut self, init: Init) -> Self {
        self.init = init;
        self
    }
}

/// The floating point cluster centers computed by k-means.
#[derive(Debug, Clone, PartialEq)]
#[repr(transparent)]
pub struct Centroids<const N: usize>(Vec<[f64; N]>);

impl<const N: usize> Centroids<N> {
    /// Returns the inner `Vec` of centroids.
    #[must_use]
    pub fn into_inner(self) -> Vec<[f64; N]> {
        self.0
    }

    /// Returns a slice of the centroids.
    #[must_use]
    pub fn as_slice(&self) -> &[[f64; N]] {
        &self.0
    }

    /// Returns the centroids rounded to the nearest integer and clamped to `[0, 255]`.
    #[must_use]
    pub fn rounded(&self) -> Vec<[u8; N]> {
        self.0
            .iter()
            .map(|centroid| centroid.map(|c| -> u8 { c.round().clamp(0.0, 255.0).as_() }))
            .collect()
    }

    /// Returns the rounded centroids as `palette` colors.
    #[must_use]
    pub fn palette<Color>(&self) -> Vec<Color>
    where
        Color: ColorComponents<u8, N>,
    {
        self.rounded().into_iter().map(cast::from_array).collect()
    }
}

impl<const N: usize> From<Centroids<N>> for Vec<[f64; N]> {
    fn from(value: Centroids<N>) -> Self {
        value.into_inner()
    }
}

/// The output of a k-means run.
#[derive(Debug, Clone, PartialEq)]
pub struct KmeansOutput<const N: usize> {
    /// The final cluster centers.
    ///
    /// Its length is the effective number of clusters: the requested number of clusters,
    /// or the number of distinct input colors if that is smaller.
    pub centroids: Centroids<N>,
    /// The index of the nearest centroid for each input color, in input order.
    pub assignments: Vec<u8>,
    /// The number of input colors assigned to each centroid.
    pub counts: Vec<u32>,
    /// The number of mini-batch iterations that were run.
    pub iterations: u32,
    /// Whether iteration stopped because the centroids moved less than the tolerance.
    pub converged: bool,
}

impl<const N: usize> KmeansOutput<N> {
    /// Returns the effective number of clusters.
    #[must_use]
    pub fn num_clusters(&self) -> usize {
        self.centroids.0.len()
    }

    /// Returns the rounded integer palette.
    #[must_use]
    pub fn palette(&self) -> Vec<[u8; N]> {
        self.centroids.rounded()
    }

    /// Returns the mean squared distance of each color to its assigned (unrounded) centroid.
    ///
    /// `colors` should be the same colors that were passed to [`fit`].
    /// If the lengths differ, only the common prefix is measured.
    #[must_use]
    pub fn mean_squared_error(&self, colors: &[[u8; N]]) -> f64 {
        mean_squared_error(self.centroids.as_slice(), &self.assignments, colors)
    }

    /// Converts this output into a [`QuantizeOutput`] with the palette as `palette` colors.
    #[must_use]
    pub fn into_quantize_output<Color>(self) -> QuantizeOutput<Color>
    where
        Color: ColorComponents<u8, N>,
    {
        QuantizeOutput {
            palette: self.centroids.palette(),
            counts: self.counts,
            indices: self.assignments,
        }
    }
}

#[inline]
fn to_f64<const N: usize>(color: [u8; N]) -> [f64; N] {
    color.map(f64::from)
}

#[inline]
pub(crate) fn squared_euclidean_distance<const N: usize>(x: [f64; N], y: [f64; N]) -> f64 {
    let mut dist = 0.0;
    for c in 0..N {
        let d = x[c] - y[c];
        dist += d * d;
    }
    dist
}

/// Returns the index of the centroid closest to `color`, preferring the lowest index on ties.
#[inline]
fn nearest<const N: usize>(centroids: &[[f64; N]], color: [f64; N]) -> u8 {
    let mut min_index = 0;
    let mut min_distance = f64::INFINITY;
    for (i, &centroid) in centroids.iter().enumerate() {
        let distance = squared_euclidean_distance(centroid, color);
        if distance < min_distance {
            min_distance = distance;
            min_index = i;
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    {
        // there are at most MAX_COLORS centroids
        min_index as u8
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean_squared_error<const N: usize>(
    centroids: &[[f64; N]],
    assignments: &[u8],
    colors: &[[u8; N]],
) -> f64 {
    let len = colors.len().min(assignments.len());
    if len == 0 {
        return 0.0;
    }

    let total = colors
        .iter()
        .zip(assignments)
        .map(|(&color, &i)| squared_euclidean_distance(to_f64(color), centroids[usize::from(i)]))
        .sum::<f64>();

    total / len as f64
}

/// Returns the number of distinct colors, stopping early once `limit` is reached.
fn count_distinct<const N: usize>(colors: &[[u8; N]], limit: usize) -> usize {
    let mut distinct = HashSet::new();
    for &color in colors {
        if distinct.insert(color) && distinct.len() >= limit {
            break;
        }
    }
    distinct.len()
}

/// Picks `k` distinct colors by walking a lazily shuffled permutation of `colors`.
///
/// `k` must not exceed the number of distinct colors.
fn sample_init<const N: usize>(
    colors: &[[u8; N]],
    k: usize,
    rng: &mut Xoroshiro128PlusPlus,
) -> Vec<[f64; N]> {
    let n = colors.len();
    let mut chosen = Vec::<[u8; N]>::with_capacity(k);

    // sparse Fisher-Yates: only positions that were swapped are stored
    let mut swapped = HashMap::<usize, usize>::new();

    for i in 0..n {
        if chosen.len() >= k {
            break;
        }

        let j = rng.gen_range(i..n);
        let pick = swapped.get(&j).copied().unwrap_or(j);
        let displaced = swapped.get(&i).copied().unwrap_or(i);
        swapped.insert(j, displaced);

        let color = colors[pick];
        if !chosen.contains(&color) {
            chosen.push(color);
        }
    }

    chosen.into_iter().map(to_f64).collect()
}

/// k-means++ seeding over every color.
fn plus_plus_init<const N: usize>(
    colors: &[[u8; N]],
    k: usize,
    rng: &mut Xoroshiro128PlusPlus,
) -> Vec<[f64; N]> {
    let mut centroids = Vec::with_capacity(k);
    let first = to_f64(colors[rng.gen_range(0..colors.len())]);
    centroids.push(first);

    let mut distances = colors
        .iter()
        .map(|&color| squared_euclidean_distance(to_f64(color), first))
        .collect::<Vec<_>>();

    while centroids.len() < k {
        // WeightedAliasIndex::new fails if every remaining distance is zero,
        // meaning there are no more distinct colors to pick from.
        let distribution = match WeightedAliasIndex::new(distances.clone()) {
            Ok(distribution) => distribution,
            Err(_) => break,
        };

        let next = to_f64(colors[distribution.sample(rng)]);
        for (distance, &color) in distances.iter_mut().zip(colors) {
            *distance = distance.min(squared_euclidean_distance(to_f64(color), next));
        }

        centroids.push(next);
    }

    centroids
}

/// Folds the batch into the per-centroid running means.
///
/// `counts[i]` is the number of samples ever assigned to centroid `i`, including this batch.
/// Centroids without any samples in the batch are left untouched.
/// Returns the largest squared distance moved by any centroid.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn update_centroids<const N: usize>(
    centroids: &mut [[f64; N]],
    counts: &mut [u64],
    batch: &[[f64; N]],
    assignments: &[u8],
) -> f64 {
    let mut sums = vec![[0.0; N]; centroids.len()];
    let mut batch_counts = vec![0u64; centroids.len()];

    for (color, &i) in batch.iter().zip(assignments) {
        let i = usize::from(i);
        batch_counts[i] += 1;
        for (sum, c) in sums[i].iter_mut().zip(color) {
            *sum += c;
        }
    }

    let mut max_shift = 0.0f64;
    for ((centroid, count), (sum, batch_count)) in centroids
        .iter_mut()
        .zip(counts)
        .zip(sums.into_iter().zip(batch_counts))
    {
        if batch_count == 0 {
            continue;
        }

        *count += batch_count;
        let rate = batch_count as f64 / *count as f64;
        let previous = *centroid;

        for c in 0..N {
            let mean = sum[c] / batch_count as f64;
            centroid[c] += rate * (mean - centroid[c]);
        }

        max_shift = max_shift.max(squared_euclidean_distance(previous, *centroid));
    }

    max_shift
}

fn assign_batch<const N: usize>(centroids: &[[f64; N]], batch: &[[f64; N]], assignments: &mut [u8]) {
    for (assignment, &color) in assignments.iter_mut().zip(batch) {
        *assignment = nearest(centroids, color);
    }
}

#[cfg(feature = "threads")]
fn assign_batch_par<const N: usize>(
    centroids: &[[f64; N]],
    batch: &[[f64; N]],
    assignments: &mut [u8],
) {
    assignments
        .par_iter_mut()
        .zip(batch.par_iter())
        .for_each(|(assignment, &color)| *assignment = nearest(centroids, color));
}

struct State<'a, const N: usize> {
    colors: &'a [[u8; N]],
    rng: Xoroshiro128PlusPlus,
    centroids: Vec<[f64; N]>,
    counts: Vec<u64>,
}

impl<'a, const N: usize> State<'a, N> {
    fn new(colors: &'a [[u8; N]], options: &KmeansOptions) -> Self {
        let requested = options.n_clusters.as_usize();
        let k = count_distinct(colors, requested);
        if k < requested {
            tracing::debug!(requested, effective = k, "fewer distinct colors than clusters");
        }

        let mut rng = Xoroshiro128PlusPlus::seed_from_u64(options.seed);
        let centroids = match options.init {
            Init::Sample => sample_init(colors, k, &mut rng),
            Init::PlusPlus => plus_plus_init(colors, k, &mut rng),
        };

        Self {
            colors,
            rng,
            counts: vec![0; centroids.len()],
            centroids,
        }
    }

    fn minibatch_kmeans(
        &mut self,
        options: &KmeansOptions,
        assign: impl Fn(&[[f64; N]], &[[f64; N]], &mut [u8]),
    ) -> (u32, bool) {
        let Self { colors, rng, centroids, counts } = self;

        let n = colors.len();
        let batch_size = (options.batch_size.max(1) as usize).min(n);
        let full_batch = batch_size == n;
        let distribution = Uniform::new(0, n);

        let patience = if full_batch { 1 } else { CALM_BATCHES };
        let mut calm = 0;

        let mut batch = Vec::with_capacity(batch_size);
        let mut assignments = vec![0; batch_size];

        for iteration in 1..=options.max_iterations {
            batch.clear();
            if full_batch {
                batch.extend(colors.iter().map(|&color| to_f64(color)));
            } else {
                batch.extend((0..batch_size).map(|_| to_f64(colors[distribution.sample(rng)])));
            }

            assign(centroids.as_slice(), batch.as_slice(), assignments.as_mut_slice());
            let shift = update_centroids(centroids, counts, &batch, &assignments);
            tracing::trace!(iteration, shift, "mini-batch update");

            if shift <= options.tolerance {
                calm += 1;
                if calm >= patience {
                    return (iteration, true);
                }
            } else {
                calm = 0;
            }
        }

        (options.max_iterations, false)
    }

    fn into_output(self, assignments: Vec<u8>, iterations: u32, converged: bool) -> KmeansOutput<N> {
        let mut counts = vec![0u32; self.centroids.len()];
        for &i in &assignments {
            counts[usize::from(i)] += 1;
        }

        KmeansOutput {
            centroids: Centroids(self.centroids),
            assignments,
            counts,
            iterations,
            converged,
        }
    }

    fn indices(&self) -> Vec<u8> {
        self.colors
            .iter()
            .map(|&color| nearest(&self.centroids, to_f64(color)))
            .collect()
    }
}

#[cfg(feature = "threads")]
impl<'a, const N: usize> State<'a, N> {
    fn indices_par(&self) -> Vec<u8> {
        self.colors
            .par_iter()
            .map(|&color| nearest(&self.centroids, to_f64(color)))
            .collect()
    }
}

fn check_input<const N: usize>(colors: &[[u8; N]]) -> Result<(), QuantizeError> {
    if colors.is_empty() {
        Err(QuantizeError::EmptyInput)
    } else if colors.len() > MAX_PIXELS as usize {
        Err(QuantizeError::TooManyPixels(colors.len()))
    } else {
        Ok(())
    }
}

/// Clusters `colors` with mini-batch k-means.
///
/// Every color is assigned to its nearest final centroid in a full pass at the end,
/// so `assignments` always has one entry per input color.
/// The run is fully determined by `colors` and `options`.
///
/// # Errors
/// Returns [`QuantizeError::EmptyInput`] if `colors` is empty,
/// or [`QuantizeError::TooManyPixels`] if it has more than [`MAX_PIXELS`] colors.
pub fn fit<const N: usize>(
    colors: &[[u8; N]],
    options: &KmeansOptions,
) -> Result<KmeansOutput<N>, QuantizeError> {
    check_input(colors)?;

    let mut state = State::new(colors, options);
    let (iterations, converged) = state.minibatch_kmeans(options, assign_batch::<N>);
    let indices = state.indices();

    tracing::debug!(
        colors = colors.len(),
        clusters = state.centroids.len(),
        iterations,
        converged,
        "k-means finished"
    );

    Ok(state.into_output(indices, iterations, converged))
}

/// Clusters `colors` with mini-batch k-means, assigning colors to centroids in parallel.
///
/// Batches are drawn and centroids are updated sequentially,
/// so the result is identical to [`fit`] for the same input and options.
///
/// # Errors
/// Returns [`QuantizeError::EmptyInput`] if `colors` is empty,
/// or [`QuantizeError::TooManyPixels`] if it has more than [`MAX_PIXELS`] colors.
#[cfg(feature = "threads")]
pub fn fit_par<const N: usize>(
    colors: &[[u8; N]],
    options: &KmeansOptions,
) -> Result<KmeansOutput<N>, QuantizeError> {
    check_input(colors)?;

    let mut state = State::new(colors, options);
    let (iterations, converged) = state.minibatch_kmeans(options, assign_batch_par::<N>);
    let indices = state.indices_par();

    tracing::debug!(
        colors = colors.len(),
        clusters = state.centroids.len(),
        iterations,
        converged,
        "parallel k-means finished"
    );

    Ok(state.into_output(indices, iterations, converged))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::tests::*;
    use ordered_float::OrderedFloat;
    use palette::Srgb;

    fn options(k: u16) -> KmeansOptions {
        KmeansOptions::new().n_clusters(PaletteSize::try_from(k).unwrap())
    }

    fn assert_valid(output: &KmeansOutput<3>, colors: &[[u8; 3]], k: usize) {
        assert_eq!(output.assignments.len(), colors.len());
        assert!(output.num_clusters() <= k);
        assert_eq!(output.palette().len(), output.num_clusters());
        assert!(output
            .assignments
            .iter()
            .all(|&i| usize::from(i) < output.num_clusters()));
        assert_eq!(output.counts.iter().sum::<u32>() as usize, colors.len());
    }

    #[test]
    fn empty_input() {
        let colors: &[[u8; 3]] = &[];
        assert_eq!(fit(colors, &options(16)), Err(QuantizeError::EmptyInput));
        #[cfg(feature = "threads")]
        assert_eq!(fit_par(colors, &options(16)), Err(QuantizeError::EmptyInput));
    }

    #[test]
    fn nearest_breaks_ties_by_lowest_index() {
        let centroids = [[10.0, 0.0, 0.0], [0.0, 10.0, 0.0], [10.0, 0.0, 0.0]];
        assert_eq!(nearest(&centroids, [5.0, 5.0, 0.0]), 0);
        assert_eq!(nearest(&centroids, [0.0, 9.0, 0.0]), 1);
        assert_eq!(nearest(&centroids, [10.0, 0.0, 0.0]), 0);
    }

    #[test]
    fn update_is_running_mean() {
        let mut centroids = [[0.0, 0.0, 0.0], [100.0, 100.0, 100.0]];
        let mut counts = [0, 0];

        let batch = [[10.0, 20.0, 30.0], [30.0, 40.0, 50.0]];
        let shift = update_centroids(&mut centroids, &mut counts, &batch, &[0, 0]);
        assert_eq!(centroids[0], [20.0, 30.0, 40.0]);
        assert_eq!(shift, 20.0 * 20.0 + 30.0 * 30.0 + 40.0 * 40.0);
        assert_eq!(counts, [2, 0]);

        // untouched centroids keep their value
        assert_eq!(centroids[1], [100.0, 100.0, 100.0]);

        // mean of all four samples ever assigned
        let batch = [[0.0, 0.0, 0.0], [40.0, 40.0, 40.0]];
        update_centroids(&mut centroids, &mut counts, &batch, &[0, 0]);
        assert_eq!(centroids[0], [20.0, 25.0, 30.0]);
        assert_eq!(counts, [4, 0]);
    }

    #[test]
    fn two_color_scenario() {
        let colors = two_color_4x4();
        let options = options(2).batch_size(16);
        let output = fit(&colors, &options).unwrap();

        assert_valid(&output, &colors, 2);
        assert!(output.converged);
        assert!(output.iterations <= 3);

        let mut palette = output.palette();
        palette.sort_unstable();
        assert_eq!(palette, vec![[0, 0, 0], [255, 255, 255]]);

        let palette = output.palette();
        for (&color, &i) in colors.iter().zip(&output.assignments) {
            assert_eq!(palette[usize::from(i)], color);
        }
        assert_eq!(output.counts, vec![8, 8]);
    }

    #[test]
    fn single_color_caps_clusters() {
        let colors = vec![[12, 34, 56]; 100];
        let output = fit(&colors, &options(16)).unwrap();

        assert_eq!(output.num_clusters(), 1);
        assert_eq!(output.palette(), vec![[12, 34, 56]]);
        assert!(output.assignments.iter().all(|&i| i == 0));
    }

    #[test]
    fn few_distinct_colors_caps_clusters() {
        let distinct = [[0, 0, 0], [255, 0, 0], [0, 255, 0], [0, 0, 255], [9, 9, 9]];
        let colors = (0..500).map(|i| distinct[i % 5]).collect::<Vec<_>>();

        for init in [Init::Sample, Init::PlusPlus] {
            let output = fit(&colors, &options(16).init(init)).unwrap();
            assert_valid(&output, &colors, 16);
            assert_eq!(output.num_clusters(), 5);

            let mut palette = output.palette();
            palette.sort_unstable();
            let mut expected = distinct.to_vec();
            expected.sort_unstable();
            assert_eq!(palette, expected);
        }
    }

    #[test]
    fn single_cluster_is_mean_color() {
        let colors = test_data_1024();
        let output = fit(&colors, &options(1).batch_size(2048)).unwrap();

        assert_eq!(output.num_clusters(), 1);
        assert!(output.assignments.iter().all(|&i| i == 0));

        let mean = mean_color(&colors);
        let centroid = output.centroids.as_slice()[0];
        for c in 0..3 {
            assert!((centroid[c] - mean[c]).abs() < 1e-6);
        }
    }

    #[test]
    fn single_cluster_sampled_mean_is_close() {
        let colors = test_data_1024();
        let output = fit(&colors, &options(1).batch_size(64).tolerance(0.0)).unwrap();

        let mean = mean_color(&colors);
        let centroid = output.centroids.as_slice()[0];
        for c in 0..3 {
            assert!((centroid[c] - mean[c]).abs() < 8.0);
        }
    }

    #[test]
    fn deterministic_given_seed() {
        let colors = test_data_1024();
        for init in [Init::Sample, Init::PlusPlus] {
            let options = options(16).batch_size(100).seed(123).init(init);
            let a = fit(&colors, &options).unwrap();
            let b = fit(&colors, &options).unwrap();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn output_is_valid() {
        let colors = test_data_1024();
        for k in [1, 2, 7, 16, 64, 256] {
            let output = fit(&colors, &options(k).batch_size(128)).unwrap();
            assert_valid(&output, &colors, usize::from(k));
        }
    }

    #[test]
    fn assignments_are_nearest_centroid() {
        let colors = test_data_1024();
        let output = fit(&colors, &options(16).batch_size(128)).unwrap();
        let centroids = output.centroids.as_slice();

        for (&color, &i) in colors.iter().zip(&output.assignments) {
            let color = to_f64(color);
            let expected = centroids
                .iter()
                .map(|&centroid| OrderedFloat(squared_euclidean_distance(centroid, color)))
                .min()
                .unwrap();

            assert_eq!(
                expected,
                OrderedFloat(squared_euclidean_distance(centroids[usize::from(i)], color))
            );
        }
    }

    #[test]
    fn iterating_does_not_increase_error() {
        let colors = test_data_1024();
        for seed in 0..4 {
            let options = options(8).batch_size(256).seed(seed);
            let initial = fit(&colors, &options.max_iterations(0)).unwrap();
            let fitted = fit(&colors, &options.max_iterations(50)).unwrap();

            assert_eq!(initial.iterations, 0);
            assert!(fitted.iterations >= 1);
            assert!(fitted.mean_squared_error(&colors) <= initial.mean_squared_error(&colors));
        }
    }

    #[test]
    fn initial_centroids_are_distinct() {
        let mut rng = Xoroshiro128PlusPlus::seed_from_u64(0);
        let mut colors = vec![[0, 0, 0]; 1000];
        colors[500] = [255, 255, 255];

        let centroids = sample_init(&colors, 2, &mut rng);
        assert_eq!(centroids.len(), 2);
        assert_ne!(centroids[0], centroids[1]);

        let centroids = plus_plus_init(&colors, 2, &mut rng);
        assert_eq!(centroids.len(), 2);
        assert_ne!(centroids[0], centroids[1]);
    }

    #[test]
    fn zero_batch_size_is_one() {
        let colors = test_data_1024();
        let output = fit(&colors, &options(4).batch_size(0).max_iterations(10)).unwrap();
        assert_valid(&output, &colors, 4);
    }

    #[test]
    fn palette_is_rounded_and_clamped() {
        let centroids = Centroids(vec![[-3.0, 254.6, 127.5], [300.0, 0.4, 1.5]]);
        assert_eq!(centroids.rounded(), vec![[0, 255, 128], [255, 0, 2]]);
    }

    #[test]
    fn single_sample_batches_do_not_stop_early() {
        let distinct = [
            [0, 0, 0],
            [255, 255, 255],
            [200, 30, 30],
            [30, 200, 30],
            [30, 30, 200],
            [120, 120, 120],
        ];
        let colors = (0..10_000).map(|i| distinct[i % 6]).collect::<Vec<_>>();

        for seed in 0..6 {
            let output = fit(&colors, &options(4).batch_size(1).seed(seed)).unwrap();
            assert!(output.iterations > 1);
            if output.converged {
                assert!(output.iterations >= CALM_BATCHES);
            }
        }
    }

    #[test]
    fn full_batch_converges_in_one_calm_iteration() {
        let colors = vec![[9, 9, 9], [200, 200, 200]];
        let output = fit(&colors, &options(2).batch_size(2)).unwrap();
        assert!(output.converged);
        assert_eq!(output.iterations, 1);
    }

    #[test]
    fn mean_squared_error_measures_common_prefix() {
        let centroids = [[0.0, 0.0, 0.0], [10.0, 0.0, 0.0]];
        let assignments = [0, 1, 1];
        let colors = [[1, 0, 0], [10, 2, 0], [0, 0, 0]];

        assert_eq!(mean_squared_error(&centroids, &assignments, &colors), (1.0 + 4.0 + 100.0) / 3.0);
        assert_eq!(mean_squared_error(&centroids, &assignments, &colors[..2]), (1.0 + 4.0) / 2.0);
        assert_eq!(mean_squared_error(&centroids, &assignments[..1], &colors), 1.0);
        assert_eq!(mean_squared_error(&centroids, &[], &colors), 0.0);
    }

    #[test]
    fn quantize_output_as_srgb() {
        let colors = two_color_4x4();
        let output = fit(&colors, &options(2).batch_size(16)).unwrap();
        let assignments = output.assignments.clone();
        let palette = output.palette();

        let quantized = output.into_quantize_output::<Srgb<u8>>();
        assert_eq!(quantized.indices, assignments);
        assert_eq!(quantized.counts, vec![8, 8]);
        for (srgb, color) in quantized.palette.iter().zip(palette) {
            assert_eq!([srgb.red, srgb.green, srgb.blue], color);
        }
    }

    #[test]
    #[cfg(feature = "threads")]
    fn single_and_multi_threaded_match() {
        let colors = test_data_1024();
        for init in [Init::Sample, Init::PlusPlus] {
            let options = options(32).batch_size(200).seed(9).init(init);
            let single = fit(&colors, &options).unwrap();
            let par = fit_par(&colors, &options).unwrap();
            assert_eq!(single, par);
        }
    }
}
