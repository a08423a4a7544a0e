//! Provides the implementation for k-means in RGB space
//!
//! Each run goes through k-means++ seeding and then alternates assignment and update passes
//! until a pass changes no assignments or the iteration limit is reached.
//! Identical pixels are grouped into a [`ColorCounts`] beforehand,
//! with each distinct color weighted by its pixel count.

use crate::{hex, histogram::ColorCounts, ColorCount, Pixel};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

/// The default maximum number of assignment passes
pub const DEFAULT_MAX_ITER: u32 = 20;

/// Assignment of a point that has not been assigned to any center yet
///
/// `k` is at most `u8::MAX`, so center indices never reach this value.
const UNASSIGNED: u8 = u8::MAX;

/// Squared Euclidean distance between two colors
fn squared_distance(x: Pixel, y: Pixel) -> u32 {
	let dr = u32::from(x.red.abs_diff(y.red));
	let dg = u32::from(x.green.abs_diff(y.green));
	let db = u32::from(x.blue.abs_diff(y.blue));
	dr * dr + dg * dg + db * db
}

/// Bookkeeping for each k-means data point
struct PointData {
	/// Center assignment for this data point
	assignment: Vec<u8>,
	/// Weight of each data point used to randomly select starting centroids in k-means++
	weight: Vec<u64>,
}

impl PointData {
	/// Create a [`PointData`] with the given number of data points
	fn new(n: usize) -> Self {
		Self { assignment: vec![UNASSIGNED; n], weight: vec![u64::MAX; n] }
	}
}

/// Data for each center/centroid
struct CenterData {
	/// The centroid point
	centroid: Vec<Pixel>,
	/// Per channel sum for all data points in this center
	sum: Vec<[u64; 3]>,
	/// Number of pixels in this center
	count: Vec<u32>,
}

impl CenterData {
	/// Create a [`CenterData`] with room for `k` centers
	fn new(k: usize) -> Self {
		Self { centroid: Vec::with_capacity(k), sum: Vec::new(), count: Vec::new() }
	}

	/// Size the sums and counts to the number of chosen centroids and zero them
	fn clear_sums(&mut self) {
		let k = self.centroid.len();
		self.sum.clear();
		self.sum.resize(k, [0; 3]);
		self.count.clear();
		self.count.resize(k, 0);
	}
}

/// Holds all the state used by k-means
struct KmeansState {
	/// Data for each center
	centers: CenterData,
	/// Data for each point
	points: PointData,
}

impl KmeansState {
	/// Initialize a new [`KmeansState`] with `k` centers and `n` data points
	fn new(k: usize, n: usize) -> Self {
		Self { centers: CenterData::new(k), points: PointData::new(n) }
	}
}

/// Result from running k-means
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KmeansResult {
	/// Final centroid colors, in centroid index order
	pub centroids: Vec<Pixel>,
	/// Number of pixels in each centroid
	pub counts: Vec<u32>,
	/// Number of assignment passes that were run
	pub iterations: u32,
}

impl KmeansResult {
	/// Create an empty result, representing that there was nothing to cluster
	const fn empty() -> Self {
		Self { centroids: Vec::new(), counts: Vec::new(), iterations: 0 }
	}

	/// The centroids as `#RRGGBB` strings
	#[must_use]
	pub fn palette(&self) -> Vec<String> {
		self.centroids.iter().map(|&color| hex::encode(color)).collect()
	}

	/// The centroids as `#RRGGBB` strings paired with their cluster sizes
	#[must_use]
	pub fn color_counts(&self) -> Vec<ColorCount> {
		self.centroids
			.iter()
			.zip(&self.counts)
			.map(|(&color, &count)| ColorCount { hex: hex::encode(color), count })
			.collect()
	}
}

/// Choose the starting centroids using the k-means++ algorithm
fn kmeans_plus_plus(k: usize, rng: &mut impl Rng, colors: &[Pixel], centroids: &mut Vec<Pixel>, weights: &mut [u64]) {
	use rand::{
		distributions::{WeightedError::*, WeightedIndex},
		prelude::Distribution,
	};

	// Pick any random first centroid
	centroids.push(colors[rng.gen_range(0..colors.len())]);

	// Pick each next centroid with a weighted probability based off the squared distance to its closest centroid
	for i in 1..k {
		let centroid = centroids[i - 1];
		for (weight, &color) in weights.iter_mut().zip(colors) {
			*weight = u64::min(*weight, u64::from(squared_distance(color, centroid)));
		}

		match WeightedIndex::new(&*weights) {
			Ok(sampler) => centroids.push(colors[sampler.sample(rng)]),
			Err(AllWeightsZero) => return, // every color is already a centroid
			Err(InvalidWeight | NoItem | TooMany) => {
				unreachable!("distances are >= 0 and colors.len() is in 1..=2.pow(24)")
			},
		}
	}
}

/// Find the index of the closest centroid, preferring the lowest index on ties
// centroids.len() <= u8::MAX
#[allow(clippy::cast_possible_truncation)]
fn nearest(color: Pixel, centroids: &[Pixel]) -> u8 {
	let mut min_dist = u32::MAX;
	let mut min_center = 0;
	for (i, &centroid) in centroids.iter().enumerate() {
		let dist = squared_distance(color, centroid);
		if dist < min_dist {
			min_dist = dist;
			min_center = i;
		}
	}
	min_center as u8
}

/// Add `n` pixels of `color` to a per channel sum
fn accumulate(sum: &mut [u64; 3], color: Pixel, n: u32) {
	let n = u64::from(n);
	sum[0] += n * u64::from(color.red);
	sum[1] += n * u64::from(color.green);
	sum[2] += n * u64::from(color.blue);
}

/// Assign each data point to its closest center and recompute the center sums and counts.
///
/// Returns whether any assignment changed.
#[cfg(not(feature = "threads"))]
fn update_assignments(colors: &ColorCounts, centers: &mut CenterData, points: &mut PointData) -> bool {
	centers.clear_sums();

	let mut changed = false;
	for ((color, n), center) in colors.pairs().zip(&mut points.assignment) {
		let min_center = nearest(color, &centers.centroid);
		if min_center != *center {
			*center = min_center;
			changed = true;
		}

		let i = usize::from(min_center);
		accumulate(&mut centers.sum[i], color, n);
		centers.count[i] += n;
	}

	changed
}

/// Assign each data point to its closest center and recompute the center sums and counts.
///
/// Returns whether any assignment changed.
#[cfg(feature = "threads")]
fn update_assignments(colors: &ColorCounts, centers: &mut CenterData, points: &mut PointData) -> bool {
	use rayon::prelude::*;

	centers.clear_sums();

	let k = centers.centroid.len();
	let centroids = &centers.centroid;
	let num_points = colors.num_colors();
	let partials = points
		.assignment
		.par_iter_mut()
		.with_min_len((num_points / rayon::current_num_threads()).max(1))
		.zip(&colors.colors)
		.zip(&colors.counts)
		.fold_with(
			(vec![[0; 3]; k], vec![0u32; k], false),
			|(mut sums, mut counts, mut changed), ((center, &color), &n)| {
				let min_center = nearest(color, centroids);
				if min_center != *center {
					*center = min_center;
					changed = true;
				}

				let i = usize::from(min_center);
				accumulate(&mut sums[i], color, n);
				counts[i] += n;

				(sums, counts, changed)
			},
		)
		.collect::<Vec<_>>();

	// Integer sums, so the merge order does not affect the result
	let mut changed = false;
	for (partial_sums, partial_counts, partial_changed) in partials {
		for (sum, partial) in centers.sum.iter_mut().zip(&partial_sums) {
			sum[0] += partial[0];
			sum[1] += partial[1];
			sum[2] += partial[2];
		}
		for (count, &partial) in centers.count.iter_mut().zip(&partial_counts) {
			*count += partial;
		}
		changed |= partial_changed;
	}

	changed
}

/// The mean color of a center, rounded per channel
fn mean(sum: [u64; 3], n: u32) -> Pixel {
	let n = f64::from(n);
	// sums are far below 2^53, so the conversion is exact
	#[allow(clippy::cast_precision_loss)]
	let [r, g, b] = sum.map(|s| s as f64 / n);
	// the mean of u8 values stays within the u8 range
	#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
	let color = Pixel::new(r.round() as u8, g.round() as u8, b.round() as u8);
	color
}

/// For each center with at least one pixel, move its centroid to the mean of its pixels
fn update_means(centers: &mut CenterData) {
	for ((centroid, &n), &sum) in centers.centroid.iter_mut().zip(&centers.count).zip(&centers.sum) {
		if n > 0 {
			*centroid = mean(sum, n);
		}
	}
}

/// Update every centroid, reseeding centers that have no pixels.
///
/// An empty center is moved to the color that is farthest from all other centroids,
/// i.e., the color with the largest distance to its closest other centroid.
fn update_centroids(colors: &[Pixel], centers: &mut CenterData) {
	update_means(centers);

	for i in 0..centers.centroid.len() {
		if centers.count[i] > 0 {
			continue;
		}

		let mut farthest = None;
		let mut max_dist = 0;
		for &color in colors {
			let dist = centers
				.centroid
				.iter()
				.enumerate()
				.filter(|&(j, _)| j != i)
				.map(|(_, &centroid)| squared_distance(color, centroid))
				.min()
				.unwrap_or(u32::MAX);

			if farthest.is_none() || dist > max_dist {
				max_dist = dist;
				farthest = Some(color);
			}
		}

		if let Some(color) = farthest {
			tracing::trace!(center = i, color = %hex::encode(color), "reseeding empty center");
			centers.centroid[i] = color;
		}
	}
}

/// Run one k-means clustering
fn kmeans(colors: &ColorCounts, state: &mut KmeansState, k: usize, max_iter: u32, rng: &mut impl Rng) -> KmeansResult {
	let KmeansState { centers, points } = state;

	kmeans_plus_plus(k, rng, &colors.colors, &mut centers.centroid, &mut points.weight);
	tracing::debug!(k, seeds = centers.centroid.len(), "chose initial centroids");

	let max_iter = max_iter.max(1);
	let mut iterations = 0;
	let converged = loop {
		let changed = update_assignments(colors, centers, points);
		iterations += 1;
		tracing::trace!(iteration = iterations, changed, "assignment pass");

		if !changed {
			break true;
		}
		if iterations >= max_iter {
			break false;
		}

		update_centroids(&colors.colors, centers);
	};

	// Stopping at the cap can leave centers without pixels. Reseed and reassign until every center has some.
	let mut repairs = 0;
	while repairs < k && centers.count.contains(&0) {
		update_centroids(&colors.colors, centers);
		update_assignments(colors, centers, points);
		repairs += 1;
	}
	if repairs > 0 {
		tracing::debug!(repairs, "reseeded empty centers after the last pass");
	}

	if !converged || repairs > 0 {
		// the last pass moved some points, so bring the centroids up to date with them
		update_means(centers);
	}

	tracing::debug!(iterations, converged, "k-means finished");

	let (centroids, counts) = centers
		.centroid
		.iter()
		.zip(&centers.count)
		.filter(|&(_, &count)| count > 0)
		.map(|(&color, &count)| (color, count))
		.unzip();

	KmeansResult { centroids, counts, iterations }
}

/// Run k-means on `colors`, finding up to `k` representative colors.
///
/// `k` is reduced to the number of distinct colors if there are fewer.
/// At most `max_iter` assignment passes are run (at least one is always run).
/// If the limit leaves any center without pixels, those centers are reseeded and the pixels reassigned
/// once more, so the result has `k` centroids with a nonzero count.
/// With `seed` set to `None`, the random number generator is seeded from system entropy.
///
/// An empty result with no centroids is returned if `colors` is empty or `k` = 0.
#[must_use]
pub fn run(colors: &ColorCounts, k: u8, max_iter: u32, seed: Option<u64>) -> KmeansResult {
	let k = usize::from(k).min(colors.num_colors());
	if k == 0 {
		return KmeansResult::empty();
	}

	let mut rng = match seed {
		Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
		None => Xoshiro256PlusPlus::from_entropy(),
	};

	let mut state = KmeansState::new(k, colors.num_colors());
	kmeans(colors, &mut state, k, max_iter, &mut rng)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn test_colors() -> Vec<Pixel> {
		vec![
			Pixel::new(12, 200, 34),
			Pixel::new(240, 16, 8),
			Pixel::new(20, 24, 230),
			Pixel::new(250, 250, 250),
			Pixel::new(3, 3, 3),
			Pixel::new(128, 128, 0),
			Pixel::new(90, 12, 150),
			Pixel::new(200, 120, 60),
			Pixel::new(14, 190, 40),
			Pixel::new(235, 20, 12),
			Pixel::new(128, 140, 10),
			Pixel::new(30, 30, 220),
		]
	}

	fn test_data() -> ColorCounts {
		ColorCounts { colors: test_colors(), counts: vec![12, 11, 10, 9, 8, 7, 6, 5, 4, 3, 2, 1] }
	}

	fn rng() -> Xoshiro256PlusPlus {
		Xoshiro256PlusPlus::seed_from_u64(0)
	}

	fn kmeans_plus_plus_num_centroids(k: usize, n: usize) {
		let mut state = KmeansState::new(k, n);

		kmeans_plus_plus(k, &mut rng(), &test_colors()[..n], &mut state.centers.centroid, &mut state.points.weight);

		assert_eq!(state.centers.centroid.len(), usize::min(k, n));
	}

	#[test]
	fn kmeans_plus_plus_k_greater_than_n() {
		kmeans_plus_plus_num_centroids(6, 2);
	}

	#[test]
	fn kmeans_plus_plus_k_equals_n() {
		kmeans_plus_plus_num_centroids(4, 4);
	}

	#[test]
	fn kmeans_plus_plus_k_less_than_n() {
		kmeans_plus_plus_num_centroids(2, 6);
	}

	#[test]
	fn kmeans_plus_plus_chooses_distinct_colors() {
		let colors = test_colors();
		for seed in 0..32 {
			let mut centroids = Vec::new();
			let mut weights = vec![u64::MAX; colors.len()];
			let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
			kmeans_plus_plus(colors.len(), &mut rng, &colors, &mut centroids, &mut weights);

			let mut sorted = centroids.iter().map(|c| c.into_u32::<palette::rgb::channels::Rgba>()).collect::<Vec<_>>();
			sorted.sort_unstable();
			sorted.dedup();
			assert_eq!(sorted.len(), colors.len());
		}
	}

	#[test]
	fn nearest_prefers_lowest_index_on_ties() {
		let centroids = [Pixel::new(0, 0, 0), Pixel::new(20, 0, 0), Pixel::new(0, 0, 0)];
		assert_eq!(nearest(Pixel::new(10, 0, 0), &centroids), 0);
		assert_eq!(nearest(Pixel::new(11, 0, 0), &centroids), 1);
		assert_eq!(nearest(Pixel::new(0, 0, 0), &centroids), 0);
	}

	fn initialize(k: usize) -> (ColorCounts, KmeansState) {
		let data = test_data();
		let mut state = KmeansState::new(k, data.num_colors());
		kmeans_plus_plus(k, &mut rng(), &data.colors, &mut state.centers.centroid, &mut state.points.weight);
		(data, state)
	}

	#[test]
	fn update_assignments_preserves_totals() {
		let (data, mut state) = initialize(4);

		update_assignments(&data, &mut state.centers, &mut state.points);

		let mut expected_sum = [0; 3];
		for (color, n) in data.pairs() {
			accumulate(&mut expected_sum, color, n);
		}

		let mut center_sum = [0; 3];
		for sum in &state.centers.sum {
			center_sum[0] += sum[0];
			center_sum[1] += sum[1];
			center_sum[2] += sum[2];
		}

		assert_eq!(center_sum, expected_sum);
		assert_eq!(u64::from(state.centers.count.iter().sum::<u32>()), data.total());
	}

	#[test]
	fn update_assignments_sum_reflects_assignment() {
		let (data, mut state) = initialize(4);

		update_assignments(&data, &mut state.centers, &mut state.points);

		for ((color, n), &center) in data.pairs().zip(&state.points.assignment) {
			let center = usize::from(center);
			assert_eq!(center, usize::from(nearest(color, &state.centers.centroid)));

			let sum = &mut state.centers.sum[center];
			sum[0] -= u64::from(n) * u64::from(color.red);
			sum[1] -= u64::from(n) * u64::from(color.green);
			sum[2] -= u64::from(n) * u64::from(color.blue);
			state.centers.count[center] -= n;
		}

		assert!(state.centers.sum.iter().all(|&sum| sum == [0; 3]));
		assert!(state.centers.count.iter().all(|&count| count == 0));
	}

	#[test]
	fn update_assignments_reports_changes() {
		let (data, mut state) = initialize(4);

		assert!(update_assignments(&data, &mut state.centers, &mut state.points));
		assert!(!update_assignments(&data, &mut state.centers, &mut state.points));
	}

	#[test]
	fn update_centroids_takes_rounded_mean() {
		let mut centers = CenterData::new(1);
		centers.centroid.push(Pixel::new(0, 0, 0));
		centers.clear_sums();
		accumulate(&mut centers.sum[0], Pixel::new(10, 1, 0), 1);
		accumulate(&mut centers.sum[0], Pixel::new(11, 2, 255), 1);
		centers.count[0] = 2;

		update_centroids(&[], &mut centers);

		// 10.5 and 1.5 round away from zero, 127.5 likewise
		assert_eq!(centers.centroid[0], Pixel::new(11, 2, 128));
	}

	#[test]
	fn update_centroids_reseeds_empty_center_to_farthest_color() {
		let colors = [Pixel::new(0, 0, 0), Pixel::new(10, 0, 0), Pixel::new(200, 0, 0)];

		let mut centers = CenterData::new(2);
		centers.centroid.extend([Pixel::new(5, 0, 0), Pixel::new(6, 0, 0)]);
		centers.clear_sums();
		for &color in &colors {
			accumulate(&mut centers.sum[0], color, 1);
		}
		centers.count[0] = 3;

		update_centroids(&colors, &mut centers);

		assert_eq!(centers.centroid[0], Pixel::new(70, 0, 0));
		assert_eq!(centers.centroid[1], Pixel::new(200, 0, 0));
	}

	#[test]
	fn reseeded_center_receives_pixels() {
		let data = ColorCounts {
			colors: vec![Pixel::new(0, 0, 0), Pixel::new(10, 0, 0), Pixel::new(200, 0, 0)],
			counts: vec![1, 1, 1],
		};

		let mut state = KmeansState::new(2, 3);
		state.centers.centroid.extend([Pixel::new(5, 0, 0), Pixel::new(5, 0, 0)]);

		update_assignments(&data, &mut state.centers, &mut state.points);
		assert_eq!(state.centers.count, [3, 0]);

		update_centroids(&data.colors, &mut state.centers);
		assert!(update_assignments(&data, &mut state.centers, &mut state.points));
		assert_eq!(state.centers.count, [2, 1]);
	}

	#[test]
	fn empty_input_or_zero_k() {
		assert_eq!(run(&ColorCounts::default(), 6, DEFAULT_MAX_ITER, Some(0)), KmeansResult::empty());
		assert_eq!(run(&test_data(), 0, DEFAULT_MAX_ITER, Some(0)), KmeansResult::empty());
	}

	#[test]
	fn k_is_reduced_to_distinct_colors() {
		let data = ColorCounts::new(&[Pixel::new(255, 0, 0); 100]);
		let result = run(&data, 6, DEFAULT_MAX_ITER, Some(0));

		assert_eq!(result.centroids, vec![Pixel::new(255, 0, 0)]);
		assert_eq!(result.counts, vec![100]);
		assert_eq!(result.palette(), vec!["#FF0000".to_owned()]);
	}

	#[test]
	fn k_equal_to_distinct_colors_recovers_every_color() {
		let data = test_data();
		#[allow(clippy::cast_possible_truncation)]
		let k = data.num_colors() as u8;
		let result = run(&data, k, DEFAULT_MAX_ITER, Some(3));

		let mut expected = data.pairs().collect::<Vec<_>>();
		let mut actual = result.centroids.iter().copied().zip(result.counts.iter().copied()).collect::<Vec<_>>();
		expected.sort_by_key(|&(c, _)| c.into_u32::<palette::rgb::channels::Rgba>());
		actual.sort_by_key(|&(c, _)| c.into_u32::<palette::rgb::channels::Rgba>());
		assert_eq!(actual, expected);
	}

	#[test]
	fn well_separated_clusters_are_found() {
		let mut pixels = Vec::new();
		for (base, n) in [(Pixel::new(200, 10, 10), 30), (Pixel::new(10, 200, 10), 20), (Pixel::new(10, 10, 200), 10)] {
			for d in 0..n {
				#[allow(clippy::cast_possible_truncation)]
				let d = (d % 5) as u8;
				pixels.push(Pixel::new(base.red + d, base.green + d, base.blue + d));
			}
		}
		let data = ColorCounts::new(&pixels);

		for seed in 0..16 {
			let result = run(&data, 3, DEFAULT_MAX_ITER, Some(seed));
			let mut counts = result.counts.clone();
			counts.sort_unstable();
			assert_eq!(counts, [10, 20, 30], "seed {seed}");
			assert!(result.iterations <= DEFAULT_MAX_ITER);
		}
	}

	#[test]
	fn same_seed_gives_same_result() {
		let data = test_data();
		assert_eq!(run(&data, 4, DEFAULT_MAX_ITER, Some(42)), run(&data, 4, DEFAULT_MAX_ITER, Some(42)));
	}

	#[test]
	fn max_iter_reached() {
		let data = test_data();

		let converged = run(&data, 4, 64, Some(0));
		assert!(converged.iterations < 64);
		assert!(converged.iterations >= 2);

		let result = run(&data, 4, 1, Some(0));
		assert_eq!(result.iterations, 1);
		assert_eq!(u64::from(result.counts.iter().sum::<u32>()), data.total());
	}

	#[test]
	fn low_max_iter_still_gives_k_colors() {
		// 79 distinct shades of red, spread unevenly over the channel
		#[allow(clippy::cast_possible_truncation)]
		let pixels = (0..79u32).map(|i| Pixel::new((i * 37 % 256) as u8, 0, 0)).collect::<Vec<_>>();
		let data = ColorCounts::new(&pixels);

		for k in [2, 13, 21, 26, 40, 79] {
			for max_iter in 1..=3 {
				for seed in 0..64 {
					let result = run(&data, k, max_iter, Some(seed));
					assert_eq!(result.centroids.len(), usize::from(k), "k {k}, max_iter {max_iter}, seed {seed}");
					assert!(result.counts.iter().all(|&n| n > 0));
					assert_eq!(u64::from(result.counts.iter().sum::<u32>()), data.total());
					assert!(result.iterations <= max_iter);
				}
			}
		}
	}

	#[test]
	fn counts_are_never_zero() {
		let data = test_data();
		for k in 1..=12 {
			for seed in 0..8 {
				let result = run(&data, k, DEFAULT_MAX_ITER, Some(seed));
				assert_eq!(result.centroids.len(), usize::from(k));
				assert_eq!(result.centroids.len(), result.counts.len());
				assert!(result.counts.iter().all(|&n| n > 0));
				assert_eq!(u64::from(result.counts.iter().sum::<u32>()), data.total());
				assert!(result.iterations <= DEFAULT_MAX_ITER);
			}
		}
	}
}
