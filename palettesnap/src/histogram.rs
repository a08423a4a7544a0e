//! Exact color counting

use crate::{hex, ColorCount, Pixel};
use std::{cmp::Reverse, collections::HashMap};

/// Deduplicated pixels with the number of times each occurred
///
/// Colors are kept in the order they were first encountered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorCounts {
	/// Distinct colors
	pub(crate) colors: Vec<Pixel>,
	/// The number of duplicate pixels for each color
	pub(crate) counts: Vec<u32>,
}

impl ColorCounts {
	/// Count the distinct colors in `pixels`
	#[must_use]
	pub fn new(pixels: &[Pixel]) -> Self {
		let mut data = Self::default();

		// Packed color -> data index
		let mut memo: HashMap<u32, u32> = HashMap::new();

		for &color in pixels {
			let key = color.into_u32::<palette::rgb::channels::Rgba>();
			let index = *memo.entry(key).or_insert_with(|| {
				// there are only (2^8)^3 < u32::MAX possible colors
				#[allow(clippy::cast_possible_truncation)]
				let index = data.colors.len() as u32;

				data.colors.push(color);
				data.counts.push(0);
				index
			});

			data.counts[index as usize] += 1;
		}

		tracing::debug!(pixels = pixels.len(), distinct = data.colors.len(), "counted distinct colors");

		data
	}

	/// The distinct colors in first-encountered order
	#[must_use]
	pub fn colors(&self) -> &[Pixel] {
		&self.colors
	}

	/// The number of pixels for each color in [`ColorCounts::colors`]
	#[must_use]
	pub fn counts(&self) -> &[u32] {
		&self.counts
	}

	/// The number of distinct colors
	#[must_use]
	pub fn num_colors(&self) -> usize {
		self.colors.len()
	}

	/// Whether there are no colors at all
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.colors.is_empty()
	}

	/// The total number of pixels counted
	#[must_use]
	pub fn total(&self) -> u64 {
		self.counts.iter().copied().map(u64::from).sum()
	}

	/// Iterate over each color and its count
	pub(crate) fn pairs(&self) -> impl Iterator<Item = (Pixel, u32)> + '_ {
		self.colors.iter().copied().zip(self.counts.iter().copied())
	}
}

/// Count every distinct color in `pixels`, sorted by descending count.
///
/// Colors with equal counts stay in the order they were first encountered.
/// Every distinct color is returned; take a prefix for a fixed-size palette.
#[must_use]
pub fn histogram(pixels: &[Pixel]) -> Vec<ColorCount> {
	from_color_counts(&ColorCounts::new(pixels))
}

/// Convert [`ColorCounts`] into a histogram sorted by descending count
#[must_use]
pub fn from_color_counts(counts: &ColorCounts) -> Vec<ColorCount> {
	let mut pairs = counts.pairs().collect::<Vec<_>>();

	// stable, so ties keep first-encountered order
	pairs.sort_by_key(|&(_, n)| Reverse(n));

	pairs.into_iter().map(|(color, count)| ColorCount { hex: hex::encode(color), count }).collect()
}
