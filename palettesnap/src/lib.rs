//! Extract a small, representative color palette from an image.
//!
//! An image is first downsampled to a bounded size, then its opaque pixels are extracted,
//! and finally those pixels are reduced to a palette by one of two [`Strategy`]s:
//! an exact color histogram or k-means clustering in RGB space.
//! Each palette entry is a [`ColorCount`]: an uppercase `#RRGGBB` string and the number of pixels it represents.
//!
//! # Examples
//!
//! ## Count every color in an image file.
//!
//! ```no_run
//! let bytes = std::fs::read("some image").unwrap();
//! let histogram = palettesnap::palette_from_bytes(&bytes, &palettesnap::Options::default()).unwrap();
//! let top_five = &histogram[..histogram.len().min(5)];
//! ```
//!
//! ## Find 6 average colors with k-means.
//!
//! ```no_run
//! use palettesnap::{Options, Strategy};
//!
//! let image = image::open("some image").unwrap();
//! let options = Options { strategy: Strategy::Kmeans, k: 6, seed: Some(42), ..Options::default() };
//! let palette = palettesnap::palette_from_image(&image, &options);
//! ```
//!
//! ## Run the pipeline steps by hand.
//!
//! ```
//! use palettesnap::{extract, histogram::ColorCounts, kmeans};
//!
//! let rgba = [255u8, 0, 0, 255, 0, 0, 255, 255, 0, 0, 0, 0];
//! let pixels = extract::extract_pixels(&rgba, &extract::PixelFilter::default());
//! assert_eq!(pixels.len(), 2);
//!
//! let colors = ColorCounts::new(&pixels);
//! let result = kmeans::run(&colors, 6, kmeans::DEFAULT_MAX_ITER, Some(0));
//! assert_eq!(result.centroids.len(), 2);
//! ```
//!
//! ## Build a complementary palette from a few chosen colors.
//!
//! ```
//! use palettesnap::{complement, Pixel};
//!
//! let generated = complement::palette(&[Pixel::new(255, 0, 0)], complement::DEFAULT_TOTAL);
//! assert_eq!(generated.len(), 10);
//! assert_eq!(generated[5], "#00FFFF");
//! ```
//!
//! # Options
//!
//! Here are explanations of the fields of [`Options`].
//!
//! ## Max Dimension
//!
//! Images whose width or height exceeds this are resized so that the larger side equals it,
//! preserving the aspect ratio. This bounds the running time of both strategies on large images.
//! The default is [`DEFAULT_MAX_DIMENSION`].
//!
//! ## Strategy
//!
//! [`Strategy::Histogram`] counts every distinct color exactly and returns all of them,
//! sorted by descending count with ties in first-seen order.
//! It does not use `k`; take a prefix of the result for a fixed size palette.
//!
//! [`Strategy::Kmeans`] clusters the pixels into `k` groups and returns the mean color of each group
//! along with the group size, in an arbitrary but stable order.
//! Sorting the palette for display (by hue, for example) is left to the caller.
//!
//! ## K
//!
//! The number of colors k-means should find.
//! Fewer colors are returned if the image has fewer distinct colors than `k`.
//!
//! ## Filter
//!
//! Pixels with an alpha value below [`PixelFilter::alpha_threshold`] never influence the palette.
//! Near-white and near-black pixels can optionally be dropped as well,
//! which keeps flat backgrounds from dominating the result.
//!
//! ## Max Iterations
//!
//! k-means stops once an assignment pass changes nothing, or after this many passes.
//! The default is [`DEFAULT_MAX_ITER`].
//!
//! ## Seed
//!
//! The value used to seed the random number generator which chooses the initial k-means centroids.
//! `None` seeds from system entropy, so results may vary between runs.
//! Provide any arbitrary value like `Some(0)` or `Some(42)` for reproducible results.
//!
//! # Threads
//!
//! Every function here is a self-contained computation with no shared state,
//! so palettes can be generated on any thread.
//! With the `threads` feature (enabled by default), the k-means assignment step runs in parallel via `rayon`.
//! The results are identical either way.

#![deny(unsafe_code)]
#![warn(clippy::pedantic, clippy::cargo)]
#![warn(clippy::use_debug, clippy::dbg_macro, clippy::todo, clippy::unimplemented)]
#![warn(clippy::unwrap_used, clippy::unwrap_in_result)]
#![warn(clippy::unneeded_field_pattern, clippy::rest_pat_in_fully_bound_structs)]
#![warn(clippy::unnecessary_self_imports)]
#![warn(clippy::str_to_string, clippy::string_to_string, clippy::string_slice)]
#![warn(missing_docs, clippy::missing_docs_in_private_items, rustdoc::all)]
#![warn(clippy::float_cmp_const, clippy::lossy_float_literal)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::enum_glob_use)]

use image::{DynamicImage, RgbaImage};

pub mod complement;
pub mod downsample;
mod error;
pub mod extract;
pub mod hex;
pub mod histogram;
pub mod kmeans;

pub use downsample::DEFAULT_MAX_DIMENSION;
pub use error::Error;
pub use extract::{PixelFilter, DEFAULT_ALPHA_THRESHOLD};
pub use kmeans::{KmeansResult, DEFAULT_MAX_ITER};

/// An opaque RGB color sample
pub type Pixel = palette::Srgb<u8>;

/// The default number of colors for k-means
pub const DEFAULT_K: u8 = 6;

/// A palette color and the number of pixels it represents
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColorCount {
	/// The color as an uppercase `#RRGGBB` string
	pub hex: String,
	/// The number of exactly matching pixels (histogram) or cluster members (k-means)
	pub count: u32,
}

/// The algorithm used to reduce pixels to a palette
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(rename_all = "lowercase"))]
pub enum Strategy {
	/// Count every distinct color exactly
	#[default]
	Histogram,
	/// Cluster colors into `k` groups with k-means
	Kmeans,
}

/// Options for the palette pipeline
///
/// See the crate documentation for information on each field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(default))]
pub struct Options {
	/// The bound on the larger image dimension before extraction
	pub max_dimension: u32,
	/// The quantization algorithm
	pub strategy: Strategy,
	/// The number of colors to find with k-means
	pub k: u8,
	/// Which pixels are kept
	pub filter: PixelFilter,
	/// The maximum number of k-means assignment passes
	pub max_iter: u32,
	/// The k-means random seed, or `None` to seed from system entropy
	pub seed: Option<u64>,
}

impl Default for Options {
	fn default() -> Self {
		Self {
			max_dimension: DEFAULT_MAX_DIMENSION,
			strategy: Strategy::Histogram,
			k: DEFAULT_K,
			filter: PixelFilter::default(),
			max_iter: DEFAULT_MAX_ITER,
			seed: None,
		}
	}
}

/// Reduce already extracted pixels to a palette using the configured [`Strategy`]
#[must_use]
pub fn quantize(pixels: &[Pixel], options: &Options) -> Vec<ColorCount> {
	match options.strategy {
		Strategy::Histogram => histogram::histogram(pixels),
		Strategy::Kmeans => {
			let colors = histogram::ColorCounts::new(pixels);
			let result = kmeans::run(&colors, options.k, options.max_iter, options.seed);
			result.color_counts()
		},
	}
}

/// Generate a palette from row-major RGBA pixel data with the given dimensions.
///
/// # Errors
/// Returns [`Error::DimensionMismatch`] if `rgba` does not contain exactly `width * height` pixels.
pub fn palette_from_rgba(rgba: &[u8], width: u32, height: u32, options: &Options) -> Result<Vec<ColorCount>, Error> {
	let mismatch = || Error::DimensionMismatch { len: rgba.len(), width, height };

	let expected = u64::from(width) * u64::from(height) * 4;
	if usize::try_from(expected).map_or(true, |expected| expected != rgba.len()) {
		return Err(mismatch());
	}

	let pixels = if rgba.is_empty() || downsample::dimensions(width, height, options.max_dimension) == (width, height) {
		extract::extract_pixels(rgba, &options.filter)
	} else {
		let image = RgbaImage::from_raw(width, height, rgba.to_vec()).ok_or_else(mismatch)?;
		let image = downsample::downsample(image, options.max_dimension);
		extract::extract_pixels(image.as_raw(), &options.filter)
	};

	Ok(quantize(&pixels, options))
}

/// Generate a palette from a decoded image
#[must_use]
pub fn palette_from_image(image: &DynamicImage, options: &Options) -> Vec<ColorCount> {
	let image = downsample::downsample(image.to_rgba8(), options.max_dimension);
	let pixels = extract::extract_pixels(image.as_raw(), &options.filter);
	quantize(&pixels, options)
}

/// Decode an image held in memory and generate its palette.
///
/// The image format is guessed from the data, and only formats enabled on the `image` crate can be decoded.
///
/// # Errors
/// Returns [`Error::Decode`] if the image could not be decoded.
pub fn palette_from_bytes(bytes: &[u8], options: &Options) -> Result<Vec<ColorCount>, Error> {
	let image = image::load_from_memory(bytes)?;
	Ok(palette_from_image(&image, options))
}
