//! Specifies the CLI and handles arg parsing

use clap::{Parser, ValueEnum};
use palettesnap::Strategy;
use std::path::PathBuf;

/// Supported output formats for the final colors
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum FormatOutput {
	/// sRGB hexcode
	Hex,
	/// sRGB (r,g,b) triple
	Rgb,
	/// Whitespace with true color background
	Swatch,
	/// JSON array of {"hex", "count"} objects
	Json,
}

/// Sort orders for the final colors
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum SortOutput {
	/// Ascending hue, then saturation, then lightness
	H,
	/// Ascending saturation
	S,
	/// Ascending lightness
	L,
	/// Descending number of pixels
	N,
}

/// Ways to colorize the output text
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorizeOutput {
	/// Foreground
	Fg,
	/// Background
	Bg,
}

/// Palette generation algorithms
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
	/// Count every distinct color exactly
	Histogram,
	/// Cluster the colors into k groups
	Kmeans,
}

impl From<StrategyArg> for Strategy {
	fn from(strategy: StrategyArg) -> Self {
		match strategy {
			StrategyArg::Histogram => Strategy::Histogram,
			StrategyArg::Kmeans => Strategy::Kmeans,
		}
	}
}

/// Generate a color palette for an image using an exact color histogram or k-means clustering.
///
/// Options that are not given fall back to the --config file, if any, and then to the built-in defaults.
#[allow(clippy::struct_excessive_bools)]
#[derive(Parser, Debug)]
#[command(version)]
pub struct Options {
	/// The path to the input image
	pub image: PathBuf,

	/// The algorithm used to generate the palette [default: histogram]
	///
	/// histogram returns every distinct color sorted by how often it occurs,
	/// whereas kmeans returns (up to) k average colors.
	#[arg(long, value_enum)]
	pub strategy: Option<StrategyArg>,

	/// The (maximum) number of colors to find with k-means [default: 6]
	#[arg(short, value_parser = clap::value_parser!(u8).range(1..))]
	pub k: Option<u8>,

	/// The size the larger image dimension is reduced to before analysis [default: 150]
	///
	/// Higher values take more of the image into account at the cost of running time.
	#[arg(short = 'm', long, value_parser = clap::value_parser!(u32).range(1..))]
	pub max_dimension: Option<u32>,

	/// Pixels with an alpha value below this are ignored [default: 128]
	#[arg(short = 'a', long)]
	pub alpha_threshold: Option<u8>,

	/// Ignore near-white and near-black pixels
	///
	/// This is useful for images with a large, flat white or black background.
	#[arg(short = 'x', long)]
	pub exclude_extremes: bool,

	/// The maximum number of k-means iterations [default: 20]
	#[arg(short = 'i', long, value_parser = clap::value_parser!(u32).range(1..))]
	pub max_iter: Option<u32>,

	/// The seed value used for the random number generator
	///
	/// Without a seed, k-means may give a slightly different palette on every run.
	#[arg(long)]
	pub seed: Option<u64>,

	/// Only print this many of the most common colors
	#[arg(short, long)]
	pub top: Option<usize>,

	/// The format to print the colors in
	#[arg(short, long, default_value = "hex")]
	pub output: FormatOutput,

	/// Color the foreground or background for each printed color
	#[arg(short, long)]
	pub colorize: Option<ColorizeOutput>,

	/// The order to print the colors in
	///
	/// The h, s, and l options below refer to HSL component values.
	#[arg(short, long, default_value = "n")]
	pub sort: SortOutput,

	/// Reverse the printed order of the colors
	#[arg(short, long)]
	pub reverse: bool,

	/// Print a palette generated from the found colors and their complements instead [default: 10]
	///
	/// Half of the generated colors are tints and shades of the found colors (after --top and --sort),
	/// and the other half are tints and shades of their opposite hues. Combine with --top to pick the base colors.
	#[arg(long, value_name = "SIZE", num_args = 0..=1, default_missing_value = "10")]
	pub complement: Option<usize>,

	/// A JSON file with palette options to use as defaults
	///
	/// Example: {"strategy": "kmeans", "k": 8, "filter": {"alpha_threshold": 200}}
	#[arg(long)]
	pub config: Option<PathBuf>,

	/// Print additional information, such as timings and the number of k-means iterations
	#[arg(long)]
	pub verbose: bool,
}

impl Options {
	/// Apply the options given on the command line on top of `base`
	pub fn palette_options(&self, base: palettesnap::Options) -> palettesnap::Options {
		let mut options = base;

		if let Some(strategy) = self.strategy {
			options.strategy = strategy.into();
		}
		if let Some(k) = self.k {
			options.k = k;
		}
		if let Some(max_dimension) = self.max_dimension {
			options.max_dimension = max_dimension;
		}
		if let Some(alpha_threshold) = self.alpha_threshold {
			options.filter.alpha_threshold = alpha_threshold;
		}
		if self.exclude_extremes {
			options.filter.exclude_near_white_black = true;
		}
		if let Some(max_iter) = self.max_iter {
			options.max_iter = max_iter;
		}
		if self.seed.is_some() {
			options.seed = self.seed;
		}

		options
	}
}
