//! Generate a color palette for an image using an exact color histogram or k-means clustering.

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

mod cli;

#[allow(clippy::wildcard_imports)]
use cli::*;

use clap::Parser;
use colored::Colorize;
use image::DynamicImage;
use palette::{FromColor, Hsl, Srgb};
use palettesnap::{complement, hex, ColorCount};
use std::{
	fmt::{self, Display},
	path::Path,
	process::ExitCode,
	time::Instant,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Record the running time of an expression and log the elapsed time
macro_rules! time {
	($name: literal, $func_call: expr) => {{
		let start = Instant::now();
		let result = $func_call;
		tracing::info!(elapsed_ms = start.elapsed().as_millis(), "{} finished", $name);
		result
	}};
}

/// Error cases for the command line application
#[derive(Debug)]
enum AppError {
	/// Failed to read or decode the image file
	Image(palettesnap::Error),
	/// Failed to read the config file
	ConfigRead(std::io::Error),
	/// Failed to parse the config file
	ConfigParse(serde_json::Error),
	/// Failed to serialize the palette
	Json(serde_json::Error),
	/// The palette generation thread panicked
	Worker,
}

impl Display for AppError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			AppError::Image(e) => write!(f, "Failed to load the image file: {e}"),
			AppError::ConfigRead(e) => write!(f, "Failed to read the config file: {e}"),
			AppError::ConfigParse(e) => write!(f, "Failed to parse the config file: {e}"),
			AppError::Json(e) => write!(f, "Failed to format the palette as JSON: {e}"),
			AppError::Worker => write!(f, "Palette generation failed unexpectedly"),
		}
	}
}

fn main() -> ExitCode {
	let options = Options::parse();

	init_logging(options.verbose);

	let result = generate_and_print_palette(&options);

	// Returning Result<_> uses Debug printing instead of Display
	if let Err(e) = result {
		eprintln!("{e}");
		ExitCode::FAILURE
	} else {
		ExitCode::SUCCESS
	}
}

/// Install the log subscriber, which `RUST_LOG` can override
fn init_logging(verbose: bool) {
	let default_filter = if verbose { "palettesnap=debug" } else { "palettesnap=warn" };

	tracing_subscriber::registry()
		.with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
		.with(tracing_subscriber::fmt::layer().without_time().with_writer(std::io::stderr))
		.init();
}

/// Load the palette options from the config file, if one was given
fn load_config(path: Option<&Path>) -> Result<palettesnap::Options, AppError> {
	match path {
		Some(path) => {
			let json = std::fs::read_to_string(path).map_err(AppError::ConfigRead)?;
			serde_json::from_str(&json).map_err(AppError::ConfigParse)
		},
		None => Ok(palettesnap::Options::default()),
	}
}

/// Load an image, generate its palette, and print the result using the given options
fn generate_and_print_palette(options: &Options) -> Result<(), AppError> {
	let palette_options = options.palette_options(load_config(options.config.as_deref())?);
	tracing::debug!(?palette_options, "resolved options");

	// Input
	let img = time!("Image loading", load_image(&options.image))?;

	// Processing
	let palette = time!("Palette generation", generate_palette(img, palette_options))?;
	tracing::debug!(colors = palette.len(), "generated palette");

	// Output
	let colors = sorted_colors(palette, options);
	match options.complement {
		Some(total) => print_palette(&complementary_colors(&colors, total), options),
		None => print_palette(&colors, options),
	}
}

/// Load the image at the given path
fn load_image(path: &Path) -> Result<DynamicImage, AppError> {
	image::open(path).map_err(|e| AppError::Image(e.into()))
}

/// Generate the palette on a separate thread, off the main thread
fn generate_palette(image: DynamicImage, options: palettesnap::Options) -> Result<Vec<ColorCount>, AppError> {
	std::thread::spawn(move || palettesnap::palette_from_image(&image, &options))
		.join()
		.map_err(|_| AppError::Worker)
}

/// Keep the most common colors and order them, pairing each with its sRGB value
fn sorted_colors(mut palette: Vec<ColorCount>, options: &Options) -> Vec<(ColorCount, Srgb<u8>)> {
	if let Some(top) = options.top {
		// k-means output is not ordered by count
		palette.sort_by_key(|entry| std::cmp::Reverse(entry.count));
		palette.truncate(top);
	}

	let mut colors = palette
		.into_iter()
		.filter_map(|entry| hex::decode(&entry.hex).map(|srgb| (entry, srgb)))
		.collect::<Vec<_>>();

	let hsl = |srgb: Srgb<u8>| -> Hsl { Hsl::from_color(srgb.into_format::<f32>()) };

	match options.sort {
		SortOutput::H => colors.sort_by(|(_, x), (_, y)| {
			let (x, y) = (hsl(*x), hsl(*y));
			f32::total_cmp(&x.hue.into_positive_degrees(), &y.hue.into_positive_degrees())
				.then(f32::total_cmp(&x.saturation, &y.saturation))
				.then(f32::total_cmp(&x.lightness, &y.lightness))
		}),
		SortOutput::S => {
			colors.sort_by(|(_, x), (_, y)| f32::total_cmp(&hsl(*x).saturation, &hsl(*y).saturation));
		},
		SortOutput::L => {
			colors.sort_by(|(_, x), (_, y)| f32::total_cmp(&hsl(*x).lightness, &hsl(*y).lightness));
		},
		SortOutput::N => colors.sort_by_key(|(entry, _)| std::cmp::Reverse(entry.count)),
	}

	if options.reverse {
		colors.reverse();
	}

	colors
}

/// Generate a palette from the given colors and their complements
///
/// Generated colors do not represent any pixels, so their counts are 0.
fn complementary_colors(colors: &[(ColorCount, Srgb<u8>)], total: usize) -> Vec<(ColorCount, Srgb<u8>)> {
	let base = colors.iter().map(|&(_, color)| color).collect::<Vec<_>>();
	complement::palette(&base, total)
		.into_iter()
		.filter_map(|hex| hex::decode(&hex).map(|srgb| (ColorCount { hex, count: 0 }, srgb)))
		.collect()
}

/// Print the given colors based off the provided options
fn print_palette(colors: &[(ColorCount, Srgb<u8>)], options: &Options) -> Result<(), AppError> {
	match options.output {
		FormatOutput::Hex => color_format_print(colors, options, |entry, _| entry.hex.clone()),

		FormatOutput::Rgb => {
			color_format_print(colors, options, |_, color| format!("({},{},{})", color.red, color.green, color.blue));
		},

		FormatOutput::Swatch => {
			print_colors(colors, "", |_, color| "   ".on_truecolor(color.red, color.green, color.blue).to_string());
		},

		FormatOutput::Json if options.complement.is_some() => {
			let hexes = colors.iter().map(|(entry, _)| entry.hex.as_str()).collect::<Vec<_>>();
			println!("{}", serde_json::to_string_pretty(&hexes).map_err(AppError::Json)?);
		},

		FormatOutput::Json => {
			let entries = colors.iter().map(|(entry, _)| entry).collect::<Vec<_>>();
			println!("{}", serde_json::to_string_pretty(&entries).map_err(AppError::Json)?);
		},
	}

	Ok(())
}

/// Print a line of colors using the given format
fn print_colors(
	colors: &[(ColorCount, Srgb<u8>)],
	delimiter: &str,
	format: impl Fn(&ColorCount, Srgb<u8>) -> String,
) {
	println!("{}", colors.iter().map(|(entry, color)| format(entry, *color)).collect::<Vec<_>>().join(delimiter));
}

/// Format, colorize, and then print the text for all colors
fn color_format_print(
	colors: &[(ColorCount, Srgb<u8>)],
	options: &Options,
	format: impl Fn(&ColorCount, Srgb<u8>) -> String,
) {
	match options.colorize {
		Some(ColorizeOutput::Fg) => print_colors(colors, " ", |entry, color| {
			format(entry, color).truecolor(color.red, color.green, color.blue).to_string()
		}),

		Some(ColorizeOutput::Bg) => print_colors(colors, " ", |entry, color| {
			format(entry, color).on_truecolor(color.red, color.green, color.blue).to_string()
		}),

		None => print_colors(colors, " ", format),
	}
}
