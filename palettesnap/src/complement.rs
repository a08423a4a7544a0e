//! Generates a palette from a few base colors and their complements
//!
//! The first half of the palette holds tints and shades of the base colors,
//! and the second half holds tints and shades of each base color rotated 180° around the HSL hue circle.
//! Each base color gets an even share of its half, with earlier colors taking any remainder.

use crate::{hex, Pixel};
use palette::{FromColor, Hsl, ShiftHue, Srgb};

/// The default number of colors to generate
pub const DEFAULT_TOTAL: usize = 10;

/// How much the lightness changes between successive tints or shades
const LIGHTNESS_STEP: f64 = 0.1;

/// The lightest tint that will be generated
const MAX_LIGHTNESS: f64 = 0.95;

/// The darkest shade that will be generated
const MIN_LIGHTNESS: f64 = 0.05;

/// A color in HSL with `f64` components
type HslColor = Hsl<palette::encoding::Srgb, f64>;

/// Convert a color to HSL
fn to_hsl(color: Pixel) -> HslColor {
	HslColor::from_color(color.into_format::<f64>())
}

/// Encode an HSL color as a `#RRGGBB` string
fn encode(color: HslColor) -> String {
	let rgb = Srgb::<f64>::from_color(color);
	hex::encode_components([rgb.red * 255.0, rgb.green * 255.0, rgb.blue * 255.0])
}

/// The color itself followed by alternating lighter tints and darker shades, `count` colors in total
fn tints_and_shades(color: HslColor, count: usize) -> Vec<String> {
	let with_lightness = |lightness| {
		let mut color = color;
		color.lightness = lightness;
		encode(color)
	};

	let mut colors = Vec::with_capacity(count);
	colors.push(encode(color));

	let mut step = 0.0;
	while colors.len() < count {
		step += LIGHTNESS_STEP;
		colors.push(with_lightness(f64::min(MAX_LIGHTNESS, color.lightness + step)));
		if colors.len() < count {
			colors.push(with_lightness(f64::max(MIN_LIGHTNESS, color.lightness - step)));
		}
	}

	colors.truncate(count);
	colors
}

/// Fill one half of the palette with `size` generated colors, skipping any already in `palette`
fn add_half(palette: &mut Vec<String>, colors: &[HslColor], size: usize) {
	let n = colors.len();
	let mut added = 0;
	for (i, &color) in colors.iter().enumerate() {
		let share = size.div_ceil(n) + usize::from(i < size % n);
		for hex in tints_and_shades(color, share) {
			if added == size {
				return;
			}
			// duplicates still use up a slot
			added += 1;
			if !palette.contains(&hex) {
				palette.push(hex);
			}
		}
	}
}

/// Generate up to `total` colors from `base` and its complementary colors.
///
/// The result holds no duplicates, so it may be shorter than `total`
/// (for example, gray base colors have gray complements).
/// An empty `base` gives an empty palette.
#[must_use]
pub fn palette(base: &[Pixel], total: usize) -> Vec<String> {
	if base.is_empty() {
		return Vec::new();
	}

	let base = base.iter().map(|&color| to_hsl(color)).collect::<Vec<_>>();
	let complements = base.iter().map(|&color| color.shift_hue(180.0)).collect::<Vec<_>>();

	let base_size = total / 2;
	let mut palette = Vec::with_capacity(total);
	add_half(&mut palette, &base, base_size);
	add_half(&mut palette, &complements, total - base_size);

	tracing::debug!(base = base.len(), total, generated = palette.len(), "generated complementary palette");

	palette.truncate(total);
	palette
}
