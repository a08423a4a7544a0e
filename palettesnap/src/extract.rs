//! Filters raw RGBA pixel data into the opaque RGB colors that should influence a palette

use crate::Pixel;

/// The default alpha cutoff: pixels more than about 50% transparent are dropped
pub const DEFAULT_ALPHA_THRESHOLD: u8 = 128;

/// Channel values above this are considered near-white (when all three channels exceed it)
const NEAR_WHITE_MIN: u8 = 250;

/// Channel values below this are considered near-black (when all three channels are under it)
const NEAR_BLACK_MAX: u8 = 5;

/// Decides which pixels are kept during extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(default))]
pub struct PixelFilter {
	/// Pixels with an alpha value below this are dropped
	pub alpha_threshold: u8,
	/// Also drop near-white and near-black pixels
	///
	/// This keeps large flat backgrounds from dominating the palette.
	pub exclude_near_white_black: bool,
}

impl Default for PixelFilter {
	fn default() -> Self {
		Self { alpha_threshold: DEFAULT_ALPHA_THRESHOLD, exclude_near_white_black: false }
	}
}

impl PixelFilter {
	/// Whether an RGBA pixel should be kept
	#[must_use]
	pub fn keeps(&self, [r, g, b, a]: [u8; 4]) -> bool {
		a >= self.alpha_threshold && !(self.exclude_near_white_black && is_extreme(r, g, b))
	}
}

/// Near-white or near-black
fn is_extreme(r: u8, g: u8, b: u8) -> bool {
	let near_white = r > NEAR_WHITE_MIN && g > NEAR_WHITE_MIN && b > NEAR_WHITE_MIN;
	let near_black = r < NEAR_BLACK_MAX && g < NEAR_BLACK_MAX && b < NEAR_BLACK_MAX;
	near_white || near_black
}

/// Extract the pixels kept by `filter` from row-major RGBA data, dropping alpha.
///
/// Any trailing bytes that do not form a whole pixel are ignored.
/// The result may be empty, e.g., for a fully transparent image.
#[must_use]
pub fn extract_pixels(rgba: &[u8], filter: &PixelFilter) -> Vec<Pixel> {
	let pixels = rgba
		.chunks_exact(4)
		.filter_map(|chunk| {
			let rgba = [chunk[0], chunk[1], chunk[2], chunk[3]];
			filter.keeps(rgba).then(|| Pixel::new(rgba[0], rgba[1], rgba[2]))
		})
		.collect::<Vec<_>>();

	tracing::debug!(input = rgba.len() / 4, kept = pixels.len(), "extracted pixels");

	pixels
}

#[cfg(test)]
mod tests {
	use super::*;

	fn rgba(pixels: &[[u8; 4]]) -> Vec<u8> {
		pixels.iter().flatten().copied().collect()
	}

	#[test]
	fn drops_translucent_pixels() {
		let data = rgba(&[[1, 2, 3, 255], [4, 5, 6, 127], [7, 8, 9, 128], [0, 0, 0, 0]]);
		let pixels = extract_pixels(&data, &PixelFilter::default());
		assert_eq!(pixels, vec![Pixel::new(1, 2, 3), Pixel::new(7, 8, 9)]);
	}

	#[test]
	fn alpha_threshold_is_configurable() {
		let data = rgba(&[[1, 2, 3, 150], [4, 5, 6, 200], [7, 8, 9, 255]]);
		let filter = PixelFilter { alpha_threshold: 200, ..PixelFilter::default() };
		assert_eq!(extract_pixels(&data, &filter), vec![Pixel::new(4, 5, 6), Pixel::new(7, 8, 9)]);

		let filter = PixelFilter { alpha_threshold: 0, ..PixelFilter::default() };
		assert_eq!(extract_pixels(&[0, 0, 0, 0], &filter), vec![Pixel::new(0, 0, 0)]);
	}

	#[test]
	fn near_white_and_black_kept_by_default() {
		let data = rgba(&[[255, 255, 255, 255], [0, 0, 0, 255]]);
		assert_eq!(extract_pixels(&data, &PixelFilter::default()).len(), 2);
	}

	#[test]
	fn near_white_and_black_can_be_excluded() {
		let data = rgba(&[
			[255, 255, 255, 255],
			[251, 251, 251, 255],
			[250, 255, 255, 255],
			[4, 4, 4, 255],
			[5, 0, 0, 255],
			[0, 0, 0, 255],
			[128, 64, 32, 255],
		]);
		let filter = PixelFilter { exclude_near_white_black: true, ..PixelFilter::default() };
		assert_eq!(
			extract_pixels(&data, &filter),
			vec![Pixel::new(250, 255, 255), Pixel::new(5, 0, 0), Pixel::new(128, 64, 32)]
		);
	}

	#[test]
	fn empty_and_partial_input() {
		assert!(extract_pixels(&[], &PixelFilter::default()).is_empty());
		assert_eq!(extract_pixels(&[9, 8, 7, 255, 1, 2], &PixelFilter::default()), vec![Pixel::new(9, 8, 7)]);
	}
}
