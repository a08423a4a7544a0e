//! Bounds the number of pixels submitted to extraction and quantization

use image::{imageops, RgbaImage};

/// The default bound on the larger image dimension.
///
/// 150 keeps at most 22,500 pixels, which is enough to capture the color distribution of a photo
/// while keeping both quantizers well under interactive latency.
pub const DEFAULT_MAX_DIMENSION: u32 = 150;

/// Compute the downsampled dimensions for an image of `width` x `height`.
///
/// The larger dimension becomes `max_dimension` (or is left alone if it is already within the bound),
/// and the other dimension is scaled to preserve the aspect ratio, rounding to the nearest integer.
/// Both returned dimensions are at least `1`.
#[must_use]
pub fn dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
	let width = width.max(1);
	let height = height.max(1);
	let max_dimension = max_dimension.max(1);

	if width.max(height) <= max_dimension {
		(width, height)
	} else if width > height {
		(max_dimension, scale(height, max_dimension, width))
	} else {
		(scale(width, max_dimension, height), max_dimension)
	}
}

/// Computes `value * numerator / denominator` rounded to the nearest integer, with a minimum of `1`
fn scale(value: u32, numerator: u32, denominator: u32) -> u32 {
	let denominator = u64::from(denominator);
	let scaled = (u64::from(value) * u64::from(numerator) + denominator / 2) / denominator;
	// value < denominator here, so the result is at most numerator
	u32::try_from(scaled).unwrap_or(numerator).max(1)
}

/// Resize `image` so that its larger dimension is at most `max_dimension`.
///
/// Images already within the bound are returned unchanged.
#[must_use]
pub fn downsample(image: RgbaImage, max_dimension: u32) -> RgbaImage {
	let (width, height) = image.dimensions();
	let (new_width, new_height) = dimensions(width, height, max_dimension);

	if (new_width, new_height) == (width, height) {
		tracing::trace!(width, height, "skipping downsampling since the image is within bounds");
		image
	} else {
		tracing::debug!(width, height, new_width, new_height, "downsampling image");
		imageops::thumbnail(&image, new_width, new_height)
	}
}
