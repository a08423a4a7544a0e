//! Errors surfaced by the palette pipeline

use thiserror::Error;

/// Errors that can occur when generating a palette.
///
/// Images with no opaque pixels, or with fewer distinct colors than requested,
/// are not errors and instead give an empty or shorter palette.
#[derive(Debug, Error)]
pub enum Error {
	/// The image could not be decoded
	#[error("failed to decode the image: {0}")]
	Decode(#[from] image::ImageError),

	/// A raw RGBA buffer does not match the given dimensions
	#[error("pixel buffer length {len} does not match dimensions {width}x{height} with 4 bytes per pixel")]
	DimensionMismatch {
		/// Length of the provided buffer in bytes
		len: usize,
		/// Provided width
		width: u32,
		/// Provided height
		height: u32,
	},
}
