//! Conversions between RGB colors and `#RRGGBB` hex strings

use crate::Pixel;
use std::str::FromStr;

/// Encode a [`Pixel`] as an uppercase `#RRGGBB` string
#[must_use]
pub fn encode(color: Pixel) -> String {
	format!("#{color:X}")
}

/// Encode three channel values as an uppercase `#RRGGBB` string.
///
/// Each value is rounded to the nearest integer and clamped to `0..=255`, so any input is accepted.
/// `NaN` channels are treated as `0`.
#[must_use]
pub fn encode_components([red, green, blue]: [f64; 3]) -> String {
	encode(Pixel::new(channel(red), channel(green), channel(blue)))
}

/// Round and clamp a single channel value into a `u8`
fn channel(value: f64) -> u8 {
	if value.is_nan() {
		return 0;
	}

	// clamped to the u8 range just before the cast
	#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
	let channel = value.round().clamp(0.0, 255.0) as u8;
	channel
}

/// Decode a `#RRGGBB` string (hex digits in either case) into a [`Pixel`].
///
/// Returns `None` for anything else, including the three digit short form.
#[must_use]
pub fn decode(hex: &str) -> Option<Pixel> {
	let digits = hex.strip_prefix('#')?;
	if digits.len() == 6 && digits.bytes().all(|b| b.is_ascii_hexdigit()) {
		Pixel::from_str(digits).ok()
	} else {
		None
	}
}
