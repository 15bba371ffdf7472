//! Pixel range conversions
//!
//! The generator ends in tanh, so training images are mapped from [0, 255]
//! to [-1, 1] and generated images are mapped back before writing:
//! - normalize: x_norm = (x - 127.5) / 127.5
//! - denormalize: x = x_norm * 127.5 + 127.5

use ndarray::{Array, Dimension};

/// Half of the 8-bit pixel range
pub const PIXEL_SCALE: f32 = 127.5;

/// Map raw pixels in [0, 255] to [-1, 1]
pub fn normalize_images<D: Dimension>(images: &Array<u8, D>) -> Array<f32, D> {
    images.mapv(|p| (p as f32 - PIXEL_SCALE) / PIXEL_SCALE)
}

/// Map a single normalized value back to an 8-bit pixel
///
/// Values outside [-1, 1] are clamped to the pixel range.
pub fn to_pixel(value: f32) -> u8 {
    (value * PIXEL_SCALE + PIXEL_SCALE).clamp(0.0, 255.0) as u8
}

/// Map normalized values in [-1, 1] back to pixels in [0, 255]
pub fn denormalize_images<D: Dimension>(images: &Array<f32, D>) -> Array<u8, D> {
    images.mapv(to_pixel)
}
