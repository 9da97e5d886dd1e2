// THEORY:
// The `Frame` is the "dumb" data container at the bottom of the stack. It is a
// borrowed, read-only view of one grayscale image: one intensity byte per pixel,
// laid out row-major. The frame-source collaborator owns the buffer; the core only
// looks at it for the duration of a single processing step and never keeps it.
//
// Validation happens once, at construction, so every layer above can index rows
// without re-checking the buffer length.

use crate::error::{MotionError, Result};
use image::GrayImage;

/// A borrowed grayscale frame.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    width: u32,
    height: u32,
    pixels: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Wraps a row-major luma buffer. Both dimensions must be positive and the
    /// buffer must hold exactly `width * height` bytes.
    pub fn new(width: u32, height: u32, pixels: &'a [u8]) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(MotionError::invalid_frame(
                width,
                height,
                "frame dimensions must be positive",
            ));
        }
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(MotionError::invalid_frame(
                width,
                height,
                format!("expected {expected} bytes, got {}", pixels.len()),
            ));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Borrows the pixel buffer of an `image` luma image.
    pub fn from_gray_image(image: &'a GrayImage) -> Result<Self> {
        Self::new(image.width(), image.height(), image.as_raw())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &'a [u8] {
        self.pixels
    }

    /// The intensity values of row `y`.
    pub fn row(&self, y: u32) -> &'a [u8] {
        let start = y as usize * self.width as usize;
        &self.pixels[start..start + self.width as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_dimensions() {
        let err = Frame::new(0, 4, &[]).unwrap_err();
        assert!(matches!(err, MotionError::InvalidFrame { width: 0, .. }));
    }

    #[test]
    fn rejects_short_buffer() {
        let buffer = vec![0u8; 15];
        assert!(Frame::new(4, 4, &buffer).is_err());
    }

    #[test]
    fn rows_are_row_major() {
        let buffer: Vec<u8> = (0..12).collect();
        let frame = Frame::new(4, 3, &buffer).unwrap();
        assert_eq!(frame.row(0), &[0, 1, 2, 3]);
        assert_eq!(frame.row(2), &[8, 9, 10, 11]);
    }

    #[test]
    fn wraps_gray_image() {
        let image = GrayImage::from_pixel(6, 2, image::Luma([42]));
        let frame = Frame::from_gray_image(&image).unwrap();
        assert_eq!((frame.width(), frame.height()), (6, 2));
        assert!(frame.pixels().iter().all(|&p| p == 42));
    }
}
