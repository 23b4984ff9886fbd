//! Read-only RGBA raster view shared by the selection engines.
//!
//! The host owns the pixel buffer; a `PixelField` borrows it for the
//! duration of one operation. Pixels are 4 bytes (R, G, B, A), row-major.

use ndarray::{Array2, ArrayView3};
use rayon::prelude::*;

use crate::error::{SelectionError, SelectionResult};

/// Luminance coefficients (ITU-R BT.601)
const LUMA_R: f32 = 0.299;
const LUMA_G: f32 = 0.587;
const LUMA_B: f32 = 0.114;

/// Borrowed RGBA pixel buffer with bounds-checked lookups.
#[derive(Clone, Copy, Debug)]
pub struct PixelField<'a> {
    data: &'a [u8],
    width: usize,
    height: usize,
}

impl<'a> PixelField<'a> {
    /// Wrap a flat RGBA buffer (length = width * height * 4).
    pub fn new(data: &'a [u8], width: usize, height: usize) -> SelectionResult<Self> {
        let expected = width * height * 4;
        if data.len() != expected {
            return Err(SelectionError::BufferSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Wrap an ndarray view of shape (height, width, 4).
    pub fn from_array(view: ArrayView3<'a, u8>) -> SelectionResult<Self> {
        let (height, width, channels) = view.dim();
        if channels != 4 {
            return Err(SelectionError::ChannelCount(channels));
        }
        let data = view.to_slice().ok_or(SelectionError::NonContiguous)?;
        Self::new(data, width, height)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of pixels.
    #[inline]
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    pub fn in_bounds(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    /// Pixel index for an in-bounds coordinate.
    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    /// Clamp an arbitrary coordinate to the nearest valid pixel.
    ///
    /// Returns `None` only for an empty field.
    pub fn clamp(&self, x: i64, y: i64) -> Option<(usize, usize)> {
        if self.is_empty() {
            return None;
        }
        let cx = x.clamp(0, self.width as i64 - 1) as usize;
        let cy = y.clamp(0, self.height as i64 - 1) as usize;
        Some((cx, cy))
    }

    /// RGBA at (x, y), or `None` when out of range.
    pub fn rgba(&self, x: i64, y: i64) -> Option<[u8; 4]> {
        if !self.in_bounds(x, y) {
            return None;
        }
        let i = self.index(x as usize, y as usize) * 4;
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    /// RGB of the pixel at a flat pixel index.
    #[inline]
    pub fn rgb_at(&self, index: usize) -> [u8; 3] {
        let i = index * 4;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Luminance (0-255) at (x, y); 0 when out of range.
    pub fn luminance(&self, x: i64, y: i64) -> f32 {
        match self.rgba(x, y) {
            Some([r, g, b, _]) => luminance(r, g, b),
            None => 0.0,
        }
    }

    /// Luminance of every pixel as a (height, width) array.
    pub fn luminance_array(&self) -> Array2<f32> {
        let mut lum = vec![0.0f32; self.len()];
        if !self.is_empty() {
            let width = self.width;
            lum.par_chunks_mut(width)
                .zip(self.data.par_chunks(width * 4))
                .for_each(|(out, row)| {
                    for (v, px) in out.iter_mut().zip(row.chunks_exact(4)) {
                        *v = luminance(px[0], px[1], px[2]);
                    }
                });
        }
        Array2::from_shape_vec((self.height, self.width), lum)
            .unwrap_or_else(|_| Array2::zeros((self.height, self.width)))
    }
}

/// Weighted luminance of an RGB triple.
#[inline]
pub fn luminance(r: u8, g: u8, b: u8) -> f32 {
    LUMA_R * r as f32 + LUMA_G * g as f32 + LUMA_B * b as f32
}

/// Euclidean distance between two RGB colors.
#[inline]
pub fn color_distance(a: [u8; 3], b: [u8; 3]) -> f64 {
    let dr = a[0] as f64 - b[0] as f64;
    let dg = a[1] as f64 - b[1] as f64;
    let db = a[2] as f64 - b[2] as f64;
    (dr * dr + dg * dg + db * db).sqrt()
}
