//! Edge detection: gradient magnitude and direction fields.
//!
//! Converts an RGBA raster into per-pixel gradient magnitude and direction
//! using one of six operators. The magnetic lasso consumes the result as a
//! traversal cost field, so the field is built once per lasso session.
//!
//! ## Operators
//!
//! | Kernel | Size | Direction | Notes |
//! |--------|------|-----------|-------|
//! | Sobel | 3x3 | atan2(gy, gx) | |
//! | Prewitt | 3x3 | atan2(gy, gx) | |
//! | Scharr | 3x3 | atan2(gy, gx) | better rotational symmetry |
//! | Roberts | 2x2 | atan2(gy, gx) | no border skip, stops one pixel short |
//! | LoG | 3x3 | 0 | always blurred first |
//! | Canny | 3x3 | atan2(gy, gx) | blur, Sobel, NMS, hysteresis |
//!
//! Magnitudes are scaled by `sensitivity / 50`. Pixels within half a kernel
//! of the border keep zero magnitude.

use std::str::FromStr;

use log::debug;
use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::core::gaussian_blur_plane;
use crate::error::{SelectionError, SelectionResult};
use crate::selection::pixel_field::PixelField;

type Kernel3 = [[f32; 3]; 3];

const SOBEL_X: Kernel3 = [[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]];
const SOBEL_Y: Kernel3 = [[-1.0, -2.0, -1.0], [0.0, 0.0, 0.0], [1.0, 2.0, 1.0]];

const PREWITT_X: Kernel3 = [[-1.0, 0.0, 1.0], [-1.0, 0.0, 1.0], [-1.0, 0.0, 1.0]];
const PREWITT_Y: Kernel3 = [[-1.0, -1.0, -1.0], [0.0, 0.0, 0.0], [1.0, 1.0, 1.0]];

const SCHARR_X: Kernel3 = [[-3.0, 0.0, 3.0], [-10.0, 0.0, 10.0], [-3.0, 0.0, 3.0]];
const SCHARR_Y: Kernel3 = [[-3.0, -10.0, -3.0], [0.0, 0.0, 0.0], [3.0, 10.0, 3.0]];

const LAPLACIAN: Kernel3 = [[0.0, 1.0, 0.0], [1.0, -4.0, 1.0], [0.0, 1.0, 0.0]];

/// Blur used by LoG and Canny when no sigma is configured
const DEFAULT_SMOOTHING_SIGMA: f32 = 1.0;

/// Output value of strong (and promoted) Canny edge pixels
const CANNY_STRONG: f32 = 255.0;

/// Output value of weak Canny edge pixels not linked to a strong one
const CANNY_WEAK: f32 = 128.0;

/// Gradient operator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKernel {
    #[default]
    Sobel,
    Prewitt,
    Scharr,
    Roberts,
    #[serde(rename = "log")]
    LaplacianOfGaussian,
    Canny,
}

impl FromStr for EdgeKernel {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sobel" => Ok(EdgeKernel::Sobel),
            "prewitt" => Ok(EdgeKernel::Prewitt),
            "scharr" => Ok(EdgeKernel::Scharr),
            "roberts" | "roberts-cross" => Ok(EdgeKernel::Roberts),
            "log" | "laplacian" | "laplacian-of-gaussian" => Ok(EdgeKernel::LaplacianOfGaussian),
            "canny" => Ok(EdgeKernel::Canny),
            _ => Err(SelectionError::UnknownKernel(s.to_string())),
        }
    }
}

/// Options for building an edge field
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeOptions {
    pub kernel: EdgeKernel,
    /// Gaussian pre-blur sigma; 0 disables (LoG and Canny fall back to 1.0)
    pub blur_sigma: f32,
    /// Magnitude multiplier in percent of 50 (50 = unscaled)
    pub sensitivity: f32,
    /// Canny weak-edge threshold
    pub canny_low: f32,
    /// Canny strong-edge threshold
    pub canny_high: f32,
    /// Magnitude at which traversal cost bottoms out
    pub max_strength: f32,
}

impl Default for EdgeOptions {
    fn default() -> Self {
        Self {
            kernel: EdgeKernel::Sobel,
            blur_sigma: 0.0,
            sensitivity: 50.0,
            canny_low: 40.0,
            canny_high: 100.0,
            max_strength: 255.0,
        }
    }
}

impl EdgeOptions {
    pub fn new(kernel: EdgeKernel) -> Self {
        Self {
            kernel,
            ..Self::default()
        }
    }

    pub fn with_blur(mut self, sigma: f32) -> Self {
        self.blur_sigma = sigma;
        self
    }

    pub fn with_sensitivity(mut self, sensitivity: f32) -> Self {
        self.sensitivity = sensitivity;
        self
    }

    pub fn with_canny_thresholds(mut self, low: f32, high: f32) -> Self {
        self.canny_low = low;
        self.canny_high = high;
        self
    }

    pub fn validate(&self) -> SelectionResult<()> {
        let finite_non_negative = |name: &str, v: f32| {
            if v.is_finite() && v >= 0.0 {
                Ok(())
            } else {
                Err(SelectionError::InvalidParameters(format!(
                    "{name} must be a non-negative number, got {v}"
                )))
            }
        };
        finite_non_negative("blur_sigma", self.blur_sigma)?;
        finite_non_negative("sensitivity", self.sensitivity)?;
        finite_non_negative("canny_low", self.canny_low)?;
        finite_non_negative("canny_high", self.canny_high)?;
        if self.canny_low > self.canny_high {
            return Err(SelectionError::InvalidParameters(format!(
                "canny_low ({}) exceeds canny_high ({})",
                self.canny_low, self.canny_high
            )));
        }
        if !(self.max_strength.is_finite() && self.max_strength > 0.0) {
            return Err(SelectionError::InvalidParameters(format!(
                "max_strength must be positive, got {}",
                self.max_strength
            )));
        }
        Ok(())
    }

    fn smoothing_sigma(&self) -> f32 {
        match self.kernel {
            EdgeKernel::LaplacianOfGaussian | EdgeKernel::Canny if self.blur_sigma <= 0.0 => {
                DEFAULT_SMOOTHING_SIGMA
            }
            _ => self.blur_sigma,
        }
    }
}

/// Per-pixel gradient magnitude and direction (radians, -π..π).
#[derive(Clone, Debug)]
pub struct EdgeField {
    magnitude: Array2<f32>,
    direction: Array2<f32>,
    max_strength: f32,
}

impl EdgeField {
    /// Assemble a field from precomputed planes of shape (height, width).
    pub fn from_parts(
        magnitude: Array2<f32>,
        direction: Array2<f32>,
        max_strength: f32,
    ) -> SelectionResult<Self> {
        if magnitude.dim() != direction.dim() {
            return Err(SelectionError::InvalidParameters(format!(
                "magnitude {:?} and direction {:?} shapes differ",
                magnitude.dim(),
                direction.dim()
            )));
        }
        if !(max_strength.is_finite() && max_strength > 0.0) {
            return Err(SelectionError::InvalidParameters(format!(
                "max_strength must be positive, got {max_strength}"
            )));
        }
        Ok(Self {
            magnitude,
            direction,
            max_strength,
        })
    }

    /// Field with zero magnitude everywhere.
    pub fn flat(width: usize, height: usize, max_strength: f32) -> Self {
        Self {
            magnitude: Array2::zeros((height, width)),
            direction: Array2::zeros((height, width)),
            max_strength: max_strength.max(f32::EPSILON),
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.magnitude.dim().1
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.magnitude.dim().0
    }

    #[inline]
    pub fn max_strength(&self) -> f32 {
        self.max_strength
    }

    #[inline]
    fn in_bounds(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width() && (y as usize) < self.height()
    }

    /// Gradient magnitude; 0 when out of range.
    #[inline]
    pub fn magnitude(&self, x: i64, y: i64) -> f32 {
        if self.in_bounds(x, y) {
            self.magnitude[[y as usize, x as usize]]
        } else {
            0.0
        }
    }

    /// Gradient direction in radians; 0 when out of range.
    #[inline]
    pub fn direction(&self, x: i64, y: i64) -> f32 {
        if self.in_bounds(x, y) {
            self.direction[[y as usize, x as usize]]
        } else {
            0.0
        }
    }

    /// Magnitude normalized to 0..1 by `max_strength`.
    pub fn strength(&self, x: i64, y: i64) -> f32 {
        (self.magnitude(x, y) / self.max_strength).min(1.0)
    }

    /// Traversal cost: low where edges are strong. 0 when out of range.
    #[inline]
    pub fn cost(&self, x: i64, y: i64) -> f32 {
        if !self.in_bounds(x, y) {
            return 0.0;
        }
        self.max_strength - self.magnitude(x, y).min(self.max_strength)
    }

    /// Average magnitude over the in-bounds part of a square window.
    pub fn local_quality(&self, x: i64, y: i64, radius: u32) -> f32 {
        if !self.in_bounds(x, y) {
            return 0.0;
        }
        let r = radius as i64;
        let mut sum = 0.0f32;
        let mut count = 0u32;
        for wy in (y - r)..=(y + r) {
            for wx in (x - r)..=(x + r) {
                if self.in_bounds(wx, wy) {
                    sum += self.magnitude[[wy as usize, wx as usize]];
                    count += 1;
                }
            }
        }
        sum / count as f32
    }

    pub fn magnitude_array(&self) -> &Array2<f32> {
        &self.magnitude
    }

    pub fn direction_array(&self) -> &Array2<f32> {
        &self.direction
    }
}

/// Builds [`EdgeField`]s from pixel fields with a fixed set of options.
#[derive(Clone, Debug)]
pub struct EdgeFieldBuilder {
    options: EdgeOptions,
}

impl EdgeFieldBuilder {
    pub fn new(options: EdgeOptions) -> SelectionResult<Self> {
        options.validate()?;
        Ok(Self { options })
    }

    pub fn options(&self) -> &EdgeOptions {
        &self.options
    }

    /// Compute the edge field of `field`.
    pub fn build(&self, field: &PixelField) -> EdgeField {
        let (width, height) = (field.width(), field.height());
        let opts = &self.options;
        let scale = opts.sensitivity / 50.0;
        let sigma = opts.smoothing_sigma();

        let mut lum = field.luminance_array();
        if sigma > 0.0 {
            lum = gaussian_blur_plane(&lum, sigma);
        }
        let lum: Vec<f32> = lum.iter().copied().collect();

        let (magnitude, direction) = match opts.kernel {
            EdgeKernel::Sobel => gradient_3x3(&lum, width, height, &SOBEL_X, &SOBEL_Y, scale),
            EdgeKernel::Prewitt => gradient_3x3(&lum, width, height, &PREWITT_X, &PREWITT_Y, scale),
            EdgeKernel::Scharr => gradient_3x3(&lum, width, height, &SCHARR_X, &SCHARR_Y, scale),
            EdgeKernel::Roberts => roberts_cross(&lum, width, height, scale),
            EdgeKernel::LaplacianOfGaussian => laplacian(&lum, width, height, scale),
            EdgeKernel::Canny => {
                let (mag, dir) = gradient_3x3(&lum, width, height, &SOBEL_X, &SOBEL_Y, scale);
                let thin = non_max_suppression(&mag, &dir, width, height);
                let edges = hysteresis(&thin, width, height, opts.canny_low, opts.canny_high);
                (edges, dir)
            }
        };

        debug!(
            "edge field: {:?} {}x{} sigma {} sensitivity {}",
            opts.kernel, width, height, sigma, opts.sensitivity
        );

        EdgeField {
            magnitude: to_plane(magnitude, width, height),
            direction: to_plane(direction, width, height),
            max_strength: opts.max_strength,
        }
    }
}

/// Build an edge field in one call.
pub fn build_edge_field(field: &PixelField, options: &EdgeOptions) -> SelectionResult<EdgeField> {
    Ok(EdgeFieldBuilder::new(options.clone())?.build(field))
}

fn to_plane(values: Vec<f32>, width: usize, height: usize) -> Array2<f32> {
    Array2::from_shape_vec((height, width), values).unwrap_or_else(|_| Array2::zeros((height, width)))
}

// ============================================================================
// Gradient operators
// ============================================================================

/// Convolve a 3x3 kernel pair, skipping the 1-pixel border.
fn gradient_3x3(
    lum: &[f32],
    width: usize,
    height: usize,
    kernel_x: &Kernel3,
    kernel_y: &Kernel3,
    scale: f32,
) -> (Vec<f32>, Vec<f32>) {
    let mut magnitude = vec![0.0f32; width * height];
    let mut direction = vec![0.0f32; width * height];
    if width < 3 || height < 3 {
        return (magnitude, direction);
    }

    magnitude
        .par_chunks_mut(width)
        .zip(direction.par_chunks_mut(width))
        .enumerate()
        .for_each(|(y, (mag_row, dir_row))| {
            if y == 0 || y == height - 1 {
                return;
            }
            for x in 1..width - 1 {
                let mut gx = 0.0f32;
                let mut gy = 0.0f32;
                for ky in 0..3 {
                    let row = (y + ky - 1) * width;
                    for kx in 0..3 {
                        let v = lum[row + x + kx - 1];
                        gx += v * kernel_x[ky][kx];
                        gy += v * kernel_y[ky][kx];
                    }
                }
                mag_row[x] = (gx * gx + gy * gy).sqrt() * scale;
                dir_row[x] = gy.atan2(gx);
            }
        });

    (magnitude, direction)
}

/// Roberts cross on 2x2 blocks; the last row and column stay zero.
fn roberts_cross(lum: &[f32], width: usize, height: usize, scale: f32) -> (Vec<f32>, Vec<f32>) {
    let mut magnitude = vec![0.0f32; width * height];
    let mut direction = vec![0.0f32; width * height];
    if width < 2 || height < 2 {
        return (magnitude, direction);
    }

    magnitude
        .par_chunks_mut(width)
        .zip(direction.par_chunks_mut(width))
        .enumerate()
        .for_each(|(y, (mag_row, dir_row))| {
            if y == height - 1 {
                return;
            }
            let top = y * width;
            let bottom = (y + 1) * width;
            for x in 0..width - 1 {
                let gx = lum[top + x] - lum[bottom + x + 1];
                let gy = lum[top + x + 1] - lum[bottom + x];
                mag_row[x] = (gx * gx + gy * gy).sqrt() * scale;
                dir_row[x] = gy.atan2(gx);
            }
        });

    (magnitude, direction)
}

/// Absolute Laplacian response; direction is undefined and left at 0.
fn laplacian(lum: &[f32], width: usize, height: usize, scale: f32) -> (Vec<f32>, Vec<f32>) {
    let mut magnitude = vec![0.0f32; width * height];
    let direction = vec![0.0f32; width * height];
    if width < 3 || height < 3 {
        return (magnitude, direction);
    }

    magnitude
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, mag_row)| {
            if y == 0 || y == height - 1 {
                return;
            }
            for x in 1..width - 1 {
                let mut sum = 0.0f32;
                for ky in 0..3 {
                    let row = (y + ky - 1) * width;
                    for kx in 0..3 {
                        sum += lum[row + x + kx - 1] * LAPLACIAN[ky][kx];
                    }
                }
                mag_row[x] = sum.abs() * scale;
            }
        });

    (magnitude, direction)
}

// ============================================================================
// Canny stages
// ============================================================================

/// Step toward the positive side of the gradient, quantized to 4 octants.
#[inline]
fn octant_step(angle: f32) -> (isize, isize) {
    let mut deg = angle.to_degrees();
    if deg < 0.0 {
        deg += 180.0;
    }
    match ((deg / 45.0).round() as i32).rem_euclid(4) {
        0 => (1, 0),
        1 => (1, 1),
        2 => (0, 1),
        _ => (-1, 1),
    }
}

/// Thin edges to single-pixel ridges.
///
/// A pixel survives if it is strictly greater than its neighbor on the
/// negative side and not smaller than the one on the positive side, so a
/// plateau two pixels wide keeps exactly one of them.
fn non_max_suppression(mag: &[f32], dir: &[f32], width: usize, height: usize) -> Vec<f32> {
    let mut out = vec![0.0f32; width * height];
    if width < 3 || height < 3 {
        return out;
    }

    out.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
        if y == 0 || y == height - 1 {
            return;
        }
        for x in 1..width - 1 {
            let idx = y * width + x;
            let m = mag[idx];
            if m <= 0.0 {
                continue;
            }
            let (dx, dy) = octant_step(dir[idx]);
            let neg = mag[((y as isize - dy) as usize) * width + (x as isize - dx) as usize];
            let pos = mag[((y as isize + dy) as usize) * width + (x as isize + dx) as usize];
            if m > neg && m >= pos {
                row[x] = m;
            }
        }
    });

    out
}

/// Double threshold plus 8-neighbor hysteresis linking.
///
/// Pixels at or above `high` are strong (255), those at or above `low` are
/// weak (128). Weak pixels linked to a strong pixel are promoted to 255.
fn hysteresis(thin: &[f32], width: usize, height: usize, low: f32, high: f32) -> Vec<f32> {
    let n = width * height;
    let mut out = vec![0.0f32; n];
    let mut stack = Vec::new();

    for (i, &m) in thin.iter().enumerate() {
        if m <= 0.0 {
            continue;
        }
        if m >= high {
            out[i] = CANNY_STRONG;
            stack.push(i);
        } else if m >= low {
            out[i] = CANNY_WEAK;
        }
    }

    while let Some(i) = stack.pop() {
        let x = (i % width) as i64;
        let y = (i / width) as i64;
        for dy in -1..=1i64 {
            for dx in -1..=1i64 {
                let (nx, ny) = (x + dx, y + dy);
                if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                    continue;
                }
                let ni = ny as usize * width + nx as usize;
                if out[ni] == CANNY_WEAK {
                    out[ni] = CANNY_STRONG;
                    stack.push(ni);
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    fn image(width: usize, height: usize, value: impl Fn(usize, usize) -> u8) -> Vec<u8> {
        let mut data = vec![0u8; width * height * 4];
        for y in 0..height {
            for x in 0..width {
                let v = value(x, y);
                let i = (y * width + x) * 4;
                data[i] = v;
                data[i + 1] = v;
                data[i + 2] = v;
                data[i + 3] = 255;
            }
        }
        data
    }

    fn build(data: &[u8], width: usize, height: usize, options: EdgeOptions) -> EdgeField {
        let field = PixelField::new(data, width, height).unwrap();
        build_edge_field(&field, &options).unwrap()
    }

    #[test]
    fn test_kernel_names() {
        assert_eq!("Sobel".parse::<EdgeKernel>().unwrap(), EdgeKernel::Sobel);
        assert_eq!("roberts-cross".parse::<EdgeKernel>().unwrap(), EdgeKernel::Roberts);
        assert_eq!("log".parse::<EdgeKernel>().unwrap(), EdgeKernel::LaplacianOfGaussian);
        assert!(matches!(
            "kirsch".parse::<EdgeKernel>(),
            Err(SelectionError::UnknownKernel(_))
        ));
    }

    #[test]
    fn test_flat_image_has_no_edges() {
        let data = image(8, 8, |_, _| 128);
        for kernel in [
            EdgeKernel::Sobel,
            EdgeKernel::Prewitt,
            EdgeKernel::Scharr,
            EdgeKernel::Roberts,
            EdgeKernel::LaplacianOfGaussian,
            EdgeKernel::Canny,
        ] {
            let edges = build(&data, 8, 8, EdgeOptions::new(kernel));
            assert!(
                edges.magnitude_array().iter().all(|&v| v.abs() < 1e-3),
                "kernel {kernel:?}"
            );
        }
    }

    #[test]
    fn test_sobel_vertical_edge() {
        let data = image(6, 5, |x, _| if x < 3 { 0 } else { 255 });
        let edges = build(&data, 6, 5, EdgeOptions::default());

        // Columns 2 and 3 straddle the step: gx = 4 * 255
        assert!((edges.magnitude(2, 2) - 1020.0).abs() < 0.5);
        assert!((edges.magnitude(3, 2) - 1020.0).abs() < 0.5);
        assert!(edges.direction(2, 2).abs() < 1e-5);
        // Border is skipped
        assert_eq!(edges.magnitude(0, 2), 0.0);
        assert_eq!(edges.magnitude(2, 0), 0.0);
    }

    #[test]
    fn test_sensitivity_scales_magnitude() {
        let data = image(6, 5, |x, _| if x < 3 { 0 } else { 255 });
        let base = build(&data, 6, 5, EdgeOptions::default());
        let doubled = build(&data, 6, 5, EdgeOptions::default().with_sensitivity(100.0));
        assert!((doubled.magnitude(2, 2) - 2.0 * base.magnitude(2, 2)).abs() < 1e-2);
    }

    #[test]
    fn test_horizontal_edge_direction() {
        let data = image(5, 6, |_, y| if y < 3 { 0 } else { 255 });
        let edges = build(&data, 5, 6, EdgeOptions::new(EdgeKernel::Prewitt));
        assert!((edges.direction(2, 2) - FRAC_PI_2).abs() < 1e-5);
        assert!((edges.magnitude(2, 2) - 765.0).abs() < 0.5);
    }

    #[test]
    fn test_roberts_reaches_first_row_and_column() {
        let data = image(4, 4, |x, _| if x < 1 { 0 } else { 200 });
        let edges = build(&data, 4, 4, EdgeOptions::new(EdgeKernel::Roberts));
        assert!(edges.magnitude(0, 0) > 0.0);
        // Stops one pixel short of the far edges
        for i in 0..4 {
            assert_eq!(edges.magnitude(3, i), 0.0);
            assert_eq!(edges.magnitude(i, 3), 0.0);
        }
    }

    #[test]
    fn test_laplacian_has_zero_direction() {
        let data = image(9, 9, |x, y| if x == 4 && y == 4 { 255 } else { 0 });
        let edges = build(&data, 9, 9, EdgeOptions::new(EdgeKernel::LaplacianOfGaussian));
        assert!(edges.magnitude(4, 4) > 0.0);
        assert!(edges.direction_array().iter().all(|&d| d == 0.0));
    }

    #[test]
    fn test_canny_vertical_split_single_column() {
        let (w, h) = (100, 40);
        let data = image(w, h, |x, _| if x < w / 2 { 0 } else { 255 });
        let edges = build(&data, w, h, EdgeOptions::new(EdgeKernel::Canny));

        let strong_columns: Vec<usize> = (0..w)
            .filter(|&x| (1..h - 1).any(|y| edges.magnitude(x as i64, y as i64) > 0.0))
            .collect();
        assert_eq!(strong_columns.len(), 1);
        let col = strong_columns[0];
        assert!(col == 49 || col == 50);

        for y in 0..h {
            for x in 0..w {
                let m = edges.magnitude(x as i64, y as i64);
                if x == col && y > 0 && y < h - 1 {
                    assert_eq!(m, 255.0);
                    // gradient normal points across the split, the edge
                    // tangent runs along it at ±π/2
                    let d = edges.direction(x as i64, y as i64);
                    assert!(d.abs() < 1e-3 || (d.abs() - PI).abs() < 1e-3);
                    let tangent = (d + FRAC_PI_2).sin().atan2((d + FRAC_PI_2).cos());
                    assert!((tangent.abs() - FRAC_PI_2).abs() < 1e-3);
                } else {
                    assert_eq!(m, 0.0);
                }
            }
        }
    }

    #[test]
    fn test_canny_horizontal_split_direction() {
        let (w, h) = (30, 60);
        let data = image(w, h, |_, y| if y < h / 2 { 255 } else { 0 });
        let edges = build(&data, w, h, EdgeOptions::new(EdgeKernel::Canny));
        let row = (0..h)
            .find(|&y| edges.magnitude(10, y as i64) > 0.0)
            .unwrap();
        assert!(row == 29 || row == 30);
        assert!((edges.direction(10, row as i64).abs() - FRAC_PI_2).abs() < 1e-3);
    }

    #[test]
    fn test_canny_hysteresis_keeps_isolated_weak_edges() {
        let thin = vec![
            0.0, 0.0, 0.0, 0.0, 0.0, //
            0.0, 150.0, 60.0, 60.0, 0.0, //
            0.0, 0.0, 0.0, 0.0, 0.0, //
            40.0, 0.0, 0.0, 60.0, 0.0, //
        ];
        let out = hysteresis(&thin, 5, 4, 50.0, 100.0);
        assert_eq!(out[6], 255.0);
        assert_eq!(out[7], 255.0);
        assert_eq!(out[8], 255.0);
        // weak pixel two rows away is not connected and stays weak
        assert_eq!(out[18], CANNY_WEAK);
        assert_eq!(out[0], 0.0);
        // below the low threshold
        assert_eq!(out[15], 0.0);
    }

    #[test]
    fn test_cost_and_quality_queries() {
        let data = image(6, 5, |x, _| if x < 3 { 0 } else { 255 });
        let edges = build(&data, 6, 5, EdgeOptions::default());
        assert_eq!(edges.cost(2, 2), 0.0);
        assert_eq!(edges.cost(0, 2), 255.0);
        assert_eq!(edges.cost(-1, 2), 0.0);
        assert_eq!(edges.magnitude(99, 99), 0.0);
        assert_eq!(edges.strength(2, 2), 1.0);

        let q = edges.local_quality(2, 2, 1);
        let expected = (0..3)
            .flat_map(|dy| (0..3).map(move |dx| (1 + dx, 1 + dy)))
            .map(|(x, y)| edges.magnitude(x, y))
            .sum::<f32>()
            / 9.0;
        assert!((q - expected).abs() < 1e-3);
        assert_eq!(edges.local_quality(-3, 0, 2), 0.0);
    }

    #[test]
    fn test_invalid_options() {
        let opts = EdgeOptions::new(EdgeKernel::Canny).with_canny_thresholds(90.0, 10.0);
        assert!(EdgeFieldBuilder::new(opts).is_err());
        let opts = EdgeOptions::default().with_sensitivity(f32::NAN);
        assert!(EdgeFieldBuilder::new(opts).is_err());
    }

    #[test]
    fn test_tiny_images() {
        let data = image(2, 2, |x, _| (x * 255) as u8);
        for kernel in [EdgeKernel::Sobel, EdgeKernel::Canny, EdgeKernel::LaplacianOfGaussian] {
            let edges = build(&data, 2, 2, EdgeOptions::new(kernel));
            assert!(edges.magnitude_array().iter().all(|&v| v == 0.0));
        }
        let edges = build(&data, 2, 2, EdgeOptions::new(EdgeKernel::Roberts));
        assert!(edges.magnitude(0, 0) > 0.0);
    }
}
