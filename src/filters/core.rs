//! Core utilities for image processing filters.
//!
//! This module provides shared functionality used by the edge filters:
//! - Gaussian kernel generation
//! - Separable Gaussian blur on single-channel float planes

use ndarray::Array2;
use rayon::prelude::*;

/// Generate a normalized 1D Gaussian kernel.
///
/// The radius is `ceil(3 * sigma)`, so the kernel has `2 * radius + 1` taps.
///
/// # Arguments
/// * `sigma` - Standard deviation of the Gaussian
///
/// # Returns
/// Normalized 1D kernel as Vec<f32>
pub fn gaussian_kernel_1d(sigma: f32) -> Vec<f32> {
    if sigma <= 0.0 || !sigma.is_finite() {
        return vec![1.0];
    }

    let radius = (3.0 * sigma).ceil() as usize;
    let size = 2 * radius + 1;

    let mut kernel: Vec<f32> = (0..size)
        .map(|i| {
            let x = i as f32 - radius as f32;
            (-x * x / (2.0 * sigma * sigma)).exp()
        })
        .collect();

    // Normalize
    let sum: f32 = kernel.iter().sum();
    for v in kernel.iter_mut() {
        *v /= sum;
    }

    kernel
}

/// Apply separable Gaussian blur to a (height, width) plane.
///
/// Borders are handled by clamping sample coordinates. Rows are processed
/// in parallel; the result is identical to a sequential pass.
pub fn gaussian_blur_plane(plane: &Array2<f32>, sigma: f32) -> Array2<f32> {
    let (height, width) = plane.dim();
    if sigma <= 0.0 || width == 0 || height == 0 {
        return plane.clone();
    }

    let kernel = gaussian_kernel_1d(sigma);
    let half = kernel.len() / 2;
    let src: Vec<f32> = plane.iter().copied().collect();

    // Horizontal pass
    let mut temp = vec![0.0f32; width * height];
    temp.par_chunks_mut(width)
        .zip(src.par_chunks(width))
        .for_each(|(out, row)| {
            for (x, v) in out.iter_mut().enumerate() {
                let mut sum = 0.0f32;
                for (ki, &kv) in kernel.iter().enumerate() {
                    let sx = (x as isize + ki as isize - half as isize)
                        .clamp(0, width as isize - 1) as usize;
                    sum += row[sx] * kv;
                }
                *v = sum;
            }
        });

    // Vertical pass
    let mut result = vec![0.0f32; width * height];
    result
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, out)| {
            for (x, v) in out.iter_mut().enumerate() {
                let mut sum = 0.0f32;
                for (ki, &kv) in kernel.iter().enumerate() {
                    let sy = (y as isize + ki as isize - half as isize)
                        .clamp(0, height as isize - 1) as usize;
                    sum += temp[sy * width + x] * kv;
                }
                *v = sum;
            }
        });

    Array2::from_shape_vec((height, width), result).unwrap_or_else(|_| plane.clone())
}
