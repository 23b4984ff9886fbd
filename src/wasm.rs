//! WebAssembly exports for StagSelect.
//!
//! These functions are exposed to JavaScript via wasm-bindgen.
//!
//! ## Data Layout
//!
//! - **Images**: flat RGBA bytes (length = width * height * 4)
//! - **Masks**: flat bytes (length = width * height), 255 = selected
//! - **Paths**: flat `[x0, y0, x1, y1, ...]` float arrays
//!
//! Timestamps are milliseconds as delivered by pointer events.

use wasm_bindgen::prelude::*;

use crate::error::SelectionError;
use crate::filters::edge::{EdgeFieldBuilder, EdgeKernel, EdgeOptions};
use crate::selection::lasso::{LassoOptions, LassoSession, Point, Variation};
use crate::selection::magic_wand::{Connectivity, MagicWandOptions};
use crate::selection::pixel_field::PixelField;
use crate::selection::transition::MaskTransitionBlender;
use crate::selection::magic_wand_select_detailed;

fn js_error(err: SelectionError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn flatten(points: &[Point]) -> Vec<f64> {
    points.iter().flat_map(|p| [p.x, p.y]).collect()
}

// ============================================================================
// Magic Wand
// ============================================================================

/// Select a region of similar color.
///
/// # Arguments
/// * `data` - Flat array of RGBA bytes (length = width * height * 4)
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
/// * `x`, `y` - Seed pixel (clamped into the image)
/// * `tolerance` - Euclidean RGB distance threshold
/// * `contiguous` - Only select pixels connected to the seed
/// * `connectivity` - 4 or 8
///
/// # Returns
/// Flat mask (length = width * height)
#[wasm_bindgen]
#[allow(clippy::too_many_arguments)]
pub fn magic_wand_select_wasm(
    data: &[u8],
    width: usize,
    height: usize,
    x: i32,
    y: i32,
    tolerance: f64,
    contiguous: bool,
    connectivity: u32,
) -> Result<Vec<u8>, JsValue> {
    let options = MagicWandOptions::new(tolerance, contiguous)
        .with_connectivity(Connectivity::try_from(connectivity).map_err(js_error)?);
    let result = magic_wand_select_detailed(data, width, height, x as i64, y as i64, &options)
        .map_err(js_error)?;
    Ok(result.mask)
}

// ============================================================================
// Edge Field
// ============================================================================

/// Gradient magnitude of an RGBA image.
///
/// # Arguments
/// * `kernel` - "sobel", "prewitt", "scharr", "roberts", "log" or "canny"
///
/// # Returns
/// Flat magnitude plane (length = width * height)
#[wasm_bindgen]
pub fn edge_magnitude_wasm(
    data: &[u8],
    width: usize,
    height: usize,
    kernel: &str,
    blur_sigma: f32,
    sensitivity: f32,
) -> Result<Vec<f32>, JsValue> {
    let field = PixelField::new(data, width, height).map_err(js_error)?;
    let kernel = kernel.parse::<EdgeKernel>().map_err(js_error)?;
    let options = EdgeOptions::new(kernel)
        .with_blur(blur_sigma)
        .with_sensitivity(sensitivity);
    let edges = EdgeFieldBuilder::new(options).map_err(js_error)?.build(&field);
    Ok(edges.magnitude_array().iter().copied().collect())
}

// ============================================================================
// Hover Transition
// ============================================================================

/// Cross-fades successive magic wand hover masks.
#[wasm_bindgen]
pub struct WasmMaskBlender {
    inner: MaskTransitionBlender,
}

#[wasm_bindgen]
impl WasmMaskBlender {
    #[wasm_bindgen(constructor)]
    pub fn new(decay_step: u8) -> WasmMaskBlender {
        WasmMaskBlender {
            inner: MaskTransitionBlender::new(decay_step),
        }
    }

    /// Blend a new mask in and return the mask to display.
    pub fn update(&mut self, mask: &[u8], width: usize, height: usize) -> Result<Vec<u8>, JsValue> {
        let frame = self.inner.update(mask, width, height).map_err(js_error)?;
        Ok(frame.display.to_vec())
    }

    /// True while deselected pixels are still fading.
    pub fn is_animating(&self) -> bool {
        self.inner.is_animating()
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }
}

// ============================================================================
// Magnetic Lasso
// ============================================================================

/// Magnetic lasso session over one image.
#[wasm_bindgen]
pub struct WasmLassoSession {
    inner: LassoSession,
}

#[wasm_bindgen]
impl WasmLassoSession {
    /// Build the edge field and create an idle session.
    ///
    /// # Arguments
    /// * `variation` - "classic", "auto-distance", "elastic" or "predictive"
    /// * `kernel` - Edge operator name
    #[wasm_bindgen(constructor)]
    pub fn new(
        data: &[u8],
        width: usize,
        height: usize,
        variation: &str,
        kernel: &str,
    ) -> Result<WasmLassoSession, JsValue> {
        let field = PixelField::new(data, width, height).map_err(js_error)?;
        let variation = variation.parse::<Variation>().map_err(js_error)?;
        let kernel = kernel.parse::<EdgeKernel>().map_err(js_error)?;
        let options = LassoOptions::default()
            .with_variation(variation)
            .with_edge(EdgeOptions::new(kernel));
        let inner = LassoSession::new(&field, options).map_err(js_error)?;
        Ok(WasmLassoSession { inner })
    }

    pub fn start(&mut self, x: f64, y: f64, timestamp: f64) -> Result<(), JsValue> {
        self.inner
            .start(Point::new(x, y), timestamp as u64)
            .map_err(js_error)
    }

    /// Feed a pointer event; returns the preview path.
    pub fn update(&mut self, x: f64, y: f64, timestamp: f64) -> Result<Vec<f64>, JsValue> {
        let preview = self
            .inner
            .update(Point::new(x, y), timestamp as u64)
            .map_err(js_error)?;
        Ok(flatten(preview))
    }

    pub fn add_anchor(&mut self, x: f64, y: f64, timestamp: f64) -> Result<(), JsValue> {
        self.inner
            .add_anchor(Point::new(x, y), timestamp as u64)
            .map_err(js_error)
    }

    pub fn remove_last_anchor(&mut self) -> Result<bool, JsValue> {
        self.inner.remove_last_anchor().map_err(js_error)
    }

    /// Finish tracing; returns the final boundary.
    pub fn complete(&mut self, close_path: bool) -> Result<Vec<f64>, JsValue> {
        let path = self.inner.complete(close_path).map_err(js_error)?;
        Ok(flatten(&path))
    }

    pub fn cancel(&mut self) -> Result<(), JsValue> {
        self.inner.cancel().map_err(js_error)
    }

    /// Back to idle, keeping the edge field.
    pub fn reset(&mut self) {
        self.inner.reset();
    }

    pub fn state(&self) -> String {
        self.inner.state().as_str().to_string()
    }

    pub fn committed_path(&self) -> Vec<f64> {
        flatten(self.inner.committed_path())
    }

    /// Flat `[x0, y0, x1, y1, ...]` anchor positions.
    pub fn anchor_points(&self) -> Vec<f64> {
        self.inner.anchors().iter().flat_map(|a| [a.point.x, a.point.y]).collect()
    }

    pub fn anchor_count(&self) -> usize {
        self.inner.metrics().anchor_count
    }

    pub fn fps(&self) -> f64 {
        self.inner.metrics().fps
    }

    pub fn path_compute_ms(&self) -> f64 {
        self.inner.metrics().path_compute_ms
    }

    pub fn prediction_confidence(&self) -> f64 {
        self.inner.metrics().prediction_confidence
    }

    pub fn edge_quality(&self) -> f32 {
        self.inner.metrics().last_edge_quality
    }
}
