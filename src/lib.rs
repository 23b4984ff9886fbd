//! StagSelect Rust Extensions
//!
//! Interactive pixel selection engines for image editors, with Python
//! bindings via PyO3 and WASM bindings for JavaScript.
//!
//! ## Image Format
//! All engines read RGBA8 rasters:
//! - **Flat slices**: `width * height * 4` bytes, row-major
//! - **ndarray views**: shape (height, width, 4), standard layout
//!
//! Masks are `width * height` bytes with 255 = selected, 0 = not selected.
//!
//! ## Engines
//! - **Magic wand** ([`selection::magic_wand`]): incremental flood fill by
//!   RGB tolerance, stepped by the caller's render loop
//! - **Transition** ([`selection::transition`]): cross-fades hover masks
//! - **Edge field** ([`filters::edge`]): gradient magnitude and direction
//! - **Magnetic lasso** ([`selection::lasso`]): edge-snapping path search,
//!   lazy cursor and automatic anchoring
//!
//! ## Execution Model
//! Engines are synchronous and own their working buffers. Long operations
//! are split into caller-driven batches (`process_batch`, `update`);
//! cancelling means dropping the engine.

pub mod error;
pub mod filters;
pub mod selection;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use error::{SelectionError, SelectionResult};

// Python bindings (only when python feature is enabled)
#[cfg(feature = "python")]
mod python {
    use ndarray::Array2;
    use numpy::{IntoPyArray, PyArray2, PyReadonlyArray3, ToPyArray};
    use pyo3::exceptions::PyValueError;
    use pyo3::prelude::*;

    use crate::error::SelectionError;
    use crate::filters::edge::{EdgeFieldBuilder, EdgeKernel, EdgeOptions};
    use crate::selection::lasso::{GraphSearchEngine, Point, SearchAlgorithm, SearchOptions};
    use crate::selection::magic_wand::{Connectivity, MagicWandOptions, RegionGrowthEngine};
    use crate::selection::pixel_field::PixelField;

    impl From<SelectionError> for PyErr {
        fn from(err: SelectionError) -> PyErr {
            PyValueError::new_err(err.to_string())
        }
    }

    // ========================================================================
    // Magic Wand
    // ========================================================================

    /// Select a region of similar color starting at (x, y).
    ///
    /// Input is an RGBA u8 array of shape (height, width, 4). Returns a
    /// (height, width) u8 mask.
    #[pyfunction]
    #[pyo3(signature = (image, x, y, tolerance=32.0, contiguous=true, connectivity=4))]
    pub fn magic_wand_select<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, u8>,
        x: i64,
        y: i64,
        tolerance: f64,
        contiguous: bool,
        connectivity: u32,
    ) -> PyResult<Bound<'py, PyArray2<u8>>> {
        let field = PixelField::from_array(image.as_array())?;
        let options = MagicWandOptions::new(tolerance, contiguous)
            .with_connectivity(Connectivity::try_from(connectivity)?);

        let mut engine = RegionGrowthEngine::new(field);
        engine.initialize((x, y), options)?;
        engine.run_to_completion();

        let mask = Array2::from_shape_vec((field.height(), field.width()), engine.into_mask())
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        Ok(mask.into_pyarray(py))
    }

    // ========================================================================
    // Edge Field
    // ========================================================================

    /// Gradient magnitude and direction planes of an RGBA u8 image.
    #[pyfunction]
    #[pyo3(signature = (image, kernel="sobel", blur_sigma=0.0, sensitivity=50.0))]
    pub fn edge_magnitude<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, u8>,
        kernel: &str,
        blur_sigma: f32,
        sensitivity: f32,
    ) -> PyResult<(Bound<'py, PyArray2<f32>>, Bound<'py, PyArray2<f32>>)> {
        let field = PixelField::from_array(image.as_array())?;
        let options = EdgeOptions::new(kernel.parse::<EdgeKernel>()?)
            .with_blur(blur_sigma)
            .with_sensitivity(sensitivity);
        let edges = EdgeFieldBuilder::new(options)?.build(&field);
        Ok((
            edges.magnitude_array().to_pyarray(py),
            edges.direction_array().to_pyarray(py),
        ))
    }

    // ========================================================================
    // Magnetic Lasso
    // ========================================================================

    /// Edge-snapping path between two points as a list of (x, y) tuples.
    #[pyfunction]
    #[pyo3(signature = (image, start, goal, algorithm="astar", kernel="sobel", max_search_radius=200.0))]
    pub fn lasso_find_path(
        image: PyReadonlyArray3<'_, u8>,
        start: (f64, f64),
        goal: (f64, f64),
        algorithm: &str,
        kernel: &str,
        max_search_radius: f64,
    ) -> PyResult<Vec<(f64, f64)>> {
        let field = PixelField::from_array(image.as_array())?;
        let edges = EdgeFieldBuilder::new(EdgeOptions::new(kernel.parse::<EdgeKernel>()?))?.build(&field);
        let options = SearchOptions::new(algorithm.parse::<SearchAlgorithm>()?).with_radius(max_search_radius);
        let mut search = GraphSearchEngine::new(options)?;
        let path = search.find_path(&edges, Point::from(start), Point::from(goal), &[]);
        Ok(path.into_iter().map(|p| (p.x, p.y)).collect())
    }

    /// StagSelect Rust extension module
    #[pymodule]
    pub fn stagselect(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(magic_wand_select, m)?)?;
        m.add_function(wrap_pyfunction!(edge_magnitude, m)?)?;
        m.add_function(wrap_pyfunction!(lasso_find_path, m)?)?;
        Ok(())
    }
}

#[cfg(feature = "python")]
pub use python::stagselect;
