//! Magic wand selection using an incremental, budgeted flood fill.
//!
//! Selects regions of similar color based on Euclidean RGB tolerance.
//! The fill runs in batches so a render loop can interleave it with drawing:
//! call [`RegionGrowthEngine::process_batch`] once per frame until it
//! reports completion.

use std::collections::VecDeque;
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{SelectionError, SelectionResult};
use crate::selection::pixel_field::{color_distance, PixelField};

// Per-pixel fill state
const UNSEEN: u8 = 0;
const QUEUED: u8 = 1;
const ACCEPTED: u8 = 2;
const REJECTED: u8 = 3;

const NEIGHBORS_4: [(i64, i64); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
const NEIGHBORS_8: [(i64, i64); 8] = [
    (-1, 0),
    (1, 0),
    (0, -1),
    (0, 1),
    (-1, -1),
    (1, -1),
    (-1, 1),
    (1, 1),
];

/// Pixel adjacency used for flood fill and grid search.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Connectivity {
    #[default]
    Four,
    Eight,
}

impl Connectivity {
    /// Neighbor offsets as (dx, dy).
    pub fn offsets(self) -> &'static [(i64, i64)] {
        match self {
            Connectivity::Four => &NEIGHBORS_4,
            Connectivity::Eight => &NEIGHBORS_8,
        }
    }
}

impl TryFrom<u32> for Connectivity {
    type Error = SelectionError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            4 => Ok(Connectivity::Four),
            8 => Ok(Connectivity::Eight),
            other => Err(SelectionError::InvalidConnectivity(other)),
        }
    }
}

impl From<Connectivity> for u32 {
    fn from(value: Connectivity) -> Self {
        match value {
            Connectivity::Four => 4,
            Connectivity::Eight => 8,
        }
    }
}

/// Visual growth pattern of the fill front.
///
/// The final mask does not depend on the shape; only the order in which
/// pixels are accepted does.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpansionShape {
    #[default]
    Square,
    Circular,
    Diamond,
}

impl FromStr for ExpansionShape {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "square" => Ok(ExpansionShape::Square),
            "circular" | "circle" => Ok(ExpansionShape::Circular),
            "diamond" => Ok(ExpansionShape::Diamond),
            _ => Err(SelectionError::UnknownShape(s.to_string())),
        }
    }
}

/// Options for magic wand selection
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MagicWandOptions {
    /// Maximum Euclidean RGB distance from the seed color
    pub tolerance: f64,
    /// Only select pixels connected to the seed
    pub contiguous: bool,
    pub connectivity: Connectivity,
    /// Stop after this many pixels are selected (0 = unlimited)
    pub max_pixels: u32,
    pub expansion_shape: ExpansionShape,
    /// Ring radius growth per batch for circular/diamond expansion
    pub ring_step: f64,
    /// Width of the acceptance band beyond the current ring
    pub band_width: f64,
}

impl Default for MagicWandOptions {
    fn default() -> Self {
        Self {
            tolerance: 32.0,
            contiguous: true,
            connectivity: Connectivity::Four,
            max_pixels: 0,
            expansion_shape: ExpansionShape::Square,
            ring_step: 8.0,
            band_width: 4.0,
        }
    }
}

impl MagicWandOptions {
    pub fn new(tolerance: f64, contiguous: bool) -> Self {
        Self {
            tolerance,
            contiguous,
            ..Self::default()
        }
    }

    pub fn with_connectivity(mut self, connectivity: Connectivity) -> Self {
        self.connectivity = connectivity;
        self
    }

    pub fn with_max_pixels(mut self, max_pixels: u32) -> Self {
        self.max_pixels = max_pixels;
        self
    }

    pub fn with_expansion_shape(mut self, shape: ExpansionShape) -> Self {
        self.expansion_shape = shape;
        self
    }

    pub fn validate(&self) -> SelectionResult<()> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(SelectionError::InvalidParameters(format!(
                "tolerance must be a non-negative number, got {}",
                self.tolerance
            )));
        }
        if self.expansion_shape != ExpansionShape::Square {
            if !self.ring_step.is_finite() || self.ring_step < 1.0 {
                return Err(SelectionError::InvalidParameters(format!(
                    "ring_step must be at least 1.0, got {}",
                    self.ring_step
                )));
            }
            if !self.band_width.is_finite() || self.band_width < 0.0 {
                return Err(SelectionError::InvalidParameters(format!(
                    "band_width must be non-negative, got {}",
                    self.band_width
                )));
            }
        }
        Ok(())
    }
}

/// Magic wand selection result with metadata.
pub struct MagicWandResult {
    /// Selection mask (255 = selected, 0 = not selected)
    pub mask: Vec<u8>,
    /// Bounds of selected region
    pub bounds: Option<(usize, usize, usize, usize)>, // (x, y, width, height)
    /// Number of selected pixels
    pub pixel_count: usize,
}

/// Incremental flood fill over a borrowed pixel field.
///
/// Working buffers are allocated once per engine and reset on every
/// [`initialize`](Self::initialize), so a hover session can reuse one engine
/// across many seeds without per-frame allocation.
pub struct RegionGrowthEngine<'a> {
    field: PixelField<'a>,
    options: MagicWandOptions,
    seed: (usize, usize),
    seed_color: [u8; 3],
    mask: Vec<u8>,
    state: Vec<u8>,
    queue: VecDeque<u32>,
    // current/next ring frontiers for banded expansion, both FIFO
    frontier: VecDeque<u32>,
    deferred: VecDeque<u32>,
    ring_radius: f64,
    scan_cursor: usize,
    pixel_count: usize,
    min_x: usize,
    min_y: usize,
    max_x: usize,
    max_y: usize,
    batches: u32,
    complete: bool,
}

impl<'a> RegionGrowthEngine<'a> {
    pub fn new(field: PixelField<'a>) -> Self {
        let n = field.len();
        Self {
            field,
            options: MagicWandOptions::default(),
            seed: (0, 0),
            seed_color: [0; 3],
            mask: vec![0; n],
            state: vec![UNSEEN; n],
            queue: VecDeque::new(),
            frontier: VecDeque::new(),
            deferred: VecDeque::new(),
            ring_radius: 0.0,
            scan_cursor: 0,
            pixel_count: 0,
            min_x: 0,
            min_y: 0,
            max_x: 0,
            max_y: 0,
            batches: 0,
            complete: true,
        }
    }

    /// Start a new selection from `seed`.
    ///
    /// Seeds outside the field are clamped to the nearest pixel.
    pub fn initialize(&mut self, seed: (i64, i64), options: MagicWandOptions) -> SelectionResult<()> {
        options.validate()?;
        self.options = options;
        self.mask.fill(0);
        self.state.fill(UNSEEN);
        self.queue.clear();
        self.frontier.clear();
        self.deferred.clear();
        self.ring_radius = 0.0;
        self.scan_cursor = 0;
        self.pixel_count = 0;
        self.min_x = self.field.width();
        self.min_y = self.field.height();
        self.max_x = 0;
        self.max_y = 0;
        self.batches = 0;

        let Some((sx, sy)) = self.field.clamp(seed.0, seed.1) else {
            self.complete = true;
            return Ok(());
        };
        self.seed = (sx, sy);
        let seed_idx = self.field.index(sx, sy);
        self.seed_color = self.field.rgb_at(seed_idx);
        self.complete = false;

        if self.options.contiguous {
            self.state[seed_idx] = QUEUED;
            match self.options.expansion_shape {
                ExpansionShape::Square => self.queue.push_back(seed_idx as u32),
                _ => self.frontier.push_back(seed_idx as u32),
            }
        }

        debug!(
            "magic wand: seed ({}, {}) -> ({}, {}), tolerance {}, contiguous {}, shape {:?}",
            seed.0,
            seed.1,
            sx,
            sy,
            self.options.tolerance,
            self.options.contiguous,
            self.options.expansion_shape
        );
        Ok(())
    }

    /// Process at most `max_steps` pixels. Returns true once the fill is complete.
    pub fn process_batch(&mut self, max_steps: u32) -> bool {
        if self.complete {
            return true;
        }
        self.batches += 1;

        let done = if !self.options.contiguous {
            self.scan_global(max_steps as usize)
        } else {
            match self.options.expansion_shape {
                ExpansionShape::Square => self.grow_queue(max_steps as usize),
                _ => self.grow_banded(max_steps as usize),
            }
        };

        if done || self.limit_reached() {
            self.complete = true;
            debug!(
                "magic wand: complete with {} pixels after {} batches",
                self.pixel_count, self.batches
            );
        }
        self.complete
    }

    /// Drive the fill until it completes.
    pub fn run_to_completion(&mut self) {
        while !self.process_batch(u32::MAX) {}
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Current selection mask (255 = selected).
    pub fn mask(&self) -> &[u8] {
        &self.mask
    }

    pub fn into_mask(self) -> Vec<u8> {
        self.mask
    }

    pub fn pixel_count(&self) -> usize {
        self.pixel_count
    }

    /// Bounds of the selected region as (x, y, width, height).
    pub fn bounds(&self) -> Option<(usize, usize, usize, usize)> {
        if self.pixel_count == 0 {
            return None;
        }
        Some((
            self.min_x,
            self.min_y,
            self.max_x - self.min_x + 1,
            self.max_y - self.min_y + 1,
        ))
    }

    /// Seed after clamping.
    pub fn seed(&self) -> (usize, usize) {
        self.seed
    }

    pub fn seed_color(&self) -> [u8; 3] {
        self.seed_color
    }

    pub fn options(&self) -> &MagicWandOptions {
        &self.options
    }

    fn limit_reached(&self) -> bool {
        self.options.max_pixels > 0 && self.pixel_count >= self.options.max_pixels as usize
    }

    #[inline]
    fn matches(&self, idx: usize) -> bool {
        color_distance(self.field.rgb_at(idx), self.seed_color) <= self.options.tolerance
    }

    fn accept(&mut self, idx: usize) {
        let width = self.field.width();
        let (x, y) = (idx % width, idx / width);
        self.state[idx] = ACCEPTED;
        self.mask[idx] = 255;
        self.pixel_count += 1;
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    /// Test one dequeued pixel; on acceptance, hand its unseen neighbors to `push`.
    fn visit(&mut self, idx: usize, push: &mut dyn FnMut(&mut Self, u32)) {
        if self.state[idx] != QUEUED {
            return;
        }
        if !self.matches(idx) {
            self.state[idx] = REJECTED;
            return;
        }
        self.accept(idx);

        let width = self.field.width();
        let (x, y) = ((idx % width) as i64, (idx / width) as i64);
        for &(dx, dy) in self.options.connectivity.offsets() {
            let (nx, ny) = (x + dx, y + dy);
            if !self.field.in_bounds(nx, ny) {
                continue;
            }
            let nidx = self.field.index(nx as usize, ny as usize);
            if self.state[nidx] == UNSEEN {
                self.state[nidx] = QUEUED;
                push(self, nidx as u32);
            }
        }
    }

    fn grow_queue(&mut self, max_steps: usize) -> bool {
        let mut steps = 0;
        while steps < max_steps {
            let Some(idx) = self.queue.pop_front() else {
                return true;
            };
            self.visit(idx as usize, &mut |engine, n| engine.queue.push_back(n));
            steps += 1;
            if self.limit_reached() {
                return true;
            }
        }
        self.queue.is_empty()
    }

    /// Distance from the seed in the metric of the expansion shape.
    fn shape_distance(&self, idx: usize) -> f64 {
        let width = self.field.width();
        let dx = (idx % width) as f64 - self.seed.0 as f64;
        let dy = (idx / width) as f64 - self.seed.1 as f64;
        match self.options.expansion_shape {
            ExpansionShape::Diamond => dx.abs() + dy.abs(),
            _ => (dx * dx + dy * dy).sqrt(),
        }
    }

    fn grow_banded(&mut self, max_steps: usize) -> bool {
        let limit = self.ring_radius + self.options.band_width;
        let mut steps = 0;
        while steps < max_steps {
            let Some(idx) = self.frontier.pop_front() else {
                break;
            };
            steps += 1;
            let idx = idx as usize;
            if self.shape_distance(idx) > limit {
                // outside the band: retry on a later ring
                self.deferred.push_back(idx as u32);
                continue;
            }
            self.visit(idx, &mut |engine, n| engine.frontier.push_back(n));
            if self.limit_reached() {
                return true;
            }
        }

        if self.frontier.is_empty() {
            std::mem::swap(&mut self.frontier, &mut self.deferred);
        }
        self.ring_radius += self.options.ring_step;
        self.frontier.is_empty() && self.deferred.is_empty()
    }

    fn scan_global(&mut self, max_steps: usize) -> bool {
        let n = self.field.len();
        let end = self.scan_cursor.saturating_add(max_steps).min(n);
        for idx in self.scan_cursor..end {
            if self.matches(idx) {
                self.accept(idx);
                if self.limit_reached() {
                    self.scan_cursor = idx + 1;
                    return true;
                }
            } else {
                self.state[idx] = REJECTED;
            }
        }
        self.scan_cursor = end;
        self.scan_cursor >= n
    }
}

/// Perform magic wand selection using flood fill.
///
/// # Arguments
/// * `image` - RGBA image data (4 bytes per pixel)
/// * `width` - Image width
/// * `height` - Image height
/// * `start_x` - Starting X coordinate (clamped into the image)
/// * `start_y` - Starting Y coordinate (clamped into the image)
/// * `tolerance` - Euclidean RGB distance threshold
/// * `contiguous` - If true, only selects connected pixels; if false, selects all matching pixels
///
/// # Returns
/// Selection mask as Vec<u8>
pub fn magic_wand_select(
    image: &[u8],
    width: usize,
    height: usize,
    start_x: i64,
    start_y: i64,
    tolerance: f64,
    contiguous: bool,
) -> SelectionResult<Vec<u8>> {
    let options = MagicWandOptions::new(tolerance, contiguous);
    let result = magic_wand_select_detailed(image, width, height, start_x, start_y, &options)?;
    Ok(result.mask)
}

/// Perform magic wand selection with detailed results.
pub fn magic_wand_select_detailed(
    image: &[u8],
    width: usize,
    height: usize,
    start_x: i64,
    start_y: i64,
    options: &MagicWandOptions,
) -> SelectionResult<MagicWandResult> {
    let field = PixelField::new(image, width, height)?;
    let mut engine = RegionGrowthEngine::new(field);
    engine.initialize((start_x, start_y), options.clone())?;
    engine.run_to_completion();

    let bounds = engine.bounds();
    let pixel_count = engine.pixel_count();
    Ok(MagicWandResult {
        mask: engine.into_mask(),
        bounds,
        pixel_count,
    })
}
