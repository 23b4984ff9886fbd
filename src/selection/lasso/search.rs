//! Shortest path search over the pixel grid.
//!
//! Dijkstra or A* on a 4/8-connected grid whose move costs come from
//! [`PathCostModel`]. The open set is a binary heap with lazy deletion:
//! a node may be pushed several times and stale entries are skipped when
//! popped because the node is already closed.
//!
//! When no path is found inside the search budget the engine returns the
//! straight Bresenham line between the endpoints, so callers always get a
//! connected polyline from start to goal.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};

use super::cost::{CostWeights, PathCostModel};
use super::geometry::{bresenham_line, Point};
use crate::error::{SelectionError, SelectionResult};
use crate::filters::edge::EdgeField;
use crate::selection::magic_wand::Connectivity;

const NO_PARENT: u32 = u32::MAX;

// ============================================================================
// Options
// ============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchAlgorithm {
    Dijkstra,
    #[default]
    AStar,
}

impl FromStr for SearchAlgorithm {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dijkstra" => Ok(SearchAlgorithm::Dijkstra),
            "astar" | "a*" | "a-star" => Ok(SearchAlgorithm::AStar),
            _ => Err(SelectionError::UnknownAlgorithm(s.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    pub algorithm: SearchAlgorithm,
    pub connectivity: Connectivity,
    /// Pruning radius around the goal (Dijkstra) and square root of the
    /// expansion budget (A*). Zero or negative disables searching.
    pub max_search_radius: f64,
    pub weights: CostWeights,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            algorithm: SearchAlgorithm::AStar,
            connectivity: Connectivity::Eight,
            max_search_radius: 200.0,
            weights: CostWeights::default(),
        }
    }
}

impl SearchOptions {
    pub fn new(algorithm: SearchAlgorithm) -> Self {
        Self {
            algorithm,
            ..Self::default()
        }
    }

    pub fn with_connectivity(mut self, connectivity: Connectivity) -> Self {
        self.connectivity = connectivity;
        self
    }

    pub fn with_radius(mut self, radius: f64) -> Self {
        self.max_search_radius = radius;
        self
    }

    pub fn with_weights(mut self, weights: CostWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn validate(&self) -> SelectionResult<()> {
        if self.max_search_radius.is_nan() {
            return Err(SelectionError::InvalidParameters(
                "max_search_radius must not be NaN".to_string(),
            ));
        }
        self.weights.validate()
    }
}

// ============================================================================
// Search
// ============================================================================

/// Result of one search.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchOutcome {
    /// Pixel path from start to goal, both included
    pub points: Vec<Point>,
    /// Total move cost of `points`
    pub cost: f64,
    /// False when the straight-line fallback was used
    pub found: bool,
    /// Nodes closed during the search
    pub expanded: usize,
}

#[derive(Clone, Copy, Debug)]
struct OpenNode {
    priority: f64,
    cost: f64,
    index: u32,
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenNode {}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so BinaryHeap pops the lowest priority first
        other
            .priority
            .total_cmp(&self.priority)
            .then_with(|| self.cost.total_cmp(&other.cost))
            .then_with(|| other.index.cmp(&self.index))
    }
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Reusable grid search.
///
/// Working buffers are sized to the last edge field and invalidated between
/// searches by bumping a generation counter instead of clearing them.
pub struct GraphSearchEngine {
    options: SearchOptions,
    dims: (usize, usize),
    cost: Vec<f64>,
    parent: Vec<u32>,
    seen: Vec<u32>,
    closed: Vec<u32>,
    generation: u32,
    open: BinaryHeap<OpenNode>,
}

impl GraphSearchEngine {
    pub fn new(options: SearchOptions) -> SelectionResult<Self> {
        options.validate()?;
        Ok(Self {
            options,
            dims: (0, 0),
            cost: Vec::new(),
            parent: Vec::new(),
            seen: Vec::new(),
            closed: Vec::new(),
            generation: 0,
            open: BinaryHeap::new(),
        })
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    /// Shortest path from `start` to `goal`; see [`search`](Self::search).
    pub fn find_path(&mut self, edges: &EdgeField, start: Point, goal: Point, trail: &[Point]) -> Vec<Point> {
        self.search(edges, start, goal, trail).points
    }

    /// Search a path over `edges` between two points.
    ///
    /// Endpoints are rounded to pixels and clamped into the field.
    ///
    /// # Arguments
    /// * `edges` - Edge field supplying traversal costs
    /// * `start` - Path start
    /// * `goal` - Path end
    /// * `trail` - Recent pointer positions; moves near them are cheaper
    pub fn search(&mut self, edges: &EdgeField, start: Point, goal: Point, trail: &[Point]) -> SearchOutcome {
        let (width, height) = (edges.width(), edges.height());
        let mut model = PathCostModel::new(edges, self.options.weights, trail);

        if width == 0 || height == 0 {
            return straight_line(&mut model, start.rounded(), goal.rounded(), 0);
        }
        let clamp = |p: Point| {
            let (x, y) = p.rounded();
            (x.clamp(0, width as i64 - 1), y.clamp(0, height as i64 - 1))
        };
        let (start, goal) = (clamp(start), clamp(goal));

        if start == goal {
            return SearchOutcome {
                points: vec![Point::new(start.0 as f64, start.1 as f64)],
                cost: 0.0,
                found: true,
                expanded: 0,
            };
        }
        if self.options.max_search_radius <= 0.0 {
            debug!("search radius disabled, straight line {:?} -> {:?}", start, goal);
            return straight_line(&mut model, start, goal, 0);
        }

        self.prepare(width, height);
        let generation = self.generation;
        let radius = self.options.max_search_radius;
        let heuristic_scale = match self.options.algorithm {
            SearchAlgorithm::Dijkstra => 0.0,
            SearchAlgorithm::AStar => self.options.weights.heuristic_scale(),
        };
        let budget = match self.options.algorithm {
            SearchAlgorithm::Dijkstra => width * height,
            SearchAlgorithm::AStar => ((radius * radius).ceil() as usize).max(1),
        };
        let goal_distance = |x: i64, y: i64| {
            let dx = (x - goal.0) as f64;
            let dy = (y - goal.1) as f64;
            (dx * dx + dy * dy).sqrt()
        };

        let start_index = start.1 as usize * width + start.0 as usize;
        let goal_index = goal.1 as usize * width + goal.0 as usize;
        self.seen[start_index] = generation;
        self.cost[start_index] = 0.0;
        self.parent[start_index] = NO_PARENT;
        self.open.push(OpenNode {
            priority: goal_distance(start.0, start.1) * heuristic_scale,
            cost: 0.0,
            index: start_index as u32,
        });

        let mut expanded = 0usize;
        let mut found = false;
        while let Some(node) = self.open.pop() {
            let index = node.index as usize;
            if self.closed[index] == generation {
                continue;
            }
            self.closed[index] = generation;
            if index == goal_index {
                found = true;
                break;
            }
            expanded += 1;
            if expanded > budget {
                break;
            }

            let x = (index % width) as i64;
            let y = (index / width) as i64;
            let incoming = match self.parent[index] {
                NO_PARENT => None,
                p => {
                    let p = p as usize;
                    Some((x - (p % width) as i64, y - (p / width) as i64))
                }
            };

            for &(dx, dy) in self.options.connectivity.offsets() {
                let nx = x + dx;
                let ny = y + dy;
                if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                    continue;
                }
                let ni = ny as usize * width + nx as usize;
                if self.closed[ni] == generation {
                    continue;
                }
                let to_goal = goal_distance(nx, ny);
                if self.options.algorithm == SearchAlgorithm::Dijkstra && to_goal > radius {
                    continue;
                }
                let next_cost = node.cost + model.step_cost((x, y), (nx, ny), incoming);
                if self.seen[ni] != generation || next_cost < self.cost[ni] {
                    self.seen[ni] = generation;
                    self.cost[ni] = next_cost;
                    self.parent[ni] = index as u32;
                    self.open.push(OpenNode {
                        priority: next_cost + to_goal * heuristic_scale,
                        cost: next_cost,
                        index: ni as u32,
                    });
                }
            }
        }
        self.open.clear();

        if !found {
            debug!(
                "no path {:?} -> {:?} after {} expansions, using straight line",
                start, goal, expanded
            );
            return straight_line(&mut model, start, goal, expanded);
        }

        let mut points = Vec::new();
        let mut current = goal_index as u32;
        while current != NO_PARENT {
            let c = current as usize;
            points.push(Point::new((c % width) as f64, (c / width) as f64));
            current = self.parent[c];
        }
        points.reverse();

        SearchOutcome {
            points,
            cost: self.cost[goal_index],
            found: true,
            expanded,
        }
    }

    /// Size buffers for the field and start a new generation.
    fn prepare(&mut self, width: usize, height: usize) {
        let n = width * height;
        if self.dims != (width, height) {
            self.dims = (width, height);
            self.cost = vec![0.0; n];
            self.parent = vec![NO_PARENT; n];
            self.seen = vec![0; n];
            self.closed = vec![0; n];
            self.generation = 0;
        }
        self.generation = self.generation.wrapping_add(1);
        if self.generation == 0 {
            self.seen.fill(0);
            self.closed.fill(0);
            self.generation = 1;
        }
        self.open.clear();
    }
}

/// Bresenham fallback with its cost under `model`.
fn straight_line(model: &mut PathCostModel, start: (i64, i64), goal: (i64, i64), expanded: usize) -> SearchOutcome {
    let points = bresenham_line(start, goal);
    let mut cost = 0.0;
    let mut incoming = None;
    for w in points.windows(2) {
        let from = w[0].rounded();
        let to = w[1].rounded();
        cost += model.step_cost(from, to, incoming);
        incoming = Some((to.0 - from.0, to.1 - from.1));
    }
    SearchOutcome {
        points,
        cost,
        found: false,
        expanded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn no_turn_weights() -> CostWeights {
        CostWeights {
            direction_weight: 0.0,
            cursor_influence: 0.0,
            ..CostWeights::default()
        }
    }

    fn engine(algorithm: SearchAlgorithm) -> GraphSearchEngine {
        GraphSearchEngine::new(SearchOptions::new(algorithm).with_weights(no_turn_weights())).unwrap()
    }

    fn assert_connected(points: &[Point], connectivity: Connectivity) {
        for w in points.windows(2) {
            let dx = (w[1].x - w[0].x).abs();
            let dy = (w[1].y - w[0].y).abs();
            assert!(dx <= 1.0 && dy <= 1.0 && dx + dy > 0.0);
            if connectivity == Connectivity::Four {
                assert!(dx + dy == 1.0);
            }
        }
    }

    #[test]
    fn test_uniform_field_equal_cost() {
        let edges = EdgeField::flat(30, 30, 255.0);
        let start = Point::new(2.0, 3.0);
        let goal = Point::new(25.0, 17.0);

        let dijkstra = engine(SearchAlgorithm::Dijkstra).search(&edges, start, goal, &[]);
        let astar = engine(SearchAlgorithm::AStar).search(&edges, start, goal, &[]);

        assert!(dijkstra.found && astar.found);
        assert!((dijkstra.cost - astar.cost).abs() < 1e-6);
        for outcome in [&dijkstra, &astar] {
            assert_eq!(outcome.points.first(), Some(&start));
            assert_eq!(outcome.points.last(), Some(&goal));
            assert_connected(&outcome.points, Connectivity::Eight);
            // 14 diagonal and 9 straight moves
            assert_eq!(outcome.points.len(), 24);
        }
    }

    #[test]
    fn test_four_connected_paths() {
        let edges = EdgeField::flat(12, 12, 255.0);
        let mut search = GraphSearchEngine::new(
            SearchOptions::new(SearchAlgorithm::Dijkstra)
                .with_connectivity(Connectivity::Four)
                .with_weights(no_turn_weights()),
        )
        .unwrap();
        let outcome = search.search(&edges, Point::new(1.0, 1.0), Point::new(6.0, 4.0), &[]);
        assert!(outcome.found);
        assert_eq!(outcome.points.len(), 9);
        assert_connected(&outcome.points, Connectivity::Four);
    }

    #[test]
    fn test_path_follows_edges() {
        // U-shaped ridge: columns 0 and 20 from row 2 down, joined along row 2
        let (w, h) = (25, 14);
        let mut magnitude = Array2::<f32>::zeros((h, w));
        for x in 0..=20 {
            magnitude[[2, x]] = 255.0;
        }
        for y in 2..h {
            magnitude[[y, 0]] = 255.0;
            magnitude[[y, 20]] = 255.0;
        }
        let edges = EdgeField::from_parts(magnitude, Array2::zeros((h, w)), 255.0).unwrap();

        for algorithm in [SearchAlgorithm::Dijkstra, SearchAlgorithm::AStar] {
            let mut search = GraphSearchEngine::new(SearchOptions::new(algorithm)).unwrap();
            let outcome = search.search(&edges, Point::new(0.0, 10.0), Point::new(20.0, 10.0), &[]);
            assert!(outcome.found);
            assert!(outcome.cost < 5.0);
            for p in &outcome.points {
                assert_eq!(edges.magnitude(p.x as i64, p.y as i64), 255.0, "{p:?} off ridge");
            }
        }
    }

    #[test]
    fn test_zero_radius_is_straight_line() {
        let edges = EdgeField::flat(50, 50, 255.0);
        for algorithm in [SearchAlgorithm::Dijkstra, SearchAlgorithm::AStar] {
            let mut search =
                GraphSearchEngine::new(SearchOptions::new(algorithm).with_radius(0.0)).unwrap();
            let outcome = search.search(&edges, Point::new(3.0, 4.0), Point::new(40.0, 21.0), &[]);
            assert!(!outcome.found);
            assert_eq!(outcome.points, bresenham_line((3, 4), (40, 21)));
        }
    }

    #[test]
    fn test_exhausted_budget_falls_back() {
        let edges = EdgeField::flat(40, 5, 255.0);
        let mut search =
            GraphSearchEngine::new(SearchOptions::new(SearchAlgorithm::AStar).with_radius(2.0)).unwrap();
        let outcome = search.search(&edges, Point::new(0.0, 2.0), Point::new(35.0, 2.0), &[]);
        assert!(!outcome.found);
        assert_eq!(outcome.points.first(), Some(&Point::new(0.0, 2.0)));
        assert_eq!(outcome.points.last(), Some(&Point::new(35.0, 2.0)));
        assert_eq!(outcome.points.len(), 36);
        assert!(outcome.cost > 0.0);
    }

    #[test]
    fn test_endpoints_clamped_and_degenerate() {
        let edges = EdgeField::flat(10, 10, 255.0);
        let mut search = engine(SearchAlgorithm::AStar);
        let outcome = search.search(&edges, Point::new(-5.0, -5.0), Point::new(20.0, 3.0), &[]);
        assert_eq!(outcome.points.first(), Some(&Point::new(0.0, 0.0)));
        assert_eq!(outcome.points.last(), Some(&Point::new(9.0, 3.0)));

        let same = search.find_path(&edges, Point::new(4.2, 4.4), Point::new(3.8, 3.6), &[]);
        assert_eq!(same, vec![Point::new(4.0, 4.0)]);
    }

    #[test]
    fn test_engine_reuse_across_generations() {
        let edges = EdgeField::flat(20, 20, 255.0);
        let mut search = engine(SearchAlgorithm::Dijkstra);
        let first = search.search(&edges, Point::new(0.0, 0.0), Point::new(10.0, 10.0), &[]);
        let second = search.search(&edges, Point::new(0.0, 0.0), Point::new(10.0, 10.0), &[]);
        assert_eq!(first, second);

        let other = EdgeField::flat(8, 6, 255.0);
        let outcome = search.search(&other, Point::new(0.0, 0.0), Point::new(7.0, 5.0), &[]);
        assert!(outcome.found);
    }

    #[test]
    fn test_algorithm_parsing() {
        assert_eq!("dijkstra".parse::<SearchAlgorithm>().unwrap(), SearchAlgorithm::Dijkstra);
        assert_eq!("A*".parse::<SearchAlgorithm>().unwrap(), SearchAlgorithm::AStar);
        assert!(matches!(
            "bfs".parse::<SearchAlgorithm>(),
            Err(SelectionError::UnknownAlgorithm(_))
        ));
        let json = serde_json::to_string(&SearchOptions::default()).unwrap();
        assert!(json.contains("\"astar\""));
        assert!(json.contains("\"connectivity\":8"));
    }
}
