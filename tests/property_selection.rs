use proptest::prelude::*;
use std::collections::VecDeque;

use stagselect::filters::EdgeField;
use stagselect::selection::lasso::{
    bresenham_line, simplify_path, smooth_path, CostWeights, GraphSearchEngine, Point,
    SearchAlgorithm, SearchOptions,
};
use stagselect::selection::{
    Connectivity, ExpansionShape, MagicWandOptions, MaskTransitionBlender, PixelField,
    RegionGrowthEngine,
};

const PALETTE: [[u8; 3]; 3] = [[200, 30, 30], [30, 200, 30], [30, 30, 200]];

/// Small image drawn from a 3-color palette, plus a seed inside it.
fn palette_image() -> impl Strategy<Value = (usize, usize, Vec<u8>, usize, usize)> {
    (1usize..12, 1usize..12).prop_flat_map(|(w, h)| {
        (
            Just(w),
            Just(h),
            prop::collection::vec(0usize..PALETTE.len(), w * h),
            0..w,
            0..h,
        )
            .prop_map(|(w, h, colors, sx, sy)| {
                let rgba = colors
                    .iter()
                    .flat_map(|&c| {
                        let [r, g, b] = PALETTE[c];
                        [r, g, b, 255]
                    })
                    .collect();
                (w, h, rgba, sx, sy)
            })
    })
}

/// Small image with arbitrary RGB values.
fn noisy_image() -> impl Strategy<Value = (usize, usize, Vec<u8>, usize, usize)> {
    (1usize..10, 1usize..10).prop_flat_map(|(w, h)| {
        (
            Just(w),
            Just(h),
            prop::collection::vec(any::<u8>(), w * h * 4),
            0..w,
            0..h,
        )
    })
}

fn reference_component(
    rgba: &[u8],
    w: usize,
    h: usize,
    seed: (usize, usize),
    connectivity: Connectivity,
) -> Vec<u8> {
    let color = |i: usize| [rgba[i * 4], rgba[i * 4 + 1], rgba[i * 4 + 2]];
    let seed_idx = seed.1 * w + seed.0;
    let mut mask = vec![0u8; w * h];
    let mut queue = VecDeque::from([seed_idx]);
    mask[seed_idx] = 255;
    while let Some(i) = queue.pop_front() {
        let (x, y) = ((i % w) as i64, (i / w) as i64);
        for &(dx, dy) in connectivity.offsets() {
            let (nx, ny) = (x + dx, y + dy);
            if nx < 0 || ny < 0 || nx >= w as i64 || ny >= h as i64 {
                continue;
            }
            let n = ny as usize * w + nx as usize;
            if mask[n] == 0 && color(n) == color(seed_idx) {
                mask[n] = 255;
                queue.push_back(n);
            }
        }
    }
    mask
}

fn grow(rgba: &[u8], w: usize, h: usize, seed: (usize, usize), options: MagicWandOptions, step: u32) -> Vec<u8> {
    let field = PixelField::new(rgba, w, h).unwrap();
    let mut engine = RegionGrowthEngine::new(field);
    engine.initialize((seed.0 as i64, seed.1 as i64), options).unwrap();
    while !engine.process_batch(step) {}
    engine.into_mask()
}

proptest! {
    #[test]
    fn zero_tolerance_selects_exact_component(
        (w, h, rgba, sx, sy) in palette_image(),
        eight in any::<bool>(),
    ) {
        let connectivity = if eight { Connectivity::Eight } else { Connectivity::Four };
        let options = MagicWandOptions::new(0.0, true).with_connectivity(connectivity);
        let mask = grow(&rgba, w, h, (sx, sy), options, u32::MAX);
        prop_assert_eq!(mask, reference_component(&rgba, w, h, (sx, sy), connectivity));
    }

    #[test]
    fn global_selection_matches_brute_force(
        (w, h, rgba, sx, sy) in noisy_image(),
        tolerance in 0.0f64..250.0,
        step in 1u32..20,
    ) {
        let mask = grow(&rgba, w, h, (sx, sy), MagicWandOptions::new(tolerance, false), step);
        let s = (sy * w + sx) * 4;
        let seed = [rgba[s] as f64, rgba[s + 1] as f64, rgba[s + 2] as f64];
        let expected = rgba
            .chunks_exact(4)
            .filter(|p| {
                let d: f64 = (0..3).map(|c| (p[c] as f64 - seed[c]).powi(2)).sum();
                d.sqrt() <= tolerance
            })
            .count();
        prop_assert_eq!(mask.iter().filter(|&&v| v == 255).count(), expected);
    }

    #[test]
    fn batching_does_not_change_result(
        (w, h, rgba, sx, sy) in palette_image(),
        tolerance in 0.0f64..200.0,
        step in 1u32..40,
        shape in prop_oneof![
            Just(ExpansionShape::Square),
            Just(ExpansionShape::Circular),
            Just(ExpansionShape::Diamond),
        ],
    ) {
        let options = MagicWandOptions::new(tolerance, true).with_expansion_shape(shape);
        let unbounded = grow(&rgba, w, h, (sx, sy), MagicWandOptions::new(tolerance, true), u32::MAX);
        let stepped = grow(&rgba, w, h, (sx, sy), options, step);
        prop_assert_eq!(stepped, unbounded);
    }

    #[test]
    fn blender_decays_linearly(step in 1u8..=255, frames in 1usize..10) {
        let mut blender = MaskTransitionBlender::new(step);
        blender.update(&[255, 255], 2, 1).unwrap();
        let mut last = Vec::new();
        for _ in 0..frames {
            last = blender.update(&[255, 0], 2, 1).unwrap().display.to_vec();
        }
        let expected = (255i64 - frames as i64 * step as i64).max(0);
        prop_assert_eq!(last[0], 255);
        prop_assert_eq!(last[1] as i64, expected);
    }

    #[test]
    fn dijkstra_and_astar_agree_on_uniform_field(
        sx in 0i64..25, sy in 0i64..25, gx in 0i64..25, gy in 0i64..25,
        eight in any::<bool>(),
    ) {
        let edges = EdgeField::flat(25, 25, 255.0);
        let weights = CostWeights { direction_weight: 0.0, cursor_influence: 0.0, ..CostWeights::default() };
        let connectivity = if eight { Connectivity::Eight } else { Connectivity::Four };
        let start = Point::new(sx as f64, sy as f64);
        let goal = Point::new(gx as f64, gy as f64);

        let mut costs = Vec::new();
        for algorithm in [SearchAlgorithm::Dijkstra, SearchAlgorithm::AStar] {
            let options = SearchOptions::new(algorithm)
                .with_connectivity(connectivity)
                .with_weights(weights);
            let outcome = GraphSearchEngine::new(options).unwrap().search(&edges, start, goal, &[]);
            prop_assert!(outcome.found);
            prop_assert_eq!(outcome.points.first(), Some(&start));
            prop_assert_eq!(outcome.points.last(), Some(&goal));
            costs.push(outcome.cost);
        }
        prop_assert!((costs[0] - costs[1]).abs() < 1e-6);
    }

    #[test]
    fn straight_lines_survive_simplify_and_smooth(
        x0 in -50i64..50, y0 in -50i64..50, x1 in -50i64..50, y1 in -50i64..50,
        iterations in 0usize..5,
    ) {
        prop_assume!((x0, y0) != (x1, y1));
        let line = bresenham_line((x0, y0), (x1, y1));
        let result = smooth_path(&simplify_path(&line, 1.0), iterations, 0.5);
        prop_assert_eq!(
            result,
            vec![Point::new(x0 as f64, y0 as f64), Point::new(x1 as f64, y1 as f64)]
        );
    }
}
