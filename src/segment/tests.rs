use super::merge::should_merge;
use super::*;
use crate::config::SegmentConfig;

fn grid_with(rows: u32, cols: u32, occupied: &[(u32, u32, &str)]) -> Grid {
    let mut grid = Grid::new(rows, cols);
    for (row, col, value) in occupied {
        grid.set(*row, *col, value).unwrap();
    }
    grid
}

fn fill(grid: &mut Grid, rect: Rect, value: &str) {
    for row in rect.top..rect.bottom() {
        for col in rect.left..rect.right() {
            grid.set(row, col, value).unwrap();
        }
    }
}

#[test]
fn empty_grid_yields_empty_layout() {
    let layout = segment(&Grid::new(0, 0), &EngineConfig::default()).unwrap();
    assert!(layout.is_empty());

    let layout = segment(&Grid::new(10, 10), &EngineConfig::default()).unwrap();
    assert!(layout.is_empty());
}

#[test]
fn single_cell_is_one_unit_block() {
    let grid = grid_with(4, 4, &[(2, 3, "x")]);
    let layout = segment(&grid, &EngineConfig::default()).unwrap();
    assert_eq!(layout.rects(), vec![Rect::new(2, 3, 1, 1)]);
    assert_eq!(layout.blocks[0].shape.text, 1);
    assert_eq!(layout.blocks[0].shape.empty, 0);
}

#[test]
fn two_regions_split_by_two_empty_rows_stay_apart() {
    let mut grid = Grid::new(8, 4);
    fill(&mut grid, Rect::new(0, 0, 3, 3), "a");
    fill(&mut grid, Rect::new(5, 0, 3, 4), "1");

    let layout = segment(&grid, &EngineConfig::default()).unwrap();
    assert_eq!(
        layout.rects(),
        vec![Rect::new(0, 0, 3, 3), Rect::new(5, 0, 3, 4)]
    );
}

#[test]
fn header_separated_by_one_blank_row_merges_with_data() {
    let mut grid = Grid::new(6, 3);
    fill(&mut grid, Rect::new(0, 0, 1, 3), "Header");
    fill(&mut grid, Rect::new(2, 0, 4, 3), "7");

    let layout = segment(&grid, &EngineConfig::default()).unwrap();
    assert_eq!(layout.rects(), vec![Rect::new(0, 0, 6, 3)]);

    let shape = layout.blocks[0].shape;
    assert_eq!(shape.text, 3);
    assert_eq!(shape.numeric, 12);
    assert_eq!(shape.empty, 3);
}

#[test]
fn side_by_side_columns_with_one_gap_merge() {
    let mut grid = Grid::new(4, 5);
    fill(&mut grid, Rect::new(0, 0, 4, 2), "x");
    fill(&mut grid, Rect::new(0, 3, 4, 2), "y");

    let layout = segment(&grid, &EngineConfig::default()).unwrap();
    assert_eq!(layout.rects(), vec![Rect::new(0, 0, 4, 5)]);
}

#[test]
fn low_span_overlap_does_not_merge() {
    let mut grid = Grid::new(4, 8);
    fill(&mut grid, Rect::new(0, 0, 1, 4), "h");
    fill(&mut grid, Rect::new(2, 3, 2, 4), "1");

    // Column overlap is 1 of 4 columns.
    let layout = segment(&grid, &EngineConfig::default()).unwrap();
    assert_eq!(layout.len(), 2);

    let mut config = EngineConfig::default();
    config.segment.min_overlap = 0.2;
    let layout = segment(&grid, &config).unwrap();
    assert_eq!(layout.len(), 1);
}

#[test]
fn merge_requires_the_gap_band_to_be_empty() {
    let mut grid = Grid::new(3, 6);
    fill(&mut grid, Rect::new(0, 0, 1, 3), "a");
    fill(&mut grid, Rect::new(2, 0, 1, 3), "b");
    grid.set(1, 5, "stray").unwrap();

    let config = SegmentConfig::default();
    assert!(should_merge(
        &grid,
        Rect::new(0, 0, 1, 3),
        Rect::new(2, 0, 1, 3),
        config
    ));

    grid.set(1, 1, "blocker").unwrap();
    assert!(!should_merge(
        &grid,
        Rect::new(0, 0, 1, 3),
        Rect::new(2, 0, 1, 3),
        config
    ));
}

#[test]
fn diagonal_touching_components_stay_separate_blocks() {
    let grid = grid_with(4, 4, &[(0, 0, "a"), (1, 1, "b")]);
    let layout = segment(&grid, &EngineConfig::default()).unwrap();
    assert_eq!(
        layout.rects(),
        vec![Rect::new(0, 0, 1, 1), Rect::new(1, 1, 1, 1)]
    );
}

#[test]
fn merged_union_absorbs_rectangles_it_covers() {
    // An L-shaped component's bounding box covers a lone cell in its notch.
    let mut grid = Grid::new(4, 4);
    fill(&mut grid, Rect::new(0, 0, 4, 1), "x");
    fill(&mut grid, Rect::new(3, 0, 1, 4), "x");
    grid.set(0, 3, "lonely").unwrap();

    let layout = segment(&grid, &EngineConfig::default()).unwrap();
    assert_eq!(layout.rects(), vec![Rect::new(0, 0, 4, 4)]);
}

#[test]
fn segmentation_is_deterministic_and_disjoint() {
    let mut grid = Grid::new(30, 20);
    let seeds = [
        (0, 0, 2, 5),
        (0, 8, 3, 3),
        (4, 1, 6, 6),
        (12, 0, 1, 20),
        (15, 3, 5, 2),
        (15, 9, 7, 9),
        (25, 0, 3, 3),
        (27, 15, 2, 4),
    ];
    for (top, left, height, width) in seeds {
        fill(&mut grid, Rect::new(top, left, height, width), "3.14");
    }
    grid.set(23, 19, "note").unwrap();

    let config = EngineConfig::default();
    let first = segment(&grid, &config).unwrap();
    let second = segment(&grid, &config).unwrap();
    assert_eq!(first, second);

    let rects = first.rects();
    for (i, a) in rects.iter().enumerate() {
        for b in rects.iter().skip(i + 1) {
            assert!(!a.intersects(*b), "{a:?} overlaps {b:?}");
        }
    }

    let mut sorted = rects.clone();
    sorted.sort_by_key(|rect| (rect.top, rect.left));
    assert_eq!(rects, sorted);
}

#[test]
fn identical_occupancy_with_different_values_segments_identically() {
    let mut a = Grid::new(10, 6);
    let mut b = Grid::new(10, 6);
    fill(&mut a, Rect::new(0, 0, 2, 6), "alpha");
    fill(&mut b, Rect::new(0, 0, 2, 6), "beta");
    fill(&mut a, Rect::new(5, 1, 4, 3), "10");
    fill(&mut b, Rect::new(5, 1, 4, 3), "99");

    let config = EngineConfig::default();
    assert_eq!(
        segment(&a, &config).unwrap().rects(),
        segment(&b, &config).unwrap().rects()
    );
}

#[test]
fn oversized_grid_fails_before_segmenting() {
    let grid = grid_with(1000, 1000, &[(0, 0, "x")]);
    let mut config = EngineConfig::default();
    config.max_cells = 10_000;

    match segment(&grid, &config) {
        Err(CoreError::GridTooLarge { cells, limit }) => {
            assert_eq!(cells, 1_000_000);
            assert_eq!(limit, 10_000);
        }
        other => panic!("expected GridTooLarge, got {other:?}"),
    }
}

#[test]
fn sparse_scatter_of_isolated_cells_stays_one_block_per_cell() {
    let mut grid = Grid::new(600, 600);
    for row in (0..600).step_by(3) {
        for col in (0..600).step_by(3) {
            grid.set(row, col, "1").unwrap();
        }
    }

    let layout = segment(&grid, &EngineConfig::default()).unwrap();
    assert_eq!(layout.len(), 200 * 200);
    assert_eq!(layout.blocks[0].rect, Rect::new(0, 0, 1, 1));
    assert_eq!(layout.blocks[1].rect, Rect::new(0, 3, 1, 1));
}

fn scattered_grid(rows: u32, cols: u32, seed: u64) -> Grid {
    let mut grid = Grid::new(rows, cols);
    let mut state = seed;
    for row in 0..rows {
        for col in 0..cols {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            if (state >> 33) % 10 < 3 {
                grid.set(row, col, "v").unwrap();
            }
        }
    }
    grid
}

#[test]
fn merging_reaches_a_fixed_point_that_covers_every_cell() {
    for (seed, max_gap) in [(7_u64, 1_u32), (42, 1), (99, 2), (1234, 0)] {
        let grid = scattered_grid(40, 40, seed);
        let mut config = EngineConfig::default();
        config.segment.max_gap = max_gap;

        let rects = segment(&grid, &config).unwrap().rects();
        for (i, a) in rects.iter().enumerate() {
            for b in rects.iter().skip(i + 1) {
                assert!(!a.intersects(*b), "{a:?} overlaps {b:?}");
                assert!(
                    !should_merge(&grid, *a, *b, config.segment),
                    "{a:?} and {b:?} should have merged"
                );
            }
        }
        for cell in grid.cells() {
            let unit = Rect::new(cell.row, cell.col, 1, 1);
            assert!(rects.iter().any(|rect| rect.intersects(unit)));
        }
    }
}

#[test]
fn rectangles_exactly_max_gap_apart_still_merge() {
    let mut grid = Grid::new(8, 3);
    fill(&mut grid, Rect::new(0, 0, 1, 3), "Header");
    fill(&mut grid, Rect::new(4, 0, 4, 3), "5");

    let mut config = EngineConfig::default();
    config.segment.max_gap = 3;
    assert_eq!(segment(&grid, &config).unwrap().rects(), vec![Rect::new(0, 0, 8, 3)]);

    config.segment.max_gap = 2;
    assert_eq!(segment(&grid, &config).unwrap().len(), 2);
}
