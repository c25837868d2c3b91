use super::*;
use crate::config::EngineConfig;
use crate::model::Grid;
use crate::segment::segment;

fn stacked_grid(rows: u32, cols: u32, header: &str, value: &str) -> Grid {
    let mut grid = Grid::new(rows, cols);
    for col in 0..cols {
        grid.set(0, col, header).unwrap();
    }
    for row in 3..rows {
        for col in 0..cols / 2 {
            grid.set(row, col, value).unwrap();
        }
    }
    grid
}

fn print_of(grid: &Grid) -> Fingerprint {
    let layout = segment(grid, &EngineConfig::default()).unwrap();
    fingerprint(&layout, grid.extent())
}

#[test]
fn different_values_same_shape_fingerprint_equal() {
    let a = print_of(&stacked_grid(10, 6, "Name", "12"));
    let b = print_of(&stacked_grid(10, 6, "Region", "4000"));

    assert_eq!(a.block_count, 2);
    assert_eq!(a.shape_digest, b.shape_digest);
    assert_eq!(a.adjacency, b.adjacency);
    assert_eq!(a.blocks, b.blocks);
}

#[test]
fn scaled_layout_normalises_to_the_same_boxes() {
    let mut small = Grid::new(10, 10);
    let mut large = Grid::new(20, 20);
    for col in 0..5 {
        small.set(0, col, "h").unwrap();
    }
    for col in 0..10 {
        large.set(0, col, "h").unwrap();
        large.set(1, col, "h").unwrap();
    }

    let small = print_of(&small);
    let large = print_of(&large);
    assert_eq!(small.blocks[0].bounds, large.blocks[0].bounds);
}

#[test]
fn different_shapes_diverge() {
    let a = print_of(&stacked_grid(10, 6, "Name", "12"));

    let mut other = Grid::new(10, 6);
    for row in 0..10 {
        other.set(row, 5, "x").unwrap();
    }
    let b = print_of(&other);

    assert_ne!(a.shape_digest, b.shape_digest);
    assert_ne!(a.block_count, b.block_count);
}

#[test]
fn adjacency_records_direction_and_bands() {
    let rects = [
        Rect::new(0, 0, 1, 4),
        Rect::new(3, 0, 2, 2),
        Rect::new(3, 3, 2, 1),
    ];
    let relations = adjacency_relations(&rects);

    let has = |from, to, relation| relations.contains(&Adjacency { from, to, relation });
    assert!(has(0, 1, Relation::Above));
    assert!(has(0, 2, Relation::Above));
    assert!(has(1, 2, Relation::LeftOf));
    assert!(has(0, 1, Relation::SharesColumnBand));
    assert!(has(1, 2, Relation::SharesRowBand));
    assert!(!has(1, 0, Relation::Above));
    assert!(!has(1, 2, Relation::SharesColumnBand));
}

#[test]
fn iou_of_identical_and_disjoint_boxes() {
    let a = NormalizedBox::from_rect(Rect::new(0, 0, 5, 5), GridExtent { rows: 10, cols: 10 });
    let b = NormalizedBox::from_rect(Rect::new(5, 5, 5, 5), GridExtent { rows: 10, cols: 10 });
    let c = NormalizedBox::from_rect(Rect::new(0, 0, 5, 10), GridExtent { rows: 10, cols: 10 });

    assert!((a.iou(&a) - 1.0).abs() < 1e-9);
    assert_eq!(a.iou(&b), 0.0);
    assert!((a.iou(&c) - 0.5).abs() < 1e-9);
}
