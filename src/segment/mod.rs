use std::collections::{HashSet, VecDeque};

use tracing::debug;

use crate::config::EngineConfig;
use crate::error::{CoreError, CoreResult};
use crate::model::{Block, ContentKind, ContentShape, Grid, Layout, Rect};

mod merge;
#[cfg(test)]
mod tests;

use merge::merge_rects;

/// Partitions `grid` into non-overlapping blocks ordered by `(top, left)`.
///
/// Occupied cells are grouped into 4-connected components, each component
/// becomes its bounding rectangle, and rectangles separated by a thin empty
/// band with enough span overlap are merged until nothing changes. The
/// result depends only on the occupancy pattern of the grid.
pub fn segment(grid: &Grid, config: &EngineConfig) -> CoreResult<Layout> {
    let extent = grid.extent();
    let cells = extent.cell_count();
    if cells > config.max_cells {
        return Err(CoreError::GridTooLarge {
            cells,
            limit: config.max_cells,
        });
    }

    let components = component_rects(grid);
    let component_count = components.len();
    let rects = merge_rects(grid, components, config.segment);

    debug!(
        rows = extent.rows,
        cols = extent.cols,
        occupied = grid.occupied_count(),
        components = component_count,
        blocks = rects.len(),
        "segmented grid"
    );

    let blocks = rects
        .into_iter()
        .map(|rect| Block {
            rect,
            shape: content_shape(grid, rect),
            annotation: None,
        })
        .collect();

    Ok(Layout::new(extent, blocks))
}

fn component_rects(grid: &Grid) -> Vec<Rect> {
    let mut visited = HashSet::<(u32, u32)>::with_capacity(grid.occupied_count());
    let mut queue = VecDeque::<(u32, u32)>::new();
    let mut rects = Vec::<Rect>::new();

    for cell in grid.cells() {
        let start = (cell.row, cell.col);
        if !visited.insert(start) {
            continue;
        }

        let (mut top, mut left, mut bottom, mut right) = (cell.row, cell.col, cell.row, cell.col);
        queue.push_back(start);

        while let Some((row, col)) = queue.pop_front() {
            top = top.min(row);
            bottom = bottom.max(row);
            left = left.min(col);
            right = right.max(col);

            for (r, c) in neighbours(row, col) {
                if grid.is_occupied(r, c) && visited.insert((r, c)) {
                    queue.push_back((r, c));
                }
            }
        }

        rects.push(Rect::new(top, left, bottom - top + 1, right - left + 1));
    }

    rects
}

fn neighbours(row: u32, col: u32) -> impl Iterator<Item = (u32, u32)> {
    [
        row.checked_sub(1).map(|r| (r, col)),
        row.checked_add(1).map(|r| (r, col)),
        col.checked_sub(1).map(|c| (row, c)),
        col.checked_add(1).map(|c| (row, c)),
    ]
    .into_iter()
    .flatten()
}

fn content_shape(grid: &Grid, rect: Rect) -> ContentShape {
    let mut shape = ContentShape::default();
    for cell in grid.cells_in(rect) {
        match cell.kind {
            ContentKind::Numeric => shape.numeric += 1,
            ContentKind::Text => shape.text += 1,
            ContentKind::Empty => {}
        }
    }
    shape.empty = rect.area() - shape.numeric - shape.text;
    shape
}
