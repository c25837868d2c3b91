use std::collections::HashMap;
use std::ops::RangeInclusive;

use crate::config::SegmentConfig;
use crate::model::{Grid, Rect};

/// Side length, in cells, of one bucket of the spatial index.
const BUCKET: u32 = 16;

/// Merges rectangles to a fixed point. Overlapping rectangles always merge,
/// which keeps the output pairwise disjoint after any union grows.
///
/// Rectangles are visited in sorted order and each one keeps absorbing
/// neighbours until none qualifies. Whether two rectangles merge depends
/// only on the pair and the grid, so after a rectangle settles only a
/// rectangle that grows later can change its fate, and that one re-checks
/// its own neighbourhood. Candidates come from a bucket index over the
/// rectangle grown by `max_gap + 1`, which keeps sparse grids near linear.
pub(super) fn merge_rects(grid: &Grid, mut rects: Vec<Rect>, config: SegmentConfig) -> Vec<Rect> {
    rects.sort();
    let mut alive = vec![true; rects.len()];
    let mut index = BucketIndex::default();
    for (id, rect) in rects.iter().enumerate() {
        index.insert(id, *rect, None);
    }

    for id in 0..rects.len() {
        if !alive[id] {
            continue;
        }

        loop {
            let current = rects[id];
            let reach = expand(current, config.max_gap.saturating_add(1));

            let mut candidates = index
                .near(reach)
                .filter(|&other| other != id && alive[other] && rects[other].intersects(reach))
                .collect::<Vec<_>>();
            candidates.sort_unstable_by_key(|&other| (rects[other], other));
            candidates.dedup();

            let absorbed = candidates.into_iter().find(|&other| {
                current.intersects(rects[other]) || should_merge(grid, current, rects[other], config)
            });
            let Some(other) = absorbed else {
                break;
            };

            let grown = current.union(rects[other]);
            alive[other] = false;
            rects[id] = grown;
            index.insert(id, grown, Some(current));
        }
    }

    let mut merged = rects
        .into_iter()
        .zip(alive)
        .filter_map(|(rect, alive)| alive.then_some(rect))
        .collect::<Vec<_>>();
    merged.sort();
    merged
}

/// Buckets of rectangle ids by the `BUCKET`-sized tiles they cover. Entries
/// of absorbed rectangles are left behind and filtered by the caller.
#[derive(Default)]
struct BucketIndex {
    buckets: HashMap<(u32, u32), Vec<usize>>,
}

impl BucketIndex {
    /// Registers `id` under every tile of `rect` not already covered by
    /// `previous`, the rectangle it grew from.
    fn insert(&mut self, id: usize, rect: Rect, previous: Option<Rect>) {
        let covered = previous.map(tiles);
        let (rows, cols) = tiles(rect);
        for row in rows {
            for col in cols.clone() {
                let seen = covered
                    .as_ref()
                    .is_some_and(|(r, c)| r.contains(&row) && c.contains(&col));
                if !seen {
                    self.buckets.entry((row, col)).or_default().push(id);
                }
            }
        }
    }

    fn near(&self, rect: Rect) -> impl Iterator<Item = usize> + '_ {
        let (rows, cols) = tiles(rect);
        rows.flat_map(move |row| cols.clone().map(move |col| (row, col)))
            .filter_map(move |tile| self.buckets.get(&tile))
            .flatten()
            .copied()
    }
}

fn tiles(rect: Rect) -> (RangeInclusive<u32>, RangeInclusive<u32>) {
    let last_row = rect.bottom().saturating_sub(1).max(rect.top);
    let last_col = rect.right().saturating_sub(1).max(rect.left);
    (
        rect.top / BUCKET..=last_row / BUCKET,
        rect.left / BUCKET..=last_col / BUCKET,
    )
}

/// `rect` grown by `gap` cells on every side, clamped at the origin.
fn expand(rect: Rect, gap: u32) -> Rect {
    let top = rect.top.saturating_sub(gap);
    let left = rect.left.saturating_sub(gap);
    Rect::new(
        top,
        left,
        rect.bottom().saturating_add(gap) - top,
        rect.right().saturating_add(gap) - left,
    )
}

pub(super) fn should_merge(grid: &Grid, a: Rect, b: Rect, config: SegmentConfig) -> bool {
    if a.row_overlap(b) == 0 {
        let (upper, lower) = if a.top <= b.top { (a, b) } else { (b, a) };
        let gap = lower.top.saturating_sub(upper.bottom());
        let overlap = fraction(a.col_overlap(b), a.width.min(b.width));
        if gap <= config.max_gap && overlap > config.min_overlap {
            let span = upper.union(lower);
            let band = Rect::new(upper.bottom(), span.left, gap, span.width);
            return band_is_empty(grid, band);
        }
    }

    if a.col_overlap(b) == 0 {
        let (first, second) = if a.left <= b.left { (a, b) } else { (b, a) };
        let gap = second.left.saturating_sub(first.right());
        let overlap = fraction(a.row_overlap(b), a.height.min(b.height));
        if gap <= config.max_gap && overlap > config.min_overlap {
            let span = first.union(second);
            let band = Rect::new(span.top, first.right(), span.height, gap);
            return band_is_empty(grid, band);
        }
    }

    false
}

fn fraction(overlap: u32, span: u32) -> f64 {
    if span == 0 {
        return 0.0;
    }
    f64::from(overlap) / f64::from(span)
}

fn band_is_empty(grid: &Grid, band: Rect) -> bool {
    band.height == 0 || band.width == 0 || grid.cells_in(band).next().is_none()
}
