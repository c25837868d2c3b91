use std::collections::BTreeSet;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::model::{BlockKey, ContentShape, GridExtent, Layout, Rect};

#[cfg(test)]
mod tests;

/// Digest quantisation step for normalised coordinates.
const DIGEST_SCALE: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBox {
    pub top: f64,
    pub left: f64,
    pub height: f64,
    pub width: f64,
}

impl NormalizedBox {
    pub fn from_rect(rect: Rect, extent: GridExtent) -> Self {
        let rows = f64::from(extent.rows.max(1));
        let cols = f64::from(extent.cols.max(1));
        Self {
            top: f64::from(rect.top) / rows,
            left: f64::from(rect.left) / cols,
            height: f64::from(rect.height) / rows,
            width: f64::from(rect.width) / cols,
        }
    }

    pub fn area(&self) -> f64 {
        self.height * self.width
    }

    /// Intersection over union of two normalised boxes.
    pub fn iou(&self, other: &NormalizedBox) -> f64 {
        let top = self.top.max(other.top);
        let left = self.left.max(other.left);
        let bottom = (self.top + self.height).min(other.top + other.height);
        let right = (self.left + self.width).min(other.left + other.width);

        let intersection = (bottom - top).max(0.0) * (right - left).max(0.0);
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            return 0.0;
        }
        (intersection / union).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    Above,
    LeftOf,
    SharesColumnBand,
    SharesRowBand,
}

impl Relation {
    fn as_str(self) -> &'static str {
        match self {
            Self::Above => "above",
            Self::LeftOf => "left_of",
            Self::SharesColumnBand => "shares_column_band",
            Self::SharesRowBand => "shares_row_band",
        }
    }
}

/// Directed relation between two block indices of the same fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Adjacency {
    pub from: usize,
    pub to: usize,
    pub relation: Relation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockPrint {
    pub key: BlockKey,
    pub bounds: NormalizedBox,
    pub shape: ContentShape,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub block_count: usize,
    pub blocks: Vec<BlockPrint>,
    pub adjacency: BTreeSet<Adjacency>,
    pub shape_digest: String,
}

impl Fingerprint {
    pub fn has(&self, from: usize, to: usize, relation: Relation) -> bool {
        // Band relations are symmetric and stored once, lower index first.
        let (from, to) = match relation {
            Relation::SharesColumnBand | Relation::SharesRowBand => (from.min(to), from.max(to)),
            Relation::Above | Relation::LeftOf => (from, to),
        };
        self.adjacency.contains(&Adjacency { from, to, relation })
    }
}

pub fn fingerprint(layout: &Layout, extent: GridExtent) -> Fingerprint {
    let blocks = layout
        .blocks
        .iter()
        .map(|block| BlockPrint {
            key: block.key(),
            bounds: NormalizedBox::from_rect(block.rect, extent),
            shape: block.shape,
        })
        .collect::<Vec<_>>();

    let rects = layout.rects();
    let adjacency = adjacency_relations(&rects);
    let shape_digest = shape_digest(&blocks, &adjacency);

    Fingerprint {
        block_count: blocks.len(),
        blocks,
        adjacency,
        shape_digest,
    }
}

fn adjacency_relations(rects: &[Rect]) -> BTreeSet<Adjacency> {
    let mut out = BTreeSet::new();

    for (i, a) in rects.iter().enumerate() {
        for (j, b) in rects.iter().enumerate() {
            if i == j {
                continue;
            }
            if a.bottom() <= b.top {
                out.insert(Adjacency {
                    from: i,
                    to: j,
                    relation: Relation::Above,
                });
            }
            if a.right() <= b.left {
                out.insert(Adjacency {
                    from: i,
                    to: j,
                    relation: Relation::LeftOf,
                });
            }
            if i < j && a.col_overlap(*b) > 0 {
                out.insert(Adjacency {
                    from: i,
                    to: j,
                    relation: Relation::SharesColumnBand,
                });
            }
            if i < j && a.row_overlap(*b) > 0 {
                out.insert(Adjacency {
                    from: i,
                    to: j,
                    relation: Relation::SharesRowBand,
                });
            }
        }
    }

    out
}

/// Value-independent digest of quantised geometry and relations.
fn shape_digest(blocks: &[BlockPrint], adjacency: &BTreeSet<Adjacency>) -> String {
    let mut canonical = format!("blocks={}\n", blocks.len());
    for block in blocks {
        let b = block.bounds;
        let _ = writeln!(
            canonical,
            "{} {} {} {}",
            quantise(b.top),
            quantise(b.left),
            quantise(b.height),
            quantise(b.width)
        );
    }
    for edge in adjacency {
        let _ = writeln!(
            canonical,
            "{}>{}:{}",
            edge.from,
            edge.to,
            edge.relation.as_str()
        );
    }

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn quantise(value: f64) -> i64 {
    (value * DIGEST_SCALE).round() as i64
}
