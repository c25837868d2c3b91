use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

static NUMERIC_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(\d{1,3}(,\d{3})+|\d+)?(\.\d+)?([eE][+-]?\d+)?%?$")
        .expect("numeric cell pattern compiles")
});

static BLOCK_KEY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^r(\d+)c(\d+)h(\d+)w(\d+)$").expect("block key pattern compiles")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Empty,
    Numeric,
    Text,
}

impl ContentKind {
    pub fn classify(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
            return Self::Empty;
        }

        let has_digit = trimmed.bytes().any(|b| b.is_ascii_digit());
        if has_digit && NUMERIC_PATTERN.is_match(trimmed) {
            Self::Numeric
        } else {
            Self::Text
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub row: u32,
    pub col: u32,
    pub value: String,
    pub kind: ContentKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GridExtent {
    pub rows: u32,
    pub cols: u32,
}

impl GridExtent {
    pub fn cell_count(self) -> u64 {
        u64::from(self.rows) * u64::from(self.cols)
    }
}

/// Sparse cell grid. Cells that classify as empty are never stored.
#[derive(Debug, Clone, Default)]
pub struct Grid {
    extent: GridExtent,
    cells: BTreeMap<(u32, u32), Cell>,
}

impl Grid {
    pub fn new(rows: u32, cols: u32) -> Self {
        Self {
            extent: GridExtent { rows, cols },
            cells: BTreeMap::new(),
        }
    }

    /// Builds a grid from dense rows; ragged rows are padded with empty cells.
    pub fn from_rows<R, S>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cells = BTreeMap::new();
        let mut row_count = 0_u32;
        let mut col_count = 0_u32;

        for (row, values) in rows.into_iter().enumerate() {
            let row = row as u32;
            row_count = row + 1;
            for (col, value) in values.into_iter().enumerate() {
                let col = col as u32;
                col_count = col_count.max(col + 1);
                let value = value.as_ref();
                let kind = ContentKind::classify(value);
                if kind != ContentKind::Empty {
                    cells.insert(
                        (row, col),
                        Cell {
                            row,
                            col,
                            value: value.to_string(),
                            kind,
                        },
                    );
                }
            }
        }

        Self {
            extent: GridExtent {
                rows: row_count,
                cols: col_count,
            },
            cells,
        }
    }

    pub fn set(&mut self, row: u32, col: u32, value: &str) -> CoreResult<()> {
        if row >= self.extent.rows || col >= self.extent.cols {
            return Err(CoreError::invalid_file(
                "<grid>",
                format!(
                    "cell ({row},{col}) outside {}x{} grid",
                    self.extent.rows, self.extent.cols
                ),
            ));
        }

        let kind = ContentKind::classify(value);
        if kind == ContentKind::Empty {
            self.cells.remove(&(row, col));
        } else {
            self.cells.insert(
                (row, col),
                Cell {
                    row,
                    col,
                    value: value.to_string(),
                    kind,
                },
            );
        }
        Ok(())
    }

    pub fn extent(&self) -> GridExtent {
        self.extent
    }

    pub fn get(&self, row: u32, col: u32) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    pub fn is_occupied(&self, row: u32, col: u32) -> bool {
        self.cells.contains_key(&(row, col))
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.len()
    }

    /// Occupied cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.values()
    }

    /// Occupied cells inside `rect`, row-major.
    pub fn cells_in(&self, rect: Rect) -> impl Iterator<Item = &Cell> + '_ {
        (rect.top..rect.bottom()).flat_map(move |row| {
            self.cells
                .range((row, rect.left)..(row, rect.right()))
                .map(|(_, cell)| cell)
        })
    }

    /// Cell values confined to `rect`, empty cells as empty strings.
    pub fn text_in(&self, rect: Rect) -> Vec<Vec<String>> {
        (rect.top..rect.bottom())
            .map(|row| {
                (rect.left..rect.right())
                    .map(|col| {
                        self.get(row, col)
                            .map(|cell| cell.value.clone())
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect()
    }
}

/// Half-open rectangle: rows `top..top+height`, cols `left..left+width`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Rect {
    pub top: u32,
    pub left: u32,
    pub height: u32,
    pub width: u32,
}

impl Rect {
    pub fn new(top: u32, left: u32, height: u32, width: u32) -> Self {
        Self {
            top,
            left,
            height,
            width,
        }
    }

    pub fn bottom(self) -> u32 {
        self.top + self.height
    }

    pub fn right(self) -> u32 {
        self.left + self.width
    }

    pub fn area(self) -> u64 {
        u64::from(self.height) * u64::from(self.width)
    }

    pub fn union(self, other: Rect) -> Rect {
        let top = self.top.min(other.top);
        let left = self.left.min(other.left);
        let bottom = self.bottom().max(other.bottom());
        let right = self.right().max(other.right());
        Rect::new(top, left, bottom - top, right - left)
    }

    pub fn intersects(self, other: Rect) -> bool {
        self.top < other.bottom()
            && other.top < self.bottom()
            && self.left < other.right()
            && other.left < self.right()
    }

    pub fn row_overlap(self, other: Rect) -> u32 {
        self.bottom()
            .min(other.bottom())
            .saturating_sub(self.top.max(other.top))
    }

    pub fn col_overlap(self, other: Rect) -> u32 {
        self.right()
            .min(other.right())
            .saturating_sub(self.left.max(other.left))
    }
}

/// Geometry-derived block identifier, rendered as `r{top}c{left}h{height}w{width}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockKey(Rect);

impl From<Rect> for BlockKey {
    fn from(rect: Rect) -> Self {
        Self(rect)
    }
}

impl fmt::Display for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rect = self.0;
        write!(
            f,
            "r{}c{}h{}w{}",
            rect.top, rect.left, rect.height, rect.width
        )
    }
}

impl FromStr for BlockKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let missing = || CoreError::AnnotationTargetMissing(s.to_string());
        let captures = BLOCK_KEY_PATTERN.captures(s.trim()).ok_or_else(missing)?;

        let mut parts = [0_u32; 4];
        for (slot, index) in parts.iter_mut().zip(1..=4) {
            *slot = captures
                .get(index)
                .and_then(|m| m.as_str().parse::<u32>().ok())
                .ok_or_else(missing)?;
        }

        Ok(Self(Rect::new(parts[0], parts[1], parts[2], parts[3])))
    }
}

impl Serialize for BlockKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BlockKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Coarse content histogram of a block's rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContentShape {
    pub empty: u64,
    pub numeric: u64,
    pub text: u64,
}

impl ContentShape {
    pub fn total(self) -> u64 {
        self.empty + self.numeric + self.text
    }

    pub fn fractions(self) -> [f64; 3] {
        let total = self.total();
        if total == 0 {
            return [1.0, 0.0, 0.0];
        }
        let total = total as f64;
        [
            self.empty as f64 / total,
            self.numeric as f64 / total,
            self.text as f64 / total,
        ]
    }

    /// Half the L1 distance between the normalised histograms, in `[0,1]`.
    pub fn distance(self, other: ContentShape) -> f64 {
        let a = self.fractions();
        let b = other.fractions();
        a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum::<f64>() / 2.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub rect: Rect,
    pub shape: ContentShape,
    pub annotation: Option<String>,
}

impl Block {
    pub fn key(&self) -> BlockKey {
        BlockKey::from(self.rect)
    }
}

/// Blocks of one grid snapshot, ordered by `(top, left)`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Layout {
    pub extent: GridExtent,
    pub blocks: Vec<Block>,
}

impl Layout {
    pub fn new(extent: GridExtent, mut blocks: Vec<Block>) -> Self {
        blocks.sort_by_key(|block| (block.rect.top, block.rect.left));
        Self { extent, blocks }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn find(&self, key: BlockKey) -> Option<&Block> {
        self.blocks.iter().find(|block| block.key() == key)
    }

    /// Resolves a layout-order position to the block's stable key.
    pub fn key_at(&self, index: usize) -> Option<BlockKey> {
        self.blocks.get(index).map(Block::key)
    }

    pub fn rects(&self) -> Vec<Rect> {
        self.blocks.iter().map(|block| block.rect).collect()
    }
}

/// Wire shape of one block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub top: u32,
    pub left: u32,
    pub height: u32,
    pub width: u32,
    pub annotation: Option<String>,
    pub text: Vec<Vec<String>>,
}

pub fn layout_records(layout: &Layout, grid: &Grid) -> Vec<BlockRecord> {
    layout
        .blocks
        .iter()
        .map(|block| BlockRecord {
            top: block.rect.top,
            left: block.rect.left,
            height: block.rect.height,
            width: block.rect.width,
            annotation: block.annotation.clone(),
            text: grid.text_in(block.rect),
        })
        .collect()
}
