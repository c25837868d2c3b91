use crate::error::{CoreError, CoreResult};
use crate::model::{Grid, Layout};

pub const SECTION_MARKER: &str = "#block";

/// Serializes each block as its own CSV section, in layout order.
///
/// A section is a marker record `#block,<key>,<annotation>` followed by the
/// block's rows. Gaps between blocks are never padded into a shared table.
/// A data row whose first field starts with `#` gets one more leading `#`,
/// so a single leading `#` only ever opens a section.
pub fn export_tabular(layout: &Layout, grid: &Grid) -> CoreResult<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::<u8>::new());

    for block in &layout.blocks {
        let key = block.key().to_string();
        writer.write_record([
            SECTION_MARKER,
            key.as_str(),
            block.annotation.as_deref().unwrap_or(""),
        ])?;

        for mut row in grid.text_in(block.rect) {
            if let Some(first) = row.first_mut().filter(|field| field.starts_with('#')) {
                first.insert(0, '#');
            }
            writer.write_record(&row)?;
        }
    }

    writer
        .into_inner()
        .map_err(|err| CoreError::Io(err.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::segment::segment;

    #[test]
    fn blocks_become_separate_sections_in_layout_order() {
        let grid = Grid::from_rows([
            vec!["Region", "Total", ""],
            vec!["", "", ""],
            vec!["", "", ""],
            vec!["north", "1,200", "x"],
            vec!["south", "", "9"],
        ]);
        let layout = segment(&grid, &EngineConfig::default()).unwrap();
        assert_eq!(layout.len(), 2);

        let key = layout.key_at(0).unwrap();
        let layout = crate::annotate::annotate(&layout, key, "Header").unwrap();

        let bytes = export_tabular(&layout, &grid).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let expected = "\
#block,r0c0h1w2,Header
Region,Total
#block,r3c0h2w3,
north,\"1,200\",x
south,,9
";
        assert_eq!(text, expected);
    }

    #[test]
    fn data_rows_that_look_like_markers_are_escaped() {
        let grid = Grid::from_rows([vec!["#block", "r0c0h1w1", "x"], vec!["#note", "2", "3"]]);
        let layout = segment(&grid, &EngineConfig::default()).unwrap();
        assert_eq!(layout.len(), 1);

        let text = String::from_utf8(export_tabular(&layout, &grid).unwrap()).unwrap();
        let expected = "\
#block,r0c0h2w3,
##block,r0c0h1w1,x
##note,2,3
";
        assert_eq!(text, expected);

        let markers = text
            .lines()
            .filter(|line| line.starts_with(SECTION_MARKER))
            .count();
        assert_eq!(markers, 1);
    }

    #[test]
    fn empty_layout_exports_nothing() {
        let grid = Grid::new(3, 3);
        let bytes = export_tabular(&Layout::default(), &grid).unwrap();
        assert!(bytes.is_empty());
    }
}
