use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{CoreError, CoreResult};
use crate::model::Grid;

/// Reads a header-less CSV file into a grid. Ragged rows are allowed.
pub fn read_grid(path: &Path) -> CoreResult<Grid> {
    let display = path.display().to_string();
    let file = File::open(path).map_err(|err| CoreError::invalid_file(&display, err))?;
    read_grid_from(file, &display)
}

pub fn read_grid_from<R: Read>(mut reader: R, source: &str) -> CoreResult<Grid> {
    let mut raw = Vec::new();
    reader
        .read_to_end(&mut raw)
        .map_err(|err| CoreError::invalid_file(source, err))?;
    let raw = normalise_line_breaks(raw);

    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_reader(raw.as_slice());

    // The csv reader skips blank lines; they are empty spreadsheet rows, so
    // they are recovered from the line counter.
    let mut rows = Vec::<Vec<String>>::new();
    let mut record = csv::StringRecord::new();
    loop {
        let line_before = csv_reader.position().line();
        let more = csv_reader.read_record(&mut record).map_err(|err| {
            CoreError::invalid_file(source, format!("record {}: {err}", rows.len() + 1))
        })?;
        if !more {
            break;
        }

        let line_after = csv_reader.position().line();
        let embedded = record
            .iter()
            .map(|field| field.matches('\n').count() as u64)
            .sum::<u64>();
        let skipped = line_after
            .saturating_sub(line_before)
            .saturating_sub(1 + embedded);
        for _ in 0..skipped {
            rows.push(Vec::new());
        }

        rows.push(record.iter().map(ToOwned::to_owned).collect());
    }

    if u32::try_from(rows.len()).is_err() || rows.iter().any(|row| u32::try_from(row.len()).is_err()) {
        return Err(CoreError::invalid_file(source, "grid dimensions overflow"));
    }

    Ok(Grid::from_rows(rows))
}

/// Rewrites `\r\n` and lone `\r` as `\n` and terminates the last line, so
/// every record consumes exactly one line break of its own. Without that the
/// line counter hides one blank line before an unterminated last record.
fn normalise_line_breaks(raw: Vec<u8>) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len() + 1);
    let mut bytes = raw.into_iter().peekable();
    while let Some(byte) = bytes.next() {
        if byte == b'\r' {
            bytes.next_if_eq(&b'\n');
            out.push(b'\n');
        } else {
            out.push(byte);
        }
    }
    if out.last().is_some_and(|last| *last != b'\n') {
        out.push(b'\n');
    }
    out
}
