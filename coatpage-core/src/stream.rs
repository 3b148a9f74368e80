use crate::types::*;
use unicode_normalization::UnicodeNormalization;

/// True for a reading that belongs on the amplified (μ) sheets: a pure digit
/// run of 4+ digits, or a plain number with magnitude of 1000 or more.
/// Text with units or letters never counts.
pub fn is_amplified_cell(raw: &str) -> bool {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == PLACEHOLDER || trimmed == "／" {
        return false;
    }
    let cell: String = trimmed.nfkc().collect();
    let cell = cell.trim();

    if cell.len() >= AMPLIFIED_DIGITS_THRESHOLD && cell.chars().all(|c| c.is_ascii_digit()) {
        return true;
    }
    if !cell.is_empty() && cell.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',') {
        if let Ok(v) = cell.replace(',', "").parse::<f64>() {
            return v.abs() >= AMPLIFIED_MAGNITUDE;
        }
    }
    false
}

/// Stream of a group of rows. Only the 8 reading cells are inspected, the
/// aggregate never decides.
pub fn classify_rows(rows: &[ReadingRow]) -> StreamTag {
    let amplified = rows
        .iter()
        .flat_map(|row| row.readings().iter())
        .any(|cell| is_amplified_cell(cell));
    if amplified {
        StreamTag::Amplified
    } else {
        StreamTag::Normal
    }
}
