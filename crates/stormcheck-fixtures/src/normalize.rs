//! Best-effort expansion of SPC `HHMM` times into absolute timestamps.
//!
//! SPC report files carry a `Time` column holding a compact time of day
//! (`1510`, `930`, ...). The collector needs full ISO 8601 timestamps, so the
//! fixture date is used to rewrite the column to `{date}T{HH}:{MM}:00Z`.
//!
//! Normalization never fails a request. When the input cannot be rewritten
//! (fewer than two records, no `Time` header, ragged or otherwise malformed
//! CSV) [`normalize_times`] returns `None` and the caller serves the original
//! bytes unchanged. Invalid UTF-8 is not malformed CSV.

use std::borrow::Cow;

use chrono::NaiveDate;

const TIME_COLUMN: &[u8] = b"Time";

/// Rewrites the `Time` column of `data` using `date`.
///
/// Fields are handled as raw bytes, so non-UTF-8 text elsewhere in the file
/// passes through untouched. Returns `None` when the bytes should be served
/// as-is.
#[must_use]
pub fn normalize_times(data: &[u8], date: NaiveDate) -> Option<Vec<u8>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(false)
        .from_reader(data);

    let mut records = Vec::new();
    for record in reader.byte_records() {
        records.push(record.ok()?);
    }
    if records.len() < 2 {
        return None;
    }

    let time_idx = records[0].iter().position(|col| col == TIME_COLUMN)?;
    let date_str = date.format("%Y-%m-%d").to_string();

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::with_capacity(data.len() + records.len() * 16));

    writer.write_byte_record(&records[0]).ok()?;
    for record in &records[1..] {
        let rewritten = record.iter().enumerate().map(|(i, field)| {
            if i == time_idx {
                expand_time_field(field, &date_str)
            } else {
                Cow::Borrowed(field)
            }
        });
        writer.write_record(rewritten).ok()?;
    }

    writer.into_inner().ok()
}

// Cells that are not UTF-8 are kept as they are.
fn expand_time_field<'a>(field: &'a [u8], date: &str) -> Cow<'a, [u8]> {
    match std::str::from_utf8(field) {
        Ok(text) => Cow::Owned(expand_hhmm(text.trim(), date).into_bytes()),
        Err(_) => Cow::Borrowed(field),
    }
}

/// Expands an `HHMM` value to `{date}T{HH}:{MM}:00Z`.
///
/// Values shorter than three characters mean midnight; three-character values
/// are left-padded with zeros. Non-ASCII values are returned unchanged.
#[must_use]
pub fn expand_hhmm(hhmm: &str, date: &str) -> String {
    if hhmm.len() < 3 {
        return format!("{date}T00:00:00Z");
    }
    if !hhmm.is_ascii() {
        return hhmm.to_string();
    }
    let padded = format!("{hhmm:0>4}");
    format!("{date}T{}:{}:00Z", &padded[..2], &padded[2..4])
}
