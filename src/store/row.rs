//! Dataset row format.
//!
//! One record per line, six comma-separated fields, no quoting:
//!
//! ```text
//! id,title,author1|author2,category1|category2,detail_link,cover_url
//! ```
//!
//! Commas and line breaks inside any field are replaced with a space on
//! write, so a plain split on `,` always yields the original six fields.
//! Inside list fields `|` is replaced the same way, so every list keeps its
//! length across a reload.

use csv::StringRecord;

use crate::record::Record;

/// Number of fields in a complete row.
pub const FIELD_COUNT: usize = 6;

/// Separator for multi-valued fields (authors, categories).
pub const LIST_SEPARATOR: char = '|';

/// Serializes `record` as one newline-terminated row.
#[must_use]
pub fn encode(record: &Record) -> String {
    let fields = [
        sanitize(&record.id),
        sanitize(&record.title),
        join_list(&record.authors),
        join_list(&record.categories),
        sanitize(record.detail_link.as_deref().unwrap_or_default()),
        sanitize(record.cover_url.as_deref().unwrap_or_default()),
    ];
    let mut row = fields.join(",");
    row.push('\n');
    row
}

/// Rebuilds a record from one parsed row.
///
/// Returns `None` for rows with fewer than [`FIELD_COUNT`] fields or an
/// empty id. Extra trailing fields are ignored.
#[must_use]
pub fn decode(row: &StringRecord) -> Option<Record> {
    if row.len() < FIELD_COUNT {
        return None;
    }
    let id = row.get(0)?.trim();
    if id.is_empty() {
        return None;
    }

    Some(Record {
        id: id.to_string(),
        title: row.get(1)?.to_string(),
        authors: split_list(row.get(2)?),
        categories: split_list(row.get(3)?),
        detail_link: non_empty(row.get(4)?),
        cover_url: non_empty(row.get(5)?),
    })
}

/// Replaces characters that would break the row format with a space.
#[must_use]
pub fn sanitize(field: &str) -> String {
    field.replace([',', '\r', '\n'], " ")
}

fn join_list(values: &[String]) -> String {
    values
        .iter()
        .map(|value| sanitize(value).replace(LIST_SEPARATOR, " "))
        .collect::<Vec<_>>()
        .join(&LIST_SEPARATOR.to_string())
}

fn split_list(field: &str) -> Vec<String> {
    if field.is_empty() {
        return Vec::new();
    }
    field.split(LIST_SEPARATOR).map(str::to_string).collect()
}

fn non_empty(field: &str) -> Option<String> {
    (!field.is_empty()).then(|| field.to_string())
}
