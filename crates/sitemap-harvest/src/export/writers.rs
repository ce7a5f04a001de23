//! Record serialisers for each [`super::OutputFormat`].

use crate::types::UrlRecord;
use anyhow::Result;
use std::io::Write;

const CSV_HEADER: &str = "url,last_modified,source_sitemap";

/// CSV with a header row. Fields are quoted only when they need it.
pub fn write_csv<W: Write>(out: &mut W, records: &[&UrlRecord]) -> Result<()> {
    writeln!(out, "{CSV_HEADER}")?;
    for r in records {
        writeln!(
            out,
            "{},{},{}",
            csv_field(&r.url),
            csv_field(r.last_modified.as_deref().unwrap_or("")),
            csv_field(&r.source_sitemap)
        )?;
    }
    Ok(())
}

/// One JSON object per line.
pub fn write_jsonl<W: Write>(out: &mut W, records: &[&UrlRecord]) -> Result<()> {
    for r in records {
        let json = serde_json::to_string(r)?;
        writeln!(out, "{json}")?;
    }
    Ok(())
}

/// Bare URLs, one per line.
pub fn write_text<W: Write>(out: &mut W, records: &[&UrlRecord]) -> Result<()> {
    for r in records {
        writeln!(out, "{}", r.url)?;
    }
    Ok(())
}

/// RFC 4180 quoting: wrap in quotes and double inner quotes when the field
/// contains a comma, quote, or line break.
fn csv_field(s: &str) -> std::borrow::Cow<'_, str> {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\"")).into()
    } else {
        s.into()
    }
}
