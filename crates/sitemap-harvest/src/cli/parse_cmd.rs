//! `sitemap-harvest parse <FILE>`: run the extractor on a local sitemap.

use crate::cli::output::{self, Styled};
use crate::extraction::{self, Extraction};
use anyhow::{Context, Result};
use std::path::Path;

/// Run the parse command.
pub fn run(path: &Path) -> Result<()> {
    let s = Styled::new();
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read sitemap file: {}", path.display()))?;
    let source = path.display().to_string();
    let extraction = extraction::extract(&bytes, &source)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "source": source,
            "records": extraction.records,
            "skipped": extraction.skipped,
        }));
        return Ok(());
    }

    print_table(&s, &extraction);
    Ok(())
}

fn print_table(s: &Styled, extraction: &Extraction) {
    for r in &extraction.records {
        let lastmod = r.last_modified.as_deref().unwrap_or("-");
        println!("{lastmod:<26} {}", r.url);
    }

    if !output::is_quiet() {
        eprintln!();
        eprintln!(
            "  {} {} entries",
            s.ok_sym(),
            extraction.records.len()
        );
        if extraction.skipped > 0 {
            eprintln!(
                "  {} {} entries skipped (no <loc>)",
                s.warn_sym(),
                extraction.skipped
            );
        }
    }
}
