//! Streaming sitemap parser.
//!
//! Walks `<url>` and `<sitemap>` entries with quick-xml, matching local tag
//! names case-insensitively so `<ns:loc>`, `<LOC>` and `<loc>` are all the
//! same element. The reader is lenient: end tag names are not checked and
//! stray end tags are tolerated, so loosely formed markup still yields
//! whatever entries it holds.

use crate::error::ExtractError;
use crate::types::UrlRecord;
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::warn;

/// Records pulled out of one sitemap, plus the entries that had no usable
/// `<loc>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub records: Vec<UrlRecord>,
    pub skipped: usize,
}

/// Parse sitemap markup into records in document order.
///
/// A markup error inside one entry drops that entry (counted as skipped) and
/// parsing resumes at the next tag, so later siblings are still extracted.
pub fn parse_sitemap(xml: &[u8], source_sitemap: &str) -> Result<Extraction, ExtractError> {
    let mut walker = Walker::new(source_sitemap);
    let mut offset = 0;

    while offset < xml.len() {
        let Err((pos, err)) = read_events(&xml[offset..], &mut walker) else {
            break;
        };
        let at = offset + pos.min(xml.len() - offset);
        if !walker.saw_element {
            return Err(ExtractError::malformed(format!("at byte {at}: {err}")));
        }

        // The reader stops for good after an error; restart past it.
        let next_tag = xml
            .get(at + 1..)
            .and_then(|rest| rest.iter().position(|&b| b == b'<'))
            .map(|i| at + 1 + i);
        let Some(next) = next_tag else {
            warn!(
                sitemap = source_sitemap,
                position = at,
                "markup error at end of document, keeping {} entries: {err}",
                walker.records.len()
            );
            break;
        };
        warn!(
            sitemap = source_sitemap,
            position = at,
            resume_at = next,
            "markup error, skipping current entry: {err}"
        );
        walker.discard_entry();
        offset = next;
    }

    walker.finish()
}

/// Feed every event of `xml` to `walker`. On a reader error, returns the
/// error and its byte position within `xml`.
fn read_events(xml: &[u8], walker: &mut Walker<'_>) -> Result<(), (usize, quick_xml::Error)> {
    let mut reader = Reader::from_reader(xml);
    let config = reader.config_mut();
    config.trim_text(true);
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => walker.open(e.local_name().as_ref()),
            Ok(Event::Empty(ref e)) => walker.empty(e.local_name().as_ref()),
            Ok(Event::End(ref e)) => walker.close(e.local_name().as_ref()),
            Ok(Event::Text(ref e)) => {
                if walker.capturing() {
                    // Bare `&` is common in real sitemaps; keep the raw text then.
                    match e.unescape() {
                        Ok(text) => walker.text(&text),
                        Err(_) => walker.text(&String::from_utf8_lossy(e)),
                    }
                }
            }
            Ok(Event::CData(ref e)) => {
                if walker.capturing() {
                    walker.text(&String::from_utf8_lossy(e));
                }
            }
            Ok(Event::Eof) => return Ok(()),
            Err(err) => return Err((reader.error_position() as usize, err)),
            _ => {}
        }
        buf.clear();
    }
}

fn is_entry(name: &[u8]) -> bool {
    name == b"url" || name == b"sitemap"
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Loc,
    LastMod,
}

/// Text being collected for a `<loc>` or `<lastmod>` child.
#[derive(Debug)]
struct Capture {
    field: Field,
    depth: usize,
    text: String,
}

/// An entry whose end tag has not been seen yet.
#[derive(Debug)]
struct OpenEntry {
    depth: usize,
    loc: Option<String>,
    lastmod: Option<String>,
    capture: Option<Capture>,
}

impl OpenEntry {
    fn new(depth: usize) -> Self {
        Self {
            depth,
            loc: None,
            lastmod: None,
            capture: None,
        }
    }

    /// Commit any text being captured. The first non-empty value wins.
    fn commit_capture(&mut self) {
        let Some(capture) = self.capture.take() else {
            return;
        };
        let value = capture.text.trim();
        if value.is_empty() {
            return;
        }
        let slot = match capture.field {
            Field::Loc => &mut self.loc,
            Field::LastMod => &mut self.lastmod,
        };
        if slot.is_none() {
            *slot = Some(value.to_string());
        }
    }
}

struct Walker<'a> {
    source: &'a str,
    /// Lowercased local names of the open elements.
    stack: Vec<Vec<u8>>,
    entry: Option<OpenEntry>,
    records: Vec<UrlRecord>,
    skipped: usize,
    saw_element: bool,
}

impl<'a> Walker<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            stack: Vec::new(),
            entry: None,
            records: Vec::new(),
            skipped: 0,
            saw_element: false,
        }
    }

    fn capturing(&self) -> bool {
        self.entry.as_ref().is_some_and(|e| e.capture.is_some())
    }

    fn open(&mut self, local_name: &[u8]) {
        self.saw_element = true;
        let name = local_name.to_ascii_lowercase();

        if is_entry(&name) {
            // A new entry before the previous one closed ends the previous one.
            self.flush_entry();
            self.stack.push(name);
            self.entry = Some(OpenEntry::new(self.stack.len()));
            return;
        }

        self.stack.push(name);
        let depth = self.stack.len();
        let Some(entry) = self.entry.as_mut() else {
            return;
        };
        // Only direct children count, so `<image:image><image:loc>` is ignored.
        if depth != entry.depth + 1 || entry.capture.is_some() {
            return;
        }
        let field = match self.stack[depth - 1].as_slice() {
            b"loc" => Field::Loc,
            b"lastmod" => Field::LastMod,
            _ => return,
        };
        entry.capture = Some(Capture {
            field,
            depth,
            text: String::new(),
        });
    }

    fn empty(&mut self, local_name: &[u8]) {
        self.saw_element = true;
        if is_entry(&local_name.to_ascii_lowercase()) {
            self.flush_entry();
            self.skipped += 1;
        }
    }

    fn close(&mut self, local_name: &[u8]) {
        let name = local_name.to_ascii_lowercase();
        // Close up to the nearest open element with this name; ignore strays.
        let Some(pos) = self.stack.iter().rposition(|n| *n == name) else {
            return;
        };
        let closed_depth = pos + 1;

        if let Some(entry) = self.entry.as_mut() {
            if entry.capture.as_ref().is_some_and(|c| c.depth >= closed_depth) {
                entry.commit_capture();
            }
            if entry.depth >= closed_depth {
                self.flush_entry();
            }
        }
        self.stack.truncate(pos);
    }

    fn text(&mut self, text: &str) {
        if let Some(capture) = self.entry.as_mut().and_then(|e| e.capture.as_mut()) {
            capture.text.push_str(text);
        }
    }

    /// Drop the open entry, and any elements nested in it, as skipped.
    fn discard_entry(&mut self) {
        if let Some(entry) = self.entry.take() {
            self.skipped += 1;
            self.stack.truncate(entry.depth - 1);
        }
    }

    fn flush_entry(&mut self) {
        let Some(mut entry) = self.entry.take() else {
            return;
        };
        entry.commit_capture();
        match entry.loc {
            Some(url) => self.records.push(UrlRecord {
                url,
                last_modified: entry.lastmod,
                source_sitemap: self.source.to_string(),
            }),
            None => self.skipped += 1,
        }
    }

    fn finish(mut self) -> Result<Extraction, ExtractError> {
        if !self.saw_element {
            return Err(ExtractError::malformed("no markup elements found"));
        }
        // An entry still open at end of input is salvaged.
        self.flush_entry();
        Ok(Extraction {
            records: self.records,
            skipped: self.skipped,
        })
    }
}
