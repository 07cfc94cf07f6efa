//! Marker-delimited region splicing.
//!
//! A region is the run of lines strictly between a begin-marker line and the
//! next end-marker line. [`splice_region`] replaces that run with one rendered
//! fragment per entry and leaves every other line untouched:
//!
//! ```text
//! class Foo {            class Foo {
//!     /**ATTR**/             /**ATTR**/
//!     const old = 'old';  →      const ba_title = 'ba_title';
//!     /**ATTR**/             /**ATTR**/
//! }                      }
//! ```
//!
//! The splicer never touches the filesystem. Callers read the document, splice
//! it and write the result back only when splicing succeeded.

mod document;

pub use document::Document;

use document::line_ending;
use indexmap::IndexMap;
use std::fmt;
use thiserror::Error;

/// Default sentinel delimiting the class-constant region of a method file.
pub const ATTR_MARKER: &str = "/**ATTR**/";

/// A boundary marker with separate spellings for detection and re-emission.
///
/// Both spellings are the same unless a marker rename is being migrated, in
/// which case matched marker lines are rewritten from `read` to `write`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    read: String,
    write: String,
}

impl Marker {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            read: text.clone(),
            write: text,
        }
    }

    pub fn migrating(read: impl Into<String>, write: impl Into<String>) -> Self {
        Self {
            read: read.into(),
            write: write.into(),
        }
    }

    pub fn read(&self) -> &str {
        &self.read
    }

    pub fn write(&self) -> &str {
        &self.write
    }

    fn find(&self, line: &str) -> Option<usize> {
        line.find(&self.read)
    }

    fn matches(&self, line: &str) -> bool {
        line.contains(&self.read)
    }

    fn rewrite(&self, line: &str) -> String {
        if self.read == self.write {
            line.to_owned()
        } else {
            line.replace(&self.read, &self.write)
        }
    }
}

/// The begin/end pair delimiting an injectable region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionMarkers {
    pub begin: Marker,
    pub end: Marker,
}

impl RegionMarkers {
    pub fn new(begin: Marker, end: Marker) -> Self {
        Self { begin, end }
    }

    /// The same marker opens and closes the region.
    pub fn symmetric(marker: Marker) -> Self {
        Self {
            begin: marker.clone(),
            end: marker,
        }
    }
}

impl Default for RegionMarkers {
    fn default() -> Self {
        Self::symmetric(Marker::new(ATTR_MARKER))
    }
}

/// Where the begin marker was found; handed to the fragment renderer so
/// injected lines can line up with the marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionAnchor<'a> {
    /// Leading whitespace of the begin-marker line.
    pub indent: &'a str,
    /// Byte column of the begin marker within its line.
    pub column: usize,
    /// Terminator of the begin-marker line.
    pub line_ending: &'a str,
}

impl<'a> RegionAnchor<'a> {
    fn for_line(line: &'a str, column: usize) -> Self {
        let indent_len = line
            .find(|c: char| !c.is_whitespace())
            .unwrap_or(line.len())
            .min(column);
        let ending = match line_ending(line) {
            "" => "\n",
            ending => ending,
        };
        Self {
            indent: &line[..indent_len],
            column,
            line_ending: ending,
        }
    }
}

/// Non-fatal anomalies met during a splice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpliceWarning {
    /// A begin marker after the region was already opened, inside it or
    /// after it. The line is passed through unchanged.
    DuplicateMarker { line: usize, first_line: usize },
    /// An end marker outside any region. The line is passed through unchanged.
    StrayEndMarker { line: usize },
}

impl fmt::Display for SpliceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpliceWarning::DuplicateMarker { line, first_line } => write!(
                f,
                "duplicate begin marker at line {line} ignored (region injected at line {first_line})"
            ),
            SpliceWarning::StrayEndMarker { line } => {
                write!(f, "end marker at line {line} has no open region")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpliceError {
    #[error("begin marker {marker:?} not found")]
    MarkerNotFound { marker: String },

    #[error("region opened at line {line} is never closed by {marker:?}")]
    UnterminatedRegion { marker: String, line: usize },
}

/// A successful splice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpliceOutcome {
    pub document: Document,
    pub warnings: Vec<SpliceWarning>,
    /// 1-based line number of the begin marker that received the entries.
    pub begin_line: usize,
    /// Number of entries rendered into the region.
    pub injected: usize,
    /// Number of old region lines dropped.
    pub replaced: usize,
}

#[derive(Debug, Clone, Copy)]
enum ScanState {
    Outside,
    Inside { begin_line: usize },
}

/// Replace the content of the first marker-delimited region of `document`
/// with one fragment per entry, in the map's iteration order.
///
/// `render` receives the entry key, its payload and the anchor of the begin
/// marker. A fragment may span several lines; a fragment lacking a trailing
/// terminator gets the marker line's terminator.
pub fn splice_region<P, F>(
    document: &Document,
    entries: &IndexMap<String, P>,
    markers: &RegionMarkers,
    mut render: F,
) -> Result<SpliceOutcome, SpliceError>
where
    F: FnMut(&str, &P, &RegionAnchor<'_>) -> String,
{
    let mut lines = Vec::with_capacity(document.len() + entries.len());
    let mut warnings = Vec::new();
    let mut state = ScanState::Outside;
    let mut injected_at: Option<usize> = None;
    let mut replaced = 0;

    for (index, line) in document.lines().iter().enumerate() {
        let number = index + 1;
        match state {
            ScanState::Inside { begin_line } => {
                if markers.end.matches(line) {
                    lines.push(markers.end.rewrite(line));
                    state = ScanState::Outside;
                } else if markers.begin.matches(line) {
                    warnings.push(SpliceWarning::DuplicateMarker {
                        line: number,
                        first_line: begin_line,
                    });
                    lines.push(line.clone());
                } else {
                    replaced += 1;
                }
            }
            ScanState::Outside => {
                if let Some(column) = markers.begin.find(line) {
                    if let Some(first_line) = injected_at {
                        warnings.push(SpliceWarning::DuplicateMarker {
                            line: number,
                            first_line,
                        });
                        lines.push(line.clone());
                        continue;
                    }

                    lines.push(markers.begin.rewrite(line));
                    let anchor = RegionAnchor::for_line(line, column);
                    for (key, payload) in entries {
                        let fragment = render(key, payload, &anchor);
                        push_fragment(&mut lines, &fragment, anchor.line_ending);
                    }
                    injected_at = Some(number);
                    state = ScanState::Inside { begin_line: number };
                } else if markers.end.matches(line) {
                    warnings.push(SpliceWarning::StrayEndMarker { line: number });
                    lines.push(line.clone());
                } else {
                    lines.push(line.clone());
                }
            }
        }
    }

    if let ScanState::Inside { begin_line } = state {
        return Err(SpliceError::UnterminatedRegion {
            marker: markers.end.read().to_owned(),
            line: begin_line,
        });
    }

    let Some(begin_line) = injected_at else {
        return Err(SpliceError::MarkerNotFound {
            marker: markers.begin.read().to_owned(),
        });
    };

    Ok(SpliceOutcome {
        document: Document::from_lines(lines),
        warnings,
        begin_line,
        injected: entries.len(),
        replaced,
    })
}

fn push_fragment(lines: &mut Vec<String>, fragment: &str, terminator: &str) {
    for piece in fragment.split_inclusive('\n') {
        if piece.ends_with('\n') {
            lines.push(piece.to_owned());
        } else {
            lines.push(format!("{piece}{terminator}"));
        }
    }
}
