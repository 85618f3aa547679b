//! Placeholder tokens in cell text
//!
//! `{{field}}` substitutes a value, `{{#name}}` and `{{/name}}` mark the
//! first and last rows of a repeating row group. Whitespace inside the
//! braces is ignored; identifiers are case-sensitive.

use std::sync::OnceLock;

use regex::Regex;

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{\{\s*([#/]?)\s*([^{}]*?)\s*\}\}").expect("placeholder pattern compiles")
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Field(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Marker {
    Open(String),
    Close(String),
}

/// Parsed content of one templated cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellTemplate {
    pub segments: Vec<Segment>,
    pub markers: Vec<Marker>,
}

impl CellTemplate {
    /// Parse cell text; `None` when it holds no tokens at all
    pub fn parse(text: &str) -> Option<Self> {
        let mut segments = Vec::new();
        let mut markers = Vec::new();
        let mut last = 0;
        let mut pending = String::new();

        for caps in token_pattern().captures_iter(text) {
            let (Some(whole), Some(kind), Some(ident)) = (caps.get(0), caps.get(1), caps.get(2))
            else {
                continue;
            };
            let ident = ident.as_str();
            if ident.is_empty() {
                continue;
            }
            pending.push_str(&text[last..whole.start()]);
            last = whole.end();
            match kind.as_str() {
                "#" => markers.push(Marker::Open(ident.to_string())),
                "/" => markers.push(Marker::Close(ident.to_string())),
                _ => {
                    if !pending.is_empty() {
                        segments.push(Segment::Text(std::mem::take(&mut pending)));
                    }
                    segments.push(Segment::Field(ident.to_string()));
                }
            }
        }

        if segments.is_empty() && markers.is_empty() {
            return None;
        }
        pending.push_str(&text[last..]);
        if !pending.is_empty() {
            segments.push(Segment::Text(pending));
        }
        Some(Self { segments, markers })
    }

    /// The field when the cell is exactly one placeholder (markers aside)
    pub fn whole_field(&self) -> Option<&str> {
        let mut fields = self.segments.iter().filter(|s| match s {
            Segment::Text(t) => !t.trim().is_empty(),
            Segment::Field(_) => true,
        });
        match (fields.next(), fields.next()) {
            (Some(Segment::Field(f)), None) => Some(f.as_str()),
            _ => None,
        }
    }

    /// True when only row-group markers (and blanks) are left
    pub fn is_marker_only(&self) -> bool {
        self.segments.iter().all(|s| match s {
            Segment::Text(t) => t.trim().is_empty(),
            Segment::Field(_) => false,
        })
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Field(f) => Some(f.as_str()),
            Segment::Text(_) => None,
        })
    }
}
