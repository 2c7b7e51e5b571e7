//! Source file registration and byte-offset <-> line/column resolution.
//!
//! Every diagnostic in this crate is anchored to a [`Span`], and every span
//! is resolved back to human-readable positions through a [`SourceMap`].
//! Offsets are byte offsets into the registered UTF-8 content, not
//! codepoint indices (see spec: column counting is by byte).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A contiguous byte region `[start, end)` within a single registered file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub file_id: u32,
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(file_id: u32, start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "span start must not exceed end");
        Self { file_id, start, end }
    }

    /// Combine two spans from the same file into one covering both.
    pub fn to(self, other: Span) -> Span {
        debug_assert_eq!(self.file_id, other.file_id);
        Span::new(self.file_id, self.start.min(other.start), self.end.max(other.end))
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A 1-indexed line/column position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A single registered source file: its content and a precomputed index of
/// line-start byte offsets.
#[derive(Debug)]
pub struct SourceFile {
    pub file_id: u32,
    pub path: PathBuf,
    pub content: String,
    line_starts: Vec<usize>,
}

impl SourceFile {
    fn new(file_id: u32, path: PathBuf, content: String) -> Self {
        let line_starts = compute_line_starts(&content);
        Self { file_id, path, content, line_starts }
    }

    /// Convert a byte offset into a 1-indexed line/column position.
    pub fn offset_to_position(&self, offset: usize) -> Option<Position> {
        if offset > self.content.len() {
            return None;
        }

        // largest line-start <= offset
        let line_index = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };

        let line_start = self.line_starts[line_index];
        Some(Position {
            line: line_index + 1,
            column: offset - line_start + 1,
        })
    }

    /// Resolve a span's start and end to positions. The end position is
    /// computed from `max(start, end - 1)` so zero-width and one-byte spans
    /// report a sensible (non-past-the-end) end position.
    pub fn span_to_positions(&self, span: Span) -> Option<(Position, Position)> {
        let start = self.offset_to_position(span.start)?;
        let end_offset = span.start.max(span.end.saturating_sub(1));
        let end = self.offset_to_position(end_offset)?;
        Some((start, end))
    }

    /// Content of a line, 1-indexed, excluding its terminating newline.
    pub fn get_line(&self, line: usize) -> Option<&str> {
        if line == 0 || line > self.line_starts.len() {
            return None;
        }
        let start = self.line_starts[line - 1];
        let end = if line < self.line_starts.len() {
            self.line_starts[line] - 1
        } else {
            self.content.len()
        };
        Some(&self.content[start..end])
    }

    pub fn get_span_text(&self, span: Span) -> Option<&str> {
        self.content.get(span.start..span.end)
    }
}

fn compute_line_starts(content: &str) -> Vec<usize> {
    let mut line_starts = vec![0];
    for (i, byte) in content.bytes().enumerate() {
        if byte == b'\n' {
            line_starts.push(i + 1);
        }
    }
    line_starts
}

/// Registry of all source files known to a single interpreter run.
#[derive(Debug, Default)]
pub struct SourceMap {
    files: HashMap<u32, SourceFile>,
    path_to_id: HashMap<PathBuf, u32>,
    next_id: u32,
}

impl SourceMap {
    pub fn new() -> Self {
        Self { files: HashMap::new(), path_to_id: HashMap::new(), next_id: 1 }
    }

    /// Register a file by absolute path, returning its stable id. Calling
    /// this twice with the same path returns the same id without
    /// re-registering the content.
    pub fn add_file(&mut self, path: impl AsRef<Path>, content: impl Into<String>) -> u32 {
        let path = path.as_ref().to_path_buf();
        if let Some(id) = self.path_to_id.get(&path) {
            return *id;
        }

        let file_id = self.next_id;
        self.next_id += 1;

        self.path_to_id.insert(path.clone(), file_id);
        self.files.insert(file_id, SourceFile::new(file_id, path, content.into()));
        file_id
    }

    pub fn get_file(&self, file_id: u32) -> Option<&SourceFile> {
        self.files.get(&file_id)
    }

    pub fn offset_to_position(&self, file_id: u32, offset: usize) -> Option<Position> {
        self.get_file(file_id)?.offset_to_position(offset)
    }

    pub fn span_to_positions(&self, span: Span) -> Option<(Position, Position)> {
        self.get_file(span.file_id)?.span_to_positions(span)
    }

    pub fn get_line(&self, file_id: u32, line: usize) -> Option<&str> {
        self.get_file(file_id)?.get_line(line)
    }

    pub fn get_span_text(&self, span: Span) -> Option<&str> {
        self.get_file(span.file_id)?.get_span_text(span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_file_is_idempotent_by_path() {
        let mut map = SourceMap::new();
        let a = map.add_file("/tmp/a.lapis", "var x = 1;");
        let b = map.add_file("/tmp/a.lapis", "ignored second content");
        assert_eq!(a, b);
    }

    #[test]
    fn offset_to_position_round_trips() {
        let mut map = SourceMap::new();
        let id = map.add_file("/tmp/b.lapis", "abc\ndef\nghi");
        for offset in 0..=10usize {
            let pos = map.offset_to_position(id, offset).unwrap();
            let file = map.get_file(id).unwrap();
            assert_eq!(file.line_starts[pos.line - 1] + pos.column - 1, offset);
        }
    }

    #[test]
    fn span_to_positions_handles_zero_width() {
        let mut map = SourceMap::new();
        let id = map.add_file("/tmp/c.lapis", "hello");
        let span = Span::new(id, 2, 2);
        let (start, end) = map.span_to_positions(span).unwrap();
        assert_eq!(start, end);
    }

    #[test]
    fn get_line_excludes_terminator() {
        let mut map = SourceMap::new();
        let id = map.add_file("/tmp/d.lapis", "first\nsecond\nthird");
        assert_eq!(map.get_line(id, 1), Some("first"));
        assert_eq!(map.get_line(id, 2), Some("second"));
        assert_eq!(map.get_line(id, 3), Some("third"));
        assert_eq!(map.get_line(id, 4), None);
    }

    #[test]
    fn get_span_text_matches_slice() {
        let mut map = SourceMap::new();
        let id = map.add_file("/tmp/e.lapis", "var answer = 42;");
        let span = Span::new(id, 4, 10);
        assert_eq!(map.get_span_text(span), Some("answer"));
    }
}
