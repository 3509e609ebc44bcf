//! Byte-offset spans and human-readable locations

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Contiguous region of a file, in byte offsets relative to the start of the file text
///
/// All parser spans are converted to this representation before they leave
/// the parsing layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceSpan {
    /// Byte offset of the start of the span (inclusive)
    pub start: usize,
    /// Byte offset of the end of the span (exclusive)
    pub end: usize,
}

impl SourceSpan {
    /// Create a new source span
    pub fn new(start: usize, end: usize) -> Self {
        SourceSpan { start, end }
    }

    /// Zero-width span at `offset`
    pub fn empty_at(offset: usize) -> Self {
        SourceSpan::new(offset, offset)
    }

    /// Get the length of the span in bytes
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Check if the span is empty
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Check if this span contains another span
    pub fn contains(&self, other: &SourceSpan) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Check if this span contains a byte offset
    pub fn contains_offset(&self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }

    /// Check if two edit ranges conflict
    ///
    /// Two non-empty spans conflict when they share a byte. A zero-width span
    /// (an insertion point) conflicts with a span only when it falls strictly
    /// inside it; two insertions at the same point also conflict.
    pub fn conflicts_with(&self, other: &SourceSpan) -> bool {
        match (self.is_empty(), other.is_empty()) {
            (true, true) => self.start == other.start,
            (true, false) => other.start < self.start && self.start < other.end,
            (false, true) => self.start < other.start && other.start < self.end,
            (false, false) => self.start < other.end && other.start < self.end,
        }
    }

    /// Smallest span covering both spans
    pub fn cover(&self, other: &SourceSpan) -> SourceSpan {
        SourceSpan::new(self.start.min(other.start), self.end.max(other.end))
    }

    /// Express this span relative to `origin`
    pub fn relative_to(&self, origin: usize) -> SourceSpan {
        SourceSpan::new(self.start - origin, self.end - origin)
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// A file position as shown to users: 1-indexed line and column
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: PathBuf,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    /// Resolve a byte offset inside `text` to a location in `file`
    pub fn at(file: impl Into<PathBuf>, text: &str, offset: usize) -> Self {
        let (line, column) = line_col(text, offset);
        SourceLocation {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)
    }
}

/// 1-indexed (line, column) of a byte offset; columns count characters
pub fn line_col(text: &str, offset: usize) -> (u32, u32) {
    let offset = floor_char_boundary(text, offset.min(text.len()));
    let before = &text[..offset];
    let line = before.matches('\n').count() as u32 + 1;
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let column = text[line_start..offset].chars().count() as u32 + 1;
    (line, column)
}

/// Byte offset of a 1-indexed (line, column) position
///
/// Returns `None` when the line does not exist. Columns past the end of the
/// line clamp to the line end.
pub fn offset_at(text: &str, line: u32, column: u32) -> Option<usize> {
    if line == 0 {
        return None;
    }
    let mut line_start = 0usize;
    for _ in 1..line {
        line_start += text[line_start..].find('\n')? + 1;
    }
    let line_end = text[line_start..]
        .find('\n')
        .map(|i| line_start + i)
        .unwrap_or(text.len());
    let offset = text[line_start..line_end]
        .char_indices()
        .nth(column.saturating_sub(1) as usize)
        .map(|(i, _)| line_start + i)
        .unwrap_or(line_end);
    Some(offset)
}

fn floor_char_boundary(text: &str, mut offset: usize) -> usize {
    while offset > 0 && !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_len_and_empty() {
        let span = SourceSpan::new(10, 20);
        assert_eq!(span.len(), 10);
        assert!(!span.is_empty());
        assert!(SourceSpan::empty_at(4).is_empty());
        assert!(SourceSpan::new(20, 10).is_empty());
    }

    #[test]
    fn test_contains() {
        let outer = SourceSpan::new(10, 30);
        let inner = SourceSpan::new(15, 25);
        let outside = SourceSpan::new(5, 15);

        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
        assert!(!outer.contains(&outside));
        assert!(outer.contains(&outer));
    }

    #[test]
    fn test_conflicts() {
        let a = SourceSpan::new(10, 20);
        let b = SourceSpan::new(15, 25);
        let adjacent = SourceSpan::new(20, 30);

        assert!(a.conflicts_with(&b));
        assert!(!a.conflicts_with(&adjacent));

        // Insertion points only conflict strictly inside a replaced range
        assert!(SourceSpan::empty_at(12).conflicts_with(&a));
        assert!(!SourceSpan::empty_at(10).conflicts_with(&a));
        assert!(!SourceSpan::empty_at(20).conflicts_with(&a));
        assert!(SourceSpan::empty_at(7).conflicts_with(&SourceSpan::empty_at(7)));
    }

    #[test]
    fn test_line_col() {
        let text = "ab\ncdé\nf";
        assert_eq!(line_col(text, 0), (1, 1));
        assert_eq!(line_col(text, 3), (2, 1));
        assert_eq!(line_col(text, 5), (2, 3));
        assert_eq!(line_col(text, text.len()), (3, 2));
    }

    #[test]
    fn test_offset_at_roundtrips_line_col() {
        let text = "function f(a, b) {\n  return f(1, 2);\n}\n";
        let offset = offset_at(text, 2, 10).unwrap();
        assert_eq!(&text[offset..offset + 1], "f");
        assert_eq!(line_col(text, offset), (2, 10));
        assert_eq!(offset_at(text, 9, 1), None);
    }

    #[test]
    fn test_location_display() {
        let loc = SourceLocation::at("src/a.ts", "x\ny", 2);
        assert_eq!(loc.to_string(), "src/a.ts:2:1");
    }
}
