//! Positions and spans inside workspace files.
//!
//! Lines and columns are 0-based. Columns count characters, not bytes.

use std::path::{Path, PathBuf};

use lsp_types::{Position, Range};

/// A line/column position inside a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextPosition {
    pub line: u32,
    pub column: u32,
}

impl TextPosition {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// A range of text in a specific file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceSpan {
    pub path: PathBuf,
    pub start: TextPosition,
    pub end: TextPosition,
}

impl SourceSpan {
    /// Build a span, swapping the endpoints if they arrive out of order
    pub fn new(path: PathBuf, start: TextPosition, end: TextPosition) -> Self {
        if end < start {
            Self { path, start: end, end: start }
        } else {
            Self { path, start, end }
        }
    }

    /// The empty span at the very start of a file
    ///
    /// Controllers resolve to file scope, so this is what a controller
    /// jump lands on.
    pub fn file_start(path: PathBuf) -> Self {
        let origin = TextPosition::new(0, 0);
        Self { path, start: origin, end: origin }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn to_lsp_range(&self) -> Range {
        Range {
            start: self.start.into(),
            end: self.end.into(),
        }
    }
}

impl From<TextPosition> for Position {
    fn from(position: TextPosition) -> Self {
        Position {
            line: position.line,
            character: position.column,
        }
    }
}

impl From<Position> for TextPosition {
    fn from(position: Position) -> Self {
        TextPosition::new(position.line, position.character)
    }
}
