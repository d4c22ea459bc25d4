use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a node inside its template.
///
/// Line and column are 1-based. Column `0` means the producer did not
/// track columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub line: u32,
    #[serde(default)]
    pub column: u32,
}

impl Span {
    /// Create a new span.
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// A span that only knows its line.
    pub fn line(line: u32) -> Self {
        Self::new(line, 0)
    }

    /// Attach the template path, producing a reportable [`Location`].
    pub fn at(self, path: impl Into<String>) -> Location {
        Location {
            path: path.into(),
            line: self.line,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.column == 0 {
            write!(f, "{}", self.line)
        } else {
            write!(f, "{}:{}", self.line, self.column)
        }
    }
}

/// Where a diagnostic points: template path plus line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub path: String,
    pub line: u32,
}

impl Location {
    pub fn new(path: impl Into<String>, line: u32) -> Self {
        Self {
            path: path.into(),
            line,
        }
    }

    /// Location used when the producer could not tell where a node came from.
    pub fn unknown() -> Self {
        Self::new("unknown", 0)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path, self.line)
    }
}
