//! Outline code ("item") value type.
//!
//! # Responsibility
//! - Represent dot-separated outline labels such as `02.03.01`.
//! - Parse persisted code strings and format them back with zero padding.
//!
//! # Invariants
//! - A code has at least one segment; one segment per tree level.
//! - Segments render with at least `CODE_SEGMENT_WIDTH` digits.
//! - Ordering compares segments numerically, so `02.10` sorts after `02.09`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Minimum rendered width of one code segment.
pub const CODE_SEGMENT_WIDTH: usize = 2;

static OUTLINE_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{2,}(\.\d{2,})*$").expect("valid outline code regex"));

/// Errors from outline code parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutlineCodeError {
    /// Input does not match `NN(.NN)*`.
    Malformed(String),
    /// One segment does not fit in `u32`.
    SegmentOverflow(String),
}

impl Display for OutlineCodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(value) => write!(f, "malformed outline code `{value}`"),
            Self::SegmentOverflow(value) => {
                write!(f, "outline code segment out of range in `{value}`")
            }
        }
    }
}

impl Error for OutlineCodeError {}

/// Parsed outline code, one numeric segment per level.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OutlineCode {
    segments: Vec<u32>,
}

impl OutlineCode {
    /// Creates a level-1 code.
    pub fn root(position: u32) -> Self {
        Self {
            segments: vec![position],
        }
    }

    /// Returns a new code with `position` appended as the next level.
    pub fn child(&self, position: u32) -> Self {
        let mut segments = self.segments.clone();
        segments.push(position);
        Self { segments }
    }

    /// Parses a persisted code such as `"01.02"`.
    pub fn parse(value: &str) -> Result<Self, OutlineCodeError> {
        let trimmed = value.trim();
        if !OUTLINE_CODE_RE.is_match(trimmed) {
            return Err(OutlineCodeError::Malformed(value.to_string()));
        }
        let segments = trimmed
            .split('.')
            .map(|segment| {
                segment
                    .parse::<u32>()
                    .map_err(|_| OutlineCodeError::SegmentOverflow(value.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { segments })
    }

    /// Numeric segments from level 1 downwards.
    pub fn segments(&self) -> &[u32] {
        &self.segments
    }

    /// Number of segments, equal to the level the code was issued for.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Position among siblings (last segment).
    pub fn last_segment(&self) -> u32 {
        self.segments.last().copied().unwrap_or(0)
    }

    /// Code of the enclosing level, if any.
    pub fn parent(&self) -> Option<Self> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }
}

impl Ord for OutlineCode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.segments.cmp(&other.segments)
    }
}

impl PartialOrd for OutlineCode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for OutlineCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (index, segment) in self.segments.iter().enumerate() {
            if index > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment:0width$}", width = CODE_SEGMENT_WIDTH)?;
        }
        Ok(())
    }
}

impl TryFrom<String> for OutlineCode {
    type Error = OutlineCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OutlineCode> for String {
    fn from(value: OutlineCode) -> Self {
        value.to_string()
    }
}
