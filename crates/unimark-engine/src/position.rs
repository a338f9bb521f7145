use serde::{Deserialize, Serialize};

/// A byte range `[start, end)` into the original source buffer.
///
/// Every node produced by the parser adapter carries one. Passes that merge
/// or remove nodes reason about the tree purely through these ranges, so the
/// containment rules below are the only geometry the engine knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Inclusive start byte offset.
    pub start: usize,
    /// Exclusive end byte offset.
    pub end: usize,
}

impl Position {
    /// Creates a position, swapping the bounds if they arrive reversed so
    /// that `start <= end` always holds.
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    /// Returns the length in bytes. Uses saturating subtraction for safety.
    #[must_use]
    pub fn len(self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns true if the range is empty (start >= end).
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    /// True when `self` lies inside `outer` (bounds inclusive).
    #[must_use]
    pub fn between(self, outer: Position) -> bool {
        outer.start <= self.start && self.end <= outer.end
    }

    /// True when one range ends exactly where the other begins.
    #[must_use]
    pub fn is_adjacent_to(self, other: Position) -> bool {
        self.end == other.start || other.end == self.start
    }

    /// True when the two ranges share at least one byte.
    #[must_use]
    pub fn overlaps(self, other: Position) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Smallest range covering both `self` and `other`.
    #[must_use]
    pub fn cover(self, other: Position) -> Position {
        Position {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}
