use serde::{Deserialize, Serialize};
use std::fmt;

/// Describes one long-form artifact to be generated across several calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSpec {
    /// What is being produced, e.g. "chapter outline"
    pub kind: String,
    pub brief: String,
    /// Units (chapters, scenes, entries) in the whole artifact
    pub total_units: u32,
    pub total_batches: u32,
}

/// Inclusive, 1-based range of units. Empty when `start > end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRange {
    pub start: u32,
    pub end: u32,
}

impl UnitRange {
    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }
}

impl fmt::Display for UnitRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("none")
        } else if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// What a given batch is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchRole {
    /// Single-batch sequence: the whole artifact at once
    Complete,
    /// Batch 0: full-range scaffold, no detailed expansion
    Skeleton,
    /// Expands its own sub-range
    Expansion,
    /// Last batch: expands its sub-range and adds whole-range summary/index
    Final,
}

/// Progress through a batched sequence. Persisted after every batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchCursor {
    pub kind: String,
    pub brief: String,
    pub total_units: u32,
    pub total_batches: u32,
    pub current_index: u32,
    pub accumulated: String,
    /// Units assigned to the batch at `current_index`
    pub range: UnitRange,
}

impl BatchCursor {
    /// Start a sequence. A batch count of zero is treated as one.
    pub fn new(spec: &BatchSpec) -> Self {
        let total_batches = spec.total_batches.max(1);
        let mut cursor = Self {
            kind: spec.kind.clone(),
            brief: spec.brief.clone(),
            total_units: spec.total_units,
            total_batches,
            current_index: 0,
            accumulated: String::new(),
            range: UnitRange { start: 1, end: 0 },
        };
        cursor.range = cursor.range_for(0);
        cursor
    }

    /// Whether this unfinished cursor belongs to the same artifact as `spec`
    pub fn continues(&self, spec: &BatchSpec) -> bool {
        !self.is_complete()
            && self.kind == spec.kind
            && self.brief == spec.brief
            && self.total_units == spec.total_units
            && self.total_batches == spec.total_batches.max(1)
    }

    pub fn is_complete(&self) -> bool {
        self.current_index >= self.total_batches
    }

    pub fn role(&self) -> BatchRole {
        self.role_for(self.current_index)
    }

    pub fn role_for(&self, index: u32) -> BatchRole {
        if self.total_batches == 1 {
            BatchRole::Complete
        } else if index == 0 {
            BatchRole::Skeleton
        } else if index + 1 >= self.total_batches {
            BatchRole::Final
        } else {
            BatchRole::Expansion
        }
    }

    /// Units a batch is responsible for.
    ///
    /// Batch 0 (and a single-batch sequence) spans everything; the remaining batches split
    /// the units as evenly as possible.
    pub fn range_for(&self, index: u32) -> UnitRange {
        let whole = UnitRange {
            start: 1,
            end: self.total_units,
        };
        if self.total_batches == 1 || index == 0 {
            return whole;
        }
        let expansions = u64::from(self.total_batches - 1);
        let units = u64::from(self.total_units);
        let slot = u64::from(index);
        let start = (slot - 1) * units / expansions + 1;
        let end = slot * units / expansions;
        UnitRange {
            start: start as u32,
            end: end as u32,
        }
    }

    /// Trailing `max_chars` characters of the accumulated text
    pub fn trailing_context(&self, max_chars: usize) -> &str {
        let total = self.accumulated.chars().count();
        if total <= max_chars {
            return &self.accumulated;
        }
        let skip = total - max_chars;
        match self.accumulated.char_indices().nth(skip) {
            Some((offset, _)) => &self.accumulated[offset..],
            None => "",
        }
    }

    /// Commit one batch's text and move to the next batch.
    pub fn commit(&mut self, text: &str, separator: &str) {
        if self.current_index > 0 {
            self.accumulated.push_str(separator);
        }
        self.accumulated.push_str(text);
        self.current_index += 1;
        if !self.is_complete() {
            self.range = self.range_for(self.current_index);
        }
    }
}
