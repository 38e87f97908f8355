use serde::{Deserialize, Serialize};

/// An inclusive primary-key range cursor.
///
/// The range narrows as rows are consumed: `begin` moves forward to the key of the most
/// recently dumped row while `end` stays fixed, so a persisted position can resume the
/// scan from where it left off.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct PrimaryKeyPosition {
    /// Primary-key value of the most recently dumped row, or of the first row to dump
    /// when the scan has not started yet
    pub begin: i64,
    /// Primary-key value of the last row covered by this scan
    pub end: i64,
}

impl PrimaryKeyPosition {
    pub fn new(begin: i64, end: i64) -> PrimaryKeyPosition {
        Self { begin, end }
    }

    /// Returns a copy of this position whose `begin` is moved to `begin`, keeping the
    /// original `end`.
    pub fn advance_to(&self, begin: i64) -> PrimaryKeyPosition {
        Self {
            begin,
            end: self.end,
        }
    }
}

/// Progress marker carried by every record the dumper pushes.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum DumpPosition {
    /// Range-cursor progress of a dumped row
    PrimaryKey(PrimaryKeyPosition),
    /// No positional tracking for this stream
    Placeholder,
    /// The dump ran to completion
    Finished,
}
