//! A single currently-interesting file operation (spec §3).

use crate::phase::Operation;

/// Stable sentinel filename for a counter-only entry that must never be
/// rendered (spec §3 "for synthetic entries a stable sentinel name").
pub const HIDDEN_SENTINEL: &str = "__phase_progress__";

/// Side-channel attributes a [`FileProgress`] may carry.
///
/// The reference (Python) implementation attaches these dynamically
/// (`_hidden`, `_texture_counter`, `_bsa_counter`, `_file_counter`); a
/// strongly typed implementation replaces them with this tagged variant
/// (spec §9 "Side-channel attributes on FileProgress").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Carry {
    None,
    /// Carry-only: never rendered, exists solely to transport a counter
    /// that could not be attributed to a displayable file.
    Hidden,
    FileCounter(u64, u64),
    TextureCounter(u64, u64),
    BsaCounter(u64, u64),
}

impl Default for Carry {
    fn default() -> Self {
        Carry::None
    }
}

impl Carry {
    pub fn is_hidden(&self) -> bool {
        matches!(self, Carry::Hidden)
    }
}

/// One currently-interesting file operation (spec §3).
#[derive(Debug, Clone)]
pub struct FileProgress {
    pub filename: String,
    pub operation: Operation,
    percent: f64,
    pub current_size: u64,
    pub total_size: u64,
    /// Bytes/sec; `-1` is the sentinel "engine did not provide a rate."
    pub speed: f64,
    pub last_update: f64,
    pub carry: Carry,
    /// Aggregator-manufactured entry for a top-level download the engine
    /// never names (spec §4.2 "Synthetic entry policy").
    pub synthetic: bool,
}

impl FileProgress {
    pub fn new(filename: impl Into<String>, operation: Operation, percent: f64, now: f64) -> Self {
        Self {
            filename: filename.into(),
            operation,
            percent: percent.clamp(0.0, 100.0),
            current_size: 0,
            total_size: 0,
            speed: -1.0,
            last_update: now,
            carry: Carry::None,
            synthetic: false,
        }
    }

    pub fn percent(&self) -> f64 {
        self.percent
    }

    /// Clamp and set percent on any mutation (spec §3 invariant).
    pub fn set_percent(&mut self, percent: f64) {
        self.percent = percent.clamp(0.0, 100.0);
    }

    /// `is_complete ⇔ percent ≥ 100 ∨ (total_size > 0 ∧ current_size ≥ total_size)`.
    pub fn is_complete(&self) -> bool {
        self.percent >= 100.0 || (self.total_size > 0 && self.current_size >= self.total_size)
    }

    /// Carry-only entries are never added to `active_files` (spec §3,
    /// §4.2 step 7). A hidden entry either uses the sentinel filename or
    /// carries the explicit `Hidden` marker.
    pub fn is_hidden(&self) -> bool {
        self.filename == HIDDEN_SENTINEL || self.carry.is_hidden()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_clamps_on_construction() {
        let fp = FileProgress::new("a.7z", Operation::Download, 150.0, 0.0);
        assert_eq!(fp.percent(), 100.0);
        let fp = FileProgress::new("a.7z", Operation::Download, -5.0, 0.0);
        assert_eq!(fp.percent(), 0.0);
    }

    #[test]
    fn percent_clamps_on_mutation() {
        let mut fp = FileProgress::new("a.7z", Operation::Download, 50.0, 0.0);
        fp.set_percent(250.0);
        assert_eq!(fp.percent(), 100.0);
    }

    #[test]
    fn is_complete_by_percent_or_bytes() {
        let mut fp = FileProgress::new("a.7z", Operation::Download, 100.0, 0.0);
        assert!(fp.is_complete());

        fp.set_percent(50.0);
        fp.total_size = 100;
        fp.current_size = 100;
        assert!(fp.is_complete());

        fp.current_size = 99;
        assert!(!fp.is_complete());
    }
}
