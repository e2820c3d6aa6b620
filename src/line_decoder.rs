//! Engine-stdout front door: splits a raw byte stream into decoded lines
//! and strips terminal control sequences before anything reaches the
//! [`LineClassifier`](crate::classifier::LineClassifier) (spec §2 "Data flow").
//!
//! A `\n` always ends a line. A bare `\r` (not immediately followed by
//! `\n`) also ends a line — the engine uses it for in-place progress-bar
//! updates, but since this crate's dashboard is a pull-based view model
//! rather than a terminal, each `\r`-delimited chunk is just another
//! complete line to classify.

use once_cell::sync::Lazy;
use regex::Regex;

static CSI_SEQUENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\x1b\[[0-9;]*[A-Za-z]").unwrap());

static TIMESTAMP_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[\d{2}:\d{2}:\d{2}\]\s*").unwrap());

/// Remove ANSI/CSI escape sequences (cursor moves, color codes) the engine
/// may emit for its own terminal progress bars.
pub fn strip_ansi(text: &str) -> String {
    CSI_SEQUENCE.replace_all(text, "").into_owned()
}

/// Remove a leading `[HH:MM:SS]` timestamp from a detail message before it
/// is shown verbatim (spec §3 supplement: Jackify strips this from
/// post-install detail text before display).
pub fn strip_timestamp_prefix(text: &str) -> String {
    TIMESTAMP_PREFIX.replace(text, "").into_owned()
}

/// Stateful splitter that accumulates partial chunks across calls to
/// `feed` and yields complete, ANSI-stripped lines.
#[derive(Debug, Default)]
pub struct LineDecoder {
    current: String,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of newly-read bytes (already UTF-8 decoded), returning
    /// every complete line it produced. Partial trailing text is held for
    /// the next call.
    pub fn feed(&mut self, chunk: &str) -> Vec<String> {
        let mut lines = Vec::new();
        let mut chars = chunk.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\r' => {
                    if chars.peek() == Some(&'\n') {
                        continue;
                    }
                    lines.push(strip_ansi(&self.current));
                    self.current.clear();
                }
                '\n' => {
                    lines.push(strip_ansi(&self.current));
                    self.current.clear();
                }
                _ => self.current.push(c),
            }
        }
        lines
    }

    /// Emit whatever partial line remains (e.g. when the engine exits
    /// without a trailing newline).
    pub fn flush(&mut self) -> Option<String> {
        if self.current.is_empty() {
            return None;
        }
        let line = strip_ansi(&self.current);
        self.current.clear();
        Some(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_newline() {
        let mut decoder = LineDecoder::new();
        let lines = decoder.feed("first\nsecond\n");
        assert_eq!(lines, vec!["first", "second"]);
    }

    #[test]
    fn bare_carriage_return_commits_a_line() {
        let mut decoder = LineDecoder::new();
        let lines = decoder.feed("progress 10%\rprogress 20%\rprogress 30%\n");
        assert_eq!(lines, vec!["progress 10%", "progress 20%", "progress 30%"]);
    }

    #[test]
    fn crlf_pair_is_treated_as_one_terminator() {
        let mut decoder = LineDecoder::new();
        let lines = decoder.feed("one\r\ntwo\r\n");
        assert_eq!(lines, vec!["one", "two"]);
    }

    #[test]
    fn partial_chunk_is_held_until_flush() {
        let mut decoder = LineDecoder::new();
        assert!(decoder.feed("no newline yet").is_empty());
        assert_eq!(decoder.flush(), Some("no newline yet".to_string()));
        assert_eq!(decoder.flush(), None);
    }

    #[test]
    fn strips_csi_color_codes() {
        let stripped = strip_ansi("\x1b[32mgreen\x1b[0m text");
        assert_eq!(stripped, "green text");
    }

    #[test]
    fn strips_leading_timestamp() {
        assert_eq!(strip_timestamp_prefix("[00:03:15] Restarting Steam"), "Restarting Steam");
        assert_eq!(strip_timestamp_prefix("no prefix here"), "no prefix here");
    }
}
