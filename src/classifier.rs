//! Pure tokenizer from a decoded engine output line to a [`ParsedLine`]
//! (spec §4.1).
//!
//! No memory, no side effects: classifying the same line twice always
//! produces equal results (spec §8.1). The grammar is an ordered set of
//! regex matchers, each compiled once via `once_cell::sync::Lazy`.

use crate::bytes::parse_bytes;
use crate::file_progress::{Carry, FileProgress};
use crate::parsed_line::ParsedLine;
use crate::phase::{Operation, Phase};
use once_cell::sync::Lazy;
use regex::Regex;

/// Extensions worth surfacing in the dashboard (spec §4.1 "Display filter").
/// Heuristic data, not logic — carried verbatim from the reference parser.
const ALLOWED_EXTENSIONS: &[&str] = &[
    "7z", "zip", "rar", "bsa", "ba2", "dds", "wabbajack", "exe", "esp", "esm", "esl", "bin", "dll",
    "pak", "tar", "gz", "xz", "bz2", "z01", "z02", "cab", "msi",
];

/// Generic-artifact stems that are never worth showing, even with an
/// allow-listed extension (spec §4.1).
const DENY_STEMS: &[&str] = &["empty", "script", "one", "two", "three"];

const FILE_EXT_ALT: &str = "7z|zip|rar|bsa|dds|exe|esp|esm|esl|wabbajack";

static FILE_PROGRESS_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)\[FILE_PROGRESS\]\s+",
        r"(Downloading|Extracting|Validating|Installing|Converting|Building|Writing|Verifying|Completed|Checking existing):\s+",
        r"(.+?)\s+\((\d+(?:\.\d+)?)%\)\s*",
        r"(?:\[(.+?)\])?\s*",
        r"(?:\((\d+)/(\d+)\))?",
    ))
    .unwrap()
});

static SECTION_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"=+\s*(.+?)\s*=+").unwrap());

static WABBAJACK_STATUS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\[(\d+)/(\d+)\]\s+(.+?)\s+\(([^)]+)\)").unwrap());

static TIMESTAMP_STATUS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\[[^\]]+\]\s+(.+?)\s+\((\d+)/(\d+)\)\s*-\s*(\S+)").unwrap());

static WABBAJACK_DOWNLOAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\[[^\]]+\]\s+Downloading\s+(\S+\.wabbajack|\.wabbajack)\s+\(([^)]+)\)\s*-\s*(\S+)")
        .unwrap()
});

static WABBAJACK_FILENAME_IN_MESSAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([A-Za-z0-9_\-.]+\.wabbajack)").unwrap());

static PROGRESS_COLON_FILE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:Installing|Downloading|Extracting|Validating):\s*(.+?)\s*\((\d+(?:\.\d+)?)%\)")
        .unwrap()
});

static EXT_COLON_PERCENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)(.+?\.(?:{}))\s*[:-]\s*(\d+(?:\.\d+)?)%",
        FILE_EXT_ALT
    ))
    .unwrap()
});

static EXT_BRACKET_SPEED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)(.+?\.(?:{}))\s*\[([^\]]+)\]", FILE_EXT_ALT)).unwrap()
});

static EXT_AT_PERCENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)([A-Za-z0-9][^\s]*?[-_A-Za-z0-9]+\.(?:{}))\s+(?:at|@|:|-)?\s*(\d+(?:\.\d+)?)%",
        FILE_EXT_ALT
    ))
    .unwrap()
});

static EXT_OF_BYTES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)([A-Za-z0-9][^\s]*?[-_A-Za-z0-9]+\.(?:{}))\s*\(?\s*(\d+(?:\.\d+)?)\s*(B|KB|MB|GB|TB)\s*/?\s*of\s*(\d+(?:\.\d+)?)\s*(B|KB|MB|GB|TB)",
        FILE_EXT_ALT
    ))
    .unwrap()
});

static STEP_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[(\d+)/(\d+)\]").unwrap());

static DATA_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\(?(\d+(?:\.\d+)?)\s*(B|KB|MB|GB|TB)\s*/\s*(\d+(?:\.\d+)?)\s*(B|KB|MB|GB|TB)\)?")
        .unwrap()
});

static SPEED_DASH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)-\s*(\d+(?:\.\d+)?)\s*(B|KB|MB|GB|TB)\s*/s").unwrap());

static SPEED_AT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:at|speed:?)\s*(\d+(?:\.\d+)?)\s*(B|KB|MB|GB|TB)\s*/s").unwrap());

static SPEED_ANY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(B|KB|MB|GB|TB)\s*/s(?:ec)?").unwrap());

static COMPLETION_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Finished\s+(?:downloading|extracting|validating|installing)\s+(.+?)(?:\.\s|\.$|\s+Hash:|$)")
        .unwrap()
});

/// Determine whether a filename is worth showing in the dashboard
/// (spec §4.1 "Display filter"). Exposed so the aggregator can reuse it.
pub fn should_display_file(filename: &str) -> bool {
    let trimmed = filename.trim();
    if trimmed.is_empty() {
        return false;
    }
    let base = trimmed.rsplit(['/', '\\']).next().unwrap_or(trimmed);
    if base.is_empty() {
        return false;
    }
    if base == ".wabbajack" || base == "Downloading .wabbajack file" {
        return true;
    }
    if base.starts_with('#') {
        return false;
    }
    let (stem, ext) = match base.rsplit_once('.') {
        Some((s, e)) if !s.is_empty() => (s, e),
        _ => return false,
    };
    if !ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) {
        return false;
    }
    if DENY_STEMS.contains(&stem.to_ascii_lowercase().as_str()) {
        return false;
    }
    true
}

fn map_phase_text(text_lower: &str) -> Phase {
    if text_lower.contains("download") {
        Phase::Download
    } else if text_lower.contains("extract") {
        Phase::Extract
    } else if text_lower.contains("validat") || text_lower.contains("verif") || text_lower.contains("hash") {
        Phase::Validate
    } else if text_lower.contains("install") {
        Phase::Install
    } else if text_lower.contains("finaliz") || text_lower.contains("complet") || text_lower.contains("finish") {
        Phase::Finalize
    } else if text_lower.contains("configur") || text_lower.contains("initializ") || text_lower.contains("prepar") {
        Phase::Initialization
    } else {
        Phase::Unknown
    }
}

fn map_operation_word(word: &str) -> Operation {
    match word.to_ascii_lowercase().as_str() {
        "downloading" => Operation::Download,
        "extracting" => Operation::Extract,
        "validating" | "verifying" | "hashing" | "checking existing" => Operation::Validate,
        "installing" | "building" | "writing" | "converting" | "compiling" => Operation::Install,
        "completed" => Operation::Unknown,
        _ => Operation::Unknown,
    }
}

fn detect_operation_from_line(line_lower: &str) -> Operation {
    if line_lower.contains("download") {
        Operation::Download
    } else if line_lower.contains("extract") {
        Operation::Extract
    } else if line_lower.contains("validat") {
        Operation::Validate
    } else if line_lower.contains("install") || line_lower.contains("build") || line_lower.contains("convert") {
        Operation::Install
    } else {
        Operation::Unknown
    }
}

fn parse_unit_value(captures_value: &str, unit: &str) -> u64 {
    let value: f64 = captures_value.parse().unwrap_or(0.0);
    parse_bytes(value, unit)
}

/// Parse a speed string like `"12.4MB/s"` to bytes/sec, or `0.0` if it
/// doesn't match (spec §4.1 item 8).
fn parse_speed_str(speed_str: &str) -> f64 {
    if let Some(caps) = SPEED_ANY.captures(speed_str) {
        let value: f64 = caps[1].parse().unwrap_or(0.0);
        return parse_bytes(value, &caps[2]) as f64;
    }
    0.0
}

fn parse_data_string(data_str: &str) -> Option<(u64, u64)> {
    if let Some(caps) = DATA_PATTERN.captures(data_str) {
        let current = parse_unit_value(&caps[1], &caps[2]);
        let total = parse_unit_value(&caps[3], &caps[4]);
        return Some((current, total));
    }
    None
}

/// Result of matching the structured `[FILE_PROGRESS]` line (spec §4.1
/// item 1): the `FileProgress` itself (hidden or not), plus a generic
/// install/extract counter when one doesn't belong to a named sub-phase.
struct StructuredMatch {
    file_progress: FileProgress,
    /// Set only for a non-texture, non-BSA counter — hoisted onto
    /// [`ParsedLine::file_counter`] rather than carried on the file, since
    /// it describes phase progress, not a sub-phase (spec §4.2 step 6).
    file_counter: Option<(u64, u64)>,
}

/// Match the structured `[FILE_PROGRESS]` line (spec §4.1 item 1).
///
/// `Ok(None)` means the line matched the `[FILE_PROGRESS]` grammar but its
/// filename failed the display filter and carried no counter — the line is
/// still handled, it just produces nothing to show, and must not fall
/// through to the fallback patterns (spec §4.1 item 1's short-circuit:
/// once this regex matches, the fallback patterns never run on the same
/// line). `Err(())` means the line didn't match this grammar at all, so
/// the caller should try the fallback patterns.
fn extract_structured_file_progress(line: &str, now: f64) -> Result<Option<StructuredMatch>, ()> {
    let caps = FILE_PROGRESS_LINE.captures(line).ok_or(())?;
    let operation_str = caps[1].to_string();
    let filename = caps[2].trim().to_string();
    let mut percent: f64 = caps[3].parse().unwrap_or(0.0);
    let speed_str = caps.get(4).map(|m| m.as_str().trim().to_string());
    let counter_current: Option<u64> = caps.get(5).and_then(|m| m.as_str().parse().ok());
    let counter_total: Option<u64> = caps.get(6).and_then(|m| m.as_str().parse().ok());

    let operation = map_operation_word(&operation_str);
    let op_lower = operation_str.to_ascii_lowercase();

    if let (Some(current), Some(total)) = (counter_current, counter_total) {
        if !should_display_file(&filename) {
            // Tag by operation word first, same as a displayable file, then
            // mark hidden on top — the counter still needs to reach the
            // right aggregator-level bucket (spec §4.1 item 1, §4.2 step 7).
            let mut fp = FileProgress::new("__phase_progress__", operation, percent, now);
            fp.carry = match op_lower.as_str() {
                "converting" => Carry::TextureCounter(current, total),
                "building" => Carry::BsaCounter(current, total),
                _ => Carry::FileCounter(current, total),
            };
            return Ok(Some(StructuredMatch {
                file_progress: fp,
                file_counter: None,
            }));
        }
    }

    if !should_display_file(&filename) {
        return Ok(None);
    }

    if operation_str.eq_ignore_ascii_case("completed") {
        percent = 100.0;
    }

    let speed = speed_str.map(|s| parse_speed_str(&s)).unwrap_or(-1.0);
    let mut fp = FileProgress::new(filename, operation, percent, now);
    fp.speed = if speed == 0.0 && speed_str_was_absent(&caps) {
        -1.0
    } else {
        speed
    };
    if let Some((current_bytes, total_bytes)) = parse_data_string(line) {
        fp.current_size = current_bytes;
        fp.total_size = total_bytes;
    }

    let mut file_counter = None;
    if let (Some(current), Some(total)) = (counter_current, counter_total) {
        match op_lower.as_str() {
            "converting" => fp.carry = Carry::TextureCounter(current, total),
            "building" => fp.carry = Carry::BsaCounter(current, total),
            _ => file_counter = Some((current, total)),
        }
    }

    Ok(Some(StructuredMatch {
        file_progress: fp,
        file_counter,
    }))
}

fn speed_str_was_absent(caps: &regex::Captures) -> bool {
    caps.get(4).is_none()
}

/// Fallback file-progress patterns (spec §4.1 item 5).
fn extract_fallback_file_progress(line: &str, now: f64) -> Option<FileProgress> {
    let line_lower = line.to_ascii_lowercase();

    if let Some(caps) = PROGRESS_COLON_FILE.captures(line) {
        let filename = caps[1].trim().to_string();
        let percent: f64 = caps[2].parse().unwrap_or(0.0);
        let operation = detect_operation_from_line(&line_lower);
        let mut fp = FileProgress::new(filename, operation, percent, now);
        if let Some((c, t)) = parse_data_string(line) {
            fp.current_size = c;
            fp.total_size = t;
        }
        return Some(fp);
    }

    if let Some(caps) = EXT_COLON_PERCENT.captures(line) {
        let filename = caps[1].trim().to_string();
        let percent: f64 = caps[2].parse().unwrap_or(0.0);
        let operation = detect_operation_from_line(&line_lower);
        let mut fp = FileProgress::new(filename, operation, percent, now);
        if let Some((c, t)) = parse_data_string(line) {
            fp.current_size = c;
            fp.total_size = t;
        }
        return Some(fp);
    }

    if let Some(caps) = EXT_BRACKET_SPEED.captures(line) {
        let filename = caps[1].trim().to_string();
        let speed_str = caps[2].trim().trim_end_matches(']');
        let speed = parse_speed_str(speed_str);
        let operation = detect_operation_from_line(&line_lower);
        let mut fp = FileProgress::new(filename, operation, 0.0, now);
        fp.speed = speed;
        if let Some((c, t)) = parse_data_string(line) {
            fp.current_size = c;
            fp.total_size = t;
        }
        return Some(fp);
    }

    if let Some(caps) = EXT_AT_PERCENT.captures(line) {
        let filename = caps[1].trim().to_string();
        let percent: f64 = caps[2].parse().unwrap_or(0.0);
        let operation = detect_operation_from_line(&line_lower);
        return Some(FileProgress::new(filename, operation, percent, now));
    }

    if let Some(caps) = EXT_OF_BYTES.captures(line) {
        let filename = caps[1].trim().to_string();
        let current_bytes = parse_unit_value(&caps[2], &caps[3]);
        let total_bytes = parse_unit_value(&caps[4], &caps[5]);
        let percent = if total_bytes > 0 {
            current_bytes as f64 / total_bytes as f64 * 100.0
        } else {
            0.0
        };
        let operation = detect_operation_from_line(&line_lower);
        let mut fp = FileProgress::new(filename, operation, percent, now);
        fp.current_size = current_bytes;
        fp.total_size = total_bytes;
        return Some(fp);
    }

    None
}

/// Stateless, side-effect-free tokenizer: one decoded line in, one
/// [`ParsedLine`] out (spec §4.1).
pub struct LineClassifier;

impl LineClassifier {
    pub fn new() -> Self {
        LineClassifier
    }

    /// Classify a single line. `now` is the caller's monotonic clock
    /// reading, used only to stamp any `FileProgress` this line produces.
    pub fn classify(&self, line: &str, now: f64) -> ParsedLine {
        let trimmed = line.trim();
        let mut result = ParsedLine::unparsed(trimmed);
        if trimmed.is_empty() {
            return result;
        }

        // Section-header phase detection, e.g. "=== Installing files ===".
        if let Some(caps) = SECTION_HEADER.captures(trimmed) {
            let label = caps[1].trim().to_string();
            let phase = map_phase_text(&label.to_ascii_lowercase());
            result.phase = Some(phase);
            result.phase_name = Some(label);
            result.has_progress = true;
        } else if let Some(caps) = regex::Regex::new(r"(?i)\[.*?\]\s*(Installing|Downloading|Extracting|Validating|Processing|Checking existing)")
            .unwrap()
            .captures(trimmed)
        {
            let action = caps[1].to_string();
            let phase = map_phase_text(&action.to_ascii_lowercase());
            result.phase = Some(phase);
            result.phase_name = Some(action);
            result.has_progress = true;
        }

        // Structured [FILE_PROGRESS] line takes priority over fallbacks, and
        // short-circuits them entirely once it matches at all — even if it
        // yields nothing displayable (spec §4.1 item 1).
        match extract_structured_file_progress(trimmed, now) {
            Ok(Some(m)) => {
                result.has_progress = true;
                result.file_progress = Some(m.file_progress);
                result.file_counter = m.file_counter;
            }
            Ok(None) => {
                result.has_progress = true;
            }
            Err(()) => {
                if let Some(fp) = extract_fallback_file_progress(trimmed, now) {
                    result.has_progress = true;
                    result.file_progress = Some(fp);
                }
            }
        }

        // Wabbajack status line: "[12/14] StatusText (data)" — but not a
        // .wabbajack download line, which item 4 handles specifically.
        if let Some(caps) = WABBAJACK_STATUS.captures(trimmed) {
            let status_text = caps[3].trim().to_ascii_lowercase();
            if !status_text.contains(".wabbajack") && !status_text.contains("downloading .wabbajack") {
                let current_step: u64 = caps[1].parse().unwrap_or(0);
                let max_steps: u64 = caps[2].parse().unwrap_or(0);
                result.step_info = Some((current_step, max_steps));
                let phase = map_phase_text(&status_text);
                result.phase = Some(phase);
                result.phase_name = Some(caps[3].trim().to_string());
                if let Some(data_info) = parse_data_string(&caps[4]) {
                    result.data_info = Some(data_info);
                }
                result.has_progress = true;
            }
        }

        // Timestamped status line: "[HH:MM:SS] StatusText (i/n) - speed".
        if let Some(caps) = TIMESTAMP_STATUS.captures(trimmed) {
            let status_text = caps[1].trim().to_string();
            let phase = map_phase_text(&status_text.to_ascii_lowercase());
            result.phase = Some(phase);
            result.phase_name = Some(status_text.clone());

            let current_step: u64 = caps[2].parse().unwrap_or(0);
            let max_steps: u64 = caps[3].parse().unwrap_or(0);
            result.step_info = Some((current_step, max_steps));

            let speed_str = caps[4].trim();
            let speed = parse_speed_str(speed_str);
            if speed > 0.0 {
                let operation = detect_operation_from_line(&status_text.to_ascii_lowercase());
                result.speed_info = Some((operation.key().to_string(), speed));
            }

            if max_steps > 0 {
                result.overall_percent = Some(current_step as f64 / max_steps as f64 * 100.0);
            }
            result.has_progress = true;
        }

        // Top-level .wabbajack archive download line.
        if let Some(caps) = WABBAJACK_DOWNLOAD.captures(trimmed) {
            let mut filename = caps[1].trim().to_string();
            if filename == ".wabbajack" {
                filename = WABBAJACK_FILENAME_IN_MESSAGE
                    .captures(trimmed)
                    .map(|m| m[1].to_string())
                    .unwrap_or_else(|| "Downloading .wabbajack file".to_string());
            }

            let data_str = caps[2].trim();
            let data_info = parse_data_string(&format!("({data_str})")).or_else(|| {
                let alt = Regex::new(
                    r"(?i)(\d+(?:\.\d+)?)\s*(B|KB|MB|GB|TB)?\s*/\s*(\d+(?:\.\d+)?)\s*(B|KB|MB|GB|TB)",
                )
                .unwrap();
                alt.captures(data_str).map(|m| {
                    let current_val: f64 = m[1].parse().unwrap_or(0.0);
                    let current_unit = m.get(2).map(|x| x.as_str()).unwrap_or(&m[4]);
                    let total_val: f64 = m[3].parse().unwrap_or(0.0);
                    let total_unit = &m[4];
                    (
                        parse_unit_value(&current_val.to_string(), current_unit),
                        parse_unit_value(&total_val.to_string(), total_unit),
                    )
                })
            });

            if let Some((current_bytes, total_bytes)) = data_info {
                result.data_info = Some((current_bytes, total_bytes));
                if total_bytes > 0 {
                    result.overall_percent = Some(current_bytes as f64 / total_bytes as f64 * 100.0);
                }
                let percent = if total_bytes > 0 {
                    current_bytes as f64 / total_bytes as f64 * 100.0
                } else {
                    0.0
                };
                let speed = parse_speed_str(caps[3].trim());
                let mut fp = FileProgress::new(filename.clone(), Operation::Download, percent, now);
                fp.current_size = current_bytes;
                fp.total_size = total_bytes;
                fp.speed = if speed > 0.0 { speed } else { -1.0 };
                result.file_progress = Some(fp);
            }

            let speed = parse_speed_str(caps[3].trim());
            if speed > 0.0 {
                result.speed_info = Some(("download".to_string(), speed));
            }

            result.phase = Some(Phase::Download);
            result.phase_name = Some(format!("Downloading {filename}"));
            result.has_progress = true;
        }

        // Overall percent patterns: "Progress: 85%" / "85% complete".
        if result.overall_percent.is_none() {
            let overall_re = Regex::new(r"(?i)(?:Progress|Overall):\s*(\d+(?:\.\d+)?)%").unwrap();
            if let Some(caps) = overall_re.captures(trimmed) {
                result.overall_percent = Some(caps[1].parse().unwrap_or(0.0));
                result.has_progress = true;
            } else {
                let done_re =
                    Regex::new(r"(?i)^(\d+(?:\.\d+)?)%\s*(?:complete|done|progress)").unwrap();
                if let Some(caps) = done_re.captures(trimmed) {
                    result.overall_percent = Some(caps[1].parse().unwrap_or(0.0));
                    result.has_progress = true;
                }
            }
        }

        // Step pattern fallback.
        if result.step_info.is_none() {
            if let Some(caps) = STEP_PATTERN.captures(trimmed) {
                let current: u64 = caps[1].parse().unwrap_or(0);
                let total: u64 = caps[2].parse().unwrap_or(0);
                result.step_info = Some((current, total));
                result.has_progress = true;
            }
        }

        // Data pattern fallback.
        if result.data_info.is_none() {
            if let Some((current, total)) = parse_data_string(trimmed) {
                result.data_info = Some((current, total));
                result.has_progress = true;
            }
        }

        // Speed pattern fallback.
        if result.speed_info.is_none() {
            let speed_match = SPEED_DASH.captures(trimmed).or_else(|| SPEED_AT.captures(trimmed));
            if let Some(caps) = speed_match {
                let value: f64 = caps[1].parse().unwrap_or(0.0);
                let speed_bytes = parse_bytes(value, &caps[2]) as f64;
                let operation = detect_operation_from_line(&trimmed.to_ascii_lowercase());
                result.speed_info = Some((operation.key().to_string(), speed_bytes));
                result.has_progress = true;
            }
        }

        // Completion marker: "Finished downloading filename.7z. Hash: ...".
        if let Some(caps) = COMPLETION_MARKER.captures(trimmed) {
            let filename = caps[1].trim().trim_end_matches(['.', ' ']).to_string();
            if !filename.is_empty() {
                result.completed_filename = Some(filename);
                result.has_progress = true;
            }
        }

        result
    }
}

impl Default for LineClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purity_classifying_twice_is_equal() {
        let c = LineClassifier::new();
        let a = c.classify("[FILE_PROGRESS] Downloading: ModpackA.7z (37.5%) [12.4MB/s]", 1.0);
        let b = c.classify("[FILE_PROGRESS] Downloading: ModpackA.7z (37.5%) [12.4MB/s]", 1.0);
        assert_eq!(a.has_progress, b.has_progress);
        assert_eq!(
            a.file_progress.unwrap().filename,
            b.file_progress.unwrap().filename
        );
    }

    #[test]
    fn s1_structured_download_with_speed() {
        let c = LineClassifier::new();
        let parsed = c.classify("[FILE_PROGRESS] Downloading: ModpackA.7z (37.5%) [12.4MB/s]", 1.0);
        assert!(parsed.has_progress);
        let fp = parsed.file_progress.expect("file progress");
        assert_eq!(fp.filename, "ModpackA.7z");
        assert_eq!(fp.operation, Operation::Download);
        assert_eq!(fp.percent(), 37.5);
        assert_eq!(fp.speed as i64, 13002342);
    }

    #[test]
    fn s2_timestamped_aggregate() {
        let c = LineClassifier::new();
        let parsed = c.classify("[00:00:10] Downloading Mod Archives (17/214) - 6.8MB/s", 1.0);
        assert_eq!(parsed.phase, Some(Phase::Download));
        assert_eq!(parsed.step_info, Some((17, 214)));
        let (op, speed) = parsed.speed_info.expect("speed info");
        assert_eq!(op, "download");
        assert_eq!(speed as i64, 7130316);
        let overall = parsed.overall_percent.expect("overall percent");
        assert!((overall - 7.9439).abs() < 0.01);
    }

    #[test]
    fn s3_step_and_data_status() {
        let c = LineClassifier::new();
        let parsed = c.classify("[12/14] Installing files (1.1GB/56.3GB)", 1.0);
        assert_eq!(parsed.phase, Some(Phase::Install));
        assert_eq!(parsed.step_info, Some((12, 14)));
        let (current, total) = parsed.data_info.expect("data info");
        assert_eq!(current, 1181116006);
        assert_eq!(total, 60451664691);
    }

    #[test]
    fn s4_hidden_counter_on_unfiltered_filename() {
        let c = LineClassifier::new();
        let parsed = c.classify(
            "[FILE_PROGRESS] Converting: internal_temp.tmp (42.0%) (234/1078)",
            1.0,
        );
        let fp = parsed.file_progress.expect("file progress");
        assert_eq!(fp.carry, Carry::TextureCounter(234, 1078));
        assert!(parsed.file_counter.is_none());
    }

    #[test]
    fn structured_match_with_filtered_filename_never_falls_through_to_fallback() {
        let c = LineClassifier::new();
        let parsed = c.classify("[FILE_PROGRESS] Downloading: #scratch.7z (50.0%)", 1.0);
        assert!(parsed.has_progress);
        assert!(parsed.file_progress.is_none());
    }

    #[test]
    fn s5_completion_marker_with_hash_suffix() {
        let c = LineClassifier::new();
        let parsed = c.classify("Finished downloading ModpackB.zip. Hash: abc123", 1.0);
        assert_eq!(parsed.completed_filename.as_deref(), Some("ModpackB.zip"));
    }

    #[test]
    fn display_filter_drops_scratch_and_extensionless_names() {
        assert!(!should_display_file("#scratch123.txt"));
        assert!(!should_display_file("noext"));
        assert!(!should_display_file("one.7z"));
        assert!(should_display_file("modlist.wabbajack"));
        assert!(should_display_file(".wabbajack"));
        assert!(should_display_file("Downloading .wabbajack file"));
        assert!(!should_display_file(""));
    }

    #[test]
    fn unparseable_line_has_no_progress() {
        let c = LineClassifier::new();
        let parsed = c.classify("just some prose the engine printed", 1.0);
        assert!(!parsed.has_progress);
        assert_eq!(parsed.message, "just some prose the engine printed");
    }

    #[test]
    fn section_header_maps_to_phase() {
        let c = LineClassifier::new();
        let parsed = c.classify("=== Installing files ===", 1.0);
        assert_eq!(parsed.phase, Some(Phase::Install));
    }
}
