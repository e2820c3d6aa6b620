//! Read-only projection of [`InstallationProgress`] into what the dashboard
//! needs to draw one frame (spec §4.3).
//!
//! The aggregator mutates freely; this model only translates. It keeps a
//! small amount of its own state — summary-widget throttling, the
//! BSA-interpretation hold, per-row interpolation — none of which is part
//! of the authoritative progress value (spec §9 "Timers and smoothing").

use crate::aggregator::InstallationProgress;
use crate::bytes::format_bytes;
use crate::config::Config;
use crate::phase::{Operation, Phase};
use std::collections::HashMap;
use std::time::Instant;

const TEXTURE_EXTENSIONS: &[&str] = &["dds", "png", "tga", "bmp"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowFlag {
    Hidden,
    Synthetic,
    NoProgressBar,
    IsSummary,
}

/// One row the dashboard draws, or a synthetic summary row (spec §6).
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub filename: String,
    pub operation: Operation,
    pub percent: f64,
    pub current_size: u64,
    pub total_size: u64,
    pub speed: f64,
    pub flags: Vec<RowFlag>,
}

impl Row {
    fn summary(label: impl Into<String>) -> Self {
        Self {
            filename: label.into(),
            operation: Operation::Unknown,
            percent: 0.0,
            current_size: 0,
            total_size: 0,
            speed: -1.0,
            flags: vec![RowFlag::IsSummary, RowFlag::NoProgressBar],
        }
    }
}

/// Is a row determinate (has a real percent to show) per spec §4.3
/// "File list mode"?
fn is_determinate(percent: f64, current_size: u64, total_size: u64, speed: f64) -> bool {
    percent > 0.0 || (total_size > 0 && current_size > 0) || (speed > 0.0 && percent >= 0.0)
}

fn is_queued(current_size: u64, total_size: u64, percent: f64, speed: f64) -> bool {
    current_size == 0 && total_size > 0 && percent == 0.0 && speed <= 0.0
}

/// Translates [`InstallationProgress`] into dashboard-ready data, owning
/// only smoothing/throttling state (spec §4.3).
pub struct RenderModel {
    config: Config,
    start: Instant,
    bsa_active_since: Option<f64>,
    bsa_last_seen: Option<f64>,
    in_summary_mode: bool,
    summary_entered_at: Option<f64>,
    filelist_entered_at: Option<f64>,
    last_summary_render: Option<f64>,
    displayed_percent: HashMap<String, f64>,
}

impl RenderModel {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            start: Instant::now(),
            bsa_active_since: None,
            bsa_last_seen: None,
            in_summary_mode: false,
            summary_entered_at: None,
            filelist_entered_at: None,
            last_summary_render: None,
            displayed_percent: HashMap::new(),
        }
    }

    fn now(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// BSA-phase detection with a 1.5 s hold to survive gaps in the signal
    /// (spec §4.3 "BSA-phase detection").
    fn is_bsa_phase(&mut self, state: &InstallationProgress) -> bool {
        let now = self.now();
        let phase_name_lower = state.phase_name.to_ascii_lowercase();
        let message_lower = state.message.to_ascii_lowercase();
        let detected = state.bsa_building_total > 0
            || phase_name_lower.contains("bsa")
            || (state.phase == Phase::Install
                && (message_lower.contains("building") || message_lower.contains("writing") || message_lower.contains("verifying"))
                && message_lower.contains(".bsa"))
            || (state.phase == Phase::Install
                && state
                    .active_files
                    .iter()
                    .any(|f| f.filename.to_ascii_lowercase().ends_with(".bsa")));

        if detected {
            self.bsa_last_seen = Some(now);
            if self.bsa_active_since.is_none() {
                self.bsa_active_since = Some(now);
            }
            return true;
        }

        if let Some(last_seen) = self.bsa_last_seen {
            if now - last_seen < self.config.bsa_hold_secs {
                return true;
            }
        }
        self.bsa_active_since = None;
        false
    }

    /// Short, stable phase label (spec §4.3 "Phase label selection").
    pub fn phase_label(&mut self, state: &InstallationProgress) -> String {
        let phase_name_lower = state.phase_name.to_ascii_lowercase();
        if phase_name_lower.contains("converting") && phase_name_lower.contains("texture") {
            return "Converting Textures".to_string();
        }
        if self.is_bsa_phase(state) {
            return "Building BSAs".to_string();
        }
        if state.phase == Phase::Finalize && !state.phase_name.is_empty() {
            return state.phase_name.clone();
        }
        let label = match state.phase {
            Phase::Download => "Downloading",
            Phase::Extract => "Extracting",
            Phase::Validate => "Validating",
            Phase::Install => "Installing",
            Phase::Finalize => "Finalising",
            Phase::Initialization => "Preparing",
            Phase::Unknown => "",
        };
        if !label.is_empty() {
            return label.to_string();
        }
        if !state.phase_name.is_empty() {
            return state.phase_name.clone();
        }
        state.phase.title().to_string()
    }

    fn step_progress_text(&self, state: &InstallationProgress) -> Option<String> {
        if state.phase_max_steps > 0 {
            Some(format!("[{}/{}]", state.phase_step, state.phase_max_steps))
        } else if state.phase_step > 0 {
            Some(format!("[{}]", state.phase_step))
        } else {
            None
        }
    }

    fn data_progress_text(&self, state: &InstallationProgress) -> Option<String> {
        if state.data_total > 0 {
            Some(format!(
                "{}/{}",
                format_bytes(state.data_processed),
                format_bytes(state.data_total)
            ))
        } else if state.data_processed > 0 {
            Some(format_bytes(state.data_processed))
        } else {
            None
        }
    }

    /// Aggregate speed, preferring the current phase's operation key, then
    /// any fresh speed in priority order (spec §4.3).
    fn fresh_aggregate_speed(&self, state: &InstallationProgress) -> Option<f64> {
        let now = self.now();
        let fresh = |op: &str| -> Option<f64> {
            let speed = *state.speeds.get(op)?;
            let ts = *state.speed_timestamps.get(op)?;
            if now - ts > self.config.speed_freshness_secs {
                return None;
            }
            Some(speed.max(0.0))
        };

        let phase_op = match state.phase {
            Phase::Download => Some("download"),
            Phase::Extract => Some("extract"),
            Phase::Validate => Some("validate"),
            Phase::Install => Some("install"),
            _ => None,
        };
        if let Some(op) = phase_op {
            if let Some(speed) = fresh(op) {
                if speed > 0.0 {
                    return Some(speed);
                }
            }
        }
        for op in ["download", "extract", "validate", "install"] {
            if let Some(speed) = fresh(op) {
                if speed > 0.0 {
                    return Some(speed);
                }
            }
        }
        None
    }

    /// Full display string for the overall banner (spec §4.3 "Display
    /// text composition").
    pub fn overall_label(&mut self, state: &InstallationProgress) -> String {
        let mut parts = Vec::new();
        let label = self.phase_label(state);
        if !label.is_empty() {
            parts.push(label);
        }

        if state.bsa_building_total > 0 {
            parts.push(format!(
                "[{}/{}]",
                state.bsa_building_current, state.bsa_building_total
            ));
        } else {
            if let Some(step_text) = self.step_progress_text(state) {
                parts.push(step_text);
            }
            if let Some(data_text) = self.data_progress_text(state) {
                if !(state.data_total > 0 && state.data_processed >= state.data_total) {
                    parts.push(format!("({data_text})"));
                }
            }
        }
        if let Some(speed) = self.fresh_aggregate_speed(state) {
            parts.push(format!("- {}/s", format_bytes(speed as u64)));
        }

        if parts.is_empty() {
            "Processing...".to_string()
        } else {
            parts.join(" ")
        }
    }

    /// Overall percentage, 0–100 (spec §4.3 "Percentage selection").
    pub fn overall_percent(&mut self, state: &InstallationProgress) -> u32 {
        if state.bsa_building_total > 0 {
            let raw = state.bsa_building_current as f64 / state.bsa_building_total as f64 * 100.0;
            return raw.min(99.0).max(0.0) as u32;
        }

        let step_ratio = if state.phase_max_steps > 0 {
            Some(state.phase_step as f64 / state.phase_max_steps as f64 * 100.0)
        } else {
            None
        };
        let byte_ratio = if state.data_total > 0 && state.data_processed > 0 {
            Some(state.data_processed as f64 / state.data_total as f64 * 100.0)
        } else {
            None
        };

        let percent = if matches!(state.phase, Phase::Install | Phase::Extract) {
            step_ratio
                .or(byte_ratio)
                .or_else(|| (state.overall_percent < 100.0).then_some(state.overall_percent))
                .unwrap_or(0.0)
        } else {
            byte_ratio
                .or_else(|| Some(state.overall_percent).filter(|p| *p > 0.0))
                .or(step_ratio)
                .unwrap_or(0.0)
        };

        percent.clamp(0.0, 100.0).round() as u32
    }

    /// Smoothly interpolate a row's displayed percent toward its target
    /// (spec §4.3 "Per-row percent values are interpolated").
    fn interpolate(&mut self, filename: &str, target: f64) -> f64 {
        let current = *self.displayed_percent.get(filename).unwrap_or(&target);
        let next = current + (target - current) * 0.2;
        self.displayed_percent.insert(filename.to_string(), next);
        next
    }

    /// Active-file rows in one of three mutually exclusive modes
    /// (spec §4.3 "Active-file view").
    pub fn active_rows(&mut self, state: &InstallationProgress) -> Vec<Row> {
        let now = self.now();
        let phase_name_lower = state.phase_name.to_ascii_lowercase();
        let is_install_summary = state.phase == Phase::Install || phase_name_lower.contains("install");
        let is_extract_summary = state.phase == Phase::Extract;

        let wants_summary = is_install_summary || is_extract_summary;
        if wants_summary && !self.in_summary_mode {
            self.in_summary_mode = true;
            self.summary_entered_at = Some(now);
            self.filelist_entered_at = None;
        } else if !wants_summary && self.in_summary_mode {
            if let Some(entered) = self.summary_entered_at {
                if now - entered < self.config.summary_hold_secs {
                    return self.render_summary(state, is_extract_summary);
                }
            }
            self.in_summary_mode = false;
            self.filelist_entered_at = Some(now);
        }

        if self.in_summary_mode {
            if let Some(last) = self.last_summary_render {
                if now - last < self.config.summary_throttle_secs {
                    return self.render_summary(state, is_extract_summary);
                }
            }
            self.last_summary_render = Some(now);
            return self.render_summary(state, is_extract_summary);
        }

        state
            .active_files
            .iter()
            .map(|f| {
                let target = f.percent();
                let displayed = self.interpolate(&f.filename, target);
                let queued = is_queued(f.current_size, f.total_size, f.percent(), f.speed);
                let mut flags = Vec::new();
                if f.synthetic {
                    flags.push(RowFlag::Synthetic);
                }
                let percent = if queued {
                    0.0
                } else if is_determinate(f.percent(), f.current_size, f.total_size, f.speed) {
                    displayed
                } else {
                    indeterminate_bounce(now)
                };
                Row {
                    filename: if queued {
                        "Queued".to_string()
                    } else {
                        f.filename.clone()
                    },
                    operation: f.operation,
                    percent,
                    current_size: f.current_size,
                    total_size: f.total_size,
                    speed: f.speed,
                    flags,
                }
            })
            .collect()
    }

    fn render_summary(&self, state: &InstallationProgress, is_extract: bool) -> Vec<Row> {
        if is_extract {
            let label = format!(
                "{} ({}/{})",
                self.phase_label_const(state),
                state.phase_step,
                state.phase_max_steps
            );
            return vec![Row::summary(label)];
        }

        let mut rows = vec![Row::summary(format!(
            "Installing Files: {}/{}",
            state.phase_step, state.phase_max_steps
        ))];

        for f in state.active_files.iter().filter(|f| f.operation == Operation::Install).take(3) {
            let ext = f.filename.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
            if ext == "bsa" || ext == "ba2" {
                let counter = if state.bsa_building_total > 0 {
                    format!(" ({}/{})", state.bsa_building_current, state.bsa_building_total)
                } else {
                    String::new()
                };
                let mut row = Row::summary(format!("BSA: {}{counter}", f.filename));
                row.flags = vec![RowFlag::IsSummary, RowFlag::NoProgressBar];
                rows.push(row);
            } else if TEXTURE_EXTENSIONS.contains(&ext.as_str()) {
                let counter = if state.texture_conversion_total > 0 {
                    format!(
                        " ({}/{})",
                        state.texture_conversion_current, state.texture_conversion_total
                    )
                } else {
                    String::new()
                };
                let mut row = Row::summary(format!("Converting Texture: {}{counter}", f.filename));
                row.flags = vec![RowFlag::IsSummary, RowFlag::NoProgressBar];
                rows.push(row);
            }
        }
        rows
    }

    /// Non-`&mut` phase label for use inside `render_summary`, which only
    /// borrows `&self`. BSA holds are already resolved by the time a frame
    /// reaches summary rendering.
    fn phase_label_const(&self, state: &InstallationProgress) -> &'static str {
        match state.phase {
            Phase::Download => "Downloading",
            Phase::Extract => "Extracting",
            Phase::Validate => "Validating",
            Phase::Install => "Installing",
            Phase::Finalize => "Finalising",
            Phase::Initialization => "Preparing",
            Phase::Unknown => "Processing",
        }
    }
}

/// A 0→100→0 bounce at roughly 60 fps for rows with no real progress
/// signal (spec §4.3 "indeterminate ... animation").
fn indeterminate_bounce(now: f64) -> f64 {
    let period = (now * 60.0) % 200.0;
    if period < 100.0 {
        period
    } else {
        200.0 - period
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_progress::FileProgress;

    fn state_with_bsa(current: u64, total: u64, data: u64) -> InstallationProgress {
        let mut state = InstallationProgress::default();
        state.bsa_building_current = current;
        state.bsa_building_total = total;
        state.data_processed = data;
        state.data_total = data;
        state
    }

    #[test]
    fn s6_bsa_percent_capped_at_99() {
        let mut model = RenderModel::new(Config::default());
        let state = state_with_bsa(5, 10, 1000);
        assert_eq!(model.overall_percent(&state), 50);
    }

    #[test]
    fn bsa_percent_never_exceeds_99_even_at_full_ratio() {
        let mut model = RenderModel::new(Config::default());
        let state = state_with_bsa(10, 10, 1000);
        assert_eq!(model.overall_percent(&state), 99);
    }

    #[test]
    fn phase_label_prefers_texture_conversion_substring() {
        let mut model = RenderModel::new(Config::default());
        let mut state = InstallationProgress::default();
        state.phase_name = "Converting Textures in progress".to_string();
        assert_eq!(model.phase_label(&state), "Converting Textures");
    }

    #[test]
    fn install_phase_prefers_step_ratio_over_overall_percent() {
        let mut model = RenderModel::new(Config::default());
        let mut state = InstallationProgress::default();
        state.phase = Phase::Install;
        state.phase_step = 3;
        state.phase_max_steps = 4;
        state.overall_percent = 10.0;
        assert_eq!(model.overall_percent(&state), 75);
    }

    #[test]
    fn byte_ratio_ignored_when_no_bytes_processed_yet() {
        let mut model = RenderModel::new(Config::default());
        let mut state = InstallationProgress::default();
        state.phase = Phase::Validate;
        state.data_total = 5_000_000_000;
        state.data_processed = 0;
        state.overall_percent = 42.0;
        assert_eq!(model.overall_percent(&state), 42);
    }

    #[test]
    fn file_list_mode_marks_queued_rows() {
        let mut model = RenderModel::new(Config::default());
        let mut state = InstallationProgress::default();
        state.phase = Phase::Download;
        let mut fp = FileProgress::new("queued.7z", Operation::Download, 0.0, 0.0);
        fp.total_size = 1000;
        state.active_files.push(fp);
        let rows = model.active_rows(&state);
        assert_eq!(rows[0].filename, "Queued");
    }

    #[test]
    fn install_summary_mode_emits_header_row() {
        let mut model = RenderModel::new(Config::default());
        let mut state = InstallationProgress::default();
        state.phase = Phase::Install;
        state.phase_step = 2;
        state.phase_max_steps = 5;
        let rows = model.active_rows(&state);
        assert!(rows[0].filename.starts_with("Installing Files"));
        assert!(rows[0].flags.contains(&RowFlag::IsSummary));
    }
}
