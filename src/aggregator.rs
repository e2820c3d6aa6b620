//! Folds a stream of [`ParsedLine`] records into the authoritative
//! [`InstallationProgress`] value (spec §4.2).

use crate::classifier::{should_display_file, LineClassifier};
use crate::config::Config;
use crate::file_progress::{Carry, FileProgress};
use crate::parsed_line::ParsedLine;
use crate::phase::{Operation, Phase};
use std::collections::HashMap;
use std::time::Instant;

/// The aggregator's authoritative value (spec §3).
#[derive(Debug, Clone)]
pub struct InstallationProgress {
    pub phase: Phase,
    pub phase_name: String,
    pub phase_step: u64,
    pub phase_max_steps: u64,
    pub overall_percent: f64,
    pub data_processed: u64,
    pub data_total: u64,
    pub active_files: Vec<FileProgress>,
    pub speeds: HashMap<String, f64>,
    pub speed_timestamps: HashMap<String, f64>,
    pub texture_conversion_current: u64,
    pub texture_conversion_total: u64,
    pub bsa_building_current: u64,
    pub bsa_building_total: u64,
    pub message: String,
    pub timestamp: f64,
}

impl Default for InstallationProgress {
    fn default() -> Self {
        Self {
            phase: Phase::Unknown,
            phase_name: String::new(),
            phase_step: 0,
            phase_max_steps: 0,
            overall_percent: 0.0,
            data_processed: 0,
            data_total: 0,
            active_files: Vec::new(),
            speeds: HashMap::new(),
            speed_timestamps: HashMap::new(),
            texture_conversion_current: 0,
            texture_conversion_total: 0,
            bsa_building_current: 0,
            bsa_building_total: 0,
            message: String::new(),
            timestamp: 0.0,
        }
    }
}

impl InstallationProgress {
    /// Insert or update a file keyed by filename (spec §3 identity rule).
    fn add_file(&mut self, mut file: FileProgress, now: f64) {
        if file.percent() >= 100.0 {
            if let Some(existing) = self.find_mut(&file.filename) {
                if existing.percent() >= 100.0 {
                    if now - existing.last_update < 0.5 {
                        existing.last_update = now;
                    }
                    return;
                }
            }
        }

        if let Some(existing) = self.find_mut(&file.filename) {
            existing.operation = file.operation;
            existing.set_percent(file.percent());
            existing.current_size = file.current_size;
            existing.total_size = file.total_size;
            existing.speed = file.speed;
            existing.last_update = now;
        } else {
            file.last_update = now;
            self.active_files.push(file);
        }
        self.timestamp = now;
    }

    fn find_mut(&mut self, filename: &str) -> Option<&mut FileProgress> {
        self.active_files.iter_mut().find(|f| f.filename == filename)
    }

    /// Remove completed files past their grace period, and idle incomplete
    /// files (spec §4.2 step 12).
    fn sweep(&mut self, now: f64, completed_grace_secs: f64, idle_eviction_secs: f64) {
        self.active_files.retain(|f| {
            let age = now - f.last_update;
            (!f.is_complete() && age < idle_eviction_secs) || (f.is_complete() && age < completed_grace_secs)
        });
    }

    fn update_speed(&mut self, operation: &str, speed: f64, now: f64) {
        self.speeds.insert(operation.to_string(), speed.max(0.0));
        self.speed_timestamps.insert(operation.to_string(), now);
        self.timestamp = now;
    }
}

#[derive(Debug, Clone, Default)]
struct FileHistory {
    bytes: u64,
    time: f64,
    total: Option<u64>,
    computed_speed: f64,
}

/// Owns the single authoritative [`InstallationProgress`] for a run and
/// folds each parsed line into it (spec §4.2).
pub struct StateAggregator {
    state: InstallationProgress,
    classifier: LineClassifier,
    config: Config,
    start: Instant,
    file_history: HashMap<String, FileHistory>,
    wabbajack_entry_name: Option<String>,
    has_real_wabbajack: bool,
}

impl StateAggregator {
    pub fn new(config: Config) -> Self {
        Self {
            state: InstallationProgress::default(),
            classifier: LineClassifier::new(),
            config,
            start: Instant::now(),
            file_history: HashMap::new(),
            wabbajack_entry_name: None,
            has_real_wabbajack: false,
        }
    }

    fn now(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    pub fn get_state(&self) -> &InstallationProgress {
        &self.state
    }

    /// Reset to a fresh run (spec §4.2 "Reset").
    pub fn reset(&mut self) {
        self.state = InstallationProgress::default();
        self.file_history.clear();
        self.wabbajack_entry_name = None;
        self.has_real_wabbajack = false;
    }

    /// Apply one decoded engine line. Returns whether the state changed
    /// (spec §6).
    pub fn process_line(&mut self, line: &str) -> bool {
        let now = self.now();
        let parsed = self.classifier.classify(line, now);
        self.apply(parsed, now)
    }

    fn apply(&mut self, parsed: ParsedLine, now: f64) -> bool {
        if !parsed.has_progress {
            return false;
        }

        let mut updated = false;

        if let Some(phase) = parsed.phase {
            self.state.phase = phase;
            updated = true;
        }
        if let Some(name) = &parsed.phase_name {
            self.state.phase_name = name.clone();
            updated = true;
        }

        if let Some(overall) = parsed.overall_percent {
            self.state.overall_percent = overall.clamp(0.0, 100.0);
            updated = true;
        }

        if let Some((step, max)) = parsed.step_info {
            self.state.phase_step = step;
            self.state.phase_max_steps = max;
            updated = true;
        }

        if let Some((processed, total)) = parsed.data_info {
            self.state.data_processed = processed;
            self.state.data_total = total;
            if self.state.overall_percent == 0.0 && total > 0 {
                self.state.overall_percent = (processed as f64 / total as f64 * 100.0).clamp(0.0, 100.0);
            }
            updated = true;
        }

        if let Some((current, max)) = parsed.file_counter {
            self.state.phase_step = current;
            self.state.phase_max_steps = max;
            updated = true;
        }

        if let Some(mut fp) = parsed.file_progress {
            if fp.is_hidden() {
                self.attribute_hidden_counter(&fp);
                return updated;
            }

            match fp.carry {
                Carry::TextureCounter(cur, total) => {
                    self.state.texture_conversion_current = cur;
                    self.state.texture_conversion_total = total;
                    updated = true;
                }
                Carry::BsaCounter(cur, total) => {
                    self.state.bsa_building_current = cur;
                    self.state.bsa_building_total = total;
                    updated = true;
                }
                _ => {}
            }

            if fp.filename.to_ascii_lowercase().ends_with(".wabbajack") {
                self.wabbajack_entry_name = Some(fp.filename.clone());
                self.remove_synthetic_wabbajack();
                self.has_real_wabbajack = true;
            }

            self.augment_file_metrics(&mut fp, now);

            let existing = self.state.find_mut(&fp.filename).is_some();
            if fp.percent() >= 100.0 && !existing {
                updated = true;
            } else if fp.percent() >= 100.0 {
                fp.last_update = now;
                self.state.add_file(fp, now);
                updated = true;
            } else {
                self.state.add_file(fp, now);
                updated = true;
            }
        } else if parsed.data_info.is_some() && !self.has_real_wabbajack {
            if self.maybe_add_wabbajack_progress(&parsed, now) {
                updated = true;
            }
        }

        if let Some(completed) = &parsed.completed_filename {
            if should_display_file(completed) {
                updated |= self.handle_completed_filename(completed, now);
            }
        }

        if let Some((op, speed)) = &parsed.speed_info {
            self.state.update_speed(op, *speed, now);
            updated = true;
        }

        if !parsed.message.is_empty() {
            self.state.message = parsed.message.clone();
        }

        if updated {
            self.state.timestamp = now;
        }

        self.state.sweep(
            now,
            self.config.completed_grace_secs,
            self.config.idle_eviction_secs,
        );

        updated
    }

    fn attribute_hidden_counter(&mut self, fp: &FileProgress) {
        match fp.carry {
            Carry::TextureCounter(cur, total) => {
                self.state.texture_conversion_current = cur;
                self.state.texture_conversion_total = total;
            }
            Carry::BsaCounter(cur, total) => {
                self.state.bsa_building_current = cur;
                self.state.bsa_building_total = total;
            }
            Carry::FileCounter(cur, total) => {
                self.state.phase_step = cur;
                self.state.phase_max_steps = total;
            }
            _ => {}
        }
    }

    fn handle_completed_filename(&mut self, filename: &str, now: f64) -> bool {
        for f in self.state.active_files.iter_mut() {
            if f.filename == filename || f.filename.ends_with(filename) || f.filename.contains(filename) {
                f.set_percent(100.0);
                f.last_update = now;
                return true;
            }
        }

        let mut completed = FileProgress::new(filename, Operation::Download, 100.0, now);
        completed.last_update = now;
        self.state.add_file(completed, now);
        true
    }

    /// Populate size/speed info for a file being added or updated
    /// (spec §4.2 "Metric augmentation").
    fn augment_file_metrics(&mut self, fp: &mut FileProgress, now: f64) {
        let history = self.file_history.get(&fp.filename).cloned();

        let mut total_size = if fp.total_size > 0 {
            Some(fp.total_size)
        } else {
            history.as_ref().and_then(|h| h.total)
        };

        if let Some(total) = total_size {
            if fp.percent() > 0.0 && fp.current_size == 0 {
                fp.current_size = ((fp.percent() / 100.0) * total as f64).round() as u64;
            }
        } else if fp.current_size > 0 && fp.total_size > 0 {
            total_size = Some(fp.total_size);
        }

        if let Some(total) = total_size {
            if fp.total_size == 0 {
                fp.total_size = total;
            }
        }

        let current_size = fp.current_size;

        let computed_speed;
        if fp.speed < 0.0 {
            let mut speed = 0.0;
            if let Some(h) = &history {
                if current_size > 0 {
                    let prev_bytes = h.bytes;
                    let prev_time = h.time;
                    let delta_bytes = current_size as i64 - prev_bytes as i64;
                    let delta_time = now - prev_time;
                    if delta_bytes >= 0 && delta_time >= 1.0 {
                        speed = delta_bytes as f64 / delta_time;
                    } else if h.computed_speed > 0.0 {
                        speed = h.computed_speed;
                    }
                }
            }
            fp.speed = speed;
            computed_speed = speed;
        } else {
            computed_speed = fp.speed;
        }

        if current_size > 0 || total_size.is_some() {
            self.file_history.insert(
                fp.filename.clone(),
                FileHistory {
                    bytes: current_size,
                    time: now,
                    total: total_size.or_else(|| history.as_ref().and_then(|h| h.total)),
                    computed_speed,
                },
            );
        } else if let Some(h) = history {
            self.file_history.insert(fp.filename.clone(), h);
        }
    }

    /// Create or refresh a synthetic `.wabbajack` entry for an untracked
    /// top-level archive download (spec §4.2 "Synthetic entry policy").
    fn maybe_add_wabbajack_progress(&mut self, parsed: &ParsedLine, now: f64) -> bool {
        let Some((current_bytes, total_bytes)) = parsed.data_info else {
            return false;
        };
        if total_bytes == 0 {
            return false;
        }

        if let Some(existing) = self
            .state
            .active_files
            .iter_mut()
            .find(|f| f.filename.to_ascii_lowercase().ends_with(".wabbajack"))
        {
            if existing.synthetic {
                let percent = current_bytes as f64 / total_bytes as f64 * 100.0;
                existing.set_percent(percent);
                existing.current_size = current_bytes;
                existing.total_size = total_bytes;
                existing.last_update = now;
                let mut clone = existing.clone();
                self.augment_file_metrics(&mut clone, now);
                *existing = clone;
                return true;
            }
            return false;
        }

        let message_lower = parsed.message.to_ascii_lowercase();
        let phase_name_lower = parsed
            .phase_name
            .as_deref()
            .unwrap_or_default()
            .to_ascii_lowercase();
        let should_force = message_lower.contains("wabbajack") || phase_name_lower.contains("wabbajack");

        if !should_force {
            if self.has_real_download_activity() {
                return false;
            }
            if !matches!(self.state.phase, Phase::Initialization | Phase::Download) {
                return false;
            }
        }

        let percent = current_bytes as f64 / total_bytes as f64 * 100.0;
        if self.wabbajack_entry_name.is_none() {
            if let Some(caps) =
                regex::Regex::new(r"(?i)([A-Za-z0-9_\-.]+\.wabbajack)").unwrap().captures(&parsed.message)
            {
                self.wabbajack_entry_name = Some(caps[1].to_string());
            }
        }
        let entry_name = self
            .wabbajack_entry_name
            .clone()
            .unwrap_or_else(|| "Downloading .wabbajack file".to_string());

        let mut entry = FileProgress::new(entry_name, Operation::Download, percent, now);
        entry.current_size = current_bytes;
        entry.total_size = total_bytes;
        entry.last_update = now;
        entry.synthetic = true;
        self.augment_file_metrics(&mut entry, now);
        self.state.add_file(entry, now);
        true
    }

    fn has_real_download_activity(&self) -> bool {
        self.state
            .active_files
            .iter()
            .any(|f| !f.synthetic && f.operation == Operation::Download)
    }

    fn remove_synthetic_wabbajack(&mut self) {
        let mut removed_names = Vec::new();
        self.state.active_files.retain(|f| {
            if f.synthetic {
                removed_names.push(f.filename.clone());
                false
            } else {
                true
            }
        });
        for name in removed_names {
            self.file_history.remove(&name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s1_structured_download_added_with_speed() {
        let mut agg = StateAggregator::new(Config::default());
        let updated = agg.process_line("[FILE_PROGRESS] Downloading: ModpackA.7z (37.5%) [12.4MB/s]");
        assert!(updated);
        let state = agg.get_state();
        assert_eq!(state.active_files.len(), 1);
        let f = &state.active_files[0];
        assert_eq!(f.filename, "ModpackA.7z");
        assert_eq!(f.operation, Operation::Download);
        assert_eq!(f.percent(), 37.5);
        assert_eq!(f.speed as i64, 13002342);
    }

    #[test]
    fn s3_step_and_data_derives_overall_percent() {
        let mut agg = StateAggregator::new(Config::default());
        agg.process_line("[12/14] Installing files (1.1GB/56.3GB)");
        let state = agg.get_state();
        assert_eq!(state.phase, Phase::Install);
        assert_eq!(state.phase_step, 12);
        assert_eq!(state.phase_max_steps, 14);
        assert_eq!(state.data_processed, 1181116006);
        assert_eq!(state.data_total, 60451664691);
        assert!((state.overall_percent - 1.954).abs() < 0.01);
    }

    #[test]
    fn s4_hidden_counter_does_not_touch_active_files() {
        let mut agg = StateAggregator::new(Config::default());
        agg.process_line("[FILE_PROGRESS] Converting: internal_temp.tmp (42.0%) (234/1078)");
        let state = agg.get_state();
        assert!(state.active_files.is_empty());
        assert_eq!(state.texture_conversion_current, 234);
        assert_eq!(state.texture_conversion_total, 1078);
    }

    #[test]
    fn s5_completion_marker_synthesizes_entry_when_untracked() {
        let mut agg = StateAggregator::new(Config::default());
        agg.process_line("Finished downloading ModpackB.zip. Hash: abc123");
        let state = agg.get_state();
        assert_eq!(state.active_files.len(), 1);
        assert_eq!(state.active_files[0].percent(), 100.0);
    }

    #[test]
    fn completion_marker_updates_tracked_entry_with_noisier_filename() {
        let mut agg = StateAggregator::new(Config::default());
        agg.process_line("[FILE_PROGRESS] Extracting: mods/Textures/rock_diffuse.dds.tmp (40.0%)");
        agg.process_line("Finished extracting rock_diffuse.dds.");
        let state = agg.get_state();
        assert_eq!(state.active_files.len(), 1);
        assert_eq!(state.active_files[0].filename, "mods/Textures/rock_diffuse.dds.tmp");
        assert_eq!(state.active_files[0].percent(), 100.0);
    }

    #[test]
    fn unique_filenames_across_repeated_updates() {
        let mut agg = StateAggregator::new(Config::default());
        agg.process_line("[FILE_PROGRESS] Downloading: ModpackA.7z (10.0%)");
        agg.process_line("[FILE_PROGRESS] Downloading: ModpackA.7z (50.0%)");
        let state = agg.get_state();
        assert_eq!(state.active_files.len(), 1);
        assert_eq!(state.active_files[0].percent(), 50.0);
    }

    #[test]
    fn synthetic_wabbajack_removed_once_real_entry_appears() {
        let mut agg = StateAggregator::new(Config::default());
        agg.process_line("[00:00:01] Downloading modlist archive (1.0GB/2.0GB)");
        assert_eq!(agg.get_state().active_files.len(), 1);
        assert!(agg.get_state().active_files[0].synthetic);

        agg.process_line("[FILE_PROGRESS] Downloading: real.wabbajack (10.0%)");
        let state = agg.get_state();
        assert_eq!(state.active_files.iter().filter(|f| f.synthetic).count(), 0);
        assert!(state.active_files.iter().any(|f| f.filename == "real.wabbajack"));
    }

    #[test]
    fn percent_always_clamped_on_overall_and_files() {
        let mut agg = StateAggregator::new(Config::default());
        agg.process_line("[FILE_PROGRESS] Downloading: ModpackA.7z (150.0%)");
        let state = agg.get_state();
        assert_eq!(state.active_files[0].percent(), 100.0);
        assert!(state.overall_percent >= 0.0 && state.overall_percent <= 100.0);
    }

    #[test]
    fn reset_clears_state_and_history() {
        let mut agg = StateAggregator::new(Config::default());
        agg.process_line("[FILE_PROGRESS] Downloading: ModpackA.7z (37.5%)");
        agg.reset();
        let state = agg.get_state();
        assert!(state.active_files.is_empty());
        assert_eq!(state.phase, Phase::Unknown);
    }

    #[test]
    fn unrecognized_line_is_a_no_op() {
        let mut agg = StateAggregator::new(Config::default());
        let updated = agg.process_line("just some prose the engine printed");
        assert!(!updated);
        assert!(agg.get_state().active_files.is_empty());
    }
}
