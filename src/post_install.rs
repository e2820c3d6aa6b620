//! Tracks Jackify's own post-install sequence (Steam integration, Wine
//! component setup, configuration finalisation) that runs after the
//! installer engine exits (spec §4.4).
//!
//! This machine never rewinds: once a step is reached, `current_step`
//! only moves forward, even if a later message matches an earlier step's
//! keywords (spec §4.4 "monotonic").

/// One step in the canonical post-install sequence.
#[derive(Debug, Clone, Copy)]
pub struct PostInstallStep {
    pub id: &'static str,
    pub label: &'static str,
    keywords: &'static [&'static str],
}

/// The 13 canonical post-install steps, in order (spec §4.4).
pub const STEPS: &[PostInstallStep] = &[
    PostInstallStep {
        id: "prepare",
        label: "Preparing Steam integration",
        keywords: &[
            "starting automated steam setup",
            "starting configuration phase",
            "starting configuration",
        ],
    },
    PostInstallStep {
        id: "steam_shortcut",
        label: "Creating Steam shortcut",
        keywords: &["creating steam shortcut", "steam shortcut created successfully"],
    },
    PostInstallStep {
        id: "steam_restart",
        label: "Restarting Steam",
        keywords: &["restarting steam", "steam restarted successfully"],
    },
    PostInstallStep {
        id: "proton_prefix",
        label: "Creating Proton prefix",
        keywords: &[
            "creating proton prefix",
            "proton prefix created successfully",
            "temporary batch file launched",
            "verifying prefix creation",
        ],
    },
    PostInstallStep {
        id: "steam_verify",
        label: "Verifying Steam setup",
        keywords: &[
            "verifying setup",
            "verifying prefix",
            "setup verification completed",
            "detecting actual appid",
            "steam configuration complete",
        ],
    },
    PostInstallStep {
        id: "steam_complete",
        label: "Steam integration complete",
        keywords: &[
            "steam integration complete",
            "steam integration",
            "steam configuration complete!",
        ],
    },
    PostInstallStep {
        id: "wine_components",
        label: "Installing Wine components",
        keywords: &[
            "installing wine components",
            "wine components",
            "vcrun",
            "dotnet",
            "running winetricks",
        ],
    },
    PostInstallStep {
        id: "registry_files",
        label: "Applying registry files",
        keywords: &[
            "applying registry",
            "importing registry",
            ".reg file",
            "registry files",
        ],
    },
    PostInstallStep {
        id: "dotnet_fixes",
        label: "Installing .NET fixes",
        keywords: &["dotnet fix", ".net fix", "installing .net"],
    },
    PostInstallStep {
        id: "enable_dotfiles",
        label: "Enabling dotfiles",
        keywords: &["enabling dotfiles", "dotfiles", "hidden files"],
    },
    PostInstallStep {
        id: "set_permissions",
        label: "Setting permissions",
        keywords: &["setting permissions", "chmod", "permissions"],
    },
    PostInstallStep {
        id: "backup_config",
        label: "Backing up configuration",
        keywords: &["backing up", "modorganizer.ini", "backup"],
    },
    PostInstallStep {
        id: "config_finalize",
        label: "Finalising Jackify configuration",
        keywords: &[
            "configuration completed successfully",
            "configuration complete",
            "manual steps validation failed",
            "configuration failed",
        ],
    },
];

/// Snapshot the caller reads after `begin`/`observe`/`end` (spec §6).
#[derive(Debug, Clone, PartialEq)]
pub struct PostInstallState {
    pub active: bool,
    pub current_step: usize,
    pub total_steps: usize,
    pub label: String,
}

/// Drives the post-install banner independently of [`StateAggregator`]
/// (spec §4.4). The engine's stdout has already ended by the time this
/// runs; messages come from Jackify's own post-install subprocess calls.
pub struct PostInstallStepMachine {
    active: bool,
    current_step: usize,
    label: String,
}

impl Default for PostInstallStepMachine {
    fn default() -> Self {
        Self {
            active: false,
            current_step: 0,
            label: String::new(),
        }
    }
}

impl PostInstallStepMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter post-install mode at step 0 (spec §4.4 "begin").
    pub fn begin(&mut self) {
        self.active = true;
        self.current_step = 0;
        self.label = STEPS[0].label.to_string();
    }

    /// Match `message` against the keyword table and advance
    /// `current_step` if a later-or-equal step matches (spec §4.4
    /// "observe"). Returns whether the visible state changed.
    pub fn observe(&mut self, message: &str) -> bool {
        if !self.active || message.is_empty() {
            return false;
        }
        let text = message.to_ascii_lowercase();

        for (idx, step) in STEPS.iter().enumerate() {
            if step.keywords.iter().any(|kw| text.contains(kw)) {
                let step_number = idx + 1;
                if step_number >= self.current_step {
                    self.current_step = step_number;
                    self.label = step.label.to_string();
                    return true;
                }
                return false;
            }
        }
        false
    }

    /// Close out post-install: success jumps to the final step, failure
    /// holds at whatever step was last reached (spec §4.4 "end").
    pub fn end(&mut self, success: bool) {
        if !self.active {
            return;
        }
        if success {
            self.current_step = STEPS.len();
            self.label = STEPS.last().unwrap().label.to_string();
        }
        self.active = false;
    }

    pub fn state(&self) -> PostInstallState {
        PostInstallState {
            active: self.active,
            current_step: self.current_step,
            total_steps: STEPS.len(),
            label: self.label.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_starts_at_step_zero_with_first_label() {
        let mut machine = PostInstallStepMachine::new();
        machine.begin();
        let state = machine.state();
        assert!(state.active);
        assert_eq!(state.current_step, 0);
        assert_eq!(state.label, "Preparing Steam integration");
    }

    #[test]
    fn observe_advances_on_keyword_match() {
        let mut machine = PostInstallStepMachine::new();
        machine.begin();
        assert!(machine.observe("Creating Steam shortcut now"));
        let state = machine.state();
        assert_eq!(state.current_step, 2);
        assert_eq!(state.label, "Creating Steam shortcut");
    }

    #[test]
    fn observe_never_rewinds_to_an_earlier_step() {
        let mut machine = PostInstallStepMachine::new();
        machine.begin();
        machine.observe("Restarting Steam");
        assert_eq!(machine.state().current_step, 3);
        let changed = machine.observe("starting configuration phase");
        assert!(!changed);
        assert_eq!(machine.state().current_step, 3);
    }

    #[test]
    fn observe_is_a_no_op_before_begin() {
        let mut machine = PostInstallStepMachine::new();
        assert!(!machine.observe("Creating Steam shortcut"));
        assert!(!machine.state().active);
    }

    #[test]
    fn end_success_jumps_to_final_step() {
        let mut machine = PostInstallStepMachine::new();
        machine.begin();
        machine.observe("Restarting Steam");
        machine.end(true);
        let state = machine.state();
        assert!(!state.active);
        assert_eq!(state.current_step, STEPS.len());
        assert_eq!(state.label, "Finalising Jackify configuration");
    }

    #[test]
    fn end_failure_holds_at_last_reached_step() {
        let mut machine = PostInstallStepMachine::new();
        machine.begin();
        machine.observe("Restarting Steam");
        machine.end(false);
        let state = machine.state();
        assert!(!state.active);
        assert_eq!(state.current_step, 3);
    }
}
