//! Demo CLI: feeds a file of engine-style progress lines through the
//! classifier, aggregator and render model, printing one banner line per
//! state change.

use anyhow::Context;
use clap::Parser;
use std::io::{self, Read};
use std::path::PathBuf;

use jackify_progress::aggregator::StateAggregator;
use jackify_progress::config::Config;
use jackify_progress::line_decoder::LineDecoder;
use jackify_progress::logging;
use jackify_progress::post_install::PostInstallStepMachine;
use jackify_progress::render_model::RenderModel;

/// Replay a jackify-engine output log and print the resulting progress banner.
#[derive(Parser, Debug)]
#[command(name = "jackify-progress-demo", version, about)]
struct Cli {
    /// Path to a file of engine output lines. Reads stdin when omitted.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Path to a TOML file overriding the default timing tunables.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also replay the bundled post-install step sequence after the log ends.
    #[arg(long)]
    with_post_install: bool,
}

fn main() -> anyhow::Result<()> {
    logging::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path).with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::default(),
    };

    let mut aggregator = StateAggregator::new(config.clone());
    let mut render_model = RenderModel::new(config);

    let mut raw = String::new();
    match &cli.input {
        Some(path) => {
            std::fs::File::open(path)
                .and_then(|mut f| f.read_to_string(&mut raw))
                .with_context(|| format!("reading input file {}", path.display()))?;
        }
        None => {
            io::stdin()
                .read_to_string(&mut raw)
                .context("reading stdin")?;
        }
    }

    let mut decoder = LineDecoder::new();
    let mut lines = decoder.feed(&raw);
    if let Some(trailing) = decoder.flush() {
        lines.push(trailing);
    }

    for line in &lines {
        if aggregator.process_line(line) {
            let state = aggregator.get_state();
            let label = render_model.overall_label(state);
            let percent = render_model.overall_percent(state);
            log::info!("{label} ({percent}%)");
        }
    }

    if cli.with_post_install {
        let mut post_install = PostInstallStepMachine::new();
        post_install.begin();
        for message in [
            "Starting automated Steam setup",
            "Creating Steam shortcut",
            "Steam shortcut created successfully",
            "Restarting Steam",
            "Verifying prefix creation",
            "Steam integration complete",
            "Configuration completed successfully",
        ] {
            post_install.observe(message);
            let state = post_install.state();
            log::info!("[{}/{}] {}", state.current_step, state.total_steps, state.label);
        }
        post_install.end(true);
    }

    Ok(())
}
