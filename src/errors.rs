use thiserror::Error;

/// Errors surfaced by the progress telemetry subsystem's I/O and
/// configuration layers.
///
/// No parsing or aggregation failure is fatal (spec §7): a malformed
/// engine line becomes a no-op, never an `Err`. This type exists for the
/// boundary concerns around that pure core — reading the engine's stdout
/// and loading tunables — not for the classifier or aggregator themselves.
#[derive(Error, Debug)]
pub enum ProgressError {
    #[error("failed to read engine output: {0}")]
    EngineIo(#[from] std::io::Error),

    #[error("failed to load config from {path}: {source}")]
    ConfigLoad {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[allow(dead_code)]
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, ProgressError>;
