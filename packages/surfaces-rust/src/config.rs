//! Configuration types for the form surfaces.

use std::time::Duration;

/// Behaviour of the public submission surface.
#[derive(Debug, Clone)]
pub struct SubmissionConfig {
    /// Maximum time to wait for the answer sink to acknowledge a submission.
    pub submit_timeout: Duration,
    /// Whether the form can be submitted again after a successful submission.
    pub allow_resubmit: bool,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            submit_timeout: Duration::from_secs(30),
            allow_resubmit: false,
        }
    }
}

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Logging setup used by [`init_tracing`](crate::logging::init_tracing).
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub format: LogFormat,
    /// Filter directive used when `RUST_LOG` is unset.
    pub default_directive: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            default_directive: "info".to_string(),
        }
    }
}
