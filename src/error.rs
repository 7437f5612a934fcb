use thiserror::Error;

/// Lifecycle errors that propagate to the orchestrator's caller.
///
/// Everything else in the engine (degenerate geometry, asset load
/// failures, pool exhaustion, malformed manifests, out-of-range config)
/// is absorbed locally and logged via [`bevy::log`] — see spec.md §7.
/// Only audio-context construction is fatal; `NeedsUserGesture` is
/// recoverable and expected to be retried by the host after a user
/// gesture resumes the audio context.
#[derive(Debug, Error)]
pub enum RainydeskError {
    #[error("audio context failed to construct: {0}")]
    AudioContextInit(String),

    #[error("audio context is suspended and needs a user gesture to resume")]
    NeedsUserGesture,

    #[error("failed to read or parse .rain document at {path}: {source}")]
    RainDocument {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("io error touching {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Logs a recoverable condition once, at `warn` level, with a stable tag
/// so hosts can grep their logs for a given degraded-feature class.
pub fn log_degraded(tag: &str, detail: impl std::fmt::Display) {
    bevy::log::warn!(target: "rainydesk", "{tag}: {detail}");
}
