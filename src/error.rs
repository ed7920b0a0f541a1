use std::io;

/// Failures raised by the synthesis core, the composition layer and its
/// external collaborators.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid parameter `{name}` = {value}: expected {expected}")]
    InvalidParameter {
        name: &'static str,
        value: String,
        expected: String,
    },

    #[error("Invalid cutoff frequency: {cutoff_hz} Hz. Must be between 0 and Nyquist ({nyquist_hz} Hz)")]
    InvalidCutoff { cutoff_hz: f32, nyquist_hz: f32 },

    #[error("Frequency {frequency_hz} Hz out of range ({min_hz}-{max_hz} Hz)")]
    FrequencyOutOfRange {
        frequency_hz: f32,
        min_hz: f32,
        max_hz: f32,
    },

    #[error("Invalid offset {offset_ms} ms: offsets must be non-negative")]
    InvalidOffset { offset_ms: f64 },

    #[error("Invalid range: start {start_ms} ms is after end {end_ms} ms")]
    InvalidRange { start_ms: f64, end_ms: f64 },

    #[error("Cannot combine buffers: {left_rate} Hz/{left_channels}ch with {right_rate} Hz/{right_channels}ch")]
    ChannelOrRateMismatch {
        left_rate: u32,
        left_channels: u16,
        right_rate: u32,
        right_channels: u16,
    },

    #[error("Filter design failed: {0}")]
    FilterDesignFailure(String),

    #[error("External tool `{0}` is not available")]
    ExternalToolUnavailable(String),

    #[error("External tool `{tool}` timed out after {seconds} s")]
    ExternalToolTimeout { tool: String, seconds: u64 },

    #[error("External tool `{tool}` produced no audio: {detail}")]
    ExternalToolFailed { tool: String, detail: String },

    #[error("Unknown preset: {0}")]
    UnknownPreset(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("Failed to parse preset: {0}")]
    Preset(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn invalid(name: &'static str, value: impl ToString, expected: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name,
            value: value.to_string(),
            expected: expected.into(),
        }
    }

    /// Collaborator failures the caller may replace with a synthesized stand-in.
    /// Contract violations of the DSP core are never recoverable.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::ExternalToolUnavailable(_) | Error::ExternalToolTimeout { .. } | Error::ExternalToolFailed { .. }
        )
    }
}
