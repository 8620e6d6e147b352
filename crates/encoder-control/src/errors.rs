//! Encoder control error types.
//!
//! Three groups of failures:
//! - validation: the stream description cannot be realized on the device
//!   (slot overflow, bad output URL, unsupported protocol)
//! - transport: the device rejected a command or kept answering 503
//! - aggregate: a stream inside a batch failed; wraps the cause with the
//!   channel that was being configured

use crate::types::ChannelId;
use thiserror::Error;

/// Encoder control error type.
#[derive(Debug, Error)]
pub enum EncoderError {
    #[error("Only {max} audio encodings are supported (requested slot {requested})")]
    AudioSlotsExhausted { requested: u8, max: u8 },

    #[error("Unsupported protocol: {0}")]
    UnsupportedProtocol(String),

    #[error("Protocol not implemented: {0}")]
    ProtocolNotImplemented(&'static str),

    #[error("Invalid output URL: {0}")]
    InvalidOutputUrl(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Command failed for {path}: {status} {body}")]
    CommandFailed {
        path: String,
        status: u16,
        body: String,
    },

    #[error("Max retries exceeded for GET {path}: {max_retries}")]
    MaxRetriesExceeded { path: String, max_retries: u32 },

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Failed to create stream on channel {channel}: {source}")]
    StreamCreation {
        channel: ChannelId,
        #[source]
        source: Box<EncoderError>,
    },
}

impl EncoderError {
    /// Whether the device asked us to come back later (HTTP 503).
    pub fn is_retryable(&self) -> bool {
        matches!(self, EncoderError::CommandFailed { status: 503, .. })
    }

    /// Wrap a per-stream failure with the channel being configured.
    pub fn stream_creation(channel: ChannelId, source: EncoderError) -> Self {
        EncoderError::StreamCreation {
            channel,
            source: Box::new(source),
        }
    }
}

/// Result type alias using `EncoderError`
pub type Result<T> = std::result::Result<T, EncoderError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_only_503_is_retryable() {
        let busy = EncoderError::CommandFailed {
            path: "video.cgi".to_string(),
            status: 503,
            body: String::new(),
        };
        assert!(busy.is_retryable());

        let forbidden = EncoderError::CommandFailed {
            path: "video.cgi".to_string(),
            status: 403,
            body: "denied".to_string(),
        };
        assert!(!forbidden.is_retryable());
        assert!(!EncoderError::Http("connection refused".to_string()).is_retryable());
    }

    #[test]
    fn test_stream_creation_display_and_source() {
        let channel = ChannelId::new(2).unwrap();
        let err = EncoderError::stream_creation(
            channel,
            EncoderError::UnsupportedProtocol("ftp:".to_string()),
        );

        let msg = err.to_string();
        assert!(msg.starts_with("Failed to create stream"));
        assert!(msg.contains("channel 2"));
        assert!(msg.contains("Unsupported protocol: ftp:"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_max_retries_message_names_path_and_budget() {
        let err = EncoderError::MaxRetriesExceeded {
            path: "stream.cgi?Channel1Protocol1=off".to_string(),
            max_retries: 5,
        };
        assert_eq!(
            err.to_string(),
            "Max retries exceeded for GET stream.cgi?Channel1Protocol1=off: 5"
        );
    }

    #[test]
    fn test_slot_overflow_message() {
        let err = EncoderError::AudioSlotsExhausted {
            requested: 9,
            max: 8,
        };
        assert!(err.to_string().contains("Only 8 audio encodings are supported"));
    }
}
