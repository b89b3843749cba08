//! Error handling for EchoClip
//!
//! Every error carries a stable code and recovery suggestions so the
//! application root can turn it into a user-visible message.

use thiserror::Error;

/// Result type alias for EchoClip operations
pub type Result<T> = std::result::Result<T, EchoClipError>;

/// Main error type for EchoClip operations
#[derive(Error, Debug)]
pub enum EchoClipError {
    // Intake Errors
    #[error("Could not decode audio: {reason}")]
    Decode {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // Processing Errors
    #[error("Render failed: {reason}")]
    Render { reason: String },

    #[error("Encoding {format} failed: {reason}")]
    Encode { format: &'static str, reason: String },

    #[error("Invalid parameter '{param}': {value} (expected {expected})")]
    InvalidParameter {
        param: String,
        value: String,
        expected: String,
    },

    // Capture Errors
    #[error("Capture failed: {reason}")]
    Capture { reason: String },

    #[error("Microphone permission denied")]
    PermissionDenied,

    // Session Errors
    #[error("No audio loaded")]
    NotLoaded,

    #[error("History item not found: {id}")]
    HistoryItemNotFound { id: u64 },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EchoClipError {
    /// Build a decode error from any underlying decoder error
    pub fn decode<E>(reason: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        EchoClipError::Decode {
            reason: reason.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            EchoClipError::Decode { .. } => "DECODE_ERROR",
            EchoClipError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            EchoClipError::FileNotFound { .. } => "FILE_NOT_FOUND",
            EchoClipError::Render { .. } => "RENDER_ERROR",
            EchoClipError::Encode { .. } => "ENCODE_ERROR",
            EchoClipError::InvalidParameter { .. } => "INVALID_PARAMETER",
            EchoClipError::Capture { .. } => "CAPTURE_ERROR",
            EchoClipError::PermissionDenied => "PERMISSION_DENIED",
            EchoClipError::NotLoaded => "NOT_LOADED",
            EchoClipError::HistoryItemNotFound { .. } => "HISTORY_ITEM_NOT_FOUND",
            EchoClipError::Io(_) => "IO_ERROR",
            EchoClipError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// True for intake failures (reset to "no buffer loaded")
    pub fn is_decode_failure(&self) -> bool {
        matches!(
            self,
            EchoClipError::Decode { .. }
                | EchoClipError::UnsupportedFormat { .. }
                | EchoClipError::FileNotFound { .. }
        )
    }

    /// True for failures that happen while rendering or encoding an export
    pub fn is_render_failure(&self) -> bool {
        matches!(
            self,
            EchoClipError::Render { .. } | EchoClipError::Encode { .. }
        )
    }

    /// Check if this error is recoverable
    ///
    /// Nothing in the core is fatal to the process; the distinction is
    /// whether retrying the same operation can succeed without user action.
    pub fn is_recoverable(&self) -> bool {
        match self {
            EchoClipError::Render { .. } => true,
            EchoClipError::Capture { .. } => true,
            EchoClipError::NotLoaded => true,
            EchoClipError::Io(_) => true,
            _ => false,
        }
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            EchoClipError::Decode { .. } | EchoClipError::UnsupportedFormat { .. } => vec![
                "Try converting the file to WAV or MP3 first",
                "Check if the file plays in another application",
                "Only mono and stereo clips are supported",
            ],
            EchoClipError::FileNotFound { .. } => vec![
                "Check the file path is correct",
                "Verify the file hasn't been moved or deleted",
            ],
            EchoClipError::Render { .. } | EchoClipError::Encode { .. } => vec![
                "Try the export again",
                "Try a shorter clip",
                "Your current clip and history were left unchanged",
            ],
            EchoClipError::Capture { .. } => vec![
                "Check that a microphone is connected",
                "Close other applications using the microphone",
            ],
            EchoClipError::PermissionDenied => vec![
                "Allow microphone access and try recording again",
            ],
            EchoClipError::NotLoaded => vec!["Load or record a clip first"],
            _ => vec![],
        }
    }

    /// Get a user-friendly message for this error
    pub fn friendly_message(&self) -> String {
        match self {
            EchoClipError::Decode { .. } | EchoClipError::UnsupportedFormat { .. } => {
                "This audio format is not supported. Please try a WAV or MP3 file.".to_string()
            }
            EchoClipError::Render { .. } | EchoClipError::Encode { .. } => {
                "Processing failed. Your clip and export history were not changed.".to_string()
            }
            EchoClipError::Capture { .. } => {
                "Recording could not start. Is a microphone connected?".to_string()
            }
            EchoClipError::PermissionDenied => {
                "Microphone access was denied. Allow access to record a clip.".to_string()
            }
            EchoClipError::NotLoaded => "Load or record a clip first.".to_string(),
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = EchoClipError::UnsupportedFormat {
            format: "6-channel audio".to_string(),
        };
        assert_eq!(err.error_code(), "UNSUPPORTED_FORMAT");
        assert!(err.is_decode_failure());
        assert!(!err.is_render_failure());
    }

    #[test]
    fn test_encode_is_render_scope() {
        let err = EchoClipError::Encode {
            format: "mp3",
            reason: "encoder rejected parameters".to_string(),
        };
        assert!(err.is_render_failure());
        assert!(!err.recovery_suggestions().is_empty());
        assert!(err.friendly_message().contains("not changed"));
    }

    #[test]
    fn test_decode_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::InvalidData, "bad header");
        let err = EchoClipError::decode("not a RIFF file", io);
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.friendly_message().contains("not supported"));
    }
}
