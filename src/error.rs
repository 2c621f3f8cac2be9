use thiserror::Error;

/// Main error type for the clip compositor library
#[derive(Error, Debug)]
pub enum CompositorError {
    #[error("Video processing error: {0}")]
    Video(#[from] VideoError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Preset error: {0}")]
    Preset(#[from] PresetError),

    #[error("Text overlay error: {0}")]
    Overlay(#[from] OverlayError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

/// Clip decoding and capture encoding errors
#[derive(Error, Debug)]
pub enum VideoError {
    #[error("Failed to load video file: {path}")]
    LoadFailed { path: String },

    #[error("Unsupported video format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Video decoding failed: {reason}")]
    DecodingFailed { reason: String },

    #[error("Video encoding failed: {reason}")]
    EncodingFailed { reason: String },

    #[error("Frame processing failed: {reason}")]
    FrameProcessingFailed { reason: String },

    #[error("Invalid video parameters: {details}")]
    InvalidParameters { details: String },
}

/// Export run errors
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("No clips queued for export")]
    MissingInput,

    #[error("Clip {index} ({path}) failed: {reason}")]
    ClipFailed {
        index: usize,
        path: String,
        reason: String,
    },

    #[error("Export cancelled")]
    Cancelled,

    #[error("Capture session is already recording")]
    AlreadyRecording,

    #[error("Capture session is not recording")]
    NotRecording,
}

/// Preset-specific errors
#[derive(Error, Debug)]
pub enum PresetError {
    #[error("Preset not found: {name}")]
    NotFound { name: String },

    #[error("Effect application failed: {preset} - {reason}")]
    EffectFailed { preset: String, reason: String },
}

/// Text overlay errors
#[derive(Error, Debug)]
pub enum OverlayError {
    #[error("Failed to load font {path}: {reason}")]
    FontLoadFailed { path: String, reason: String },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Convenience type alias for Results using CompositorError
pub type Result<T> = std::result::Result<T, CompositorError>;

impl CompositorError {
    /// Create a generic error with a custom message
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }

    /// Whether the error came from a missing or empty input set
    pub fn is_missing_input(&self) -> bool {
        matches!(self, Self::Export(ExportError::MissingInput))
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Export(ExportError::MissingInput) => {
                "Please upload at least one video first!".to_string()
            }
            Self::Export(ExportError::ClipFailed { path, reason, .. }) => {
                format!("Could not play '{}': {}. The export was stopped and the recorded part kept.", path, reason)
            }
            Self::Video(VideoError::LoadFailed { path }) => {
                format!("Could not load video file '{}'. Please check the file exists and is a supported format.", path)
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            _ => self.to_string(),
        }
    }
}
