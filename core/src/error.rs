use thiserror::Error;

/// Result type for bidsort operations
pub type Result<T> = std::result::Result<T, BidsortError>;

/// Error types for bidsort operations
///
/// Classification outcomes (unsupported modality, ambiguous metadata, aborted
/// runs, corrupt pixel data) are not errors; they are recorded on the series or
/// record as an [`ExclusionReason`](crate::types::ExclusionReason).
#[derive(Error, Debug)]
pub enum BidsortError {
    /// No usable patient identifier in the sidecar
    #[error("No PatientName, PatientID or PatientBirthDate in {path}")]
    MissingIdentity { path: String },

    /// Sidecar without a matching image volume
    #[error("No .nii.gz volume found for sidecar {path}")]
    MissingVolume { path: String },

    /// Image header could not be parsed
    #[error("Invalid volume header in {path}: {reason}")]
    InvalidVolume { path: String, reason: String },

    /// b-value file could not be parsed
    #[error("Invalid gradient file {path}: {reason}")]
    InvalidGradients { path: String, reason: String },

    /// Generic analysis error
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// Malformed sidecar JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BidsortError {
    /// Returns true for per-acquisition problems the pipeline skips over
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BidsortError::MissingIdentity { .. } | BidsortError::MissingVolume { .. }
        )
    }
}

// Helper conversions
impl From<String> for BidsortError {
    fn from(s: String) -> Self {
        BidsortError::Analysis(s)
    }
}

impl From<&str> for BidsortError {
    fn from(s: &str) -> Self {
        BidsortError::Analysis(s.to_string())
    }
}
