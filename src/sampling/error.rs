use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RigError {
    #[error("malformed payload: {reason}")]
    MalformedPayload { reason: String },
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },
    #[error("recording file is truncated mid-record: {path}")]
    CorruptRecording { path: PathBuf },
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV failure: {0}")]
    Csv(#[from] csv::Error),
    #[error("spreadsheet failure: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
    #[error("JSON encode failure: {0}")]
    Encode(#[from] serde_json::Error),
}

impl RigError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        RigError::MalformedPayload {
            reason: reason.into(),
        }
    }

    pub fn invalid_config(reason: impl Into<String>) -> Self {
        RigError::InvalidConfiguration {
            reason: reason.into(),
        }
    }
}
