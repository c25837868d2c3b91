use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid file {path}: {reason}")]
    InvalidFile { path: String, reason: String },

    #[error("grid has {cells} cells, above the configured ceiling of {limit}")]
    GridTooLarge { cells: u64, limit: u64 },

    #[error("template not found: {0}")]
    TemplateNotFound(String),

    #[error("no confident match against template {template_id}: score {score:.3} < threshold {threshold:.3}")]
    NoConfidentMatch {
        template_id: String,
        score: f64,
        threshold: f64,
    },

    #[error("no block with key {0} in the current layout")]
    AnnotationTargetMissing(String),

    #[error("invalid template name: {0:?}")]
    InvalidTemplateName(String),

    #[error("template store is busy, concurrent write did not complete")]
    ConcurrentWriteConflict,

    #[error("template store error: {0}")]
    Storage(rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidFile { .. } => "invalid_file",
            Self::GridTooLarge { .. } => "grid_too_large",
            Self::TemplateNotFound(_) => "template_not_found",
            Self::NoConfidentMatch { .. } => "no_confident_match",
            Self::AnnotationTargetMissing(_) => "annotation_target_missing",
            Self::InvalidTemplateName(_) => "invalid_template_name",
            Self::ConcurrentWriteConflict => "concurrent_write_conflict",
            Self::Storage(_) => "storage",
            Self::Serialization(_) => "serialization",
            Self::Csv(_) => "csv",
            Self::Io(_) => "io",
        }
    }

    pub fn invalid_file(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidFile {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => {
                Self::ConcurrentWriteConflict
            }
            _ => Self::Storage(err),
        }
    }
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
