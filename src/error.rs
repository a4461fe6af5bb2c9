use thiserror::Error;

/// Structural failures that stop an extraction before any row is read.
///
/// Per-row and per-cell problems never surface here; they are folded into
/// [`crate::pipeline::ExtractionSummary`] instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("Sheet '{name}' not found (available: {})", available.join(", "))]
    MissingSheet { name: String, available: Vec<String> },

    #[error("Source has no header row")]
    MissingHeader,

    #[error("Invalid year range {min}..={max}: minimum exceeds maximum")]
    InvalidYearRange { min: i32, max: i32 },

    #[error("Invalid table name '{0}': expected an identifier such as `public.sbti_pathways`")]
    InvalidTableName(String),
}
