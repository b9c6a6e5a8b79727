use thiserror::Error;

/// Errors surfaced to callers of the aggregation engine.
///
/// Malformed field values are not represented here: the record parser
/// substitutes an empty topic list or an absent year and moves on.
#[derive(Debug, Error)]
pub enum InsightError {
    #[error("no records supplied for author timeline")]
    EmptyAuthorData,

    #[error("author not found: {0}")]
    UnknownAuthor(String),

    #[error("invalid timeline mode '{0}' (expected 'full' or 'top5')")]
    InvalidMode(String),

    #[error("input has {rows} rows, exceeding the limit of {limit}")]
    InputTooLarge { rows: usize, limit: usize },

    #[error("unsupported input format: {0}")]
    UnsupportedFormat(String),

    #[error("missing column: {0}")]
    MissingColumn(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, InsightError>;
