//! Upload rejection reasons. Display strings are the user-visible messages.

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("File too large ({:.1}MB). Max is 10MB.", mib(.size))]
    TooLarge { size: usize },
    #[error("Only .json files are allowed.")]
    WrongExtension,
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("JSON must be an array of action objects.")]
    NotAnArray,
    #[error("Invalid format: objects must have a \"codeid\" field.")]
    MissingCodeId,
}

/// A single object that cannot become a row.
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("record {index} has no integer codeid")]
    MissingKey { index: usize },
}

fn mib(size: &usize) -> f64 {
    *size as f64 / 1024.0 / 1024.0
}
