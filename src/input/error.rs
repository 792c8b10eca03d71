use thiserror::Error;

/// Problems with what the user typed into the sweep form. The `Display`
/// text is shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be a number (got \"{input}\")")]
    NotANumber { field: &'static str, input: String },

    #[error("{field} must be greater than 0 Hz")]
    NotPositive { field: &'static str },

    #[error("repeats must be a whole number from 1 to 10 (got \"{input}\")")]
    Repeats { input: String },
}
