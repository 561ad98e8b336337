use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Bad inputs: missing files, unknown database/browser names, unusable settings.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The portal page no longer has a control we rely on.
    #[error("UI element not found: {locator}")]
    UiElementNotFound { locator: String },

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Flatfile error: {0}")]
    Flatfile(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
