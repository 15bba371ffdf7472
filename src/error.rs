//! Error types for the conditional GAN library

use thiserror::Error;

/// Result type alias for this crate
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// Class label outside `[0, class_num)`
    #[error("Invalid label {label}: expected a value in [0, {class_num})")]
    InvalidLabel { label: i64, class_num: usize },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Layer configuration list does not fit the input shape
    #[error("Invalid architecture: {0}")]
    Architecture(String),

    /// Malformed or inconsistent dataset
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image encoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// libtorch error
    #[error("Torch error: {0}")]
    Torch(#[from] tch::TchError),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    /// Check if the error was caused by bad label input
    pub fn is_invalid_label(&self) -> bool {
        matches!(self, Error::InvalidLabel { .. })
    }
}
