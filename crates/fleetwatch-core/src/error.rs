use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// The configuration sources could not be merged or deserialised.
    #[error("Configuration error: {0}")]
    Config(String),

    /// One or more settings are missing or out of range. Every problem found
    /// is listed so the operator can fix them in a single pass.
    #[error("Invalid configuration: {}", .0.join("; "))]
    Settings(Vec<String>),

    #[error("Unknown timezone: {0}")]
    Timezone(String),
}

impl CoreError {
    /// Short error code string, used as a structured log field.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Config(_) => "CONFIG_ERROR",
            CoreError::Settings(_) => "INVALID_SETTINGS",
            CoreError::Timezone(_) => "UNKNOWN_TIMEZONE",
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
