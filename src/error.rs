use thiserror::Error;

/// Main error type for the simulation
#[derive(Error, Debug)]
pub enum GymError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Market data errors
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid normalization parameters: {0}")]
    InvalidNorms(String),

    // Action errors
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    // Accounting errors
    #[error("Ledger error: {0}")]
    Ledger(String),

    // State machine errors
    #[error("Environment has not been reset; call reset() before step()")]
    NotReset,

    #[error("Episode finished at step {step}; call reset() to start a new episode")]
    EpisodeDone { step: usize },
}

/// Result type alias for GymError
pub type Result<T> = std::result::Result<T, GymError>;
