use market_data::MarketDataError;

/// Error types for the signal service
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    #[error("Unsupported asset: {0}")]
    UnsupportedAsset(String),

    #[error("No model loaded for asset: {0}")]
    NoModelLoaded(String),

    #[error("Not enough price history: need {needed} rows, got {got}")]
    InsufficientHistory { needed: usize, got: usize },

    #[error("Feature count mismatch: expected {expected}, got {got}")]
    FeatureMismatch { expected: usize, got: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Artifact error: {0}")]
    Artifact(String),

    #[error(transparent)]
    MarketData(#[from] MarketDataError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for signal operations
pub type Result<T> = std::result::Result<T, SignalError>;
