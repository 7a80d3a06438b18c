use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Config source error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Device gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Device gateway error: {0}")]
    Gateway(String),

    #[error("Unknown device: {0}")]
    UnknownDevice(String),
}

pub type Result<T> = std::result::Result<T, MonitorError>;
