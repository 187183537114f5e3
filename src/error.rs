use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Startup failed: {0}")]
    Startup(String),

    #[error("{command} command failed: {reason}")]
    Command {
        command: &'static str,
        reason: String,
    },

    #[error("Shutdown incomplete: {0}")]
    Shutdown(String),
}

pub type Result<T> = std::result::Result<T, RelayError>;
