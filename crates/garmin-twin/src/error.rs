use thiserror::Error;

/// Main error type for garmin-twin
#[derive(Error, Debug)]
pub enum TwinError {
    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("No Garmin session found. Run 'garmin auth login' to create the token files first.")]
    NotAuthenticated,

    #[error("Rate limited. Please wait before retrying.")]
    RateLimited,

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No '{category}' data for {date}")]
    MissingInput { category: String, date: String },

    #[error("Worksheet '{0}' not found in the spreadsheet")]
    TableMissing(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Text generation failed: {0}")]
    Generation(String),

    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, TwinError>;

/// Coarse failure taxonomy used to decide how a stage reacts to an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Staged artifact or sink row not there yet
    MissingInput,
    /// Well-formed document with an unusable shape
    PartialParse,
    /// Expected worksheet absent or unrecoverable
    SinkSchema,
    /// Network, HTTP status or remote service failure
    Transport,
    /// Credentials missing or rejected
    Auth,
    /// Local configuration or secrets
    Config,
    Internal,
}

impl TwinError {
    /// Create an authentication error from a message
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a configuration error from a message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid response error from a message
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Create an invalid parameter error from a message
    pub fn invalid_param(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Create an API error from a status code and response body
    pub fn api(status: impl Into<u16>, message: impl Into<String>) -> Self {
        Self::Api {
            status: status.into(),
            message: message.into(),
        }
    }

    /// Create a missing-input error for a staged category and date
    pub fn missing_input(category: impl Into<String>, date: impl ToString) -> Self {
        Self::MissingInput {
            category: category.into(),
            date: date.to_string(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::MissingInput { .. } => FailureKind::MissingInput,
            Self::InvalidResponse(_) | Self::Json(_) => FailureKind::PartialParse,
            Self::TableMissing(_) | Self::Schema(_) => FailureKind::SinkSchema,
            Self::Http(_)
            | Self::Api { .. }
            | Self::RateLimited
            | Self::Generation(_)
            | Self::Delivery(_) => FailureKind::Transport,
            Self::Authentication(_) | Self::NotAuthenticated => FailureKind::Auth,
            Self::Config(_) | Self::InvalidParameter(_) => FailureKind::Config,
            Self::Io(_) | Self::Other(_) => FailureKind::Internal,
        }
    }

    /// Process exit code for a stage that failed with this error
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            FailureKind::MissingInput => 3,
            FailureKind::SinkSchema => 4,
            FailureKind::Auth => 5,
            FailureKind::Transport => 6,
            FailureKind::Config => 7,
            FailureKind::PartialParse | FailureKind::Internal => 1,
        }
    }
}

/// Render an error for stderr, adding a hint where the operator can act on it
pub fn format_user_error(err: &TwinError) -> String {
    match err {
        TwinError::TableMissing(name) => format!(
            "{}. Create a worksheet named '{}' in the spreadsheet and rerun the load stage.",
            err, name
        ),
        TwinError::MissingInput { .. } => {
            format!("{}. Run the upstream stage first or wait for the next sync.", err)
        }
        TwinError::Http(e) if e.is_timeout() => format!("{} (request timed out)", err),
        _ => err.to_string(),
    }
}
