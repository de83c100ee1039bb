/// Errors from the SkillTrade API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 401: the stored credential was rejected and has been cleared.
    #[error("not authenticated")]
    Unauthorized,

    /// Any other 4xx. `detail` is the server's message, verbatim when present.
    #[error("{detail}")]
    Validation { status: u16, detail: String },

    /// 5xx from the API.
    #[error("SkillTrade API error ({status}): {body}")]
    Server { status: u16, body: String },

    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// A success response whose body did not match the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// Local storage could not be read or written.
    #[error("local storage: {0}")]
    Storage(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// Text suitable for showing to the user. Validation details pass
    /// through unchanged; transport and server failures stay generic.
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthorized => "Your session has expired. Please log in again.".to_string(),
            Self::Validation { detail, .. } => detail.clone(),
            Self::Server { .. } | Self::Request(_) | Self::Decode(_) => {
                "Something went wrong talking to SkillTrade. Please try again.".to_string()
            }
            Self::Storage(e) => format!("Local storage is unavailable: {}", e),
        }
    }
}
