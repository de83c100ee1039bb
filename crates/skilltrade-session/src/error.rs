use skilltrade_api::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("not signed in")]
    NotAuthenticated,

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Trade(#[from] TradeError),

    #[error("local storage: {0}")]
    Storage(String),
}

pub type SessionResult<T> = Result<T, SessionError>;

impl SessionError {
    pub fn is_unauthorized(&self) -> bool {
        match self {
            Self::NotAuthenticated => true,
            Self::Api(e) => e.is_unauthorized(),
            _ => false,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::Api(e) => e.user_message(),
            Self::NotAuthenticated => "Please log in first.".to_string(),
            other => other.to_string(),
        }
    }
}

/// Client-side trade rules. The server enforces the same ordering.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TradeError {
    #[error("wait for your partner to complete teaching")]
    PartnerNotReady,

    #[error("all teaching and learning steps must be complete first")]
    NotAllComplete,

    #[error("rating must be between 1 and 5, got {0}")]
    InvalidRating(u8),

    #[error("this step is already marked complete")]
    AlreadyDone,

    #[error("match is not in an active trade ({0})")]
    NotInTrade(String),

    #[error("trade status has not been loaded yet")]
    NoStatus,
}
