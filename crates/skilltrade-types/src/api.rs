use serde::{Deserialize, Serialize};

use crate::models::{MatchId, SkillId, SkillKind, UserId};
use crate::status::MatchStatus;

// -- Auth --

/// Form body of `POST /login`. The `username` field carries the email.
#[derive(Debug, Serialize)]
pub struct LoginForm<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SignupRequest<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

// -- Profile --

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.photo.is_none() && self.location.is_none() && self.bio.is_none()
    }
}

// -- Skills --

#[derive(Debug, Serialize)]
pub struct GetOrCreateSkillRequest<'a> {
    pub skill_name: &'a str,
}

#[derive(Debug, Serialize)]
pub struct AddUserSkillRequest {
    pub skill_id: SkillId,
    #[serde(rename = "type")]
    pub kind: SkillKind,
}

// -- Matches --

/// Body of `POST /matches/{id}/start-trade`: the status after the toggle.
#[derive(Debug, Clone, Deserialize)]
pub struct StartTradeResponse {
    pub match_status: MatchStatus,
    #[serde(default)]
    pub initiator_id: Option<UserId>,
}

// -- Trades --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeTask {
    Teaching,
    Learning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    User1,
    User2,
}

impl Position {
    pub fn other(self) -> Self {
        match self {
            Self::User1 => Self::User2,
            Self::User2 => Self::User1,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TradeUpdateRequest {
    #[serde(rename = "type")]
    pub task: TradeTask,
    pub user_position: Position,
    pub completed: bool,
}

#[derive(Debug, Serialize)]
pub struct RateRequest {
    pub score: u8,
}

#[derive(Debug, Serialize)]
pub struct ReportIssueRequest<'a> {
    pub match_id: MatchId,
    pub reported_user_id: UserId,
    pub message: &'a str,
}

// -- Messages --

#[derive(Debug, Serialize)]
pub struct SendMessageRequest<'a> {
    pub message: &'a str,
}

// -- Errors --

/// Error body the API attaches to 4xx responses.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub detail: serde_json::Value,
}

impl ErrorBody {
    /// `detail` is usually a string; validation failures carry a list of
    /// objects with a `msg` field.
    pub fn message(&self) -> String {
        match &self.detail {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.get("msg")
                        .and_then(|m| m.as_str())
                        .map(str::to_string)
                        .unwrap_or_else(|| item.to_string())
                })
                .collect::<Vec<_>>()
                .join("; "),
            other => other.to_string(),
        }
    }
}
