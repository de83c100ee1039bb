use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::status::{MatchStatus, TradeState};

pub type UserId = i64;
pub type SkillId = i64;
pub type MatchId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub trade_token: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Skill {
    pub skill_id: SkillId,
    pub skill_name: String,
}

/// Which of the user's two skill lists an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillKind {
    Teach,
    Learn,
}

impl SkillKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Teach => "teach",
            Self::Learn => "learn",
        }
    }
}

impl std::str::FromStr for SkillKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "teach" | "teaching" => Ok(Self::Teach),
            "learn" | "learning" => Ok(Self::Learn),
            other => Err(format!("unknown skill type '{}'", other)),
        }
    }
}

/// The user's own skill lists as returned by `GET /users/me/skills/`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSkills {
    #[serde(default, deserialize_with = "nullable_vec")]
    pub teaching: Vec<Skill>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub learning: Vec<Skill>,
}

impl UserSkills {
    pub fn list(&self, kind: SkillKind) -> &Vec<Skill> {
        match kind {
            SkillKind::Teach => &self.teaching,
            SkillKind::Learn => &self.learning,
        }
    }

    pub fn list_mut(&mut self, kind: SkillKind) -> &mut Vec<Skill> {
        match kind {
            SkillKind::Teach => &mut self.teaching,
            SkillKind::Learn => &mut self.learning,
        }
    }
}

/// A candidate partner as produced by the matching endpoint. The user
/// fields describe the counterpart, not the logged-in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub match_id: MatchId,
    pub user_id: UserId,
    pub username: String,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub teaching: Vec<String>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub learning: Vec<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    pub match_status: MatchStatus,
    #[serde(default)]
    pub initiator_id: Option<UserId>,
}

/// Per-match trade progress. `userN_teaching_done` is set by the teacher at
/// position N; `userN_learning_done` is set by the learner of position N's
/// skill once that teaching has been received.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeStatus {
    #[serde(default)]
    pub user1_skill: String,
    #[serde(default)]
    pub user2_skill: String,
    #[serde(default)]
    pub user1_teaching_done: bool,
    #[serde(default)]
    pub user1_learning_done: bool,
    #[serde(default)]
    pub user2_teaching_done: bool,
    #[serde(default)]
    pub user2_learning_done: bool,
    #[serde(default)]
    pub status: TradeState,
    #[serde(default)]
    pub user1_id: Option<UserId>,
    #[serde(default)]
    pub user2_id: Option<UserId>,
}

impl TradeStatus {
    pub fn all_complete(&self) -> bool {
        self.user1_teaching_done
            && self.user1_learning_done
            && self.user2_teaching_done
            && self.user2_learning_done
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub chat_id: i64,
    pub sender_id: UserId,
    pub message: String,
    #[serde(deserialize_with = "timestamp")]
    pub timestamp: DateTime<Utc>,
}

fn nullable_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// The API emits naive ISO timestamps without an offset. They are UTC.
fn timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|ndt| ndt.and_utc()))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f").map(|ndt| ndt.and_utc()))
        .map_err(|e| format!("invalid timestamp '{}': {}", raw, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_skill_lists_are_empty() {
        let skills: UserSkills = serde_json::from_str(r#"{"teaching": null}"#).unwrap();
        assert!(skills.teaching.is_empty());
        assert!(skills.learning.is_empty());
    }

    #[test]
    fn naive_timestamps_are_utc() {
        let msg: ChatMessage = serde_json::from_str(
            r#"{"chat_id": 1, "sender_id": 7, "message": "hi", "timestamp": "2024-05-01T10:15:30.250000"}"#,
        )
        .unwrap();
        assert_eq!(msg.timestamp.to_rfc3339(), "2024-05-01T10:15:30.250+00:00");

        assert!(parse_timestamp("2024-05-01T10:15:30Z").is_ok());
        assert!(parse_timestamp("2024-05-01 10:15:30").is_ok());
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn lowercase_trade_status_is_normalized() {
        let status: TradeStatus = serde_json::from_str(
            r#"{"user1_skill": "Spanish", "user2_skill": "Python", "status": "completed", "user1_id": 2, "user2_id": 1}"#,
        )
        .unwrap();
        assert_eq!(status.status, TradeState::Completed);
        assert!(status.status.is_terminal());

        let missing: TradeStatus = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.status, TradeState::Pending);
    }

    #[test]
    fn trade_completion_needs_all_four_flags() {
        let mut status = TradeStatus {
            user1_teaching_done: true,
            user1_learning_done: true,
            user2_teaching_done: true,
            ..Default::default()
        };
        assert!(!status.all_complete());
        status.user2_learning_done = true;
        assert!(status.all_complete());
    }
}
