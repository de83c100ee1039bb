use serde::{Deserialize, Serialize};

use crate::models::{ChatMessage, Match, MatchId, SkillKind, TradeStatus};

/// Events the session layer publishes to whatever renders it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum SessionEvent {
    /// Profile, skills and catalog were loaded
    Ready { user_id: i64, username: String },

    /// The API rejected the stored credential; it has been cleared
    Unauthenticated,

    /// A skill list changed (optimistically or after reconciliation)
    SkillsChanged {
        has_skills: bool,
        has_required_skills: bool,
    },

    /// An optimistic skill mutation was undone
    SkillReverted { kind: SkillKind, message: String },

    /// A fresh match list replaced the cache
    MatchesUpdated { matches: Vec<Match> },

    /// A polled trade status snapshot arrived
    TradeStatusUpdated { match_id: MatchId, status: TradeStatus },

    /// A polled message list arrived
    MessagesUpdated { match_id: MatchId, messages: Vec<ChatMessage> },

    /// A failure the user should see
    Error { message: String },
}
