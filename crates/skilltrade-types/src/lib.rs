pub mod api;
pub mod events;
pub mod models;
pub mod status;

pub use models::{ChatMessage, Match, Skill, TradeStatus, UserProfile, UserSkills};
pub use status::{MatchStatus, TradeState};
