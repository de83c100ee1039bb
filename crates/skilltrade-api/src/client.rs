use async_trait::async_trait;

use skilltrade_types::api::{ProfileUpdate, StartTradeResponse, TokenResponse, TradeUpdateRequest};
use skilltrade_types::models::{MatchId, SkillId, SkillKind, UserId};
use skilltrade_types::{ChatMessage, Match, Skill, TradeStatus, UserProfile, UserSkills};

use crate::error::ApiResult;

/// Every endpoint the client relies on. Paths are noted per method; all
/// but `login` and `signup` are authenticated.
#[async_trait]
pub trait SkillTradeApi: Send + Sync {
    // -- Auth --

    /// `POST /login` (form-encoded). The caller stores the returned token.
    async fn login(&self, email: &str, password: &str) -> ApiResult<TokenResponse>;

    /// `POST /users/`
    async fn signup(&self, username: &str, email: &str, password: &str) -> ApiResult<UserProfile>;

    // -- Profile --

    /// `GET /users/me`
    async fn current_user(&self) -> ApiResult<UserProfile>;

    /// `PUT /users/me/profile`
    async fn update_profile(&self, update: &ProfileUpdate) -> ApiResult<UserProfile>;

    // -- Skills --

    /// `GET /users/me/skills/`
    async fn my_skills(&self) -> ApiResult<UserSkills>;

    /// `GET /skills/`
    async fn skill_catalog(&self) -> ApiResult<Vec<Skill>>;

    /// `GET /skills/search?query=`
    async fn search_skills(&self, query: &str) -> ApiResult<Vec<Skill>>;

    /// `POST /skills/get-or-create/`. The same name always yields the same id.
    async fn get_or_create_skill(&self, skill_name: &str) -> ApiResult<Skill>;

    /// `POST /users/me/skills/`
    async fn add_user_skill(&self, skill_id: SkillId, kind: SkillKind) -> ApiResult<()>;

    /// `DELETE /users/me/skills/{skill_id}`
    async fn remove_user_skill(&self, skill_id: SkillId) -> ApiResult<()>;

    // -- Matches --

    /// `GET /matches/`
    async fn matches(&self) -> ApiResult<Vec<Match>>;

    /// `DELETE /matches/{id}`
    async fn delete_match(&self, match_id: MatchId) -> ApiResult<()>;

    /// `POST /matches/{id}/start-trade`. Opens, accepts or withdraws a
    /// request; the server decides which from the current status and caller.
    async fn start_trade(&self, match_id: MatchId) -> ApiResult<StartTradeResponse>;

    /// `GET /matches/{id}/trade`
    async fn match_trade(&self, match_id: MatchId) -> ApiResult<TradeStatus>;

    // -- Trades --

    /// `GET /trades/{id}/status`
    async fn trade_status(&self, match_id: MatchId) -> ApiResult<TradeStatus>;

    /// `POST /trades/{id}/update`
    async fn update_trade(&self, match_id: MatchId, update: &TradeUpdateRequest) -> ApiResult<TradeStatus>;

    /// `POST /trades/{id}/rate`
    async fn rate_trade(&self, match_id: MatchId, score: u8) -> ApiResult<()>;

    /// `POST /trades/{id}/complete`
    async fn complete_trade(&self, match_id: MatchId) -> ApiResult<TradeStatus>;

    /// `POST /trades/{id}/report-issue`
    async fn report_issue(&self, match_id: MatchId, reported_user_id: UserId, message: &str) -> ApiResult<()>;

    // -- Messages --

    /// `GET /matches/{id}/messages`
    async fn messages(&self, match_id: MatchId) -> ApiResult<Vec<ChatMessage>>;

    /// `POST /matches/{id}/messages`
    async fn send_message(&self, match_id: MatchId, message: &str) -> ApiResult<()>;
}
