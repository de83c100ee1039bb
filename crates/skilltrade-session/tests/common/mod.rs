//! In-memory stand-in for the SkillTrade API with call counters and
//! per-endpoint failure switches.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;

use skilltrade_api::{ApiError, ApiResult, SkillTradeApi};
use skilltrade_db::Database;
use skilltrade_session::Session;
use skilltrade_types::api::{Position, ProfileUpdate, StartTradeResponse, TokenResponse, TradeTask, TradeUpdateRequest};
use skilltrade_types::models::{MatchId, SkillId, SkillKind, UserId};
use skilltrade_types::{ChatMessage, Match, MatchStatus, Skill, TradeState, TradeStatus, UserProfile, UserSkills};

pub const ME: UserId = 1;
pub const PARTNER: UserId = 2;
pub const EMAIL: &str = "ada@example.com";
pub const PASSWORD: &str = "hunter22";

#[derive(Debug, Clone)]
pub enum Fail {
    Unauthorized,
    Rejected(&'static str),
    Server,
}

impl Fail {
    fn to_error(&self) -> ApiError {
        match self {
            Self::Unauthorized => ApiError::Unauthorized,
            Self::Rejected(detail) => ApiError::Validation {
                status: 400,
                detail: detail.to_string(),
            },
            Self::Server => ApiError::Server {
                status: 500,
                body: "internal error".to_string(),
            },
        }
    }
}

#[derive(Default)]
pub struct FakeState {
    pub skills: UserSkills,
    pub catalog: Vec<Skill>,
    pub matches: Vec<Match>,
    pub trades: HashMap<MatchId, TradeStatus>,
    pub messages: HashMap<MatchId, Vec<ChatMessage>>,
    pub updates: Vec<(MatchId, TradeTask, Position)>,
    pub ratings: Vec<(MatchId, u8)>,
    pub reports: Vec<(MatchId, UserId, String)>,
    /// Account behind the token; `ME` when unset.
    pub user_id: Option<UserId>,
    /// Endpoint names in call order, for ordering assertions.
    pub log: Vec<&'static str>,
}

#[derive(Default)]
pub struct FakeApi {
    pub state: Mutex<FakeState>,
    calls: Mutex<HashMap<&'static str, usize>>,
    failures: Mutex<HashMap<&'static str, Fail>>,
    delays: Mutex<HashMap<&'static str, Duration>>,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Seeds the catalog; ids are assigned in order starting at 1.
    pub fn with_catalog(names: &[&str]) -> Arc<Self> {
        let api = Self::default();
        {
            let mut state = api.state.lock().unwrap();
            for (i, name) in names.iter().enumerate() {
                state.catalog.push(skill(i as SkillId + 1, name));
            }
        }
        Arc::new(api)
    }

    pub fn calls(&self, endpoint: &str) -> usize {
        self.calls.lock().unwrap().get(endpoint).copied().unwrap_or(0)
    }

    pub fn fail(&self, endpoint: &'static str, fail: Fail) {
        self.failures.lock().unwrap().insert(endpoint, fail);
    }

    pub fn heal(&self, endpoint: &'static str) {
        self.failures.lock().unwrap().remove(endpoint);
    }

    /// Holds responses of `endpoint` for `delay` before answering.
    pub fn delay(&self, endpoint: &'static str, delay: Duration) {
        self.delays.lock().unwrap().insert(endpoint, delay);
    }

    pub fn set_skills(&self, teaching: &[&str], learning: &[&str]) {
        let mut state = self.state.lock().unwrap();
        let mut resolve = |name: &str| catalog_entry(&mut state.catalog, name);
        let teaching: Vec<Skill> = teaching.iter().map(|n| resolve(n)).collect();
        let learning: Vec<Skill> = learning.iter().map(|n| resolve(n)).collect();
        state.skills = UserSkills { teaching, learning };
    }

    pub fn add_match(&self, m: Match) {
        self.state.lock().unwrap().matches.push(m);
    }

    /// Makes `current_user` answer for another account.
    pub fn sign_in_as(&self, user_id: UserId) {
        self.state.lock().unwrap().user_id = Some(user_id);
    }

    pub fn set_trade(&self, match_id: MatchId, status: TradeStatus) {
        self.state.lock().unwrap().trades.insert(match_id, status);
    }

    pub fn trade(&self, match_id: MatchId) -> Option<TradeStatus> {
        self.state.lock().unwrap().trades.get(&match_id).cloned()
    }

    pub fn push_message(&self, match_id: MatchId, chat_id: i64, sender_id: UserId, text: &str) {
        self.state
            .lock()
            .unwrap()
            .messages
            .entry(match_id)
            .or_default()
            .push(message(chat_id, sender_id, text));
    }

    async fn enter(&self, endpoint: &'static str) -> ApiResult<()> {
        *self.calls.lock().unwrap().entry(endpoint).or_default() += 1;
        self.state.lock().unwrap().log.push(endpoint);

        let delay = self.delays.lock().unwrap().get(endpoint).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match self.failures.lock().unwrap().get(endpoint) {
            Some(fail) => Err(fail.to_error()),
            None => Ok(()),
        }
    }
}

pub fn skill(id: SkillId, name: &str) -> Skill {
    Skill {
        skill_id: id,
        skill_name: name.to_string(),
    }
}

fn catalog_entry(catalog: &mut Vec<Skill>, name: &str) -> Skill {
    if let Some(found) = catalog.iter().find(|s| s.skill_name.eq_ignore_ascii_case(name)) {
        return found.clone();
    }
    let created = skill(catalog.len() as SkillId + 1, name);
    catalog.push(created.clone());
    created
}

pub fn message(chat_id: i64, sender_id: UserId, text: &str) -> ChatMessage {
    ChatMessage {
        chat_id,
        sender_id,
        message: text.to_string(),
        timestamp: DateTime::from_timestamp(1_714_550_000 + chat_id, 0).unwrap(),
    }
}

pub fn partner_match(match_id: MatchId, status: MatchStatus, initiator_id: Option<UserId>) -> Match {
    Match {
        match_id,
        user_id: PARTNER,
        username: "grace".to_string(),
        photo: None,
        location: Some("Lisbon".to_string()),
        bio: None,
        teaching: vec!["Spanish".to_string()],
        learning: vec!["Python".to_string()],
        rating: Some(4.8),
        match_status: status,
        initiator_id,
    }
}

fn not_found(what: &str) -> ApiError {
    ApiError::Validation {
        status: 404,
        detail: format!("{} not found", what),
    }
}

/// A session backed by `api` and a fresh in-memory store that already
/// holds a token.
pub fn signed_in(api: Arc<FakeApi>) -> Arc<Session> {
    let storage = Arc::new(Database::open_in_memory().unwrap());
    storage.set_token("tok-1").unwrap();
    Arc::new(Session::new(api, storage))
}

#[async_trait]
impl SkillTradeApi for FakeApi {
    async fn login(&self, email: &str, password: &str) -> ApiResult<TokenResponse> {
        self.enter("login").await?;
        if email == EMAIL && password == PASSWORD {
            Ok(TokenResponse {
                access_token: "tok-1".to_string(),
                token_type: Some("bearer".to_string()),
            })
        } else {
            Err(Fail::Rejected("Incorrect email or password").to_error())
        }
    }

    async fn signup(&self, username: &str, email: &str, _password: &str) -> ApiResult<UserProfile> {
        self.enter("signup").await?;
        Ok(UserProfile {
            user_id: ME,
            username: username.to_string(),
            email: email.to_string(),
            photo: None,
            location: None,
            bio: None,
            rating: None,
            trade_token: Some(0),
        })
    }

    async fn current_user(&self) -> ApiResult<UserProfile> {
        self.enter("current_user").await?;
        let user_id = self.state.lock().unwrap().user_id.unwrap_or(ME);
        Ok(UserProfile {
            user_id,
            username: "ada".to_string(),
            email: EMAIL.to_string(),
            photo: None,
            location: Some("London".to_string()),
            bio: None,
            rating: Some(4.5),
            trade_token: Some(3),
        })
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> ApiResult<UserProfile> {
        self.enter("update_profile").await?;
        let mut profile = self.current_user().await?;
        profile.bio = update.bio.clone().or(profile.bio);
        profile.location = update.location.clone().or(profile.location);
        profile.photo = update.photo.clone().or(profile.photo);
        Ok(profile)
    }

    async fn my_skills(&self) -> ApiResult<UserSkills> {
        self.enter("my_skills").await?;
        Ok(self.state.lock().unwrap().skills.clone())
    }

    async fn skill_catalog(&self) -> ApiResult<Vec<Skill>> {
        self.enter("skill_catalog").await?;
        Ok(self.state.lock().unwrap().catalog.clone())
    }

    async fn search_skills(&self, query: &str) -> ApiResult<Vec<Skill>> {
        self.enter("search_skills").await?;
        let query = query.to_lowercase();
        Ok(self
            .state
            .lock()
            .unwrap()
            .catalog
            .iter()
            .filter(|s| s.skill_name.to_lowercase().contains(&query))
            .cloned()
            .collect())
    }

    async fn get_or_create_skill(&self, skill_name: &str) -> ApiResult<Skill> {
        self.enter("get_or_create_skill").await?;
        Ok(catalog_entry(&mut self.state.lock().unwrap().catalog, skill_name))
    }

    async fn add_user_skill(&self, skill_id: SkillId, kind: SkillKind) -> ApiResult<()> {
        self.enter("add_user_skill").await?;
        let mut state = self.state.lock().unwrap();
        let skill = state
            .catalog
            .iter()
            .find(|s| s.skill_id == skill_id)
            .cloned()
            .ok_or_else(|| not_found("Skill"))?;
        let list = state.skills.list_mut(kind);
        if list.iter().any(|s| s.skill_id == skill_id) {
            return Err(Fail::Rejected("Skill already added").to_error());
        }
        list.push(skill);
        Ok(())
    }

    async fn remove_user_skill(&self, skill_id: SkillId) -> ApiResult<()> {
        self.enter("remove_user_skill").await?;
        let mut state = self.state.lock().unwrap();
        state.skills.teaching.retain(|s| s.skill_id != skill_id);
        state.skills.learning.retain(|s| s.skill_id != skill_id);
        Ok(())
    }

    async fn matches(&self) -> ApiResult<Vec<Match>> {
        self.enter("matches").await?;
        Ok(self.state.lock().unwrap().matches.clone())
    }

    async fn delete_match(&self, match_id: MatchId) -> ApiResult<()> {
        self.enter("delete_match").await?;
        self.state.lock().unwrap().matches.retain(|m| m.match_id != match_id);
        Ok(())
    }

    async fn start_trade(&self, match_id: MatchId) -> ApiResult<StartTradeResponse> {
        self.enter("start_trade").await?;
        let mut state = self.state.lock().unwrap();
        let m = state
            .matches
            .iter_mut()
            .find(|m| m.match_id == match_id)
            .ok_or_else(|| not_found("Match"))?;

        let current = (m.match_status.clone(), m.initiator_id);
        match (&current.0, current.1) {
            (MatchStatus::Pending, _) => {
                m.match_status = MatchStatus::PendingTrade;
                m.initiator_id = Some(ME);
            }
            (MatchStatus::PendingTrade, Some(ME)) => {
                m.match_status = MatchStatus::Pending;
                m.initiator_id = None;
            }
            (MatchStatus::PendingTrade, _) => m.match_status = MatchStatus::InTrade,
            _ => return Err(Fail::Rejected("Trade cannot be started").to_error()),
        }

        let response = StartTradeResponse {
            match_status: m.match_status.clone(),
            initiator_id: m.initiator_id,
        };
        if m.match_status == MatchStatus::InTrade {
            let (partner_teaches, partner_learns) = (m.teaching[0].clone(), m.learning[0].clone());
            state.trades.insert(
                match_id,
                TradeStatus {
                    user1_skill: partner_teaches,
                    user2_skill: partner_learns,
                    status: TradeState::parse("accepted"),
                    user1_id: Some(PARTNER),
                    user2_id: Some(ME),
                    ..Default::default()
                },
            );
        }
        Ok(response)
    }

    async fn match_trade(&self, match_id: MatchId) -> ApiResult<TradeStatus> {
        self.enter("match_trade").await?;
        self.trade(match_id).ok_or_else(|| not_found("Trade"))
    }

    async fn trade_status(&self, match_id: MatchId) -> ApiResult<TradeStatus> {
        self.enter("trade_status").await?;
        self.trade(match_id).ok_or_else(|| not_found("Trade"))
    }

    async fn update_trade(&self, match_id: MatchId, update: &TradeUpdateRequest) -> ApiResult<TradeStatus> {
        self.enter("update_trade").await?;
        let mut state = self.state.lock().unwrap();
        state.updates.push((match_id, update.task, update.user_position));
        let trade = state.trades.get_mut(&match_id).ok_or_else(|| not_found("Trade"))?;
        let flag = match (update.user_position, update.task) {
            (Position::User1, TradeTask::Teaching) => &mut trade.user1_teaching_done,
            (Position::User1, TradeTask::Learning) => &mut trade.user1_learning_done,
            (Position::User2, TradeTask::Teaching) => &mut trade.user2_teaching_done,
            (Position::User2, TradeTask::Learning) => &mut trade.user2_learning_done,
        };
        *flag = update.completed;
        Ok(trade.clone())
    }

    async fn rate_trade(&self, match_id: MatchId, score: u8) -> ApiResult<()> {
        self.enter("rate_trade").await?;
        self.state.lock().unwrap().ratings.push((match_id, score));
        Ok(())
    }

    async fn complete_trade(&self, match_id: MatchId) -> ApiResult<TradeStatus> {
        self.enter("complete_trade").await?;
        let mut state = self.state.lock().unwrap();
        if let Some(m) = state.matches.iter_mut().find(|m| m.match_id == match_id) {
            m.match_status = MatchStatus::Completed;
        }
        let trade = state.trades.get_mut(&match_id).ok_or_else(|| not_found("Trade"))?;
        // The backend spells trade states in lowercase
        trade.status = TradeState::parse("completed");
        Ok(trade.clone())
    }

    async fn report_issue(&self, match_id: MatchId, reported_user_id: UserId, message: &str) -> ApiResult<()> {
        self.enter("report_issue").await?;
        self.state
            .lock()
            .unwrap()
            .reports
            .push((match_id, reported_user_id, message.to_string()));
        Ok(())
    }

    async fn messages(&self, match_id: MatchId) -> ApiResult<Vec<ChatMessage>> {
        self.enter("messages").await?;
        Ok(self.state.lock().unwrap().messages.get(&match_id).cloned().unwrap_or_default())
    }

    async fn send_message(&self, match_id: MatchId, text: &str) -> ApiResult<()> {
        self.enter("send_message").await?;
        let mut state = self.state.lock().unwrap();
        let list = state.messages.entry(match_id).or_default();
        let next = list.iter().map(|m| m.chat_id).max().unwrap_or(0) + 1;
        list.push(message(next, ME, text));
        Ok(())
    }
}
