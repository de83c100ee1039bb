use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use skilltrade_api::{ApiError, SkillTradeApi};
use skilltrade_db::Database;
use skilltrade_types::api::ProfileUpdate;
use skilltrade_types::events::SessionEvent;
use skilltrade_types::models::{SkillKind, UserId};
use skilltrade_types::{Skill, UserProfile, UserSkills};

use crate::dispatcher::Dispatcher;
use crate::error::{SessionError, SessionResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    Loading,
    Ready,
    Unauthenticated,
    Error(String),
}

/// Flags derived from the skill lists; they gate matching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkillFlags {
    pub has_skills: bool,
    pub has_required_skills: bool,
}

impl SkillFlags {
    pub fn from_skills(skills: &UserSkills) -> Self {
        let teaching = !skills.teaching.is_empty();
        let learning = !skills.learning.is_empty();
        Self {
            has_skills: teaching || learning,
            has_required_skills: teaching && learning,
        }
    }
}

pub(crate) struct SessionState {
    pub phase: SessionPhase,
    pub profile: Option<UserProfile>,
    pub skills: UserSkills,
    pub catalog: Vec<Skill>,
}

impl SessionState {
    fn empty(phase: SessionPhase) -> Self {
        Self {
            phase,
            profile: None,
            skills: UserSkills::default(),
            catalog: Vec::new(),
        }
    }
}

/// The signed-in user's profile, skill lists and the skill catalog.
pub struct Session {
    pub(crate) api: Arc<dyn SkillTradeApi>,
    pub(crate) storage: Arc<Database>,
    pub(crate) events: Dispatcher,
    pub(crate) state: RwLock<SessionState>,
    // One mutation in flight per list
    pub(crate) teach_lock: Mutex<()>,
    pub(crate) learn_lock: Mutex<()>,
}

impl Session {
    pub fn new(api: Arc<dyn SkillTradeApi>, storage: Arc<Database>) -> Self {
        Self {
            api,
            storage,
            events: Dispatcher::new(),
            state: RwLock::new(SessionState::empty(SessionPhase::Loading)),
            teach_lock: Mutex::new(()),
            learn_lock: Mutex::new(()),
        }
    }

    pub fn api(&self) -> &Arc<dyn SkillTradeApi> {
        &self.api
    }

    pub fn storage(&self) -> &Arc<Database> {
        &self.storage
    }

    pub fn events(&self) -> &Dispatcher {
        &self.events
    }

    // -- Lifecycle --

    /// Fetches profile, skills and catalog concurrently. A 401 clears the
    /// credential and leaves the session unauthenticated; it is not retried.
    pub async fn load(&self) -> SessionResult<()> {
        if !self.has_token()? {
            self.set_unauthenticated().await;
            return Err(SessionError::NotAuthenticated);
        }

        self.state.write().await.phase = SessionPhase::Loading;

        let result = tokio::try_join!(
            self.api.current_user(),
            self.api.my_skills(),
            self.api.skill_catalog()
        );

        let (profile, skills, catalog) = match result {
            Ok(parts) => parts,
            Err(e) => {
                let err = self.api_error(e).await;
                if !err.is_unauthorized() {
                    self.state.write().await.phase = SessionPhase::Error(err.user_message());
                }
                return Err(err);
            }
        };

        let flags = SkillFlags::from_skills(&skills);
        let (user_id, username) = (profile.user_id, profile.username.clone());
        {
            let mut state = self.state.write().await;
            state.phase = SessionPhase::Ready;
            state.profile = Some(profile);
            state.skills = skills;
            state.catalog = catalog;
        }

        info!(user_id, teaching_ready = flags.has_required_skills, "Session loaded");
        self.events.emit(SessionEvent::Ready { user_id, username });
        self.emit_flags(flags);
        Ok(())
    }

    /// Logs in, persists the token and loads the session. Matches cached by
    /// an earlier session are dropped first.
    pub async fn login(&self, email: &str, password: &str) -> SessionResult<()> {
        self.storage
            .clear_match_cache()
            .map_err(|e| SessionError::Storage(e.to_string()))?;
        let token = self.api.login(email.trim(), password).await?;
        self.storage
            .set_token(&token.access_token)
            .map_err(|e| SessionError::Storage(e.to_string()))?;
        self.load().await
    }

    pub async fn signup(&self, username: &str, email: &str, password: &str) -> SessionResult<UserProfile> {
        if username.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
            return Err(SessionError::InvalidInput(
                "username, email and password are required".to_string(),
            ));
        }
        let created = self.api.signup(username.trim(), email.trim(), password).await?;
        info!(user_id = created.user_id, "Account created");
        self.login(email, password).await?;
        Ok(created)
    }

    /// Drops the credential and every cached copy of server state.
    pub async fn logout(&self) -> SessionResult<()> {
        self.storage
            .clear_session()
            .map_err(|e| SessionError::Storage(e.to_string()))?;
        *self.state.write().await = SessionState::empty(SessionPhase::Unauthenticated);
        self.events.emit(SessionEvent::Unauthenticated);
        Ok(())
    }

    // -- Reads --

    pub async fn phase(&self) -> SessionPhase {
        self.state.read().await.phase.clone()
    }

    pub async fn profile(&self) -> Option<UserProfile> {
        self.state.read().await.profile.clone()
    }

    pub async fn user_id(&self) -> Option<UserId> {
        self.state.read().await.profile.as_ref().map(|p| p.user_id)
    }

    pub async fn skills(&self) -> UserSkills {
        self.state.read().await.skills.clone()
    }

    pub async fn skill_list(&self, kind: SkillKind) -> Vec<Skill> {
        self.state.read().await.skills.list(kind).clone()
    }

    pub async fn catalog(&self) -> Vec<Skill> {
        self.state.read().await.catalog.clone()
    }

    pub async fn flags(&self) -> SkillFlags {
        SkillFlags::from_skills(&self.state.read().await.skills)
    }

    pub async fn first_teaching_skill(&self) -> Option<String> {
        self.state
            .read()
            .await
            .skills
            .teaching
            .first()
            .map(|s| s.skill_name.clone())
    }

    // -- Server round-trips --

    /// Re-reads the skill lists from the server and replaces local state.
    pub async fn refresh_skills(&self) -> SessionResult<UserSkills> {
        let skills = match self.api.my_skills().await {
            Ok(skills) => skills,
            Err(e) => return Err(self.api_error(e).await),
        };
        let flags = SkillFlags::from_skills(&skills);
        self.state.write().await.skills = skills.clone();
        self.emit_flags(flags);
        Ok(skills)
    }

    /// A blank query returns nothing without asking the server.
    pub async fn search_skills(&self, query: &str) -> SessionResult<Vec<Skill>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        match self.api.search_skills(query).await {
            Ok(found) => Ok(found),
            Err(e) => Err(self.api_error(e).await),
        }
    }

    pub async fn update_profile(&self, update: ProfileUpdate) -> SessionResult<UserProfile> {
        if update.is_empty() {
            return Err(SessionError::InvalidInput("nothing to update".to_string()));
        }
        let updated = match self.api.update_profile(&update).await {
            Ok(profile) => profile,
            Err(e) => return Err(self.api_error(e).await),
        };
        self.state.write().await.profile = Some(updated.clone());
        Ok(updated)
    }

    // -- Internals shared with the other modules --

    fn has_token(&self) -> SessionResult<bool> {
        self.storage
            .token()
            .map(|t| t.is_some())
            .map_err(|e| SessionError::Storage(e.to_string()))
    }

    pub(crate) fn emit_flags(&self, flags: SkillFlags) {
        self.events.emit(SessionEvent::SkillsChanged {
            has_skills: flags.has_skills,
            has_required_skills: flags.has_required_skills,
        });
    }

    /// Routes an API failure: a 401 ends the session, anything else is
    /// reported to views. Returns the error for the caller to propagate.
    pub(crate) async fn api_error(&self, e: ApiError) -> SessionError {
        if e.is_unauthorized() {
            self.set_unauthenticated().await;
        } else {
            warn!("API call failed: {}", e);
            self.events.emit(SessionEvent::Error {
                message: e.user_message(),
            });
        }
        SessionError::Api(e)
    }

    /// Drops the credential together with the match cache it guarded.
    pub(crate) async fn set_unauthenticated(&self) {
        if let Err(e) = self.storage.clear_session() {
            warn!("Failed to clear session storage: {}", e);
        }
        *self.state.write().await = SessionState::empty(SessionPhase::Unauthenticated);
        self.events.emit(SessionEvent::Unauthenticated);
    }
}
