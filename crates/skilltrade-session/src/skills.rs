use tokio::sync::Mutex;
use tracing::{debug, warn};

use skilltrade_api::ApiError;
use skilltrade_types::Skill;
use skilltrade_types::events::SessionEvent;
use skilltrade_types::models::{SkillId, SkillKind};

use crate::error::{SessionError, SessionResult};
use crate::session::{Session, SkillFlags};

/// What the user picked when adding a skill.
#[derive(Debug, Clone)]
pub enum SkillRef {
    /// An entry from the catalog or a search result.
    Existing(Skill),
    /// Free text; resolved through get-or-create.
    Named(String),
}

impl Session {
    /// Adds a skill to one of the user's lists. The entry shows up locally
    /// before the server confirms it and is taken back out if the server
    /// refuses; the server's message is returned unchanged.
    pub async fn add_skill(&self, kind: SkillKind, skill: SkillRef) -> SessionResult<Skill> {
        let _in_flight = self.list_lock(kind).lock().await;

        let skill = match skill {
            SkillRef::Existing(skill) => skill,
            SkillRef::Named(name) => {
                let name = name.trim();
                if name.is_empty() {
                    return Err(SessionError::InvalidInput("skill name cannot be empty".to_string()));
                }
                match self.api.get_or_create_skill(name).await {
                    Ok(skill) => skill,
                    Err(e) => return Err(self.api_error(e).await),
                }
            }
        };

        let before = {
            let mut state = self.state.write().await;
            let list = state.skills.list_mut(kind);
            if list.iter().any(|s| s.skill_id == skill.skill_id) {
                return Err(SessionError::InvalidInput(format!(
                    "{} is already on your {} list",
                    skill.skill_name,
                    kind.as_str()
                )));
            }
            let before = list.clone();
            list.push(skill.clone());
            before
        };
        self.emit_flags(self.flags().await);

        if let Err(e) = self.api.add_user_skill(skill.skill_id, kind).await {
            warn!(skill_id = skill.skill_id, kind = kind.as_str(), "Add skill rejected, reverting: {}", e);
            self.restore_list(kind, before).await;
            return Err(self.reverted(kind, e).await);
        }

        {
            let mut state = self.state.write().await;
            if !state.catalog.iter().any(|s| s.skill_id == skill.skill_id) {
                state.catalog.push(skill.clone());
            }
        }
        self.reconcile_list(kind).await;
        Ok(skill)
    }

    /// Removes a skill from one of the user's lists, putting it back at its
    /// old position if the server refuses.
    pub async fn remove_skill(&self, kind: SkillKind, skill_id: SkillId) -> SessionResult<Skill> {
        let _in_flight = self.list_lock(kind).lock().await;

        let (index, removed) = {
            let mut state = self.state.write().await;
            let list = state.skills.list_mut(kind);
            let index = list.iter().position(|s| s.skill_id == skill_id).ok_or_else(|| {
                SessionError::NotFound(format!("skill {} is not on your {} list", skill_id, kind.as_str()))
            })?;
            (index, list.remove(index))
        };
        self.emit_flags(self.flags().await);

        if let Err(e) = self.api.remove_user_skill(skill_id).await {
            warn!(skill_id, kind = kind.as_str(), "Remove skill rejected, reverting: {}", e);
            {
                let mut state = self.state.write().await;
                let list = state.skills.list_mut(kind);
                let at = index.min(list.len());
                list.insert(at, removed.clone());
            }
            self.emit_flags(self.flags().await);
            return Err(self.reverted(kind, e).await);
        }

        self.reconcile_list(kind).await;
        Ok(removed)
    }

    /// Reports a refused mutation once. A 401 ends the session; any other
    /// failure reaches views only as `SkillReverted`.
    async fn reverted(&self, kind: SkillKind, e: ApiError) -> SessionError {
        if e.is_unauthorized() {
            return self.api_error(e).await;
        }
        self.events.emit(SessionEvent::SkillReverted {
            kind,
            message: e.user_message(),
        });
        SessionError::Api(e)
    }

    pub(crate) fn list_lock(&self, kind: SkillKind) -> &Mutex<()> {
        match kind {
            SkillKind::Teach => &self.teach_lock,
            SkillKind::Learn => &self.learn_lock,
        }
    }

    async fn restore_list(&self, kind: SkillKind, before: Vec<Skill>) {
        let flags = {
            let mut state = self.state.write().await;
            *state.skills.list_mut(kind) = before;
            SkillFlags::from_skills(&state.skills)
        };
        self.emit_flags(flags);
    }

    /// Pulls the authoritative copy of one list after a confirmed mutation.
    /// If that read fails the optimistic list stands; it already reflects
    /// what the server accepted.
    async fn reconcile_list(&self, kind: SkillKind) {
        match self.api.my_skills().await {
            Ok(fresh) => {
                let flags = {
                    let mut state = self.state.write().await;
                    *state.skills.list_mut(kind) = fresh.list(kind).clone();
                    SkillFlags::from_skills(&state.skills)
                };
                debug!(kind = kind.as_str(), "Skill list reconciled");
                self.emit_flags(flags);
            }
            Err(e) if e.is_unauthorized() => {
                self.set_unauthenticated().await;
            }
            Err(e) => {
                warn!("Skill refresh after mutation failed, keeping local list: {}", e);
            }
        }
    }
}
