use std::sync::Arc;

use tracing::{debug, info, warn};

use skilltrade_types::api::StartTradeResponse;
use skilltrade_types::events::SessionEvent;
use skilltrade_types::models::{MatchId, UserId};
use skilltrade_types::{Match, MatchStatus, UserSkills};

use crate::error::{SessionError, SessionResult};
use crate::session::{Session, SkillFlags};

/// Outcome of [`MatchLoader::load`].
#[derive(Debug, Clone, PartialEq)]
pub enum MatchList {
    /// The user must teach and learn at least one skill each before
    /// matching; the match endpoint was not called.
    NeedsSkills,
    /// Served from local storage; the skill set is unchanged since it was fetched.
    Cached(Vec<Match>),
    Fresh(Vec<Match>),
}

impl MatchList {
    pub fn matches(&self) -> &[Match] {
        match self {
            Self::NeedsSkills => &[],
            Self::Cached(m) | Self::Fresh(m) => m,
        }
    }

    pub fn find(&self, match_id: MatchId) -> Option<&Match> {
        self.matches().iter().find(|m| m.match_id == match_id)
    }
}

/// Loads candidate partners, keyed on the user id and a snapshot of their
/// skill set.
pub struct MatchLoader {
    session: Arc<Session>,
}

impl MatchLoader {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    /// Re-validates the skill lists against the server, then serves the
    /// cached match list if the user and skill set are byte-identical to the
    /// ones it was fetched for, or fetches a fresh one otherwise.
    pub async fn load(&self) -> SessionResult<MatchList> {
        let skills = self.session.refresh_skills().await?;
        if !SkillFlags::from_skills(&skills).has_required_skills {
            debug!("Matching skipped: teaching and learning lists are not both set");
            return Ok(MatchList::NeedsSkills);
        }

        let snapshot = snapshot(self.session.user_id().await, &skills)?;
        if let Some(cached) = self.cached_for(&snapshot) {
            debug!(count = cached.len(), "Serving cached matches");
            return Ok(MatchList::Cached(cached));
        }

        self.fetch(&snapshot).await.map(MatchList::Fresh)
    }

    /// Ignores the cache for one load.
    pub async fn refresh(&self) -> SessionResult<MatchList> {
        self.invalidate();
        self.load().await
    }

    pub fn invalidate(&self) {
        if let Err(e) = self.session.storage.clear_match_cache() {
            warn!("Failed to clear match cache: {}", e);
        }
    }

    /// Requests, accepts or withdraws a trade on `match_id`, then reloads the
    /// list so the new status is visible.
    pub async fn start_trade(&self, match_id: MatchId) -> SessionResult<(StartTradeResponse, MatchList)> {
        let updated = match self.session.api.start_trade(match_id).await {
            Ok(updated) => updated,
            Err(e) => return Err(self.session.api_error(e).await),
        };
        info!(match_id, status = %updated.match_status, "Trade request toggled");

        let list = self.refresh().await?;
        Ok((updated, list))
    }

    pub async fn delete_match(&self, match_id: MatchId) -> SessionResult<()> {
        if let Err(e) = self.session.api.delete_match(match_id).await {
            return Err(self.session.api_error(e).await);
        }
        self.invalidate();
        Ok(())
    }

    fn cached_for(&self, snapshot: &str) -> Option<Vec<Match>> {
        let row = match self.session.storage.match_cache() {
            Ok(row) => row?,
            Err(e) => {
                warn!("Match cache unreadable: {}", e);
                return None;
            }
        };

        if row.skill_snapshot != snapshot {
            return None;
        }

        match serde_json::from_str(&row.matches) {
            Ok(matches) => Some(matches),
            Err(e) => {
                warn!("Discarding corrupt match cache from {}: {}", row.cached_at, e);
                self.invalidate();
                None
            }
        }
    }

    async fn fetch(&self, snapshot: &str) -> SessionResult<Vec<Match>> {
        let matches = match self.session.api.matches().await {
            Ok(matches) => matches,
            Err(e) => {
                // Never serve a stale list after a failed refresh
                self.invalidate();
                return Err(self.session.api_error(e).await);
            }
        };

        match serde_json::to_string(&matches) {
            Ok(json) => {
                if let Err(e) = self.session.storage.put_match_cache(snapshot, &json) {
                    warn!("Failed to cache matches: {}", e);
                }
            }
            Err(e) => warn!("Failed to serialize matches for cache: {}", e),
        }

        info!(count = matches.len(), "Fetched matches");
        self.session.events.emit(SessionEvent::MatchesUpdated {
            matches: matches.clone(),
        });
        Ok(matches)
    }
}

fn snapshot(user_id: Option<UserId>, skills: &UserSkills) -> SessionResult<String> {
    serde_json::to_string(&(user_id, skills)).map_err(|e| SessionError::Storage(e.to_string()))
}

/// True while any match is mid-trade; other matches offer no actions then.
pub fn has_active_trade(matches: &[Match]) -> bool {
    matches.iter().any(|m| m.match_status == MatchStatus::InTrade)
}

/// The action a match card offers the local user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchAction {
    StartTrade,
    /// The local user opened the pending request.
    CancelRequest,
    /// The partner opened the pending request.
    AcceptTrade,
    OpenTrade,
    /// Another match is already in a trade.
    Blocked,
    None,
}

impl MatchAction {
    pub fn for_match(m: &Match, my_user_id: UserId, active_trade: bool) -> Self {
        match &m.match_status {
            MatchStatus::InTrade => Self::OpenTrade,
            _ if active_trade => Self::Blocked,
            MatchStatus::Pending => Self::StartTrade,
            MatchStatus::PendingTrade if m.initiator_id == Some(my_user_id) => Self::CancelRequest,
            MatchStatus::PendingTrade => Self::AcceptTrade,
            MatchStatus::Completed | MatchStatus::Cancelled | MatchStatus::Unknown(_) => Self::None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::StartTrade => "Start Trade",
            Self::CancelRequest => "Cancel Request",
            Self::AcceptTrade => "Accept Trade",
            Self::OpenTrade => "Open Trade",
            Self::Blocked => "Finish your active trade first",
            Self::None => "",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(status: MatchStatus, initiator_id: Option<UserId>) -> Match {
        Match {
            match_id: 10,
            user_id: 2,
            username: "grace".into(),
            photo: None,
            location: None,
            bio: None,
            teaching: vec!["Spanish".into()],
            learning: vec!["Python".into()],
            rating: Some(5.0),
            match_status: status,
            initiator_id,
        }
    }

    #[test]
    fn pending_request_depends_on_initiator() {
        let mine = candidate(MatchStatus::PendingTrade, Some(1));
        let theirs = candidate(MatchStatus::PendingTrade, Some(2));
        assert_eq!(MatchAction::for_match(&mine, 1, false), MatchAction::CancelRequest);
        assert_eq!(MatchAction::for_match(&theirs, 1, false), MatchAction::AcceptTrade);
    }

    #[test]
    fn active_trade_blocks_other_matches() {
        let open = candidate(MatchStatus::Pending, None);
        let trading = candidate(MatchStatus::InTrade, Some(2));
        let list = vec![open.clone(), trading.clone()];

        assert!(has_active_trade(&list));
        assert_eq!(MatchAction::for_match(&open, 1, true), MatchAction::Blocked);
        assert_eq!(MatchAction::for_match(&trading, 1, true), MatchAction::OpenTrade);
        assert_eq!(MatchAction::for_match(&open, 1, false), MatchAction::StartTrade);
    }

    #[test]
    fn closed_matches_offer_nothing() {
        for status in [
            MatchStatus::Completed,
            MatchStatus::Cancelled,
            MatchStatus::Unknown("flagged".into()),
        ] {
            assert_eq!(MatchAction::for_match(&candidate(status, None), 1, false), MatchAction::None);
        }
    }
}
