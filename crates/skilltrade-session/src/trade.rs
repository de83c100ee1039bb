//! Trade progress from the local user's side of the table.
//!
//! The server stores a trade as two fixed positions, `user1` and `user2`.
//! Every view resolves which one is "me" and flips the flags accordingly:
//! my learning is confirmed through the *partner's* `learning_done` flag,
//! because that flag records that the partner's teaching was received.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use skilltrade_types::api::{Position, TradeTask, TradeUpdateRequest};
use skilltrade_types::events::SessionEvent;
use skilltrade_types::models::{MatchId, UserId};
use skilltrade_types::{Match, MatchStatus, TradeState, TradeStatus};

use crate::error::{SessionError, SessionResult, TradeError};
use crate::poller::{PollHandle, spawn_poll};
use crate::session::Session;

/// Works out which side of the trade the local user is on.
///
/// Ids win when the status carries them. Without ids the local user's first
/// teaching skill is compared with `user1_skill`; anything else is `User2`.
pub fn resolve_position(status: &TradeStatus, my_user_id: Option<UserId>, my_teaching: Option<&str>) -> Position {
    if let Some(me) = my_user_id {
        if status.user1_id == Some(me) {
            return Position::User1;
        }
        if status.user2_id == Some(me) {
            return Position::User2;
        }
    }

    match my_teaching {
        Some(skill) if skill == status.user1_skill => {
            debug!(skill, "Trade position resolved by skill name");
            Position::User1
        }
        _ => Position::User2,
    }
}

/// A trade status projected onto one participant.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeView {
    pub position: Position,
    pub my_skill: String,
    pub partner_skill: String,
    pub my_teaching_done: bool,
    pub my_learning_done: bool,
    pub partner_teaching_done: bool,
    pub partner_learning_done: bool,
    /// Learning can be confirmed once the partner has taught.
    pub can_mark_learning: bool,
    pub all_complete: bool,
    pub status: TradeState,
}

impl TradeView {
    pub fn project(status: &TradeStatus, position: Position) -> Self {
        let u1 = (
            status.user1_skill.as_str(),
            status.user1_teaching_done,
            status.user1_learning_done,
        );
        let u2 = (
            status.user2_skill.as_str(),
            status.user2_teaching_done,
            status.user2_learning_done,
        );
        let (me, partner) = match position {
            Position::User1 => (u1, u2),
            Position::User2 => (u2, u1),
        };

        let my_learning_done = partner.2;
        let partner_teaching_done = partner.1;

        Self {
            position,
            my_skill: me.0.to_string(),
            partner_skill: partner.0.to_string(),
            my_teaching_done: me.1,
            my_learning_done,
            partner_teaching_done,
            partner_learning_done: me.2,
            can_mark_learning: !my_learning_done && partner_teaching_done,
            all_complete: status.all_complete(),
            status: status.status.clone(),
        }
    }

    pub fn can_mark_teaching(&self) -> bool {
        !self.my_teaching_done
    }
}

/// One open trade. Closing it (or dropping it) stops its pollers, and any
/// response still in flight is discarded.
pub struct TradeSession {
    session: Arc<Session>,
    match_id: MatchId,
    partner_id: UserId,
    my_user_id: Option<UserId>,
    my_teaching: Option<String>,
    status: Arc<watch::Sender<Option<TradeStatus>>>,
    alive: CancellationToken,
}

impl TradeSession {
    /// Opens the trade view for a match that is `IN_TRADE` and loads the
    /// first snapshot.
    pub async fn open(session: Arc<Session>, m: &Match) -> SessionResult<Self> {
        if m.match_status != MatchStatus::InTrade {
            return Err(TradeError::NotInTrade(m.match_status.to_string()).into());
        }

        let first = match session.api.match_trade(m.match_id).await {
            Ok(status) => status,
            Err(e) => return Err(session.api_error(e).await),
        };

        let trade = Self {
            my_user_id: session.user_id().await,
            my_teaching: session.first_teaching_skill().await,
            match_id: m.match_id,
            partner_id: m.user_id,
            status: Arc::new(watch::channel(None).0),
            alive: CancellationToken::new(),
            session,
        };
        if trade.my_user_id.is_some() && (first.user1_id.is_none() || first.user2_id.is_none()) {
            warn!(match_id = trade.match_id, "Trade status carries no user ids, matching position by skill name");
        }
        trade.publish(first);
        info!(match_id = trade.match_id, "Trade opened");
        Ok(trade)
    }

    pub fn match_id(&self) -> MatchId {
        self.match_id
    }

    pub fn partner_id(&self) -> UserId {
        self.partner_id
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<TradeStatus>> {
        self.status.subscribe()
    }

    pub fn current(&self) -> Option<TradeStatus> {
        self.status.borrow().clone()
    }

    pub fn view(&self) -> Option<TradeView> {
        let current = self.status.borrow();
        let status = current.as_ref()?;
        let position = resolve_position(status, self.my_user_id, self.my_teaching.as_deref());
        Some(TradeView::project(status, position))
    }

    pub async fn refresh(&self) -> SessionResult<TradeView> {
        let status = match self.session.api.trade_status(self.match_id).await {
            Ok(status) => status,
            Err(e) => return Err(self.session.api_error(e).await),
        };
        self.publish(status);
        self.view().ok_or_else(|| TradeError::NoStatus.into())
    }

    /// Polls the status until the handle is dropped or the trade is closed.
    pub fn watch(&self, interval: Duration) -> PollHandle {
        let api = self.session.api.clone();
        let events = self.session.events.clone();
        let match_id = self.match_id;

        spawn_poll(
            self.session.clone(),
            format!("trade {}", match_id),
            interval,
            self.alive.child_token(),
            self.status.clone(),
            move || {
                let api = api.clone();
                async move { api.trade_status(match_id).await }
            },
            move |status: &TradeStatus| {
                events.emit(SessionEvent::TradeStatusUpdated {
                    match_id,
                    status: status.clone(),
                });
            },
        )
    }

    pub async fn mark_teaching_done(&self) -> SessionResult<TradeView> {
        let view = self.view().ok_or(TradeError::NoStatus)?;
        if view.my_teaching_done {
            return Err(TradeError::AlreadyDone.into());
        }
        self.send_update(TradeTask::Teaching, view.position).await
    }

    /// Confirms that the partner's teaching was received. The flag lives on
    /// the partner's position.
    pub async fn mark_learning_done(&self) -> SessionResult<TradeView> {
        let view = self.view().ok_or(TradeError::NoStatus)?;
        if view.my_learning_done {
            return Err(TradeError::AlreadyDone.into());
        }
        if !view.partner_teaching_done {
            return Err(TradeError::PartnerNotReady.into());
        }
        self.send_update(TradeTask::Learning, view.position.other()).await
    }

    /// Rates the partner and closes the trade. The rating is sent first;
    /// completion follows immediately.
    pub async fn complete(&self, rating: u8) -> SessionResult<TradeView> {
        if !(1..=5).contains(&rating) {
            return Err(TradeError::InvalidRating(rating).into());
        }
        let view = self.view().ok_or(TradeError::NoStatus)?;
        if !view.all_complete {
            return Err(TradeError::NotAllComplete.into());
        }

        if let Err(e) = self.session.api.rate_trade(self.match_id, rating).await {
            return Err(self.session.api_error(e).await);
        }
        let status = match self.session.api.complete_trade(self.match_id).await {
            Ok(status) => status,
            Err(e) => return Err(self.session.api_error(e).await),
        };

        // The match list no longer reflects this trade
        if let Err(e) = self.session.storage.clear_match_cache() {
            warn!("Failed to clear match cache: {}", e);
        }
        info!(match_id = self.match_id, rating, "Trade completed");
        self.publish(status);
        self.view().ok_or_else(|| TradeError::NoStatus.into())
    }

    pub async fn report_issue(&self, message: &str) -> SessionResult<()> {
        let message = message.trim();
        if message.is_empty() {
            return Err(SessionError::InvalidInput("describe the issue first".to_string()));
        }
        if let Err(e) = self.session.api.report_issue(self.match_id, self.partner_id, message).await {
            return Err(self.session.api_error(e).await);
        }
        info!(match_id = self.match_id, reported_user_id = self.partner_id, "Issue reported");
        Ok(())
    }

    /// Stops every poller started from this trade.
    pub fn close(&self) {
        self.alive.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.alive.is_cancelled()
    }

    async fn send_update(&self, task: TradeTask, user_position: Position) -> SessionResult<TradeView> {
        let update = TradeUpdateRequest {
            task,
            user_position,
            completed: true,
        };
        let status = match self.session.api.update_trade(self.match_id, &update).await {
            Ok(status) => status,
            Err(e) => return Err(self.session.api_error(e).await),
        };
        info!(match_id = self.match_id, ?task, ?user_position, "Trade step marked done");
        self.publish(status);
        self.view().ok_or_else(|| TradeError::NoStatus.into())
    }

    fn publish(&self, status: TradeStatus) {
        if self.alive.is_cancelled() {
            debug!(match_id = self.match_id, "Trade closed, dropping status");
            return;
        }
        self.session.events.emit(SessionEvent::TradeStatusUpdated {
            match_id: self.match_id,
            status: status.clone(),
        });
        self.status.send_replace(Some(status));
    }
}

impl Drop for TradeSession {
    fn drop(&mut self) {
        self.alive.cancel();
    }
}
