mod common;

use std::sync::Arc;

use common::{FakeApi, PARTNER, partner_match, signed_in};
use skilltrade_session::{MatchLoader, Session, SessionError, TradeError, TradeSession};
use skilltrade_types::api::{Position, TradeTask};
use skilltrade_types::{MatchStatus, TradeState, TradeStatus};

/// Python teacher `ada` and Spanish teacher `grace`, with grace's request
/// accepted so the match is in trade.
async fn trading() -> (Arc<FakeApi>, Arc<Session>, TradeSession) {
    let api = FakeApi::new();
    api.set_skills(&["Python"], &["Spanish"]);
    api.add_match(partner_match(7, MatchStatus::PendingTrade, Some(PARTNER)));
    let session = signed_in(api.clone());
    session.load().await.unwrap();

    let loader = MatchLoader::new(session.clone());
    let (_, list) = loader.start_trade(7).await.unwrap();
    let trade = TradeSession::open(session.clone(), list.find(7).unwrap()).await.unwrap();
    (api, session, trade)
}

fn partner_sets(api: &FakeApi, update: impl FnOnce(&mut TradeStatus)) {
    let mut status = api.trade(7).unwrap();
    update(&mut status);
    api.set_trade(7, status);
}

#[tokio::test]
async fn only_in_trade_matches_open() {
    let api = FakeApi::new();
    let session = signed_in(api.clone());
    let pending = partner_match(7, MatchStatus::PendingTrade, Some(PARTNER));

    let err = TradeSession::open(session, &pending).await.err().unwrap();
    assert!(matches!(err, SessionError::Trade(TradeError::NotInTrade(_))));
    assert_eq!(api.calls("match_trade"), 0);
}

#[tokio::test]
async fn view_is_projected_onto_the_local_user() {
    let (api, _session, trade) = trading().await;

    let view = trade.view().unwrap();
    assert_eq!(view.position, Position::User2);
    assert_eq!(view.my_skill, "Python");
    assert_eq!(view.partner_skill, "Spanish");
    assert!(!view.can_mark_learning);
    assert_eq!(api.calls("match_trade"), 1);
}

#[tokio::test]
async fn full_trade_flow() {
    let (api, session, trade) = trading().await;

    let err = trade.mark_learning_done().await.unwrap_err();
    assert!(matches!(err, SessionError::Trade(TradeError::PartnerNotReady)));
    assert_eq!(api.calls("update_trade"), 0);

    let view = trade.mark_teaching_done().await.unwrap();
    assert!(view.my_teaching_done);
    assert!(matches!(
        trade.mark_teaching_done().await.unwrap_err(),
        SessionError::Trade(TradeError::AlreadyDone)
    ));

    partner_sets(&api, |s| s.user1_teaching_done = true);
    let view = trade.refresh().await.unwrap();
    assert!(view.partner_teaching_done);
    assert!(view.can_mark_learning);

    let view = trade.mark_learning_done().await.unwrap();
    assert!(view.my_learning_done);
    assert_eq!(
        api.state.lock().unwrap().updates,
        vec![(7, TradeTask::Teaching, Position::User2), (7, TradeTask::Learning, Position::User1)]
    );

    assert!(matches!(
        trade.complete(5).await.unwrap_err(),
        SessionError::Trade(TradeError::NotAllComplete)
    ));

    partner_sets(&api, |s| s.user2_learning_done = true);
    trade.refresh().await.unwrap();
    assert!(matches!(
        trade.complete(0).await.unwrap_err(),
        SessionError::Trade(TradeError::InvalidRating(0))
    ));

    session.storage().put_match_cache("{}", "[]").unwrap();
    let view = trade.complete(5).await.unwrap();
    assert_eq!(view.status, TradeState::Completed);
    assert!(view.status.is_terminal());
    assert!(session.storage().match_cache().unwrap().is_none());

    let state = api.state.lock().unwrap();
    assert_eq!(state.ratings, vec![(7, 5)]);
    let tail: Vec<_> = state.log.iter().rev().take(2).rev().copied().collect();
    assert_eq!(tail, vec!["rate_trade", "complete_trade"]);
}

#[tokio::test]
async fn issues_are_reported_against_the_partner() {
    let (api, _session, trade) = trading().await;

    let err = trade.report_issue("  ").await.unwrap_err();
    assert!(matches!(err, SessionError::InvalidInput(_)));

    trade.report_issue("Did not show up").await.unwrap();
    assert_eq!(
        api.state.lock().unwrap().reports,
        vec![(7, PARTNER, "Did not show up".to_string())]
    );
}

#[tokio::test]
async fn closed_trade_stops_publishing() {
    let (api, _session, trade) = trading().await;

    trade.close();
    partner_sets(&api, |s| s.user1_teaching_done = true);
    let _ = trade.refresh().await;

    assert!(trade.is_closed());
    assert!(!trade.current().unwrap().user1_teaching_done);
}
