use std::sync::Arc;

use anyhow::anyhow;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use skilltrade_session::matches::has_active_trade;
use skilltrade_session::{
    ChatPoller, MatchAction, MatchList, MatchLoader, Session, SessionError, SkillRef, TradeSession, TradeView,
};
use skilltrade_types::events::SessionEvent;
use skilltrade_types::models::{MatchId, SkillKind, UserId};
use skilltrade_types::{ChatMessage, Match, MatchStatus, Skill};

use crate::cli::{Command, SkillsCommand, TradeCommand};
use crate::config::Config;

fn user(e: SessionError) -> anyhow::Error {
    anyhow!(e.user_message())
}

pub async fn run(command: Command, session: Arc<Session>, config: &Config) -> anyhow::Result<()> {
    if command.needs_session() {
        session.load().await.map_err(user)?;
    }

    match command {
        Command::Help => {}
        Command::Signup {
            username,
            email,
            password,
        } => {
            let created = session.signup(&username, &email, &password).await.map_err(user)?;
            println!("Welcome, {}! You are logged in.", created.username);
        }
        Command::Login { email, password } => {
            session.login(&email, &password).await.map_err(user)?;
            if let Some(profile) = session.profile().await {
                println!("Logged in as {}.", profile.username);
            }
        }
        Command::Logout => {
            session.logout().await.map_err(user)?;
            println!("Logged out.");
        }
        Command::Me => me(&session).await,
        Command::Profile(update) => {
            session.update_profile(update).await.map_err(user)?;
            println!("Profile updated.");
            me(&session).await;
        }
        Command::Skills(cmd) => skills(&session, cmd).await?,
        Command::Matches { refresh } => {
            let loader = MatchLoader::new(session.clone());
            let list = (if refresh { loader.refresh().await } else { loader.load().await }).map_err(user)?;
            print_matches(&session, &list).await;
        }
        Command::Trade { match_id, action } => trade(session, config, match_id, action).await?,
        Command::Chat { match_id, message } => chat(session, config, match_id, message).await?,
    }

    Ok(())
}

async fn me(session: &Session) {
    let Some(profile) = session.profile().await else {
        return;
    };
    println!("{} <{}> (id {})", profile.username, profile.email, profile.user_id);
    if let Some(location) = &profile.location {
        println!("  location: {}", location);
    }
    if let Some(bio) = &profile.bio {
        println!("  bio: {}", bio);
    }
    if let Some(rating) = profile.rating {
        println!("  rating: {:.1}", rating);
    }
    print_skills(session).await;
}

async fn skills(session: &Session, cmd: SkillsCommand) -> anyhow::Result<()> {
    match cmd {
        SkillsCommand::List => print_skills(session).await,
        SkillsCommand::Add { kind, name } => {
            let pick = session
                .catalog()
                .await
                .into_iter()
                .find(|s| s.skill_name.eq_ignore_ascii_case(name.trim()))
                .map(SkillRef::Existing)
                .unwrap_or(SkillRef::Named(name));
            let added = session.add_skill(kind, pick).await.map_err(user)?;
            println!("Added {} (id {}) to your {} list.", added.skill_name, added.skill_id, kind.as_str());
        }
        SkillsCommand::Remove { skill_id } => {
            let kind = if session.skill_list(SkillKind::Teach).await.iter().any(|s| s.skill_id == skill_id) {
                SkillKind::Teach
            } else {
                SkillKind::Learn
            };
            let removed = session.remove_skill(kind, skill_id).await.map_err(user)?;
            println!("Removed {} from your {} list.", removed.skill_name, kind.as_str());
        }
        SkillsCommand::Search { query } => {
            let found = session.search_skills(&query).await.map_err(user)?;
            if found.is_empty() {
                println!("No skills match '{}'.", query);
            }
            for skill in found {
                println!("  {:>4}  {}", skill.skill_id, skill.skill_name);
            }
        }
    }
    Ok(())
}

async fn print_skills(session: &Session) {
    let skills = session.skills().await;
    println!("Teaching: {}", skill_names(&skills.teaching));
    println!("Learning: {}", skill_names(&skills.learning));
    if !session.flags().await.has_required_skills {
        println!("Add at least one skill to teach and one to learn to get matched.");
    }
}

fn skill_names(skills: &[Skill]) -> String {
    if skills.is_empty() {
        return "-".to_string();
    }
    skills
        .iter()
        .map(|s| format!("{} ({})", s.skill_name, s.skill_id))
        .collect::<Vec<_>>()
        .join(", ")
}

async fn print_matches(session: &Session, list: &MatchList) {
    if let MatchList::NeedsSkills = list {
        println!("Add at least one skill to teach and one to learn to see matches.");
        return;
    }
    let matches = list.matches();
    if matches.is_empty() {
        println!("No matches yet.");
        return;
    }

    let me = session.user_id().await.unwrap_or_default();
    let active = has_active_trade(matches);
    for m in matches {
        print_match(m, MatchAction::for_match(m, me, active));
    }
    if let MatchList::Cached(_) = list {
        println!("(cached; run `skilltrade matches refresh` to re-fetch)");
    }
}

fn print_match(m: &Match, action: MatchAction) {
    let rating = m.rating.map(|r| format!("{:.1}", r)).unwrap_or_else(|| "-".into());
    println!(
        "#{:<4} {} (rating {}) teaches {}; wants {} [{}]",
        m.match_id,
        m.username,
        rating,
        m.teaching.join(", "),
        m.learning.join(", "),
        m.match_status
    );
    if action != MatchAction::None {
        println!("       -> {}", action.label());
    }
}

/// Looks the match up in the cached list first. A cached entry that is not
/// in trade may be stale, so that case is re-fetched.
async fn find_match(session: &Arc<Session>, match_id: MatchId) -> anyhow::Result<Match> {
    let loader = MatchLoader::new(session.clone());
    let mut list = loader.load().await.map_err(user)?;
    let stale = matches!(&list, MatchList::Cached(_))
        && list.find(match_id).map_or(true, |m| m.match_status != MatchStatus::InTrade);
    if stale {
        list = loader.refresh().await.map_err(user)?;
    }
    list.find(match_id)
        .cloned()
        .ok_or_else(|| anyhow!("No match with id {}.", match_id))
}

async fn trade(session: Arc<Session>, config: &Config, match_id: MatchId, action: TradeCommand) -> anyhow::Result<()> {
    if let TradeCommand::Start = action {
        let (updated, list) = MatchLoader::new(session.clone())
            .start_trade(match_id)
            .await
            .map_err(user)?;
        println!("Match #{} is now {}.", match_id, updated.match_status);
        print_matches(&session, &list).await;
        return Ok(());
    }

    let m = find_match(&session, match_id).await?;
    let trade = TradeSession::open(session.clone(), &m).await.map_err(user)?;

    match action {
        TradeCommand::Start => {}
        TradeCommand::Status => {
            let view = trade.refresh().await.map_err(user)?;
            print_view(&m.username, &view);
        }
        TradeCommand::TeachDone => {
            let view = trade.mark_teaching_done().await.map_err(user)?;
            print_view(&m.username, &view);
        }
        TradeCommand::LearnDone => {
            let view = trade.mark_learning_done().await.map_err(user)?;
            print_view(&m.username, &view);
        }
        TradeCommand::Complete { rating } => {
            trade.complete(rating).await.map_err(user)?;
            println!("Trade with {} completed. Thanks for rating!", m.username);
        }
        TradeCommand::Report { message } => {
            trade.report_issue(&message).await.map_err(user)?;
            println!("Issue reported. We'll look into it.");
        }
        TradeCommand::Watch => watch_trade(&session, config, &trade, &m.username).await?,
    }

    trade.close();
    Ok(())
}

async fn watch_trade(session: &Session, config: &Config, trade: &TradeSession, partner: &str) -> anyhow::Result<()> {
    let mut rx = trade.subscribe();
    let mut events = session.events().subscribe();
    let _poll = trade.watch(config.poll_interval);
    info!(match_id = trade.match_id(), "Watching trade; Ctrl-C to stop");

    if let Some(view) = trade.view() {
        print_view(partner, &view);
    }

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let _ = rx.borrow_and_update();
                if let Some(view) = trade.view() {
                    print_view(partner, &view);
                    if view.status.is_terminal() {
                        break;
                    }
                }
            }
            event = events.recv() => {
                if let Ok(SessionEvent::Unauthenticated) = event {
                    return Err(anyhow!("Your session has expired. Please log in again."));
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}

fn print_view(partner: &str, view: &TradeView) {
    let mark = |done: bool| if done { "x" } else { " " };
    println!("Trade with {} ({})", partner, view.status);
    println!("  [{}] you taught {}", mark(view.my_teaching_done), view.my_skill);
    println!("  [{}] {} taught {}", mark(view.partner_teaching_done), partner, view.partner_skill);
    println!("  [{}] you confirmed learning {}", mark(view.my_learning_done), view.partner_skill);
    println!("  [{}] {} confirmed learning {}", mark(view.partner_learning_done), partner, view.my_skill);

    if view.all_complete {
        println!("  All steps done: `skilltrade trade complete <match_id> <rating>` to finish.");
    } else if view.can_mark_teaching() {
        println!("  Teach {} {}, then mark it with `teach-done`.", partner, view.my_skill);
    } else if view.can_mark_learning {
        println!("  {} has taught you; confirm with `learn-done`.", partner);
    } else if !view.partner_teaching_done && !view.my_learning_done {
        println!("  Waiting for {} to teach {}.", partner, view.partner_skill);
    }
}

async fn chat(session: Arc<Session>, config: &Config, match_id: MatchId, message: Option<String>) -> anyhow::Result<()> {
    let me = session.user_id().await.unwrap_or_default();
    let chat = ChatPoller::new(session.clone(), match_id);

    if let Some(text) = message {
        let messages = chat.send(&text).await.map_err(user)?;
        let mut last = messages.len().saturating_sub(5);
        print_new(&messages, &mut last, me);
        return Ok(());
    }

    let mut rx = chat.subscribe();
    let mut events = session.events().subscribe();
    let _poll = chat.watch(config.poll_interval);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut shown = 0;
    info!(match_id, "Following chat; type a line to send, Ctrl-D to leave");

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let messages = rx.borrow_and_update().clone().unwrap_or_default();
                print_new(&messages, &mut shown, me);
            }
            line = lines.next_line() => {
                let Some(text) = line? else { break };
                if text.trim().is_empty() {
                    continue;
                }
                if let Err(e) = chat.send(&text).await {
                    eprintln!("error: {}", e.user_message());
                }
            }
            event = events.recv() => {
                if let Ok(SessionEvent::Unauthenticated) = event {
                    return Err(anyhow!("Your session has expired. Please log in again."));
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    chat.close();
    Ok(())
}

/// Prints the messages past `shown` and advances it.
fn print_new(messages: &[ChatMessage], shown: &mut usize, me: UserId) {
    for m in messages.iter().skip(*shown) {
        let who = if m.sender_id == me { "you" } else { "them" };
        println!("[{}] {}: {}", m.timestamp.format("%Y-%m-%d %H:%M"), who, m.message);
    }
    *shown = messages.len().max(*shown);
}
