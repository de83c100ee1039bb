//! Client-side state projection over the SkillTrade API.
//!
//! A [`Session`] holds the signed-in user's profile and skill lists and
//! applies skill mutations optimistically. [`MatchLoader`] serves the match
//! list from a snapshot-keyed cache, [`TradeSession`] projects a trade's
//! status onto the local user's perspective, and [`ChatPoller`] follows a
//! conversation. Pollers stop when their [`PollHandle`] is dropped.

pub mod chat;
pub mod dispatcher;
pub mod error;
pub mod matches;
pub mod poller;
pub mod session;
pub mod skills;
pub mod trade;

pub use chat::ChatPoller;
pub use dispatcher::Dispatcher;
pub use error::{SessionError, SessionResult, TradeError};
pub use matches::{MatchAction, MatchList, MatchLoader};
pub use poller::{DEFAULT_POLL_INTERVAL, PollHandle};
pub use session::{Session, SessionPhase, SkillFlags};
pub use skills::SkillRef;
pub use trade::{TradeSession, TradeView};
