//! Command-line parsing.

use skilltrade_types::api::ProfileUpdate;
use skilltrade_types::models::{MatchId, SkillId, SkillKind};

pub const USAGE: &str = "\
usage: skilltrade <command>

  signup <username> <email> <password>
  login <email> <password>
  logout
  me
  profile bio|location|photo <text>
  skills [list]
  skills add teach|learn <name>
  skills remove <skill_id>
  skills search <query>
  matches [refresh]
  trade start <match_id>
  trade status|teach-done|learn-done|watch <match_id>
  trade complete <match_id> <rating 1-5>
  trade report <match_id> <message>
  chat <match_id> [message]";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Signup {
        username: String,
        email: String,
        password: String,
    },
    Login {
        email: String,
        password: String,
    },
    Logout,
    Me,
    Profile(ProfileUpdate),
    Skills(SkillsCommand),
    Matches {
        refresh: bool,
    },
    Trade {
        match_id: MatchId,
        action: TradeCommand,
    },
    Chat {
        match_id: MatchId,
        message: Option<String>,
    },
    Help,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkillsCommand {
    List,
    Add { kind: SkillKind, name: String },
    Remove { skill_id: SkillId },
    Search { query: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TradeCommand {
    Start,
    Status,
    TeachDone,
    LearnDone,
    Complete { rating: u8 },
    Report { message: String },
    Watch,
}

impl Command {
    /// Whether the command needs a loaded session before it runs.
    pub fn needs_session(&self) -> bool {
        !matches!(
            self,
            Self::Signup { .. } | Self::Login { .. } | Self::Logout | Self::Help
        )
    }
}

pub fn parse(args: &[String]) -> Result<Command, String> {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    match args.as_slice() {
        [] | ["help"] | ["--help"] | ["-h"] => Ok(Command::Help),
        ["signup", username, email, password] => Ok(Command::Signup {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }),
        ["login", email, password] => Ok(Command::Login {
            email: email.to_string(),
            password: password.to_string(),
        }),
        ["logout"] => Ok(Command::Logout),
        ["me"] => Ok(Command::Me),
        ["profile", field, text @ ..] if !text.is_empty() => {
            let text = Some(text.join(" "));
            let update = match *field {
                "bio" => ProfileUpdate { bio: text, ..Default::default() },
                "location" => ProfileUpdate { location: text, ..Default::default() },
                "photo" => ProfileUpdate { photo: text, ..Default::default() },
                _ => return Err(USAGE.to_string()),
            };
            Ok(Command::Profile(update))
        }

        ["skills"] | ["skills", "list"] => Ok(Command::Skills(SkillsCommand::List)),
        ["skills", "add", kind, name @ ..] if !name.is_empty() => Ok(Command::Skills(SkillsCommand::Add {
            kind: kind.parse()?,
            name: name.join(" "),
        })),
        ["skills", "remove", id] => Ok(Command::Skills(SkillsCommand::Remove {
            skill_id: number(id, "skill_id")?,
        })),
        ["skills", "search", query @ ..] if !query.is_empty() => Ok(Command::Skills(SkillsCommand::Search {
            query: query.join(" "),
        })),

        ["matches"] => Ok(Command::Matches { refresh: false }),
        ["matches", "refresh"] => Ok(Command::Matches { refresh: true }),

        ["trade", action, id, rest @ ..] => {
            let match_id = number(id, "match_id")?;
            let action = match (*action, rest) {
                ("start", []) => TradeCommand::Start,
                ("status", []) => TradeCommand::Status,
                ("teach-done", []) => TradeCommand::TeachDone,
                ("learn-done", []) => TradeCommand::LearnDone,
                ("watch", []) => TradeCommand::Watch,
                ("complete", [rating]) => TradeCommand::Complete {
                    rating: rating
                        .parse()
                        .map_err(|_| format!("rating must be a number from 1 to 5, got '{}'", rating))?,
                },
                ("report", message) if !message.is_empty() => TradeCommand::Report {
                    message: message.join(" "),
                },
                _ => return Err(USAGE.to_string()),
            };
            Ok(Command::Trade { match_id, action })
        }

        ["chat", id, message @ ..] => Ok(Command::Chat {
            match_id: number(id, "match_id")?,
            message: (!message.is_empty()).then(|| message.join(" ")),
        }),

        _ => Err(USAGE.to_string()),
    }
}

fn number(raw: &str, what: &str) -> Result<i64, String> {
    raw.parse().map_err(|_| format!("{} must be a number, got '{}'", what, raw))
}
