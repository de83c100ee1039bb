use std::path::PathBuf;
use std::time::Duration;

use skilltrade_session::DEFAULT_POLL_INTERVAL;

pub struct Config {
    pub api_url: String,
    pub db_path: PathBuf,
    pub poll_interval: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let api_url = std::env::var("SKILLTRADE_API_URL").unwrap_or_else(|_| "http://localhost:8000".into());
        let db_path = std::env::var("SKILLTRADE_DB_PATH").unwrap_or_else(|_| "skilltrade.db".into());
        let poll_interval = match std::env::var("SKILLTRADE_POLL_SECS") {
            Ok(secs) => Duration::from_secs(secs.parse()?),
            Err(_) => DEFAULT_POLL_INTERVAL,
        };
        if poll_interval.is_zero() {
            anyhow::bail!("SKILLTRADE_POLL_SECS must be at least 1");
        }

        Ok(Self {
            api_url,
            db_path: PathBuf::from(db_path),
            poll_interval,
        })
    }
}
