//! Row types for the local storage tables. Payloads stay as JSON text so
//! this crate does not depend on the API models.

pub struct MatchCacheRow {
    pub skill_snapshot: String,
    pub matches: String,
    pub cached_at: String,
}
