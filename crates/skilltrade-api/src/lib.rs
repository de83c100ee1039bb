//! HTTP/JSON client for the SkillTrade API.
//!
//! [`SkillTradeApi`] is the seam the session layer talks through;
//! [`HttpClient`] implements it with [`reqwest`], injecting the bearer token
//! from local storage and clearing it on any 401.

pub mod client;
pub mod error;
pub mod http;

pub use client::SkillTradeApi;
pub use error::{ApiError, ApiResult};
pub use http::HttpClient;
