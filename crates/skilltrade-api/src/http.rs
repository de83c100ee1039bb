use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use skilltrade_db::Database;
use skilltrade_types::api::{
    AddUserSkillRequest, ErrorBody, GetOrCreateSkillRequest, LoginForm, ProfileUpdate, RateRequest,
    ReportIssueRequest, SendMessageRequest, SignupRequest, StartTradeResponse, TokenResponse, TradeUpdateRequest,
};
use skilltrade_types::models::{MatchId, SkillId, SkillKind, UserId};
use skilltrade_types::{ChatMessage, Match, Skill, TradeStatus, UserProfile, UserSkills};

use crate::client::SkillTradeApi;
use crate::error::{ApiError, ApiResult};

/// [`SkillTradeApi`] over HTTP. The bearer token is read from local storage
/// on every request, so a login in another process is picked up.
pub struct HttpClient {
    client: reqwest::Client,
    base_url: String,
    storage: Arc<Database>,
}

impl HttpClient {
    /// * `base_url` - API root, e.g. `http://localhost:8000`.
    pub fn new(base_url: impl Into<String>, storage: Arc<Database>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, storage)
    }

    /// Reuse an existing [`reqwest::Client`] for connection pooling.
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>, storage: Arc<Database>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            storage,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, builder: RequestBuilder) -> ApiResult<RequestBuilder> {
        let token = self.storage.token().map_err(|e| ApiError::Storage(e.to_string()))?;
        Ok(match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    async fn send(&self, builder: RequestBuilder) -> ApiResult<Response> {
        let response = self.authed(builder)?.send().await?;
        self.ensure_success(response).await
    }

    /// Maps non-2xx responses onto [`ApiError`]. A 401 also drops the
    /// stored token so the next start goes through login again.
    async fn ensure_success(&self, response: Response) -> ApiResult<Response> {
        let status = response.status();
        debug!("{} {}", status.as_u16(), response.url().path());

        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            warn!("API rejected credential; clearing stored token");
            if let Err(e) = self.storage.clear_token() {
                warn!("Failed to clear token: {}", e);
            }
            return Err(ApiError::Unauthorized);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());

        if status.is_client_error() {
            let detail = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.message())
                .unwrap_or_else(|_| {
                    format!(
                        "Request failed: {}",
                        status.canonical_reason().unwrap_or("client error")
                    )
                });
            return Err(ApiError::Validation {
                status: status.as_u16(),
                detail,
            });
        }

        Err(ApiError::Server {
            status: status.as_u16(),
            body,
        })
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let response = self.send(self.client.get(self.url(path))).await?;
        Self::parse(response).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> ApiResult<T> {
        let response = self.send(self.client.post(self.url(path)).json(body)).await?;
        Self::parse(response).await
    }

    /// POST whose response body is not needed.
    async fn post_unit<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> ApiResult<()> {
        self.send(self.client.post(self.url(path)).json(body)).await?;
        Ok(())
    }
}

#[async_trait]
impl SkillTradeApi for HttpClient {
    async fn login(&self, email: &str, password: &str) -> ApiResult<TokenResponse> {
        let form = LoginForm {
            username: email,
            password,
        };
        let response = self.client.post(self.url("/login")).form(&form).send().await?;
        let response = self.ensure_success(response).await?;
        Self::parse(response).await
    }

    async fn signup(&self, username: &str, email: &str, password: &str) -> ApiResult<UserProfile> {
        let body = SignupRequest {
            username,
            email,
            password,
        };
        let response = self.client.post(self.url("/users/")).json(&body).send().await?;
        let response = self.ensure_success(response).await?;
        Self::parse(response).await
    }

    async fn current_user(&self) -> ApiResult<UserProfile> {
        self.get_json("/users/me").await
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> ApiResult<UserProfile> {
        let response = self
            .send(self.client.put(self.url("/users/me/profile")).json(update))
            .await?;
        Self::parse(response).await
    }

    async fn my_skills(&self) -> ApiResult<UserSkills> {
        self.get_json("/users/me/skills/").await
    }

    async fn skill_catalog(&self) -> ApiResult<Vec<Skill>> {
        self.get_json("/skills/").await
    }

    async fn search_skills(&self, query: &str) -> ApiResult<Vec<Skill>> {
        let builder = self.client.get(self.url("/skills/search")).query(&[("query", query)]);
        let response = self.send(builder).await?;
        Self::parse(response).await
    }

    async fn get_or_create_skill(&self, skill_name: &str) -> ApiResult<Skill> {
        self.post_json("/skills/get-or-create/", &GetOrCreateSkillRequest { skill_name })
            .await
    }

    async fn add_user_skill(&self, skill_id: SkillId, kind: SkillKind) -> ApiResult<()> {
        self.post_unit("/users/me/skills/", &AddUserSkillRequest { skill_id, kind })
            .await
    }

    async fn remove_user_skill(&self, skill_id: SkillId) -> ApiResult<()> {
        self.send(self.client.delete(self.url(&format!("/users/me/skills/{}", skill_id))))
            .await?;
        Ok(())
    }

    async fn matches(&self) -> ApiResult<Vec<Match>> {
        self.get_json("/matches/").await
    }

    async fn delete_match(&self, match_id: MatchId) -> ApiResult<()> {
        self.send(self.client.delete(self.url(&format!("/matches/{}", match_id))))
            .await?;
        Ok(())
    }

    async fn start_trade(&self, match_id: MatchId) -> ApiResult<StartTradeResponse> {
        let response = self
            .send(self.client.post(self.url(&format!("/matches/{}/start-trade", match_id))))
            .await?;
        Self::parse(response).await
    }

    async fn match_trade(&self, match_id: MatchId) -> ApiResult<TradeStatus> {
        self.get_json(&format!("/matches/{}/trade", match_id)).await
    }

    async fn trade_status(&self, match_id: MatchId) -> ApiResult<TradeStatus> {
        self.get_json(&format!("/trades/{}/status", match_id)).await
    }

    async fn update_trade(&self, match_id: MatchId, update: &TradeUpdateRequest) -> ApiResult<TradeStatus> {
        self.post_json(&format!("/trades/{}/update", match_id), update).await
    }

    async fn rate_trade(&self, match_id: MatchId, score: u8) -> ApiResult<()> {
        self.post_unit(&format!("/trades/{}/rate", match_id), &RateRequest { score })
            .await
    }

    async fn complete_trade(&self, match_id: MatchId) -> ApiResult<TradeStatus> {
        let response = self
            .send(self.client.post(self.url(&format!("/trades/{}/complete", match_id))))
            .await?;
        Self::parse(response).await
    }

    async fn report_issue(&self, match_id: MatchId, reported_user_id: UserId, message: &str) -> ApiResult<()> {
        let body = ReportIssueRequest {
            match_id,
            reported_user_id,
            message,
        };
        self.post_unit(&format!("/trades/{}/report-issue", match_id), &body)
            .await
    }

    async fn messages(&self, match_id: MatchId) -> ApiResult<Vec<ChatMessage>> {
        self.get_json(&format!("/matches/{}/messages", match_id)).await
    }

    async fn send_message(&self, match_id: MatchId, message: &str) -> ApiResult<()> {
        self.post_unit(&format!("/matches/{}/messages", match_id), &SendMessageRequest { message })
            .await
    }
}
