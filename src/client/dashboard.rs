//! Dashboard client over reqwest
//!
//! Every session gets its own HTTP client and cookie jar, so a re-login
//! never inherits cookies from a session the dashboard already revoked.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client as HttpClient, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};

use super::html;
use super::rate_limit::{Endpoint, RateLimiterSet};
use super::{AuthApi, DetailApi, ListingApi, Session};
use crate::config::DashboardConfig;
use crate::error::{ApiError, Result};
use crate::models::{Range, RawMessage};

/// Timeout for the login page GET
const PAGE_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for every form POST
const POST_TIMEOUT: Duration = Duration::from_secs(30);

/// Laravel's "page expired" status, returned for a stale anti-forgery token
const STATUS_PAGE_EXPIRED: u16 = 419;

const BROWSER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// reqwest-backed implementation of the dashboard API
pub struct DashboardClient {
    base_url: String,
    email: String,
    password: SecretString,
    rate_limits: RateLimiterSet,
}

impl DashboardClient {
    pub fn new(config: &DashboardConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            email: config.email.clone(),
            password: config.password.clone(),
            rate_limits: RateLimiterSet::new(),
        }
    }

    fn url(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }

    fn build_http() -> Result<HttpClient> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_AGENT));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,*/*;q=0.8"),
        );

        HttpClient::builder()
            .cookie_store(true)
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()).into())
    }

    /// GET the login page and read the anti-forgery token from it.
    async fn fetch_token(&self, http: &HttpClient) -> Result<String> {
        self.rate_limits.wait_for(Endpoint::Login).await;

        let response = http
            .get(self.url(Endpoint::Login))
            .timeout(PAGE_TIMEOUT)
            .send()
            .await
            .map_err(ApiError::from)?;

        let response = self.check_status(Endpoint::Login, response).await?;
        let body = response.text().await.map_err(ApiError::from)?;

        html::extract_token(&body)
            .ok_or_else(|| ApiError::MissingToken(Endpoint::Login.path().to_string()).into())
    }

    /// Map non-success statuses to typed errors, activating pacing on 429.
    async fn check_status(&self, endpoint: Endpoint, response: Response) -> Result<Response> {
        let status = response.status();
        match status {
            status if status.is_success() => Ok(response),
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized.into()),
            status if status.as_u16() == STATUS_PAGE_EXPIRED => Err(ApiError::Unauthorized.into()),
            StatusCode::TOO_MANY_REQUESTS => {
                warn!("{} answered 429, pacing further calls", endpoint.path());
                self.rate_limits.activate(endpoint).await;
                Err(ApiError::RateLimited.into())
            }
            status if status.is_server_error() => {
                let error_msg = response
                    .text()
                    .await
                    .ok()
                    .filter(|text| !text.trim().is_empty())
                    .unwrap_or_else(|| format!("Server error: {}", status));
                Err(ApiError::ServerError(error_msg).into())
            }
            _ => Err(ApiError::InvalidResponse(format!("Unexpected status code: {}", status)).into()),
        }
    }

    /// POST an authenticated form and return the response body.
    async fn post_form(
        &self,
        session: &Session,
        endpoint: Endpoint,
        fields: &[(&str, &str)],
    ) -> Result<String> {
        self.rate_limits.wait_for(endpoint).await;

        let mut form = vec![("_token", session.token())];
        form.extend_from_slice(fields);

        debug!("POST {}", endpoint.path());
        let response = session
            .http()
            .post(self.url(endpoint))
            .timeout(POST_TIMEOUT)
            .header("X-CSRF-TOKEN", session.token())
            .header("X-Requested-With", "XMLHttpRequest")
            .form(&form)
            .send()
            .await
            .map_err(ApiError::from)?;

        let response = self.check_status(endpoint, response).await?;

        // An expired session is silently redirected back to the login form
        if endpoint != Endpoint::Login && response.url().path().ends_with(Endpoint::Login.path()) {
            return Err(ApiError::Unauthorized.into());
        }

        response
            .text()
            .await
            .map_err(|e| ApiError::from(e).into())
    }
}

#[async_trait]
impl AuthApi for DashboardClient {
    async fn login(&self) -> Result<Session> {
        let http = Self::build_http()?;
        let token = self.fetch_token(&http).await?;

        self.rate_limits.wait_for(Endpoint::Login).await;
        let response = http
            .post(self.url(Endpoint::Login))
            .timeout(POST_TIMEOUT)
            .form(&[
                ("_token", token.as_str()),
                ("email", self.email.as_str()),
                ("password", self.password.expose_secret()),
            ])
            .send()
            .await
            .map_err(ApiError::from)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            self.rate_limits.activate(Endpoint::Login).await;
            return Err(ApiError::RateLimited.into());
        }
        if !status.is_success() {
            return Err(ApiError::LoginRejected(format!("HTTP {}", status)).into());
        }

        let landed = response.url().path().to_string();
        let body = response.text().await.map_err(ApiError::from)?;

        let reached_portal = landed.contains("dashboard") || landed.contains("portal");
        if !reached_portal && html::has_login_form(&body) {
            return Err(ApiError::LoginRejected("credentials not accepted".to_string()).into());
        }

        // The dashboard rotates the token on login
        let token = match html::extract_token(&body) {
            Some(fresh) => fresh,
            None => self.fetch_token(&http).await.unwrap_or(token),
        };

        debug!("Dashboard session established (landed on {})", landed);
        Ok(Session::new(http, token))
    }
}

#[async_trait]
impl ListingApi for DashboardClient {
    async fn list_ranges(&self, session: &Session) -> Result<Vec<Range>> {
        let body = self
            .post_form(session, Endpoint::Ranges, &[("from", ""), ("to", "")])
            .await?;
        Ok(html::parse_ranges(&body))
    }

    async fn list_numbers(&self, session: &Session, range: &Range) -> Result<Vec<String>> {
        let body = self
            .post_form(
                session,
                Endpoint::Numbers,
                &[("start", ""), ("end", ""), ("range", range.label.as_str())],
            )
            .await?;
        Ok(html::parse_numbers(&body))
    }
}

#[async_trait]
impl DetailApi for DashboardClient {
    async fn fetch_detail(
        &self,
        session: &Session,
        number: &str,
        range: &Range,
    ) -> Result<RawMessage> {
        let body = self
            .post_form(
                session,
                Endpoint::Details,
                &[
                    ("start", ""),
                    ("end", ""),
                    ("Number", number),
                    ("Range", range.label.as_str()),
                ],
            )
            .await?;
        Ok(html::parse_detail(&body, number, &range.label))
    }
}
