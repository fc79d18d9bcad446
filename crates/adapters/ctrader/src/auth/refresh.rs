// -------------------------------------------------------------------------------------------------
//  Copyright (C) 2015-2026 Nautech Systems Pty Ltd. All rights reserved.
//  https://nautechsystems.io
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  You may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
// -------------------------------------------------------------------------------------------------

//! Refreshing expired OAuth access tokens.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;

use crate::common::{
    consts::CTRADER_TOKEN_URL,
    credential::{Credentials, Tokens},
};

/// Exchanges a refresh token for a new set of tokens.
#[async_trait(?Send)]
pub trait TokenRefresher {
    /// Refreshes the tokens, carrying `account_id` over into the result.
    async fn refresh(&self, refresh_token: &str, account_id: Option<i64>)
    -> anyhow::Result<Tokens>;
}

/// [`TokenRefresher`] calling the cTrader OAuth token endpoint.
pub struct HttpTokenRefresher {
    client: reqwest::Client,
    credentials: Credentials,
    token_url: String,
}

impl std::fmt::Debug for HttpTokenRefresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(HttpTokenRefresher))
            .field("credentials", &self.credentials)
            .field("token_url", &self.token_url)
            .finish()
    }
}

impl HttpTokenRefresher {
    /// Creates a new [`HttpTokenRefresher`] for the default token endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(credentials: Credentials, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            credentials,
            token_url: CTRADER_TOKEN_URL.to_string(),
        })
    }

    #[must_use]
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }
}

#[async_trait(?Send)]
impl TokenRefresher for HttpTokenRefresher {
    async fn refresh(
        &self,
        refresh_token: &str,
        account_id: Option<i64>,
    ) -> anyhow::Result<Tokens> {
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.credentials.client_id()),
            ("client_secret", self.credentials.client_secret()),
        ];

        let response = self
            .client
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .context("token refresh request failed")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("failed to read token refresh response")?;

        if !status.is_success() {
            anyhow::bail!("token refresh failed with HTTP {status}: {body}");
        }

        parse_token_response(&body, account_id, chrono::Utc::now().timestamp())
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(alias = "accessToken")]
    access_token: Option<String>,
    #[serde(alias = "refreshToken")]
    refresh_token: Option<String>,
    #[serde(alias = "expiresIn")]
    expires_in: Option<i64>,
    error: Option<String>,
    #[serde(alias = "errorDescription")]
    error_description: Option<String>,
    description: Option<String>,
}

/// Parses a token endpoint response body received at `now_secs`.
///
/// # Errors
///
/// Returns an error if the body is not JSON, carries an `error` field, or has no access token.
pub fn parse_token_response(
    body: &str,
    account_id: Option<i64>,
    now_secs: i64,
) -> anyhow::Result<Tokens> {
    let response: TokenResponse =
        serde_json::from_str(body).context("invalid token refresh response")?;

    if let Some(error) = response.error.filter(|e| !e.is_empty()) {
        let description = response
            .error_description
            .or(response.description)
            .unwrap_or_default();
        anyhow::bail!("token refresh rejected: {error} {description}");
    }

    let access_token = response
        .access_token
        .filter(|t| !t.is_empty())
        .context("token refresh response has no access token")?;

    Ok(Tokens::new(
        access_token,
        response.refresh_token.unwrap_or_default(),
        response.expires_in.map(|secs| now_secs + secs),
        account_id,
    ))
}
