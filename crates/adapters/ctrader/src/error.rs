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

//! Error taxonomy for the cTrader session engine and venue error code classification.

use std::str::FromStr;

use forex_network::TransportError;
use strum::{AsRefStr, Display, EnumIter, EnumString, FromRepr, IntoStaticStr};
use thiserror::Error;

use crate::common::CredentialError;

/// Broad category of a [`BrokerError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, AsRefStr, Display, EnumIter, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum ErrorCode {
    /// Connection, socket or send failures.
    Network,
    /// Application or account authentication failures, including unmet auth preconditions.
    Auth,
    /// A request did not complete within its deadline.
    Timeout,
    /// Caller supplied input was rejected before anything was sent.
    Validation,
    /// The venue rejected a request.
    Provider,
}

/// An error surfaced through a service's `on_error` callback.
///
/// Displays as `[CODE] message` or `[CODE] message (detail)`.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("[{code}] {message}{}", .detail.as_ref().map(|d| format!(" ({d})")).unwrap_or_default())]
pub struct BrokerError {
    pub code: ErrorCode,
    pub message: String,
    pub detail: Option<String>,
}

impl BrokerError {
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            detail: None,
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Network, message)
    }

    #[must_use]
    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Auth, message)
    }

    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Timeout, message)
    }

    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Validation, message)
    }

    #[must_use]
    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Provider, message)
    }

    /// Creates an error of category `code` describing a venue error response.
    #[must_use]
    pub fn from_venue(code: ErrorCode, error_code: &str, description: &str) -> Self {
        Self::new(code, format_venue_error(error_code, description))
    }
}

impl From<TransportError> for BrokerError {
    fn from(error: TransportError) -> Self {
        Self::network("Send failed").with_detail(error.to_string())
    }
}

impl From<CredentialError> for BrokerError {
    fn from(error: CredentialError) -> Self {
        Self::validation("Credential file error").with_detail(error.to_string())
    }
}

/// A type alias for results carrying a [`BrokerError`].
pub type BrokerResult<T> = Result<T, BrokerError>;

/// Known venue error codes.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    AsRefStr,
    Display,
    EnumIter,
    EnumString,
    FromRepr,
    IntoStaticStr,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u16)]
pub enum CTraderErrorCode {
    OaAuthTokenExpired = 1,
    AccountNotAuthorized = 2,
    ChClientAuthFailure = 101,
    ChClientNotAuthenticated = 102,
    ChClientAlreadyAuthenticated = 103,
    ChAccessTokenInvalid = 104,
}

impl CTraderErrorCode {
    /// Parses a venue error code given either numerically (`"104"`) or by name.
    #[must_use]
    pub fn parse(code: &str) -> Option<Self> {
        let code = code.trim();
        match code.parse::<u16>() {
            Ok(numeric) => Self::from_repr(numeric),
            Err(_) => Self::from_str(code).ok(),
        }
    }

    /// Returns `true` for codes meaning the access token is invalid or expired.
    #[must_use]
    pub const fn is_invalid_token(self) -> bool {
        matches!(
            self,
            Self::OaAuthTokenExpired | Self::AccountNotAuthorized | Self::ChAccessTokenInvalid
        )
    }
}

/// Returns the symbolic name of a known venue error code.
#[must_use]
pub fn describe_error_code(code: &str) -> Option<&'static str> {
    CTraderErrorCode::parse(code).map(Into::into)
}

/// Formats a venue error as `Error <code>(<NAME>): <description>`.
///
/// The name is omitted when the code is unknown or already given by name.
#[must_use]
pub fn format_venue_error(code: &str, description: &str) -> String {
    let code = code.trim();
    let description = if description.is_empty() {
        "Unknown error"
    } else {
        description
    };

    match describe_error_code(code) {
        Some(name) if name != code => format!("Error {code}({name}): {description}"),
        _ => format!("Error {code}: {description}"),
    }
}

/// Returns `true` if `code` belongs to the invalid/expired token class.
#[must_use]
pub fn is_invalid_token_error(code: &str) -> bool {
    CTraderErrorCode::parse(code).is_some_and(CTraderErrorCode::is_invalid_token)
}

/// Returns `true` for an "already subscribed" rejection.
#[must_use]
pub fn is_already_subscribed(code: &str, description: &str) -> bool {
    code.to_ascii_uppercase().contains("ALREADY_SUBSCRIBED")
        || description.to_ascii_uppercase().contains("ALREADY_SUBSCRIBED")
}

/// Returns `true` for the rejection of an unsubscribe from something never subscribed.
#[must_use]
pub fn is_not_subscribed_unsubscribe(code: &str, description: &str) -> bool {
    code.trim().eq_ignore_ascii_case("INVALID_REQUEST")
        && description.to_ascii_lowercase().contains("not subscribed")
}

/// Returns `true` for subscription errors that need no user-visible handling.
#[must_use]
pub fn is_benign_subscription_error(code: &str, description: &str) -> bool {
    is_already_subscribed(code, description) || is_not_subscribed_unsubscribe(code, description)
}
