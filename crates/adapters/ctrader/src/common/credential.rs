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

//! Application credentials and OAuth tokens, with their JSON file persistence.
//!
//! Both records are stored as JSON objects. Saving merges into whatever object is already in
//! the file, so unrelated keys written by other tools survive, and restricts the file to
//! owner read/write on unix.

use std::{
    fmt::Debug,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde_json::{Map, Value};
use thiserror::Error;
use zeroize::ZeroizeOnDrop;

use super::{consts::TOKEN_EXPIRY_LEEWAY_SECS, enums::HostType};

/// Errors raised while loading or saving credential files.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Expected a JSON object in {0}")]
    NotAnObject(PathBuf),
    #[error("Invalid host type in credentials file: {0}")]
    InvalidHostType(String),
}

/// Application credentials proving the client application may use the API.
#[derive(Clone, PartialEq, Eq, ZeroizeOnDrop)]
pub struct Credentials {
    #[zeroize(skip)]
    host: HostType,
    client_id: Box<str>,
    client_secret: Box<str>,
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(Credentials))
            .field("host", &self.host)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Creates a new [`Credentials`] instance.
    #[must_use]
    pub fn new(
        host: HostType,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            host,
            client_id: client_id.into().into_boxed_str(),
            client_secret: client_secret.into().into_boxed_str(),
        }
    }

    #[must_use]
    pub const fn host(&self) -> HostType {
        self.host
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Returns the client secret.
    ///
    /// The secret should be handled carefully and never logged or exposed.
    #[must_use]
    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    /// Loads credentials from the JSON file at `path`.
    ///
    /// A missing `host_type` defaults to `demo`, missing ids default to empty strings.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or unreadable, is not a JSON object, or names a
    /// host type other than `demo` or `live`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CredentialError> {
        let data = read_json_file(path.as_ref())?;

        let host_type = data
            .get("host_type")
            .and_then(Value::as_str)
            .unwrap_or("demo");
        let host = HostType::from_str(host_type)
            .map_err(|_| CredentialError::InvalidHostType(host_type.to_string()))?;

        Ok(Self::new(
            host,
            string_field(&data, "client_id"),
            string_field(&data, "client_secret"),
        ))
    }

    /// Saves the credentials to `path`, merging into any JSON object already there.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CredentialError> {
        let path = path.as_ref();
        let mut data = read_json_object_or_empty(path);
        data.insert("host_type".into(), Value::from(self.host.as_ref()));
        data.insert("client_id".into(), Value::from(self.client_id()));
        data.insert("client_secret".into(), Value::from(self.client_secret()));
        write_json_file(path, data)
    }
}

/// OAuth tokens binding a trading account to the application session.
#[derive(Clone, Default, PartialEq, Eq, ZeroizeOnDrop)]
pub struct Tokens {
    pub access_token: String,
    pub refresh_token: String,
    /// Expiry as a unix timestamp in seconds.
    pub expires_at: Option<i64>,
    pub account_id: Option<i64>,
}

impl Debug for Tokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(Tokens))
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("account_id", &self.account_id)
            .finish()
    }
}

impl Tokens {
    /// Creates a new [`Tokens`] instance.
    #[must_use]
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_at: Option<i64>,
        account_id: Option<i64>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_at,
            account_id,
        }
    }

    /// Returns `true` if the access token expires within `leeway_secs` from now.
    ///
    /// Tokens without a known expiry are never considered expired.
    #[must_use]
    pub fn is_expired(&self, leeway_secs: i64) -> bool {
        self.is_expired_at(chrono::Utc::now().timestamp(), leeway_secs)
    }

    /// Same as [`Tokens::is_expired`] with the default leeway.
    #[must_use]
    pub fn is_expired_default(&self) -> bool {
        self.is_expired(TOKEN_EXPIRY_LEEWAY_SECS)
    }

    /// Returns `true` if the access token expires within `leeway_secs` of `now_secs`.
    #[must_use]
    pub fn is_expired_at(&self, now_secs: i64, leeway_secs: i64) -> bool {
        self.expires_at
            .is_some_and(|expiry| now_secs >= expiry - leeway_secs.max(0))
    }

    /// Returns the seconds remaining until expiry (floored at zero), or `None` if unknown.
    #[must_use]
    pub fn seconds_to_expiry(&self) -> Option<i64> {
        let now = chrono::Utc::now().timestamp();
        self.expires_at.map(|expiry| (expiry - now).max(0))
    }

    #[must_use]
    pub fn has_refresh_token(&self) -> bool {
        !self.refresh_token.is_empty()
    }

    /// Loads tokens from the JSON file at `path`.
    ///
    /// `expires_at` and `account_id` may be stored as numbers or numeric strings.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or unreadable, or is not a JSON object.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CredentialError> {
        let data = read_json_file(path.as_ref())?;

        Ok(Self::new(
            string_field(&data, "access_token"),
            string_field(&data, "refresh_token"),
            i64_field(&data, "expires_at"),
            i64_field(&data, "account_id"),
        ))
    }

    /// Saves the tokens to `path`, merging into any JSON object already there.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CredentialError> {
        let path = path.as_ref();
        let mut data = read_json_object_or_empty(path);
        data.insert("access_token".into(), Value::from(self.access_token.as_str()));
        data.insert(
            "refresh_token".into(),
            Value::from(self.refresh_token.as_str()),
        );
        data.insert("expires_at".into(), Value::from(self.expires_at));
        data.insert("account_id".into(), Value::from(self.account_id));
        write_json_file(path, data)
    }
}

fn read_json_file(path: &Path) -> Result<Map<String, Value>, CredentialError> {
    if !path.exists() {
        return Err(CredentialError::NotFound(path.to_path_buf()));
    }

    let contents = std::fs::read_to_string(path)?;
    match serde_json::from_str::<Value>(&contents)? {
        Value::Object(map) => Ok(map),
        _ => Err(CredentialError::NotAnObject(path.to_path_buf())),
    }
}

fn read_json_object_or_empty(path: &Path) -> Map<String, Value> {
    read_json_file(path).unwrap_or_default()
}

fn write_json_file(path: &Path, data: Map<String, Value>) -> Result<(), CredentialError> {
    let contents = serde_json::to_string_pretty(&Value::Object(data))?;
    std::fs::write(path, contents)?;
    restrict_permissions(path);
    Ok(())
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    if let Err(e) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)) {
        tracing::warn!("Failed to restrict permissions on {path:?}: {e}");
    }
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) {}

fn string_field(data: &Map<String, Value>, key: &str) -> String {
    data.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn i64_field(data: &Map<String, Value>, key: &str) -> Option<i64> {
    match data.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
