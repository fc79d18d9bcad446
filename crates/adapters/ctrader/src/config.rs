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

//! Configuration for cTrader sessions.
//!
//! All durations are expressed in seconds. Every field can be overridden from the environment
//! with [`SessionConfig::from_env`]; values that fail to parse keep their default.

use std::{path::PathBuf, str::FromStr, time::Duration};

use forex_network::{Endpoint, ReconnectBackoff};
use serde::Deserialize;

use crate::common::{
    HostType,
    consts::{CTRADER_PROTOBUF_PORT, DEFAULT_TOKEN_FILE},
};

/// Retry behaviour for a timed request.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Number of resends after the first attempt.
    pub max_attempts: u32,
    /// Delay (seconds) before the next deadline check after a resend.
    pub backoff_secs: f64,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_attempts: u32, backoff_secs: f64) -> Self {
        Self {
            max_attempts,
            backoff_secs: if backoff_secs.is_finite() {
                backoff_secs.max(0.0)
            } else {
                0.0
            },
        }
    }

    /// Returns the retry backoff, or `None` when it is zero.
    #[must_use]
    pub fn backoff(&self) -> Option<Duration> {
        (self.backoff_secs > 0.0).then(|| Duration::from_secs_f64(self.backoff_secs))
    }
}

/// Configuration for a [`TransportSession`](crate::session::TransportSession) and the services
/// built on top of it.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// The cTrader environment to connect to.
    pub host_type: HostType,
    /// The gateway port.
    pub port: u16,
    /// If the gateway connection is wrapped in TLS.
    pub tls: bool,
    /// Optional directory of extra PEM CA certificates to trust.
    pub certs_dir: Option<PathBuf>,
    /// Interval (seconds) between heartbeats sent to the venue.
    pub heartbeat_interval_secs: f64,
    /// Inbound silence (seconds) after which the transport is considered dead.
    pub heartbeat_timeout_secs: f64,
    /// Deadline (seconds) for reaching `AppAuthenticated` after `connect`.
    pub connect_timeout_secs: f64,
    /// Minimum interval (seconds) between "sending heartbeat" log lines.
    pub heartbeat_log_interval_secs: f64,
    /// Base reconnect delay (seconds).
    pub reconnect_delay_secs: f64,
    /// Ceiling on the reconnect delay (seconds).
    pub reconnect_max_delay_secs: f64,
    /// Maximum consecutive reconnect attempts, `0` meaning unlimited.
    pub reconnect_max_attempts: u32,
    /// Symmetric jitter ratio applied to reconnect delays.
    pub reconnect_jitter_ratio: f64,
    /// If the transport reconnects automatically after losing the connection.
    pub auto_reconnect: bool,
    /// Default deadline (seconds) for downstream requests.
    pub request_timeout_secs: f64,
    /// Deadline (seconds) for account authentication.
    pub oauth_timeout_secs: f64,
    /// Resends allowed after a request deadline passes, `0` disabling retries.
    pub retry_max_attempts: u32,
    /// Delay (seconds) before re-checking a resent request.
    pub retry_backoff_secs: f64,
    /// Path of the persisted OAuth token file.
    pub token_file: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host_type: HostType::Demo,
            port: CTRADER_PROTOBUF_PORT,
            tls: true,
            certs_dir: None,
            heartbeat_interval_secs: 10.0,
            heartbeat_timeout_secs: 30.0,
            connect_timeout_secs: 30.0,
            heartbeat_log_interval_secs: 60.0,
            reconnect_delay_secs: 3.0,
            reconnect_max_delay_secs: 60.0,
            reconnect_max_attempts: 0,
            reconnect_jitter_ratio: 0.15,
            auto_reconnect: true,
            request_timeout_secs: 15.0,
            oauth_timeout_secs: 15.0,
            retry_max_attempts: 0,
            retry_backoff_secs: 2.0,
            token_file: PathBuf::from(DEFAULT_TOKEN_FILE),
        }
    }
}

impl SessionConfig {
    /// Creates a configuration from defaults overridden by `CTRADER_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides resolved through `lookup`, which maps a variable name to its value.
    ///
    /// Unless overridden explicitly, the connect timeout follows the heartbeat timeout with a
    /// floor of 10 seconds.
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        override_parsed(&lookup, "CTRADER_HOST_TYPE", &mut self.host_type);
        override_parsed(
            &lookup,
            "CTRADER_HEARTBEAT_INTERVAL",
            &mut self.heartbeat_interval_secs,
        );
        override_parsed(
            &lookup,
            "CTRADER_HEARTBEAT_TIMEOUT",
            &mut self.heartbeat_timeout_secs,
        );
        self.connect_timeout_secs = self.heartbeat_timeout_secs.max(10.0);
        override_parsed(
            &lookup,
            "CTRADER_CONNECT_TIMEOUT",
            &mut self.connect_timeout_secs,
        );
        override_parsed(
            &lookup,
            "CTRADER_HEARTBEAT_LOG_INTERVAL",
            &mut self.heartbeat_log_interval_secs,
        );
        override_parsed(&lookup, "CTRADER_REQUEST_TIMEOUT", &mut self.request_timeout_secs);
        override_parsed(&lookup, "CTRADER_OAUTH_TIMEOUT", &mut self.oauth_timeout_secs);
        override_parsed(&lookup, "CTRADER_RECONNECT_DELAY", &mut self.reconnect_delay_secs);
        override_parsed(
            &lookup,
            "CTRADER_RECONNECT_MAX_DELAY",
            &mut self.reconnect_max_delay_secs,
        );
        override_parsed(
            &lookup,
            "CTRADER_RECONNECT_MAX_ATTEMPTS",
            &mut self.reconnect_max_attempts,
        );
        override_parsed(
            &lookup,
            "CTRADER_RECONNECT_JITTER_RATIO",
            &mut self.reconnect_jitter_ratio,
        );
        if let Some(value) = lookup("CTRADER_AUTO_RECONNECT") {
            self.auto_reconnect = parse_bool(&value);
        }
        override_parsed(&lookup, "CTRADER_RETRY_MAX_ATTEMPTS", &mut self.retry_max_attempts);
        override_parsed(
            &lookup,
            "CTRADER_RETRY_BACKOFF_SECONDS",
            &mut self.retry_backoff_secs,
        );
        if let Some(dir) = lookup("CTRADER_CERTS_DIR").filter(|d| !d.trim().is_empty()) {
            self.certs_dir = Some(PathBuf::from(dir.trim()));
        }
        if let Some(path) = lookup("TOKEN_FILE").filter(|p| !p.trim().is_empty()) {
            self.token_file = PathBuf::from(path.trim());
        }
        self
    }

    /// Returns the request retry policy, or `None` when retries are disabled.
    #[must_use]
    pub fn retry_policy(&self) -> Option<RetryPolicy> {
        (self.retry_max_attempts > 0)
            .then(|| RetryPolicy::new(self.retry_max_attempts, self.retry_backoff_secs))
    }

    #[must_use]
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.host_type.host(), self.port, self.tls)
    }

    #[must_use]
    pub fn reconnect_backoff(&self) -> ReconnectBackoff {
        ReconnectBackoff::new(
            self.reconnect_delay_secs,
            self.reconnect_max_delay_secs,
            self.reconnect_jitter_ratio,
        )
    }

    #[must_use]
    pub fn heartbeat_interval(&self) -> Duration {
        secs_to_duration(self.heartbeat_interval_secs)
    }

    #[must_use]
    pub fn heartbeat_timeout(&self) -> Duration {
        secs_to_duration(self.heartbeat_timeout_secs)
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        secs_to_duration(self.connect_timeout_secs)
    }

    #[must_use]
    pub fn heartbeat_log_interval(&self) -> Duration {
        secs_to_duration(self.heartbeat_log_interval_secs)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        secs_to_duration(self.request_timeout_secs)
    }

    #[must_use]
    pub fn oauth_timeout(&self) -> Duration {
        secs_to_duration(self.oauth_timeout_secs)
    }
}

/// Converts seconds to a [`Duration`], mapping negative or non-finite values to zero.
#[must_use]
pub fn secs_to_duration(secs: f64) -> Duration {
    if secs.is_finite() && secs > 0.0 {
        Duration::from_secs_f64(secs)
    } else {
        Duration::ZERO
    }
}

fn override_parsed<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    target: &mut T,
) {
    let Some(raw) = lookup(key) else {
        return;
    };

    match raw.trim().parse::<T>() {
        Ok(value) => *target = value,
        Err(_) => tracing::warn!("Ignoring unparsable value for {key}: {raw:?}"),
    }
}

fn parse_bool(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rstest::rstest;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[rstest]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.heartbeat_interval(), Duration::from_secs(10));
        assert_eq!(config.connect_timeout(), Duration::from_secs(30));
        assert_eq!(config.endpoint(), Endpoint::new("demo.ctraderapi.com", 5035, true));
        assert!(config.auto_reconnect);
        assert!(config.retry_policy().is_none());
    }

    #[rstest]
    fn test_overrides_apply_and_connect_timeout_follows_heartbeat() {
        let config = SessionConfig::default().with_overrides(lookup_from(&[
            ("CTRADER_HOST_TYPE", "live"),
            ("CTRADER_HEARTBEAT_TIMEOUT", "45"),
            ("CTRADER_RECONNECT_MAX_ATTEMPTS", "5"),
            ("CTRADER_RETRY_MAX_ATTEMPTS", "2"),
            ("CTRADER_RETRY_BACKOFF_SECONDS", "1.5"),
            ("TOKEN_FILE", "/tmp/tokens.json"),
        ]));

        assert_eq!(config.host_type, HostType::Live);
        assert_eq!(config.connect_timeout_secs, 45.0);
        assert_eq!(config.reconnect_max_attempts, 5);
        assert_eq!(config.retry_policy(), Some(RetryPolicy::new(2, 1.5)));
        assert_eq!(config.token_file, PathBuf::from("/tmp/tokens.json"));
    }

    #[rstest]
    fn test_connect_timeout_floor_and_explicit_override() {
        let config = SessionConfig::default()
            .with_overrides(lookup_from(&[("CTRADER_HEARTBEAT_TIMEOUT", "4")]));
        assert_eq!(config.connect_timeout_secs, 10.0);

        let config = SessionConfig::default().with_overrides(lookup_from(&[
            ("CTRADER_HEARTBEAT_TIMEOUT", "4"),
            ("CTRADER_CONNECT_TIMEOUT", "6"),
        ]));
        assert_eq!(config.connect_timeout_secs, 6.0);
    }

    #[rstest]
    fn test_unparsable_values_keep_defaults() {
        let config = SessionConfig::default().with_overrides(lookup_from(&[
            ("CTRADER_HEARTBEAT_INTERVAL", "fast"),
            ("CTRADER_HOST_TYPE", "staging"),
            ("CTRADER_RECONNECT_MAX_ATTEMPTS", "-1"),
        ]));
        assert_eq!(config.heartbeat_interval_secs, 10.0);
        assert_eq!(config.host_type, HostType::Demo);
        assert_eq!(config.reconnect_max_attempts, 0);
    }

    #[rstest]
    #[case("0", false)]
    #[case("false", false)]
    #[case("NO", false)]
    #[case(" off ", false)]
    #[case("1", true)]
    #[case("yes", true)]
    fn test_auto_reconnect_bool_parsing(#[case] raw: &str, #[case] expected: bool) {
        let config = SessionConfig::default()
            .with_overrides(lookup_from(&[("CTRADER_AUTO_RECONNECT", raw)]));
        assert_eq!(config.auto_reconnect, expected);
    }

    #[rstest]
    fn test_retry_policy_clamps_negative_backoff() {
        let policy = RetryPolicy::new(3, -2.0);
        assert_eq!(policy.backoff_secs, 0.0);
        assert!(policy.backoff().is_none());
    }

    #[rstest]
    fn test_deserialize_partial_config() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"host_type": "live", "retry_max_attempts": 1}"#).unwrap();
        assert_eq!(config.host_type, HostType::Live);
        assert_eq!(config.heartbeat_timeout_secs, 30.0);
        assert!(config.retry_policy().is_some());
    }
}
