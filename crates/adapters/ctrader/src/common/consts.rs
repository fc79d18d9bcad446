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

//! Core constants for the cTrader adapter.

use std::time::Duration;

/// Venue identifier string.
pub const CTRADER: &str = "CTRADER";

// Gateway hosts
pub const CTRADER_DEMO_HOST: &str = "demo.ctraderapi.com";
pub const CTRADER_LIVE_HOST: &str = "live.ctraderapi.com";
pub const CTRADER_PROTOBUF_PORT: u16 = 5035;

// OAuth
pub const CTRADER_TOKEN_URL: &str = "https://openapi.ctrader.com/apps/token";

// Common payload types
pub const PAYLOAD_COMMON_ERROR_RES: u32 = 50;
pub const PAYLOAD_HEARTBEAT_EVENT: u32 = 51;

// Open API payload types
pub const PAYLOAD_APPLICATION_AUTH_REQ: u32 = 2100;
pub const PAYLOAD_APPLICATION_AUTH_RES: u32 = 2101;
pub const PAYLOAD_ACCOUNT_AUTH_REQ: u32 = 2102;
pub const PAYLOAD_ACCOUNT_AUTH_RES: u32 = 2103;
pub const PAYLOAD_SYMBOLS_LIST_REQ: u32 = 2114;
pub const PAYLOAD_SYMBOLS_LIST_RES: u32 = 2115;
pub const PAYLOAD_SPOT_EVENT: u32 = 2131;
pub const PAYLOAD_SYMBOL_CHANGED_EVENT: u32 = 2120;
pub const PAYLOAD_UNSUBSCRIBE_SPOTS_RES: u32 = 2130;
pub const PAYLOAD_OA_ERROR_RES: u32 = 2142;
pub const PAYLOAD_ACCOUNTS_TOKEN_INVALIDATED_EVENT: u32 = 2147;
pub const PAYLOAD_ACCOUNT_LOGOUT_REQ: u32 = 2162;
pub const PAYLOAD_ACCOUNT_LOGOUT_RES: u32 = 2163;
pub const PAYLOAD_ACCOUNT_DISCONNECT_EVENT: u32 = 2164;

/// Push payloads that are acknowledged silently when no handler claims them.
pub const NOISE_PAYLOAD_TYPES: [u32; 4] = [2113, 2125, 2138, 2166];

/// Returns `true` if `payload_type` is a known push payload nobody needs to see.
#[must_use]
pub fn is_noise_payload(payload_type: u32) -> bool {
    NOISE_PAYLOAD_TYPES.contains(&payload_type)
}

// Application auth send retries
pub const APP_AUTH_RETRY_LIMIT: u32 = 2;
pub const APP_AUTH_RETRY_DELAY: Duration = Duration::from_secs(2);

// Send failure streak handling
pub const SEND_FAILURE_STREAK_LIMIT: u32 = 6;
pub const SEND_FAILURE_STREAK_WINDOW: Duration = Duration::from_secs(20);

/// Seconds before token expiry at which the token is already treated as expired.
pub const TOKEN_EXPIRY_LEEWAY_SECS: i64 = 60;

/// Number of log lines retained for replay to late-attaching listeners.
pub const LOG_HISTORY_CAPACITY: usize = 500;

pub const DEFAULT_TOKEN_FILE: &str = "token.json";
