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

//! Protobuf payloads of the cTrader Open API used by the session engine.
//!
//! Field tags follow the venue's `OpenApiMessages.proto` and `OpenApiCommonMessages.proto`.
//! Every payload repeats its payload type in field 1.

use forex_network::ProtoMessage;
use prost::Message;

use crate::common::consts::{
    PAYLOAD_ACCOUNT_AUTH_REQ, PAYLOAD_ACCOUNT_AUTH_RES, PAYLOAD_ACCOUNT_DISCONNECT_EVENT,
    PAYLOAD_ACCOUNT_LOGOUT_REQ, PAYLOAD_ACCOUNT_LOGOUT_RES,
    PAYLOAD_ACCOUNTS_TOKEN_INVALIDATED_EVENT, PAYLOAD_APPLICATION_AUTH_REQ,
    PAYLOAD_APPLICATION_AUTH_RES, PAYLOAD_COMMON_ERROR_RES, PAYLOAD_HEARTBEAT_EVENT,
    PAYLOAD_OA_ERROR_RES, PAYLOAD_SYMBOLS_LIST_REQ, PAYLOAD_SYMBOLS_LIST_RES,
};

/// A payload message with a fixed payload type.
pub trait Payload: Message + Default + Sized {
    const PAYLOAD_TYPE: u32;

    /// Wraps the payload in an envelope.
    fn to_message(&self) -> ProtoMessage {
        ProtoMessage::from_payload(Self::PAYLOAD_TYPE, self)
    }

    /// Decodes the payload from `message`, or `None` if the payload type differs or the bytes
    /// are malformed.
    fn from_message(message: &ProtoMessage) -> Option<Self> {
        if message.payload_type != Self::PAYLOAD_TYPE {
            return None;
        }
        match message.decode_payload::<Self>() {
            Ok(payload) => Some(payload),
            Err(e) => {
                tracing::warn!(
                    "Failed to decode payload type {}: {e}",
                    message.payload_type
                );
                None
            }
        }
    }
}

macro_rules! impl_payload {
    ($ty:ty, $payload_type:expr) => {
        impl Payload for $ty {
            const PAYLOAD_TYPE: u32 = $payload_type;
        }
    };
}

#[derive(Clone, PartialEq, Message)]
pub struct ApplicationAuthReq {
    #[prost(uint32, optional, tag = "1")]
    pub payload_type: Option<u32>,
    #[prost(string, required, tag = "2")]
    pub client_id: String,
    #[prost(string, required, tag = "3")]
    pub client_secret: String,
}

impl ApplicationAuthReq {
    #[must_use]
    pub fn new(client_id: &str, client_secret: &str) -> Self {
        Self {
            payload_type: Some(PAYLOAD_APPLICATION_AUTH_REQ),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        }
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct ApplicationAuthRes {
    #[prost(uint32, optional, tag = "1")]
    pub payload_type: Option<u32>,
}

#[derive(Clone, PartialEq, Message)]
pub struct AccountAuthReq {
    #[prost(uint32, optional, tag = "1")]
    pub payload_type: Option<u32>,
    #[prost(int64, required, tag = "2")]
    pub ctid_trader_account_id: i64,
    #[prost(string, required, tag = "3")]
    pub access_token: String,
}

impl AccountAuthReq {
    #[must_use]
    pub fn new(account_id: i64, access_token: &str) -> Self {
        Self {
            payload_type: Some(PAYLOAD_ACCOUNT_AUTH_REQ),
            ctid_trader_account_id: account_id,
            access_token: access_token.to_string(),
        }
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct AccountAuthRes {
    #[prost(uint32, optional, tag = "1")]
    pub payload_type: Option<u32>,
    #[prost(int64, required, tag = "2")]
    pub ctid_trader_account_id: i64,
}

/// Open API error response (`ProtoOAErrorRes`).
#[derive(Clone, PartialEq, Message)]
pub struct OaErrorRes {
    #[prost(uint32, optional, tag = "1")]
    pub payload_type: Option<u32>,
    #[prost(int64, optional, tag = "2")]
    pub ctid_trader_account_id: Option<i64>,
    #[prost(string, required, tag = "3")]
    pub error_code: String,
    #[prost(string, optional, tag = "4")]
    pub description: Option<String>,
    #[prost(int64, optional, tag = "5")]
    pub maintenance_end_timestamp: Option<i64>,
}

/// Common error response (`ProtoErrorRes`).
#[derive(Clone, PartialEq, Message)]
pub struct CommonErrorRes {
    #[prost(uint32, optional, tag = "1")]
    pub payload_type: Option<u32>,
    #[prost(string, required, tag = "2")]
    pub error_code: String,
    #[prost(string, optional, tag = "3")]
    pub description: Option<String>,
    #[prost(uint64, optional, tag = "4")]
    pub maintenance_end_timestamp: Option<u64>,
}

#[derive(Clone, PartialEq, Message)]
pub struct HeartbeatEvent {
    #[prost(uint32, optional, tag = "1")]
    pub payload_type: Option<u32>,
}

impl HeartbeatEvent {
    #[must_use]
    pub fn new() -> Self {
        Self {
            payload_type: Some(PAYLOAD_HEARTBEAT_EVENT),
        }
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct AccountLogoutReq {
    #[prost(uint32, optional, tag = "1")]
    pub payload_type: Option<u32>,
    #[prost(int64, required, tag = "2")]
    pub ctid_trader_account_id: i64,
}

impl AccountLogoutReq {
    #[must_use]
    pub fn new(account_id: i64) -> Self {
        Self {
            payload_type: Some(PAYLOAD_ACCOUNT_LOGOUT_REQ),
            ctid_trader_account_id: account_id,
        }
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct AccountLogoutRes {
    #[prost(uint32, optional, tag = "1")]
    pub payload_type: Option<u32>,
    #[prost(int64, required, tag = "2")]
    pub ctid_trader_account_id: i64,
}

#[derive(Clone, PartialEq, Message)]
pub struct AccountDisconnectEvent {
    #[prost(uint32, optional, tag = "1")]
    pub payload_type: Option<u32>,
    #[prost(int64, required, tag = "2")]
    pub ctid_trader_account_id: i64,
}

#[derive(Clone, PartialEq, Message)]
pub struct AccountsTokenInvalidatedEvent {
    #[prost(uint32, optional, tag = "1")]
    pub payload_type: Option<u32>,
    #[prost(int64, repeated, packed = "false", tag = "2")]
    pub ctid_trader_account_ids: Vec<i64>,
    #[prost(string, optional, tag = "3")]
    pub reason: Option<String>,
}

#[derive(Clone, PartialEq, Message)]
pub struct SymbolsListReq {
    #[prost(uint32, optional, tag = "1")]
    pub payload_type: Option<u32>,
    #[prost(int64, required, tag = "2")]
    pub ctid_trader_account_id: i64,
    #[prost(bool, optional, tag = "3")]
    pub include_archived_symbols: Option<bool>,
}

impl SymbolsListReq {
    #[must_use]
    pub fn new(account_id: i64, include_archived: bool) -> Self {
        Self {
            payload_type: Some(PAYLOAD_SYMBOLS_LIST_REQ),
            ctid_trader_account_id: account_id,
            include_archived_symbols: Some(include_archived),
        }
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct LightSymbol {
    #[prost(int64, required, tag = "1")]
    pub symbol_id: i64,
    #[prost(string, optional, tag = "2")]
    pub symbol_name: Option<String>,
    #[prost(bool, optional, tag = "3")]
    pub enabled: Option<bool>,
    #[prost(int64, optional, tag = "4")]
    pub base_asset_id: Option<i64>,
    #[prost(int64, optional, tag = "5")]
    pub quote_asset_id: Option<i64>,
    #[prost(int64, optional, tag = "6")]
    pub symbol_category_id: Option<i64>,
    #[prost(string, optional, tag = "7")]
    pub description: Option<String>,
}

#[derive(Clone, PartialEq, Message)]
pub struct SymbolsListRes {
    #[prost(uint32, optional, tag = "1")]
    pub payload_type: Option<u32>,
    #[prost(int64, required, tag = "2")]
    pub ctid_trader_account_id: i64,
    #[prost(message, repeated, tag = "3")]
    pub symbol: Vec<LightSymbol>,
}

impl_payload!(ApplicationAuthReq, PAYLOAD_APPLICATION_AUTH_REQ);
impl_payload!(ApplicationAuthRes, PAYLOAD_APPLICATION_AUTH_RES);
impl_payload!(AccountAuthReq, PAYLOAD_ACCOUNT_AUTH_REQ);
impl_payload!(AccountAuthRes, PAYLOAD_ACCOUNT_AUTH_RES);
impl_payload!(OaErrorRes, PAYLOAD_OA_ERROR_RES);
impl_payload!(CommonErrorRes, PAYLOAD_COMMON_ERROR_RES);
impl_payload!(HeartbeatEvent, PAYLOAD_HEARTBEAT_EVENT);
impl_payload!(AccountLogoutReq, PAYLOAD_ACCOUNT_LOGOUT_REQ);
impl_payload!(AccountLogoutRes, PAYLOAD_ACCOUNT_LOGOUT_RES);
impl_payload!(AccountDisconnectEvent, PAYLOAD_ACCOUNT_DISCONNECT_EVENT);
impl_payload!(
    AccountsTokenInvalidatedEvent,
    PAYLOAD_ACCOUNTS_TOKEN_INVALIDATED_EVENT
);
impl_payload!(SymbolsListReq, PAYLOAD_SYMBOLS_LIST_REQ);
impl_payload!(SymbolsListRes, PAYLOAD_SYMBOLS_LIST_RES);

/// An error response from either error payload, normalized.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VenueError {
    pub error_code: String,
    pub description: String,
    pub account_id: Option<i64>,
}

impl VenueError {
    /// Extracts the error from an `OA_ERROR_RES` or `COMMON_ERROR_RES` envelope.
    #[must_use]
    pub fn from_message(message: &ProtoMessage) -> Option<Self> {
        match message.payload_type {
            PAYLOAD_OA_ERROR_RES => OaErrorRes::from_message(message).map(|res| Self {
                error_code: res.error_code,
                description: res.description.unwrap_or_default(),
                account_id: res.ctid_trader_account_id,
            }),
            PAYLOAD_COMMON_ERROR_RES => CommonErrorRes::from_message(message).map(|res| Self {
                error_code: res.error_code,
                description: res.description.unwrap_or_default(),
                account_id: None,
            }),
            _ => None,
        }
    }

    /// Returns `true` unless the error names a different account than `account_id`.
    #[must_use]
    pub fn concerns_account(&self, account_id: Option<i64>) -> bool {
        match (self.account_id, account_id) {
            (Some(theirs), Some(ours)) => theirs == ours,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_envelope_carries_payload_type() {
        let message = AccountAuthReq::new(42, "token").to_message();
        assert_eq!(message.payload_type, PAYLOAD_ACCOUNT_AUTH_REQ);

        let decoded = AccountAuthReq::from_message(&message).unwrap();
        assert_eq!(decoded.ctid_trader_account_id, 42);
        assert_eq!(decoded.access_token, "token");
    }

    #[rstest]
    fn test_from_message_rejects_other_payload_types() {
        let message = HeartbeatEvent::new().to_message();
        assert!(AccountAuthRes::from_message(&message).is_none());
    }

    #[rstest]
    fn test_venue_error_from_both_error_payloads() {
        let oa = OaErrorRes {
            payload_type: Some(PAYLOAD_OA_ERROR_RES),
            ctid_trader_account_id: Some(7),
            error_code: "CH_ACCESS_TOKEN_INVALID".to_string(),
            description: Some("Invalid access token".to_string()),
            maintenance_end_timestamp: None,
        }
        .to_message();
        let common = CommonErrorRes {
            payload_type: Some(PAYLOAD_COMMON_ERROR_RES),
            error_code: "101".to_string(),
            description: None,
            maintenance_end_timestamp: None,
        }
        .to_message();

        let oa = VenueError::from_message(&oa).unwrap();
        assert_eq!(oa.account_id, Some(7));
        assert!(oa.concerns_account(Some(7)));
        assert!(!oa.concerns_account(Some(8)));

        let common = VenueError::from_message(&common).unwrap();
        assert_eq!(common.error_code, "101");
        assert_eq!(common.description, "");
        assert!(common.concerns_account(Some(8)));
    }

    #[rstest]
    fn test_symbols_list_response_decodes_symbols() {
        let response = SymbolsListRes {
            payload_type: Some(PAYLOAD_SYMBOLS_LIST_RES),
            ctid_trader_account_id: 42,
            symbol: vec![LightSymbol {
                symbol_id: 1,
                symbol_name: Some("EURUSD".to_string()),
                enabled: Some(true),
                ..Default::default()
            }],
        };

        let decoded = SymbolsListRes::from_message(&response.to_message()).unwrap();
        assert_eq!(decoded.symbol.len(), 1);
        assert_eq!(decoded.symbol[0].symbol_name.as_deref(), Some("EURUSD"));
    }
}
