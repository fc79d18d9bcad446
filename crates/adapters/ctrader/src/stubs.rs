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

//! In-memory connector, connections and token refresher for driving sessions in tests.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use async_trait::async_trait;
use forex_network::{
    Connection, ConnectionEpoch, Connector, Endpoint, EventSender, ProtoMessage, TransportError,
    TransportEvent,
};

use crate::{
    auth::TokenRefresher,
    common::{
        consts::{PAYLOAD_ACCOUNT_AUTH_RES, PAYLOAD_APPLICATION_AUTH_RES, PAYLOAD_OA_ERROR_RES},
        credential::{Credentials, Tokens},
        enums::HostType,
    },
    config::SessionConfig,
    messages::{AccountAuthRes, ApplicationAuthRes, OaErrorRes, Payload},
    session::TransportSession,
};

/// A connection recording every frame sent through it.
#[derive(Debug)]
pub struct MockConnection {
    epoch: ConnectionEpoch,
    events: EventSender,
    sent: RefCell<Vec<ProtoMessage>>,
    closed: Cell<bool>,
    fail_sends: Cell<bool>,
}

impl MockConnection {
    #[must_use]
    pub fn new(epoch: ConnectionEpoch, events: EventSender) -> Self {
        Self {
            epoch,
            events,
            sent: RefCell::new(Vec::new()),
            closed: Cell::new(false),
            fail_sends: Cell::new(false),
        }
    }

    /// Reports `event` as coming from this connection.
    pub fn emit(&self, event: TransportEvent) {
        let _ = self.events.send((self.epoch, event));
    }

    pub fn emit_frame(&self, message: ProtoMessage) {
        self.emit(TransportEvent::Frame(message));
    }

    /// Makes every following send fail while the connection stays open.
    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.set(fail);
    }

    #[must_use]
    pub fn sent(&self) -> Vec<ProtoMessage> {
        self.sent.borrow().clone()
    }

    #[must_use]
    pub fn sent_payload_types(&self) -> Vec<u32> {
        self.sent.borrow().iter().map(|m| m.payload_type).collect()
    }

    #[must_use]
    pub fn sent_count(&self, payload_type: u32) -> usize {
        self.sent
            .borrow()
            .iter()
            .filter(|m| m.payload_type == payload_type)
            .count()
    }

    /// Decodes the last sent frame of payload type `P`.
    #[must_use]
    pub fn last_sent<P: Payload>(&self) -> Option<P> {
        self.sent
            .borrow()
            .iter()
            .rev()
            .find_map(|message| P::from_message(message))
    }
}

impl Connection for MockConnection {
    fn epoch(&self) -> ConnectionEpoch {
        self.epoch
    }

    fn send(&self, message: ProtoMessage) -> Result<(), TransportError> {
        if self.closed.get() {
            return Err(TransportError::Closed);
        }
        if self.fail_sends.get() {
            return Err(TransportError::NotConnected);
        }
        self.sent.borrow_mut().push(message);
        Ok(())
    }

    fn close(&self) {
        if !self.closed.replace(true) {
            self.emit(TransportEvent::Disconnected("closed locally".to_string()));
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.get()
    }
}

/// A connector handing out [`MockConnection`]s and recording every attempt.
#[derive(Debug, Default)]
pub struct MockConnector {
    endpoints: RefCell<Vec<Endpoint>>,
    connections: RefCell<Vec<Rc<MockConnection>>>,
}

impl MockConnector {
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    #[must_use]
    pub fn connect_count(&self) -> usize {
        self.connections.borrow().len()
    }

    #[must_use]
    pub fn connection(&self, index: usize) -> Option<Rc<MockConnection>> {
        self.connections.borrow().get(index).cloned()
    }

    #[must_use]
    pub fn last(&self) -> Option<Rc<MockConnection>> {
        self.connections.borrow().last().cloned()
    }

    #[must_use]
    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.endpoints.borrow().clone()
    }
}

impl Connector for MockConnector {
    fn connect(
        &self,
        endpoint: &Endpoint,
        epoch: ConnectionEpoch,
        events: EventSender,
    ) -> Rc<dyn Connection> {
        let connection = Rc::new(MockConnection::new(epoch, events));
        self.endpoints.borrow_mut().push(endpoint.clone());
        self.connections.borrow_mut().push(connection.clone());
        connection
    }
}

/// A token refresher returning a fixed result and counting calls.
#[derive(Debug)]
pub struct StubTokenRefresher {
    result: RefCell<Result<Tokens, String>>,
    calls: RefCell<Vec<String>>,
}

impl StubTokenRefresher {
    /// Creates a refresher succeeding with `tokens`.
    #[must_use]
    pub fn succeeding(tokens: Tokens) -> Rc<Self> {
        Rc::new(Self {
            result: RefCell::new(Ok(tokens)),
            calls: RefCell::new(Vec::new()),
        })
    }

    /// Creates a refresher failing with `reason`.
    #[must_use]
    pub fn failing(reason: &str) -> Rc<Self> {
        Rc::new(Self {
            result: RefCell::new(Err(reason.to_string())),
            calls: RefCell::new(Vec::new()),
        })
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    /// Returns the refresh tokens passed to each call.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

#[async_trait(?Send)]
impl TokenRefresher for StubTokenRefresher {
    async fn refresh(
        &self,
        refresh_token: &str,
        account_id: Option<i64>,
    ) -> anyhow::Result<Tokens> {
        self.calls.borrow_mut().push(refresh_token.to_string());

        match &*self.result.borrow() {
            Ok(tokens) => Ok(Tokens::new(
                tokens.access_token.clone(),
                tokens.refresh_token.clone(),
                tokens.expires_at,
                account_id.or(tokens.account_id),
            )),
            Err(reason) => Err(anyhow::anyhow!("{reason}")),
        }
    }
}

#[must_use]
pub fn test_credentials() -> Credentials {
    Credentials::new(HostType::Demo, "client-id", "client-secret")
}

/// Session configuration with short deadlines and no reconnect jitter.
#[must_use]
pub fn test_config() -> SessionConfig {
    SessionConfig {
        reconnect_jitter_ratio: 0.0,
        connect_timeout_secs: 10.0,
        request_timeout_secs: 5.0,
        oauth_timeout_secs: 5.0,
        ..SessionConfig::default()
    }
}

#[must_use]
pub fn app_auth_response() -> ProtoMessage {
    ApplicationAuthRes {
        payload_type: Some(PAYLOAD_APPLICATION_AUTH_RES),
    }
    .to_message()
}

#[must_use]
pub fn account_auth_response(account_id: i64) -> ProtoMessage {
    AccountAuthRes {
        payload_type: Some(PAYLOAD_ACCOUNT_AUTH_RES),
        ctid_trader_account_id: account_id,
    }
    .to_message()
}

#[must_use]
pub fn oa_error(account_id: Option<i64>, error_code: &str, description: &str) -> ProtoMessage {
    OaErrorRes {
        payload_type: Some(PAYLOAD_OA_ERROR_RES),
        ctid_trader_account_id: account_id,
        error_code: error_code.to_string(),
        description: Some(description.to_string()),
        maintenance_end_timestamp: None,
    }
    .to_message()
}

/// Yields to the local task set so queued connection events get processed.
pub async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

/// Connects `transport` and completes application auth on the new mock connection.
///
/// # Panics
///
/// Panics if `transport` does not open a connection through `connector`.
pub async fn authenticate_transport(
    transport: &TransportSession,
    connector: &MockConnector,
) -> Rc<MockConnection> {
    transport.connect();
    let connection = connector
        .last()
        .expect("connect should open a mock connection");

    connection.emit(TransportEvent::Connected);
    settle().await;
    connection.emit_frame(app_auth_response());
    settle().await;
    connection
}
