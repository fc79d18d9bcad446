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

use std::{
    cell::RefCell,
    rc::{Rc, Weak},
    time::Duration,
};

use forex_network::{ConnectionEpoch, ProtoMessage};

use crate::{
    common::consts::{PAYLOAD_OA_ERROR_RES, PAYLOAD_SYMBOLS_LIST_RES},
    error::{BrokerError, ErrorCode},
    lifecycle::RequestLifecycle,
    messages::{LightSymbol, Payload, SymbolsListReq, SymbolsListRes, VenueError},
    metrics::SessionEvent,
    router::MessageHandler,
    service::{ServiceCallbacks, ServiceCore},
    session::{SessionHandle, TransportSession},
    timeout::TimeoutTracker,
};

const SERVICE_NAME: &str = "symbols";

pub type SymbolsCallback = Rc<dyn Fn(&[LightSymbol])>;

#[derive(Clone, Default)]
pub struct SymbolCallbacks {
    pub on_symbols_received: Option<SymbolsCallback>,
    pub service: ServiceCallbacks,
}

impl std::fmt::Debug for SymbolCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(SymbolCallbacks))
            .field("on_symbols_received", &self.on_symbols_received.is_some())
            .field("service", &self.service)
            .finish()
    }
}

impl SymbolCallbacks {
    #[must_use]
    pub fn with_on_symbols_received(
        mut self,
        on_symbols_received: impl Fn(&[LightSymbol]) + 'static,
    ) -> Self {
        self.on_symbols_received = Some(Rc::new(on_symbols_received));
        self
    }

    #[must_use]
    pub fn with_on_error(mut self, on_error: impl Fn(&BrokerError) + 'static) -> Self {
        self.service = self.service.with_on_error(on_error);
        self
    }

    #[must_use]
    pub fn with_on_log(mut self, on_log: impl Fn(&str) + 'static) -> Self {
        self.service = self.service.with_on_log(on_log);
        self
    }
}

#[derive(Debug, Default)]
struct Request {
    account_id: i64,
    include_archived: bool,
    epoch: Option<ConnectionEpoch>,
}

struct SymbolInner {
    core: ServiceCore,
    lifecycle: RequestLifecycle,
    tracker: TimeoutTracker,
    on_symbols_received: RefCell<Option<SymbolsCallback>>,
    request: RefCell<Request>,
}

/// Fetches the light symbol list of an account.
#[derive(Clone)]
pub struct SymbolListService {
    inner: Rc<SymbolInner>,
}

impl std::fmt::Debug for SymbolListService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(SymbolListService))
            .field("in_progress", &self.in_progress())
            .field("request", &self.inner.request.borrow())
            .finish()
    }
}

impl SymbolListService {
    #[must_use]
    pub fn new(transport: TransportSession) -> Self {
        let inner = Rc::new_cyclic(|weak: &Weak<SymbolInner>| {
            let on_timeout = weak.clone();
            let tracker = TimeoutTracker::new(transport.loop_handle().clone(), move || {
                if let Some(service) = Self::upgrade(&on_timeout) {
                    service.on_timeout();
                }
            });

            SymbolInner {
                core: ServiceCore::with_metrics(SERVICE_NAME, transport.metrics().clone()),
                lifecycle: RequestLifecycle::new(transport),
                tracker,
                on_symbols_received: RefCell::new(None),
                request: RefCell::new(Request::default()),
            }
        });

        Self { inner }
    }

    fn upgrade(weak: &Weak<SymbolInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    #[must_use]
    pub fn in_progress(&self) -> bool {
        self.inner.core.in_progress()
    }

    #[must_use]
    pub fn log_history(&self) -> Vec<String> {
        self.inner.core.logger.history()
    }

    pub fn clear_log_history(&self) {
        self.inner.core.logger.clear_history();
    }

    pub fn set_callbacks(&self, callbacks: SymbolCallbacks) {
        *self.inner.on_symbols_received.borrow_mut() = callbacks.on_symbols_received;
        self.inner.core.set_callbacks(callbacks.service);
    }

    /// Requests the symbol list of `account_id`, with `timeout` defaulting to the configured
    /// request timeout.
    ///
    /// A missing account id is reported as a validation error without sending anything.
    ///
    /// # Panics
    ///
    /// Panics if called outside the context of a [`tokio::task::LocalSet`].
    pub fn fetch(&self, account_id: Option<i64>, include_archived: bool, timeout: Option<Duration>) {
        let inner = &self.inner;

        let Some(account_id) = account_id.filter(|id| *id > 0) else {
            inner
                .core
                .emit_error(&BrokerError::validation("Missing account id for symbol list"));
            return;
        };

        let transport = inner.lifecycle.session();
        let current_epoch = transport.current_epoch();

        if self.in_progress() && inner.request.borrow().epoch != Some(current_epoch) {
            inner
                .core
                .logger
                .info("Abandoning symbol list request started on a previous connection");
            inner.lifecycle.cleanup(&inner.core, &inner.tracker);
        }

        if !inner.core.in_progress.try_start() {
            inner.core.logger.info("Symbol list request already in progress");
            return;
        }

        *inner.request.borrow_mut() = Request {
            account_id,
            include_archived,
            epoch: Some(current_epoch),
        };
        inner.core.mark_started();

        let timeout = timeout.or_else(|| Some(transport.config().request_timeout()));

        let on_retry: Rc<dyn Fn(u32)> = {
            let weak = Rc::downgrade(&self.inner);
            Rc::new(move |attempt| {
                if let Some(service) = Self::upgrade(&weak) {
                    service.on_retry(attempt);
                }
            })
        };

        inner.lifecycle.begin(
            &inner.tracker,
            timeout,
            transport.config().retry_policy(),
            on_retry,
            self.message_handler(),
            || self.send_request(),
        );
    }

    fn send_request(&self) {
        let inner = &self.inner;
        let request = {
            let request = inner.request.borrow();
            SymbolsListReq::new(request.account_id, request.include_archived)
        };

        inner.core.logger.info(format!(
            "Requesting symbols for account {}",
            request.ctid_trader_account_id
        ));
        inner
            .lifecycle
            .send_with_client(&inner.core, &inner.tracker, request.to_message());
    }

    fn message_handler(&self) -> MessageHandler {
        let weak = Rc::downgrade(&self.inner);
        Rc::new(move |_handle: &SessionHandle, message: &ProtoMessage| {
            Self::upgrade(&weak).is_some_and(|service| service.handle_message(message))
        })
    }

    fn handle_message(&self, message: &ProtoMessage) -> bool {
        if !self.in_progress() {
            return false;
        }

        let account_id = self.inner.request.borrow().account_id;

        match message.payload_type {
            PAYLOAD_SYMBOLS_LIST_RES => {
                let Some(response) = SymbolsListRes::from_message(message) else {
                    return false;
                };
                if response.ctid_trader_account_id != account_id {
                    return false;
                }
                self.inner
                    .lifecycle
                    .cleanup(&self.inner.core, &self.inner.tracker);
                self.inner.core.record(SessionEvent::Success);
                self.inner.core.observe_since_start();
                self.inner.core.logger.info(format!(
                    "Received {} symbols for account {account_id}",
                    response.symbol.len()
                ));

                let callback = self.inner.on_symbols_received.borrow().clone();
                if let Some(callback) = callback {
                    callback(&response.symbol);
                }
                true
            }
            PAYLOAD_OA_ERROR_RES => match VenueError::from_message(message) {
                Some(error) if error.concerns_account(Some(account_id)) => {
                    self.inner
                        .lifecycle
                        .cleanup(&self.inner.core, &self.inner.tracker);
                    self.inner.core.record(SessionEvent::Error);
                    self.inner.core.emit_error(&BrokerError::from_venue(
                        ErrorCode::Provider,
                        &error.error_code,
                        &error.description,
                    ));
                    true
                }
                _ => false,
            },
            _ => false,
        }
    }

    fn on_retry(&self, attempt: u32) {
        if !self.in_progress() {
            return;
        }

        self.inner.core.record(SessionEvent::Retry);
        self.inner
            .core
            .logger
            .warn(format!("Symbol list request timed out, resending (retry {attempt})"));
        self.send_request();
    }

    fn on_timeout(&self) {
        let inner = &self.inner;
        if !inner.lifecycle.cleanup(&inner.core, &inner.tracker) {
            return;
        }

        inner.core.record(SessionEvent::Timeout);
        inner
            .core
            .emit_error(&BrokerError::timeout("Symbol list request timed out"));
    }
}
