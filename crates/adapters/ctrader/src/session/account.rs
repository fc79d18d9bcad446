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

//! Account authentication on top of an application-authenticated [`TransportSession`].

use std::{
    cell::RefCell,
    path::{Path, PathBuf},
    rc::{Rc, Weak},
    time::Duration,
};

use forex_network::{ConnectionEpoch, ProtoMessage};

use super::{handle::SessionHandle, transport::TransportSession};
use crate::{
    auth::TokenRefresher,
    common::{
        consts::{
            PAYLOAD_ACCOUNT_AUTH_RES, PAYLOAD_ACCOUNT_DISCONNECT_EVENT,
            PAYLOAD_ACCOUNT_LOGOUT_RES, PAYLOAD_ACCOUNTS_TOKEN_INVALIDATED_EVENT,
            PAYLOAD_OA_ERROR_RES,
        },
        credential::{CredentialError, Tokens},
        enums::ConnectionStatus,
    },
    error::{BrokerError, ErrorCode, is_invalid_token_error},
    lifecycle::RequestLifecycle,
    messages::{
        AccountAuthReq, AccountAuthRes, AccountDisconnectEvent, AccountLogoutReq,
        AccountLogoutRes, AccountsTokenInvalidatedEvent, Payload, VenueError,
    },
    metrics::SessionEvent,
    router::MessageHandler,
    runtime::TaskHandle,
    service::{ServiceCallbacks, ServiceCore},
    timeout::TimeoutTracker,
};

const SERVICE_NAME: &str = "account";
const DEFAULT_INVALIDATED_REASON: &str = "Token invalidated or revoked";

/// Invoked with the tokens in use once the account is authenticated.
pub type OAuthCallback = Rc<dyn Fn(&Tokens)>;

/// Callbacks accepted by [`AccountSession::set_callbacks`].
#[derive(Clone, Default)]
pub struct AccountCallbacks {
    pub on_oauth_success: Option<OAuthCallback>,
    pub service: ServiceCallbacks,
}

impl std::fmt::Debug for AccountCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(AccountCallbacks))
            .field("on_oauth_success", &self.on_oauth_success.is_some())
            .field("service", &self.service)
            .finish()
    }
}

impl AccountCallbacks {
    #[must_use]
    pub fn with_on_oauth_success(mut self, on_oauth_success: impl Fn(&Tokens) + 'static) -> Self {
        self.on_oauth_success = Some(Rc::new(on_oauth_success));
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

    #[must_use]
    pub fn with_on_status_changed(
        mut self,
        on_status_changed: impl Fn(ConnectionStatus) + 'static,
    ) -> Self {
        self.service = self.service.with_on_status_changed(on_status_changed);
        self
    }
}

/// What happens once a token refresh succeeds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AfterRefresh {
    /// Start the account auth request.
    BeginAuth,
    /// Resend the in-flight auth request with the new token.
    Resend,
}

#[derive(Default)]
struct AccountState {
    tokens: Tokens,
    last_authenticated_account_id: Option<i64>,
    auth_epoch: Option<ConnectionEpoch>,
    request_epoch: Option<ConnectionEpoch>,
    refresh_attempted: bool,
    logout_requested: bool,
    auth_timeout: Option<Duration>,
    refresh_task: Option<TaskHandle>,
}

struct AccountInner {
    transport: TransportSession,
    core: ServiceCore,
    lifecycle: RequestLifecycle,
    tracker: TimeoutTracker,
    refresher: Rc<dyn TokenRefresher>,
    token_file: Option<PathBuf>,
    on_oauth_success: RefCell<Option<OAuthCallback>>,
    state: RefCell<AccountState>,
}

/// Authenticates one trading account against an application-authenticated transport.
///
/// Expired access tokens are refreshed before authenticating, and a token rejected by the
/// venue is refreshed once per connect before the auth request is resent.
#[derive(Clone)]
pub struct AccountSession {
    inner: Rc<AccountInner>,
}

impl std::fmt::Debug for AccountSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(AccountSession))
            .field("account_id", &self.account_id())
            .field("status", &self.status())
            .field("in_progress", &self.in_progress())
            .finish()
    }
}

impl AccountSession {
    /// Creates a new [`AccountSession`] authenticating with `tokens`.
    ///
    /// Refreshed tokens are persisted to `token_file` when given.
    #[must_use]
    pub fn new(
        transport: TransportSession,
        tokens: Tokens,
        token_file: Option<PathBuf>,
        refresher: Rc<dyn TokenRefresher>,
    ) -> Self {
        let inner = Rc::new_cyclic(|weak: &Weak<AccountInner>| {
            let on_timeout = weak.clone();
            let tracker = TimeoutTracker::new(transport.loop_handle().clone(), move || {
                if let Some(session) = Self::upgrade(&on_timeout) {
                    session.on_auth_timeout();
                }
            });

            AccountInner {
                lifecycle: RequestLifecycle::new(transport.clone()),
                core: ServiceCore::with_metrics(SERVICE_NAME, transport.metrics().clone()),
                transport,
                tracker,
                refresher,
                token_file,
                on_oauth_success: RefCell::new(None),
                state: RefCell::new(AccountState {
                    tokens,
                    ..Default::default()
                }),
            }
        });

        Self { inner }
    }

    /// Creates a new [`AccountSession`] with tokens loaded from (and persisted to) `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the token file cannot be loaded.
    pub fn from_file(
        transport: TransportSession,
        path: impl AsRef<Path>,
        refresher: Rc<dyn TokenRefresher>,
    ) -> Result<Self, CredentialError> {
        let path = path.as_ref();
        let tokens = Tokens::from_file(path)?;
        Ok(Self::new(
            transport,
            tokens,
            Some(path.to_path_buf()),
            refresher,
        ))
    }

    fn downgrade(&self) -> Weak<AccountInner> {
        Rc::downgrade(&self.inner)
    }

    fn upgrade(weak: &Weak<AccountInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.inner.core.status()
    }

    #[must_use]
    pub fn in_progress(&self) -> bool {
        self.inner.core.in_progress()
    }

    #[must_use]
    pub fn tokens(&self) -> Tokens {
        self.inner.state.borrow().tokens.clone()
    }

    #[must_use]
    pub fn account_id(&self) -> Option<i64> {
        self.inner.state.borrow().tokens.account_id
    }

    #[must_use]
    pub fn last_authenticated_account_id(&self) -> Option<i64> {
        self.inner.state.borrow().last_authenticated_account_id
    }

    #[must_use]
    pub fn log_history(&self) -> Vec<String> {
        self.inner.core.logger.history()
    }

    pub fn clear_log_history(&self) {
        self.inner.core.logger.clear_history();
    }

    /// Replaces every callback. The log history is replayed to a new `on_log`.
    pub fn set_callbacks(&self, callbacks: AccountCallbacks) {
        *self.inner.on_oauth_success.borrow_mut() = callbacks.on_oauth_success;
        self.inner.core.set_callbacks(callbacks.service);
    }

    /// Replaces the tokens in use, for example when switching account.
    ///
    /// Switching to a different account drops the current authentication locally.
    pub fn update_tokens(&self, tokens: Tokens) {
        let switched = {
            let mut state = self.inner.state.borrow_mut();
            let switched = state.tokens.account_id != tokens.account_id;
            state.tokens = tokens;
            if switched {
                state.auth_epoch = None;
            }
            switched
        };

        self.persist_tokens();

        if switched && self.status() != ConnectionStatus::Disconnected {
            self.inner.core.logger.info("Account switched");
            self.disconnect();
        }
    }

    /// Authenticates the account, using `timeout` (or the configured OAuth timeout) as the
    /// deadline of the auth request.
    ///
    /// Every failure is reported through `on_error` and leaves the session `Disconnected`.
    ///
    /// # Panics
    ///
    /// Panics if called outside the context of a [`tokio::task::LocalSet`].
    pub fn connect(&self, timeout: Option<Duration>) {
        let inner = &self.inner;
        let current_epoch = inner.transport.current_epoch();

        if self.status() == ConnectionStatus::AccountAuthenticated {
            let auth_epoch = inner.state.borrow().auth_epoch;
            if auth_epoch == Some(current_epoch) {
                inner.core.logger.info("Account already authenticated");
                return;
            }
            // Authenticated on a connection which is gone
            inner.core.set_status(ConnectionStatus::Disconnected);
        }

        if self.in_progress() && inner.state.borrow().request_epoch != Some(current_epoch) {
            inner
                .core
                .logger
                .info("Abandoning account auth started on a previous connection");
            self.abandon_request();
        }

        if !inner.core.in_progress.try_start() {
            inner.core.logger.info("Account auth already in progress");
            return;
        }

        let (has_access_token, account_id, expired, has_refresh_token) = {
            let mut state = inner.state.borrow_mut();
            state.request_epoch = Some(current_epoch);
            state.refresh_attempted = false;
            state.logout_requested = false;
            state.auth_timeout = timeout.or_else(|| Some(inner.transport.config().oauth_timeout()));
            (
                !state.tokens.access_token.is_empty(),
                state.tokens.account_id,
                state.tokens.is_expired_default(),
                state.tokens.has_refresh_token(),
            )
        };

        if !has_access_token {
            self.fail(BrokerError::auth("Missing access token"));
            return;
        }

        let Some(account_id) = account_id else {
            self.fail(BrokerError::auth("Missing account id"));
            return;
        };

        if let Err(e) = inner.transport.client() {
            self.fail(e);
            return;
        }

        inner.core.set_status(ConnectionStatus::Connecting);
        inner.core.mark_started();

        if expired {
            if !has_refresh_token {
                inner.core.record(SessionEvent::RefreshMissing);
                self.fail(BrokerError::auth(
                    "Access token expired and no refresh token is available",
                ));
                return;
            }

            inner
                .core
                .logger
                .info(format!("Access token for account {account_id} expired, refreshing"));
            inner.state.borrow_mut().refresh_attempted = true;
            self.refresh_tokens(AfterRefresh::BeginAuth);
        } else {
            self.begin_auth();
        }
    }

    /// Requests a logout of the authenticated account.
    ///
    /// Local state is finalized when the venue confirms with an account disconnect event.
    pub fn logout(&self) {
        let inner = &self.inner;
        let account_id = self
            .last_authenticated_account_id()
            .or_else(|| self.account_id());

        let Some(account_id) = account_id else {
            inner.core.logger.info("No account to log out");
            return;
        };

        match inner.transport.client() {
            Ok(handle) => {
                if let Err(e) = handle.send_payload(&AccountLogoutReq::new(account_id)) {
                    inner.core.emit_error(&BrokerError::from(e));
                    return;
                }
                inner.state.borrow_mut().logout_requested = true;
                inner
                    .core
                    .logger
                    .info(format!("Logout requested for account {account_id}"));
            }
            Err(e) => inner.core.emit_error(&e),
        }
    }

    /// Drops the account authentication locally.
    pub fn disconnect(&self) {
        self.abandon_request();
        self.inner.core.set_status(ConnectionStatus::Disconnected);
    }

    /// Stops a pending refresh and ends the in-flight auth without reporting an outcome.
    fn abandon_request(&self) {
        let refresh_task = {
            let mut state = self.inner.state.borrow_mut();
            state.request_epoch = None;
            state.refresh_task.take()
        };
        if let Some(task) = refresh_task {
            task.cancel();
        }

        self.inner
            .lifecycle
            .cleanup(&self.inner.core, &self.inner.tracker);
    }

    fn fail(&self, error: BrokerError) {
        self.inner
            .lifecycle
            .cleanup(&self.inner.core, &self.inner.tracker);
        self.inner.core.set_status(ConnectionStatus::Disconnected);
        self.inner.core.emit_error(&error);
    }

    fn persist_tokens(&self) {
        let Some(path) = self.inner.token_file.as_ref() else {
            return;
        };

        let tokens = self.tokens();
        if let Err(e) = tokens.save(path) {
            self.inner
                .core
                .logger
                .warn(format!("Failed to persist tokens to {}: {e}", path.display()));
        }
    }

    fn refresh_tokens(&self, after: AfterRefresh) {
        let (refresh_token, account_id) = {
            let state = self.inner.state.borrow();
            (state.tokens.refresh_token.clone(), state.tokens.account_id)
        };

        let weak = self.downgrade();
        let refresher = self.inner.refresher.clone();
        let task = self.inner.transport.loop_handle().spawn(async move {
            let result = refresher.refresh(&refresh_token, account_id).await;
            if let Some(session) = Self::upgrade(&weak) {
                session.on_refresh_result(result, after);
            }
        });

        self.inner.state.borrow_mut().refresh_task = Some(task);
    }

    fn on_refresh_result(&self, result: anyhow::Result<Tokens>, after: AfterRefresh) {
        let inner = &self.inner;
        inner.state.borrow_mut().refresh_task = None;

        if !self.in_progress() {
            return;
        }

        match result {
            Ok(tokens) => {
                inner.core.record(SessionEvent::RefreshSuccess);
                inner.state.borrow_mut().tokens = tokens;
                self.persist_tokens();
                inner.core.logger.info("Access token refreshed");

                match after {
                    AfterRefresh::BeginAuth => self.begin_auth(),
                    AfterRefresh::Resend => {
                        let timeout = inner.state.borrow().auth_timeout;
                        inner.tracker.start(timeout);
                        self.send_auth_request();
                    }
                }
            }
            Err(e) => {
                inner.core.record(SessionEvent::RefreshFailure);
                self.fail(BrokerError::auth("Token refresh failed").with_detail(format!("{e:#}")));
            }
        }
    }

    fn begin_auth(&self) {
        let inner = &self.inner;
        let timeout = inner.state.borrow().auth_timeout;

        let weak = self.downgrade();
        let on_retry = Rc::new(move |attempt: u32| {
            if let Some(session) = Self::upgrade(&weak) {
                session.on_auth_retry(attempt);
            }
        });

        inner.lifecycle.begin(
            &inner.tracker,
            timeout,
            inner.transport.config().retry_policy(),
            on_retry,
            self.message_handler(),
            || self.send_auth_request(),
        );
    }

    fn send_auth_request(&self) {
        let inner = &self.inner;
        let request = {
            let state = inner.state.borrow();
            AccountAuthReq::new(
                state.tokens.account_id.unwrap_or_default(),
                &state.tokens.access_token,
            )
        };

        inner.core.logger.info(format!(
            "Sending account auth request for account {}",
            request.ctid_trader_account_id
        ));

        if !inner
            .lifecycle
            .send_with_client(&inner.core, &inner.tracker, request.to_message())
        {
            inner.core.set_status(ConnectionStatus::Disconnected);
        }
    }

    fn message_handler(&self) -> MessageHandler {
        let weak = self.downgrade();
        Rc::new(move |handle: &SessionHandle, message: &ProtoMessage| {
            Self::upgrade(&weak).is_some_and(|session| session.handle_message(handle, message))
        })
    }

    fn handle_message(&self, _handle: &SessionHandle, message: &ProtoMessage) -> bool {
        let account_id = self.account_id();

        match message.payload_type {
            PAYLOAD_ACCOUNT_AUTH_RES => {
                if !self.in_progress() {
                    return false;
                }
                let Some(response) = AccountAuthRes::from_message(message) else {
                    return false;
                };
                if Some(response.ctid_trader_account_id) != account_id {
                    return false;
                }
                self.on_auth_success(response.ctid_trader_account_id);
                true
            }
            PAYLOAD_OA_ERROR_RES => {
                if !self.in_progress() {
                    return false;
                }
                match VenueError::from_message(message) {
                    Some(error) if error.concerns_account(account_id) => {
                        self.on_auth_error(&error);
                        true
                    }
                    _ => false,
                }
            }
            PAYLOAD_ACCOUNT_DISCONNECT_EVENT => {
                match AccountDisconnectEvent::from_message(message) {
                    Some(event) if Some(event.ctid_trader_account_id) == account_id => {
                        self.on_account_disconnected();
                        true
                    }
                    _ => false,
                }
            }
            PAYLOAD_ACCOUNTS_TOKEN_INVALIDATED_EVENT => {
                let Some(event) = AccountsTokenInvalidatedEvent::from_message(message) else {
                    return false;
                };
                let concerns_us = event.ctid_trader_account_ids.is_empty()
                    || account_id.is_some_and(|id| event.ctid_trader_account_ids.contains(&id));
                if !concerns_us {
                    return false;
                }
                self.on_tokens_invalidated(event.reason.as_deref());
                true
            }
            PAYLOAD_ACCOUNT_LOGOUT_RES => match AccountLogoutRes::from_message(message) {
                Some(response) if Some(response.ctid_trader_account_id) == account_id => {
                    self.inner.core.logger.info("Logout acknowledged");
                    true
                }
                _ => false,
            },
            _ => false,
        }
    }

    fn on_auth_success(&self, account_id: i64) {
        let inner = &self.inner;
        inner.core.in_progress.end();
        inner.tracker.cancel();

        {
            let mut state = inner.state.borrow_mut();
            state.last_authenticated_account_id = Some(account_id);
            state.auth_epoch = Some(inner.transport.current_epoch());
        }

        // The handler stays registered for account notifications
        inner.core.set_status(ConnectionStatus::AccountAuthenticated);
        inner.core.record(SessionEvent::Success);
        inner.core.observe_since_start();
        inner
            .core
            .logger
            .info(format!("Account {account_id} authenticated"));

        let callback = inner.on_oauth_success.borrow().clone();
        if let Some(callback) = callback {
            let tokens = self.tokens();
            callback(&tokens);
        }
    }

    fn on_auth_error(&self, error: &VenueError) {
        let inner = &self.inner;

        let (refresh_attempted, has_refresh_token) = {
            let state = inner.state.borrow();
            (state.refresh_attempted, state.tokens.has_refresh_token())
        };
        let invalid_token = is_invalid_token_error(&error.error_code);

        if invalid_token && !refresh_attempted && !has_refresh_token {
            inner.core.record(SessionEvent::RefreshMissing);
        }

        if invalid_token && !refresh_attempted && has_refresh_token {
            inner.state.borrow_mut().refresh_attempted = true;
            inner.tracker.cancel();
            inner.core.logger.info(format!(
                "Access token rejected ({}), refreshing",
                error.error_code
            ));
            self.refresh_tokens(AfterRefresh::Resend);
            return;
        }

        inner.core.record(SessionEvent::Error);
        self.fail(BrokerError::from_venue(
            ErrorCode::Auth,
            &error.error_code,
            &error.description,
        ));
    }

    fn on_auth_retry(&self, attempt: u32) {
        if !self.in_progress() {
            return;
        }

        self.inner.core.record(SessionEvent::Retry);
        self.inner
            .core
            .logger
            .warn(format!("Account auth timed out, resending (retry {attempt})"));
        self.send_auth_request();
    }

    fn on_auth_timeout(&self) {
        if !self.in_progress() {
            return;
        }

        self.inner.core.record(SessionEvent::Timeout);
        self.fail(BrokerError::timeout("Account auth timed out"));
    }

    fn on_account_disconnected(&self) {
        let inner = &self.inner;
        let logout_requested = std::mem::take(&mut inner.state.borrow_mut().logout_requested);
        inner.core.record(SessionEvent::DisconnectEvent);

        inner.lifecycle.cleanup(&inner.core, &inner.tracker);
        inner.core.set_status(ConnectionStatus::Disconnected);

        if logout_requested {
            inner.core.logger.info("Logout completed");
        } else {
            inner
                .core
                .emit_error(&BrokerError::auth("Account disconnected by server"));
        }
    }

    fn on_tokens_invalidated(&self, reason: Option<&str>) {
        let inner = &self.inner;
        let reason = reason
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_INVALIDATED_REASON);
        inner.core.record(SessionEvent::TokenInvalidatedEvent);

        inner.lifecycle.cleanup(&inner.core, &inner.tracker);
        inner.core.set_status(ConnectionStatus::Disconnected);
        inner.core.emit_error(&BrokerError::auth(reason));
    }
}
