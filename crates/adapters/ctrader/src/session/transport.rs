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

//! Application-level session over a single venue connection.
//!
//! The [`TransportSession`] owns the connection, performs application authentication, keeps
//! the connection alive with heartbeats and rebuilds it with jittered exponential backoff.
//! Every connection event is tagged with the [`ConnectionEpoch`] of the attempt that produced
//! it, and events from superseded attempts are discarded.

use std::{
    cell::RefCell,
    rc::{Rc, Weak},
    time::Duration,
};

use forex_network::{
    ConnectionEpoch, Connector, EventReceiver, EventSender, ProtoMessage, ReconnectBackoff,
    TransportEvent, event_channel,
};
use tokio::time::Instant;

use super::handle::SessionHandle;
use crate::{
    common::{
        consts::{
            APP_AUTH_RETRY_DELAY, APP_AUTH_RETRY_LIMIT, PAYLOAD_APPLICATION_AUTH_RES,
            PAYLOAD_COMMON_ERROR_RES, PAYLOAD_HEARTBEAT_EVENT, PAYLOAD_OA_ERROR_RES,
            PAYLOAD_SPOT_EVENT, PAYLOAD_SYMBOL_CHANGED_EVENT, PAYLOAD_UNSUBSCRIBE_SPOTS_RES,
            SEND_FAILURE_STREAK_LIMIT, SEND_FAILURE_STREAK_WINDOW, is_noise_payload,
        },
        credential::Credentials,
        enums::ConnectionStatus,
    },
    config::SessionConfig,
    error::{BrokerError, BrokerResult, ErrorCode, is_benign_subscription_error},
    messages::{ApplicationAuthReq, HeartbeatEvent, VenueError},
    metrics::{MetricsSlot, SessionEvent, SessionMetrics},
    router::{DispatchMode, HandlerId, MessageHandler, MessageRouter},
    runtime::{LoopHandle, TaskHandle, TimerHandle},
    service::{ServiceCallbacks, ServiceCore},
};

const SERVICE_NAME: &str = "transport";

/// Invoked with the live handle once application authentication succeeds.
pub type AppAuthCallback = Rc<dyn Fn(&SessionHandle)>;

/// Callbacks accepted by [`TransportSession::set_callbacks`].
#[derive(Clone, Default)]
pub struct TransportCallbacks {
    pub on_app_auth_success: Option<AppAuthCallback>,
    pub service: ServiceCallbacks,
}

impl std::fmt::Debug for TransportCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(TransportCallbacks))
            .field("on_app_auth_success", &self.on_app_auth_success.is_some())
            .field("service", &self.service)
            .finish()
    }
}

impl TransportCallbacks {
    #[must_use]
    pub fn with_on_app_auth_success(
        mut self,
        on_app_auth_success: impl Fn(&SessionHandle) + 'static,
    ) -> Self {
        self.on_app_auth_success = Some(Rc::new(on_app_auth_success));
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

#[derive(Default)]
struct TransportState {
    epoch: ConnectionEpoch,
    handle: Option<SessionHandle>,
    manual_disconnect: bool,
    connect_started: Option<Instant>,
    last_message: Option<Instant>,
    last_heartbeat_log: Option<Instant>,
    connect_watchdog: Option<TimerHandle>,
    heartbeat: Option<TimerHandle>,
    reconnect_timer: Option<TimerHandle>,
    app_auth_retry_timer: Option<TimerHandle>,
    pump: Option<TaskHandle>,
    reconnect_attempt: u32,
    app_auth_retry_count: u32,
    send_failure_streak: u32,
    last_send_failure: Option<Instant>,
}

impl TransportState {
    fn current_handle(&self, epoch: ConnectionEpoch) -> Option<SessionHandle> {
        self.handle
            .as_ref()
            .filter(|handle| handle.epoch() == epoch)
            .cloned()
    }

    fn cancel_timers(&mut self) -> Vec<TimerHandle> {
        [
            self.connect_watchdog.take(),
            self.heartbeat.take(),
            self.reconnect_timer.take(),
            self.app_auth_retry_timer.take(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

struct TransportInner {
    config: SessionConfig,
    credentials: Credentials,
    connector: Rc<dyn Connector>,
    loop_handle: LoopHandle,
    backoff: ReconnectBackoff,
    core: ServiceCore,
    router: MessageRouter,
    on_app_auth_success: RefCell<Option<AppAuthCallback>>,
    state: RefCell<TransportState>,
    events_tx: EventSender,
    events_rx: RefCell<Option<EventReceiver>>,
}

impl Drop for TransportInner {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if let Some(pump) = state.pump.take() {
            pump.cancel();
        }
        if let Some(handle) = state.handle.take() {
            handle.close();
        }
    }
}

/// Owns the venue connection and its application authentication.
///
/// Clones share the same session. All methods must be called from within the
/// [`EventLoop`](crate::runtime::EventLoop) the session was created for.
#[derive(Clone)]
pub struct TransportSession {
    inner: Rc<TransportInner>,
}

impl std::fmt::Debug for TransportSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(TransportSession))
            .field("endpoint", &self.inner.config.endpoint())
            .field("status", &self.status())
            .field("epoch", &self.current_epoch())
            .field("handlers", &self.inner.router.len())
            .finish()
    }
}

impl TransportSession {
    /// Creates a new [`TransportSession`].
    #[must_use]
    pub fn new(
        config: SessionConfig,
        credentials: Credentials,
        connector: Rc<dyn Connector>,
        loop_handle: LoopHandle,
    ) -> Self {
        let (events_tx, events_rx) = event_channel();
        let backoff = config.reconnect_backoff();

        Self {
            inner: Rc::new(TransportInner {
                config,
                credentials,
                connector,
                loop_handle,
                backoff,
                core: ServiceCore::new(SERVICE_NAME),
                router: MessageRouter::new(),
                on_app_auth_success: RefCell::new(None),
                state: RefCell::new(TransportState::default()),
                events_tx,
                events_rx: RefCell::new(Some(events_rx)),
            }),
        }
    }

    fn downgrade(&self) -> Weak<TransportInner> {
        Rc::downgrade(&self.inner)
    }

    fn upgrade(weak: &Weak<TransportInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        &self.inner.credentials
    }

    #[must_use]
    pub fn loop_handle(&self) -> &LoopHandle {
        &self.inner.loop_handle
    }

    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.inner.core.status()
    }

    /// Returns the metrics slot shared by every service built on this session.
    #[must_use]
    pub fn metrics(&self) -> &MetricsSlot {
        self.inner.core.metrics()
    }

    /// Installs `metrics` for this session and every service built on it.
    pub fn set_metrics(&self, metrics: SessionMetrics) {
        self.metrics().set(Some(metrics));
    }

    #[must_use]
    pub fn in_progress(&self) -> bool {
        self.inner.core.in_progress()
    }

    #[must_use]
    pub fn current_epoch(&self) -> ConnectionEpoch {
        self.inner.state.borrow().epoch
    }

    #[must_use]
    pub fn reconnect_attempt(&self) -> u32 {
        self.inner.state.borrow().reconnect_attempt
    }

    #[must_use]
    pub fn has_pending_reconnect(&self) -> bool {
        self.inner
            .state
            .borrow()
            .reconnect_timer
            .as_ref()
            .is_some_and(TimerHandle::is_pending)
    }

    #[must_use]
    pub fn is_heartbeat_running(&self) -> bool {
        self.inner
            .state
            .borrow()
            .heartbeat
            .as_ref()
            .is_some_and(TimerHandle::is_pending)
    }

    #[must_use]
    pub fn log_history(&self) -> Vec<String> {
        self.inner.core.logger.history()
    }

    pub fn clear_log_history(&self) {
        self.inner.core.logger.clear_history();
    }

    /// Replaces every callback. The log history is replayed to a new `on_log`.
    pub fn set_callbacks(&self, callbacks: TransportCallbacks) {
        *self.inner.on_app_auth_success.borrow_mut() = callbacks.on_app_auth_success;
        self.inner.core.set_callbacks(callbacks.service);
    }

    /// Returns the live handle.
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorCode::Auth`] error if the application is not authenticated.
    pub fn client(&self) -> BrokerResult<SessionHandle> {
        if self.status() < ConnectionStatus::AppAuthenticated {
            return Err(BrokerError::auth("Application not authenticated"));
        }

        self.inner
            .state
            .borrow()
            .handle
            .clone()
            .filter(|handle| !handle.is_closed())
            .ok_or_else(|| BrokerError::auth("No live session handle"))
    }

    /// Seconds since the last inbound message on the current connection.
    #[must_use]
    pub fn seconds_since_last_message(&self) -> Option<f64> {
        self.inner
            .state
            .borrow()
            .last_message
            .map(|at| at.elapsed().as_secs_f64())
    }

    /// Returns `true` if the transport is connected and received a message within `max_idle`
    /// seconds, defaulting to the heartbeat timeout.
    #[must_use]
    pub fn is_transport_fresh(&self, max_idle_secs: Option<f64>) -> bool {
        if self.status() < ConnectionStatus::Connected {
            return false;
        }

        let threshold = max_idle_secs
            .unwrap_or(self.inner.config.heartbeat_timeout_secs)
            .max(1.0);
        self.seconds_since_last_message()
            .is_some_and(|idle| idle <= threshold)
    }

    pub fn add_message_handler(&self, id: HandlerId, handler: MessageHandler) -> bool {
        self.inner.router.add(id, handler)
    }

    pub fn remove_message_handler(&self, id: HandlerId) -> bool {
        self.inner.router.remove(id)
    }

    #[must_use]
    pub fn has_message_handler(&self, id: HandlerId) -> bool {
        self.inner.router.contains(id)
    }

    #[must_use]
    pub fn message_handler_count(&self) -> usize {
        self.inner.router.len()
    }

    pub fn clear_message_handlers(&self) {
        self.inner.router.clear();
    }

    /// Opens a new connection and starts application authentication.
    ///
    /// Does nothing while a connect is already in progress, or once authenticated with a live
    /// handle.
    ///
    /// # Panics
    ///
    /// Panics if called outside the context of a [`tokio::task::LocalSet`].
    pub fn connect(&self) {
        let inner = &self.inner;
        let status = self.status();

        if status >= ConnectionStatus::AppAuthenticated && self.has_live_handle() {
            inner.core.logger.info("Already authenticated, connect ignored");
            return;
        }

        if !inner.core.in_progress.try_start() {
            inner.core.logger.info("Connect already in progress");
            return;
        }

        if status != ConnectionStatus::Disconnected {
            inner.core.set_status(ConnectionStatus::Disconnected);
        }

        self.ensure_event_pump();

        let (stale, epoch) = {
            let mut state = inner.state.borrow_mut();
            state.manual_disconnect = false;
            state.epoch = state.epoch.next();
            state.connect_started = Some(inner.loop_handle.now());
            state.last_message = None;
            (state.handle.take(), state.epoch)
        };

        if let Some(stale) = stale {
            stale.close();
        }

        inner.core.set_status(ConnectionStatus::Connecting);

        let endpoint = inner.config.endpoint();
        inner
            .core
            .logger
            .info(format!("Connecting to {endpoint} (epoch {epoch})"));
        self.start_connect_watchdog();

        let connection = inner
            .connector
            .connect(&endpoint, epoch, inner.events_tx.clone());
        inner.state.borrow_mut().handle = Some(SessionHandle::new(connection));
    }

    /// Closes the connection and stops every timer. Auto-reconnect is suppressed until the
    /// next [`TransportSession::connect`].
    pub fn disconnect(&self) {
        let inner = &self.inner;

        let (timers, handle) = {
            let mut state = inner.state.borrow_mut();
            state.manual_disconnect = true;
            state.reconnect_attempt = 0;
            state.connect_started = None;
            state.app_auth_retry_count = 0;
            (state.cancel_timers(), state.handle.take())
        };
        drop(timers);

        inner.router.clear();
        inner.core.in_progress.end();

        if let Some(handle) = handle {
            handle.close();
            inner.core.logger.info("Disconnected");
        }

        inner.core.set_status(ConnectionStatus::Disconnected);
    }

    /// Handles an event reported by a connection.
    ///
    /// Events from any connection other than the current one are ignored.
    pub fn on_transport_event(&self, epoch: ConnectionEpoch, event: TransportEvent) {
        let Some(handle) = self.inner.state.borrow().current_handle(epoch) else {
            tracing::debug!(
                service = SERVICE_NAME,
                "Ignoring stale {} event from epoch {epoch}",
                event.kind()
            );
            return;
        };

        match event {
            TransportEvent::Connected => self.handle_connected(),
            TransportEvent::Frame(message) => self.handle_frame(&handle, &message),
            TransportEvent::SendFailed(reason) => self.report_send_failure(&reason),
            TransportEvent::Disconnected(reason) => {
                self.enter_disconnected(BrokerError::network("Connection lost").with_detail(reason));
            }
        }
    }

    /// Records a failed send on the current connection.
    ///
    /// Before authentication the application auth request is retried a bounded number of
    /// times. After authentication a streak of failures restarts the transport.
    pub fn report_send_failure(&self, reason: &str) {
        let inner = &self.inner;
        let now = inner.loop_handle.now();

        let streak = {
            let mut state = inner.state.borrow_mut();
            if state
                .last_send_failure
                .is_some_and(|at| now.duration_since(at) > SEND_FAILURE_STREAK_WINDOW)
            {
                state.send_failure_streak = 0;
            }
            state.last_send_failure = Some(now);
            state.send_failure_streak += 1;
            state.send_failure_streak
        };

        inner
            .core
            .logger
            .warn(format!("Send failed: {reason} (streak {streak})"));

        let status = self.status();
        if status < ConnectionStatus::AppAuthenticated {
            if status >= ConnectionStatus::Connected && inner.config.auto_reconnect {
                self.schedule_app_auth_retry();
            }
        } else if streak >= SEND_FAILURE_STREAK_LIMIT && inner.config.auto_reconnect {
            inner.state.borrow_mut().send_failure_streak = 0;
            inner.core.logger.warn(format!(
                "{streak} consecutive send failures, restarting transport"
            ));
            self.force_stop();
        }
    }

    fn has_live_handle(&self) -> bool {
        self.inner
            .state
            .borrow()
            .handle
            .as_ref()
            .is_some_and(|handle| !handle.is_closed())
    }

    fn ensure_event_pump(&self) {
        let Some(mut events_rx) = self.inner.events_rx.borrow_mut().take() else {
            return;
        };

        let weak = self.downgrade();
        let pump = self.inner.loop_handle.spawn(async move {
            while let Some((epoch, event)) = events_rx.recv().await {
                let Some(session) = Self::upgrade(&weak) else {
                    break;
                };
                session.on_transport_event(epoch, event);
            }
        });

        self.inner.state.borrow_mut().pump = Some(pump);
    }

    fn start_connect_watchdog(&self) {
        let weak = self.downgrade();
        let timer = self
            .inner
            .loop_handle
            .schedule(self.inner.config.connect_timeout(), move || {
                if let Some(session) = Self::upgrade(&weak) {
                    session.on_connect_watchdog();
                }
            });

        let previous = self.inner.state.borrow_mut().connect_watchdog.replace(timer);
        drop(previous);
    }

    fn start_heartbeat(&self) {
        let weak = self.downgrade();
        let timer = self
            .inner
            .loop_handle
            .interval(self.inner.config.heartbeat_interval(), move || {
                if let Some(session) = Self::upgrade(&weak) {
                    session.on_heartbeat_tick();
                }
            });

        let previous = self.inner.state.borrow_mut().heartbeat.replace(timer);
        drop(previous);
    }

    fn handle_connected(&self) {
        let inner = &self.inner;
        if self.status() != ConnectionStatus::Connecting {
            tracing::debug!(
                service = SERVICE_NAME,
                "Ignoring connected event while {}",
                self.status()
            );
            return;
        }

        let stale_reconnect = {
            let mut state = inner.state.borrow_mut();
            state.app_auth_retry_count = 0;
            state.send_failure_streak = 0;
            state.last_send_failure = None;
            state.last_message = Some(inner.loop_handle.now());
            state.reconnect_timer.take()
        };
        drop(stale_reconnect);

        inner.core.set_status(ConnectionStatus::Connected);
        inner.core.record(SessionEvent::Connected);
        inner
            .core
            .logger
            .info("Connected, sending application auth request");

        // The auth phase gets its own full budget
        self.start_connect_watchdog();
        self.start_heartbeat();
        self.send_app_auth();
    }

    fn send_app_auth(&self) {
        let Some(handle) = self.inner.state.borrow().handle.clone() else {
            return;
        };

        let request = ApplicationAuthReq::new(
            self.inner.credentials.client_id(),
            self.inner.credentials.client_secret(),
        );

        if let Err(e) = handle.send_payload(&request) {
            self.report_send_failure(&e.to_string());
        }
    }

    fn schedule_app_auth_retry(&self) {
        let inner = &self.inner;
        {
            let state = inner.state.borrow();
            if state.app_auth_retry_count >= APP_AUTH_RETRY_LIMIT
                || state
                    .app_auth_retry_timer
                    .as_ref()
                    .is_some_and(TimerHandle::is_pending)
            {
                return;
            }
        }

        let attempt = {
            let mut state = inner.state.borrow_mut();
            state.app_auth_retry_count += 1;
            state.app_auth_retry_count
        };

        inner.core.logger.info(format!(
            "Retrying application auth in {}s ({attempt}/{APP_AUTH_RETRY_LIMIT})",
            APP_AUTH_RETRY_DELAY.as_secs()
        ));

        let weak = self.downgrade();
        let timer = inner.loop_handle.schedule(APP_AUTH_RETRY_DELAY, move || {
            if let Some(session) = Self::upgrade(&weak) {
                let status = session.status();
                if status >= ConnectionStatus::Connected
                    && status < ConnectionStatus::AppAuthenticated
                {
                    session.send_app_auth();
                }
            }
        });

        inner.state.borrow_mut().app_auth_retry_timer = Some(timer);
    }

    fn handle_frame(&self, handle: &SessionHandle, message: &ProtoMessage) {
        let inner = &self.inner;
        inner.state.borrow_mut().last_message = Some(inner.loop_handle.now());

        let payload_type = message.payload_type;
        let builtin = match payload_type {
            PAYLOAD_APPLICATION_AUTH_RES => {
                self.handle_app_auth_response(handle);
                true
            }
            PAYLOAD_COMMON_ERROR_RES | PAYLOAD_OA_ERROR_RES => {
                self.handle_error_response(message);
                true
            }
            PAYLOAD_HEARTBEAT_EVENT | PAYLOAD_SPOT_EVENT | PAYLOAD_SYMBOL_CHANGED_EVENT => true,
            PAYLOAD_UNSUBSCRIBE_SPOTS_RES => {
                inner.core.logger.info("Spot unsubscribe confirmed");
                true
            }
            _ => is_noise_payload(payload_type),
        };

        let outcome =
            inner
                .router
                .dispatch(handle, message, DispatchMode::for_payload(payload_type));

        for (id, reason) in &outcome.failures {
            inner.core.logger.error(format!(
                "Message handler {id} failed on payload type {payload_type}: {reason}"
            ));
        }

        if !builtin && !outcome.handled {
            inner
                .core
                .logger
                .info(format!("Unhandled message type: {payload_type}"));
        }
    }

    fn handle_app_auth_response(&self, handle: &SessionHandle) {
        let inner = &self.inner;
        if self.status() != ConnectionStatus::Connected {
            tracing::debug!(
                service = SERVICE_NAME,
                "Ignoring application auth response while {}",
                self.status()
            );
            return;
        }

        let (timers, started) = {
            let mut state = inner.state.borrow_mut();
            state.reconnect_attempt = 0;
            let timers = [
                state.connect_watchdog.take(),
                state.app_auth_retry_timer.take(),
            ];
            (timers, state.connect_started.take())
        };
        drop(timers);

        inner.core.in_progress.end();
        inner.core.set_status(ConnectionStatus::AppAuthenticated);
        inner.core.record(SessionEvent::Success);
        if let Some(started) = started {
            inner.core.observe_latency(started.elapsed());
        }
        inner.core.logger.info("Application authenticated");

        let callback = inner.on_app_auth_success.borrow().clone();
        if let Some(callback) = callback {
            callback(handle);
        }
    }

    fn handle_error_response(&self, message: &ProtoMessage) {
        let inner = &self.inner;
        let Some(error) = VenueError::from_message(message) else {
            inner.core.logger.warn(format!(
                "Malformed error response (payload type {})",
                message.payload_type
            ));
            return;
        };

        if is_benign_subscription_error(&error.error_code, &error.description) {
            return;
        }

        // Once authenticated, errors belong to downstream requests
        if self.status() >= ConnectionStatus::AppAuthenticated && !self.in_progress() {
            inner.core.record(SessionEvent::PassiveError);
            inner.core.emit_error(&BrokerError::from_venue(
                ErrorCode::Provider,
                &error.error_code,
                &error.description,
            ));
            return;
        }

        inner.core.record(SessionEvent::Error);
        self.enter_disconnected(BrokerError::from_venue(
            ErrorCode::Auth,
            &error.error_code,
            &error.description,
        ));
    }

    fn on_heartbeat_tick(&self) {
        let inner = &self.inner;
        let status = self.status();

        if status < ConnectionStatus::Connected {
            return;
        }

        if status >= ConnectionStatus::AppAuthenticated {
            let idle = inner
                .state
                .borrow()
                .last_message
                .map_or(Duration::ZERO, |at| at.elapsed());
            if idle > inner.config.heartbeat_timeout() {
                inner.core.logger.warn(format!(
                    "No message received for {:.1}s, restarting transport",
                    idle.as_secs_f64()
                ));
                self.force_stop();
                return;
            }
        }

        self.send_heartbeat();
    }

    fn send_heartbeat(&self) {
        let inner = &self.inner;
        let now = inner.loop_handle.now();

        let (handle, should_log) = {
            let mut state = inner.state.borrow_mut();
            let should_log = state.last_heartbeat_log.is_none_or(|at| {
                now.duration_since(at) >= inner.config.heartbeat_log_interval()
            });
            if should_log {
                state.last_heartbeat_log = Some(now);
            }
            (state.handle.clone(), should_log)
        };

        let Some(handle) = handle else {
            return;
        };

        if should_log {
            inner.core.logger.info("Sending heartbeat");
        }

        if let Err(e) = handle.send_payload(&HeartbeatEvent::new()) {
            self.report_send_failure(&e.to_string());
        }
    }

    fn on_connect_watchdog(&self) {
        let status = self.status();
        if status >= ConnectionStatus::AppAuthenticated {
            return;
        }

        let reason = if status < ConnectionStatus::Connected {
            "connect timeout"
        } else {
            "app-auth timeout"
        };

        self.inner
            .core
            .logger
            .warn(format!("Connection watchdog expired: {reason}"));
        self.enter_disconnected(BrokerError::network("Connection failed").with_detail(reason));
    }

    /// Closes the current connection. The resulting disconnect event runs the disconnect path.
    fn force_stop(&self) {
        let handle = self.inner.state.borrow().handle.clone();
        if let Some(handle) = handle {
            handle.close();
        }
    }

    /// Tears down the current connection and, unless disconnected manually, schedules a
    /// reconnect.
    fn enter_disconnected(&self, error: BrokerError) {
        let inner = &self.inner;

        let (timers, handle, manual) = {
            let mut state = inner.state.borrow_mut();
            state.connect_started = None;
            let timers = [
                state.connect_watchdog.take(),
                state.heartbeat.take(),
                state.app_auth_retry_timer.take(),
            ];
            (timers, state.handle.take(), state.manual_disconnect)
        };
        drop(timers);

        if let Some(handle) = handle {
            handle.close();
        }

        inner.core.in_progress.end();
        inner.router.clear();
        inner.core.set_status(ConnectionStatus::Disconnected);
        inner.core.record(SessionEvent::Disconnected);
        inner.core.emit_error(&error);

        if !manual && inner.config.auto_reconnect {
            let reason = error.detail.as_deref().unwrap_or(&error.message).to_string();
            self.schedule_reconnect(&reason);
        }
    }

    fn schedule_reconnect(&self, reason: &str) {
        let inner = &self.inner;
        if self.has_pending_reconnect() {
            return;
        }

        let attempt = {
            let mut state = inner.state.borrow_mut();
            state.reconnect_attempt += 1;
            state.reconnect_attempt
        };

        let max_attempts = inner.config.reconnect_max_attempts;
        if max_attempts > 0 && attempt > max_attempts {
            inner.core.logger.warn(format!(
                "Reconnect attempts exhausted ({max_attempts}), not reconnecting"
            ));
            return;
        }

        let delay = inner.backoff.next_delay(attempt);
        inner.core.logger.info(format!(
            "Reconnecting in {:.1}s (attempt {attempt}): {reason}",
            delay.as_secs_f64()
        ));

        let weak = self.downgrade();
        let timer = inner.loop_handle.schedule(delay, move || {
            if let Some(session) = Self::upgrade(&weak) {
                session.on_reconnect_timer();
            }
        });

        inner.state.borrow_mut().reconnect_timer = Some(timer);
    }

    fn on_reconnect_timer(&self) {
        let inner = &self.inner;
        let fired = inner.state.borrow_mut().reconnect_timer.take();
        drop(fired);

        let status = self.status();
        let has_handle = inner.state.borrow().handle.is_some();

        if status >= ConnectionStatus::Connected && has_handle {
            tracing::debug!(service = SERVICE_NAME, "Reconnect skipped, already {status}");
            return;
        }

        if status == ConnectionStatus::Connecting && has_handle {
            let started = inner.state.borrow().connect_started;
            if started.is_some_and(|at| at.elapsed() < inner.config.connect_timeout()) {
                tracing::debug!(service = SERVICE_NAME, "Reconnect skipped, connect in progress");
                return;
            }

            let stale = inner.state.borrow_mut().handle.take();
            if let Some(stale) = stale {
                stale.close();
            }
            inner.core.in_progress.end();
            inner.core.set_status(ConnectionStatus::Disconnected);
        }

        self.connect();
    }
}
