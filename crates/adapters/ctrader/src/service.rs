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

//! Concerns shared by every service: logging with history, status notification, the
//! in-progress flag and error reporting.

use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    rc::Rc,
    time::Duration,
};

use tokio::time::Instant;

use crate::{
    common::{consts::LOG_HISTORY_CAPACITY, enums::ConnectionStatus},
    error::BrokerError,
    metrics::{MetricsSlot, SessionEvent},
};

pub type LogCallback = Rc<dyn Fn(&str)>;
pub type ErrorCallback = Rc<dyn Fn(&BrokerError)>;
pub type StatusCallback = Rc<dyn Fn(ConnectionStatus)>;

/// Severity of a service log line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// Emits service log lines to `tracing` and to an optional callback, keeping a bounded history.
pub struct Logger {
    service: &'static str,
    history: RefCell<VecDeque<String>>,
    capacity: usize,
    on_log: RefCell<Option<LogCallback>>,
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(Logger))
            .field("service", &self.service)
            .field("history_len", &self.history.borrow().len())
            .field("has_callback", &self.on_log.borrow().is_some())
            .finish()
    }
}

impl Logger {
    /// Creates a new [`Logger`] for `service` with the default history capacity.
    #[must_use]
    pub fn new(service: &'static str) -> Self {
        Self::with_capacity(service, LOG_HISTORY_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(service: &'static str, capacity: usize) -> Self {
        Self {
            service,
            history: RefCell::new(VecDeque::with_capacity(capacity.min(64))),
            capacity: capacity.max(1),
            on_log: RefCell::new(None),
        }
    }

    #[must_use]
    pub const fn service(&self) -> &'static str {
        self.service
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message.into());
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message.into());
    }

    pub fn log(&self, level: LogLevel, message: String) {
        match level {
            LogLevel::Info => tracing::info!(service = self.service, "{message}"),
            LogLevel::Warn => tracing::warn!(service = self.service, "{message}"),
            LogLevel::Error => tracing::error!(service = self.service, "{message}"),
        }

        {
            let mut history = self.history.borrow_mut();
            if history.len() == self.capacity {
                history.pop_front();
            }
            history.push_back(message.clone());
        }

        let callback = self.on_log.borrow().clone();
        if let Some(callback) = callback {
            callback(&message);
        }
    }

    /// Replaces the log callback, replaying the retained history to the new one.
    pub fn set_callback(&self, on_log: Option<LogCallback>) {
        *self.on_log.borrow_mut() = on_log.clone();

        if let Some(callback) = on_log {
            let history: Vec<String> = self.history.borrow().iter().cloned().collect();
            for line in &history {
                callback(line);
            }
        }
    }

    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.history.borrow().iter().cloned().collect()
    }

    pub fn clear_history(&self) {
        self.history.borrow_mut().clear();
    }
}

/// Holds a [`ConnectionStatus`] and notifies on every change.
#[derive(Default)]
pub struct StatusNotifier {
    status: Cell<ConnectionStatus>,
    on_status_changed: RefCell<Option<StatusCallback>>,
}

impl std::fmt::Debug for StatusNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(StatusNotifier))
            .field("status", &self.status.get())
            .finish()
    }
}

impl StatusNotifier {
    #[must_use]
    pub fn get(&self) -> ConnectionStatus {
        self.status.get()
    }

    /// Sets the status, returning `true` (and notifying) only if it changed.
    pub fn set(&self, status: ConnectionStatus) -> bool {
        if self.status.replace(status) == status {
            return false;
        }

        let callback = self.on_status_changed.borrow().clone();
        if let Some(callback) = callback {
            callback(status);
        }
        true
    }

    pub fn set_callback(&self, on_status_changed: Option<StatusCallback>) {
        *self.on_status_changed.borrow_mut() = on_status_changed;
    }
}

/// Per-operation flag preventing duplicate concurrent attempts.
#[derive(Debug, Default)]
pub struct InProgressGuard {
    flag: Cell<bool>,
}

impl InProgressGuard {
    /// Sets the flag, returning `false` if it was already set.
    pub fn try_start(&self) -> bool {
        !self.flag.replace(true)
    }

    /// Clears the flag, returning `true` if it was set.
    pub fn end(&self) -> bool {
        self.flag.replace(false)
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        self.flag.get()
    }
}

/// Callbacks every service accepts.
#[derive(Clone, Default)]
pub struct ServiceCallbacks {
    pub on_error: Option<ErrorCallback>,
    pub on_log: Option<LogCallback>,
    pub on_status_changed: Option<StatusCallback>,
}

impl std::fmt::Debug for ServiceCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(ServiceCallbacks))
            .field("on_error", &self.on_error.is_some())
            .field("on_log", &self.on_log.is_some())
            .field("on_status_changed", &self.on_status_changed.is_some())
            .finish()
    }
}

impl ServiceCallbacks {
    #[must_use]
    pub fn with_on_error(mut self, on_error: impl Fn(&BrokerError) + 'static) -> Self {
        self.on_error = Some(Rc::new(on_error));
        self
    }

    #[must_use]
    pub fn with_on_log(mut self, on_log: impl Fn(&str) + 'static) -> Self {
        self.on_log = Some(Rc::new(on_log));
        self
    }

    #[must_use]
    pub fn with_on_status_changed(
        mut self,
        on_status_changed: impl Fn(ConnectionStatus) + 'static,
    ) -> Self {
        self.on_status_changed = Some(Rc::new(on_status_changed));
        self
    }
}

/// The composed concerns of a single service.
pub struct ServiceCore {
    pub logger: Logger,
    pub status: StatusNotifier,
    pub in_progress: InProgressGuard,
    metrics: MetricsSlot,
    started_at: Cell<Option<Instant>>,
    on_error: RefCell<Option<ErrorCallback>>,
}

impl std::fmt::Debug for ServiceCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(ServiceCore))
            .field("logger", &self.logger)
            .field("status", &self.status)
            .field("in_progress", &self.in_progress)
            .finish_non_exhaustive()
    }
}

impl ServiceCore {
    #[must_use]
    pub fn new(service: &'static str) -> Self {
        Self::with_metrics(service, MetricsSlot::default())
    }

    /// Creates a new [`ServiceCore`] recording into `metrics`.
    #[must_use]
    pub fn with_metrics(service: &'static str, metrics: MetricsSlot) -> Self {
        Self {
            logger: Logger::new(service),
            status: StatusNotifier::default(),
            in_progress: InProgressGuard::default(),
            metrics,
            started_at: Cell::new(None),
            on_error: RefCell::new(None),
        }
    }

    #[must_use]
    pub const fn metrics(&self) -> &MetricsSlot {
        &self.metrics
    }

    pub fn record(&self, event: SessionEvent) {
        self.metrics.record(self.logger.service(), event);
    }

    pub fn observe_latency(&self, elapsed: Duration) {
        self.metrics.observe_latency(self.logger.service(), elapsed);
    }

    /// Marks the start of the operation whose latency [`ServiceCore::observe_since_start`]
    /// reports.
    pub fn mark_started(&self) {
        self.started_at.set(Some(Instant::now()));
    }

    /// Records the time since [`ServiceCore::mark_started`], at most once per mark.
    pub fn observe_since_start(&self) {
        if let Some(started) = self.started_at.take() {
            self.observe_latency(started.elapsed());
        }
    }

    /// Replaces every callback. The log history is replayed to a new `on_log`.
    pub fn set_callbacks(&self, callbacks: ServiceCallbacks) {
        *self.on_error.borrow_mut() = callbacks.on_error;
        self.status.set_callback(callbacks.on_status_changed);
        self.logger.set_callback(callbacks.on_log);
    }

    /// Logs `error` and delivers it to `on_error`.
    pub fn emit_error(&self, error: &BrokerError) {
        self.logger.error(error.to_string());

        let callback = self.on_error.borrow().clone();
        if let Some(callback) = callback {
            callback(error);
        }
    }

    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.status.get()
    }

    pub fn set_status(&self, status: ConnectionStatus) -> bool {
        self.status.set(status)
    }

    #[must_use]
    pub fn in_progress(&self) -> bool {
        self.in_progress.is_set()
    }
}
