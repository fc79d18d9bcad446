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

//! Prometheus counters and latency histograms for session outcomes.
//!
//! Every service built on one [`TransportSession`](crate::session::TransportSession) records
//! into the same [`MetricsSlot`], which stays empty (and recording a no-op) until a
//! [`SessionMetrics`] is installed.

use std::{cell::RefCell, fmt::Debug, rc::Rc, time::Duration};

use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use strum::{AsRefStr, Display, EnumIter};

pub const EVENTS_METRIC: &str = "ctrader_session_events_total";
pub const LATENCY_METRIC: &str = "ctrader_request_latency_seconds";

const LATENCY_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// A countable session transition, used as the `event` label.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, AsRefStr, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum SessionEvent {
    Connected,
    Disconnected,
    Success,
    Error,
    PassiveError,
    Retry,
    Timeout,
    RefreshSuccess,
    RefreshFailure,
    RefreshMissing,
    DisconnectEvent,
    TokenInvalidatedEvent,
}

/// Session counters and request latencies, labelled by service.
#[derive(Clone)]
pub struct SessionMetrics {
    registry: Registry,
    events: IntCounterVec,
    latency: HistogramVec,
}

impl Debug for SessionMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(SessionMetrics))
            .field("events", &EVENTS_METRIC)
            .field("latency", &LATENCY_METRIC)
            .finish()
    }
}

impl SessionMetrics {
    /// Creates a new [`SessionMetrics`] registered in a fresh registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the collectors cannot be created or registered.
    pub fn new() -> prometheus::Result<Self> {
        Self::with_registry(Registry::new())
    }

    /// Creates a new [`SessionMetrics`] registered in `registry`.
    ///
    /// # Errors
    ///
    /// Returns an error if the collectors cannot be created, or if `registry` already holds
    /// collectors with the same names.
    pub fn with_registry(registry: Registry) -> prometheus::Result<Self> {
        let events = IntCounterVec::new(
            Opts::new(EVENTS_METRIC, "cTrader session transitions by service and event"),
            &["service", "event"],
        )?;
        let latency = HistogramVec::new(
            HistogramOpts::new(
                LATENCY_METRIC,
                "Seconds from request start to a successful response",
            )
            .buckets(LATENCY_BUCKETS.to_vec()),
            &["service"],
        )?;

        registry.register(Box::new(events.clone()))?;
        registry.register(Box::new(latency.clone()))?;

        Ok(Self {
            registry,
            events,
            latency,
        })
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn inc(&self, service: &str, event: SessionEvent) {
        self.events
            .with_label_values(&[service, event.as_ref()])
            .inc();
    }

    pub fn observe_latency(&self, service: &str, elapsed: Duration) {
        self.latency
            .with_label_values(&[service])
            .observe(elapsed.as_secs_f64());
    }

    #[must_use]
    pub fn count(&self, service: &str, event: SessionEvent) -> u64 {
        self.events
            .with_label_values(&[service, event.as_ref()])
            .get()
    }

    /// Returns the number of latency observations recorded for `service`.
    #[must_use]
    pub fn latency_samples(&self, service: &str) -> u64 {
        self.latency
            .with_label_values(&[service])
            .get_sample_count()
    }

    /// Renders the registry in the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the gathered families cannot be encoded.
    pub fn render(&self) -> prometheus::Result<String> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }
}

/// Shared, optionally empty holder of the [`SessionMetrics`] services record into.
#[derive(Clone, Debug, Default)]
pub struct MetricsSlot(Rc<RefCell<Option<SessionMetrics>>>);

impl MetricsSlot {
    pub fn set(&self, metrics: Option<SessionMetrics>) {
        *self.0.borrow_mut() = metrics;
    }

    #[must_use]
    pub fn get(&self) -> Option<SessionMetrics> {
        self.0.borrow().clone()
    }

    pub fn record(&self, service: &str, event: SessionEvent) {
        if let Some(metrics) = self.0.borrow().as_ref() {
            metrics.inc(service, event);
        }
    }

    pub fn observe_latency(&self, service: &str, elapsed: Duration) {
        if let Some(metrics) = self.0.borrow().as_ref() {
            metrics.observe_latency(service, elapsed);
        }
    }
}
