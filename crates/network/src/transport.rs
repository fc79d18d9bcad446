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

//! Connection abstractions shared by concrete transports and the session layer.
//!
//! A [`Connector`] opens a [`Connection`] for a given [`ConnectionEpoch`]. The connection
//! reports everything that happens to it as `(epoch, TransportEvent)` pairs on an unbounded
//! channel, so consumers can discard events from connections they have already abandoned.

use std::{fmt::Debug, rc::Rc};

use tokio::sync::mpsc;

use crate::{codec::ProtoMessage, error::TransportError};

/// Monotonic identifier of a single connection attempt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionEpoch(u64);

impl ConnectionEpoch {
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Returns the epoch following this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl std::fmt::Display for ConnectionEpoch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Network location of the venue gateway.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub tls: bool,
}

impl Endpoint {
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16, tls: bool) -> Self {
        Self {
            host: host.into(),
            port,
            tls,
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Something that happened on a connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    /// The stream is open and ready for writes.
    Connected,
    /// A complete message was received.
    Frame(ProtoMessage),
    /// A queued write could not be delivered.
    SendFailed(String),
    /// The connection ended, or could not be opened at all.
    Disconnected(String),
}

impl TransportEvent {
    /// Returns a short name for the event kind, suitable for logging.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Frame(_) => "frame",
            Self::SendFailed(_) => "send_failed",
            Self::Disconnected(_) => "disconnected",
        }
    }
}

pub type EventSender = mpsc::UnboundedSender<(ConnectionEpoch, TransportEvent)>;
pub type EventReceiver = mpsc::UnboundedReceiver<(ConnectionEpoch, TransportEvent)>;

/// Creates the channel over which connections report their events.
#[must_use]
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// A live (or pending) connection to the venue.
pub trait Connection: Debug {
    /// The epoch this connection was opened under.
    fn epoch(&self) -> ConnectionEpoch;

    /// Queues `message` for delivery.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection can no longer accept writes.
    fn send(&self, message: ProtoMessage) -> Result<(), TransportError>;

    /// Requests the connection to close.
    ///
    /// Implementations must still report [`TransportEvent::Disconnected`] for a locally
    /// initiated close, exactly once per connection.
    fn close(&self);

    /// Returns `true` once [`Connection::close`] has been requested or the stream has ended.
    fn is_closed(&self) -> bool;
}

/// Opens connections.
pub trait Connector {
    /// Starts opening a connection to `endpoint` and returns immediately.
    ///
    /// The outcome is reported on `events`: [`TransportEvent::Connected`] once the stream is
    /// usable, or [`TransportEvent::Disconnected`] if it could not be established.
    fn connect(
        &self,
        endpoint: &Endpoint,
        epoch: ConnectionEpoch,
        events: EventSender,
    ) -> Rc<dyn Connection>;
}
