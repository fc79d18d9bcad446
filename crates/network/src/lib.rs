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

//! Network plumbing for protobuf-over-TCP venue sessions.
//!
//! The `forex-network` crate provides:
//!
//! - A length-prefixed frame codec carrying the [`ProtoMessage`] envelope.
//! - The [`Connector`] and [`Connection`] traits the session layer is written against.
//! - A TCP/TLS implementation of those traits.
//! - Exponential reconnect backoff with jitter.

#![warn(rustc::all)]
#![deny(unsafe_code)]
#![deny(nonstandard_style)]
#![deny(missing_debug_implementations)]
#![deny(clippy::missing_errors_doc)]
#![deny(clippy::missing_panics_doc)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod backoff;
pub mod codec;
pub mod error;
pub mod tcp;
pub mod tls;
pub mod transport;

pub use crate::{
    backoff::ReconnectBackoff,
    codec::ProtoMessage,
    error::{TransportError, TransportResult},
    tcp::TcpConnector,
    transport::{
        Connection, ConnectionEpoch, Connector, Endpoint, EventReceiver, EventSender,
        TransportEvent, event_channel,
    },
};
