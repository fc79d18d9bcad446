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

//! [cTrader Open API](https://help.ctrader.com/open-api/) broker session engine.
//!
//! The `forex-ctrader` crate provides:
//!
//! - [`TransportSession`](session::TransportSession): the venue connection with application
//!   authentication, heartbeats, watchdogs and reconnection.
//! - [`AccountSession`](session::AccountSession): account authentication with transparent
//!   token refresh and logout.
//! - [`TimeoutTracker`](timeout::TimeoutTracker) and
//!   [`RequestLifecycle`](lifecycle::RequestLifecycle): the deadline and cleanup contract
//!   shared by request services such as [`SymbolListService`](services::SymbolListService).
//!
//! All session state lives on one [`EventLoop`](runtime::EventLoop). Session outcomes are
//! counted in an optional Prometheus registry, see [`SessionMetrics`](metrics::SessionMetrics).
//!
//! # Feature flags
//!
//! - `bin`: Builds the `ctrader-session` binary.

#![warn(rustc::all)]
#![deny(unsafe_code)]
#![deny(nonstandard_style)]
#![deny(missing_debug_implementations)]
#![deny(clippy::missing_errors_doc)]
#![deny(clippy::missing_panics_doc)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod auth;
pub mod common;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod messages;
pub mod metrics;
pub mod router;
pub mod runtime;
pub mod service;
pub mod services;
pub mod session;
pub mod stubs;
pub mod timeout;
