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

//! Enumerations shared across the cTrader adapter.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use super::consts::{CTRADER_DEMO_HOST, CTRADER_LIVE_HOST};

/// Lifecycle status of a session.
///
/// The ordering is meaningful: a status compares greater than every status it implies.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    AsRefStr,
    Display,
    EnumIter,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    #[default]
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
    AppAuthenticated = 3,
    AccountAuthenticated = 4,
}

impl ConnectionStatus {
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// cTrader environment to connect to.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    AsRefStr,
    Display,
    EnumIter,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "bin", derive(clap::ValueEnum))]
pub enum HostType {
    #[default]
    Demo,
    Live,
}

impl HostType {
    /// Returns the gateway host name for this environment.
    #[must_use]
    pub const fn host(self) -> &'static str {
        match self {
            Self::Demo => CTRADER_DEMO_HOST,
            Self::Live => CTRADER_LIVE_HOST,
        }
    }
}
