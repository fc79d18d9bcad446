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

use std::rc::Rc;

use forex_network::{Connection, ConnectionEpoch, ProtoMessage, TransportError};

use crate::messages::Payload;

/// The live connection an authenticated session sends through.
///
/// A handle is bound to the connection epoch it was created for. Once the session moves to a
/// newer connection, sends through an old handle go to a closed connection and fail.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    epoch: ConnectionEpoch,
    connection: Rc<dyn Connection>,
}

impl SessionHandle {
    #[must_use]
    pub fn new(connection: Rc<dyn Connection>) -> Self {
        Self {
            epoch: connection.epoch(),
            connection,
        }
    }

    #[must_use]
    pub const fn epoch(&self) -> ConnectionEpoch {
        self.epoch
    }

    /// Sends a raw envelope.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying connection no longer accepts writes.
    pub fn send(&self, message: ProtoMessage) -> Result<(), TransportError> {
        self.connection.send(message)
    }

    /// Encodes `payload` into an envelope and sends it.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying connection no longer accepts writes.
    pub fn send_payload<P: Payload>(&self, payload: &P) -> Result<(), TransportError> {
        self.send(payload.to_message())
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.connection.is_closed()
    }

    pub(crate) fn close(&self) {
        self.connection.close();
    }
}
