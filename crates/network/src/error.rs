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

//! Error types for the framed transport layer.

use thiserror::Error;

/// Errors raised while opening, reading from or writing to a transport connection.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection has not been established or was already released.
    #[error("Not connected")]
    NotConnected,
    /// The connection was closed and can no longer accept writes.
    #[error("Connection closed")]
    Closed,
    /// An underlying socket error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TLS configuration or handshake failure.
    #[error("TLS error: {0}")]
    Tls(String),
    /// A message could not be encoded into a frame.
    #[error("Encode error: {0}")]
    Encode(#[from] prost::EncodeError),
    /// A received frame could not be decoded into a message.
    #[error("Decode error: {0}")]
    Decode(#[from] prost::DecodeError),
}

impl TransportError {
    /// Returns `true` if the error indicates the connection itself is no longer usable.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::NotConnected | Self::Closed | Self::Io(_) | Self::Tls(_)
        )
    }
}

/// A type alias for results returned by the transport layer.
pub type TransportResult<T> = Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_io_errors_are_fatal() {
        let err = TransportError::from(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset by peer",
        ));
        assert!(err.is_fatal());
        assert_eq!(err.to_string(), "I/O error: reset by peer");
    }

    #[rstest]
    fn test_decode_errors_are_not_fatal() {
        let mut truncated: &[u8] = &[0xff];
        let decode_err = prost::encoding::decode_varint(&mut truncated).unwrap_err();
        let err = TransportError::from(decode_err);
        assert!(!err.is_fatal());
    }
}
