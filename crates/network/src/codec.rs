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

//! Protobuf envelope and the length-prefixed frame codec carrying it.
//!
//! Every frame on the wire is a 4-byte big-endian length followed by an encoded
//! [`ProtoMessage`], whose `payload` holds the inner message identified by `payload_type`.

use bytes::{Bytes, BytesMut};
use prost::Message;
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

use crate::error::TransportError;

/// Upper bound on a single frame, guarding against corrupt length prefixes.
pub const MAX_FRAME_LENGTH: usize = 16 * 1024 * 1024;

/// The outer envelope of every message exchanged with the venue.
#[derive(Clone, PartialEq, Eq, Message)]
pub struct ProtoMessage {
    #[prost(uint32, required, tag = "1")]
    pub payload_type: u32,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub payload: Option<Vec<u8>>,
    #[prost(string, optional, tag = "3")]
    pub client_msg_id: Option<String>,
}

impl ProtoMessage {
    /// Creates a new envelope around an already encoded payload.
    #[must_use]
    pub fn new(payload_type: u32, payload: Vec<u8>) -> Self {
        Self {
            payload_type,
            payload: Some(payload),
            client_msg_id: None,
        }
    }

    /// Wraps `payload` in an envelope tagged with `payload_type`.
    #[must_use]
    pub fn from_payload<M: Message>(payload_type: u32, payload: &M) -> Self {
        Self::new(payload_type, payload.encode_to_vec())
    }

    #[must_use]
    pub fn with_client_msg_id(mut self, client_msg_id: impl Into<String>) -> Self {
        self.client_msg_id = Some(client_msg_id.into());
        self
    }

    /// Decodes the inner payload as `M`. An absent payload decodes as `M::default()`.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload bytes are not a valid encoding of `M`.
    pub fn decode_payload<M: Message + Default>(&self) -> Result<M, prost::DecodeError> {
        M::decode(self.payload.as_deref().unwrap_or_default())
    }
}

/// Frames [`ProtoMessage`] values with a 4-byte big-endian length prefix.
#[derive(Debug)]
pub struct ProtoFrameCodec {
    inner: LengthDelimitedCodec,
}

impl ProtoFrameCodec {
    /// Creates a new codec accepting frames up to `max_frame_length` bytes.
    #[must_use]
    pub fn new(max_frame_length: usize) -> Self {
        let inner = LengthDelimitedCodec::builder()
            .length_field_length(4)
            .big_endian()
            .max_frame_length(max_frame_length)
            .new_codec();
        Self { inner }
    }
}

impl Default for ProtoFrameCodec {
    fn default() -> Self {
        Self::new(MAX_FRAME_LENGTH)
    }
}

impl Decoder for ProtoFrameCodec {
    type Item = ProtoMessage;
    type Error = TransportError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.inner.decode(src)? {
            Some(frame) => Ok(Some(ProtoMessage::decode(frame.freeze())?)),
            None => Ok(None),
        }
    }
}

impl Encoder<ProtoMessage> for ProtoFrameCodec {
    type Error = TransportError;

    fn encode(&mut self, item: ProtoMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let body = Bytes::from(item.encode_to_vec());
        self.inner.encode(body, dst)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bytes::BufMut;
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_encode_writes_big_endian_length_prefix() {
        let mut codec = ProtoFrameCodec::default();
        let message = ProtoMessage::new(2100, vec![1, 2, 3]);
        let body_len = message.encoded_len();

        let mut dst = BytesMut::new();
        codec.encode(message, &mut dst).unwrap();

        assert_eq!(dst.len(), 4 + body_len);
        assert_eq!(&dst[..4], &(body_len as u32).to_be_bytes());
    }

    #[rstest]
    fn test_decode_waits_for_complete_frame() {
        let mut codec = ProtoFrameCodec::default();
        let message = ProtoMessage::new(51, Vec::new()).with_client_msg_id("hb-1");

        let mut encoded = BytesMut::new();
        codec.encode(message.clone(), &mut encoded).unwrap();
        let split_at = encoded.len() - 2;
        let tail = encoded.split_off(split_at);

        assert!(codec.decode(&mut encoded).unwrap().is_none());

        encoded.unsplit(tail);
        let decoded = codec.decode(&mut encoded).unwrap().unwrap();
        assert_eq!(decoded, message);
        assert!(encoded.is_empty());
    }

    #[rstest]
    fn test_decode_rejects_oversized_frame() {
        let mut codec = ProtoFrameCodec::new(8);
        let mut src = BytesMut::new();
        src.put_u32(64);
        src.put_slice(&[0u8; 64]);

        assert!(matches!(codec.decode(&mut src), Err(TransportError::Io(_))));
    }

    #[rstest]
    fn test_missing_payload_decodes_as_default() {
        let message = ProtoMessage {
            payload_type: 51,
            payload: None,
            client_msg_id: None,
        };
        let decoded: u32 = message.decode_payload().unwrap();
        assert_eq!(decoded, 0);
    }
}
