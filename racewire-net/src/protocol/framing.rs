//! Length-prefixed message framing codec.
//!
//! Messages are framed as:
//! - 4 bytes: frame magic
//! - 4 bytes: big-endian payload length
//! - N bytes: JSON-serialized payload

use std::marker::PhantomData;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::codec::{Decoder, Encoder};

use crate::config::{FRAME_MAGIC, MAX_MESSAGE_SIZE};
use crate::error::{NetError, NetResult};

/// Header size: 4 bytes magic + 4 bytes length.
const HEADER_SIZE: usize = 8;

/// Codec for length-prefixed JSON framing, generic over the payload type.
///
/// The peer surface instantiates it with `PeerMessage`, the client surface
/// with `ClientCommand` for reads.
#[derive(Debug)]
pub struct JsonCodec<T> {
    /// Expected length of the current message (if header has been read).
    current_length: Option<usize>,
    _marker: PhantomData<T>,
}

impl<T> JsonCodec<T> {
    /// Create a new codec.
    pub fn new() -> Self {
        Self {
            current_length: None,
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DeserializeOwned> Decoder for JsonCodec<T> {
    type Item = T;
    type Error = NetError;

    fn decode(&mut self, src: &mut BytesMut) -> NetResult<Option<Self::Item>> {
        // If we don't have the length yet, try to read the header
        if self.current_length.is_none() {
            if src.len() < HEADER_SIZE {
                return Ok(None);
            }

            let magic: [u8; 4] = src[0..4].try_into().unwrap();
            if magic != FRAME_MAGIC {
                return Err(NetError::InvalidMagic {
                    expected: FRAME_MAGIC,
                    actual: magic,
                });
            }

            let length = u32::from_be_bytes(src[4..8].try_into().unwrap()) as usize;

            if length > MAX_MESSAGE_SIZE {
                return Err(NetError::MessageTooLarge {
                    size: length,
                    max: MAX_MESSAGE_SIZE,
                });
            }

            self.current_length = Some(length);
        }

        let length = self.current_length.unwrap();

        // Check if we have the full message
        if src.len() < HEADER_SIZE + length {
            src.reserve(HEADER_SIZE + length - src.len());
            return Ok(None);
        }

        src.advance(HEADER_SIZE);
        let payload = src.split_to(length);

        // Reset state for next message
        self.current_length = None;

        let message: T = serde_json::from_slice(&payload)?;
        Ok(Some(message))
    }
}

impl<T: Serialize> Encoder<T> for JsonCodec<T> {
    type Error = NetError;

    fn encode(&mut self, message: T, dst: &mut BytesMut) -> NetResult<()> {
        let payload = serde_json::to_vec(&message)?;
        let length = payload.len();

        if length > MAX_MESSAGE_SIZE {
            return Err(NetError::MessageTooLarge {
                size: length,
                max: MAX_MESSAGE_SIZE,
            });
        }

        dst.reserve(HEADER_SIZE + length);
        dst.put_slice(&FRAME_MAGIC);
        dst.put_u32(length as u32);
        dst.put_slice(&payload);

        Ok(())
    }
}

/// Encode one complete frame into a shareable buffer.
///
/// The client hub serializes each event once and hands out cheap clones
/// of the resulting frame to every connection.
pub fn encode_frame<T: Serialize>(message: &T) -> NetResult<Bytes> {
    let payload = serde_json::to_vec(message)?;
    let length = payload.len();

    if length > MAX_MESSAGE_SIZE {
        return Err(NetError::MessageTooLarge {
            size: length,
            max: MAX_MESSAGE_SIZE,
        });
    }

    let mut frame = BytesMut::with_capacity(HEADER_SIZE + length);
    frame.put_slice(&FRAME_MAGIC);
    frame.put_u32(length as u32);
    frame.put_slice(&payload);
    Ok(frame.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::messages::PeerMessage;

    #[test]
    fn test_roundtrip_request() {
        let mut codec = JsonCodec::<PeerMessage>::new();
        let original = PeerMessage::request_state();

        let mut buf = BytesMut::new();
        codec.encode(original.clone(), &mut buf).unwrap();

        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_partial_header() {
        let mut codec = JsonCodec::<PeerMessage>::new();
        let mut buf = BytesMut::new();
        buf.put_slice(&FRAME_MAGIC);
        // Only 4 bytes, not enough for header

        let result = codec.decode(&mut buf).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_partial_message() {
        let mut codec = JsonCodec::<PeerMessage>::new();
        let mut buf = BytesMut::new();

        buf.put_slice(&FRAME_MAGIC);
        buf.put_u32(100); // 100 bytes expected
        buf.put_slice(&[0u8; 50]); // Only 50 bytes

        let result = codec.decode(&mut buf).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_invalid_magic() {
        let mut codec = JsonCodec::<PeerMessage>::new();
        let mut buf = BytesMut::new();

        buf.put_slice(&[0xFF, 0xFF, 0xFF, 0xFF]); // Wrong magic
        buf.put_u32(10);
        buf.put_slice(&[0u8; 10]);

        let result = codec.decode(&mut buf);
        assert!(matches!(result, Err(NetError::InvalidMagic { .. })));
    }

    #[test]
    fn test_message_too_large() {
        let mut codec = JsonCodec::<PeerMessage>::new();
        let mut buf = BytesMut::new();

        buf.put_slice(&FRAME_MAGIC);
        buf.put_u32((MAX_MESSAGE_SIZE + 1) as u32);

        let result = codec.decode(&mut buf);
        assert!(matches!(result, Err(NetError::MessageTooLarge { .. })));
    }

    #[test]
    fn test_malformed_payload_is_error_not_panic() {
        let mut codec = JsonCodec::<PeerMessage>::new();
        let mut buf = BytesMut::new();

        buf.put_slice(&FRAME_MAGIC);
        buf.put_u32(4);
        buf.put_slice(b"!!!!");

        let result = codec.decode(&mut buf);
        assert!(matches!(result, Err(NetError::Serialization(_))));
        // Buffer consumed the bad frame; next frame decodes cleanly
        codec.encode(PeerMessage::request_state(), &mut buf).unwrap();
        assert!(codec.decode(&mut buf).unwrap().is_some());
    }

    #[test]
    fn test_multiple_messages() {
        let mut codec = JsonCodec::<PeerMessage>::new();
        let mut buf = BytesMut::new();

        codec.encode(PeerMessage::request_state(), &mut buf).unwrap();
        codec
            .encode(PeerMessage::state_update(racewire_core::Snapshot::empty()), &mut buf)
            .unwrap();

        let msg1 = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(msg1, PeerMessage::request_state());

        let msg2 = codec.decode(&mut buf).unwrap().unwrap();
        assert!(matches!(msg2, PeerMessage::Update { .. }));

        assert!(buf.is_empty());
    }

    #[test]
    fn test_encode_frame_matches_codec() {
        let message = PeerMessage::request_state();
        let frame = encode_frame(&message).unwrap();

        let mut codec = JsonCodec::<PeerMessage>::new();
        let mut buf = BytesMut::from(&frame[..]);
        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, message);
    }
}
