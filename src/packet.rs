//! Raw notification framing shared by the ECG and motion characteristics.
//!
//! Every notification starts with an 8-bit wrapping sequence number followed
//! by a stream-specific payload. The payload keeps its reserved header; each
//! frame decoder knows how much of it to skip.

use crate::error::PacketError;

/// One notification, borrowed from the buffer handed over by the connection layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet<'a> {
    pub sequence: u8,
    pub payload: &'a [u8],
}

impl<'a> Packet<'a> {
    pub fn parse(bytes: &'a [u8]) -> Result<Self, PacketError> {
        match bytes.split_first() {
            Some((&sequence, payload)) => Ok(Self { sequence, payload }),
            None => Err(PacketError::Empty),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_splits_sequence() {
        let raw = [7u8, 1, 2, 3];
        let packet = Packet::parse(&raw).unwrap();
        assert_eq!(packet.sequence, 7);
        assert_eq!(packet.payload, &[1, 2, 3]);
    }

    #[test]
    fn test_sequence_only() {
        let packet = Packet::parse(&[255]).unwrap();
        assert_eq!(packet.sequence, 255);
        assert!(packet.payload.is_empty());
    }

    #[test]
    fn test_empty_is_error() {
        assert_eq!(Packet::parse(&[]), Err(PacketError::Empty));
    }
}
