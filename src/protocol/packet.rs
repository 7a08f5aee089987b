//! Packet type tags and per-channel header layouts.
//!
//! ```text
//! Reliable:     [Type(1)] [Sequence i16] [Tick u32] [Payload(N)]
//! Unreliable:   [Type(1)] [Header hook]  [Tick u32] [Payload(N)]
//! Ack:          [Type(1)] [Sequence i16]*
//! Ping / Pong:  [Type(1)]
//! Disconnected: [Type(1)]
//! ```

use std::fmt;

use crate::error::ProtocolError;

/// Bytes of a reliable header, type tag included.
pub const RELIABLE_HEADER_LEN: usize = 1 + 2 + 4;

/// First byte of every datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketType {
    Unreliable = 0,
    Reliable = 1,
    Ack = 2,
    Ping = 3,
    Pong = 4,
    Disconnected = 5,
}

impl PacketType {
    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for PacketType {
    type Error = ProtocolError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(PacketType::Unreliable),
            1 => Ok(PacketType::Reliable),
            2 => Ok(PacketType::Ack),
            3 => Ok(PacketType::Ping),
            4 => Ok(PacketType::Pong),
            5 => Ok(PacketType::Disconnected),
            other => Err(ProtocolError::InvalidPacketType(other)),
        }
    }
}

impl From<PacketType> for u8 {
    fn from(kind: PacketType) -> Self {
        kind as u8
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PacketType::Unreliable => "UNRELIABLE",
            PacketType::Reliable => "RELIABLE",
            PacketType::Ack => "ACK",
            PacketType::Ping => "PING",
            PacketType::Pong => "PONG",
            PacketType::Disconnected => "DISCONNECTED",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_are_stable() {
        for tag in 0u8..=5 {
            let kind = PacketType::try_from(tag).ok();
            assert_eq!(kind.map(u8::from), Some(tag));
        }
    }

    #[test]
    fn test_unknown_tag() {
        assert!(matches!(
            PacketType::try_from(6),
            Err(ProtocolError::InvalidPacketType(6))
        ));
    }
}
