#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Edge-case tests for malformed input, boundary values and protocol violations

use gamewire::core::buffer::{DEFAULT_BLOB_MAX_LENGTH, DEFAULT_STRING_MAX_LENGTH};
use gamewire::error::ProtocolError;
use gamewire::protocol::packet::RELIABLE_HEADER_LEN;
use gamewire::utils::crypto::{Crypto, OVERHEAD};
use gamewire::{
    Buffer, Connection, DisconnectReason, Dispatcher, NetSerializable, PacketType, SymbolTable,
    Vec3, BUFFER_CAPACITY, MTU,
};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// BUFFER EDGE CASES
// ============================================================================

#[test]
fn test_read_past_end_reports_underflow() {
    let mut buffer = Buffer::new();
    buffer.put_u16(7);
    buffer.rewind();

    match buffer.get_u32() {
        Err(ProtocolError::BufferUnderflow {
            position,
            needed,
            size,
        }) => {
            assert_eq!((position, needed, size), (0, 4, 2));
        }
        other => panic!("Unexpected result: {other:?}"),
    }
    assert_eq!(buffer.get_u16().unwrap(), 7);
}

#[test]
fn test_empty_string_is_two_zero_bytes() {
    let mut buffer = Buffer::new();
    buffer.put_str("");
    assert_eq!(buffer.payload(), &[0, 0]);
    buffer.rewind();
    assert_eq!(buffer.get_string().unwrap(), "");
}

#[test]
fn test_oversized_string_prefix_decodes_empty() {
    let mut buffer = Buffer::new();
    buffer.put_u16((DEFAULT_STRING_MAX_LENGTH * 2 + 1) as u16);
    buffer.put_bytes_raw(&[b'x'; 8]);
    buffer.rewind();

    assert_eq!(buffer.get_string().unwrap(), "");
    assert_eq!(buffer.position(), 2);
}

#[test]
fn test_string_truncated_on_char_boundary() {
    let long: String = "é".repeat(DEFAULT_STRING_MAX_LENGTH + 10);
    let mut buffer = Buffer::new();
    buffer.put_str(&long);
    buffer.rewind();

    let decoded = buffer.get_string().unwrap();
    assert_eq!(decoded.chars().count(), DEFAULT_STRING_MAX_LENGTH);
    assert!(long.starts_with(&decoded));
}

#[test]
fn test_custom_string_limit() {
    let mut buffer = Buffer::new();
    buffer.put_str_with_max("abcdefgh", 3);
    buffer.rewind();
    assert_eq!(buffer.get_string_with_max(3).unwrap(), "abc");
}

#[test]
fn test_blob_length_truncated_on_read() {
    let mut buffer = Buffer::new();
    buffer.put_blob_with_max(&[0xAA; 1000], 1000);
    buffer.rewind();

    let blob = buffer.get_blob().unwrap();
    assert_eq!(blob.len(), DEFAULT_BLOB_MAX_LENGTH);
    assert!(!buffer.has_data());
}

#[test]
fn test_unterminated_varint() {
    let mut buffer = Buffer::new();
    buffer.load(&[0xFF; 6]).unwrap();
    assert!(matches!(
        buffer.get_var_u32(),
        Err(ProtocolError::MalformedVarint)
    ));

    buffer.load(&[0x80, 0x80]).unwrap();
    assert!(matches!(
        buffer.get_var_u32(),
        Err(ProtocolError::BufferUnderflow { .. })
    ));
}

#[test]
fn test_varint_boundaries() {
    let cases: [(u32, &[u8]); 5] = [
        (0, &[0x00]),
        (127, &[0x7F]),
        (128, &[0x80, 0x01]),
        (300, &[0xAC, 0x02]),
        (u32::MAX, &[0xFF, 0xFF, 0xFF, 0xFF, 0x0F]),
    ];
    for (value, wire) in cases {
        let mut buffer = Buffer::new();
        buffer.put_var_u32(value);
        assert_eq!(buffer.payload(), wire, "encoding of {value}");
    }
}

#[test]
fn test_zigzag_wire_values() {
    let mut buffer = Buffer::new();
    for value in [0, -1, 1, -2, i32::MAX, i32::MIN] {
        buffer.put_var_i32(value);
    }
    buffer.rewind();
    assert_eq!(buffer.get_var_u32().unwrap(), 0);
    assert_eq!(buffer.get_var_u32().unwrap(), 1);
    assert_eq!(buffer.get_var_u32().unwrap(), 2);
    assert_eq!(buffer.get_var_u32().unwrap(), 3);
    assert_eq!(buffer.get_var_u32().unwrap(), u32::MAX - 1);
    assert_eq!(buffer.get_var_u32().unwrap(), u32::MAX);
}

#[test]
fn test_symbol_wire_scenario() {
    let mut local = SymbolTable::new();
    let mut buffer = Buffer::new();
    for symbol in ["alpha", "beta", "alpha"] {
        buffer.put_symbol(&mut local, symbol);
    }

    let mut expected = vec![0u8, 5, 0];
    expected.extend_from_slice(b"alpha");
    expected.extend_from_slice(&[0, 4, 0]);
    expected.extend_from_slice(b"beta");
    expected.push(1);
    assert_eq!(buffer.payload(), &expected[..]);

    buffer.rewind();
    let mut remote = SymbolTable::new();
    let decoded: Vec<String> = (0..3).map(|_| buffer.get_symbol(&mut remote).unwrap()).collect();
    assert_eq!(decoded, ["alpha", "beta", "alpha"]);
}

#[test]
fn test_truncated_symbols_keep_indices_aligned() {
    let mut local = SymbolTable::new();
    let mut buffer = Buffer::new();
    let stem = "x".repeat(DEFAULT_STRING_MAX_LENGTH);
    let symbols = [
        format!("{stem}-first"),
        "beta".to_string(),
        format!("{stem}-second"),
        "gamma".to_string(),
        "beta".to_string(),
        "gamma".to_string(),
    ];
    for symbol in &symbols {
        buffer.put_symbol(&mut local, symbol);
    }
    assert_eq!(local.len(), 3);

    buffer.rewind();
    let mut remote = SymbolTable::new();
    let decoded: Vec<String> = (0..symbols.len())
        .map(|_| buffer.get_symbol(&mut remote).unwrap())
        .collect();
    assert_eq!(decoded, [stem.as_str(), "beta", stem.as_str(), "gamma", "beta", "gamma"]);
    for symbol in [stem.as_str(), "beta", "gamma"] {
        assert_eq!(local.lookup(symbol), remote.lookup(symbol));
    }
}

#[test]
fn test_position_stream_wire_vector() {
    let mut buffer = Buffer::new();
    for point in [
        Vec3::new(0.0, 5.0, 1.0),
        Vec3::new(0.0, 5.0, 1.0),
        Vec3::new(3.0, 5.0, 1.0),
    ] {
        buffer.put_position(point);
    }
    // deltas [0, 50, 10], [0, 40, 0], [30, 50, 10] after zig-zag
    assert_eq!(buffer.payload(), &[0, 100, 20, 0, 80, 0, 60, 100, 20]);

    // short vectors written next are relative to the reference the positions left
    buffer.put_quantized(Vec3::new(2.0, 4.0, 6.0));

    buffer.rewind();
    buffer.quantization = Default::default();
    let decoded: Vec<Vec3> = (0..3).map(|_| buffer.get_position().unwrap()).collect();
    assert!((decoded[2].x - 3.0).abs() < 1e-4);
    assert!(decoded.iter().all(|p| (p.y - 5.0).abs() < 1e-4 && (p.z - 1.0).abs() < 1e-4));

    let short = buffer.get_quantized().unwrap();
    assert!((short.x - 2.0).abs() < 0.01);
    assert!((short.y - 4.0).abs() < 0.01);
    assert!((short.z - 6.0).abs() < 0.01);
}

#[test]
fn test_empty_symbol_never_registered() {
    let mut local = SymbolTable::new();
    let mut buffer = Buffer::new();
    buffer.put_symbol(&mut local, "");
    buffer.put_symbol(&mut local, "");
    assert!(local.is_empty());
    assert_eq!(buffer.payload(), &[0, 0, 0, 0, 0, 0]);

    buffer.rewind();
    let mut remote = SymbolTable::new();
    assert_eq!(buffer.get_symbol(&mut remote).unwrap(), "");
    assert!(remote.is_empty());
}

#[test]
fn test_unknown_symbol_index() {
    let mut buffer = Buffer::new();
    buffer.put_var_u32(4);
    buffer.rewind();
    assert!(matches!(
        buffer.get_symbol(&mut SymbolTable::new()),
        Err(ProtocolError::UnknownSymbol(4))
    ));
}

#[test]
fn test_endpoint_encoding() {
    let endpoint: SocketAddr = "10.0.0.7:7777".parse().unwrap();
    let mut buffer = Buffer::new();
    buffer.put_endpoint(&endpoint);
    buffer.rewind();
    assert_eq!(buffer.get_endpoint().unwrap(), endpoint);

    let mut bogus = Buffer::new();
    bogus.put_str("not an address");
    bogus.put_i32(1);
    bogus.rewind();
    assert!(matches!(
        bogus.get_endpoint(),
        Err(ProtocolError::InvalidAddress(_))
    ));
}

#[test]
fn test_copy_to_extends_destination() {
    let mut source = Buffer::new();
    source.put_bytes_raw(b"0123456789");
    let mut dest = Buffer::new();
    dest.put_bytes_raw(b"ab");

    source.copy_to(4, &mut dest, 2, 3).unwrap();
    assert_eq!(dest.payload(), b"ab456");
}

#[test]
fn test_datagram_larger_than_buffer() {
    let mut buffer = Buffer::new();
    let result = buffer.load(&vec![0u8; BUFFER_CAPACITY + 1]);
    assert!(matches!(result, Err(ProtocolError::BufferOverflow(_))));
}

#[derive(Debug, PartialEq)]
struct Score {
    player: u16,
    points: i32,
}

impl NetSerializable for Score {
    fn write(&self, buffer: &mut Buffer) {
        buffer.put_u16(self.player);
        buffer.put_var_i32(self.points);
    }

    fn read(buffer: &mut Buffer) -> gamewire::Result<Self> {
        Ok(Self {
            player: buffer.get_u16()?,
            points: buffer.get_var_i32()?,
        })
    }
}

#[test]
fn test_serializable_array() {
    let scores = vec![
        Score { player: 1, points: -40 },
        Score { player: 2, points: 900 },
    ];
    let mut buffer = Buffer::new();
    buffer.put_array(&scores);
    buffer.rewind();
    assert_eq!(buffer.get_array::<Score>().unwrap(), scores);

    let mut truncated = Buffer::new();
    truncated.put_u16(3);
    truncated.put(&Score { player: 1, points: 1 });
    truncated.rewind();
    assert!(truncated.get_array::<Score>().is_err());
}

// ============================================================================
// CRYPTO EDGE CASES
// ============================================================================

#[test]
fn test_packet_at_mtu_still_fits_after_encryption() {
    let crypto = Crypto::new(&[1u8; 32]).unwrap();
    let mut buffer = Buffer::new();
    buffer.put_bytes_raw(&[1u8; MTU * 2]);
    crypto.encrypt_buffer(&mut buffer).unwrap();
    assert_eq!(buffer.size(), MTU * 2 + OVERHEAD);
    crypto.decrypt_buffer(&mut buffer).unwrap();
    assert_eq!(buffer.size(), MTU * 2);
}

#[test]
fn test_truncated_ciphertext_rejected() {
    let crypto = Crypto::new(&[1u8; 32]).unwrap();
    let mut buffer = Buffer::new();
    buffer.load(&[1u8; OVERHEAD]).unwrap();
    assert!(crypto.decrypt_buffer(&mut buffer).is_err());
}

// ============================================================================
// CONNECTION EDGE CASES
// ============================================================================

fn silent() -> Connection {
    Connection::new(|_: &Buffer| {}, Dispatcher::new())
}

#[test]
fn test_first_reliable_packet_layout() {
    let wire = Arc::new(Mutex::new(Vec::new()));
    let sent = Arc::clone(&wire);
    let mut conn = Connection::new(
        move |buffer: &Buffer| sent.lock().unwrap().push(buffer.payload().to_vec()),
        Dispatcher::new(),
    );
    conn.send_reliable(|b, _| b.put_u8(0xAB)).unwrap();
    conn.update(Duration::ZERO, 3);

    let datagrams = wire.lock().unwrap().clone();
    assert_eq!(datagrams.len(), 1);
    let datagram = &datagrams[0];
    assert_eq!(datagram.len(), RELIABLE_HEADER_LEN + 1);
    assert_eq!(datagram[0], PacketType::Reliable.as_u8());
    assert_eq!(i16::from_le_bytes([datagram[1], datagram[2]]), 2);
    assert_eq!(&datagram[RELIABLE_HEADER_LEN..], &[0xAB]);
}

#[test]
fn test_empty_datagram_is_ignored() {
    let mut conn = silent();
    conn.receive_datagram(&[]).unwrap();
    assert!(!conn.is_closed());
}

#[test]
fn test_sequence_past_window_disconnects() {
    let mut conn = silent();
    let mut datagram = vec![PacketType::Reliable.as_u8()];
    datagram.extend_from_slice(&2048i16.to_le_bytes());
    datagram.extend_from_slice(&0u32.to_le_bytes());
    conn.receive_datagram(&datagram).unwrap();
    assert_eq!(conn.disconnect_reason(), Some(DisconnectReason::NegativeSequence));
}

#[test]
fn test_writes_after_disconnect_fail() {
    let mut conn = silent();
    conn.disconnect(DisconnectReason::Other);
    assert!(matches!(
        conn.send_reliable(|b, _| b.put_u8(1)),
        Err(ProtocolError::ConnectionClosed)
    ));
    assert!(matches!(
        conn.send_unreliable(|b, _| b.put_u8(1)),
        Err(ProtocolError::ConnectionClosed)
    ));
    assert!(conn.send_ping().is_err());
    assert!(conn.update(Duration::from_millis(1), 1));
}

#[test]
fn test_stray_ack_is_harmless() {
    let mut conn = silent();
    conn.receive_datagram(&[PacketType::Ack.as_u8(), 9, 0, 10, 0]).unwrap();
    conn.receive_datagram(&[PacketType::Ack.as_u8(), 9]).unwrap();
    assert!(!conn.is_closed());
    assert_eq!(conn.in_flight_count(), 0);
}

#[test]
fn test_sequence_wraps_around_window() {
    let mut conn = silent();
    for tick in 0..2050u32 {
        conn.send_reliable(|b, _| b.put_u8(0)).unwrap();
        conn.update(Duration::ZERO, tick);
    }

    let mut sequences: Vec<i16> = conn.in_flight().map(|b| b.sequence()).collect();
    sequences.sort_unstable();
    assert_eq!(sequences.len(), 2048);
    assert_eq!(sequences.first(), Some(&0));
    assert_eq!(sequences.last(), Some(&2047));
}
