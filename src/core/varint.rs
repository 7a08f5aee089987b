//! Base-128 variable-length integers and zig-zag mapping.
//!
//! Each byte carries 7 data bits, least significant group first; the high bit
//! (0x80) flags that another byte follows. Signed values are zig-zag mapped first
//! so that small magnitudes stay short regardless of sign.

/// Continuation flag carried by every byte except the last.
pub const CONTINUATION_BIT: u8 = 0x80;

/// Longest encoding of a `u32` (5 × 7 bits ≥ 32).
pub const MAX_VARINT_LEN: usize = 5;

/// Map a signed value onto an unsigned one: `(v << 1) ^ (v >> 31)`.
#[inline]
pub fn zigzag_encode(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

/// Inverse of [`zigzag_encode`].
#[inline]
pub fn zigzag_decode(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

/// Number of bytes `value` occupies on the wire.
#[inline]
pub fn encoded_len(value: u32) -> usize {
    match value {
        0..=0x7F => 1,
        0x80..=0x3FFF => 2,
        0x4000..=0x1F_FFFF => 3,
        0x20_0000..=0xFFF_FFFF => 4,
        _ => 5,
    }
}

/// Write `value` into `out`, returning the number of bytes used.
///
/// `out` must hold at least [`encoded_len`] bytes.
#[inline]
pub fn encode_into(mut value: u32, out: &mut [u8]) -> usize {
    let mut written = 0;
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value > 0 {
            byte |= CONTINUATION_BIT;
        }
        out[written] = byte;
        written += 1;
        if value == 0 {
            return written;
        }
    }
}
