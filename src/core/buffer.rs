//! # Packet Buffer
//!
//! Fixed-capacity byte container with a single cursor, used for every packet
//! the transport builds or receives.
//!
//! Storage is allocated once (three times the MTU) and then recycled through
//! the [buffer pool](crate::utils::buffer_pool). Writes advance the cursor and
//! grow the valid length; reads advance the cursor and never pass the valid
//! length.
//!
//! ## Wire Encodings
//! - Fixed-width integers: little-endian
//! - Varints: base-128, continuation bit 0x80, zig-zag for signed values
//! - Strings: `u16` byte length + UTF-8, truncated to a character limit
//! - Byte blobs: varint length + raw bytes, capped at 800 bytes by default
//! - Floats and vectors: quantized, see [`quantize`](crate::core::quantize)
//!
//! ## Panics
//! Writing past the storage capacity is a programming error and panics. The
//! channel flush thresholds keep packets far below capacity in normal use.
//!
//! Reads never panic: running out of valid bytes yields
//! [`ProtocolError::BufferUnderflow`].

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU8, Ordering};

use tracing::debug;

use crate::core::quantize::{self, QuantizationContext, Vec3};
use crate::core::serializable::NetSerializable;
use crate::core::symbols::SymbolTable;
use crate::core::varint::{self, MAX_VARINT_LEN};
use crate::error::{ProtocolError, Result};
use crate::protocol::connection::ConnectionId;
use crate::utils::metrics::global_metrics;

/// Maximum transmission unit of the protocol.
pub const MTU: usize = 1200;

/// Storage reserved per buffer.
pub const BUFFER_CAPACITY: usize = MTU * 3;

/// Default character limit for strings and symbols.
pub const DEFAULT_STRING_MAX_LENGTH: usize = 80;

/// Default byte limit for length-prefixed blobs.
pub const DEFAULT_BLOB_MAX_LENGTH: usize = 800;

/// Acknowledgment flag of a retained reliable buffer.
///
/// An external resend scheduler watches this flag; the core only moves it
/// between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AckState {
    /// Nothing to resend: acknowledged, abandoned, or never tracked.
    Settled = 0,
    /// Sent and awaiting acknowledgment.
    Pending = 1,
    /// Handed to the sink again by a resend.
    Resending = 2,
}

impl AckState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            1 => AckState::Pending,
            2 => AckState::Resending,
            _ => AckState::Settled,
        }
    }
}

/// Packed byte container with a read/write cursor.
pub struct Buffer {
    data: Box<[u8]>,
    position: usize,
    size: usize,
    reliable: bool,
    acked: AtomicU8,
    sequence: i16,
    tick: u32,
    owner: Option<ConnectionId>,
    /// Per-packet rolling reference for the vector encodings.
    pub quantization: QuantizationContext,
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("position", &self.position)
            .field("size", &self.size)
            .field("reliable", &self.reliable)
            .field("ack", &self.ack_state())
            .field("sequence", &self.sequence)
            .field("tick", &self.tick)
            .field("owner", &self.owner)
            .finish()
    }
}

impl Buffer {
    /// Allocate a fresh buffer. Prefer [`crate::utils::buffer_pool::acquire`].
    pub fn new() -> Self {
        let allocated = global_metrics().buffer_allocated();
        if allocated % 10 == 0 {
            debug!(allocated, "Allocated buffer count");
        }

        Self {
            data: vec![0u8; BUFFER_CAPACITY].into_boxed_slice(),
            position: 0,
            size: 0,
            reliable: false,
            acked: AtomicU8::new(AckState::Settled as u8),
            sequence: 0,
            tick: 0,
            owner: None,
            quantization: QuantizationContext::default(),
        }
    }

    /// Clear all logical state; storage is kept.
    pub fn reset(&mut self) {
        self.position = 0;
        self.size = 0;
        self.reliable = false;
        self.acked.store(AckState::Settled as u8, Ordering::Release);
        self.sequence = 0;
        self.tick = 0;
        self.owner = None;
        self.quantization.reset();
    }

    /// Replace the contents with a received datagram and rewind.
    pub fn load(&mut self, datagram: &[u8]) -> Result<()> {
        if datagram.len() > self.data.len() {
            return Err(ProtocolError::BufferOverflow(datagram.len()));
        }
        self.data[..datagram.len()].copy_from_slice(datagram);
        self.size = datagram.len();
        self.position = 0;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Cursor and metadata
    // ------------------------------------------------------------------

    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Move the cursor; it is clamped to the valid length.
    #[inline]
    pub fn set_position(&mut self, position: usize) {
        self.position = position.min(self.size);
    }

    #[inline]
    pub fn rewind(&mut self) {
        self.position = 0;
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Shrink or extend the valid length, keeping the cursor inside it.
    pub fn set_size(&mut self, size: usize) {
        debug_assert!(size <= self.data.len());
        self.size = size.min(self.data.len());
        self.position = self.position.min(self.size);
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.size - self.position
    }

    #[inline]
    pub fn has_data(&self) -> bool {
        self.position < self.size
    }

    /// Valid bytes, as they go on the wire.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.size]
    }

    /// Whole backing storage, for in-place transforms.
    #[inline]
    pub(crate) fn storage_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    #[inline]
    pub fn is_reliable(&self) -> bool {
        self.reliable
    }

    #[inline]
    pub fn set_reliable(&mut self, reliable: bool) {
        self.reliable = reliable;
    }

    #[inline]
    pub fn sequence(&self) -> i16 {
        self.sequence
    }

    #[inline]
    pub fn set_sequence(&mut self, sequence: i16) {
        self.sequence = sequence;
    }

    #[inline]
    pub fn tick(&self) -> u32 {
        self.tick
    }

    #[inline]
    pub fn set_tick(&mut self, tick: u32) {
        self.tick = tick;
    }

    #[inline]
    pub fn owner(&self) -> Option<ConnectionId> {
        self.owner
    }

    #[inline]
    pub fn set_owner(&mut self, owner: Option<ConnectionId>) {
        self.owner = owner;
    }

    /// Current acknowledgment flag; safe to read from any thread.
    #[inline]
    pub fn ack_state(&self) -> AckState {
        AckState::from_raw(self.acked.load(Ordering::Acquire))
    }

    /// Swap in a new acknowledgment flag and return the previous one.
    #[inline]
    pub fn swap_ack_state(&self, state: AckState) -> AckState {
        AckState::from_raw(self.acked.swap(state as u8, Ordering::AcqRel))
    }

    // ------------------------------------------------------------------
    // Raw access
    // ------------------------------------------------------------------

    #[inline]
    fn reserve(&mut self, count: usize) -> &mut [u8] {
        debug_assert!(
            self.position + count <= self.data.len(),
            "write of {count} bytes at {} exceeds capacity",
            self.position
        );
        let start = self.position;
        self.position += count;
        if self.position > self.size {
            self.size = self.position;
        }
        &mut self.data[start..start + count]
    }

    #[inline]
    fn take(&mut self, count: usize) -> Result<&[u8]> {
        if count > self.size - self.position {
            return Err(ProtocolError::BufferUnderflow {
                position: self.position,
                needed: count,
                size: self.size,
            });
        }
        let start = self.position;
        self.position += count;
        Ok(&self.data[start..start + count])
    }

    fn peek_u16(&self) -> Result<u16> {
        let start = self.position;
        if self.size - start < 2 {
            return Err(ProtocolError::BufferUnderflow {
                position: start,
                needed: 2,
                size: self.size,
            });
        }
        Ok(u16::from_le_bytes([self.data[start], self.data[start + 1]]))
    }

    #[inline]
    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Append bytes without any prefix.
    #[inline]
    pub fn put_bytes_raw(&mut self, bytes: &[u8]) {
        self.reserve(bytes.len()).copy_from_slice(bytes);
    }

    /// Read `count` bytes without any prefix.
    #[inline]
    pub fn get_bytes_raw(&mut self, count: usize) -> Result<&[u8]> {
        self.take(count)
    }

    /// Copy `count` bytes starting at `src_offset` into `dest` at `dest_offset`.
    ///
    /// The source range must lie within this buffer's size and the target
    /// range within the destination's capacity.
    pub fn copy_to(
        &self,
        src_offset: usize,
        dest: &mut Buffer,
        dest_offset: usize,
        count: usize,
    ) -> Result<()> {
        let src_end = src_offset
            .checked_add(count)
            .filter(|&end| end <= self.size)
            .ok_or(ProtocolError::BufferUnderflow {
                position: src_offset,
                needed: count,
                size: self.size,
            })?;
        let dest_end = dest_offset
            .checked_add(count)
            .filter(|&end| end <= dest.data.len())
            .ok_or(ProtocolError::BufferOverflow(dest_offset.saturating_add(count)))?;

        dest.data[dest_offset..dest_end].copy_from_slice(&self.data[src_offset..src_end]);
        dest.size = dest.size.max(dest_end);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Fixed-width values
    // ------------------------------------------------------------------

    #[inline]
    pub fn put_u8(&mut self, value: u8) {
        self.reserve(1)[0] = value;
    }

    #[inline]
    pub fn get_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    #[inline]
    pub fn put_i8(&mut self, value: i8) {
        self.put_u8(value as u8);
    }

    #[inline]
    pub fn get_i8(&mut self) -> Result<i8> {
        Ok(self.get_u8()? as i8)
    }

    #[inline]
    pub fn put_bool(&mut self, value: bool) {
        self.put_u8(value as u8);
    }

    #[inline]
    pub fn get_bool(&mut self) -> Result<bool> {
        Ok(self.get_u8()? > 0)
    }

    #[inline]
    pub fn put_u16(&mut self, value: u16) {
        self.put_bytes_raw(&value.to_le_bytes());
    }

    #[inline]
    pub fn get_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.take_array()?))
    }

    #[inline]
    pub fn put_i16(&mut self, value: i16) {
        self.put_bytes_raw(&value.to_le_bytes());
    }

    #[inline]
    pub fn get_i16(&mut self) -> Result<i16> {
        Ok(i16::from_le_bytes(self.take_array()?))
    }

    #[inline]
    pub fn put_u32(&mut self, value: u32) {
        self.put_bytes_raw(&value.to_le_bytes());
    }

    #[inline]
    pub fn get_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take_array()?))
    }

    #[inline]
    pub fn put_i32(&mut self, value: i32) {
        self.put_bytes_raw(&value.to_le_bytes());
    }

    #[inline]
    pub fn get_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.take_array()?))
    }

    #[inline]
    pub fn put_u64(&mut self, value: u64) {
        self.put_bytes_raw(&value.to_le_bytes());
    }

    #[inline]
    pub fn get_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.take_array()?))
    }

    #[inline]
    pub fn put_i64(&mut self, value: i64) {
        self.put_bytes_raw(&value.to_le_bytes());
    }

    #[inline]
    pub fn get_i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.take_array()?))
    }

    // ------------------------------------------------------------------
    // Varints
    // ------------------------------------------------------------------

    #[inline]
    pub fn put_var_u32(&mut self, value: u32) {
        let mut scratch = [0u8; MAX_VARINT_LEN];
        let len = varint::encode_into(value, &mut scratch);
        self.put_bytes_raw(&scratch[..len]);
    }

    pub fn get_var_u32(&mut self) -> Result<u32> {
        let mut value = 0u32;
        for index in 0..MAX_VARINT_LEN {
            let byte = self.get_u8()?;
            value |= ((byte & 0x7F) as u32) << (7 * index);
            if byte & varint::CONTINUATION_BIT == 0 {
                return Ok(value);
            }
        }
        Err(ProtocolError::MalformedVarint)
    }

    /// Signed varint, zig-zag mapped.
    #[inline]
    pub fn put_var_i32(&mut self, value: i32) {
        self.put_var_u32(varint::zigzag_encode(value));
    }

    #[inline]
    pub fn get_var_i32(&mut self) -> Result<i32> {
        Ok(varint::zigzag_decode(self.get_var_u32()?))
    }

    // ------------------------------------------------------------------
    // Quantized values
    // ------------------------------------------------------------------

    /// Float in steps of 0.05, as a signed varint.
    #[inline]
    pub fn put_f32(&mut self, value: f32) {
        self.put_var_i32((value * quantize::FLOAT_QUANTIZE_FACTOR) as i32);
    }

    #[inline]
    pub fn get_f32(&mut self) -> Result<f32> {
        Ok(self.get_var_i32()? as f32 * quantize::FLOAT_DEQUANTIZE_FACTOR)
    }

    /// Delta-coded position against an explicit rolling reference.
    pub fn put_position_with(&mut self, context: &mut QuantizationContext, value: Vec3) {
        for delta in context.encode_position(value) {
            self.put_var_i32(delta);
        }
    }

    pub fn get_position_with(&mut self, context: &mut QuantizationContext) -> Result<Vec3> {
        let deltas = [self.get_var_i32()?, self.get_var_i32()?, self.get_var_i32()?];
        Ok(context.decode_position(deltas))
    }

    /// Delta-coded position against this buffer's own reference.
    pub fn put_position(&mut self, value: Vec3) {
        let mut context = self.quantization;
        self.put_position_with(&mut context, value);
        self.quantization = context;
    }

    pub fn get_position(&mut self) -> Result<Vec3> {
        let mut context = self.quantization;
        let value = self.get_position_with(&mut context);
        self.quantization = context;
        value
    }

    /// Vector as three shorts relative to the context offsets.
    pub fn put_quantized_with(&mut self, context: &QuantizationContext, value: Vec3) {
        for short in context.encode_short(value) {
            self.put_i16(short);
        }
    }

    pub fn get_quantized_with(&mut self, context: &QuantizationContext) -> Result<Vec3> {
        let shorts = [self.get_i16()?, self.get_i16()?, self.get_i16()?];
        Ok(context.decode_short(shorts))
    }

    pub fn put_quantized(&mut self, value: Vec3) {
        let context = self.quantization;
        self.put_quantized_with(&context, value);
    }

    pub fn get_quantized(&mut self) -> Result<Vec3> {
        let context = self.quantization;
        self.get_quantized_with(&context)
    }

    /// Angle in `[-π, π]` packed into one byte.
    #[inline]
    pub fn put_rotation(&mut self, angle: f32) {
        self.put_u8(quantize::rotation_to_byte(angle));
    }

    #[inline]
    pub fn get_rotation(&mut self) -> Result<f32> {
        Ok(quantize::byte_to_rotation(self.get_u8()?))
    }

    // ------------------------------------------------------------------
    // Strings and blobs
    // ------------------------------------------------------------------

    /// String with the default character limit.
    #[inline]
    pub fn put_str(&mut self, value: &str) {
        self.put_str_with_max(value, DEFAULT_STRING_MAX_LENGTH);
    }

    /// String truncated to `max_length` characters and `2 × max_length` bytes.
    ///
    /// The byte cap matches the reader, which decodes any longer prefix as an
    /// empty string. Text with multi-byte characters can therefore come out
    /// shorter than `max_length` characters.
    pub fn put_str_with_max(&mut self, value: &str, max_length: usize) {
        let bytes = truncate_chars(value, max_length, max_length * 2).as_bytes();
        self.put_u16(bytes.len() as u16);
        self.put_bytes_raw(bytes);
    }

    #[inline]
    pub fn get_string(&mut self) -> Result<String> {
        self.get_string_with_max(DEFAULT_STRING_MAX_LENGTH)
    }

    /// Read a string; a zero or oversized length decodes as empty.
    pub fn get_string_with_max(&mut self, max_length: usize) -> Result<String> {
        let count = self.get_u16()? as usize;
        if count == 0 || count > max_length * 2 {
            return Ok(String::new());
        }
        Ok(String::from_utf8_lossy(self.take(count)?).into_owned())
    }

    /// String behind a varint byte length, capped at the blob limit.
    pub fn put_var_string(&mut self, value: &str) {
        let bytes = truncate_chars(value, usize::MAX, DEFAULT_BLOB_MAX_LENGTH).as_bytes();
        self.put_var_u32(bytes.len() as u32);
        self.put_bytes_raw(bytes);
    }

    pub fn get_var_string(&mut self) -> Result<String> {
        let count = self.get_var_u32()? as usize;
        if count == 0 {
            return Ok(String::new());
        }
        Ok(String::from_utf8_lossy(self.take(count)?).into_owned())
    }

    /// Byte blob with the default 800 byte cap.
    #[inline]
    pub fn put_blob(&mut self, value: &[u8]) {
        self.put_blob_with_max(value, DEFAULT_BLOB_MAX_LENGTH);
    }

    pub fn put_blob_with_max(&mut self, value: &[u8], max_length: usize) {
        let length = value.len().min(max_length);
        self.put_var_u32(length as u32);
        self.put_bytes_raw(&value[..length]);
    }

    #[inline]
    pub fn get_blob(&mut self) -> Result<Vec<u8>> {
        self.get_blob_with_max(DEFAULT_BLOB_MAX_LENGTH)
    }

    /// Read a blob, keeping at most `max_length` bytes. Any excess is skipped.
    pub fn get_blob_with_max(&mut self, max_length: usize) -> Result<Vec<u8>> {
        let length = self.get_var_u32()? as usize;
        let bytes = self.take(length)?;
        Ok(bytes[..length.min(max_length)].to_vec())
    }

    /// Socket address as its textual IP plus an `i32` port.
    pub fn put_endpoint(&mut self, endpoint: &SocketAddr) {
        self.put_str(&endpoint.ip().to_string());
        self.put_i32(endpoint.port() as i32);
    }

    pub fn get_endpoint(&mut self) -> Result<SocketAddr> {
        let address = self.get_string()?;
        let port = self.get_i32()?;
        let ip: IpAddr = address
            .parse()
            .map_err(|_| ProtocolError::InvalidAddress(address.clone()))?;
        let port = u16::try_from(port)
            .map_err(|_| ProtocolError::InvalidAddress(format!("{address}:{port}")))?;
        Ok(SocketAddr::new(ip, port))
    }

    // ------------------------------------------------------------------
    // Symbols
    // ------------------------------------------------------------------

    /// Interned string: a literal on first use, its index afterwards.
    pub fn put_symbol(&mut self, table: &mut SymbolTable, symbol: &str) {
        self.put_symbol_with_max(table, symbol, DEFAULT_STRING_MAX_LENGTH);
    }

    /// Symbols are interned in their truncated form, the only form the peer sees.
    pub fn put_symbol_with_max(&mut self, table: &mut SymbolTable, symbol: &str, max_length: usize) {
        let symbol = truncate_chars(symbol, max_length, max_length * 2);
        if symbol.is_empty() {
            self.put_var_u32(0);
            self.put_u16(0);
            return;
        }

        match table.lookup(symbol) {
            Some(index) => self.put_var_u32(index),
            None => {
                table.register(symbol);
                self.put_var_u32(0);
                self.put_str_with_max(symbol, max_length);
            }
        }
    }

    pub fn get_symbol(&mut self, table: &mut SymbolTable) -> Result<String> {
        self.get_symbol_with_max(table, DEFAULT_STRING_MAX_LENGTH)
    }

    pub fn get_symbol_with_max(&mut self, table: &mut SymbolTable, max_length: usize) -> Result<String> {
        let index = self.get_var_u32()?;
        if index == 0 {
            // Every non-empty literal takes the peer's next index, even one
            // that decodes empty or repeats an earlier literal.
            let count = self.peek_u16()?;
            let literal = self.get_string_with_max(max_length)?;
            if count != 0 {
                table.push(&literal);
            }
            return Ok(literal);
        }

        table
            .resolve(index)
            .map(str::to_owned)
            .ok_or(ProtocolError::UnknownSymbol(index))
    }

    // ------------------------------------------------------------------
    // Arrays and user types
    // ------------------------------------------------------------------

    /// Up to 255 strings behind a one-byte count.
    pub fn put_string_array<S: AsRef<str>>(&mut self, values: &[S]) {
        let count = values.len().min(u8::MAX as usize);
        self.put_u8(count as u8);
        for value in &values[..count] {
            self.put_str(value.as_ref());
        }
    }

    pub fn get_string_array(&mut self) -> Result<Vec<String>> {
        let count = self.get_u8()? as usize;
        (0..count).map(|_| self.get_string()).collect()
    }

    /// Up to 65535 strings behind a two-byte count.
    pub fn put_string_array_with_max<S: AsRef<str>>(&mut self, values: &[S], max_length: usize) {
        let count = values.len().min(u16::MAX as usize);
        self.put_u16(count as u16);
        for value in &values[..count] {
            self.put_str_with_max(value.as_ref(), max_length);
        }
    }

    pub fn get_string_array_with_max(&mut self, max_length: usize) -> Result<Vec<String>> {
        let count = self.get_u16()? as usize;
        (0..count).map(|_| self.get_string_with_max(max_length)).collect()
    }

    pub fn put_u16_array(&mut self, values: &[u16]) {
        let count = values.len().min(u16::MAX as usize);
        self.put_u16(count as u16);
        for value in &values[..count] {
            self.put_u16(*value);
        }
    }

    pub fn get_u16_array(&mut self) -> Result<Vec<u16>> {
        let count = self.get_u16()? as usize;
        let mut values = Vec::with_capacity(count.min(self.remaining() / 2));
        for _ in 0..count {
            values.push(self.get_u16()?);
        }
        Ok(values)
    }

    #[inline]
    pub fn put<T: NetSerializable>(&mut self, value: &T) {
        value.write(self);
    }

    #[inline]
    pub fn get<T: NetSerializable>(&mut self) -> Result<T> {
        T::read(self)
    }

    /// Serializable values behind a two-byte count.
    pub fn put_array<T: NetSerializable>(&mut self, values: &[T]) {
        let count = values.len().min(u16::MAX as usize);
        self.put_u16(count as u16);
        for value in &values[..count] {
            value.write(self);
        }
    }

    pub fn get_array<T: NetSerializable>(&mut self) -> Result<Vec<T>> {
        let count = self.get_u16()? as usize;
        let mut values = Vec::with_capacity(count.min(self.remaining()));
        for _ in 0..count {
            values.push(T::read(self)?);
        }
        Ok(values)
    }
}

/// Longest prefix of `value` with at most `max_chars` characters and `max_bytes` bytes,
/// cut on a character boundary.
fn truncate_chars(value: &str, max_chars: usize, max_bytes: usize) -> &str {
    let mut end = 0;
    for (count, (index, ch)) in value.char_indices().enumerate() {
        if count >= max_chars || index + ch.len_utf8() > max_bytes {
            break;
        }
        end = index + ch.len_utf8();
    }
    &value[..end]
}
