//! # Connection
//!
//! Per-peer reliability state machine layered over an unreliable datagram sink.
//!
//! ## Channels
//! - **Reliable**: one open accumulation buffer tagged with a sequence number
//!   (mod [`WINDOW_SIZE`]) and the current tick. Flushed buffers are retained
//!   in the in-flight table until the peer acknowledges them.
//! - **Unreliable**: one open accumulation buffer, no ordering, with an optional
//!   [`HeaderWriter`] hook for transport specific fields.
//! - **Ack**: two bytes per received reliable sequence, duplicates included.
//!
//! Open buffers flush when their cursor reaches the MTU at `end_*`, or on the
//! next [`Connection::update`] tick.
//!
//! ## Receive path
//! Inbound datagrams are decrypted (once a key is installed), dispatched by
//! packet type and always returned to the pool, except reliable packets that
//! arrive ahead of the expected sequence. Those wait in the reorder table and
//! are delivered in order as the gap fills. Faults while processing a packet
//! are logged; the connection keeps running.
//!
//! ## Lifecycle
//! `Connecting -> Connected -> Disconnected`. The last state is terminal: open
//! buffers, in-flight and reorder tables are released back to the pool and the
//! listener is told why.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, instrument, warn};

use crate::config::NetworkConfig;
use crate::core::buffer::{AckState, Buffer};
use crate::core::quantize::QuantizationContext;
use crate::core::symbols::SymbolTable;
use crate::error::{ProtocolError, Result};
use crate::protocol::packet::PacketType;
use crate::protocol::window::{SequenceWindow, WINDOW_SIZE};
use crate::utils::buffer_pool;
use crate::utils::crypto::{CipherBackend, Crypto, KEY_LEN};
use crate::utils::metrics::global_metrics;

/// Local sequence before the first reliable buffer; the first one sent is 2.
pub const INITIAL_LOCAL_SEQUENCE: i16 = 1;
/// Remote sequence expected first.
pub const INITIAL_REMOTE_SEQUENCE: i16 = 2;

static NEXT_CONNECTION_ID: AtomicU32 = AtomicU32::new(1);

/// Process-unique connection identity, used to mark buffer ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u32);

impl ConnectionId {
    fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
}

/// Why a connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// No inbound traffic before the countdown ran out.
    Timeout,
    /// The peer sent a reliable sequence outside the window.
    NegativeSequence,
    /// The peer left too many gaps in the reliable stream.
    RemoteBufferTooBig,
    /// Local request, peer request, or the connection was dropped.
    Other,
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DisconnectReason::Timeout => "timeout",
            DisconnectReason::NegativeSequence => "negative sequence",
            DisconnectReason::RemoteBufferTooBig => "remote buffer too big",
            DisconnectReason::Other => "other",
        };
        f.write_str(name)
    }
}

/// Datagram send primitive. The buffer is borrowed; its valid bytes go on the wire.
pub trait PacketSink {
    fn send(&mut self, buffer: &Buffer);
}

impl<F> PacketSink for F
where
    F: FnMut(&Buffer),
{
    fn send(&mut self, buffer: &Buffer) {
        self(buffer)
    }
}

/// Receiver of delivered payloads.
pub trait PacketListener {
    /// Called once per delivered packet with the cursor at the first payload
    /// byte. `symbols` is this connection's remote symbol table.
    fn on_packet(&mut self, buffer: &mut Buffer, symbols: &mut SymbolTable);

    fn on_disconnect(&mut self, _reason: DisconnectReason) {}
}

/// Transport specific fields on unreliable packets, written after the type tag.
pub trait HeaderWriter {
    fn put_unreliable_header(&mut self, buffer: &mut Buffer);

    fn read_unreliable_header(&mut self, buffer: &mut Buffer) -> Result<()>;
}

enum Disposition {
    Consumed,
    Reorder(i16),
}

/// One peer's reliability state.
pub struct Connection {
    id: ConnectionId,
    state: ConnectionState,
    reason: Option<DisconnectReason>,

    sink: Box<dyn PacketSink + Send>,
    listener: Box<dyn PacketListener + Send>,
    header_writer: Option<Box<dyn HeaderWriter + Send>>,

    crypto: Option<Crypto>,
    encryption_enabled: bool,
    cipher_backend: CipherBackend,

    local_sequence: i16,
    next_remote_sequence: i16,
    window: SequenceWindow,
    in_flight: HashMap<i16, Buffer>,
    reorder: HashMap<i16, Buffer>,

    reliable_buffer: Option<Buffer>,
    unreliable_buffer: Option<Buffer>,
    ack_buffer: Option<Buffer>,

    mtu: usize,
    chunk_size: f32,
    tick: u32,
    timeout_left: Duration,
    receive_floor: Duration,
    reorder_limit: usize,

    ping_sent_at: Option<Instant>,
    round_trip: Option<Duration>,

    local_symbols: SymbolTable,
    remote_symbols: SymbolTable,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("reason", &self.reason)
            .field("encrypted", &self.crypto.is_some())
            .field("local_sequence", &self.local_sequence)
            .field("next_remote_sequence", &self.next_remote_sequence)
            .field("in_flight", &self.in_flight.len())
            .field("reorder", &self.reorder.len())
            .field("timeout_left", &self.timeout_left)
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Create a connection with default settings.
    pub fn new<S, L>(sink: S, listener: L) -> Self
    where
        S: PacketSink + Send + 'static,
        L: PacketListener + Send + 'static,
    {
        Self::with_config(&NetworkConfig::default(), sink, listener)
    }

    pub fn with_config<S, L>(config: &NetworkConfig, sink: S, listener: L) -> Self
    where
        S: PacketSink + Send + 'static,
        L: PacketListener + Send + 'static,
    {
        for problem in config.validate() {
            warn!(%problem, "Connection created with invalid configuration");
        }

        let connection = Self {
            id: ConnectionId::next(),
            state: ConnectionState::Connecting,
            reason: None,
            sink: Box::new(sink),
            listener: Box::new(listener),
            header_writer: None,
            crypto: None,
            encryption_enabled: config.transport.encryption_enabled,
            cipher_backend: config.transport.cipher_backend,
            local_sequence: INITIAL_LOCAL_SEQUENCE,
            next_remote_sequence: INITIAL_REMOTE_SEQUENCE,
            window: SequenceWindow::new(),
            in_flight: HashMap::new(),
            reorder: HashMap::new(),
            reliable_buffer: None,
            unreliable_buffer: None,
            ack_buffer: None,
            mtu: config.transport.mtu,
            chunk_size: config.encoding.chunk_size,
            tick: 0,
            timeout_left: config.connection.timeout,
            receive_floor: config.connection.receive_timeout_floor,
            reorder_limit: config.connection.reorder_limit,
            ping_sent_at: None,
            round_trip: None,
            local_symbols: SymbolTable::new(),
            remote_symbols: SymbolTable::new(),
        };

        global_metrics().connection_established();
        debug!(connection = %connection.id, "Connection created");
        connection
    }

    /// Install the unreliable header hook.
    pub fn with_header_writer<H>(mut self, writer: H) -> Self
    where
        H: HeaderWriter + Send + 'static,
    {
        self.header_writer = Some(Box::new(writer));
        self
    }

    // ------------------------------------------------------------------
    // State
    // ------------------------------------------------------------------

    #[inline]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    #[inline]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.state == ConnectionState::Disconnected
    }

    /// Reason recorded when the connection ended.
    #[inline]
    pub fn disconnect_reason(&self) -> Option<DisconnectReason> {
        self.reason
    }

    /// Handshake finished; has no effect once disconnected.
    pub fn mark_connected(&mut self) {
        if self.state == ConnectionState::Connecting {
            self.state = ConnectionState::Connected;
            info!(connection = %self.id, "Connection established");
        }
    }

    #[inline]
    pub fn timeout_left(&self) -> Duration {
        self.timeout_left
    }

    /// Latest ping round trip, if a pong has arrived.
    #[inline]
    pub fn round_trip(&self) -> Option<Duration> {
        self.round_trip
    }

    /// Tick stamped on newly opened reliable and unreliable buffers.
    #[inline]
    pub fn tick(&self) -> u32 {
        self.tick
    }

    #[inline]
    pub fn set_tick(&mut self, tick: u32) {
        self.tick = tick;
    }

    /// Symbols this side has announced.
    #[inline]
    pub fn local_symbols(&self) -> &SymbolTable {
        &self.local_symbols
    }

    /// Symbols the peer has announced.
    #[inline]
    pub fn remote_symbols(&self) -> &SymbolTable {
        &self.remote_symbols
    }

    /// Reliable buffers sent and not yet acknowledged.
    pub fn in_flight(&self) -> impl Iterator<Item = &Buffer> {
        self.in_flight.values()
    }

    #[inline]
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Reliable packets waiting for an earlier sequence.
    #[inline]
    pub fn reorder_count(&self) -> usize {
        self.reorder.len()
    }

    // ------------------------------------------------------------------
    // Encryption
    // ------------------------------------------------------------------

    /// Encrypt every packet from now on with `crypto`.
    pub fn enable_encryption(&mut self, crypto: Crypto) {
        debug!(connection = %self.id, backend = ?crypto.backend(), "Packet encryption enabled");
        self.crypto = Some(crypto);
    }

    /// Build a cipher from an agreed key with the configured backend.
    ///
    /// Returns `false` without touching the connection when encryption is
    /// disabled by configuration.
    pub fn install_key(&mut self, key: &[u8; KEY_LEN]) -> Result<bool> {
        if !self.encryption_enabled {
            warn!(connection = %self.id, "Encryption disabled by configuration; key ignored");
            return Ok(false);
        }
        let crypto = Crypto::with_backend(key, self.cipher_backend)?;
        self.enable_encryption(crypto);
        Ok(true)
    }

    #[inline]
    pub fn is_encrypted(&self) -> bool {
        self.crypto.is_some()
    }

    // ------------------------------------------------------------------
    // Outbound
    // ------------------------------------------------------------------

    fn ensure_open(&self) -> Result<()> {
        if self.state == ConnectionState::Disconnected {
            return Err(ProtocolError::ConnectionClosed);
        }
        Ok(())
    }

    fn acquire(&self) -> Buffer {
        let mut buffer = buffer_pool::acquire();
        buffer.set_owner(Some(self.id));
        buffer.quantization = QuantizationContext::new(self.chunk_size);
        buffer
    }

    fn open_reliable(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.reliable_buffer.is_some() {
            return Ok(());
        }

        let mut buffer = self.acquire();
        self.local_sequence = ((self.local_sequence as i32 + 1) % WINDOW_SIZE as i32) as i16;

        buffer.put_u8(PacketType::Reliable.as_u8());
        buffer.put_i16(self.local_sequence);
        buffer.put_u32(self.tick);
        buffer.set_sequence(self.local_sequence);
        buffer.set_tick(self.tick);
        buffer.set_reliable(true);

        self.reliable_buffer = Some(buffer);
        Ok(())
    }

    fn open_unreliable(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.unreliable_buffer.is_some() {
            return Ok(());
        }

        let mut buffer = self.acquire();
        buffer.put_u8(PacketType::Unreliable.as_u8());
        if let Some(writer) = self.header_writer.as_mut() {
            writer.put_unreliable_header(&mut buffer);
        }
        buffer.put_u32(self.tick);
        buffer.set_tick(self.tick);
        buffer.set_reliable(false);

        self.unreliable_buffer = Some(buffer);
        Ok(())
    }

    /// Open (or continue) the reliable accumulation buffer.
    ///
    /// # Errors
    /// `ConnectionClosed` once disconnected.
    pub fn begin_reliable(&mut self) -> Result<&mut Buffer> {
        self.open_reliable()?;
        self.reliable_buffer
            .as_mut()
            .ok_or(ProtocolError::ConnectionClosed)
    }

    /// Close a write section; flushes if the buffer reached the MTU.
    pub fn end_reliable(&mut self) {
        let full = self
            .reliable_buffer
            .as_ref()
            .is_some_and(|buffer| buffer.position() >= self.mtu);
        if full {
            self.flush_reliable();
        }
    }

    /// Open (or continue) the unreliable accumulation buffer.
    ///
    /// # Errors
    /// `ConnectionClosed` once disconnected.
    pub fn begin_unreliable(&mut self) -> Result<&mut Buffer> {
        self.open_unreliable()?;
        self.unreliable_buffer
            .as_mut()
            .ok_or(ProtocolError::ConnectionClosed)
    }

    pub fn end_unreliable(&mut self) {
        let full = self
            .unreliable_buffer
            .as_ref()
            .is_some_and(|buffer| buffer.position() >= self.mtu);
        if full {
            self.flush_unreliable();
        }
    }

    /// Write into the reliable channel with access to the local symbol table.
    pub fn send_reliable<F, R>(&mut self, write: F) -> Result<R>
    where
        F: FnOnce(&mut Buffer, &mut SymbolTable) -> R,
    {
        self.open_reliable()?;
        let buffer = self
            .reliable_buffer
            .as_mut()
            .ok_or(ProtocolError::ConnectionClosed)?;
        let out = write(buffer, &mut self.local_symbols);
        self.end_reliable();
        Ok(out)
    }

    /// Write into the unreliable channel with access to the local symbol table.
    pub fn send_unreliable<F, R>(&mut self, write: F) -> Result<R>
    where
        F: FnOnce(&mut Buffer, &mut SymbolTable) -> R,
    {
        self.open_unreliable()?;
        let buffer = self
            .unreliable_buffer
            .as_mut()
            .ok_or(ProtocolError::ConnectionClosed)?;
        let out = write(buffer, &mut self.local_symbols);
        self.end_unreliable();
        Ok(out)
    }

    /// Send a ping and start timing the round trip.
    pub fn send_ping(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.ping_sent_at = Some(Instant::now());
        self.send_control(PacketType::Ping);
        Ok(())
    }

    /// Hand a retained reliable buffer to the sink again and mark it
    /// `Resending`. Returns `false` if `sequence` is not in flight.
    pub fn resend(&mut self, sequence: i16) -> bool {
        let Some(buffer) = self.in_flight.get(&sequence) else {
            return false;
        };
        self.sink.send(buffer);
        buffer.swap_ack_state(AckState::Resending);

        let metrics = global_metrics();
        metrics.resend();
        metrics.packet_sent(buffer.size() as u64);
        true
    }

    /// Encrypt if keyed and hand to the sink.
    fn transmit(&mut self, buffer: &mut Buffer) -> bool {
        if let Some(crypto) = &self.crypto {
            if let Err(e) = crypto.encrypt_buffer(buffer) {
                error!(connection = %self.id, error = %e, "Failed to encrypt outbound packet");
                return false;
            }
        }
        self.sink.send(buffer);
        global_metrics().packet_sent(buffer.size() as u64);
        true
    }

    fn send_control(&mut self, kind: PacketType) {
        let mut buffer = self.acquire();
        buffer.put_u8(kind.as_u8());
        self.transmit(&mut buffer);
        buffer_pool::release(buffer);
    }

    fn flush_reliable(&mut self) {
        let Some(mut buffer) = self.reliable_buffer.take() else {
            return;
        };
        if !self.transmit(&mut buffer) {
            buffer_pool::release(buffer);
            return;
        }

        buffer.swap_ack_state(AckState::Pending);
        global_metrics().reliable_retained();
        if let Some(stale) = self.in_flight.insert(buffer.sequence(), buffer) {
            warn!(
                connection = %self.id,
                sequence = stale.sequence(),
                "Reliable sequence reused while still in flight"
            );
            stale.swap_ack_state(AckState::Settled);
            buffer_pool::release(stale);
        }
    }

    fn flush_unreliable(&mut self) {
        if let Some(mut buffer) = self.unreliable_buffer.take() {
            self.transmit(&mut buffer);
            buffer_pool::release(buffer);
        }
    }

    fn flush_ack(&mut self) {
        if let Some(mut buffer) = self.ack_buffer.take() {
            self.transmit(&mut buffer);
            buffer_pool::release(buffer);
        }
    }

    fn push_ack(&mut self, sequence: i16) {
        let mtu = self.mtu;
        let owner = self.id;
        let buffer = self.ack_buffer.get_or_insert_with(|| {
            let mut buffer = buffer_pool::acquire();
            buffer.set_owner(Some(owner));
            buffer.put_u8(PacketType::Ack.as_u8());
            buffer
        });
        buffer.put_i16(sequence);

        if buffer.position() > mtu.saturating_sub(2) {
            self.flush_ack();
        }
    }

    /// Advance one tick: run down the timeout, then flush every open buffer.
    ///
    /// Returns `true` once the connection is disconnected.
    pub fn update(&mut self, elapsed: Duration, tick: u32) -> bool {
        if self.state == ConnectionState::Disconnected {
            return true;
        }

        self.tick = tick;
        self.timeout_left = self.timeout_left.saturating_sub(elapsed);
        if self.timeout_left.is_zero() {
            self.disconnect(DisconnectReason::Timeout);
            return true;
        }

        self.flush_reliable();
        self.flush_unreliable();
        self.flush_ack();
        false
    }

    /// Notify the peer and tear the connection down. No effect once disconnected.
    pub fn disconnect(&mut self, reason: DisconnectReason) {
        if self.state == ConnectionState::Disconnected {
            return;
        }
        self.send_control(PacketType::Disconnected);
        self.teardown(reason);
    }

    fn teardown(&mut self, reason: DisconnectReason) {
        if self.state == ConnectionState::Disconnected {
            return;
        }
        self.state = ConnectionState::Disconnected;
        self.reason = Some(reason);

        let open = [
            self.reliable_buffer.take(),
            self.unreliable_buffer.take(),
            self.ack_buffer.take(),
        ];
        for buffer in open.into_iter().flatten() {
            buffer_pool::release(buffer);
        }
        for (_, buffer) in self.in_flight.drain() {
            buffer.swap_ack_state(AckState::Settled);
            buffer_pool::release(buffer);
        }
        for (_, buffer) in self.reorder.drain() {
            buffer_pool::release(buffer);
        }

        global_metrics().connection_closed();
        info!(connection = %self.id, %reason, "Connection closed");
        self.listener.on_disconnect(reason);
    }

    // ------------------------------------------------------------------
    // Inbound
    // ------------------------------------------------------------------

    /// Copy a datagram into a pooled buffer and process it.
    ///
    /// # Errors
    /// `BufferOverflow` if the datagram exceeds the buffer capacity.
    pub fn receive_datagram(&mut self, datagram: &[u8]) -> Result<()> {
        let mut buffer = buffer_pool::acquire();
        if let Err(e) = buffer.load(datagram) {
            buffer_pool::release(buffer);
            return Err(e);
        }
        self.receive(buffer);
        Ok(())
    }

    /// Process one received datagram. The buffer goes back to the pool
    /// unless it is held for reordering.
    #[instrument(level = "trace", skip_all, fields(connection = %self.id))]
    pub fn receive(&mut self, mut buffer: Buffer) {
        global_metrics().packet_received(buffer.size() as u64);

        if self.state == ConnectionState::Disconnected {
            buffer_pool::release(buffer);
            return;
        }

        if let Some(crypto) = &self.crypto {
            if let Err(e) = crypto.decrypt_buffer(&mut buffer) {
                warn!(connection = %self.id, error = %e, "Dropping packet that failed decryption");
                buffer_pool::release(buffer);
                return;
            }
        }

        buffer.set_owner(Some(self.id));
        self.process_packet(buffer);
    }

    fn process_packet(&mut self, mut buffer: Buffer) {
        self.timeout_left = self.timeout_left.max(self.receive_floor);

        match self.dispatch(&mut buffer) {
            Ok(Disposition::Consumed) => buffer_pool::release(buffer),
            Ok(Disposition::Reorder(sequence)) => self.hold_for_reorder(sequence, buffer),
            Err(e) => {
                error!(connection = %self.id, error = %e, "Failed to process packet");
                global_metrics().processing_error();
                buffer_pool::release(buffer);
            }
        }
    }

    fn dispatch(&mut self, buffer: &mut Buffer) -> Result<Disposition> {
        let kind = PacketType::try_from(buffer.get_u8()?)?;

        match kind {
            PacketType::Ping => self.send_control(PacketType::Pong),
            PacketType::Pong => {
                if let Some(sent_at) = self.ping_sent_at.take() {
                    let rtt = sent_at.elapsed();
                    debug!(connection = %self.id, rtt_us = rtt.as_micros() as u64, "Pong received");
                    self.round_trip = Some(rtt);
                }
            }
            PacketType::Ack => {
                while buffer.has_data() {
                    let sequence = buffer.get_i16()?;
                    self.settle(sequence);
                }
            }
            PacketType::Reliable => return self.receive_reliable(buffer),
            PacketType::Unreliable => {
                if let Some(writer) = self.header_writer.as_mut() {
                    writer.read_unreliable_header(buffer)?;
                }
                let tick = buffer.get_u32()?;
                buffer.set_tick(tick);
                self.listener.on_packet(buffer, &mut self.remote_symbols);
            }
            PacketType::Disconnected => {
                debug!(connection = %self.id, "Peer closed the connection");
                self.teardown(DisconnectReason::Other);
            }
        }

        Ok(Disposition::Consumed)
    }

    fn settle(&mut self, sequence: i16) {
        if let Some(buffer) = self.in_flight.remove(&sequence) {
            if buffer.owner() == Some(self.id) {
                buffer.swap_ack_state(AckState::Settled);
            }
            global_metrics().ack_received();
            buffer_pool::release(buffer);
        }
    }

    fn receive_reliable(&mut self, buffer: &mut Buffer) -> Result<Disposition> {
        buffer.set_reliable(true);
        let sequence = buffer.get_i16()?;
        let tick = buffer.get_u32()?;

        if sequence < 0 || sequence as usize >= WINDOW_SIZE {
            warn!(connection = %self.id, sequence, "Reliable sequence outside the window");
            self.disconnect(DisconnectReason::NegativeSequence);
            return Ok(Disposition::Consumed);
        }

        buffer.set_sequence(sequence);
        buffer.set_tick(tick);
        self.push_ack(sequence);

        if !self.window.accept(sequence as usize) {
            global_metrics().duplicate_dropped();
            return Ok(Disposition::Consumed);
        }

        if sequence != self.next_remote_sequence {
            return Ok(Disposition::Reorder(sequence));
        }

        self.listener.on_packet(buffer, &mut self.remote_symbols);
        self.advance_remote_sequence();

        while let Some(mut next) = self.reorder.remove(&self.next_remote_sequence) {
            self.listener.on_packet(&mut next, &mut self.remote_symbols);
            self.advance_remote_sequence();
            buffer_pool::release(next);
        }

        Ok(Disposition::Consumed)
    }

    #[inline]
    fn advance_remote_sequence(&mut self) {
        self.next_remote_sequence =
            ((self.next_remote_sequence as i32 + 1) % WINDOW_SIZE as i32) as i16;
    }

    fn hold_for_reorder(&mut self, sequence: i16, buffer: Buffer) {
        global_metrics().reorder_stored();
        if let Some(replaced) = self.reorder.insert(sequence, buffer) {
            buffer_pool::release(replaced);
        }

        debug!(
            connection = %self.id,
            sequence,
            expected = self.next_remote_sequence,
            held = self.reorder.len(),
            "Reliable packet held for reordering"
        );

        if self.reorder.len() > self.reorder_limit {
            warn!(connection = %self.id, held = self.reorder.len(), "Reorder table overflow");
            self.disconnect(DisconnectReason::RemoteBufferTooBig);
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.teardown(DisconnectReason::Other);
    }
}
