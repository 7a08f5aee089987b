//! Observability and Metrics
//!
//! Process-wide counters for buffer allocation, packet traffic, reliability
//! events and cryptographic outcomes.
//!
//! Uses atomic counters so connection threads and receive threads can record
//! without coordination.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info};

/// Global metrics collector for transport operations
#[derive(Debug)]
pub struct Metrics {
    /// Buffers allocated since start (never decremented)
    pub buffers_allocated: AtomicU64,
    /// Acquires served by a thread-local free list
    pub pool_local_hits: AtomicU64,
    /// Acquires served by the global free list
    pub pool_global_hits: AtomicU64,
    /// Total connections created
    pub connections_total: AtomicU64,
    /// Connections not yet disconnected
    pub connections_active: AtomicU64,
    /// Total key agreements attempted
    pub handshakes_total: AtomicU64,
    /// Key agreements that produced a key
    pub handshakes_success: AtomicU64,
    /// Key agreements that failed
    pub handshakes_failed: AtomicU64,
    /// Datagrams handed to a sink
    pub packets_sent: AtomicU64,
    /// Datagrams received
    pub packets_received: AtomicU64,
    /// Bytes handed to a sink
    pub bytes_sent: AtomicU64,
    /// Bytes received
    pub bytes_received: AtomicU64,
    /// Reliable packets retained awaiting acknowledgment
    pub reliable_sent: AtomicU64,
    /// In-flight packets settled by an acknowledgment
    pub acks_received: AtomicU64,
    /// Retained packets handed to a sink again
    pub resends: AtomicU64,
    /// Reliable packets dropped as duplicates
    pub duplicates_dropped: AtomicU64,
    /// Reliable packets parked for reordering
    pub reorder_buffered: AtomicU64,
    /// Successful payload encryptions
    pub encryption_success: AtomicU64,
    /// Payloads rejected on decryption
    pub decryption_failures: AtomicU64,
    /// Inbound packets whose processing failed
    pub processing_errors: AtomicU64,
    /// Connections torn down
    pub disconnects: AtomicU64,
    /// Start time for uptime calculation
    start_time: Instant,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            buffers_allocated: AtomicU64::new(0),
            pool_local_hits: AtomicU64::new(0),
            pool_global_hits: AtomicU64::new(0),
            connections_total: AtomicU64::new(0),
            connections_active: AtomicU64::new(0),
            handshakes_total: AtomicU64::new(0),
            handshakes_success: AtomicU64::new(0),
            handshakes_failed: AtomicU64::new(0),
            packets_sent: AtomicU64::new(0),
            packets_received: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            reliable_sent: AtomicU64::new(0),
            acks_received: AtomicU64::new(0),
            resends: AtomicU64::new(0),
            duplicates_dropped: AtomicU64::new(0),
            reorder_buffered: AtomicU64::new(0),
            encryption_success: AtomicU64::new(0),
            decryption_failures: AtomicU64::new(0),
            processing_errors: AtomicU64::new(0),
            disconnects: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a buffer allocation and return the new total
    pub fn buffer_allocated(&self) -> u64 {
        self.buffers_allocated.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn pool_local_hit(&self) {
        self.pool_local_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn pool_global_hit(&self) {
        self.pool_global_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a new connection
    pub fn connection_established(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a connection torn down
    pub fn connection_closed(&self) {
        self.connections_active.fetch_sub(1, Ordering::Relaxed);
        self.disconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn handshake_attempt(&self) {
        self.handshakes_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn handshake_success(&self) {
        self.handshakes_success.fetch_add(1, Ordering::Relaxed);
    }

    pub fn handshake_failed(&self) {
        self.handshakes_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a datagram sent
    pub fn packet_sent(&self, byte_count: u64) {
        self.packets_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(byte_count, Ordering::Relaxed);
    }

    /// Record a datagram received
    pub fn packet_received(&self, byte_count: u64) {
        self.packets_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(byte_count, Ordering::Relaxed);
    }

    pub fn reliable_retained(&self) {
        self.reliable_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn ack_received(&self) {
        self.acks_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn resend(&self) {
        self.resends.fetch_add(1, Ordering::Relaxed);
    }

    pub fn duplicate_dropped(&self) {
        self.duplicates_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reorder_stored(&self) {
        self.reorder_buffered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn encryption_success(&self) {
        self.encryption_success.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decryption_failure(&self) {
        self.decryption_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn processing_error(&self) {
        self.processing_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            buffers_allocated: self.buffers_allocated.load(Ordering::Relaxed),
            pool_local_hits: self.pool_local_hits.load(Ordering::Relaxed),
            pool_global_hits: self.pool_global_hits.load(Ordering::Relaxed),
            connections_total: self.connections_total.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            handshakes_total: self.handshakes_total.load(Ordering::Relaxed),
            handshakes_success: self.handshakes_success.load(Ordering::Relaxed),
            handshakes_failed: self.handshakes_failed.load(Ordering::Relaxed),
            packets_sent: self.packets_sent.load(Ordering::Relaxed),
            packets_received: self.packets_received.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            reliable_sent: self.reliable_sent.load(Ordering::Relaxed),
            acks_received: self.acks_received.load(Ordering::Relaxed),
            resends: self.resends.load(Ordering::Relaxed),
            duplicates_dropped: self.duplicates_dropped.load(Ordering::Relaxed),
            reorder_buffered: self.reorder_buffered.load(Ordering::Relaxed),
            encryption_success: self.encryption_success.load(Ordering::Relaxed),
            decryption_failures: self.decryption_failures.load(Ordering::Relaxed),
            processing_errors: self.processing_errors.load(Ordering::Relaxed),
            disconnects: self.disconnects.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            buffers_allocated = snapshot.buffers_allocated,
            pool_local_hits = snapshot.pool_local_hits,
            pool_global_hits = snapshot.pool_global_hits,
            connections_active = snapshot.connections_active,
            handshakes_success = snapshot.handshakes_success,
            handshakes_failed = snapshot.handshakes_failed,
            packets_sent = snapshot.packets_sent,
            packets_received = snapshot.packets_received,
            bytes_sent = snapshot.bytes_sent,
            bytes_received = snapshot.bytes_received,
            reliable_sent = snapshot.reliable_sent,
            acks_received = snapshot.acks_received,
            resends = snapshot.resends,
            duplicates_dropped = snapshot.duplicates_dropped,
            reorder_buffered = snapshot.reorder_buffered,
            decryption_failures = snapshot.decryption_failures,
            processing_errors = snapshot.processing_errors,
            disconnects = snapshot.disconnects,
            uptime_seconds = snapshot.uptime_seconds,
            "Transport metrics snapshot"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub buffers_allocated: u64,
    pub pool_local_hits: u64,
    pub pool_global_hits: u64,
    pub connections_total: u64,
    pub connections_active: u64,
    pub handshakes_total: u64,
    pub handshakes_success: u64,
    pub handshakes_failed: u64,
    pub packets_sent: u64,
    pub packets_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub reliable_sent: u64,
    pub acks_received: u64,
    pub resends: u64,
    pub duplicates_dropped: u64,
    pub reorder_buffered: u64,
    pub encryption_success: u64,
    pub decryption_failures: u64,
    pub processing_errors: u64,
    pub disconnects: u64,
    pub uptime_seconds: u64,
}

static METRICS: once_cell::sync::Lazy<Metrics> = once_cell::sync::Lazy::new(Metrics::new);

/// Get the global metrics instance
pub fn global_metrics() -> &'static Metrics {
    &METRICS
}

/// Timer for measuring operation duration
pub struct Timer {
    start: Instant,
    operation: &'static str,
}

impl Timer {
    /// Start timing an operation
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation,
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        debug!(
            operation = self.operation,
            duration_us = duration.as_micros() as u64,
            "Operation completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = Metrics::new();
        metrics.packet_sent(100);
        metrics.packet_sent(20);
        metrics.duplicate_dropped();
        assert_eq!(metrics.buffer_allocated(), 1);
        assert_eq!(metrics.buffer_allocated(), 2);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.packets_sent, 2);
        assert_eq!(snapshot.bytes_sent, 120);
        assert_eq!(snapshot.duplicates_dropped, 1);
        assert_eq!(snapshot.buffers_allocated, 2);
    }

    #[test]
    fn test_connection_gauge() {
        let metrics = Metrics::new();
        metrics.connection_established();
        metrics.connection_established();
        metrics.connection_closed();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.connections_total, 2);
        assert_eq!(snapshot.connections_active, 1);
        assert_eq!(snapshot.disconnects, 1);
    }

    #[test]
    fn test_log_metrics_reads_snapshot() {
        let metrics = Metrics::new();
        metrics.encryption_success();
        metrics.decryption_failure();
        metrics.log_metrics();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.encryption_success, 1);
        assert_eq!(snapshot.decryption_failures, 1);
    }
}
