//! Sliding window of recently accepted reliable sequence numbers.
//!
//! One bit per sequence in `0..WINDOW_SIZE`. Accepting a sequence sets its
//! bit and clears the bit half a window ahead, so the set bits always cover
//! the most recent half window and a sequence becomes acceptable again once
//! the sender has moved half a window past it.

/// Sequence space of the reliable channel.
pub const WINDOW_SIZE: usize = 2048;
/// Half of [`WINDOW_SIZE`].
pub const HALF_WINDOW_SIZE: usize = WINDOW_SIZE / 2;

const WORDS: usize = WINDOW_SIZE / 32 + 1;

/// Duplicate-detection bitmap.
#[derive(Clone, PartialEq, Eq)]
pub struct SequenceWindow {
    bits: [u32; WORDS],
}

impl Default for SequenceWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SequenceWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequenceWindow")
            .field("accepted", &self.count())
            .finish()
    }
}

impl SequenceWindow {
    pub const fn new() -> Self {
        Self { bits: [0; WORDS] }
    }

    #[inline]
    fn locate(sequence: usize) -> (usize, u32) {
        (sequence / 32, 1u32 << (sequence % 32))
    }

    /// Whether `sequence` was accepted within the last half window.
    #[inline]
    pub fn contains(&self, sequence: usize) -> bool {
        let (word, mask) = Self::locate(sequence % WINDOW_SIZE);
        self.bits[word] & mask != 0
    }

    /// Record `sequence`; returns `false` if it is a duplicate.
    pub fn accept(&mut self, sequence: usize) -> bool {
        let sequence = sequence % WINDOW_SIZE;
        let (word, mask) = Self::locate(sequence);
        if self.bits[word] & mask != 0 {
            return false;
        }
        self.bits[word] |= mask;

        let (word, mask) = Self::locate((HALF_WINDOW_SIZE + sequence) % WINDOW_SIZE);
        self.bits[word] &= !mask;
        true
    }

    /// Number of sequences currently marked.
    pub fn count(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn clear(&mut self) {
        self.bits = [0; WORDS];
    }
}
