//! Lossy numeric encodings shared by the buffer engine.
//!
//! Two vector schemes exist. Positions are delta-coded against a rolling
//! per-axis reference, so encoder and decoder must see the same calls in the
//! same order. Short vectors are scaled into an `i16` relative to a fixed
//! per-axis offset and never touch the reference.
//!
//! Deployed peers have two quirks that the wire format keeps. The z axis of
//! both schemes is referenced against the **y** offset. After a position is
//! written the reference holds the *deltas* just sent rather than the
//! absolute position: x keeps the x delta, y is overwritten by the z delta
//! and z is left untouched. The decoder tracks the same reference, so a
//! stream decodes back to the positions that produced it.

/// Scalar floats are stored in steps of 0.05.
pub const FLOAT_QUANTIZE_FACTOR: f32 = 1.0 / 0.05;
pub const FLOAT_DEQUANTIZE_FACTOR: f32 = 0.05;

/// Positions are stored in steps of 0.1.
pub const POSITION_QUANTIZE_FACTOR: f32 = 1.0 / 0.1;
pub const POSITION_DEQUANTIZE_FACTOR: f32 = 0.1;

/// Default half-extent of the space covered by short quantization.
pub const DEFAULT_CHUNK_SIZE: f32 = 64.0;

/// Rotation byte scale: 256 steps over a full turn.
pub const ROTATION_FACTOR: f32 = 40.584_48;

/// Plain three-component vector used by the vector encodings.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Rolling per-axis reference threaded through every vector encode/decode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantizationContext {
    pub offset_x: i32,
    pub offset_y: i32,
    pub offset_z: i32,
    chunk_size: f32,
}

impl Default for QuantizationContext {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl QuantizationContext {
    /// Create a context whose short scheme covers `±chunk_size` around the offset.
    pub const fn new(chunk_size: f32) -> Self {
        Self {
            offset_x: 0,
            offset_y: 0,
            offset_z: 0,
            chunk_size,
        }
    }

    /// Anchor the short scheme at a world-space origin.
    pub fn set_origin(&mut self, x: i32, y: i32, z: i32) {
        self.offset_x = x;
        self.offset_y = y;
        self.offset_z = z;
    }

    /// Zero the offsets, keeping the configured range.
    pub fn reset(&mut self) {
        self.offset_x = 0;
        self.offset_y = 0;
        self.offset_z = 0;
    }

    pub fn chunk_size(&self) -> f32 {
        self.chunk_size
    }

    #[inline]
    fn short_factor(&self) -> f32 {
        i16::MAX as f32 / (self.chunk_size * 2.0)
    }

    /// Quantize a position and return the three wire deltas, advancing the reference.
    pub fn encode_position(&mut self, value: Vec3) -> [i32; 3] {
        let qx = (value.x * POSITION_QUANTIZE_FACTOR) as i32;
        let qy = (value.y * POSITION_QUANTIZE_FACTOR) as i32;
        let qz = (value.z * POSITION_QUANTIZE_FACTOR) as i32;

        let deltas = [
            qx.wrapping_sub(self.offset_x),
            qy.wrapping_sub(self.offset_y),
            qz.wrapping_sub(self.offset_y),
        ];
        self.advance(deltas);
        deltas
    }

    /// Rebuild a position from three wire deltas, advancing the reference.
    pub fn decode_position(&mut self, deltas: [i32; 3]) -> Vec3 {
        let qx = deltas[0].wrapping_add(self.offset_x);
        let qy = deltas[1].wrapping_add(self.offset_y);
        let qz = deltas[2].wrapping_add(self.offset_y);
        self.advance(deltas);

        Vec3::new(
            qx as f32 * POSITION_DEQUANTIZE_FACTOR,
            qy as f32 * POSITION_DEQUANTIZE_FACTOR,
            qz as f32 * POSITION_DEQUANTIZE_FACTOR,
        )
    }

    // y takes the z delta; offset_z is never written by the position scheme
    #[inline]
    fn advance(&mut self, deltas: [i32; 3]) {
        self.offset_x = deltas[0];
        self.offset_y = deltas[2];
    }

    /// Scale a vector into three shorts relative to the offsets.
    pub fn encode_short(&self, value: Vec3) -> [i16; 3] {
        let factor = self.short_factor();
        [
            ((value.x - self.offset_x as f32) * factor) as i16,
            ((value.y - self.offset_y as f32) * factor) as i16,
            ((value.z - self.offset_y as f32) * factor) as i16,
        ]
    }

    pub fn decode_short(&self, shorts: [i16; 3]) -> Vec3 {
        let factor = self.short_factor();
        Vec3::new(
            self.offset_x as f32 + shorts[0] as f32 / factor,
            self.offset_y as f32 + shorts[1] as f32 / factor,
            self.offset_y as f32 + shorts[2] as f32 / factor,
        )
    }
}

/// Encode an angle in `[-π, π]` as one byte.
#[inline]
pub fn rotation_to_byte(angle: f32) -> u8 {
    ((angle + std::f32::consts::PI) * ROTATION_FACTOR).round() as u8
}

#[inline]
pub fn byte_to_rotation(byte: u8) -> f32 {
    byte as f32 / ROTATION_FACTOR - std::f32::consts::PI
}
