//! # Serializable Payloads
//!
//! Capability contract for types that encode themselves into a [`Buffer`].
//!
//! Higher-level payloads (game entities, handshake points, inventories) implement
//! [`NetSerializable`] and are then usable with [`Buffer::put`], [`Buffer::get`]
//! and the generic array helpers. Reads return a `Result` because the bytes
//! come from the network; writes cannot fail short of exceeding the buffer
//! capacity, which is a programming error.
//!
//! ## Usage
//! ```rust
//! use gamewire::core::buffer::Buffer;
//! use gamewire::core::serializable::NetSerializable;
//! use gamewire::error::Result;
//!
//! #[derive(Debug, PartialEq)]
//! struct Health {
//!     current: u16,
//!     max: u16,
//! }
//!
//! impl NetSerializable for Health {
//!     fn write(&self, buffer: &mut Buffer) {
//!         buffer.put_u16(self.current);
//!         buffer.put_u16(self.max);
//!     }
//!
//!     fn read(buffer: &mut Buffer) -> Result<Self> {
//!         Ok(Self { current: buffer.get_u16()?, max: buffer.get_u16()? })
//!     }
//! }
//!
//! let mut buffer = Buffer::new();
//! buffer.put(&Health { current: 40, max: 100 });
//! buffer.rewind();
//! assert_eq!(buffer.get::<Health>().unwrap(), Health { current: 40, max: 100 });
//! ```

use crate::core::buffer::Buffer;
use crate::core::quantize::Vec3;
use crate::error::Result;

/// A type that supplies its own wire encoding.
pub trait NetSerializable: Sized {
    /// Append this value at the buffer cursor.
    fn write(&self, buffer: &mut Buffer);

    /// Decode a value at the buffer cursor.
    fn read(buffer: &mut Buffer) -> Result<Self>;
}

impl NetSerializable for u8 {
    fn write(&self, buffer: &mut Buffer) {
        buffer.put_u8(*self);
    }

    fn read(buffer: &mut Buffer) -> Result<Self> {
        buffer.get_u8()
    }
}

impl NetSerializable for u16 {
    fn write(&self, buffer: &mut Buffer) {
        buffer.put_u16(*self);
    }

    fn read(buffer: &mut Buffer) -> Result<Self> {
        buffer.get_u16()
    }
}

impl NetSerializable for u32 {
    fn write(&self, buffer: &mut Buffer) {
        buffer.put_var_u32(*self);
    }

    fn read(buffer: &mut Buffer) -> Result<Self> {
        buffer.get_var_u32()
    }
}

impl NetSerializable for i32 {
    fn write(&self, buffer: &mut Buffer) {
        buffer.put_var_i32(*self);
    }

    fn read(buffer: &mut Buffer) -> Result<Self> {
        buffer.get_var_i32()
    }
}

impl NetSerializable for bool {
    fn write(&self, buffer: &mut Buffer) {
        buffer.put_bool(*self);
    }

    fn read(buffer: &mut Buffer) -> Result<Self> {
        buffer.get_bool()
    }
}

impl NetSerializable for String {
    fn write(&self, buffer: &mut Buffer) {
        buffer.put_str(self);
    }

    fn read(buffer: &mut Buffer) -> Result<Self> {
        buffer.get_string()
    }
}

impl NetSerializable for Vec3 {
    fn write(&self, buffer: &mut Buffer) {
        buffer.put_f32(self.x);
        buffer.put_f32(self.y);
        buffer.put_f32(self.z);
    }

    fn read(buffer: &mut Buffer) -> Result<Self> {
        Ok(Vec3::new(buffer.get_f32()?, buffer.get_f32()?, buffer.get_f32()?))
    }
}
