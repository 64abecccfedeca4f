//! Buffer-based encoding/decoding traits
//!
//! `Denc` writes straight into a caller-provided `BufMut` and reads from any
//! `Buf`, so a composite value is encoded with a single allocation when its
//! size is known upfront.
//!
//! # Wire conventions
//!
//! - Integers are little-endian.
//! - Containers carry a `u32` element count followed by the elements.
//! - Versioned structs are wrapped in a 6 byte envelope, see [`VersionedEncode`].
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use denc::{decode_exact, encode_to_bytes};
//!
//! let mut map = BTreeMap::new();
//! map.insert(7u32, 42u64);
//!
//! let bytes = encode_to_bytes(&map).unwrap();
//! assert_eq!(bytes.len(), 4 + 4 + 8);
//!
//! let decoded: BTreeMap<u32, u64> = decode_exact(&bytes).unwrap();
//! assert_eq!(decoded, map);
//! ```

use crate::error::DencError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::collections::{BTreeMap, BTreeSet};

/// Encoding trait that writes directly to a mutable buffer
///
/// Types should implement `encoded_size()` to return `Some(size)` whenever
/// possible so callers can preallocate.
pub trait Denc: Sized {
    /// Does this type use the versioned envelope?
    const USES_VERSIONING: bool = false;

    /// Encode into `buf`
    ///
    /// # Errors
    ///
    /// Returns `DencError::BufferFull` if `buf` cannot hold the value.
    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<(), DencError>;

    /// Decode from `buf`, consuming exactly the bytes of one value
    ///
    /// # Errors
    ///
    /// Returns `DencError` on truncated or structurally invalid input.
    fn decode<B: Buf>(buf: &mut B) -> Result<Self, DencError>;

    /// Encoded size, if it can be determined without encoding
    fn encoded_size(&self) -> Option<usize>;
}

/// Marker trait for types with a size known at compile time
pub trait FixedSize: Denc {
    const SIZE: usize;
}

// ============= Primitive Type Implementations =============

macro_rules! impl_denc_int {
    ($type:ty, $put_method:ident, $get_method:ident, $size:expr) => {
        impl Denc for $type {
            fn encode<B: BufMut>(&self, buf: &mut B) -> Result<(), DencError> {
                if buf.remaining_mut() < $size {
                    return Err(DencError::BufferFull {
                        what: stringify!($type),
                        need: $size,
                        have: buf.remaining_mut(),
                    });
                }
                buf.$put_method(*self);
                Ok(())
            }

            fn decode<B: Buf>(buf: &mut B) -> Result<Self, DencError> {
                if buf.remaining() < $size {
                    return Err(DencError::Truncated {
                        what: stringify!($type),
                        need: $size,
                        have: buf.remaining(),
                    });
                }
                Ok(buf.$get_method())
            }

            fn encoded_size(&self) -> Option<usize> {
                Some($size)
            }
        }

        impl FixedSize for $type {
            const SIZE: usize = $size;
        }
    };
}

impl_denc_int!(u8, put_u8, get_u8, 1);
impl_denc_int!(u16, put_u16_le, get_u16_le, 2);
impl_denc_int!(u32, put_u32_le, get_u32_le, 4);
impl_denc_int!(u64, put_u64_le, get_u64_le, 8);
impl_denc_int!(i8, put_i8, get_i8, 1);
impl_denc_int!(i16, put_i16_le, get_i16_le, 2);
impl_denc_int!(i32, put_i32_le, get_i32_le, 4);
impl_denc_int!(i64, put_i64_le, get_i64_le, 8);

// ============= Container Implementations =============

fn encode_len<B: BufMut>(len: usize, what: &'static str, buf: &mut B) -> Result<(), DencError> {
    let len = u32::try_from(len).map_err(|_| DencError::LengthOverflow { what, len })?;
    len.encode(buf)
}

/// Read a `u32` element count.
///
/// Every element occupies at least one byte, so a count larger than the
/// remaining input is rejected before anything is decoded.
fn decode_len<B: Buf>(what: &'static str, buf: &mut B) -> Result<usize, DencError> {
    let len = u32::decode(buf)? as usize;
    if len > buf.remaining() {
        return Err(DencError::Truncated {
            what,
            need: len,
            have: buf.remaining(),
        });
    }
    Ok(len)
}

impl<K: Denc + Ord, V: Denc> Denc for BTreeMap<K, V> {
    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<(), DencError> {
        encode_len(self.len(), "map", buf)?;
        for (key, value) in self {
            key.encode(buf)?;
            value.encode(buf)?;
        }
        Ok(())
    }

    fn decode<B: Buf>(buf: &mut B) -> Result<Self, DencError> {
        let len = decode_len("map", buf)?;
        let mut map = BTreeMap::new();
        for _ in 0..len {
            let key = K::decode(buf)?;
            let value = V::decode(buf)?;
            if map.insert(key, value).is_some() {
                return Err(DencError::DuplicateKey("map"));
            }
        }
        Ok(map)
    }

    fn encoded_size(&self) -> Option<usize> {
        let mut size = 4;
        for (key, value) in self {
            size += key.encoded_size()?;
            size += value.encoded_size()?;
        }
        Some(size)
    }
}

impl<T: Denc + Ord> Denc for BTreeSet<T> {
    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<(), DencError> {
        encode_len(self.len(), "set", buf)?;
        for item in self {
            item.encode(buf)?;
        }
        Ok(())
    }

    fn decode<B: Buf>(buf: &mut B) -> Result<Self, DencError> {
        let len = decode_len("set", buf)?;
        let mut set = BTreeSet::new();
        for _ in 0..len {
            if !set.insert(T::decode(buf)?) {
                return Err(DencError::DuplicateKey("set"));
            }
        }
        Ok(set)
    }

    fn encoded_size(&self) -> Option<usize> {
        let mut size = 4;
        for item in self {
            size += item.encoded_size()?;
        }
        Some(size)
    }
}

// ============= Versioned Encoding =============

/// struct_v (1) + struct_compat (1) + content length (4)
pub const VERSION_HEADER_SIZE: usize = 6;

/// Types wrapped in the ENCODE_START/DECODE_START style envelope
///
/// ```text
/// [u8 struct_v][u8 struct_compat][u32_le len][len bytes of content]
/// ```
///
/// `struct_compat` is the oldest decoder version able to read the content.
/// A decoder refuses content whose `struct_compat` is newer than
/// [`VersionedEncode::VERSION`]. Content left unread is skipped only when it
/// was written by a newer encoder; otherwise it is a decode error.
pub trait VersionedEncode: Sized {
    /// Name used in error messages
    const TYPE_NAME: &'static str;

    /// Version written by this encoder
    const VERSION: u8;

    /// Oldest decoder version that understands what this encoder writes
    const COMPAT: u8;

    fn encode_content<B: BufMut>(&self, buf: &mut B) -> Result<(), DencError>;

    /// Decode the content of an envelope written with `struct_v`
    fn decode_content<B: Buf>(buf: &mut B, struct_v: u8) -> Result<Self, DencError>;

    fn encoded_size_content(&self) -> Option<usize>;

    fn encoded_size_versioned(&self) -> Option<usize> {
        Some(VERSION_HEADER_SIZE + self.encoded_size_content()?)
    }

    fn encode_versioned<B: BufMut>(&self, buf: &mut B) -> Result<(), DencError> {
        let mut content = BytesMut::with_capacity(self.encoded_size_content().unwrap_or(64));
        self.encode_content(&mut content)?;

        let len = u32::try_from(content.len()).map_err(|_| DencError::LengthOverflow {
            what: Self::TYPE_NAME,
            len: content.len(),
        })?;
        let need = VERSION_HEADER_SIZE + content.len();
        if buf.remaining_mut() < need {
            return Err(DencError::BufferFull {
                what: Self::TYPE_NAME,
                need,
                have: buf.remaining_mut(),
            });
        }

        buf.put_u8(Self::VERSION);
        buf.put_u8(Self::COMPAT);
        buf.put_u32_le(len);
        buf.put_slice(&content);
        Ok(())
    }

    fn decode_versioned<B: Buf>(buf: &mut B) -> Result<Self, DencError> {
        if buf.remaining() < VERSION_HEADER_SIZE {
            return Err(DencError::Truncated {
                what: Self::TYPE_NAME,
                need: VERSION_HEADER_SIZE,
                have: buf.remaining(),
            });
        }

        let struct_v = buf.get_u8();
        let struct_compat = buf.get_u8();
        let struct_len = buf.get_u32_le() as usize;

        if struct_compat > Self::VERSION || struct_compat > struct_v || struct_v == 0 {
            return Err(DencError::UnsupportedVersion {
                what: Self::TYPE_NAME,
                version: struct_v,
                compat: struct_compat,
                supported: Self::VERSION,
            });
        }

        if buf.remaining() < struct_len {
            return Err(DencError::Truncated {
                what: Self::TYPE_NAME,
                need: struct_len,
                have: buf.remaining(),
            });
        }

        let mut content = buf.take(struct_len);
        let value = Self::decode_content(&mut content, struct_v)?;

        // DECODE_FINISH
        let unread = content.remaining();
        if unread > 0 {
            if struct_v <= Self::VERSION {
                return Err(DencError::InvalidData(format!(
                    "{} v{}: {} unread bytes in envelope",
                    Self::TYPE_NAME,
                    struct_v,
                    unread
                )));
            }
            content.advance(unread);
        }

        Ok(value)
    }
}

/// Implement `Denc` for a type by delegating to its `VersionedEncode` impl
///
/// ```ignore
/// impl VersionedEncode for MyStat { /* ... */ }
/// impl_denc_for_versioned!(MyStat);
/// ```
#[macro_export]
macro_rules! impl_denc_for_versioned {
    ($type:ty) => {
        impl $crate::denc::Denc for $type {
            const USES_VERSIONING: bool = true;

            fn encode<B: bytes::BufMut>(
                &self,
                buf: &mut B,
            ) -> std::result::Result<(), $crate::error::DencError> {
                <Self as $crate::denc::VersionedEncode>::encode_versioned(self, buf)
            }

            fn decode<B: bytes::Buf>(buf: &mut B) -> std::result::Result<Self, $crate::error::DencError> {
                <Self as $crate::denc::VersionedEncode>::decode_versioned(buf)
            }

            fn encoded_size(&self) -> Option<usize> {
                <Self as $crate::denc::VersionedEncode>::encoded_size_versioned(self)
            }
        }
    };
}

// ============= Top-level helpers =============

/// Encode a value into a freshly allocated buffer
pub fn encode_to_bytes<T: Denc>(value: &T) -> Result<Bytes, DencError> {
    let mut buf = BytesMut::with_capacity(value.encoded_size().unwrap_or(256));
    value.encode(&mut buf)?;
    Ok(buf.freeze())
}

/// Decode exactly one value from `data`, rejecting trailing bytes
pub fn decode_exact<T: Denc>(data: &[u8]) -> Result<T, DencError> {
    let mut buf = data;
    let value = T::decode(&mut buf)?;
    if buf.has_remaining() {
        return Err(DencError::TrailingBytes(buf.remaining()));
    }
    Ok(value)
}
