//! Typed wire codecs.
//!
//! Each wire type is a small `Copy` value handed to
//! [`PacketWrapper::read`](crate::PacketWrapper::read) and friends, e.g.
//! `wrapper.read(Byte)?` or `wrapper.write(Str::new(256), text)?`. Types with
//! a length prefix carry their own maximum so corrupt input cannot trigger an
//! unbounded allocation.

use crate::codec::*;
use bytes::{Buf, BufMut, BytesMut};

/// A decoded field, as recorded in a wrapper's field log.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Bool(bool),
    Byte(i8),
    UnsignedByte(u8),
    Short(i16),
    UnsignedShort(u16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    VarInt(i32),
    VarLong(i64),
    String(String),
    Bytes { len: usize },
    Uuid(uuid::Uuid),
}

/// Encode/decode rules for one wire type.
pub trait WireType: Copy {
    type Value;

    fn name(&self) -> &'static str;

    /// Decode the next value, advancing `buf` past it.
    fn decode(&self, buf: &mut BytesMut) -> CodecResult<Self::Value>;

    /// Encode `value` onto `buf`, returning the number of bytes written.
    fn encode(&self, value: &Self::Value, buf: &mut BytesMut) -> CodecResult<usize>;

    fn field(&self, value: &Self::Value) -> FieldValue;

    /// Decode and report how many bytes were consumed.
    fn decode_counted(&self, buf: &mut BytesMut) -> CodecResult<(Self::Value, usize)> {
        let before = buf.len();
        let value = self.decode(buf)?;
        Ok((value, before - buf.len()))
    }
}

macro_rules! fixed_width {
    ($(#[$meta:meta])* $name:ident, $value:ty, $width:expr, $get:ident, $put:ident, $variant:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name;

        impl WireType for $name {
            type Value = $value;

            fn name(&self) -> &'static str {
                stringify!($name)
            }

            fn decode(&self, buf: &mut BytesMut) -> CodecResult<$value> {
                ensure_remaining(buf, $width)?;
                Ok(buf.$get())
            }

            fn encode(&self, value: &$value, buf: &mut BytesMut) -> CodecResult<usize> {
                buf.$put(*value);
                Ok($width)
            }

            fn field(&self, value: &$value) -> FieldValue {
                FieldValue::$variant(*value)
            }
        }
    };
}

fixed_width!(
    /// Signed 8-bit integer.
    Byte, i8, 1, get_i8, put_i8, Byte
);
fixed_width!(UnsignedByte, u8, 1, get_u8, put_u8, UnsignedByte);
fixed_width!(Short, i16, 2, get_i16, put_i16, Short);
fixed_width!(UnsignedShort, u16, 2, get_u16, put_u16, UnsignedShort);
fixed_width!(Int, i32, 4, get_i32, put_i32, Int);
fixed_width!(Long, i64, 8, get_i64, put_i64, Long);
fixed_width!(
    /// Big-endian IEEE 754 single precision.
    Float, f32, 4, get_f32, put_f32, Float
);
fixed_width!(Double, f64, 8, get_f64, put_f64, Double);

/// One byte, any non-zero value reads as `true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bool;

impl WireType for Bool {
    type Value = bool;

    fn name(&self) -> &'static str {
        "Bool"
    }

    fn decode(&self, buf: &mut BytesMut) -> CodecResult<bool> {
        ensure_remaining(buf, 1)?;
        Ok(buf.get_u8() != 0)
    }

    fn encode(&self, value: &bool, buf: &mut BytesMut) -> CodecResult<usize> {
        buf.put_u8(u8::from(*value));
        Ok(1)
    }

    fn field(&self, value: &bool) -> FieldValue {
        FieldValue::Bool(*value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarInt;

impl WireType for VarInt {
    type Value = i32;

    fn name(&self) -> &'static str {
        "VarInt"
    }

    fn decode(&self, buf: &mut BytesMut) -> CodecResult<i32> {
        read_varint(buf)
    }

    fn encode(&self, value: &i32, buf: &mut BytesMut) -> CodecResult<usize> {
        Ok(write_varint(buf, *value))
    }

    fn field(&self, value: &i32) -> FieldValue {
        FieldValue::VarInt(*value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarLong;

impl WireType for VarLong {
    type Value = i64;

    fn name(&self) -> &'static str {
        "VarLong"
    }

    fn decode(&self, buf: &mut BytesMut) -> CodecResult<i64> {
        read_varlong(buf)
    }

    fn encode(&self, value: &i64, buf: &mut BytesMut) -> CodecResult<usize> {
        Ok(write_varlong(buf, *value))
    }

    fn field(&self, value: &i64) -> FieldValue {
        FieldValue::VarLong(*value)
    }
}

/// VarInt-prefixed UTF-8 string of at most `max_len` characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Str {
    pub max_len: usize,
}

impl Str {
    pub const fn new(max_len: usize) -> Self {
        Self { max_len }
    }
}

/// The general-purpose protocol string limit.
pub const STRING: Str = Str::new(32767);

impl WireType for Str {
    type Value = String;

    fn name(&self) -> &'static str {
        "String"
    }

    fn decode(&self, buf: &mut BytesMut) -> CodecResult<String> {
        read_string(buf, self.max_len)
    }

    fn encode(&self, value: &String, buf: &mut BytesMut) -> CodecResult<usize> {
        write_string(buf, value, self.max_len)
    }

    fn field(&self, value: &String) -> FieldValue {
        FieldValue::String(value.clone())
    }
}

/// VarInt-prefixed byte array of at most `max_len` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteArray {
    pub max_len: usize,
}

impl ByteArray {
    pub const fn new(max_len: usize) -> Self {
        Self { max_len }
    }
}

impl WireType for ByteArray {
    type Value = Vec<u8>;

    fn name(&self) -> &'static str {
        "ByteArray"
    }

    fn decode(&self, buf: &mut BytesMut) -> CodecResult<Vec<u8>> {
        read_byte_array(buf, self.max_len)
    }

    fn encode(&self, value: &Vec<u8>, buf: &mut BytesMut) -> CodecResult<usize> {
        write_byte_array(buf, value, self.max_len)
    }

    fn field(&self, value: &Vec<u8>) -> FieldValue {
        FieldValue::Bytes { len: value.len() }
    }
}

/// Everything left in the payload, unprefixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemainingBytes;

impl WireType for RemainingBytes {
    type Value = Vec<u8>;

    fn name(&self) -> &'static str {
        "RemainingBytes"
    }

    fn decode(&self, buf: &mut BytesMut) -> CodecResult<Vec<u8>> {
        Ok(buf.split().to_vec())
    }

    fn encode(&self, value: &Vec<u8>, buf: &mut BytesMut) -> CodecResult<usize> {
        buf.put_slice(value);
        Ok(value.len())
    }

    fn field(&self, value: &Vec<u8>) -> FieldValue {
        FieldValue::Bytes { len: value.len() }
    }
}

/// 128-bit UUID, big endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Uuid;

impl WireType for Uuid {
    type Value = uuid::Uuid;

    fn name(&self) -> &'static str {
        "Uuid"
    }

    fn decode(&self, buf: &mut BytesMut) -> CodecResult<uuid::Uuid> {
        ensure_remaining(buf, 16)?;
        let mut bytes = [0u8; 16];
        buf.copy_to_slice(&mut bytes);
        Ok(uuid::Uuid::from_bytes(bytes))
    }

    fn encode(&self, value: &uuid::Uuid, buf: &mut BytesMut) -> CodecResult<usize> {
        buf.put_slice(value.as_bytes());
        Ok(16)
    }

    fn field(&self, value: &uuid::Uuid) -> FieldValue {
        FieldValue::Uuid(*value)
    }
}

/// Classic-era string: exactly 64 bytes of US-ASCII, right-padded with spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassicString;

impl ClassicString {
    pub const WIDTH: usize = 64;
}

impl WireType for ClassicString {
    type Value = String;

    fn name(&self) -> &'static str {
        "ClassicString"
    }

    fn decode(&self, buf: &mut BytesMut) -> CodecResult<String> {
        ensure_remaining(buf, Self::WIDTH)?;
        let raw = buf.split_to(Self::WIDTH);
        let text: String = raw
            .iter()
            .map(|&b| if b.is_ascii() { b as char } else { '?' })
            .collect();
        Ok(text.trim_end_matches(' ').to_string())
    }

    fn encode(&self, value: &String, buf: &mut BytesMut) -> CodecResult<usize> {
        let len = value.chars().count();
        if len > Self::WIDTH {
            return Err(CodecError::TooLong {
                len,
                max: Self::WIDTH,
            });
        }
        for c in value.chars() {
            buf.put_u8(if c.is_ascii() { c as u8 } else { b'?' });
        }
        buf.put_bytes(b' ', Self::WIDTH - len);
        Ok(Self::WIDTH)
    }

    fn field(&self, value: &String) -> FieldValue {
        FieldValue::String(value.clone())
    }
}
