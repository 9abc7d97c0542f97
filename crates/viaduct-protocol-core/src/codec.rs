use bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;

/// Decode failure. Once raised mid-packet the byte stream can no longer be
/// trusted, so callers close the connection.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("VarInt too big")]
    VarIntTooBig,
    #[error("Not enough data: need {needed} bytes, {remaining} remaining")]
    NotEnoughData { needed: usize, remaining: usize },
    #[error("Negative length prefix: {0}")]
    NegativeLength(i64),
    #[error("Length {len} exceeds maximum {max}")]
    TooLong { len: usize, max: usize },
    #[error("String is not valid UTF-8")]
    InvalidUtf8,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CodecResult<T> = Result<T, CodecError>;

/// Fail unless `buf` still holds at least `needed` bytes.
pub fn ensure_remaining<B: Buf>(buf: &B, needed: usize) -> CodecResult<()> {
    if buf.remaining() < needed {
        return Err(CodecError::NotEnoughData {
            needed,
            remaining: buf.remaining(),
        });
    }
    Ok(())
}

/// Read a VarInt from the buffer.
pub fn read_varint<B: Buf>(buf: &mut B) -> CodecResult<i32> {
    let mut result: i32 = 0;
    let mut shift: u32 = 0;
    loop {
        ensure_remaining(buf, 1)?;
        let byte = buf.get_u8();
        result |= ((byte & 0x7F) as i32) << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
        if shift >= 35 {
            return Err(CodecError::VarIntTooBig);
        }
    }
}

/// Write a VarInt to the buffer, returning the number of bytes written.
pub fn write_varint(buf: &mut BytesMut, mut value: i32) -> usize {
    let mut written = 0;
    loop {
        let mut byte = (value & 0x7F) as u8;
        value = ((value as u32) >> 7) as i32;
        if value != 0 {
            byte |= 0x80;
        }
        buf.put_u8(byte);
        written += 1;
        if value == 0 {
            return written;
        }
    }
}

/// Calculate the byte length of a VarInt.
pub fn varint_len(value: i32) -> usize {
    let mut val = value as u32;
    let mut len = 0;
    loop {
        len += 1;
        val >>= 7;
        if val == 0 {
            break;
        }
    }
    len
}

/// Read a VarLong from the buffer.
pub fn read_varlong<B: Buf>(buf: &mut B) -> CodecResult<i64> {
    let mut result: i64 = 0;
    let mut shift: u32 = 0;
    loop {
        ensure_remaining(buf, 1)?;
        let byte = buf.get_u8();
        result |= ((byte & 0x7F) as i64) << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
        if shift >= 70 {
            return Err(CodecError::VarIntTooBig);
        }
    }
}

/// Write a VarLong to the buffer, returning the number of bytes written.
pub fn write_varlong(buf: &mut BytesMut, mut value: i64) -> usize {
    let mut written = 0;
    loop {
        let mut byte = (value & 0x7F) as u8;
        value = ((value as u64) >> 7) as i64;
        if value != 0 {
            byte |= 0x80;
        }
        buf.put_u8(byte);
        written += 1;
        if value == 0 {
            return written;
        }
    }
}

/// Read a VarInt length prefix and check it against `max`.
pub fn read_length<B: Buf>(buf: &mut B, max: usize) -> CodecResult<usize> {
    let len = read_varint(buf)?;
    if len < 0 {
        return Err(CodecError::NegativeLength(len as i64));
    }
    let len = len as usize;
    if len > max {
        return Err(CodecError::TooLong { len, max });
    }
    Ok(len)
}

/// Read a protocol string (varint-prefixed UTF-8) of at most `max_len` characters.
pub fn read_string(buf: &mut BytesMut, max_len: usize) -> CodecResult<String> {
    // A character is at most 4 bytes of UTF-8.
    let len = read_length(buf, max_len * 4)?;
    ensure_remaining(buf, len)?;
    let bytes = buf.split_to(len);
    let s = String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8)?;
    let chars = s.chars().count();
    if chars > max_len {
        return Err(CodecError::TooLong {
            len: chars,
            max: max_len,
        });
    }
    Ok(s)
}

/// Write a protocol string, rejecting anything over `max_len` characters.
pub fn write_string(buf: &mut BytesMut, s: &str, max_len: usize) -> CodecResult<usize> {
    let chars = s.chars().count();
    if chars > max_len {
        return Err(CodecError::TooLong {
            len: chars,
            max: max_len,
        });
    }
    let prefix = write_varint(buf, s.len() as i32);
    buf.put_slice(s.as_bytes());
    Ok(prefix + s.len())
}

/// Read a byte array with varint length prefix.
pub fn read_byte_array(buf: &mut BytesMut, max_len: usize) -> CodecResult<Vec<u8>> {
    let len = read_length(buf, max_len)?;
    ensure_remaining(buf, len)?;
    let bytes = buf.split_to(len);
    Ok(bytes.to_vec())
}

/// Write a byte array with varint length prefix.
pub fn write_byte_array(buf: &mut BytesMut, data: &[u8], max_len: usize) -> CodecResult<usize> {
    if data.len() > max_len {
        return Err(CodecError::TooLong {
            len: data.len(),
            max: max_len,
        });
    }
    let prefix = write_varint(buf, data.len() as i32);
    buf.put_slice(data);
    Ok(prefix + data.len())
}
