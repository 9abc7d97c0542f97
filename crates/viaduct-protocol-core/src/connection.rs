use crate::codec::{read_varint, write_varint, CodecError};
use bytes::{Buf, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::trace;

/// Frames are `VarInt length | VarInt packet id | payload`.
pub struct Connection {
    stream: TcpStream,
    read_buf: BytesMut,
    max_packet_size: usize,
}

impl Connection {
    pub fn new(stream: TcpStream, max_packet_size: usize) -> Self {
        Self {
            stream,
            read_buf: BytesMut::with_capacity(4096),
            max_packet_size,
        }
    }

    /// Read a single packet frame, returning (packet_id, payload).
    pub async fn read_packet(&mut self) -> anyhow::Result<(i32, BytesMut)> {
        read_frame(&mut self.stream, &mut self.read_buf, self.max_packet_size).await
    }

    /// Write a packet with the given ID and payload.
    pub async fn write_packet(&mut self, packet_id: i32, payload: &[u8]) -> anyhow::Result<()> {
        let frame = build_frame(packet_id, payload);
        self.stream.write_all(&frame).await?;
        Ok(())
    }

    /// Split the connection into read and write halves. Bytes already
    /// buffered but not yet parsed stay with the reader.
    pub fn into_split(self) -> (ConnectionReader, ConnectionWriter) {
        let (read_half, write_half) = self.stream.into_split();
        (
            ConnectionReader {
                stream: read_half,
                read_buf: self.read_buf,
                max_packet_size: self.max_packet_size,
            },
            ConnectionWriter { stream: write_half },
        )
    }
}

/// Read half of a split connection.
pub struct ConnectionReader {
    stream: OwnedReadHalf,
    read_buf: BytesMut,
    max_packet_size: usize,
}

impl ConnectionReader {
    /// Cancel-safe: a partially received frame stays buffered.
    pub async fn read_packet(&mut self) -> anyhow::Result<(i32, BytesMut)> {
        read_frame(&mut self.stream, &mut self.read_buf, self.max_packet_size).await
    }
}

/// Write half of a split connection.
pub struct ConnectionWriter {
    stream: OwnedWriteHalf,
}

impl ConnectionWriter {
    pub async fn write_packet(&mut self, packet_id: i32, payload: &[u8]) -> anyhow::Result<()> {
        let frame = build_frame(packet_id, payload);
        self.stream.write_all(&frame).await?;
        Ok(())
    }
}

// === Shared helpers ===

async fn read_frame<R: AsyncReadExt + Unpin>(
    stream: &mut R,
    read_buf: &mut BytesMut,
    max_packet_size: usize,
) -> anyhow::Result<(i32, BytesMut)> {
    loop {
        if let Some(result) = try_parse_packet(read_buf, max_packet_size)? {
            return Ok(result);
        }
        let mut tmp = [0u8; 4096];
        let n = stream.read(&mut tmp).await?;
        if n == 0 {
            return Err(anyhow::anyhow!("Connection closed"));
        }
        read_buf.extend_from_slice(&tmp[..n]);
    }
}

fn try_parse_packet(
    read_buf: &mut BytesMut,
    max_packet_size: usize,
) -> Result<Option<(i32, BytesMut)>, CodecError> {
    if read_buf.is_empty() {
        return Ok(None);
    }

    let mut peek = &read_buf[..];
    let length = match read_varint(&mut peek) {
        Ok(len) => len,
        Err(CodecError::NotEnoughData { .. }) => return Ok(None),
        Err(e) => return Err(e),
    };
    if length < 0 {
        return Err(CodecError::NegativeLength(length as i64));
    }
    let length = length as usize;
    if length > max_packet_size {
        return Err(CodecError::TooLong {
            len: length,
            max: max_packet_size,
        });
    }

    let varint_bytes = read_buf.len() - peek.len();
    if peek.remaining() < length {
        return Ok(None);
    }

    read_buf.advance(varint_bytes);
    let mut packet_data = read_buf.split_to(length);
    let packet_id = read_varint(&mut packet_data)?;
    trace!(
        "Read packet id=0x{:02X} len={}",
        packet_id,
        packet_data.len()
    );

    Ok(Some((packet_id, packet_data)))
}

fn build_frame(packet_id: i32, payload: &[u8]) -> BytesMut {
    let mut packet_buf = BytesMut::with_capacity(payload.len() + 5);
    write_varint(&mut packet_buf, packet_id);
    packet_buf.extend_from_slice(payload);

    let mut frame = BytesMut::with_capacity(packet_buf.len() + 5);
    write_varint(&mut frame, packet_buf.len() as i32);
    frame.extend_from_slice(&packet_buf);
    frame
}
