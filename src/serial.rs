//! Byte-level serialization primitives shared by every wire structure.
//!
//! Bitcoin serializes multi-byte integers little-endian, with two
//! documented exceptions: the port inside a network address and the
//! `OP_PUSHDATA2`/`OP_PUSHDATA4` length prefixes inside a script are
//! big-endian.
//!
//! Reads go through [`WireRead`] and writes through [`WireWrite`]; both
//! are blanket-implemented for the std-io traits, so a `TcpStream`, a
//! `Cursor` or a `Vec<u8>` all participate directly. Every read carries a
//! static context string naming the field, which ends up in the error when
//! the stream runs dry.
//!
//! [`LimitedSource`] bounds one message's payload and [`Tap`] feeds the
//! consumed bytes into a digest, so the node can verify a frame checksum
//! while parsing instead of buffering the whole payload first.

use std::io::{self, Read, Write};

use byteorder::{BigEndian, LittleEndian, WriteBytesExt};

use crate::error::{Error, Result};

/// Hard upper bound on any length prefix decoded from the network.
///
/// Matches the 32 MiB maximum message size of the P2P protocol; a count or
/// byte length above it can never describe a valid payload.
pub const MAX_WIRE_LENGTH: u64 = 32 * 1024 * 1024;

/// Typed reads over any byte stream.
///
/// Decoders accept non-canonical varints (a value below 0xFD spelled in
/// the 0xFD/0xFE/0xFF forms), as Bitcoin Core historically does. Encoders
/// always emit the canonical form.
pub trait WireRead: Read {
    /// Like [`Read::read_exact`], but maps a short read to
    /// [`Error::UnexpectedEof`] carrying the field name.
    fn read_exact_ctx(&mut self, buf: &mut [u8], ctx: &'static str) -> Result<()> {
        self.read_exact(buf).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => Error::UnexpectedEof(ctx),
            _ => Error::Io(e),
        })
    }

    fn read_array<const N: usize>(&mut self, ctx: &'static str) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.read_exact_ctx(&mut buf, ctx)?;
        Ok(buf)
    }

    fn read_u8(&mut self, ctx: &'static str) -> Result<u8> {
        Ok(self.read_array::<1>(ctx)?[0])
    }

    fn read_u16_le(&mut self, ctx: &'static str) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_array(ctx)?))
    }

    fn read_u16_be(&mut self, ctx: &'static str) -> Result<u16> {
        Ok(u16::from_be_bytes(self.read_array(ctx)?))
    }

    fn read_u32_le(&mut self, ctx: &'static str) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array(ctx)?))
    }

    fn read_i32_le(&mut self, ctx: &'static str) -> Result<i32> {
        Ok(i32::from_le_bytes(self.read_array(ctx)?))
    }

    fn read_u64_le(&mut self, ctx: &'static str) -> Result<u64> {
        Ok(u64::from_le_bytes(self.read_array(ctx)?))
    }

    fn read_i64_le(&mut self, ctx: &'static str) -> Result<i64> {
        Ok(i64::from_le_bytes(self.read_array(ctx)?))
    }

    /// Reads a CompactSize integer.
    fn read_varint(&mut self, ctx: &'static str) -> Result<u64> {
        match self.read_u8(ctx)? {
            0xFD => Ok(u64::from(self.read_u16_le(ctx)?)),
            0xFE => Ok(u64::from(self.read_u32_le(ctx)?)),
            0xFF => self.read_u64_le(ctx),
            n => Ok(u64::from(n)),
        }
    }

    /// Reads a CompactSize integer used as an element count or byte
    /// length. A value beyond the 32 MiB protocol bound is a structural
    /// violation ([`Error::InvalidFormat`]); one that does not fit the
    /// target width is [`Error::Overflow`].
    fn read_varint_len(&mut self, ctx: &'static str) -> Result<usize> {
        let v = self.read_varint(ctx)?;
        if v > MAX_WIRE_LENGTH {
            return Err(Error::InvalidFormat(ctx));
        }
        usize::try_from(v).map_err(|_| Error::Overflow(ctx))
    }

    /// Reads a CompactSize length prefix followed by that many raw bytes.
    fn read_var_bytes(&mut self, ctx: &'static str) -> Result<Vec<u8>> {
        let len = self.read_varint_len(ctx)?;
        let mut buf = vec![0u8; len];
        self.read_exact_ctx(&mut buf, ctx)?;
        Ok(buf)
    }

    /// Reads a length-prefixed UTF-8 string.
    fn read_var_string(&mut self, ctx: &'static str) -> Result<String> {
        String::from_utf8(self.read_var_bytes(ctx)?).map_err(|_| Error::InvalidFormat(ctx))
    }
}

impl<R: Read + ?Sized> WireRead for R {}

/// Typed writes over any byte sink.
pub trait WireWrite: Write {
    fn write_u8(&mut self, v: u8) -> Result<()> {
        WriteBytesExt::write_u8(self, v)?;
        Ok(())
    }

    fn write_u16_le(&mut self, v: u16) -> Result<()> {
        WriteBytesExt::write_u16::<LittleEndian>(self, v)?;
        Ok(())
    }

    fn write_u16_be(&mut self, v: u16) -> Result<()> {
        WriteBytesExt::write_u16::<BigEndian>(self, v)?;
        Ok(())
    }

    fn write_u32_le(&mut self, v: u32) -> Result<()> {
        WriteBytesExt::write_u32::<LittleEndian>(self, v)?;
        Ok(())
    }

    fn write_i32_le(&mut self, v: i32) -> Result<()> {
        WriteBytesExt::write_i32::<LittleEndian>(self, v)?;
        Ok(())
    }

    fn write_u64_le(&mut self, v: u64) -> Result<()> {
        WriteBytesExt::write_u64::<LittleEndian>(self, v)?;
        Ok(())
    }

    fn write_i64_le(&mut self, v: i64) -> Result<()> {
        WriteBytesExt::write_i64::<LittleEndian>(self, v)?;
        Ok(())
    }

    /// Writes a CompactSize integer in canonical form.
    fn write_varint(&mut self, v: u64) -> Result<()> {
        match v {
            0..=0xFC => self.write_u8(v as u8),
            0xFD..=0xFFFF => {
                self.write_u8(0xFD)?;
                self.write_u16_le(v as u16)
            }
            0x1_0000..=0xFFFF_FFFF => {
                self.write_u8(0xFE)?;
                self.write_u32_le(v as u32)
            }
            _ => {
                self.write_u8(0xFF)?;
                self.write_u64_le(v)
            }
        }
    }

    /// Writes a CompactSize length prefix followed by the raw bytes.
    fn write_var_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.write_varint(data.len() as u64)?;
        self.write_all(data)?;
        Ok(())
    }

    fn write_var_string(&mut self, s: &str) -> Result<()> {
        self.write_var_bytes(s.as_bytes())
    }
}

impl<W: Write + ?Sized> WireWrite for W {}

/// A reader bounded to a fixed byte budget.
///
/// Reads clamp to the budget; reading past it reports end-of-stream, which
/// the typed readers above turn into [`Error::UnexpectedEof`]. Used to
/// confine one message's decoder to its advertised payload length.
pub struct LimitedSource<R> {
    inner: R,
    remaining: u64,
}

impl<R: Read> LimitedSource<R> {
    pub fn new(inner: R, limit: u64) -> Self {
        Self {
            inner,
            remaining: limit,
        }
    }

    /// Bytes left in the budget.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Consumes the rest of the budget as raw bytes. Payloads whose final
    /// field extends to the end of the frame (`reject`, unknown commands)
    /// are captured this way.
    pub fn read_remaining(&mut self, ctx: &'static str) -> Result<Vec<u8>> {
        let len = usize::try_from(self.remaining).map_err(|_| Error::Overflow(ctx))?;
        let mut buf = vec![0u8; len];
        self.read_exact_ctx(&mut buf, ctx)?;
        Ok(buf)
    }
}

impl<R: Read> Read for LimitedSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Ok(0);
        }
        let cap = u64::min(buf.len() as u64, self.remaining) as usize;
        let n = self.inner.read(&mut buf[..cap])?;
        self.remaining -= n as u64;
        Ok(n)
    }
}

/// A reader that forwards to an underlying stream while copying every
/// consumed byte into a sink, typically a hasher.
///
/// Lets the node fold a message's payload into its checksum digest as the
/// payload is parsed.
pub struct Tap<R, W> {
    inner: R,
    sink: W,
}

impl<R: Read, W: Write> Tap<R, W> {
    pub fn new(inner: R, sink: W) -> Self {
        Self { inner, sink }
    }
}

impl<R: Read, W: Write> Read for Tap<R, W> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.sink.write_all(&buf[..n])?;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha2::{Digest, Sha256};
    use std::io::Cursor;

    #[test]
    fn varint_roundtrip_at_boundaries() {
        for v in [
            0u64,
            0xFC,
            0xFD,
            0xFFFF,
            0x1_0000,
            0xFFFF_FFFF,
            0x1_0000_0000,
            u64::MAX,
        ] {
            let mut buf = Vec::new();
            buf.write_varint(v).unwrap();
            let decoded = Cursor::new(&buf).read_varint("varint").unwrap();
            assert_eq!(decoded, v);
        }
    }

    #[test]
    fn varint_encoding_is_canonical() {
        let mut buf = Vec::new();
        buf.write_varint(0xFC).unwrap();
        assert_eq!(buf, [0xFC]);

        buf.clear();
        buf.write_varint(0xFD).unwrap();
        assert_eq!(buf, [0xFD, 0xFD, 0x00]);

        buf.clear();
        buf.write_varint(0x1_0000).unwrap();
        assert_eq!(buf, [0xFE, 0x00, 0x00, 0x01, 0x00]);
    }

    #[test]
    fn varint_accepts_non_canonical_forms() {
        // 5 spelled as 0xFD + u16, 0xFE + u32 and 0xFF + u64. Core accepts
        // these on the wire, so the decoder does too.
        let wide2 = [0xFDu8, 0x05, 0x00];
        let wide4 = [0xFEu8, 0x05, 0x00, 0x00, 0x00];
        let wide8 = [0xFFu8, 0x05, 0, 0, 0, 0, 0, 0, 0];
        assert_eq!(Cursor::new(&wide2).read_varint("varint").unwrap(), 5);
        assert_eq!(Cursor::new(&wide4).read_varint("varint").unwrap(), 5);
        assert_eq!(Cursor::new(&wide8).read_varint("varint").unwrap(), 5);
    }

    #[test]
    fn varint_len_rejects_values_beyond_wire_cap() {
        let mut buf = Vec::new();
        buf.write_varint(MAX_WIRE_LENGTH + 1).unwrap();
        assert!(matches!(
            Cursor::new(&buf).read_varint_len("count"),
            Err(Error::InvalidFormat("count"))
        ));

        let mut buf = Vec::new();
        buf.write_varint(MAX_WIRE_LENGTH).unwrap();
        assert_eq!(
            Cursor::new(&buf).read_varint_len("count").unwrap() as u64,
            MAX_WIRE_LENGTH
        );
    }

    #[test]
    fn truncated_varint_reports_eof() {
        let buf = [0xFDu8, 0x05]; // missing one byte of the u16
        assert!(matches!(
            Cursor::new(&buf).read_varint("varint"),
            Err(Error::UnexpectedEof("varint"))
        ));
    }

    #[test]
    fn var_bytes_roundtrip() {
        let data = b"hello world";
        let mut buf = Vec::new();
        buf.write_var_bytes(data).unwrap();
        let decoded = Cursor::new(&buf).read_var_bytes("bytes").unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn limited_source_stops_at_budget() {
        let mut src = LimitedSource::new(Cursor::new([1u8, 2, 3, 4, 5]), 3);
        let head: [u8; 2] = src.read_array("head").unwrap();
        assert_eq!(head, [1, 2]);
        assert_eq!(src.remaining(), 1);
        // One byte left in the budget; a two-byte field must fail even
        // though the underlying stream has more data.
        assert!(matches!(
            src.read_array::<2>("tail"),
            Err(Error::UnexpectedEof("tail"))
        ));
    }

    #[test]
    fn limited_source_read_remaining_drains_budget() {
        let mut src = LimitedSource::new(Cursor::new([1u8, 2, 3, 4, 5]), 4);
        src.read_u8("head").unwrap();
        assert_eq!(src.read_remaining("tail").unwrap(), vec![2, 3, 4]);
        assert_eq!(src.remaining(), 0);
    }

    #[test]
    fn tap_hashes_exactly_the_consumed_bytes() {
        let payload = [0xAAu8, 0xBB, 0xCC, 0xDD, 0xEE];
        let mut hasher = Sha256::new();
        let mut tap = Tap::new(Cursor::new(payload), &mut hasher);
        let _: [u8; 3] = tap.read_array("head").unwrap();
        drop(tap);
        assert_eq!(
            hasher.finalize().as_slice(),
            Sha256::digest(&payload[..3]).as_slice()
        );
    }
}
