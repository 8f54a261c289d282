use std::borrow::Cow;

use zerocopy::{FromBytes, Immutable, KnownLayout};

use crate::cell::CivilDateTime;
use crate::constant::Encoding;
use crate::error::{Error, Result};
use crate::protocol::primitive::*;
use crate::protocol::response::ErrPayload;
use crate::protocol::temporal;

/// MySQL packet header (zero-copy)
///
/// Layout matches the wire protocol:
/// - length: 3 bytes (little-endian, payload length)
/// - sequence_id: 1 byte
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
pub struct PacketHeader {
    pub length: [u8; 3],
    pub sequence_id: u8,
}

impl PacketHeader {
    /// Get payload length as usize
    pub fn length(&self) -> usize {
        u32::from_le_bytes([self.length[0], self.length[1], self.length[2], 0]) as usize
    }

    /// Read packet header from byte slice (zero-copy)
    pub fn from_bytes(data: &[u8]) -> Result<&Self> {
        if data.len() < 4 {
            return Err(Error::UnexpectedEof);
        }
        Self::ref_from_bytes(&data[..4]).map_err(|_| Error::MalformedFrame("bad packet header"))
    }
}

/// Read cursor over one framed packet.
///
/// The borrowed buffer is the whole frame including its 4-byte header; the
/// framer may alias it across sibling packets, and nothing here mutates it.
/// The cursor starts at the first payload byte.
#[derive(Debug, Clone)]
pub struct Packet<'a> {
    sequence_id: u8,
    num_packets: usize,
    buffer: &'a [u8],
    offset: usize,
}

impl<'a> Packet<'a> {
    pub fn new(sequence_id: u8, buffer: &'a [u8]) -> Self {
        debug_assert!(buffer.len() >= 4);
        Self {
            sequence_id,
            num_packets: 1,
            buffer,
            offset: 4,
        }
    }

    /// A window over a payload the framer stitched from several frames.
    pub fn spanning(sequence_id: u8, buffer: &'a [u8], num_packets: usize) -> Self {
        debug_assert!(num_packets >= 1);
        Self {
            num_packets,
            ..Self::new(sequence_id, buffer)
        }
    }

    pub fn sequence_id(&self) -> u8 {
        self.sequence_id
    }

    /// Number of wire frames this window was assembled from.
    pub fn num_packets(&self) -> usize {
        self.num_packets
    }

    /// Rewind to the first payload byte.
    pub fn reset(&mut self) {
        self.offset = 4;
    }

    /// Frame length, header included.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// The whole frame.
    pub fn slice(&self) -> &'a [u8] {
        self.buffer
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn have_more_data(&self) -> bool {
        self.offset < self.buffer.len()
    }

    fn remaining(&self) -> &'a [u8] {
        &self.buffer[self.offset..]
    }

    fn advance_to(&mut self, rest: &'a [u8]) {
        self.offset = self.buffer.len() - rest.len();
    }

    fn peek(&self) -> Option<u8> {
        self.buffer.get(self.offset).copied()
    }

    // ─── Readers ─────────────────────────────────────────────────────────

    pub fn read_int_1(&mut self) -> Result<u8> {
        let (value, rest) = read_int_1(self.remaining())?;
        self.advance_to(rest);
        Ok(value)
    }

    pub fn read_int_2(&mut self) -> Result<u16> {
        let (value, rest) = read_int_2(self.remaining())?;
        self.advance_to(rest);
        Ok(value)
    }

    pub fn read_int_3(&mut self) -> Result<u32> {
        let (value, rest) = read_int_3(self.remaining())?;
        self.advance_to(rest);
        Ok(value)
    }

    pub fn read_int_4(&mut self) -> Result<u32> {
        let (value, rest) = read_int_4(self.remaining())?;
        self.advance_to(rest);
        Ok(value)
    }

    pub fn read_int_8(&mut self) -> Result<u64> {
        let (value, rest) = read_int_8(self.remaining())?;
        self.advance_to(rest);
        Ok(value)
    }

    pub fn read_float_4(&mut self) -> Result<f32> {
        let (value, rest) = read_float_4(self.remaining())?;
        self.advance_to(rest);
        Ok(value)
    }

    pub fn read_float_8(&mut self) -> Result<f64> {
        let (value, rest) = read_float_8(self.remaining())?;
        self.advance_to(rest);
        Ok(value)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let (bytes, rest) = read_string_fix(self.remaining(), len)?;
        self.advance_to(rest);
        Ok(bytes)
    }

    /// Read a length-coded count. EOF disambiguation of the 0xFE tag is the
    /// caller's: check `is_eof()` before reading from an ambiguous frame.
    pub fn read_lenenc_int(&mut self) -> Result<u64> {
        let (value, rest) = read_int_lenenc(self.remaining())?;
        self.advance_to(rest);
        Ok(value)
    }

    /// Read a length-coded number under the big-number policy. The `signed`
    /// hint only affects the 8-byte form.
    pub fn read_lenenc_number(
        &mut self,
        big_number_strings: bool,
        signed: bool,
    ) -> Result<LenencValue> {
        let (value, rest) = read_lenenc_value(self.remaining(), big_number_strings, signed)?;
        self.advance_to(rest);
        Ok(value)
    }

    /// Read a length-coded byte run; the NULL marker decodes to `None`.
    pub fn read_lenenc_buffer(&mut self) -> Result<Option<&'a [u8]>> {
        let (bytes, rest) = read_string_lenenc_opt(self.remaining())?;
        self.advance_to(rest);
        Ok(bytes)
    }

    /// Read a length-coded string decoded under `encoding`.
    pub fn read_lenenc_string(&mut self, encoding: Encoding) -> Result<Option<Cow<'a, str>>> {
        Ok(self.read_lenenc_buffer()?.map(|bytes| encoding.decode(bytes)))
    }

    /// Read up to the 0x00 terminator and decode under `encoding`.
    pub fn read_string_null(&mut self, encoding: Encoding) -> Result<Cow<'a, str>> {
        let (bytes, rest) = read_string_null(self.remaining())?;
        self.advance_to(rest);
        Ok(encoding.decode(bytes))
    }

    /// Remaining payload decoded under `encoding`.
    pub fn read_string_eof(&mut self, encoding: Encoding) -> Cow<'a, str> {
        let bytes = self.remaining();
        self.offset = self.buffer.len();
        encoding.decode(bytes)
    }

    fn read_length_prefixed(&mut self) -> Result<&'a [u8]> {
        let len = self.read_int_1()?;
        self.read_bytes(len as usize)
    }

    /// Read a binary DATE/DATETIME/TIMESTAMP cell (1-byte length prefix).
    pub fn read_datetime(&mut self) -> Result<crate::cell::DateTimeValue> {
        let payload = self.read_length_prefixed()?;
        temporal::decode_datetime(payload)
    }

    /// Read a binary DATE/DATETIME/TIMESTAMP cell as its string form.
    pub fn read_datetime_string(&mut self, decimals: u8) -> Result<String> {
        let payload = self.read_length_prefixed()?;
        temporal::decode_datetime_string(payload, decimals)
    }

    /// Read a binary TIME cell as `-HH:MM:SS[.ffffff]`.
    pub fn read_time_string(&mut self) -> Result<String> {
        let payload = self.read_length_prefixed()?;
        temporal::decode_time_string(payload)
    }

    /// Read a binary TIME cell as total signed milliseconds.
    pub fn read_time_millis(&mut self) -> Result<i64> {
        let payload = self.read_length_prefixed()?;
        temporal::decode_time_millis(payload)
    }

    // ─── Markers ─────────────────────────────────────────────────────────

    /// EOF sentinel: 0xFE marker on a frame shorter than 13 bytes overall.
    pub fn is_eof(&self) -> bool {
        self.peek() == Some(0xFE) && self.len() < 13
    }

    pub fn is_error(&self) -> bool {
        self.peek() == Some(0xFF)
    }

    /// A 0xFE marker regardless of frame length (AuthSwitch shares the tag).
    pub fn is_auth_switch(&self) -> bool {
        self.peek() == Some(0xFE)
    }

    pub fn packet_type(&self) -> &'static str {
        if self.is_eof() {
            "EOF"
        } else if self.is_error() {
            "Error"
        } else if self.peek() == Some(0x00) {
            "maybeOK"
        } else {
            ""
        }
    }

    /// Decode an ERR frame at the cursor into a structured error, consuming
    /// the packet.
    ///
    /// The SQL-state block is optional; pre-4.1 servers omit the `#` marker
    /// and the whole remainder is the message.
    pub fn into_error(mut self, encoding: Encoding) -> Result<ErrPayload> {
        let marker = self.read_int_1()?;
        if marker != 0xFF {
            return Err(Error::MalformedFrame("not an ERR frame"));
        }
        let errno = self.read_int_2()?;
        let sql_state = if self.peek() == Some(b'#') {
            self.read_int_1()?;
            let state = self.read_bytes(5)?;
            Some(String::from_utf8_lossy(state).into_owned())
        } else {
            None
        };
        let message = self.read_string_eof(encoding).into_owned();
        Ok(ErrPayload::new(errno, sql_state, message))
    }
}

/// Write buffer for one outbound packet.
///
/// The first four bytes are reserved for the frame header and patched by
/// `write_header` once the payload is complete; the buffer is exclusively
/// owned until handed to the framer.
#[derive(Debug)]
pub struct PacketBuf {
    buffer: Vec<u8>,
}

impl PacketBuf {
    pub fn new() -> Self {
        Self { buffer: vec![0; 4] }
    }

    pub fn with_capacity(payload_capacity: usize) -> Self {
        let mut buffer = Vec::with_capacity(payload_capacity + 4);
        buffer.extend_from_slice(&[0; 4]);
        Self { buffer }
    }

    pub fn payload_len(&self) -> usize {
        self.buffer.len() - 4
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buffer
    }

    // ─── Writers ─────────────────────────────────────────────────────────

    pub fn write_int_1(&mut self, value: u8) {
        write_int_1(&mut self.buffer, value);
    }

    pub fn write_int_2(&mut self, value: u16) {
        write_int_2(&mut self.buffer, value);
    }

    pub fn write_int_3(&mut self, value: u32) {
        write_int_3(&mut self.buffer, value);
    }

    pub fn write_int_4(&mut self, value: u32) {
        write_int_4(&mut self.buffer, value);
    }

    pub fn write_int_8(&mut self, value: u64) {
        write_int_8(&mut self.buffer, value);
    }

    pub fn write_double(&mut self, value: f64) {
        write_float_8(&mut self.buffer, value);
    }

    pub fn write_bytes(&mut self, data: &[u8]) {
        write_bytes_fix(&mut self.buffer, data);
    }

    /// Write the length-coded NULL marker.
    pub fn write_null(&mut self) {
        write_lenenc_null(&mut self.buffer);
    }

    pub fn write_string(&mut self, s: &str) {
        write_bytes_fix(&mut self.buffer, s.as_bytes());
    }

    pub fn write_lenenc_string(&mut self, s: &str) {
        write_string_lenenc(&mut self.buffer, s);
    }

    pub fn write_lenenc_buffer(&mut self, data: &[u8]) {
        write_bytes_lenenc(&mut self.buffer, data);
    }

    /// Write a length-coded number in its narrowest form. Decimal-string
    /// magnitudes are accepted; anything not representable is a malformed
    /// frame.
    pub fn write_lenenc_number<'a>(&mut self, value: impl Into<LenencInput<'a>>) -> Result<()> {
        let value = match value.into() {
            LenencInput::UInt(v) => v,
            LenencInput::Str(s) => s
                .parse::<u64>()
                .map_err(|_| Error::MalformedFrame("length-coded number not representable"))?,
        };
        write_int_lenenc(&mut self.buffer, value);
        Ok(())
    }

    /// Write a DATETIME value, always in the 11-byte form.
    pub fn write_date(&mut self, value: &CivilDateTime) {
        self.write_int_1(11);
        self.write_int_2(value.year);
        self.write_int_1(value.month);
        self.write_int_1(value.day);
        self.write_int_1(value.hour);
        self.write_int_1(value.minute);
        self.write_int_1(value.second);
        self.write_int_4(value.micros);
    }

    /// Patch the reserved header bytes with the payload length and sequence
    /// id. The write position is unaffected.
    pub fn write_header(&mut self, sequence_id: u8) {
        let len = (self.buffer.len() - 4) as u32;
        let bytes = len.to_le_bytes();
        self.buffer[0] = bytes[0];
        self.buffer[1] = bytes[1];
        self.buffer[2] = bytes[2];
        self.buffer[3] = sequence_id;
    }
}

impl Default for PacketBuf {
    fn default() -> Self {
        Self::new()
    }
}

/// Accepted representations for `write_lenenc_number`.
#[derive(Debug, Clone, Copy)]
pub enum LenencInput<'a> {
    UInt(u64),
    Str(&'a str),
}

impl From<u64> for LenencInput<'_> {
    fn from(value: u64) -> Self {
        Self::UInt(value)
    }
}

impl<'a> From<&'a str> for LenencInput<'a> {
    fn from(value: &'a str) -> Self {
        Self::Str(value)
    }
}
