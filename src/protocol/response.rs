use crate::constant::{Encoding, StatusFlags, server_error_name};
use crate::error::{Error, Result};
use crate::protocol::primitive::*;
use zerocopy::byteorder::little_endian::U16 as U16LE;
use zerocopy::{FromBytes, Immutable, KnownLayout};

/// The OK payload (leading byte 0x00, or 0xFE under DEPRECATE_EOF)
#[derive(Debug, Clone)]
pub struct OkPayload {
    pub affected_rows: u64,
    pub last_insert_id: u64,
    pub status_flags: StatusFlags,
    pub warnings: u16,
}

impl OkPayload {
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let (header, data) = read_int_1(payload)?;
        if header != 0x00 && header != 0xFE {
            return Err(Error::MalformedFrame("not an OK payload"));
        }

        let (affected_rows, data) = read_int_lenenc(data)?;
        let (last_insert_id, data) = read_int_lenenc(data)?;
        let (status_flags, data) = read_int_2(data)?;
        let (warnings, _data) = read_int_2(data)?;

        Ok(OkPayload {
            affected_rows,
            last_insert_id,
            status_flags: StatusFlags::from_bits_truncate(status_flags),
            warnings,
        })
    }
}

/// The ERR payload decoded into a structured error.
///
/// `code` is the symbolic `ER_*` name resolved from the static table, or the
/// numeric code as text when unknown.
#[derive(Debug, Clone, thiserror::Error)]
#[error("ERROR {errno} ({code}): {message}")]
pub struct ErrPayload {
    pub code: String,
    pub errno: u16,
    pub sql_state: Option<String>,
    pub message: String,
}

impl ErrPayload {
    pub fn new(errno: u16, sql_state: Option<String>, message: String) -> Self {
        let code = match server_error_name(errno) {
            Some(name) => name.to_string(),
            None => errno.to_string(),
        };
        Self {
            code,
            errno,
            sql_state,
            message,
        }
    }

    /// Decode an ERR payload (leading byte 0xFF). The SQL-state block is
    /// optional and absent in pre-4.1 servers.
    pub fn parse(payload: &[u8], encoding: Encoding) -> Result<Self> {
        let (header, data) = read_int_1(payload)?;
        if header != 0xFF {
            return Err(Error::MalformedFrame("not an ERR payload"));
        }

        let (errno, data) = read_int_2(data)?;
        let (sql_state, data) = match data.first() {
            Some(b'#') => {
                let (state, rest) = read_string_fix(&data[1..], 5)?;
                (Some(String::from_utf8_lossy(state).into_owned()), rest)
            }
            _ => (None, data),
        };

        Ok(Self::new(
            errno,
            sql_state,
            encoding.decode(read_string_eof(data)).into_owned(),
        ))
    }
}

/// EOF frame tail after the 0xFE marker
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
pub struct EofPacket {
    warnings: U16LE,
    status_flags: U16LE,
}

impl EofPacket {
    pub fn warnings(&self) -> u16 {
        self.warnings.get()
    }

    pub fn status_flags(&self) -> StatusFlags {
        StatusFlags::from_bits_truncate(self.status_flags.get())
    }
}

/// Read an EOF payload (marker 0xFE, overall frame length < 13) - zero-copy
pub fn read_eof_packet(payload: &[u8]) -> Result<&EofPacket> {
    let (header, data) = read_int_1(payload)?;
    if header != 0xFE {
        return Err(Error::MalformedFrame("not an EOF payload"));
    }
    if data.len() < 4 {
        return Err(Error::UnexpectedEof);
    }
    EofPacket::ref_from_bytes(&data[..4]).map_err(|_| Error::MalformedFrame("bad EOF tail"))
}

// ============================================================================
// Tests
// ============================================================================
