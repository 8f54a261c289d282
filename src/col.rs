use crate::constant::{ColumnFlags, ColumnType, Encoding};
use crate::error::{Error, Result, eyre};
use crate::protocol::primitive::*;
use zerocopy::byteorder::little_endian::{U16 as U16LE, U32 as U32LE};
use zerocopy::{FromBytes, Immutable, KnownLayout};

/// Column definition bytes from MySQL protocol
///
/// This is a zero-copy wrapper around the raw bytes of a column definition packet.
#[derive(Debug, Clone, Copy)]
pub struct ColumnDefinitionBytes<'a>(pub &'a [u8]);

impl<'a> ColumnDefinitionBytes<'a> {
    /// Get a reference to the fixed-size tail of the column definition
    ///
    /// The tail is always the last 12 bytes of the column definition packet
    pub fn tail(&self) -> Result<&'a ColumnDefinitionTail> {
        if self.0.len() < 12 {
            return Err(Error::LibraryBug(eyre!(
                "column definition too short: {} < 12",
                self.0.len()
            )));
        }
        let tail_bytes = &self.0[self.0.len() - 12..];
        Ok(ColumnDefinitionTail::ref_from_bytes(tail_bytes)?)
    }
}

/// Fixed-size tail of Column Definition packet (12 bytes)
///
/// Follows the variable-length string fields, after the length-coded 0x0C
/// indicator: charset (2 LE), column length (4 LE), column type (1),
/// flags (2 LE), decimals (1), reserved (2).
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
pub struct ColumnDefinitionTail {
    charset: U16LE,
    column_length: U32LE,
    column_type: u8,
    flags: U16LE,
    decimals: u8,
    reserved: U16LE,
}

impl ColumnDefinitionTail {
    pub fn charset(&self) -> u16 {
        self.charset.get()
    }

    pub fn column_length(&self) -> u32 {
        self.column_length.get()
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn column_type(&self) -> Result<ColumnType> {
        ColumnType::from_u8(self.column_type).ok_or_else(|| {
            Error::LibraryBug(eyre!("unknown column type: 0x{:02X}", self.column_type))
        })
    }

    pub fn flags(&self) -> ColumnFlags {
        ColumnFlags::from_bits_truncate(self.flags.get())
    }
}

/// A resolved column definition: the decoded strings, the numeric tail
/// fields, and the encoding looked up from the charset table. This is what
/// row decoding and the cast adapter consume.
#[derive(Debug, Clone)]
pub struct Column {
    pub schema: String,
    pub table: String,
    pub org_table: String,
    pub name: String,
    pub org_name: String,
    pub character_set: u16,
    pub column_length: u32,
    pub column_type: ColumnType,
    pub flags: ColumnFlags,
    pub decimals: u8,
    pub encoding: Encoding,
}

impl Column {
    /// Decode a column-definition packet payload.
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        let bytes = ColumnDefinitionBytes(payload);
        let data = bytes.0;

        // ─── Variable Length String Fields ───────────────────────────
        let (_catalog, data) = read_string_lenenc(data)?;
        let (schema, data) = read_string_lenenc(data)?;
        let (table, data) = read_string_lenenc(data)?;
        let (org_table, data) = read_string_lenenc(data)?;
        let (name, data) = read_string_lenenc(data)?;
        let (org_name, data) = read_string_lenenc(data)?;

        // length of the fixed tail, always 0x0c
        let (_fixed_len, _data) = read_int_lenenc(data)?;
        let tail = bytes.tail()?;

        let character_set = tail.charset();
        Ok(Self {
            schema: String::from_utf8_lossy(schema).into_owned(),
            table: String::from_utf8_lossy(table).into_owned(),
            org_table: String::from_utf8_lossy(org_table).into_owned(),
            name: String::from_utf8_lossy(name).into_owned(),
            org_name: String::from_utf8_lossy(org_name).into_owned(),
            character_set,
            column_length: tail.column_length(),
            column_type: tail.column_type()?,
            flags: tail.flags(),
            decimals: tail.decimals(),
            encoding: Encoding::from_charset(character_set),
        })
    }

    pub fn is_unsigned(&self) -> bool {
        self.flags.contains(ColumnFlags::UNSIGNED_FLAG)
    }

    /// Legacy short type name (`"LONG"`, `"VAR_STRING"`, ..).
    pub fn type_name(&self) -> &'static str {
        self.column_type.name()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn build_column_packet(tail: [u8; 12]) -> Vec<u8> {
        let mut packet = Vec::new();
        for field in [
            &b"def"[..],
            &b"test"[..],
            &b"users"[..],
            &b"users"[..],
            &b"id"[..],
            &b"id"[..],
        ] {
            packet.push(field.len() as u8);
            packet.extend_from_slice(field);
        }
        packet.push(0x0c);
        packet.extend_from_slice(&tail);
        packet
    }

    #[test]
    fn test_column_definition_tail_size() {
        assert_eq!(std::mem::size_of::<ColumnDefinitionTail>(), 12);
    }

    #[test]
    fn test_column_from_payload() {
        let packet = build_column_packet([
            0x21, 0x00, // charset = 33 (utf8)
            0x0B, 0x00, 0x00, 0x00, // column_length = 11
            0x03, // column_type = 3 (LONG)
            0x03, 0x42, // flags = 0x4203 (NOT_NULL | PRI_KEY | AUTO_INCREMENT | PART_KEY)
            0x00, // decimals = 0
            0x00, 0x00, // reserved
        ]);

        let column = Column::from_payload(&packet).unwrap();
        assert_eq!(column.schema, "test");
        assert_eq!(column.table, "users");
        assert_eq!(column.org_table, "users");
        assert_eq!(column.name, "id");
        assert_eq!(column.org_name, "id");
        assert_eq!(column.character_set, 33);
        assert_eq!(column.column_length, 11);
        assert_eq!(column.column_type, ColumnType::MYSQL_TYPE_LONG);
        assert_eq!(column.decimals, 0);
        assert_eq!(column.encoding, Encoding::Utf8);
        assert_eq!(column.type_name(), "LONG");
        assert!(column.flags.contains(ColumnFlags::NOT_NULL_FLAG));
        assert!(column.flags.contains(ColumnFlags::PRI_KEY_FLAG));
        assert!(column.flags.contains(ColumnFlags::AUTO_INCREMENT_FLAG));
        assert!(column.flags.contains(ColumnFlags::PART_KEY_FLAG));
        assert!(!column.is_unsigned());
    }

    #[test]
    fn test_binary_charset_resolves_binary_encoding() {
        let packet = build_column_packet([
            0x3f, 0x00, // charset = 63 (binary)
            0xFF, 0x00, 0x00, 0x00, // column_length = 255
            0xfc, // column_type = BLOB
            0x90, 0x00, // flags = BLOB | BINARY
            0x00, // decimals
            0x00, 0x00, // reserved
        ]);

        let column = Column::from_payload(&packet).unwrap();
        assert_eq!(column.encoding, Encoding::Binary);
        assert_eq!(column.column_type, ColumnType::MYSQL_TYPE_BLOB);
    }

    #[test]
    fn test_unknown_column_type_is_rejected() {
        let packet = build_column_packet([
            0x21, 0x00, //
            0xFF, 0x00, 0x00, 0x00, //
            0x50, // column_type = 0x50 (in the gap)
            0x00, 0x00, //
            0x00, //
            0x00, 0x00, //
        ]);
        assert!(Column::from_payload(&packet).is_err());
    }

    #[test]
    fn test_tail_too_short() {
        let bytes = ColumnDefinitionBytes(&[0; 8]);
        assert!(bytes.tail().is_err());
    }
}
