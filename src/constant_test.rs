use crate::constant::{ColumnFlags, ColumnType, Encoding, server_error_name};

#[test]
fn test_column_type_round_trip() {
    for code in 0x00..=0xFF_u8 {
        if let Some(column_type) = ColumnType::from_u8(code) {
            assert_eq!(column_type as u8, code);
        }
    }
    // The gap between TYPED_ARRAY and JSON has no types.
    assert_eq!(ColumnType::from_u8(0x50), None);
    assert_eq!(ColumnType::from_u8(0xf4), None);
}

#[test]
fn test_column_type_names() {
    assert_eq!(ColumnType::MYSQL_TYPE_LONGLONG.name(), "LONGLONG");
    assert_eq!(ColumnType::MYSQL_TYPE_VAR_STRING.name(), "VAR_STRING");
    assert_eq!(ColumnType::MYSQL_TYPE_NEWDECIMAL.name(), "NEWDECIMAL");
}

#[test]
fn test_charset_to_encoding() {
    assert_eq!(Encoding::from_charset(63), Encoding::Binary);
    assert_eq!(Encoding::from_charset(33), Encoding::Utf8);
    assert_eq!(Encoding::from_charset(45), Encoding::Utf8);
    assert_eq!(Encoding::from_charset(255), Encoding::Utf8);
    assert_eq!(Encoding::from_charset(8), Encoding::Latin1);
    assert_eq!(Encoding::from_charset(11), Encoding::Ascii);
}

#[test]
fn test_encoding_decode() {
    assert_eq!(Encoding::Utf8.decode(b"hello"), "hello");
    assert_eq!(Encoding::Latin1.decode(&[0x63, 0x61, 0x66, 0xE9]), "caf\u{e9}");
    // Invalid UTF-8 falls back to a lossy copy instead of failing the cell.
    assert_eq!(Encoding::Utf8.decode(&[0xFF, 0x61]), "\u{fffd}a");
}

#[test]
fn test_server_error_names() {
    assert_eq!(server_error_name(1096), Some("ER_NO_TABLES_USED"));
    assert_eq!(server_error_name(1045), Some("ER_ACCESS_DENIED_ERROR"));
    assert_eq!(server_error_name(1213), Some("ER_LOCK_DEADLOCK"));
    assert_eq!(server_error_name(9999), None);
}

#[test]
fn test_column_flags_bits() {
    let flags = ColumnFlags::from_bits_truncate(0x4203);
    assert!(flags.contains(ColumnFlags::NOT_NULL_FLAG));
    assert!(flags.contains(ColumnFlags::PRI_KEY_FLAG));
    assert!(flags.contains(ColumnFlags::AUTO_INCREMENT_FLAG));
    assert!(flags.contains(ColumnFlags::PART_KEY_FLAG));
    assert!(!flags.contains(ColumnFlags::UNSIGNED_FLAG));
}
