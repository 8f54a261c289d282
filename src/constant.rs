use std::borrow::Cow;

/// MySQL command bytes
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandByte {
    Quit = 0x01,
    InitDb = 0x02,
    Query = 0x03,
    FieldList = 0x04,
    Ping = 0x0e,
    StmtPrepare = 0x16,
    StmtExecute = 0x17,
    StmtClose = 0x19,
    StmtReset = 0x1a,
    ResetConnection = 0x1f,
}

bitflags::bitflags! {
    /// Server status flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StatusFlags: u16 {
        const SERVER_STATUS_IN_TRANS = 0x0001;
        const SERVER_STATUS_AUTOCOMMIT = 0x0002;
        const SERVER_MORE_RESULTS_EXISTS = 0x0008;
        const SERVER_STATUS_NO_GOOD_INDEX_USED = 0x0010;
        const SERVER_STATUS_NO_INDEX_USED = 0x0020;
        const SERVER_STATUS_CURSOR_EXISTS = 0x0040;
        const SERVER_STATUS_LAST_ROW_SENT = 0x0080;
        const SERVER_STATUS_DB_DROPPED = 0x0100;
        const SERVER_STATUS_NO_BACKSLASH_ESCAPES = 0x0200;
        const SERVER_STATUS_METADATA_CHANGED = 0x0400;
        const SERVER_QUERY_WAS_SLOW = 0x0800;
        const SERVER_PS_OUT_PARAMS = 0x1000;
        const SERVER_STATUS_IN_TRANS_READONLY = 0x2000;
        const SERVER_SESSION_STATE_CHANGED = 0x4000;
    }
}

bitflags::bitflags! {
    /// Column definition flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ColumnFlags: u16 {
        const NOT_NULL_FLAG = 0x0001;
        const PRI_KEY_FLAG = 0x0002;
        const UNIQUE_KEY_FLAG = 0x0004;
        const MULTIPLE_KEY_FLAG = 0x0008;
        const BLOB_FLAG = 0x0010;
        const UNSIGNED_FLAG = 0x0020;
        const ZEROFILL_FLAG = 0x0040;
        const BINARY_FLAG = 0x0080;
        const ENUM_FLAG = 0x0100;
        const AUTO_INCREMENT_FLAG = 0x0200;
        const TIMESTAMP_FLAG = 0x0400;
        const SET_FLAG = 0x0800;
        const NO_DEFAULT_VALUE_FLAG = 0x1000;
        const ON_UPDATE_NOW_FLAG = 0x2000;
        const PART_KEY_FLAG = 0x4000;
        const NUM_FLAG = 0x8000;
    }
}

/// MySQL column types
#[allow(non_camel_case_types)]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    MYSQL_TYPE_DECIMAL = 0x00,
    MYSQL_TYPE_TINY = 0x01,
    MYSQL_TYPE_SHORT = 0x02,
    MYSQL_TYPE_LONG = 0x03,
    MYSQL_TYPE_FLOAT = 0x04,
    MYSQL_TYPE_DOUBLE = 0x05,
    MYSQL_TYPE_NULL = 0x06,
    MYSQL_TYPE_TIMESTAMP = 0x07,
    MYSQL_TYPE_LONGLONG = 0x08,
    MYSQL_TYPE_INT24 = 0x09,
    MYSQL_TYPE_DATE = 0x0a,
    MYSQL_TYPE_TIME = 0x0b,
    MYSQL_TYPE_DATETIME = 0x0c,
    MYSQL_TYPE_YEAR = 0x0d,
    MYSQL_TYPE_NEWDATE = 0x0e,
    MYSQL_TYPE_VARCHAR = 0x0f,
    MYSQL_TYPE_BIT = 0x10,
    MYSQL_TYPE_TIMESTAMP2 = 0x11,
    MYSQL_TYPE_DATETIME2 = 0x12,
    MYSQL_TYPE_TIME2 = 0x13,
    MYSQL_TYPE_TYPED_ARRAY = 0x14,
    MYSQL_TYPE_JSON = 0xf5,
    MYSQL_TYPE_NEWDECIMAL = 0xf6,
    MYSQL_TYPE_ENUM = 0xf7,
    MYSQL_TYPE_SET = 0xf8,
    MYSQL_TYPE_TINY_BLOB = 0xf9,
    MYSQL_TYPE_MEDIUM_BLOB = 0xfa,
    MYSQL_TYPE_LONG_BLOB = 0xfb,
    MYSQL_TYPE_BLOB = 0xfc,
    MYSQL_TYPE_VAR_STRING = 0xfd,
    MYSQL_TYPE_STRING = 0xfe,
    MYSQL_TYPE_GEOMETRY = 0xff,
}

impl ColumnType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::MYSQL_TYPE_DECIMAL),
            0x01 => Some(Self::MYSQL_TYPE_TINY),
            0x02 => Some(Self::MYSQL_TYPE_SHORT),
            0x03 => Some(Self::MYSQL_TYPE_LONG),
            0x04 => Some(Self::MYSQL_TYPE_FLOAT),
            0x05 => Some(Self::MYSQL_TYPE_DOUBLE),
            0x06 => Some(Self::MYSQL_TYPE_NULL),
            0x07 => Some(Self::MYSQL_TYPE_TIMESTAMP),
            0x08 => Some(Self::MYSQL_TYPE_LONGLONG),
            0x09 => Some(Self::MYSQL_TYPE_INT24),
            0x0a => Some(Self::MYSQL_TYPE_DATE),
            0x0b => Some(Self::MYSQL_TYPE_TIME),
            0x0c => Some(Self::MYSQL_TYPE_DATETIME),
            0x0d => Some(Self::MYSQL_TYPE_YEAR),
            0x0e => Some(Self::MYSQL_TYPE_NEWDATE),
            0x0f => Some(Self::MYSQL_TYPE_VARCHAR),
            0x10 => Some(Self::MYSQL_TYPE_BIT),
            0x11 => Some(Self::MYSQL_TYPE_TIMESTAMP2),
            0x12 => Some(Self::MYSQL_TYPE_DATETIME2),
            0x13 => Some(Self::MYSQL_TYPE_TIME2),
            0x14 => Some(Self::MYSQL_TYPE_TYPED_ARRAY),
            0xf5 => Some(Self::MYSQL_TYPE_JSON),
            0xf6 => Some(Self::MYSQL_TYPE_NEWDECIMAL),
            0xf7 => Some(Self::MYSQL_TYPE_ENUM),
            0xf8 => Some(Self::MYSQL_TYPE_SET),
            0xf9 => Some(Self::MYSQL_TYPE_TINY_BLOB),
            0xfa => Some(Self::MYSQL_TYPE_MEDIUM_BLOB),
            0xfb => Some(Self::MYSQL_TYPE_LONG_BLOB),
            0xfc => Some(Self::MYSQL_TYPE_BLOB),
            0xfd => Some(Self::MYSQL_TYPE_VAR_STRING),
            0xfe => Some(Self::MYSQL_TYPE_STRING),
            0xff => Some(Self::MYSQL_TYPE_GEOMETRY),
            _ => None,
        }
    }

    /// Legacy short name, as clients expose it on field descriptors.
    pub fn name(self) -> &'static str {
        match self {
            Self::MYSQL_TYPE_DECIMAL => "DECIMAL",
            Self::MYSQL_TYPE_TINY => "TINY",
            Self::MYSQL_TYPE_SHORT => "SHORT",
            Self::MYSQL_TYPE_LONG => "LONG",
            Self::MYSQL_TYPE_FLOAT => "FLOAT",
            Self::MYSQL_TYPE_DOUBLE => "DOUBLE",
            Self::MYSQL_TYPE_NULL => "NULL",
            Self::MYSQL_TYPE_TIMESTAMP => "TIMESTAMP",
            Self::MYSQL_TYPE_LONGLONG => "LONGLONG",
            Self::MYSQL_TYPE_INT24 => "INT24",
            Self::MYSQL_TYPE_DATE => "DATE",
            Self::MYSQL_TYPE_TIME => "TIME",
            Self::MYSQL_TYPE_DATETIME => "DATETIME",
            Self::MYSQL_TYPE_YEAR => "YEAR",
            Self::MYSQL_TYPE_NEWDATE => "NEWDATE",
            Self::MYSQL_TYPE_VARCHAR => "VARCHAR",
            Self::MYSQL_TYPE_BIT => "BIT",
            Self::MYSQL_TYPE_TIMESTAMP2 => "TIMESTAMP2",
            Self::MYSQL_TYPE_DATETIME2 => "DATETIME2",
            Self::MYSQL_TYPE_TIME2 => "TIME2",
            Self::MYSQL_TYPE_TYPED_ARRAY => "TYPED_ARRAY",
            Self::MYSQL_TYPE_JSON => "JSON",
            Self::MYSQL_TYPE_NEWDECIMAL => "NEWDECIMAL",
            Self::MYSQL_TYPE_ENUM => "ENUM",
            Self::MYSQL_TYPE_SET => "SET",
            Self::MYSQL_TYPE_TINY_BLOB => "TINY_BLOB",
            Self::MYSQL_TYPE_MEDIUM_BLOB => "MEDIUM_BLOB",
            Self::MYSQL_TYPE_LONG_BLOB => "LONG_BLOB",
            Self::MYSQL_TYPE_BLOB => "BLOB",
            Self::MYSQL_TYPE_VAR_STRING => "VAR_STRING",
            Self::MYSQL_TYPE_STRING => "STRING",
            Self::MYSQL_TYPE_GEOMETRY => "GEOMETRY",
        }
    }
}

/// MySQL binary charset number - indicates binary/non-text data
pub const BINARY_CHARSET: u16 = 63;

pub const UTF8_GENERAL_CI: u16 = 33;
pub const UTF8MB4_GENERAL_CI: u16 = 45;

/// Character encoding resolved from a column's charset number.
///
/// The collation id in a column definition is purely informational except for
/// `binary` (63): as long as `character_set_results` is set the server
/// transcodes, so every non-binary collation arrives in the connection
/// charset. We only distinguish the handful of single-byte families we can
/// decode without a conversion table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    Binary,
    Ascii,
    Latin1,
    Utf8,
}

impl Encoding {
    pub fn from_charset(charset: u16) -> Self {
        match charset {
            63 => Self::Binary,
            11 | 65 => Self::Ascii,
            5 | 8 | 47 | 48 => Self::Latin1,
            _ => Self::Utf8,
        }
    }

    /// Decode bytes under this encoding.
    ///
    /// UTF-8 payloads borrow when valid; invalid sequences fall back to a
    /// lossy copy. Latin-1 maps bytes to the first Unicode block.
    pub fn decode(self, bytes: &[u8]) -> Cow<'_, str> {
        match self {
            Self::Utf8 | Self::Ascii | Self::Binary => {
                match simdutf8::basic::from_utf8(bytes) {
                    Ok(s) => Cow::Borrowed(s),
                    Err(_) => String::from_utf8_lossy(bytes),
                }
            }
            Self::Latin1 => Cow::Owned(bytes.iter().map(|&b| b as char).collect()),
        }
    }
}

/// Resolve a server error number to its symbolic `ER_*` name.
///
/// Covers the codes a client sees in practice; callers fall back to the
/// numeric code for anything unlisted.
pub fn server_error_name(errno: u16) -> Option<&'static str> {
    let name = match errno {
        1040 => "ER_CON_COUNT_ERROR",
        1044 => "ER_DBACCESS_DENIED_ERROR",
        1045 => "ER_ACCESS_DENIED_ERROR",
        1046 => "ER_NO_DB_ERROR",
        1048 => "ER_BAD_NULL_ERROR",
        1049 => "ER_BAD_DB_ERROR",
        1050 => "ER_TABLE_EXISTS_ERROR",
        1051 => "ER_BAD_TABLE_ERROR",
        1054 => "ER_BAD_FIELD_ERROR",
        1062 => "ER_DUP_ENTRY",
        1064 => "ER_PARSE_ERROR",
        1065 => "ER_EMPTY_QUERY",
        1094 => "ER_NO_SUCH_THREAD",
        1095 => "ER_KILL_DENIED_ERROR",
        1096 => "ER_NO_TABLES_USED",
        1103 => "ER_WRONG_TABLE_NAME",
        1104 => "ER_TOO_BIG_SELECT",
        1105 => "ER_UNKNOWN_ERROR",
        1106 => "ER_UNKNOWN_PROCEDURE",
        1113 => "ER_TABLE_MUST_HAVE_COLUMNS",
        1114 => "ER_RECORD_FILE_FULL",
        1118 => "ER_TOO_BIG_ROWSIZE",
        1130 => "ER_HOST_NOT_PRIVILEGED",
        1136 => "ER_WRONG_VALUE_COUNT_ON_ROW",
        1142 => "ER_TABLEACCESS_DENIED_ERROR",
        1143 => "ER_COLUMNACCESS_DENIED_ERROR",
        1146 => "ER_NO_SUCH_TABLE",
        1149 => "ER_SYNTAX_ERROR",
        1152 => "ER_ABORTING_CONNECTION",
        1153 => "ER_NET_PACKET_TOO_LARGE",
        1156 => "ER_NET_PACKETS_OUT_OF_ORDER",
        1158 => "ER_NET_READ_ERROR",
        1159 => "ER_NET_READ_INTERRUPTED",
        1160 => "ER_NET_ERROR_ON_WRITE",
        1161 => "ER_NET_WRITE_INTERRUPTED",
        1169 => "ER_DUP_UNIQUE",
        1171 => "ER_PRIMARY_CANT_HAVE_NULL",
        1172 => "ER_TOO_MANY_ROWS",
        1205 => "ER_LOCK_WAIT_TIMEOUT",
        1213 => "ER_LOCK_DEADLOCK",
        1216 => "ER_NO_REFERENCED_ROW",
        1217 => "ER_ROW_IS_REFERENCED",
        1227 => "ER_SPECIFIC_ACCESS_DENIED_ERROR",
        1243 => "ER_UNKNOWN_STMT_HANDLER",
        1264 => "ER_WARN_DATA_OUT_OF_RANGE",
        1265 => "WARN_DATA_TRUNCATED",
        1292 => "ER_TRUNCATED_WRONG_VALUE",
        1305 => "ER_SP_DOES_NOT_EXIST",
        1317 => "ER_QUERY_INTERRUPTED",
        1364 => "ER_NO_DEFAULT_FOR_FIELD",
        1366 => "ER_TRUNCATED_WRONG_VALUE_FOR_FIELD",
        1406 => "ER_DATA_TOO_LONG",
        1451 => "ER_ROW_IS_REFERENCED_2",
        1452 => "ER_NO_REFERENCED_ROW_2",
        1461 => "ER_MAX_PREPARED_STMT_COUNT_REACHED",
        1615 => "ER_NEED_REPREPARE",
        1698 => "ER_ACCESS_DENIED_NO_PASSWORD_ERROR",
        1792 => "ER_CANT_EXECUTE_IN_READ_ONLY_TRANSACTION",
        1820 => "ER_MUST_CHANGE_PASSWORD_LOGIN",
        3024 => "ER_QUERY_TIMEOUT",
        3572 => "ER_LOCK_NOWAIT",
        _ => return None,
    };
    Some(name)
}
