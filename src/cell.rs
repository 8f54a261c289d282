use std::borrow::Cow;
use std::fmt::Write as _;

use crate::protocol::geometry::Geometry;

/// A single decoded result-set cell.
///
/// Borrowed variants point into the row packet's buffer and are valid for as
/// long as the framer keeps that buffer alive.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell<'a> {
    Null,
    /// Signed integer (TINYINT, SMALLINT, INT, BIGINT)
    Int(i64),
    /// Unsigned integer (TINYINT UNSIGNED .. BIGINT UNSIGNED)
    UInt(u64),
    /// FLOAT, DOUBLE, DECIMAL under `decimal_numbers`
    Double(f64),
    /// 64-bit integer rendered as a decimal string by the big-number policy
    BigNumber(String),
    /// Raw bytes (BLOB, binary-charset strings)
    Bytes(&'a [u8]),
    /// Decoded text
    Text(Cow<'a, str>),
    /// DATE / DATETIME / TIMESTAMP
    DateTime(DateTimeValue),
    /// GEOMETRY (parsed WKB)
    Geometry(Geometry),
    /// JSON column
    Json(serde_json::Value),
}

impl<'a> Cell<'a> {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Render the cell the way it would print in a result grid.
    /// NULL renders to `None`.
    pub fn display(&self) -> Option<String> {
        match self {
            Cell::Null => None,
            Cell::Int(v) => Some(v.to_string()),
            Cell::UInt(v) => Some(v.to_string()),
            Cell::Double(v) => Some(v.to_string()),
            Cell::BigNumber(s) => Some(s.clone()),
            Cell::Bytes(b) => Some(String::from_utf8_lossy(b).into_owned()),
            Cell::Text(s) => Some(s.clone().into_owned()),
            Cell::DateTime(dt) => Some(dt.to_string()),
            Cell::Geometry(g) => Some(format!("{:?}", g)),
            Cell::Json(v) => Some(v.to_string()),
        }
    }
}

/// A DATE/DATETIME/TIMESTAMP value.
///
/// MySQL permits all-zero dates; those decode to `Invalid` rather than a
/// nonsensical instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateTimeValue {
    Invalid,
    Civil(CivilDateTime),
}

impl std::fmt::Display for DateTimeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateTimeValue::Invalid => f.write_str("0000-00-00"),
            DateTimeValue::Civil(c) => f.write_str(&c.format(6)),
        }
    }
}

/// Calendar date and wall-clock time, microsecond precision, no time zone.
/// The enclosing driver decides how to anchor it to an instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CivilDateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub micros: u32,
}

impl CivilDateTime {
    pub fn is_zero(&self) -> bool {
        self.year == 0
            && self.month == 0
            && self.day == 0
            && self.hour == 0
            && self.minute == 0
            && self.second == 0
            && self.micros == 0
    }

    /// `YYYY-MM-DD HH:MM:SS[.ffffff]` with the fraction truncated to
    /// `decimals` digits. Micros are zero-padded to six digits before the
    /// truncation.
    pub fn format(&self, decimals: u8) -> String {
        let mut out = String::with_capacity(26);
        let _ = write!(
            out,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        );
        if decimals > 0 {
            let frac = format!("{:06}", self.micros);
            let keep = (decimals as usize).min(6);
            let _ = write!(out, ".{}", &frac[..keep]);
        }
        out
    }
}
