//! Row-parser compilation for the text and binary result protocols.
//!
//! Compilation resolves the per-column dispatch (type, signedness, encoding,
//! options) into a plan once per result-set shape; decoding then walks the
//! plans against a packet cursor. Compiled decoders are pure over their
//! arguments and memoized process-wide by fingerprint.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use crate::cell::Cell;
use crate::col::Column;
use crate::constant::{ColumnType, Encoding};
use crate::error::{Error, Result};
use crate::field::{FieldView, TypeCast};
use crate::options::{NestTables, RowOptions};
use crate::protocol::geometry::parse_geometry;
use crate::protocol::packet::Packet;
use crate::protocol::primitive::*;
use crate::protocol::temporal;

/// Result protocol a row was produced by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Text,
    Binary,
}

/// One decoded row.
#[derive(Debug, Clone, PartialEq)]
pub enum Row<'a> {
    /// `rows_as_array`: cells in column order
    Array(Vec<Cell<'a>>),
    /// name → value, in column order
    Map(Vec<(String, Cell<'a>)>),
    /// `nest_tables = ByTable`: table → { column → value }
    Nested(Vec<(String, Vec<(String, Cell<'a>)>)>),
}

impl<'a> Row<'a> {
    /// Look up a cell by key in a flat row.
    pub fn get(&self, key: &str) -> Option<&Cell<'a>> {
        match self {
            Row::Map(pairs) => pairs.iter().find(|(k, _)| k == key).map(|(_, c)| c),
            _ => None,
        }
    }
}

/// How a 64-bit integer cell is represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum BigIntPolicy {
    /// Native 64-bit integers
    Exact,
    /// Decimal string outside the exact-double range
    StringIfBig,
    /// Always a decimal string
    AlwaysString,
}

impl BigIntPolicy {
    fn from_options(options: &RowOptions) -> Self {
        // big_number_strings only takes effect alongside support_big_numbers.
        if options.support_big_numbers && options.big_number_strings {
            Self::AlwaysString
        } else if options.support_big_numbers {
            Self::StringIfBig
        } else {
            Self::Exact
        }
    }

    fn apply_signed(self, v: i64) -> Cell<'static> {
        match self {
            Self::Exact => Cell::Int(v),
            Self::StringIfBig if v.unsigned_abs() <= MAX_EXACT_DOUBLE => Cell::Int(v),
            _ => Cell::BigNumber(v.to_string()),
        }
    }

    fn apply_unsigned(self, v: u64) -> Cell<'static> {
        match self {
            Self::Exact => Cell::UInt(v),
            Self::StringIfBig if v <= MAX_EXACT_DOUBLE => Cell::UInt(v),
            _ => Cell::BigNumber(v.to_string()),
        }
    }
}

/// Per-column decode plan for text-protocol cells. Every cell arrives as a
/// length-coded byte run; the plan says what its bytes mean.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TextPlan {
    IntSmall,
    IntGuarded,
    IntString,
    Float,
    DecimalNumeric,
    DecimalString,
    Date,
    DateString,
    TimeString,
    Geometry,
    Json,
    Null,
    Plain(Encoding),
}

impl TextPlan {
    fn compile(column_type: ColumnType, encoding: Encoding, options: &RowOptions) -> Self {
        use ColumnType::*;
        match column_type {
            MYSQL_TYPE_TINY | MYSQL_TYPE_SHORT | MYSQL_TYPE_LONG | MYSQL_TYPE_INT24
            | MYSQL_TYPE_YEAR => Self::IntSmall,
            MYSQL_TYPE_LONGLONG => match BigIntPolicy::from_options(options) {
                BigIntPolicy::Exact => Self::IntSmall,
                BigIntPolicy::StringIfBig => Self::IntGuarded,
                BigIntPolicy::AlwaysString => Self::IntString,
            },
            MYSQL_TYPE_FLOAT | MYSQL_TYPE_DOUBLE => Self::Float,
            MYSQL_TYPE_DECIMAL | MYSQL_TYPE_NEWDECIMAL => {
                if options.decimal_numbers {
                    Self::DecimalNumeric
                } else {
                    Self::DecimalString
                }
            }
            MYSQL_TYPE_DATE | MYSQL_TYPE_NEWDATE | MYSQL_TYPE_DATETIME | MYSQL_TYPE_TIMESTAMP
            | MYSQL_TYPE_DATETIME2 | MYSQL_TYPE_TIMESTAMP2 => {
                if options.date_strings {
                    Self::DateString
                } else {
                    Self::Date
                }
            }
            MYSQL_TYPE_TIME | MYSQL_TYPE_TIME2 => Self::TimeString,
            MYSQL_TYPE_GEOMETRY => Self::Geometry,
            MYSQL_TYPE_JSON => Self::Json,
            MYSQL_TYPE_NULL => Self::Null,
            _ => Self::Plain(encoding),
        }
    }

    fn decode<'buf>(&self, bytes: &'buf [u8]) -> Result<Cell<'buf>> {
        Ok(match self {
            Self::IntSmall => parse_int_ascii_small(bytes),
            Self::IntGuarded => parse_int_ascii(bytes),
            Self::IntString | Self::DecimalString | Self::DateString | Self::TimeString => {
                Cell::Text(Encoding::Ascii.decode(bytes))
            }
            Self::Float | Self::DecimalNumeric => Cell::Double(parse_float_ascii(bytes)),
            Self::Date => Cell::DateTime(temporal::parse_date_ascii(bytes)),
            Self::Geometry => match parse_geometry(bytes) {
                Some(g) => Cell::Geometry(g),
                None => Cell::Null,
            },
            Self::Json => match serde_json::from_slice(bytes) {
                Ok(v) => Cell::Json(v),
                Err(_) => Cell::Text(Encoding::Utf8.decode(bytes)),
            },
            Self::Null => Cell::Null,
            Self::Plain(Encoding::Binary) => Cell::Bytes(bytes),
            Self::Plain(encoding) => Cell::Text(encoding.decode(bytes)),
        })
    }

    fn encoding(&self) -> Encoding {
        match self {
            Self::IntSmall
            | Self::IntGuarded
            | Self::IntString
            | Self::Float
            | Self::DecimalNumeric
            | Self::DecimalString
            | Self::Date
            | Self::DateString
            | Self::TimeString => Encoding::Ascii,
            Self::Json => Encoding::Utf8,
            Self::Geometry | Self::Null => Encoding::Binary,
            Self::Plain(encoding) => *encoding,
        }
    }
}

/// Per-column decode plan for binary-protocol cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BinaryPlan {
    Tiny { unsigned: bool },
    Short { unsigned: bool },
    Long { unsigned: bool },
    LongLong { unsigned: bool, policy: BigIntPolicy },
    Float,
    Double,
    DateTime,
    DateTimeString { decimals: u8 },
    Time,
    DecimalNumeric,
    DecimalString,
    Geometry,
    Json,
    Null,
    Plain(Encoding),
}

impl BinaryPlan {
    fn compile(
        column_type: ColumnType,
        unsigned: bool,
        encoding: Encoding,
        decimals: u8,
        options: &RowOptions,
    ) -> Self {
        use ColumnType::*;
        match column_type {
            MYSQL_TYPE_TINY => Self::Tiny { unsigned },
            MYSQL_TYPE_SHORT | MYSQL_TYPE_YEAR => Self::Short { unsigned },
            MYSQL_TYPE_LONG | MYSQL_TYPE_INT24 => Self::Long { unsigned },
            MYSQL_TYPE_LONGLONG => Self::LongLong {
                unsigned,
                policy: BigIntPolicy::from_options(options),
            },
            MYSQL_TYPE_FLOAT => Self::Float,
            MYSQL_TYPE_DOUBLE => Self::Double,
            MYSQL_TYPE_DATE | MYSQL_TYPE_NEWDATE | MYSQL_TYPE_DATETIME | MYSQL_TYPE_TIMESTAMP
            | MYSQL_TYPE_DATETIME2 | MYSQL_TYPE_TIMESTAMP2 => {
                if options.date_strings {
                    Self::DateTimeString { decimals }
                } else {
                    Self::DateTime
                }
            }
            MYSQL_TYPE_TIME | MYSQL_TYPE_TIME2 => Self::Time,
            MYSQL_TYPE_DECIMAL | MYSQL_TYPE_NEWDECIMAL => {
                if options.decimal_numbers {
                    Self::DecimalNumeric
                } else {
                    Self::DecimalString
                }
            }
            MYSQL_TYPE_GEOMETRY => Self::Geometry,
            MYSQL_TYPE_JSON => Self::Json,
            MYSQL_TYPE_NULL => Self::Null,
            _ => Self::Plain(encoding),
        }
    }

    /// Wire width of a fixed-size cell; `None` means the cell is a
    /// length-coded byte run.
    fn fixed_width(&self) -> Option<usize> {
        match self {
            Self::Tiny { .. } => Some(1),
            Self::Short { .. } => Some(2),
            Self::Long { .. } | Self::Float => Some(4),
            Self::LongLong { .. } | Self::Double => Some(8),
            Self::Null => Some(0),
            _ => None,
        }
    }

    fn decode<'buf>(&self, bytes: &'buf [u8]) -> Result<Cell<'buf>> {
        Ok(match self {
            Self::Tiny { unsigned } => {
                let (v, _) = read_int_1(bytes)?;
                if *unsigned {
                    Cell::UInt(v as u64)
                } else {
                    Cell::Int(v as i8 as i64)
                }
            }
            Self::Short { unsigned } => {
                let (v, _) = read_int_2(bytes)?;
                if *unsigned {
                    Cell::UInt(v as u64)
                } else {
                    Cell::Int(v as i16 as i64)
                }
            }
            Self::Long { unsigned } => {
                let (v, _) = read_int_4(bytes)?;
                if *unsigned {
                    Cell::UInt(v as u64)
                } else {
                    Cell::Int(v as i32 as i64)
                }
            }
            Self::LongLong { unsigned, policy } => {
                let (v, _) = read_int_8(bytes)?;
                if *unsigned {
                    policy.apply_unsigned(v)
                } else {
                    policy.apply_signed(v as i64)
                }
            }
            Self::Float => {
                let (v, _) = read_float_4(bytes)?;
                Cell::Double(v as f64)
            }
            Self::Double => {
                let (v, _) = read_float_8(bytes)?;
                Cell::Double(v)
            }
            Self::DateTime => Cell::DateTime(temporal::decode_datetime(bytes)?),
            Self::DateTimeString { decimals } => {
                Cell::Text(temporal::decode_datetime_string(bytes, *decimals)?.into())
            }
            Self::Time => Cell::Text(temporal::decode_time_string(bytes)?.into()),
            Self::DecimalNumeric => Cell::Double(parse_float_ascii(bytes)),
            Self::DecimalString => Cell::Text(Encoding::Ascii.decode(bytes)),
            Self::Geometry => match parse_geometry(bytes) {
                Some(g) => Cell::Geometry(g),
                None => Cell::Null,
            },
            Self::Json => match serde_json::from_slice(bytes) {
                Ok(v) => Cell::Json(v),
                Err(_) => Cell::Text(Encoding::Utf8.decode(bytes)),
            },
            Self::Null => Cell::Null,
            Self::Plain(Encoding::Binary) => Cell::Bytes(bytes),
            Self::Plain(encoding) => Cell::Text(encoding.decode(bytes)),
        })
    }

    fn encoding(&self) -> Encoding {
        match self {
            Self::DecimalNumeric | Self::DecimalString => Encoding::Ascii,
            Self::Json => Encoding::Utf8,
            Self::Plain(encoding) => *encoding,
            _ => Encoding::Binary,
        }
    }
}

/// Borrowed handle on one column's plan, handed to the cast adapter.
#[derive(Debug, Clone, Copy)]
pub(crate) enum PlanRef<'a> {
    Text(&'a TextPlan),
    Binary(&'a BinaryPlan),
}

impl PlanRef<'_> {
    pub(crate) fn decode<'buf>(&self, bytes: &'buf [u8]) -> Result<Cell<'buf>> {
        match self {
            Self::Text(plan) => plan.decode(bytes),
            Self::Binary(plan) => plan.decode(bytes),
        }
    }

    pub(crate) fn encoding(&self) -> Encoding {
        match self {
            Self::Text(plan) => plan.encoding(),
            Self::Binary(plan) => plan.encoding(),
        }
    }
}

/// NULL bitmap of a binary result-set row; the first two bits are reserved,
/// so column 0's null bit is bit 2 of byte 0.
#[derive(Debug, Clone, Copy)]
pub struct NullBitmap<'a> {
    bitmap: &'a [u8],
}

impl<'a> NullBitmap<'a> {
    pub fn for_result_set(bitmap: &'a [u8]) -> Self {
        Self { bitmap }
    }

    pub fn is_null(&self, idx: usize) -> bool {
        let bit_pos = idx + 2;
        let byte_pos = bit_pos >> 3;
        let bit_offset = bit_pos & 7;

        if byte_pos >= self.bitmap.len() {
            return false;
        }

        (self.bitmap[byte_pos] & (1 << bit_offset)) != 0
    }
}

#[derive(Debug)]
enum Plans {
    Text(Vec<TextPlan>),
    Binary(Vec<BinaryPlan>),
}

/// A compiled row decoder for one `(protocol, column-shape, options)` tuple.
///
/// Decoding is pure over its arguments; nothing per-connection is captured,
/// so a decoder can be shared freely once compiled.
#[derive(Debug)]
pub struct RowDecoder {
    plans: Plans,
    cast_binary_rows: bool,
}

impl RowDecoder {
    pub fn compile(protocol: Protocol, columns: &[Column], options: &RowOptions) -> Self {
        let plans = match protocol {
            Protocol::Text => Plans::Text(
                columns
                    .iter()
                    .map(|c| TextPlan::compile(c.column_type, c.encoding, options))
                    .collect(),
            ),
            Protocol::Binary => Plans::Binary(
                columns
                    .iter()
                    .map(|c| {
                        BinaryPlan::compile(
                            c.column_type,
                            c.is_unsigned(),
                            c.encoding,
                            c.decimals,
                            options,
                        )
                    })
                    .collect(),
            ),
        };
        Self {
            plans,
            cast_binary_rows: options.binary_cast,
        }
    }

    pub fn protocol(&self) -> Protocol {
        match self.plans {
            Plans::Text(_) => Protocol::Text,
            Plans::Binary(_) => Protocol::Binary,
        }
    }

    /// Decode one row packet. `columns` must be the definitions this decoder
    /// was compiled against (same shape); names and tables are read from
    /// them at decode time.
    pub fn decode<'buf>(
        &self,
        packet: &mut Packet<'buf>,
        columns: &[Column],
        options: &RowOptions,
        cast: Option<&dyn TypeCast>,
    ) -> Result<Row<'buf>> {
        let cells = match &self.plans {
            Plans::Text(plans) => {
                debug_assert_eq!(plans.len(), columns.len());
                let mut cells = Vec::with_capacity(plans.len());
                for (column, plan) in columns.iter().zip(plans) {
                    let payload = packet.read_lenenc_buffer()?;
                    cells.push(Self::cell(column, payload, PlanRef::Text(plan), cast)?);
                }
                cells
            }
            Plans::Binary(plans) => {
                debug_assert_eq!(plans.len(), columns.len());
                let status = packet.read_int_1()?;
                if status != 0x00 {
                    return Err(Error::MalformedFrame("bad binary row status byte"));
                }
                let bitmap_len = (columns.len() + 7 + 2) >> 3;
                let bitmap = NullBitmap::for_result_set(packet.read_bytes(bitmap_len)?);

                let cast = if self.cast_binary_rows { cast } else { None };
                let mut cells = Vec::with_capacity(plans.len());
                for (idx, (column, plan)) in columns.iter().zip(plans).enumerate() {
                    let payload = if bitmap.is_null(idx) {
                        None
                    } else {
                        match plan.fixed_width() {
                            Some(width) => Some(packet.read_bytes(width)?),
                            None => packet.read_lenenc_buffer()?,
                        }
                    };
                    cells.push(Self::cell(column, payload, PlanRef::Binary(plan), cast)?);
                }
                cells
            }
        };

        Ok(assemble(cells, columns, options))
    }

    fn cell<'buf>(
        column: &Column,
        payload: Option<&'buf [u8]>,
        plan: PlanRef<'_>,
        cast: Option<&dyn TypeCast>,
    ) -> Result<Cell<'buf>> {
        let field = FieldView {
            column,
            payload,
            plan,
        };
        match cast {
            Some(cast) => cast.cast(&field),
            None => field.default_read(),
        }
    }
}

fn assemble<'buf>(cells: Vec<Cell<'buf>>, columns: &[Column], options: &RowOptions) -> Row<'buf> {
    if options.rows_as_array {
        return Row::Array(cells);
    }

    match &options.nest_tables {
        NestTables::Off => Row::Map(
            columns
                .iter()
                .zip(cells)
                .map(|(column, cell)| (column.name.clone(), cell))
                .collect(),
        ),
        NestTables::Separator(sep) => Row::Map(
            columns
                .iter()
                .zip(cells)
                .map(|(column, cell)| (format!("{}{}{}", column.table, sep, column.name), cell))
                .collect(),
        ),
        NestTables::ByTable => {
            let mut tables: Vec<(String, Vec<(String, Cell<'buf>)>)> = Vec::new();
            for (column, cell) in columns.iter().zip(cells) {
                let entry = (column.name.clone(), cell);
                match tables.iter_mut().find(|(table, _)| *table == column.table) {
                    Some((_, fields)) => fields.push(entry),
                    None => tables.push((column.table.clone(), vec![entry])),
                }
            }
            Row::Nested(tables)
        }
    }
}

// ============================================================================
// Parser cache
// ============================================================================

/// Fingerprint of a compiled decoder: protocol, the ordered column shapes,
/// and the option subset that influences dispatch. Output-shape options
/// (`rows_as_array`, `nest_tables`) are applied at decode time and do not
/// fork compilations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParserKey {
    protocol: Protocol,
    columns: Vec<ColumnShape>,
    options: DispatchOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ColumnShape {
    type_code: u8,
    unsigned: bool,
    encoding: Encoding,
    decimals: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct DispatchOptions {
    support_big_numbers: bool,
    big_number_strings: bool,
    date_strings: bool,
    decimal_numbers: bool,
    binary_cast: bool,
}

impl ParserKey {
    pub fn new(protocol: Protocol, columns: &[Column], options: &RowOptions) -> Self {
        Self {
            protocol,
            columns: columns
                .iter()
                .map(|c| ColumnShape {
                    type_code: c.column_type as u8,
                    unsigned: c.is_unsigned(),
                    encoding: c.encoding,
                    decimals: c.decimals,
                })
                .collect(),
            options: DispatchOptions {
                support_big_numbers: options.support_big_numbers,
                big_number_strings: options.big_number_strings,
                date_strings: options.date_strings,
                decimal_numbers: options.decimal_numbers,
                binary_cast: options.binary_cast,
            },
        }
    }
}

/// Process-wide decoder cache, single-writer under the enclosing driver's
/// cooperative scheduling.
#[derive(Debug, Default)]
pub struct ParserCache {
    decoders: HashMap<ParserKey, Arc<RowDecoder>>,
}

impl ParserCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    /// Fetch the decoder for this shape, compiling it on first sight.
    pub fn get_or_compile(
        &mut self,
        protocol: Protocol,
        columns: &[Column],
        options: &RowOptions,
    ) -> Arc<RowDecoder> {
        let key = ParserKey::new(protocol, columns, options);
        if let Some(decoder) = self.decoders.get(&key) {
            return Arc::clone(decoder);
        }
        trace!(?protocol, columns = columns.len(), "compiling row decoder");
        let decoder = Arc::new(RowDecoder::compile(protocol, columns, options));
        self.decoders.insert(key, Arc::clone(&decoder));
        decoder
    }
}
