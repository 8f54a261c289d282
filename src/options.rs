/// Row-decoding options.
///
/// ```rs
/// let mut options = RowOptions::default();
/// options.date_strings = true;
/// options.nest_tables = NestTables::Separator("_".into());
/// ```
#[derive(Debug, Clone, Default)]
pub struct RowOptions {
    /// Emit rows as an ordered sequence instead of a name → value mapping
    pub rows_as_array: bool,

    /// Shape of the name → value mapping when `rows_as_array` is off
    pub nest_tables: NestTables,

    /// Return strings for 64-bit integers outside the exact-double range
    pub support_big_numbers: bool,

    /// Always return strings for 64-bit integers
    pub big_number_strings: bool,

    /// Return DATE/DATETIME/TIMESTAMP as strings rather than decoded values
    pub date_strings: bool,

    /// Return DECIMAL as a floating-point number
    pub decimal_numbers: bool,

    /// Apply the cast hook to binary-protocol rows as well (default: off)
    pub binary_cast: bool,
}

/// How row cells are keyed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum NestTables {
    /// Flat mapping keyed by column name
    #[default]
    Off,
    /// Mapping of table → { column → value }
    ByTable,
    /// Flat mapping keyed `table<sep>column`
    Separator(String),
}
