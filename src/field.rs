use crate::cell::Cell;
use crate::col::Column;
use crate::constant::{ColumnFlags, ColumnType, Encoding};
use crate::error::Result;
use crate::protocol::geometry::{Geometry, parse_geometry};
use crate::rowparser::PlanRef;

/// Per-cell cast hook.
///
/// When installed, every cell of a text-protocol row (and of binary rows
/// under `binary_cast`) is routed through `cast` instead of the default
/// decoder. Implementations inspect the field metadata and either produce
/// their own cell or delegate to `field.default_read()`.
pub trait TypeCast {
    fn cast<'buf>(&self, field: &FieldView<'buf, '_>) -> Result<Cell<'buf>>;
}

/// The stable field surface handed to a cast hook: column metadata plus the
/// raw cell bytes and the resolved default decoder.
#[derive(Debug, Clone, Copy)]
pub struct FieldView<'buf, 'col> {
    pub(crate) column: &'col Column,
    pub(crate) payload: Option<&'buf [u8]>,
    pub(crate) plan: PlanRef<'col>,
}

impl<'buf> FieldView<'buf, '_> {
    pub fn db(&self) -> &str {
        &self.column.schema
    }

    /// Alias of `db` kept for callers that use the protocol's field name.
    pub fn schema(&self) -> &str {
        &self.column.schema
    }

    pub fn table(&self) -> &str {
        &self.column.table
    }

    pub fn org_table(&self) -> &str {
        &self.column.org_table
    }

    pub fn name(&self) -> &str {
        &self.column.name
    }

    pub fn org_name(&self) -> &str {
        &self.column.org_name
    }

    pub fn column_type(&self) -> ColumnType {
        self.column.column_type
    }

    /// Legacy short type name (`"LONG"`, `"VAR_STRING"`, ..).
    pub fn type_name(&self) -> &'static str {
        self.column.type_name()
    }

    pub fn column_length(&self) -> u32 {
        self.column.column_length
    }

    /// Legacy alias of `column_length`.
    pub fn length(&self) -> u32 {
        self.column.column_length
    }

    pub fn character_set(&self) -> u16 {
        self.column.character_set
    }

    pub fn flags(&self) -> ColumnFlags {
        self.column.flags
    }

    pub fn decimals(&self) -> u8 {
        self.column.decimals
    }

    /// Encoding the default decoder reads this cell under, or `None` for a
    /// NULL cell.
    pub fn encoding(&self) -> Option<Encoding> {
        self.payload.map(|_| self.plan.encoding())
    }

    /// Raw cell bytes; `None` for NULL.
    pub fn buffer(&self) -> Option<&'buf [u8]> {
        self.payload
    }

    /// The cell rendered as text, the way the default decode would print it;
    /// NULL renders to `None`.
    pub fn string(&self) -> Result<Option<String>> {
        Ok(self.default_read()?.display())
    }

    /// The cell parsed as WKB geometry; `None` for NULL or undecodable
    /// bytes.
    pub fn geometry(&self) -> Option<Geometry> {
        self.payload.and_then(parse_geometry)
    }

    /// Run the default per-type decoder for this cell.
    pub fn default_read(&self) -> Result<Cell<'buf>> {
        match self.payload {
            None => Ok(Cell::Null),
            Some(bytes) => self.plan.decode(bytes),
        }
    }
}
