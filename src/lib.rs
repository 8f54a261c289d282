pub mod cell;
pub mod col;
pub mod constant;
pub mod error;
pub mod field;
pub mod options;
pub mod protocol;
pub mod rowparser;

pub use cell::{Cell, CivilDateTime, DateTimeValue};
pub use col::Column;
pub use error::{Error, Result};
pub use field::{FieldView, TypeCast};
pub use options::{NestTables, RowOptions};
pub use protocol::packet::{Packet, PacketBuf, PacketHeader};
pub use rowparser::{ParserCache, Protocol, Row, RowDecoder};

#[cfg(test)]
mod constant_test;
#[cfg(test)]
mod packet_test;
