use crate::constant::CommandByte;
use crate::protocol::packet::PacketBuf;

/// Write a COM_QUERY body: command byte then the SQL text, no terminator.
pub fn write_query(out: &mut PacketBuf, sql: &str) {
    out.write_int_1(CommandByte::Query as u8);
    out.write_string(sql);
}

/// Write a COM_STMT_PREPARE body: 0x16 then the query bytes under the
/// connection charset, no terminator.
pub fn write_prepare(out: &mut PacketBuf, sql: &str) {
    out.write_int_1(CommandByte::StmtPrepare as u8);
    out.write_string(sql);
}
