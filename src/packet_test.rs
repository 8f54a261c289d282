use crate::cell::{CivilDateTime, DateTimeValue};
use crate::constant::Encoding;
use crate::protocol::command::{write_prepare, write_query};
use crate::protocol::packet::{Packet, PacketBuf, PacketHeader};
use crate::protocol::primitive::LenencValue;

/// Helper to frame a payload the way the framer hands packets to the codec.
fn frame(sequence_id: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = (payload.len() as u32).to_le_bytes()[..3].to_vec();
    out.push(sequence_id);
    out.extend_from_slice(payload);
    out
}

#[test]
fn test_cursor_starts_after_header() {
    let buffer = frame(2, &[0xAA, 0xBB]);
    let mut packet = Packet::new(2, &buffer);
    assert_eq!(packet.sequence_id(), 2);
    assert_eq!(packet.offset(), 4);
    assert_eq!(packet.len(), 6);
    assert!(packet.have_more_data());

    assert_eq!(packet.read_int_1().unwrap(), 0xAA);
    assert_eq!(packet.read_int_1().unwrap(), 0xBB);
    assert!(!packet.have_more_data());
    assert!(packet.read_int_1().is_err());

    packet.reset();
    assert_eq!(packet.offset(), 4);
    assert_eq!(packet.read_int_2().unwrap(), 0xBBAA);
}

#[test]
fn test_spanning_packet_counts_frames() {
    let buffer = frame(0, &[0x01]);
    let packet = Packet::new(0, &buffer);
    assert_eq!(packet.num_packets(), 1);
    let packet = Packet::spanning(0, &buffer, 3);
    assert_eq!(packet.num_packets(), 3);
    assert_eq!(packet.offset(), 4);
}

#[test]
fn test_offset_stays_inside_window() {
    let buffer = frame(0, &[1, 2, 3, 4, 5, 6, 7, 8]);
    let mut packet = Packet::new(0, &buffer);
    let _ = packet.read_int_4();
    assert!(packet.offset() <= packet.len());
    let _ = packet.read_int_8(); // fails, must not move past the end
    assert!(packet.offset() <= packet.len());
    let _ = packet.read_int_4();
    assert_eq!(packet.offset(), packet.len());
}

#[test]
fn test_lenenc_number_reader() {
    let buffer = frame(0, &[0x05]);
    let mut packet = Packet::new(0, &buffer);
    assert_eq!(
        packet.read_lenenc_number(false, false).unwrap(),
        LenencValue::UInt(5)
    );

    let buffer = frame(0, &[0xFB]);
    let mut packet = Packet::new(0, &buffer);
    assert_eq!(
        packet.read_lenenc_number(false, false).unwrap(),
        LenencValue::Null
    );
}

#[test]
fn test_lenenc_string_reader() {
    let mut payload = vec![0x05];
    payload.extend_from_slice(b"hello");
    payload.push(0xFB);
    let buffer = frame(0, &payload);
    let mut packet = Packet::new(0, &buffer);
    assert_eq!(
        packet.read_lenenc_string(Encoding::Utf8).unwrap().as_deref(),
        Some("hello")
    );
    assert_eq!(packet.read_lenenc_string(Encoding::Utf8).unwrap(), None);
}

#[test]
fn test_null_terminated_string_reader() {
    let buffer = frame(0, b"abc\0rest");
    let mut packet = Packet::new(0, &buffer);
    assert_eq!(packet.read_string_null(Encoding::Utf8).unwrap(), "abc");
    assert_eq!(packet.read_bytes(4).unwrap(), b"rest");
}

#[test]
fn test_read_binary_datetime() {
    // 2020-01-02 03:04:05.001 (1,000,000 us / 1000 = 1000 ms)
    let payload = [
        0x0B, 0xE4, 0x07, 0x01, 0x02, 0x03, 0x04, 0x05, 0x40, 0x42, 0x0F, 0x00,
    ];
    let buffer = frame(1, &payload);
    let mut packet = Packet::new(1, &buffer);
    assert_eq!(
        packet.read_datetime().unwrap(),
        DateTimeValue::Civil(CivilDateTime {
            year: 2020,
            month: 1,
            day: 2,
            hour: 3,
            minute: 4,
            second: 5,
            micros: 1_000_000,
        })
    );
    assert!(!packet.have_more_data());
}

#[test]
fn test_markers() {
    let eof = frame(0, &[0xFE, 0x00, 0x00, 0x02, 0x00]);
    let packet = Packet::new(0, &eof);
    assert!(packet.is_eof());
    assert!(packet.is_auth_switch());
    assert_eq!(packet.packet_type(), "EOF");

    // A 0xFE marker on a long frame is not EOF (AuthSwitch shares the tag).
    let long = frame(0, &[0xFE; 20]);
    let packet = Packet::new(0, &long);
    assert!(!packet.is_eof());
    assert!(packet.is_auth_switch());
    assert_eq!(packet.packet_type(), "");

    let err = frame(0, &[0xFF, 0x48, 0x04]);
    let packet = Packet::new(0, &err);
    assert!(packet.is_error());
    assert_eq!(packet.packet_type(), "Error");

    let ok = frame(0, &[0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00]);
    let packet = Packet::new(0, &ok);
    assert_eq!(packet.packet_type(), "maybeOK");
}

#[test]
fn test_into_error_with_sql_state() {
    let payload = [
        0xFF, 0x48, 0x04, b'#', b'2', b'8', b'0', b'0', b'0', b'B', b'a', b'd',
    ];
    let buffer = frame(1, &payload);
    let packet = Packet::new(1, &buffer);
    let err = packet.into_error(Encoding::Utf8).unwrap();
    assert_eq!(err.errno, 1096);
    assert_eq!(err.code, "ER_NO_TABLES_USED");
    assert_eq!(err.sql_state.as_deref(), Some("28000"));
    assert_eq!(err.message, "Bad");
}

#[test]
fn test_into_error_without_sql_state() {
    let buffer = frame(1, b"\xff\x10\x04Too many connections");
    let packet = Packet::new(1, &buffer);
    let err = packet.into_error(Encoding::Utf8).unwrap();
    assert_eq!(err.errno, 1040);
    assert_eq!(err.sql_state, None);
    assert_eq!(err.message, "Too many connections");
}

#[test]
fn test_write_prepare_packet() {
    let mut out = PacketBuf::new();
    write_prepare(&mut out, "SELECT 1");
    out.write_header(0);

    let bytes = out.as_bytes();
    let header = PacketHeader::from_bytes(bytes).unwrap();
    assert_eq!(header.length(), 9);
    assert_eq!(header.sequence_id, 0);
    assert_eq!(
        &bytes[4..],
        &[0x16, 0x53, 0x45, 0x4C, 0x45, 0x43, 0x54, 0x20, 0x31]
    );
}

#[test]
fn test_write_query_packet() {
    let mut out = PacketBuf::new();
    write_query(&mut out, "DO 1");
    out.write_header(0);
    assert_eq!(&out.as_bytes()[4..6], &[0x03, b'D']);
    assert_eq!(out.payload_len(), 5);
}

#[test]
fn test_write_lenenc_number_forms() {
    let mut out = PacketBuf::new();
    out.write_lenenc_number(5_u64).unwrap();
    out.write_lenenc_number(251_u64).unwrap();
    out.write_lenenc_number(0x1000000_u64).unwrap();
    out.write_lenenc_number("70000").unwrap();

    let expected: Vec<u8> = [
        &[0x05][..],
        &[0xFC, 0xFB, 0x00],
        &[0xFE, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00],
        &[0xFD, 0x70, 0x11, 0x01],
    ]
    .concat();
    assert_eq!(&out.as_bytes()[4..], &expected);

    assert!(out.write_lenenc_number("not-a-number").is_err());
    assert!(out.write_lenenc_number("18446744073709551616").is_err());
}

#[test]
fn test_write_date_round_trip() {
    let civil = CivilDateTime {
        year: 2024,
        month: 6,
        day: 1,
        hour: 12,
        minute: 34,
        second: 56,
        micros: 789_000,
    };
    let mut out = PacketBuf::new();
    out.write_date(&civil);
    out.write_header(0);

    let bytes = out.into_vec();
    let mut packet = Packet::new(0, &bytes);
    assert_eq!(packet.read_datetime().unwrap(), DateTimeValue::Civil(civil));
}

#[test]
fn test_write_null_and_buffer() {
    let mut out = PacketBuf::new();
    out.write_null();
    out.write_lenenc_buffer(b"ab");
    out.write_header(7);

    let bytes = out.as_bytes();
    let header = PacketHeader::from_bytes(bytes).unwrap();
    assert_eq!(header.sequence_id, 7);
    assert_eq!(header.length(), 4);
    assert_eq!(&bytes[4..], &[0xFB, 0x02, b'a', b'b']);
}
