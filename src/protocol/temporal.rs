/// MySQL binary-protocol temporal payloads and their decoders.
use std::fmt::Write as _;

use crate::cell::{CivilDateTime, DateTimeValue};
use crate::error::{Error, Result};
use zerocopy::byteorder::little_endian::{U16 as U16LE, U32 as U32LE};
use zerocopy::{FromBytes, Immutable, KnownLayout};

/// DATE/DATETIME/TIMESTAMP - 4 bytes (date only)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
pub struct Timestamp4 {
    pub year: U16LE,
    pub month: u8,
    pub day: u8,
}

/// DATE/DATETIME/TIMESTAMP - 7 bytes (without microseconds)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
pub struct Timestamp7 {
    pub year: U16LE,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

/// DATE/DATETIME/TIMESTAMP - 11 bytes (with microseconds)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
pub struct Timestamp11 {
    pub year: U16LE,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub microsecond: U32LE,
}

/// TIME - 8 bytes (without microseconds)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
pub struct Time8 {
    pub is_negative: u8,
    pub days: U32LE,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

/// TIME - 12 bytes (with microseconds)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
pub struct Time12 {
    pub is_negative: u8,
    pub days: U32LE,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub microsecond: U32LE,
}

/// Decode a binary DATE/DATETIME/TIMESTAMP payload (length prefix already
/// consumed) into a civil value. All-zero fields decode to `Invalid`.
pub fn decode_datetime(payload: &[u8]) -> Result<DateTimeValue> {
    let civil = match payload.len() {
        0 => return Ok(DateTimeValue::Invalid),
        4 => {
            let ts = Timestamp4::ref_from_bytes(payload)?;
            CivilDateTime {
                year: ts.year.get(),
                month: ts.month,
                day: ts.day,
                ..Default::default()
            }
        }
        7 => {
            let ts = Timestamp7::ref_from_bytes(payload)?;
            CivilDateTime {
                year: ts.year.get(),
                month: ts.month,
                day: ts.day,
                hour: ts.hour,
                minute: ts.minute,
                second: ts.second,
                micros: 0,
            }
        }
        11 => {
            let ts = Timestamp11::ref_from_bytes(payload)?;
            CivilDateTime {
                year: ts.year.get(),
                month: ts.month,
                day: ts.day,
                hour: ts.hour,
                minute: ts.minute,
                second: ts.second,
                micros: ts.microsecond.get(),
            }
        }
        _ => return Err(Error::MalformedFrame("invalid datetime length")),
    };

    if civil.is_zero() {
        Ok(DateTimeValue::Invalid)
    } else {
        Ok(DateTimeValue::Civil(civil))
    }
}

/// Decode a binary DATE/DATETIME/TIMESTAMP payload into its string form,
/// truncating the fraction to `decimals` digits. The time part appears only
/// when the payload carries one.
pub fn decode_datetime_string(payload: &[u8], decimals: u8) -> Result<String> {
    let date_only = payload.len() <= 4;
    let value = decode_datetime(payload)?;
    let civil = match value {
        DateTimeValue::Invalid => CivilDateTime::default(),
        DateTimeValue::Civil(c) => c,
    };

    let mut out = String::with_capacity(26);
    let _ = write!(out, "{:04}-{:02}-{:02}", civil.year, civil.month, civil.day);
    if !date_only {
        let _ = write!(
            out,
            " {:02}:{:02}:{:02}",
            civil.hour, civil.minute, civil.second
        );
        if decimals > 0 {
            let frac = format!("{:06}", civil.micros);
            let keep = (decimals as usize).min(6);
            let _ = write!(out, ".{}", &frac[..keep]);
        }
    }
    Ok(out)
}

/// Parse a text-protocol temporal cell at its fixed column positions:
/// `YYYY-MM-DD[ HH:MM:SS[.ffffff]]`. Anything that does not scan as digits
/// at those positions is an invalid date, reported in-band.
pub fn parse_date_ascii(bytes: &[u8]) -> DateTimeValue {
    fn digits(bytes: &[u8], range: std::ops::Range<usize>) -> Option<u32> {
        let slice = bytes.get(range)?;
        if slice.is_empty() || !slice.iter().all(u8::is_ascii_digit) {
            return None;
        }
        std::str::from_utf8(slice).ok()?.parse().ok()
    }

    let Some(year) = digits(bytes, 0..4) else {
        return DateTimeValue::Invalid;
    };
    let Some(month) = digits(bytes, 5..7) else {
        return DateTimeValue::Invalid;
    };
    let Some(day) = digits(bytes, 8..10) else {
        return DateTimeValue::Invalid;
    };

    let mut civil = CivilDateTime {
        year: year as u16,
        month: month as u8,
        day: day as u8,
        ..Default::default()
    };

    if bytes.len() >= 19 {
        let (Some(hour), Some(minute), Some(second)) = (
            digits(bytes, 11..13),
            digits(bytes, 14..16),
            digits(bytes, 17..19),
        ) else {
            return DateTimeValue::Invalid;
        };
        civil.hour = hour as u8;
        civil.minute = minute as u8;
        civil.second = second as u8;

        if bytes.len() > 20 {
            let frac = &bytes[20..];
            if frac.is_empty() || frac.len() > 6 || !frac.iter().all(u8::is_ascii_digit) {
                return DateTimeValue::Invalid;
            }
            // "YYYY-MM-DD HH:MM:SS.5" means half a second: right-pad to micros.
            let mut micros: u32 = std::str::from_utf8(frac)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0);
            for _ in frac.len()..6 {
                micros *= 10;
            }
            civil.micros = micros;
        }
    }

    if civil.is_zero() {
        DateTimeValue::Invalid
    } else {
        DateTimeValue::Civil(civil)
    }
}

struct TimeParts {
    negative: bool,
    days: u32,
    hour: u8,
    minute: u8,
    second: u8,
    micros: u32,
}

fn decode_time_parts(payload: &[u8]) -> Result<TimeParts> {
    match payload.len() {
        0 => Ok(TimeParts {
            negative: false,
            days: 0,
            hour: 0,
            minute: 0,
            second: 0,
            micros: 0,
        }),
        8 => {
            let t = Time8::ref_from_bytes(payload)?;
            Ok(TimeParts {
                negative: t.is_negative != 0,
                days: t.days.get(),
                hour: t.hour,
                minute: t.minute,
                second: t.second,
                micros: 0,
            })
        }
        12 => {
            let t = Time12::ref_from_bytes(payload)?;
            Ok(TimeParts {
                negative: t.is_negative != 0,
                days: t.days.get(),
                hour: t.hour,
                minute: t.minute,
                second: t.second,
                micros: t.microsecond.get(),
            })
        }
        _ => Err(Error::MalformedFrame("invalid time length")),
    }
}

/// Decode a binary TIME payload into `-HH:MM:SS[.ffffff]` with hours folded
/// from days.
pub fn decode_time_string(payload: &[u8]) -> Result<String> {
    let t = decode_time_parts(payload)?;
    let hours = t.days as u64 * 24 + t.hour as u64;

    let mut out = String::with_capacity(17);
    if t.negative {
        out.push('-');
    }
    let _ = write!(out, "{:02}:{:02}:{:02}", hours, t.minute, t.second);
    if payload.len() == 12 && t.micros != 0 {
        let _ = write!(out, ".{:06}", t.micros);
    }
    Ok(out)
}

/// Decode a binary TIME payload into total signed milliseconds, with the
/// microsecond part floored.
pub fn decode_time_millis(payload: &[u8]) -> Result<i64> {
    let t = decode_time_parts(payload)?;
    let seconds =
        t.days as i64 * 86_400 + t.hour as i64 * 3_600 + t.minute as i64 * 60 + t.second as i64;
    let millis = seconds * 1_000 + (t.micros / 1_000) as i64;
    Ok(if t.negative { -millis } else { millis })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_datetime_lengths() {
        assert_eq!(decode_datetime(&[]).unwrap(), DateTimeValue::Invalid);

        let mut data = 2024_u16.to_le_bytes().to_vec();
        data.extend_from_slice(&[12, 25]);
        let value = decode_datetime(&data).unwrap();
        assert_eq!(
            value,
            DateTimeValue::Civil(CivilDateTime {
                year: 2024,
                month: 12,
                day: 25,
                ..Default::default()
            })
        );

        data.extend_from_slice(&[15, 30, 45]);
        let value = decode_datetime(&data).unwrap();
        let DateTimeValue::Civil(civil) = value else {
            panic!("Expected a civil datetime");
        };
        assert_eq!((civil.hour, civil.minute, civil.second), (15, 30, 45));

        assert!(decode_datetime(&[1, 2, 3]).is_err());
    }

    #[test]
    fn test_decode_datetime_micros() {
        // 2020-01-02 03:04:05.001 (1_000_000 microseconds / 1000 = 1000 ms)
        let data = [
            0xE4, 0x07, 0x01, 0x02, 0x03, 0x04, 0x05, 0x40, 0x42, 0x0F, 0x00,
        ];
        let value = decode_datetime(&data).unwrap();
        assert_eq!(
            value,
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
    }

    #[test]
    fn test_decode_datetime_all_zero_is_invalid() {
        let data = [0, 0, 0, 0];
        assert_eq!(decode_datetime(&data).unwrap(), DateTimeValue::Invalid);
    }

    #[test]
    fn test_datetime_string_truncation() {
        let data = [
            0xE4, 0x07, 0x01, 0x02, 0x03, 0x04, 0x05, 0x40, 0x42, 0x0F, 0x00,
        ];
        assert_eq!(
            decode_datetime_string(&data, 6).unwrap(),
            "2020-01-02 03:04:05.100000"
        );
        assert_eq!(
            decode_datetime_string(&data, 3).unwrap(),
            "2020-01-02 03:04:05.100"
        );
        assert_eq!(decode_datetime_string(&data, 0).unwrap(), "2020-01-02 03:04:05");

        let date_only = 2024_u16
            .to_le_bytes()
            .iter()
            .copied()
            .chain([6, 1])
            .collect::<Vec<u8>>();
        assert_eq!(decode_datetime_string(&date_only, 6).unwrap(), "2024-06-01");
    }

    #[test]
    fn test_parse_date_ascii() {
        assert_eq!(
            parse_date_ascii(b"2024-12-25"),
            DateTimeValue::Civil(CivilDateTime {
                year: 2024,
                month: 12,
                day: 25,
                ..Default::default()
            })
        );
        assert_eq!(
            parse_date_ascii(b"2024-12-25 15:30:45.250000"),
            DateTimeValue::Civil(CivilDateTime {
                year: 2024,
                month: 12,
                day: 25,
                hour: 15,
                minute: 30,
                second: 45,
                micros: 250_000,
            })
        );
        assert_eq!(parse_date_ascii(b"0000-00-00"), DateTimeValue::Invalid);
        assert_eq!(parse_date_ascii(b"not-a-date"), DateTimeValue::Invalid);
    }

    #[test]
    fn test_time_string() {
        assert_eq!(decode_time_string(&[]).unwrap(), "00:00:00");

        let mut data = vec![1_u8];
        data.extend_from_slice(&1_u32.to_le_bytes());
        data.extend_from_slice(&[12, 30, 45]);
        assert_eq!(decode_time_string(&data).unwrap(), "-36:30:45");

        data.extend_from_slice(&250_000_u32.to_le_bytes());
        assert_eq!(decode_time_string(&data).unwrap(), "-36:30:45.250000");
    }

    #[test]
    fn test_time_millis() {
        assert_eq!(decode_time_millis(&[]).unwrap(), 0);

        let mut data = vec![0_u8];
        data.extend_from_slice(&0_u32.to_le_bytes());
        data.extend_from_slice(&[1, 0, 0]);
        data.extend_from_slice(&1_999_u32.to_le_bytes());
        // Micros floor to milliseconds.
        assert_eq!(decode_time_millis(&data).unwrap(), 3_600_000 + 1);
    }
}
