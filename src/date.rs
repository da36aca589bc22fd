//! date.rs
//!
//! PDF date strings (`D:YYYYMMDDHHmmSSOHH'mm'`) from the document
//! information dictionary. Every field after the year is optional; the
//! offset marker is `+`, `-` or `Z`.

pub use time::{OffsetDateTime, UtcOffset};

use time::{Date, Month, PrimitiveDateTime, Time};

/// Parses a PDF date string. Returns `None` on anything that does not at
/// least carry a four-digit year.
pub fn parse_pdf_date(s: &str) -> Option<OffsetDateTime> {
    let s = s.trim();
    let s = s.strip_prefix("D:").unwrap_or(s);
    let b = s.as_bytes();

    let digits = |range: std::ops::Range<usize>, default: u32| -> u32 {
        if b.len() >= range.end && b[range.clone()].iter().all(|c| c.is_ascii_digit()) {
            std::str::from_utf8(&b[range])
                .ok()
                .and_then(|t| t.parse().ok())
                .unwrap_or(default)
        } else {
            default
        }
    };

    if b.len() < 4 || !b[..4].iter().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let year = digits(0..4, 0) as i32;
    let month = digits(4..6, 1).clamp(1, 12);
    let day = digits(6..8, 1).clamp(1, 31);
    let hour = digits(8..10, 0).min(23);
    let minute = digits(10..12, 0).min(59);
    let second = digits(12..14, 0).min(59);

    let month = Month::try_from(month as u8).ok()?;
    let date = Date::from_calendar_date(year, month, day as u8)
        .or_else(|_| Date::from_calendar_date(year, month, 1))
        .ok()?;
    let time = Time::from_hms(hour as u8, minute as u8, second as u8).ok()?;

    let offset = parse_offset(&b[b.len().min(14)..]).unwrap_or(UtcOffset::UTC);
    Some(PrimitiveDateTime::new(date, time).assume_offset(offset))
}

// O HH ' mm ' with O one of + - Z
fn parse_offset(b: &[u8]) -> Option<UtcOffset> {
    let sign = match b.first()? {
        b'+' => 1i8,
        b'-' => -1i8,
        b'Z' => return Some(UtcOffset::UTC),
        _ => return None,
    };
    let two = |i: usize| -> Option<i8> {
        if b.len() >= i + 2 && b[i].is_ascii_digit() && b[i + 1].is_ascii_digit() {
            Some(((b[i] - b'0') * 10 + (b[i + 1] - b'0')) as i8)
        } else {
            None
        }
    };
    let hours = two(1)?;
    // minutes follow an apostrophe when present
    let minutes = if b.get(3) == Some(&b'\'') {
        two(4).unwrap_or(0)
    } else {
        two(3).unwrap_or(0)
    };
    UtcOffset::from_hms(sign * hours, sign * minutes, 0).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn full_date_with_positive_offset() {
        let dt = parse_pdf_date("D:20170505150224+02'00'").unwrap();
        assert_eq!(dt.year(), 2017);
        assert_eq!(u8::from(dt.month()), 5);
        assert_eq!(dt.day(), 5);
        assert_eq!(dt.hour(), 15);
        assert_eq!(dt.offset(), UtcOffset::from_hms(2, 0, 0).unwrap());
    }

    #[test]
    fn year_only_defaults_the_rest() {
        let dt = parse_pdf_date("D:1999").unwrap();
        assert_eq!(dt.year(), 1999);
        assert_eq!(u8::from(dt.month()), 1);
        assert_eq!(dt.day(), 1);
        assert_eq!(dt.offset(), UtcOffset::UTC);
    }

    #[test]
    fn zulu_and_negative_offsets() {
        let dt = parse_pdf_date("D:20200101120000Z").unwrap();
        assert_eq!(dt.offset(), UtcOffset::UTC);
        let dt = parse_pdf_date("D:20200101120000-05'30'").unwrap();
        assert_eq!(dt.offset(), UtcOffset::from_hms(-5, -30, 0).unwrap());
    }

    #[test]
    fn garbage_is_none() {
        assert!(parse_pdf_date("yesterday").is_none());
        assert!(parse_pdf_date("D:20").is_none());
    }
}
