//! Date formats printed by the version control tools, normalized to UTC

use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

const MONTHS: [&str; 12] = ["Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec"];

/// Offset of the local timezone, falling back to UTC when it cannot be determined
pub fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

/// cvsps `Date:` value, `2008/03/04 10:00:00` in local time
pub fn parse_cvs_date(text: &str, local: UtcOffset) -> Option<OffsetDateTime> {
    let (date, clock) = text.trim().split_once(' ')?;
    let mut ymd = date.split('/');
    let date = calendar_date(ymd.next()?, ymd.next()?, ymd.next()?)?;
    let time = clock_time(clock.trim())?;
    Some(PrimitiveDateTime::new(date, time).assume_offset(local).to_offset(UtcOffset::UTC))
}

/// svn log header date, `2008-03-04 10:00:00 +0100 (Tue, 04 Mar 2008)`
pub fn parse_svn_date(text: &str) -> Option<OffsetDateTime> {
    let text = text.split('(').next()?.trim();
    let mut fields = text.split_whitespace();
    let mut ymd = fields.next()?.split('-');
    let date = calendar_date(ymd.next()?, ymd.next()?, ymd.next()?)?;
    let time = clock_time(fields.next()?)?;
    let offset = fields.next().map_or(Some(UtcOffset::UTC), numeric_offset)?;
    Some(PrimitiveDateTime::new(date, time).assume_offset(offset).to_offset(UtcOffset::UTC))
}

/// git default date, `Tue Mar 4 10:00:00 2008 +0100`
pub fn parse_git_date(text: &str) -> Option<OffsetDateTime> {
    let fields: Vec<&str> = text.split_whitespace().collect();
    let [_weekday, month, day, clock, year, offset] = fields.as_slice() else {
        return None;
    };
    let month = MONTHS.iter().position(|m| m == month)? + 1;
    let date = calendar_date(year, &month.to_string(), day)?;
    let time = clock_time(clock)?;
    let offset = numeric_offset(offset)?;
    Some(PrimitiveDateTime::new(date, time).assume_offset(offset).to_offset(UtcOffset::UTC))
}

fn calendar_date(year: &str, month: &str, day: &str) -> Option<Date> {
    let month = Month::try_from(month.parse::<u8>().ok()?).ok()?;
    Date::from_calendar_date(year.parse().ok()?, month, day.parse().ok()?).ok()
}

fn clock_time(text: &str) -> Option<Time> {
    let mut hms = text.split(':');
    let hour = hms.next()?.parse().ok()?;
    let minute = hms.next()?.parse().ok()?;
    let second = hms.next().map_or(Some(0), |s| s.split('.').next()?.parse().ok())?;
    Time::from_hms(hour, minute, second).ok()
}

/// `+0100` / `-0530`
fn numeric_offset(text: &str) -> Option<UtcOffset> {
    let (sign, digits) = match text.as_bytes().first()? {
        b'+' => (1, &text[1..]),
        b'-' => (-1, &text[1..]),
        _ => return None,
    };
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i8 = digits[..2].parse().ok()?;
    let minutes: i8 = digits[2..].parse().ok()?;
    UtcOffset::from_hms(sign * hours, sign * minutes, 0).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_git_date() {
        let dt = parse_git_date("Tue Mar 4 10:00:00 2008 +0100").unwrap();
        assert_eq!(dt, datetime!(2008-03-04 09:00:00 UTC));
        assert!(parse_git_date("Tue Mar 4 10:00:00 2008").is_none());
    }

    #[test]
    fn test_svn_date() {
        let dt = parse_svn_date("2008-03-04 10:00:00 -0500 (Tue, 04 Mar 2008)").unwrap();
        assert_eq!(dt, datetime!(2008-03-04 15:00:00 UTC));
    }

    #[test]
    fn test_cvs_date_uses_local_offset() {
        let offset = UtcOffset::from_hms(2, 0, 0).unwrap();
        let dt = parse_cvs_date("2008/03/04 10:00:00", offset).unwrap();
        assert_eq!(dt, datetime!(2008-03-04 08:00:00 UTC));
        assert!(parse_cvs_date("yesterday", offset).is_none());
    }
}
