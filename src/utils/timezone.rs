use chrono::{NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

/// Local time birthday announcements go out at when a guild doesn't pick one
pub const DEFAULT_ANNOUNCE_TIME: &str = "08:00";

const UTC_MIDNIGHT_CRON: &str = "0 0 0 * * *";

#[derive(Debug, PartialEq, Eq)]
pub enum TimeError {
    UnknownZone(String),
    BadTime(String),
    /// The local time falls in a DST gap
    Skipped(NaiveTime),
}

impl std::fmt::Display for TimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeError::UnknownZone(zone) => write!(
                f,
                "'{}' isn't a timezone I know, try something like Europe/Paris",
                zone
            ),
            TimeError::BadTime(input) => {
                write!(f, "'{}' isn't a time, use 24h HH:MM like 08:30", input)
            }
            TimeError::Skipped(time) => write!(
                f,
                "{} is skipped by a daylight saving change in this timezone",
                time.format("%H:%M")
            ),
        }
    }
}

impl std::error::Error for TimeError {}

pub fn parse_timezone(zone: &str) -> Result<Tz, TimeError> {
    zone.trim()
        .parse()
        .map_err(|_| TimeError::UnknownZone(zone.to_string()))
}

/// Stored timezones may predate a tz database update, those fall back to UTC
pub fn parse_timezone_or_utc(zone: &str) -> Tz {
    parse_timezone(zone).unwrap_or(chrono_tz::UTC)
}

/// Parse a 24h `HH:MM` time
pub fn parse_time_string(input: &str) -> Result<NaiveTime, TimeError> {
    NaiveTime::parse_from_str(input.trim(), "%H:%M")
        .map_err(|_| TimeError::BadTime(input.to_string()))
}

/// UTC wall clock time of `time` in `zone` on `date`
fn utc_time_on(date: NaiveDate, time: NaiveTime, zone: &Tz) -> Result<NaiveTime, TimeError> {
    zone.from_local_datetime(&date.and_time(time))
        .earliest()
        .map(|local| local.with_timezone(&Utc).time())
        .ok_or(TimeError::Skipped(time))
}

fn daily_cron(at: NaiveTime) -> String {
    format!("0 {} {} * * *", at.minute(), at.hour())
}

/// Daily cron expression (in UTC) for a local `HH:MM` time in `zone`.
///
/// The offset is taken from today, so guilds in DST zones drift by an hour
/// until their schedule is saved again.
pub fn local_time_to_cron(input: &str, zone: &str) -> Result<(String, NaiveTime), TimeError> {
    let time = parse_time_string(input)?;
    let tz = parse_timezone(zone)?;
    let utc = utc_time_on(Utc::now().date_naive(), time, &tz)?;
    Ok((daily_cron(utc), utc))
}

pub fn midnight_cron(zone: &str) -> String {
    match local_time_to_cron("00:00", zone) {
        Ok((cron, _)) => cron,
        Err(_) => UTC_MIDNIGHT_CRON.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hm(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    #[test]
    fn test_parse_time_string() {
        assert_eq!(parse_time_string(" 07:45 "), Ok(hm(7, 45)));
        assert!(parse_time_string("23:59").is_ok());
        assert!(parse_time_string("7pm").is_err());
        assert!(parse_time_string("24:00").is_err());
    }

    #[test]
    fn test_parse_timezone() {
        assert_eq!(parse_timezone("America/Santiago"), Ok(chrono_tz::America::Santiago));
        assert_eq!(
            parse_timezone("Mars/Olympus"),
            Err(TimeError::UnknownZone("Mars/Olympus".to_string()))
        );
        assert_eq!(parse_timezone_or_utc("Mars/Olympus"), chrono_tz::UTC);
    }

    #[test]
    fn test_utc_time_on_dst_gap() {
        // clocks jump from 02:00 to 03:00 in Paris on this date
        let date = NaiveDate::from_ymd_opt(2025, 3, 30).unwrap();
        let paris = chrono_tz::Europe::Paris;

        assert_eq!(utc_time_on(date, hm(2, 30), &paris), Err(TimeError::Skipped(hm(2, 30))));
        assert_eq!(utc_time_on(date, hm(9, 0), &paris), Ok(hm(7, 0)));
    }

    #[test]
    fn test_local_time_to_cron() {
        assert_eq!(
            local_time_to_cron("08:15", "UTC"),
            Ok(("0 15 8 * * *".to_string(), hm(8, 15)))
        );
        // Tokyo is UTC+9 all year
        let (cron, _) = local_time_to_cron("09:00", "Asia/Tokyo").unwrap();
        assert_eq!(cron, "0 0 0 * * *");
        assert!(local_time_to_cron("9h", "UTC").is_err());
    }

    #[test]
    fn test_midnight_cron() {
        assert_eq!(midnight_cron("Asia/Tokyo"), "0 0 15 * * *");
        assert_eq!(midnight_cron("Mars/Olympus"), UTC_MIDNIGHT_CRON);
    }
}
