/// Pure date/time utility functions (Discord-agnostic)
use chrono::{Datelike, Utc};
use chrono_tz::Tz;

/// Errors raised while parsing a user supplied birthday
#[derive(Debug, PartialEq, Eq)]
pub enum BirthdayParseError {
    Empty,
    InvalidDate,
    /// A year or other extra component was supplied
    NewFormat,
}

impl std::fmt::Display for BirthdayParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BirthdayParseError::Empty => write!(f, "You need to specify a date"),
            BirthdayParseError::InvalidDate => {
                write!(f, "That isn't a valid date. Use dd-mm, e.g., 13-02")
            }
            BirthdayParseError::NewFormat => write!(
                f,
                "Birthdays are set without a year now. Use dd-mm, e.g., 13-02"
            ),
        }
    }
}

impl std::error::Error for BirthdayParseError {}

/// A day/month pair parsed from user input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedBirthday {
    pub day: u32,
    pub month: u32,
    /// 29th of February, only celebrated on leap years
    pub leap: bool,
}

impl ParsedBirthday {
    /// Render as `dd-mm`
    pub fn display(&self) -> String {
        format!("{:02}-{:02}", self.day, self.month)
    }
}

/// Parse a birthday in `dd-mm` or `dd/mm` format
pub fn parse_birthday(input: &str) -> Result<ParsedBirthday, BirthdayParseError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(BirthdayParseError::Empty);
    }

    let normalized = input.replace('/', "-");
    let parts: Vec<&str> = normalized.split('-').collect();
    if parts.len() < 2 {
        return Err(BirthdayParseError::InvalidDate);
    }

    let day: u32 = parts[0]
        .trim()
        .parse()
        .map_err(|_| BirthdayParseError::InvalidDate)?;
    let month: u32 = parts[1]
        .trim()
        .parse()
        .map_err(|_| BirthdayParseError::InvalidDate)?;

    if day > 31 || month > 12 {
        return Err(BirthdayParseError::InvalidDate);
    }

    if parts.len() > 2 {
        return Err(BirthdayParseError::NewFormat);
    }

    if !is_valid_date(month as i32, day as i32) {
        return Err(BirthdayParseError::InvalidDate);
    }

    Ok(ParsedBirthday {
        day,
        month,
        leap: month == 2 && day == 29,
    })
}

/// Calculate age from birth year
pub fn calculate_age(birth_year: i32, current_year: i32) -> i32 {
    current_year - birth_year
}

/// Check if a given year is a leap year
pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

/// Current month, day and year in the given timezone
pub fn today_in(timezone: &Tz) -> (u32, u32, i32) {
    let now = Utc::now().with_timezone(timezone);
    (now.month(), now.day(), now.year())
}

/// Validate if a month/day combination is valid
pub fn is_valid_date(month: i32, day: i32) -> bool {
    if !(1..=12).contains(&month) {
        return false;
    }

    let max_day = match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => 29, // Allow Feb 29 for leap years
        _ => return false,
    };

    (1..=max_day).contains(&day)
}

/// Format a date as "Day MonthName" (e.g., "15 March")
pub fn format_date_display(month: i32, day: i32) -> String {
    let month_name = get_month_name(month);
    format!("{} {}", day, month_name)
}

/// Get month name from month number (1-12)
pub fn get_month_name(month: i32) -> &'static str {
    match month {
        1 => "January",
        2 => "February",
        3 => "March",
        4 => "April",
        5 => "May",
        6 => "June",
        7 => "July",
        8 => "August",
        9 => "September",
        10 => "October",
        11 => "November",
        12 => "December",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_birthday_dash_and_slash() {
        let dash = parse_birthday("13-02").unwrap();
        assert_eq!((dash.day, dash.month, dash.leap), (13, 2, false));

        let slash = parse_birthday("13/02").unwrap();
        assert_eq!(slash, dash);
        assert_eq!(slash.display(), "13-02");
    }

    #[test]
    fn test_parse_birthday_leap_day() {
        let leap = parse_birthday("29-02").unwrap();
        assert!(leap.leap);
        assert_eq!(leap.display(), "29-02");
    }

    #[test]
    fn test_parse_birthday_out_of_range() {
        assert_eq!(parse_birthday("32-01"), Err(BirthdayParseError::InvalidDate));
        assert_eq!(parse_birthday("01-13"), Err(BirthdayParseError::InvalidDate));
        assert_eq!(parse_birthday("31-04"), Err(BirthdayParseError::InvalidDate));
        assert_eq!(parse_birthday("00-04"), Err(BirthdayParseError::InvalidDate));
    }

    #[test]
    fn test_parse_birthday_with_year_is_new_format() {
        assert_eq!(parse_birthday("13-02-1990"), Err(BirthdayParseError::NewFormat));
        // range errors win over the format error
        assert_eq!(parse_birthday("40-02-1990"), Err(BirthdayParseError::InvalidDate));
    }

    #[test]
    fn test_parse_birthday_garbage() {
        assert_eq!(parse_birthday(""), Err(BirthdayParseError::Empty));
        assert_eq!(parse_birthday("tomorrow"), Err(BirthdayParseError::InvalidDate));
        assert_eq!(parse_birthday("ab-cd"), Err(BirthdayParseError::InvalidDate));
    }

    #[test]
    fn test_calculate_age() {
        assert_eq!(calculate_age(1990, 2025), 35);
        assert_eq!(calculate_age(1995, 1995), 0);
    }

    #[test]
    fn test_is_leap_year() {
        assert!(is_leap_year(2000));
        assert!(is_leap_year(2024));
        assert!(!is_leap_year(1900));
        assert!(!is_leap_year(2023));
    }

    #[test]
    fn test_is_valid_date() {
        assert!(is_valid_date(1, 31));
        assert!(is_valid_date(2, 29));
        assert!(!is_valid_date(0, 15));
        assert!(!is_valid_date(13, 15));
        assert!(!is_valid_date(2, 30));
        assert!(!is_valid_date(4, 31));
        assert!(!is_valid_date(6, 0));
    }

    #[test]
    fn test_format_date_display() {
        assert_eq!(format_date_display(3, 15), "15 March");
        assert_eq!(format_date_display(1, 1), "1 January");
    }

    #[test]
    fn test_get_month_name() {
        assert_eq!(get_month_name(6), "June");
        assert_eq!(get_month_name(13), "Unknown");
    }

    #[test]
    fn test_today_in_is_valid() {
        let (month, day, _) = today_in(&chrono_tz::UTC);
        assert!((1..=12).contains(&month));
        assert!((1..=31).contains(&day));
    }
}
