// Django's date format characters, see
// https://docs.djangoproject.com/en/stable/ref/templates/builtins/#date
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use serde_json::Value;

pub const DEFAULT_DATE_FORMAT: &str = "N j, Y";
pub const DEFAULT_TIME_FORMAT: &str = "P";
pub const DEFAULT_DATETIME_FORMAT: &str = "N j, Y, P";

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

// Associated Press style abbreviations
const MONTHS_AP: [&str; 12] = [
    "Jan.", "Feb.", "March", "April", "May", "June", "July", "Aug.", "Sept.", "Oct.", "Nov.", "Dec.",
];

const WEEKDAYS: [&str; 7] = ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday"];

/// Reads a datetime out of a template value.
///
/// Accepts RFC 3339 strings, naive `YYYY-MM-DD HH:MM[:SS[.f]]` strings (with a
/// space or a `T`), plain `YYYY-MM-DD` dates and integer timestamps. Naive
/// values are taken as UTC.
pub fn parse_datetime(value: &Value) -> Option<DateTime<FixedOffset>> {
    match value {
        Value::Number(n) => {
            let ts = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            Utc.timestamp_opt(ts, 0).single().map(|d| d.fixed_offset())
        }
        Value::String(s) => parse_datetime_str(s.trim()),
        _ => None,
    }
}

fn parse_datetime_str(s: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc().fixed_offset());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().fixed_offset())
}

fn twelve_hour(hour: u32) -> u32 {
    match hour % 12 {
        0 => 12,
        h => h,
    }
}

fn ordinal_suffix(day: u32) -> &'static str {
    if (11..=13).contains(&(day % 100)) {
        return "th";
    }
    match day % 10 {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    }
}

fn offset_hhmm(dt: &DateTime<FixedOffset>) -> String {
    let seconds = dt.offset().local_minus_utc();
    let sign = if seconds < 0 { '-' } else { '+' };
    let seconds = seconds.abs();
    format!("{}{:02}{:02}", sign, seconds / 3600, (seconds / 60) % 60)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(31)
}

// `f`: hours and minutes, minutes left off if they're zero
fn time_f(dt: &DateTime<FixedOffset>) -> String {
    let hour = twelve_hour(dt.hour());
    if dt.minute() == 0 {
        hour.to_string()
    } else {
        format!("{}:{:02}", hour, dt.minute())
    }
}

// `P`: like `f` with a.m./p.m., and the special cases midnight and noon
fn time_p(dt: &DateTime<FixedOffset>) -> String {
    if dt.minute() == 0 && dt.hour() == 0 {
        return "midnight".to_string();
    }
    if dt.minute() == 0 && dt.hour() == 12 {
        return "noon".to_string();
    }
    format!("{} {}", time_f(dt), if dt.hour() < 12 { "a.m." } else { "p.m." })
}

/// Formats a datetime using Django's format characters. A backslash escapes
/// the following character.
pub fn format(dt: &DateTime<FixedOffset>, fmt: &str) -> String {
    let mut out = String::with_capacity(fmt.len() * 2);
    let mut chars = fmt.chars();
    while let Some(c) = chars.next() {
        let month0 = dt.month0() as usize;
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            }
            'a' => out.push_str(if dt.hour() < 12 { "a.m." } else { "p.m." }),
            'A' => out.push_str(if dt.hour() < 12 { "AM" } else { "PM" }),
            'b' => out.push_str(&MONTHS[month0][..3].to_lowercase()),
            'c' => out.push_str(&dt.to_rfc3339()),
            'd' => out.push_str(&format!("{:02}", dt.day())),
            'D' => out.push_str(&WEEKDAYS[dt.weekday().num_days_from_monday() as usize][..3]),
            'e' => {}
            'E' | 'F' => out.push_str(MONTHS[month0]),
            'f' => out.push_str(&time_f(dt)),
            'g' => out.push_str(&twelve_hour(dt.hour()).to_string()),
            'G' => out.push_str(&dt.hour().to_string()),
            'h' => out.push_str(&format!("{:02}", twelve_hour(dt.hour()))),
            'H' => out.push_str(&format!("{:02}", dt.hour())),
            'i' => out.push_str(&format!("{:02}", dt.minute())),
            'I' => out.push('0'),
            'j' => out.push_str(&dt.day().to_string()),
            'l' => out.push_str(WEEKDAYS[dt.weekday().num_days_from_monday() as usize]),
            'L' => out.push_str(if NaiveDate::from_ymd_opt(dt.year(), 2, 29).is_some() {
                "True"
            } else {
                "False"
            }),
            'm' => out.push_str(&format!("{:02}", dt.month())),
            'M' => out.push_str(&MONTHS[month0][..3]),
            'n' => out.push_str(&dt.month().to_string()),
            'N' => out.push_str(MONTHS_AP[month0]),
            'o' => out.push_str(&dt.iso_week().year().to_string()),
            'O' => out.push_str(&offset_hhmm(dt)),
            'P' => out.push_str(&time_p(dt)),
            'r' => out.push_str(&dt.to_rfc2822()),
            's' => out.push_str(&format!("{:02}", dt.second())),
            'S' => out.push_str(ordinal_suffix(dt.day())),
            't' => out.push_str(&days_in_month(dt.year(), dt.month()).to_string()),
            'T' => {
                if dt.offset().local_minus_utc() == 0 {
                    out.push_str("UTC")
                } else {
                    out.push_str(&offset_hhmm(dt))
                }
            }
            'u' => out.push_str(&format!("{:06}", dt.nanosecond() / 1000)),
            'U' => out.push_str(&dt.timestamp().to_string()),
            'w' => out.push_str(&dt.weekday().num_days_from_sunday().to_string()),
            'W' => out.push_str(&dt.iso_week().week().to_string()),
            'y' => out.push_str(&format!("{:02}", dt.year() % 100)),
            'Y' => out.push_str(&dt.year().to_string()),
            'z' => out.push_str(&dt.ordinal().to_string()),
            'Z' => out.push_str(&dt.offset().local_minus_utc().to_string()),
            other => out.push(other),
        }
    }
    out
}
