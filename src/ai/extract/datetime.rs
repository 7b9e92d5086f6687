//! Resolve a date/time phrase to an absolute instant in a timezone.
//!
//! Dates and times of day are found independently by ordered rule
//! lists and then combined. Phrases that only name a weekday or a day
//! of the month without a year roll forward to their next occurrence.
//! Anything that still lands before "now" is reported as such so the
//! caller can ask the user again.
use std::sync::OnceLock;

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use regex::{Captures, Regex};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResolvedTime {
    pub at: DateTime<Tz>,
    /// False when only a date was given and `at` is the start of
    /// that day.
    pub has_time: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Resolution {
    At(ResolvedTime),
    /// No recognizable date or time in the text.
    NotFound,
    /// A date or time was found but it is before "now".
    InPast(DateTime<Tz>),
}

/// How a date that landed in the past may be moved into the future.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Roll {
    Week,
    Year,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct DateMatch {
    date: NaiveDate,
    roll: Option<Roll>,
}

impl DateMatch {
    fn fixed(date: NaiveDate) -> Self {
        Self { date, roll: None }
    }
}

type DateRule = fn(&str, NaiveDate) -> Option<DateMatch>;
type TimeRule = fn(&str) -> Option<NaiveTime>;

const DATE_RULES: [(&str, DateRule); 8] = [
    ("iso date", iso_date),
    ("month day", month_day),
    ("day month", day_month),
    ("weekday", weekday),
    ("day after tomorrow", day_after_tomorrow),
    ("tomorrow", tomorrow),
    ("in days", in_days),
    ("today", today),
];

const TIME_RULES: [(&str, TimeRule); 3] = [
    ("12 hour", twelve_hour),
    ("24 hour", twenty_four_hour),
    ("named time", named_time),
];

const MONTHS: &str = r"(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)";

fn month_number(name: &str) -> Option<u32> {
    let month = match &name.to_lowercase()[..3] {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

/// Build a date from a month and day with an optional year. Without a
/// year the date is allowed to roll into next year.
fn calendar_date(caps: &Captures, month: &str, day: &str, today: NaiveDate) -> Option<DateMatch> {
    let month = month_number(month)?;
    let day = day.parse().ok()?;
    match caps.get(3) {
        Some(year) => NaiveDate::from_ymd_opt(year.as_str().parse().ok()?, month, day)
            .map(DateMatch::fixed),
        None => NaiveDate::from_ymd_opt(today.year(), month, day).map(|date| DateMatch {
            date,
            roll: Some(Roll::Year),
        }),
    }
}

fn iso_date(text: &str, _today: NaiveDate) -> Option<DateMatch> {
    static ISO_RE: OnceLock<Regex> = OnceLock::new();
    let caps = ISO_RE
        .get_or_init(|| {
            Regex::new(r"\b(\d{4})-(\d{1,2})-(\d{1,2})").expect("iso date regex must compile")
        })
        .captures(text)?;
    NaiveDate::from_ymd_opt(
        caps[1].parse().ok()?,
        caps[2].parse().ok()?,
        caps[3].parse().ok()?,
    )
    .map(DateMatch::fixed)
}

fn month_day(text: &str, today: NaiveDate) -> Option<DateMatch> {
    static MONTH_DAY_RE: OnceLock<Regex> = OnceLock::new();
    let caps = MONTH_DAY_RE
        .get_or_init(|| {
            Regex::new(&format!(
                r"(?i)\b{MONTHS}\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?\b(?:,?\s+(\d{{4}}))?"
            ))
            .expect("month day regex must compile")
        })
        .captures(text)?;
    calendar_date(&caps, &caps[1], &caps[2], today)
}

fn day_month(text: &str, today: NaiveDate) -> Option<DateMatch> {
    static DAY_MONTH_RE: OnceLock<Regex> = OnceLock::new();
    let caps = DAY_MONTH_RE
        .get_or_init(|| {
            Regex::new(&format!(
                r"(?i)\b(\d{{1,2}})(?:st|nd|rd|th)?\s+(?:of\s+)?{MONTHS}\b(?:,?\s+(\d{{4}}))?"
            ))
            .expect("day month regex must compile")
        })
        .captures(text)?;
    calendar_date(&caps, &caps[2], &caps[1], today)
}

fn weekday(text: &str, today: NaiveDate) -> Option<DateMatch> {
    static WEEKDAY_RE: OnceLock<Regex> = OnceLock::new();
    let caps = WEEKDAY_RE
        .get_or_init(|| {
            Regex::new(
                r"(?i)\b(next\s+)?(monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b",
            )
            .expect("weekday regex must compile")
        })
        .captures(text)?;
    let target: Weekday = caps[2].parse().ok()?;
    let mut days_ahead = (target.num_days_from_monday() as i64
        - today.weekday().num_days_from_monday() as i64)
        .rem_euclid(7);
    if days_ahead == 0 && caps.get(1).is_some() {
        days_ahead = 7;
    }
    Some(DateMatch {
        date: today + Duration::days(days_ahead),
        roll: Some(Roll::Week),
    })
}

fn has_word(text: &str, re: &'static OnceLock<Regex>, pattern: &str) -> bool {
    re.get_or_init(|| Regex::new(pattern).expect("keyword regex must compile"))
        .is_match(text)
}

fn day_after_tomorrow(text: &str, today: NaiveDate) -> Option<DateMatch> {
    static RE: OnceLock<Regex> = OnceLock::new();
    has_word(text, &RE, r"(?i)\bday\s+after\s+tomorrow\b")
        .then(|| DateMatch::fixed(today + Duration::days(2)))
}

fn tomorrow(text: &str, today: NaiveDate) -> Option<DateMatch> {
    static RE: OnceLock<Regex> = OnceLock::new();
    has_word(text, &RE, r"(?i)\btomorrow\b").then(|| DateMatch::fixed(today + Duration::days(1)))
}

fn in_days(text: &str, today: NaiveDate) -> Option<DateMatch> {
    static IN_DAYS_RE: OnceLock<Regex> = OnceLock::new();
    let caps = IN_DAYS_RE
        .get_or_init(|| Regex::new(r"(?i)\bin\s+(\d{1,3})\s+days?\b").expect("in days regex must compile"))
        .captures(text)?;
    let days: i64 = caps[1].parse().ok()?;
    Some(DateMatch::fixed(today + Duration::days(days)))
}

fn today(text: &str, today: NaiveDate) -> Option<DateMatch> {
    static RE: OnceLock<Regex> = OnceLock::new();
    has_word(text, &RE, r"(?i)\b(?:today|tonight)\b").then(|| DateMatch::fixed(today))
}

fn twelve_hour(text: &str) -> Option<NaiveTime> {
    static TWELVE_RE: OnceLock<Regex> = OnceLock::new();
    TWELVE_RE
        .get_or_init(|| {
            Regex::new(r"(?i)\b(\d{1,2})(?:[:.](\d{2}))?\s*([ap])\.?\s?m\b\.?")
                .expect("12 hour regex must compile")
        })
        .captures_iter(text)
        .find_map(|caps| {
            let hour: u32 = caps[1].parse().ok()?;
            let minute: u32 = caps.get(2).map_or(Some(0), |m| m.as_str().parse().ok())?;
            if !(1..=12).contains(&hour) {
                return None;
            }
            let pm = caps[3].eq_ignore_ascii_case("p");
            let hour = match (hour, pm) {
                (12, false) => 0,
                (12, true) => 12,
                (h, true) => h + 12,
                (h, false) => h,
            };
            NaiveTime::from_hms_opt(hour, minute, 0)
        })
}

/// Clock times without am/pm are only taken when they can't be read
/// two ways: an ISO `T` prefix, a leading zero ("09:30"), hour 0 or an
/// afternoon hour. "3:30" on its own is left for the user to clarify.
fn twenty_four_hour(text: &str) -> Option<NaiveTime> {
    static TWENTY_FOUR_RE: OnceLock<Regex> = OnceLock::new();
    TWENTY_FOUR_RE
        .get_or_init(|| {
            Regex::new(r"(?i)(?:\b|(t))([01]?\d|2[0-3]):([0-5]\d)(?::[0-5]\d)?\b")
                .expect("24 hour regex must compile")
        })
        .captures_iter(text)
        .find_map(|caps| {
            let hour: u32 = caps[2].parse().ok()?;
            let minute: u32 = caps[3].parse().ok()?;
            let unambiguous = caps.get(1).is_some()
                || caps[2].starts_with('0')
                || hour == 0
                || hour >= 13;
            if !unambiguous {
                return None;
            }
            NaiveTime::from_hms_opt(hour, minute, 0)
        })
}

fn named_time(text: &str) -> Option<NaiveTime> {
    static NAMED_RE: OnceLock<Regex> = OnceLock::new();
    let caps = NAMED_RE
        .get_or_init(|| Regex::new(r"(?i)\b(noon|midday|midnight)\b").expect("named time regex must compile"))
        .captures(text)?;
    match caps[1].to_lowercase().as_str() {
        "midnight" => NaiveTime::from_hms_opt(0, 0, 0),
        _ => NaiveTime::from_hms_opt(12, 0, 0),
    }
}

/// Long form used in replies, e.g. "Thursday, January 2, 2025 at 3:00 PM".
pub const LONG_DATETIME: &str = "%A, %B %-d, %Y at %-I:%M %p";

pub fn format_datetime(at: &DateTime<Tz>) -> String {
    at.format(LONG_DATETIME).to_string()
}

fn find_date(text: &str, today: NaiveDate) -> Option<DateMatch> {
    DATE_RULES.iter().find_map(|(name, rule)| {
        rule(text, today).inspect(|m| tracing::debug!("Date {} matched by {} rule", m.date, name))
    })
}

fn find_time(text: &str) -> Option<NaiveTime> {
    TIME_RULES.iter().find_map(|(name, rule)| {
        rule(text).inspect(|t| tracing::debug!("Time {} matched by {} rule", t, name))
    })
}

fn localize(tz: Tz, date: NaiveDate, time: NaiveTime) -> Option<DateTime<Tz>> {
    // Times skipped by a DST transition don't exist and are treated
    // as unparseable
    tz.from_local_datetime(&date.and_time(time)).earliest()
}

/// Resolve the first date/time phrase in `text` relative to `now`,
/// interpreted in `tz`.
pub fn resolve_datetime(text: &str, now: DateTime<Utc>, tz: Tz) -> Resolution {
    let today_local = now.with_timezone(&tz).date_naive();
    let date_match = find_date(text, today_local);
    let time = find_time(text);

    if date_match.is_none() && time.is_none() {
        return Resolution::NotFound;
    }

    let DateMatch { date, roll } = date_match.unwrap_or(DateMatch::fixed(today_local));

    // The rest of today when only "today" was given
    if time.is_none() && date == today_local {
        return Resolution::At(ResolvedTime {
            at: now.with_timezone(&tz),
            has_time: false,
        });
    }

    let time_of_day = time.unwrap_or(NaiveTime::MIN);
    let Some(mut at) = localize(tz, date, time_of_day) else {
        return Resolution::NotFound;
    };

    if at < now {
        let rolled = match roll {
            Some(Roll::Week) => Some(date + Duration::days(7)),
            Some(Roll::Year) => date.checked_add_months(Months::new(12)),
            None => None,
        };
        match rolled.and_then(|d| localize(tz, d, time_of_day)) {
            Some(later) if later >= now => at = later,
            _ => return Resolution::InPast(at),
        }
    }

    Resolution::At(ResolvedTime {
        at,
        has_time: time.is_some(),
    })
}
