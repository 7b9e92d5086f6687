use std::sync::OnceLock;

use chrono_tz::Tz;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::timezone::{extract_timezone, is_abbreviation};

pub const DEFAULT_SUMMARY: &str = "Meeting";
pub const DEFAULT_DURATION_MINUTES: u32 = 30;

const MAX_DURATION_MINUTES: f64 = 24.0 * 60.0;

// Words that end a name captured after "with"
const NAME_STOP_WORDS: [&str; 48] = [
    "at", "on", "for", "from", "to", "in", "by", "about", "regarding", "re", "via", "using",
    "over", "around", "between", "next", "this", "tomorrow", "today", "tonight", "noon",
    "midnight", "morning", "afternoon", "evening", "monday", "tuesday", "wednesday", "thursday",
    "friday", "saturday", "sunday", "january", "february", "march", "april", "may", "june",
    "july", "august", "september", "october", "november", "december", "and", "please", "so",
    "local",
];

// A "with" followed by one of these is not about a person
const NOT_NAMES: [&str; 14] = [
    "me", "you", "us", "them", "him", "her", "it", "that", "this", "those", "these", "a", "an",
    "the",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    GoogleMeet,
    Zoom,
    Teams,
    Skype,
}

impl Platform {
    pub fn name(&self) -> &'static str {
        match self {
            Platform::GoogleMeet => "Google Meet",
            Platform::Zoom => "Zoom",
            Platform::Teams => "Microsoft Teams",
            Platform::Skype => "Skype",
        }
    }
}

/// Everything pulled out of a single message apart from the time.
#[derive(Clone, Debug, PartialEq)]
pub struct Slots {
    pub summary: String,
    pub duration_minutes: u32,
    /// Whether the duration was stated or is the default.
    pub duration_given: bool,
    pub platform: Option<Platform>,
    pub timezone: Tz,
    pub reminder_minutes: Option<u32>,
}

impl Slots {
    pub fn extract(text: &str, default_timezone: Tz) -> Self {
        let duration = extract_duration(text);
        Self {
            summary: extract_summary(text).unwrap_or_else(|| DEFAULT_SUMMARY.to_string()),
            duration_minutes: duration.unwrap_or(DEFAULT_DURATION_MINUTES),
            duration_given: duration.is_some(),
            platform: extract_platform(text),
            timezone: extract_timezone(text, default_timezone),
            reminder_minutes: extract_reminder(text),
        }
    }
}

fn quoted_title(text: &str) -> Option<String> {
    static TITLE_RE: OnceLock<Regex> = OnceLock::new();
    TITLE_RE
        .get_or_init(|| {
            Regex::new(r#"(?i)\b(?:called|titled|named)\s+["“']([^"”']+)["”']"#)
                .expect("title regex must compile")
        })
        .captures(text)
        .map(|caps| caps[1].trim().to_string())
        .filter(|title| !title.is_empty())
}

fn with_name(text: &str) -> Option<String> {
    static WITH_RE: OnceLock<Regex> = OnceLock::new();
    WITH_RE
        .get_or_init(|| Regex::new(r"(?i)\bwith\s+").expect("with regex must compile"))
        .find_iter(text)
        .find_map(|m| {
            let mut name = Vec::new();
            for word in text[m.end()..].split_whitespace().take(5) {
                if !word.starts_with(|c: char| c.is_alphabetic()) {
                    break;
                }
                let trimmed = word.trim_end_matches(['.', ',', '!', '?', ';', ':']);
                let lower = trimmed.to_lowercase();
                if NAME_STOP_WORDS.contains(&lower.as_str()) || is_abbreviation(trimmed) {
                    break;
                }
                if name.is_empty() && NOT_NAMES.contains(&lower.as_str()) {
                    return None;
                }
                name.push(trimmed);
                // End of the sentence or clause
                if trimmed.len() < word.len() {
                    break;
                }
            }
            (!name.is_empty()).then(|| name.join(" "))
        })
}

/// The meeting title: a quoted title if given, otherwise who the
/// meeting is with.
pub fn extract_summary(text: &str) -> Option<String> {
    quoted_title(text).or_else(|| with_name(text))
}

/// Meeting length in minutes. Lead times ("10 minutes before") and
/// offsets ("in 2 hours") are not durations.
pub fn extract_duration(text: &str) -> Option<u32> {
    static DURATION_RE: OnceLock<Regex> = OnceLock::new();
    static PHRASE_RE: OnceLock<Regex> = OnceLock::new();

    let numeric = DURATION_RE
        .get_or_init(|| {
            Regex::new(r"(?i)(\bin\s+)?\b(\d+(?:\.\d+)?)\s*(minutes?|mins?|hours?|hrs?|h)\b(\s+before\b)?")
                .expect("duration regex must compile")
        })
        .captures_iter(text)
        .filter(|caps| caps.get(1).is_none() && caps.get(4).is_none())
        .find_map(|caps| {
            let amount: f64 = caps[2].parse().ok()?;
            let minutes = if caps[3].to_lowercase().starts_with('h') {
                amount * 60.0
            } else {
                amount
            };
            (1.0..=MAX_DURATION_MINUTES)
                .contains(&minutes)
                .then_some(minutes.round() as u32)
        });
    if numeric.is_some() {
        return numeric;
    }

    let caps = PHRASE_RE
        .get_or_init(|| {
            Regex::new(r"(?i)\b(half\s+an\s+hour|an\s+hour\s+and\s+a\s+half|(?:an|one)\s+hour)\b")
                .expect("duration phrase regex must compile")
        })
        .captures(text)?;
    let phrase = caps[1].to_lowercase();
    if phrase.starts_with("half") {
        Some(30)
    } else if phrase.ends_with("half") {
        Some(90)
    } else {
        Some(60)
    }
}

pub fn extract_platform(text: &str) -> Option<Platform> {
    static PLATFORM_RE: OnceLock<Regex> = OnceLock::new();
    let caps = PLATFORM_RE
        .get_or_init(|| {
            Regex::new(r"(?i)\b(google\s+meet|zoom|teams|skype)\b")
                .expect("platform regex must compile")
        })
        .captures(text)?;
    match caps[1].to_lowercase().as_str() {
        "zoom" => Some(Platform::Zoom),
        "teams" => Some(Platform::Teams),
        "skype" => Some(Platform::Skype),
        _ => Some(Platform::GoogleMeet),
    }
}

/// Reminder lead time in minutes, e.g. "remind me 10 minutes before".
pub fn extract_reminder(text: &str) -> Option<u32> {
    static REMINDER_RE: OnceLock<Regex> = OnceLock::new();
    let caps = REMINDER_RE
        .get_or_init(|| {
            Regex::new(
                r"(?i)\bremind(?:er)?s?(?:\s+me)?(?:\s+of)?\s+(\d+)\s*(minutes?|mins?|hours?|hrs?|days?)\s+before\b",
            )
            .expect("reminder regex must compile")
        })
        .captures(text)?;
    let amount: u32 = caps[1].parse().ok()?;
    let unit = caps[2].to_lowercase();
    let per_unit = if unit.starts_with('d') {
        24 * 60
    } else if unit.starts_with('h') {
        60
    } else {
        1
    };
    amount.checked_mul(per_unit)
}

/// Whether the text accepts a previously proposed booking.
pub fn is_confirmation(text: &str) -> bool {
    let text = text.to_lowercase();
    ["confirm", "book it", "yes, book", "yes book"]
        .iter()
        .any(|signal| text.contains(signal))
}
