//! Timezone detection from free text.
//!
//! Rules are tried in order and the first one that produces a zone
//! wins. When no rule matches the caller's default zone is used.
use std::sync::OnceLock;

use chrono_tz::{TZ_VARIANTS, Tz};
use regex::Regex;

/// What a single rule found in the text.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TimezoneHint {
    /// The user referred to their own time ("local time", "my time").
    Local,
    Zone(Tz),
}

type TimezoneRule = fn(&str) -> Option<TimezoneHint>;

const RULES: [(&str, TimezoneRule); 4] = [
    ("local time", local_time),
    ("abbreviation", abbreviation),
    ("zone name", zone_name),
    ("place time", place_time),
];

const ABBREVIATIONS: [(&str, Tz); 26] = [
    ("IST", Tz::Asia__Kolkata),
    ("PST", Tz::America__Los_Angeles),
    ("PDT", Tz::America__Los_Angeles),
    ("MST", Tz::America__Denver),
    ("MDT", Tz::America__Denver),
    ("CST", Tz::America__Chicago),
    ("CDT", Tz::America__Chicago),
    ("EST", Tz::America__New_York),
    ("EDT", Tz::America__New_York),
    ("AKST", Tz::America__Anchorage),
    ("HST", Tz::Pacific__Honolulu),
    ("GMT", Tz::Etc__GMT),
    ("UTC", Tz::UTC),
    ("BST", Tz::Europe__London),
    ("CET", Tz::Europe__Paris),
    ("CEST", Tz::Europe__Paris),
    ("EET", Tz::Europe__Helsinki),
    ("MSK", Tz::Europe__Moscow),
    ("GST", Tz::Asia__Dubai),
    ("PKT", Tz::Asia__Karachi),
    ("SGT", Tz::Asia__Singapore),
    ("HKT", Tz::Asia__Hong_Kong),
    ("JST", Tz::Asia__Tokyo),
    ("KST", Tz::Asia__Seoul),
    ("AEST", Tz::Australia__Sydney),
    ("NZST", Tz::Pacific__Auckland),
];

// Words that commonly precede "time" without naming a place.
const PLACE_STOP_WORDS: [&str; 45] = [
    "a", "an", "the", "my", "your", "our", "their", "his", "her", "its", "this", "that", "same",
    "what", "which", "any", "some", "local", "meeting", "free", "spare", "good", "best", "start",
    "end", "lunch", "dinner", "breakfast", "standard", "daylight", "current", "right", "exact",
    "different", "each", "every", "first", "last", "next", "one", "christmas", "easter",
    "holiday", "summer", "winter",
];

// Only zones named after a city on a continent are matched by place,
// so ocean and island zones like `Indian/Christmas` never are.
const PLACE_REGIONS: [&str; 5] = ["Africa", "America", "Asia", "Australia", "Europe"];

fn local_time(text: &str) -> Option<TimezoneHint> {
    static LOCAL_RE: OnceLock<Regex> = OnceLock::new();
    LOCAL_RE
        .get_or_init(|| {
            Regex::new(r"(?i)\b(?:local|my)\s+time\b").expect("local time regex must compile")
        })
        .is_match(text)
        .then_some(TimezoneHint::Local)
}

fn abbreviation(text: &str) -> Option<TimezoneHint> {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .find_map(|word| {
            ABBREVIATIONS
                .iter()
                .find(|(abbr, _)| abbr.eq_ignore_ascii_case(word))
                .map(|(_, tz)| TimezoneHint::Zone(*tz))
        })
}

/// True when `word` is one of the timezone abbreviations recognized
/// in messages, e.g. "IST".
pub fn is_abbreviation(word: &str) -> bool {
    ABBREVIATIONS
        .iter()
        .any(|(abbr, _)| abbr.eq_ignore_ascii_case(word))
}

fn zone_name(text: &str) -> Option<TimezoneHint> {
    static ZONE_RE: OnceLock<Regex> = OnceLock::new();
    ZONE_RE
        .get_or_init(|| {
            Regex::new(r"(?i)\b[a-z]+(?:/[a-z0-9_+\-]+)+").expect("zone name regex must compile")
        })
        .find_iter(text)
        .find_map(|m| {
            TZ_VARIANTS
                .iter()
                .find(|tz| tz.name().eq_ignore_ascii_case(m.as_str()))
                .map(|tz| TimezoneHint::Zone(*tz))
        })
}

/// Find a zone whose city matches `place`, e.g. "new york" matches
/// `America/New_York`.
fn zone_for_place(place: &str) -> Option<Tz> {
    let place = place.trim().replace(' ', "_");
    TZ_VARIANTS.iter().copied().find(|tz| {
        tz.name().split_once('/').is_some_and(|(region, _)| {
            PLACE_REGIONS.contains(&region)
                && tz
                    .name()
                    .rsplit('/')
                    .next()
                    .is_some_and(|city| city.eq_ignore_ascii_case(&place))
        })
    })
}

fn place_time(text: &str) -> Option<TimezoneHint> {
    static PLACE_RE: OnceLock<Regex> = OnceLock::new();
    PLACE_RE
        .get_or_init(|| {
            Regex::new(r"(?i)\b([a-z]+(?:\s+[a-z]+)?)\s+(?:time\s*zone|time)\b")
                .expect("place time regex must compile")
        })
        .captures_iter(text)
        .find_map(|caps| {
            let phrase = caps[1].to_lowercase();
            let last = phrase.split_whitespace().last()?.to_string();
            if PLACE_STOP_WORDS.contains(&last.as_str()) {
                return None;
            }
            let first = phrase.split_whitespace().next()?;
            let candidates = if phrase.contains(' ') && !PLACE_STOP_WORDS.contains(&first) {
                vec![phrase.clone(), last]
            } else {
                vec![last]
            };
            candidates
                .iter()
                .find_map(|c| zone_for_place(c))
                .map(TimezoneHint::Zone)
        })
}

/// Run the rules in priority order and report the first hint found
/// along with the name of the rule that produced it.
pub fn detect_timezone(text: &str) -> Option<(&'static str, TimezoneHint)> {
    RULES
        .iter()
        .find_map(|(name, rule)| rule(text).map(|hint| (*name, hint)))
}

/// Resolve the timezone a message refers to, falling back to
/// `default` for local time or when nothing is mentioned.
pub fn extract_timezone(text: &str, default: Tz) -> Tz {
    match detect_timezone(text) {
        Some((rule, TimezoneHint::Zone(tz))) => {
            tracing::debug!("Timezone {} matched by {} rule", tz.name(), rule);
            tz
        }
        Some((_, TimezoneHint::Local)) | None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abbreviation() {
        assert_eq!(
            extract_timezone("meeting at 3pm IST", Tz::UTC),
            Tz::Asia__Kolkata
        );
        assert_eq!(
            extract_timezone("book it for 9am pst", Tz::UTC),
            Tz::America__Los_Angeles
        );
    }

    #[test]
    fn test_abbreviation_is_whole_word() {
        // "best" and "list" must not be read as EST / IST
        assert_eq!(
            extract_timezone("what is the best time on my list", Tz::Europe__Berlin),
            Tz::Europe__Berlin
        );
    }

    #[test]
    fn test_local_time_uses_default() {
        assert_eq!(
            extract_timezone("in my local time", Tz::Asia__Tokyo),
            Tz::Asia__Tokyo
        );
        assert_eq!(
            extract_timezone("3pm my time", Tz::America__Chicago),
            Tz::America__Chicago
        );
    }

    #[test]
    fn test_local_time_beats_abbreviation() {
        assert_eq!(
            detect_timezone("3pm local time, not EST"),
            Some(("local time", TimezoneHint::Local))
        );
    }

    #[test]
    fn test_zone_name() {
        assert_eq!(
            extract_timezone("at 10:00 europe/london please", Tz::UTC),
            Tz::Europe__London
        );
        assert_eq!(
            extract_timezone("schedule it in America/New_York", Tz::UTC),
            Tz::America__New_York
        );
    }

    #[test]
    fn test_place_time() {
        assert_eq!(
            extract_timezone("tomorrow at 3pm tokyo time", Tz::UTC),
            Tz::Asia__Tokyo
        );
        assert_eq!(
            extract_timezone("friday 9am new york time", Tz::UTC),
            Tz::America__New_York
        );
        assert_eq!(
            extract_timezone("at noon London timezone", Tz::UTC),
            Tz::Europe__London
        );
    }

    #[test]
    fn test_place_time_stop_words() {
        assert_eq!(detect_timezone("what time works for you"), None);
        assert_eq!(detect_timezone("find a good time for the meeting"), None);
        assert_eq!(detect_timezone("let's meet at christmas time"), None);
    }

    #[test]
    fn test_place_time_ignores_island_zones() {
        assert_eq!(zone_for_place("christmas"), None);
        assert_eq!(zone_for_place("easter"), None);
        assert_eq!(zone_for_place("sydney"), Some(Tz::Australia__Sydney));
    }

    #[test]
    fn test_unknown_place_falls_back() {
        assert_eq!(
            extract_timezone("at 3pm narnia time", Tz::Asia__Singapore),
            Tz::Asia__Singapore
        );
    }

    #[test]
    fn test_no_timezone_falls_back() {
        assert_eq!(
            extract_timezone("book a meeting with Sam", Tz::UTC),
            Tz::UTC
        );
    }
}
