//! Free-form duration parsing
//!
//! Accepts compound unit strings (`10m`, `1h30m`, `1d2h30m15s`), colon forms
//! (`10:10`, `1:02:03`) and plain seconds (`300`). A two-field colon form whose
//! first field is a valid hour of the day is read as a wall-clock target, so
//! `14:30` means "until 14:30".

use chrono::{Duration, Local, NaiveDateTime, NaiveTime};
use regex::Regex;
use std::sync::LazyLock;

const SECONDS_PER_MINUTE: u64 = 60;
const SECONDS_PER_HOUR: u64 = 60 * SECONDS_PER_MINUTE;
const SECONDS_PER_DAY: u64 = 24 * SECONDS_PER_HOUR;

const EMPTY_INPUT: &str = "Input cannot be empty";
const REQUIRED_INPUT: &str = "Duration is required";
const ZERO_DURATION: &str = "Duration must be greater than 0";
const TOO_LARGE: &str = "Duration is too large";
const CLOCK_FIELDS_OUT_OF_RANGE: &str =
    "Invalid time format: minutes and seconds must be less than 60";
const CLOCK_SECONDS_OUT_OF_RANGE: &str = "Invalid time format: seconds must be less than 60";
const GENERIC_ERROR: &str =
    "Invalid time format. Use formats like \"10m\", \"1h30m\", \"10:10\", or plain seconds.";

static COMPOUND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:([0-9]+)d)?(?:([0-9]+)h)?(?:([0-9]+)m)?(?:([0-9]+)s)?$")
        .expect("compound duration pattern is valid")
});

static CLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]{1,2}):([0-9]{1,2})(?::([0-9]{1,2}))?$").expect("clock pattern is valid")
});

/// Outcome of a single parse call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDuration {
    pub seconds: u64,
    pub is_valid: bool,
    pub error: Option<String>,
}

impl ParsedDuration {
    fn valid(seconds: u64) -> Self {
        Self {
            seconds,
            is_valid: true,
            error: None,
        }
    }

    fn invalid(error: impl Into<String>) -> Self {
        Self {
            seconds: 0,
            is_valid: false,
            error: Some(error.into()),
        }
    }

    /// Hint text for this result: the normalised duration, or the error.
    pub fn hint(&self) -> String {
        if self.is_valid {
            format!("= {} ({} seconds)", format_duration(self.seconds), self.seconds)
        } else {
            self.error.clone().unwrap_or_else(|| GENERIC_ERROR.to_string())
        }
    }

    /// Seconds on success, the human-readable error otherwise.
    pub fn into_result(self) -> std::result::Result<u64, String> {
        if self.is_valid {
            Ok(self.seconds)
        } else {
            Err(self.error.unwrap_or_else(|| GENERIC_ERROR.to_string()))
        }
    }
}

/// Result of trying one grammar against the input.
enum Attempt {
    /// The grammar does not recognise the input at all.
    NoMatch,
    /// The grammar recognised the input but the value is unusable.
    Rejected(&'static str),
    Accepted(u64),
}

impl Attempt {
    /// Keeps the first rejection seen so a later grammar can still win.
    fn settle(self, rejection: &mut Option<&'static str>) -> Option<u64> {
        match self {
            Attempt::Accepted(seconds) => Some(seconds),
            Attempt::Rejected(reason) => {
                rejection.get_or_insert(reason);
                None
            }
            Attempt::NoMatch => None,
        }
    }
}

/// Parse against the local wall clock.
pub fn parse_duration(input: &str) -> ParsedDuration {
    parse_duration_at(input, Local::now().naive_local())
}

/// Parse with an explicit "now" for the target-time form.
pub fn parse_duration_at(input: &str, now: NaiveDateTime) -> ParsedDuration {
    let input = input.trim();
    if input.is_empty() {
        return ParsedDuration::invalid(EMPTY_INPUT);
    }

    let mut rejection = None;

    if let Some(seconds) = parse_compound(input).settle(&mut rejection) {
        return ParsedDuration::valid(seconds);
    }
    if let Some(seconds) = parse_clock(input, now).settle(&mut rejection) {
        return ParsedDuration::valid(seconds);
    }
    if let Some(seconds) = parse_plain_number(input).settle(&mut rejection) {
        return ParsedDuration::valid(seconds);
    }

    ParsedDuration::invalid(rejection.unwrap_or(GENERIC_ERROR))
}

fn parse_compound(input: &str) -> Attempt {
    let Some(caps) = COMPOUND.captures(input) else {
        return Attempt::NoMatch;
    };

    let units = [
        (1, SECONDS_PER_DAY),
        (2, SECONDS_PER_HOUR),
        (3, SECONDS_PER_MINUTE),
        (4, 1),
    ];

    if units.iter().all(|(group, _)| caps.get(*group).is_none()) {
        return Attempt::NoMatch;
    }

    let mut total: u64 = 0;
    for (group, weight) in units {
        let Some(value) = caps.get(group) else {
            continue;
        };

        let next = value
            .as_str()
            .parse::<u64>()
            .ok()
            .and_then(|count| count.checked_mul(weight))
            .and_then(|seconds| total.checked_add(seconds));

        match next {
            Some(sum) => total = sum,
            None => return Attempt::Rejected(TOO_LARGE),
        }
    }

    if total == 0 {
        Attempt::Rejected(ZERO_DURATION)
    } else {
        Attempt::Accepted(total)
    }
}

fn parse_clock(input: &str, now: NaiveDateTime) -> Attempt {
    let Some(caps) = CLOCK.captures(input) else {
        return Attempt::NoMatch;
    };

    let field = |group: usize| {
        caps.get(group)
            .and_then(|m| m.as_str().parse::<u64>().ok())
    };

    let (Some(first), Some(second)) = (field(1), field(2)) else {
        return Attempt::NoMatch;
    };

    // H:M:S is always a literal duration; H is not bounded to a day.
    if let Some(third) = field(3) {
        if second >= 60 || third >= 60 {
            return Attempt::Rejected(CLOCK_FIELDS_OUT_OF_RANGE);
        }
        let total = first * SECONDS_PER_HOUR + second * SECONDS_PER_MINUTE + third;
        return if total == 0 {
            Attempt::Rejected(ZERO_DURATION)
        } else {
            Attempt::Accepted(total)
        };
    }

    if second >= 60 {
        return Attempt::Rejected(CLOCK_SECONDS_OUT_OF_RANGE);
    }

    if first <= 23 {
        let until = seconds_until(first as u32, second as u32, now);
        if until > 0 {
            return Attempt::Accepted(until as u64);
        }
    }

    let total = first * SECONDS_PER_MINUTE + second;
    if total == 0 {
        Attempt::Rejected(ZERO_DURATION)
    } else {
        Attempt::Accepted(total)
    }
}

/// Seconds until the next occurrence of `hour:minute`, rolling to tomorrow
/// when that time has already passed today.
fn seconds_until(hour: u32, minute: u32, now: NaiveDateTime) -> i64 {
    let Some(time) = NaiveTime::from_hms_opt(hour, minute, 0) else {
        return 0;
    };

    let mut target = now.date().and_time(time);
    if target <= now {
        target += Duration::days(1);
    }

    (target - now).num_seconds()
}

fn parse_plain_number(input: &str) -> Attempt {
    let Ok(value) = input.parse::<f64>() else {
        return Attempt::NoMatch;
    };
    if !value.is_finite() {
        return Attempt::NoMatch;
    }

    let floored = value.floor();
    if floored < 1.0 {
        return Attempt::Rejected(ZERO_DURATION);
    }
    if floored >= u64::MAX as f64 {
        return Attempt::Rejected(TOO_LARGE);
    }

    Attempt::Accepted(floored as u64)
}

/// Compact unit form (`1d2h30m15s`) that parses back to the same total.
pub fn format_duration(seconds: u64) -> String {
    if seconds == 0 {
        return "0s".to_string();
    }

    let parts = [
        (seconds / SECONDS_PER_DAY, 'd'),
        ((seconds % SECONDS_PER_DAY) / SECONDS_PER_HOUR, 'h'),
        ((seconds % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE, 'm'),
        (seconds % SECONDS_PER_MINUTE, 's'),
    ];

    parts
        .iter()
        .filter(|(value, _)| *value > 0)
        .map(|(value, unit)| format!("{value}{unit}"))
        .collect()
}

/// Form-submit validation.
pub fn validate_duration_input(input: &str) -> std::result::Result<u64, String> {
    if input.trim().is_empty() {
        return Err(REQUIRED_INPUT.to_string());
    }
    parse_duration(input).into_result()
}

/// Text shown next to the duration field while the user types.
pub fn duration_hint(input: &str) -> String {
    parse_duration(input).hint()
}
