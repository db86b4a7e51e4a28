//! Time-of-day arithmetic for diary bookings.

use crate::errors::ServiceError;
use std::fmt;
use std::str::FromStr;

/// Minutes since midnight, rendered as `HH:MM`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime(u16);

impl ClockTime {
    pub fn from_hm(hour: u16, minute: u16) -> Option<Self> {
        (hour < 24 && minute < 60).then(|| ClockTime(hour * 60 + minute))
    }

    pub fn minutes(self) -> u16 {
        self.0
    }
}

impl FromStr for ClockTime {
    type Err = ServiceError;

    /// Accepts `H:MM` or `HH:MM` on a 24 hour clock.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || ServiceError::ValidationError(format!("invalid time '{}', expected HH:MM", raw));

        let (hour, minute) = raw.trim().split_once(':').ok_or_else(invalid)?;
        if hour.is_empty()
            || hour.len() > 2
            || minute.len() != 2
            || !hour.bytes().chain(minute.bytes()).all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        let hour: u16 = hour.parse().map_err(|_| invalid())?;
        let minute: u16 = minute.parse().map_err(|_| invalid())?;
        ClockTime::from_hm(hour, minute).ok_or_else(invalid)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

/// Half-open `[start, end)` interval within one day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSlot {
    start: ClockTime,
    end: ClockTime,
}

impl TimeSlot {
    pub fn new(start: ClockTime, end: ClockTime) -> Result<Self, ServiceError> {
        if end <= start {
            return Err(ServiceError::ValidationError(format!(
                "end time {} must be after start time {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    /// Parses and validates a pair of `HH:MM` strings.
    pub fn parse(start: &str, end: &str) -> Result<Self, ServiceError> {
        Self::new(start.parse()?, end.parse()?)
    }

    pub fn start(&self) -> ClockTime {
        self.start
    }

    pub fn end(&self) -> ClockTime {
        self.end
    }

    /// Touching slots (one ends when the other starts) do not overlap.
    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.start < other.end && self.end > other.start
    }

    pub fn duration_minutes(&self) -> u16 {
        self.end.minutes() - self.start.minutes()
    }

    /// `"2h 15m"`, or just `"45m"` when under an hour
    pub fn duration_label(&self) -> String {
        format_duration(self.duration_minutes())
    }
}

pub fn format_duration(minutes: u16) -> String {
    let (hours, minutes) = (minutes / 60, minutes % 60);
    if hours == 0 {
        format!("{}m", minutes)
    } else {
        format!("{}h {}m", hours, minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn slot(start: &str, end: &str) -> TimeSlot {
        TimeSlot::parse(start, end).unwrap()
    }

    #[rstest]
    #[case("09:00", "09:00")]
    #[case("9:05", "09:05")]
    #[case("00:00", "00:00")]
    #[case(" 23:59 ", "23:59")]
    fn parses_and_normalises(#[case] raw: &str, #[case] expected: &str) {
        let t: ClockTime = raw.parse().unwrap();
        assert_eq!(t.to_string(), expected);
    }

    #[rstest]
    #[case("24:00")]
    #[case("12:60")]
    #[case("12:5")]
    #[case("123:00")]
    #[case("noon")]
    #[case("")]
    #[case("-1:00")]
    fn rejects_malformed_times(#[case] raw: &str) {
        assert!(raw.parse::<ClockTime>().is_err());
    }

    #[rstest]
    #[case("09:00", "11:15", "2h 15m")]
    #[case("09:00", "09:45", "45m")]
    #[case("08:00", "10:00", "2h 0m")]
    #[case("00:00", "23:59", "23h 59m")]
    fn labels_durations(#[case] start: &str, #[case] end: &str, #[case] expected: &str) {
        assert_eq!(slot(start, end).duration_label(), expected);
    }

    #[test]
    fn end_must_follow_start() {
        assert!(TimeSlot::parse("10:00", "10:00").is_err());
        assert!(TimeSlot::parse("10:00", "09:59").is_err());
    }

    #[rstest]
    #[case(("09:00", "10:00"), ("10:00", "11:00"), false)]
    #[case(("09:00", "10:00"), ("09:30", "10:30"), true)]
    #[case(("09:00", "12:00"), ("10:00", "11:00"), true)]
    #[case(("13:00", "14:00"), ("09:00", "10:00"), false)]
    fn detects_overlap(
        #[case] a: (&str, &str),
        #[case] b: (&str, &str),
        #[case] expected: bool,
    ) {
        assert_eq!(slot(a.0, a.1).overlaps(&slot(b.0, b.1)), expected);
    }

    fn any_slot() -> impl Strategy<Value = TimeSlot> {
        (0u16..1439)
            .prop_flat_map(|start| (Just(start), (start + 1)..1440))
            .prop_map(|(start, end)| {
                TimeSlot::new(
                    ClockTime::from_hm(start / 60, start % 60).unwrap(),
                    ClockTime::from_hm(end / 60, end % 60).unwrap(),
                )
                .unwrap()
            })
    }

    proptest! {
        #[test]
        fn overlap_is_symmetric(a in any_slot(), b in any_slot()) {
            prop_assert_eq!(a.overlaps(&b), b.overlaps(&a));
        }

        #[test]
        fn overlap_matches_shared_minutes(a in any_slot(), b in any_slot()) {
            let shared = (a.start().minutes()..a.end().minutes())
                .any(|m| m >= b.start().minutes() && m < b.end().minutes());
            prop_assert_eq!(a.overlaps(&b), shared);
        }

        #[test]
        fn duration_label_round_trips(s in any_slot()) {
            let label = s.duration_label();
            let minutes = match label.split_once("h ") {
                Some((h, m)) => h.parse::<u16>().unwrap() * 60 + m.trim_end_matches('m').parse::<u16>().unwrap(),
                None => label.trim_end_matches('m').parse::<u16>().unwrap(),
            };
            prop_assert_eq!(minutes, s.duration_minutes());
        }
    }
}
