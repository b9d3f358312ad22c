//! Evaluation clock and relative date buckets.
//!
//! Date filters are relative ("active in the last 7 days"), so evaluating them
//! needs a notion of *now* and of the viewer's local day. [`Clock`] carries
//! both explicitly, which keeps condition evaluation a pure function.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::error::SeekerError;
use crate::value::Timestamp;

/// A fixed instant together with the timezone of the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clock {
    now: DateTime<FixedOffset>,
    zone: Zone,
}

/// Where local midnight is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Zone {
    /// The offset of `now`, all day long.
    Fixed,
    /// The system timezone, including daylight-saving changes.
    Local,
}

impl Clock {
    /// Captures the current system time in the local timezone.
    pub fn system() -> Self {
        Clock {
            now: Local::now().fixed_offset(),
            zone: Zone::Local,
        }
    }

    /// Uses a fixed instant whose offset applies to the whole day. Mostly
    /// useful in tests.
    pub fn fixed(now: DateTime<FixedOffset>) -> Self {
        Clock {
            now,
            zone: Zone::Fixed,
        }
    }

    /// Returns the current instant.
    pub fn now(&self) -> DateTime<FixedOffset> {
        self.now
    }

    /// Returns the current instant as a [`Timestamp`].
    pub fn timestamp(&self) -> Timestamp {
        Timestamp::from(self.now)
    }

    /// Returns the current instant formatted for storage.
    pub fn now_rfc3339(&self) -> String {
        self.timestamp().to_rfc3339()
    }

    /// Midnight at the start of the current local day.
    ///
    /// A system clock uses the offset in effect at midnight, which differs
    /// from the current one on daylight-saving changeover days.
    pub fn start_of_day(&self) -> Timestamp {
        let today = self.now.date_naive();
        let resolved = match self.zone {
            Zone::Local => midnight_in(&Local, today),
            Zone::Fixed => midnight_in(self.now.offset(), today),
        };
        resolved.unwrap_or_else(|| {
            // midnight falls in a gap; use the current offset
            let midnight = today.and_time(NaiveTime::MIN);
            let offset_millis = i64::from(self.now.offset().local_minus_utc()) * 1000;
            Timestamp(midnight.and_utc().timestamp_millis() - offset_millis)
        })
    }
}

/// First instant of `date` in `tz`, or `None` if the zone skips midnight.
fn midnight_in<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> Option<Timestamp> {
    tz.from_local_datetime(&date.and_time(NaiveTime::MIN))
        .earliest()
        .map(Timestamp::from)
}

/// Relative window used by date-typed filter conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DateBucket {
    /// Since local midnight.
    #[serde(rename = "today")]
    Today,
    /// Within the last 7 days.
    #[serde(rename = "7d")]
    Last7Days,
    /// Within the last 30 days.
    #[serde(rename = "30d")]
    Last30Days,
    /// Within the last 90 days.
    #[serde(rename = "90d")]
    Last90Days,
}

impl DateBucket {
    /// Every bucket, in the order offered to users.
    pub const ALL: [DateBucket; 4] = [
        DateBucket::Today,
        DateBucket::Last7Days,
        DateBucket::Last30Days,
        DateBucket::Last90Days,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DateBucket::Today => "today",
            DateBucket::Last7Days => "7d",
            DateBucket::Last30Days => "30d",
            DateBucket::Last90Days => "90d",
        }
    }

    /// Earliest instant still inside the bucket.
    pub fn cutoff(self, clock: &Clock) -> Timestamp {
        let days = match self {
            DateBucket::Today => return clock.start_of_day(),
            DateBucket::Last7Days => 7,
            DateBucket::Last30Days => 30,
            DateBucket::Last90Days => 90,
        };
        Timestamp::from(clock.now() - Duration::days(days))
    }

    /// Returns `true` if `ts` falls inside the bucket (inclusive cutoff).
    pub fn contains(self, ts: Timestamp, clock: &Clock) -> bool {
        ts >= self.cutoff(clock)
    }
}

impl fmt::Display for DateBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DateBucket {
    type Err = SeekerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DateBucket::ALL
            .into_iter()
            .find(|bucket| bucket.as_str() == s)
            .ok_or_else(|| SeekerError::UnknownBucket(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{LocalResult, NaiveDateTime};

    fn clock_at(offset_hours: i32, h: u32, m: u32) -> Clock {
        let tz = FixedOffset::east_opt(offset_hours * 3600).unwrap();
        Clock::fixed(tz.with_ymd_and_hms(2024, 3, 15, h, m, 0).unwrap())
    }

    #[test]
    fn start_of_day_respects_offset() {
        let clock = clock_at(2, 10, 30);
        // 2024-03-15T00:00:00+02:00 == 2024-03-14T22:00:00Z
        assert_eq!(
            clock.start_of_day(),
            Timestamp::parse("2024-03-14T22:00:00Z").unwrap()
        );
    }

    /// +01:00 until 2024-03-31T01:00Z, +02:00 afterwards.
    #[derive(Debug, Clone, Copy)]
    struct SpringForward;

    impl SpringForward {
        fn switch() -> NaiveDateTime {
            NaiveDate::from_ymd_opt(2024, 3, 31)
                .unwrap()
                .and_hms_opt(1, 0, 0)
                .unwrap()
        }

        fn winter() -> FixedOffset {
            FixedOffset::east_opt(3600).unwrap()
        }

        fn summer() -> FixedOffset {
            FixedOffset::east_opt(7200).unwrap()
        }
    }

    impl TimeZone for SpringForward {
        type Offset = FixedOffset;

        fn from_offset(_: &FixedOffset) -> Self {
            SpringForward
        }

        fn offset_from_local_date(&self, local: &NaiveDate) -> LocalResult<FixedOffset> {
            self.offset_from_local_datetime(&local.and_time(NaiveTime::MIN))
        }

        fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> LocalResult<FixedOffset> {
            let as_winter = *local - Duration::hours(1) < Self::switch();
            let as_summer = *local - Duration::hours(2) >= Self::switch();
            match (as_winter, as_summer) {
                (true, false) => LocalResult::Single(Self::winter()),
                (false, true) => LocalResult::Single(Self::summer()),
                (true, true) => LocalResult::Ambiguous(Self::winter(), Self::summer()),
                (false, false) => LocalResult::None,
            }
        }

        fn offset_from_utc_date(&self, utc: &NaiveDate) -> FixedOffset {
            self.offset_from_utc_datetime(&utc.and_time(NaiveTime::MIN))
        }

        fn offset_from_utc_datetime(&self, utc: &NaiveDateTime) -> FixedOffset {
            if *utc < Self::switch() {
                Self::winter()
            } else {
                Self::summer()
            }
        }
    }

    #[test]
    fn midnight_uses_offset_in_effect_at_midnight() {
        let changeover = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        // 00:00 is still +01:00 even though noon is +02:00
        assert_eq!(
            midnight_in(&SpringForward, changeover),
            Timestamp::parse("2024-03-30T23:00:00Z")
        );
        let next_day = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        assert_eq!(
            midnight_in(&SpringForward, next_day),
            Timestamp::parse("2024-03-31T22:00:00Z")
        );
    }

    #[test]
    fn system_clock_day_starts_before_now() {
        let clock = Clock::system();
        let start = clock.start_of_day();
        assert!(start <= clock.timestamp());
        assert!(clock.timestamp().as_millis() - start.as_millis() < 26 * 3_600_000);
    }

    #[test]
    fn today_bucket_starts_at_local_midnight() {
        let clock = clock_at(-5, 9, 0);
        let just_after = Timestamp::parse("2024-03-15T00:00:01-05:00").unwrap();
        let just_before = Timestamp::parse("2024-03-14T23:59:59-05:00").unwrap();

        assert!(DateBucket::Today.contains(just_after, &clock));
        assert!(!DateBucket::Today.contains(just_before, &clock));
    }

    #[test]
    fn day_buckets_count_back_from_now() {
        let clock = clock_at(0, 12, 0);
        let six_days = Timestamp::parse("2024-03-09T12:00:00Z").unwrap();
        let exactly_seven = Timestamp::parse("2024-03-08T12:00:00Z").unwrap();
        let eight_days = Timestamp::parse("2024-03-07T12:00:00Z").unwrap();

        assert!(DateBucket::Last7Days.contains(six_days, &clock));
        assert!(DateBucket::Last7Days.contains(exactly_seven, &clock));
        assert!(!DateBucket::Last7Days.contains(eight_days, &clock));
        assert!(DateBucket::Last30Days.contains(eight_days, &clock));
    }

    #[test]
    fn bucket_names_round_trip() {
        for bucket in DateBucket::ALL {
            assert_eq!(bucket.as_str().parse::<DateBucket>().unwrap(), bucket);
        }
        assert!("1y".parse::<DateBucket>().is_err());
    }
}
