use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;

use crate::types::Timestamp;

pub const MS_PER_DAY: i64 = 86_400_000;

/// source of the current time in milliseconds since epoch
pub trait Clock {
    fn now_ms(&self) -> Timestamp;
}

impl Clock for SafeTimeProvider {
    fn now_ms(&self) -> Timestamp {
        self.now().timestamp_millis()
    }
}

/// a fixed reading
impl Clock for Timestamp {
    fn now_ms(&self) -> Timestamp {
        *self
    }
}

/// convert a ledger timestamp to a utc datetime
pub fn to_datetime(ts: Timestamp) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ts)
}

/// length of a term in milliseconds, None on overflow
pub fn months_to_ms(months: u32, month_length_days: u32) -> Option<i64> {
    (months as i64)
        .checked_mul(month_length_days as i64)?
        .checked_mul(MS_PER_DAY)
}

/// whole days elapsed between two timestamps, zero if `to` is not after `from`
pub fn whole_days_between(from: Timestamp, to: Timestamp) -> u64 {
    if to <= from {
        return 0;
    }
    (to.saturating_sub(from) / MS_PER_DAY) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use hourglass_rs::TimeSource;

    #[test]
    fn test_safe_time_provider_clock() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let time = SafeTimeProvider::new(TimeSource::Test(start));
        let control = time.test_control().unwrap();

        assert_eq!(time.now_ms(), start.timestamp_millis());

        control.advance(chrono::Duration::milliseconds(1_500));
        assert_eq!(time.now_ms(), start.timestamp_millis() + 1_500);
    }

    #[test]
    fn test_term_conversion() {
        assert_eq!(months_to_ms(1, 30), Some(30 * MS_PER_DAY));
        assert_eq!(months_to_ms(12, 30), Some(360 * MS_PER_DAY));
    }

    #[test]
    fn test_whole_days_floor() {
        assert_eq!(whole_days_between(0, MS_PER_DAY - 1), 0);
        assert_eq!(whole_days_between(0, MS_PER_DAY), 1);
        assert_eq!(whole_days_between(0, 15 * MS_PER_DAY + 3_600_000), 15);
        assert_eq!(whole_days_between(10, 5), 0);
    }

    #[test]
    fn test_to_datetime() {
        let dt = to_datetime(0).unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap());
    }
}
