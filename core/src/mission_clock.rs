use std::fmt;

use chrono::DateTime;
use chrono::Utc;

/// Time since the mission epoch, split for display.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MissionElapsed {
    pub days: u64,
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
}

impl MissionElapsed {
    pub fn from_seconds(total: u64) -> Self {
        Self {
            days: total / 86_400,
            hours: ((total / 3_600) % 24) as u8,
            minutes: ((total / 60) % 60) as u8,
            seconds: (total % 60) as u8,
        }
    }
}

/// `DD:HH:MM:SS`, days padded to at least two digits.
impl fmt::Display for MissionElapsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}:{:02}",
            self.days, self.hours, self.minutes, self.seconds
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MissionClock {
    epoch: DateTime<Utc>,
}

impl MissionClock {
    pub fn new(epoch: DateTime<Utc>) -> Self {
        Self { epoch }
    }

    pub fn epoch(&self) -> DateTime<Utc> {
        self.epoch
    }

    /// Readout at `now`; zero before the epoch.
    pub fn readout(&self, now: DateTime<Utc>) -> MissionElapsed {
        let seconds = now.signed_duration_since(self.epoch).num_seconds().max(0);
        MissionElapsed::from_seconds(seconds.unsigned_abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use pretty_assertions::assert_eq;

    fn epoch() -> DateTime<Utc> {
        match DateTime::from_timestamp(1_757_624_400, 0) {
            Some(epoch) => epoch,
            None => panic!("valid timestamp"),
        }
    }

    #[test]
    fn formats_days_hours_minutes_seconds() {
        let clock = MissionClock::new(epoch());
        let now = epoch() + TimeDelta::days(3) + TimeDelta::seconds(3_723);
        assert_eq!(clock.readout(now).to_string(), "03:01:02:03");
    }

    #[test]
    fn days_grow_past_two_digits() {
        let clock = MissionClock::new(epoch());
        let now = epoch() + TimeDelta::days(123) + TimeDelta::seconds(59);
        assert_eq!(clock.readout(now).to_string(), "123:00:00:59");
    }

    #[test]
    fn before_epoch_reads_zero() {
        let clock = MissionClock::new(epoch());
        let now = epoch() - TimeDelta::hours(5);
        assert_eq!(clock.readout(now), MissionElapsed::default());
        assert_eq!(clock.readout(now).to_string(), "00:00:00:00");
    }
}
