use std::time::Duration;

use chrono::{DateTime, Datelike, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;

/// Longest window a single check may cover; anything older was missed.
const TOLERANCE: Duration = Duration::from_secs(5);

const WORKDAYS: [Weekday; 5] = [Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub weekday: Weekday,
    pub time: NaiveTime,
}

/// Weekly fire times, evaluated in a fixed timezone.
#[derive(Debug, Clone)]
pub struct Timetable {
    timezone: Tz,
    slots: Vec<Slot>,
}

impl Timetable {
    pub fn new(timezone: Tz, slots: Vec<Slot>) -> Self {
        Self { timezone, slots }
    }

    /// Monday to Friday, every hour from 10:00 to 16:00 and once more at 17:30.
    pub fn workdays(timezone: Tz) -> Self {
        let times: Vec<NaiveTime> = (10..=16)
            .filter_map(|hour| NaiveTime::from_hms_opt(hour, 0, 0))
            .chain(NaiveTime::from_hms_opt(17, 30, 0))
            .collect();

        let slots = WORKDAYS
            .iter()
            .flat_map(|&weekday| times.iter().map(move |&time| Slot { weekday, time }))
            .collect();

        Self::new(timezone, slots)
    }

    /// Whether a slot falls in `(prev, now]`, looking back no further than the tolerance.
    pub fn is_due(&self, prev: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        if now <= prev {
            return false;
        }

        let floor = chrono::Duration::from_std(TOLERANCE)
            .ok()
            .and_then(|tolerance| now.checked_sub_signed(tolerance))
            .unwrap_or(prev);
        let start = prev.max(floor);

        let timezone = self.timezone;
        let slots = &self.slots;
        let first_day = start.with_timezone(&timezone).date_naive();
        let last_day = now.with_timezone(&timezone).date_naive();

        first_day
            .iter_days()
            .take_while(|day| *day <= last_day)
            .flat_map(move |day| {
                slots
                    .iter()
                    .filter(move |slot| slot.weekday == day.weekday())
                    .filter_map(move |slot| timezone.from_local_datetime(&day.and_time(slot.time)).earliest())
            })
            .map(|fire| fire.with_timezone(&Utc))
            .any(|fire| start < fire && fire <= now)
    }
}
