use chrono::{Duration, NaiveDate, NaiveTime};

use crate::models::TimeSlot;

/// Dates closer to today than this many days are read-only.
pub const EDIT_LEAD_TIME_DAYS: i64 = 3;

/// The fixed consultation-day catalog: 18 slots from 09:00 to 17:30 at
/// 30-minute spacing, in display order.
pub fn time_slots() -> Vec<TimeSlot> {
    let mut slots = Vec::with_capacity(18);
    let mut current = NaiveTime::from_hms_opt(TimeSlot::FIRST_HOUR, 0, 0).unwrap();
    let last = NaiveTime::from_hms_opt(TimeSlot::LAST_HOUR, TimeSlot::INTERVAL_MINUTES, 0).unwrap();

    loop {
        if let Some(slot) = TimeSlot::from_time(current) {
            slots.push(slot);
        }
        if current == last {
            break;
        }
        current = current + Duration::minutes(TimeSlot::INTERVAL_MINUTES as i64);
    }

    slots
}

/// Day-granularity lead-time check: a date is blocked when it falls strictly
/// before today + EDIT_LEAD_TIME_DAYS. Applies whether or not the date
/// already carries confirmed slots.
pub fn is_edit_blocked(date: NaiveDate, today: NaiveDate) -> bool {
    date < today + Duration::days(EDIT_LEAD_TIME_DAYS)
}
