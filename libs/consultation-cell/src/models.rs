use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// One half-hour consultation slot within the working day. Only the 18 times
/// from 09:00 to 17:30 at 30-minute spacing are representable; constructors
/// reject everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeSlot(NaiveTime);

const SLOT_LABEL_FORMAT: &str = "%H:%M";

impl TimeSlot {
    pub const FIRST_HOUR: u32 = 9;
    pub const LAST_HOUR: u32 = 17;
    pub const INTERVAL_MINUTES: u32 = 30;

    fn is_catalog_time(time: NaiveTime) -> bool {
        time.second() == 0
            && time.nanosecond() == 0
            && time.minute() % Self::INTERVAL_MINUTES == 0
            && (Self::FIRST_HOUR..=Self::LAST_HOUR).contains(&time.hour())
    }

    /// Accepts only times that fall on the fixed catalog.
    pub fn from_time(time: NaiveTime) -> Option<Self> {
        Self::is_catalog_time(time).then_some(Self(time))
    }

    /// Parses a display label like "09:30".
    pub fn from_label(label: &str) -> Result<Self, ScheduleError> {
        NaiveTime::parse_from_str(label, SLOT_LABEL_FORMAT)
            .ok()
            .and_then(Self::from_time)
            .ok_or_else(|| ScheduleError::UnknownSlotLabel(label.to_string()))
    }

    pub fn time(&self) -> NaiveTime {
        self.0
    }

    pub fn label(&self) -> String {
        self.0.format(SLOT_LABEL_FORMAT).to_string()
    }

    /// Combines this slot with a calendar date into an absolute timestamp.
    pub fn at(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.0)
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(SLOT_LABEL_FORMAT))
    }
}

// Slots travel to hosts in their label form.
impl Serialize for TimeSlot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label())
    }
}

impl<'de> Deserialize<'de> for TimeSlot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        TimeSlot::from_label(&label).map_err(serde::de::Error::custom)
    }
}

/// Last known server-confirmed schedule, grouped per calendar date. Grouping
/// happens once at ingestion; duplicate timestamps collapse and no date maps
/// to an empty set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScheduleSnapshot {
    days: BTreeMap<NaiveDate, BTreeSet<TimeSlot>>,
}

impl ScheduleSnapshot {
    /// Builds a snapshot from gateway timestamps. A timestamp whose
    /// time-of-day is off the slot catalog is a contract violation and fails
    /// the whole ingestion.
    pub fn from_times(
        times: impl IntoIterator<Item = NaiveDateTime>,
    ) -> Result<Self, ScheduleError> {
        let mut days: BTreeMap<NaiveDate, BTreeSet<TimeSlot>> = BTreeMap::new();

        for timestamp in times {
            let slot = TimeSlot::from_time(timestamp.time())
                .ok_or(ScheduleError::OffCatalogTimestamp(timestamp))?;
            days.entry(timestamp.date()).or_default().insert(slot);
        }

        Ok(Self { days })
    }

    pub fn slots_on(&self, date: NaiveDate) -> BTreeSet<TimeSlot> {
        self.days.get(&date).cloned().unwrap_or_default()
    }

    pub fn has_slots_on(&self, date: NaiveDate) -> bool {
        self.days.contains_key(&date)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &BTreeSet<TimeSlot>)> {
        self.days.iter().map(|(date, slots)| (*date, slots))
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.days.keys().copied()
    }

    /// Flattens the snapshot back into absolute timestamps.
    pub fn timestamps(&self) -> BTreeSet<NaiveDateTime> {
        self.iter()
            .flat_map(|(date, slots)| slots.iter().map(move |slot| slot.at(date)))
            .collect()
    }

    pub fn slot_count(&self) -> usize {
        self.days.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

/// Per-date edits staged but not yet submitted. An entry fully overrides the
/// snapshot for its date; an empty entry means "delete every slot on this
/// date" and is distinct from the date being absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StagedEdits {
    entries: BTreeMap<NaiveDate, BTreeSet<TimeSlot>>,
}

impl StagedEdits {
    pub fn stage(&mut self, date: NaiveDate, slots: BTreeSet<TimeSlot>) {
        self.entries.insert(date, slots);
    }

    pub fn entry(&self, date: NaiveDate) -> Option<&BTreeSet<TimeSlot>> {
        self.entries.get(&date)
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        self.entries.contains_key(&date)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &BTreeSet<TimeSlot>)> {
        self.entries.iter().map(|(date, slots)| (*date, slots))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Where the working selection for a date came from. Staged edits override
/// the snapshot wholesale; the two are never merged slot-by-slot.
#[derive(Debug, Clone, PartialEq)]
pub enum DaySelection {
    Staged(BTreeSet<TimeSlot>),
    FromSnapshot(BTreeSet<TimeSlot>),
    Empty,
}

impl DaySelection {
    pub fn into_slots(self) -> BTreeSet<TimeSlot> {
        match self {
            DaySelection::Staged(slots) | DaySelection::FromSnapshot(slots) => slots,
            DaySelection::Empty => BTreeSet::new(),
        }
    }

    pub fn is_staged(&self) -> bool {
        matches!(self, DaySelection::Staged(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EditorPhase {
    Idle,
    Dirty,
    Submitting,
}

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Date {0} is inside the edit lead window and cannot be modified")]
    EditWindowClosed(NaiveDate),

    #[error("A schedule submission is already in flight")]
    SubmissionInFlight,

    #[error("Schedule editor has been closed")]
    EditorClosed,

    #[error("Time slot label '{0}' is outside the consultation day catalog")]
    UnknownSlotLabel(String),

    #[error("Timestamp {0} does not align with the consultation slot catalog")]
    OffCatalogTimestamp(NaiveDateTime),

    #[error("Gateway error: {0}")]
    Gateway(String),
}

impl ScheduleError {
    /// Expected, locally-recovered rejections. Hosts render these as inline
    /// notices; they never indicate a fault in the editor or the gateway.
    pub fn is_policy_rejection(&self) -> bool {
        matches!(
            self,
            ScheduleError::EditWindowClosed(_)
                | ScheduleError::SubmissionInFlight
                | ScheduleError::EditorClosed
        )
    }
}
