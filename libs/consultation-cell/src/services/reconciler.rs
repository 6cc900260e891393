//! Pure reconciliation over the snapshot, the staged ledger and one selected
//! date. Nothing here performs I/O or mutates its inputs.

use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime};

use crate::models::{DaySelection, ScheduleSnapshot, StagedEdits, TimeSlot};

/// Selection precedence for a date: a staged entry is used verbatim, else the
/// snapshot's slots for that date, else nothing.
pub fn derive_working_selection(
    snapshot: &ScheduleSnapshot,
    staged: &StagedEdits,
    date: NaiveDate,
) -> DaySelection {
    if let Some(slots) = staged.entry(date) {
        return DaySelection::Staged(slots.clone());
    }

    if snapshot.has_slots_on(date) {
        return DaySelection::FromSnapshot(snapshot.slots_on(date));
    }

    DaySelection::Empty
}

/// Order-independent comparison of two slot sets for one date.
pub fn has_date_level_change(
    reference: &BTreeSet<TimeSlot>,
    working: &BTreeSet<TimeSlot>,
) -> bool {
    reference != working
}

/// Whether any staged date actually differs from the snapshot. An empty
/// ledger reports no pending change: staging is the only way into dirtiness,
/// so unstaged toggles on the working selection are invisible here.
pub fn has_any_pending_change(snapshot: &ScheduleSnapshot, staged: &StagedEdits) -> bool {
    staged
        .iter()
        .any(|(date, slots)| has_date_level_change(&snapshot.slots_on(date), slots))
}

/// Flattens snapshot + ledger into the full-replace submission set. Every
/// snapshot timestamp whose date is staged is dropped first, then staged
/// entries are expanded; a staged empty set therefore deletes its date.
pub fn flatten_for_submission(
    snapshot: &ScheduleSnapshot,
    staged: &StagedEdits,
) -> BTreeSet<NaiveDateTime> {
    let mut result = BTreeSet::new();

    for (date, slots) in snapshot.iter() {
        if staged.covers(date) {
            continue;
        }
        for slot in slots {
            result.insert(slot.at(date));
        }
    }

    for (date, slots) in staged.iter() {
        for slot in slots {
            result.insert(slot.at(date));
        }
    }

    result
}
