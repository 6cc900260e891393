use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard};

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, error, info, warn};

use crate::models::{EditorPhase, ScheduleError, ScheduleSnapshot, StagedEdits, TimeSlot};
use crate::services::catalog;
use crate::services::gateway::ScheduleGateway;
use crate::services::reconciler;

struct EditorState {
    snapshot: ScheduleSnapshot,
    staged: StagedEdits,
    selected_date: NaiveDate,
    working: BTreeSet<TimeSlot>,
    submitting: bool,
    active: bool,
}

impl EditorState {
    fn refresh_working(&mut self) {
        self.working =
            reconciler::derive_working_selection(&self.snapshot, &self.staged, self.selected_date)
                .into_slots();
    }
}

/// One nurse's schedule-editing session: the confirmed snapshot, the staged
/// per-date ledger and the working selection for the currently selected
/// date. Reconciliation itself lives in the pure `reconciler` functions; this
/// type owns the state and the workflow around them.
///
/// The state sits behind a mutex that is never held across an await, so the
/// single-flight submission guard and the teardown check stay observable
/// while a gateway call is in flight.
pub struct ScheduleEditor<G> {
    gateway: G,
    today: NaiveDate,
    state: Mutex<EditorState>,
}

impl<G: ScheduleGateway> ScheduleEditor<G> {
    /// `today` anchors every lead-time decision for the session's lifetime.
    pub fn new(gateway: G, today: NaiveDate) -> Self {
        Self {
            gateway,
            today,
            state: Mutex::new(EditorState {
                snapshot: ScheduleSnapshot::default(),
                staged: StagedEdits::default(),
                selected_date: today,
                working: BTreeSet::new(),
                submitting: false,
                active: true,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, EditorState> {
        self.state.lock().expect("editor state lock poisoned")
    }

    /// Reads the confirmed schedule and replaces the snapshot wholesale. On
    /// failure the previous snapshot (possibly empty) stays in place and the
    /// caller may simply retry.
    pub async fn load(&self) -> Result<(), ScheduleError> {
        {
            let state = self.state();
            if !state.active {
                return Err(ScheduleError::EditorClosed);
            }
        }

        let times = self.gateway.fetch_schedule().await.map_err(|e| {
            error!("Failed to fetch confirmed schedule: {}", e);
            ScheduleError::Gateway(e.to_string())
        })?;

        let snapshot = ScheduleSnapshot::from_times(times)?;

        let mut state = self.state();
        // the session may have been closed while the read was in flight
        if !state.active {
            debug!("Editor closed during load; discarding the snapshot");
            return Ok(());
        }

        debug!(
            "Loaded snapshot with {} slots across {} dates",
            snapshot.slot_count(),
            snapshot.dates().count()
        );
        state.snapshot = snapshot;
        state.refresh_working();
        Ok(())
    }

    /// Allowed in every phase; only moves the cursor and recomputes the
    /// working selection.
    pub fn select_date(&self, date: NaiveDate) {
        let mut state = self.state();
        state.selected_date = date;
        state.refresh_working();
    }

    /// Flips one slot in the working selection of the selected date.
    pub fn toggle_slot(&self, slot: TimeSlot) -> Result<(), ScheduleError> {
        let mut state = self.state();
        self.ensure_editable(&state)?;

        if !state.working.remove(&slot) {
            state.working.insert(slot);
        }
        Ok(())
    }

    /// Select-all / clear-all over the whole catalog for the selected date.
    pub fn set_all_slots(&self, select: bool) -> Result<(), ScheduleError> {
        let mut state = self.state();
        self.ensure_editable(&state)?;

        state.working = if select {
            catalog::time_slots().into_iter().collect()
        } else {
            BTreeSet::new()
        };
        Ok(())
    }

    /// Writes the working selection into the ledger under the selected date.
    /// An empty selection is staged as an explicit "delete this date".
    pub fn stage_current_date(&self) -> Result<(), ScheduleError> {
        let mut state = self.state();
        self.ensure_editable(&state)?;

        debug!(
            "Staging {} slots for {}",
            state.working.len(),
            state.selected_date
        );
        let slots = state.working.clone();
        let date = state.selected_date;
        state.staged.stage(date, slots);
        Ok(())
    }

    /// Clears the working selection only; an existing ledger entry for the
    /// date survives until the user stages again.
    pub fn reset_current_date(&self) -> Result<(), ScheduleError> {
        let mut state = self.state();
        self.ensure_editable(&state)?;

        state.working.clear();
        Ok(())
    }

    /// Flattens snapshot + ledger and full-replaces the confirmed schedule.
    /// Single-flight: a second call while one is pending is rejected, never
    /// queued behind the first. An empty flatten result is a valid "clear
    /// entire schedule" request.
    pub async fn submit_all(&self) -> Result<(), ScheduleError> {
        let flattened: Vec<NaiveDateTime> = {
            let mut state = self.state();
            if !state.active {
                return Err(ScheduleError::EditorClosed);
            }
            if state.submitting {
                warn!("Rejected schedule submission: another one is in flight");
                return Err(ScheduleError::SubmissionInFlight);
            }
            state.submitting = true;

            reconciler::flatten_for_submission(&state.snapshot, &state.staged)
                .into_iter()
                .collect()
        };
        debug!("Submitting schedule with {} slots", flattened.len());

        let outcome = self.gateway.submit_schedule(&flattened).await;

        let mut state = self.state();
        state.submitting = false;

        // the session may have been closed while the write was in flight; a
        // closed session's ledger and snapshot must not be touched
        if !state.active {
            debug!("Editor closed during submission; discarding the result");
            return outcome.map_err(|e| ScheduleError::Gateway(e.to_string()));
        }

        match outcome {
            Ok(()) => {
                state.staged.clear();
                state.snapshot = ScheduleSnapshot::from_times(flattened)?;
                state.refresh_working();
                info!("Schedule submission confirmed");
                Ok(())
            }
            Err(e) => {
                error!("Schedule submission failed, staged edits kept: {}", e);
                Err(ScheduleError::Gateway(e.to_string()))
            }
        }
    }

    /// Tears the session down. Further mutations and submissions are
    /// rejected; an already in-flight call finishes without writing back.
    pub fn close(&self) {
        self.state().active = false;
    }

    pub fn phase(&self) -> EditorPhase {
        let state = self.state();
        if state.submitting {
            EditorPhase::Submitting
        } else if reconciler::has_any_pending_change(&state.snapshot, &state.staged) {
            EditorPhase::Dirty
        } else {
            EditorPhase::Idle
        }
    }

    pub fn selected_date(&self) -> NaiveDate {
        self.state().selected_date
    }

    pub fn working_selection(&self) -> BTreeSet<TimeSlot> {
        self.state().working.clone()
    }

    pub fn snapshot(&self) -> ScheduleSnapshot {
        self.state().snapshot.clone()
    }

    pub fn staged(&self) -> StagedEdits {
        self.state().staged.clone()
    }

    /// Submit enablement: true iff some staged date differs from the
    /// snapshot. Unstaged working-selection toggles do not count.
    pub fn has_unsaved_changes(&self) -> bool {
        let state = self.state();
        reconciler::has_any_pending_change(&state.snapshot, &state.staged)
    }

    /// Stage enablement for the selected date: compares the working
    /// selection against its reference (the staged entry when present, else
    /// the snapshot's slots for the date).
    pub fn has_current_date_changes(&self) -> bool {
        let state = self.state();
        let reference = match state.staged.entry(state.selected_date) {
            Some(slots) => slots.clone(),
            None => state.snapshot.slots_on(state.selected_date),
        };
        reconciler::has_date_level_change(&reference, &state.working)
    }

    pub fn is_selected_date_blocked(&self) -> bool {
        catalog::is_edit_blocked(self.state().selected_date, self.today)
    }

    /// Calendar-cell marker: confirmed slots only, staged edits excluded.
    pub fn has_schedule_on(&self, date: NaiveDate) -> bool {
        self.state().snapshot.has_slots_on(date)
    }

    /// Pending per-date summary in date order, for the "about to be saved"
    /// panel. An empty slot list renders as a full deletion of that date.
    pub fn staged_summary(&self) -> Vec<(NaiveDate, Vec<TimeSlot>)> {
        self.state()
            .staged
            .iter()
            .map(|(date, slots)| (date, slots.iter().copied().collect()))
            .collect()
    }

    fn ensure_editable(&self, state: &EditorState) -> Result<(), ScheduleError> {
        if !state.active {
            return Err(ScheduleError::EditorClosed);
        }
        if catalog::is_edit_blocked(state.selected_date, self.today) {
            warn!(
                "Rejected edit on {}: inside the {}-day lead window",
                state.selected_date,
                catalog::EDIT_LEAD_TIME_DAYS
            );
            return Err(ScheduleError::EditWindowClosed(state.selected_date));
        }
        Ok(())
    }
}
