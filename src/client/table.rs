//! Optimistic attendance table.
//!
//! Each row has a `committed` status (the last value the server confirmed) and,
//! while a write is outstanding, an overlay entry holding the `pending` value
//! and the rollback snapshot. The displayed status is `pending` if present,
//! else `committed`.
//!
//! Writes for one child are serialized: a change made while a write is in
//! flight is displayed at once and queued (latest wins), then dispatched when
//! the in-flight write settles. Children never affect each other.

use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::{debug, warn};

use super::api::ApiError;
use crate::model::attendance::{AttendanceRecord, AttendanceStatus, MarkAttendance};

/// Where a failed write reverts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RollbackPolicy {
    /// The last status the server confirmed.
    #[default]
    LastCommitted,
    /// Whatever was displayed when the change was made, which may itself be
    /// an unconfirmed value.
    LastDisplayed,
}

/// A mutation the caller must send. Hand it back to [`AttendanceTable::confirm`]
/// or [`AttendanceTable::reject`] once it settles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusWrite {
    pub seq: u64,
    pub request: MarkAttendance,
}

#[derive(Debug)]
struct Queued {
    request: MarkAttendance,
    rollback: Option<AttendanceStatus>,
}

#[derive(Debug)]
struct Overlay {
    pending: AttendanceStatus,
    rollback: Option<AttendanceStatus>,
    in_flight: u64,
    queued: Option<Queued>,
}

#[derive(Debug, Default)]
pub struct AttendanceTable {
    policy: RollbackPolicy,
    date: Option<NaiveDate>,
    rows: Vec<AttendanceRecord>,
    index: HashMap<u64, usize>,
    overlay: HashMap<u64, Overlay>,
    next_seq: u64,
}

impl AttendanceTable {
    pub fn new(policy: RollbackPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    /// Replace the committed rows with a fresh fetch. A date change drops every
    /// overlay entry; their writes will be ignored when they settle.
    pub fn load(&mut self, date: NaiveDate, records: Vec<AttendanceRecord>) {
        if self.date != Some(date) && !self.overlay.is_empty() {
            debug!(dropped = self.overlay.len(), %date, "Date changed, discarding in-flight overlays");
            self.overlay.clear();
        }
        self.date = Some(date);
        self.index = records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.child_id, i))
            .collect();
        self.rows = records;
    }

    pub fn committed(&self, child_id: u64) -> Option<AttendanceStatus> {
        self.index
            .get(&child_id)
            .and_then(|&i| self.rows[i].status)
    }

    pub fn displayed(&self, child_id: u64) -> Option<AttendanceStatus> {
        match self.overlay.get(&child_id) {
            Some(entry) => Some(entry.pending),
            None => self.committed(child_id),
        }
    }

    pub fn is_pending(&self, child_id: u64) -> bool {
        self.overlay.contains_key(&child_id)
    }

    /// Rollback snapshot of the in-flight write, if any.
    pub fn rollback_value(&self, child_id: u64) -> Option<Option<AttendanceStatus>> {
        self.overlay.get(&child_id).map(|entry| entry.rollback)
    }

    /// Rows as they should be rendered.
    pub fn rows(&self) -> Vec<AttendanceRecord> {
        self.rows
            .iter()
            .map(|row| AttendanceRecord {
                status: self.displayed(row.child_id),
                ..row.clone()
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Apply a status change locally. Returns the write to send, or `None` when
    /// it was queued behind an in-flight write for the same child.
    pub fn change_status(
        &mut self,
        child_id: u64,
        group_id: u64,
        status: &str,
    ) -> Result<Option<StatusWrite>, ApiError> {
        let status: AttendanceStatus = status.parse().map_err(|_| {
            ApiError::validation(format!(
                "Invalid status \"{status}\": must be one of {}",
                AttendanceStatus::VALUES.join(", ")
            ))
        })?;
        let date = self
            .date
            .ok_or_else(|| ApiError::validation("Load an attendance date first"))?;

        let rollback = match self.policy {
            RollbackPolicy::LastCommitted => self.committed(child_id),
            RollbackPolicy::LastDisplayed => self.displayed(child_id),
        };
        let request = MarkAttendance {
            children_id: child_id,
            group_id,
            date,
            status,
        };

        if let Some(entry) = self.overlay.get_mut(&child_id) {
            entry.pending = status;
            entry.queued = Some(Queued { request, rollback });
            debug!(child_id, %status, in_flight = entry.in_flight, "Status change queued");
            return Ok(None);
        }

        let seq = self.bump_seq();
        self.overlay.insert(
            child_id,
            Overlay {
                pending: status,
                rollback,
                in_flight: seq,
                queued: None,
            },
        );
        debug!(child_id, %status, seq, "Status change dispatched");
        Ok(Some(StatusWrite { seq, request }))
    }

    /// The server accepted `write`. Its returned status becomes committed.
    pub fn confirm(&mut self, write: &StatusWrite, record: &AttendanceRecord) -> Option<StatusWrite> {
        let child_id = write.request.children_id;
        if !self.owns(write) {
            debug!(child_id, seq = write.seq, "Ignoring confirmation of a stale write");
            return None;
        }

        if let Some(&i) = self.index.get(&child_id) {
            self.rows[i].status = record.status;
            self.rows[i].updated_at = record.updated_at;
        }
        self.settle(child_id, false)
    }

    /// The server rejected `write`. Without a queued change the row reverts to
    /// the rollback snapshot; otherwise the queued change is dispatched and
    /// stays displayed.
    pub fn reject(&mut self, write: &StatusWrite) -> Option<StatusWrite> {
        let child_id = write.request.children_id;
        if !self.owns(write) {
            debug!(child_id, seq = write.seq, "Ignoring failure of a stale write");
            return None;
        }
        warn!(child_id, seq = write.seq, "Status change failed");
        self.settle(child_id, true)
    }

    fn owns(&self, write: &StatusWrite) -> bool {
        self.overlay
            .get(&write.request.children_id)
            .is_some_and(|entry| entry.in_flight == write.seq)
    }

    fn settle(&mut self, child_id: u64, failed: bool) -> Option<StatusWrite> {
        let mut entry = self.overlay.remove(&child_id)?;

        let Some(queued) = entry.queued.take() else {
            if failed {
                if let Some(&i) = self.index.get(&child_id) {
                    self.rows[i].status = entry.rollback;
                }
            }
            return None;
        };

        let rollback = match self.policy {
            RollbackPolicy::LastCommitted => self.committed(child_id),
            RollbackPolicy::LastDisplayed => queued.rollback,
        };
        let seq = self.bump_seq();
        self.overlay.insert(
            child_id,
            Overlay {
                pending: queued.request.status,
                rollback,
                in_flight: seq,
                queued: None,
            },
        );
        debug!(child_id, seq, "Dispatching queued status change");
        Some(StatusWrite {
            seq,
            request: queued.request,
        })
    }

    fn bump_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::AttendanceStatus::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 10).unwrap()
    }

    fn record(child_id: u64, status: Option<AttendanceStatus>) -> AttendanceRecord {
        AttendanceRecord {
            child_id,
            child_name: format!("Child {child_id}"),
            group_id: 5,
            date: day(),
            status,
            updated_at: None,
        }
    }

    fn table(policy: RollbackPolicy) -> AttendanceTable {
        let mut table = AttendanceTable::new(policy);
        table.load(day(), vec![record(1, None), record(2, Some(Absent)), record(3, Some(Late))]);
        table
    }

    #[test]
    fn untouched_rows_show_committed_status() {
        let table = table(RollbackPolicy::LastCommitted);
        assert_eq!(table.displayed(1), None);
        assert_eq!(table.displayed(2), Some(Absent));
        assert_eq!(
            table.rows().iter().map(|r| r.status).collect::<Vec<_>>(),
            [None, Some(Absent), Some(Late)]
        );
    }

    #[test]
    fn change_is_visible_before_the_write_settles() {
        let mut table = table(RollbackPolicy::LastCommitted);
        let write = table.change_status(1, 5, "present").unwrap().unwrap();

        assert_eq!(table.displayed(1), Some(Present));
        assert_eq!(table.committed(1), None);
        assert_eq!(write.request.children_id, 1);
        assert_eq!(write.request.date, day());
        assert_eq!(write.request.status, Present);
    }

    #[test]
    fn success_clears_overlay_and_commits_server_value() {
        let mut table = table(RollbackPolicy::LastCommitted);
        let write = table.change_status(2, 5, "late").unwrap().unwrap();

        let next = table.confirm(&write, &record(2, Some(Late)));
        assert!(next.is_none());
        assert!(!table.is_pending(2));
        assert_eq!(table.rollback_value(2), None);
        assert_eq!(table.committed(2), Some(Late));
    }

    #[test]
    fn failure_reverts_to_unmarked() {
        let mut table = table(RollbackPolicy::LastCommitted);
        let write = table.change_status(1, 5, "present").unwrap().unwrap();
        assert_eq!(table.rollback_value(1), Some(None));

        assert!(table.reject(&write).is_none());
        assert_eq!(table.displayed(1), None);
        assert!(!table.is_pending(1));
        // neighbours are untouched
        assert_eq!(table.displayed(2), Some(Absent));
    }

    #[test]
    fn invalid_status_changes_nothing() {
        let mut table = table(RollbackPolicy::LastCommitted);
        let err = table.change_status(2, 5, "Present").unwrap_err();

        assert_eq!(err.status, 0);
        assert!(err.message.contains("present, absent, late"));
        assert_eq!(table.displayed(2), Some(Absent));
        assert!(!table.is_pending(2));
    }

    #[test]
    fn change_before_load_is_rejected() {
        let mut table = AttendanceTable::new(RollbackPolicy::LastCommitted);
        assert!(table.change_status(1, 5, "present").is_err());
    }

    #[test]
    fn overlapping_changes_roll_back_to_committed() {
        let mut table = table(RollbackPolicy::LastCommitted);
        let first = table.change_status(1, 5, "present").unwrap().unwrap();
        assert!(table.change_status(1, 5, "late").unwrap().is_none());
        assert_eq!(table.displayed(1), Some(Late));

        let second = table.reject(&first).unwrap();
        assert_eq!(second.request.status, Late);
        assert_eq!(table.displayed(1), Some(Late));

        table.reject(&second);
        assert_eq!(table.displayed(1), None);
    }

    #[test]
    fn queued_change_rolls_back_to_value_confirmed_by_first_write() {
        let mut table = table(RollbackPolicy::LastCommitted);
        let first = table.change_status(1, 5, "present").unwrap().unwrap();
        table.change_status(1, 5, "absent").unwrap();
        table.change_status(1, 5, "late").unwrap();

        let second = table.confirm(&first, &record(1, Some(Present))).unwrap();
        assert_eq!(second.request.status, Late);
        assert_eq!(table.rollback_value(1), Some(Some(Present)));

        table.reject(&second);
        assert_eq!(table.displayed(1), Some(Present));
    }

    #[test]
    fn last_displayed_policy_chains_rollbacks() {
        let mut table = table(RollbackPolicy::LastDisplayed);
        let first = table.change_status(1, 5, "present").unwrap().unwrap();
        table.change_status(1, 5, "late").unwrap();

        let second = table.reject(&first).unwrap();
        table.reject(&second);
        assert_eq!(table.displayed(1), Some(Present));
    }

    #[test]
    fn children_settle_independently() {
        let mut table = table(RollbackPolicy::LastCommitted);
        let a = table.change_status(1, 5, "present").unwrap().unwrap();
        let b = table.change_status(3, 5, "absent").unwrap().unwrap();

        table.confirm(&b, &record(3, Some(Absent)));
        table.reject(&a);

        assert_eq!(table.displayed(1), None);
        assert_eq!(table.displayed(3), Some(Absent));
    }

    #[test]
    fn date_change_discards_in_flight_writes() {
        let mut table = table(RollbackPolicy::LastCommitted);
        let write = table.change_status(1, 5, "present").unwrap().unwrap();

        let next_day = day().succ_opt().unwrap();
        table.load(next_day, vec![AttendanceRecord { date: next_day, ..record(1, None) }]);
        assert!(!table.is_pending(1));

        assert!(table.confirm(&write, &record(1, Some(Present))).is_none());
        assert_eq!(table.displayed(1), None);
    }

    #[test]
    fn refetch_keeps_in_flight_overlay() {
        let mut table = table(RollbackPolicy::LastCommitted);
        table.change_status(2, 5, "present").unwrap();

        table.load(day(), vec![record(1, None), record(2, Some(Absent))]);
        assert_eq!(table.displayed(2), Some(Present));
        assert_eq!(table.len(), 2);
    }
}
