//! Offline comparison of the group records in the two stores.

use std::collections::BTreeMap;

use tally_store::{AlertSink, ConsistencyAlert, GroupStore};
use tally_types::GroupMembership;

use crate::CoordinatorError;

/// Result of a full reconciliation scan.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub groups_checked: usize,
    /// One `RecordDrift` alert per disagreeing group.
    pub drifts: Vec<ConsistencyAlert>,
}

impl ReconcileReport {
    pub fn is_consistent(&self) -> bool {
        self.drifts.is_empty()
    }
}

/// Compare every group record in `authoritative` and `shadow`.
///
/// `updated_at` is ignored. Groups are compared by their vote multiset, so
/// the order in which concurrent joins landed does not count as drift. Each
/// drift is also reported to `alerts`.
pub fn scan<A, B>(
    authoritative: &A,
    shadow: &B,
    alerts: &dyn AlertSink,
) -> Result<ReconcileReport, CoordinatorError>
where
    A: GroupStore,
    B: GroupStore,
{
    let a_groups = keyed(
        authoritative
            .iter_groups()
            .map_err(CoordinatorError::authoritative)?,
    );
    let b_groups = keyed(shadow.iter_groups().map_err(CoordinatorError::shadow)?);

    let mut drifts = Vec::new();
    let mut groups_checked = 0;
    for (key, a) in &a_groups {
        groups_checked += 1;
        let detail = match b_groups.get(key) {
            None => Some("missing in shadow store".to_string()),
            Some(b) => group_drift(a, b),
        };
        if let Some(detail) = detail {
            drifts.push(ConsistencyAlert::RecordDrift {
                key: key.clone(),
                detail,
            });
        }
    }
    for key in b_groups.keys().filter(|k| !a_groups.contains_key(*k)) {
        groups_checked += 1;
        drifts.push(ConsistencyAlert::RecordDrift {
            key: key.clone(),
            detail: "missing in authoritative store".to_string(),
        });
    }

    for drift in &drifts {
        alerts.report(drift.clone());
    }
    tracing::info!(
        groups = groups_checked,
        drifts = drifts.len(),
        "reconciliation scan complete"
    );
    Ok(ReconcileReport {
        groups_checked,
        drifts,
    })
}

fn keyed(groups: Vec<GroupMembership>) -> BTreeMap<String, GroupMembership> {
    groups.into_iter().map(|g| (g.id.to_string(), g)).collect()
}

fn group_drift(a: &GroupMembership, b: &GroupMembership) -> Option<String> {
    if a.meeting_id != b.meeting_id {
        return Some(format!(
            "meeting_id authoritative={} shadow={}",
            a.meeting_id, b.meeting_id
        ));
    }
    (a.sorted_votes() != b.sorted_votes()).then(|| {
        format!(
            "votes authoritative={} shadow={}",
            a.voter_ids.len(),
            b.voter_ids.len()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_nullables::{NullAlertSink, NullStore};
    use tally_types::{GroupId, MeetingId, Timestamp, UserId};

    fn group(id: &str, votes: &[&str], at: u64) -> GroupMembership {
        let mut g = GroupMembership::new(
            GroupId::new(id).unwrap(),
            MeetingId::new("m1").unwrap(),
            Timestamp::from_millis(at),
        );
        g.voter_ids = votes.iter().map(|v| UserId::new(*v).unwrap()).collect();
        g
    }

    #[test]
    fn vote_order_and_timestamps_are_not_drift() {
        let (a, b, sink) = (NullStore::new(), NullStore::new(), NullAlertSink::new());
        a.put_group(&group("g1", &["x", "y"], 1)).unwrap();
        b.put_group(&group("g1", &["y", "x"], 99)).unwrap();
        let report = scan(&a, &b, &sink).unwrap();
        assert!(report.is_consistent());
        assert_eq!(report.groups_checked, 1);
        assert_eq!(sink.count(), 0);
    }

    #[test]
    fn drifts_are_reported() {
        let (a, b, sink) = (NullStore::new(), NullStore::new(), NullAlertSink::new());
        a.put_group(&group("g1", &["x", "x"], 0)).unwrap();
        b.put_group(&group("g1", &["x"], 0)).unwrap();
        b.put_group(&group("g2", &[], 0)).unwrap();

        let report = scan(&a, &b, &sink).unwrap();
        assert_eq!(report.drifts.len(), 2);
        assert_eq!(report.groups_checked, 2);
        assert_eq!(sink.alerts(), report.drifts);
        assert!(report.drifts.iter().any(|d| matches!(
            d,
            ConsistencyAlert::RecordDrift { key, detail }
                if key == "g2" && detail == "missing in authoritative store"
        )));
    }
}
