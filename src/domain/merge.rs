use crate::domain::models::{PartialSnapshot, PomodoroRecord, Task};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MergedData {
    pub tasks: Vec<Task>,
    pub records: Vec<PomodoroRecord>,
}

/// Union of both task lists keyed by id. When an id exists on both sides the
/// copy with the later `updated_at` wins and local wins ties. Sorted by `order`.
pub fn reconcile_tasks(local: &[Task], remote: &[Task]) -> Vec<Task> {
    let mut merged: HashMap<&str, &Task> = HashMap::with_capacity(local.len() + remote.len());
    for task in remote {
        merged.insert(task.id.as_str(), task);
    }
    for task in local {
        let remote_is_newer = merged
            .get(task.id.as_str())
            .is_some_and(|existing| existing.updated_at > task.updated_at);
        if !remote_is_newer {
            merged.insert(task.id.as_str(), task);
        }
    }

    let mut tasks = merged.into_values().cloned().collect::<Vec<_>>();
    tasks.sort_by(|left, right| {
        left.order
            .cmp(&right.order)
            .then_with(|| left.created_at.cmp(&right.created_at))
            .then_with(|| left.id.cmp(&right.id))
    });
    tasks
}

/// Union of both record lists keyed by id. Records are immutable once created,
/// so a shared id keeps the local copy. Sorted newest first.
pub fn reconcile_records(local: &[PomodoroRecord], remote: &[PomodoroRecord]) -> Vec<PomodoroRecord> {
    let mut merged: HashMap<&str, &PomodoroRecord> =
        HashMap::with_capacity(local.len() + remote.len());
    for record in remote.iter().chain(local.iter()) {
        merged.insert(record.id.as_str(), record);
    }

    let mut records = merged.into_values().cloned().collect::<Vec<_>>();
    records.sort_by(|left, right| {
        right
            .start_time
            .cmp(&left.start_time)
            .then_with(|| left.id.cmp(&right.id))
    });
    records
}

pub fn reconcile(
    local_tasks: &[Task],
    local_records: &[PomodoroRecord],
    remote: Option<&PartialSnapshot>,
) -> MergedData {
    let remote_tasks = remote
        .and_then(|snapshot| snapshot.tasks.as_deref())
        .unwrap_or_default();
    let remote_records = remote
        .and_then(|snapshot| snapshot.records.as_deref())
        .unwrap_or_default();

    MergedData {
        tasks: reconcile_tasks(local_tasks, remote_tasks),
        records: reconcile_records(local_records, remote_records),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn task(id: &str, updated_at: DateTime<Utc>, order: i64, title: &str) -> Task {
        Task {
            id: id.to_string(),
            title: title.to_string(),
            tags: Vec::new(),
            completed: false,
            estimated_pomodoros: 1,
            completed_pomodoros: 0,
            reminder_time: None,
            reminder_content: None,
            created_at: fixed_time("2023-12-01T00:00:00Z"),
            updated_at,
            in_progress: false,
            order,
        }
    }

    fn record(id: &str, start_time: DateTime<Utc>) -> PomodoroRecord {
        PomodoroRecord {
            id: id.to_string(),
            task_id: String::new(),
            task_title: format!("record {id}"),
            tags: Vec::new(),
            start_time,
            end_time: PomodoroRecord::end_time_for(start_time, 25),
            duration: 25,
            completed: true,
            note: None,
        }
    }

    #[test]
    fn newer_remote_task_wins() {
        let local = vec![task("A", fixed_time("2024-01-01T00:00:00Z"), 0, "local")];
        let remote = vec![task("A", fixed_time("2024-01-02T00:00:00Z"), 0, "remote")];

        let merged = reconcile_tasks(&local, &remote);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].updated_at, fixed_time("2024-01-02T00:00:00Z"));
        assert_eq!(merged[0].title, "remote");
    }

    #[test]
    fn local_task_wins_ties() {
        let at = fixed_time("2024-01-01T00:00:00Z");
        let merged = reconcile_tasks(&[task("A", at, 0, "local")], &[task("A", at, 0, "remote")]);
        assert_eq!(merged[0].title, "local");
    }

    #[test]
    fn merged_tasks_sorted_by_order() {
        let at = fixed_time("2024-01-01T00:00:00Z");
        let local = vec![task("A", at, 2, "a"), task("B", at, 0, "b")];
        let remote = vec![task("C", at, 1, "c")];
        let ids = reconcile_tasks(&local, &remote)
            .into_iter()
            .map(|task| task.id)
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["B", "C", "A"]);
    }

    #[test]
    fn shared_record_ids_collapse() {
        let start = fixed_time("2024-01-01T09:00:00Z");
        let local = vec![record("R1", start)];
        let remote = vec![record("R1", start), record("R2", start + Duration::hours(1))];

        let merged = reconcile_records(&local, &remote);
        let ids = merged.iter().map(|record| record.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["R2", "R1"]);
    }

    #[test]
    fn absent_remote_keeps_local() {
        let at = fixed_time("2024-01-01T00:00:00Z");
        let local_tasks = vec![task("A", at, 0, "a")];
        let local_records = vec![record("R1", at)];
        let merged = reconcile(&local_tasks, &local_records, None);
        assert_eq!(merged.tasks, local_tasks);
        assert_eq!(merged.records, local_records);
    }

    #[test]
    fn remote_snapshot_without_records_merges_tasks_only() {
        let at = fixed_time("2024-01-01T00:00:00Z");
        let remote = PartialSnapshot {
            tasks: Some(vec![task("B", at, 1, "b")]),
            ..PartialSnapshot::default()
        };
        let merged = reconcile(&[task("A", at, 0, "a")], &[record("R1", at)], Some(&remote));
        assert_eq!(merged.tasks.len(), 2);
        assert_eq!(merged.records.len(), 1);
    }

    fn task_strategy() -> impl Strategy<Value = Task> {
        ("[A-E]", 0i64..5, 0i64..1_000).prop_map(|(id, order, minutes)| {
            let updated_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                + Duration::minutes(minutes);
            task(&id, updated_at, order, &format!("{id}-{minutes}"))
        })
    }

    fn unique_by_id(tasks: Vec<Task>) -> Vec<Task> {
        let mut seen = HashSet::new();
        tasks
            .into_iter()
            .filter(|task| seen.insert(task.id.clone()))
            .collect()
    }

    proptest! {
        #[test]
        fn merged_tasks_are_the_id_union_and_newest_wins(
            local in proptest::collection::vec(task_strategy(), 0..6),
            remote in proptest::collection::vec(task_strategy(), 0..6)
        ) {
            let local = unique_by_id(local);
            let remote = unique_by_id(remote);
            let merged = reconcile_tasks(&local, &remote);

            let expected_ids = local
                .iter()
                .chain(remote.iter())
                .map(|task| task.id.clone())
                .collect::<HashSet<_>>();
            let merged_ids = merged.iter().map(|task| task.id.clone()).collect::<HashSet<_>>();
            prop_assert_eq!(merged.len(), expected_ids.len());
            prop_assert_eq!(merged_ids, expected_ids);

            for merged_task in &merged {
                let local_copy = local.iter().find(|task| task.id == merged_task.id);
                let remote_copy = remote.iter().find(|task| task.id == merged_task.id);
                let expected = match (local_copy, remote_copy) {
                    (Some(l), Some(r)) if l.updated_at >= r.updated_at => l,
                    (Some(_), Some(r)) => r,
                    (Some(l), None) => l,
                    (None, Some(r)) => r,
                    (None, None) => unreachable!("merged id must come from an input"),
                };
                prop_assert_eq!(merged_task, expected);
            }

            prop_assert!(merged.windows(2).all(|pair| pair[0].order <= pair[1].order));
        }

        #[test]
        fn merged_records_hold_one_copy_per_id(
            local_ids in proptest::collection::hash_set("[a-f]", 0..6),
            remote_ids in proptest::collection::hash_set("[a-f]", 0..6)
        ) {
            let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
            let to_records = |ids: &HashSet<String>| {
                ids.iter()
                    .map(|id| record(id, start + Duration::minutes(id.as_bytes()[0] as i64)))
                    .collect::<Vec<_>>()
            };
            let merged = reconcile_records(&to_records(&local_ids), &to_records(&remote_ids));

            let expected = local_ids.union(&remote_ids).cloned().collect::<HashSet<_>>();
            let merged_ids = merged.iter().map(|record| record.id.clone()).collect::<HashSet<_>>();
            prop_assert_eq!(merged.len(), expected.len());
            prop_assert_eq!(merged_ids, expected);
            prop_assert!(merged.windows(2).all(|pair| pair[0].start_time >= pair[1].start_time));
        }
    }
}
