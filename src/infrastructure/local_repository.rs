use crate::domain::models::{AppSettings, PartialSnapshot, PomodoroRecord, Snapshot, Task};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::storage::KeyValueStore;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

pub const TASKS_KEY: &str = "pomodoro_tasks";
pub const RECORDS_KEY: &str = "pomodoro_records";
pub const SETTINGS_KEY: &str = "pomodoro_settings";

/// Typed access to the three persisted collections.
///
/// Settings are always written without the sync token; the token lives in the
/// credential store.
#[derive(Clone)]
pub struct LocalRepository {
    store: Arc<dyn KeyValueStore>,
}

impl LocalRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn load_tasks(&self) -> Result<Vec<Task>, InfraError> {
        Ok(self.read(TASKS_KEY)?.unwrap_or_default())
    }

    pub fn save_tasks(&self, tasks: &[Task]) -> Result<(), InfraError> {
        self.write(TASKS_KEY, &tasks)
    }

    pub fn load_records(&self) -> Result<Vec<PomodoroRecord>, InfraError> {
        Ok(self.read(RECORDS_KEY)?.unwrap_or_default())
    }

    pub fn save_records(&self, records: &[PomodoroRecord]) -> Result<(), InfraError> {
        self.write(RECORDS_KEY, &records)
    }

    pub fn load_settings(&self) -> Result<AppSettings, InfraError> {
        Ok(self.read(SETTINGS_KEY)?.unwrap_or_default())
    }

    pub fn save_settings(&self, settings: &AppSettings) -> Result<(), InfraError> {
        self.write(SETTINGS_KEY, &settings.redacted())
    }

    pub fn export_snapshot(&self, exported_at: DateTime<Utc>) -> Result<Snapshot, InfraError> {
        Ok(Snapshot {
            tasks: self.load_tasks()?,
            records: self.load_records()?,
            settings: self.load_settings()?.redacted(),
            exported_at: Some(exported_at),
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
        })
    }

    /// Overwrites only the collections present in `snapshot`.
    pub fn import_snapshot(&self, snapshot: &PartialSnapshot) -> Result<(), InfraError> {
        if let Some(tasks) = snapshot.tasks.as_deref() {
            self.save_tasks(tasks)?;
        }
        if let Some(records) = snapshot.records.as_deref() {
            self.save_records(records)?;
        }
        if let Some(settings) = snapshot.settings.as_ref() {
            self.save_settings(settings)?;
        }
        Ok(())
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, InfraError> {
        let Some(value) = self.store.get(key)? else {
            return Ok(None);
        };
        serde_json::from_value(value)
            .map(Some)
            .map_err(|error| InfraError::Parse(format!("stored '{key}' has an unexpected shape: {error}")))
    }

    fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), InfraError> {
        self.store.set(key, &serde_json::to_value(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::InMemoryKeyValueStore;

    fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn repository() -> (LocalRepository, Arc<InMemoryKeyValueStore>) {
        let store = Arc::new(InMemoryKeyValueStore::default());
        (LocalRepository::new(store.clone()), store)
    }

    fn sample_task(id: &str) -> Task {
        let at = fixed_time("2026-02-16T08:00:00Z");
        Task {
            id: id.to_string(),
            title: format!("task {id}"),
            tags: Vec::new(),
            completed: false,
            estimated_pomodoros: 1,
            completed_pomodoros: 0,
            reminder_time: None,
            reminder_content: None,
            created_at: at,
            updated_at: at,
            in_progress: false,
            order: 0,
        }
    }

    #[test]
    fn empty_store_yields_defaults() {
        let (repository, _) = repository();
        assert!(repository.load_tasks().expect("tasks").is_empty());
        assert!(repository.load_records().expect("records").is_empty());
        assert_eq!(repository.load_settings().expect("settings"), AppSettings::default());
    }

    #[test]
    fn settings_are_persisted_without_token() {
        let (repository, store) = repository();
        let mut settings = AppSettings::default();
        settings.pomodoro_duration = 50;
        settings.github_sync.token = "ghp_secret".to_string();
        repository.save_settings(&settings).expect("save settings");

        let raw = store.get(SETTINGS_KEY).expect("get").expect("stored");
        assert_eq!(raw["githubSync"]["token"], serde_json::json!(""));
        assert_eq!(repository.load_settings().expect("load").pomodoro_duration, 50);
    }

    #[test]
    fn import_only_touches_present_collections() {
        let (repository, _) = repository();
        repository.save_tasks(&[sample_task("keep")]).expect("seed tasks");

        let snapshot = PartialSnapshot {
            records: Some(Vec::new()),
            ..PartialSnapshot::default()
        };
        repository.import_snapshot(&snapshot).expect("import");

        let tasks = repository.load_tasks().expect("tasks");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, "keep");
    }

    #[test]
    fn export_carries_version_and_timestamp() {
        let (repository, _) = repository();
        repository.save_tasks(&[sample_task("1")]).expect("seed");
        let exported_at = fixed_time("2026-02-18T12:00:00Z");

        let snapshot = repository.export_snapshot(exported_at).expect("export");
        assert_eq!(snapshot.tasks.len(), 1);
        assert_eq!(snapshot.exported_at, Some(exported_at));
        assert_eq!(snapshot.version.as_deref(), Some(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn corrupted_value_is_a_parse_error() {
        let (repository, store) = repository();
        store
            .set(TASKS_KEY, &serde_json::json!({"not": "a list"}))
            .expect("seed");
        assert!(matches!(repository.load_tasks(), Err(InfraError::Parse(_))));
    }
}
