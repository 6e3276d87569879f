use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_POMODORO_MINUTES: u32 = 25;
pub const DEFAULT_SHORT_BREAK_MINUTES: u32 = 5;
pub const DEFAULT_LONG_BREAK_MINUTES: u32 = 15;
pub const DEFAULT_SYNC_BRANCH: &str = "main";
pub const DEFAULT_SYNC_FILE_PATH: &str = "pomodoro-data.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default = "default_estimated_pomodoros")]
    pub estimated_pomodoros: u32,
    #[serde(default)]
    pub completed_pomodoros: u32,
    #[serde(
        default,
        deserialize_with = "deserialize_reminder_time",
        skip_serializing_if = "Option::is_none"
    )]
    pub reminder_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder_content: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub in_progress: bool,
    #[serde(default)]
    pub order: i64,
}

impl Task {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "task.id")?;
        validate_non_empty(&self.title, "task.title")?;
        if self.updated_at < self.created_at {
            return Err("task.updated_at must be >= task.created_at".to_string());
        }
        Ok(())
    }

    /// Reminders are stored only; a reminder is due once its time has passed.
    pub fn is_reminder_due(&self, now: DateTime<Utc>) -> bool {
        self.reminder_time.is_some_and(|reminder| reminder <= now)
    }
}

/// Parses a `datetime-local` style value (`2024-01-01T09:00` or with seconds).
pub fn parse_naive_datetime(value: &str) -> Option<NaiveDateTime> {
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

/// RFC 3339, or an offset-less local value read as UTC. Blank means no reminder.
fn deserialize_reminder_time<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let value = raw.trim();
    if value.is_empty() {
        return Ok(None);
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(Some(parsed.with_timezone(&Utc)));
    }
    parse_naive_datetime(value)
        .map(|naive| Some(naive.and_utc()))
        .ok_or_else(|| serde::de::Error::custom(format!("invalid reminderTime '{value}'")))
}

fn default_estimated_pomodoros() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PomodoroRecord {
    pub id: String,
    #[serde(default)]
    pub task_id: String,
    pub task_title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration: u32,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl PomodoroRecord {
    pub fn end_time_for(start_time: DateTime<Utc>, duration_minutes: u32) -> DateTime<Utc> {
        start_time + Duration::minutes(i64::from(duration_minutes))
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "record.id")?;
        validate_non_empty(&self.task_title, "record.task_title")?;
        if self.duration == 0 {
            return Err("record.duration must be > 0".to_string());
        }
        if self.end_time != Self::end_time_for(self.start_time, self.duration) {
            return Err("record.end_time must equal record.start_time + duration".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncConfig {
    pub enabled: bool,
    pub token: String,
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub file_path: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            token: String::new(),
            owner: String::new(),
            repo: String::new(),
            branch: DEFAULT_SYNC_BRANCH.to_string(),
            file_path: DEFAULT_SYNC_FILE_PATH.to_string(),
        }
    }
}

impl SyncConfig {
    /// Names of the settings that must be present before any remote call.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !self.enabled {
            missing.push("enabled");
        }
        if self.token.trim().is_empty() {
            missing.push("token");
        }
        if self.owner.trim().is_empty() {
            missing.push("owner");
        }
        if self.repo.trim().is_empty() {
            missing.push("repo");
        }
        missing
    }

    pub fn effective_branch(&self) -> &str {
        let branch = self.branch.trim();
        if branch.is_empty() {
            DEFAULT_SYNC_BRANCH
        } else {
            branch
        }
    }

    pub fn effective_file_path(&self) -> &str {
        let path = self.file_path.trim().trim_matches('/');
        if path.is_empty() {
            DEFAULT_SYNC_FILE_PATH
        } else {
            path
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    pub pomodoro_duration: u32,
    pub short_break_duration: u32,
    pub long_break_duration: u32,
    pub auto_start_break: bool,
    pub auto_start_pomodoro: bool,
    pub sound_enabled: bool,
    pub github_sync: SyncConfig,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            pomodoro_duration: DEFAULT_POMODORO_MINUTES,
            short_break_duration: DEFAULT_SHORT_BREAK_MINUTES,
            long_break_duration: DEFAULT_LONG_BREAK_MINUTES,
            auto_start_break: false,
            auto_start_pomodoro: false,
            sound_enabled: true,
            github_sync: SyncConfig::default(),
        }
    }
}

impl AppSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.pomodoro_duration == 0 {
            return Err("settings.pomodoro_duration must be > 0".to_string());
        }
        if self.short_break_duration == 0 {
            return Err("settings.short_break_duration must be > 0".to_string());
        }
        if self.long_break_duration == 0 {
            return Err("settings.long_break_duration must be > 0".to_string());
        }
        Ok(())
    }

    /// Copy without the sync token, for anything that leaves the credential store.
    pub fn redacted(&self) -> Self {
        let mut settings = self.clone();
        settings.github_sync.token = String::new();
        settings
    }
}

/// Full export written locally and to the remote file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub tasks: Vec<Task>,
    pub records: Vec<PomodoroRecord>,
    pub settings: AppSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exported_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Import shape: every collection is optional and absent ones are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PartialSnapshot {
    #[serde(default)]
    pub tasks: Option<Vec<Task>>,
    #[serde(default)]
    pub records: Option<Vec<PomodoroRecord>>,
    #[serde(default)]
    pub settings: Option<AppSettings>,
    #[serde(default)]
    pub exported_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub version: Option<String>,
}

impl PartialSnapshot {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let parsed: PartialSnapshot =
            serde_json::from_str(raw).map_err(|error| format!("invalid snapshot: {error}"))?;
        for task in parsed.tasks.iter().flatten() {
            task.validate()?;
        }
        if let Some(settings) = parsed.settings.as_ref() {
            settings.validate()?;
        }
        Ok(parsed)
    }
}

impl From<Snapshot> for PartialSnapshot {
    fn from(snapshot: Snapshot) -> Self {
        Self {
            tasks: Some(snapshot.tasks),
            records: Some(snapshot.records),
            settings: Some(snapshot.settings),
            exported_at: snapshot.exported_at,
            version: snapshot.version,
        }
    }
}

fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn sample_task() -> Task {
        Task {
            id: "1708070400000".to_string(),
            title: "Write tests".to_string(),
            tags: vec!["work".to_string()],
            completed: false,
            estimated_pomodoros: 3,
            completed_pomodoros: 1,
            reminder_time: Some(fixed_time("2026-02-16T10:00:00Z")),
            reminder_content: Some("standup first".to_string()),
            created_at: fixed_time("2026-02-16T08:00:00Z"),
            updated_at: fixed_time("2026-02-16T08:30:00Z"),
            in_progress: false,
            order: 0,
        }
    }

    fn sample_record() -> PomodoroRecord {
        let start = fixed_time("2026-02-16T09:00:00Z");
        PomodoroRecord {
            id: "1708074000000".to_string(),
            task_id: String::new(),
            task_title: "Write tests".to_string(),
            tags: vec!["work".to_string()],
            start_time: start,
            end_time: PomodoroRecord::end_time_for(start, 25),
            duration: 25,
            completed: true,
            note: None,
        }
    }

    #[test]
    fn task_validate_rejects_empty_title() {
        let mut task = sample_task();
        task.title = "   ".to_string();
        assert!(task.validate().is_err());
    }

    #[test]
    fn reminder_is_due_once_time_passes() {
        let task = sample_task();
        assert!(!task.is_reminder_due(fixed_time("2026-02-16T09:59:00Z")));
        assert!(task.is_reminder_due(fixed_time("2026-02-16T10:00:00Z")));
    }

    #[test]
    fn snapshot_accepts_datetime_local_reminders() {
        let raw = r#"{
            "tasks": [
                {"id": "1", "title": "call", "reminderTime": "2024-01-01T09:00",
                 "createdAt": "2024-01-01T08:00:00.000Z", "updatedAt": "2024-01-01T08:00:00.000Z"},
                {"id": "2", "title": "email", "reminderTime": "2024-01-01T09:00:30",
                 "createdAt": "2024-01-01T08:00:00Z", "updatedAt": "2024-01-01T08:00:00Z"},
                {"id": "3", "title": "plan", "reminderTime": "2024-01-01T09:00:00+09:00",
                 "createdAt": "2024-01-01T08:00:00Z", "updatedAt": "2024-01-01T08:00:00Z"},
                {"id": "4", "title": "rest", "reminderTime": "",
                 "createdAt": "2024-01-01T08:00:00Z", "updatedAt": "2024-01-01T08:00:00Z"}
            ]
        }"#;
        let tasks = PartialSnapshot::parse(raw).expect("parse").tasks.expect("tasks");
        let reminders = tasks.iter().map(|task| task.reminder_time).collect::<Vec<_>>();
        assert_eq!(
            reminders,
            vec![
                Some(fixed_time("2024-01-01T09:00:00Z")),
                Some(fixed_time("2024-01-01T09:00:30Z")),
                Some(fixed_time("2024-01-01T00:00:00Z")),
                None,
            ]
        );
        assert!(PartialSnapshot::parse(&raw.replace("2024-01-01T09:00\"", "tomorrow\"")).is_err());
    }

    #[test]
    fn record_validate_enforces_end_time_invariant() {
        let mut record = sample_record();
        assert!(record.validate().is_ok());
        record.end_time = fixed_time("2026-02-16T09:30:00Z");
        assert!(record.validate().is_err());
    }

    #[test]
    fn sync_config_reports_missing_fields() {
        let config = SyncConfig {
            enabled: true,
            token: String::new(),
            owner: "octo".to_string(),
            repo: String::new(),
            ..SyncConfig::default()
        };
        assert_eq!(config.missing_fields(), vec!["token", "repo"]);
        assert_eq!(config.effective_branch(), "main");
        assert_eq!(config.effective_file_path(), "pomodoro-data.json");
    }

    #[test]
    fn partial_settings_fill_from_defaults() {
        let parsed: AppSettings =
            serde_json::from_str(r#"{"pomodoroDuration": 50, "githubSync": {"owner": "octo"}}"#)
                .expect("parse settings");
        assert_eq!(parsed.pomodoro_duration, 50);
        assert_eq!(parsed.short_break_duration, DEFAULT_SHORT_BREAK_MINUTES);
        assert!(parsed.sound_enabled);
        assert_eq!(parsed.github_sync.owner, "octo");
        assert_eq!(parsed.github_sync.branch, "main");
    }

    #[test]
    fn redacted_settings_drop_token() {
        let mut settings = AppSettings::default();
        settings.github_sync.token = "ghp_secret".to_string();
        assert!(settings.redacted().github_sync.token.is_empty());
        assert_eq!(settings.github_sync.token, "ghp_secret");
    }

    #[test]
    fn snapshot_uses_camel_case_fields() {
        let snapshot = Snapshot {
            tasks: vec![sample_task()],
            records: vec![sample_record()],
            settings: AppSettings::default(),
            exported_at: None,
            version: Some("0.3.0".to_string()),
        };
        let value = serde_json::to_value(&snapshot).expect("serialize snapshot");
        assert!(value["tasks"][0].get("completedPomodoros").is_some());
        assert!(value["records"][0].get("startTime").is_some());
        assert!(value["settings"].get("githubSync").is_some());
        assert!(value.get("exportedAt").is_none());
    }

    #[test]
    fn partial_snapshot_accepts_missing_collections() {
        let parsed = PartialSnapshot::parse(r#"{"records": []}"#).expect("parse partial");
        assert!(parsed.tasks.is_none());
        assert_eq!(parsed.records, Some(Vec::new()));
        assert!(parsed.settings.is_none());
    }

    #[test]
    fn partial_snapshot_rejects_malformed_json() {
        assert!(PartialSnapshot::parse("{ not json").is_err());
        assert!(PartialSnapshot::parse(r#"{"tasks": [{"id": "1"}]}"#).is_err());
    }

    #[test]
    fn domain_models_support_serde_roundtrip() {
        let task = sample_task();
        let record = sample_record();
        let settings = AppSettings::default();

        let task_roundtrip: Task =
            serde_json::from_str(&serde_json::to_string(&task).expect("serialize task"))
                .expect("deserialize task");
        let record_roundtrip: PomodoroRecord =
            serde_json::from_str(&serde_json::to_string(&record).expect("serialize record"))
                .expect("deserialize record");
        let settings_roundtrip: AppSettings = serde_json::from_str(
            &serde_json::to_string(&settings).expect("serialize settings"),
        )
        .expect("deserialize settings");

        assert_eq!(task_roundtrip, task);
        assert_eq!(record_roundtrip, record);
        assert_eq!(settings_roundtrip, settings);
    }
}
