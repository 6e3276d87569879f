use crate::application::bootstrap::{bootstrap_workspace, BootstrapResult};
use crate::application::sync::{SyncReport, SyncService};
use crate::application::ticker::{TimerDriver, TimerEvent, TimerSnapshot};
use crate::domain::label::{parse_label, parse_tag_list};
use crate::domain::models::{
    parse_naive_datetime, AppSettings, PartialSnapshot, PomodoroRecord, SyncConfig, Task,
    DEFAULT_POMODORO_MINUTES,
};
use crate::domain::stats::{compute_stats, today_count, week_count, PomodoroStats};
use crate::domain::timer::credit_matching_task;
use crate::infrastructure::config::{read_remote_api_base, read_timezone, read_user_agent};
use crate::infrastructure::credential_store::{KeyringTokenStore, SyncTokenStore};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::local_repository::LocalRepository;
use crate::infrastructure::remote_file_client::{RemoteFileClient, ReqwestGitHubContentsClient};
use crate::infrastructure::storage::SqliteKeyValueStore;
use crate::infrastructure::sync_state_repository::{SqliteSyncStateRepository, SyncState};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> String {
    let sequence = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{}-{sequence}", Utc::now().timestamp_millis())
}

pub struct AppState {
    config_dir: PathBuf,
    database_path: PathBuf,
    logs_dir: PathBuf,
    repository: LocalRepository,
    token_store: Arc<dyn SyncTokenStore>,
    timer: TimerDriver,
    sync_service: SyncService<dyn RemoteFileClient, SqliteSyncStateRepository>,
}

impl AppState {
    pub fn new(workspace_root: PathBuf) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(&workspace_root)?;
        let remote_client = ReqwestGitHubContentsClient::new(
            read_remote_api_base(&bootstrap.config_dir)?,
            &read_user_agent(&bootstrap.config_dir)?,
        )?;
        Ok(Self::assemble(
            bootstrap,
            Arc::new(KeyringTokenStore::default()),
            Arc::new(remote_client),
        ))
    }

    /// Same layout as [`AppState::new`] with caller-supplied token store and
    /// remote client.
    pub fn with_collaborators(
        workspace_root: PathBuf,
        token_store: Arc<dyn SyncTokenStore>,
        remote_client: Arc<dyn RemoteFileClient>,
    ) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(&workspace_root)?;
        Ok(Self::assemble(bootstrap, token_store, remote_client))
    }

    fn assemble(
        bootstrap: BootstrapResult,
        token_store: Arc<dyn SyncTokenStore>,
        remote_client: Arc<dyn RemoteFileClient>,
    ) -> Self {
        let repository =
            LocalRepository::new(Arc::new(SqliteKeyValueStore::new(&bootstrap.database_path)));
        let sync_service = SyncService::new(
            remote_client,
            Arc::new(SqliteSyncStateRepository::new(&bootstrap.database_path)),
            repository.clone(),
        );

        Self {
            config_dir: bootstrap.config_dir,
            database_path: bootstrap.database_path,
            logs_dir: bootstrap.logs_dir,
            repository,
            token_store,
            timer: TimerDriver::new(),
            sync_service,
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    pub fn logs_dir(&self) -> &Path {
        &self.logs_dir
    }

    pub fn command_error(&self, command: &str, error: &InfraError) -> String {
        tracing::error!(command, error = %error, "command failed");
        error.to_string()
    }

    pub fn log_info(&self, command: &str, message: &str) {
        tracing::info!(command, "{message}");
    }

    fn sync_config(&self) -> Result<SyncConfig, InfraError> {
        let mut config = self.repository.load_settings()?.github_sync;
        config.token = self.token_store.load_token()?.unwrap_or_default();
        Ok(config)
    }

    fn zone(&self) -> Result<ZoneChoice, InfraError> {
        Ok(read_timezone(&self.config_dir)?.map_or(ZoneChoice::Local, ZoneChoice::Named))
    }
}

/// Calendar zone for day boundaries: the configured IANA zone or the host zone.
enum ZoneChoice {
    Named(chrono_tz::Tz),
    Local,
}

impl ZoneChoice {
    fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        match self {
            Self::Named(zone) => at.with_timezone(zone).date_naive(),
            Self::Local => at.with_timezone(&Local).date_naive(),
        }
    }

    fn to_utc(&self, local: NaiveDateTime) -> Result<DateTime<Utc>, InfraError> {
        match self {
            Self::Named(zone) => resolve_local(zone, local),
            Self::Local => resolve_local(&Local, local),
        }
    }

    fn stats(&self, records: &[PomodoroRecord], now: DateTime<Utc>) -> StatsResponse {
        match self {
            Self::Named(zone) => build_stats(records, &now.with_timezone(zone)),
            Self::Local => build_stats(records, &now.with_timezone(&Local)),
        }
    }
}

fn resolve_local<Tz: TimeZone>(zone: &Tz, local: NaiveDateTime) -> Result<DateTime<Utc>, InfraError> {
    zone.from_local_datetime(&local)
        .earliest()
        .map(|value| value.with_timezone(&Utc))
        .ok_or_else(|| {
            InfraError::InvalidInput(format!("{local} does not exist in the configured timezone"))
        })
}

fn build_stats<Tz: TimeZone>(records: &[PomodoroRecord], now: &DateTime<Tz>) -> StatsResponse {
    StatsResponse {
        stats: compute_stats(records, now),
        today_count: today_count(records, now),
        week_count: week_count(records, now),
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: PomodoroStats,
    pub today_count: u32,
    pub week_count: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimerStateResponse {
    #[serde(flatten)]
    pub timer: TimerSnapshot,
    pub prefill_label: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPomodoroResponse {
    pub record: PomodoroRecord,
    pub credited_task_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecordHistoryResponse {
    pub records: Vec<PomodoroRecord>,
    pub total_records: usize,
    pub completed_records: usize,
    pub total_minutes: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImportDataResponse {
    pub tasks: Option<usize>,
    pub records: Option<usize>,
    pub settings: bool,
}

/// Backfill or edit form for a history entry. `date` is `YYYY-MM-DD` and
/// `startTime` is `HH:MM`, both in the configured timezone.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordInput {
    pub title: String,
    #[serde(default)]
    pub tags: String,
    pub date: String,
    pub start_time: String,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub note: Option<String>,
}

fn required_id<'a>(value: &'a str, field: &str) -> Result<&'a str, InfraError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(InfraError::InvalidInput(format!("{field} must not be empty")));
    }
    Ok(value)
}

fn load_sorted_tasks(state: &AppState) -> Result<Vec<Task>, InfraError> {
    let mut tasks = state.repository.load_tasks()?;
    tasks.sort_by_key(|task| task.order);
    Ok(tasks)
}

/// Loads tasks, applies `mutate` to the one with `task_id`, bumps its
/// `updated_at` and persists.
fn mutate_task(
    state: &AppState,
    task_id: &str,
    mutate: impl FnOnce(&mut Task) -> Result<(), InfraError>,
) -> Result<Task, InfraError> {
    let task_id = required_id(task_id, "task_id")?;
    let mut tasks = state.repository.load_tasks()?;
    let task = tasks
        .iter_mut()
        .find(|task| task.id == task_id)
        .ok_or_else(|| InfraError::NotFound(format!("task {task_id}")))?;

    mutate(task)?;
    task.updated_at = Utc::now().max(task.created_at);
    let updated = task.clone();
    state.repository.save_tasks(&tasks)?;
    Ok(updated)
}

pub fn list_tasks_impl(state: &AppState) -> Result<Vec<Task>, InfraError> {
    load_sorted_tasks(state)
}

pub fn create_task_impl(state: &AppState, input: String) -> Result<Task, InfraError> {
    let parsed = parse_label(&input);
    if parsed.title.is_empty() {
        return Err(InfraError::InvalidInput("title must not be empty".to_string()));
    }

    let mut tasks = state.repository.load_tasks()?;
    let now = Utc::now();
    let task = Task {
        id: next_id(),
        title: parsed.title,
        tags: parsed.tags,
        completed: false,
        estimated_pomodoros: 1,
        completed_pomodoros: 0,
        reminder_time: None,
        reminder_content: None,
        created_at: now,
        updated_at: now,
        in_progress: false,
        order: tasks.len() as i64,
    };
    tasks.push(task.clone());
    state.repository.save_tasks(&tasks)?;

    state.log_info("create_task", &format!("created task_id={}", task.id));
    Ok(task)
}

pub fn update_task_impl(
    state: &AppState,
    task_id: String,
    input: Option<String>,
    estimated_pomodoros: Option<u32>,
) -> Result<Task, InfraError> {
    let updated = mutate_task(state, &task_id, |task| {
        if let Some(input) = input {
            let parsed = parse_label(&input);
            if parsed.title.is_empty() {
                return Err(InfraError::InvalidInput("title must not be empty".to_string()));
            }
            task.title = parsed.title;
            task.tags = parsed.tags;
        }
        if let Some(estimated) = estimated_pomodoros {
            if estimated == 0 {
                return Err(InfraError::InvalidInput(
                    "estimated_pomodoros must be > 0".to_string(),
                ));
            }
            task.estimated_pomodoros = estimated;
        }
        Ok(())
    })?;

    state.log_info("update_task", &format!("updated task_id={}", updated.id));
    Ok(updated)
}

pub fn toggle_task_impl(state: &AppState, task_id: String) -> Result<Task, InfraError> {
    let updated = mutate_task(state, &task_id, |task| {
        task.completed = !task.completed;
        Ok(())
    })?;
    state.log_info(
        "toggle_task",
        &format!("task_id={} completed={}", updated.id, updated.completed),
    );
    Ok(updated)
}

pub fn set_task_reminder_impl(
    state: &AppState,
    task_id: String,
    reminder_time: Option<String>,
    reminder_content: Option<String>,
) -> Result<Task, InfraError> {
    let zone = state.zone()?;
    let reminder_time = reminder_time
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| parse_reminder_input(&zone, value))
        .transpose()?;
    let reminder_content = reminder_content
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());

    let updated = mutate_task(state, &task_id, |task| {
        task.reminder_content = reminder_time.and(reminder_content);
        task.reminder_time = reminder_time;
        Ok(())
    })?;
    state.log_info("set_task_reminder", &format!("task_id={}", updated.id));
    Ok(updated)
}

/// RFC 3339, or a `datetime-local` value in the configured timezone.
fn parse_reminder_input(zone: &ZoneChoice, value: &str) -> Result<DateTime<Utc>, InfraError> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }
    let naive = parse_naive_datetime(value)
        .ok_or_else(|| InfraError::InvalidInput(format!("invalid reminder_time '{value}'")))?;
    zone.to_utc(naive)
}

/// Incomplete tasks whose reminder time has passed.
pub fn due_reminders_impl(state: &AppState) -> Result<Vec<Task>, InfraError> {
    let now = Utc::now();
    Ok(load_sorted_tasks(state)?
        .into_iter()
        .filter(|task| !task.completed && task.is_reminder_due(now))
        .collect())
}

/// Moves `dragged_id` into the slot held by `target_id` and renumbers `order`
/// from zero. Only tasks whose position changed get a new `updated_at`.
pub fn reorder_tasks_impl(
    state: &AppState,
    dragged_id: String,
    target_id: String,
) -> Result<Vec<Task>, InfraError> {
    let dragged_id = required_id(&dragged_id, "dragged_id")?;
    let target_id = required_id(&target_id, "target_id")?;
    let mut tasks = load_sorted_tasks(state)?;
    if dragged_id == target_id {
        return Ok(tasks);
    }

    let position = |id: &str, tasks: &[Task]| {
        tasks
            .iter()
            .position(|task| task.id == id)
            .ok_or_else(|| InfraError::NotFound(format!("task {id}")))
    };
    let from = position(dragged_id, &tasks)?;
    let to = position(target_id, &tasks)?;
    let moved = tasks.remove(from);
    tasks.insert(to, moved);

    let now = Utc::now();
    for (index, task) in tasks.iter_mut().enumerate() {
        let order = index as i64;
        if task.order != order {
            task.order = order;
            task.updated_at = now.max(task.created_at);
        }
    }
    state.repository.save_tasks(&tasks)?;

    state.log_info(
        "reorder_tasks",
        &format!("moved task_id={dragged_id} from={from} to={to}"),
    );
    Ok(tasks)
}

pub fn delete_task_impl(state: &AppState, task_id: String) -> Result<bool, InfraError> {
    let task_id = required_id(&task_id, "task_id")?;
    let mut tasks = state.repository.load_tasks()?;
    let before = tasks.len();
    tasks.retain(|task| task.id != task_id);
    if tasks.len() == before {
        return Ok(false);
    }
    state.repository.save_tasks(&tasks)?;

    state.log_info("delete_task", &format!("deleted task_id={task_id}"));
    Ok(true)
}

/// Inclusive range of local calendar days; an open end matches everything.
struct DayRange {
    zone: ZoneChoice,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

impl DayRange {
    fn new(state: &AppState, start_date: Option<String>, end_date: Option<String>) -> Result<Self, InfraError> {
        Ok(Self {
            zone: state.zone()?,
            start: start_date.as_deref().map(|value| parse_date(value, "start_date")).transpose()?,
            end: end_date.as_deref().map(|value| parse_date(value, "end_date")).transpose()?,
        })
    }

    fn contains(&self, at: DateTime<Utc>) -> bool {
        let day = self.zone.local_date(at);
        self.start.is_none_or(|start| day >= start) && self.end.is_none_or(|end| day <= end)
    }
}

/// History newest first, optionally limited to an inclusive `YYYY-MM-DD` range
/// of local calendar days.
pub fn list_records_impl(
    state: &AppState,
    start_date: Option<String>,
    end_date: Option<String>,
) -> Result<RecordHistoryResponse, InfraError> {
    let range = DayRange::new(state, start_date, end_date)?;
    let mut records = state
        .repository
        .load_records()?
        .into_iter()
        .filter(|record| range.contains(record.start_time))
        .collect::<Vec<_>>();
    records.sort_by(|left, right| right.start_time.cmp(&left.start_time));

    Ok(RecordHistoryResponse {
        total_records: records.len(),
        completed_records: records.iter().filter(|record| record.completed).count(),
        total_minutes: records.iter().map(|record| u64::from(record.duration)).sum(),
        records,
    })
}

/// Finished tasks, most recently updated first, filtered on the local day of
/// `updated_at`.
pub fn list_completed_tasks_impl(
    state: &AppState,
    start_date: Option<String>,
    end_date: Option<String>,
) -> Result<Vec<Task>, InfraError> {
    let range = DayRange::new(state, start_date, end_date)?;
    let mut tasks = state
        .repository
        .load_tasks()?
        .into_iter()
        .filter(|task| task.completed && range.contains(task.updated_at))
        .collect::<Vec<_>>();
    tasks.sort_by(|left, right| right.updated_at.cmp(&left.updated_at));
    Ok(tasks)
}

pub fn add_record_impl(state: &AppState, input: RecordInput) -> Result<PomodoroRecord, InfraError> {
    let mut record = PomodoroRecord {
        id: next_id(),
        task_id: String::new(),
        task_title: String::new(),
        tags: Vec::new(),
        start_time: Utc::now(),
        end_time: Utc::now(),
        duration: DEFAULT_POMODORO_MINUTES,
        completed: true,
        note: None,
    };
    apply_record_input(state, &mut record, input)?;

    let mut records = state.repository.load_records()?;
    records.insert(0, record.clone());
    state.repository.save_records(&records)?;

    state.log_info("add_record", &format!("added record_id={}", record.id));
    Ok(record)
}

pub fn update_record_impl(
    state: &AppState,
    record_id: String,
    input: RecordInput,
) -> Result<PomodoroRecord, InfraError> {
    let record_id = required_id(&record_id, "record_id")?;
    let mut records = state.repository.load_records()?;
    let record = records
        .iter_mut()
        .find(|record| record.id == record_id)
        .ok_or_else(|| InfraError::NotFound(format!("record {record_id}")))?;

    apply_record_input(state, record, input)?;
    let updated = record.clone();
    state.repository.save_records(&records)?;

    state.log_info("update_record", &format!("updated record_id={record_id}"));
    Ok(updated)
}

pub fn delete_record_impl(state: &AppState, record_id: String) -> Result<bool, InfraError> {
    let record_id = required_id(&record_id, "record_id")?;
    let mut records = state.repository.load_records()?;
    let before = records.len();
    records.retain(|record| record.id != record_id);
    if records.len() == before {
        return Ok(false);
    }
    state.repository.save_records(&records)?;

    state.log_info("delete_record", &format!("deleted record_id={record_id}"));
    Ok(true)
}

fn apply_record_input(
    state: &AppState,
    record: &mut PomodoroRecord,
    input: RecordInput,
) -> Result<(), InfraError> {
    let title = input.title.trim();
    if title.is_empty() {
        return Err(InfraError::InvalidInput("title must not be empty".to_string()));
    }
    let date = parse_date(&input.date, "date")?;
    let time = NaiveTime::parse_from_str(input.start_time.trim(), "%H:%M").map_err(|error| {
        InfraError::InvalidInput(format!("invalid start_time '{}': {error}", input.start_time))
    })?;
    let duration = input
        .duration
        .filter(|minutes| *minutes > 0)
        .unwrap_or(DEFAULT_POMODORO_MINUTES);
    let start_time = state.zone()?.to_utc(date.and_time(time))?;

    record.task_title = title.to_string();
    record.tags = parse_tag_list(&input.tags);
    record.start_time = start_time;
    record.duration = duration;
    record.end_time = PomodoroRecord::end_time_for(start_time, duration);
    record.note = input
        .note
        .map(|note| note.trim().to_string())
        .filter(|note| !note.is_empty());
    Ok(())
}

fn parse_date(value: &str, field: &str) -> Result<NaiveDate, InfraError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|error| InfraError::InvalidInput(format!("invalid {field} '{value}': {error}")))
}

fn timer_state(state: &AppState) -> Result<TimerStateResponse, InfraError> {
    let tasks = load_sorted_tasks(state)?;
    Ok(TimerStateResponse {
        timer: state.timer.snapshot()?,
        prefill_label: state.timer.prefill_label(&tasks)?,
    })
}

pub fn get_timer_state_impl(state: &AppState) -> Result<TimerStateResponse, InfraError> {
    timer_state(state)
}

pub fn subscribe_timer_events(state: &AppState) -> broadcast::Receiver<TimerEvent> {
    state.timer.subscribe()
}

pub fn start_timer_impl(
    state: &AppState,
    label: Option<String>,
) -> Result<TimerStateResponse, InfraError> {
    let duration = state.repository.load_settings()?.pomodoro_duration;
    state.timer.start(label.as_deref(), duration)?;
    state.log_info("start_timer", &format!("started duration_minutes={duration}"));
    timer_state(state)
}

pub fn pause_timer_impl(state: &AppState) -> Result<TimerStateResponse, InfraError> {
    state.timer.pause()?;
    state.log_info("pause_timer", "paused");
    timer_state(state)
}

pub fn resume_timer_impl(state: &AppState) -> Result<TimerStateResponse, InfraError> {
    state.timer.resume()?;
    state.log_info("resume_timer", "resumed");
    timer_state(state)
}

pub fn stop_timer_impl(state: &AppState) -> Result<TimerStateResponse, InfraError> {
    state.timer.stop()?;
    state.log_info("stop_timer", "stopped without record");
    timer_state(state)
}

pub fn discard_timer_impl(state: &AppState) -> Result<TimerStateResponse, InfraError> {
    state.timer.discard()?;
    state.log_info("discard_timer", "discarded finished session");
    timer_state(state)
}

/// Logs the finished session under `label` and credits a task with the same
/// title, if any.
pub fn confirm_timer_impl(
    state: &AppState,
    label: String,
) -> Result<ConfirmPomodoroResponse, InfraError> {
    let credit = !parse_label(&label).title.is_empty();
    let (record, credited_task_id) = state.timer.confirm_with(&label, next_id(), |mut record| {
        let mut tasks = state.repository.load_tasks()?;
        let mut records = state.repository.load_records()?;

        let credited = if credit {
            credit_matching_task(&mut tasks, &mut record, Utc::now())
        } else {
            None
        };
        if credited.is_some() {
            state.repository.save_tasks(&tasks)?;
        }
        records.insert(0, record.clone());
        state.repository.save_records(&records)?;
        Ok((record, credited))
    })?;

    state.log_info(
        "confirm_timer",
        &format!(
            "recorded record_id={} credited_task_id={}",
            record.id,
            credited_task_id.as_deref().unwrap_or("-")
        ),
    );
    Ok(ConfirmPomodoroResponse {
        record,
        credited_task_id,
    })
}

pub fn get_stats_impl(state: &AppState) -> Result<StatsResponse, InfraError> {
    let records = state.repository.load_records()?;
    Ok(state.zone()?.stats(&records, Utc::now()))
}

pub fn get_settings_impl(state: &AppState) -> Result<AppSettings, InfraError> {
    let mut settings = state.repository.load_settings()?;
    settings.github_sync.token = state.token_store.load_token()?.unwrap_or_default();
    Ok(settings)
}

/// The only writer for settings. The token goes to the credential store and a
/// blank token removes it.
pub fn save_settings_impl(state: &AppState, settings: AppSettings) -> Result<AppSettings, InfraError> {
    settings.validate().map_err(InfraError::InvalidConfig)?;

    let token = settings.github_sync.token.trim();
    if token.is_empty() {
        state.token_store.delete_token()?;
    } else {
        state.token_store.save_token(token)?;
    }
    state.repository.save_settings(&settings)?;

    state.log_info(
        "save_settings",
        &format!(
            "saved settings pomodoro_duration={} sync_enabled={}",
            settings.pomodoro_duration, settings.github_sync.enabled
        ),
    );
    get_settings_impl(state)
}

pub fn export_data_impl(state: &AppState) -> Result<String, InfraError> {
    let snapshot = state.repository.export_snapshot(Utc::now())?;
    let serialized = serde_json::to_string_pretty(&snapshot)?;
    state.log_info(
        "export_data",
        &format!(
            "exported tasks={} records={}",
            snapshot.tasks.len(),
            snapshot.records.len()
        ),
    );
    Ok(serialized)
}

/// Parses the whole file before writing anything.
pub fn import_data_impl(state: &AppState, raw: String) -> Result<ImportDataResponse, InfraError> {
    let snapshot = PartialSnapshot::parse(&raw).map_err(InfraError::Parse)?;
    state.repository.import_snapshot(&snapshot)?;

    let response = ImportDataResponse {
        tasks: snapshot.tasks.as_ref().map(Vec::len),
        records: snapshot.records.as_ref().map(Vec::len),
        settings: snapshot.settings.is_some(),
    };
    state.log_info("import_data", &format!("imported {response:?}"));
    Ok(response)
}

pub async fn sync_now_impl(state: &AppState) -> Result<SyncReport, InfraError> {
    let config = state.sync_config()?;
    let report = state.sync_service.sync(&config).await?;
    state.log_info(
        "sync_now",
        &format!(
            "synchronized tasks={} records={} created={}",
            report.tasks, report.records, report.created
        ),
    );
    Ok(report)
}

pub async fn upload_data_impl(state: &AppState) -> Result<SyncReport, InfraError> {
    let config = state.sync_config()?;
    let report = state.sync_service.upload(&config).await?;
    state.log_info(
        "upload_data",
        &format!("uploaded tasks={} records={}", report.tasks, report.records),
    );
    Ok(report)
}

pub async fn download_data_impl(state: &AppState) -> Result<SyncReport, InfraError> {
    let config = state.sync_config()?;
    let report = state.sync_service.download(&config).await?;
    state.log_info(
        "download_data",
        &format!("downloaded tasks={} records={}", report.tasks, report.records),
    );
    Ok(report)
}

pub fn get_sync_state_impl(state: &AppState) -> Result<Option<SyncState>, InfraError> {
    state.sync_service.last_sync()
}
