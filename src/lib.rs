pub mod application;
pub mod domain;
pub mod infrastructure;

use application::bootstrap::bootstrap_workspace;
use application::commands::{
    add_record_impl, confirm_timer_impl, create_task_impl, delete_record_impl, delete_task_impl,
    discard_timer_impl, download_data_impl, due_reminders_impl, export_data_impl,
    get_settings_impl, get_stats_impl, get_sync_state_impl, get_timer_state_impl,
    import_data_impl, list_completed_tasks_impl, list_records_impl, list_tasks_impl,
    pause_timer_impl, reorder_tasks_impl, resume_timer_impl, save_settings_impl,
    set_task_reminder_impl, start_timer_impl, stop_timer_impl, subscribe_timer_events,
    sync_now_impl, toggle_task_impl, update_record_impl, update_task_impl, upload_data_impl,
    AppState, ConfirmPomodoroResponse, ImportDataResponse, RecordHistoryResponse, RecordInput,
    StatsResponse, TimerStateResponse,
};
use application::sync::SyncReport;
use application::ticker::TimerEvent;
use domain::models::{AppSettings, PomodoroRecord, Task};
use infrastructure::logging::{init_logging, LoggingGuard};
use infrastructure::sync_state_repository::SyncState;
use serde::Serialize;
use std::path::PathBuf;
use tokio::sync::broadcast;

#[derive(Debug, Serialize)]
pub struct BootstrapResponse {
    workspace_root: String,
    database_path: String,
}

pub fn bootstrap(root: Option<String>) -> Result<BootstrapResponse, String> {
    let workspace_root = resolve_root(root)?;
    let result = bootstrap_workspace(&workspace_root).map_err(|error| error.to_string())?;
    Ok(BootstrapResponse {
        workspace_root: result.workspace_root.display().to_string(),
        database_path: result.database_path.display().to_string(),
    })
}

fn resolve_root(root: Option<String>) -> Result<PathBuf, String> {
    match root {
        Some(path) => Ok(PathBuf::from(path)),
        None => std::env::current_dir().map_err(|error| error.to_string()),
    }
}

/// Command surface for a UI shell. Every call logs failures and returns them
/// as display strings.
pub struct Pomotato {
    state: AppState,
    _logging: LoggingGuard,
}

impl Pomotato {
    /// Bootstraps the workspace (current directory when `root` is `None`) and
    /// installs file logging under its `logs/` directory. A later `open` in the
    /// same process keeps logging to the first workspace.
    pub fn open(root: Option<String>) -> Result<Self, String> {
        let state = AppState::new(resolve_root(root)?).map_err(|error| error.to_string())?;
        let logging = init_logging(state.logs_dir()).map_err(|error| error.to_string())?;
        state.log_info("open", &format!("database={}", state.database_path().display()));
        Ok(Self {
            state,
            _logging: logging,
        })
    }

    pub fn list_tasks(&self) -> Result<Vec<Task>, String> {
        list_tasks_impl(&self.state).map_err(|error| self.state.command_error("list_tasks", &error))
    }

    pub fn create_task(&self, input: String) -> Result<Task, String> {
        create_task_impl(&self.state, input)
            .map_err(|error| self.state.command_error("create_task", &error))
    }

    pub fn update_task(
        &self,
        task_id: String,
        input: Option<String>,
        estimated_pomodoros: Option<u32>,
    ) -> Result<Task, String> {
        update_task_impl(&self.state, task_id, input, estimated_pomodoros)
            .map_err(|error| self.state.command_error("update_task", &error))
    }

    pub fn toggle_task(&self, task_id: String) -> Result<Task, String> {
        toggle_task_impl(&self.state, task_id)
            .map_err(|error| self.state.command_error("toggle_task", &error))
    }

    pub fn set_task_reminder(
        &self,
        task_id: String,
        reminder_time: Option<String>,
        reminder_content: Option<String>,
    ) -> Result<Task, String> {
        set_task_reminder_impl(&self.state, task_id, reminder_time, reminder_content)
            .map_err(|error| self.state.command_error("set_task_reminder", &error))
    }

    pub fn due_reminders(&self) -> Result<Vec<Task>, String> {
        due_reminders_impl(&self.state)
            .map_err(|error| self.state.command_error("due_reminders", &error))
    }

    pub fn reorder_tasks(&self, dragged_id: String, target_id: String) -> Result<Vec<Task>, String> {
        reorder_tasks_impl(&self.state, dragged_id, target_id)
            .map_err(|error| self.state.command_error("reorder_tasks", &error))
    }

    pub fn delete_task(&self, task_id: String) -> Result<bool, String> {
        delete_task_impl(&self.state, task_id)
            .map_err(|error| self.state.command_error("delete_task", &error))
    }

    pub fn list_completed_tasks(
        &self,
        start_date: Option<String>,
        end_date: Option<String>,
    ) -> Result<Vec<Task>, String> {
        list_completed_tasks_impl(&self.state, start_date, end_date)
            .map_err(|error| self.state.command_error("list_completed_tasks", &error))
    }

    pub fn list_records(
        &self,
        start_date: Option<String>,
        end_date: Option<String>,
    ) -> Result<RecordHistoryResponse, String> {
        list_records_impl(&self.state, start_date, end_date)
            .map_err(|error| self.state.command_error("list_records", &error))
    }

    pub fn add_record(&self, input: RecordInput) -> Result<PomodoroRecord, String> {
        add_record_impl(&self.state, input)
            .map_err(|error| self.state.command_error("add_record", &error))
    }

    pub fn update_record(&self, record_id: String, input: RecordInput) -> Result<PomodoroRecord, String> {
        update_record_impl(&self.state, record_id, input)
            .map_err(|error| self.state.command_error("update_record", &error))
    }

    pub fn delete_record(&self, record_id: String) -> Result<bool, String> {
        delete_record_impl(&self.state, record_id)
            .map_err(|error| self.state.command_error("delete_record", &error))
    }

    pub fn timer_events(&self) -> broadcast::Receiver<TimerEvent> {
        subscribe_timer_events(&self.state)
    }

    pub fn get_timer_state(&self) -> Result<TimerStateResponse, String> {
        get_timer_state_impl(&self.state)
            .map_err(|error| self.state.command_error("get_timer_state", &error))
    }

    /// Must be called from inside a tokio runtime.
    pub fn start_timer(&self, label: Option<String>) -> Result<TimerStateResponse, String> {
        start_timer_impl(&self.state, label)
            .map_err(|error| self.state.command_error("start_timer", &error))
    }

    pub fn pause_timer(&self) -> Result<TimerStateResponse, String> {
        pause_timer_impl(&self.state).map_err(|error| self.state.command_error("pause_timer", &error))
    }

    pub fn resume_timer(&self) -> Result<TimerStateResponse, String> {
        resume_timer_impl(&self.state)
            .map_err(|error| self.state.command_error("resume_timer", &error))
    }

    pub fn stop_timer(&self) -> Result<TimerStateResponse, String> {
        stop_timer_impl(&self.state).map_err(|error| self.state.command_error("stop_timer", &error))
    }

    pub fn discard_timer(&self) -> Result<TimerStateResponse, String> {
        discard_timer_impl(&self.state)
            .map_err(|error| self.state.command_error("discard_timer", &error))
    }

    pub fn confirm_timer(&self, label: String) -> Result<ConfirmPomodoroResponse, String> {
        confirm_timer_impl(&self.state, label)
            .map_err(|error| self.state.command_error("confirm_timer", &error))
    }

    pub fn get_stats(&self) -> Result<StatsResponse, String> {
        get_stats_impl(&self.state).map_err(|error| self.state.command_error("get_stats", &error))
    }

    pub fn get_settings(&self) -> Result<AppSettings, String> {
        get_settings_impl(&self.state)
            .map_err(|error| self.state.command_error("get_settings", &error))
    }

    pub fn save_settings(&self, settings: AppSettings) -> Result<AppSettings, String> {
        save_settings_impl(&self.state, settings)
            .map_err(|error| self.state.command_error("save_settings", &error))
    }

    pub fn export_data(&self) -> Result<String, String> {
        export_data_impl(&self.state).map_err(|error| self.state.command_error("export_data", &error))
    }

    pub fn import_data(&self, raw: String) -> Result<ImportDataResponse, String> {
        import_data_impl(&self.state, raw)
            .map_err(|error| self.state.command_error("import_data", &error))
    }

    pub async fn sync_now(&self) -> Result<SyncReport, String> {
        sync_now_impl(&self.state)
            .await
            .map_err(|error| self.state.command_error("sync_now", &error))
    }

    pub async fn upload_data(&self) -> Result<SyncReport, String> {
        upload_data_impl(&self.state)
            .await
            .map_err(|error| self.state.command_error("upload_data", &error))
    }

    pub async fn download_data(&self) -> Result<SyncReport, String> {
        download_data_impl(&self.state)
            .await
            .map_err(|error| self.state.command_error("download_data", &error))
    }

    pub fn get_sync_state(&self) -> Result<Option<SyncState>, String> {
        get_sync_state_impl(&self.state)
            .map_err(|error| self.state.command_error("get_sync_state", &error))
    }
}
