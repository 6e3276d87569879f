use crate::domain::label::{format_label, parse_label};
use crate::domain::models::{PomodoroRecord, Task};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const UNTITLED_RECORD_TITLE: &str = "Untitled pomodoro";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TimerPhase {
    Idle,
    Running,
    Paused,
    AwaitingLabel,
}

impl TimerPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::AwaitingLabel => "awaiting_label",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerSession {
    pub label: String,
    pub started_at: DateTime<Utc>,
    pub duration_minutes: u32,
    pub remaining_seconds: u32,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Ignored,
    Counting { remaining_seconds: u32 },
    Finished { finished_at: DateTime<Utc> },
}

/// Countdown for a single focus session.
///
/// `tick` advances one second and only while running, so time spent paused
/// never counts against the session.
#[derive(Debug, Clone)]
pub struct PomodoroTimer {
    phase: TimerPhase,
    session: Option<TimerSession>,
}

impl Default for PomodoroTimer {
    fn default() -> Self {
        Self {
            phase: TimerPhase::Idle,
            session: None,
        }
    }
}

impl PomodoroTimer {
    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub fn session(&self) -> Option<&TimerSession> {
        self.session.as_ref()
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.session
            .as_ref()
            .map(|session| session.remaining_seconds)
            .unwrap_or(0)
    }

    pub fn start(
        &mut self,
        label: Option<&str>,
        duration_minutes: u32,
        now: DateTime<Utc>,
    ) -> Result<(), String> {
        if self.phase != TimerPhase::Idle {
            return Err(format!("timer must be idle before start (phase={})", self.phase.as_str()));
        }
        if duration_minutes == 0 {
            return Err("pomodoro duration must be > 0".to_string());
        }

        self.session = Some(TimerSession {
            label: label.map(str::trim).unwrap_or_default().to_string(),
            started_at: now,
            duration_minutes,
            remaining_seconds: duration_minutes.saturating_mul(60),
            finished_at: None,
        });
        self.phase = TimerPhase::Running;
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), String> {
        self.expect_phase(TimerPhase::Running, "pause")?;
        self.phase = TimerPhase::Paused;
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), String> {
        self.expect_phase(TimerPhase::Paused, "resume")?;
        self.phase = TimerPhase::Running;
        Ok(())
    }

    pub fn tick(&mut self, now: DateTime<Utc>) -> TickOutcome {
        if self.phase != TimerPhase::Running {
            return TickOutcome::Ignored;
        }
        let Some(session) = self.session.as_mut() else {
            return TickOutcome::Ignored;
        };

        session.remaining_seconds = session.remaining_seconds.saturating_sub(1);
        if session.remaining_seconds > 0 {
            return TickOutcome::Counting {
                remaining_seconds: session.remaining_seconds,
            };
        }

        session.finished_at = Some(now);
        self.phase = TimerPhase::AwaitingLabel;
        TickOutcome::Finished { finished_at: now }
    }

    pub fn stop(&mut self) -> Result<(), String> {
        if !matches!(self.phase, TimerPhase::Running | TimerPhase::Paused) {
            return Err(format!("timer is not active (phase={})", self.phase.as_str()));
        }
        self.reset();
        Ok(())
    }

    /// Drops a finished session without logging it.
    pub fn discard(&mut self) -> Result<(), String> {
        self.expect_phase(TimerPhase::AwaitingLabel, "discard")?;
        self.reset();
        Ok(())
    }

    /// Label offered to the user once the countdown reaches zero: the label
    /// chosen at start, else the first incomplete task as `#tags title`.
    pub fn prefill_label(&self, tasks: &[Task]) -> Option<String> {
        if self.phase != TimerPhase::AwaitingLabel {
            return None;
        }
        let session = self.session.as_ref()?;
        if !session.label.is_empty() {
            return Some(session.label.clone());
        }

        let first_incomplete = tasks
            .iter()
            .filter(|task| !task.completed)
            .min_by_key(|task| task.order);
        Some(
            first_incomplete
                .map(|task| format_label(&task.title, &task.tags))
                .unwrap_or_default(),
        )
    }

    /// Record the finished session would become under `label`. Leaves the
    /// session in place so a failed save can be retried.
    pub fn preview_record(&self, label: &str, record_id: String) -> Result<PomodoroRecord, String> {
        self.expect_phase(TimerPhase::AwaitingLabel, "confirm")?;
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| "finished session is missing".to_string())?;

        let parsed = parse_label(label);
        let task_title = if parsed.title.is_empty() {
            UNTITLED_RECORD_TITLE.to_string()
        } else {
            parsed.title
        };

        Ok(PomodoroRecord {
            id: record_id,
            task_id: String::new(),
            task_title,
            tags: parsed.tags,
            start_time: session.started_at,
            end_time: PomodoroRecord::end_time_for(session.started_at, session.duration_minutes),
            duration: session.duration_minutes,
            completed: true,
            note: None,
        })
    }

    /// Turns the finished session into a record and returns to idle.
    pub fn confirm(&mut self, label: &str, record_id: String) -> Result<PomodoroRecord, String> {
        let record = self.preview_record(label, record_id)?;
        self.reset();
        Ok(record)
    }

    fn expect_phase(&self, expected: TimerPhase, action: &str) -> Result<(), String> {
        if self.phase != expected {
            return Err(format!(
                "cannot {action} while {} (expected {})",
                self.phase.as_str(),
                expected.as_str()
            ));
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.phase = TimerPhase::Idle;
        self.session = None;
    }
}

/// Credits a confirmed record to the first task (by display order) whose title
/// matches exactly, links the record to it and returns the task id.
pub fn credit_matching_task(
    tasks: &mut [Task],
    record: &mut PomodoroRecord,
    now: DateTime<Utc>,
) -> Option<String> {
    let task = tasks
        .iter_mut()
        .filter(|task| task.title == record.task_title)
        .min_by_key(|task| task.order)?;
    task.completed_pomodoros = task.completed_pomodoros.saturating_add(1);
    task.updated_at = now;
    record.task_id = task.id.clone();
    Some(task.id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn task(id: &str, title: &str, tags: &[&str], completed: bool, order: i64) -> Task {
        let at = fixed_time("2026-02-16T08:00:00Z");
        Task {
            id: id.to_string(),
            title: title.to_string(),
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
            completed,
            estimated_pomodoros: 2,
            completed_pomodoros: 0,
            reminder_time: None,
            reminder_content: None,
            created_at: at,
            updated_at: at,
            in_progress: false,
            order,
        }
    }

    fn run_to_completion(timer: &mut PomodoroTimer, start: DateTime<Utc>) -> u32 {
        let mut ticks = 0;
        loop {
            ticks += 1;
            let now = start + Duration::seconds(i64::from(ticks));
            match timer.tick(now) {
                TickOutcome::Counting { .. } => continue,
                TickOutcome::Finished { .. } => return ticks,
                TickOutcome::Ignored => panic!("tick ignored while running"),
            }
        }
    }

    #[test]
    fn full_session_reaches_awaiting_label() {
        let start = fixed_time("2026-02-16T09:00:00Z");
        let mut timer = PomodoroTimer::default();
        assert_eq!(timer.phase(), TimerPhase::Idle);

        timer.start(Some("write docs"), 25, start).expect("start");
        assert_eq!(timer.phase(), TimerPhase::Running);
        assert_eq!(timer.remaining_seconds(), 25 * 60);

        let ticks = run_to_completion(&mut timer, start);
        assert_eq!(ticks, 25 * 60);
        assert_eq!(timer.phase(), TimerPhase::AwaitingLabel);
        assert_eq!(timer.remaining_seconds(), 0);
        assert_eq!(
            timer.session().and_then(|session| session.finished_at),
            Some(start + Duration::seconds(25 * 60))
        );
    }

    #[test]
    fn pause_excludes_time_from_countdown() {
        let start = fixed_time("2026-02-16T09:00:00Z");
        let mut timer = PomodoroTimer::default();
        timer.start(None, 1, start).expect("start");
        timer.tick(start + Duration::seconds(1));
        timer.pause().expect("pause");

        for second in 2..100 {
            assert_eq!(timer.tick(start + Duration::seconds(second)), TickOutcome::Ignored);
        }
        assert_eq!(timer.remaining_seconds(), 59);

        timer.resume().expect("resume");
        assert_eq!(
            timer.tick(start + Duration::seconds(101)),
            TickOutcome::Counting { remaining_seconds: 58 }
        );
    }

    #[test]
    fn stop_from_running_or_paused_returns_to_idle() {
        let start = fixed_time("2026-02-16T09:00:00Z");
        let mut timer = PomodoroTimer::default();

        timer.start(None, 25, start).expect("start");
        timer.stop().expect("stop running");
        assert_eq!(timer.phase(), TimerPhase::Idle);
        assert!(timer.session().is_none());

        timer.start(None, 25, start).expect("start again");
        timer.pause().expect("pause");
        timer.stop().expect("stop paused");
        assert_eq!(timer.phase(), TimerPhase::Idle);
        assert!(timer.confirm("anything", "r-1".to_string()).is_err());
    }

    #[test]
    fn invalid_transitions_leave_state_untouched() {
        let start = fixed_time("2026-02-16T09:00:00Z");
        let mut timer = PomodoroTimer::default();
        assert!(timer.pause().is_err());
        assert!(timer.resume().is_err());
        assert!(timer.stop().is_err());
        assert!(timer.start(None, 0, start).is_err());
        assert_eq!(timer.phase(), TimerPhase::Idle);

        timer.start(None, 25, start).expect("start");
        assert!(timer.start(None, 25, start).is_err());
        assert!(timer.resume().is_err());
        assert!(timer.discard().is_err());
        assert_eq!(timer.phase(), TimerPhase::Running);
    }

    #[test]
    fn preview_keeps_session_until_confirmed() {
        let start = fixed_time("2026-02-16T09:00:00Z");
        let mut timer = PomodoroTimer::default();
        timer.start(None, 25, start).expect("start");
        run_to_completion(&mut timer, start);

        let preview = timer
            .preview_record("#work fix bug", "r-1".to_string())
            .expect("preview");
        assert_eq!(timer.phase(), TimerPhase::AwaitingLabel);
        assert!(timer.session().is_some());

        let confirmed = timer
            .confirm("#work fix bug", "r-1".to_string())
            .expect("confirm");
        assert_eq!(preview, confirmed);
        assert!(timer.preview_record("again", "r-2".to_string()).is_err());
    }

    #[test]
    fn confirm_parses_label_and_builds_record() {
        let start = fixed_time("2026-02-16T09:00:00Z");
        let mut timer = PomodoroTimer::default();
        timer.start(None, 25, start).expect("start");
        run_to_completion(&mut timer, start);

        let record = timer
            .confirm("#work #urgent fix bug", "r-1".to_string())
            .expect("confirm");
        assert_eq!(timer.phase(), TimerPhase::Idle);
        assert_eq!(record.task_title, "fix bug");
        assert_eq!(record.tags, vec!["work".to_string(), "urgent".to_string()]);
        assert_eq!(record.start_time, start);
        assert_eq!(record.end_time, start + Duration::minutes(25));
        assert_eq!(record.duration, 25);
        assert!(record.completed);
        assert!(record.validate().is_ok());
    }

    #[test]
    fn empty_title_uses_placeholder() {
        let start = fixed_time("2026-02-16T09:00:00Z");
        let mut timer = PomodoroTimer::default();
        timer.start(None, 1, start).expect("start");
        run_to_completion(&mut timer, start);

        let record = timer.confirm("#solo", "r-2".to_string()).expect("confirm");
        assert_eq!(record.task_title, UNTITLED_RECORD_TITLE);
        assert_eq!(record.tags, vec!["solo".to_string()]);
    }

    #[test]
    fn prefill_prefers_session_label_then_first_incomplete_task() {
        let start = fixed_time("2026-02-16T09:00:00Z");
        let tasks = vec![
            task("1", "done already", &[], true, 0),
            task("2", "second", &["misc"], false, 5),
            task("3", "review notes", &["study", "deep"], false, 1),
        ];

        let mut timer = PomodoroTimer::default();
        assert_eq!(timer.prefill_label(&tasks), None);

        timer.start(None, 1, start).expect("start");
        run_to_completion(&mut timer, start);
        assert_eq!(timer.prefill_label(&tasks).as_deref(), Some("#study #deep review notes"));
        assert_eq!(timer.prefill_label(&[]).as_deref(), Some(""));

        timer.discard().expect("discard");
        timer.start(Some("chosen label"), 1, start).expect("start");
        run_to_completion(&mut timer, start);
        assert_eq!(timer.prefill_label(&tasks).as_deref(), Some("chosen label"));
    }

    #[test]
    fn matching_task_gets_credit_and_link() {
        let now = fixed_time("2026-02-16T10:00:00Z");
        let mut tasks = vec![
            task("1", "fix bug", &[], false, 3),
            task("2", "fix bug", &[], false, 1),
            task("3", "other", &[], false, 0),
        ];
        let start = fixed_time("2026-02-16T09:00:00Z");
        let mut record = PomodoroRecord {
            id: "r-1".to_string(),
            task_id: String::new(),
            task_title: "fix bug".to_string(),
            tags: Vec::new(),
            start_time: start,
            end_time: PomodoroRecord::end_time_for(start, 25),
            duration: 25,
            completed: true,
            note: None,
        };

        let credited = credit_matching_task(&mut tasks, &mut record, now);
        assert_eq!(credited.as_deref(), Some("2"));
        assert_eq!(record.task_id, "2");
        assert_eq!(tasks[1].completed_pomodoros, 1);
        assert_eq!(tasks[1].updated_at, now);
        assert_eq!(tasks[0].completed_pomodoros, 0);

        record.task_title = "nothing matches".to_string();
        assert!(credit_matching_task(&mut tasks, &mut record, now).is_none());
    }
}
