use crate::domain::models::PomodoroRecord;
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone};
use serde::Serialize;
use std::collections::HashMap;

const DAILY_BUCKETS: i64 = 7;
const WEEKLY_BUCKETS: i64 = 4;
const MONTHLY_BUCKETS: i32 = 6;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyCount {
    pub week_start: NaiveDate,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyCount {
    pub month_start: NaiveDate,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TagCount {
    pub tag: String,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PomodoroStats {
    pub daily: Vec<DailyCount>,
    pub weekly: Vec<WeeklyCount>,
    pub monthly: Vec<MonthlyCount>,
    pub by_tag: Vec<TagCount>,
}

/// Aggregates completed records relative to `now`, in `now`'s timezone.
///
/// Buckets run oldest to newest: the last 7 days, the last 4 ISO weeks and the
/// last 6 calendar months, each ending with the one containing `now`.
pub fn compute_stats<Tz: TimeZone>(records: &[PomodoroRecord], now: &DateTime<Tz>) -> PomodoroStats {
    let zone = now.timezone();
    let today = now.date_naive();
    let completed_days = records
        .iter()
        .filter(|record| record.completed)
        .map(|record| record.start_time.with_timezone(&zone).date_naive())
        .collect::<Vec<_>>();

    let daily = (0..DAILY_BUCKETS)
        .map(|index| {
            let date = today - Duration::days(DAILY_BUCKETS - 1 - index);
            DailyCount {
                date,
                count: count_matching(&completed_days, |day| *day == date),
            }
        })
        .collect();

    let current_week = week_start(today);
    let weekly = (0..WEEKLY_BUCKETS)
        .map(|index| {
            let start = current_week - Duration::weeks(WEEKLY_BUCKETS - 1 - index);
            WeeklyCount {
                week_start: start,
                count: count_matching(&completed_days, |day| week_start(*day) == start),
            }
        })
        .collect();

    let current_month = month_index(today);
    let monthly = (0..MONTHLY_BUCKETS)
        .map(|index| {
            let target = current_month - (MONTHLY_BUCKETS - 1 - index);
            MonthlyCount {
                month_start: month_start_from_index(target),
                count: count_matching(&completed_days, |day| month_index(*day) == target),
            }
        })
        .collect();

    PomodoroStats {
        daily,
        weekly,
        monthly,
        by_tag: count_tags(records),
    }
}

pub fn today_count<Tz: TimeZone>(records: &[PomodoroRecord], now: &DateTime<Tz>) -> u32 {
    let zone = now.timezone();
    let today = now.date_naive();
    records
        .iter()
        .filter(|record| record.completed)
        .filter(|record| record.start_time.with_timezone(&zone).date_naive() == today)
        .count() as u32
}

pub fn week_count<Tz: TimeZone>(records: &[PomodoroRecord], now: &DateTime<Tz>) -> u32 {
    let zone = now.timezone();
    let current_week = week_start(now.date_naive());
    records
        .iter()
        .filter(|record| record.completed)
        .filter(|record| week_start(record.start_time.with_timezone(&zone).date_naive()) == current_week)
        .count() as u32
}

fn count_tags(records: &[PomodoroRecord]) -> Vec<TagCount> {
    let mut counts: HashMap<&str, u32> = HashMap::new();
    for record in records.iter().filter(|record| record.completed) {
        for tag in &record.tags {
            *counts.entry(tag.as_str()).or_default() += 1;
        }
    }

    let mut by_tag = counts
        .into_iter()
        .map(|(tag, count)| TagCount {
            tag: tag.to_string(),
            count,
        })
        .collect::<Vec<_>>();
    by_tag.sort_by(|left, right| right.count.cmp(&left.count).then_with(|| left.tag.cmp(&right.tag)));
    by_tag
}

fn count_matching(days: &[NaiveDate], predicate: impl Fn(&NaiveDate) -> bool) -> u32 {
    days.iter().filter(|day| predicate(day)).count() as u32
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

// Months since year 0, so month arithmetic is plain integer subtraction.
fn month_index(date: NaiveDate) -> i32 {
    date.year() * 12 + date.month0() as i32
}

fn month_start_from_index(index: i32) -> NaiveDate {
    let year = index.div_euclid(12);
    let month = index.rem_euclid(12) as u32 + 1;
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
}
