//! Per-day achievement records and the streaks derived from them.

use anyhow::Result;
use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use crate::identity::Identity;
use crate::models::{AchievementHistory, AchievementRecord, StreakResult};
use crate::store::{KvStore, keys, load_json, save_json};

/// How far back a streak is followed.
pub const MAX_STREAK_DAYS: u32 = 365;

pub fn load(store: &(impl KvStore + ?Sized), identity: &Identity) -> Result<AchievementHistory> {
    Ok(load_json(store, &keys::achievements(identity))?.unwrap_or_default())
}

/// Record today's totals after a meal is logged and return the whole history.
///
/// `consumed` and `goal` overwrite whatever today's record held; the meal count
/// goes up by one.
pub fn update(
    store: &(impl KvStore + ?Sized),
    identity: &Identity,
    total_consumed_today: i64,
    goal: i64,
    today: NaiveDate,
) -> Result<AchievementHistory> {
    let mut history = load(store, identity)?;
    let record = history.entry(today).or_default();
    record.consumed = total_consumed_today;
    record.goal = goal;
    record.meal_count += 1;
    save_json(store, &keys::achievements(identity), &history)?;
    Ok(history)
}

fn is_success(history: &AchievementHistory, date: NaiveDate) -> bool {
    history.get(&date).is_some_and(AchievementRecord::is_successful)
}

/// Consecutive successful days ending today, or yesterday if today has not
/// succeeded (yet).
#[must_use]
pub fn calculate_streak(history: &AchievementHistory, today: NaiveDate) -> StreakResult {
    let anchor = if is_success(history, today) {
        today
    } else {
        today - Duration::days(1)
    };

    let mut result = StreakResult::default();
    for offset in 0..MAX_STREAK_DAYS {
        let date = anchor - Duration::days(i64::from(offset));
        if !is_success(history, date) {
            break;
        }
        if result.count == 0 {
            result.last_log_date = Some(date);
        }
        result.count += 1;
    }
    result
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DayStatus {
    /// Ate something and stayed within the goal.
    Achieved,
    /// Ate more than the goal, or no goal was set.
    OverGoal,
    /// A past day with nothing logged.
    Missed,
    /// Today, nothing logged yet.
    Pending,
    Upcoming,
}

impl DayStatus {
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Achieved => "🔥",
            Self::OverGoal => "⚠️",
            Self::Missed => "❌",
            Self::Pending | Self::Upcoming => "",
        }
    }
}

#[must_use]
pub fn day_status(history: &AchievementHistory, date: NaiveDate, today: NaiveDate) -> DayStatus {
    if date > today {
        return DayStatus::Upcoming;
    }
    match history.get(&date) {
        Some(record) if record.consumed > 0 => {
            if record.is_successful() {
                DayStatus::Achieved
            } else {
                DayStatus::OverGoal
            }
        }
        _ if date == today => DayStatus::Pending,
        _ => DayStatus::Missed,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub status: DayStatus,
    pub record: Option<AchievementRecord>,
}

/// One entry per day of the month. An invalid month yields an empty list.
#[must_use]
pub fn month_calendar(
    history: &AchievementHistory,
    year: i32,
    month: u32,
    today: NaiveDate,
) -> Vec<CalendarDay> {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return Vec::new();
    };
    first
        .iter_days()
        .take_while(|d| d.month() == month)
        .map(|date| CalendarDay {
            date,
            status: day_status(history, date, today),
            record: history.get(&date).copied(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Database;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn rec(consumed: i64, goal: i64) -> AchievementRecord {
        AchievementRecord {
            consumed,
            goal,
            meal_count: 1,
        }
    }

    fn user() -> Identity {
        Identity::parse("alice@example.com").unwrap()
    }

    #[test]
    fn test_streak_empty_history() {
        let streak = calculate_streak(&AchievementHistory::new(), date("2024-01-03"));
        assert_eq!(streak.count, 0);
        assert!(streak.last_log_date.is_none());
    }

    #[test]
    fn test_streak_broken_by_over_goal_yesterday() {
        let mut history = AchievementHistory::new();
        history.insert(date("2024-01-01"), rec(1800, 2000));
        history.insert(date("2024-01-02"), rec(2100, 2000));
        let streak = calculate_streak(&history, date("2024-01-03"));
        assert_eq!(streak.count, 0);
        assert!(streak.last_log_date.is_none());
    }

    #[test]
    fn test_streak_continues_from_yesterday() {
        let mut history = AchievementHistory::new();
        history.insert(date("2023-12-31"), rec(1500, 2000));
        history.insert(date("2024-01-01"), rec(1800, 2000));
        let streak = calculate_streak(&history, date("2024-01-02"));
        assert_eq!(streak.count, 2);
        assert_eq!(streak.last_log_date, Some(date("2024-01-01")));
    }

    #[test]
    fn test_streak_last_date_is_most_recent_success() {
        let mut history = AchievementHistory::new();
        history.insert(date("2024-01-01"), rec(1800, 2000));
        history.insert(date("2024-01-02"), rec(1900, 2000));
        let streak = calculate_streak(&history, date("2024-01-03"));
        assert_eq!(streak.count, 2);
        assert_eq!(streak.last_log_date, Some(date("2024-01-02")));
    }

    #[test]
    fn test_streak_includes_today() {
        let mut history = AchievementHistory::new();
        history.insert(date("2024-01-01"), rec(1800, 2000));
        history.insert(date("2024-01-02"), rec(900, 2000));
        let streak = calculate_streak(&history, date("2024-01-02"));
        assert_eq!(streak.count, 2);
        assert_eq!(streak.last_log_date, Some(date("2024-01-02")));
    }

    #[test]
    fn test_streak_stops_at_gap() {
        let mut history = AchievementHistory::new();
        history.insert(date("2024-01-01"), rec(1800, 2000));
        history.insert(date("2024-01-03"), rec(1800, 2000));
        history.insert(date("2024-01-04"), rec(1800, 2000));
        assert_eq!(calculate_streak(&history, date("2024-01-04")).count, 2);
    }

    #[test]
    fn test_streak_zero_goal_never_counts() {
        let mut history = AchievementHistory::new();
        history.insert(date("2024-01-01"), rec(0, 0));
        history.insert(date("2024-01-02"), rec(100, 0));
        assert_eq!(calculate_streak(&history, date("2024-01-02")).count, 0);
    }

    #[test]
    fn test_streak_capped_at_a_year() {
        let today = date("2024-06-01");
        let history: AchievementHistory = (0..400)
            .map(|i| (today - Duration::days(i), rec(1500, 2000)))
            .collect();
        let streak = calculate_streak(&history, today);
        assert_eq!(streak.count, MAX_STREAK_DAYS);
        assert_eq!(streak.last_log_date, Some(today));
    }

    #[test]
    fn test_update_creates_and_increments() {
        let db = Database::open_in_memory().unwrap();
        let today = date("2024-01-02");
        update(&db, &user(), 600, 2000, today).unwrap();
        let history = update(&db, &user(), 1400, 1800, today).unwrap();
        assert_eq!(
            history.get(&today),
            Some(&AchievementRecord {
                consumed: 1400,
                goal: 1800,
                meal_count: 2,
            })
        );
        assert_eq!(load(&db, &user()).unwrap(), history);
    }

    #[test]
    fn test_update_keeps_other_days() {
        let db = Database::open_in_memory().unwrap();
        update(&db, &user(), 1500, 2000, date("2024-01-01")).unwrap();
        let history = update(&db, &user(), 500, 2000, date("2024-01-02")).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(calculate_streak(&history, date("2024-01-02")).count, 2);
    }

    #[test]
    fn test_load_corrupt_history() {
        let db = Database::open_in_memory().unwrap();
        db.set(&keys::achievements(&user()), "[1,2,3]").unwrap();
        assert!(load(&db, &user()).unwrap().is_empty());
    }

    #[test]
    fn test_day_status() {
        let today = date("2024-01-10");
        let mut history = AchievementHistory::new();
        history.insert(date("2024-01-08"), rec(1800, 2000));
        history.insert(date("2024-01-09"), rec(2500, 2000));
        history.insert(date("2024-01-07"), rec(0, 2000));

        assert_eq!(day_status(&history, date("2024-01-08"), today), DayStatus::Achieved);
        assert_eq!(day_status(&history, date("2024-01-09"), today), DayStatus::OverGoal);
        assert_eq!(day_status(&history, date("2024-01-07"), today), DayStatus::Missed);
        assert_eq!(day_status(&history, date("2024-01-01"), today), DayStatus::Missed);
        assert_eq!(day_status(&history, today, today), DayStatus::Pending);
        assert_eq!(day_status(&history, date("2024-01-11"), today), DayStatus::Upcoming);
    }

    #[test]
    fn test_month_calendar() {
        let today = date("2024-02-10");
        let mut history = AchievementHistory::new();
        history.insert(date("2024-02-01"), rec(1800, 2000));
        let days = month_calendar(&history, 2024, 2, today);
        assert_eq!(days.len(), 29);
        assert_eq!(days[0].status, DayStatus::Achieved);
        assert_eq!(days[0].record.unwrap().consumed, 1800);
        assert_eq!(days[1].status, DayStatus::Missed);
        assert_eq!(days[9].status, DayStatus::Pending);
        assert_eq!(days[28].status, DayStatus::Upcoming);
        assert!(month_calendar(&history, 2024, 13, today).is_empty());
    }
}
