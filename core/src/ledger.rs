//! Running total of calories eaten today, reset lazily when the date changes.

use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::identity::Identity;
use crate::models::DailyIntake;
use crate::store::{KvStore, keys, load_json, save_json};

/// The stored record if it is for `today`, otherwise a fresh zeroed one.
#[must_use]
pub fn reconcile_for_today(stored: Option<DailyIntake>, today: NaiveDate) -> DailyIntake {
    match stored {
        Some(intake) if intake.date == today => intake,
        _ => DailyIntake::empty(today),
    }
}

/// Today's intake. A missing, unreadable, or stale record is replaced and persisted.
pub fn get(store: &(impl KvStore + ?Sized), identity: &Identity, today: NaiveDate) -> Result<DailyIntake> {
    let key = keys::daily_intake(identity);
    let stored: Option<DailyIntake> = load_json(store, &key)?;
    let reset = stored.as_ref().is_none_or(|s| s.date != today);
    let intake = reconcile_for_today(stored, today);
    if reset {
        debug!(user = %identity, date = %intake.date, "starting a new daily intake");
        save(store, identity, &intake)?;
    }
    Ok(intake)
}

pub fn save(store: &(impl KvStore + ?Sized), identity: &Identity, intake: &DailyIntake) -> Result<()> {
    save_json(store, &keys::daily_intake(identity), intake)
}

/// Add a meal's calories to today's total and persist it.
pub fn log_meal(
    store: &(impl KvStore + ?Sized),
    identity: &Identity,
    calories: i64,
    today: NaiveDate,
) -> Result<DailyIntake> {
    let mut intake = get(store, identity, today)?;
    intake.consumed_calories += calories;
    save(store, identity, &intake)?;
    Ok(intake)
}

/// Today's intake measured against the goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyProgress {
    pub date: NaiveDate,
    pub consumed: i64,
    pub goal: i64,
    pub remaining: i64,
    /// 0..=100
    pub percentage: u8,
    pub over_goal: bool,
    pub goal_configured: bool,
}

impl DailyProgress {
    #[must_use]
    pub fn new(intake: &DailyIntake, goal: i64) -> Self {
        let consumed = intake.consumed_calories;
        let goal_configured = goal > 0;
        let percentage = if goal_configured {
            u8::try_from((consumed.max(0).saturating_mul(100) / goal).min(100)).unwrap_or(100)
        } else {
            0
        };
        Self {
            date: intake.date,
            consumed,
            goal,
            remaining: (goal - consumed).max(0),
            percentage,
            over_goal: goal_configured && consumed > goal,
            goal_configured,
        }
    }
}
