use std::ops::RangeInclusive;

use anyhow::Result;

use crate::error::TrackerError;
use crate::identity::Identity;
use crate::models::Settings;
use crate::store::{KvStore, keys, load_json, save_json};

pub const HISTORY_LIMIT_RANGE: RangeInclusive<usize> = 10..=100;
pub const CALORIE_GOAL_RANGE: RangeInclusive<i64> = 1000..=10000;

/// Stored settings merged over the defaults.
pub fn load(store: &(impl KvStore + ?Sized), identity: &Identity) -> Result<Settings> {
    Ok(load_json(store, &keys::settings(identity))?.unwrap_or_default())
}

pub fn validate(settings: &Settings) -> Result<()> {
    if !HISTORY_LIMIT_RANGE.contains(&settings.history_limit) {
        return Err(TrackerError::validation(format!(
            "History limit must be between {} and {}",
            HISTORY_LIMIT_RANGE.start(),
            HISTORY_LIMIT_RANGE.end()
        ))
        .into());
    }
    if !CALORIE_GOAL_RANGE.contains(&settings.daily_calorie_goal) {
        return Err(TrackerError::validation(format!(
            "Daily calorie goal must be between {} and {} kcal",
            CALORIE_GOAL_RANGE.start(),
            CALORIE_GOAL_RANGE.end()
        ))
        .into());
    }
    Ok(())
}

/// Validate and persist. Trimming history to the new limit is the caller's job.
pub fn save(store: &(impl KvStore + ?Sized), identity: &Identity, settings: &Settings) -> Result<()> {
    validate(settings)?;
    save_json(store, &keys::settings(identity), settings)
}

/// Remove stored settings and return the defaults.
pub fn reset(store: &(impl KvStore + ?Sized), identity: &Identity) -> Result<Settings> {
    store.remove(&keys::settings(identity))?;
    Ok(Settings::default())
}
