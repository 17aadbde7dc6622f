use anyhow::Result;

use platewise_core::models::{NutrientUnit, Settings, group_thousands};
use platewise_core::service::Tracker;

use super::helpers::print_json;

fn print_settings(settings: &Settings) {
    let unit = match settings.nutrient_unit {
        NutrientUnit::Grams => "g",
        NutrientUnit::Milligrams => "mg",
    };
    println!("Nutrient unit:      {unit}");
    println!("History limit:      {} analyses", settings.history_limit);
    println!(
        "Daily calorie goal: {} kcal",
        group_thousands(settings.daily_calorie_goal)
    );
}

pub(crate) fn cmd_settings_show(tracker: &Tracker, json: bool) -> Result<()> {
    let user = tracker.require_user()?;
    let settings = tracker.settings(&user)?;
    if json {
        print_json(&settings)
    } else {
        print_settings(&settings);
        Ok(())
    }
}

/// Change only the given fields. Nothing is saved if any value is out of range.
pub(crate) fn cmd_settings_set(
    tracker: &Tracker,
    unit: Option<&str>,
    history_limit: Option<usize>,
    goal: Option<i64>,
    json: bool,
) -> Result<()> {
    let user = tracker.require_user()?;
    let mut settings = tracker.settings(&user)?;
    if let Some(unit) = unit {
        settings.nutrient_unit = NutrientUnit::parse(unit)?;
    }
    if let Some(limit) = history_limit {
        settings.history_limit = limit;
    }
    if let Some(goal) = goal {
        settings.daily_calorie_goal = goal;
    }
    let saved = tracker.save_settings(&user, &settings)?;

    if json {
        print_json(&saved)
    } else {
        println!("Settings saved");
        print_settings(&saved);
        Ok(())
    }
}

pub(crate) fn cmd_settings_reset(tracker: &Tracker, json: bool) -> Result<()> {
    let user = tracker.require_user()?;
    let settings = tracker.reset_settings(&user)?;
    if json {
        print_json(&settings)
    } else {
        println!("Settings reset to defaults");
        print_settings(&settings);
        Ok(())
    }
}
