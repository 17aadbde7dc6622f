use anyhow::Result;
use serde_json::json;

use platewise_core::models::total_calories;
use platewise_core::service::Tracker;

use super::helpers::{print_dish_detail, print_json, today};
use super::progress::{print_progress, print_streak};

pub(crate) fn cmd_meal_show(tracker: &Tracker, json: bool) -> Result<()> {
    let user = tracker.require_user()?;
    let dishes = tracker.pending_meal(&user)?;

    if json {
        return print_json(&dishes);
    }
    if dishes.is_empty() {
        println!("No pending meal. Run `platewise analyze <photo>` or `platewise quick-add`");
        return Ok(());
    }
    let unit = tracker.settings(&user)?.nutrient_unit;
    for (i, dish) in dishes.iter().enumerate() {
        print_dish_detail(i, dish, unit);
        println!();
    }
    println!("TOTAL: {} kcal", total_calories(&dishes));
    Ok(())
}

pub(crate) fn cmd_meal_clear(tracker: &Tracker, json: bool) -> Result<()> {
    let user = tracker.require_user()?;
    let cleared = tracker.clear_pending_meal(&user)?;
    if json {
        print_json(&json!({ "cleared": cleared }))?;
    } else if cleared {
        println!("Pending meal discarded");
    } else {
        println!("No pending meal");
    }
    Ok(())
}

pub(crate) fn cmd_meal_log(tracker: &Tracker, json: bool) -> Result<()> {
    let user = tracker.require_user()?;
    let log = tracker.log_meal(&user, today())?;

    if json {
        return print_json(&log);
    }
    println!("Logged {} kcal", log.calories_added);
    print_progress(&log.progress);
    print_streak(&log.streak);
    Ok(())
}
