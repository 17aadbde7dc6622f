use anyhow::Result;
use chrono::{DateTime, Local};
use serde_json::json;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use platewise_core::models::total_calories;
use platewise_core::service::Tracker;

use super::helpers::{json_error, print_dish_detail, print_json, truncate};

/// Entry ids are creation times in epoch milliseconds.
fn created_at(id: i64) -> String {
    DateTime::from_timestamp_millis(id).map_or_else(
        || "?".to_string(),
        |t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
    )
}

fn not_found(id: i64, json: bool) -> ! {
    let msg = format!("No history entry with ID {id}");
    if json {
        println!("{}", json_error(&msg));
    } else {
        eprintln!("{msg}");
    }
    process::exit(2);
}

pub(crate) fn cmd_history_list(tracker: &Tracker, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct HistoryRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "When")]
        when: String,
        #[tabled(rename = "Dishes")]
        dishes: String,
        #[tabled(rename = "Calories")]
        calories: i64,
    }

    let user = tracker.require_user()?;
    let entries = tracker.history(&user)?;

    if json {
        return print_json(&entries);
    }
    if entries.is_empty() {
        println!("No saved analyses");
        return Ok(());
    }

    let rows: Vec<HistoryRow> = entries
        .iter()
        .map(|e| HistoryRow {
            id: e.id,
            when: created_at(e.id),
            dishes: truncate(
                &e.analysis_result
                    .iter()
                    .map(|d| d.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
                40,
            ),
            calories: total_calories(&e.analysis_result),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}

pub(crate) fn cmd_history_show(tracker: &Tracker, id: i64, reopen: bool, json: bool) -> Result<()> {
    let user = tracker.require_user()?;
    if reopen && tracker.reopen(&user, id)?.is_none() {
        not_found(id, json);
    }
    let Some(entry) = tracker.history_entry(&user, id)? else {
        not_found(id, json);
    };

    if json {
        return print_json(&entry);
    }
    let unit = tracker.settings(&user)?.nutrient_unit;
    println!("=== {} ===", created_at(entry.id));
    println!("Photo: {}\n", entry.image_preview);
    for (i, dish) in entry.analysis_result.iter().enumerate() {
        print_dish_detail(i, dish, unit);
        println!();
    }
    println!("TOTAL: {} kcal", total_calories(&entry.analysis_result));
    if reopen {
        println!("\nReopened as the pending meal. Run `platewise meal log` to count it.");
    }
    Ok(())
}

pub(crate) fn cmd_history_share(tracker: &Tracker, id: i64, json: bool) -> Result<()> {
    let user = tracker.require_user()?;
    let Some(text) = tracker.share_text(&user, id)? else {
        not_found(id, json);
    };
    if json {
        print_json(&json!({ "id": id, "text": text }))
    } else {
        println!("{text}");
        Ok(())
    }
}

pub(crate) fn cmd_history_clear(tracker: &Tracker, json: bool) -> Result<()> {
    let user = tracker.require_user()?;
    tracker.clear_history(&user)?;
    if json {
        print_json(&json!({ "cleared": true }))
    } else {
        println!("History cleared");
        Ok(())
    }
}
