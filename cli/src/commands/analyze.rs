use anyhow::{Context, Result};
use std::path::Path;

use platewise_core::models::QuickAdd;
use platewise_core::provider::NutritionProvider;
use platewise_core::service::Tracker;

use super::helpers::{mime_for_path, print_dish_table, print_json};

pub(crate) async fn cmd_analyze(
    tracker: &Tracker,
    provider: &dyn NutritionProvider,
    image: &Path,
    json: bool,
) -> Result<()> {
    let user = tracker.require_user()?;
    let mime_type = mime_for_path(image)?;
    let bytes =
        std::fs::read(image).with_context(|| format!("Failed to read {}", image.display()))?;
    let preview = image
        .canonicalize()
        .unwrap_or_else(|_| image.to_path_buf())
        .display()
        .to_string();

    let now_millis = chrono::Utc::now().timestamp_millis();
    let dishes = tracker
        .analyze(provider, &user, &bytes, mime_type, preview, now_millis)
        .await?;

    if json {
        print_json(&dishes)?;
    } else if dishes.is_empty() {
        println!("No food found in the photo. Try another picture or use `platewise quick-add`");
    } else {
        let unit = tracker.settings(&user)?.nutrient_unit;
        print_dish_table(&dishes, unit);
        println!("\nEdit with `platewise dish edit <#>`, then `platewise meal log` to count it.");
    }
    Ok(())
}

pub(crate) fn cmd_quick_add(tracker: &Tracker, form: QuickAdd, json: bool) -> Result<()> {
    let user = tracker.require_user()?;
    let name = form.name.trim().to_string();
    let dishes = tracker.quick_add(&user, form)?;

    if json {
        print_json(&dishes)?;
    } else {
        println!("Added {name} to the pending meal");
        print_dish_table(&dishes, tracker.settings(&user)?.nutrient_unit);
    }
    Ok(())
}
