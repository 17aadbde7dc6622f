use anyhow::{Context, Result, bail};
use chrono::{Datelike, Local, NaiveDate};
use serde::Serialize;
use std::path::Path;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use platewise_core::models::{Dish, NutrientUnit, total_calories};

pub(crate) fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// `YYYY-MM`, or the current month when absent.
pub(crate) fn parse_month(month: Option<&str>) -> Result<(i32, u32)> {
    let Some(s) = month else {
        let now = today();
        return Ok((now.year(), now.month()));
    };
    let date = NaiveDate::parse_from_str(&format!("{}-01", s.trim()), "%Y-%m-%d")
        .with_context(|| format!("Invalid month '{s}'. Use YYYY-MM"))?;
    Ok((date.year(), date.month()))
}

/// Image type from the file extension.
pub(crate) fn mime_for_path(path: &Path) -> Result<&'static str> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => Ok("image/jpeg"),
        "png" => Ok("image/png"),
        "webp" => Ok("image/webp"),
        "heic" => Ok("image/heic"),
        "heif" => Ok("image/heif"),
        _ => bail!(
            "Unsupported image type '{}'. Use a JPEG, PNG, WebP, or HEIC photo",
            path.display()
        ),
    }
}

/// Parse a gram amount like "150" or "150g".
pub(crate) fn parse_grams(s: &str) -> Result<f64> {
    let trimmed = s.trim().trim_end_matches('g').trim();
    let value: f64 = trimmed
        .parse()
        .with_context(|| format!("Invalid amount: '{s}'. Use a number like '150' or '150g'"))?;
    if !value.is_finite() || value < 0.0 {
        bail!("Amount must not be negative");
    }
    Ok(value)
}

/// 1-based row number as typed by the user, converted to an index.
pub(crate) fn parse_row(s: &str) -> Result<usize> {
    let n: usize = s
        .trim()
        .parse()
        .with_context(|| format!("Invalid row '{s}'. Rows are numbered from 1"))?;
    if n == 0 {
        bail!("Rows are numbered from 1");
    }
    Ok(n - 1)
}

/// Split `LEFT=RIGHT`.
pub(crate) fn split_assignment(s: &str) -> Result<(&str, &str)> {
    let (left, right) = s
        .split_once('=')
        .with_context(|| format!("Invalid value '{s}'. Use the form LEFT=RIGHT"))?;
    Ok((left.trim(), right.trim()))
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn print_dish_table(dishes: &[Dish], unit: NutrientUnit) {
    #[derive(Tabled)]
    struct DishRow {
        #[tabled(rename = "#")]
        idx: usize,
        #[tabled(rename = "Dish")]
        name: String,
        #[tabled(rename = "Calories")]
        calories: i64,
        #[tabled(rename = "Protein")]
        protein: String,
        #[tabled(rename = "Carbs")]
        carbs: String,
        #[tabled(rename = "Fat")]
        fat: String,
        #[tabled(rename = "Ingredients")]
        ingredients: usize,
    }

    let rows: Vec<DishRow> = dishes
        .iter()
        .enumerate()
        .map(|(i, d)| DishRow {
            idx: i + 1,
            name: truncate(&d.name, 35),
            calories: d.calories,
            protein: unit.display(&d.macros.protein),
            carbs: unit.display(&d.macros.carbohydrates),
            fat: unit.display(&d.macros.fat),
            ingredients: d.ingredients.len(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    println!("  TOTAL: {} kcal", total_calories(dishes));
}

pub(crate) fn print_dish_detail(index: usize, dish: &Dish, unit: NutrientUnit) {
    #[derive(Tabled)]
    struct IngredientRow {
        #[tabled(rename = "#")]
        idx: usize,
        #[tabled(rename = "Ingredient")]
        name: String,
        #[tabled(rename = "Grams")]
        grams: String,
    }

    println!("[{}] {} ({} kcal)", index + 1, dish.name, dish.calories);
    println!(
        "    P:{} C:{} F:{}",
        unit.display(&dish.macros.protein),
        unit.display(&dish.macros.carbohydrates),
        unit.display(&dish.macros.fat)
    );
    if !dish.description.is_empty() {
        println!("    {}", dish.description);
    }
    if dish.ingredients.is_empty() {
        return;
    }
    let rows: Vec<IngredientRow> = dish
        .ingredients
        .iter()
        .enumerate()
        .map(|(i, ing)| IngredientRow {
            idx: i + 1,
            name: truncate(&ing.name, 35),
            grams: format!("{}g", ing.grams),
        })
        .collect();
    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}
