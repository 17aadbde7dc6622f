use serde::Serialize;

use crate::food_table::IngredientTable;
use crate::models::{Ingredient, Macros, format_macro};

/// Totals for a list of ingredients, in the shape stored on a dish.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NutritionTotals {
    pub calories: i64,
    pub macros: Macros,
}

/// Running totals in millionths, so the sum does not depend on input order.
/// Sums saturate rather than overflow.
#[derive(Debug, Clone, Copy, Default)]
struct Sums {
    calories: i64,
    protein: i64,
    carbohydrates: i64,
    fat: i64,
}

fn micros(value: f64) -> i64 {
    (value * 1_000_000.0).round() as i64
}

#[allow(clippy::cast_precision_loss)]
fn from_micros(value: i64) -> f64 {
    value as f64 / 1_000_000.0
}

/// Sum an ingredient list against the table.
///
/// Ingredients the table cannot resolve contribute nothing. Calories round to
/// the nearest whole number; macros are formatted with [`format_macro`].
#[must_use]
pub fn aggregate(table: &IngredientTable, ingredients: &[Ingredient]) -> NutritionTotals {
    let sums = ingredients.iter().fold(Sums::default(), |mut acc, ing| {
        if let Some(p) = table.lookup(&ing.name) {
            let m = ing.grams / 100.0;
            acc.calories = acc.calories.saturating_add(micros(p.calories * m));
            acc.protein = acc.protein.saturating_add(micros(p.protein * m));
            acc.carbohydrates = acc.carbohydrates.saturating_add(micros(p.carbohydrates * m));
            acc.fat = acc.fat.saturating_add(micros(p.fat * m));
        }
        acc
    });

    NutritionTotals {
        calories: from_micros(sums.calories).round() as i64,
        macros: Macros {
            protein: format_macro(from_micros(sums.protein)),
            carbohydrates: format_macro(from_micros(sums.carbohydrates)),
            fat: format_macro(from_micros(sums.fat)),
        },
    }
}

/// Ingredients that survive a commit: resolvable in the table and weighing more than 0 g.
#[must_use]
pub fn resolvable_ingredients(table: &IngredientTable, ingredients: &[Ingredient]) -> Vec<Ingredient> {
    ingredients
        .iter()
        .filter(|i| i.grams > 0.0 && table.contains(&i.name))
        .cloned()
        .collect()
}
