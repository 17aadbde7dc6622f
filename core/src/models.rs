use std::collections::BTreeMap;

use anyhow::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::TrackerError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Nutrition per 100 g of an ingredient, as returned by the lookup service.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NutrientProfile {
    pub calories: f64,
    pub protein: f64,
    pub carbohydrates: f64,
    pub fat: f64,
}

impl NutrientProfile {
    #[must_use]
    pub fn named(self, name: impl Into<String>) -> IngredientProfile {
        IngredientProfile {
            name: name.into(),
            calories: self.calories,
            protein: self.protein,
            carbohydrates: self.carbohydrates,
            fat: self.fat,
        }
    }
}

/// A named per-100 g profile in the ingredient table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientProfile {
    pub name: String,
    pub calories: f64,
    pub protein: f64,
    pub carbohydrates: f64,
    pub fat: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub grams: f64,
}

impl Ingredient {
    pub fn new(name: impl Into<String>, grams: f64) -> Self {
        Self {
            name: name.into(),
            grams,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Macros {
    pub protein: String,
    pub carbohydrates: String,
    pub fat: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroKind {
    Protein,
    Carbohydrates,
    Fat,
}

impl Macros {
    pub fn get(&self, kind: MacroKind) -> &str {
        match kind {
            MacroKind::Protein => &self.protein,
            MacroKind::Carbohydrates => &self.carbohydrates,
            MacroKind::Fat => &self.fat,
        }
    }

    pub fn set(&mut self, kind: MacroKind, value: String) {
        match kind {
            MacroKind::Protein => self.protein = value,
            MacroKind::Carbohydrates => self.carbohydrates = value,
            MacroKind::Fat => self.fat = value,
        }
    }
}

/// One food item in an analysis result.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Dish {
    pub name: String,
    pub calories: i64,
    pub macros: Macros,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
}

/// Dishes produced by one image analysis or built up by quick-adds.
pub type AnalysisResult = Vec<Dish>;

#[must_use]
pub fn total_calories(dishes: &[Dish]) -> i64 {
    dishes.iter().map(|d| d.calories).sum()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Creation time in epoch milliseconds; unique per entry.
    pub id: i64,
    pub image_preview: String,
    pub analysis_result: AnalysisResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyIntake {
    pub date: NaiveDate,
    pub consumed_calories: i64,
}

impl DailyIntake {
    #[must_use]
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            consumed_calories: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementRecord {
    pub consumed: i64,
    pub goal: i64,
    pub meal_count: i64,
}

impl AchievementRecord {
    /// A day counts towards a streak when something was eaten and the total
    /// stayed within a configured (positive) goal.
    #[must_use]
    pub fn is_successful(&self) -> bool {
        self.goal > 0 && self.consumed > 0 && self.consumed <= self.goal
    }
}

pub type AchievementHistory = BTreeMap<NaiveDate, AchievementRecord>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakResult {
    pub count: u32,
    /// Most recent successful day of the streak; `None` when the count is 0.
    #[serde(serialize_with = "date_key_or_empty")]
    pub last_log_date: Option<NaiveDate>,
}

#[allow(clippy::ref_option)]
fn date_key_or_empty<S: Serializer>(
    date: &Option<NaiveDate>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&date.map(date_key).unwrap_or_default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NutrientUnit {
    #[default]
    #[serde(rename = "g")]
    Grams,
    #[serde(rename = "mg")]
    Milligrams,
}

impl NutrientUnit {
    /// Render a stored macro string (e.g. `"41.1g"`) in this unit.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn display(self, macro_value: &str) -> String {
        let grams = parse_quantity(macro_value);
        match self {
            Self::Grams => {
                if grams.fract() == 0.0 {
                    format!("{grams:.0}g")
                } else {
                    format!("{}g", format_one_decimal(grams))
                }
            }
            Self::Milligrams => {
                let mg = (grams * 1000.0).round() as i64;
                format!("{}mg", group_thousands(mg))
            }
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "g" | "gram" | "grams" => Ok(Self::Grams),
            "mg" | "milligram" | "milligrams" => Ok(Self::Milligrams),
            other => Err(TrackerError::validation(format!(
                "Invalid nutrient unit '{other}'. Must be one of: g, mg"
            ))
            .into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub nutrient_unit: NutrientUnit,
    pub history_limit: usize,
    pub daily_calorie_goal: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            nutrient_unit: NutrientUnit::Grams,
            history_limit: 50,
            daily_calorie_goal: 2000,
        }
    }
}

/// Fields of the quick-add form. Every field is required.
#[derive(Debug, Clone, Default)]
pub struct QuickAdd {
    pub name: String,
    pub calories: Option<i64>,
    pub protein: Option<i64>,
    pub carbs: Option<i64>,
    pub fat: Option<i64>,
}

pub const QUICK_ADD_DESCRIPTION: &str = "Added manually.";

impl QuickAdd {
    pub fn into_dish(self) -> Result<Dish> {
        let name = self.name.trim();
        let (Some(calories), Some(protein), Some(carbs), Some(fat)) =
            (self.calories, self.protein, self.carbs, self.fat)
        else {
            return Err(TrackerError::validation("Please fill in every field").into());
        };
        if name.is_empty() {
            return Err(TrackerError::validation("Please fill in every field").into());
        }
        if calories < 0 || protein < 0 || carbs < 0 || fat < 0 {
            return Err(
                TrackerError::validation("Calories and macros must not be negative").into(),
            );
        }
        Ok(Dish {
            name: name.to_string(),
            calories,
            macros: Macros {
                protein: format!("{protein}g"),
                carbohydrates: format!("{carbs}g"),
                fat: format!("{fat}g"),
            },
            description: QUICK_ADD_DESCRIPTION.to_string(),
            ingredients: Vec::new(),
        })
    }
}

/// Read the leading number of a quantity string like `"41.1g"`; 0 if there is none.
#[must_use]
pub fn parse_quantity(s: &str) -> f64 {
    let s = s.trim();
    let end = s
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || (i == 0 && (c == '-' || c == '+'))))
        .map_or(s.len(), |(i, _)| i);
    s[..end].parse::<f64>().unwrap_or(0.0)
}

/// Round to one decimal, half away from zero.
///
/// The value is snapped to hundredths first so that sums like
/// `7.2 + 0.45 = 7.6499999999999995` still round to 7.7.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn round_one_decimal(value: f64) -> f64 {
    let hundredths = (value * 100.0).round() as i64;
    let tenths = if hundredths >= 0 {
        hundredths.saturating_add(5) / 10
    } else {
        hundredths.saturating_sub(5) / 10
    };
    tenths as f64 / 10.0
}

#[must_use]
pub fn format_one_decimal(value: f64) -> String {
    format!("{:.1}", round_one_decimal(value))
}

/// Macro total as stored on a dish: one decimal plus the gram suffix.
#[must_use]
pub fn format_macro(grams: f64) -> String {
    format!("{}g", format_one_decimal(grams))
}

/// A user-entered gram amount, written the way it was typed (`12g`, `12.5g`).
#[must_use]
pub fn format_entered_grams(grams: f64) -> String {
    format!("{grams}g")
}

#[must_use]
pub fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[must_use]
pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date_key(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).map_err(|_| {
        TrackerError::validation(format!("Invalid date '{s}'. Must be YYYY-MM-DD")).into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_one_decimal_half_up() {
        assert!((round_one_decimal(7.65) - 7.7).abs() < 1e-9);
        assert!((round_one_decimal(7.2 + 0.3 * 1.5) - 7.7).abs() < 1e-9);
        assert!((round_one_decimal(66.05) - 66.1).abs() < 1e-9);
        assert!((round_one_decimal(7.64) - 7.6).abs() < 1e-9);
        assert!((round_one_decimal(-0.25) + 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_format_macro() {
        assert_eq!(format_macro(42.0), "42.0g");
        assert_eq!(format_macro(0.0), "0.0g");
        assert_eq!(format_macro(7.6499999999999995), "7.7g");
    }

    #[test]
    fn test_format_entered_grams() {
        assert_eq!(format_entered_grams(12.0), "12g");
        assert_eq!(format_entered_grams(12.5), "12.5g");
    }

    #[test]
    fn test_parse_quantity() {
        assert!((parse_quantity("41.1g") - 41.1).abs() < f64::EPSILON);
        assert!((parse_quantity(" 10 g") - 10.0).abs() < f64::EPSILON);
        assert!((parse_quantity("12") - 12.0).abs() < f64::EPSILON);
        assert!(parse_quantity("g").abs() < f64::EPSILON);
        assert!(parse_quantity("").abs() < f64::EPSILON);
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(41_100), "41,100");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
        assert_eq!(group_thousands(-1200), "-1,200");
    }

    #[test]
    fn test_nutrient_unit_display() {
        assert_eq!(NutrientUnit::Grams.display("10g"), "10g");
        assert_eq!(NutrientUnit::Grams.display("41.1g"), "41.1g");
        assert_eq!(NutrientUnit::Grams.display("7.0g"), "7g");
        assert_eq!(NutrientUnit::Milligrams.display("41.1g"), "41,100mg");
        assert_eq!(NutrientUnit::Milligrams.display("0.5g"), "500mg");
    }

    #[test]
    fn test_nutrient_unit_parse() {
        assert_eq!(NutrientUnit::parse("g").unwrap(), NutrientUnit::Grams);
        assert_eq!(NutrientUnit::parse("MG").unwrap(), NutrientUnit::Milligrams);
        assert!(NutrientUnit::parse("oz").is_err());
    }

    #[test]
    fn test_settings_merge_missing_keys_with_defaults() {
        let s: Settings = serde_json::from_str(r#"{"dailyCalorieGoal": 1800}"#).unwrap();
        assert_eq!(s.daily_calorie_goal, 1800);
        assert_eq!(s.history_limit, 50);
        assert_eq!(s.nutrient_unit, NutrientUnit::Grams);
    }

    #[test]
    fn test_settings_json_shape() {
        let json = serde_json::to_value(Settings::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"nutrientUnit": "g", "historyLimit": 50, "dailyCalorieGoal": 2000})
        );
    }

    #[test]
    fn test_dish_without_ingredients_deserializes() {
        let dish: Dish = serde_json::from_str(
            r#"{"name":"Pho","calories":450,"macros":{"protein":"25g","carbohydrates":"60g","fat":"10g"},"description":"Beef noodle soup"}"#,
        )
        .unwrap();
        assert_eq!(dish.calories, 450);
        assert!(dish.ingredients.is_empty());
    }

    #[test]
    fn test_history_entry_json_shape() {
        let entry = HistoryEntry {
            id: 1_700_000_000_000,
            image_preview: "quickadd".to_string(),
            analysis_result: vec![],
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": 1_700_000_000_000_i64, "imagePreview": "quickadd", "analysisResult": []})
        );
    }

    #[test]
    fn test_achievement_history_uses_date_keys() {
        let mut history = AchievementHistory::new();
        history.insert(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            AchievementRecord {
                consumed: 1800,
                goal: 2000,
                meal_count: 2,
            },
        );
        let json = serde_json::to_string(&history).unwrap();
        assert_eq!(
            json,
            r#"{"2024-01-01":{"consumed":1800,"goal":2000,"mealCount":2}}"#
        );
        let back: AchievementHistory = serde_json::from_str(&json).unwrap();
        assert_eq!(back, history);
    }

    #[test]
    fn test_record_success_requires_positive_goal() {
        let ok = AchievementRecord {
            consumed: 1800,
            goal: 2000,
            meal_count: 1,
        };
        assert!(ok.is_successful());
        assert!(
            !AchievementRecord {
                consumed: 2100,
                ..ok
            }
            .is_successful()
        );
        assert!(!AchievementRecord { consumed: 0, ..ok }.is_successful());
        assert!(
            !AchievementRecord {
                consumed: 0,
                goal: 0,
                meal_count: 1
            }
            .is_successful()
        );
    }

    #[test]
    fn test_quick_add_into_dish() {
        let dish = QuickAdd {
            name: "  Banh mi ".to_string(),
            calories: Some(400),
            protein: Some(15),
            carbs: Some(50),
            fat: Some(12),
        }
        .into_dish()
        .unwrap();
        assert_eq!(dish.name, "Banh mi");
        assert_eq!(dish.calories, 400);
        assert_eq!(dish.macros.protein, "15g");
        assert_eq!(dish.macros.carbohydrates, "50g");
        assert_eq!(dish.macros.fat, "12g");
        assert!(dish.ingredients.is_empty());
    }

    #[test]
    fn test_quick_add_missing_field() {
        let err = QuickAdd {
            name: "Banh mi".to_string(),
            calories: Some(400),
            protein: None,
            carbs: Some(50),
            fat: Some(12),
        }
        .into_dish()
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TrackerError>(),
            Some(TrackerError::Validation(_))
        ));
    }

    #[test]
    fn test_quick_add_empty_name() {
        let add = QuickAdd {
            name: "   ".to_string(),
            calories: Some(1),
            protein: Some(1),
            carbs: Some(1),
            fat: Some(1),
        };
        assert!(add.into_dish().is_err());
    }

    #[test]
    fn test_quick_add_negative() {
        let add = QuickAdd {
            name: "Soup".to_string(),
            calories: Some(-1),
            protein: Some(1),
            carbs: Some(1),
            fat: Some(1),
        };
        assert!(add.into_dish().is_err());
    }

    #[test]
    fn test_parse_date_key() {
        assert_eq!(
            parse_date_key("2024-01-15").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
        );
        assert!(parse_date_key("15/01/2024").is_err());
        assert_eq!(
            date_key(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()),
            "2024-03-05"
        );
    }

    #[test]
    fn test_streak_result_json_shape() {
        let none = serde_json::to_value(StreakResult::default()).unwrap();
        assert_eq!(none, serde_json::json!({"count": 0, "lastLogDate": ""}));
        let some = StreakResult {
            count: 2,
            last_log_date: NaiveDate::from_ymd_opt(2024, 1, 1),
        };
        assert_eq!(
            serde_json::to_value(some).unwrap(),
            serde_json::json!({"count": 2, "lastLogDate": "2024-01-01"})
        );
    }

    #[test]
    fn test_total_calories() {
        let dishes = vec![
            Dish {
                calories: 300,
                ..Dish::default()
            },
            Dish {
                calories: 225,
                ..Dish::default()
            },
        ];
        assert_eq!(total_calories(&dishes), 525);
        assert_eq!(total_calories(&[]), 0);
    }
}
