use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use platewise_core::models::{IngredientProfile, format_one_decimal};
use platewise_core::provider::NutritionProvider;
use platewise_core::service::Tracker;

use super::helpers::{print_json, truncate};

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "Ingredient")]
    name: String,
    #[tabled(rename = "kcal/100g")]
    calories: String,
    #[tabled(rename = "Protein")]
    protein: String,
    #[tabled(rename = "Carbs")]
    carbs: String,
    #[tabled(rename = "Fat")]
    fat: String,
}

impl From<&IngredientProfile> for ProfileRow {
    fn from(p: &IngredientProfile) -> Self {
        Self {
            name: truncate(&p.name, 35),
            calories: format_one_decimal(p.calories),
            protein: format!("{}g", format_one_decimal(p.protein)),
            carbs: format!("{}g", format_one_decimal(p.carbohydrates)),
            fat: format!("{}g", format_one_decimal(p.fat)),
        }
    }
}

fn print_profiles(profiles: &[IngredientProfile]) {
    let rows: Vec<ProfileRow> = profiles.iter().map(ProfileRow::from).collect();
    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) async fn cmd_ingredient_lookup(
    tracker: &mut Tracker,
    provider: &dyn NutritionProvider,
    name: &str,
    json: bool,
) -> Result<()> {
    let profile = tracker.lookup_ingredient(provider, name).await?;
    if json {
        print_json(&profile)
    } else {
        print_profiles(std::slice::from_ref(&profile));
        Ok(())
    }
}

pub(crate) fn cmd_ingredient_list(tracker: &Tracker, json: bool) -> Result<()> {
    let profiles = tracker.table().reference();
    if json {
        print_json(profiles)
    } else {
        print_profiles(profiles);
        Ok(())
    }
}
